//! Filtering and ordering of country listings.

use crate::core::country::Country;
use anyhow::{Result, anyhow};
use std::cmp::Ordering;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Id,
    Name,
    Capital,
    Region,
    Population,
    CurrencyCode,
    ExchangeRate,
    EstimatedGdp,
    LastRefreshedAt,
}

impl FromStr for SortField {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "id" => Ok(SortField::Id),
            "name" => Ok(SortField::Name),
            "capital" => Ok(SortField::Capital),
            "region" => Ok(SortField::Region),
            "population" => Ok(SortField::Population),
            "currency" | "currency_code" => Ok(SortField::CurrencyCode),
            "rate" | "exchange_rate" => Ok(SortField::ExchangeRate),
            "gdp" | "estimated_gdp" => Ok(SortField::EstimatedGdp),
            "refreshed" | "last_refreshed_at" => Ok(SortField::LastRefreshedAt),
            _ => Err(anyhow!("Invalid sort field: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// Unrecognized directions fall back to ascending.
    fn parse_lenient(s: &str) -> Self {
        if s.eq_ignore_ascii_case("desc") {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for SortSpec {
    fn default() -> Self {
        SortSpec {
            field: SortField::Name,
            direction: SortDirection::Asc,
        }
    }
}

impl FromStr for SortSpec {
    type Err = anyhow::Error;

    /// `gdp*` always means estimated GDP descending. Anything else is either a bare
    /// field name or `<field>_<direction>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().to_lowercase();
        if value.starts_with("gdp") {
            return Ok(SortSpec {
                field: SortField::EstimatedGdp,
                direction: SortDirection::Desc,
            });
        }

        if let Ok(field) = value.parse::<SortField>() {
            return Ok(SortSpec {
                field,
                direction: SortDirection::Asc,
            });
        }

        match value.rsplit_once('_') {
            Some((field, direction)) => Ok(SortSpec {
                field: field.parse()?,
                direction: SortDirection::parse_lenient(direction),
            }),
            None => Err(anyhow!("Invalid sort field: {}", s)),
        }
    }
}

impl SortSpec {
    /// Absent values order before present ones, so they come last when descending.
    pub fn compare(&self, a: &Country, b: &Country) -> Ordering {
        let ordering = match self.field {
            SortField::Id => a.id.cmp(&b.id),
            SortField::Name => compare_text(Some(&a.name), Some(&b.name)),
            SortField::Capital => compare_text(a.capital.as_ref(), b.capital.as_ref()),
            SortField::Region => compare_text(a.region.as_ref(), b.region.as_ref()),
            SortField::Population => a.population.cmp(&b.population),
            SortField::CurrencyCode => {
                compare_text(a.currency_code.as_ref(), b.currency_code.as_ref())
            }
            SortField::ExchangeRate => compare_number(a.exchange_rate, b.exchange_rate),
            SortField::EstimatedGdp => compare_number(a.estimated_gdp, b.estimated_gdp),
            SortField::LastRefreshedAt => a.last_refreshed_at.cmp(&b.last_refreshed_at),
        };
        match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

fn compare_text(a: Option<&String>, b: Option<&String>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b)),
        (a, b) => a.is_some().cmp(&b.is_some()),
    }
}

fn compare_number(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (a, b) => a.is_some().cmp(&b.is_some()),
    }
}

/// Exact-match filters plus ordering, applied over rows in the store's id order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountryQuery {
    pub region: Option<String>,
    pub currency_code: Option<String>,
    pub sort: SortSpec,
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

impl CountryQuery {
    /// Builds a query from raw request values. Empty values count as absent; filters
    /// are otherwise kept verbatim.
    pub fn from_params(
        region: Option<&str>,
        currency_code: Option<&str>,
        sort: Option<&str>,
    ) -> Result<Self> {
        Ok(CountryQuery {
            region: present(region).map(str::to_string),
            currency_code: present(currency_code).map(str::to_string),
            sort: present(sort.map(str::trim))
                .map(str::parse::<SortSpec>)
                .transpose()?
                .unwrap_or_default(),
        })
    }

    pub fn matches(&self, country: &Country) -> bool {
        let region_ok = self
            .region
            .as_deref()
            .is_none_or(|region| country.region.as_deref() == Some(region));
        let currency_ok = self
            .currency_code
            .as_deref()
            .is_none_or(|code| country.currency_code.as_deref() == Some(code));
        region_ok && currency_ok
    }

    /// Sorting is stable, so ties keep the incoming (id) order.
    pub fn apply(&self, rows: impl IntoIterator<Item = Country>) -> Vec<Country> {
        let mut selected: Vec<Country> = rows.into_iter().filter(|c| self.matches(c)).collect();
        selected.sort_by(|a, b| self.sort.compare(a, b));
        selected
    }
}
