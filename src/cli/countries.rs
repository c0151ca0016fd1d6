use super::ui;
use crate::core::country::Country;
use crate::core::query::CountryQuery;
use crate::core::store::CountryStore;
use crate::refresh::RefreshEngine;
use crate::summary::{SummaryImage, format_usd};
use anyhow::Result;
use chrono::{DateTime, Utc};
use comfy_table::{Cell, CellAlignment};
use num_format::{Locale, ToFormattedString};

pub fn display_countries_table(countries: &[Country]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("ID"),
        ui::header_cell("Name"),
        ui::header_cell("Capital"),
        ui::header_cell("Region"),
        ui::header_cell("Population"),
        ui::header_cell("Currency"),
        ui::header_cell("Rate"),
        ui::header_cell("Est. GDP (USD)"),
    ]);

    for country in countries {
        table.add_row(vec![
            Cell::new(country.id).set_alignment(CellAlignment::Right),
            Cell::new(&country.name),
            Cell::new(country.capital.as_deref().unwrap_or("")),
            Cell::new(country.region.as_deref().unwrap_or("")),
            Cell::new(country.population.to_formatted_string(&Locale::en))
                .set_alignment(CellAlignment::Right),
            ui::format_optional_cell(country.currency_code.as_deref(), str::to_string),
            ui::format_optional_cell(country.exchange_rate, |r| format!("{r:.4}")),
            ui::format_optional_cell(country.estimated_gdp, format_usd),
        ]);
    }

    format!(
        "{}\n\n{}\n\n{} {}",
        ui::style_text("Countries", ui::StyleType::Title),
        table,
        ui::style_text("Total:", ui::StyleType::TotalLabel),
        ui::style_text(&countries.len().to_string(), ui::StyleType::TotalValue)
    )
}

pub fn display_status(total: usize, last_refreshed_at: Option<DateTime<Utc>>) -> String {
    let last = last_refreshed_at.map_or("Not refreshed yet".to_string(), |t| {
        t.format("%Y-%m-%d %H:%M:%S UTC").to_string()
    });
    format!(
        "{} {}\n{} {}",
        ui::style_text("Total countries:", ui::StyleType::TotalLabel),
        ui::style_text(&total.to_string(), ui::StyleType::TotalValue),
        ui::style_text("Last refreshed:", ui::StyleType::TotalLabel),
        ui::style_text(&last, ui::StyleType::Subtle)
    )
}

pub async fn list(store: &dyn CountryStore, query: &CountryQuery) -> Result<()> {
    let countries = store.find_all(query).await?;
    println!("{}", display_countries_table(&countries));
    Ok(())
}

pub async fn status(store: &dyn CountryStore) -> Result<()> {
    let total = store.count().await?;
    let last = store.last_refreshed_at().await?;
    println!("{}", display_status(total, last));
    Ok(())
}

/// Refreshes in the foreground and renders the summary image before returning.
pub async fn refresh(
    engine: &RefreshEngine,
    store: &dyn CountryStore,
    summary: &SummaryImage,
) -> Result<()> {
    let pb = ui::new_spinner("Fetching countries and exchange rates...");
    let outcome = engine.reload().await;
    pb.finish_and_clear();
    let outcome = outcome?;

    println!(
        "Refreshed {} countries at {}",
        ui::style_text(&outcome.total.to_string(), ui::StyleType::TotalValue),
        outcome.refreshed_at.format("%Y-%m-%d %H:%M:%S UTC")
    );

    let countries = store.find_all(&CountryQuery::default()).await?;
    if let Some(path) = summary.generate(&countries).await? {
        println!(
            "Summary image: {}",
            ui::style_text(&path.display().to_string(), ui::StyleType::Subtle)
        );
    }
    Ok(())
}
