//! HTTP clients for the upstream country and exchange rate APIs.

pub mod exchange_rates;
pub mod rest_countries;

pub use exchange_rates::ExchangeRateProvider;
pub use rest_countries::RestCountriesProvider;
