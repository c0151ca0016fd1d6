//! Domain types and the abstractions the rest of the crate is built on

pub mod config;
pub mod country;
pub mod error;
pub mod log;
pub mod query;
pub mod source;
pub mod store;

// Re-export main types for cleaner imports
pub use country::{Country, NewCountry};
pub use error::CountryError;
pub use query::{CountryQuery, SortDirection, SortField, SortSpec};
pub use source::{CountrySource, RateSource, RateTable, UpstreamCountry};
pub use store::CountryStore;
