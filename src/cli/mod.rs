//! Terminal front end for the one-shot commands.

pub mod countries;
pub mod setup;
pub mod ui;
