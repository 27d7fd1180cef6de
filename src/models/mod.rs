//! Domain models shared across the whole service.

pub mod mention;
pub mod position;
pub mod quote;
pub mod strategy;

pub use mention::CompanyMention;
pub use position::Position;
pub use quote::{HistoricalPrices, Quote};
pub use strategy::{Action, Strategy};
