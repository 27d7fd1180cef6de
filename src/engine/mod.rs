//! Trading core: calendar, decisions, sizing, execution and closeout.

pub mod budget;
pub mod calendar;
pub mod closeout;
pub mod decision;
pub mod executor;
pub mod history;
