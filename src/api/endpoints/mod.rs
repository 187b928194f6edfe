//! API endpoint handlers. Each handler is a thin adapter over `Actions`.

pub mod diagnosis;
pub mod health;
pub mod image;
pub mod report;
