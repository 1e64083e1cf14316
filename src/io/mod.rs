//! Input/output helpers.
//!
//! - record exports (CSV/JSON) (`export`)

pub mod export;

pub use export::*;
