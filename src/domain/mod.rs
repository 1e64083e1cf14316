//! Domain types used throughout the crate.
//!
//! This module defines:
//!
//! - the closed set of data types and devices (`DataType`, `DeviceKind`)
//! - flat data records (`Record`, `FieldValue`)
//! - inclusive calendar windows (`DateWindow`)

pub mod types;
pub mod window;

pub use types::*;
pub use window::*;
