//! `wearable-data` library crate.
//!
//! The binary (`wear`) is a thin wrapper around this library so that:
//!
//! - devices can be used directly from Rust code without spawning processes
//! - synthetic and real data go through the same `Device::get_data` call
//! - vendor clients, generators and presentation stay in separate modules

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod device;
pub mod domain;
pub mod error;
pub mod io;
pub mod logging;
pub mod report;

pub use config::{Credentials, DeviceConfig};
pub use device::{Device, get_device};
pub use domain::{DataSource, DataType, DateWindow, DeviceKind, FieldValue, Record};
pub use error::AppError;
