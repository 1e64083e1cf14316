//! Data sources: vendor API clients and synthetic generators.
//!
//! - `fitbit` / `whoop`: authenticated blocking HTTP clients
//! - `synthetic`: seeded generators standing in for the vendor APIs
//! - `http` / `timestamp`: shared request and timestamp plumbing

pub mod fitbit;
pub mod http;
pub mod synthetic;
pub mod timestamp;
pub mod whoop;

use chrono::FixedOffset;

use crate::config::Credentials;
use crate::domain::{DataType, DateWindow, DeviceKind, Record};
use crate::error::AppError;

pub use fitbit::FitbitClient;
pub use synthetic::{SyntheticConfig, SyntheticData};
pub use whoop::WhoopClient;

/// A logged-in vendor API.
pub trait VendorClient {
    /// Vendor name used in logs and errors.
    fn vendor(&self) -> &'static str;

    /// Fetch every record of `data_type` dated inside `window`.
    fn fetch(&self, data_type: DataType, window: &DateWindow) -> Result<Vec<Record>, AppError>;
}

/// Log in to the vendor behind `device`.
///
/// `timezone` only affects Whoop, whose sleeps and heart rate carry their own offsets.
pub fn connect(
    device: DeviceKind,
    credentials: &Credentials,
    timezone: Option<FixedOffset>,
) -> Result<Box<dyn VendorClient>, AppError> {
    Ok(match device {
        DeviceKind::FitbitSense => Box::new(FitbitClient::connect(credentials)?),
        DeviceKind::Whoop => Box::new(WhoopClient::connect(credentials)?.with_timezone(timezone)),
    })
}
