//! Shared "get" pipeline: build the device, log in if asked, fetch one type.
//!
//! Kept apart from `app` so the workflow can be exercised without printing.

use tracing::{debug, info};

use crate::cli::GetArgs;
use crate::cli::prompt::prompt_for_credentials;
use crate::config::{Credentials, DeviceConfig};
use crate::data::timestamp::parse_utc_offset;
use crate::device::Device;
use crate::domain::{DataType, DateWindow, DeviceKind, Record};
use crate::error::AppError;

/// Everything a `wear get` run produced.
#[derive(Debug)]
pub struct FetchOutput {
    pub device: Device,
    pub data_type: DataType,
    pub window: DateWindow,
    pub records: Vec<Record>,
}

/// Device config from the CLI flags.
pub fn device_config(args: &GetArgs) -> Result<DeviceConfig, AppError> {
    let synthetic = DateWindow::parse(&args.synthetic_start, &args.synthetic_end)?;
    let window = DateWindow::parse(&args.start, &args.end)?;
    let timezone = args.timezone.as_deref().map(parse_utc_offset).transpose()?;
    Ok(DeviceConfig::new(args.seed, synthetic, window).with_timezone(timezone))
}

/// Credentials from the environment, else from the terminal.
pub fn load_credentials(device: DeviceKind) -> Result<Credentials, AppError> {
    match Credentials::from_env(device)? {
        Some(credentials) => {
            debug!(%device, "using credentials from the environment");
            Ok(credentials)
        }
        None => prompt_for_credentials(device),
    }
}

/// Execute a `get` run end to end.
pub fn run_get(args: &GetArgs) -> Result<FetchOutput, AppError> {
    let config = device_config(args)?;
    let mut device = Device::new(args.device, config);
    // Reject bad type names before asking anyone for a password.
    let data_type = device.data_type(&args.data_type)?;

    if args.real {
        device.authenticate(&load_credentials(args.device)?)?;
    }
    fetch(device, data_type)
}

/// Fetch over the device's configured window.
pub fn fetch(device: Device, data_type: DataType) -> Result<FetchOutput, AppError> {
    let window = device.config().default_window();
    let records = device.get(data_type, Some(&window))?;
    info!(device = %device.kind(), %data_type, %window, records = records.len(), "fetched");
    Ok(FetchOutput {
        device,
        data_type,
        window,
        records,
    })
}
