//! Application error type.
//!
//! Every failure carries the process exit code the `wear` binary reports:
//!
//! - `2`: bad input (unknown data type, bad window, missing configuration, local I/O)
//! - `3`: the vendor rejected our credentials
//! - `4`: the vendor could not be reached or answered with something unusable

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum AppError {
    #[error("Unsupported data type '{data_type}' for {device}.")]
    UnsupportedDataType { data_type: String, device: String },

    #[error("Invalid date window: {0}")]
    InvalidWindow(String),

    #[error(
        "Date window {start}..{end} lies outside the synthetic range {synthetic_start}..{synthetic_end}."
    )]
    WindowOutOfRange {
        start: String,
        end: String,
        synthetic_start: String,
        synthetic_end: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Authentication failed for {vendor}: {message}")]
    Authentication { vendor: String, message: String },

    #[error("{vendor} request failed: {message}")]
    Request { vendor: String, message: String },

    #[error("Malformed {vendor} response: {message}")]
    MalformedResponse { vendor: String, message: String },
}

impl AppError {
    pub fn auth(vendor: &str, message: impl Into<String>) -> Self {
        Self::Authentication {
            vendor: vendor.to_string(),
            message: message.into(),
        }
    }

    pub fn request(vendor: &str, message: impl Into<String>) -> Self {
        Self::Request {
            vendor: vendor.to_string(),
            message: message.into(),
        }
    }

    pub fn malformed(vendor: &str, message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            vendor: vendor.to_string(),
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::UnsupportedDataType { .. }
            | Self::InvalidWindow(_)
            | Self::WindowOutOfRange { .. }
            | Self::Config(_)
            | Self::Io(_) => 2,
            Self::Authentication { .. } => 3,
            Self::Request { .. } | Self::MalformedResponse { .. } => 4,
        }
    }
}
