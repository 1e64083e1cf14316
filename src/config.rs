//! Device configuration and vendor credentials.

use std::env;

use chrono::{FixedOffset, NaiveDate};

use crate::domain::{DateWindow, DeviceKind};
use crate::error::AppError;

pub const DEFAULT_SEED: u64 = 0;
pub const DEFAULT_SYNTHETIC_START: &str = "2022-03-01";
pub const DEFAULT_SYNTHETIC_END: &str = "2022-06-17";
pub const DEFAULT_WINDOW_START: &str = "2022-04-24";
pub const DEFAULT_WINDOW_END: &str = "2022-04-28";

pub const FITBIT_REDIRECT_URI: &str = "http://localhost:8080/callback";

/// Construction-time settings for a device. Never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    seed: u64,
    synthetic: DateWindow,
    default_window: DateWindow,
    /// Offset Whoop sleeps and heart rate are shown in; vendor offsets when unset.
    timezone: Option<FixedOffset>,
}

impl DeviceConfig {
    pub fn new(seed: u64, synthetic: DateWindow, default_window: DateWindow) -> Self {
        Self {
            seed,
            synthetic,
            default_window,
            timezone: None,
        }
    }

    pub fn with_timezone(mut self, timezone: Option<FixedOffset>) -> Self {
        self.timezone = timezone;
        self
    }

    /// Config with the given seed and synthetic range; the default window stays as shipped.
    pub fn with_synthetic(seed: u64, start: &str, end: &str) -> Result<Self, AppError> {
        Ok(Self {
            seed,
            synthetic: DateWindow::parse(start, end)?,
            ..Self::default()
        })
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn synthetic_window(&self) -> DateWindow {
        self.synthetic
    }

    pub fn default_window(&self) -> DateWindow {
        self.default_window
    }

    pub fn timezone(&self) -> Option<FixedOffset> {
        self.timezone
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            synthetic: shipped_window(2022, (3, 1), (6, 17)),
            default_window: shipped_window(2022, (4, 24), (4, 28)),
            timezone: None,
        }
    }
}

fn shipped_window(year: i32, start: (u32, u32), end: (u32, u32)) -> DateWindow {
    let start = NaiveDate::from_ymd_opt(year, start.0, start.1).unwrap_or(NaiveDate::MIN);
    let end = NaiveDate::from_ymd_opt(year, end.0, end.1).unwrap_or(start);
    DateWindow::new(start, end).unwrap_or_else(|_| DateWindow::single_day(start))
}

/// What a vendor needs to hand out an access token.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// An already-issued Fitbit OAuth access token.
    FitbitToken { access_token: String },
    /// A Fitbit authorization code to exchange for a token.
    FitbitAuthCode {
        client_id: String,
        client_secret: String,
        code: String,
        redirect_uri: String,
    },
    Whoop { email: String, password: String },
}

impl Credentials {
    /// Load credentials for `device` from the environment (and `.env`, if present).
    ///
    /// Returns `Ok(None)` when the required variables are not set so callers can
    /// fall back to prompting.
    pub fn from_env(device: DeviceKind) -> Result<Option<Self>, AppError> {
        dotenvy::dotenv().ok();
        Ok(match device {
            DeviceKind::FitbitSense => {
                if let Some(access_token) = non_empty_var("FITBIT_ACCESS_TOKEN") {
                    Some(Self::FitbitToken { access_token })
                } else {
                    match (
                        non_empty_var("FITBIT_CLIENT_ID"),
                        non_empty_var("FITBIT_CLIENT_SECRET"),
                        non_empty_var("FITBIT_AUTH_CODE"),
                    ) {
                        (Some(client_id), Some(client_secret), Some(code)) => Some(Self::FitbitAuthCode {
                            client_id,
                            client_secret,
                            code,
                            redirect_uri: non_empty_var("FITBIT_REDIRECT_URI")
                                .unwrap_or_else(|| FITBIT_REDIRECT_URI.to_string()),
                        }),
                        _ => None,
                    }
                }
            }
            DeviceKind::Whoop => match (non_empty_var("WHOOP_EMAIL"), non_empty_var("WHOOP_PASSWORD")) {
                (Some(email), Some(password)) => Some(Self::Whoop { email, password }),
                _ => None,
            },
        })
    }

    pub fn device(&self) -> DeviceKind {
        match self {
            Self::FitbitToken { .. } | Self::FitbitAuthCode { .. } => DeviceKind::FitbitSense,
            Self::Whoop { .. } => DeviceKind::Whoop,
        }
    }
}

// Secrets stay out of logs and error messages.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FitbitToken { .. } => f.debug_struct("FitbitToken").finish_non_exhaustive(),
            Self::FitbitAuthCode { client_id, .. } => f
                .debug_struct("FitbitAuthCode")
                .field("client_id", client_id)
                .finish_non_exhaustive(),
            Self::Whoop { email, .. } => f.debug_struct("Whoop").field("email", email).finish_non_exhaustive(),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
