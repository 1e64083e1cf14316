//! Device façade.
//!
//! A [`Device`] answers `get_data(type, window)` the same way whether its records
//! come from a logged-in vendor client or from the seeded synthetic generator:
//!
//! 1. the type name must parse into a [`DataType`] the device supports
//! 2. the window defaults to the configured one
//! 3. records come from the vendor (real) or the cached synthetic series
//! 4. the result is cut down to the records dated inside the window

use std::cell::OnceCell;
use std::fmt;

use tracing::{debug, info};

use crate::config::{Credentials, DeviceConfig};
use crate::data::{self, SyntheticConfig, SyntheticData, VendorClient};
use crate::domain::{DataSource, DataType, DateWindow, DeviceKind, Record};
use crate::error::AppError;

enum Source {
    /// Generated on first use, then reused for every call.
    Synthetic(OnceCell<SyntheticData>),
    Real(Box<dyn VendorClient>),
}

pub struct Device {
    kind: DeviceKind,
    config: DeviceConfig,
    source: Source,
}

/// Look a device up by registry key (`fitbit/fitbit_sense`) or CLI name (`whoop`).
pub fn get_device(key: &str, config: DeviceConfig) -> Result<Device, AppError> {
    Ok(Device::new(key.parse()?, config))
}

impl Device {
    /// A device serving synthetic data.
    pub fn new(kind: DeviceKind, config: DeviceConfig) -> Self {
        Self {
            kind,
            config,
            source: Source::Synthetic(OnceCell::new()),
        }
    }

    /// A device serving real data through an existing client.
    pub fn with_client(kind: DeviceKind, config: DeviceConfig, client: Box<dyn VendorClient>) -> Self {
        Self {
            kind,
            config,
            source: Source::Real(client),
        }
    }

    /// Log in to the vendor and switch to real data.
    pub fn authenticate(&mut self, credentials: &Credentials) -> Result<(), AppError> {
        if credentials.device() != self.kind {
            return Err(AppError::Config(format!(
                "{} credentials cannot be used with a {} device.",
                credentials.device(),
                self.kind
            )));
        }
        let client = data::connect(self.kind, credentials, self.config.timezone())?;
        info!(device = %self.kind, vendor = client.vendor(), "authenticated");
        self.source = Source::Real(client);
        Ok(())
    }

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn source(&self) -> DataSource {
        match self.source {
            Source::Synthetic(_) => DataSource::Synthetic,
            Source::Real(_) => DataSource::Real,
        }
    }

    pub fn supported_types(&self) -> &'static [DataType] {
        self.kind.supported_types()
    }

    /// Resolve a type name against this device's supported set.
    pub fn data_type(&self, name: &str) -> Result<DataType, AppError> {
        let unsupported = || AppError::UnsupportedDataType {
            data_type: name.to_string(),
            device: self.kind.display_name().to_string(),
        };
        let data_type: DataType = name.parse().map_err(|_| unsupported())?;
        if !self.kind.supports(data_type) {
            return Err(unsupported());
        }
        Ok(data_type)
    }

    /// Records of the named type inside `params` (or the configured default window).
    pub fn get_data(&self, data_type: &str, params: Option<&DateWindow>) -> Result<Vec<Record>, AppError> {
        let data_type = self.data_type(data_type)?;
        self.get(data_type, params)
    }

    /// Typed variant of [`Device::get_data`].
    pub fn get(&self, data_type: DataType, params: Option<&DateWindow>) -> Result<Vec<Record>, AppError> {
        if !self.kind.supports(data_type) {
            return Err(AppError::UnsupportedDataType {
                data_type: data_type.name().to_string(),
                device: self.kind.display_name().to_string(),
            });
        }
        let window = params.copied().unwrap_or_else(|| self.config.default_window());
        debug!(device = %self.kind, %data_type, %window, source = ?self.source(), "get_data");

        match &self.source {
            Source::Real(client) => {
                let records = client.fetch(data_type, &window)?;
                Ok(filter_window(records, data_type, &window))
            }
            Source::Synthetic(cache) => {
                let synthetic = self.config.synthetic_window();
                if !synthetic.contains_window(&window) {
                    return Err(AppError::WindowOutOfRange {
                        start: window.start().to_string(),
                        end: window.end().to_string(),
                        synthetic_start: synthetic.start().to_string(),
                        synthetic_end: synthetic.end().to_string(),
                    });
                }
                let (first, last) = synthetic.offsets_of(&window);
                debug!(first, last, "synthetic day offsets");

                let series = self
                    .synthetic_data(cache)?
                    .get(&data_type)
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                let field = data_type.date_field();
                Ok(series
                    .iter()
                    .filter(|r| dated_in(r, field, &window))
                    .cloned()
                    .collect())
            }
        }
    }

    fn synthetic_data<'a>(&self, cache: &'a OnceCell<SyntheticData>) -> Result<&'a SyntheticData, AppError> {
        if let Some(data) = cache.get() {
            return Ok(data);
        }
        let config = SyntheticConfig::new(self.config.seed(), self.config.synthetic_window())
            .with_timezone(self.config.timezone());
        let generated = data::synthetic::generate(self.kind, &config)?;
        Ok(cache.get_or_init(|| generated))
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("kind", &self.kind)
            .field("config", &self.config)
            .field("source", &self.source())
            .finish()
    }
}

/// Keep the records dated inside `window`, in their original order.
pub fn filter_window(records: Vec<Record>, data_type: DataType, window: &DateWindow) -> Vec<Record> {
    let field = data_type.date_field();
    records.into_iter().filter(|r| dated_in(r, field, window)).collect()
}

fn dated_in(record: &Record, field: &str, window: &DateWindow) -> bool {
    record.date(field).is_some_and(|d| window.contains(d))
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use chrono::NaiveDate;

    use super::*;
    use crate::domain::FieldValue;

    fn window(start: &str, end: &str) -> DateWindow {
        DateWindow::parse(start, end).unwrap()
    }

    /// Vendor stand-in that records its calls and pads the answer with a day on each side.
    struct FakeVendor {
        calls: Rc<RefCell<Vec<(DataType, DateWindow)>>>,
    }

    impl VendorClient for FakeVendor {
        fn vendor(&self) -> &'static str {
            "Fake"
        }

        fn fetch(&self, data_type: DataType, window: &DateWindow) -> Result<Vec<Record>, AppError> {
            self.calls.borrow_mut().push((data_type, *window));
            let first = window.start().pred_opt().unwrap();
            let last = window.end().succ_opt().unwrap();
            Ok(DateWindow::new(first, last)
                .unwrap()
                .days()
                .map(|d| Record::new().with("dateTime", d).with("value", 100_i64))
                .collect())
        }
    }

    #[test]
    fn steps_window_has_a_numeric_value_per_day() {
        let device = Device::new(DeviceKind::FitbitSense, DeviceConfig::default());
        let records = device
            .get_data("steps", Some(&window("2022-04-24", "2022-04-28")))
            .unwrap();

        let dates: Vec<NaiveDate> = records.iter().map(|r| r.date("dateTime").unwrap()).collect();
        let expected: Vec<NaiveDate> = window("2022-04-24", "2022-04-28").days().collect();
        assert_eq!(dates, expected);
        assert!(records.iter().all(|r| r.get("value").is_some_and(FieldValue::is_numeric)));
    }

    #[test]
    fn every_supported_type_returns_records_with_its_fields() {
        let config = DeviceConfig::with_synthetic(0, "2022-06-10", "2022-06-11").unwrap();
        let params = window("2022-06-10", "2022-06-11");
        let expected_field = |t: DataType| match t {
            DataType::Sleep => "minutesAsleep",
            DataType::Hrv => "dailyRmssd",
            DataType::Cycles => "recovery_score",
            DataType::Sleeps => "sleep_score",
            DataType::Workouts => "average_hr",
            DataType::HeartRate => "heart_rate",
            DataType::HealthMetrics => "rhr.current_value",
            _ => "value",
        };

        for kind in DeviceKind::ALL {
            let device = Device::new(kind, config.clone());
            for t in kind.supported_types() {
                let records = device.get_data(t.name(), Some(&params)).unwrap();
                assert!(!records.is_empty(), "{kind}: no {t} records");
                assert!(records.iter().all(|r| r.contains(expected_field(*t))), "{kind}: {t}");
            }
        }
    }

    #[test]
    fn every_day_of_the_synthetic_range_has_every_type() {
        let config = DeviceConfig::default();
        for kind in DeviceKind::ALL {
            let device = Device::new(kind, config.clone());
            for day in config.synthetic_window().days() {
                let params = DateWindow::new(day, day).unwrap();
                for t in kind.supported_types() {
                    let records = device.get(*t, Some(&params)).unwrap();
                    assert!(!records.is_empty(), "{kind}: no {t} records on {day}");
                }
            }
        }
    }

    #[test]
    fn sleep_across_custom_synthetic_ranges() {
        for (start, end) in [("2009-11-30", "2009-12-01"), ("2021-04-04", "2021-04-05"), ("2022-06-10", "2022-06-11")] {
            let config = DeviceConfig::with_synthetic(0, start, end).unwrap();
            let device = Device::new(DeviceKind::FitbitSense, config);
            let records = device.get_data("sleep", Some(&window(start, end))).unwrap();
            assert_eq!(records.len(), 2, "{start}..{end}");
            assert!(records.iter().all(|r| r.get("minutesAsleep").is_some_and(FieldValue::is_numeric)));
        }
    }

    #[test]
    fn filtering_returns_exactly_the_window_in_order() {
        let device = Device::new(DeviceKind::FitbitSense, DeviceConfig::default());
        let params = window("2022-05-30", "2022-06-02");
        let records = device.get_data("heart_rate_day", Some(&params)).unwrap();
        assert_eq!(records.len(), 4 * 1440);
        assert!(records.iter().all(|r| params.contains(r.date("dateTime").unwrap())));
        let FieldValue::Timestamp(first) = records[0].get("dateTime").unwrap() else {
            panic!("dateTime is not a timestamp");
        };
        assert_eq!(first.date_naive(), params.start());
    }

    #[test]
    fn repeated_calls_are_identical() {
        let a = Device::new(DeviceKind::Whoop, DeviceConfig::default());
        let b = Device::new(DeviceKind::Whoop, DeviceConfig::default());
        let params = window("2022-04-24", "2022-04-28");
        let first = a.get_data("cycles", Some(&params)).unwrap();
        assert_eq!(first, a.get_data("cycles", Some(&params)).unwrap());
        assert_eq!(first, b.get_data("cycles", Some(&params)).unwrap());
    }

    #[test]
    fn default_window_is_used_without_params() {
        let device = Device::new(DeviceKind::FitbitSense, DeviceConfig::default());
        let records = device.get_data("sleep", None).unwrap();
        assert_eq!(records.len(), 5);
        assert_eq!(records[0].date("dateOfSleep"), NaiveDate::from_ymd_opt(2022, 4, 24));
    }

    #[test]
    fn unsupported_types_are_rejected() {
        let device = Device::new(DeviceKind::FitbitSense, DeviceConfig::default());
        assert!(matches!(
            device.get_data("calories", None),
            Err(AppError::UnsupportedDataType { .. })
        ));
        // Known type, wrong device.
        assert!(matches!(
            device.get_data("cycles", None),
            Err(AppError::UnsupportedDataType { .. })
        ));
    }

    #[test]
    fn windows_outside_synthetic_range_are_rejected() {
        let device = Device::new(DeviceKind::FitbitSense, DeviceConfig::default());
        let err = device
            .get_data("steps", Some(&window("2022-06-15", "2022-06-20")))
            .unwrap_err();
        assert!(matches!(err, AppError::WindowOutOfRange { .. }));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn real_mode_delegates_then_filters() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let client = FakeVendor { calls: Rc::clone(&calls) };
        let device = Device::with_client(DeviceKind::FitbitSense, DeviceConfig::default(), Box::new(client));
        assert_eq!(device.source(), DataSource::Real);

        // Real data is not bound to the synthetic range.
        let params = window("2023-01-10", "2023-01-12");
        let records = device.get_data("steps", Some(&params)).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(calls.borrow().as_slice(), &[(DataType::Steps, params)]);

        device.get_data("distance", None).unwrap();
        assert_eq!(calls.borrow()[1], (DataType::Distance, DeviceConfig::default().default_window()));
    }

    #[test]
    fn mismatched_credentials_are_rejected_before_login() {
        let mut device = Device::new(DeviceKind::FitbitSense, DeviceConfig::default());
        let creds = Credentials::Whoop {
            email: "me@example.com".into(),
            password: "secret".into(),
        };
        assert!(matches!(device.authenticate(&creds), Err(AppError::Config(_))));
        assert_eq!(device.source(), DataSource::Synthetic);
    }

    #[test]
    fn get_device_accepts_registry_keys() {
        let device = get_device("whoop/whoop_user", DeviceConfig::default()).unwrap();
        assert_eq!(device.kind(), DeviceKind::Whoop);
        assert!(get_device("polar/vantage", DeviceConfig::default()).is_err());
    }
}
