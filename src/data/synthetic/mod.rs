//! Seeded synthetic data generation.
//!
//! Generators take everything they need through [`SyntheticConfig`]; there is no
//! process-wide RNG. The same config always yields the same records.

pub mod fitbit;
pub mod whoop;

use std::collections::BTreeMap;

use chrono::FixedOffset;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use tracing::info;

use crate::domain::{DataType, DateWindow, DeviceKind, Record};
use crate::error::AppError;

/// Every data type of a device, each in date order.
pub type SyntheticData = BTreeMap<DataType, Vec<Record>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntheticConfig {
    pub seed: u64,
    pub window: DateWindow,
    /// Display offset for generated Whoop sleeps and heart rate.
    pub timezone: Option<FixedOffset>,
}

impl SyntheticConfig {
    pub fn new(seed: u64, window: DateWindow) -> Self {
        Self {
            seed,
            window,
            timezone: None,
        }
    }

    pub fn with_timezone(mut self, timezone: Option<FixedOffset>) -> Self {
        self.timezone = timezone;
        self
    }
}

/// Generator for each device, keyed the same way as the device tables.
pub fn generator(device: DeviceKind) -> fn(&SyntheticConfig) -> Result<SyntheticData, AppError> {
    match device {
        DeviceKind::FitbitSense => fitbit::generate,
        DeviceKind::Whoop => whoop::generate,
    }
}

pub fn generate(device: DeviceKind, config: &SyntheticConfig) -> Result<SyntheticData, AppError> {
    info!(%device, seed = config.seed, window = %config.window, "generating synthetic data");
    let data = generator(device)(config)?;
    for (data_type, records) in &data {
        tracing::debug!(%data_type, records = records.len(), "synthetic series ready");
    }
    Ok(data)
}

/// Seeded noise source shared by the generators.
pub(crate) struct Noise {
    rng: StdRng,
    normal: Normal<f64>,
}

impl Noise {
    pub(crate) fn new(seed: u64) -> Result<Self, AppError> {
        let normal = Normal::new(0.0, 1.0)
            .map_err(|e| AppError::Config(format!("Noise distribution error: {e}")))?;
        Ok(Self {
            rng: StdRng::seed_from_u64(seed),
            normal,
        })
    }

    pub(crate) fn normal(&mut self, mean: f64, sd: f64) -> f64 {
        mean + sd * self.normal.sample(&mut self.rng)
    }

    /// Normal draw clamped to `[lo, hi]`.
    pub(crate) fn clamped(&mut self, mean: f64, sd: f64, lo: f64, hi: f64) -> f64 {
        self.normal(mean, sd).clamp(lo, hi)
    }

    /// Clamped normal draw rounded to a whole number.
    pub(crate) fn count(&mut self, mean: f64, sd: f64, lo: f64, hi: f64) -> i64 {
        self.clamped(mean, sd, lo, hi).round() as i64
    }

    pub(crate) fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        self.rng.gen_range(lo..hi)
    }

    pub(crate) fn chance(&mut self, p: f64) -> bool {
        self.rng.r#gen::<f64>() < p
    }

    pub(crate) fn pick<T: Copy>(&mut self, items: &[T]) -> T {
        items[self.rng.gen_range(0..items.len())]
    }
}

pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10_f64.powi(places);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noise_is_reproducible_per_seed() {
        let mut a = Noise::new(42).unwrap();
        let mut b = Noise::new(42).unwrap();
        let mut c = Noise::new(43).unwrap();
        let xs: Vec<f64> = (0..5).map(|_| a.normal(0.0, 1.0)).collect();
        let ys: Vec<f64> = (0..5).map(|_| b.normal(0.0, 1.0)).collect();
        let zs: Vec<f64> = (0..5).map(|_| c.normal(0.0, 1.0)).collect();
        assert_eq!(xs, ys);
        assert_ne!(xs, zs);
    }

    #[test]
    fn clamped_draws_stay_in_bounds() {
        let mut noise = Noise::new(1).unwrap();
        for _ in 0..1000 {
            let v = noise.clamped(0.0, 100.0, -5.0, 5.0);
            assert!((-5.0..=5.0).contains(&v));
        }
    }

    #[test]
    fn round_to_keeps_requested_places() {
        assert_eq!(round_to(3.14159, 2), 3.14);
        assert_eq!(round_to(2.5, 0), 3.0);
    }

    #[test]
    fn every_device_generates_every_supported_type() {
        let window = DateWindow::parse("2022-04-24", "2022-04-25").unwrap();
        let config = SyntheticConfig::new(0, window);
        for device in DeviceKind::ALL {
            let data = generate(device, &config).unwrap();
            let types: Vec<DataType> = data.keys().copied().collect();
            let mut expected = device.supported_types().to_vec();
            expected.sort();
            assert_eq!(types, expected, "{device}");
        }
    }
}
