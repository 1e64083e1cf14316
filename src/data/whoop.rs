//! Whoop API client.
//!
//! Cycles, sleeps and workouts all come out of the same `cycles` payload; heart
//! rate has its own endpoint limited to about a week per request; health metrics
//! are fetched per cycle from the coaching service.

use chrono::{FixedOffset, NaiveDate, Utc};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::Credentials;
use crate::data::VendorClient;
use crate::data::http::{self, ApiSession};
use crate::data::timestamp::{from_unix_millis, localize, normalize_whoop_timestamp};
use crate::domain::{DataType, DateWindow, Record};
use crate::error::AppError;

const VENDOR: &str = "Whoop";
pub const API_BASE: &str = "https://api-7.whoop.com";
pub const HEALTH_METRICS_URL: &str = "https://api.prod.whoop.com/coaching-service/v1/health/metrics";

const HEART_RATE_MAX_DAYS: i64 = 7;
const SLEEP_BOUNDS: [&str; 2] = ["time_upper_bound", "time_lower_bound"];
const HR_ZONES: usize = 6;

pub struct WhoopClient {
    session: ApiSession,
    user_id: i64,
    health_metrics_url: String,
    /// Offset sleep bounds and heart-rate ticks are shown in; vendor offsets otherwise.
    timezone: Option<FixedOffset>,
}

impl WhoopClient {
    pub fn connect(credentials: &Credentials) -> Result<Self, AppError> {
        match credentials {
            Credentials::Whoop { email, password } => Self::login(API_BASE, HEALTH_METRICS_URL, email, password),
            _ => Err(AppError::Config(
                "Fitbit credentials cannot be used with a Whoop device.".to_string(),
            )),
        }
    }

    /// Log in with a password grant, keeping the bearer token and user id.
    pub fn login(base_url: &str, health_metrics_url: &str, email: &str, password: &str) -> Result<Self, AppError> {
        let client = Client::new();
        let url = format!("{}/oauth/token", base_url.trim_end_matches('/'));
        info!(%url, "logging in to Whoop");

        let resp = http::send(
            VENDOR,
            client.post(&url).json(&json!({
                "grant_type": "password",
                "issueRefresh": false,
                "password": password,
                "username": email,
            })),
        )?;

        if resp.status() != reqwest::StatusCode::OK {
            return Err(AppError::auth(VENDOR, "Credentials rejected"));
        }

        let login: LoginResponse = resp
            .json()
            .map_err(|e| AppError::malformed(VENDOR, format!("failed to parse login response: {e}")))?;

        Ok(Self {
            session: ApiSession::new(client, VENDOR, base_url, login.access_token),
            user_id: login.user.id,
            health_metrics_url: health_metrics_url.trim_end_matches('/').to_string(),
            timezone: None,
        })
    }

    pub fn with_timezone(mut self, timezone: Option<FixedOffset>) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    fn get_cycles(&self, window: &DateWindow) -> Result<Vec<Cycle>, AppError> {
        let path = format!("users/{}/cycles", self.user_id);
        self.session.get_json(&path, &range_params(window))
    }

    fn get_heart_rate(&self, window: &DateWindow) -> Result<Vec<Record>, AppError> {
        let path = format!("users/{}/metrics/heart_rate", self.user_id);
        let parts = heart_rate_windows(window, Utc::now().date_naive());
        debug!(%window, requests = parts.len(), "splitting Whoop heart rate request");

        let mut ticks = Vec::new();
        for part in &parts {
            let mut page: HeartRateResponse = self.session.get_json(&path, &range_params(part))?;
            ticks.append(&mut page.values);
        }
        heart_rate_records(ticks, self.timezone)
    }

    fn get_health_metrics(&self, window: &DateWindow) -> Result<Vec<Record>, AppError> {
        let cycles = self.get_cycles(window)?;
        let mut out = Vec::with_capacity(cycles.len());
        for cycle in &cycles {
            let url = format!("{}/{}", self.health_metrics_url, cycle.id);
            let metrics: HealthMetricsResponse = self.session.get_json_absolute(&url, &[])?;
            out.push(health_metrics_record(cycle, metrics)?);
        }
        Ok(out)
    }
}

impl VendorClient for WhoopClient {
    fn vendor(&self) -> &'static str {
        VENDOR
    }

    fn fetch(&self, data_type: DataType, window: &DateWindow) -> Result<Vec<Record>, AppError> {
        match data_type {
            DataType::Cycles => Ok(cycle_records(&self.get_cycles(window)?)),
            DataType::Sleeps => sleep_records(&self.get_cycles(window)?, self.timezone),
            DataType::Workouts => workout_records(&self.get_cycles(window)?),
            DataType::HeartRate => self.get_heart_rate(window),
            DataType::HealthMetrics => self.get_health_metrics(window),
            other => Err(AppError::UnsupportedDataType {
                data_type: other.name().to_string(),
                device: VENDOR.to_string(),
            }),
        }
    }
}

/// `start`/`end` query parameters covering whole days of `window`.
fn range_params(window: &DateWindow) -> Vec<(&'static str, String)> {
    let end = window.end().succ_opt().unwrap_or(window.end());
    vec![("start", whoop_instant(window.start())), ("end", whoop_instant(end))]
}

fn whoop_instant(day: NaiveDate) -> String {
    format!("{day}T00:00:00.000Z")
}

/// Week-long request windows, never reaching past `today`.
fn heart_rate_windows(window: &DateWindow, today: NaiveDate) -> Vec<DateWindow> {
    match window.clamp_end(today) {
        Some(clamped) => clamped.split(HEART_RATE_MAX_DAYS),
        None => {
            warn!(%window, "heart rate window starts in the future");
            Vec::new()
        }
    }
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    access_token: String,
    user: LoginUser,
}

#[derive(Debug, Deserialize)]
struct LoginUser {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct Cycle {
    id: i64,
    days: Vec<String>,
    #[serde(default)]
    recovery: Option<Recovery>,
    #[serde(default)]
    sleep: Option<CycleSleep>,
    #[serde(default)]
    strain: Option<Strain>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Recovery {
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    heart_rate_variability_rmssd: Option<f64>,
    #[serde(default)]
    resting_heart_rate: Option<f64>,
    #[serde(default)]
    score: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CycleSleep {
    #[serde(default)]
    id: Option<i64>,
    #[serde(default)]
    naps: Vec<Sleep>,
    #[serde(default)]
    sleeps: Vec<Sleep>,
    #[serde(default)]
    need_breakdown: Option<NeedBreakdown>,
    #[serde(default)]
    quality_duration: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct NeedBreakdown {
    baseline: f64,
    debt: f64,
    strain: f64,
    total: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Sleep {
    id: i64,
    cycles_count: Option<i64>,
    disturbance_count: Option<i64>,
    #[serde(default)]
    timezone_offset: Option<String>,
    during: During,
    is_nap: bool,
    in_bed_duration: Option<f64>,
    light_sleep_duration: Option<f64>,
    latency_duration: Option<f64>,
    no_data_duration: Option<f64>,
    rem_sleep_duration: Option<f64>,
    respiratory_rate: Option<f64>,
    score: Option<f64>,
    sleep_efficiency: Option<f64>,
    sleep_consistency: Option<f64>,
    slow_wave_sleep_duration: Option<f64>,
    wake_duration: Option<f64>,
    quality_duration: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct During {
    lower: String,
    upper: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Strain {
    average_heart_rate: Option<f64>,
    kilojoules: Option<f64>,
    max_heart_rate: Option<f64>,
    score: Option<f64>,
    #[serde(default)]
    workouts: Vec<Workout>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Workout {
    id: i64,
    average_heart_rate: Option<f64>,
    cumulative_workout_strain: Option<f64>,
    during: During,
    kilojoules: Option<f64>,
    score: Option<f64>,
    sport_id: i64,
    source: Option<String>,
    zones: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct HeartRateResponse {
    values: Vec<HeartRateTick>,
}

#[derive(Debug, Deserialize)]
struct HeartRateTick {
    data: i64,
    time: i64,
}

#[derive(Debug, Deserialize)]
struct HealthMetricsResponse {
    health_monitor_metrics: Vec<HealthMetric>,
}

#[derive(Debug, Deserialize)]
struct HealthMetric {
    metric: String,
    current_value: Option<f64>,
    current_deviation: Option<f64>,
}

fn cycle_day(cycle: &Cycle) -> Result<NaiveDate, AppError> {
    let raw = cycle
        .days
        .first()
        .ok_or_else(|| AppError::malformed(VENDOR, format!("cycle {} has no days", cycle.id)))?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| AppError::malformed(VENDOR, format!("invalid cycle day '{raw}': {e}")))
}

/// Cycles without a scored recovery or a located sleep are skipped.
fn cycle_records(cycles: &[Cycle]) -> Vec<Record> {
    let mut out = Vec::with_capacity(cycles.len());
    for cycle in cycles {
        let (Some(recovery), Some(sleep)) = (&cycle.recovery, &cycle.sleep) else {
            continue;
        };
        let Some(rmssd) = recovery.heart_rate_variability_rmssd else {
            continue;
        };
        let has_timezone = sleep
            .sleeps
            .first()
            .is_some_and(|s| s.timezone_offset.as_deref().is_some_and(|tz| !tz.is_empty()));
        if recovery.timestamp.is_none() || !has_timezone {
            continue;
        }
        let Ok(day) = cycle_day(cycle) else {
            warn!(cycle = cycle.id, "skipping cycle without a valid day");
            continue;
        };

        let need = sleep.need_breakdown.as_ref();
        let strain = cycle.strain.as_ref();
        out.push(
            Record::new()
                .with("id", cycle.id)
                .with("day", day)
                .with("rMSSD", rmssd)
                .with("resting_hr", recovery.resting_heart_rate)
                .with("recovery_score", recovery.score)
                .with("n_naps", sleep.naps.len() as i64)
                .with("sleep_need_baseline", need.map_or(0.0, |n| n.baseline))
                .with("sleep_debt", need.map_or(0.0, |n| n.debt))
                .with("sleep_need_strain", need.map_or(0.0, |n| n.strain))
                .with("sleep_need_total", need.map_or(0.0, |n| n.total))
                .with("sleep_quality_duration", sleep.quality_duration)
                .with("avg_hr", strain.and_then(|s| s.average_heart_rate))
                .with("kilojoules", strain.and_then(|s| s.kilojoules))
                .with("max_hr", strain.and_then(|s| s.max_heart_rate))
                .with("strain_score", strain.and_then(|s| s.score)),
        );
    }
    out
}

fn sleep_records(cycles: &[Cycle], timezone: Option<FixedOffset>) -> Result<Vec<Record>, AppError> {
    let mut out = Vec::new();
    for cycle in cycles {
        let Some(sleep) = &cycle.sleep else { continue };
        if sleep.id.is_none() {
            continue;
        }
        for s in sleep.naps.iter().chain(sleep.sleeps.iter()) {
            let tz = s.timezone_offset.as_deref().unwrap_or("+0000");
            let mut record = Record::new()
                .with("cycle_id", cycle.id)
                .with("sleep_id", s.id)
                .with("cycles_count", s.cycles_count)
                .with("disturbance_count", s.disturbance_count)
                .with("time_upper_bound", normalize_whoop_timestamp(&s.during.upper, tz)?)
                .with("time_lower_bound", normalize_whoop_timestamp(&s.during.lower, tz)?)
                .with("is_nap", s.is_nap)
                .with("in_bed_duration", s.in_bed_duration)
                .with("light_sleep_duration", s.light_sleep_duration)
                .with("latency_duration", s.latency_duration)
                .with("no_data_duration", s.no_data_duration)
                .with("rem_sleep_duration", s.rem_sleep_duration)
                .with("respiratory_rate", s.respiratory_rate)
                .with("sleep_score", s.score)
                .with("sleep_efficiency", s.sleep_efficiency)
                .with("sleep_consistency", s.sleep_consistency)
                .with("sws_duration", s.slow_wave_sleep_duration)
                .with("wake_duration", s.wake_duration)
                .with("quality_duration", s.quality_duration);
            if let Some(target) = timezone {
                localize(&mut record, &SLEEP_BOUNDS, target);
            }
            out.push(record);
        }
    }
    Ok(out)
}

fn workout_records(cycles: &[Cycle]) -> Result<Vec<Record>, AppError> {
    let mut out = Vec::new();
    for cycle in cycles {
        let Some(strain) = &cycle.strain else { continue };
        for w in &strain.workouts {
            if w.zones.len() < HR_ZONES {
                return Err(AppError::malformed(
                    VENDOR,
                    format!("workout {} has {} heart rate zones, expected {HR_ZONES}", w.id, w.zones.len()),
                ));
            }
            // Workout bounds carry a real offset already.
            let mut record = Record::new()
                .with("cycle_id", cycle.id)
                .with("workout_id", w.id)
                .with("average_hr", w.average_heart_rate)
                .with("cumulative_strain", w.cumulative_workout_strain)
                .with("time_upper_bound", normalize_whoop_timestamp(&w.during.upper, offset_of(&w.during.upper))?)
                .with("time_lower_bound", normalize_whoop_timestamp(&w.during.lower, offset_of(&w.during.lower))?)
                .with("kilojoules", w.kilojoules)
                .with("strain_score", w.score)
                .with("sport_id", w.sport_id)
                .with("source", w.source.clone());
            for (i, minutes) in w.zones.iter().take(HR_ZONES).enumerate() {
                record.set(format!("time_hr_zone_{i}"), *minutes);
            }
            out.push(record);
        }
    }
    Ok(out)
}

/// Trailing `±HH:MM` of an ISO timestamp, or UTC when absent.
fn offset_of(raw: &str) -> &str {
    let raw = raw.trim();
    match raw.len().checked_sub(6).and_then(|i| raw.get(i..)) {
        Some(tail) if tail.starts_with(['+', '-']) && tail.as_bytes()[3] == b':' => tail,
        _ => "+0000",
    }
}

/// Ticks are UTC unless a display offset is given.
fn heart_rate_records(ticks: Vec<HeartRateTick>, timezone: Option<FixedOffset>) -> Result<Vec<Record>, AppError> {
    ticks
        .into_iter()
        .map(|tick| {
            let ts = from_unix_millis(tick.time)
                .ok_or_else(|| AppError::malformed(VENDOR, format!("invalid heart rate time {}", tick.time)))?;
            let ts = timezone.map_or(ts, |tz| ts.with_timezone(&tz));
            Ok(Record::new().with("heart_rate", tick.data).with("timestamp", ts))
        })
        .collect()
}

fn health_metrics_record(cycle: &Cycle, metrics: HealthMetricsResponse) -> Result<Record, AppError> {
    let mut record = Record::new().with("id", cycle.id).with("day", cycle_day(cycle)?);
    for m in metrics.health_monitor_metrics {
        record.set(format!("{}.current_value", m.metric), m.current_value);
        record.set(format!("{}.current_deviation", m.metric), m.current_deviation);
    }
    Ok(record)
}
