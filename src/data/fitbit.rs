//! Fitbit Web API client.
//!
//! Each data type maps to one endpoint shape. Fitbit caps how many days a single
//! request may span, so windows are split per endpoint and the pages concatenated.

use std::collections::HashSet;

use chrono::{NaiveDate, NaiveTime};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::Credentials;
use crate::data::VendorClient;
use crate::data::http::{self, ApiSession};
use crate::data::timestamp::naive_as_utc;
use crate::domain::{DataType, DateWindow, FieldValue, Record};
use crate::error::AppError;

const VENDOR: &str = "Fitbit";
pub const API_BASE: &str = "https://api.fitbit.com";
const TOKEN_PATH: &str = "oauth2/token";

const SLEEP_MAX_DAYS: i64 = 100;
const SERIES_MAX_DAYS: i64 = 1095;
const HRV_MAX_DAYS: i64 = 30;
const INTRADAY_MAX_DAYS: i64 = 1;

/// How a data type is fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endpoint {
    Sleep,
    /// Daily activity time series for the given resource path.
    Series(&'static str),
    Hrv,
    /// One-minute intraday data for the given resource path.
    Intraday(&'static str),
}

impl Endpoint {
    fn for_type(data_type: DataType) -> Option<Self> {
        Some(match data_type {
            DataType::Sleep => Endpoint::Sleep,
            DataType::Steps => Endpoint::Series("steps"),
            DataType::Distance => Endpoint::Series("distance"),
            DataType::MinutesSedentary => Endpoint::Series("minutesSedentary"),
            DataType::MinutesLightlyActive => Endpoint::Series("minutesLightlyActive"),
            DataType::MinutesFairlyActive => Endpoint::Series("minutesFairlyActive"),
            DataType::MinutesVeryActive => Endpoint::Series("minutesVeryActive"),
            DataType::Hrv => Endpoint::Hrv,
            DataType::HeartRateDay => Endpoint::Intraday("heart"),
            DataType::DistanceDay => Endpoint::Intraday("distance"),
            _ => return None,
        })
    }

    fn max_days(self) -> i64 {
        match self {
            Endpoint::Sleep => SLEEP_MAX_DAYS,
            Endpoint::Series(_) => SERIES_MAX_DAYS,
            Endpoint::Hrv => HRV_MAX_DAYS,
            Endpoint::Intraday(_) => INTRADAY_MAX_DAYS,
        }
    }

    fn path(self, window: &DateWindow) -> String {
        let (start, end) = (window.start(), window.end());
        match self {
            Endpoint::Sleep => format!("1.2/user/-/sleep/date/{start}/{end}.json"),
            Endpoint::Series(resource) => format!("1/user/-/activities/{resource}/date/{start}/{end}.json"),
            Endpoint::Hrv => format!("1/user/-/hrv/date/{start}/{end}.json"),
            Endpoint::Intraday(resource) => format!("1/user/-/activities/{resource}/date/{start}/1d/1min.json"),
        }
    }
}

pub struct FitbitClient {
    session: ApiSession,
}

impl FitbitClient {
    /// Client over an already-issued access token.
    pub fn with_token(access_token: impl Into<String>) -> Self {
        Self::with_base_url(API_BASE, access_token)
    }

    pub fn with_base_url(base_url: &str, access_token: impl Into<String>) -> Self {
        Self {
            session: ApiSession::new(Client::new(), VENDOR, base_url, access_token),
        }
    }

    pub fn connect(credentials: &Credentials) -> Result<Self, AppError> {
        match credentials {
            Credentials::FitbitToken { access_token } => Ok(Self::with_token(access_token.clone())),
            Credentials::FitbitAuthCode {
                client_id,
                client_secret,
                code,
                redirect_uri,
            } => Self::exchange_code(API_BASE, client_id, client_secret, code, redirect_uri),
            Credentials::Whoop { .. } => Err(AppError::Config(
                "Whoop credentials cannot be used with a Fitbit device.".to_string(),
            )),
        }
    }

    /// Exchange an OAuth authorization code for a bearer token.
    pub fn exchange_code(
        base_url: &str,
        client_id: &str,
        client_secret: &str,
        code: &str,
        redirect_uri: &str,
    ) -> Result<Self, AppError> {
        let client = Client::new();
        let url = format!("{}/{TOKEN_PATH}", base_url.trim_end_matches('/'));
        info!(%url, "exchanging Fitbit authorization code");

        let resp = http::send(
            VENDOR,
            client
                .post(&url)
                .basic_auth(client_id, Some(client_secret))
                .form(&[
                    ("client_id", client_id),
                    ("grant_type", "authorization_code"),
                    ("redirect_uri", redirect_uri),
                    ("code", code),
                ]),
        )?;

        if !resp.status().is_success() {
            return Err(AppError::auth(
                VENDOR,
                format!("token exchange failed with status {}.", resp.status()),
            ));
        }

        let token: TokenResponse = resp
            .json()
            .map_err(|e| AppError::malformed(VENDOR, format!("failed to parse token response: {e}")))?;

        Ok(Self {
            session: ApiSession::new(client, VENDOR, base_url, token.access_token),
        })
    }

    fn fetch_endpoint(&self, endpoint: Endpoint, data_type: DataType, window: &DateWindow) -> Result<Vec<Record>, AppError> {
        let parts = window.split(endpoint.max_days());
        if parts.len() > 1 {
            debug!(%data_type, %window, requests = parts.len(), "splitting Fitbit request");
        }

        let mut out = Vec::new();
        for part in &parts {
            let body: Value = self.session.get_json(&endpoint.path(part), &[])?;
            let mut records = match endpoint {
                Endpoint::Sleep => parse_sleep(&body)?,
                Endpoint::Series(resource) => parse_series(&body, resource, data_type)?,
                Endpoint::Hrv => parse_hrv(&body)?,
                Endpoint::Intraday(resource) => parse_intraday(&body, resource, part.start(), data_type)?,
            };
            out.append(&mut records);
        }
        Ok(out)
    }
}

impl VendorClient for FitbitClient {
    fn vendor(&self) -> &'static str {
        VENDOR
    }

    fn fetch(&self, data_type: DataType, window: &DateWindow) -> Result<Vec<Record>, AppError> {
        let endpoint = Endpoint::for_type(data_type).ok_or_else(|| AppError::UnsupportedDataType {
            data_type: data_type.name().to_string(),
            device: VENDOR.to_string(),
        })?;
        self.fetch_endpoint(endpoint, data_type, window)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct SleepResponse {
    sleep: Vec<SleepLog>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SleepLog {
    date_of_sleep: String,
    minutes_asleep: i64,
    #[serde(default)]
    minutes_awake: Option<i64>,
    time_in_bed: i64,
    efficiency: i64,
    start_time: String,
    end_time: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeriesPoint {
    date_time: String,
    value: Value,
}

#[derive(Debug, Deserialize)]
struct HrvResponse {
    hrv: Vec<HrvPoint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HrvPoint {
    date_time: String,
    value: HrvValue,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HrvValue {
    daily_rmssd: f64,
    deep_rmssd: f64,
}

#[derive(Debug, Deserialize)]
struct IntradaySeries {
    dataset: Vec<IntradayPoint>,
}

#[derive(Debug, Deserialize)]
struct IntradayPoint {
    time: String,
    value: f64,
}

fn decode<T: for<'de> Deserialize<'de>>(value: Value, what: &str) -> Result<T, AppError> {
    serde_json::from_value(value).map_err(|e| AppError::malformed(VENDOR, format!("invalid {what} payload: {e}")))
}

fn parse_date(raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| AppError::malformed(VENDOR, format!("invalid date '{raw}': {e}")))
}

fn parse_timestamp(raw: &str) -> Result<FieldValue, AppError> {
    naive_as_utc(raw)
        .map(FieldValue::from)
        .ok_or_else(|| AppError::malformed(VENDOR, format!("invalid timestamp '{raw}'")))
}

fn parse_sleep(body: &Value) -> Result<Vec<Record>, AppError> {
    let resp: SleepResponse = decode(body.clone(), "sleep")?;
    let mut out = Vec::with_capacity(resp.sleep.len());
    for log in resp.sleep {
        out.push(
            Record::new()
                .with("dateOfSleep", parse_date(&log.date_of_sleep)?)
                .with("minutesAsleep", log.minutes_asleep)
                .with("minutesAwake", log.minutes_awake)
                .with("timeInBed", log.time_in_bed)
                .with("efficiency", log.efficiency)
                .with("startTime", parse_timestamp(&log.start_time)?)
                .with("endTime", parse_timestamp(&log.end_time)?),
        );
    }
    // Fitbit returns sleep logs newest first.
    out.sort_by_key(|r| r.date("dateOfSleep"));
    Ok(out)
}

fn parse_series(body: &Value, resource: &str, data_type: DataType) -> Result<Vec<Record>, AppError> {
    let key = format!("activities-{resource}");
    let points: Vec<SeriesPoint> = decode(
        body.get(&key)
            .cloned()
            .ok_or_else(|| AppError::malformed(VENDOR, format!("missing '{key}'")))?,
        &key,
    )?;

    points
        .into_iter()
        .map(|p| {
            Ok(Record::new()
                .with("dateTime", parse_date(&p.date_time)?)
                .with("value", series_value(&p.value, data_type)?))
        })
        .collect()
}

/// Fitbit sends series values as strings; distance is fractional, the rest are counts.
fn series_value(raw: &Value, data_type: DataType) -> Result<FieldValue, AppError> {
    let number = match raw {
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
    .ok_or_else(|| AppError::malformed(VENDOR, format!("non-numeric {data_type} value {raw}")))?;

    Ok(if data_type == DataType::Distance {
        FieldValue::Float(number)
    } else {
        FieldValue::Int(number.round() as i64)
    })
}

fn parse_hrv(body: &Value) -> Result<Vec<Record>, AppError> {
    let resp: HrvResponse = decode(body.clone(), "hrv")?;
    resp.hrv
        .into_iter()
        .map(|p| {
            Ok(Record::new()
                .with("dateTime", parse_date(&p.date_time)?)
                .with("dailyRmssd", p.value.daily_rmssd)
                .with("deepRmssd", p.value.deep_rmssd))
        })
        .collect()
}

fn parse_intraday(body: &Value, resource: &str, day: NaiveDate, data_type: DataType) -> Result<Vec<Record>, AppError> {
    let key = format!("activities-{resource}-intraday");
    let series: IntradaySeries = decode(
        body.get(&key)
            .cloned()
            .ok_or_else(|| AppError::malformed(VENDOR, format!("missing '{key}'")))?,
        &key,
    )?;

    let mut seen: HashSet<&str> = HashSet::new();
    let mut out = Vec::with_capacity(series.dataset.len());
    for point in &series.dataset {
        // Fitbit occasionally repeats the last minute of a page.
        if !seen.insert(point.time.as_str()) {
            continue;
        }
        let time = NaiveTime::parse_from_str(&point.time, "%H:%M:%S")
            .map_err(|e| AppError::malformed(VENDOR, format!("invalid time '{}': {e}", point.time)))?;
        let ts = day.and_time(time).and_utc().fixed_offset();
        let value = if data_type == DataType::HeartRateDay {
            FieldValue::Int(point.value.round() as i64)
        } else {
            FieldValue::Float(point.value)
        };
        out.push(Record::new().with("dateTime", ts).with("value", value));
    }
    Ok(out)
}
