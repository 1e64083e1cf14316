//! Synthetic Fitbit Sense data.
//!
//! One daily summary is drawn per day and every series is derived from it, so the
//! series agree with each other: distance follows steps, activity minutes plus
//! sleep add up to the day, and minute-level distance sums to the daily distance.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, Weekday};

use super::{Noise, SyntheticConfig, SyntheticData, round_to};
use crate::domain::{DataType, Record};
use crate::error::AppError;

const MINUTES_PER_DAY: i64 = 1440;
const MILES_PER_STEP: f64 = 0.00047;

#[derive(Debug, Clone)]
struct DaySummary {
    date: NaiveDate,
    steps: i64,
    distance: f64,
    very_active: i64,
    fairly_active: i64,
    lightly_active: i64,
    sedentary: i64,
    minutes_asleep: i64,
    minutes_awake: i64,
    sleep_start: DateTime<FixedOffset>,
    sleep_end: DateTime<FixedOffset>,
    daily_rmssd: f64,
    deep_rmssd: f64,
    resting_hr: f64,
}

impl DaySummary {
    fn time_in_bed(&self) -> i64 {
        self.minutes_asleep + self.minutes_awake
    }

    /// Minute of this day at which the night's sleep ended.
    fn wake_minute(&self) -> i64 {
        let midnight = self.date.and_time(NaiveTime::MIN).and_utc().fixed_offset();
        (self.sleep_end - midnight).num_minutes().clamp(0, MINUTES_PER_DAY)
    }
}

pub fn generate(config: &SyntheticConfig) -> Result<SyntheticData, AppError> {
    let mut noise = Noise::new(config.seed)?;
    let days: Vec<DaySummary> = config.window.days().map(|date| draw_day(&mut noise, date)).collect();

    let mut data = SyntheticData::new();
    data.insert(DataType::Sleep, days.iter().map(sleep_record).collect());
    data.insert(DataType::Steps, daily(&days, |d| d.steps.into()));
    data.insert(DataType::Distance, daily(&days, |d| d.distance.into()));
    data.insert(DataType::MinutesVeryActive, daily(&days, |d| d.very_active.into()));
    data.insert(DataType::MinutesFairlyActive, daily(&days, |d| d.fairly_active.into()));
    data.insert(DataType::MinutesLightlyActive, daily(&days, |d| d.lightly_active.into()));
    data.insert(DataType::MinutesSedentary, daily(&days, |d| d.sedentary.into()));
    data.insert(
        DataType::Hrv,
        days.iter()
            .map(|d| {
                Record::new()
                    .with("dateTime", d.date)
                    .with("dailyRmssd", d.daily_rmssd)
                    .with("deepRmssd", d.deep_rmssd)
            })
            .collect(),
    );

    let mut heart_rate = Vec::with_capacity(days.len() * MINUTES_PER_DAY as usize);
    let mut distance_day = Vec::with_capacity(days.len() * MINUTES_PER_DAY as usize);
    for day in &days {
        heart_rate.extend(heart_rate_minutes(&mut noise, day));
        distance_day.extend(distance_minutes(&mut noise, day));
    }
    data.insert(DataType::HeartRateDay, heart_rate);
    data.insert(DataType::DistanceDay, distance_day);

    Ok(data)
}

fn draw_day(noise: &mut Noise, date: NaiveDate) -> DaySummary {
    let weekend = matches!(date.weekday(), Weekday::Sat | Weekday::Sun);
    let step_mean = if weekend { 7200.0 } else { 9100.0 };

    let steps = noise.count(step_mean, 2400.0, 600.0, 28_000.0);
    let stride = noise.clamped(MILES_PER_STEP, 0.00002, 0.0004, 0.00055);
    let distance = round_to(steps as f64 * stride, 2);

    let minutes_asleep = noise.count(415.0, 40.0, 240.0, 600.0);
    let minutes_awake = noise.count(42.0, 12.0, 8.0, 120.0);

    // Lights out the evening before, around 22:45.
    let bedtime_offset = noise.clamped(0.0, 40.0, -120.0, 120.0).round() as i64;
    let sleep_start = (date - Duration::days(1))
        .and_time(NaiveTime::from_hms_opt(22, 45, 0).unwrap_or(NaiveTime::MIN))
        .and_utc()
        .fixed_offset()
        + Duration::minutes(bedtime_offset);
    let sleep_end = sleep_start + Duration::minutes(minutes_asleep + minutes_awake);

    let very_active = noise.count(steps as f64 / 450.0, 6.0, 0.0, 180.0);
    let fairly_active = noise.count(18.0, 8.0, 0.0, 120.0);
    let lightly_active = noise.count(205.0, 45.0, 30.0, 400.0);
    let sedentary = (MINUTES_PER_DAY - minutes_asleep - very_active - fairly_active - lightly_active).max(0);

    let daily_rmssd = round_to(noise.clamped(38.0, 6.0, 10.0, 120.0), 3);
    let deep_rmssd = round_to(daily_rmssd * noise.clamped(0.92, 0.05, 0.7, 1.1), 3);
    let resting_hr = noise.clamped(58.0, 2.0, 45.0, 75.0);

    DaySummary {
        date,
        steps,
        distance,
        very_active,
        fairly_active,
        lightly_active,
        sedentary,
        minutes_asleep,
        minutes_awake,
        sleep_start,
        sleep_end,
        daily_rmssd,
        deep_rmssd,
        resting_hr,
    }
}

fn daily(days: &[DaySummary], value: impl Fn(&DaySummary) -> crate::domain::FieldValue) -> Vec<Record> {
    days.iter()
        .map(|d| Record::new().with("dateTime", d.date).with("value", value(d)))
        .collect()
}

fn sleep_record(day: &DaySummary) -> Record {
    let efficiency = (day.minutes_asleep as f64 * 100.0 / day.time_in_bed() as f64).round() as i64;
    Record::new()
        .with("dateOfSleep", day.date)
        .with("minutesAsleep", day.minutes_asleep)
        .with("minutesAwake", day.minutes_awake)
        .with("timeInBed", day.time_in_bed())
        .with("efficiency", efficiency)
        .with("startTime", day.sleep_start)
        .with("endTime", day.sleep_end)
}

fn minute_stamp(date: NaiveDate, minute: i64) -> DateTime<FixedOffset> {
    date.and_time(NaiveTime::MIN).and_utc().fixed_offset() + Duration::minutes(minute)
}

fn heart_rate_minutes(noise: &mut Noise, day: &DaySummary) -> Vec<Record> {
    let wake = day.wake_minute();
    let awake_minutes = (MINUTES_PER_DAY - wake).max(1) as f64;
    let p_vigorous = (day.very_active + day.fairly_active) as f64 / awake_minutes;

    (0..MINUTES_PER_DAY)
        .map(|minute| {
            let bpm = if minute < wake {
                noise.normal(day.resting_hr - 4.0, 2.0)
            } else if noise.chance(p_vigorous) {
                noise.normal(day.resting_hr + 70.0, 12.0)
            } else {
                noise.normal(day.resting_hr + 16.0, 6.0)
            };
            Record::new()
                .with("dateTime", minute_stamp(day.date, minute))
                .with("value", bpm.clamp(38.0, 200.0).round() as i64)
        })
        .collect()
}

fn distance_minutes(noise: &mut Noise, day: &DaySummary) -> Vec<Record> {
    let wake = day.wake_minute();
    let weights: Vec<f64> = (0..MINUTES_PER_DAY)
        .map(|minute| {
            if minute < wake {
                0.0
            } else {
                let u = noise.uniform(0.0, 1.0);
                u * u * u
            }
        })
        .collect();
    let total: f64 = weights.iter().sum();

    weights
        .into_iter()
        .enumerate()
        .map(|(minute, w)| {
            let share = if total > 0.0 { w / total } else { 0.0 };
            Record::new()
                .with("dateTime", minute_stamp(day.date, minute as i64))
                .with("value", day.distance * share)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DateWindow, FieldValue};

    fn config(start: &str, end: &str) -> SyntheticConfig {
        SyntheticConfig::new(0, DateWindow::parse(start, end).unwrap())
    }

    fn value(r: &Record, key: &str) -> f64 {
        r.get(key).and_then(FieldValue::as_f64).unwrap()
    }

    #[test]
    fn one_record_per_day_for_daily_series() {
        let data = generate(&config("2022-04-24", "2022-04-28")).unwrap();
        for t in [DataType::Sleep, DataType::Steps, DataType::Distance, DataType::Hrv, DataType::MinutesSedentary] {
            let records = &data[&t];
            assert_eq!(records.len(), 5, "{t}");
            let dates: Vec<_> = records.iter().map(|r| r.date(t.date_field()).unwrap()).collect();
            assert!(dates.windows(2).all(|w| w[0] < w[1]), "{t} not in date order");
        }
    }

    #[test]
    fn intraday_series_have_one_sample_per_minute() {
        let data = generate(&config("2022-04-24", "2022-04-25")).unwrap();
        assert_eq!(data[&DataType::HeartRateDay].len(), 2 * 1440);
        assert_eq!(data[&DataType::DistanceDay].len(), 2 * 1440);
        assert!(data[&DataType::HeartRateDay]
            .iter()
            .all(|r| matches!(r.get("value"), Some(FieldValue::Int(38..=200)))));
    }

    #[test]
    fn activity_minutes_and_sleep_fill_the_day() {
        let data = generate(&config("2022-03-01", "2022-03-31")).unwrap();
        for i in 0..31 {
            let total = value(&data[&DataType::MinutesVeryActive][i], "value")
                + value(&data[&DataType::MinutesFairlyActive][i], "value")
                + value(&data[&DataType::MinutesLightlyActive][i], "value")
                + value(&data[&DataType::MinutesSedentary][i], "value")
                + value(&data[&DataType::Sleep][i], "minutesAsleep");
            assert_eq!(total, 1440.0);
        }
    }

    #[test]
    fn minute_distance_sums_to_daily_distance() {
        let data = generate(&config("2022-04-24", "2022-04-24")).unwrap();
        let daily = value(&data[&DataType::Distance][0], "value");
        let minutes: f64 = data[&DataType::DistanceDay].iter().map(|r| value(r, "value")).sum();
        assert!((daily - minutes).abs() < 1e-6, "daily {daily} vs minutes {minutes}");
    }

    #[test]
    fn sleep_efficiency_matches_minutes() {
        let data = generate(&config("2022-04-24", "2022-04-30")).unwrap();
        for r in &data[&DataType::Sleep] {
            let asleep = value(r, "minutesAsleep");
            let in_bed = value(r, "timeInBed");
            assert_eq!(value(r, "efficiency"), (asleep * 100.0 / in_bed).round());
            assert_eq!(in_bed, asleep + value(r, "minutesAwake"));
        }
    }

    #[test]
    fn same_seed_same_data_other_seed_differs() {
        let a = generate(&config("2022-04-24", "2022-04-26")).unwrap();
        let b = generate(&config("2022-04-24", "2022-04-26")).unwrap();
        assert_eq!(a, b);

        let mut other = config("2022-04-24", "2022-04-26");
        other.seed = 1;
        let c = generate(&other).unwrap();
        assert_ne!(a[&DataType::Steps], c[&DataType::Steps]);
    }
}
