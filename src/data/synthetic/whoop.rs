//! Synthetic Whoop data.
//!
//! Each calendar day gets one cycle. The cycle's main sleep starts that evening,
//! naps and workouts happen during the day, and the heart-rate series (one sample
//! every five minutes) rises during workouts and drops during sleep.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime};

use super::{Noise, SyntheticConfig, SyntheticData, round_to};
use crate::data::timestamp::localize;
use crate::domain::{DataType, Record};
use crate::error::AppError;

const CYCLE_ID_BASE: i64 = 100_000;
const SLEEP_ID_BASE: i64 = 200_000;
const WORKOUT_ID_BASE: i64 = 300_000;
const HR_STEP_MINUTES: i64 = 5;
const MS_PER_MINUTE: f64 = 60_000.0;
/// Local offset of the synthetic wearer (`-0700`).
const LOCAL_OFFSET_SECS: i32 = -7 * 3600;

/// Running, cycling, yoga, weightlifting, walking.
const SPORT_IDS: [i64; 5] = [0, 1, 44, 45, 63];
const SOURCES: [&str; 2] = ["user", "auto"];

#[derive(Debug, Clone)]
struct Session {
    id: i64,
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
}

impl Session {
    fn minutes(&self) -> f64 {
        (self.end - self.start).num_minutes() as f64
    }

    fn contains(&self, ts: DateTime<FixedOffset>) -> bool {
        self.start <= ts && ts < self.end
    }
}

#[derive(Debug, Clone)]
struct CycleDay {
    id: i64,
    date: NaiveDate,
    resting_hr: f64,
    strain_score: f64,
    sleeps: Vec<(Session, bool)>,
    workouts: Vec<Session>,
}

pub fn generate(config: &SyntheticConfig) -> Result<SyntheticData, AppError> {
    let offset = FixedOffset::east_opt(LOCAL_OFFSET_SECS)
        .ok_or_else(|| AppError::Config("invalid synthetic timezone offset".to_string()))?;
    let mut noise = Noise::new(config.seed)?;

    let mut cycles = Vec::new();
    let mut sleeps = Vec::new();
    let mut workouts = Vec::new();
    let mut metrics = Vec::new();
    let mut days = Vec::new();

    for (index, date) in config.window.days().enumerate() {
        let day = draw_cycle(&mut noise, index as i64, date, offset);
        cycles.push(cycle_record(&mut noise, &day));
        for (session, is_nap) in &day.sleeps {
            sleeps.push(sleep_record(&mut noise, &day, session, *is_nap));
        }
        for workout in &day.workouts {
            workouts.push(workout_record(&mut noise, &day, workout));
        }
        metrics.push(health_metrics_record(&mut noise, &day));
        days.push(day);
    }

    let mut heart_rate = heart_rate_series(&mut noise, &days);
    if let Some(tz) = config.timezone {
        for record in &mut sleeps {
            localize(record, &["time_upper_bound", "time_lower_bound"], tz);
        }
        for record in &mut heart_rate {
            localize(record, &["timestamp"], tz);
        }
    }

    let mut data = SyntheticData::new();
    data.insert(DataType::Cycles, cycles);
    data.insert(DataType::Sleeps, sleeps);
    data.insert(DataType::Workouts, workouts);
    data.insert(DataType::HeartRate, heart_rate);
    data.insert(DataType::HealthMetrics, metrics);
    Ok(data)
}

fn local_time(date: NaiveDate, offset: FixedOffset, minute_of_day: f64) -> DateTime<FixedOffset> {
    let midnight = date
        .and_time(NaiveTime::MIN)
        .and_local_timezone(offset)
        .single()
        .unwrap_or_else(|| date.and_time(NaiveTime::MIN).and_utc().fixed_offset());
    midnight + Duration::minutes(minute_of_day.round() as i64)
}

fn draw_cycle(noise: &mut Noise, index: i64, date: NaiveDate, offset: FixedOffset) -> CycleDay {
    let id = CYCLE_ID_BASE + index;
    let mut sleeps = Vec::new();
    let mut workouts = Vec::new();

    // Optional afternoon nap first so sleeps stay in time order.
    if noise.chance(0.12) {
        let start = local_time(date, offset, noise.clamped(14.5 * 60.0, 45.0, 12.0 * 60.0, 17.0 * 60.0));
        let end = start + Duration::minutes(noise.count(35.0, 12.0, 15.0, 90.0));
        sleeps.push((
            Session {
                id: SLEEP_ID_BASE + index * 2 + 1,
                start,
                end,
            },
            true,
        ));
    }

    // Every cycle has a morning workout; a second one later in the day is optional.
    let mut next_start = 6.0 * 60.0;
    for n in 0..2 {
        if n > 0 && !noise.chance(0.45) {
            continue;
        }
        let start_minute = noise.uniform(next_start, next_start + 180.0);
        let duration = noise.clamped(50.0, 15.0, 15.0, 150.0);
        let start = local_time(date, offset, start_minute);
        workouts.push(Session {
            id: WORKOUT_ID_BASE + index * 2 + n,
            start,
            end: start + Duration::minutes(duration.round() as i64),
        });
        next_start = start_minute + duration + 120.0;
    }

    // Main sleep: lights out in the evening, waking the next morning.
    let start = local_time(date, offset, noise.clamped(22.75 * 60.0, 35.0, 21.0 * 60.0, 23.9 * 60.0));
    let end = start + Duration::minutes(noise.count(470.0, 45.0, 270.0, 660.0));
    sleeps.push((
        Session {
            id: SLEEP_ID_BASE + index * 2,
            start,
            end,
        },
        false,
    ));

    CycleDay {
        id,
        date,
        resting_hr: noise.clamped(52.0, 3.0, 40.0, 70.0),
        strain_score: round_to(noise.clamped(11.0, 3.5, 0.0, 21.0), 1),
        sleeps,
        workouts,
    }
}

fn cycle_record(noise: &mut Noise, day: &CycleDay) -> Record {
    let baseline = noise.clamped(27_000_000.0, 1_200_000.0, 21_600_000.0, 32_400_000.0).round();
    let debt = noise.clamped(1_500_000.0, 1_000_000.0, 0.0, 7_200_000.0).round();
    let strain = noise.clamped(1_000_000.0, 500_000.0, 0.0, 3_600_000.0).round();
    let naps = day.sleeps.iter().filter(|(_, nap)| *nap).count() as i64;

    Record::new()
        .with("id", day.id)
        .with("day", day.date)
        .with("rMSSD", round_to(noise.clamped(0.065, 0.012, 0.02, 0.15), 4))
        .with("resting_hr", day.resting_hr.round())
        .with("recovery_score", noise.clamped(65.0, 18.0, 1.0, 99.0).round())
        .with("n_naps", naps)
        .with("sleep_need_baseline", baseline)
        .with("sleep_debt", debt)
        .with("sleep_need_strain", strain)
        .with("sleep_need_total", baseline + debt + strain)
        .with("sleep_quality_duration", noise.clamped(26_000_000.0, 2_500_000.0, 14_400_000.0, 36_000_000.0).round())
        .with("avg_hr", noise.clamped(day.resting_hr + 16.0, 4.0, 50.0, 110.0).round())
        .with("kilojoules", round_to(noise.clamped(9_000.0, 1_200.0, 5_000.0, 16_000.0), 1))
        .with("max_hr", noise.clamped(160.0, 12.0, 110.0, 200.0).round())
        .with("strain_score", day.strain_score)
}

fn sleep_record(noise: &mut Noise, day: &CycleDay, session: &Session, is_nap: bool) -> Record {
    let in_bed = session.minutes() * MS_PER_MINUTE;
    let wake = (in_bed * noise.clamped(0.1, 0.03, 0.02, 0.3)).round();
    let asleep = in_bed - wake;
    let rem = (asleep * noise.clamped(0.23, 0.03, 0.1, 0.35)).round();
    let sws = (asleep * noise.clamped(0.2, 0.03, 0.08, 0.35)).round();
    let light = asleep - rem - sws;

    Record::new()
        .with("cycle_id", day.id)
        .with("sleep_id", session.id)
        .with("cycles_count", if is_nap { 1 } else { noise.count(4.5, 1.0, 1.0, 8.0) })
        .with("disturbance_count", noise.count(10.0, 4.0, 0.0, 30.0))
        .with("time_upper_bound", session.end)
        .with("time_lower_bound", session.start)
        .with("is_nap", is_nap)
        .with("in_bed_duration", in_bed)
        .with("light_sleep_duration", light)
        .with("latency_duration", (noise.clamped(6.0, 3.0, 0.0, 30.0) * MS_PER_MINUTE).round())
        .with("no_data_duration", 0.0)
        .with("rem_sleep_duration", rem)
        .with("respiratory_rate", round_to(noise.clamped(15.0, 0.6, 11.0, 20.0), 1))
        .with("sleep_score", noise.clamped(80.0, 10.0, 20.0, 100.0).round())
        .with("sleep_efficiency", round_to(asleep * 100.0 / in_bed, 1))
        .with("sleep_consistency", noise.clamped(75.0, 10.0, 20.0, 100.0).round())
        .with("sws_duration", sws)
        .with("wake_duration", wake)
        .with("quality_duration", asleep)
}

fn workout_record(noise: &mut Noise, day: &CycleDay, workout: &Session) -> Record {
    let minutes = workout.minutes();
    let total_ms = minutes * MS_PER_MINUTE;

    let weights: Vec<f64> = [0.05, 0.1, 0.3, 0.3, 0.2, 0.05]
        .iter()
        .map(|w| w * noise.uniform(0.5, 1.5))
        .collect();
    let weight_sum: f64 = weights.iter().sum();

    let mut record = Record::new()
        .with("cycle_id", day.id)
        .with("workout_id", workout.id)
        .with("average_hr", noise.clamped(135.0, 12.0, 90.0, 185.0).round())
        .with("cumulative_strain", day.strain_score)
        .with("time_upper_bound", workout.end)
        .with("time_lower_bound", workout.start)
        .with("kilojoules", round_to(minutes * noise.clamped(35.0, 5.0, 15.0, 60.0), 1))
        .with("strain_score", round_to(noise.clamped(9.0, 3.0, 0.0, day.strain_score.max(0.1)), 1))
        .with("sport_id", noise.pick(&SPORT_IDS))
        .with("source", noise.pick(&SOURCES));
    for (i, w) in weights.iter().enumerate() {
        record.set(format!("time_hr_zone_{i}"), (total_ms * w / weight_sum).round());
    }
    record
}

fn health_metrics_record(noise: &mut Noise, day: &CycleDay) -> Record {
    let mut record = Record::new().with("id", day.id).with("day", day.date);
    let metrics = [
        ("rhr", day.resting_hr, 52.0),
        ("hrv", noise.clamped(65.0, 12.0, 20.0, 150.0), 65.0),
        ("respiratory_rate", noise.clamped(15.0, 0.6, 11.0, 20.0), 15.0),
        ("skin_temp", noise.clamped(33.5, 0.4, 31.0, 36.0), 33.5),
        ("blood_oxygen", noise.clamped(96.5, 1.0, 90.0, 100.0), 96.5),
    ];
    for (name, value, baseline) in metrics {
        record.set(format!("{name}.current_value"), round_to(value, 2));
        record.set(format!("{name}.current_deviation"), round_to(value - baseline, 2));
    }
    record
}

fn heart_rate_series(noise: &mut Noise, days: &[CycleDay]) -> Vec<Record> {
    let mut out = Vec::new();
    for (i, day) in days.iter().enumerate() {
        // Samples are laid out on the UTC calendar day.
        let midnight = day.date.and_time(NaiveTime::MIN).and_utc().fixed_offset();
        let previous = i.checked_sub(1).map(|p| &days[p]);
        for step in 0..(1440 / HR_STEP_MINUTES) {
            let ts = midnight + Duration::minutes(step * HR_STEP_MINUTES);
            let asleep = day
                .sleeps
                .iter()
                .chain(previous.into_iter().flat_map(|p| p.sleeps.iter()))
                .any(|(s, _)| s.contains(ts));
            let training = day.workouts.iter().any(|w| w.contains(ts));
            let bpm = if training {
                noise.normal(day.resting_hr + 85.0, 12.0)
            } else if asleep {
                noise.normal(day.resting_hr - 3.0, 2.0)
            } else {
                noise.normal(day.resting_hr + 20.0, 7.0)
            };
            out.push(
                Record::new()
                    .with("heart_rate", bpm.clamp(38.0, 205.0).round() as i64)
                    .with("timestamp", ts),
            );
        }
    }
    out
}
