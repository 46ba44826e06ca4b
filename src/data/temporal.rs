// ============================================================
// Layer 4 — Temporal Encoding
// ============================================================
//   day_of_week = weekday, Monday = 0
//   time_of_day = seconds since midnight / (time_slot · 60)
//   T           = 24 · 60 / time_slot

use anyhow::{bail, Result};
use chrono::{Datelike, NaiveDateTime, Timelike};

use crate::domain::sample::TimeEncoding;

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Number of time-of-day slots for a given slot length in minutes.
pub fn steps_per_day(time_slot: u32) -> Result<usize> {
    if time_slot == 0 || MINUTES_PER_DAY % time_slot != 0 {
        bail!("time slot of {time_slot} minutes does not divide a day");
    }
    Ok((MINUTES_PER_DAY / time_slot) as usize)
}

pub fn encode(ts: &NaiveDateTime, time_slot: u32) -> TimeEncoding {
    TimeEncoding {
        day_of_week: ts.weekday().num_days_from_monday(),
        time_of_day: ts.num_seconds_from_midnight() / (time_slot * 60),
    }
}

pub fn encode_all(timestamps: &[NaiveDateTime], time_slot: u32) -> Vec<TimeEncoding> {
    timestamps.iter().map(|ts| encode(ts, time_slot)).collect()
}
