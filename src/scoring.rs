//! Race times and the score formula.
//!
//! A race is scored against the athlete's previous time:
//! `100 * (previous / finish)^10`, both measured in whole seconds. Matching the
//! previous time is worth exactly 100; every second slower costs points.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Score awarded for exactly matching the previous time.
pub const PAR_SCORE: f64 = 100.0;

const SCORE_EXPONENT: i32 = 10;

/// Longest accepted race, in minutes.
pub const MAX_MINUTES: u32 = 600;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimeError {
    #[error("time must look like m:ss")]
    Malformed,
    #[error("seconds must be below 60")]
    SecondsOutOfRange,
    #[error("time must be longer than zero")]
    Zero,
    #[error("time must be under {} minutes", MAX_MINUTES)]
    TooLong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RaceTime {
    pub minutes: u32,
    pub seconds: u32,
}

impl RaceTime {
    pub fn new(minutes: u32, seconds: u32) -> Result<Self, TimeError> {
        if seconds >= 60 {
            return Err(TimeError::SecondsOutOfRange);
        }
        if minutes == 0 && seconds == 0 {
            return Err(TimeError::Zero);
        }
        if minutes >= MAX_MINUTES {
            return Err(TimeError::TooLong);
        }
        Ok(Self { minutes, seconds })
    }

    /// Build from stored columns without validation; used for display only.
    pub fn from_columns(minutes: i64, seconds: i64) -> Self {
        Self {
            minutes: u32::try_from(minutes.max(0)).unwrap_or(u32::MAX),
            seconds: u32::try_from(seconds.max(0)).unwrap_or(u32::MAX),
        }
    }

    pub fn total_seconds(&self) -> u64 {
        60 * u64::from(self.minutes) + u64::from(self.seconds)
    }
}

impl FromStr for RaceTime {
    type Err = TimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (minutes, seconds) = s.trim().split_once(':').ok_or(TimeError::Malformed)?;
        let minutes: u32 = minutes.parse().map_err(|_| TimeError::Malformed)?;
        if seconds.len() != 2 {
            return Err(TimeError::Malformed);
        }
        let seconds: u32 = seconds.parse().map_err(|_| TimeError::Malformed)?;
        RaceTime::new(minutes, seconds)
    }
}

impl fmt::Display for RaceTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:02}", self.minutes, self.seconds)
    }
}

pub fn score(previous: RaceTime, finish: RaceTime) -> f64 {
    let ratio = previous.total_seconds() as f64 / finish.total_seconds() as f64;
    PAR_SCORE * ratio.powi(SCORE_EXPONENT)
}

pub fn format_score(score: f64) -> String {
    format!("{:.2}", score)
}

/// CSS class for a score cell.
pub fn score_class(score: f64) -> &'static str {
    if score >= PAR_SCORE { "better" } else { "worse" }
}

/// CSS class for the podium places of a results table.
pub fn place_class(place: i64) -> &'static str {
    match place {
        1 => "firstplace",
        2 => "secondplace",
        3 => "thirdplace",
        _ => "",
    }
}

/// Class-year badge: (label, css class).
pub fn year_badge(year: i64) -> (&'static str, &'static str) {
    match year {
        1 => ("FR", "underclassman"),
        2 => ("SO", "underclassman"),
        3 => ("JR", "upperclassman"),
        4 => ("SR", "upperclassman"),
        _ => ("??", ""),
    }
}
