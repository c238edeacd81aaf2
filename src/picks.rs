//! Pick submission rules.
//!
//! A submission has three slots. An empty slot is "no pick"; the filled slots
//! must name distinct athletes of the league's season.

use std::collections::HashSet;

use serde::Deserialize;
use sqlx::sqlite::SqlitePool;
use thiserror::Error;

use crate::db;

pub const PICK_SLOTS: usize = 3;

#[derive(Debug, Error)]
pub enum PickError {
    #[error("pick {slot} is not a valid athlete")]
    Malformed { slot: usize },
    #[error("you cannot pick the same athlete twice")]
    Duplicate,
    #[error("one of your picks is not running in this season")]
    UnknownAthlete,
    #[error("could not check your picks: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Default, Deserialize)]
pub struct PickForm {
    #[serde(default)]
    pub pick1: Option<String>,
    #[serde(default)]
    pub pick2: Option<String>,
    #[serde(default)]
    pub pick3: Option<String>,
}

impl PickForm {
    /// Parses the raw slots. Absent or blank fields become `None`.
    pub fn slots(&self) -> Result<[Option<i64>; PICK_SLOTS], PickError> {
        let raw = [&self.pick1, &self.pick2, &self.pick3];
        let mut slots = [None; PICK_SLOTS];

        for (i, value) in raw.iter().enumerate() {
            slots[i] = match value.as_deref().map(str::trim) {
                None | Some("") => None,
                Some(v) => Some(v.parse().map_err(|_| PickError::Malformed { slot: i + 1 })?),
            };
        }

        Ok(slots)
    }
}

/// Filled slots in order, rejecting repeats.
pub fn distinct_picks(slots: &[Option<i64>; PICK_SLOTS]) -> Result<Vec<i64>, PickError> {
    let picks: Vec<i64> = slots.iter().flatten().copied().collect();
    let unique: HashSet<i64> = picks.iter().copied().collect();

    if unique.len() != picks.len() {
        return Err(PickError::Duplicate);
    }

    Ok(picks)
}

/// Full check of a submission against the season's athlete list.
///
/// The database returns one row per matching athlete, so a count that falls
/// short of the filled slots means a repeat or an athlete outside the season.
pub async fn validate(
    pool: &SqlitePool,
    season_id: i64,
    slots: &[Option<i64>; PICK_SLOTS],
) -> Result<Vec<i64>, PickError> {
    let picks = distinct_picks(slots)?;

    let submitted = slots.iter().flatten().count() as i64;
    let matched = db::count_season_athletes(pool, season_id, &picks).await?;

    if matched != submitted {
        return Err(PickError::UnknownAthlete);
    }

    Ok(picks)
}
