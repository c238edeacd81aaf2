//! Admin-only writes: seasons, leagues, meets, athletes and race results.
//!
//! Callers must hold a session for a user whose role is `admin`. Each handler
//! answers with a short notice fragment.

use axum::{
    extract::{
        rejection::{FormRejection, PathRejection},
        Path, State,
    },
    Form,
};
use serde::Deserialize;

use crate::auth::Session;
use crate::db;
use crate::error::{AppError, AppResult};
use crate::models::User;
use crate::scoring::{self, RaceTime};
use crate::views::Notice;
use crate::AppState;

#[derive(Deserialize)]
pub struct CreateSeason {
    season_name: String,
}

#[derive(Deserialize)]
pub struct CreateLeague {
    league_name: String,
    season_id: i64,
    /// Checkbox: present means joinable.
    #[serde(default)]
    joinable: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateMeet {
    meet_name: String,
    season_id: i64,
}

#[derive(Deserialize)]
pub struct CreateAthlete {
    athlete_name: String,
    athlete_year: i64,
    sex: String,
    season_id: i64,
}

#[derive(Deserialize)]
pub struct RecordRace {
    athlete_id: i64,
    meet_id: i64,
    previous: String,
    finish: String,
}

#[derive(Deserialize)]
pub struct SetCurrentMeet {
    #[serde(default)]
    meet_id: Option<String>,
}

fn require_admin(session: &Session) -> AppResult<&User> {
    match &session.user {
        None => Err(AppError::unauthorized("please log in")),
        Some(user) if !user.is_admin() => Err(AppError::Forbidden("admins only".to_string())),
        Some(user) => Ok(user),
    }
}

fn require_name(raw: &str, what: &str) -> AppResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AppError::bad_request(format!("{what} cannot be empty")));
    }
    Ok(name.to_string())
}

async fn require_season(state: &AppState, season_id: i64) -> AppResult<()> {
    db::get_season(&state.pool, season_id)
        .await?
        .map(|_| ())
        .ok_or_else(|| AppError::bad_request(format!("season {season_id} does not exist")))
}

// POST /admin/seasons - Create a season
pub async fn create_season(
    State(state): State<AppState>,
    session: Session,
    form: Result<Form<CreateSeason>, FormRejection>,
) -> AppResult<Notice> {
    let admin = require_admin(&session)?;
    let Form(form) = form?;
    let name = require_name(&form.season_name, "season name")?;

    let season_id = db::create_season(&state.pool, &name).await?;
    tracing::info!(admin = admin.user_id, season_id, "Season created");

    Ok(Notice::success(format!("created season {name} (#{season_id})")))
}

// POST /admin/leagues - Create a league for a season
pub async fn create_league(
    State(state): State<AppState>,
    session: Session,
    form: Result<Form<CreateLeague>, FormRejection>,
) -> AppResult<Notice> {
    let admin = require_admin(&session)?;
    let Form(form) = form?;
    let name = require_name(&form.league_name, "league name")?;
    require_season(&state, form.season_id).await?;

    let joinable = form.joinable.is_some();
    let league_id = db::create_league(&state.pool, &name, form.season_id, joinable).await?;
    tracing::info!(admin = admin.user_id, league_id, joinable, "League created");

    Ok(Notice::success(format!("created league {name} (#{league_id})")))
}

// POST /admin/meets - Create a meet for a season
pub async fn create_meet(
    State(state): State<AppState>,
    session: Session,
    form: Result<Form<CreateMeet>, FormRejection>,
) -> AppResult<Notice> {
    let admin = require_admin(&session)?;
    let Form(form) = form?;
    let name = require_name(&form.meet_name, "meet name")?;
    require_season(&state, form.season_id).await?;

    let meet_id = db::create_meet(&state.pool, &name, form.season_id).await?;
    tracing::info!(admin = admin.user_id, meet_id, "Meet created");

    Ok(Notice::success(format!("created meet {name} (#{meet_id})")))
}

// POST /admin/athletes - Add an athlete to a season roster
pub async fn create_athlete(
    State(state): State<AppState>,
    session: Session,
    form: Result<Form<CreateAthlete>, FormRejection>,
) -> AppResult<Notice> {
    let admin = require_admin(&session)?;
    let Form(form) = form?;
    let name = require_name(&form.athlete_name, "athlete name")?;

    if !(1..=4).contains(&form.athlete_year) {
        return Err(AppError::bad_request("athlete year must be between 1 and 4"));
    }

    let sex = form.sex.trim().to_uppercase();
    if sex != "M" && sex != "F" {
        return Err(AppError::bad_request("sex must be M or F"));
    }

    require_season(&state, form.season_id).await?;

    let athlete_id =
        db::create_athlete(&state.pool, &name, form.athlete_year, &sex, form.season_id).await?;
    tracing::info!(admin = admin.user_id, athlete_id, "Athlete created");

    Ok(Notice::success(format!("added {name} (#{athlete_id})")))
}

// POST /admin/races - Record (or correct) a race result and its score
pub async fn record_race(
    State(state): State<AppState>,
    session: Session,
    form: Result<Form<RecordRace>, FormRejection>,
) -> AppResult<Notice> {
    let admin = require_admin(&session)?;
    let Form(form) = form?;

    let previous: RaceTime = form
        .previous
        .parse()
        .map_err(|e| AppError::bad_request(format!("previous time: {e}")))?;
    let finish: RaceTime = form
        .finish
        .parse()
        .map_err(|e| AppError::bad_request(format!("finish time: {e}")))?;

    let athlete = db::get_athlete(&state.pool, form.athlete_id)
        .await?
        .ok_or(AppError::NotFound)?;
    let meet = db::get_meet(&state.pool, form.meet_id)
        .await?
        .ok_or(AppError::NotFound)?;

    if athlete.season_id != meet.season_id {
        return Err(AppError::bad_request("athlete and meet belong to different seasons"));
    }

    let score = scoring::score(previous, finish);
    db::upsert_race(&state.pool, athlete.athlete_id, meet.meet_id, previous, finish, score).await?;
    tracing::info!(
        admin = admin.user_id,
        athlete_id = athlete.athlete_id,
        meet_id = meet.meet_id,
        score,
        "Race recorded"
    );

    Ok(Notice::success(format!(
        "{} at {}: {} to {} scored {}",
        athlete.athlete_name,
        meet.meet_name,
        previous,
        finish,
        scoring::format_score(score)
    )))
}

// POST /admin/seasons/{id}/current_meet - Open picks for a meet (empty closes them)
pub async fn set_current_meet(
    State(state): State<AppState>,
    session: Session,
    season_id: Result<Path<i64>, PathRejection>,
    form: Result<Form<SetCurrentMeet>, FormRejection>,
) -> AppResult<Notice> {
    let admin = require_admin(&session)?;
    let Path(season_id) = season_id?;
    let Form(form) = form?;
    require_season(&state, season_id).await?;

    let meet_id = match form.meet_id.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(
            raw.parse::<i64>()
                .map_err(|_| AppError::bad_request("meet id must be a number"))?,
        ),
    };

    if let Some(meet_id) = meet_id {
        let meet = db::get_meet(&state.pool, meet_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if meet.season_id != season_id {
            return Err(AppError::bad_request("that meet is not part of this season"));
        }
    }

    db::set_current_meet(&state.pool, season_id, meet_id).await?;
    tracing::info!(admin = admin.user_id, season_id, ?meet_id, "Current meet changed");

    Ok(match meet_id {
        Some(id) => Notice::success(format!("picks are open for meet #{id}")),
        None => Notice::success("picks are closed"),
    })
}
