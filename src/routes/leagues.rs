use axum::{
    extract::{rejection::PathRejection, Path, State},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use crate::auth::Session;
use crate::db;
use crate::error::AppResult;
use crate::models::{AthleteStatsRow, MeetResultRow, PickSlot, StandingRow};
use crate::picks::{self, PickError, PickForm, PICK_SLOTS};
use crate::views::{AthleteInfo, LeaguePage, LeaguesPage, MeetInfo, Notice, PageContext};
use crate::AppState;

#[derive(Deserialize)]
pub struct MeetInfoRequest {
    #[serde(default)]
    meet_id: Option<String>,
}

#[derive(Deserialize)]
pub struct AthleteInfoRequest {
    #[serde(default)]
    athlete_id: Option<String>,
}

fn parse_id(raw: Option<&str>) -> Option<i64> {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse().ok())
}

// GET /leagues - Joinable and joined leagues
pub async fn list_leagues(
    State(state): State<AppState>,
    session: Session,
    jar: CookieJar,
) -> AppResult<Response> {
    let Some(user) = &session.user else {
        return Ok((session.clear_if_stale(jar), Redirect::to("/")).into_response());
    };

    let joinable = db::get_joinable_leagues(&state.pool, user.user_id).await?;
    let joined = db::get_joined_leagues(&state.pool, user.user_id).await?;

    Ok(LeaguesPage {
        page: PageContext::new("fantasy leagues", &session, state.config.captcha_site_key()),
        joinable,
        joined,
    }
    .into_response())
}

// GET /leagues/{id} - League home for members
pub async fn get_league(
    State(state): State<AppState>,
    session: Session,
    league_id: Result<Path<i64>, PathRejection>,
) -> AppResult<Response> {
    let Some(user) = &session.user else {
        return Ok(Redirect::to("/").into_response());
    };
    let Path(league_id) = league_id?;

    let Some(league) = db::get_league_detail(&state.pool, league_id).await? else {
        return Ok(Redirect::to("/leagues").into_response());
    };

    if !db::is_member(&state.pool, user.user_id, league_id).await? {
        return Ok(Redirect::to("/leagues").into_response());
    }

    let standings = db::get_league_standings(&state.pool, league_id).await?;
    let athlete_stats = db::get_athlete_stats(&state.pool, league.season_id).await?;
    let meets = db::get_season_meets(&state.pool, league.season_id).await?;

    let current_meet = match league.current_meet_id {
        Some(meet_id) => db::get_meet(&state.pool, meet_id).await?,
        None => None,
    };

    let (current_meet_name, pick_slots) = match &current_meet {
        Some(meet) => {
            let athletes = db::get_season_athletes(&state.pool, league.season_id).await?;
            let current = db::get_meet_pick(&state.pool, user.user_id, league_id, meet.meet_id)
                .await?
                .map(|p| p.slots())
                .unwrap_or([None; PICK_SLOTS]);

            let slots = current
                .iter()
                .enumerate()
                .map(|(i, pick)| PickSlot::build(i, *pick, &athletes))
                .collect();

            (meet.meet_name.clone(), slots)
        }
        None => (String::new(), Vec::new()),
    };

    let title = format!("league: {}", league.league_name);

    Ok(LeaguePage {
        page: PageContext::new(title, &session, state.config.captcha_site_key()),
        league_id,
        league_name: league.league_name,
        season_name: league.season_name,
        standings: standings.iter().map(StandingRow::to_view).collect(),
        athletes: athlete_stats.iter().map(AthleteStatsRow::to_view).collect(),
        meets,
        current_meet_name,
        pick_slots,
    }
    .into_response())
}

// GET /leagues/join/{id} - Join a league (no-op when already a member)
pub async fn join_league(
    State(state): State<AppState>,
    session: Session,
    league_id: Result<Path<i64>, PathRejection>,
) -> AppResult<Redirect> {
    let Some(user) = &session.user else {
        return Ok(Redirect::to("/"));
    };
    let Path(league_id) = league_id?;

    let league = db::get_league(&state.pool, league_id).await?;

    if let Some(league) = league.filter(|l| l.joinable) {
        if !db::is_member(&state.pool, user.user_id, league.league_id).await? {
            db::add_member(&state.pool, user.user_id, league.league_id).await?;
            tracing::info!(user_id = user.user_id, league_id, "User joined league");
        }
    }

    Ok(Redirect::to("/leagues"))
}

// POST /leagues/meetinfo - Results table for one meet
pub async fn meet_info(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<MeetInfoRequest>,
) -> AppResult<Response> {
    let meet_id = parse_id(form.meet_id.as_deref());

    let (true, Some(meet_id)) = (session.is_authenticated(), meet_id) else {
        return Ok(Notice::error("could not get meet info").into_response());
    };

    let results = db::get_meet_results(&state.pool, meet_id).await?;
    let meet = db::get_meet(&state.pool, meet_id).await?;

    match meet {
        Some(meet) if !results.is_empty() => Ok(MeetInfo {
            meet_name: meet.meet_name,
            results: results.iter().map(MeetResultRow::to_view).collect(),
        }
        .into_response()),
        _ => Ok(Notice::error("could not get meet info (try checking later)").into_response()),
    }
}

// POST /leagues/athleteinfo - Race history and totals for one athlete
pub async fn athlete_info(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<AthleteInfoRequest>,
) -> AppResult<Response> {
    let athlete_id = parse_id(form.athlete_id.as_deref());

    let (true, Some(athlete_id)) = (session.is_authenticated(), athlete_id) else {
        return Ok(Notice::error("could not get athlete info").into_response());
    };

    let Some(stats) = db::get_athlete_summary(&state.pool, athlete_id).await? else {
        return Ok(Notice::error("could not get athlete info").into_response());
    };

    let races = db::get_athlete_races(&state.pool, athlete_id).await?;
    let summary = stats.to_view();

    Ok(AthleteInfo {
        name: summary.name,
        year_label: summary.year_label,
        year_class: summary.year_class,
        sex: summary.sex,
        races: races.iter().map(|r| r.to_view()).collect(),
        total: summary.total,
        average: summary.average,
    }
    .into_response())
}

// POST /leagues/{id}/meetpicks - Save picks for the league's current meet
pub async fn submit_picks(
    State(state): State<AppState>,
    session: Session,
    league_id: Result<Path<i64>, PathRejection>,
    Form(form): Form<PickForm>,
) -> AppResult<Notice> {
    let Path(league_id) = league_id?;

    let Some(user) = &session.user else {
        return Ok(Notice::error("please log in to make picks"));
    };

    let Some(league) = db::get_league_detail(&state.pool, league_id).await? else {
        return Ok(Notice::error("you are not a member of this league"));
    };
    if !db::is_member(&state.pool, user.user_id, league_id).await? {
        return Ok(Notice::error("you are not a member of this league"));
    }

    let meet = match league.current_meet_id {
        Some(meet_id) => db::get_meet(&state.pool, meet_id).await?,
        None => None,
    };
    let Some(meet) = meet else {
        return Ok(Notice::error("no meet is open for picks right now"));
    };

    let slots = match form.slots() {
        Ok(slots) => slots,
        Err(e) => return Ok(Notice::error(e.to_string())),
    };

    let picks = match picks::validate(&state.pool, league.season_id, &slots).await {
        Ok(picks) => picks,
        Err(PickError::Database(e)) => return Err(e.into()),
        Err(e) => {
            tracing::warn!(user_id = user.user_id, league_id, error = %e, "Rejected picks");
            return Ok(Notice::error(e.to_string()));
        }
    };

    db::replace_meet_pick(&state.pool, user.user_id, league_id, meet.meet_id, slots).await?;
    tracing::info!(
        user_id = user.user_id,
        league_id,
        meet_id = meet.meet_id,
        count = picks.len(),
        "Picks saved"
    );

    if picks.is_empty() {
        return Ok(Notice::success(format!("picks cleared for {}", meet.meet_name)));
    }

    let athletes = db::get_season_athletes(&state.pool, league.season_id).await?;
    let names: Vec<&str> = picks
        .iter()
        .filter_map(|id| athletes.iter().find(|a| a.athlete_id == *id))
        .map(|a| a.athlete_name.as_str())
        .collect();

    Ok(Notice::success(format!(
        "picks saved for {}: {}",
        meet.meet_name,
        names.join(", ")
    )))
}
