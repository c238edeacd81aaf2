use crate::scoring::{self, RaceTime};

/// User account row
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub user_id: i64,
    pub username: String,
    pub password_hash: String,
    pub role: Option<String>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some("admin")
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct League {
    pub league_id: i64,
    pub league_name: String,
    pub season_id: i64,
    pub joinable: bool,
}

/// League joined with its season
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LeagueDetail {
    pub league_id: i64,
    pub league_name: String,
    pub season_id: i64,
    pub season_name: String,
    pub current_meet_id: Option<i64>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Season {
    pub season_id: i64,
    pub season_name: String,
    pub current_meet_id: Option<i64>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Athlete {
    pub athlete_id: i64,
    pub athlete_name: String,
    pub athlete_year: i64,
    pub sex: String,
    pub season_id: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Meet {
    pub meet_id: i64,
    pub meet_name: String,
    pub season_id: i64,
}

/// A user's picks for one meet in one league
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MeetPick {
    pub meetpick_id: i64,
    pub user_id: i64,
    pub league_id: i64,
    pub meet_id: i64,
    pub pick1: Option<i64>,
    pub pick2: Option<i64>,
    pub pick3: Option<i64>,
}

impl MeetPick {
    pub fn slots(&self) -> [Option<i64>; 3] {
        [self.pick1, self.pick2, self.pick3]
    }
}

/// Row from the league standings query
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StandingRow {
    pub user_id: i64,
    pub username: String,
    pub total_score: f64,
    pub place: i64,
}

/// Row from the per-athlete aggregate query
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AthleteStatsRow {
    pub athlete_id: i64,
    pub athlete_name: String,
    pub athlete_year: i64,
    pub sex: String,
    pub races: i64,
    pub total_score: f64,
    pub average_score: f64,
}

/// One race of a meet, joined with the athlete who ran it
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MeetResultRow {
    pub place: i64,
    pub athlete_id: i64,
    pub athlete_name: String,
    pub athlete_year: i64,
    pub previous_minutes: i64,
    pub previous_seconds: i64,
    pub finish_minutes: i64,
    pub finish_seconds: i64,
    pub score: f64,
}

/// One race of an athlete, joined with the meet it was run at
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AthleteRaceRow {
    pub meet_id: i64,
    pub meet_name: String,
    pub previous_minutes: i64,
    pub previous_seconds: i64,
    pub finish_minutes: i64,
    pub finish_seconds: i64,
    pub score: f64,
}

/// Standings entry for templates
#[derive(Debug, Clone)]
pub struct StandingView {
    pub place: i64,
    pub username: String,
    pub total: String,
}

impl StandingRow {
    pub fn to_view(&self) -> StandingView {
        StandingView {
            place: self.place,
            username: self.username.clone(),
            total: scoring::format_score(self.total_score),
        }
    }
}

/// Athlete entry for templates
#[derive(Debug, Clone)]
pub struct AthleteView {
    pub athlete_id: i64,
    pub name: String,
    pub year_label: &'static str,
    pub year_class: &'static str,
    pub sex: String,
    pub races: i64,
    pub total: String,
    pub average: String,
}

impl AthleteStatsRow {
    pub fn to_view(&self) -> AthleteView {
        let (year_label, year_class) = scoring::year_badge(self.athlete_year);
        AthleteView {
            athlete_id: self.athlete_id,
            name: self.athlete_name.clone(),
            year_label,
            year_class,
            sex: self.sex.clone(),
            races: self.races,
            total: scoring::format_score(self.total_score),
            average: scoring::format_score(self.average_score),
        }
    }
}

/// Meet results line for templates
#[derive(Debug, Clone)]
pub struct MeetResultView {
    pub place: i64,
    pub place_class: &'static str,
    pub name: String,
    pub year_label: &'static str,
    pub year_class: &'static str,
    pub previous: String,
    pub finish: String,
    pub score: String,
    pub score_class: &'static str,
}

impl MeetResultRow {
    pub fn to_view(&self) -> MeetResultView {
        let (year_label, year_class) = scoring::year_badge(self.athlete_year);
        MeetResultView {
            place: self.place,
            place_class: scoring::place_class(self.place),
            name: self.athlete_name.clone(),
            year_label,
            year_class,
            previous: RaceTime::from_columns(self.previous_minutes, self.previous_seconds).to_string(),
            finish: RaceTime::from_columns(self.finish_minutes, self.finish_seconds).to_string(),
            score: scoring::format_score(self.score),
            score_class: scoring::score_class(self.score),
        }
    }
}

/// Athlete race line for templates
#[derive(Debug, Clone)]
pub struct AthleteRaceView {
    pub meet_name: String,
    pub previous: String,
    pub finish: String,
    pub score: String,
    pub score_class: &'static str,
}

impl AthleteRaceRow {
    pub fn to_view(&self) -> AthleteRaceView {
        AthleteRaceView {
            meet_name: self.meet_name.clone(),
            previous: RaceTime::from_columns(self.previous_minutes, self.previous_seconds).to_string(),
            finish: RaceTime::from_columns(self.finish_minutes, self.finish_seconds).to_string(),
            score: scoring::format_score(self.score),
            score_class: scoring::score_class(self.score),
        }
    }
}

/// `<option>` entry of a pick selector
#[derive(Debug, Clone)]
pub struct PickOption {
    pub athlete_id: i64,
    pub label: String,
    pub selected: bool,
}

/// One of the three pick selectors on the league page
#[derive(Debug, Clone)]
pub struct PickSlot {
    pub name: String,
    pub label: String,
    pub none_selected: bool,
    pub options: Vec<PickOption>,
}

impl PickSlot {
    pub fn build(index: usize, current: Option<i64>, athletes: &[Athlete]) -> Self {
        let options = athletes
            .iter()
            .map(|a| {
                let (year, _) = scoring::year_badge(a.athlete_year);
                PickOption {
                    athlete_id: a.athlete_id,
                    label: format!("{} ({}, {})", a.athlete_name, year, a.sex),
                    selected: current == Some(a.athlete_id),
                }
            })
            .collect();

        PickSlot {
            name: format!("pick{}", index + 1),
            label: format!("pick {}", index + 1),
            none_selected: current.is_none(),
            options,
        }
    }
}
