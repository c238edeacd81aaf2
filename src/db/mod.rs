use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite};

use crate::models::*;

/// Sessions older than this are ignored.
pub const SESSION_MAX_AGE_DAYS: i64 = 30;

pub async fn init_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
}

/// Creates every table the application needs. Safe to run on each start.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let statements = [
        r#"CREATE TABLE IF NOT EXISTS users (
               user_id INTEGER PRIMARY KEY AUTOINCREMENT,
               username TEXT NOT NULL UNIQUE,
               password_hash TEXT NOT NULL,
               role TEXT
           )"#,
        r#"CREATE TABLE IF NOT EXISTS sessions (
               token TEXT PRIMARY KEY,
               user_id INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
               created_at TEXT NOT NULL DEFAULT (datetime('now'))
           )"#,
        r#"CREATE TABLE IF NOT EXISTS seasons (
               season_id INTEGER PRIMARY KEY AUTOINCREMENT,
               season_name TEXT NOT NULL,
               current_meet_id INTEGER REFERENCES meets(meet_id) ON DELETE SET NULL
           )"#,
        r#"CREATE TABLE IF NOT EXISTS leagues (
               league_id INTEGER PRIMARY KEY AUTOINCREMENT,
               league_name TEXT NOT NULL,
               season_id INTEGER NOT NULL REFERENCES seasons(season_id) ON DELETE CASCADE,
               joinable INTEGER NOT NULL DEFAULT 1
           )"#,
        r#"CREATE TABLE IF NOT EXISTS leaguemembers (
               user_id INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
               league_id INTEGER NOT NULL REFERENCES leagues(league_id) ON DELETE CASCADE,
               PRIMARY KEY (user_id, league_id)
           )"#,
        r#"CREATE TABLE IF NOT EXISTS athletes (
               athlete_id INTEGER PRIMARY KEY AUTOINCREMENT,
               athlete_name TEXT NOT NULL,
               athlete_year INTEGER NOT NULL CHECK (athlete_year BETWEEN 1 AND 4),
               sex TEXT NOT NULL CHECK (sex IN ('M', 'F')),
               season_id INTEGER NOT NULL REFERENCES seasons(season_id) ON DELETE CASCADE
           )"#,
        r#"CREATE TABLE IF NOT EXISTS meets (
               meet_id INTEGER PRIMARY KEY AUTOINCREMENT,
               meet_name TEXT NOT NULL,
               season_id INTEGER NOT NULL REFERENCES seasons(season_id) ON DELETE CASCADE
           )"#,
        r#"CREATE TABLE IF NOT EXISTS races (
               race_id INTEGER PRIMARY KEY AUTOINCREMENT,
               athlete_id INTEGER NOT NULL REFERENCES athletes(athlete_id) ON DELETE CASCADE,
               meet_id INTEGER NOT NULL REFERENCES meets(meet_id) ON DELETE CASCADE,
               previous_minutes INTEGER NOT NULL,
               previous_seconds INTEGER NOT NULL,
               finish_minutes INTEGER NOT NULL,
               finish_seconds INTEGER NOT NULL,
               score REAL NOT NULL,
               UNIQUE (athlete_id, meet_id)
           )"#,
        r#"CREATE TABLE IF NOT EXISTS meetpicks (
               meetpick_id INTEGER PRIMARY KEY AUTOINCREMENT,
               user_id INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
               league_id INTEGER NOT NULL REFERENCES leagues(league_id) ON DELETE CASCADE,
               meet_id INTEGER NOT NULL REFERENCES meets(meet_id) ON DELETE CASCADE,
               pick1 INTEGER REFERENCES athletes(athlete_id) ON DELETE SET NULL,
               pick2 INTEGER REFERENCES athletes(athlete_id) ON DELETE SET NULL,
               pick3 INTEGER REFERENCES athletes(athlete_id) ON DELETE SET NULL
           )"#,
        r#"CREATE INDEX IF NOT EXISTS meetpicks_lookup ON meetpicks (league_id, user_id, meet_id)"#,
    ];

    for statement in statements {
        sqlx::query(statement).execute(pool).await?;
    }

    Ok(())
}

// User queries
pub async fn get_user_by_username(pool: &SqlitePool, username: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"SELECT user_id, username, password_hash, role FROM users WHERE username = ?"#
    )
    .bind(username)
    .fetch_optional(pool)
    .await
}

pub async fn username_exists(pool: &SqlitePool, username: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        r#"SELECT COUNT(*) FROM users WHERE username = ?"#
    )
    .bind(username)
    .fetch_one(pool)
    .await
    .map(|count| count > 0)
}

pub async fn create_user(pool: &SqlitePool, username: &str, password_hash: &str) -> Result<i64, sqlx::Error> {
    sqlx::query(
        r#"INSERT INTO users (username, password_hash) VALUES (?, ?)"#
    )
    .bind(username)
    .bind(password_hash)
    .execute(pool)
    .await
    .map(|result| result.last_insert_rowid())
}

/// Removes the user; sessions, memberships and picks go with it.
pub async fn delete_user(pool: &SqlitePool, user_id: i64) -> Result<(), sqlx::Error> {
    sqlx::query(r#"DELETE FROM users WHERE user_id = ?"#)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

// Session queries
pub async fn create_session(pool: &SqlitePool, token: &str, user_id: i64) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"INSERT INTO sessions (token, user_id) VALUES (?, ?)"#
    )
    .bind(token)
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_session_user(pool: &SqlitePool, token: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"SELECT u.user_id, u.username, u.password_hash, u.role
           FROM sessions s
           INNER JOIN users u ON u.user_id = s.user_id
           WHERE s.token = ?
             AND s.created_at > datetime('now', ?)"#
    )
    .bind(token)
    .bind(format!("-{} days", SESSION_MAX_AGE_DAYS))
    .fetch_optional(pool)
    .await
}

/// Drops every session past its expiry. Returns how many went.
pub async fn delete_expired_sessions(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
    sqlx::query(r#"DELETE FROM sessions WHERE created_at <= datetime('now', ?)"#)
        .bind(format!("-{} days", SESSION_MAX_AGE_DAYS))
        .execute(pool)
        .await
        .map(|result| result.rows_affected())
}

pub async fn delete_session(pool: &SqlitePool, token: &str) -> Result<(), sqlx::Error> {
    sqlx::query(r#"DELETE FROM sessions WHERE token = ?"#)
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}

// League queries
pub async fn get_joinable_leagues(pool: &SqlitePool, user_id: i64) -> Result<Vec<League>, sqlx::Error> {
    sqlx::query_as::<_, League>(
        r#"SELECT league_id, league_name, season_id, joinable
           FROM leagues
           WHERE joinable = 1
             AND league_id NOT IN (SELECT league_id FROM leaguemembers WHERE user_id = ?)
           ORDER BY league_name"#
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn get_joined_leagues(pool: &SqlitePool, user_id: i64) -> Result<Vec<League>, sqlx::Error> {
    sqlx::query_as::<_, League>(
        r#"SELECT league_id, league_name, season_id, joinable
           FROM leagues
           WHERE league_id IN (SELECT league_id FROM leaguemembers WHERE user_id = ?)
           ORDER BY league_name"#
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn get_league(pool: &SqlitePool, league_id: i64) -> Result<Option<League>, sqlx::Error> {
    sqlx::query_as::<_, League>(
        r#"SELECT league_id, league_name, season_id, joinable FROM leagues WHERE league_id = ?"#
    )
    .bind(league_id)
    .fetch_optional(pool)
    .await
}

pub async fn get_league_detail(pool: &SqlitePool, league_id: i64) -> Result<Option<LeagueDetail>, sqlx::Error> {
    sqlx::query_as::<_, LeagueDetail>(
        r#"SELECT l.league_id, l.league_name, l.season_id, s.season_name, s.current_meet_id
           FROM leagues l
           INNER JOIN seasons s ON s.season_id = l.season_id
           WHERE l.league_id = ?"#
    )
    .bind(league_id)
    .fetch_optional(pool)
    .await
}

pub async fn create_league(pool: &SqlitePool, league_name: &str, season_id: i64, joinable: bool) -> Result<i64, sqlx::Error> {
    sqlx::query(
        r#"INSERT INTO leagues (league_name, season_id, joinable) VALUES (?, ?, ?)"#
    )
    .bind(league_name)
    .bind(season_id)
    .bind(joinable)
    .execute(pool)
    .await
    .map(|result| result.last_insert_rowid())
}

pub async fn is_member(pool: &SqlitePool, user_id: i64, league_id: i64) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        r#"SELECT COUNT(*) FROM leaguemembers WHERE user_id = ? AND league_id = ?"#
    )
    .bind(user_id)
    .bind(league_id)
    .fetch_one(pool)
    .await
    .map(|count| count > 0)
}

/// Returns true when a new membership row was written.
pub async fn add_member(pool: &SqlitePool, user_id: i64, league_id: i64) -> Result<bool, sqlx::Error> {
    sqlx::query(
        r#"INSERT INTO leaguemembers (user_id, league_id) VALUES (?, ?)
           ON CONFLICT (user_id, league_id) DO NOTHING"#
    )
    .bind(user_id)
    .bind(league_id)
    .execute(pool)
    .await
    .map(|result| result.rows_affected() > 0)
}

/// Per-member totals of the race scores of every athlete they picked, ranked.
/// Equal totals share a place.
pub async fn get_league_standings(pool: &SqlitePool, league_id: i64) -> Result<Vec<StandingRow>, sqlx::Error> {
    sqlx::query_as::<_, StandingRow>(
        r#"WITH picked AS (
               SELECT user_id, meet_id, pick1 AS athlete_id FROM meetpicks
                WHERE league_id = ? AND pick1 IS NOT NULL
               UNION ALL
               SELECT user_id, meet_id, pick2 FROM meetpicks
                WHERE league_id = ? AND pick2 IS NOT NULL
               UNION ALL
               SELECT user_id, meet_id, pick3 FROM meetpicks
                WHERE league_id = ? AND pick3 IS NOT NULL
           ),
           pick_scores AS (
               SELECT p.user_id, SUM(r.score) AS score
               FROM picked p
               INNER JOIN races r ON r.athlete_id = p.athlete_id AND r.meet_id = p.meet_id
               GROUP BY p.user_id
           ),
           totals AS (
               SELECT u.user_id, u.username, COALESCE(ps.score, 0.0) AS total_score
               FROM leaguemembers lm
               INNER JOIN users u ON u.user_id = lm.user_id
               LEFT JOIN pick_scores ps ON ps.user_id = u.user_id
               WHERE lm.league_id = ?
           )
           SELECT user_id, username, total_score,
                  rank() OVER (ORDER BY total_score DESC) AS place
           FROM totals
           ORDER BY place, username"#
    )
    .bind(league_id)
    .bind(league_id)
    .bind(league_id)
    .bind(league_id)
    .fetch_all(pool)
    .await
}

// Season queries
pub async fn get_season(pool: &SqlitePool, season_id: i64) -> Result<Option<Season>, sqlx::Error> {
    sqlx::query_as::<_, Season>(
        r#"SELECT season_id, season_name, current_meet_id FROM seasons WHERE season_id = ?"#
    )
    .bind(season_id)
    .fetch_optional(pool)
    .await
}

pub async fn create_season(pool: &SqlitePool, season_name: &str) -> Result<i64, sqlx::Error> {
    sqlx::query(r#"INSERT INTO seasons (season_name) VALUES (?)"#)
        .bind(season_name)
        .execute(pool)
        .await
        .map(|result| result.last_insert_rowid())
}

pub async fn set_current_meet(pool: &SqlitePool, season_id: i64, meet_id: Option<i64>) -> Result<(), sqlx::Error> {
    sqlx::query(r#"UPDATE seasons SET current_meet_id = ? WHERE season_id = ?"#)
        .bind(meet_id)
        .bind(season_id)
        .execute(pool)
        .await?;
    Ok(())
}

// Athlete queries
pub async fn get_season_athletes(pool: &SqlitePool, season_id: i64) -> Result<Vec<Athlete>, sqlx::Error> {
    sqlx::query_as::<_, Athlete>(
        r#"SELECT athlete_id, athlete_name, athlete_year, sex, season_id
           FROM athletes WHERE season_id = ? ORDER BY athlete_name"#
    )
    .bind(season_id)
    .fetch_all(pool)
    .await
}

pub async fn get_athlete(pool: &SqlitePool, athlete_id: i64) -> Result<Option<Athlete>, sqlx::Error> {
    sqlx::query_as::<_, Athlete>(
        r#"SELECT athlete_id, athlete_name, athlete_year, sex, season_id
           FROM athletes WHERE athlete_id = ?"#
    )
    .bind(athlete_id)
    .fetch_optional(pool)
    .await
}

pub async fn create_athlete(
    pool: &SqlitePool,
    athlete_name: &str,
    athlete_year: i64,
    sex: &str,
    season_id: i64,
) -> Result<i64, sqlx::Error> {
    sqlx::query(
        r#"INSERT INTO athletes (athlete_name, athlete_year, sex, season_id) VALUES (?, ?, ?, ?)"#
    )
    .bind(athlete_name)
    .bind(athlete_year)
    .bind(sex)
    .bind(season_id)
    .execute(pool)
    .await
    .map(|result| result.last_insert_rowid())
}

/// Athlete columns plus race count, total and average score. Callers append
/// the WHERE clause.
const ATHLETE_STATS: &str = r#"WITH athlete_scores AS (
           SELECT athlete_id,
                  COUNT(*) AS races,
                  SUM(score) AS total_score,
                  AVG(score) AS average_score
           FROM races
           GROUP BY athlete_id
       )
       SELECT a.athlete_id, a.athlete_name, a.athlete_year, a.sex,
              COALESCE(s.races, 0) AS races,
              COALESCE(s.total_score, 0.0) AS total_score,
              COALESCE(s.average_score, 0.0) AS average_score
       FROM athletes a
       LEFT JOIN athlete_scores s ON s.athlete_id = a.athlete_id"#;

/// Race count, total and average score for each athlete of a season.
pub async fn get_athlete_stats(pool: &SqlitePool, season_id: i64) -> Result<Vec<AthleteStatsRow>, sqlx::Error> {
    let sql = format!("{ATHLETE_STATS} WHERE a.season_id = ? ORDER BY average_score DESC, a.athlete_name");

    sqlx::query_as::<_, AthleteStatsRow>(&sql)
        .bind(season_id)
        .fetch_all(pool)
        .await
}

pub async fn get_athlete_summary(pool: &SqlitePool, athlete_id: i64) -> Result<Option<AthleteStatsRow>, sqlx::Error> {
    let sql = format!("{ATHLETE_STATS} WHERE a.athlete_id = ?");

    sqlx::query_as::<_, AthleteStatsRow>(&sql)
        .bind(athlete_id)
        .fetch_optional(pool)
        .await
}

pub async fn get_athlete_races(pool: &SqlitePool, athlete_id: i64) -> Result<Vec<AthleteRaceRow>, sqlx::Error> {
    sqlx::query_as::<_, AthleteRaceRow>(
        r#"SELECT m.meet_id, m.meet_name,
                  r.previous_minutes, r.previous_seconds,
                  r.finish_minutes, r.finish_seconds,
                  r.score
           FROM races r
           INNER JOIN meets m ON m.meet_id = r.meet_id
           WHERE r.athlete_id = ?
           ORDER BY m.meet_id"#
    )
    .bind(athlete_id)
    .fetch_all(pool)
    .await
}

/// Number of distinct athletes among `athlete_ids` that run in the given season.
pub async fn count_season_athletes(pool: &SqlitePool, season_id: i64, athlete_ids: &[i64]) -> Result<i64, sqlx::Error> {
    if athlete_ids.is_empty() {
        return Ok(0);
    }

    let mut query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM athletes WHERE season_id = ");
    query.push_bind(season_id);
    query.push(" AND athlete_id IN (");
    let mut ids = query.separated(", ");
    for id in athlete_ids {
        ids.push_bind(*id);
    }
    ids.push_unseparated(")");

    query.build_query_scalar::<i64>().fetch_one(pool).await
}

// Meet queries
pub async fn get_season_meets(pool: &SqlitePool, season_id: i64) -> Result<Vec<Meet>, sqlx::Error> {
    sqlx::query_as::<_, Meet>(
        r#"SELECT meet_id, meet_name, season_id FROM meets WHERE season_id = ? ORDER BY meet_id"#
    )
    .bind(season_id)
    .fetch_all(pool)
    .await
}

pub async fn get_meet(pool: &SqlitePool, meet_id: i64) -> Result<Option<Meet>, sqlx::Error> {
    sqlx::query_as::<_, Meet>(
        r#"SELECT meet_id, meet_name, season_id FROM meets WHERE meet_id = ?"#
    )
    .bind(meet_id)
    .fetch_optional(pool)
    .await
}

pub async fn create_meet(pool: &SqlitePool, meet_name: &str, season_id: i64) -> Result<i64, sqlx::Error> {
    sqlx::query(r#"INSERT INTO meets (meet_name, season_id) VALUES (?, ?)"#)
        .bind(meet_name)
        .bind(season_id)
        .execute(pool)
        .await
        .map(|result| result.last_insert_rowid())
}

/// Races of a meet, best score first, with rank placement.
pub async fn get_meet_results(pool: &SqlitePool, meet_id: i64) -> Result<Vec<MeetResultRow>, sqlx::Error> {
    sqlx::query_as::<_, MeetResultRow>(
        r#"SELECT rank() OVER (ORDER BY r.score DESC) AS place,
                  a.athlete_id, a.athlete_name, a.athlete_year,
                  r.previous_minutes, r.previous_seconds,
                  r.finish_minutes, r.finish_seconds,
                  r.score
           FROM races r
           INNER JOIN athletes a ON a.athlete_id = r.athlete_id
           WHERE r.meet_id = ?
           ORDER BY place, a.athlete_name"#
    )
    .bind(meet_id)
    .fetch_all(pool)
    .await
}

// Race queries
pub async fn upsert_race(
    pool: &SqlitePool,
    athlete_id: i64,
    meet_id: i64,
    previous: crate::scoring::RaceTime,
    finish: crate::scoring::RaceTime,
    score: f64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"INSERT INTO races (athlete_id, meet_id, previous_minutes, previous_seconds,
                              finish_minutes, finish_seconds, score)
           VALUES (?, ?, ?, ?, ?, ?, ?)
           ON CONFLICT (athlete_id, meet_id) DO UPDATE SET
               previous_minutes = excluded.previous_minutes,
               previous_seconds = excluded.previous_seconds,
               finish_minutes = excluded.finish_minutes,
               finish_seconds = excluded.finish_seconds,
               score = excluded.score"#
    )
    .bind(athlete_id)
    .bind(meet_id)
    .bind(i64::from(previous.minutes))
    .bind(i64::from(previous.seconds))
    .bind(i64::from(finish.minutes))
    .bind(i64::from(finish.seconds))
    .bind(score)
    .execute(pool)
    .await?;
    Ok(())
}

// Pick queries
pub async fn get_meet_pick(
    pool: &SqlitePool,
    user_id: i64,
    league_id: i64,
    meet_id: i64,
) -> Result<Option<MeetPick>, sqlx::Error> {
    sqlx::query_as::<_, MeetPick>(
        r#"SELECT meetpick_id, user_id, league_id, meet_id, pick1, pick2, pick3
           FROM meetpicks
           WHERE user_id = ? AND league_id = ? AND meet_id = ?
           ORDER BY meetpick_id DESC
           LIMIT 1"#
    )
    .bind(user_id)
    .bind(league_id)
    .bind(meet_id)
    .fetch_optional(pool)
    .await
}

/// Drops any earlier picks of the user for this league and meet, then stores
/// the new ones. Both statements share one transaction.
pub async fn replace_meet_pick(
    pool: &SqlitePool,
    user_id: i64,
    league_id: i64,
    meet_id: i64,
    slots: [Option<i64>; 3],
) -> Result<i64, sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"DELETE FROM meetpicks WHERE user_id = ? AND league_id = ? AND meet_id = ?"#
    )
    .bind(user_id)
    .bind(league_id)
    .bind(meet_id)
    .execute(&mut *tx)
    .await?;

    let meetpick_id = sqlx::query(
        r#"INSERT INTO meetpicks (user_id, league_id, meet_id, pick1, pick2, pick3)
           VALUES (?, ?, ?, ?, ?, ?)"#
    )
    .bind(user_id)
    .bind(league_id)
    .bind(meet_id)
    .bind(slots[0])
    .bind(slots[1])
    .bind(slots[2])
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    tx.commit().await?;
    Ok(meetpick_id)
}
