#![allow(dead_code)]

use std::str::FromStr;

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use fantasy_xc::config::Config;
use fantasy_xc::{db, routes, AppState};
use http_body_util::BodyExt;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tower::ServiceExt;

pub struct TestApp {
    pub app: Router,
    pub pool: SqlitePool,
}

impl TestApp {
    /// Fresh in-memory database with the schema applied. A single connection
    /// keeps every query on the same memory database.
    pub async fn new() -> Self {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .unwrap()
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .unwrap();
        db::run_migrations(&pool).await.unwrap();

        let app = routes::router(AppState::new(pool.clone(), Config::default()));
        Self { app, pool }
    }

    pub async fn request(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.request(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_form(&self, uri: &str, form: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.request(builder.body(Body::from(form.to_string())).unwrap()).await
    }

    /// Signs up and returns the `session=...` cookie pair.
    pub async fn signup(&self, username: &str, password: &str) -> String {
        let form = format!("username={username}&password={password}&confirmpassword={password}");
        let response = self.post_form("/signup", &form, None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "signup of {username} failed");
        session_cookie(&response).expect("signup sets a session cookie")
    }

    pub async fn make_admin(&self, username: &str) {
        sqlx::query("UPDATE users SET role = 'admin' WHERE username = ?")
            .bind(username)
            .execute(&self.pool)
            .await
            .unwrap();
    }

    pub async fn user_id(&self, username: &str) -> i64 {
        db::get_user_by_username(&self.pool, username)
            .await
            .unwrap()
            .unwrap()
            .user_id
    }
}

/// `session=<token>` from the response's Set-Cookie headers.
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("session="))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

pub fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// A season with one league, one meet that is open for picks, and four athletes.
pub struct Fixture {
    pub season_id: i64,
    pub league_id: i64,
    pub meet_id: i64,
    pub athletes: Vec<i64>,
}

pub async fn seed_season(pool: &SqlitePool) -> Fixture {
    let season_id = db::create_season(pool, "fall 2024").await.unwrap();
    let league_id = db::create_league(pool, "varsity league", season_id, true).await.unwrap();
    let meet_id = db::create_meet(pool, "conference championship", season_id).await.unwrap();

    let mut athletes = Vec::new();
    for (name, year, sex) in [("ana", 1, "F"), ("bea", 2, "F"), ("cal", 3, "M"), ("dev", 4, "M")] {
        athletes.push(db::create_athlete(pool, name, year, sex, season_id).await.unwrap());
    }

    db::set_current_meet(pool, season_id, Some(meet_id)).await.unwrap();

    Fixture {
        season_id,
        league_id,
        meet_id,
        athletes,
    }
}
