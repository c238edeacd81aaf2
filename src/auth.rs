//! Accounts and sessions.
//!
//! Passwords are stored as argon2id PHC strings. A successful login creates a
//! row in `sessions` keyed by a random token; the browser only ever holds that
//! token, in the `session` cookie.

use std::sync::LazyLock;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use rand::distributions::{Alphanumeric, DistString};
use rand::rngs::OsRng;
use regex::Regex;

use crate::db;
use crate::error::AppError;
use crate::models::User;
use crate::AppState;

pub const SESSION_COOKIE: &str = "session";
pub const MAX_USERNAME_LEN: usize = 20;
pub const MAX_PASSWORD_LEN: usize = 20;

const TOKEN_LENGTH: usize = 64;

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9_]+$").expect("username pattern is valid"));

#[derive(Debug, PartialEq, Eq)]
pub enum UsernameError {
    Empty,
    TooLong,
    InvalidCharacters,
}

/// Lowercases and trims, then checks length and the allowed alphabet.
pub fn normalize_username(raw: &str) -> Result<String, UsernameError> {
    let username = raw.trim().to_lowercase();

    if username.is_empty() {
        return Err(UsernameError::Empty);
    }
    if !USERNAME_RE.is_match(&username) {
        return Err(UsernameError::InvalidCharacters);
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(UsernameError::TooLong);
    }

    Ok(username)
}

pub fn password_is_acceptable(password: &str) -> bool {
    let len = password.chars().count();
    len > 0 && len <= MAX_PASSWORD_LEN && !password.contains('\n')
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// False on mismatch and on unparsable stored hashes.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!("Stored password hash is unreadable: {}", e);
            false
        }
    }
}

pub fn new_session_token() -> String {
    Alphanumeric.sample_string(&mut OsRng, TOKEN_LENGTH)
}

pub fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(secure)
        .build()
}

pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}

/// Writes a session row for the user and returns the jar with its cookie set.
/// Expired rows are purged on the way.
pub async fn start_session(state: &AppState, jar: CookieJar, user_id: i64) -> Result<CookieJar, AppError> {
    let purged = db::delete_expired_sessions(&state.pool).await?;
    if purged > 0 {
        tracing::debug!(purged, "Removed expired sessions");
    }

    let token = new_session_token();
    db::create_session(&state.pool, &token, user_id).await?;
    Ok(jar.add(session_cookie(token, state.config.secure_cookies)))
}

/// The requester, as identified by the session cookie.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub user: Option<User>,
    pub token: Option<String>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn username(&self) -> &str {
        self.user.as_ref().map(|u| u.username.as_str()).unwrap_or("")
    }

    /// A cookie was sent but matched no live session.
    pub fn is_stale(&self) -> bool {
        self.token.is_some() && self.user.is_none()
    }

    /// Removes the session cookie from the browser when it is stale.
    pub fn clear_if_stale(&self, jar: CookieJar) -> CookieJar {
        if self.is_stale() {
            jar.remove(removal_cookie())
        } else {
            jar
        }
    }
}

impl FromRequestParts<AppState> for Session {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);

        let Some(token) = jar.get(SESSION_COOKIE).map(|c| c.value().to_string()) else {
            return Ok(Session::default());
        };

        let user = db::get_session_user(&state.pool, &token).await?;
        if user.is_none() {
            tracing::debug!("Unknown or expired session token presented");
        }

        Ok(Session {
            user,
            token: Some(token),
        })
    }
}
