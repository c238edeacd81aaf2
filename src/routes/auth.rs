use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use crate::auth::{self, Session, UsernameError};
use crate::db;
use crate::error::AppResult;
use crate::views::{AuthFailedPage, DeleteForm, LoginForm, MessagePage, PageContext, SignupForm};
use crate::AppState;

const LOGIN_RETRY: &str = "login failed, please try again";
const LOGIN_MISMATCH: &str = "login failed, check username or password";
const SIGNUP_INVALID: &str = "failed to create account, please make sure you entered everything correctly";
const SIGNUP_BAD_CHARS: &str = "sorry, your username contained invalid characters";
const SIGNUP_TAKEN: &str = "sorry, that username already exists";
const SIGNUP_MISMATCH: &str = "sorry, your passwords did not match";
const CAPTCHA_FAILED: &str = "captcha verification failed, please try again";

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(rename = "cf-turnstile-response", default)]
    captcha: Option<String>,
}

#[derive(Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    confirmpassword: Option<String>,
    #[serde(rename = "cf-turnstile-response", default)]
    captcha: Option<String>,
}

// GET /login - Login form fragment
pub async fn login_form(State(state): State<AppState>) -> LoginForm {
    LoginForm {
        captcha_site_key: state.config.captcha_site_key().unwrap_or_default().to_string(),
    }
}

// GET /signup - Signup form fragment
pub async fn signup_form(State(state): State<AppState>) -> SignupForm {
    SignupForm {
        captcha_site_key: state.config.captcha_site_key().unwrap_or_default().to_string(),
    }
}

// GET /account/delete - Delete confirmation fragment
pub async fn delete_form() -> DeleteForm {
    DeleteForm
}

// POST /login - Check credentials and start a session
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginRequest>,
) -> AppResult<Response> {
    if !state.captcha.verify(form.captcha.as_deref()).await? {
        return Ok(login_failed(&state, CAPTCHA_FAILED));
    }

    let (Some(username), Some(password)) = (form.username, form.password) else {
        return Ok(login_failed(&state, LOGIN_RETRY));
    };

    let username = username.trim().to_lowercase();

    let user = db::get_user_by_username(&state.pool, &username).await?;
    let user = match user {
        Some(user) if auth::verify_password(&password, &user.password_hash) => user,
        _ => {
            tracing::warn!(%username, "Failed login attempt");
            return Ok(login_failed(&state, LOGIN_MISMATCH));
        }
    };

    let jar = auth::start_session(&state, jar, user.user_id).await?;
    tracing::info!(user_id = user.user_id, "User logged in");

    Ok((jar, Redirect::to("/")).into_response())
}

// POST /signup - Create an account and start a session
pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<SignupRequest>,
) -> AppResult<Response> {
    let (Some(username), Some(password), Some(confirm)) =
        (form.username, form.password, form.confirmpassword)
    else {
        return Ok(signup_failed(&state, SIGNUP_INVALID));
    };

    let username = match auth::normalize_username(&username) {
        Ok(username) => username,
        Err(UsernameError::InvalidCharacters) => return Ok(signup_failed(&state, SIGNUP_BAD_CHARS)),
        Err(UsernameError::Empty | UsernameError::TooLong) => {
            return Ok(signup_failed(&state, SIGNUP_INVALID));
        }
    };

    if db::username_exists(&state.pool, &username).await? {
        return Ok(signup_failed(&state, SIGNUP_TAKEN));
    }

    if !state.captcha.verify(form.captcha.as_deref()).await? {
        return Ok(signup_failed(&state, CAPTCHA_FAILED));
    }

    if !auth::password_is_acceptable(&password) {
        return Ok(signup_failed(&state, SIGNUP_INVALID));
    }

    if password != confirm {
        return Ok(signup_failed(&state, SIGNUP_MISMATCH));
    }

    let password_hash = auth::hash_password(&password)?;
    let user_id = match db::create_user(&state.pool, &username, &password_hash).await {
        Ok(id) => id,
        Err(e) if is_unique_violation(&e) => return Ok(signup_failed(&state, SIGNUP_TAKEN)),
        Err(e) => return Err(e.into()),
    };

    let jar = auth::start_session(&state, jar, user_id).await?;
    tracing::info!(user_id, %username, "New account created");

    Ok((jar, Redirect::to("/")).into_response())
}

fn login_failed(state: &AppState, message: &str) -> Response {
    let page = AuthFailedPage::login(message, state.config.captcha_site_key());
    (StatusCode::UNAUTHORIZED, page).into_response()
}

fn signup_failed(state: &AppState, message: &str) -> Response {
    tracing::warn!(reason = message, "Sign up rejected");
    let page = AuthFailedPage::signup(message, state.config.captcha_site_key());
    (StatusCode::BAD_REQUEST, page).into_response()
}

// GET /logout - End the session
pub async fn logout(
    State(state): State<AppState>,
    session: Session,
    jar: CookieJar,
) -> AppResult<(CookieJar, Redirect)> {
    if let Some(token) = &session.token {
        db::delete_session(&state.pool, token).await?;
    }

    Ok((jar.remove(auth::removal_cookie()), Redirect::to("/")))
}

// POST /account/delete - Remove the logged in account
pub async fn delete_account(
    State(state): State<AppState>,
    session: Session,
    jar: CookieJar,
) -> AppResult<Response> {
    let Some(user) = session.user else {
        return Ok(Redirect::to("/").into_response());
    };

    db::delete_user(&state.pool, user.user_id).await?;
    tracing::info!(user_id = user.user_id, "Account deleted");

    let page = MessagePage {
        page: PageContext::bare("account deleted"),
        message: "your account has been deleted".to_string(),
        success: true,
    };

    Ok((jar.remove(auth::removal_cookie()), page).into_response())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|e| e.is_unique_violation())
        .unwrap_or(false)
}
