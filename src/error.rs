use axum::{
    extract::rejection::{FormRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::views::{MessagePage, PageContext};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Resource not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Captcha verification request failed: {0}")]
    Captcha(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        AppError::Unauthorized(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Captcha(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Text shown to the user. Server-side failures never leak their cause.
    fn public_message(&self) -> String {
        match self {
            AppError::BadRequest(msg) | AppError::Unauthorized(msg) | AppError::Forbidden(msg) => {
                msg.clone()
            }
            AppError::NotFound => "sorry, that page does not exist".to_string(),
            AppError::Database(_) | AppError::Internal(_) | AppError::Captcha(_) => {
                "something went wrong, please try again later".to_string()
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::warn!(%status, "{}", self);
        }

        let title = if status.is_server_error() {
            "error"
        } else {
            "request failed"
        };

        let page = MessagePage {
            page: PageContext::bare(title),
            message: self.public_message(),
            success: false,
        };

        (status, page).into_response()
    }
}

impl From<argon2::password_hash::Error> for AppError {
    fn from(err: argon2::password_hash::Error) -> Self {
        AppError::Internal(format!("password hashing failed: {err}"))
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        tracing::debug!("Rejected path: {}", rejection.body_text());
        AppError::NotFound
    }
}

impl From<FormRejection> for AppError {
    fn from(rejection: FormRejection) -> Self {
        tracing::debug!("Rejected form: {}", rejection.body_text());
        AppError::BadRequest(
            "please make sure you entered everything correctly".to_string(),
        )
    }
}
