use serde::Deserialize;

use crate::config::TurnstileConfig;
use crate::error::AppError;

const SITEVERIFY_URL: &str = "https://challenges.cloudflare.com/turnstile/v0/siteverify";

#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    success: bool,
    #[serde(rename = "error-codes", default)]
    error_codes: Vec<String>,
}

#[derive(Clone)]
pub enum Captcha {
    /// Every request passes.
    Disabled,
    Turnstile {
        client: reqwest::Client,
        secret: String,
    },
}

impl Captcha {
    pub fn from_config(turnstile: Option<&TurnstileConfig>) -> Self {
        match turnstile {
            Some(t) => Captcha::Turnstile {
                client: reqwest::Client::new(),
                secret: t.secret.clone(),
            },
            None => Captcha::Disabled,
        }
    }

    /// Checks the widget response with Cloudflare. A missing response fails.
    pub async fn verify(&self, response: Option<&str>) -> Result<bool, AppError> {
        let (client, secret) = match self {
            Captcha::Disabled => return Ok(true),
            Captcha::Turnstile { client, secret } => (client, secret),
        };

        let Some(response) = response.filter(|r| !r.is_empty()) else {
            return Ok(false);
        };

        let result: SiteVerifyResponse = client
            .post(SITEVERIFY_URL)
            .form(&[("secret", secret.as_str()), ("response", response)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !result.success {
            tracing::warn!(codes = ?result.error_codes, "Turnstile rejected a response");
        }

        Ok(result.success)
    }
}
