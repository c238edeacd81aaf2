//! Page and fragment templates. Files live under `templates/`.

use askama::Template;

use crate::auth::Session;
use crate::models::{
    AthleteRaceView, AthleteView, League, MeetResultView, Meet, PickSlot, StandingView,
};

/// Fields every full page needs for the shared layout.
#[derive(Debug, Clone)]
pub struct PageContext {
    pub title: String,
    pub authenticated: bool,
    pub username: String,
    pub show_auth: bool,
    /// Empty when captcha checks are off.
    pub captcha_site_key: String,
}

impl PageContext {
    pub fn new(title: impl Into<String>, session: &Session, captcha_site_key: Option<&str>) -> Self {
        Self {
            title: title.into(),
            authenticated: session.is_authenticated(),
            username: session.username().to_string(),
            show_auth: true,
            captcha_site_key: captcha_site_key.unwrap_or_default().to_string(),
        }
    }

    /// Layout without the login notice, for result and error pages.
    pub fn bare(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            authenticated: false,
            username: String::new(),
            show_auth: false,
            captcha_site_key: String::new(),
        }
    }

    /// Loads the captcha script for pages that embed an auth form.
    pub fn with_captcha_site_key(mut self, captcha_site_key: Option<&str>) -> Self {
        self.captcha_site_key = captcha_site_key.unwrap_or_default().to_string();
        self
    }
}

#[derive(Template, askama_web::WebTemplate)]
#[template(path = "index.html")]
pub struct IndexPage {
    pub page: PageContext,
}

#[derive(Template, askama_web::WebTemplate)]
#[template(path = "message.html")]
pub struct MessagePage {
    pub page: PageContext,
    pub message: String,
    pub success: bool,
}

/// Failed login or signup, with the form again underneath.
#[derive(Template, askama_web::WebTemplate)]
#[template(path = "auth_failed.html")]
pub struct AuthFailedPage {
    pub page: PageContext,
    pub message: String,
    pub signup: bool,
    pub captcha_site_key: String,
}

impl AuthFailedPage {
    pub fn login(message: impl Into<String>, captcha_site_key: Option<&str>) -> Self {
        Self::build("login failed", message.into(), false, captcha_site_key)
    }

    pub fn signup(message: impl Into<String>, captcha_site_key: Option<&str>) -> Self {
        Self::build("sign up failed", message.into(), true, captcha_site_key)
    }

    fn build(title: &str, message: String, signup: bool, captcha_site_key: Option<&str>) -> Self {
        Self {
            page: PageContext::bare(title).with_captcha_site_key(captcha_site_key),
            message,
            signup,
            captcha_site_key: captcha_site_key.unwrap_or_default().to_string(),
        }
    }
}

#[derive(Template, askama_web::WebTemplate)]
#[template(path = "leagues.html")]
pub struct LeaguesPage {
    pub page: PageContext,
    pub joinable: Vec<League>,
    pub joined: Vec<League>,
}

#[derive(Template, askama_web::WebTemplate)]
#[template(path = "league.html")]
pub struct LeaguePage {
    pub page: PageContext,
    pub league_id: i64,
    pub league_name: String,
    pub season_name: String,
    pub standings: Vec<StandingView>,
    pub athletes: Vec<AthleteView>,
    pub meets: Vec<Meet>,
    /// Name of the meet picks are open for, empty when none is.
    pub current_meet_name: String,
    pub pick_slots: Vec<PickSlot>,
}

#[derive(Template, askama_web::WebTemplate)]
#[template(path = "fragments/login_form.html")]
pub struct LoginForm {
    pub captcha_site_key: String,
}

#[derive(Template, askama_web::WebTemplate)]
#[template(path = "fragments/signup_form.html")]
pub struct SignupForm {
    pub captcha_site_key: String,
}

#[derive(Template, askama_web::WebTemplate)]
#[template(path = "fragments/delete_form.html")]
pub struct DeleteForm;

#[derive(Template, askama_web::WebTemplate)]
#[template(path = "fragments/meet_info.html")]
pub struct MeetInfo {
    pub meet_name: String,
    pub results: Vec<MeetResultView>,
}

#[derive(Template, askama_web::WebTemplate)]
#[template(path = "fragments/athlete_info.html")]
pub struct AthleteInfo {
    pub name: String,
    pub year_label: &'static str,
    pub year_class: &'static str,
    pub sex: String,
    pub races: Vec<AthleteRaceView>,
    pub total: String,
    pub average: String,
}

/// Short coloured message swapped into the page.
#[derive(Template, askama_web::WebTemplate)]
#[template(path = "fragments/notice.html")]
pub struct Notice {
    pub message: String,
    pub success: bool,
}

impl Notice {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: false,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: true,
        }
    }
}
