use axum::extract::State;
use axum_extra::extract::cookie::CookieJar;

use crate::auth::Session;
use crate::views::{IndexPage, PageContext};
use crate::AppState;

// GET / - Home page
pub async fn home(
    State(state): State<AppState>,
    session: Session,
    jar: CookieJar,
) -> (CookieJar, IndexPage) {
    let page = IndexPage {
        page: PageContext::new("fantasy xc", &session, state.config.captcha_site_key()),
    };

    (session.clear_if_stale(jar), page)
}

// GET /robots.txt - Keep crawlers out
pub async fn robots() -> &'static str {
    "User-Agent: *\nDisallow: /"
}
