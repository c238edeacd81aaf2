mod common;

use axum::http::StatusCode;
use common::{body_text, location, seed_season, TestApp};
use fantasy_xc::db;
use fantasy_xc::scoring::RaceTime;

async fn join(app: &TestApp, cookie: &str, league_id: i64) {
    let response = app.get(&format!("/leagues/join/{league_id}"), Some(cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/leagues");
}

async fn pick_rows(app: &TestApp) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM meetpicks")
        .fetch_one(&app.pool)
        .await
        .unwrap()
}

async fn record(app: &TestApp, athlete_id: i64, meet_id: i64, previous: &str, finish: &str) {
    let previous: RaceTime = previous.parse().unwrap();
    let finish: RaceTime = finish.parse().unwrap();
    let score = fantasy_xc::scoring::score(previous, finish);
    db::upsert_race(&app.pool, athlete_id, meet_id, previous, finish, score)
        .await
        .unwrap();
}

#[tokio::test]
async fn league_pages_require_login() {
    let app = TestApp::new().await;
    let fixture = seed_season(&app.pool).await;

    let response = app.get("/leagues", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let response = app.get(&format!("/leagues/{}", fixture.league_id), None).await;
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn joining_twice_keeps_one_membership() {
    let app = TestApp::new().await;
    let fixture = seed_season(&app.pool).await;
    let cookie = app.signup("runner", "pw").await;

    let before = body_text(app.get("/leagues", Some(&cookie)).await).await;
    assert!(before.contains(&format!("/leagues/join/{}", fixture.league_id)));
    assert!(before.contains("no leagues joined..."));

    join(&app, &cookie, fixture.league_id).await;
    join(&app, &cookie, fixture.league_id).await;

    let members: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM leaguemembers")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(members, 1);

    let after = body_text(app.get("/leagues", Some(&cookie)).await).await;
    assert!(after.contains(&format!(r#"href="/leagues/{}""#, fixture.league_id)));
    assert!(after.contains("no joinable leagues..."));
}

#[tokio::test]
async fn closed_leagues_cannot_be_joined() {
    let app = TestApp::new().await;
    let fixture = seed_season(&app.pool).await;
    let closed = db::create_league(&app.pool, "invite only", fixture.season_id, false)
        .await
        .unwrap();
    let cookie = app.signup("runner", "pw").await;

    let page = body_text(app.get("/leagues", Some(&cookie)).await).await;
    assert!(!page.contains("invite only"));

    join(&app, &cookie, closed).await;
    let user_id = app.user_id("runner").await;
    assert!(!db::is_member(&app.pool, user_id, closed).await.unwrap());

    // missing league is a quiet no-op too
    join(&app, &cookie, 9999).await;
}

#[tokio::test]
async fn non_members_are_sent_back_to_the_list() {
    let app = TestApp::new().await;
    let fixture = seed_season(&app.pool).await;
    let cookie = app.signup("outsider", "pw").await;

    let response = app.get(&format!("/leagues/{}", fixture.league_id), Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/leagues");

    let response = app.get("/leagues/9999", Some(&cookie)).await;
    assert_eq!(location(&response), "/leagues");

    let response = app
        .post_form(&format!("/leagues/{}/meetpicks", fixture.league_id), "pick1=1", Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("you are not a member of this league"));
    assert_eq!(pick_rows(&app).await, 0);
}

#[tokio::test]
async fn league_page_shows_picks_form_and_roster() {
    let app = TestApp::new().await;
    let fixture = seed_season(&app.pool).await;
    let cookie = app.signup("runner", "pw").await;
    join(&app, &cookie, fixture.league_id).await;

    let page = body_text(app.get(&format!("/leagues/{}", fixture.league_id), Some(&cookie)).await).await;
    assert!(page.contains("varsity league"));
    assert!(page.contains("season: fall 2024"));
    assert!(page.contains("picks for conference championship"));
    assert!(page.contains("ana (FR, F)"));
    assert!(page.contains("dev (SR, M)"));
    assert!(page.contains(&format!("/leagues/{}/meetpicks", fixture.league_id)));
}

#[tokio::test]
async fn picks_are_saved_and_replaced() {
    let app = TestApp::new().await;
    let fixture = seed_season(&app.pool).await;
    let cookie = app.signup("runner", "pw").await;
    join(&app, &cookie, fixture.league_id).await;
    let uri = format!("/leagues/{}/meetpicks", fixture.league_id);
    let [ana, bea, cal, _] = fixture.athletes[..] else { panic!("four athletes") };

    let form = format!("pick1={ana}&pick2={bea}&pick3=");
    let response = app.post_form(&uri, &form, Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("picks saved for conference championship: ana, bea"));
    assert!(body.contains("green"));

    let form = format!("pick1={cal}");
    app.post_form(&uri, &form, Some(&cookie)).await;

    assert_eq!(pick_rows(&app).await, 1);
    let user_id = app.user_id("runner").await;
    let stored = db::get_meet_pick(&app.pool, user_id, fixture.league_id, fixture.meet_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.slots(), [Some(cal), None, None]);

    // the page preselects the saved pick
    let page = body_text(app.get(&format!("/leagues/{}", fixture.league_id), Some(&cookie)).await).await;
    assert!(page.contains(&format!(r#"<option value="{cal}" selected>"#)));

    let response = app.post_form(&uri, "pick1=&pick2=&pick3=", Some(&cookie)).await;
    assert!(body_text(response).await.contains("picks cleared for conference championship"));
    assert_eq!(pick_rows(&app).await, 1);
}

#[tokio::test]
async fn invalid_picks_write_nothing() {
    let app = TestApp::new().await;
    let fixture = seed_season(&app.pool).await;
    let cookie = app.signup("runner", "pw").await;
    join(&app, &cookie, fixture.league_id).await;
    let uri = format!("/leagues/{}/meetpicks", fixture.league_id);
    let ana = fixture.athletes[0];

    let response = app.post_form(&uri, &format!("pick1={ana}&pick2={ana}"), Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("you cannot pick the same athlete twice"));

    let response = app.post_form(&uri, "pick1=abc", Some(&cookie)).await;
    assert!(body_text(response).await.contains("pick 1 is not a valid athlete"));

    let other_season = db::create_season(&app.pool, "spring 2025").await.unwrap();
    let stranger = db::create_athlete(&app.pool, "eve", 2, "F", other_season).await.unwrap();
    let response = app
        .post_form(&uri, &format!("pick1={ana}&pick2={stranger}"), Some(&cookie))
        .await;
    assert!(body_text(response).await.contains("not running in this season"));

    assert_eq!(pick_rows(&app).await, 0);
}

#[tokio::test]
async fn picks_need_an_open_meet() {
    let app = TestApp::new().await;
    let fixture = seed_season(&app.pool).await;
    db::set_current_meet(&app.pool, fixture.season_id, None).await.unwrap();
    let cookie = app.signup("runner", "pw").await;
    join(&app, &cookie, fixture.league_id).await;

    let response = app
        .post_form(
            &format!("/leagues/{}/meetpicks", fixture.league_id),
            &format!("pick1={}", fixture.athletes[0]),
            Some(&cookie),
        )
        .await;
    assert!(body_text(response).await.contains("no meet is open for picks right now"));
    assert_eq!(pick_rows(&app).await, 0);

    let page = body_text(app.get(&format!("/leagues/{}", fixture.league_id), Some(&cookie)).await).await;
    assert!(page.contains("picks are closed"));

    let response = app
        .post_form(&format!("/leagues/{}/meetpicks", fixture.league_id), "", None)
        .await;
    assert!(body_text(response).await.contains("please log in to make picks"));
}

#[tokio::test]
async fn standings_rank_ties_together() {
    let app = TestApp::new().await;
    let fixture = seed_season(&app.pool).await;
    let [ana, bea, _, _] = fixture.athletes[..] else { panic!("four athletes") };
    let uri = format!("/leagues/{}/meetpicks", fixture.league_id);

    let mut cookies = Vec::new();
    for name in ["amy", "bob", "cat"] {
        let cookie = app.signup(name, "pw").await;
        join(&app, &cookie, fixture.league_id).await;
        cookies.push(cookie);
    }

    // amy and bob pick different athletes with identical scores; cat picks nobody
    app.post_form(&uri, &format!("pick1={ana}"), Some(&cookies[0])).await;
    app.post_form(&uri, &format!("pick1={bea}"), Some(&cookies[1])).await;
    record(&app, ana, fixture.meet_id, "18:00", "18:00").await;
    record(&app, bea, fixture.meet_id, "19:30", "19:30").await;

    let standings = db::get_league_standings(&app.pool, fixture.league_id).await.unwrap();
    let places: Vec<(&str, i64)> = standings.iter().map(|s| (s.username.as_str(), s.place)).collect();
    assert_eq!(places, vec![("amy", 1), ("bob", 1), ("cat", 3)]);
    assert_eq!(standings[2].total_score, 0.0);

    let page = body_text(app.get(&format!("/leagues/{}", fixture.league_id), Some(&cookies[2])).await).await;
    assert!(page.contains(r#"<li value="1">amy <mark>100.00</mark></li>"#));
    assert!(page.contains(r#"<li value="3">cat <mark>0.00</mark></li>"#));
}

#[tokio::test]
async fn standings_ignore_other_leagues() {
    let app = TestApp::new().await;
    let fixture = seed_season(&app.pool).await;
    let second = db::create_league(&app.pool, "jv league", fixture.season_id, true)
        .await
        .unwrap();
    let ana = fixture.athletes[0];

    let cookie = app.signup("amy", "pw").await;
    join(&app, &cookie, fixture.league_id).await;
    join(&app, &cookie, second).await;

    app.post_form(&format!("/leagues/{second}/meetpicks"), &format!("pick1={ana}"), Some(&cookie))
        .await;
    record(&app, ana, fixture.meet_id, "18:00", "17:00").await;

    let main = db::get_league_standings(&app.pool, fixture.league_id).await.unwrap();
    let jv = db::get_league_standings(&app.pool, second).await.unwrap();
    assert_eq!(main[0].total_score, 0.0);
    assert!(jv[0].total_score > 100.0);
}

#[tokio::test]
async fn meet_and_athlete_fragments() {
    let app = TestApp::new().await;
    let fixture = seed_season(&app.pool).await;
    let cookie = app.signup("runner", "pw").await;
    let [ana, bea, _, _] = fixture.athletes[..] else { panic!("four athletes") };

    let response = app
        .post_form("/leagues/meetinfo", &format!("meet_id={}", fixture.meet_id), Some(&cookie))
        .await;
    assert!(body_text(response).await.contains("could not get meet info (try checking later)"));

    record(&app, ana, fixture.meet_id, "18:00", "18:00").await;
    record(&app, bea, fixture.meet_id, "18:00", "19:00").await;

    let html = body_text(
        app.post_form("/leagues/meetinfo", &format!("meet_id={}", fixture.meet_id), Some(&cookie))
            .await,
    )
    .await;
    assert!(html.contains("conference championship"));
    assert!(html.contains("100.00"));
    assert!(html.contains("firstplace"));
    assert!(html.contains("58.24"));
    assert!(html.find("ana").unwrap() < html.find("bea").unwrap());

    let html = body_text(
        app.post_form("/leagues/athleteinfo", &format!("athlete_id={bea}"), Some(&cookie))
            .await,
    )
    .await;
    assert!(html.contains("bea"));
    assert!(html.contains("SO"));
    assert!(html.contains("19:00"));
    assert!(html.contains("worse"));
    assert!(html.contains("total: 58.24 | average: 58.24"));

    // the roster on the league page reports the same aggregates
    join(&app, &cookie, fixture.league_id).await;
    let page = body_text(app.get(&format!("/leagues/{}", fixture.league_id), Some(&cookie)).await).await;
    let row = page.split("<tr>").find(|row| row.contains("<td>bea</td>")).unwrap();
    assert_eq!(row.matches("58.24").count(), 2);

    let html = body_text(
        app.post_form("/leagues/athleteinfo", &format!("athlete_id={}", fixture.athletes[3]), Some(&cookie))
            .await,
    )
    .await;
    assert!(html.contains("total: 0.00 | average: 0.00"));

    let response = app.post_form("/leagues/meetinfo", "meet_id=", Some(&cookie)).await;
    assert!(body_text(response).await.contains("could not get meet info"));

    let response = app
        .post_form("/leagues/athleteinfo", &format!("athlete_id={ana}"), None)
        .await;
    assert!(body_text(response).await.contains("could not get athlete info"));
}

#[tokio::test]
async fn admin_routes_require_the_admin_role() {
    let app = TestApp::new().await;
    let fixture = seed_season(&app.pool).await;
    let ana = fixture.athletes[0];
    let form = format!("athlete_id={ana}&meet_id={}&previous=18:00&finish=18:00", fixture.meet_id);

    let response = app.post_form("/admin/races", &form, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let cookie = app.signup("coach", "pw").await;
    let response = app.post_form("/admin/races", &form, Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    app.make_admin("coach").await;
    let response = app.post_form("/admin/races", &form, Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("scored 100.00"));

    let score: f64 = sqlx::query_scalar("SELECT score FROM races WHERE athlete_id = ?")
        .bind(ana)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert!((score - 100.0).abs() < 1e-9);

    // correcting a result replaces it
    let form = format!("athlete_id={ana}&meet_id={}&previous=18:00&finish=19:00", fixture.meet_id);
    app.post_form("/admin/races", &form, Some(&cookie)).await;
    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM races")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(rows, 1);

    let form = format!("athlete_id={ana}&meet_id={}&previous=18:xx&finish=19:00", fixture.meet_id);
    let response = app.post_form("/admin/races", &form, Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let form = format!("athlete_id={ana}&meet_id={}&previous=80000000:00&finish=18:00", fixture.meet_id);
    let response = app.post_form("/admin/races", &form, Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response).await.contains("time must be under 600 minutes"));
}

#[tokio::test]
async fn admin_can_build_a_season() {
    let app = TestApp::new().await;
    let cookie = app.signup("coach", "pw").await;
    app.make_admin("coach").await;

    let response = app.post_form("/admin/seasons", "season_name=fall%202025", Some(&cookie)).await;
    assert!(body_text(response).await.contains("created season fall 2025"));
    let season_id: i64 = sqlx::query_scalar("SELECT season_id FROM seasons")
        .fetch_one(&app.pool)
        .await
        .unwrap();

    let response = app
        .post_form(
            "/admin/leagues",
            &format!("league_name=open&season_id={season_id}&joinable=on"),
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    app.post_form("/admin/meets", &format!("meet_name=opener&season_id={season_id}"), Some(&cookie))
        .await;
    let meet_id: i64 = sqlx::query_scalar("SELECT meet_id FROM meets")
        .fetch_one(&app.pool)
        .await
        .unwrap();

    let response = app
        .post_form(
            "/admin/athletes",
            &format!("athlete_name=zed&athlete_year=5&sex=M&season_id={season_id}"),
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .post_form(
            "/admin/athletes",
            &format!("athlete_name=zed&athlete_year=4&sex=m&season_id={season_id}"),
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .post_form(
            &format!("/admin/seasons/{season_id}/current_meet"),
            &format!("meet_id={meet_id}"),
            Some(&cookie),
        )
        .await;
    assert!(body_text(response).await.contains("picks are open"));

    let season = db::get_season(&app.pool, season_id).await.unwrap().unwrap();
    assert_eq!(season.current_meet_id, Some(meet_id));

    let joinable = db::get_joinable_leagues(&app.pool, app.user_id("coach").await)
        .await
        .unwrap();
    assert_eq!(joinable.len(), 1);
}

#[tokio::test]
async fn malformed_ids_get_the_error_page() {
    let app = TestApp::new().await;
    seed_season(&app.pool).await;
    let cookie = app.signup("coach", "pw").await;
    app.make_admin("coach").await;

    let response = app.get("/leagues/abc", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_text(response).await.contains("sorry, that page does not exist"));

    let response = app.get("/leagues/join/abc", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .post_form("/admin/leagues", "league_name=open&season_id=abc", Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_text(response).await;
    assert!(body.contains("<html"));
    assert!(body.contains("please make sure you entered everything correctly"));

    let response = app
        .post_form("/admin/seasons/abc/current_meet", "meet_id=1", Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // auth is still checked first
    let response = app.post_form("/admin/leagues", "season_id=abc", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
