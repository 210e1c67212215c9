//! Game pages: accounts, questions, answers, scores
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Extension, Form, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::session::{expired_cookie, session_cookie, token_from_headers};
use super::{AppState, CurrentSession};
use crate::answers;
use crate::common::make_date_pretty;
use crate::db;
use crate::error::{Error, Result};
use crate::question_bank;
use crate::robot::{pick, reaction, robot_image, INFORMATION, ROBOT_MESSAGES};
use crate::users;

const INDEX_HTML: &str = include_str!("index.html");

/// Where players go when they would rather listen
pub const STATION_PLAYER_URL: &str = "https://kfjc.org/player";

/// GET /
pub async fn serve_index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

#[derive(Debug, Deserialize)]
pub struct PlayParams {
    #[serde(rename = "game-on")]
    pub game_on: Option<String>,
}

/// GET /play?game-on=true
pub async fn play(Query(params): Query<PlayParams>) -> Redirect {
    match params.game_on.as_deref() {
        Some("true") => Redirect::to("/question"),
        _ => Redirect::to(STATION_PLAYER_URL),
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateAccountForm {
    pub username: String,
    pub fname: Option<String>,
    pub password: String,
}

fn logged_in(status: StatusCode, token: String, message: String) -> Response {
    (
        status,
        [(header::SET_COOKIE, session_cookie(&token))],
        Json(json!({
            "message": message,
            "token": token,
            "redirect": "/question",
        })),
    )
        .into_response()
}

/// POST /login
pub async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Result<Response> {
    let user = state.with_db(|conn| users::authenticate(conn, &form.username, &form.password))?;
    let token = state.start_session(user.user_id)?;
    info!("{} logged in", user.username);
    Ok(logged_in(
        StatusCode::OK,
        token,
        format!("Welcome back, {}!", user.display_name()),
    ))
}

/// POST /create_account
pub async fn create_account(
    State(state): State<AppState>,
    Form(form): Form<CreateAccountForm>,
) -> Result<Response> {
    let fname = form.fname.as_deref().map(str::trim).filter(|f| !f.is_empty());
    let user = state.with_db(|conn| users::create_user(conn, &form.username, fname, &form.password))?;
    let token = state.start_session(user.user_id)?;
    info!("New player {}", user.username);
    Ok(logged_in(
        StatusCode::CREATED,
        token,
        format!("Welcome to the KFJC Trivia Robot, {}!", user.display_name()),
    ))
}

/// GET /logout
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response> {
    if let Some(token) = token_from_headers(&headers) {
        state.end_session(&token)?;
    }
    Ok((
        [(header::SET_COOKIE, expired_cookie())],
        Json(json!({
            "message": "You've been logged out.",
            "redirect": "/",
        })),
    )
        .into_response())
}

/// One question dealt to a player
#[derive(Debug, Serialize)]
pub struct QuestionPage {
    pub player: String,
    pub question_id: i64,
    pub question: String,
    pub choices: Vec<String>,
    pub robot_image: String,
}

/// GET /question
pub async fn question(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
) -> Result<Response> {
    let dealt = state.with_db(|conn| {
        let user = users::get_user_by_id(conn, current.user_id)?
            .ok_or_else(|| Error::Unauthorized("player no longer exists".into()))?;
        let q = question_bank::get_unique_question(conn, user.user_id)?;
        let mut rng = rand::thread_rng();
        let choices = question_bank::get_answer_pile(&q, &state.settings, &mut rng)?;
        Ok(QuestionPage {
            player: user.display_name().to_string(),
            question_id: q.question_id,
            question: q.question,
            choices,
            robot_image: robot_image(&mut rng),
        })
    });

    match dealt {
        Ok(page) => {
            state.set_current_question(&current.token, Some(page.question_id))?;
            Ok(Json(page).into_response())
        }
        Err(Error::QuestionPoolExhausted) => Ok(Json(json!({
            "message": Error::QuestionPoolExhausted.to_string(),
            "redirect": "/leaderboard",
        }))
        .into_response()),
        Err(e) => Err(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct AnswerForm {
    pub q: String,
}

/// POST /answer
pub async fn answer(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Form(form): Form<AnswerForm>,
) -> Result<Json<Value>> {
    let question_id = state
        .session(&current.token)?
        .and_then(|s| s.question_id)
        .ok_or_else(|| Error::InvalidInput("no question waiting, GET /question first".into()))?;

    let page = state.with_db(|conn| {
        let q = question_bank::get_question_by_id(conn, question_id)?
            .ok_or_else(|| Error::NotFound(format!("question {question_id}")))?;
        let recorded = answers::create_answer(conn, current.user_id, &q, &form.q)?;
        let mut rng = rand::thread_rng();

        Ok(match recorded.answer_correct {
            None => json!({
                "skipped": true,
                "message": "Skipped! Here comes another one.",
                "next": "/question",
            }),
            Some(correct) => json!({
                "correct": correct,
                "message": reaction(correct, &mut rng),
                "information": pick(&INFORMATION, &mut rng),
                "question": q.question,
                "rephrase_the_question": q.acceptable_answers.rephrase_the_question,
                "answer": q.acceptable_answers.display_answer,
                "robot_image": robot_image(&mut rng),
                "next": "/question",
            }),
        })
    })?;

    state.set_current_question(&current.token, None)?;
    Ok(Json(page))
}

/// GET /score
pub async fn score(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
) -> Result<Json<Value>> {
    state.with_db(|conn| {
        let user = users::get_user_by_id(conn, current.user_id)?
            .ok_or_else(|| Error::Unauthorized("player no longer exists".into()))?;
        let score = answers::get_user_score(conn, user.user_id)?;
        let mut rng = rand::thread_rng();
        Ok(Json(json!({
            "player": user.display_name(),
            "score": score,
            "message": pick(&ROBOT_MESSAGES, &mut rng),
            "robot_image": robot_image(&mut rng),
        })))
    })
}

/// GET /leaderboard
pub async fn leaderboard(State(state): State<AppState>) -> Result<Json<Value>> {
    let size = state.settings.leaderboard_size;
    state.with_db(|conn| {
        let entries = answers::leaderboard(conn, size)?;
        Ok(Json(json!({
            "title": format!("Here are the Top {} KFJC Trivia Robot Players!", spelled(size)),
            "players": entries,
            "play_again": { "text": "Play again?", "href": "/question" },
        })))
    })
}

fn spelled(n: usize) -> String {
    const SMALL: [&str; 11] = [
        "Zero", "One", "Two", "Three", "Four", "Five", "Six", "Seven", "Eight", "Nine", "Ten",
    ];
    SMALL.get(n).map(|s| s.to_string()).unwrap_or_else(|| n.to_string())
}

/// GET /infopage
pub async fn infopage(State(state): State<AppState>) -> Result<Json<Value>> {
    state.with_db(|conn| {
        let (oldest, newest) = db::get_age(conn, "playlists", "start_time")?;
        Ok(Json(json!({
            "data_begins": oldest.as_ref().map(make_date_pretty),
            "data_ends": newest.as_ref().map(make_date_pretty),
            "counts": question_bank::how_many(conn)?,
            "grades": answers::grade_all_answers(conn)?,
        })))
    })
}
