//! Station stats endpoints (JSON, no login)
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::AppState;
use crate::albums;
use crate::common::{ranked, top_n};
use crate::db;
use crate::djs;
use crate::error::{Error, Result};
use crate::playlist_tracks::{self, PlayField};
use crate::playlists::{self, DjStatsOrder};
use crate::question_bank;
use crate::tracks;

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 1000;

/// Build stats and health routes
pub fn rest_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/stats", get(stats))
        .route("/playlists", get(get_playlists))
        .route("/playlists/:kfjc_playlist_id", get(get_playlist))
        .route("/djs/:dj_id", get(get_dj))
        .route("/dj_favorites/:dj_id", get(dj_favorites))
        .route("/last_played/:field/:search", get(last_played))
        .route("/top_artists", get(top_artists))
        .route("/dj_stats", get(dj_stats))
        .route("/album_tracks/:kfjc_album_id", get(album_tracks))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
}

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /stats
pub async fn stats(State(state): State<AppState>) -> Result<Json<Value>> {
    state.with_db(|conn| Ok(Json(json!(question_bank::how_many(conn)?))))
}

#[derive(Debug, Deserialize)]
pub struct LimitParams {
    pub limit: Option<i64>,
}

fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

/// GET /playlists?limit=
pub async fn get_playlists(
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> Result<Json<Value>> {
    let limit = clamp_limit(params.limit);
    state.with_db(|conn| Ok(Json(json!(playlists::get_playlists(conn, limit)?))))
}

/// GET /playlists/:kfjc_playlist_id
pub async fn get_playlist(
    State(state): State<AppState>,
    Path(kfjc_playlist_id): Path<i64>,
) -> Result<Json<Value>> {
    state.with_db(|conn| {
        let playlist = playlists::get_playlist_by_kfjc_id(conn, kfjc_playlist_id)?
            .ok_or_else(|| Error::NotFound(format!("playlist {kfjc_playlist_id}")))?;
        let tracks = playlist_tracks::get_playlist_tracks_by_playlist_id(conn, kfjc_playlist_id)?;
        Ok(Json(json!({ "playlist": playlist, "tracks": tracks })))
    })
}

/// GET /djs/:dj_id
pub async fn get_dj(State(state): State<AppState>, Path(dj_id): Path<i64>) -> Result<Json<Value>> {
    state.with_db(|conn| {
        let shows = playlists::get_all_playlists_by_dj_id(conn, dj_id)?;
        let dj = djs::get_dj_by_id(conn, dj_id)?;
        Ok(Json(json!({
            "dj_id": dj_id,
            "air_name": dj.as_ref().map(|d| djs::get_air_name_for_dj(d, false)),
            "silent_mic": dj.as_ref().map(|d| d.silent_mic).unwrap_or(false),
            "count_playlists": shows.count_playlists,
            "first_show": shows.first_show,
            "last_show": shows.last_show,
            "playlists": shows.playlists,
        })))
    })
}

/// GET /dj_favorites/:dj_id
pub async fn dj_favorites(
    State(state): State<AppState>,
    Path(dj_id): Path<i64>,
) -> Result<Json<Value>> {
    state.with_db(|conn| {
        let counts = playlist_tracks::popular_artists_by_dj(conn, dj_id)?;
        if counts.is_empty() {
            return Err(Error::NotFound(format!("no plays for dj {dj_id}")));
        }
        let top_artists: Vec<Value> = ranked(&counts)
            .into_iter()
            .take(10)
            .map(|(artist, plays)| json!({ "artist": artist, "plays": plays }))
            .collect();
        Ok(Json(json!({
            "dj_id": dj_id,
            "favorites": top_n(&counts, 3),
            "top_artists": top_artists,
        })))
    })
}

/// GET /last_played/:field/:search
pub async fn last_played(
    State(state): State<AppState>,
    Path((field, search)): Path<(String, String)>,
    Query(params): Query<LimitParams>,
) -> Result<Json<Value>> {
    let field = PlayField::parse(&field)
        .ok_or_else(|| Error::InvalidInput(format!("search by artist, album or track, not {field}")))?;
    let limit = params.limit.unwrap_or(10).clamp(1, MAX_LIMIT);
    state.with_db(|conn| {
        let plays = playlist_tracks::last_played(conn, field, &search, limit)?;
        Ok(Json(Value::Array(plays.into_records())))
    })
}

#[derive(Debug, Deserialize)]
pub struct TopArtistsParams {
    pub top: Option<i64>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Accepts `YYYY-MM-DD` or a full timestamp
fn parse_date(s: &str, end_of_day: bool) -> Result<NaiveDateTime> {
    if let Some(t) = db::from_db_time(s) {
        return Ok(t);
    }
    let day = NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| Error::InvalidInput(format!("bad date {s}, use YYYY-MM-DD")))?;
    let time = if end_of_day {
        day.and_hms_opt(23, 59, 59)
    } else {
        day.and_hms_opt(0, 0, 0)
    };
    time.ok_or_else(|| Error::InvalidInput(format!("bad date {s}")))
}

/// GET /top_artists?top=&start_date=&end_date=
pub async fn top_artists(
    State(state): State<AppState>,
    Query(params): Query<TopArtistsParams>,
) -> Result<Json<Value>> {
    let top = params.top.unwrap_or(10).clamp(1, MAX_LIMIT);
    let start = match params.start_date.as_deref() {
        Some(s) => parse_date(s, false)?,
        None => parse_date("1970-01-01", false)?,
    };
    let end = match params.end_date.as_deref() {
        Some(s) => parse_date(s, true)?,
        None => Local::now().naive_local(),
    };
    state.with_db(|conn| {
        let result = playlist_tracks::top_artists(conn, top, start, end)?;
        Ok(Json(Value::Array(result.into_records())))
    })
}

#[derive(Debug, Deserialize)]
pub struct DjStatsParams {
    pub order_by: Option<String>,
    pub reverse: Option<String>,
}

/// GET /dj_stats?order_by=&reverse=
pub async fn dj_stats(
    State(state): State<AppState>,
    Query(params): Query<DjStatsParams>,
) -> Result<Json<Value>> {
    let order_by = match params.order_by.as_deref() {
        None => DjStatsOrder::FirstShow,
        Some(s) => DjStatsOrder::parse(s)
            .ok_or_else(|| Error::InvalidInput(format!("cannot order DJs by {s}")))?,
    };
    let reverse = matches!(
        params.reverse.as_deref().map(str::to_ascii_lowercase).as_deref(),
        Some("true" | "1" | "yes")
    );
    let min_show_count = state.settings.min_show_count;

    state.with_db(|conn| {
        let mut stats = playlists::dj_stats(conn, min_show_count)?;
        playlists::sort_dj_stats(&mut stats, order_by, reverse);
        Ok(Json(json!(stats)))
    })
}

/// GET /album_tracks/:kfjc_album_id
pub async fn album_tracks(
    State(state): State<AppState>,
    Path(kfjc_album_id): Path<i64>,
) -> Result<Json<Value>> {
    state.with_db(|conn| {
        let album = albums::get_album_by_id(conn, kfjc_album_id)?
            .ok_or_else(|| Error::NotFound(format!("album {kfjc_album_id}")))?;
        let listing = tracks::album_tracks(conn, kfjc_album_id)?;
        Ok(Json(json!({
            "album": album,
            "is_compilation": listing.is_compilation,
            "tracks": listing.tracks,
        })))
    })
}
