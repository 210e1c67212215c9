//! HTTP server: the game pages and the station stats endpoints.
//!
//! Pages are JSON page models; `/` serves the single HTML shell that renders
//! them. Game routes need a session, stats routes are public.
use axum::Router;
use rusqlite::Connection;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Settings;
use crate::error::{Error, Result};

pub mod game;
pub mod rest;
pub mod session;

pub use session::{require_session, CurrentSession, Session};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// One SQLite connection; never held across an `.await`
    pub db: Arc<Mutex<Connection>>,
    pub settings: Arc<Settings>,
    /// Session token to logged in user
    pub sessions: Arc<Mutex<HashMap<String, Session>>>,
}

impl AppState {
    pub fn new(conn: Connection, settings: Settings) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
            settings: Arc::new(settings),
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Runs `f` with the database locked
    pub fn with_db<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self
            .db
            .lock()
            .map_err(|_| Error::Internal("database lock poisoned".into()))?;
        f(&conn)
    }

    pub(crate) fn sessions(&self) -> Result<MutexGuard<'_, HashMap<String, Session>>> {
        self.sessions
            .lock()
            .map_err(|_| Error::Internal("session lock poisoned".into()))
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post};

    // Game routes that need a logged in player
    let protected = Router::new()
        .route("/question", get(game::question))
        .route("/answer", post(game::answer))
        .route("/score", get(game::score))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session::require_session,
        ));

    let public = Router::new()
        .route("/", get(game::serve_index))
        .route("/play", get(game::play))
        .route("/login", post(game::login))
        .route("/create_account", post(game::create_account))
        .route("/logout", get(game::logout))
        .route("/leaderboard", get(game::leaderboard))
        .route("/infopage", get(game::infopage))
        .merge(rest::rest_routes());

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until the process is stopped
pub async fn serve(state: AppState, bind: &str) -> Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("KFJC Trivia Robot listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
