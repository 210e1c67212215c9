//! KFJC Trivia Robot: trivia questions from a radio station's play logs.
//!
//! Station CSV dumps are imported into SQLite, questions are generated from
//! the play history and library, and players answer them over HTTP or in
//! the terminal.

pub mod albums;
pub mod answers;
pub mod common;
pub mod config;
pub mod db;
pub mod djs;
pub mod error;
pub mod importer;
pub mod model;
pub mod play;
pub mod playlist_tracks;
pub mod playlists;
pub mod question_bank;
pub mod questions;
pub mod robot;
pub mod server;
pub mod sql_runner;
pub mod tracks;
pub mod users;

pub use config::Settings;
pub use error::{Error, Result};
pub use server::{build_router, AppState};
