//! Command line and tunable settings

use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

#[derive(Parser, Debug)]
#[command(name = "kfjc_trivia")]
#[command(about = "KFJC Trivia Robot: trivia questions from the station's play logs")]
#[command(version)]
pub struct Cli {
    /// SQLite database file
    #[arg(short, long, global = true, default_value = "trivia.sqlite", env = "KFJC_DATABASE")]
    pub database: PathBuf,

    /// Optional TOML file with tunables
    #[arg(short, long, global = true, env = "KFJC_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP server
    Serve {
        /// Address to listen on
        #[arg(short, long, default_value = "127.0.0.1:5000", env = "KFJC_BIND")]
        bind: String,
    },
    /// Import station CSV dumps
    Import {
        /// Directory holding album.csv, playlist.csv, ...
        #[arg(long, default_value = "station_data", env = "KFJC_DATA_DIR")]
        data_dir: PathBuf,
    },
    /// Generate and store trivia questions
    SeedQuestions,
    /// Drop and recreate every table
    Reset,
    /// Reset, import and seed questions in one go
    Rebuild {
        #[arg(long, default_value = "station_data", env = "KFJC_DATA_DIR")]
        data_dir: PathBuf,
    },
    /// Play in the terminal
    Play {
        /// Record answers for this user
        #[arg(short, long)]
        username: Option<String>,
    },
    /// Show all question codes
    List,
}

/// Tunables, read from the optional TOML file
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// DJs with this many shows or fewer are never asked about
    pub min_show_count: i64,
    /// CSV rows per import transaction
    pub chunk_size: usize,
    pub track_length_minutes: i64,
    pub number_spread_percent: u32,
    pub date_spread_percent: u32,
    /// Choice questions stored per kind by seed-questions
    pub questions_per_kind: usize,
    pub leaderboard_size: usize,
    /// Idle minutes before a login session is forgotten
    pub session_ttl_minutes: u64,
    /// Older sessions of a player are dropped past this many
    pub max_sessions_per_user: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            min_show_count: 40,
            chunk_size: 100_000,
            track_length_minutes: 4,
            number_spread_percent: 40,
            date_spread_percent: 20,
            questions_per_kind: 3,
            leaderboard_size: 10,
            session_ttl_minutes: 12 * 60,
            max_sessions_per_user: 5,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file, or defaults when no file is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let content = std::fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Config("chunk_size must be positive".into()));
        }
        if self.track_length_minutes <= 0 {
            return Err(Error::Config("track_length_minutes must be positive".into()));
        }
        if self.number_spread_percent == 0 || self.number_spread_percent >= 100 {
            return Err(Error::Config(
                "number_spread_percent must be between 1 and 99".into(),
            ));
        }
        if self.date_spread_percent == 0 || self.date_spread_percent >= 100 {
            return Err(Error::Config(
                "date_spread_percent must be between 1 and 99".into(),
            ));
        }
        if self.session_ttl_minutes == 0 || self.max_sessions_per_user == 0 {
            return Err(Error::Config(
                "session_ttl_minutes and max_sessions_per_user must be positive".into(),
            ));
        }
        Ok(())
    }
}
