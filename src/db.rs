//! SQLite schema, connections and small aggregate helpers

use chrono::NaiveDateTime;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use tracing::info;

use crate::error::{Error, Result};

/// Storage format for every timestamp column
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    user_id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    fname TEXT,
    hashed_password TEXT NOT NULL,
    salt TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS questions (
    question_id INTEGER PRIMARY KEY AUTOINCREMENT,
    code TEXT NOT NULL,
    question TEXT NOT NULL,
    question_type TEXT NOT NULL,
    acceptable_answers TEXT NOT NULL,
    wrong_answers TEXT NOT NULL DEFAULT '[]'
);
CREATE TABLE IF NOT EXISTS answers (
    answer_id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(user_id),
    question_id INTEGER NOT NULL REFERENCES questions(question_id),
    answer_given TEXT,
    answer_correct INTEGER,
    timestamp TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS djs (
    dj_id INTEGER PRIMARY KEY,
    air_name TEXT,
    administrative INTEGER NOT NULL DEFAULT 0,
    silent_mic INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS albums (
    id_ INTEGER PRIMARY KEY AUTOINCREMENT,
    kfjc_album_id INTEGER NOT NULL UNIQUE,
    artist TEXT,
    title TEXT,
    is_collection INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS playlists (
    id_ INTEGER PRIMARY KEY AUTOINCREMENT,
    kfjc_playlist_id INTEGER NOT NULL UNIQUE,
    dj_id INTEGER,
    air_name TEXT,
    start_time TEXT,
    end_time TEXT
);
CREATE TABLE IF NOT EXISTS playlist_tracks (
    id_ INTEGER PRIMARY KEY AUTOINCREMENT,
    kfjc_playlist_id INTEGER NOT NULL REFERENCES playlists(kfjc_playlist_id),
    indx INTEGER,
    kfjc_album_id INTEGER REFERENCES albums(kfjc_album_id),
    album_title TEXT,
    artist TEXT,
    track_title TEXT,
    time_played TEXT
);
CREATE TABLE IF NOT EXISTS tracks (
    id_ INTEGER PRIMARY KEY AUTOINCREMENT,
    kfjc_album_id INTEGER NOT NULL REFERENCES albums(kfjc_album_id),
    artist TEXT,
    title TEXT,
    indx INTEGER
);
CREATE INDEX IF NOT EXISTS idx_answers_user ON answers(user_id);
CREATE INDEX IF NOT EXISTS idx_playlists_dj ON playlists(dj_id);
CREATE INDEX IF NOT EXISTS idx_playlists_start ON playlists(start_time);
CREATE INDEX IF NOT EXISTS idx_playlist_tracks_playlist ON playlist_tracks(kfjc_playlist_id);
CREATE INDEX IF NOT EXISTS idx_playlist_tracks_artist ON playlist_tracks(artist);
CREATE INDEX IF NOT EXISTS idx_albums_artist ON albums(artist);
CREATE INDEX IF NOT EXISTS idx_tracks_album ON tracks(kfjc_album_id);
";

/// Tables in dependency order (parents first)
pub const TABLES: [&str; 8] = [
    "users",
    "questions",
    "answers",
    "djs",
    "albums",
    "playlists",
    "playlist_tracks",
    "tracks",
];

/// Opens (creating if needed) the database file with the schema in place
pub fn open(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    configure(&conn)?;
    create_all(&conn)?;
    info!("Connected to {}", path.display());
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure(&conn)?;
    create_all(&conn)?;
    Ok(conn)
}

fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    Ok(())
}

pub fn create_all(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

pub fn drop_all(conn: &Connection) -> Result<()> {
    for table in TABLES.iter().rev() {
        conn.execute_batch(&format!("DROP TABLE IF EXISTS {table};"))?;
    }
    Ok(())
}

/// Dump all data and re-create tables
pub fn reset(conn: &Connection) -> Result<()> {
    drop_all(conn)?;
    create_all(conn)?;
    info!("All tables dropped and recreated");
    Ok(())
}

/// Only table/column names from this crate reach the SQL string.
fn check_identifier(name: &str) -> Result<()> {
    let ok = !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if ok {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!("bad identifier: {name}")))
    }
}

/// A fast row counter, `COUNT([DISTINCT] column)`
pub fn get_count(conn: &Connection, table: &str, column: &str, unique: bool) -> Result<i64> {
    check_identifier(table)?;
    check_identifier(column)?;
    let distinct = if unique { "DISTINCT " } else { "" };
    let sql = format!("SELECT COUNT({distinct}{column}) FROM {table}");
    Ok(conn.query_row(&sql, [], |row| row.get(0))?)
}

/// Oldest and newest values of a timestamp column
pub fn get_age(
    conn: &Connection,
    table: &str,
    column: &str,
) -> Result<(Option<NaiveDateTime>, Option<NaiveDateTime>)> {
    check_identifier(table)?;
    check_identifier(column)?;
    let sql = format!("SELECT MIN({column}), MAX({column}) FROM {table}");
    let (oldest, newest): (Option<String>, Option<String>) =
        conn.query_row(&sql, [], |row| Ok((row.get(0)?, row.get(1)?)))?;
    Ok((
        oldest.as_deref().and_then(from_db_time),
        newest.as_deref().and_then(from_db_time),
    ))
}

pub fn to_db_time(t: &NaiveDateTime) -> String {
    t.format(TIME_FORMAT).to_string()
}

/// Parses stored timestamps, tolerating fractional seconds and a `T` separator
pub fn from_db_time(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, TIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
}

pub fn opt_time(s: Option<String>) -> Option<NaiveDateTime> {
    s.as_deref().and_then(from_db_time)
}

/// Does any row exist for this query?
pub fn exists(conn: &Connection, sql: &str, params: impl rusqlite::Params) -> Result<bool> {
    Ok(conn
        .query_row(sql, params, |_| Ok(()))
        .optional()?
        .is_some())
}

/// Small station fixture shared by unit tests across modules.
///
/// Three prolific DJs (ids 1-3, 47 to 51 shows, starting in different
/// years), one rebroadcast account, a handful of albums and tracks.
#[cfg(test)]
pub(crate) fn seeded() -> Connection {
    use rusqlite::params;

    let conn = open_in_memory().unwrap();

    conn.execute_batch(
        "INSERT INTO albums (kfjc_album_id, artist, title, is_collection) VALUES
            (1, 'Sun Ra', 'Space Is the Place', 0),
            (2, 'Sun Ra', 'Lanquidity', 0),
            (3, 'The Fall', 'Hex Enduction Hour', 0),
            (4, 'Various Artists', 'Nuggets', 1),
            (5, 'Can', 'Tago Mago', 0),
            (6, 'Neu!', 'Neu! 75', 0);
         INSERT INTO tracks (kfjc_album_id, artist, title, indx) VALUES
            (1, NULL, 'Space Is the Place', 1),
            (1, NULL, 'Images', 2),
            (2, NULL, 'Lanquidity', 1),
            (3, NULL, 'The Classical', 1),
            (4, 'The Seeds', 'Pushin Too Hard', 1),
            (4, 'The Standells', 'Dirty Water', 2),
            (5, NULL, 'Mushroom', 1),
            (6, NULL, 'Isi', 1);
         INSERT INTO djs (dj_id, air_name, administrative, silent_mic) VALUES
            (1, 'Cynthia Fierce', 0, 0),
            (2, 'Robert Emmett', 0, 1),
            (3, 'Spliff Skankin''', 0, 0),
            (431, 'KFJC Rebroadcast', 1, 0);",
    )
    .unwrap();

    let artists = ["Sun Ra", "The Fall", "Can", "Neu!"];
    let mut playlist_id = 1;
    for (dj_id, air_name, first_year) in [
        (1, "Cynthia Fierce", 1996),
        (2, "Robert Emmett", 2001),
        (3, "Spliff Skankin'", 2010),
    ] {
        // DJ 3 has the most shows, DJ 1 the earliest first show
        let shows = 45 + dj_id * 2;
        for show in 0..shows {
            let start = format!("{}-{:02}-01 22:00:00", first_year + show / 12, show % 12 + 1);
            let end = format!("{}-{:02}-02 01:00:00", first_year + show / 12, show % 12 + 1);
            conn.execute(
                "INSERT INTO playlists (kfjc_playlist_id, dj_id, air_name, start_time, end_time)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![playlist_id, dj_id, air_name, start, end],
            )
            .unwrap();
            // Each DJ favours a different artist
            let favourite = artists[(dj_id - 1) as usize];
            for indx in 0..3 {
                let artist = if indx < 2 { favourite } else { artists[3] };
                conn.execute(
                    "INSERT INTO playlist_tracks
                        (kfjc_playlist_id, indx, kfjc_album_id, album_title, artist, track_title, time_played)
                     VALUES (?1, ?2, NULL, 'Some Album', ?3, ?4, ?5)",
                    params![playlist_id, indx, artist, format!("Song {indx}"), start],
                )
                .unwrap();
            }
            playlist_id += 1;
        }
    }

    conn.execute(
        "INSERT INTO playlists (kfjc_playlist_id, dj_id, air_name, start_time, end_time)
         VALUES (?1, 431, 'KFJC Rebroadcast', '1995-09-19 22:00:00', '1995-09-20 01:00:00')",
        params![playlist_id],
    )
    .unwrap();

    conn
}
