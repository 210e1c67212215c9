//! Play history: one row per song played during a show
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use std::collections::HashMap;

use crate::db::{self, opt_time};
use crate::error::{Error, Result};
use crate::model::PlaylistTrack;
use crate::sql_runner::{self, QueryResult};

const TRACK_COLUMNS: &str =
    "id_, kfjc_playlist_id, indx, kfjc_album_id, album_title, artist, track_title, time_played";

fn from_row(row: &Row) -> rusqlite::Result<PlaylistTrack> {
    Ok(PlaylistTrack {
        id_: row.get(0)?,
        kfjc_playlist_id: row.get(1)?,
        indx: row.get(2)?,
        kfjc_album_id: row.get(3)?,
        album_title: row.get(4)?,
        artist: row.get(5)?,
        track_title: row.get(6)?,
        time_played: opt_time(row.get(7)?),
    })
}

/// Fields of a new play, as read from the station export
#[derive(Debug, Clone, Default)]
pub struct NewPlaylistTrack {
    pub kfjc_playlist_id: i64,
    pub indx: Option<i64>,
    pub kfjc_album_id: Option<i64>,
    pub album_title: Option<String>,
    pub artist: Option<String>,
    pub track_title: Option<String>,
    pub time_played: Option<NaiveDateTime>,
}

pub fn create_playlist_track(conn: &Connection, track: &NewPlaylistTrack) -> Result<i64> {
    conn.execute(
        "INSERT INTO playlist_tracks
            (kfjc_playlist_id, indx, kfjc_album_id, album_title, artist, track_title, time_played)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            track.kfjc_playlist_id,
            track.indx,
            track.kfjc_album_id,
            track.album_title,
            track.artist,
            track.track_title,
            track.time_played.as_ref().map(db::to_db_time),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Up to `limit` plays; the full table holds millions of rows
pub fn get_playlist_tracks(conn: &Connection, limit: i64) -> Result<Vec<PlaylistTrack>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TRACK_COLUMNS} FROM playlist_tracks ORDER BY id_ LIMIT ?1"
    ))?;
    let tracks = stmt
        .query_map([limit], from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(tracks)
}

/// One show's plays in running order
pub fn get_playlist_tracks_by_playlist_id(
    conn: &Connection,
    kfjc_playlist_id: i64,
) -> Result<Vec<PlaylistTrack>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TRACK_COLUMNS} FROM playlist_tracks WHERE kfjc_playlist_id = ?1 ORDER BY indx, id_"
    ))?;
    let tracks = stmt
        .query_map([kfjc_playlist_id], from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(tracks)
}

pub fn get_playlist_track_by_playlist_id_and_indx(
    conn: &Connection,
    kfjc_playlist_id: i64,
    indx: i64,
) -> Result<Option<PlaylistTrack>> {
    Ok(conn
        .query_row(
            &format!(
                "SELECT {TRACK_COLUMNS} FROM playlist_tracks
                 WHERE kfjc_playlist_id = ?1 AND indx = ?2 LIMIT 1"
            ),
            params![kfjc_playlist_id, indx],
            from_row,
        )
        .optional()?)
}

/// Which column a last-played search matches on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayField {
    Artist,
    Album,
    Track,
}

impl PlayField {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "artist" => Some(PlayField::Artist),
            "album" => Some(PlayField::Album),
            "track" => Some(PlayField::Track),
            _ => None,
        }
    }

    fn column(&self) -> &'static str {
        match self {
            PlayField::Artist => "artist",
            PlayField::Album => "album_title",
            PlayField::Track => "track_title",
        }
    }
}

/// Most recent plays of an artist, album or track, with who played them
pub fn last_played(
    conn: &Connection,
    field: PlayField,
    search: &str,
    limit: i64,
) -> Result<QueryResult> {
    let search = search.trim();
    if search.is_empty() {
        return Err(Error::InvalidInput("search text is required".into()));
    }
    let sql = format!(
        "SELECT p.air_name, t.artist, t.album_title, t.track_title, t.time_played
         FROM playlist_tracks t
         JOIN playlists p ON p.kfjc_playlist_id = t.kfjc_playlist_id
         WHERE t.{column} = ?1 COLLATE NOCASE AND t.time_played IS NOT NULL
         ORDER BY t.time_played DESC
         LIMIT ?2",
        column = field.column()
    );
    sql_runner::run_query(conn, &sql, params![search, limit])
}

/// Most played artists between two times (inclusive)
pub fn top_artists(
    conn: &Connection,
    top: i64,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Result<QueryResult> {
    if end < start {
        return Err(Error::InvalidInput("end_date is before start_date".into()));
    }
    sql_runner::run_query(
        conn,
        "SELECT artist, COUNT(*) AS plays
         FROM playlist_tracks
         WHERE artist IS NOT NULL AND time_played BETWEEN ?1 AND ?2
         GROUP BY artist
         ORDER BY plays DESC, artist
         LIMIT ?3",
        params![db::to_db_time(&start), db::to_db_time(&end), top],
    )
}

/// Artist play counts over every show a DJ has done
pub fn popular_artists_by_dj(conn: &Connection, dj_id: i64) -> Result<HashMap<String, u64>> {
    let mut stmt = conn.prepare(
        "SELECT t.artist, COUNT(*)
         FROM playlist_tracks t
         JOIN playlists p ON p.kfjc_playlist_id = t.kfjc_playlist_id
         WHERE p.dj_id = ?1 AND t.artist IS NOT NULL AND t.artist NOT IN ('', 'NULL')
         GROUP BY t.artist",
    )?;
    let rows = stmt.query_map([dj_id], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;

    let mut counts = HashMap::new();
    for row in rows {
        let (artist, plays) = row?;
        counts.insert(artist, plays as u64);
    }
    Ok(counts)
}

/// Top artists for one calendar year, most played first
#[derive(Debug, Clone, Serialize)]
pub struct ArtistPlays {
    pub artist: String,
    pub plays: i64,
}

pub fn most_played_artists_in_year(conn: &Connection, year: i32, n: i64) -> Result<Vec<ArtistPlays>> {
    let mut stmt = conn.prepare(
        "SELECT artist, COUNT(*) AS plays
         FROM playlist_tracks
         WHERE artist IS NOT NULL AND strftime('%Y', time_played) = ?1
         GROUP BY artist
         ORDER BY plays DESC, artist
         LIMIT ?2",
    )?;
    let rows = stmt
        .query_map(params![format!("{year:04}"), n], |row| {
            Ok(ArtistPlays {
                artist: row.get(0)?,
                plays: row.get(1)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Years that have any play history, oldest first
pub fn years_with_plays(conn: &Connection) -> Result<Vec<i32>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT CAST(strftime('%Y', time_played) AS INTEGER) AS year
         FROM playlist_tracks
         WHERE time_played IS NOT NULL
         ORDER BY year",
    )?;
    let years = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<i32>>>()?;
    Ok(years)
}

/// A random play with a known track title and artist, and who played it last
#[derive(Debug, Clone)]
pub struct PlayWithDj {
    pub track_title: String,
    pub artist: String,
    pub dj_id: i64,
    pub air_name: String,
    pub time_played: NaiveDateTime,
}

/// The most recent play of a random track, restricted to the given DJs.
///
/// Both the track and the latest play come from shows by `dj_ids`, so a
/// later replay by anyone else never becomes the answer.
pub fn random_recent_play_by_djs(conn: &Connection, dj_ids: &[i64]) -> Result<Option<PlayWithDj>> {
    if dj_ids.is_empty() {
        return Ok(None);
    }
    let in_list = (1..=dj_ids.len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT t.track_title, t.artist
         FROM playlist_tracks t
         JOIN playlists p ON p.kfjc_playlist_id = t.kfjc_playlist_id
         WHERE p.dj_id IN ({in_list})
           AND t.track_title IS NOT NULL AND t.artist IS NOT NULL
           AND p.air_name IS NOT NULL AND t.time_played IS NOT NULL
         ORDER BY RANDOM()
         LIMIT 1"
    );
    let picked = conn
        .query_row(&sql, rusqlite::params_from_iter(dj_ids.iter()), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })
        .optional()?;

    let Some((track_title, artist)) = picked else {
        return Ok(None);
    };

    let title_param = dj_ids.len() + 1;
    let artist_param = dj_ids.len() + 2;
    let sql = format!(
        "SELECT p.dj_id, p.air_name, t.time_played
         FROM playlist_tracks t
         JOIN playlists p ON p.kfjc_playlist_id = t.kfjc_playlist_id
         WHERE p.dj_id IN ({in_list})
           AND t.track_title = ?{title_param} AND t.artist = ?{artist_param}
           AND p.air_name IS NOT NULL AND t.time_played IS NOT NULL
         ORDER BY t.time_played DESC
         LIMIT 1"
    );
    let mut values: Vec<rusqlite::types::Value> =
        dj_ids.iter().map(|&id| rusqlite::types::Value::Integer(id)).collect();
    values.push(rusqlite::types::Value::Text(track_title.clone()));
    values.push(rusqlite::types::Value::Text(artist.clone()));

    let latest = conn
        .query_row(&sql, rusqlite::params_from_iter(values), |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })
        .optional()?;

    Ok(latest.and_then(|(dj_id, air_name, played)| {
        db::from_db_time(&played).map(|time_played| PlayWithDj {
            track_title,
            artist,
            dj_id,
            air_name,
            time_played,
        })
    }))
}
