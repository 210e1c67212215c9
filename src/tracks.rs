//! Station library tracks (regular albums and collections)
use rusqlite::{params, Connection, Row};
use serde::Serialize;
use std::collections::HashSet;

use crate::error::Result;
use crate::model::Track;

fn from_row(row: &Row) -> rusqlite::Result<Track> {
    Ok(Track {
        id_: row.get(0)?,
        kfjc_album_id: row.get(1)?,
        artist: row.get(2)?,
        title: row.get(3)?,
        indx: row.get(4)?,
    })
}

/// Collection tracks carry their own artist; regular tracks leave it `None`.
pub fn create_track(
    conn: &Connection,
    kfjc_album_id: i64,
    artist: Option<&str>,
    title: Option<&str>,
    indx: Option<i64>,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO tracks (kfjc_album_id, artist, title, indx) VALUES (?1, ?2, ?3, ?4)",
        params![kfjc_album_id, artist, title, indx],
    )?;
    Ok(conn.last_insert_rowid())
}

/// An album's track listing
#[derive(Debug, Clone, Serialize)]
pub struct AlbumTracks {
    pub kfjc_album_id: i64,
    /// More than one artist on the album
    pub is_compilation: bool,
    pub tracks: Vec<AlbumTrack>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlbumTrack {
    pub indx: Option<i64>,
    pub title: Option<String>,
    /// Only filled in for compilations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
}

/// Tracks from an album in play order
pub fn album_tracks(conn: &Connection, kfjc_album_id: i64) -> Result<AlbumTracks> {
    let mut stmt = conn.prepare(
        "SELECT id_, kfjc_album_id, artist, title, indx FROM tracks
         WHERE kfjc_album_id = ?1 ORDER BY indx, id_",
    )?;
    let rows = stmt
        .query_map([kfjc_album_id], from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let artists: HashSet<Option<&str>> = rows.iter().map(|t| t.artist.as_deref()).collect();
    let is_compilation = artists.len() > 1;

    let tracks = rows
        .into_iter()
        .map(|t| AlbumTrack {
            indx: t.indx,
            title: t.title,
            artist: if is_compilation { t.artist } else { None },
        })
        .collect();

    Ok(AlbumTracks {
        kfjc_album_id,
        is_compilation,
        tracks,
    })
}

/// Track titles containing `word`, case-insensitive
pub fn get_tracks_with_word_in_title(conn: &Connection, word: &str) -> Result<Vec<Track>> {
    let pattern = format!("%{}%", word.trim());
    let mut stmt = conn.prepare(
        "SELECT id_, kfjc_album_id, artist, title, indx FROM tracks
         WHERE title LIKE ?1 ORDER BY kfjc_album_id, indx",
    )?;
    let tracks = stmt
        .query_map([pattern], from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(tracks)
}
