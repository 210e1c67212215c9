//! Station library albums
use rand::seq::SliceRandom;
use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db;
use crate::error::Result;
use crate::model::Album;

/// Stand-in for albums the play history references but the library lacks
pub const UNKNOWN_ARTIST: &str = "Various Artists";
pub const UNKNOWN_TITLE: &str = "Unknown Compilation";

fn from_row(row: &Row) -> rusqlite::Result<Album> {
    Ok(Album {
        id_: row.get(0)?,
        kfjc_album_id: row.get(1)?,
        artist: row.get(2)?,
        title: row.get(3)?,
        is_collection: row.get(4)?,
    })
}

pub fn create_album(
    conn: &Connection,
    kfjc_album_id: i64,
    artist: Option<&str>,
    title: Option<&str>,
    is_collection: bool,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO albums (kfjc_album_id, artist, title, is_collection) VALUES (?1, ?2, ?3, ?4)",
        params![kfjc_album_id, artist, title, is_collection],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn create_placeholder_album(conn: &Connection, kfjc_album_id: i64) -> Result<i64> {
    create_album(conn, kfjc_album_id, Some(UNKNOWN_ARTIST), Some(UNKNOWN_TITLE), true)
}

pub fn get_album_by_id(conn: &Connection, kfjc_album_id: i64) -> Result<Option<Album>> {
    Ok(conn
        .query_row(
            "SELECT id_, kfjc_album_id, artist, title, is_collection FROM albums WHERE kfjc_album_id = ?1",
            [kfjc_album_id],
            from_row,
        )
        .optional()?)
}

pub fn album_exists(conn: &Connection, kfjc_album_id: i64) -> Result<bool> {
    db::exists(conn, "SELECT 1 FROM albums WHERE kfjc_album_id = ?1", [kfjc_album_id])
}

pub fn get_albums_by_artist(conn: &Connection, artist: &str) -> Result<Vec<Album>> {
    let mut stmt = conn.prepare(
        "SELECT id_, kfjc_album_id, artist, title, is_collection
         FROM albums WHERE artist = ?1 COLLATE NOCASE AND title IS NOT NULL
         ORDER BY kfjc_album_id",
    )?;
    let albums = stmt
        .query_map([artist], from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(albums)
}

/// Up to `k` titled albums whose artist is not `excluding_artist`
pub fn get_random_albums<R: Rng + ?Sized>(
    conn: &Connection,
    k: usize,
    excluding_artist: &str,
    rng: &mut R,
) -> Result<Vec<Album>> {
    // Over-fetch a random slice then sample from it, cheaper than shuffling the library
    let mut stmt = conn.prepare(
        "SELECT id_, kfjc_album_id, artist, title, is_collection
         FROM albums
         WHERE title IS NOT NULL AND artist IS NOT NULL
           AND artist != ?1 COLLATE NOCASE AND title != ?2
         ORDER BY RANDOM()
         LIMIT ?3",
    )?;
    let pool = stmt
        .query_map(
            params![excluding_artist, UNKNOWN_TITLE, (k * 4) as i64],
            from_row,
        )?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(pool.choose_multiple(rng, k).cloned().collect())
}
