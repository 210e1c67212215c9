//! DJ operations
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::common;
use crate::error::Result;
use crate::model::Dj;

pub const WHITE_HEART: char = '♡';

fn from_row(row: &Row) -> rusqlite::Result<Dj> {
    Ok(Dj {
        dj_id: row.get(0)?,
        air_name: row.get(1)?,
        administrative: row.get(2)?,
        silent_mic: row.get(3)?,
    })
}

/// Insert or replace a DJ
pub fn create_dj(
    conn: &Connection,
    dj_id: i64,
    air_name: Option<&str>,
    administrative: bool,
    silent_mic: bool,
) -> Result<Dj> {
    conn.execute(
        "INSERT OR REPLACE INTO djs (dj_id, air_name, administrative, silent_mic)
         VALUES (?1, ?2, ?3, ?4)",
        params![dj_id, air_name, administrative, silent_mic],
    )?;
    Ok(Dj {
        dj_id,
        air_name: air_name.map(str::to_string),
        administrative,
        silent_mic,
    })
}

pub fn get_dj_by_id(conn: &Connection, dj_id: i64) -> Result<Option<Dj>> {
    Ok(conn
        .query_row(
            "SELECT dj_id, air_name, administrative, silent_mic FROM djs WHERE dj_id = ?1",
            [dj_id],
            from_row,
        )
        .optional()?)
}

pub fn get_djs(conn: &Connection) -> Result<Vec<Dj>> {
    let mut stmt =
        conn.prepare("SELECT dj_id, air_name, administrative, silent_mic FROM djs ORDER BY dj_id")?;
    let djs = stmt
        .query_map([], from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(djs)
}

/// Air name for display; DJs that have passed on get white hearts.
pub fn get_air_name_for_dj(dj: &Dj, possessive: bool) -> String {
    let air_name = dj.air_name.as_deref().unwrap_or("Unknown DJ");
    let name = if possessive {
        format!("{air_name}{}", common::the_right_apostrophe(air_name))
    } else {
        air_name.to_string()
    };

    if dj.silent_mic {
        format!("{WHITE_HEART} {name} {WHITE_HEART}")
    } else {
        name
    }
}

/// Fills the djs table from playlists: one row per dj_id, using the air
/// name that DJ used most often. Existing rows keep their flags.
pub fn derive_djs_from_playlists(conn: &Connection) -> Result<usize> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO djs (dj_id, air_name, administrative, silent_mic)
         SELECT dj_id, air_name, 0, 0 FROM (
             SELECT dj_id, air_name,
                    ROW_NUMBER() OVER (PARTITION BY dj_id ORDER BY COUNT(*) DESC, MAX(start_time) DESC) AS rn
             FROM playlists
             WHERE dj_id IS NOT NULL AND air_name IS NOT NULL
             GROUP BY dj_id, air_name
         )
         WHERE rn = 1",
        [],
    )?;
    Ok(inserted)
}
