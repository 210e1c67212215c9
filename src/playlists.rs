//! Playlist (one on-air show) operations
use chrono::NaiveDateTime;
use rand::seq::SliceRandom;
use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use crate::db::{self, opt_time};
use crate::error::{Error, Result};
use crate::model::Playlist;

/// The rebroadcast account and the placeholder DJ for orphaned shows
pub const EXCLUDED_DJ_IDS: [i64; 2] = [431, -1];

const PLAYLIST_COLUMNS: &str = "id_, kfjc_playlist_id, dj_id, air_name, start_time, end_time";

fn from_row(row: &Row) -> rusqlite::Result<Playlist> {
    Ok(Playlist {
        id_: row.get(0)?,
        kfjc_playlist_id: row.get(1)?,
        dj_id: row.get(2)?,
        air_name: row.get(3)?,
        start_time: opt_time(row.get(4)?),
        end_time: opt_time(row.get(5)?),
    })
}

pub fn create_playlist(
    conn: &Connection,
    kfjc_playlist_id: i64,
    dj_id: Option<i64>,
    air_name: Option<&str>,
    start_time: Option<NaiveDateTime>,
    end_time: Option<NaiveDateTime>,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO playlists (kfjc_playlist_id, dj_id, air_name, start_time, end_time)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            kfjc_playlist_id,
            dj_id,
            air_name,
            start_time.as_ref().map(db::to_db_time),
            end_time.as_ref().map(db::to_db_time),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Playlists in station order, up to `limit`
pub fn get_playlists(conn: &Connection, limit: i64) -> Result<Vec<Playlist>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PLAYLIST_COLUMNS} FROM playlists ORDER BY kfjc_playlist_id LIMIT ?1"
    ))?;
    let playlists = stmt
        .query_map([limit], from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(playlists)
}

pub fn get_playlist_by_kfjc_id(conn: &Connection, kfjc_playlist_id: i64) -> Result<Option<Playlist>> {
    Ok(conn
        .query_row(
            &format!("SELECT {PLAYLIST_COLUMNS} FROM playlists WHERE kfjc_playlist_id = ?1"),
            [kfjc_playlist_id],
            from_row,
        )
        .optional()?)
}

pub fn playlist_exists(conn: &Connection, kfjc_playlist_id: i64) -> Result<bool> {
    db::exists(
        conn,
        "SELECT 1 FROM playlists WHERE kfjc_playlist_id = ?1",
        [kfjc_playlist_id],
    )
}

/// Sorted distinct dj ids, and how many there are
pub fn get_all_dj_ids(conn: &Connection) -> Result<(Vec<i64>, usize)> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT dj_id FROM playlists WHERE dj_id IS NOT NULL ORDER BY dj_id",
    )?;
    let ids = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<i64>>>()?;
    let count = ids.len();
    Ok((ids, count))
}

/// The body of work for one DJ
#[derive(Debug, Clone, Serialize)]
pub struct DjPlaylists {
    pub dj_id: i64,
    pub count_playlists: usize,
    pub first_show: Option<NaiveDateTime>,
    pub last_show: Option<NaiveDateTime>,
    pub playlists: Vec<Playlist>,
}

pub fn get_all_playlists_by_dj_id(conn: &Connection, dj_id: i64) -> Result<DjPlaylists> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PLAYLIST_COLUMNS} FROM playlists WHERE dj_id = ?1 ORDER BY start_time"
    ))?;
    let playlists = stmt
        .query_map([dj_id], from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    if playlists.is_empty() {
        return Err(Error::NotFound(format!("no playlists for dj {dj_id}")));
    }

    let first_show = playlists.iter().filter_map(|p| p.start_time).min();
    let last_show = playlists.iter().filter_map(|p| p.start_time).max();

    Ok(DjPlaylists {
        dj_id,
        count_playlists: playlists.len(),
        first_show,
        last_show,
        playlists,
    })
}

/// Tenure and show count of one prolific DJ
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DjStat {
    pub dj_id: i64,
    pub air_name: String,
    pub show_count: i64,
    pub first_show: NaiveDateTime,
    pub last_show: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DjStatsOrder {
    AirName,
    ShowCount,
    FirstShow,
    LastShow,
}

impl DjStatsOrder {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "air_name" => Some(DjStatsOrder::AirName),
            "show_count" | "showcount" => Some(DjStatsOrder::ShowCount),
            "first_show" | "firstshow" => Some(DjStatsOrder::FirstShow),
            "last_show" | "lastshow" => Some(DjStatsOrder::LastShow),
            _ => None,
        }
    }
}

/// DJs with more than `min_show_count` shows, ordered by first show.
///
/// Station accounts (air names with "KFJC" or "rebroadcast") and the
/// excluded ids never appear.
pub fn dj_stats(conn: &Connection, min_show_count: i64) -> Result<Vec<DjStat>> {
    let sql = format!(
        "WITH first_last_count AS (
             SELECT dj_id, MIN(start_time) AS first_show, MAX(start_time) AS last_show,
                    COUNT(*) AS show_count
             FROM playlists
             WHERE dj_id IS NOT NULL AND dj_id NOT IN ({excluded}) AND start_time IS NOT NULL
             GROUP BY dj_id
             HAVING COUNT(*) > ?1
         ),
         dj_id_to_air_name AS (
             SELECT dj_id, air_name FROM (
                 SELECT dj_id, air_name,
                        ROW_NUMBER() OVER (PARTITION BY dj_id ORDER BY start_time) AS rn
                 FROM playlists
                 WHERE air_name IS NOT NULL
             )
             WHERE rn = 1
         )
         SELECT f.dj_id, COALESCE(d.air_name, n.air_name) AS name,
                f.show_count, f.first_show, f.last_show
         FROM first_last_count f
         LEFT JOIN djs d ON d.dj_id = f.dj_id
         LEFT JOIN dj_id_to_air_name n ON n.dj_id = f.dj_id
         WHERE COALESCE(d.air_name, n.air_name) IS NOT NULL
           AND COALESCE(d.air_name, n.air_name) NOT LIKE '%KFJC%'
           AND COALESCE(d.air_name, n.air_name) NOT LIKE '%rebroadcast%'
         ORDER BY f.first_show, f.dj_id",
        excluded = EXCLUDED_DJ_IDS
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([min_show_count], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, i64>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
        ))
    })?;

    let mut stats = Vec::new();
    for row in rows {
        let (dj_id, air_name, show_count, first, last) = row?;
        // Unparseable times are dropped rather than failing the whole list
        if let (Some(first_show), Some(last_show)) = (db::from_db_time(&first), db::from_db_time(&last)) {
            stats.push(DjStat {
                dj_id,
                air_name,
                show_count,
                first_show,
                last_show,
            });
        }
    }
    Ok(stats)
}

pub fn sort_dj_stats(stats: &mut [DjStat], order_by: DjStatsOrder, reverse: bool) {
    match order_by {
        DjStatsOrder::AirName => stats.sort_by(|a, b| a.air_name.to_lowercase().cmp(&b.air_name.to_lowercase())),
        DjStatsOrder::ShowCount => stats.sort_by_key(|s| s.show_count),
        DjStatsOrder::FirstShow => stats.sort_by_key(|s| s.first_show),
        DjStatsOrder::LastShow => stats.sort_by_key(|s| s.last_show),
    }
    if reverse {
        stats.reverse();
    }
}

/// Up to `k` distinct prolific DJs picked at random
pub fn get_random_prolific_djs<R: Rng + ?Sized>(
    conn: &Connection,
    min_show_count: i64,
    k: usize,
    rng: &mut R,
) -> Result<Vec<DjStat>> {
    let stats = dj_stats(conn, min_show_count)?;
    Ok(stats.choose_multiple(rng, k).cloned().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_get_playlists_limit() {
        let conn = db::seeded();
        let playlists = get_playlists(&conn, 10).unwrap();
        assert_eq!(playlists.len(), 10);
        assert_eq!(playlists[0].kfjc_playlist_id, 1);
    }

    #[test]
    fn test_get_playlist_by_kfjc_id() {
        let conn = db::seeded();
        let p = get_playlist_by_kfjc_id(&conn, 1).unwrap().unwrap();
        assert_eq!(p.dj_id, Some(1));
        assert_eq!(p.air_name.as_deref(), Some("Cynthia Fierce"));
        assert!(get_playlist_by_kfjc_id(&conn, 99_999).unwrap().is_none());
    }

    #[test]
    fn test_get_all_dj_ids() {
        let conn = db::seeded();
        let (ids, count) = get_all_dj_ids(&conn).unwrap();
        assert_eq!(ids, vec![1, 2, 3, 431]);
        assert_eq!(count, 4);
    }

    #[test]
    fn test_get_all_playlists_by_dj_id() {
        let conn = db::seeded();
        let body = get_all_playlists_by_dj_id(&conn, 1).unwrap();
        assert_eq!(body.count_playlists, 47);
        assert_eq!(db::to_db_time(&body.first_show.unwrap()), "1996-01-01 22:00:00");
        assert!(body.last_show > body.first_show);

        assert!(matches!(
            get_all_playlists_by_dj_id(&conn, 12345),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_dj_stats_excludes_station_accounts() {
        let conn = db::seeded();
        let stats = dj_stats(&conn, 40).unwrap();
        let ids: Vec<i64> = stats.iter().map(|s| s.dj_id).collect();
        // Ordered by first show
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(stats[2].show_count, 51);
    }

    #[test]
    fn test_dj_stats_threshold() {
        let conn = db::seeded();
        // Only DJ 3 has more than 49 shows
        let stats = dj_stats(&conn, 49).unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].air_name, "Spliff Skankin'");
    }

    #[test]
    fn test_sort_dj_stats() {
        let conn = db::seeded();
        let mut stats = dj_stats(&conn, 40).unwrap();

        sort_dj_stats(&mut stats, DjStatsOrder::ShowCount, true);
        assert_eq!(stats[0].dj_id, 3);

        sort_dj_stats(&mut stats, DjStatsOrder::AirName, false);
        assert_eq!(stats[0].air_name, "Cynthia Fierce");
    }

    #[test]
    fn test_order_parse() {
        assert_eq!(DjStatsOrder::parse("SHOWCOUNT"), Some(DjStatsOrder::ShowCount));
        assert_eq!(DjStatsOrder::parse("first_show"), Some(DjStatsOrder::FirstShow));
        assert_eq!(DjStatsOrder::parse("bogus"), None);
    }

    #[test]
    fn test_random_prolific_djs_distinct() {
        let conn = db::seeded();
        let mut rng = StdRng::seed_from_u64(11);
        let picked = get_random_prolific_djs(&conn, 40, 4, &mut rng).unwrap();
        // Only three prolific DJs exist
        assert_eq!(picked.len(), 3);
        let mut ids: Vec<i64> = picked.iter().map(|d| d.dj_id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 3);
    }
}
