//! Imports the station's CSV dumps.
//!
//! Files are read from one data directory and committed in chunks. Rows the
//! station export mangled are either repaired, skipped, or attached to a
//! placeholder playlist/album so the play history survives.
use csv::{ReaderBuilder, StringRecord};
use rusqlite::{Connection, ErrorCode};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::albums;
use crate::common::{
    coerce_artist, coerce_bool, coerce_int, coerce_text, coerce_time, fix_playlist_times,
};
use crate::djs;
use crate::error::{Error, Result};
use crate::playlist_tracks::{self, NewPlaylistTrack};
use crate::playlists;
use crate::tracks;

pub const ALBUM_FILE: &str = "album.csv";
pub const PLAYLIST_FILE: &str = "playlist.csv";
pub const PLAYLIST_TRACK_FILE: &str = "playlist_track.csv";
pub const COLLECTION_TRACK_FILE: &str = "coll_track.csv";
pub const TRACK_FILE: &str = "track.csv";
/// Optional: DJ flags (administrative, silent mic)
pub const DJ_FILE: &str = "dj.csv";

/// Dr. Doug was filed under two ids
const DJ_ID_REMAP: [(i64, i64); 1] = [(-1391, 391)];
/// Air names DJ Click used on odd nights
const DJ_CLICK_ALIASES: [&str; 2] = ["Click", "^"];
/// Owner of playlists that only exist because tracks reference them
pub const PLACEHOLDER_DJ_ID: i64 = -1;

/// What happened to one CSV row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOutcome {
    Imported { placeholders: usize },
    Skipped(&'static str),
}

/// Per-file import tally
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub file: String,
    pub imported: usize,
    pub skipped: usize,
    pub duplicates: usize,
    pub placeholders: usize,
}

impl fmt::Display for ImportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} imported, {} skipped, {} duplicates, {} placeholders",
            self.file, self.imported, self.skipped, self.duplicates, self.placeholders
        )
    }
}

type RowHandler = fn(&mut Importer, &Connection, &StringRecord) -> Result<RowOutcome>;

/// Keeps track of which parents exist so placeholders are only made once
#[derive(Debug, Default)]
pub struct Importer {
    chunk_size: usize,
    known_playlists: HashSet<i64>,
    known_albums: HashSet<i64>,
}

fn field(row: &StringRecord, i: usize) -> Option<&str> {
    row.get(i)
}

fn is_constraint_violation(err: &Error) -> bool {
    matches!(
        err,
        Error::Database(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation
    )
}

impl Importer {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            ..Self::default()
        }
    }

    /// Imports every station file in dependency order, then fills the djs table.
    pub fn import_all_tables(
        &mut self,
        conn: &mut Connection,
        data_dir: &Path,
    ) -> Result<Vec<ImportReport>> {
        // Albums and playlists first, the other tables point at them
        let data_path_and_function: [(&str, RowHandler); 5] = [
            (ALBUM_FILE, Importer::create_album),
            (PLAYLIST_FILE, Importer::create_playlist),
            (PLAYLIST_TRACK_FILE, Importer::create_playlist_track),
            (COLLECTION_TRACK_FILE, Importer::create_collection_track),
            (TRACK_FILE, Importer::create_track),
        ];

        let mut reports = Vec::new();
        for (file, handler) in data_path_and_function {
            let path = data_dir.join(file);
            if !path.exists() {
                return Err(Error::NotFound(format!("{}", path.display())));
            }
            let report = self.seed_a_large_csv(conn, &path, handler)?;
            info!("{}", report);
            reports.push(report);
        }

        let dj_path = data_dir.join(DJ_FILE);
        if dj_path.exists() {
            let report = self.seed_a_large_csv(conn, &dj_path, Importer::create_dj)?;
            info!("{}", report);
            reports.push(report);
        }

        let derived = djs::derive_djs_from_playlists(conn)?;
        info!("Derived {} DJs from playlists", derived);

        Ok(reports)
    }

    /// Reads one CSV file, committing every `chunk_size` rows.
    pub fn seed_a_large_csv(
        &mut self,
        conn: &mut Connection,
        path: &Path,
        row_handler: RowHandler,
    ) -> Result<ImportReport> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        info!("Now importing {} in {} row chunks", path.display(), self.chunk_size);

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)?;

        let mut report = ImportReport {
            file: file_name.clone(),
            ..ImportReport::default()
        };

        let mut tx = conn.transaction()?;
        let mut in_chunk = 0usize;
        let mut chunk_number = 1usize;

        for (line, record) in reader.records().enumerate() {
            // +2: one for the header, one for 1-based lines
            let line = line + 2;
            let record = match record {
                Ok(r) => r,
                Err(e) => {
                    warn!("{}:{} unreadable row: {}", file_name, line, e);
                    report.skipped += 1;
                    continue;
                }
            };

            match row_handler(self, &tx, &record) {
                Ok(RowOutcome::Imported { placeholders }) => {
                    report.imported += 1;
                    report.placeholders += placeholders;
                }
                Ok(RowOutcome::Skipped(reason)) => {
                    debug!("{}:{} skipped: {}", file_name, line, reason);
                    report.skipped += 1;
                }
                Err(e) if is_constraint_violation(&e) => {
                    debug!("{}:{} duplicate: {}", file_name, line, e);
                    report.duplicates += 1;
                }
                Err(e) => return Err(e),
            }

            in_chunk += 1;
            if in_chunk >= self.chunk_size {
                tx.commit()?;
                info!("{}: committed chunk {}", file_name, chunk_number);
                chunk_number += 1;
                in_chunk = 0;
                tx = conn.transaction()?;
            }
        }

        tx.commit()?;
        Ok(report)
    }

    fn ensure_playlist(&mut self, conn: &Connection, kfjc_playlist_id: i64) -> Result<usize> {
        if self.known_playlists.contains(&kfjc_playlist_id) {
            return Ok(0);
        }
        let mut created = 0;
        if !playlists::playlist_exists(conn, kfjc_playlist_id)? {
            warn!("Playlist {} missing, adding a placeholder", kfjc_playlist_id);
            playlists::create_playlist(conn, kfjc_playlist_id, Some(PLACEHOLDER_DJ_ID), None, None, None)?;
            created = 1;
        }
        self.known_playlists.insert(kfjc_playlist_id);
        Ok(created)
    }

    fn ensure_album(&mut self, conn: &Connection, kfjc_album_id: i64) -> Result<usize> {
        if self.known_albums.contains(&kfjc_album_id) {
            return Ok(0);
        }
        let mut created = 0;
        if !albums::album_exists(conn, kfjc_album_id)? {
            warn!("Album {} missing, adding a placeholder", kfjc_album_id);
            albums::create_placeholder_album(conn, kfjc_album_id)?;
            created = 1;
        }
        self.known_albums.insert(kfjc_album_id);
        Ok(created)
    }

    /// album.csv: id, artist, title, ..., is_collection in column 7
    fn create_album(&mut self, conn: &Connection, row: &StringRecord) -> Result<RowOutcome> {
        let (Some(id), Some(artist), Some(title)) = (field(row, 0), field(row, 1), field(row, 2))
        else {
            return Ok(RowOutcome::Skipped("short album row"));
        };
        let Some(kfjc_album_id) = coerce_int(id) else {
            return Ok(RowOutcome::Skipped("album without id"));
        };
        let is_collection = field(row, 7).map(coerce_bool).unwrap_or(false);

        albums::create_album(
            conn,
            kfjc_album_id,
            coerce_artist(artist).as_deref(),
            coerce_text(title).as_deref(),
            is_collection,
        )?;
        self.known_albums.insert(kfjc_album_id);
        Ok(RowOutcome::Imported { placeholders: 0 })
    }

    /// playlist.csv: id, dj_id, air_name, start_time, end_time
    fn create_playlist(&mut self, conn: &Connection, row: &StringRecord) -> Result<RowOutcome> {
        let (Some(id), Some(dj), Some(name), Some(start), Some(end)) = (
            field(row, 0),
            field(row, 1),
            field(row, 2),
            field(row, 3),
            field(row, 4),
        ) else {
            return Ok(RowOutcome::Skipped("short playlist row"));
        };

        // Playlist 0 was the show still on air when the dump was taken
        let kfjc_playlist_id = match coerce_int(id) {
            Some(0) | None => return Ok(RowOutcome::Skipped("no playlist id")),
            Some(id) => id,
        };

        let (start_time, end_time) = fix_playlist_times(coerce_time(start), coerce_time(end));
        if start_time.is_none() || end_time.is_none() {
            return Ok(RowOutcome::Skipped("no usable show times"));
        }

        let dj_id = coerce_int(dj).map(|id| {
            DJ_ID_REMAP
                .iter()
                .find(|(from, _)| *from == id)
                .map(|(_, to)| *to)
                .unwrap_or(id)
        });

        let air_name = coerce_text(name).map(|n| {
            if DJ_CLICK_ALIASES.contains(&n.as_str()) {
                "DJ Click".to_string()
            } else {
                n
            }
        });

        playlists::create_playlist(
            conn,
            kfjc_playlist_id,
            dj_id,
            air_name.as_deref(),
            start_time,
            end_time,
        )?;
        self.known_playlists.insert(kfjc_playlist_id);
        Ok(RowOutcome::Imported { placeholders: 0 })
    }

    /// playlist_track.csv: playlist_id, indx, is_current, artist, track_title,
    /// album_title, album_id, album_label, time_played
    fn create_playlist_track(&mut self, conn: &Connection, row: &StringRecord) -> Result<RowOutcome> {
        if row.len() < 7 {
            return Ok(RowOutcome::Skipped("short playlist track row"));
        }
        let artist = field(row, 3).and_then(coerce_artist);
        let track_title = field(row, 4).and_then(coerce_text);
        let album_title = field(row, 5).and_then(coerce_text);

        // Blank rows are about a tenth of the export
        if artist.is_none() && track_title.is_none() && album_title.is_none() {
            return Ok(RowOutcome::Skipped("blank playlist track"));
        }

        let Some(kfjc_playlist_id) = field(row, 0).and_then(coerce_int) else {
            return Ok(RowOutcome::Skipped("playlist track without playlist"));
        };
        let kfjc_album_id = field(row, 6).and_then(coerce_int);

        let mut placeholders = self.ensure_playlist(conn, kfjc_playlist_id)?;
        if let Some(album_id) = kfjc_album_id {
            placeholders += self.ensure_album(conn, album_id)?;
        }

        playlist_tracks::create_playlist_track(
            conn,
            &NewPlaylistTrack {
                kfjc_playlist_id,
                indx: field(row, 1).and_then(coerce_int),
                kfjc_album_id,
                album_title,
                artist,
                track_title,
                time_played: field(row, 8).and_then(coerce_time),
            },
        )?;
        Ok(RowOutcome::Imported { placeholders })
    }

    /// coll_track.csv: album_id, title, artist, indx
    fn create_collection_track(&mut self, conn: &Connection, row: &StringRecord) -> Result<RowOutcome> {
        let (Some(album), Some(title), Some(artist), Some(indx)) =
            (field(row, 0), field(row, 1), field(row, 2), field(row, 3))
        else {
            return Ok(RowOutcome::Skipped("short collection track row"));
        };
        let Some(kfjc_album_id) = coerce_int(album) else {
            return Ok(RowOutcome::Skipped("collection track without album"));
        };

        let placeholders = self.ensure_album(conn, kfjc_album_id)?;
        tracks::create_track(
            conn,
            kfjc_album_id,
            coerce_artist(artist).as_deref(),
            coerce_text(title).as_deref(),
            coerce_int(indx),
        )?;
        Ok(RowOutcome::Imported { placeholders })
    }

    /// track.csv: album_id, title, (unused), indx
    fn create_track(&mut self, conn: &Connection, row: &StringRecord) -> Result<RowOutcome> {
        let (Some(album), Some(title), Some(indx)) = (field(row, 0), field(row, 1), field(row, 3))
        else {
            return Ok(RowOutcome::Skipped("short track row"));
        };
        let Some(kfjc_album_id) = coerce_int(album) else {
            return Ok(RowOutcome::Skipped("track without album"));
        };

        let placeholders = self.ensure_album(conn, kfjc_album_id)?;
        tracks::create_track(
            conn,
            kfjc_album_id,
            None,
            coerce_text(title).as_deref(),
            coerce_int(indx),
        )?;
        Ok(RowOutcome::Imported { placeholders })
    }

    /// dj.csv: dj_id, air_name, administrative, silent_mic
    fn create_dj(&mut self, conn: &Connection, row: &StringRecord) -> Result<RowOutcome> {
        let Some(dj_id) = field(row, 0).and_then(coerce_int) else {
            return Ok(RowOutcome::Skipped("dj without id"));
        };
        let air_name = field(row, 1).and_then(coerce_text);
        let administrative = field(row, 2).map(coerce_bool).unwrap_or(false);
        let silent_mic = field(row, 3).map(coerce_bool).unwrap_or(false);

        djs::create_dj(conn, dj_id, air_name.as_deref(), administrative, silent_mic)?;
        Ok(RowOutcome::Imported { placeholders: 0 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use std::fs;

    fn write(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).unwrap();
    }

    fn station_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            ALBUM_FILE,
            "id,artist,title,a,b,c,d,is_collection\n\
             10,\"Fall, The\",Hex Enduction Hour,,,,,0\n\
             11,\"Brown, James\",Live at the Apollo,,,,,0\n\
             12,Various Artists,\"Nuggets, The\",,,,,1\n\
             10,Duplicate,Row,,,,,0\n\
             NULL,Nobody,Nothing,,,,,0\n",
        );
        write(
            dir.path(),
            PLAYLIST_FILE,
            "id,dj_id,air_name,start,end\n\
             100,7,Cynthia Fierce,2000-07-27 10:30:00,1969-12-31 16:00:00\n\
             101,-1391,Dr Doug,2019-11-26 02:01:15,2019-11-26 05:00:00\n\
             102,324,^,2015-06-08 21:59:44.000000,2015-06-09 02:08:35.000000\n\
             103,9,Nobody,0000-00-00 00:00:00,1969-12-31 16:00:00\n\
             0,9,Still On Air,2022-01-19 22:04:31,2022-01-19 23:00:00\n\
             104,9\n",
        );
        write(
            dir.path(),
            PLAYLIST_TRACK_FILE,
            "playlist_id,indx,is_current,artist,track_title,album_title,album_id,label,time_played\n\
             100,1,0,\"Fall, The\",The Classical,Hex Enduction Hour,10,Kamera,2000-07-27 10:35:00\n\
             100,2,0,NULL,NULL,NULL,NULL,NULL,NULL\n\
             555,1,0,Sun Ra,Images,Space Is the Place,999,Blue Thumb,2001-01-01 01:00:00\n\
             101,1,0,Can,Mushroom,Tago Mago,NULL,UA,2019-11-26 02:10:00\n",
        );
        write(
            dir.path(),
            COLLECTION_TRACK_FILE,
            "album_id,title,artist,indx\n\
             12,Dirty Water,\"Standells, The\",1\n\
             12,Pushin Too Hard,Seeds,2\n",
        );
        write(
            dir.path(),
            TRACK_FILE,
            "album_id,title,clean,indx\n\
             10,The Classical,1,1\n\
             10,Jawbone and the Air-Rifle,1,2\n\
             77,Orphan,1,1\n",
        );
        dir
    }

    #[test]
    fn test_import_all_tables() {
        let dir = station_dir();
        let mut conn = db::open_in_memory().unwrap();
        let reports = Importer::new(2)
            .import_all_tables(&mut conn, dir.path())
            .unwrap();

        let albums = &reports[0];
        assert_eq!(albums.imported, 3);
        assert_eq!(albums.duplicates, 1);
        assert_eq!(albums.skipped, 1);

        let playlists_report = &reports[1];
        assert_eq!(playlists_report.imported, 3);
        assert_eq!(playlists_report.skipped, 3);

        let tracks_report = &reports[2];
        assert_eq!(tracks_report.imported, 3);
        assert_eq!(tracks_report.skipped, 1);
        // Playlist 555 and album 999
        assert_eq!(tracks_report.placeholders, 2);

        // Album 77 from track.csv
        assert_eq!(reports[4].placeholders, 1);
    }

    #[test]
    fn test_titles_and_remaps() {
        let dir = station_dir();
        let mut conn = db::open_in_memory().unwrap();
        Importer::new(100)
            .import_all_tables(&mut conn, dir.path())
            .unwrap();

        let album = albums::get_album_by_id(&conn, 10).unwrap().unwrap();
        assert_eq!(album.artist.as_deref(), Some("The Fall"));
        let album = albums::get_album_by_id(&conn, 11).unwrap().unwrap();
        assert_eq!(album.artist.as_deref(), Some("James Brown"));
        let album = albums::get_album_by_id(&conn, 12).unwrap().unwrap();
        assert_eq!(album.title.as_deref(), Some("The Nuggets"));
        assert!(album.is_collection);

        let doug = playlists::get_playlist_by_kfjc_id(&conn, 101).unwrap().unwrap();
        assert_eq!(doug.dj_id, Some(391));

        let click = playlists::get_playlist_by_kfjc_id(&conn, 102).unwrap().unwrap();
        assert_eq!(click.air_name.as_deref(), Some("DJ Click"));

        // End time guessed from the start time
        let fierce = playlists::get_playlist_by_kfjc_id(&conn, 100).unwrap().unwrap();
        assert_eq!(
            db::to_db_time(&fierce.end_time.unwrap()),
            "2000-07-27 13:30:00"
        );

        assert!(playlists::get_playlist_by_kfjc_id(&conn, 0).unwrap().is_none());
        assert!(playlists::get_playlist_by_kfjc_id(&conn, 103).unwrap().is_none());

        let placeholder = playlists::get_playlist_by_kfjc_id(&conn, 555).unwrap().unwrap();
        assert_eq!(placeholder.dj_id, Some(PLACEHOLDER_DJ_ID));
        assert!(placeholder.start_time.is_none());
    }

    #[test]
    fn test_collection_tracks_keep_artist() {
        let dir = station_dir();
        let mut conn = db::open_in_memory().unwrap();
        Importer::new(100)
            .import_all_tables(&mut conn, dir.path())
            .unwrap();

        let listing = tracks::album_tracks(&conn, 12).unwrap();
        assert!(listing.is_compilation);
        assert_eq!(listing.tracks[0].artist.as_deref(), Some("The Standells"));
    }

    #[test]
    fn test_djs_derived_and_flags() {
        let dir = station_dir();
        write(dir.path(), DJ_FILE, "dj_id,air_name,administrative,silent_mic\n7,Cynthia Fierce,0,1\n");
        let mut conn = db::open_in_memory().unwrap();
        Importer::new(100)
            .import_all_tables(&mut conn, dir.path())
            .unwrap();

        let dj = djs::get_dj_by_id(&conn, 7).unwrap().unwrap();
        assert!(dj.silent_mic);
        let doug = djs::get_dj_by_id(&conn, 391).unwrap().unwrap();
        assert_eq!(doug.air_name.as_deref(), Some("Dr Doug"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut conn = db::open_in_memory().unwrap();
        let err = Importer::new(10)
            .import_all_tables(&mut conn, dir.path())
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
