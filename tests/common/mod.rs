//! Station CSV fixture shared by the integration tests
#![allow(dead_code)]

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use kfjc_trivia::importer::Importer;
use kfjc_trivia::{db, Settings};
use tempfile::TempDir;

/// (dj_id, air name, first year, shows, favourite artist, favourite album id)
pub const DJS: [(i64, &str, i32, i32, &str, i64); 4] = [
    (11, "Cynthia Fierce", 1996, 47, "Sun Ra", 1),
    (12, "Robert Emmett", 2001, 49, "Fall, The", 3),
    (13, "Spliff Skankin'", 2010, 51, "Can", 5),
    (14, "Dr Doug", 2016, 42, "Fall, The", 3),
];

pub const PLAYLIST_COUNT: i64 = 47 + 49 + 51 + 42;
pub const PLAY_COUNT: i64 = PLAYLIST_COUNT * 3;

/// Writes a small station export into `dir`
pub fn write_station(dir: &Path) {
    fs::write(
        dir.join("album.csv"),
        "id,artist,title,format,label,genre,added,is_collection\n\
         1,Sun Ra,Space Is the Place,LP,Blue Thumb,Jazz,NULL,0\n\
         2,Sun Ra,Lanquidity,LP,Philly Jazz,Jazz,NULL,0\n\
         3,\"Fall, The\",Hex Enduction Hour,LP,Kamera,Rock,NULL,0\n\
         4,Various Artists,Nuggets,LP,Elektra,Rock,NULL,1\n\
         5,Can,Tago Mago,LP,UA,Rock,NULL,0\n\
         6,Neu!,Neu! 75,LP,Brain,Rock,NULL,0\n",
    )
    .unwrap();

    fs::write(
        dir.join("track.csv"),
        "album_id,title,clean,indx\n\
         1,Space Is the Place,1,1\n\
         1,Images,1,2\n\
         3,The Classical,1,1\n\
         5,Mushroom,1,1\n\
         6,Isi,1,1\n",
    )
    .unwrap();

    fs::write(
        dir.join("coll_track.csv"),
        "album_id,title,artist,indx\n\
         4,Pushin' Too Hard,\"Seeds, The\",1\n\
         4,Dirty Water,\"Standells, The\",2\n",
    )
    .unwrap();

    fs::write(
        dir.join("dj.csv"),
        "dj_id,air_name,administrative,silent_mic\n12,Robert Emmett,0,1\n",
    )
    .unwrap();

    let mut playlists = String::from("id,dj_id,air_name,start_time,end_time\n");
    let mut plays = String::from(
        "playlist_id,indx,is_current,artist,track_title,album_title,album_id,album_label,time_played\n",
    );
    let mut playlist_id = 1;
    for (dj_id, air_name, first_year, shows, artist, album_id) in DJS {
        for show in 0..shows {
            let start = format!("{}-{:02}-01 22:00:00", first_year + show / 12, show % 12 + 1);
            let end = format!("{}-{:02}-02 01:00:00", first_year + show / 12, show % 12 + 1);
            writeln!(playlists, "{playlist_id},{dj_id},{air_name},{start},{end}").unwrap();
            for indx in 0..3 {
                let (artist, album_id) = if indx < 2 { (artist, album_id) } else { ("Neu!", 6) };
                writeln!(
                    plays,
                    "{playlist_id},{indx},0,\"{artist}\",Song {indx},Some Album,{album_id},NULL,{start}"
                )
                .unwrap();
            }
            playlist_id += 1;
        }
    }
    fs::write(dir.join("playlist.csv"), playlists).unwrap();
    fs::write(dir.join("playlist_track.csv"), plays).unwrap();
}

/// A temp dir holding the station export and an imported database
pub fn imported_station() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    write_station(dir.path());
    let db_path = dir.path().join("trivia.sqlite");
    let mut conn = db::open(&db_path).unwrap();
    Importer::new(Settings::default().chunk_size)
        .import_all_tables(&mut conn, dir.path())
        .unwrap();
    (dir, db_path)
}
