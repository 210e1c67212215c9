//! Station trivia question kinds, the question registry, and question generation.
//!
//! Every kind knows how to build one question from the play-log database:
//! its text, the right answer, and (for multiple choice kinds) the wrong
//! answers to show beside it. Stored questions live in `question_bank`.
use chrono::NaiveDateTime;
use rand::seq::{IteratorRandom, SliceRandom};
use rand::Rng;
use rusqlite::Connection;
use serde_json::json;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::albums;
use crate::common::{
    make_date_pretty, minutes_to_years, ranked, the_right_apostrophe, top_n, with_commas,
};
use crate::config::Settings;
use crate::db;
use crate::djs;
use crate::error::Result;
use crate::model::{AcceptableAnswers, QuestionType};
use crate::playlist_tracks;
use crate::playlists::{self, DjStat, EXCLUDED_DJ_IDS};
use crate::question_bank;

/// Wrong answers shown beside the right one
pub const WRONG_ANSWER_COUNT: usize = 3;

/// How the robot describes a DJ's habits
const DJ_HABITS: [&str; 6] = [
    "likes to play",
    "plays a lot of",
    "seems to play a lot of",
    "sure likes to play",
    "often plays",
    "has played",
];

/// Types of trivia questions available
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuestionKind {
    DjCount,
    ShowCount,
    SongsPlayedCount,
    AlbumCount,
    ArtistCount,
    TrackCount,
    LibraryListeningTime,
    FirstPlaylist,
    NewestPlaylist,
    DjFirstShow,
    LongestOnAir,
    MostShows,
    DjTopArtist,
    TopArtistOfYear,
    AlbumByDjTopArtist,
    WhoPlayedItLast,
}

impl QuestionKind {
    pub fn question_type(&self) -> QuestionType {
        match self {
            QuestionKind::DjCount
            | QuestionKind::ShowCount
            | QuestionKind::SongsPlayedCount
            | QuestionKind::AlbumCount
            | QuestionKind::ArtistCount
            | QuestionKind::TrackCount => QuestionType::Number,
            QuestionKind::LibraryListeningTime => QuestionType::Duration,
            QuestionKind::FirstPlaylist | QuestionKind::NewestPlaylist | QuestionKind::DjFirstShow => {
                QuestionType::Date
            }
            QuestionKind::LongestOnAir
            | QuestionKind::MostShows
            | QuestionKind::DjTopArtist
            | QuestionKind::TopArtistOfYear
            | QuestionKind::AlbumByDjTopArtist
            | QuestionKind::WhoPlayedItLast => QuestionType::Choice,
        }
    }

    /// Kinds that always produce the same question text
    pub fn is_station_stat(&self) -> bool {
        matches!(
            self.question_type(),
            QuestionType::Number | QuestionType::Duration
        ) || matches!(self, QuestionKind::FirstPlaylist | QuestionKind::NewestPlaylist)
    }
}

/// Metadata for a question type including description and kind
#[derive(Debug, Clone, Copy)]
pub struct QuestionMeta {
    pub description: &'static str,
    pub kind: QuestionKind,
}

/// A generated question, not yet stored
#[derive(Debug, Clone, PartialEq)]
pub struct NewQuestion {
    pub code: String,
    pub question: String,
    pub question_type: QuestionType,
    pub acceptable_answers: AcceptableAnswers,
    /// Only filled for choice questions; the others get wrong answers at ask time
    pub wrong_answers: Vec<String>,
}

/// Builds registry mapping question codes to their metadata
pub fn build_registry() -> HashMap<String, QuestionMeta> {
    let mut m = HashMap::new();

    fn add(
        m: &mut HashMap<String, QuestionMeta>,
        code: &str,
        description: &'static str,
        kind: QuestionKind,
    ) {
        m.insert(code.to_string(), QuestionMeta { description, kind });
    }

    // ---------------- station counts ----------------
    add(&mut m, "how_many_djs", "How many DJs have been on the air", QuestionKind::DjCount);
    add(&mut m, "how_many_shows", "How many shows have been logged", QuestionKind::ShowCount);
    add(
        &mut m,
        "how_many_songs_played",
        "How many songs have been played",
        QuestionKind::SongsPlayedCount,
    );
    add(&mut m, "how_many_albums", "How many albums are in the library", QuestionKind::AlbumCount);
    add(
        &mut m,
        "how_many_artists",
        "How many artists are in the library",
        QuestionKind::ArtistCount,
    );
    add(&mut m, "how_many_tracks", "How many tracks are in the library", QuestionKind::TrackCount);
    add(
        &mut m,
        "library_listening_time",
        "How long it would take to hear the whole library",
        QuestionKind::LibraryListeningTime,
    );

    // ---------------- dates ----------------
    add(&mut m, "first_playlist", "When the play logs begin", QuestionKind::FirstPlaylist);
    add(&mut m, "newest_playlist", "When the play logs end", QuestionKind::NewestPlaylist);
    add(&mut m, "dj_first_show", "When a DJ first went on the air", QuestionKind::DjFirstShow);

    // ---------------- multiple choice ----------------
    add(
        &mut m,
        "longest_on_air",
        "Which of four DJs has been on the air the longest",
        QuestionKind::LongestOnAir,
    );
    add(&mut m, "most_shows", "Which of four DJs has done the most shows", QuestionKind::MostShows);
    add(&mut m, "dj_top_artist", "A DJ's most played artist", QuestionKind::DjTopArtist);
    add(
        &mut m,
        "top_artist_of_year",
        "The most played artist of a year",
        QuestionKind::TopArtistOfYear,
    );
    add(
        &mut m,
        "album_by_dj_top_artist",
        "An album by a DJ's favourite artist",
        QuestionKind::AlbumByDjTopArtist,
    );
    add(
        &mut m,
        "who_played_it_last",
        "Which DJ played a track most recently",
        QuestionKind::WhoPlayedItLast,
    );

    m
}

/// Chooses a random question from the registry
pub fn choose_random_question<'a, R: Rng + ?Sized>(
    registry: &'a HashMap<String, QuestionMeta>,
    rng: &mut R,
) -> Option<(&'a str, QuestionMeta)> {
    registry
        .iter()
        .choose(rng)
        .map(|(code, meta)| (code.as_str(), *meta))
}

/// Looks up a registry code, ignoring case and surrounding whitespace
pub fn parse_code<'a>(
    input: &str,
    registry: &'a HashMap<String, QuestionMeta>,
) -> Option<(&'a str, QuestionMeta)> {
    let wanted = input.trim().to_ascii_lowercase();
    if wanted.is_empty() {
        return None;
    }
    registry
        .iter()
        .find(|(code, _)| code.to_ascii_lowercase() == wanted)
        .map(|(code, meta)| (code.as_str(), *meta))
}

/// Registry codes in a stable order
pub fn sorted_codes(registry: &HashMap<String, QuestionMeta>) -> Vec<&str> {
    let mut codes: Vec<&str> = registry.keys().map(String::as_str).collect();
    codes.sort_unstable();
    codes
}

fn code_for(kind: QuestionKind) -> String {
    build_registry()
        .into_iter()
        .find(|(_, meta)| meta.kind == kind)
        .map(|(code, _)| code)
        .unwrap_or_else(|| format!("{kind:?}"))
}

fn answers(calculate_answer: serde_json::Value, display: String, rephrase: String) -> AcceptableAnswers {
    AcceptableAnswers {
        calculate_answer,
        display_answer: display,
        rephrase_the_question: rephrase,
    }
}

fn number_question(kind: QuestionKind, question: &str, rephrase: &str, count: i64) -> Option<NewQuestion> {
    if count <= 0 {
        return None;
    }
    Some(NewQuestion {
        code: code_for(kind),
        question: question.to_string(),
        question_type: QuestionType::Number,
        acceptable_answers: answers(json!(count), with_commas(count), rephrase.to_string()),
        wrong_answers: Vec::new(),
    })
}

fn date_question(kind: QuestionKind, question: String, rephrase: String, when: NaiveDateTime) -> NewQuestion {
    NewQuestion {
        code: code_for(kind),
        question,
        question_type: QuestionType::Date,
        acceptable_answers: answers(json!(db::to_db_time(&when)), make_date_pretty(&when), rephrase),
        wrong_answers: Vec::new(),
    }
}

fn choice_question(
    kind: QuestionKind,
    question: String,
    rephrase: String,
    right: String,
    wrong: Vec<String>,
) -> Option<NewQuestion> {
    if wrong.len() < WRONG_ANSWER_COUNT || wrong.contains(&right) {
        return None;
    }
    Some(NewQuestion {
        code: code_for(kind),
        question,
        question_type: QuestionType::Choice,
        acceptable_answers: answers(json!(right.clone()), right, rephrase),
        wrong_answers: wrong,
    })
}

/// Display name for a prolific DJ, with hearts for silent mics
fn dj_name(conn: &Connection, stat: &DjStat, possessive: bool) -> Result<String> {
    Ok(match djs::get_dj_by_id(conn, stat.dj_id)? {
        Some(dj) if dj.air_name.is_some() => djs::get_air_name_for_dj(&dj, possessive),
        _ if possessive => format!("{}{}", stat.air_name, the_right_apostrophe(&stat.air_name)),
        _ => stat.air_name.clone(),
    })
}

/// Adds distinct candidates to `wrong` until it holds enough answers
fn fill_wrong_answers<I>(right: &str, wrong: &mut Vec<String>, candidates: I)
where
    I: IntoIterator<Item = String>,
{
    for candidate in candidates {
        if wrong.len() >= WRONG_ANSWER_COUNT {
            break;
        }
        if candidate != right && !wrong.contains(&candidate) {
            wrong.push(candidate);
        }
    }
}

/// Artists from random library albums, for padding out artist choices
fn random_artists<R: Rng + ?Sized>(conn: &Connection, excluding: &str, rng: &mut R) -> Result<Vec<String>> {
    Ok(albums::get_random_albums(conn, 12, excluding, rng)?
        .into_iter()
        .filter_map(|a| a.artist)
        .filter(|artist| artist != albums::UNKNOWN_ARTIST)
        .collect())
}

/// Four prolific DJs, or `None` when the station has fewer
fn four_djs<R: Rng + ?Sized>(
    conn: &Connection,
    settings: &Settings,
    rng: &mut R,
) -> Result<Option<Vec<DjStat>>> {
    let picked = playlists::get_random_prolific_djs(conn, settings.min_show_count, 4, rng)?;
    Ok((picked.len() == 4).then_some(picked))
}

/// A DJ with an unambiguous favourite artist
fn dj_and_top_artist<R: Rng + ?Sized>(
    conn: &Connection,
    settings: &Settings,
    rng: &mut R,
) -> Result<Option<(DjStat, Vec<(String, u64)>)>> {
    let Some(dj) = playlists::get_random_prolific_djs(conn, settings.min_show_count, 1, rng)?
        .into_iter()
        .next()
    else {
        return Ok(None);
    };
    let counts = playlist_tracks::popular_artists_by_dj(conn, dj.dj_id)?;
    if top_n(&counts, 1).len() != 1 {
        return Ok(None);
    }
    Ok(Some((dj, ranked(&counts))))
}

/// Builds one question of the given kind.
///
/// Returns `Ok(None)` when the data cannot support the kind, for example a
/// station with fewer than four prolific DJs or a tie for the right answer.
pub fn generate<R: Rng + ?Sized>(
    conn: &Connection,
    kind: QuestionKind,
    settings: &Settings,
    rng: &mut R,
) -> Result<Option<NewQuestion>> {
    let question = match kind {
        // ---------------- station counts ----------------
        QuestionKind::DjCount => {
            let (dj_ids, _) = playlists::get_all_dj_ids(conn)?;
            let count = dj_ids.iter().filter(|id| !EXCLUDED_DJ_IDS.contains(id)).count() as i64;
            number_question(kind, "How many KFJC DJs are there?", "There are this many KFJC DJs!", count)
        }
        QuestionKind::ShowCount => number_question(
            kind,
            "Since we started counting, how many shows have there been?",
            "The number of shows since we started counting is:",
            db::get_count(conn, "playlists", "kfjc_playlist_id", true)?,
        ),
        QuestionKind::SongsPlayedCount => number_question(
            kind,
            "Since we started counting, how many songs have been played on KFJC?",
            "The number of songs played on KFJC is:",
            db::get_count(conn, "playlist_tracks", "id_", false)?,
        ),
        QuestionKind::AlbumCount => number_question(
            kind,
            "How many albums are in the KFJC Library?",
            "The KFJC Library holds this many albums:",
            db::get_count(conn, "albums", "kfjc_album_id", true)?,
        ),
        QuestionKind::ArtistCount => number_question(
            kind,
            "How many artists are in the KFJC Library?",
            "The KFJC Library holds albums by this many artists:",
            db::get_count(conn, "albums", "artist", true)?,
        ),
        QuestionKind::TrackCount => number_question(
            kind,
            "How many tracks are there in the KFJC Library?",
            "The KFJC Library holds this many tracks:",
            db::get_count(conn, "tracks", "id_", false)?,
        ),
        QuestionKind::LibraryListeningTime => {
            let tracks = db::get_count(conn, "tracks", "id_", false)?;
            if tracks == 0 {
                None
            } else {
                let minutes = tracks * settings.track_length_minutes;
                Some(NewQuestion {
                    code: code_for(kind),
                    question: format!(
                        "If a track is about {} minutes long, how long would it take to listen to all the tracks in the KFJC Library?",
                        settings.track_length_minutes
                    ),
                    question_type: QuestionType::Duration,
                    acceptable_answers: answers(
                        json!(minutes),
                        minutes_to_years(minutes),
                        "Listening to the whole library would take:".to_string(),
                    ),
                    wrong_answers: Vec::new(),
                })
            }
        }

        // ---------------- dates ----------------
        QuestionKind::FirstPlaylist => {
            let (oldest, _) = db::get_age(conn, "playlists", "start_time")?;
            oldest.map(|when| {
                date_question(
                    kind,
                    "When did KFJC begin collecting this data?".to_string(),
                    "We began collecting this data on:".to_string(),
                    when,
                )
            })
        }
        QuestionKind::NewestPlaylist => {
            let (_, newest) = db::get_age(conn, "playlists", "start_time")?;
            newest.map(|when| {
                date_question(
                    kind,
                    "Just how fresh is this data?".to_string(),
                    "The last data scrape for this page was on:".to_string(),
                    when,
                )
            })
        }
        QuestionKind::DjFirstShow => {
            match playlists::get_random_prolific_djs(conn, settings.min_show_count, 1, rng)?.first() {
                None => None,
                Some(dj) => {
                    let name = dj_name(conn, dj, false)?;
                    Some(date_question(
                        kind,
                        format!("When did {name} first go on the air?"),
                        format!("{name} first went on the air on:"),
                        dj.first_show,
                    ))
                }
            }
        }

        // ---------------- multiple choice ----------------
        QuestionKind::LongestOnAir => match four_djs(conn, settings, rng)? {
            None => None,
            Some(mut picked) => {
                picked.sort_by_key(|dj| dj.first_show);
                if picked[0].first_show == picked[1].first_show {
                    None
                } else {
                    let mut names = Vec::with_capacity(picked.len());
                    for dj in &picked {
                        names.push(dj_name(conn, dj, false)?);
                    }
                    let right = names.remove(0);
                    choice_question(
                        kind,
                        "Which of these DJs has been on the air the longest?".to_string(),
                        format!(
                            "The DJ on the air the longest, since {}, is:",
                            make_date_pretty(&picked[0].first_show)
                        ),
                        right,
                        names,
                    )
                }
            }
        },
        QuestionKind::MostShows => match four_djs(conn, settings, rng)? {
            None => None,
            Some(mut picked) => {
                picked.sort_by(|a, b| b.show_count.cmp(&a.show_count));
                if picked[0].show_count == picked[1].show_count {
                    None
                } else {
                    let mut names = Vec::with_capacity(picked.len());
                    for dj in &picked {
                        names.push(dj_name(conn, dj, false)?);
                    }
                    let right = names.remove(0);
                    choice_question(
                        kind,
                        "Which of these DJs has done the most shows?".to_string(),
                        format!(
                            "With {} shows, the busiest DJ is:",
                            with_commas(picked[0].show_count)
                        ),
                        right,
                        names,
                    )
                }
            }
        },
        QuestionKind::DjTopArtist => match dj_and_top_artist(conn, settings, rng)? {
            None => None,
            Some((dj, ranking)) => {
                let right = ranking[0].0.clone();
                let mut wrong = Vec::new();
                fill_wrong_answers(&right, &mut wrong, ranking.iter().skip(1).map(|(a, _)| a.clone()));
                fill_wrong_answers(&right, &mut wrong, random_artists(conn, &right, rng)?);
                let name = dj_name(conn, &dj, false)?;
                choice_question(
                    kind,
                    format!("Which artist does {name} play the most?"),
                    format!("{name} plays this artist the most:"),
                    right,
                    wrong,
                )
            }
        },
        QuestionKind::TopArtistOfYear => {
            let years = playlist_tracks::years_with_plays(conn)?;
            match years.choose(rng) {
                None => None,
                Some(&year) => {
                    let top = playlist_tracks::most_played_artists_in_year(conn, year, 4)?;
                    let tied = top.len() > 1 && top[0].plays == top[1].plays;
                    match top.first() {
                        Some(first) if !tied => {
                            let right = first.artist.clone();
                            let mut wrong = Vec::new();
                            fill_wrong_answers(&right, &mut wrong, top.iter().skip(1).map(|a| a.artist.clone()));
                            fill_wrong_answers(&right, &mut wrong, random_artists(conn, &right, rng)?);
                            choice_question(
                                kind,
                                format!("Who was the most played artist on KFJC in {year}?"),
                                format!("The most played artist of {year} was:"),
                                right,
                                wrong,
                            )
                        }
                        _ => None,
                    }
                }
            }
        }
        QuestionKind::AlbumByDjTopArtist => match dj_and_top_artist(conn, settings, rng)? {
            None => None,
            Some((dj, ranking)) => {
                let artist = ranking[0].0.clone();
                let titles: Vec<String> = albums::get_albums_by_artist(conn, &artist)?
                    .into_iter()
                    .filter_map(|a| a.title)
                    .collect();
                match titles.choose(rng) {
                    None => None,
                    Some(right) => {
                        let right = right.clone();
                        let mut wrong = Vec::new();
                        let others = albums::get_random_albums(conn, 12, &artist, rng)?
                            .into_iter()
                            .filter_map(|a| a.title)
                            .filter(|t| !titles.contains(t));
                        fill_wrong_answers(&right, &mut wrong, others);
                        let habit = DJ_HABITS.choose(rng).copied().unwrap_or(DJ_HABITS[0]);
                        let name = dj_name(conn, &dj, false)?;
                        choice_question(
                            kind,
                            format!("{name} {habit} {artist}. Which of these albums is by {artist}?"),
                            format!("{artist} recorded:"),
                            right,
                            wrong,
                        )
                    }
                }
            }
        },
        QuestionKind::WhoPlayedItLast => {
            let stats = playlists::dj_stats(conn, settings.min_show_count)?;
            let dj_ids: Vec<i64> = stats.iter().map(|s| s.dj_id).collect();
            let play = playlist_tracks::random_recent_play_by_djs(conn, &dj_ids)?;
            match play.and_then(|p| stats.iter().find(|s| s.dj_id == p.dj_id).map(|s| (p, s))) {
                None => None,
                Some((play, last_dj)) => {
                    let right = dj_name(conn, last_dj, false)?;
                    let mut others = Vec::new();
                    for stat in stats.iter().filter(|s| s.dj_id != last_dj.dj_id) {
                        others.push(dj_name(conn, stat, false)?);
                    }
                    others.shuffle(rng);
                    let mut wrong = Vec::new();
                    fill_wrong_answers(&right, &mut wrong, others);
                    choice_question(
                        kind,
                        format!(
                            "Which DJ was the last to play \"{}\" by {}?",
                            play.track_title, play.artist
                        ),
                        format!(
                            "It was last played on {} by:",
                            make_date_pretty(&play.time_played)
                        ),
                        right,
                        wrong,
                    )
                }
            }
        }
    };

    if question.is_none() {
        debug!("Not enough data for a {:?} question", kind);
    }
    Ok(question)
}

/// Generates and stores questions for every kind.
///
/// Station stats are stored once; the other kinds get up to
/// `questions_per_kind` distinct questions. Questions whose text is already
/// stored are skipped, so running it twice does not duplicate anything.
pub fn make_all_questions<R: Rng + ?Sized>(
    conn: &Connection,
    settings: &Settings,
    rng: &mut R,
) -> Result<usize> {
    let registry = build_registry();
    let mut stored = 0;

    for code in sorted_codes(&registry) {
        let kind = registry[code].kind;
        let wanted = if kind.is_station_stat() {
            1
        } else {
            settings.questions_per_kind
        };

        let mut made = 0;
        // Random kinds can repeat themselves; give up after a few misses
        for _ in 0..wanted * 3 {
            if made >= wanted {
                break;
            }
            let Some(question) = generate(conn, kind, settings, rng)? else {
                continue;
            };
            if question_bank::question_text_exists(conn, &question.question)? {
                continue;
            }
            question_bank::create_question(conn, &question)?;
            made += 1;
        }

        info!("Stored {} {} questions", made, code);
        stored += made;
    }

    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rusqlite::params;

    /// The shared fixture plus a fourth prolific DJ, so four-way choices work
    fn four_dj_station() -> Connection {
        let conn = db::seeded();
        for show in 0..42 {
            let playlist_id = 1000 + show;
            let start = format!("{}-{:02}-08 18:00:00", 2016 + show / 12, show % 12 + 1);
            conn.execute(
                "INSERT INTO playlists (kfjc_playlist_id, dj_id, air_name, start_time, end_time)
                 VALUES (?1, 4, 'Dr Doug', ?2, NULL)",
                params![playlist_id, start],
            )
            .unwrap();
            for indx in 0..3 {
                let artist = if indx < 2 { "The Fall" } else { "Neu!" };
                conn.execute(
                    "INSERT INTO playlist_tracks
                        (kfjc_playlist_id, indx, artist, track_title, time_played)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![playlist_id, indx, artist, format!("Song {indx}"), start],
                )
                .unwrap();
            }
        }
        conn
    }

    fn gen(conn: &Connection, kind: QuestionKind, seed: u64) -> Option<NewQuestion> {
        let mut rng = StdRng::seed_from_u64(seed);
        generate(conn, kind, &Settings::default(), &mut rng).unwrap()
    }

    #[test]
    fn test_build_registry_not_empty() {
        let registry = build_registry();
        assert_eq!(registry.len(), 16);
        assert!(registry.contains_key("how_many_djs"));
        assert!(registry.contains_key("who_played_it_last"));
    }

    #[test]
    fn test_parse_code_case_insensitive() {
        let registry = build_registry();
        let (code, meta) = parse_code("  Longest_On_Air ", &registry).unwrap();
        assert_eq!(code, "longest_on_air");
        assert_eq!(meta.kind, QuestionKind::LongestOnAir);
        assert!(parse_code("first_song_ever", &registry).is_none());
        assert!(parse_code("", &registry).is_none());
    }

    #[test]
    fn test_choose_random_question_returns_valid() {
        let registry = build_registry();
        let mut rng = StdRng::seed_from_u64(1);
        let (code, _) = choose_random_question(&registry, &mut rng).unwrap();
        assert!(registry.contains_key(code));
    }

    #[test]
    fn test_every_code_maps_back_to_its_kind() {
        let registry = build_registry();
        for (code, meta) in &registry {
            assert_eq!(&code_for(meta.kind), code);
        }
    }

    #[test]
    fn test_number_questions() {
        let conn = db::seeded();
        let q = gen(&conn, QuestionKind::DjCount, 1).unwrap();
        // Rebroadcast account is not a DJ
        assert_eq!(q.acceptable_answers.display_answer, "3");
        assert_eq!(q.question_type, QuestionType::Number);
        assert!(q.wrong_answers.is_empty());

        let q = gen(&conn, QuestionKind::ShowCount, 1).unwrap();
        assert_eq!(q.acceptable_answers.calculate_answer, json!(148));

        let q = gen(&conn, QuestionKind::SongsPlayedCount, 1).unwrap();
        assert_eq!(q.acceptable_answers.calculate_answer, json!(441));

        let q = gen(&conn, QuestionKind::ArtistCount, 1).unwrap();
        assert_eq!(q.acceptable_answers.display_answer, "5");
    }

    #[test]
    fn test_listening_time_uses_track_length() {
        let conn = db::seeded();
        let q = gen(&conn, QuestionKind::LibraryListeningTime, 1).unwrap();
        assert_eq!(q.question_type, QuestionType::Duration);
        assert_eq!(q.acceptable_answers.calculate_answer, json!(32));
        assert!(q.question.contains("4 minutes"));
    }

    #[test]
    fn test_first_playlist_date() {
        let conn = db::seeded();
        let q = gen(&conn, QuestionKind::FirstPlaylist, 1).unwrap();
        assert_eq!(q.acceptable_answers.display_answer, "September 19, 1995");
        assert_eq!(
            q.acceptable_answers.calculate_answer,
            json!("1995-09-19 22:00:00")
        );
    }

    #[test]
    fn test_empty_station_has_no_questions() {
        let conn = db::open_in_memory().unwrap();
        assert!(gen(&conn, QuestionKind::DjCount, 1).is_none());
        assert!(gen(&conn, QuestionKind::FirstPlaylist, 1).is_none());
        assert!(gen(&conn, QuestionKind::DjTopArtist, 1).is_none());
        assert!(gen(&conn, QuestionKind::TopArtistOfYear, 1).is_none());
    }

    #[test]
    fn test_four_way_choices_need_four_djs() {
        let conn = db::seeded();
        assert!(gen(&conn, QuestionKind::LongestOnAir, 1).is_none());
    }

    #[test]
    fn test_longest_on_air() {
        let conn = four_dj_station();
        let q = gen(&conn, QuestionKind::LongestOnAir, 7).unwrap();
        assert_eq!(q.acceptable_answers.display_answer, "Cynthia Fierce");
        assert_eq!(q.wrong_answers.len(), 3);
        // Robert Emmett's mic is silent
        assert!(q.wrong_answers.contains(&"♡ Robert Emmett ♡".to_string()));
    }

    #[test]
    fn test_most_shows() {
        let conn = four_dj_station();
        let q = gen(&conn, QuestionKind::MostShows, 7).unwrap();
        assert_eq!(q.acceptable_answers.display_answer, "Spliff Skankin'");
        assert!(q.acceptable_answers.rephrase_the_question.contains("51"));
    }

    #[test]
    fn test_choice_answers_are_distinct() {
        let conn = four_dj_station();
        for kind in [
            QuestionKind::DjTopArtist,
            QuestionKind::TopArtistOfYear,
            QuestionKind::AlbumByDjTopArtist,
            QuestionKind::WhoPlayedItLast,
        ] {
            for seed in 0..5 {
                let q = gen(&conn, kind, seed).unwrap();
                let right = &q.acceptable_answers.display_answer;
                assert_eq!(q.wrong_answers.len(), WRONG_ANSWER_COUNT, "{kind:?}");
                assert!(!q.wrong_answers.contains(right), "{kind:?}");
                let mut all = q.wrong_answers.clone();
                all.sort();
                all.dedup();
                assert_eq!(all.len(), WRONG_ANSWER_COUNT, "{kind:?}");
            }
        }
    }

    #[test]
    fn test_album_by_top_artist_is_right() {
        let conn = four_dj_station();
        let favourites = [
            ("Cynthia Fierce", vec!["Space Is the Place", "Lanquidity"]),
            ("Robert Emmett", vec!["Hex Enduction Hour"]),
            ("Spliff Skankin'", vec!["Tago Mago"]),
            ("Dr Doug", vec!["Hex Enduction Hour"]),
        ];
        let q = gen(&conn, QuestionKind::AlbumByDjTopArtist, 3).unwrap();
        let (_, titles) = favourites
            .iter()
            .find(|(dj, _)| q.question.contains(dj))
            .unwrap();
        assert!(titles.contains(&q.acceptable_answers.display_answer.as_str()));
    }

    #[test]
    fn test_make_all_questions_twice_adds_no_duplicate_stats() {
        let conn = four_dj_station();
        let settings = Settings::default();
        let mut rng = StdRng::seed_from_u64(11);

        let first = make_all_questions(&conn, &settings, &mut rng).unwrap();
        assert!(first >= 9);
        make_all_questions(&conn, &settings, &mut rng).unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM questions WHERE code = 'how_many_djs'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_who_played_it_last_stays_with_prolific_djs() {
        let conn = four_dj_station();
        // Spliff signs one late show differently and replays everything,
        // then the rebroadcast account replays it all again
        for (playlist_id, dj_id, air_name, start) in [
            (9000, 3, "Spliff", "2029-06-01 22:00:00"),
            (9001, 431, "KFJC Rebroadcast", "2030-01-01 22:00:00"),
        ] {
            conn.execute(
                "INSERT INTO playlists (kfjc_playlist_id, dj_id, air_name, start_time, end_time)
                 VALUES (?1, ?2, ?3, ?4, NULL)",
                params![playlist_id, dj_id, air_name, start],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO playlist_tracks
                    (kfjc_playlist_id, indx, artist, track_title, time_played)
                 SELECT DISTINCT ?1, indx, artist, track_title, ?2
                 FROM playlist_tracks WHERE kfjc_playlist_id < 9000",
                params![playlist_id, start],
            )
            .unwrap();
        }

        for seed in 0..20 {
            let q = gen(&conn, QuestionKind::WhoPlayedItLast, seed).unwrap();
            let right = &q.acceptable_answers.display_answer;
            assert_eq!(right, "Spliff Skankin'");
            assert!(!q.wrong_answers.iter().any(|w| w.contains("Spliff")));
            assert!(!q.wrong_answers.iter().any(|w| w.contains("KFJC")));
            // Silent mics keep their hearts here too
            assert!(q.wrong_answers.contains(&"♡ Robert Emmett ♡".to_string()));
        }
    }
}
