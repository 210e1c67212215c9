//! String, number and date helpers shared by the importer and the question engine.
use chrono::{Duration, NaiveDateTime};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashMap;

use crate::db;

/// Cells the station export uses for "no value"
const NULL_TOKENS: [&str; 13] = [
    "NULL", "Null", "", " ", "?", ".", "..", "...", "*", "-", ",", "\"", "''",
];

/// Placeholder timestamps from the station export
pub const BAD_TIMES: [&str; 3] = [
    "0000-00-00 00:00:00",
    "1970-01-01 01:00:00",
    "1969-12-31 16:00:00",
];

const PROFANITY_EMOJIS: [&str; 6] = ["🤐", "🤫", "🤭", "🤔", "😎", "😈"];

/// Assumed length of a show when only one of its times survived
const SHOW_HOURS: i64 = 3;

fn is_null_token(cell: &str) -> bool {
    NULL_TOKENS.contains(&cell) || NULL_TOKENS.contains(&cell.trim())
}

/// Text cell, or `None` for the export's null markers. Titles are cleaned up.
pub fn coerce_text(cell: &str) -> Option<String> {
    if is_null_token(cell) || BAD_TIMES.contains(&cell.trim()) {
        return None;
    }
    let fixed = fix_titles(cell);
    if fixed.is_empty() {
        None
    } else {
        Some(fixed)
    }
}

/// Artist cell: like [`coerce_text`] but also turns "Brown, James" around.
pub fn coerce_artist(cell: &str) -> Option<String> {
    coerce_text(cell).map(|name| flip_person_name(&name))
}

pub fn coerce_int(cell: &str) -> Option<i64> {
    if is_null_token(cell) {
        return None;
    }
    cell.trim().parse().ok()
}

pub fn coerce_time(cell: &str) -> Option<NaiveDateTime> {
    let cell = cell.trim();
    if is_null_token(cell) || BAD_TIMES.contains(&cell) {
        return None;
    }
    // Some exports carry fractional seconds
    let t = db::from_db_time(cell)?;
    if BAD_TIMES.contains(&db::to_db_time(&t).as_str()) {
        None
    } else {
        Some(t)
    }
}

/// Station flags are "1"/"0", sometimes "true"/"false"
pub fn coerce_bool(cell: &str) -> bool {
    matches!(
        cell.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "t" | "yes" | "y"
    )
}

/// Fixes radio-station-naming-convention titles to readable titles.
///
/// "Wave of the West, The" becomes "The Wave of the West" and
/// "Connick, Harry Jr." becomes "Harry Connick Jr.".
pub fn fix_titles(title: &str) -> String {
    let title = profanity_filter(title, &mut rand::thread_rng());

    let split_at = title.len().saturating_sub(", the".len());
    if let (Some(head), Some(tail)) = (title.get(..split_at), title.get(split_at..)) {
        if tail.eq_ignore_ascii_case(", the") {
            return format!("The {}", head.trim());
        }
    }

    if title.contains(',') && title.contains(" Jr.") {
        let stripped = title.replace(" Jr.", "");
        let parts: Vec<&str> = stripped.split(',').map(str::trim).collect();
        let new_string = format!("{} {}", parts[1..].join(" "), parts[0]);
        return format!("{} Jr.", new_string.trim());
    }

    title
}

/// "Brown, James" becomes "James Brown".
///
/// Only flips when the part after the comma looks like a given name (one or
/// two words, no ampersand) so band names such as "Earth, Wind & Fire" survive.
pub fn flip_person_name(name: &str) -> String {
    let parts: Vec<&str> = name.split(',').map(str::trim).collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return name.to_string();
    }
    let given = parts[1];
    if given.contains('&') || given.split_whitespace().count() > 2 {
        return name.to_string();
    }
    format!("{} {}", given, parts[0])
}

/// Masks the worst words in an edgy station's titles and drops the
/// "[coll]:" collaboration marker.
pub fn profanity_filter<R: Rng + ?Sized>(text: &str, rng: &mut R) -> String {
    let emoji = PROFANITY_EMOJIS.choose(rng).copied().unwrap_or("🤐");
    let mut out = text
        .replace("Fuck", &format!("F{emoji}ck"))
        .replace("Shit", "Sh💩t")
        .replace("Pussy", "P🙀ssy")
        .replace("[coll]:", "")
        .replace("[Coll]:", "");
    while out.contains("  ") {
        out = out.replace("  ", " ");
    }
    out.trim().to_string()
}

pub fn time_shift(t: NaiveDateTime, hours: i64) -> NaiveDateTime {
    t + Duration::hours(hours)
}

/// A few shows lost one of their times; guess it from the other one.
pub fn fix_playlist_times(
    start: Option<NaiveDateTime>,
    end: Option<NaiveDateTime>,
) -> (Option<NaiveDateTime>, Option<NaiveDateTime>) {
    match (start, end) {
        (None, Some(e)) => (Some(time_shift(e, -SHOW_HOURS)), Some(e)),
        (Some(s), None) => (Some(s), Some(time_shift(s, SHOW_HOURS))),
        other => other,
    }
}

/// "12 years, 3 weeks, and 2.5 days"
pub fn minutes_to_years(minutes: i64) -> String {
    let number_of_days = minutes as f64 / (60.0 * 24.0);
    let years = (number_of_days / 365.0) as i64;
    let weeks = ((number_of_days % 365.0) / 7.0) as i64;
    let days = ((number_of_days % 365.0) % 7.0 * 10.0).round() / 10.0;

    format!("{years} years, {weeks} weeks, and {days:.1} days")
}

/// For scorekeeping: percent of graded answers that passed, one decimal.
pub fn percent_correct(passed: u32, failed: u32) -> f64 {
    let graded = passed + failed;
    if graded == 0 {
        return 0.0;
    }
    (passed as f64 * 1000.0 / graded as f64).round() / 10.0
}

/// `k` random numbers within `percent` of `target` (upper bound exclusive)
pub fn random_number_within_percent<R: Rng + ?Sized>(
    target: i64,
    percent: u32,
    k: usize,
    rng: &mut R,
) -> Vec<i64> {
    let spread = percent as f64 / 100.0;
    let high = (target as f64 * (1.0 + spread)) as i64;
    let low = (target as f64 * (1.0 - spread)) as i64;
    let high = if high <= low { low + 1 } else { high };

    (0..k).map(|_| rng.gen_range(low..high)).collect()
}

/// Dates whose distance from `now` is within `percent` of the target's
pub fn random_dates_surrounding<R: Rng + ?Sized>(
    target: NaiveDateTime,
    now: NaiveDateTime,
    percent: u32,
    k: usize,
    rng: &mut R,
) -> Vec<NaiveDateTime> {
    let days_from_now = (now - target).num_days();
    random_number_within_percent(days_from_now, percent, k, rng)
        .into_iter()
        .map(|days| now - Duration::days(days))
        .collect()
}

/// "July 28, 2000"
pub fn make_date_pretty(t: &NaiveDateTime) -> String {
    t.format("%B %d, %Y").to_string()
}

/// "2,216,327"
pub fn with_commas(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if n < 0 {
        format!("-{out}")
    } else {
        out
    }
}

/// Keys ordered from most to least popular; ties sorted by name
pub fn ranked(counts: &HashMap<String, u64>) -> Vec<(String, u64)> {
    let mut items: Vec<(String, u64)> = counts.iter().map(|(k, v)| (k.clone(), *v)).collect();
    items.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    items
}

/// Top-n list from any popularity map.
///
/// May return more than `n` items when there is a tie at the cutoff.
pub fn top_n(counts: &HashMap<String, u64>, n: usize) -> Vec<String> {
    if n == 0 {
        return Vec::new();
    }
    let items = ranked(counts);
    if items.len() <= n {
        return items.into_iter().map(|(k, _)| k).collect();
    }
    let cutoff = items[n - 1].1;
    items
        .into_iter()
        .take_while(|(_, count)| *count >= cutoff)
        .map(|(k, _)| k)
        .collect()
}

/// "Robert Emmett's" but "Spliff Skankins'"
pub fn the_right_apostrophe(name: &str) -> &'static str {
    if name.ends_with('s') || name.ends_with('S') {
        "'"
    } else {
        "'s"
    }
}
