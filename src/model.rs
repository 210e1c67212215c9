//! Row types for every table

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub user_id: i64,
    pub username: String,
    pub fname: Option<String>,
    #[serde(skip)]
    pub hashed_password: String,
    #[serde(skip)]
    pub salt: String,
}

impl User {
    /// First name if given, username otherwise
    pub fn display_name(&self) -> &str {
        self.fname.as_deref().unwrap_or(&self.username)
    }
}

/// How a question's answers are compared and how wrong answers are made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Number,
    Date,
    Duration,
    Choice,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Number => "number",
            QuestionType::Date => "date",
            QuestionType::Duration => "duration",
            QuestionType::Choice => "choice",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "number" => Some(QuestionType::Number),
            "date" => Some(QuestionType::Date),
            "duration" => Some(QuestionType::Duration),
            "choice" => Some(QuestionType::Choice),
            _ => None,
        }
    }
}

/// The right answer in raw and display form.
///
/// `calculate_answer` holds the value wrong answers are derived from: a
/// count for numbers, minutes for durations, a `YYYY-MM-DD HH:MM:SS`
/// timestamp for dates and the answer text itself for choices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptableAnswers {
    pub calculate_answer: serde_json::Value,
    pub display_answer: String,
    pub rephrase_the_question: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Question {
    pub question_id: i64,
    pub code: String,
    pub question: String,
    pub question_type: QuestionType,
    pub acceptable_answers: AcceptableAnswers,
    pub wrong_answers: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub answer_id: i64,
    pub user_id: i64,
    pub question_id: i64,
    pub answer_given: Option<String>,
    /// `None` for a skipped question
    pub answer_correct: Option<bool>,
    pub timestamp: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dj {
    pub dj_id: i64,
    pub air_name: Option<String>,
    pub administrative: bool,
    /// DJs who have passed on
    pub silent_mic: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Playlist {
    pub id_: i64,
    pub kfjc_playlist_id: i64,
    pub dj_id: Option<i64>,
    pub air_name: Option<String>,
    pub start_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlaylistTrack {
    pub id_: i64,
    pub kfjc_playlist_id: i64,
    pub indx: Option<i64>,
    pub kfjc_album_id: Option<i64>,
    pub album_title: Option<String>,
    pub artist: Option<String>,
    pub track_title: Option<String>,
    pub time_played: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Album {
    pub id_: i64,
    pub kfjc_album_id: i64,
    pub artist: Option<String>,
    pub title: Option<String>,
    pub is_collection: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Track {
    pub id_: i64,
    pub kfjc_album_id: i64,
    pub artist: Option<String>,
    pub title: Option<String>,
    pub indx: Option<i64>,
}
