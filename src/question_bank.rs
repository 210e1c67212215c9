//! Stored questions: saving, picking one a player has not seen, and dealing
//! the four answer choices.
use chrono::{Duration, Local, NaiveDateTime};
use rand::seq::SliceRandom;
use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;

use crate::common::{
    make_date_pretty, minutes_to_years, random_dates_surrounding, random_number_within_percent,
    with_commas,
};
use crate::config::Settings;
use crate::db;
use crate::error::{Error, Result};
use crate::model::{AcceptableAnswers, Question, QuestionType};
use crate::questions::{NewQuestion, WRONG_ANSWER_COUNT};

const QUESTION_COLUMNS: &str =
    "question_id, code, question, question_type, acceptable_answers, wrong_answers";

/// Raw row; JSON columns are decoded afterwards so decode errors keep their type
struct QuestionRow {
    question_id: i64,
    code: String,
    question: String,
    question_type: String,
    acceptable_answers: String,
    wrong_answers: String,
}

fn from_row(row: &Row) -> rusqlite::Result<QuestionRow> {
    Ok(QuestionRow {
        question_id: row.get(0)?,
        code: row.get(1)?,
        question: row.get(2)?,
        question_type: row.get(3)?,
        acceptable_answers: row.get(4)?,
        wrong_answers: row.get(5)?,
    })
}

impl QuestionRow {
    fn decode(self) -> Result<Question> {
        let question_type = QuestionType::parse(&self.question_type).ok_or_else(|| {
            Error::Internal(format!(
                "question {} has unknown type {}",
                self.question_id, self.question_type
            ))
        })?;
        let acceptable_answers: AcceptableAnswers = serde_json::from_str(&self.acceptable_answers)?;
        let wrong_answers: Vec<String> = serde_json::from_str(&self.wrong_answers)?;
        Ok(Question {
            question_id: self.question_id,
            code: self.code,
            question: self.question,
            question_type,
            acceptable_answers,
            wrong_answers,
        })
    }
}

pub fn create_question(conn: &Connection, question: &NewQuestion) -> Result<i64> {
    conn.execute(
        "INSERT INTO questions (code, question, question_type, acceptable_answers, wrong_answers)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            question.code,
            question.question,
            question.question_type.as_str(),
            serde_json::to_string(&question.acceptable_answers)?,
            serde_json::to_string(&question.wrong_answers)?,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_questions(conn: &Connection) -> Result<Vec<Question>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {QUESTION_COLUMNS} FROM questions ORDER BY question_id"
    ))?;
    let rows = stmt
        .query_map([], from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter().map(QuestionRow::decode).collect()
}

pub fn get_question_by_id(conn: &Connection, question_id: i64) -> Result<Option<Question>> {
    conn.query_row(
        &format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE question_id = ?1"),
        [question_id],
        from_row,
    )
    .optional()?
    .map(QuestionRow::decode)
    .transpose()
}

pub fn question_text_exists(conn: &Connection, text: &str) -> Result<bool> {
    db::exists(conn, "SELECT 1 FROM questions WHERE question = ?1", [text])
}

/// Any stored question, for anonymous play
pub fn get_random_question(conn: &Connection) -> Result<Option<Question>> {
    conn.query_row(
        &format!("SELECT {QUESTION_COLUMNS} FROM questions ORDER BY RANDOM() LIMIT 1"),
        [],
        from_row,
    )
    .optional()?
    .map(QuestionRow::decode)
    .transpose()
}

/// A random question this user has never answered (skips count as answered)
pub fn get_unique_question(conn: &Connection, user_id: i64) -> Result<Question> {
    if db::get_count(conn, "questions", "question_id", false)? == 0 {
        return Err(Error::NotFound(
            "no questions yet, run seed-questions first".into(),
        ));
    }
    conn.query_row(
        &format!(
            "SELECT {QUESTION_COLUMNS} FROM questions
             WHERE question_id NOT IN (SELECT question_id FROM answers WHERE user_id = ?1)
             ORDER BY RANDOM() LIMIT 1"
        ),
        [user_id],
        from_row,
    )
    .optional()?
    .ok_or(Error::QuestionPoolExhausted)?
    .decode()
}

/// Row counts for every table
pub fn how_many(conn: &Connection) -> Result<BTreeMap<&'static str, i64>> {
    let mut counts = BTreeMap::new();
    for table in db::TABLES {
        let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        counts.insert(table, n);
    }
    Ok(counts)
}

fn calculate_as_i64(question: &Question) -> Result<i64> {
    question
        .acceptable_answers
        .calculate_answer
        .as_i64()
        .ok_or_else(|| Error::Internal(format!("question {} has no numeric answer", question.question_id)))
}

fn calculate_as_time(question: &Question) -> Result<NaiveDateTime> {
    question
        .acceptable_answers
        .calculate_answer
        .as_str()
        .and_then(db::from_db_time)
        .ok_or_else(|| Error::Internal(format!("question {} has no date answer", question.question_id)))
}

/// Keeps the first `WRONG_ANSWER_COUNT` distinct candidates that are not the right answer
fn take_distinct<I>(right: &str, wrong: &mut Vec<String>, candidates: I)
where
    I: IntoIterator<Item = String>,
{
    for candidate in candidates {
        if wrong.len() >= WRONG_ANSWER_COUNT {
            return;
        }
        if candidate != right && !wrong.contains(&candidate) {
            wrong.push(candidate);
        }
    }
}

/// Wrong answers for a stored question.
///
/// Numbers, durations and dates are made up near the truth each time the
/// question is asked; choice questions draw from their stored wrong answers.
pub fn wrong_answers_for<R: Rng + ?Sized>(
    question: &Question,
    settings: &Settings,
    rng: &mut R,
) -> Result<Vec<String>> {
    let right = question.acceptable_answers.display_answer.as_str();
    let mut wrong = Vec::with_capacity(WRONG_ANSWER_COUNT);

    match question.question_type {
        QuestionType::Number => {
            let target = calculate_as_i64(question)?;
            let near = random_number_within_percent(target, settings.number_spread_percent, 12, rng);
            take_distinct(right, &mut wrong, near.into_iter().map(with_commas));
            // Tiny counts leave too little room inside the spread
            take_distinct(right, &mut wrong, (1..).map(|i| with_commas(target + i)).take(6));
        }
        QuestionType::Duration => {
            let minutes = calculate_as_i64(question)?;
            let near = random_number_within_percent(minutes, settings.number_spread_percent, 12, rng);
            take_distinct(right, &mut wrong, near.into_iter().map(minutes_to_years));
            take_distinct(
                right,
                &mut wrong,
                (1..).map(|days| minutes_to_years(minutes + days * 24 * 60)).take(6),
            );
        }
        QuestionType::Date => {
            let target = calculate_as_time(question)?;
            let now = Local::now().naive_local();
            let near = random_dates_surrounding(target, now, settings.date_spread_percent, 12, rng);
            take_distinct(right, &mut wrong, near.iter().map(make_date_pretty));
            take_distinct(
                right,
                &mut wrong,
                (1..)
                    .map(|weeks| make_date_pretty(&(target - Duration::weeks(weeks))))
                    .take(6),
            );
        }
        QuestionType::Choice => {
            let stored: Vec<String> = question
                .wrong_answers
                .choose_multiple(rng, question.wrong_answers.len())
                .cloned()
                .collect();
            take_distinct(right, &mut wrong, stored);
        }
    }

    if wrong.len() < WRONG_ANSWER_COUNT {
        return Err(Error::Internal(format!(
            "question {} has only {} wrong answers",
            question.question_id,
            wrong.len()
        )));
    }
    Ok(wrong)
}

/// Three wrong answers and the right one, shuffled
pub fn get_answer_pile<R: Rng + ?Sized>(
    question: &Question,
    settings: &Settings,
    rng: &mut R,
) -> Result<Vec<String>> {
    let mut pile = wrong_answers_for(question, settings, rng)?;
    pile.push(question.acceptable_answers.display_answer.clone());
    pile.shuffle(rng);
    Ok(pile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::questions::{self, QuestionKind};
    use crate::users;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    fn stored(conn: &Connection, kind: QuestionKind) -> Question {
        let mut rng = StdRng::seed_from_u64(3);
        let new = questions::generate(conn, kind, &Settings::default(), &mut rng)
            .unwrap()
            .unwrap();
        let id = create_question(conn, &new).unwrap();
        get_question_by_id(conn, id).unwrap().unwrap()
    }

    fn choice(answer: &str, wrong: &[&str]) -> NewQuestion {
        NewQuestion {
            code: "longest_on_air".into(),
            question: format!("Pick {answer}"),
            question_type: QuestionType::Choice,
            acceptable_answers: AcceptableAnswers {
                calculate_answer: json!(answer),
                display_answer: answer.into(),
                rephrase_the_question: "It was:".into(),
            },
            wrong_answers: wrong.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_create_and_get_question() {
        let conn = db::seeded();
        let q = stored(&conn, QuestionKind::ShowCount);
        assert_eq!(q.code, "how_many_shows");
        assert_eq!(q.question_type, QuestionType::Number);
        assert_eq!(q.acceptable_answers.display_answer, "148");
        assert!(question_text_exists(&conn, &q.question).unwrap());
        assert_eq!(get_questions(&conn).unwrap().len(), 1);
    }

    #[test]
    fn test_number_pile() {
        let conn = db::seeded();
        let q = stored(&conn, QuestionKind::ShowCount);
        let mut rng = StdRng::seed_from_u64(9);
        let pile = get_answer_pile(&q, &Settings::default(), &mut rng).unwrap();

        assert_eq!(pile.len(), 4);
        assert_eq!(pile.iter().filter(|a| *a == "148").count(), 1);
        for answer in &pile {
            let n: i64 = answer.replace(',', "").parse().unwrap();
            assert!((88..=208).contains(&n), "{answer} outside the spread");
        }
    }

    #[test]
    fn test_tiny_number_still_gets_three_wrong_answers() {
        let conn = db::seeded();
        // Three DJs: the spread alone only allows 1, 2 and 3
        let q = stored(&conn, QuestionKind::DjCount);
        let mut rng = StdRng::seed_from_u64(2);
        let wrong = wrong_answers_for(&q, &Settings::default(), &mut rng).unwrap();
        assert_eq!(wrong.len(), 3);
        assert!(!wrong.contains(&"3".to_string()));
    }

    #[test]
    fn test_date_pile() {
        let conn = db::seeded();
        let q = stored(&conn, QuestionKind::FirstPlaylist);
        let mut rng = StdRng::seed_from_u64(4);
        let pile = get_answer_pile(&q, &Settings::default(), &mut rng).unwrap();
        assert_eq!(pile.len(), 4);
        assert!(pile.contains(&"September 19, 1995".to_string()));
        let mut distinct = pile.clone();
        distinct.sort();
        distinct.dedup();
        assert_eq!(distinct.len(), 4);
    }

    #[test]
    fn test_duration_pile() {
        let conn = db::seeded();
        let q = stored(&conn, QuestionKind::LibraryListeningTime);
        let mut rng = StdRng::seed_from_u64(4);
        let pile = get_answer_pile(&q, &Settings::default(), &mut rng).unwrap();
        assert_eq!(pile.len(), 4);
        assert!(pile.iter().all(|a| a.contains("years")));
    }

    #[test]
    fn test_choice_pile_uses_stored_answers() {
        let conn = db::open_in_memory().unwrap();
        let id = create_question(&conn, &choice("Can", &["Neu!", "Faust", "Cluster"])).unwrap();
        let q = get_question_by_id(&conn, id).unwrap().unwrap();
        let mut rng = StdRng::seed_from_u64(4);
        let mut pile = get_answer_pile(&q, &Settings::default(), &mut rng).unwrap();
        pile.sort();
        assert_eq!(pile, vec!["Can", "Cluster", "Faust", "Neu!"]);
    }

    #[test]
    fn test_choice_without_enough_wrong_answers() {
        let conn = db::open_in_memory().unwrap();
        let id = create_question(&conn, &choice("Can", &["Neu!", "Can"])).unwrap();
        let q = get_question_by_id(&conn, id).unwrap().unwrap();
        let mut rng = StdRng::seed_from_u64(4);
        assert!(matches!(
            get_answer_pile(&q, &Settings::default(), &mut rng),
            Err(Error::Internal(_))
        ));
    }

    #[test]
    fn test_unique_question_until_exhausted() {
        let conn = db::seeded();
        let user = users::create_user(&conn, "robot", None, "beepboop").unwrap();
        assert!(matches!(
            get_unique_question(&conn, user.user_id),
            Err(Error::NotFound(_))
        ));

        let q = stored(&conn, QuestionKind::AlbumCount);
        let picked = get_unique_question(&conn, user.user_id).unwrap();
        assert_eq!(picked.question_id, q.question_id);

        conn.execute(
            "INSERT INTO answers (user_id, question_id, answer_given, answer_correct, timestamp)
             VALUES (?1, ?2, NULL, NULL, '2024-01-01 00:00:00')",
            params![user.user_id, q.question_id],
        )
        .unwrap();
        assert!(matches!(
            get_unique_question(&conn, user.user_id),
            Err(Error::QuestionPoolExhausted)
        ));
    }

    #[test]
    fn test_how_many() {
        let conn = db::seeded();
        let counts = how_many(&conn).unwrap();
        assert_eq!(counts["albums"], 6);
        assert_eq!(counts["questions"], 0);
        assert_eq!(counts.len(), db::TABLES.len());
    }
}
