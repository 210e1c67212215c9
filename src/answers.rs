//! Player answers, scores and the leaderboard
use chrono::Local;
use rusqlite::{params, Connection, Row};
use serde::Serialize;

use crate::common::percent_correct;
use crate::db::{self, opt_time};
use crate::error::Result;
use crate::model::{Answer, Question};

/// What a player sends to pass on a question
pub const SKIP: &str = "SKIP";

const ANSWER_COLUMNS: &str =
    "answer_id, user_id, question_id, answer_given, answer_correct, timestamp";

fn from_row(row: &Row) -> rusqlite::Result<Answer> {
    Ok(Answer {
        answer_id: row.get(0)?,
        user_id: row.get(1)?,
        question_id: row.get(2)?,
        answer_given: row.get(3)?,
        answer_correct: row.get(4)?,
        timestamp: opt_time(row.get(5)?).unwrap_or_default(),
    })
}

/// `None` for a skip, otherwise whether the answer matches exactly
pub fn is_answer_correct(question: &Question, answer_given: &str) -> Option<bool> {
    let given = answer_given.trim();
    if given.is_empty() || given.eq_ignore_ascii_case(SKIP) {
        return None;
    }
    Some(given == question.acceptable_answers.display_answer)
}

pub fn create_answer(
    conn: &Connection,
    user_id: i64,
    question: &Question,
    answer_given: &str,
) -> Result<Answer> {
    let answer_correct = is_answer_correct(question, answer_given);
    let answer_given = answer_correct.map(|_| answer_given.trim().to_string());
    let timestamp = Local::now().naive_local();

    conn.execute(
        "INSERT INTO answers (user_id, question_id, answer_given, answer_correct, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            user_id,
            question.question_id,
            answer_given,
            answer_correct,
            db::to_db_time(&timestamp)
        ],
    )?;

    Ok(Answer {
        answer_id: conn.last_insert_rowid(),
        user_id,
        question_id: question.question_id,
        answer_given,
        answer_correct,
        timestamp,
    })
}

pub fn get_answers(conn: &Connection) -> Result<Vec<Answer>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ANSWER_COLUMNS} FROM answers ORDER BY answer_id"
    ))?;
    let answers = stmt
        .query_map([], from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(answers)
}

pub fn get_one_users_answers(conn: &Connection, user_id: i64) -> Result<Vec<Answer>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ANSWER_COLUMNS} FROM answers WHERE user_id = ?1 ORDER BY answer_id"
    ))?;
    let answers = stmt
        .query_map([user_id], from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(answers)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Score {
    pub passed: u32,
    pub failed: u32,
    pub skipped: u32,
    /// Every question seen, skips included
    pub questions: u32,
    /// Of the graded answers
    pub percent: f64,
}

impl Score {
    fn tally(passed: i64, failed: i64, skipped: i64) -> Self {
        let (passed, failed, skipped) = (passed as u32, failed as u32, skipped as u32);
        Score {
            passed,
            failed,
            skipped,
            questions: passed + failed + skipped,
            percent: percent_correct(passed, failed),
        }
    }
}

const TALLY: &str = "COALESCE(SUM(CASE WHEN answer_correct = 1 THEN 1 ELSE 0 END), 0),
                     COALESCE(SUM(CASE WHEN answer_correct = 0 THEN 1 ELSE 0 END), 0),
                     COALESCE(SUM(CASE WHEN answer_correct IS NULL THEN 1 ELSE 0 END), 0)";

pub fn get_user_score(conn: &Connection, user_id: i64) -> Result<Score> {
    Ok(conn.query_row(
        &format!("SELECT {TALLY} FROM answers WHERE user_id = ?1"),
        [user_id],
        |row| Ok(Score::tally(row.get(0)?, row.get(1)?, row.get(2)?)),
    )?)
}

/// Totals over every player
pub fn grade_all_answers(conn: &Connection) -> Result<Score> {
    Ok(conn.query_row(&format!("SELECT {TALLY} FROM answers"), [], |row| {
        Ok(Score::tally(row.get(0)?, row.get(1)?, row.get(2)?))
    })?)
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub username: String,
    pub display_name: String,
    #[serde(flatten)]
    pub score: Score,
}

/// Players with at least one graded answer, best percentage first.
/// Ties go to whoever answered more questions right.
pub fn leaderboard(conn: &Connection, size: usize) -> Result<Vec<LeaderboardEntry>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT u.username, COALESCE(u.fname, u.username), {TALLY}
         FROM answers a
         JOIN users u ON u.user_id = a.user_id
         GROUP BY u.user_id"
    ))?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            Score::tally(row.get(2)?, row.get(3)?, row.get(4)?),
        ))
    })?;

    let mut players = Vec::new();
    for row in rows {
        let (username, display_name, score) = row?;
        if score.passed + score.failed > 0 {
            players.push((username, display_name, score));
        }
    }

    players.sort_by(|a, b| {
        b.2.percent
            .total_cmp(&a.2.percent)
            .then_with(|| b.2.passed.cmp(&a.2.passed))
            .then_with(|| a.0.cmp(&b.0))
    });

    Ok(players
        .into_iter()
        .take(size)
        .enumerate()
        .map(|(i, (username, display_name, score))| LeaderboardEntry {
            rank: i + 1,
            username,
            display_name,
            score,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AcceptableAnswers, QuestionType};
    use crate::users;
    use serde_json::json;

    fn question(id: i64, right: &str) -> Question {
        Question {
            question_id: id,
            code: "how_many_djs".into(),
            question: format!("Question {id}"),
            question_type: QuestionType::Number,
            acceptable_answers: AcceptableAnswers {
                calculate_answer: json!(3),
                display_answer: right.into(),
                rephrase_the_question: "There are:".into(),
            },
            wrong_answers: Vec::new(),
        }
    }

    fn with_questions(conn: &Connection, n: i64) -> Vec<Question> {
        (1..=n)
            .map(|id| {
                conn.execute(
                    "INSERT INTO questions (question_id, code, question, question_type, acceptable_answers)
                     VALUES (?1, 'how_many_djs', ?2, 'number', '{}')",
                    params![id, format!("Question {id}")],
                )
                .unwrap();
                question(id, "3")
            })
            .collect()
    }

    #[test]
    fn test_is_answer_correct() {
        let q = question(1, "1,234");
        assert_eq!(is_answer_correct(&q, "1,234"), Some(true));
        assert_eq!(is_answer_correct(&q, " 1,234 "), Some(true));
        assert_eq!(is_answer_correct(&q, "1234"), Some(false));
        assert_eq!(is_answer_correct(&q, "skip"), None);
        assert_eq!(is_answer_correct(&q, ""), None);
    }

    #[test]
    fn test_create_answer_and_score() {
        let conn = db::open_in_memory().unwrap();
        let user = users::create_user(&conn, "robot", Some("Robbie"), "beepboop").unwrap();
        let qs = with_questions(&conn, 4);

        let a = create_answer(&conn, user.user_id, &qs[0], "3").unwrap();
        assert_eq!(a.answer_correct, Some(true));
        create_answer(&conn, user.user_id, &qs[1], "4").unwrap();
        let skipped = create_answer(&conn, user.user_id, &qs[2], SKIP).unwrap();
        assert!(skipped.answer_given.is_none());
        create_answer(&conn, user.user_id, &qs[3], "3").unwrap();

        let score = get_user_score(&conn, user.user_id).unwrap();
        assert_eq!(score.passed, 2);
        assert_eq!(score.failed, 1);
        assert_eq!(score.skipped, 1);
        assert_eq!(score.questions, 4);
        assert_eq!(score.percent, 66.7);

        assert_eq!(get_one_users_answers(&conn, user.user_id).unwrap().len(), 4);
    }

    #[test]
    fn test_score_with_no_answers() {
        let conn = db::open_in_memory().unwrap();
        let score = get_user_score(&conn, 42).unwrap();
        assert_eq!(score, Score::default());
    }

    #[test]
    fn test_grade_all_answers() {
        let conn = db::open_in_memory().unwrap();
        let qs = with_questions(&conn, 2);
        for name in ["a", "b"] {
            let user = users::create_user(&conn, name, None, "pw").unwrap();
            create_answer(&conn, user.user_id, &qs[0], "3").unwrap();
            create_answer(&conn, user.user_id, &qs[1], "0").unwrap();
        }
        let totals = grade_all_answers(&conn).unwrap();
        assert_eq!(totals.passed, 2);
        assert_eq!(totals.failed, 2);
        assert_eq!(totals.percent, 50.0);
        assert_eq!(get_answers(&conn).unwrap().len(), 4);
    }

    #[test]
    fn test_leaderboard_order() {
        let conn = db::open_in_memory().unwrap();
        let qs = with_questions(&conn, 3);

        let ace = users::create_user(&conn, "ace", Some("Ace"), "pw").unwrap();
        let half = users::create_user(&conn, "half", None, "pw").unwrap();
        let also_ace = users::create_user(&conn, "also_ace", None, "pw").unwrap();
        let skipper = users::create_user(&conn, "skipper", None, "pw").unwrap();

        for q in &qs {
            create_answer(&conn, ace.user_id, q, "3").unwrap();
        }
        create_answer(&conn, half.user_id, &qs[0], "3").unwrap();
        create_answer(&conn, half.user_id, &qs[1], "9").unwrap();
        create_answer(&conn, also_ace.user_id, &qs[0], "3").unwrap();
        create_answer(&conn, skipper.user_id, &qs[0], SKIP).unwrap();

        let board = leaderboard(&conn, 10).unwrap();
        let names: Vec<&str> = board.iter().map(|e| e.username.as_str()).collect();
        assert_eq!(names, vec!["ace", "also_ace", "half"]);
        assert_eq!(board[0].rank, 1);
        assert_eq!(board[0].display_name, "Ace");

        assert_eq!(leaderboard(&conn, 1).unwrap().len(), 1);
    }
}
