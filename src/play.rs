//! Terminal trivia loop.
//!
//! Same question engine as the web game: `start` deals a stored question,
//! a registry code builds a fresh one, answers are picked with A-D.
use rand::Rng;
use rusqlite::Connection;
use std::io::{BufRead, Write};

use crate::answers::{self, SKIP};
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::model::{Question, User};
use crate::question_bank;
use crate::questions::{
    build_registry, choose_random_question, generate, parse_code, sorted_codes, QuestionKind,
};
use crate::robot;

const LETTERS: [char; 4] = ['A', 'B', 'C', 'D'];

/// How one question went
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Right,
    Wrong,
    Skipped,
    /// Input ran out mid-question
    Quit,
}

#[derive(Debug, Default)]
struct SessionTally {
    played: u32,
    passed: u32,
    failed: u32,
    skipped: u32,
}

impl SessionTally {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Right => self.passed += 1,
            Outcome::Wrong => self.failed += 1,
            Outcome::Skipped => self.skipped += 1,
            Outcome::Quit => return,
        }
        self.played += 1;
    }

    fn print<W: Write>(&self, out: &mut W, heading: &str) -> Result<()> {
        writeln!(out, "\n=== {heading} ===")?;
        writeln!(out, "Questions played: {}", self.played)?;
        writeln!(
            out,
            "Right: {}  Wrong: {}  Skipped: {}",
            self.passed, self.failed, self.skipped
        )?;
        if self.passed + self.failed > 0 {
            writeln!(
                out,
                "Percent correct: {:.1}%",
                crate::common::percent_correct(self.passed, self.failed)
            )?;
        }
        Ok(())
    }
}

/// Maps "b", "B" or the choice text itself to the chosen answer
fn parse_choice<'a>(input: &str, choices: &'a [String]) -> Option<&'a str> {
    let input = input.trim();
    let mut chars = input.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        let upper = c.to_ascii_uppercase();
        if let Some(i) = LETTERS.iter().position(|&l| l == upper) {
            return choices.get(i).map(String::as_str);
        }
    }
    choices
        .iter()
        .find(|choice| choice.eq_ignore_ascii_case(input))
        .map(String::as_str)
}

/// Reads a line; `None` at end of input
fn read_line<R: BufRead>(input: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Terminal game over one database connection
pub struct Game<'a, R, W> {
    conn: &'a Connection,
    settings: &'a Settings,
    user: Option<User>,
    input: R,
    out: W,
}

impl<'a, R: BufRead, W: Write> Game<'a, R, W> {
    pub fn new(conn: &'a Connection, settings: &'a Settings, user: Option<User>, input: R, out: W) -> Self {
        Self {
            conn,
            settings,
            user,
            input,
            out,
        }
    }

    fn welcome(&mut self) -> Result<()> {
        writeln!(self.out, "Welcome to the KFJC Trivia Robot (terminal edition)")?;
        if let Some(user) = &self.user {
            writeln!(self.out, "Playing as {}", user.display_name())?;
        }
        writeln!(self.out, "Commands:")?;
        writeln!(self.out, "  start  -> a stored question")?;
        writeln!(self.out, "  random -> a fresh question of a random kind")?;
        writeln!(self.out, "  list   -> show all question codes")?;
        writeln!(self.out, "  score  -> show session score")?;
        writeln!(self.out, "  <code> -> a fresh question of that kind (e.g., dj_top_artist)")?;
        writeln!(self.out, "  quit   -> exit")?;
        writeln!(self.out)?;
        Ok(())
    }

    /// Runs until `quit`, `exit` or end of input
    pub fn run(&mut self) -> Result<()> {
        let registry = build_registry();
        let mut tally = SessionTally::default();
        let mut rng = rand::thread_rng();

        self.welcome()?;

        loop {
            write!(self.out, "> ")?;
            self.out.flush()?;

            let Some(raw) = read_line(&mut self.input)? else {
                break;
            };
            if raw.is_empty() {
                continue;
            }

            let outcome = match raw.to_lowercase().as_str() {
                "quit" | "exit" => break,
                "score" => {
                    tally.print(&mut self.out, "SESSION SCORE")?;
                    if let Some(user) = &self.user {
                        let stored = answers::get_user_score(self.conn, user.user_id)?;
                        writeln!(
                            self.out,
                            "All time: {} right of {} questions ({:.1}%)",
                            stored.passed, stored.questions, stored.percent
                        )?;
                    }
                    writeln!(self.out)?;
                    None
                }
                "list" => {
                    writeln!(self.out, "Available question codes:")?;
                    for code in sorted_codes(&registry) {
                        writeln!(self.out, " - {code}: {}", registry[code].description)?;
                    }
                    writeln!(self.out)?;
                    None
                }
                "start" => self.stored_question(&mut rng)?,
                "random" => match choose_random_question(&registry, &mut rng) {
                    Some((code, meta)) => {
                        writeln!(self.out, "Random code: {code}")?;
                        self.fresh_question(code, meta.kind, &mut rng)?
                    }
                    None => {
                        writeln!(self.out, "No questions registered.")?;
                        None
                    }
                },
                other => match parse_code(other, &registry) {
                    Some((code, meta)) => {
                        writeln!(self.out, "Code: {code}")?;
                        writeln!(self.out, "Description: {}", meta.description)?;
                        self.fresh_question(code, meta.kind, &mut rng)?
                    }
                    None => {
                        writeln!(self.out, "Unknown command or code: '{other}'")?;
                        writeln!(self.out, "Type 'list' to see available codes.\n")?;
                        None
                    }
                },
            };

            match outcome {
                Some(Outcome::Quit) => break,
                Some(outcome) => tally.record(outcome),
                None => {}
            }
        }

        tally.print(&mut self.out, "SESSION SUMMARY")?;
        writeln!(self.out, "Goodbye!")?;
        Ok(())
    }

    fn stored_question<G: Rng + ?Sized>(&mut self, rng: &mut G) -> Result<Option<Outcome>> {
        let question = match &self.user {
            Some(user) => match question_bank::get_unique_question(self.conn, user.user_id) {
                Ok(q) => Some(q),
                Err(Error::QuestionPoolExhausted) => {
                    writeln!(self.out, "{}", Error::QuestionPoolExhausted)?;
                    return Ok(None);
                }
                Err(Error::NotFound(_)) => None,
                Err(e) => return Err(e),
            },
            None => question_bank::get_random_question(self.conn)?,
        };

        let Some(question) = question else {
            writeln!(
                self.out,
                "No stored questions yet. Run seed-questions, or type a code from 'list'.\n"
            )?;
            return Ok(None);
        };

        let outcome = self.ask(&question, rng)?;
        if let (Some(user), Some(given)) = (&self.user, outcome.1) {
            answers::create_answer(self.conn, user.user_id, &question, &given)?;
        }
        Ok(Some(outcome.0))
    }

    fn fresh_question<G: Rng + ?Sized>(
        &mut self,
        code: &str,
        kind: QuestionKind,
        rng: &mut G,
    ) -> Result<Option<Outcome>> {
        let Some(new) = generate(self.conn, kind, self.settings, rng)? else {
            writeln!(self.out, "Not enough station data for a {code} question yet.\n")?;
            return Ok(None);
        };
        // Unsaved question, so nothing is recorded for the player
        let question = Question {
            question_id: 0,
            code: new.code,
            question: new.question,
            question_type: new.question_type,
            acceptable_answers: new.acceptable_answers,
            wrong_answers: new.wrong_answers,
        };
        Ok(Some(self.ask(&question, rng)?.0))
    }

    /// Shows the question and its choices, then reads an answer.
    /// Also returns what to record: the chosen text or `SKIP`.
    fn ask<G: Rng + ?Sized>(&mut self, question: &Question, rng: &mut G) -> Result<(Outcome, Option<String>)> {
        let choices = question_bank::get_answer_pile(question, self.settings, rng)?;

        writeln!(self.out, "\nQuestion: {}", question.question)?;
        for (letter, choice) in LETTERS.iter().zip(&choices) {
            writeln!(self.out, "  {letter}) {choice}")?;
        }

        let chosen = loop {
            write!(self.out, "Your answer (A-D, or skip): ")?;
            self.out.flush()?;
            let Some(line) = read_line(&mut self.input)? else {
                return Ok((Outcome::Quit, None));
            };
            if line.eq_ignore_ascii_case("skip") {
                writeln!(self.out, "Skipped!\n")?;
                return Ok((Outcome::Skipped, Some(SKIP.to_string())));
            }
            match parse_choice(&line, &choices) {
                Some(choice) => break choice.to_string(),
                None => writeln!(self.out, "Pick A, B, C or D.")?,
            }
        };

        let correct = answers::is_answer_correct(question, &chosen) == Some(true);
        let answer = &question.acceptable_answers;
        writeln!(self.out, "{}", robot::reaction(correct, rng))?;
        writeln!(self.out, "{} {}\n", answer.rephrase_the_question, answer.display_answer)?;

        let outcome = if correct { Outcome::Right } else { Outcome::Wrong };
        Ok((outcome, Some(chosen)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::questions;
    use crate::users;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::io::Cursor;

    fn play(conn: &Connection, user: Option<User>, script: &str) -> String {
        let settings = Settings::default();
        let mut out = Vec::new();
        Game::new(conn, &settings, user, Cursor::new(script.to_string()), &mut out)
            .run()
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    fn seed(conn: &Connection, kind: QuestionKind) -> Question {
        let mut rng = StdRng::seed_from_u64(1);
        let new = questions::generate(conn, kind, &Settings::default(), &mut rng)
            .unwrap()
            .unwrap();
        let id = question_bank::create_question(conn, &new).unwrap();
        question_bank::get_question_by_id(conn, id).unwrap().unwrap()
    }

    #[test]
    fn test_parse_choice() {
        let choices: Vec<String> = ["Can", "Neu!", "Faust", "Cluster"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(parse_choice("b", &choices), Some("Neu!"));
        assert_eq!(parse_choice(" D ", &choices), Some("Cluster"));
        assert_eq!(parse_choice("faust", &choices), Some("Faust"));
        assert_eq!(parse_choice("E", &choices), None);
    }

    #[test]
    fn test_quit_prints_summary() {
        let conn = db::open_in_memory().unwrap();
        let out = play(&conn, None, "quit\n");
        assert!(out.contains("Welcome to the KFJC Trivia Robot"));
        assert!(out.contains("SESSION SUMMARY"));
        assert!(out.contains("Goodbye!"));
    }

    #[test]
    fn test_end_of_input_ends_the_game() {
        let conn = db::open_in_memory().unwrap();
        let out = play(&conn, None, "list\n");
        assert!(out.contains("Available question codes:"));
        assert!(out.contains("how_many_djs"));
        assert!(out.contains("Goodbye!"));
    }

    #[test]
    fn test_unknown_code() {
        let conn = db::open_in_memory().unwrap();
        let out = play(&conn, None, "who_sang_it_first\nquit\n");
        assert!(out.contains("Unknown command or code"));
    }

    #[test]
    fn test_fresh_question_by_code() {
        let conn = db::seeded();
        let out = play(&conn, None, "how_many_albums\nskip\nscore\nquit\n");
        assert!(out.contains("Question: How many albums are in the KFJC Library?"));
        assert!(out.contains("Skipped!"));
        assert!(out.contains("Questions played: 1"));
    }

    #[test]
    fn test_no_stored_questions() {
        let conn = db::seeded();
        let out = play(&conn, None, "start\nquit\n");
        assert!(out.contains("No stored questions yet"));
    }

    #[test]
    fn test_answers_recorded_for_user() {
        let conn = db::seeded();
        let q = seed(&conn, QuestionKind::AlbumCount);
        let user = users::create_user(&conn, "robot", None, "pw").unwrap();

        // The right answer typed out in full
        let script = format!("start\n{}\nstart\nquit\n", q.acceptable_answers.display_answer);
        let out = play(&conn, Some(user.clone()), &script);

        assert!(out.contains("The KFJC Library holds this many albums: 6"));
        assert!(out.contains("EVERY question"));
        let score = answers::get_user_score(&conn, user.user_id).unwrap();
        assert_eq!(score.passed, 1);
    }
}
