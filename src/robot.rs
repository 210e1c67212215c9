//! The robot's lines and pictures
use rand::seq::SliceRandom;
use rand::Rng;

pub const PRAISE: [&str; 11] = [
    "Aw, yeah!",
    "Oh, yeah!",
    "Sch-weet!",
    "Cool!",
    "Yay!",
    "Right!",
    "Correct!",
    "You're right!",
    "You are Correct!",
    "Awesome!",
    "You're a wiz!",
];

pub const CONSOLATION: [&str; 7] = [
    "Shucks",
    "Bad luck.",
    "Too bad.",
    "Better luck next time!",
    "Awwww...",
    "Oh no!",
    "Sorry, wrong...",
];

pub const INFORMATION: [&str; 3] = ["Here's what I found:", "I found these:", "Here's your answer:"];

pub const ROBOT_MESSAGES: [&str; 3] = [
    "Robot loves you!",
    "Pretty good, meatbag!",
    "Well done, bag of mostly water!",
];

pub const ROBOT_IMAGES: u32 = 12;

pub fn pick<R: Rng + ?Sized>(messages: &[&'static str], rng: &mut R) -> &'static str {
    messages.choose(rng).copied().unwrap_or_default()
}

/// Praise or consolation
pub fn reaction<R: Rng + ?Sized>(correct: bool, rng: &mut R) -> &'static str {
    if correct {
        pick(&PRAISE, rng)
    } else {
        pick(&CONSOLATION, rng)
    }
}

pub fn robot_image<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("static/img/robot{}.png", rng.gen_range(1..=ROBOT_IMAGES))
}
