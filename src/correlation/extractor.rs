//! Subject parsing for DOWN/UP alert correlation.
//!
//! Monitoring systems open tickets with subjects such as
//! `H/R/AP-35 (10.0.2.155) [10.0.2.155] : STATE - Down`. The text before the
//! first colon identifies the monitored node and is used as the correlation
//! key; the remainder carries the state.

use crate::models::AlertState;
use once_cell::sync::Lazy;
use regex::Regex;

// ASCII word boundaries: a non-ASCII letter beside DOWN/UP still separates the word
static STATE_DOWN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)STATE\s*[-:]?\s*DOWN").expect("valid STATE DOWN pattern"));
static WORD_DOWN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?-u:\b)DOWN(?-u:\b)").expect("valid DOWN pattern"));
static STATE_UP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)STATE\s*[-:]?\s*UP").expect("valid STATE UP pattern"));
static WORD_UP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?-u:\b)UP(?-u:\b)").expect("valid UP pattern"));

/// Derive the correlation key from a ticket subject
///
/// Everything before the first colon, trimmed; the whole trimmed subject when
/// there is no colon. `None` when the subject is absent or yields an empty key.
pub fn extract_correlation_key(subject: Option<&str>) -> Option<String> {
    let subject = subject?;
    let head = match subject.find(':') {
        Some(idx) => &subject[..idx],
        None => subject,
    };

    let key = head.trim();
    if key.is_empty() {
        None
    } else {
        Some(key.to_string())
    }
}

pub fn is_down_state(subject: &str) -> bool {
    STATE_DOWN.is_match(subject) || WORD_DOWN.is_match(subject)
}

pub fn is_up_state(subject: &str) -> bool {
    STATE_UP.is_match(subject) || WORD_UP.is_match(subject)
}

/// Classify a subject; DOWN wins when both predicates match
pub fn classify(subject: &str) -> AlertState {
    if is_down_state(subject) {
        AlertState::Down
    } else if is_up_state(subject) {
        AlertState::Up
    } else {
        AlertState::Neither
    }
}
