//! Terminal result codes and their user-facing message catalogs.
//!
//! The backend reports game verdicts as a closed set of snake_case
//! codes. The set is modelled as an enum so that an out-of-set code
//! fails deserialization at the protocol boundary instead of panicking
//! deep inside a reply path, and so the catalogs below stay total under
//! exhaustive matching.

use serde::{Deserialize, Serialize};

/// A terminal (or check) verdict reported by the backend.
///
/// Absence of a code (`end_type` missing or `null`) means the game
/// continues; it is represented as `Option::<EndType>::None` by payload
/// types, never as a variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndType {
    /// Terminate with no output at all (reply target already gone).
    Silent,
    /// The player ran out of time.
    Timeout,
    /// The word was already used this game.
    Repeat,
    /// The answer was not kana-only Japanese.
    BadWord,
    /// The answer did not chain from the previous word.
    BadContinuation,
    /// The word is not a common noun.
    NotNoun,
    /// The word ends with ん or ン.
    NEnding,
    /// The backend ran out of words.
    WinNoMoreWords,
}

/// The game-over message for a verdict, or `None` when output must be
/// suppressed. The caller appends the score.
#[must_use]
pub fn end_message(end: EndType) -> Option<&'static str> {
    match end {
        EndType::Silent => None,
        EndType::Timeout => Some("Time's up!"),
        EndType::Repeat => Some("You repeated that word!"),
        EndType::BadWord => Some("That did not seem like proper Japanese with kana only."),
        EndType::BadContinuation => Some(
            "The first syllable of that word did not match \
             the last syllable of the previous word.",
        ),
        EndType::NotNoun => Some("That is not a common noun!"),
        EndType::NEnding => Some("Words that end with ん or ン end the game."),
        EndType::WinNoMoreWords => Some("Miraculously, you have beaten the CPU player!"),
    }
}

/// The message for a standalone `shiritori check` verdict. No verdict
/// means the word passed. Verdicts that only occur mid-game fall back
/// to their game text.
#[must_use]
pub fn check_message(end: Option<EndType>) -> Option<&'static str> {
    match end {
        None => Some("Looks good!"),
        Some(EndType::NotNoun) => Some("That is not a common noun."),
        Some(other) => end_message(other),
    }
}
