//! Core data types for the quiz round lifecycle

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Number of answer options shown per round
pub const OPTIONS_PER_ROUND: usize = 4;

/// Countdown length for one round, in seconds
pub const ROUND_SECONDS: u32 = 30;

/// Default number of rounds per game
pub const DEFAULT_ROUND_COUNT: usize = 10;

/// A quiz location produced by the generation service.
///
/// Immutable once created; the wire format matches the JSON schema sent to
/// the text model (camelCase field names).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
    /// The actual place name, revealed on the result screen
    pub name: String,
    /// Four plausible options (countries/cities) shown to the player
    pub options: Vec<String>,
    /// Index into `options` of the right answer
    pub correct_option_index: usize,
    /// Brief atmosphere description, used to prompt the image model
    pub description: String,
}

/// The player's answer for one round
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Answer {
    /// One of the displayed options was picked
    Choice(usize),
    /// The countdown expired before a choice was made. Never matches a
    /// correct option index, so a timeout can never score.
    TimedOut,
}

impl Answer {
    pub fn matches(&self, correct_index: usize) -> bool {
        matches!(self, Answer::Choice(i) if *i == correct_index)
    }
}

/// One quiz question: a location, its image, and the player's eventual answer
#[derive(Clone, Debug)]
pub struct Round {
    pub location: Location,
    /// Set exactly once, by selection or by timeout
    pub answer: Option<Answer>,
    /// Path of the generated photo on disk. Empty until the eager first-round
    /// fetch, the prefetcher, or an on-demand fetch fills it in.
    pub image_path: Option<PathBuf>,
}

impl Round {
    pub fn new(location: Location) -> Self {
        Self {
            location,
            answer: None,
            image_path: None,
        }
    }

    pub fn has_image(&self) -> bool {
        self.image_path.is_some()
    }

    pub fn is_correct(&self) -> bool {
        self.answer
            .map_or(false, |a| a.matches(self.location.correct_option_index))
    }
}

/// Stage of the game lifecycle state machine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GamePhase {
    Start,
    LoadingRound,
    Quiz,
    Result,
    Summary,
}

/// The single source of truth for one game session.
///
/// Owned by the session actor and replaced wholesale at game start; every
/// later change goes through one of the transitions in [`super::state`].
#[derive(Clone, Debug)]
pub struct GameState {
    pub current_round_index: usize,
    pub rounds: Vec<Round>,
    pub phase: GamePhase,
    pub score: u32,
    pub time_left: u32,
    /// Status line shown while loading; doubles as the error message when
    /// the initial load fails.
    pub status_message: String,
    /// Set when the initial location/image generation failed. The only way
    /// out is restarting the game.
    pub load_failed: bool,
}

impl GameState {
    pub fn new() -> Self {
        Self {
            current_round_index: 0,
            rounds: Vec::new(),
            phase: GamePhase::Start,
            score: 0,
            time_left: ROUND_SECONDS,
            status_message: String::new(),
            load_failed: false,
        }
    }

    pub fn round_count(&self) -> usize {
        self.rounds.len()
    }

    pub fn current_round(&self) -> Option<&Round> {
        self.rounds.get(self.current_round_index)
    }

    pub fn is_last_round(&self) -> bool {
        !self.rounds.is_empty() && self.current_round_index + 1 >= self.rounds.len()
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::Location;

    /// A well-formed location for tests
    pub(crate) fn location(name: &str, correct: usize) -> Location {
        Location {
            lat: 48.8584,
            lng: 2.2945,
            name: name.to_string(),
            options: vec![
                "France".to_string(),
                "Italy".to_string(),
                "Spain".to_string(),
                "Portugal".to_string(),
            ],
            correct_option_index: correct,
            description: "wide boulevards under a pale morning sky".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::location as test_location;
    use super::*;

    #[test]
    fn timed_out_never_matches_any_option() {
        for correct in 0..OPTIONS_PER_ROUND {
            assert!(!Answer::TimedOut.matches(correct));
        }
    }

    #[test]
    fn choice_matches_only_its_own_index() {
        assert!(Answer::Choice(2).matches(2));
        assert!(!Answer::Choice(2).matches(1));
    }

    #[test]
    fn round_scoring_follows_answer() {
        let mut round = Round::new(test_location("Paris", 0));
        assert!(!round.is_correct());

        round.answer = Some(Answer::Choice(0));
        assert!(round.is_correct());

        round.answer = Some(Answer::TimedOut);
        assert!(!round.is_correct());
    }

    #[test]
    fn location_json_round_trip_uses_camel_case() {
        let json = r#"{
            "lat": 35.0116,
            "lng": 135.7681,
            "name": "Kyoto",
            "options": ["China", "Japan", "South Korea", "Vietnam"],
            "correctOptionIndex": 1,
            "description": "wooden townhouses along a narrow stone lane"
        }"#;
        let loc: Location = serde_json::from_str(json).unwrap();
        assert_eq!(loc.name, "Kyoto");
        assert_eq!(loc.correct_option_index, 1);
        assert_eq!(loc.options.len(), OPTIONS_PER_ROUND);

        let back = serde_json::to_value(&loc).unwrap();
        assert!(back.get("correctOptionIndex").is_some());
    }
}
