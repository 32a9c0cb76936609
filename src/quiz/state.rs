//! Phase transitions over [`GameState`].
//!
//! Every mutation of the game state lives here as a plain function. The
//! session actor is the only caller and processes one command at a time, so
//! transitions never race; keeping them pure makes the state machine easy to
//! test without a runtime.

use std::path::PathBuf;

use super::types::{Answer, GamePhase, GameState, Round, ROUND_SECONDS};

/// What the advance command resolved to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// The next round's image was already prefetched; the quiz restarted
    /// immediately with a fresh countdown.
    EnteredQuiz,
    /// The next round has no image yet; the state moved to `LoadingRound`
    /// and the caller must fetch the image for this round index.
    NeedsFetch(usize),
    /// Advance was requested from the final round; the game is over.
    Finished,
    /// Advance is not valid in the current phase.
    Ignored,
}

/// Enter `LoadingRound` with a status line. Valid from any phase; used for
/// the initial load and for on-demand next-round fetches.
pub fn begin_loading(state: &mut GameState, message: impl Into<String>) {
    state.phase = GamePhase::LoadingRound;
    state.status_message = message.into();
    state.load_failed = false;
}

/// Record a failed initial load. The phase stays `LoadingRound` and the
/// message becomes user-visible; there is no automatic retry on this path.
pub fn fail_loading(state: &mut GameState, message: impl Into<String>) {
    state.phase = GamePhase::LoadingRound;
    state.status_message = message.into();
    state.load_failed = true;
}

/// Replace the state wholesale with a fresh game over `rounds` and enter the
/// quiz on round 0 with a full countdown.
pub fn begin_game(state: &mut GameState, rounds: Vec<Round>) {
    *state = GameState {
        current_round_index: 0,
        rounds,
        phase: GamePhase::Quiz,
        score: 0,
        time_left: ROUND_SECONDS,
        status_message: String::new(),
        load_failed: false,
    };
}

/// Record the player's answer (or a synthesized timeout) for the current
/// round and move to `Result`.
///
/// This is the single path from `Quiz` to `Result` for both input sources.
/// Returns false without touching the state when the phase is not `Quiz` or
/// the round was already answered, so double selection can never award
/// double credit.
pub fn apply_answer(state: &mut GameState, answer: Answer) -> bool {
    if state.phase != GamePhase::Quiz {
        return false;
    }
    let index = state.current_round_index;
    let Some(round) = state.rounds.get_mut(index) else {
        return false;
    };
    if round.answer.is_some() {
        return false;
    }
    round.answer = Some(answer);
    if answer.matches(round.location.correct_option_index) {
        state.score += 1;
    }
    state.phase = GamePhase::Result;
    true
}

/// Apply one countdown tick. Returns true when the countdown just reached
/// zero, at which point the caller feeds [`Answer::TimedOut`] through
/// [`apply_answer`].
pub fn apply_tick(state: &mut GameState) -> bool {
    if state.phase != GamePhase::Quiz || state.time_left == 0 {
        return false;
    }
    state.time_left -= 1;
    state.time_left == 0
}

/// Write a generated image into a round's slot.
///
/// Applied regardless of the current phase: a prefetch result may arrive for
/// a round the player already passed, and the write must still land in that
/// round's slot without disturbing anything else. The slot is filled at most
/// once; later writes for the same round are dropped.
pub fn set_round_image(state: &mut GameState, index: usize, path: PathBuf) {
    if let Some(round) = state.rounds.get_mut(index) {
        if round.image_path.is_none() {
            round.image_path = Some(path);
        }
    }
}

/// Resolve the advance command from the result screen.
pub fn apply_advance(state: &mut GameState) -> AdvanceOutcome {
    if state.phase != GamePhase::Result {
        return AdvanceOutcome::Ignored;
    }
    let next = state.current_round_index + 1;
    if next >= state.rounds.len() {
        state.phase = GamePhase::Summary;
        return AdvanceOutcome::Finished;
    }
    if state.rounds[next].has_image() {
        enter_quiz_at(state, next);
        AdvanceOutcome::EnteredQuiz
    } else {
        let message = format!("Developing the photo ({}/{})...", next + 1, state.rounds.len());
        begin_loading(state, message);
        AdvanceOutcome::NeedsFetch(next)
    }
}

/// Enter the quiz on `index` with a fresh countdown. Used directly after an
/// on-demand fetch completes, and by [`apply_advance`] when the image was
/// already prefetched.
pub fn enter_quiz_at(state: &mut GameState, index: usize) {
    state.current_round_index = index;
    state.phase = GamePhase::Quiz;
    state.time_left = ROUND_SECONDS;
    state.status_message.clear();
}

/// Full session reset back to the start screen.
pub fn reset(state: &mut GameState) {
    *state = GameState::new();
}
