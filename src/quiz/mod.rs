//! Round lifecycle controller
//!
//! The quiz is a five-phase state machine (start, loading, quiz, result,
//! summary) driven by three asynchronous activities: a per-round countdown,
//! a background prefetch of future rounds' photos, and an on-demand fetch
//! when the player outruns the prefetcher. A session actor owns the game
//! state and serializes every mutation; the front-end observes snapshots
//! and issues the four player commands.
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use geoquiz::gen::{GenConfig, ImageClient, LocationClient};
//! use geoquiz::quiz::{SessionConfig, SessionHandle};
//!
//! let config = GenConfig { api_key, ..GenConfig::default() };
//! let handle = SessionHandle::spawn(
//!     Arc::new(LocationClient::new(config.clone())?),
//!     Arc::new(ImageClient::new(config)?),
//!     SessionConfig::default(),
//! );
//! handle.start();
//! let mut state = handle.watch();
//! ```

pub(crate) mod prefetch;
pub mod session;
pub mod state;
pub mod types;

pub use session::{SessionConfig, SessionHandle};
pub use state::AdvanceOutcome;
pub use types::{
    Answer, GamePhase, GameState, Location, Round, DEFAULT_ROUND_COUNT, OPTIONS_PER_ROUND,
    ROUND_SECONDS,
};
