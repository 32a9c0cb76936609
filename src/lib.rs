//! GeoQuiz library
//!
//! Re-exports modules for use by the terminal front-end and tools.

pub mod ascii;
pub mod gen;
pub mod maplink;
pub mod quiz;
pub mod tui;
