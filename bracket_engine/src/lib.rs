//! # Bracket Engine
//!
//! Single-elimination tournament brackets stored as a tree of matches.
//!
//! A bracket is generated once from the list of teams entered in a tournament
//! and then advanced one reported result at a time. Each match only stores the
//! ID of the match its winner moves into, so the whole tree lives in storage
//! and the engine itself is stateless between calls.
//!
//! ## Match lifecycle
//!
//! - **Unstarted**: waiting for one or both teams to advance into the match
//! - **InProgress**: both teams known, waiting for a result
//! - **Played**: result recorded (or bye), winner moved to the next match
//!
//! ## Core Modules
//!
//! - [`bracket`]: Round calculation, construction, result propagation, read view
//! - [`db`]: Storage traits with PostgreSQL and in-memory implementations
//!
//! ## Example
//!
//! ```
//! use bracket_engine::round_count;
//!
//! // Six teams need three rounds
//! assert_eq!(round_count(6).unwrap(), 3);
//! ```

/// Bracket construction, result propagation and rendering.
pub mod bracket;
pub use bracket::{
    BracketError, BracketResult, BracketService, EngineConfig, Match, MatchReport, MatchStatus,
    round_count,
};

/// Storage collaborators.
pub mod db;
