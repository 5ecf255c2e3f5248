//! Single-elimination bracket engine.
//!
//! This module provides:
//! - Round calculation for any team count
//! - Bracket construction with byes and carry-forward pairing
//! - Result recording with winner propagation under optimistic concurrency
//! - Interim scores and batch generation across tournaments
//! - A read-side view for rendering the bracket
//!
//! ## Example
//!
//! ```no_run
//! use bracket_engine::bracket::{BracketService, EngineConfig};
//! use bracket_engine::db::{Database, PgMatchRepository, PgTeamRepository};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(&Default::default()).await?;
//!     let service = BracketService::new(
//!         Arc::new(PgMatchRepository::new(db.pool().clone())),
//!         Arc::new(PgTeamRepository::new(db.pool().clone())),
//!         EngineConfig::from_env(),
//!     );
//!
//!     let bracket = service.generate(1).await?;
//!     println!("Final is match {}", bracket.root.id);
//!
//!     let report = service.record_result(bracket.root.id, 3, 1).await?;
//!     println!("Champion: {:?}", report.champion);
//!
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod config;
pub mod errors;
pub mod models;
pub mod propagator;
pub mod rounds;
pub mod service;
pub mod view;

pub use builder::{BracketBuilder, GeneratedBracket};
pub use config::EngineConfig;
pub use errors::{BracketError, BracketResult, ErrorKind};
pub use models::{
    Match, MatchId, MatchReport, MatchStatus, NewMatch, Slot, Team, TeamId, TournamentId,
};
pub use propagator::ResultPropagator;
pub use rounds::round_count;
pub use service::{BracketService, GenerationOutcome};
pub use view::{BracketView, MatchSummary, Participant, RoundView};
