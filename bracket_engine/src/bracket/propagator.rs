//! Match result recording and winner propagation.

use log::{debug, info, warn};
use std::sync::Arc;

use super::{
    config::EngineConfig,
    errors::{BracketError, BracketResult},
    models::{Match, MatchId, MatchReport, MatchStatus, TeamId},
};
use crate::db::MatchRepository;

/// Records results and advances winners into their successor matches.
///
/// Holds no bracket state of its own. Every call loads the matches it needs,
/// mutates them and writes them back through
/// [`MatchRepository::compare_and_swap`], so any number of propagators may run
/// against the same bracket concurrently.
#[derive(Clone)]
pub struct ResultPropagator {
    matches: Arc<dyn MatchRepository>,
    config: EngineConfig,
}

impl ResultPropagator {
    /// Create a new result propagator
    pub fn new(matches: Arc<dyn MatchRepository>, config: EngineConfig) -> Self {
        Self { matches, config }
    }

    /// Record the final score of an in-progress match.
    ///
    /// The higher score wins. The match becomes `Played` and the winner is
    /// placed into the successor match, if there is one. Recording the final
    /// reports the champion.
    ///
    /// Checks run in this order: the match exists, it is `InProgress`, the
    /// scores decide a winner.
    ///
    /// # Errors
    ///
    /// * `BracketError::NotFound` - No match with `match_id`
    /// * `BracketError::InvalidState` - Match is not `InProgress`
    /// * `BracketError::InvalidInput` - Tied or negative scores
    /// * `BracketError::Conflict` - A score update for the match landed first, or
    ///   the successor stayed contended for the whole retry budget
    pub async fn record_result(
        &self,
        match_id: MatchId,
        slot1_score: i32,
        slot2_score: i32,
    ) -> BracketResult<MatchReport> {
        let current = self.load_in_progress(match_id).await?;

        check_scores(slot1_score, slot2_score)?;
        if slot1_score == slot2_score {
            return Err(BracketError::InvalidInput(format!(
                "tied score {slot1_score}-{slot2_score}, a match needs a winner"
            )));
        }

        let winning_slot = if slot1_score > slot2_score {
            current.slot1
        } else {
            current.slot2
        };
        let winner = winning_slot.team_id.ok_or_else(|| {
            BracketError::Storage(format!("match {match_id} is in progress with an empty slot"))
        })?;

        let mut updated = current.clone();
        updated.slot1.score = slot1_score;
        updated.slot2.score = slot2_score;
        updated.winner = Some(winner);
        updated.status = MatchStatus::Played;

        let Some(played) = self.matches.compare_and_swap(&current, &updated).await? else {
            return Err(self.lost_in_progress_race(match_id).await);
        };

        info!(
            "Match {} (round {}) played {}-{}, team {} wins",
            played.id, played.round, slot1_score, slot2_score, winner
        );

        let next_match = match played.next_match_id {
            Some(next_id) => Some(self.place_winner(next_id, winner).await?),
            None => None,
        };

        let champion = if played.is_final() {
            info!(
                "Tournament {} complete, champion is team {}",
                played.tournament_id, winner
            );
            Some(winner)
        } else {
            None
        };

        Ok(MatchReport {
            played,
            next_match,
            champion,
        })
    }

    /// Store a running score for an in-progress match.
    ///
    /// The match stays `InProgress` with no winner, so ties are allowed. A
    /// later [`record_result`](Self::record_result) overwrites the scores.
    ///
    /// # Errors
    ///
    /// * `BracketError::NotFound` - No match with `match_id`
    /// * `BracketError::InvalidState` - Match is not `InProgress`
    /// * `BracketError::InvalidInput` - Negative scores
    /// * `BracketError::Conflict` - Another score update landed first
    pub async fn update_scores(
        &self,
        match_id: MatchId,
        slot1_score: i32,
        slot2_score: i32,
    ) -> BracketResult<Match> {
        let current = self.load_in_progress(match_id).await?;
        check_scores(slot1_score, slot2_score)?;

        let mut updated = current.clone();
        updated.slot1.score = slot1_score;
        updated.slot2.score = slot2_score;

        let Some(stored) = self.matches.compare_and_swap(&current, &updated).await? else {
            return Err(self.lost_in_progress_race(match_id).await);
        };

        debug!("Match {match_id} score now {slot1_score}-{slot2_score}");
        Ok(stored)
    }

    /// Place the winner of an already played match into its successor again.
    ///
    /// Repairs a bracket where a storage fault interrupted `record_result`
    /// after the match was marked played. Does nothing if the winner is
    /// already in place. Returns the successor, or `None` for the final.
    pub async fn repropagate(&self, match_id: MatchId) -> BracketResult<Option<Match>> {
        let played = self.load(match_id).await?;
        if played.status != MatchStatus::Played {
            return Err(BracketError::InvalidState {
                match_id,
                expected: MatchStatus::Played,
                actual: played.status,
            });
        }

        let winner = played.winner.ok_or_else(|| {
            BracketError::Storage(format!("match {match_id} is played without a winner"))
        })?;

        match played.next_match_id {
            Some(next_id) => Ok(Some(self.place_winner(next_id, winner).await?)),
            None => Ok(None),
        }
    }

    /// Put `winner` into the first open slot of `successor_id`.
    ///
    /// Retries on lost conditional updates, re-reading the successor each
    /// time so the winner lands in whichever slot is still open.
    pub(crate) async fn place_winner(
        &self,
        successor_id: MatchId,
        winner: TeamId,
    ) -> BracketResult<Match> {
        let attempts = self.config.max_cas_retries.max(1);

        for attempt in 1..=attempts {
            let current = self.load(successor_id).await?;

            if current.contains_team(winner) {
                debug!("Team {winner} already placed in match {successor_id}");
                return Ok(current);
            }

            if current.status != MatchStatus::Unstarted {
                return Err(BracketError::InvalidState {
                    match_id: successor_id,
                    expected: MatchStatus::Unstarted,
                    actual: current.status,
                });
            }

            let mut updated = current.clone();
            if !updated.assign_team(winner) {
                return Err(BracketError::Storage(format!(
                    "match {successor_id} is unstarted but has no open slot"
                )));
            }

            if let Some(stored) = self.matches.compare_and_swap(&current, &updated).await? {
                if stored.status == MatchStatus::InProgress {
                    info!(
                        "Match {} (round {}) ready: team {} vs team {}",
                        stored.id,
                        stored.round,
                        stored.slot1.team_id.unwrap_or_default(),
                        stored.slot2.team_id.unwrap_or_default()
                    );
                } else {
                    debug!("Team {winner} advanced into match {successor_id}");
                }
                return Ok(stored);
            }

            warn!(
                "Lost update race on match {successor_id} placing team {winner} (attempt {attempt}/{attempts})"
            );
        }

        Err(BracketError::Conflict {
            match_id: successor_id,
            attempts,
        })
    }

    async fn load_in_progress(&self, match_id: MatchId) -> BracketResult<Match> {
        let current = self.load(match_id).await?;
        if current.status != MatchStatus::InProgress {
            return Err(BracketError::InvalidState {
                match_id,
                expected: MatchStatus::InProgress,
                actual: current.status,
            });
        }
        Ok(current)
    }

    /// Error for a lost conditional update on an in-progress match.
    ///
    /// Only results and score updates for the same match can change it, so
    /// report what that writer left behind.
    async fn lost_in_progress_race(&self, match_id: MatchId) -> BracketError {
        let latest = match self.load(match_id).await {
            Ok(latest) => latest,
            Err(e) => return e,
        };
        match latest.status {
            MatchStatus::InProgress => BracketError::Conflict {
                match_id,
                attempts: 1,
            },
            actual => BracketError::InvalidState {
                match_id,
                expected: MatchStatus::InProgress,
                actual,
            },
        }
    }

    async fn load(&self, match_id: MatchId) -> BracketResult<Match> {
        self.matches
            .find_match(match_id)
            .await?
            .ok_or_else(|| BracketError::match_not_found(match_id))
    }
}

fn check_scores(slot1_score: i32, slot2_score: i32) -> BracketResult<()> {
    if slot1_score < 0 || slot2_score < 0 {
        return Err(BracketError::InvalidInput(format!(
            "scores must not be negative, got {slot1_score}-{slot2_score}"
        )));
    }
    Ok(())
}
