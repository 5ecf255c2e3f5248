//! Single-elimination bracket construction.

use log::{debug, info};
use std::collections::HashSet;
use std::sync::Arc;

use super::{
    errors::{BracketError, BracketResult},
    models::{Match, MatchStatus, NewMatch, Team, TournamentId},
    propagator::ResultPropagator,
    rounds::round_count,
};
use crate::db::MatchRepository;

/// A freshly generated bracket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedBracket {
    /// The final match
    pub root: Match,
    /// Number of rounds, the final is played in this round
    pub rounds: u32,
    /// Matches persisted, bye matches included
    pub match_count: usize,
}

/// Builds and persists the match tree of a tournament.
#[derive(Clone)]
pub struct BracketBuilder {
    matches: Arc<dyn MatchRepository>,
    propagator: ResultPropagator,
}

impl BracketBuilder {
    /// Create a new bracket builder
    ///
    /// `propagator` must share the same repository; it places bye winners into
    /// their successor matches while the bracket is built.
    pub fn new(matches: Arc<dyn MatchRepository>, propagator: ResultPropagator) -> Self {
        Self {
            matches,
            propagator,
        }
    }

    /// Generate the bracket for `tournament_id` from `teams` in seeding order.
    ///
    /// Round 1 pairs the teams by list position; a trailing team without an
    /// opponent gets a bye match that is already played. Each later round
    /// pairs the previous round's matches the same way. A match left without
    /// a partner is carried into the next round's pairing unchanged, so every
    /// match after round 1 has exactly two predecessors.
    ///
    /// Rounds are persisted in order. A storage fault aborts construction and
    /// leaves the rounds written so far in place, along with the generation
    /// claim; the caller decides whether to discard them.
    ///
    /// # Errors
    ///
    /// * `BracketError::InvalidInput` - Fewer than two teams, or a team listed twice
    /// * `BracketError::AlreadyGenerated` - The tournament's generation claim is taken
    pub async fn generate(
        &self,
        tournament_id: TournamentId,
        teams: &[Team],
    ) -> BracketResult<GeneratedBracket> {
        validate_teams(teams)?;
        self.claim(tournament_id).await?;
        self.construct(tournament_id, teams).await
    }

    /// Take the generation claim of `tournament_id`, closing registration
    pub(crate) async fn claim(&self, tournament_id: TournamentId) -> BracketResult<()> {
        if !self.matches.claim_generation(tournament_id).await? {
            return Err(BracketError::AlreadyGenerated(tournament_id));
        }
        debug!("Generation claim taken for tournament {tournament_id}");
        Ok(())
    }

    /// Build the tree for validated `teams`. The claim must already be held.
    pub(crate) async fn construct(
        &self,
        tournament_id: TournamentId,
        teams: &[Team],
    ) -> BracketResult<GeneratedBracket> {
        let rounds = round_count(teams.len())?;
        info!(
            "Generating {}-round bracket for tournament {} with {} teams",
            rounds,
            tournament_id,
            teams.len()
        );

        let mut nodes = Vec::with_capacity(teams.len().div_ceil(2));
        for pair in teams.chunks(2) {
            let new_match = match pair.get(1) {
                Some(second) => NewMatch::seeded(tournament_id, pair[0].id, second.id),
                None => {
                    debug!("Team {} receives a bye", pair[0].id);
                    NewMatch::bye(tournament_id, pair[0].id)
                }
            };
            nodes.push(self.matches.insert_match(&new_match).await?);
        }

        let mut match_count = nodes.len();
        debug!("Round 1: {} matches", nodes.len());

        for round in 2..=rounds {
            let mut next_nodes = Vec::with_capacity(nodes.len().div_ceil(2));
            let mut pending = nodes.into_iter();

            while let Some(left) = pending.next() {
                let Some(right) = pending.next() else {
                    debug!("Match {} carried forward into round {}", left.id, round + 1);
                    next_nodes.push(left);
                    break;
                };

                let parent = self
                    .matches
                    .insert_match(&NewMatch::pending(tournament_id, round))
                    .await?;
                let parent = self.link(left, parent).await?;
                let parent = self.link(right, parent).await?;

                next_nodes.push(parent);
                match_count += 1;
            }

            debug!("Round {}: {} nodes", round, next_nodes.len());
            nodes = next_nodes;
        }

        // ceil(n / 2^rounds) == 1, so exactly one node is left
        let root = nodes.pop().ok_or_else(|| {
            BracketError::Storage(format!(
                "bracket for tournament {tournament_id} ended without a final"
            ))
        })?;
        debug_assert!(nodes.is_empty());

        // Bye propagation may have touched the root after it was pushed
        let root = self
            .matches
            .find_match(root.id)
            .await?
            .ok_or_else(|| BracketError::match_not_found(root.id))?;

        info!(
            "Bracket for tournament {} generated: {} matches, final is match {}",
            tournament_id, match_count, root.id
        );

        Ok(GeneratedBracket {
            root,
            rounds,
            match_count,
        })
    }

    /// Point `child` at `parent` and, if `child` is already decided, move its
    /// winner up. Returns the parent as currently stored.
    async fn link(&self, child: Match, parent: Match) -> BracketResult<Match> {
        let mut linked = child.clone();
        linked.next_match_id = Some(parent.id);

        let child = self
            .matches
            .compare_and_swap(&child, &linked)
            .await?
            .ok_or(BracketError::Conflict {
                match_id: child.id,
                attempts: 1,
            })?;

        if child.status != MatchStatus::Played {
            return Ok(parent);
        }

        let winner = child.winner.ok_or_else(|| {
            BracketError::Storage(format!("match {} is played without a winner", child.id))
        })?;
        self.propagator.place_winner(parent.id, winner).await
    }
}

/// Check `teams` can seed a bracket
pub(crate) fn validate_teams(teams: &[Team]) -> BracketResult<()> {
    if teams.len() < 2 {
        return Err(BracketError::InvalidInput(format!(
            "a bracket needs at least two teams, got {}",
            teams.len()
        )));
    }

    let mut seen = HashSet::with_capacity(teams.len());
    if let Some(duplicate) = teams.iter().find(|t| !seen.insert(t.id)) {
        return Err(BracketError::InvalidInput(format!(
            "team {} is listed more than once",
            duplicate.id
        )));
    }

    Ok(())
}
