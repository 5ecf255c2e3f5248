//! Bracket service tying the engine to its storage collaborators.

use log::{info, warn};
use std::sync::Arc;

use super::{
    builder::{BracketBuilder, GeneratedBracket, validate_teams},
    config::EngineConfig,
    errors::{BracketError, BracketResult},
    models::{Match, MatchId, MatchReport, Team, TournamentId},
    propagator::ResultPropagator,
    view::BracketView,
};
use crate::db::{MatchRepository, TeamRepository};

/// Result of generating one tournament in a batch
#[derive(Debug)]
pub enum GenerationOutcome {
    Generated(GeneratedBracket),
    /// Fewer than two teams registered, nothing was written
    Skipped { teams: usize },
    Failed(BracketError),
}

/// Entry point used by request handlers.
///
/// Cheap to clone; all clones share the same repositories.
#[derive(Clone)]
pub struct BracketService {
    matches: Arc<dyn MatchRepository>,
    teams: Arc<dyn TeamRepository>,
    builder: BracketBuilder,
    propagator: ResultPropagator,
}

impl BracketService {
    /// Create a new bracket service
    pub fn new(
        matches: Arc<dyn MatchRepository>,
        teams: Arc<dyn TeamRepository>,
        config: EngineConfig,
    ) -> Self {
        let propagator = ResultPropagator::new(matches.clone(), config);
        let builder = BracketBuilder::new(matches.clone(), propagator.clone());

        Self {
            matches,
            teams,
            builder,
            propagator,
        }
    }

    /// Enter a team into a tournament.
    ///
    /// Registration closes once generation of the tournament has started, so
    /// every registered team is seeded.
    pub async fn register_team(
        &self,
        tournament_id: TournamentId,
        name: &str,
        college_id: Option<i64>,
    ) -> BracketResult<Team> {
        let name = name.trim();
        if name.is_empty() {
            return Err(BracketError::InvalidInput(
                "team name must not be empty".to_string(),
            ));
        }

        let team = self
            .teams
            .create_team(name, tournament_id, college_id)
            .await?;
        info!(
            "Team {} ({}) registered for tournament {}",
            team.id, team.name, tournament_id
        );
        Ok(team)
    }

    /// Generate the bracket for a tournament from its registered teams.
    ///
    /// Teams are seeded in registration order. The generation claim is taken
    /// before the teams are read, so a concurrent registration is either
    /// seeded or rejected. Invalid team lists give the claim back.
    pub async fn generate(&self, tournament_id: TournamentId) -> BracketResult<GeneratedBracket> {
        self.builder.claim(tournament_id).await?;

        let teams = match self.seeding(tournament_id).await {
            Ok(teams) => teams,
            Err(e) => {
                self.matches.release_generation(tournament_id).await?;
                return Err(e);
            }
        };

        self.builder.construct(tournament_id, &teams).await
    }

    /// Generate the brackets of several tournaments, e.g. one per college
    /// division.
    ///
    /// Tournaments with fewer than two teams are skipped. A failure in one
    /// tournament is reported in its outcome and does not stop the others.
    pub async fn generate_all(
        &self,
        tournament_ids: &[TournamentId],
    ) -> Vec<(TournamentId, GenerationOutcome)> {
        let mut outcomes = Vec::with_capacity(tournament_ids.len());

        for &tournament_id in tournament_ids {
            let outcome = match self.teams.list_teams(tournament_id).await {
                Ok(teams) if teams.len() < 2 => {
                    info!(
                        "Skipping tournament {} with {} teams",
                        tournament_id,
                        teams.len()
                    );
                    GenerationOutcome::Skipped { teams: teams.len() }
                }
                Ok(_) => match self.generate(tournament_id).await {
                    Ok(bracket) => GenerationOutcome::Generated(bracket),
                    Err(e) => GenerationOutcome::Failed(e),
                },
                Err(e) => GenerationOutcome::Failed(e),
            };

            if let GenerationOutcome::Failed(e) = &outcome {
                warn!("Generation failed for tournament {tournament_id}: {e}");
            }
            outcomes.push((tournament_id, outcome));
        }

        outcomes
    }

    async fn seeding(&self, tournament_id: TournamentId) -> BracketResult<Vec<Team>> {
        let teams = self.teams.list_teams(tournament_id).await?;
        validate_teams(&teams)?;
        Ok(teams)
    }

    /// Record a match result and advance the winner
    pub async fn record_result(
        &self,
        match_id: MatchId,
        slot1_score: i32,
        slot2_score: i32,
    ) -> BracketResult<MatchReport> {
        self.propagator
            .record_result(match_id, slot1_score, slot2_score)
            .await
    }

    /// Store a running score without deciding the match
    pub async fn update_scores(
        &self,
        match_id: MatchId,
        slot1_score: i32,
        slot2_score: i32,
    ) -> BracketResult<Match> {
        self.propagator
            .update_scores(match_id, slot1_score, slot2_score)
            .await
    }

    /// Re-run winner placement for an already played match
    pub async fn repropagate(&self, match_id: MatchId) -> BracketResult<Option<Match>> {
        self.propagator.repropagate(match_id).await
    }

    /// Current bracket of a tournament for display
    ///
    /// # Errors
    ///
    /// * `BracketError::NotFound` - No bracket has been generated for the tournament
    pub async fn view(&self, tournament_id: TournamentId) -> BracketResult<BracketView> {
        let matches = self.matches.list_matches(tournament_id).await?;
        if matches.is_empty() {
            return Err(BracketError::NotFound {
                entity: "Bracket",
                id: tournament_id,
            });
        }

        let teams = self.teams.list_teams(tournament_id).await?;
        Ok(BracketView::build(tournament_id, &matches, &teams))
    }

    /// Delete every match of a tournament, e.g. after a failed generation.
    ///
    /// Also gives up the generation claim, reopening registration.
    pub async fn discard(&self, tournament_id: TournamentId) -> BracketResult<u64> {
        let removed = self.matches.delete_by_tournament(tournament_id).await?;
        self.matches.release_generation(tournament_id).await?;

        if removed > 0 {
            warn!("Discarded {removed} matches of tournament {tournament_id}");
        } else {
            info!("No matches to discard for tournament {tournament_id}");
        }
        Ok(removed)
    }

    /// Check the match store is reachable
    pub async fn health_check(&self) -> BracketResult<()> {
        self.matches.ping().await
    }
}
