//! In-process storage backend.
//!
//! Keeps matches and teams in hash maps behind async locks. Conditional
//! updates check and write under a single write guard, giving the same
//! atomicity as the `UPDATE ... WHERE version = $n` statement of the
//! PostgreSQL backend. Generation claims and team registration share one
//! mutex so a team is either visible to the generator or rejected. Used by
//! the test suites and the server's `--in-memory` mode.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use super::repository::{MatchRepository, TeamRepository};
use crate::bracket::{
    BracketError, BracketResult, Match, MatchId, NewMatch, Team, TeamId, TournamentId,
};

#[derive(Default)]
struct Counters {
    next_match_id: MatchId,
    next_team_id: TeamId,
    /// Writes left before injected faults start, `None` when disabled
    writes_before_fault: Option<usize>,
}

/// Shared in-memory store implementing both repositories
#[derive(Clone, Default)]
pub struct InMemoryStore {
    matches: Arc<RwLock<HashMap<MatchId, Match>>>,
    teams: Arc<RwLock<HashMap<TeamId, Team>>>,
    /// Tournaments whose generation claim is held
    claims: Arc<Mutex<HashSet<TournamentId>>>,
    counters: Arc<Mutex<Counters>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Let `writes` more writes succeed, then fail every write with a storage
    /// error until [`clear_fault`](Self::clear_fault) is called.
    pub async fn fail_after_writes(&self, writes: usize) {
        self.counters.lock().await.writes_before_fault = Some(writes);
    }

    pub async fn clear_fault(&self) {
        self.counters.lock().await.writes_before_fault = None;
    }

    /// Number of stored matches across all tournaments
    pub async fn match_count(&self) -> usize {
        self.matches.read().await.len()
    }

    async fn check_write(&self) -> BracketResult<()> {
        let mut counters = self.counters.lock().await;
        match counters.writes_before_fault.as_mut() {
            Some(0) => Err(BracketError::Storage("injected write fault".to_string())),
            Some(remaining) => {
                *remaining -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl MatchRepository for InMemoryStore {
    async fn insert_match(&self, new_match: &NewMatch) -> BracketResult<Match> {
        self.check_write().await?;

        let id = {
            let mut counters = self.counters.lock().await;
            counters.next_match_id += 1;
            counters.next_match_id
        };

        let stored = Match {
            id,
            round: new_match.round,
            tournament_id: new_match.tournament_id,
            status: new_match.status,
            slot1: new_match.slot1,
            slot2: new_match.slot2,
            winner: new_match.winner,
            next_match_id: new_match.next_match_id,
            version: 0,
            updated_at: Utc::now(),
        };

        self.matches.write().await.insert(id, stored.clone());
        Ok(stored)
    }

    async fn find_match(&self, match_id: MatchId) -> BracketResult<Option<Match>> {
        Ok(self.matches.read().await.get(&match_id).cloned())
    }

    async fn list_matches(&self, tournament_id: TournamentId) -> BracketResult<Vec<Match>> {
        let mut matches: Vec<Match> = self
            .matches
            .read()
            .await
            .values()
            .filter(|m| m.tournament_id == tournament_id)
            .cloned()
            .collect();
        matches.sort_by_key(|m| (m.round, m.id));
        Ok(matches)
    }

    async fn claim_generation(&self, tournament_id: TournamentId) -> BracketResult<bool> {
        Ok(self.claims.lock().await.insert(tournament_id))
    }

    async fn release_generation(&self, tournament_id: TournamentId) -> BracketResult<()> {
        self.claims.lock().await.remove(&tournament_id);
        Ok(())
    }

    async fn compare_and_swap(
        &self,
        current: &Match,
        updated: &Match,
    ) -> BracketResult<Option<Match>> {
        self.check_write().await?;

        let mut matches = self.matches.write().await;
        let Some(stored) = matches.get_mut(&current.id) else {
            return Ok(None);
        };

        if stored.version != current.version || stored.status != current.status {
            return Ok(None);
        }

        *stored = Match {
            id: current.id,
            tournament_id: stored.tournament_id,
            version: stored.version + 1,
            updated_at: Utc::now(),
            ..updated.clone()
        };

        Ok(Some(stored.clone()))
    }

    async fn delete_by_tournament(&self, tournament_id: TournamentId) -> BracketResult<u64> {
        let mut matches = self.matches.write().await;
        let before = matches.len();
        matches.retain(|_, m| m.tournament_id != tournament_id);
        Ok((before - matches.len()) as u64)
    }

    async fn ping(&self) -> BracketResult<()> {
        Ok(())
    }
}

#[async_trait]
impl TeamRepository for InMemoryStore {
    async fn create_team(
        &self,
        name: &str,
        tournament_id: TournamentId,
        college_id: Option<i64>,
    ) -> BracketResult<Team> {
        // Held until the team is stored so a claim cannot slip in between
        let claims = self.claims.lock().await;
        if claims.contains(&tournament_id) {
            return Err(BracketError::AlreadyGenerated(tournament_id));
        }

        let id = {
            let mut counters = self.counters.lock().await;
            counters.next_team_id += 1;
            counters.next_team_id
        };

        let team = Team {
            id,
            name: name.to_string(),
            tournament_id,
            college_id,
        };
        self.teams.write().await.insert(id, team.clone());
        drop(claims);
        Ok(team)
    }

    async fn list_teams(&self, tournament_id: TournamentId) -> BracketResult<Vec<Team>> {
        let mut teams: Vec<Team> = self
            .teams
            .read()
            .await
            .values()
            .filter(|t| t.tournament_id == tournament_id)
            .cloned()
            .collect();
        teams.sort_by_key(|t| t.id);
        Ok(teams)
    }
}
