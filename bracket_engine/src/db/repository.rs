//! Repository trait definitions for testability and dependency injection.
//!
//! The bracket engine never talks to a database directly. It is handed a
//! [`MatchRepository`] (and the server a [`TeamRepository`]) and performs every
//! mutation after insertion through [`MatchRepository::compare_and_swap`].
//!
//! Generation is guarded by a per-tournament claim rather than by looking for
//! existing matches: [`MatchRepository::claim_generation`] succeeds for exactly
//! one caller, and [`TeamRepository::create_team`] refuses new teams once the
//! claim is taken. Both backends serialize the claim against registration, so
//! a team is either visible to the generator or rejected.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};

use crate::bracket::{
    BracketError, BracketResult, Match, MatchId, MatchStatus, NewMatch, Slot, Team,
    TournamentId,
};

/// Trait for bracket match storage
#[async_trait]
pub trait MatchRepository: Send + Sync {
    /// Persist a new match and return it with its assigned ID
    async fn insert_match(&self, new_match: &NewMatch) -> BracketResult<Match>;

    /// Find match by ID
    async fn find_match(&self, match_id: MatchId) -> BracketResult<Option<Match>>;

    /// All matches of a tournament, ordered by round then ID
    async fn list_matches(&self, tournament_id: TournamentId) -> BracketResult<Vec<Match>>;

    /// Take the tournament's generation claim.
    ///
    /// Returns `false` if the claim is already held. Registration for the
    /// tournament is closed from the moment this returns `true`.
    async fn claim_generation(&self, tournament_id: TournamentId) -> BracketResult<bool>;

    /// Give the generation claim back, reopening registration
    async fn release_generation(&self, tournament_id: TournamentId) -> BracketResult<()>;

    /// Conditionally replace a match.
    ///
    /// The write applies only if the stored row still has `current.version`
    /// and `current.status`. On success the stored match is returned with its
    /// version bumped; `None` means another writer got there first.
    async fn compare_and_swap(
        &self,
        current: &Match,
        updated: &Match,
    ) -> BracketResult<Option<Match>>;

    /// Delete all matches of a tournament, returning how many were removed
    async fn delete_by_tournament(&self, tournament_id: TournamentId) -> BracketResult<u64>;

    /// Check the backing store is reachable
    async fn ping(&self) -> BracketResult<()>;
}

/// Trait for team storage
#[async_trait]
pub trait TeamRepository: Send + Sync {
    /// Create a new team
    ///
    /// Fails with `BracketError::AlreadyGenerated` once the tournament's
    /// generation claim is held.
    async fn create_team(
        &self,
        name: &str,
        tournament_id: TournamentId,
        college_id: Option<i64>,
    ) -> BracketResult<Team>;

    /// Teams entered in a tournament, in registration (ID) order
    async fn list_teams(&self, tournament_id: TournamentId) -> BracketResult<Vec<Team>>;
}

/// Serialize claim and registration for one tournament until the
/// transaction ends
async fn lock_tournament(
    tx: &mut Transaction<'_, Postgres>,
    tournament_id: TournamentId,
) -> BracketResult<()> {
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(tournament_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

const MATCH_COLUMNS: &str = "id, round, tournament_id, status, slot1_team_id, slot1_score, \
     slot2_team_id, slot2_score, winner_id, next_match_id, version, updated_at";

fn match_from_row(row: &PgRow) -> BracketResult<Match> {
    let status: String = row.get("status");
    let status = status.parse::<MatchStatus>().map_err(BracketError::Storage)?;
    let round: i32 = row.get("round");

    Ok(Match {
        id: row.get("id"),
        round: u32::try_from(round)
            .map_err(|_| BracketError::Storage(format!("negative round {round}")))?,
        tournament_id: row.get("tournament_id"),
        status,
        slot1: Slot {
            team_id: row.get("slot1_team_id"),
            score: row.get("slot1_score"),
        },
        slot2: Slot {
            team_id: row.get("slot2_team_id"),
            score: row.get("slot2_score"),
        },
        winner: row.get("winner_id"),
        next_match_id: row.get("next_match_id"),
        version: row.get("version"),
        updated_at: row.get::<chrono::NaiveDateTime, _>("updated_at").and_utc(),
    })
}

/// Default PostgreSQL implementation of `MatchRepository`
#[derive(Clone)]
pub struct PgMatchRepository {
    pool: PgPool,
}

impl PgMatchRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MatchRepository for PgMatchRepository {
    async fn insert_match(&self, new_match: &NewMatch) -> BracketResult<Match> {
        let row = sqlx::query(&format!(
            "INSERT INTO matches (round, tournament_id, status, slot1_team_id, slot1_score,
                                  slot2_team_id, slot2_score, winner_id, next_match_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {MATCH_COLUMNS}"
        ))
        .bind(new_match.round as i32)
        .bind(new_match.tournament_id)
        .bind(new_match.status.as_str())
        .bind(new_match.slot1.team_id)
        .bind(new_match.slot1.score)
        .bind(new_match.slot2.team_id)
        .bind(new_match.slot2.score)
        .bind(new_match.winner)
        .bind(new_match.next_match_id)
        .fetch_one(&self.pool)
        .await?;

        match_from_row(&row)
    }

    async fn find_match(&self, match_id: MatchId) -> BracketResult<Option<Match>> {
        let row = sqlx::query(&format!("SELECT {MATCH_COLUMNS} FROM matches WHERE id = $1"))
            .bind(match_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(match_from_row).transpose()
    }

    async fn list_matches(&self, tournament_id: TournamentId) -> BracketResult<Vec<Match>> {
        let rows = sqlx::query(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches WHERE tournament_id = $1 ORDER BY round, id"
        ))
        .bind(tournament_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(match_from_row).collect()
    }

    async fn claim_generation(&self, tournament_id: TournamentId) -> BracketResult<bool> {
        let mut tx = self.pool.begin().await?;
        lock_tournament(&mut tx, tournament_id).await?;

        let claimed = sqlx::query(
            "INSERT INTO bracket_generations (tournament_id) VALUES ($1)
             ON CONFLICT (tournament_id) DO NOTHING
             RETURNING tournament_id",
        )
        .bind(tournament_id)
        .fetch_optional(&mut *tx)
        .await?
        .is_some();

        tx.commit().await?;
        Ok(claimed)
    }

    async fn release_generation(&self, tournament_id: TournamentId) -> BracketResult<()> {
        sqlx::query("DELETE FROM bracket_generations WHERE tournament_id = $1")
            .bind(tournament_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn compare_and_swap(
        &self,
        current: &Match,
        updated: &Match,
    ) -> BracketResult<Option<Match>> {
        // Version and status are checked in the same statement as the write,
        // so two writers racing on one row cannot both succeed.
        let row = sqlx::query(&format!(
            "UPDATE matches
             SET status = $1, slot1_team_id = $2, slot1_score = $3, slot2_team_id = $4,
                 slot2_score = $5, winner_id = $6, next_match_id = $7,
                 version = version + 1, updated_at = NOW()
             WHERE id = $8 AND version = $9 AND status = $10
             RETURNING {MATCH_COLUMNS}"
        ))
        .bind(updated.status.as_str())
        .bind(updated.slot1.team_id)
        .bind(updated.slot1.score)
        .bind(updated.slot2.team_id)
        .bind(updated.slot2.score)
        .bind(updated.winner)
        .bind(updated.next_match_id)
        .bind(current.id)
        .bind(current.version)
        .bind(current.status.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(match_from_row).transpose()
    }

    async fn delete_by_tournament(&self, tournament_id: TournamentId) -> BracketResult<u64> {
        let result = sqlx::query("DELETE FROM matches WHERE tournament_id = $1")
            .bind(tournament_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn ping(&self) -> BracketResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Default PostgreSQL implementation of `TeamRepository`
#[derive(Clone)]
pub struct PgTeamRepository {
    pool: PgPool,
}

impl PgTeamRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TeamRepository for PgTeamRepository {
    async fn create_team(
        &self,
        name: &str,
        tournament_id: TournamentId,
        college_id: Option<i64>,
    ) -> BracketResult<Team> {
        let mut tx = self.pool.begin().await?;
        lock_tournament(&mut tx, tournament_id).await?;

        let claimed = sqlx::query(
            "SELECT EXISTS(SELECT 1 FROM bracket_generations WHERE tournament_id = $1) AS claimed",
        )
        .bind(tournament_id)
        .fetch_one(&mut *tx)
        .await?;
        if claimed.get::<bool, _>("claimed") {
            return Err(BracketError::AlreadyGenerated(tournament_id));
        }

        let row = sqlx::query(
            "INSERT INTO teams (name, tournament_id, college_id) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(name)
        .bind(tournament_id)
        .bind(college_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Team {
            id: row.get("id"),
            name: name.to_string(),
            tournament_id,
            college_id,
        })
    }

    async fn list_teams(&self, tournament_id: TournamentId) -> BracketResult<Vec<Team>> {
        let rows = sqlx::query(
            "SELECT id, name, tournament_id, college_id FROM teams
             WHERE tournament_id = $1 ORDER BY id",
        )
        .bind(tournament_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| Team {
                id: r.get("id"),
                name: r.get("name"),
                tournament_id: r.get("tournament_id"),
                college_id: r.get("college_id"),
            })
            .collect())
    }
}
