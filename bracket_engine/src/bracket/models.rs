//! Bracket data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Match ID type
pub type MatchId = i64;

/// Team ID type
pub type TeamId = i64;

/// Tournament ID type
pub type TournamentId = i64;

/// Match status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    /// Waiting for one or both teams to advance into the match
    Unstarted,
    /// Both teams known, waiting for a result
    InProgress,
    /// Result recorded (or bye), winner set
    Played,
}

impl MatchStatus {
    /// Column value used by the storage layer
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Unstarted => "UNSTARTED",
            MatchStatus::InProgress => "IN_PROGRESS",
            MatchStatus::Played => "PLAYED",
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UNSTARTED" => Ok(MatchStatus::Unstarted),
            "IN_PROGRESS" => Ok(MatchStatus::InProgress),
            "PLAYED" => Ok(MatchStatus::Played),
            other => Err(format!("unknown match status: {other}")),
        }
    }
}

/// One of the two team positions of a match
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    /// Team occupying the slot, `None` while pending or for a bye
    pub team_id: Option<TeamId>,
    /// Final score, 0 until a result is recorded
    pub score: i32,
}

impl Slot {
    /// Slot holding `team_id` with a zero score
    pub fn team(team_id: TeamId) -> Self {
        Self {
            team_id: Some(team_id),
            score: 0,
        }
    }

    /// Slot with no team
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.team_id.is_none()
    }
}

/// A team entered into a tournament
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub tournament_id: TournamentId,
    pub college_id: Option<i64>,
}

/// A persisted bracket node
///
/// The bracket is stored parent-pointer only: each match knows the match its
/// winner advances into, and nothing else. Child order is reconstructed on
/// read from `round` and `next_match_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    /// Round number, 1 is the first round
    pub round: u32,
    pub tournament_id: TournamentId,
    pub status: MatchStatus,
    pub slot1: Slot,
    pub slot2: Slot,
    /// Set only once the match is `Played`
    pub winner: Option<TeamId>,
    /// Match receiving the winner, `None` for the final
    pub next_match_id: Option<MatchId>,
    /// Optimistic concurrency counter, bumped by every conditional update
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

impl Match {
    /// Whether this is the tournament final
    pub fn is_final(&self) -> bool {
        self.next_match_id.is_none()
    }

    /// Whether the match was resolved without an opponent
    pub fn is_bye(&self) -> bool {
        self.status == MatchStatus::Played && (self.slot1.is_empty() || self.slot2.is_empty())
    }

    /// Whether both slots hold a team
    pub fn is_full(&self) -> bool {
        !self.slot1.is_empty() && !self.slot2.is_empty()
    }

    /// Whether `team_id` occupies either slot
    pub fn contains_team(&self, team_id: TeamId) -> bool {
        self.slot1.team_id == Some(team_id) || self.slot2.team_id == Some(team_id)
    }

    /// Teams currently placed in the match, slot1 first
    pub fn teams(&self) -> impl Iterator<Item = TeamId> {
        self.slot1.team_id.into_iter().chain(self.slot2.team_id)
    }

    /// Place `team_id` into the first open slot, preferring slot1.
    ///
    /// Moves the match to `InProgress` once both slots are filled. Returns
    /// `false` if no slot is open.
    pub fn assign_team(&mut self, team_id: TeamId) -> bool {
        let slot = if self.slot1.is_empty() {
            &mut self.slot1
        } else if self.slot2.is_empty() {
            &mut self.slot2
        } else {
            return false;
        };
        slot.team_id = Some(team_id);

        if self.is_full() {
            self.status = MatchStatus::InProgress;
        }
        true
    }
}

/// A match that has not been persisted yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMatch {
    pub round: u32,
    pub tournament_id: TournamentId,
    pub status: MatchStatus,
    pub slot1: Slot,
    pub slot2: Slot,
    pub winner: Option<TeamId>,
    pub next_match_id: Option<MatchId>,
}

impl NewMatch {
    /// Round-1 match between two seeded teams
    pub fn seeded(tournament_id: TournamentId, team1: TeamId, team2: TeamId) -> Self {
        Self {
            round: 1,
            tournament_id,
            status: MatchStatus::InProgress,
            slot1: Slot::team(team1),
            slot2: Slot::team(team2),
            winner: None,
            next_match_id: None,
        }
    }

    /// Round-1 match for a team without an opponent, already decided
    pub fn bye(tournament_id: TournamentId, team: TeamId) -> Self {
        Self {
            round: 1,
            tournament_id,
            status: MatchStatus::Played,
            slot1: Slot::team(team),
            slot2: Slot::empty(),
            winner: Some(team),
            next_match_id: None,
        }
    }

    /// Later-round match waiting for both predecessors
    pub fn pending(tournament_id: TournamentId, round: u32) -> Self {
        Self {
            round,
            tournament_id,
            status: MatchStatus::Unstarted,
            slot1: Slot::empty(),
            slot2: Slot::empty(),
            winner: None,
            next_match_id: None,
        }
    }
}

/// Outcome of recording a match result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchReport {
    /// The match the result was recorded for
    pub played: Match,
    /// The successor after the winner was placed into it
    pub next_match: Option<Match>,
    /// Set when `played` was the final
    pub champion: Option<TeamId>,
}
