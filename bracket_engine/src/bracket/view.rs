//! Read-side rendering of a bracket.
//!
//! Matches only store a pointer to their successor. The view inverts those
//! pointers to recover each match's predecessors and groups matches by round
//! in display order.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use super::models::{Match, MatchId, MatchStatus, Slot, Team, TeamId, TournamentId};

/// Placeholder shown for a slot whose team is not known yet
pub const TBD: &str = "TBD";

/// One side of a match as shown to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Participant {
    pub team_id: Option<TeamId>,
    pub name: Option<String>,
    pub score: i32,
    pub is_winner: bool,
}

/// A match as shown to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchSummary {
    pub id: MatchId,
    pub round: u32,
    /// "<team> vs <team>", unknown teams shown as `TBD`
    pub name: String,
    pub status: MatchStatus,
    pub next_match_id: Option<MatchId>,
    /// Matches feeding into this one, in ID order
    pub previous_match_ids: Vec<MatchId>,
    pub participants: [Participant; 2],
}

/// All matches of one round
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundView {
    pub round: u32,
    pub matches: Vec<MatchSummary>,
}

/// The whole bracket of a tournament
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BracketView {
    pub tournament_id: TournamentId,
    pub rounds: Vec<RoundView>,
    /// The final, `None` if no bracket was generated or generation stopped
    /// part way, leaving more than one match without a successor
    pub final_match_id: Option<MatchId>,
    /// Winner of the final once it is played
    pub champion: Option<TeamId>,
}

impl BracketView {
    /// Build the view from the stored matches and teams of a tournament
    pub fn build(tournament_id: TournamentId, matches: &[Match], teams: &[Team]) -> Self {
        let names: HashMap<TeamId, &str> = teams.iter().map(|t| (t.id, t.name.as_str())).collect();

        let mut previous: HashMap<MatchId, Vec<MatchId>> = HashMap::new();
        for m in matches {
            if let Some(next) = m.next_match_id {
                previous.entry(next).or_default().push(m.id);
            }
        }
        for ids in previous.values_mut() {
            ids.sort_unstable();
        }

        let mut ordered: Vec<&Match> = matches.iter().collect();
        ordered.sort_by_key(|m| (m.round, m.id));

        let mut rounds: BTreeMap<u32, Vec<MatchSummary>> = BTreeMap::new();
        for m in ordered {
            let summary = MatchSummary {
                id: m.id,
                round: m.round,
                name: format!(
                    "{} vs {}",
                    display_name(&names, m.slot1),
                    display_name(&names, m.slot2)
                ),
                status: m.status,
                next_match_id: m.next_match_id,
                previous_match_ids: previous.remove(&m.id).unwrap_or_default(),
                participants: [participant(&names, m, m.slot1), participant(&names, m, m.slot2)],
            };
            rounds.entry(m.round).or_default().push(summary);
        }

        let mut unlinked = matches.iter().filter(|m| m.is_final());
        let final_match = match (unlinked.next(), unlinked.next()) {
            (Some(only), None) => Some(only),
            _ => None,
        };

        Self {
            tournament_id,
            rounds: rounds
                .into_iter()
                .map(|(round, matches)| RoundView { round, matches })
                .collect(),
            final_match_id: final_match.map(|m| m.id),
            champion: final_match
                .filter(|m| m.status == MatchStatus::Played)
                .and_then(|m| m.winner),
        }
    }

    /// Total number of matches in the view
    pub fn match_count(&self) -> usize {
        self.rounds.iter().map(|r| r.matches.len()).sum()
    }
}

fn display_name<'a>(names: &HashMap<TeamId, &'a str>, slot: Slot) -> &'a str {
    slot.team_id
        .and_then(|id| names.get(&id).copied())
        .unwrap_or(TBD)
}

fn participant(names: &HashMap<TeamId, &str>, m: &Match, slot: Slot) -> Participant {
    Participant {
        team_id: slot.team_id,
        name: slot
            .team_id
            .and_then(|id| names.get(&id).map(|name| name.to_string())),
        score: slot.score,
        is_winner: slot.team_id.is_some() && m.winner == slot.team_id,
    }
}
