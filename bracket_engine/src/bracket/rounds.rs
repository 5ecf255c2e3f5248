//! Round count for a single-elimination bracket.

use super::errors::{BracketError, BracketResult};

/// Number of rounds needed to reduce `team_count` teams to one winner.
///
/// Equals `ceil(log2(team_count))`. A single team needs no rounds; zero teams
/// is an input error.
pub fn round_count(team_count: usize) -> BracketResult<u32> {
    if team_count == 0 {
        return Err(BracketError::InvalidInput(
            "team count must be at least 1".to_string(),
        ));
    }

    Ok(team_count.next_power_of_two().trailing_zeros())
}
