//! Engine configuration.

use std::env;

/// Default number of attempts for a contended conditional update
pub const DEFAULT_MAX_CAS_RETRIES: u32 = 8;

/// Bracket engine configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Attempts made to place a winner into a successor match before giving
    /// up with a conflict error
    pub max_cas_retries: u32,
}

impl EngineConfig {
    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `BRACKET_MAX_CAS_RETRIES`: retry budget for contended updates (default: 8)
    ///
    /// Unparseable or zero values fall back to the default.
    pub fn from_env() -> Self {
        let max_cas_retries = env::var("BRACKET_MAX_CAS_RETRIES")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|&n: &u32| n > 0)
            .unwrap_or(DEFAULT_MAX_CAS_RETRIES);

        Self { max_cas_retries }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_cas_retries: DEFAULT_MAX_CAS_RETRIES,
        }
    }
}
