//! # Engine Configuration
//!
//! Tunables for the engine. Deserializable so the app can read them from the
//! `[engine]` table of its config file; missing fields take the defaults.

use crate::primitives::{
    DEFAULT_SUGGESTION_DEPTH, DEFAULT_TRANSPLANT_ATTEMPTS, MAX_SUGGESTION_DEPTH,
    MAX_TRANSPLANT_ATTEMPTS,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Depth of the suggestion traversal run after each mutation.
    pub suggestion_depth: usize,
    /// Attempts for a transplant unit before giving up.
    pub transplant_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            suggestion_depth: DEFAULT_SUGGESTION_DEPTH,
            transplant_attempts: DEFAULT_TRANSPLANT_ATTEMPTS,
        }
    }
}

impl EngineConfig {
    /// Copy with every value pulled inside its hard cap.
    #[must_use]
    pub fn clamped(self) -> Self {
        Self {
            suggestion_depth: self.suggestion_depth.min(MAX_SUGGESTION_DEPTH),
            transplant_attempts: self.transplant_attempts.clamp(1, MAX_TRANSPLANT_ATTEMPTS),
        }
    }
}
