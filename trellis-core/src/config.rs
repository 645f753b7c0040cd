//! Runtime configuration.
//!
//! The defaults reproduce the plain behaviour of the core: every write
//! triggers, and trigger chains are only cut off when they nest deeper
//! than any sane render tree would.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default limit for nested trigger passes.
pub const DEFAULT_MAX_TRIGGER_DEPTH: usize = 100;

/// Tunables for a [`Runtime`](crate::reactive::Runtime).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// When set, writing a value equal to the current one does not trigger
    /// subscribers.
    pub skip_unchanged_writes: bool,

    /// Maximum number of trigger passes that may be nested inside each
    /// other. Deeper passes are dropped with a warning.
    pub max_trigger_depth: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            skip_unchanged_writes: false,
            max_trigger_depth: DEFAULT_MAX_TRIGGER_DEPTH,
        }
    }
}

impl RuntimeConfig {
    /// Parse a configuration from a JSON document. Missing fields take
    /// their default values.
    pub fn from_json(source: &str) -> Result<Self> {
        serde_json::from_str(source).map_err(Error::Config)
    }

    /// Builder-style setter for [`skip_unchanged_writes`](Self::skip_unchanged_writes).
    pub fn skip_unchanged_writes(mut self, skip: bool) -> Self {
        self.skip_unchanged_writes = skip;
        self
    }

    /// Builder-style setter for [`max_trigger_depth`](Self::max_trigger_depth).
    pub fn max_trigger_depth(mut self, depth: usize) -> Self {
        self.max_trigger_depth = depth;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_trigger_on_every_write() {
        let config = RuntimeConfig::default();
        assert!(!config.skip_unchanged_writes);
        assert_eq!(config.max_trigger_depth, DEFAULT_MAX_TRIGGER_DEPTH);
    }

    #[test]
    fn parses_partial_json() {
        let config = RuntimeConfig::from_json(r#"{ "skip_unchanged_writes": true }"#).unwrap();
        assert!(config.skip_unchanged_writes);
        assert_eq!(config.max_trigger_depth, DEFAULT_MAX_TRIGGER_DEPTH);
    }

    #[test]
    fn rejects_malformed_json() {
        let err = RuntimeConfig::from_json("{ nope").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
