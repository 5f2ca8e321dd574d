use std::time::Duration;

use serde::Deserialize;

pub const DEFAULT_UNINDEXED_TIMEOUT_MS: u64 = 5_000;

/// Knobs the hosting runtime supplies to the engine.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct NavSettings {
    /// Issue only index-backed queries; skips the unindexed/indexed race.
    pub indexed_only: bool,
    /// Delay before the index-only fallback query is issued.
    pub unindexed_timeout_ms: u64,
    /// Log every query at `info` instead of `debug`.
    pub trace_search: bool,
    /// Add `fork:yes archived:yes` to every query.
    pub include_forks: bool,
    /// Multi-tenant deployment where cross-repository search is too expensive.
    pub public_instance: bool,
}

impl Default for NavSettings {
    fn default() -> Self {
        Self {
            indexed_only: false,
            unindexed_timeout_ms: DEFAULT_UNINDEXED_TIMEOUT_MS,
            trace_search: false,
            include_forks: false,
            public_instance: false,
        }
    }
}

impl NavSettings {
    pub fn unindexed_timeout(&self) -> Duration {
        Duration::from_millis(self.unindexed_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let settings: NavSettings = serde_json::from_str(r#"{"trace_search": true}"#).unwrap();
        assert!(settings.trace_search);
        assert_eq!(settings.unindexed_timeout(), Duration::from_secs(5));
        assert!(!settings.indexed_only);
    }
}
