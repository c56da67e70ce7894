//! Server configuration, loadable from RON.

use std::path::Path;

use serde::{Deserialize, Serialize};
use sim_core::config::MAX_TICKS_PER_SEGMENT;

use crate::error::{Result, ServerError};

/// Verification server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Secret mixed into audit-tick selection. Never sent to clients.
    pub audit_secret: String,
    /// Verification jobs allowed to run at once.
    pub workers: usize,
    /// Checkpoint ticks audited per segment.
    pub audit_ticks_per_segment: usize,
    /// Longest segment accepted, in ticks.
    pub segment_tick_cap: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            audit_secret: "change-me".to_string(),
            workers: 4,
            audit_ticks_per_segment: 3,
            segment_tick_cap: MAX_TICKS_PER_SEGMENT,
        }
    }
}

impl ServerConfig {
    /// Load from a RON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Parse and validate from a RON string.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing or validation fails.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        let config: Self = ron::from_str(ron)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the server cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::InvalidConfig`] for the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.audit_secret.is_empty() {
            return Err(ServerError::InvalidConfig("audit secret is empty".into()));
        }
        if self.workers == 0 {
            return Err(ServerError::InvalidConfig("at least one worker is required".into()));
        }
        // Audits hold two or three ticks per segment.
        if !(2..=3).contains(&self.audit_ticks_per_segment) {
            return Err(ServerError::InvalidConfig(format!(
                "audit ticks per segment must be 2 or 3, got {}",
                self.audit_ticks_per_segment
            )));
        }
        if self.segment_tick_cap == 0 {
            return Err(ServerError::InvalidConfig("segment tick cap is zero".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.segment_tick_cap, 9000);
    }

    #[test]
    fn test_partial_ron_fills_defaults() {
        let config = ServerConfig::from_ron_str(r#"(audit_secret: "s3cret", workers: 8)"#).unwrap();
        assert_eq!(config.audit_secret, "s3cret");
        assert_eq!(config.workers, 8);
        assert_eq!(config.audit_ticks_per_segment, 3);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        assert!(ServerConfig::from_ron_str("(workers: 0)").is_err());
        assert!(ServerConfig::from_ron_str(r#"(audit_secret: "")"#).is_err());
        assert!(ServerConfig::from_ron_str("(audit_ticks_per_segment: 7)").is_err());
        assert!(ServerConfig::from_ron_str("(workers: ").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.ron");
        std::fs::write(&path, r#"(audit_secret: "from-file", audit_ticks_per_segment: 2)"#).unwrap();
        let config = ServerConfig::load(&path).unwrap();
        assert_eq!(config.audit_ticks_per_segment, 2);
        assert!(ServerConfig::load(dir.path().join("missing.ron")).is_err());
    }
}
