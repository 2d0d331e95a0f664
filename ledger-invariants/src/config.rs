//! Configuration for the ledger engine

use crate::types::{ArithmeticMode, ZERO_ADDRESS};
use serde::{Deserialize, Serialize};

/// Ledger engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Arithmetic discipline for every operation of a scenario
    pub arithmetic: ArithmeticMode,

    /// Accounts that may never receive funds
    pub denied_recipients: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            arithmetic: ArithmeticMode::Checked,
            denied_recipients: vec![ZERO_ADDRESS.to_string()],
        }
    }
}

impl EngineConfig {
    /// Checked arithmetic, default deny list
    pub fn checked() -> Self {
        Self::default()
    }

    /// Wrapping arithmetic, default deny list
    pub fn wrapping() -> Self {
        Self {
            arithmetic: ArithmeticMode::Wrapping,
            ..Self::default()
        }
    }

    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: EngineConfig = toml::from_str(&content)
            .map_err(|e| crate::Error::Configuration(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = EngineConfig::default();

        if let Ok(mode) = std::env::var("DRIFT_ARITHMETIC") {
            config.arithmetic = mode.parse().map_err(|_| {
                crate::Error::Configuration(format!("Unknown arithmetic mode: {}", mode))
            })?;
        }

        if let Ok(denied) = std::env::var("DRIFT_DENIED_RECIPIENTS") {
            config.denied_recipients = denied
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.arithmetic, ArithmeticMode::Checked);
        assert_eq!(config.denied_recipients, vec![ZERO_ADDRESS.to_string()]);
    }

    #[test]
    fn test_partial_toml() {
        let config: EngineConfig = toml::from_str(r#"arithmetic = "wrapping""#).unwrap();
        assert_eq!(config, EngineConfig::wrapping());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        std::fs::write(
            &path,
            "arithmetic = \"checked\"\ndenied_recipients = [\"burn\", \"treasury\"]\n",
        )
        .unwrap();

        let config = EngineConfig::from_file(&path).unwrap();
        assert_eq!(config.denied_recipients, vec!["burn", "treasury"]);

        std::fs::write(&path, "arithmetic = \"saturating\"\n").unwrap();
        assert!(matches!(
            EngineConfig::from_file(&path),
            Err(crate::Error::Configuration(_))
        ));
    }

    // Only test touching DRIFT_*; the variables are process-wide.
    #[test]
    fn test_from_env() {
        std::env::remove_var("DRIFT_ARITHMETIC");
        std::env::remove_var("DRIFT_DENIED_RECIPIENTS");
        assert_eq!(EngineConfig::from_env().unwrap(), EngineConfig::default());

        std::env::set_var("DRIFT_ARITHMETIC", "Wrapping");
        std::env::set_var("DRIFT_DENIED_RECIPIENTS", " burn, ,treasury ");
        let config = EngineConfig::from_env().unwrap();
        assert_eq!(config.arithmetic, ArithmeticMode::Wrapping);
        assert_eq!(config.denied_recipients, vec!["burn", "treasury"]);

        std::env::set_var("DRIFT_ARITHMETIC", "saturating");
        let err = EngineConfig::from_env().unwrap_err();
        assert!(matches!(err, crate::Error::Configuration(_)));
        assert!(err.to_string().contains("saturating"));

        std::env::remove_var("DRIFT_ARITHMETIC");
        std::env::remove_var("DRIFT_DENIED_RECIPIENTS");
    }
}
