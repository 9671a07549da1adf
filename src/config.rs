//! Engine configuration
//!
//! All values have defaults; a TOML file may override any subset. Lookup
//! order: explicit path, `$FRONTEND_INTEL_CONFIG`, then
//! `<config_dir>/frontend-intel/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{IntelError, Result};

/// Environment variable pointing at a config file
pub const CONFIG_ENV: &str = "FRONTEND_INTEL_CONFIG";

/// Log filter directives for the binary, `EnvFilter` syntax
pub const LOG_ENV: &str = "FRONTEND_INTEL_LOG";

/// Selectable rule packs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RulePack {
    /// Framework-agnostic rules
    Core,
    /// React component and hook rules
    React,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How long a cached analysis stays valid
    pub cache_ttl_ms: u64,
    pub cache_max_entries: usize,
    pub complexity_warning_threshold: usize,
    pub complexity_critical_threshold: usize,
    /// Line count above which a default export is a split candidate
    pub max_file_size_for_split_suggestion: usize,
    /// Refactor requests without an explicit flag are previews
    pub dry_run_default: bool,
    pub max_parameters: usize,
    /// Props count above which an unmemoized component is flagged
    pub memo_prop_threshold: usize,
    /// JSX nesting depth above which a render counts as expensive
    pub memo_min_jsx_depth: usize,
    /// Namespace imports using at most this many members can be narrowed
    pub tree_shake_max_bindings: usize,
    pub rule_packs: Vec<RulePack>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_ttl_ms: 5 * 60 * 1000,
            cache_max_entries: 256,
            complexity_warning_threshold: 10,
            complexity_critical_threshold: 20,
            max_file_size_for_split_suggestion: 300,
            dry_run_default: true,
            max_parameters: 5,
            memo_prop_threshold: 5,
            memo_min_jsx_depth: 3,
            tree_shake_max_bindings: 3,
            rule_packs: vec![RulePack::Core, RulePack::React],
        }
    }
}

impl Config {
    /// Load from an explicit path, the environment, or the user config dir
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match Self::locate(explicit) {
            Some(path) => Self::from_file(&path),
            None => {
                tracing::debug!("no config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            if !path.is_empty() {
                return Some(PathBuf::from(path));
            }
        }
        dirs::config_dir()
            .map(|dir| dir.join("frontend-intel").join("config.toml"))
            .filter(|p| p.exists())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(IntelError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let text = fs::read_to_string(path)?;
        let config = Self::from_toml(&text)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| IntelError::Config {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.complexity_warning_threshold == 0 {
            return Err(IntelError::Config {
                message: "complexity_warning_threshold must be positive".to_string(),
            });
        }
        if self.complexity_critical_threshold < self.complexity_warning_threshold {
            return Err(IntelError::Config {
                message: format!(
                    "complexity_critical_threshold ({}) is below complexity_warning_threshold ({})",
                    self.complexity_critical_threshold, self.complexity_warning_threshold
                ),
            });
        }
        if self.cache_max_entries == 0 {
            return Err(IntelError::Config {
                message: "cache_max_entries must be positive".to_string(),
            });
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn has_pack(&self, pack: RulePack) -> bool {
        self.rule_packs.contains(&pack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.cache_ttl(), Duration::from_secs(300));
        assert_eq!(config.complexity_warning_threshold, 10);
        assert_eq!(config.complexity_critical_threshold, 20);
        assert!(config.dry_run_default);
        assert!(config.has_pack(RulePack::React));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml("cache_ttl_ms = 1000\nrule_packs = [\"core\"]\n").unwrap();
        assert_eq!(config.cache_ttl_ms, 1000);
        assert_eq!(config.max_file_size_for_split_suggestion, 300);
        assert!(!config.has_pack(RulePack::React));
    }

    #[test]
    fn test_invalid_thresholds_rejected() {
        let err = Config::from_toml(
            "complexity_warning_threshold = 15\ncomplexity_critical_threshold = 5\n",
        )
        .unwrap_err();
        assert!(matches!(err, IntelError::Config { .. }));
    }

    #[test]
    fn test_malformed_toml_rejected() {
        assert!(Config::from_toml("cache_ttl_ms = \"soon\"").is_err());
    }

    #[test]
    fn test_load_from_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_parameters = 3").unwrap();
        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.max_parameters, 3);
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = Config::load(Some(Path::new("/nonexistent/frontend-intel.toml"))).unwrap_err();
        assert!(matches!(err, IntelError::FileNotFound { .. }));
    }
}
