//! Configuration management.
//!
//! The category taxonomy, the importance threshold, and the per-kind size
//! limits are runtime configuration handed to the engine at construction
//! time, not module-level constants. The historical defaults are preserved
//! as tunable values.

use crate::models::DocumentKind;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

/// Environment variable overriding the store root directory.
pub const STORE_DIR_ENV: &str = "MNEMO_STORE_DIR";

/// Environment variable overriding the importance threshold.
pub const IMPORTANCE_THRESHOLD_ENV: &str = "MNEMO_IMPORTANCE_THRESHOLD";

/// Default minimum score for a line to become a knowledge candidate.
///
/// Inherited from the original deployment with no documented derivation;
/// exposed as a tunable rather than re-derived.
pub const DEFAULT_IMPORTANCE_THRESHOLD: f64 = 5.0;

/// Default maximum entries retained per category per extraction run.
pub const DEFAULT_MAX_ENTRIES_PER_CATEGORY: usize = 10;

/// Size policy for one bounded document kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PruneLimits {
    /// Maximum sections (sessions, command groups, updates, todos) to retain.
    pub max_entries: usize,
    /// Line-count budget; a document at or under it is left untouched.
    pub max_total_lines: usize,
}

/// Main configuration for mnemo.
#[derive(Debug, Clone)]
pub struct MnemoConfig {
    /// Root directory holding one subdirectory per agent.
    pub store_dir: PathBuf,
    /// Minimum score for a line to become a knowledge candidate.
    pub importance_threshold: f64,
    /// Maximum entries retained per category per extraction run.
    pub max_entries_per_category: usize,
    /// Per-kind size limits. Kinds absent from the map are never pruned.
    pub limits: HashMap<DocumentKind, PruneLimits>,
}

impl Default for MnemoConfig {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from(".mnemo/agents"),
            importance_threshold: DEFAULT_IMPORTANCE_THRESHOLD,
            max_entries_per_category: DEFAULT_MAX_ENTRIES_PER_CATEGORY,
            limits: Self::default_limits(),
        }
    }
}

impl MnemoConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the default per-kind size limits.
    ///
    /// The fenced pattern/process kinds carry no default limits: they are
    /// prunable only when a deployment configures limits for them.
    #[must_use]
    pub fn default_limits() -> HashMap<DocumentKind, PruneLimits> {
        HashMap::from([
            (
                DocumentKind::SessionHistory,
                PruneLimits {
                    max_entries: 20,
                    max_total_lines: 500,
                },
            ),
            (
                DocumentKind::EffectiveCommands,
                PruneLimits {
                    max_entries: 30,
                    max_total_lines: 400,
                },
            ),
            (
                DocumentKind::ProblematicCommands,
                PruneLimits {
                    max_entries: 30,
                    max_total_lines: 400,
                },
            ),
            (
                DocumentKind::CurrentState,
                PruneLimits {
                    max_entries: 10,
                    max_total_lines: 300,
                },
            ),
            (
                DocumentKind::TodoFuture,
                PruneLimits {
                    max_entries: 100,
                    max_total_lines: 200,
                },
            ),
        ])
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &std::path::Path) -> crate::Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| crate::Error::OperationFailed {
                operation: "read_config_file".to_string(),
                cause: e.to_string(),
            })?;

        let file: ConfigFile =
            toml::from_str(&contents).map_err(|e| crate::Error::OperationFailed {
                operation: "parse_config_file".to_string(),
                cause: e.to_string(),
            })?;

        Ok(Self::from_config_file(file))
    }

    /// Loads configuration from the default location, then applies
    /// environment overrides.
    ///
    /// Checks the following paths in order:
    /// 1. Platform-specific config dir (`~/Library/Application Support/mnemo/` on macOS)
    /// 2. XDG config dir (`~/.config/mnemo/` for Unix compatibility)
    ///
    /// Returns default configuration if no config file is found.
    #[must_use]
    pub fn load_default() -> Self {
        let mut config = Self::load_default_file();
        config.apply_env_overrides();
        config
    }

    fn load_default_file() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        // Check platform-specific config dir first
        let platform_config = base_dirs.config_dir().join("mnemo").join("config.toml");
        if platform_config.exists() {
            if let Ok(config) = Self::load_from_file(&platform_config) {
                return config;
            }
        }

        // Fall back to XDG-style ~/.config/mnemo/ for Unix compatibility
        let xdg_config = base_dirs
            .home_dir()
            .join(".config")
            .join("mnemo")
            .join("config.toml");
        if xdg_config.exists() {
            if let Ok(config) = Self::load_from_file(&xdg_config) {
                return config;
            }
        }

        Self::default()
    }

    /// Applies environment variable overrides.
    ///
    /// Reads:
    /// - `MNEMO_STORE_DIR`: store root directory
    /// - `MNEMO_IMPORTANCE_THRESHOLD`: candidate score threshold
    /// - `MNEMO_<KIND>_MAX_ENTRIES` / `MNEMO_<KIND>_MAX_TOTAL_LINES`:
    ///   per-kind limit overrides, e.g. `MNEMO_SESSION_HISTORY_MAX_ENTRIES=10`
    pub fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var(STORE_DIR_ENV) {
            if !dir.trim().is_empty() {
                self.store_dir = PathBuf::from(dir);
            }
        }

        if let Some(t) = std::env::var(IMPORTANCE_THRESHOLD_ENV)
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
        {
            self.importance_threshold = t;
        }

        for kind in DocumentKind::all().iter().copied() {
            if kind.is_protected() {
                continue;
            }
            let prefix = format!("MNEMO_{}", kind.as_str().to_uppercase().replace('-', "_"));

            let max_entries = std::env::var(format!("{prefix}_MAX_ENTRIES"))
                .ok()
                .and_then(|v| v.parse::<usize>().ok());
            let max_total_lines = std::env::var(format!("{prefix}_MAX_TOTAL_LINES"))
                .ok()
                .and_then(|v| v.parse::<usize>().ok());

            if max_entries.is_none() && max_total_lines.is_none() {
                continue;
            }

            let entry = self.limits.entry(kind).or_insert(PruneLimits {
                max_entries: usize::MAX,
                max_total_lines: usize::MAX,
            });
            if let Some(v) = max_entries {
                entry.max_entries = v;
            }
            if let Some(v) = max_total_lines {
                entry.max_total_lines = v;
            }
        }
    }

    /// Converts a `ConfigFile` to `MnemoConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(store_dir) = file.store_dir {
            config.store_dir = PathBuf::from(store_dir);
        }
        if let Some(threshold) = file.importance_threshold {
            config.importance_threshold = threshold;
        }
        if let Some(max) = file.max_entries_per_category {
            config.max_entries_per_category = max;
        }
        if let Some(limits) = file.limits {
            for (name, limit) in limits {
                if let Some(kind) = DocumentKind::parse(&name) {
                    config.limits.insert(kind, limit);
                } else {
                    tracing::warn!(document = %name, "ignoring limits for unknown document kind");
                }
            }
        }

        config
    }

    /// Returns the limits for a kind, `None` for unbounded or protected kinds.
    #[must_use]
    pub fn limits_for(&self, kind: DocumentKind) -> Option<PruneLimits> {
        if kind.is_protected() {
            return None;
        }
        self.limits.get(&kind).copied()
    }

    /// Sets the store root directory.
    #[must_use]
    pub fn with_store_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_dir = path.into();
        self
    }

    /// Sets the importance threshold.
    #[must_use]
    pub const fn with_importance_threshold(mut self, threshold: f64) -> Self {
        self.importance_threshold = threshold;
        self
    }

    /// Sets the limits for one document kind.
    #[must_use]
    pub fn with_limits(mut self, kind: DocumentKind, limits: PruneLimits) -> Self {
        self.limits.insert(kind, limits);
        self
    }
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Store root directory.
    pub store_dir: Option<String>,
    /// Candidate score threshold.
    pub importance_threshold: Option<f64>,
    /// Maximum entries per category in the regenerated knowledge document.
    pub max_entries_per_category: Option<usize>,
    /// Per-kind size limits, keyed by document kind name.
    pub limits: Option<HashMap<String, PruneLimits>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits_cover_bounded_kinds() {
        let config = MnemoConfig::default();
        assert!(config.limits_for(DocumentKind::SessionHistory).is_some());
        assert!(config.limits_for(DocumentKind::TodoFuture).is_some());
        assert!(config.limits_for(DocumentKind::CoreKnowledge).is_none());
        assert!(config.limits_for(DocumentKind::Dependencies).is_none());
        assert!(config.limits_for(DocumentKind::SuccessfulPatterns).is_none());
    }

    #[test]
    fn test_parse_config_file() {
        let toml_text = r#"
store_dir = "/tmp/agents"
importance_threshold = 7.5

[limits.session-history]
max_entries = 5
max_total_lines = 100
"#;
        let file: ConfigFile = toml::from_str(toml_text).expect("valid toml");
        let config = MnemoConfig::from_config_file(file);
        assert_eq!(config.store_dir, PathBuf::from("/tmp/agents"));
        assert!((config.importance_threshold - 7.5).abs() < f64::EPSILON);
        assert_eq!(
            config.limits_for(DocumentKind::SessionHistory),
            Some(PruneLimits {
                max_entries: 5,
                max_total_lines: 100
            })
        );
    }

    #[test]
    fn test_builders() {
        let config = MnemoConfig::new()
            .with_store_dir("/var/mnemo")
            .with_importance_threshold(3.0)
            .with_limits(
                DocumentKind::SuccessfulPatterns,
                PruneLimits {
                    max_entries: 8,
                    max_total_lines: 80,
                },
            );
        assert_eq!(config.store_dir, PathBuf::from("/var/mnemo"));
        assert!((config.importance_threshold - 3.0).abs() < f64::EPSILON);
        assert!(config.limits_for(DocumentKind::SuccessfulPatterns).is_some());
    }
}
