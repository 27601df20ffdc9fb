//! Bowl configuration with environment variable and file-based loading.
//!
//! Environment variables:
//! - `PASTABOWL_PATH`: Root directory holding one subdirectory per pasta
//! - `PASTABOWL_READONLY`: Set to "true" for read-only mode
//! - `PASTABOWL_ID_LENGTH`: Length of generated ids
//! - `PASTABOWL_TOKEN_LENGTH`: Length of generated tokens
//!
//! Default path: `~/.pastabowl/pastas`

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use crate::ident::{DEFAULT_ID_LENGTH, DEFAULT_TOKEN_LENGTH};

/// Configuration for a [`Bowl`](crate::Bowl).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BowlConfig {
    /// Root directory. Each pasta lives in `{base_path}/{id}/`.
    pub base_path: PathBuf,

    /// Number of characters in generated pasta ids.
    #[serde(default = "default_id_length")]
    pub id_length: usize,

    /// Number of characters in generated access tokens.
    #[serde(default = "default_token_length")]
    pub token_length: usize,

    /// Read-only mode - inserts, deletes and payload writes are refused.
    #[serde(default)]
    pub read_only: bool,
}

fn default_id_length() -> usize {
    DEFAULT_ID_LENGTH
}

fn default_token_length() -> usize {
    DEFAULT_TOKEN_LENGTH
}

impl Default for BowlConfig {
    fn default() -> Self {
        Self::with_base_path(default_bowl_path())
    }
}

/// Get the default bowl path (~/.pastabowl/pastas).
fn default_bowl_path() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".pastabowl").join("pastas"))
        .unwrap_or_else(|| PathBuf::from(".pastabowl/pastas"))
}

fn env_length(var: &str, fallback: usize) -> Result<usize> {
    match env::var(var) {
        Ok(v) => v
            .trim()
            .parse::<NonZeroUsize>()
            .map(NonZeroUsize::get)
            .with_context(|| format!("{var} must be a positive integer, got {v:?}")),
        Err(_) => Ok(fallback),
    }
}

impl BowlConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let base_path = env::var("PASTABOWL_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_bowl_path());

        let read_only = env::var("PASTABOWL_READONLY")
            .map(|v| v.to_lowercase() == "true" || v == "1")
            .unwrap_or(false);

        Ok(Self {
            base_path,
            id_length: env_length("PASTABOWL_ID_LENGTH", DEFAULT_ID_LENGTH)?,
            token_length: env_length("PASTABOWL_TOKEN_LENGTH", DEFAULT_TOKEN_LENGTH)?,
            read_only,
        })
    }

    /// Load configuration from a TOML file, falling back to environment.
    ///
    /// The file should contain a `[bowl]` section:
    /// ```toml
    /// [bowl]
    /// base_path = "/srv/pasta/bowl"
    /// id_length = 8
    /// token_length = 20
    /// read_only = false
    /// ```
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        let table: toml::Table = contents
            .parse()
            .with_context(|| format!("failed to parse TOML: {}", path.display()))?;

        if let Some(section) = table.get("bowl") {
            let config: BowlConfig = section
                .clone()
                .try_into()
                .context("failed to parse [bowl] section")?;
            Ok(config)
        } else {
            Self::from_env()
        }
    }

    /// Create a config with a specific base path.
    pub fn with_base_path(path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: path.into(),
            id_length: DEFAULT_ID_LENGTH,
            token_length: DEFAULT_TOKEN_LENGTH,
            read_only: false,
        }
    }

    /// Create a read-only config with a specific base path.
    pub fn read_only(path: impl Into<PathBuf>) -> Self {
        Self {
            read_only: true,
            ..Self::with_base_path(path)
        }
    }

    /// Get the directory for a single pasta.
    pub(crate) fn pasta_dir(&self, id: &str) -> PathBuf {
        self.base_path.join(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn clear_env() {
        for var in [
            "PASTABOWL_PATH",
            "PASTABOWL_READONLY",
            "PASTABOWL_ID_LENGTH",
            "PASTABOWL_TOKEN_LENGTH",
        ] {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_default_config() {
        let config = BowlConfig::default();
        assert!(config.base_path.to_string_lossy().contains(".pastabowl"));
        assert_eq!(config.id_length, DEFAULT_ID_LENGTH);
        assert_eq!(config.token_length, DEFAULT_TOKEN_LENGTH);
        assert!(!config.read_only);
    }

    #[test]
    fn test_read_only_config() {
        let config = BowlConfig::read_only("/srv/bowl");
        assert_eq!(config.base_path, PathBuf::from("/srv/bowl"));
        assert!(config.read_only);
    }

    #[test]
    fn test_pasta_dir() {
        let config = BowlConfig::with_base_path("/srv/bowl");
        assert_eq!(config.pasta_dir("abc"), PathBuf::from("/srv/bowl/abc"));
    }

    #[test]
    #[serial]
    fn test_from_env_uses_defaults() {
        clear_env();

        let config = BowlConfig::from_env().unwrap();
        assert!(config.base_path.to_string_lossy().contains(".pastabowl"));
        assert_eq!(config.id_length, DEFAULT_ID_LENGTH);
        assert!(!config.read_only);
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_env();
        env::set_var("PASTABOWL_PATH", "/tmp/bowl-env");
        env::set_var("PASTABOWL_READONLY", "TRUE");
        env::set_var("PASTABOWL_ID_LENGTH", "12");
        env::set_var("PASTABOWL_TOKEN_LENGTH", "40");

        let config = BowlConfig::from_env().unwrap();
        clear_env();

        assert_eq!(config.base_path, PathBuf::from("/tmp/bowl-env"));
        assert!(config.read_only);
        assert_eq!(config.id_length, 12);
        assert_eq!(config.token_length, 40);
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_bad_length() {
        clear_env();
        env::set_var("PASTABOWL_ID_LENGTH", "lots");

        let result = BowlConfig::from_env();
        clear_env();

        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_zero_length() {
        clear_env();
        env::set_var("PASTABOWL_TOKEN_LENGTH", "0");

        let result = BowlConfig::from_env();
        clear_env();

        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("PASTABOWL_TOKEN_LENGTH must be a positive integer"));
    }

    #[test]
    fn test_from_file_bowl_section() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[bowl]\nbase_path = \"/srv/pasta\"\nid_length = 10\nread_only = true"
        )
        .unwrap();

        let config = BowlConfig::from_file(file.path()).unwrap();
        assert_eq!(config.base_path, PathBuf::from("/srv/pasta"));
        assert_eq!(config.id_length, 10);
        assert_eq!(config.token_length, DEFAULT_TOKEN_LENGTH);
        assert!(config.read_only);
    }

    #[test]
    #[serial]
    fn test_from_file_without_section_falls_back_to_env() {
        clear_env();
        env::set_var("PASTABOWL_PATH", "/tmp/bowl-fallback");

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[other]\nkey = 1").unwrap();

        let config = BowlConfig::from_file(file.path());
        clear_env();

        assert_eq!(config.unwrap().base_path, PathBuf::from("/tmp/bowl-fallback"));
    }

    #[test]
    fn test_from_file_missing() {
        let result = BowlConfig::from_file(Path::new("/nonexistent/pastabowl.toml"));
        assert!(result.unwrap_err().to_string().contains("failed to read config file"));
    }

    #[test]
    fn test_serde_roundtrip() {
        let config = BowlConfig {
            base_path: PathBuf::from("/custom/bowl"),
            id_length: 16,
            token_length: 32,
            read_only: true,
        };
        let json = serde_json::to_string(&config).unwrap();
        let restored: BowlConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, restored);
    }
}
