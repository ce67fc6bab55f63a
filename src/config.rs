//! Root configuration: which databases to manage and how to log.
//!
//! `sqlport.toml` lives at the root of the managed directory tree:
//!
//! ```toml
//! log_levels = ["info"]
//!
//! [databases]
//! default = "sqlite:default.db"
//! ```
//!
//! Loading resolves the root path; everything downstream treats the
//! returned value as already valid.

use crate::error::ConfigError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Well-known configuration file name inside the root directory.
pub const CONFIG_FILE: &str = "sqlport.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Configuration {
    /// The managed root directory; set from the load path, not the file.
    #[serde(skip)]
    pub root: PathBuf,
    /// Database name -> connection URL. Relative `sqlite:` paths resolve
    /// against the root.
    pub databases: BTreeMap<String, String>,
    /// Enabled log levels; the most verbose one selects the filter.
    #[serde(default)]
    pub log_levels: Vec<String>,
}

impl Configuration {
    /// Read and parse `<root>/sqlport.toml`.
    pub fn load(root: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let root = root.as_ref();
        let path = root.join(CONFIG_FILE);
        let text = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Load(format!("{}: {e}", path.display())))?;
        let mut configuration: Configuration = toml::from_str(&text)
            .map_err(|e| ConfigError::Load(format!("{}: {e}", path.display())))?;
        configuration.root = root.to_path_buf();
        Ok(configuration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_databases_and_levels() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "log_levels = [\"debug\"]\n\n[databases]\ndefault = \"sqlite:default.db\"\n",
        )
        .unwrap();
        let configuration = Configuration::load(dir.path()).unwrap();
        assert_eq!(configuration.root, dir.path());
        assert_eq!(
            configuration.databases.get("default").map(String::as_str),
            Some("sqlite:default.db")
        );
        assert_eq!(configuration.log_levels, vec!["debug".to_string()]);
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Configuration::load(dir.path()).is_err());
    }
}
