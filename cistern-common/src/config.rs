//! Configuration loading and data root resolution

use crate::{Error, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;

/// TOML configuration file contents.
///
/// All fields are optional; missing values fall back to environment
/// variables and then to compiled defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub bind_address: Option<String>,
    pub data_root: Option<PathBuf>,
    pub database_path: Option<PathBuf>,
    pub delete_old_subprojects: Option<bool>,
}

/// Resolved service configuration.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Address the HTTP listener binds to.
    pub bind_address: SocketAddr,
    /// Root folder for the database and archived submission files.
    pub data_root: PathBuf,
    /// Database file path (defaults to `<data_root>/cistern.db`).
    pub database_path: PathBuf,
    /// When enabled, project-structure reconciliation removes stale
    /// dependency edges and deletes sub-projects absent from the
    /// submitted document.
    pub delete_old_subprojects: bool,
}

impl IngestConfig {
    /// Load configuration with priority: environment variable, TOML
    /// config file, compiled default.
    pub fn load() -> Result<Self> {
        let toml_config = load_toml_config()?;

        let data_root = std::env::var("CISTERN_DATA_ROOT")
            .map(PathBuf::from)
            .ok()
            .or(toml_config.data_root)
            .unwrap_or_else(default_data_root);

        let bind_address = std::env::var("CISTERN_BIND_ADDRESS")
            .ok()
            .or(toml_config.bind_address)
            .unwrap_or_else(|| "127.0.0.1:5790".to_string());
        let bind_address = bind_address
            .parse()
            .map_err(|e| Error::Config(format!("Invalid bind address: {e}")))?;

        let database_path = std::env::var("CISTERN_DATABASE_PATH")
            .map(PathBuf::from)
            .ok()
            .or(toml_config.database_path)
            .unwrap_or_else(|| data_root.join("cistern.db"));

        let delete_old_subprojects = match std::env::var("CISTERN_DELETE_OLD_SUBPROJECTS") {
            Ok(v) => parse_bool(&v)?,
            Err(_) => toml_config.delete_old_subprojects.unwrap_or(false),
        };

        Ok(Self {
            bind_address,
            data_root,
            database_path,
            delete_old_subprojects,
        })
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::Config(format!("Invalid boolean value: {other}"))),
    }
}

/// Locate and parse the TOML config file.
///
/// `CISTERN_CONFIG` overrides the search; otherwise the platform config
/// directory is tried. A missing file is not an error.
fn load_toml_config() -> Result<TomlConfig> {
    let path = match std::env::var("CISTERN_CONFIG") {
        Ok(p) => PathBuf::from(p),
        Err(_) => match dirs::config_dir() {
            Some(d) => d.join("cistern").join("config.toml"),
            None => return Ok(TomlConfig::default()),
        },
    };

    if !path.exists() {
        return Ok(TomlConfig::default());
    }

    let contents = std::fs::read_to_string(&path)?;
    toml::from_str(&contents)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {e}", path.display())))
}

/// Get OS-dependent default data root path
fn default_data_root() -> PathBuf {
    if cfg!(target_os = "linux") {
        dirs::data_local_dir()
            .map(|d| d.join("cistern"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/cistern"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("cistern"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/cistern"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("cistern"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\cistern"))
    } else {
        PathBuf::from("./cistern_data")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert!(parse_bool("1").unwrap());
        assert!(parse_bool("true").unwrap());
        assert!(!parse_bool("off").unwrap());
        assert!(parse_bool("maybe").is_err());
    }

    #[test]
    fn toml_config_parses_partial_file() {
        let config: TomlConfig =
            toml::from_str("bind_address = \"0.0.0.0:8080\"\ndelete_old_subprojects = true\n")
                .unwrap();
        assert_eq!(config.bind_address.as_deref(), Some("0.0.0.0:8080"));
        assert_eq!(config.delete_old_subprojects, Some(true));
        assert!(config.data_root.is_none());
    }
}
