//! Configuration file discovery and root folder resolution
//!
//! Bootstrap configuration is a single optional TOML file. A missing file is
//! not an error: the caller receives built-in defaults and a warning is
//! logged. An explicitly requested file that cannot be read or parsed is an
//! error.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable consulted for the music root folder
pub const ROOT_FOLDER_ENV: &str = "SDJUKE_ROOT_FOLDER";

/// Application directory name used under the platform config dir
const APP_DIR: &str = "sdjuke";

/// Where a resolved root folder came from (logged at startup)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootFolderSource {
    CommandLine,
    Environment,
    ConfigFile,
    CompiledDefault,
}

impl std::fmt::Display for RootFolderSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RootFolderSource::CommandLine => write!(f, "command line"),
            RootFolderSource::Environment => write!(f, "environment"),
            RootFolderSource::ConfigFile => write!(f, "config file"),
            RootFolderSource::CompiledDefault => write!(f, "compiled default"),
        }
    }
}

/// Root folder resolution in priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
#[derive(Debug, Clone)]
pub struct RootFolderResolver {
    env_var: String,
}

impl RootFolderResolver {
    pub fn new(env_var: impl Into<String>) -> Self {
        Self {
            env_var: env_var.into(),
        }
    }

    /// Resolve the root folder and report which source won
    pub fn resolve(
        &self,
        cli_arg: Option<&Path>,
        config_value: Option<&Path>,
    ) -> (PathBuf, RootFolderSource) {
        if let Some(path) = cli_arg {
            return (path.to_path_buf(), RootFolderSource::CommandLine);
        }

        if let Ok(path) = std::env::var(&self.env_var) {
            if !path.trim().is_empty() {
                return (PathBuf::from(path), RootFolderSource::Environment);
            }
        }

        if let Some(path) = config_value {
            return (path.to_path_buf(), RootFolderSource::ConfigFile);
        }

        (default_root_folder(), RootFolderSource::CompiledDefault)
    }
}

impl Default for RootFolderResolver {
    fn default() -> Self {
        Self::new(ROOT_FOLDER_ENV)
    }
}

/// Get OS-dependent default music folder
pub fn default_root_folder() -> PathBuf {
    dirs::audio_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Music")))
        .unwrap_or_else(|| PathBuf::from("./music"))
}

/// Find the first existing config file in the platform search path
///
/// Linux: `~/.config/sdjuke/config.toml`, then `/etc/sdjuke/config.toml`.
/// Other platforms: the user config directory only.
pub fn locate_config_file() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join(APP_DIR).join("config.toml"));
    }
    if cfg!(target_os = "linux") {
        candidates.push(PathBuf::from("/etc").join(APP_DIR).join("config.toml"));
    }

    candidates.into_iter().find(|path| path.is_file())
}

/// Parse a TOML document into `T`
pub fn parse_toml<T: DeserializeOwned>(content: &str) -> Result<T> {
    Ok(toml::from_str(content)?)
}

/// Load bootstrap configuration
///
/// - `explicit`: path given on the command line; must exist and parse
/// - otherwise the platform search path is tried; nothing found yields
///   `T::default()`
///
/// Returns the configuration and the file it was read from, if any.
pub fn load_toml_config<T>(explicit: Option<&Path>) -> Result<(T, Option<PathBuf>)>
where
    T: DeserializeOwned + Default,
{
    let path = match explicit {
        Some(path) => {
            if !path.is_file() {
                return Err(Error::NotFound(format!(
                    "config file {}",
                    path.display()
                )));
            }
            path.to_path_buf()
        }
        None => match locate_config_file() {
            Some(path) => path,
            None => {
                warn!("No config file found, using built-in defaults");
                return Ok((T::default(), None));
            }
        },
    };

    let content = std::fs::read_to_string(&path)?;
    debug!("Read {} bytes of configuration from {}", content.len(), path.display());

    let config = parse_toml(&content).map_err(|e| {
        Error::Config(format!("Failed to parse {}: {}", path.display(), e))
    })?;

    info!("Loaded configuration from {}", path.display());
    Ok((config, Some(path)))
}
