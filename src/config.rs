//! Optional config file loading. Search order: ./comic2epub.toml, then
//! $XDG_CONFIG_HOME/comic2epub/config.toml (or ~/.config/comic2epub/config.toml).

use crate::site::Locators;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Config file contents. All fields optional; only present keys override defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct Config {
    /// Base directory under which `<title> - <author>/` is created. Relative to CWD.
    pub output_dir: Option<PathBuf>,
    /// HTTP User-Agent header.
    pub user_agent: Option<String>,
    /// Delay in seconds between requests.
    pub request_delay_secs: Option<u64>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Maximum pages followed per chapter.
    pub max_pages: Option<usize>,
    /// Site origin that relative links resolve against.
    pub origin: Option<String>,
    /// Locator overrides. Keys left out keep their built-in values.
    pub selectors: Option<Locators>,
}

const FILE_NAME: &str = "comic2epub.toml";

/// Search order: (1) ./comic2epub.toml, (2) $XDG_CONFIG_HOME/comic2epub/config.toml.
/// Missing file returns Ok(None). Invalid TOML or I/O error reading a present file returns Err.
pub fn load_config() -> Result<Option<Config>, String> {
    let cwd = std::env::current_dir()
        .map_err(|e| format!("Cannot determine current directory: {}", e))?;
    let mut paths = vec![cwd.join(FILE_NAME)];
    if let Some(d) = dirs::config_dir() {
        paths.push(d.join("comic2epub").join("config.toml"));
    }
    for path in &paths {
        if path.is_file() {
            return load_config_from(path).map(Some);
        }
    }
    Ok(None)
}

pub fn load_config_from(path: &Path) -> Result<Config, String> {
    let s = std::fs::read_to_string(path)
        .map_err(|e| format!("Cannot read config {}: {}", path.display(), e))?;
    toml::from_str(&s).map_err(|e| format!("Invalid config {}: {}", path.display(), e))
}
