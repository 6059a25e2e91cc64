use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  #[serde(default)]
  pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Base URL every content endpoint is resolved against
  #[serde(default = "default_base_url")]
  pub base_url: String,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: default_base_url(),
      timeout_secs: default_timeout_secs(),
    }
  }
}

impl ApiConfig {
  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Set to false to keep content in memory only
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Snapshot database (defaults to the user data directory)
  pub path: Option<PathBuf>,
  #[serde(default = "default_namespace")]
  pub namespace: String,
  #[serde(default = "default_debounce_ms")]
  pub debounce_ms: u64,
  /// Longest a change waits for storage while content keeps changing
  #[serde(default = "default_max_wait_ms")]
  pub max_wait_ms: u64,
  /// Slice keys to persist (defaults to every content kind)
  pub persist: Option<Vec<String>>,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      path: None,
      namespace: default_namespace(),
      debounce_ms: default_debounce_ms(),
      max_wait_ms: default_max_wait_ms(),
      persist: None,
    }
  }
}

impl CacheConfig {
  pub fn debounce(&self) -> Duration {
    Duration::from_millis(self.debounce_ms)
  }

  pub fn max_wait(&self) -> Duration {
    Duration::from_millis(self.max_wait_ms)
  }
}

fn default_base_url() -> String {
  "http://localhost:5000/api".to_string()
}

fn default_timeout_secs() -> u64 {
  30
}

fn default_true() -> bool {
  true
}

fn default_namespace() -> String {
  "persist:orca".to_string()
}

fn default_debounce_ms() -> u64 {
  250
}

fn default_max_wait_ms() -> u64 {
  2000
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./orca.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/orca-content/config.yaml
  ///
  /// Without a file the built-in defaults are used.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("orca.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("orca-content").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> std::result::Result<Self, serde_yaml::Error> {
    // An empty file is an empty mapping, not an error
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    serde_yaml::from_str(contents)
  }

  /// Bearer token for the content API, if one is set in ORCA_API_TOKEN.
  pub fn get_api_token() -> Option<String> {
    std::env::var("ORCA_API_TOKEN")
      .ok()
      .filter(|t| !t.trim().is_empty())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  #[test]
  fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.api.base_url, "http://localhost:5000/api");
    assert_eq!(config.api.timeout(), Duration::from_secs(30));
    assert!(config.cache.enabled);
    assert_eq!(config.cache.namespace, "persist:orca");
    assert!(config.cache.persist.is_none());
  }

  #[test]
  fn test_partial_file_keeps_defaults() {
    let config = Config::parse(
      "api:\n  base_url: https://cms.example.com/api\ncache:\n  persist: [theme, hero]\n",
    )
    .unwrap();
    assert_eq!(config.api.base_url, "https://cms.example.com/api");
    assert_eq!(config.api.timeout_secs, 30);
    assert_eq!(config.cache.persist, Some(vec!["theme".to_string(), "hero".to_string()]));
    assert_eq!(config.cache.debounce_ms, 250);
    assert_eq!(config.cache.max_wait(), Duration::from_secs(2));
  }

  #[test]
  fn test_empty_file() {
    assert!(Config::parse("").unwrap().cache.enabled);
  }

  #[test]
  fn test_load_explicit_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "cache:\n  enabled: false").unwrap();

    let config = Config::load(Some(file.path())).unwrap();
    assert!(!config.cache.enabled);
  }

  #[test]
  fn test_missing_explicit_path_is_an_error() {
    assert!(Config::load(Some(Path::new("/nonexistent/orca.yaml"))).is_err());
  }
}
