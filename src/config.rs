use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::fetch::DEFAULT_PAGE_SIZE;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub backend: Backend,
  #[serde(default)]
  pub firestore: FirestoreConfig,
  #[serde(default)]
  pub server: ServerConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  /// Custom title for the dashboard header
  pub title: Option<String>,
}

/// Which remote store backs the app.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
  #[default]
  Firestore,
  /// In-process store, empty on every start
  Memory,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct FirestoreConfig {
  #[serde(default)]
  pub project_id: String,
  #[serde(default = "default_database")]
  pub database: String,
  /// `host:port` of a local emulator; overridden by FIRESTORE_EMULATOR_HOST
  pub emulator_host: Option<String>,
}

fn default_database() -> String {
  "(default)".to_string()
}

impl Default for FirestoreConfig {
  fn default() -> Self {
    Self {
      project_id: String::new(),
      database: default_database(),
      emulator_host: None,
    }
  }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
  #[serde(default = "default_addr")]
  pub addr: SocketAddr,
  /// Externally visible base URL, used in status page links and QR codes
  pub public_url: Option<String>,
  /// Directory of the built web client
  pub static_dir: Option<PathBuf>,
}

fn default_addr() -> SocketAddr {
  SocketAddr::from(([127, 0, 0, 1], 8080))
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      addr: default_addr(),
      public_url: None,
      static_dir: None,
    }
  }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CacheConfig {
  #[serde(default = "default_page_size")]
  pub page_size: u32,
  /// Mirror database file; the platform data directory when unset
  pub mirror_path: Option<PathBuf>,
}

fn default_page_size() -> u32 {
  DEFAULT_PAGE_SIZE
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      page_size: default_page_size(),
      mirror_path: None,
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./spadesk.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/spadesk/config.yaml
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

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => {
        tracing::info!("No configuration file found, using defaults");
        Self::default()
      }
    };

    if let Ok(host) = std::env::var("FIRESTORE_EMULATOR_HOST") {
      config.firestore.emulator_host = Some(host);
    }

    config.validate()?;
    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("spadesk.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("spadesk").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self, serde_yaml::Error> {
    serde_yaml::from_str(contents)
  }

  fn validate(&self) -> Result<()> {
    if self.cache.page_size == 0 {
      return Err(eyre!("cache.page_size must be positive"));
    }
    if self.backend == Backend::Firestore && self.firestore.project_id.is_empty() {
      return Err(eyre!(
        "firestore.project_id is required. Set it in spadesk.yaml or use `backend: memory`."
      ));
    }
    Ok(())
  }

  /// Get the Firestore access token from environment variables.
  ///
  /// Checks SPADESK_FIRESTORE_TOKEN first, then GOOGLE_OAUTH_ACCESS_TOKEN as
  /// fallback. The emulator needs none.
  pub fn firestore_token() -> Option<String> {
    std::env::var("SPADESK_FIRESTORE_TOKEN")
      .or_else(|_| std::env::var("GOOGLE_OAUTH_ACCESS_TOKEN"))
      .ok()
      .filter(|t| !t.trim().is_empty())
  }
}
