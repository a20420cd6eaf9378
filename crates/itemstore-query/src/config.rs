//! Query engine configuration.
//!
//! Settings are read from `query.toml` in the platform configuration
//! directory (`~/.config/itemstore/query.toml` on Linux). The
//! `ITEMSTORE_QUERY_CONFIG` environment variable overrides the path. A
//! missing file yields the defaults.
//!
//! ```toml
//! version = 1
//! page_size = 100
//! count_page_size = 1000
//! depth = "shallow"
//! ```

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use itemstore_api_rs::models::TraversalDepth;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Current config file version. Increment when making breaking changes to schema.
const CONFIG_VERSION: u32 = 1;

/// Number of items the store returns per search request by default.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Page size for id-only passes, which are cheap per item.
pub const DEFAULT_ID_PAGE_SIZE: usize = 1000;

/// Environment variable overriding the config file path.
pub const CONFIG_PATH_ENV: &str = "ITEMSTORE_QUERY_CONFIG";

const CONFIG_FILENAME: &str = "query.toml";
const QUALIFIER: &str = "";
const ORGANIZATION: &str = "";
const APPLICATION: &str = "itemstore";

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to determine the platform config directory.
    #[error("failed to determine config directory: no valid home directory found")]
    NoConfigDir,

    /// I/O error during file read.
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file is not valid TOML or has fields of the wrong type.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A setting is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Settings applied to every query created with them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Config schema version for migrations.
    pub version: u32,

    /// Items requested per page.
    pub page_size: usize,

    /// Items requested per page for id-only passes (`delete`).
    pub count_page_size: usize,

    /// Folder traversal depth.
    pub depth: TraversalDepth,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            page_size: DEFAULT_PAGE_SIZE,
            count_page_size: DEFAULT_ID_PAGE_SIZE,
            depth: TraversalDepth::default(),
        }
    }
}

impl QueryConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: QueryConfig = toml::from_str(content)?;
        config.validated()
    }

    /// Loads the config from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Loads the config from the default location, falling back to the
    /// defaults when no file exists.
    pub fn load_default() -> Result<Self> {
        let path = Self::default_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(&path)
    }

    /// Returns the config file path, honoring `ITEMSTORE_QUERY_CONFIG`.
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(path) = env::var(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }
        let dirs = ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION)
            .ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join(CONFIG_FILENAME))
    }

    /// Renders the config as TOML.
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    fn validated(mut self) -> Result<Self> {
        if self.page_size == 0 {
            return Err(ConfigError::Invalid("page_size must be at least 1".to_string()));
        }
        if self.count_page_size == 0 {
            return Err(ConfigError::Invalid(
                "count_page_size must be at least 1".to_string(),
            ));
        }
        if self.version > CONFIG_VERSION {
            return Err(ConfigError::Invalid(format!(
                "config version {} is newer than supported version {}",
                self.version, CONFIG_VERSION
            )));
        }
        // Older schemas carry no fields that need migrating.
        self.version = CONFIG_VERSION;
        Ok(self)
    }
}
