use arkive_core::MergePolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Remote feed configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SyncConfig {
    /// Feed server URL (e.g., "ws://localhost:8080/feed")
    pub feed_url: Option<String>,
    /// How remote snapshots override local records (default: remote-wins)
    #[serde(default)]
    pub merge_policy: MergePolicy,
}

impl SyncConfig {
    pub fn is_configured(&self) -> bool {
        self.feed_url.is_some()
    }
}

/// UI preferences persisted alongside the configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Preferences {
    pub dark_mode: bool,
    pub sidebar_collapsed: bool,
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Path to the SQLite database
    pub database_path: ConfigValue<PathBuf>,
    /// User recorded as the author of new receipts, expenses and uploads
    pub created_by: ConfigValue<String>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
    pub sync: SyncConfig,
    pub preferences: Preferences,
    /// Where preference changes are written back to
    #[serde(skip)]
    target_file: PathBuf,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    database_path: Option<PathBuf>,
    created_by: Option<String>,
    sync: Option<SyncConfig>,
    preferences: Option<Preferences>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let default_db_path = Self::default_data_dir().join("arkive.db");

        let mut database_path = ConfigValue::new(default_db_path, ConfigSource::Default);
        let mut created_by = ConfigValue::new("default".to_string(), ConfigSource::Default);
        let mut config_file = None;
        let mut sync = SyncConfig::default();
        let mut preferences = Preferences::default();

        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(db_path) = file_config.database_path {
                // Resolve relative paths against config file's directory
                let resolved_path = if db_path.is_relative() {
                    path.parent().map(|p| p.join(&db_path)).unwrap_or(db_path)
                } else {
                    db_path
                };
                database_path = ConfigValue::new(resolved_path, ConfigSource::File);
            }
            if let Some(user) = file_config.created_by {
                created_by = ConfigValue::new(user, ConfigSource::File);
            }
            if let Some(sync_config) = file_config.sync {
                sync = sync_config;
            }
            if let Some(prefs) = file_config.preferences {
                preferences = prefs;
            }
        }

        if let Ok(db_path) = std::env::var("ARKIVE_DATABASE_PATH") {
            database_path = ConfigValue::new(PathBuf::from(db_path), ConfigSource::Environment);
        }
        if let Ok(user) = std::env::var("ARKIVE_CREATED_BY") {
            created_by = ConfigValue::new(user, ConfigSource::Environment);
        }
        if let Ok(url) = std::env::var("ARKIVE_FEED_URL") {
            sync.feed_url = Some(url);
        }
        if let Ok(policy) = std::env::var("ARKIVE_MERGE_POLICY") {
            sync.merge_policy = policy
                .parse()
                .map_err(|e: String| ConfigError::InvalidValue("ARKIVE_MERGE_POLICY", e))?;
        }

        Ok(Self {
            database_path,
            created_by,
            config_file,
            sync,
            preferences,
            target_file: path,
        })
    }

    /// Stores new preferences and writes them back to the config file.
    ///
    /// Other keys in the file are preserved. The file is created if it does
    /// not exist yet.
    pub fn save_preferences(&mut self, preferences: Preferences) -> Result<(), ConfigError> {
        let path = self.target_file.clone();

        let mut document = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            serde_yaml::from_str::<serde_yaml::Value>(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?
        } else {
            serde_yaml::Value::Null
        };

        if !document.is_mapping() {
            document = serde_yaml::Value::Mapping(serde_yaml::Mapping::new());
        }
        let prefs_value = serde_yaml::to_value(preferences)
            .map_err(|e| ConfigError::ParseError(path.clone(), e))?;
        if let Some(mapping) = document.as_mapping_mut() {
            mapping.insert("preferences".into(), prefs_value);
        }

        let contents = serde_yaml::to_string(&document)
            .map_err(|e| ConfigError::ParseError(path.clone(), e))?;
        write_file(&path, &contents)?;

        tracing::debug!("Saved preferences to {}", path.display());
        self.preferences = preferences;
        self.config_file = Some(path);
        Ok(())
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/arkive/
    /// - macOS: ~/Library/Application Support/arkive/
    /// - Windows: %APPDATA%/arkive/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("arkive")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/arkive/
    /// - macOS: ~/Library/Application Support/arkive/
    /// - Windows: %APPDATA%/arkive/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("arkive")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError(path.into(), e))?;
    }
    std::fs::write(path, contents).map_err(|e| ConfigError::WriteError(path.into(), e))
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    WriteError(PathBuf, std::io::Error),
    InvalidValue(&'static str, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::WriteError(path, e) => {
                write!(f, "Failed to write config file '{}': {}", path.display(), e)
            }
            ConfigError::InvalidValue(key, e) => write!(f, "Invalid {}: {}", key, e),
        }
    }
}

impl std::error::Error for ConfigError {}
