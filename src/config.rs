//! Configuration file handling for SpendWise.
//!
//! The configuration file is stored at `$SPENDWISE_HOME/config.json` and contains the location of
//! the merchant map, the matching threshold, backup settings and the settings for the online
//! signal sources.

use crate::backup::Backup;
use crate::error::{ErrorType, IntoResult, Res};
use crate::{utils, Result};
use anyhow::{bail, ensure, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

const APP_NAME: &str = "spendwise";
const CONFIG_VERSION: u8 = 1;
const BACKUP_COPIES: u32 = 5;
const MATCH_THRESHOLD: u8 = 85;
const BACKUPS: &str = ".backups";
const CONFIG_JSON: &str = "config.json";
const MERCHANT_MAP_CSV: &str = "merchant_map.csv";

const TIMEOUT_SECS: u64 = 6;
const DELAY_MS: u64 = 200;
const SUMMARY_CHARS: usize = 1000;
const USER_AGENT: &str = "SpendWise/1.0 (personal finance categorizer)";
const PLACE_ENDPOINT: &str = "https://nominatim.openstreetmap.org/search";
const SUMMARY_ENDPOINT: &str = "https://en.wikipedia.org/w/api.php";

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$SPENDWISE_HOME` and from there it loads `$SPENDWISE_HOME/config.json`. It
/// provides paths to other items that are either configurable or are expected in a certain
/// location within the home directory.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    backups: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
}

impl Config {
    /// Creates the home directory and its `.backups` subdirectory, and writes a `config.json`
    /// with default settings. An existing `config.json` is kept as is and loaded instead.
    ///
    /// # Errors
    /// - Returns a `Config` error if any file operations fail or an existing config is invalid.
    pub async fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        Self::create_inner(dir.into())
            .await
            .pub_result(ErrorType::Config)
    }

    async fn create_inner(maybe_relative: PathBuf) -> Res<Self> {
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the spendwise home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;

        let backups = root.join(BACKUPS);
        utils::make_dir(&backups).await?;

        let config_path = root.join(CONFIG_JSON);
        let config_file = if config_path.is_file() {
            debug!("Keeping the existing {}", config_path.display());
            ConfigFile::load(&config_path).await?
        } else {
            let config_file = ConfigFile::default();
            config_file.save(&config_path).await?;
            config_file
        };

        Ok(Self {
            root,
            backups,
            config_path,
            config_file,
        })
    }

    /// This will
    /// - validate that the home directory exists and that the config file exists
    /// - load and validate the config file
    /// - validate that the backups directory exists
    /// - return the loaded configuration object
    pub async fn load(spendwise_home: impl Into<PathBuf>) -> Result<Self> {
        Self::load_inner(spendwise_home.into())
            .await
            .pub_result(ErrorType::Config)
    }

    async fn load_inner(maybe_relative: PathBuf) -> Res<Self> {
        let root = utils::canonicalize(&maybe_relative)
            .await
            .context("SpendWise home is missing, run 'spendwise init' first")?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!(
                "The config file is missing '{}', run 'spendwise init' first",
                config_path.display()
            )
        }
        let config_file = ConfigFile::load(&config_path).await?;

        let config = Self {
            backups: root.join(BACKUPS),
            root,
            config_path,
            config_file,
        };
        if !config.backups.is_dir() {
            bail!(
                "The backups directory is missing '{}'",
                config.backups.display()
            )
        }
        Ok(config)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn backups(&self) -> &Path {
        &self.backups
    }

    pub fn backup_copies(&self) -> u32 {
        self.config_file.backup_copies
    }

    /// Creates a new `Backup` instance for managing backup files.
    pub fn backup(&self) -> Backup {
        Backup::new(self)
    }

    /// The merchant map path. Relative paths in the config file are resolved against the home
    /// directory.
    pub fn merchant_map_path(&self) -> PathBuf {
        let p = &self.config_file.merchant_map;
        if p.is_absolute() {
            return p.clone();
        }
        self.root.join(p)
    }

    pub fn match_threshold(&self) -> u8 {
        self.config_file.match_threshold
    }

    /// Whether a category guessed from online sources is accepted without asking.
    pub fn auto_accept_external(&self) -> bool {
        self.config_file.auto_accept_external
    }

    pub fn online(&self) -> &OnlineSettings {
        &self.config_file.online
    }

    #[cfg(test)]
    pub(crate) fn set_auto_accept_external(&mut self, value: bool) {
        self.config_file.auto_accept_external = value;
    }

    #[cfg(test)]
    pub(crate) fn set_online_enabled(&mut self, value: bool) {
        self.config_file.online.enabled = value;
    }
}

/// Represents the serialization and deserialization format of the configuration file. Every field
/// except `app_name` may be omitted and then takes its default.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "spendwise",
///   "config_version": 1,
///   "merchant_map": "merchant_map.csv",
///   "match_threshold": 85,
///   "auto_accept_external": true,
///   "backup_copies": 5,
///   "online": {
///     "enabled": true,
///     "timeout_secs": 6,
///     "delay_ms": 200,
///     "summary_chars": 1000,
///     "user_agent": "SpendWise/1.0 (personal finance categorizer)",
///     "place_endpoint": "https://nominatim.openstreetmap.org/search",
///     "summary_endpoint": "https://en.wikipedia.org/w/api.php"
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(default)]
struct ConfigFile {
    /// Application name, should always be "spendwise"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// Path to the merchant map CSV, relative to the home directory or absolute
    merchant_map: PathBuf,

    /// Minimum similarity score (0-100) for a merchant map lookup to count as a match
    match_threshold: u8,

    /// Accept online guesses without asking
    auto_accept_external: bool,

    /// Number of backup copies to keep
    backup_copies: u32,

    online: OnlineSettings,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            merchant_map: PathBuf::from(MERCHANT_MAP_CSV),
            match_threshold: MATCH_THRESHOLD,
            auto_accept_external: true,
            backup_copies: BACKUP_COPIES,
            online: OnlineSettings::default(),
        }
    }
}

impl ConfigFile {
    /// Loads and validates a ConfigFile from the specified path.
    async fn load(path: impl AsRef<Path>) -> Res<Self> {
        let path = path.as_ref();
        let content = utils::read(path).await?;
        let config: ConfigFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file at {}", path.display()))?;
        Ok(config)
    }

    fn validate(&self) -> Res<()> {
        ensure!(
            self.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            self.app_name
        );
        ensure!(
            self.match_threshold <= 100,
            "match_threshold must be between 0 and 100, got {}",
            self.match_threshold
        );
        ensure!(
            !self.merchant_map.as_os_str().is_empty(),
            "merchant_map must not be empty"
        );
        self.online.validate()
    }

    /// Saves the ConfigFile to the specified path.
    async fn save(&self, path: impl AsRef<Path>) -> Res<()> {
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(path.as_ref(), data)
            .await
            .context("Unable to write config file")
    }
}

/// Settings for the online signal sources.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct OnlineSettings {
    enabled: bool,
    timeout_secs: u64,
    delay_ms: u64,
    summary_chars: usize,
    user_agent: String,
    place_endpoint: String,
    summary_endpoint: String,
}

impl Default for OnlineSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: TIMEOUT_SECS,
            delay_ms: DELAY_MS,
            summary_chars: SUMMARY_CHARS,
            user_agent: USER_AGENT.to_string(),
            place_endpoint: PLACE_ENDPOINT.to_string(),
            summary_endpoint: SUMMARY_ENDPOINT.to_string(),
        }
    }
}

impl OnlineSettings {
    /// Whether online lookups are on unless the command line turns them off.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// The per-request timeout.
    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    /// The fixed pause before every external request.
    pub fn delay_ms(&self) -> u64 {
        self.delay_ms
    }

    pub fn summary_chars(&self) -> usize {
        self.summary_chars
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn place_endpoint(&self) -> &str {
        &self.place_endpoint
    }

    pub fn summary_endpoint(&self) -> &str {
        &self.summary_endpoint
    }

    fn validate(&self) -> Res<()> {
        ensure!(self.timeout_secs > 0, "online.timeout_secs must be positive");
        ensure!(
            !self.user_agent.trim().is_empty(),
            "online.user_agent must not be blank"
        );
        Url::parse(&self.place_endpoint)
            .with_context(|| format!("Invalid online.place_endpoint '{}'", self.place_endpoint))?;
        Url::parse(&self.summary_endpoint).with_context(|| {
            format!(
                "Invalid online.summary_endpoint '{}'",
                self.summary_endpoint
            )
        })?;
        Ok(())
    }
}
