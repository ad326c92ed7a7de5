//! Configuration loading with figment.
//!
//! # Sources (lowest to highest priority)
//!
//! 1. Built-in defaults
//! 2. Programmatic merges ([`ConfigLoader::merge`])
//! 3. Profile-specific file (`weave.{profile}.toml`, `.yaml`, `.json`)
//! 4. Main file (`weave.toml` / `weave.yaml` / `weave.json`)
//! 5. Environment variables (`WEAVE_*`, `__` separates nesting levels)
//!
//! TOML and YAML files are only recognised with the `toml-config` and
//! `yaml-config` features; JSON is always available.
//!
//! - `WEAVE_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//! - `WEAVE_CONTAINER__DETECT_CYCLES=false` → `container.detect_cycles = false`
//!
//! ```rust,ignore
//! let config = ConfigLoader::new()
//!     .profile("production")
//!     .file("./config/weave.toml")
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized};
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::WeaveConfig;
use super::validation::validate_config;

/// Prefix of environment variables read into the configuration.
pub const ENV_PREFIX: &str = "WEAVE_";

/// Environment-specific configuration profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Profile {
    #[default]
    Development,
    Production,
    Custom(String),
}

impl Profile {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Reads `WEAVE_PROFILE`, defaulting to development.
    pub fn from_env() -> Self {
        std::env::var("WEAVE_PROFILE")
            .map(|p| Self::parse(&p))
            .unwrap_or_default()
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Multi-source configuration loader.
pub struct ConfigLoader {
    figment: Figment,
    profile: Profile,
    search_paths: Vec<PathBuf>,
    load_env: bool,
    /// Loaded instead of searching when set.
    config_file: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            figment: Figment::new(),
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
        }
    }

    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Profile::parse(&profile.into());
        self
    }

    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    pub fn with_current_dir(self) -> Self {
        match std::env::current_dir() {
            Ok(cwd) => self.search_path(cwd),
            Err(_) => self,
        }
    }

    /// Adds `<user config dir>/weave` to the search paths.
    pub fn with_user_config_dir(self) -> Self {
        match dirs::config_dir() {
            Some(dir) => self.search_path(dir.join("weave")),
            None => self,
        }
    }

    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Supplies base values; files and environment variables override them.
    pub fn merge(mut self, config: WeaveConfig) -> Self {
        self.figment = self.figment.merge(Serialized::defaults(config));
        self
    }

    pub fn load(self) -> ConfigResult<WeaveConfig> {
        let profile = self.profile.clone();
        let config: WeaveConfig = self.build_figment()?.extract()?;
        validate_config(&config)?;

        debug!(
            profile = %profile,
            logging_level = %config.logging.level,
            plugins = config.container.plugins.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    fn build_figment(mut self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(WeaveConfig::default()))
            .merge(std::mem::take(&mut self.figment));

        if let Some(path) = self.config_file.take() {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path));
            }
            info!(path = %path.display(), "Loading configuration file");
            figment = merge_config_file(figment, &path)?;
        } else {
            figment = self.load_config_files(figment);
        }

        if self.load_env {
            trace!(prefix = ENV_PREFIX, "Loading environment variables");
            figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        }

        Ok(figment)
    }

    fn resolve_search_paths(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }
        let mut paths = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd);
        }
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("weave"));
        }
        paths
    }

    /// Looks for `weave.<ext>` in every search path, in order.  The first
    /// directory holding a main file wins; its profile file is merged first.
    fn load_config_files(&self, mut figment: Figment) -> Figment {
        for dir in self.resolve_search_paths() {
            for ext in supported_extensions() {
                let profile_path = dir.join(format!("weave.{}.{ext}", self.profile));
                let main_path = dir.join(format!("weave.{ext}"));
                if !main_path.exists() {
                    continue;
                }

                if profile_path.exists() {
                    debug!(path = %profile_path.display(), "Loading profile-specific config");
                    figment = merge_by_extension(figment, &profile_path, ext);
                }
                info!(path = %main_path.display(), "Loading configuration file");
                return merge_by_extension(figment, &main_path, ext);
            }
        }
        warn!("No configuration file found, using defaults");
        figment
    }
}

/// File extensions recognised with the enabled features, in search order.
fn supported_extensions() -> Vec<&'static str> {
    let mut exts = Vec::new();
    #[cfg(feature = "toml-config")]
    exts.push("toml");
    #[cfg(feature = "yaml-config")]
    exts.extend(["yaml", "yml"]);
    exts.push("json");
    exts
}

fn merge_by_extension(figment: Figment, path: &Path, ext: &str) -> Figment {
    match ext {
        #[cfg(feature = "toml-config")]
        "toml" => figment.merge(Toml::file(path)),
        #[cfg(feature = "yaml-config")]
        "yaml" | "yml" => figment.merge(Yaml::file(path)),
        _ => figment.merge(Json::file(path)),
    }
}

/// Merges one file, dispatching on its extension.
fn merge_config_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    if supported_extensions().contains(&ext) {
        Ok(merge_by_extension(figment, path, ext))
    } else {
        Err(ConfigError::UnsupportedFormat(ext.to_string()))
    }
}

/// Loads configuration from the current directory and the environment.
pub fn load_config() -> ConfigResult<WeaveConfig> {
    ConfigLoader::new().with_current_dir().load()
}

/// Loads configuration from one file plus the environment.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<WeaveConfig> {
    ConfigLoader::new().file(path).load()
}
