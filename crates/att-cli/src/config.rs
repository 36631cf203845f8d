//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use att_core::{Identity, OrgId, UserId};
use att_engine::EngineConfig;
use chrono_tz::Tz;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,

    /// Worker the CLI acts as.
    pub user_id: Option<String>,

    /// Organization owning the work locations.
    pub org_id: String,

    /// IANA zone for schedule times. Defaults to the system zone.
    pub timezone: Option<String>,

    /// JSON file holding the latest position fix, e.g.
    /// `{"latitude": -6.2, "longitude": 106.8}`.
    pub location_file: Option<PathBuf>,

    #[serde(default)]
    pub engine: EngineConfig,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("user_id", &self.user_id)
            .field("org_id", &self.org_id)
            .field("timezone", &self.timezone)
            .field("location_file", &self.location_file)
            .finish_non_exhaustive()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("att.db"),
            user_id: None,
            org_id: "default".to_string(),
            timezone: None,
            location_file: None,
            engine: EngineConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from default locations.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(None)
    }

    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (ATT_*, ATT_ENGINE__* for nested keys)
        figment = figment.merge(Env::prefixed("ATT_").split("__"));

        figment.extract()
    }

    /// The caller identity from `user_id` and `org_id`.
    pub fn identity(&self) -> Result<Identity> {
        let user = self
            .user_id
            .as_deref()
            .context("no user configured (set user_id in config.toml or ATT_USER_ID)")?;
        Ok(Identity::worker(
            UserId::new(user).context("invalid user_id")?,
            OrgId::new(self.org_id.as_str()).context("invalid org_id")?,
        ))
    }

    /// Resolves the schedule timezone, falling back to the system zone and
    /// then UTC.
    pub fn timezone(&self) -> Result<Tz> {
        if let Some(name) = &self.timezone {
            return name
                .parse::<Tz>()
                .map_err(|err| anyhow::anyhow!("invalid timezone {name}: {err}"));
        }
        let system = iana_time_zone::get_timezone().ok();
        Ok(system
            .and_then(|name| name.parse::<Tz>().ok())
            .unwrap_or(Tz::UTC))
    }

    /// Engine settings with the resolved timezone applied.
    pub fn engine(&self) -> Result<EngineConfig> {
        Ok(EngineConfig {
            timezone: self.timezone()?,
            ..self.engine.clone()
        })
    }
}

/// Returns the platform-specific config directory for att.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("att"))
}

/// Returns the platform-specific data directory for att.
///
/// On Linux: `~/.local/share/att`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("att"))
}
