use crate::error::{PortalError, Result};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing_subscriber::fmt::MakeWriter;

const DEFAULT_LOG_FILTER: &str = "cynosure=info";

/// Main configuration structure loaded from cynosure.toml and environment variables
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub festival: FestivalConfig,
    pub presence: PresenceConfig,
    pub auth: AuthConfig,
    pub calendar: CalendarConfig,
    /// Tracing filter directive, e.g. `cynosure=debug`
    pub log_level: Option<String>,
}

/// Locations of the read-only catalog and the mutable store document
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PathsConfig {
    pub catalog: PathBuf,
    pub store: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            catalog: PathBuf::from("cynosure_events.json"),
            store: PathBuf::from("participants_store.json"),
        }
    }
}

/// The closed two-day festival calendar and scheduling defaults
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FestivalConfig {
    pub day_one: NaiveDate,
    pub day_two: NaiveDate,
    /// Start time-of-day used when only the day is known
    pub default_start: NaiveTime,
    /// Duration used when no end time can be derived
    pub default_duration_minutes: i64,
}

impl Default for FestivalConfig {
    fn default() -> Self {
        Self {
            day_one: NaiveDate::from_ymd_opt(2025, 9, 26).unwrap_or_default(),
            day_two: NaiveDate::from_ymd_opt(2025, 9, 27).unwrap_or_default(),
            default_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            default_duration_minutes: 120,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PresenceConfig {
    pub window_minutes: i64,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self { window_minutes: 5 }
    }
}

/// Shared admin password. Compared verbatim; not a security boundary.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    pub admin_password: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CalendarConfig {
    pub uid_domain: String,
    pub description_limit: usize,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            uid_domain: "cynosure".to_string(),
            description_limit: 1800,
        }
    }
}

impl Config {
    /// Load configuration from TOML file and environment variables.
    /// Uses CYNOSURE_CONFIG or defaults to "cynosure.toml".
    pub fn load() -> Result<Self> {
        if let Ok(env_path) = std::env::var("CYNOSURE_ENV_FILE") {
            let _ = dotenvy::from_path(env_path);
        } else {
            let _ = dotenvy::dotenv();
        }

        let config_path =
            std::env::var("CYNOSURE_CONFIG").unwrap_or_else(|_| "cynosure.toml".to_string());

        let mut config: Config = if let Ok(content) = std::fs::read_to_string(&config_path) {
            Self::from_toml(&content)?
        } else {
            tracing::warn!("Config file {} not found, using defaults", config_path);
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// [`Config::load`] under a temporary subscriber writing to `make_writer`,
    /// so warnings raised while loading are not lost before the configured
    /// filter is installed. The filter comes from `CYNOSURE_LOG` or the default.
    pub fn load_logged<W>(make_writer: W) -> Result<Self>
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let filter =
            std::env::var("CYNOSURE_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string());
        let bootstrap = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(make_writer)
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(bootstrap, Self::load)
    }

    /// Parse a TOML document; missing sections fall back to defaults
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("CYNOSURE_CATALOG") {
            self.paths.catalog = PathBuf::from(path);
            tracing::debug!("CYNOSURE_CATALOG env override applied");
        }
        if let Ok(path) = std::env::var("CYNOSURE_STORE") {
            self.paths.store = PathBuf::from(path);
            tracing::debug!("CYNOSURE_STORE env override applied");
        }
        if let Ok(password) = std::env::var("CYNOSURE_ADMIN_PASSWORD") {
            self.auth.admin_password = password;
        }
        if let Ok(level) = std::env::var("CYNOSURE_LOG") {
            self.log_level = Some(level);
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.festival.day_two <= self.festival.day_one {
            return Err(PortalError::Config {
                message: format!(
                    "festival.day_two ({}) must come after festival.day_one ({})",
                    self.festival.day_two, self.festival.day_one
                ),
            });
        }
        if self.festival.default_duration_minutes <= 0 {
            return Err(PortalError::Config {
                message: "festival.default_duration_minutes must be > 0".into(),
            });
        }
        if self.presence.window_minutes <= 0 {
            return Err(PortalError::Config {
                message: "presence.window_minutes must be > 0".into(),
            });
        }
        if self.auth.admin_password.is_empty() {
            tracing::warn!("No admin password configured; admin login is disabled");
        }
        Ok(())
    }

    pub fn log_filter(&self) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
    }
}
