//! calgrid configuration.

use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{CalgridError, CalgridResult};
use crate::event::CalendarId;
use crate::grid::WeekStart;

static DEFAULT_EVENT_DURATION: &str = "1h";

/// Configuration at ~/.config/calgrid/config.toml
///
/// Every key is optional; missing keys fall back to device defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalgridConfig {
    /// Where the calendar store snapshot lives.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_path: Option<String>,

    /// IANA zone used for display and for new events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,

    #[serde(default)]
    pub week_start: WeekStart,

    /// Length of events created without an explicit end, e.g. "30m".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_duration: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_calendar: Option<i64>,
}

impl CalgridConfig {
    pub fn config_path() -> CalgridResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| CalgridError::Config("Could not determine config directory".into()))?
            .join("calgrid");

        Ok(config_dir.join("config.toml"))
    }

    /// Load the config from the default location, creating a commented
    /// default file on first run.
    pub fn load() -> CalgridResult<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> CalgridResult<Self> {
        if !path.exists() {
            Self::create_default_config(path)?;
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| CalgridError::Config(format!("Could not read {}: {e}", path.display())))?;

        toml::from_str(&content)
            .map_err(|e| CalgridError::Config(format!("Invalid config {}: {e}", path.display())))
    }

    /// The store snapshot path with `~` expanded.
    pub fn store_path(&self) -> CalgridResult<PathBuf> {
        match &self.store_path {
            Some(path) => Ok(PathBuf::from(shellexpand::tilde(path).into_owned())),
            None => {
                let data_dir = dirs::data_dir().ok_or_else(|| {
                    CalgridError::Config("Could not determine data directory".into())
                })?;
                Ok(data_dir.join("calgrid").join("store.json"))
            }
        }
    }

    /// The configured zone, or the device zone when unset.
    pub fn timezone(&self) -> CalgridResult<Tz> {
        match &self.timezone {
            Some(name) => name
                .parse::<Tz>()
                .map_err(|_| CalgridError::TimeZone(name.clone())),
            None => Ok(local_timezone()),
        }
    }

    pub fn event_duration(&self) -> CalgridResult<chrono::Duration> {
        let raw = self.event_duration.as_deref().unwrap_or(DEFAULT_EVENT_DURATION);
        parse_duration(raw)
    }

    pub fn default_calendar(&self) -> Option<CalendarId> {
        self.default_calendar.map(CalendarId)
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> CalgridResult<()> {
        let contents = format!(
            "\
# calgrid configuration

# Where the calendar store is kept:
# store_path = \"~/.local/share/calgrid/store.json\"

# Time zone for display and new events (defaults to the system zone):
# timezone = \"Europe/Berlin\"

# First day of the week in the month grid (sunday or monday):
# week_start = \"sunday\"

# Length of new events:
# event_duration = \"{DEFAULT_EVENT_DURATION}\"

# Calendar id used for new events (defaults to the first calendar):
# default_calendar = 1
"
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CalgridError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| CalgridError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }
}

/// Parse a human-readable duration such as "45m" or "1h 30m".
pub fn parse_duration(input: &str) -> CalgridResult<chrono::Duration> {
    let std_dur = humantime::parse_duration(input)
        .map_err(|e| CalgridError::Config(format!("Invalid duration '{input}': {e}")))?;
    chrono::Duration::from_std(std_dur)
        .map_err(|e| CalgridError::Config(format!("Duration '{input}' out of range: {e}")))
}

/// The device time zone, UTC when it cannot be determined.
pub fn local_timezone() -> Tz {
    match iana_time_zone::get_timezone() {
        Ok(name) => name.parse().unwrap_or_else(|_| {
            warn!(zone = %name, "Unknown system time zone, using UTC");
            Tz::UTC
        }),
        Err(e) => {
            warn!("Could not determine system time zone, using UTC: {e}");
            Tz::UTC
        }
    }
}
