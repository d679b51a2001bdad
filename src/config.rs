use std::env;

use crate::error::ConfigError;

pub const DEFAULT_BIND: &str = "127.0.0.1:8080";
pub const DEFAULT_SEARCH_LIMIT: usize = 200_000;

/// Server settings read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind: String,
    /// Exploration cap for requests that do not bring their own. `None` is unlimited.
    pub search_limit: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            search_limit: Some(DEFAULT_SEARCH_LIMIT),
        }
    }
}

impl ServerConfig {
    /// Reads `TIMETABLE_BIND` and `TIMETABLE_SEARCH_LIMIT` (`0` disables the cap).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(bind) = lookup("TIMETABLE_BIND").filter(|b| !b.trim().is_empty()) {
            config.bind = bind.trim().to_string();
        }
        if let Some(raw) = lookup("TIMETABLE_SEARCH_LIMIT") {
            let limit: usize = raw.trim().parse().map_err(|_| ConfigError::InvalidNumber {
                name: "TIMETABLE_SEARCH_LIMIT",
                value: raw.clone(),
            })?;
            config.search_limit = (limit > 0).then_some(limit);
        }
        Ok(config)
    }
}
