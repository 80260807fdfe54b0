use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use chrono_tz::Tz;

use crate::clients::line_client::DEFAULT_API_BASE;
use crate::error::ConfigError;
use crate::models::time_spec::ZeroComponents;
use crate::tasks::recurrence::DEFAULT_MAX_JOBS;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DB_LOCATION: &str = "./data";
const DEFAULT_CALENDAR_URL: &str = "http://localhost:1234";
const DEFAULT_TIMEZONE: &str = "Asia/Tokyo";

/// Flat `KEY=value` file, consulted before the process environment.
#[derive(Debug, Default, Clone)]
pub struct AppConfig {
    values: HashMap<String, String>,
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut values = HashMap::new();
        for (idx, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
            let Some((key, value)) = trimmed.split_once('=') else {
                return Err(ConfigError::Line {
                    line: idx + 1,
                    content: line.to_string(),
                });
            };
            let key = key.trim();
            let mut value = value.trim().to_string();
            if value.len() >= 2
                && ((value.starts_with('"') && value.ends_with('"'))
                    || (value.starts_with('\'') && value.ends_with('\'')))
            {
                value = value[1..value.len() - 1].to_string();
            }
            values.insert(key.to_string(), value);
        }
        Ok(Self { values })
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    /// File value first, then the environment.
    pub fn lookup(&self, key: &str) -> Option<String> {
        self.get(key).or_else(|| env::var(key).ok())
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    pub db_location: PathBuf,
    pub channel_access_token: Option<String>,
    pub line_api_base: String,
    pub calendar_url: String,
    pub timezone: Tz,
    pub max_reminder_jobs: usize,
    pub zero_components: ZeroComponents,
}

impl Settings {
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let allow_zero: bool = parse_or(&lookup, "REMINDER_ALLOW_ZERO", false)?;
        let timezone_name = lookup("REMINDER_TIMEZONE").unwrap_or(DEFAULT_TIMEZONE.to_string());
        let timezone = Tz::from_str(&timezone_name).map_err(|_| ConfigError::Value {
            key: "REMINDER_TIMEZONE".to_string(),
            value: timezone_name.clone(),
        })?;

        Ok(Self {
            port: parse_or(&lookup, "PORT", DEFAULT_PORT)?,
            db_location: PathBuf::from(
                lookup("DB_LOCATION").unwrap_or(DEFAULT_DB_LOCATION.to_string()),
            ),
            channel_access_token: lookup("CHANNEL_ACCESS_TOKEN").filter(|t| !t.is_empty()),
            line_api_base: lookup("LINE_API_BASE").unwrap_or(DEFAULT_API_BASE.to_string()),
            calendar_url: lookup("CALENDAR_URL").unwrap_or(DEFAULT_CALENDAR_URL.to_string()),
            timezone,
            max_reminder_jobs: parse_or(&lookup, "MAX_REMINDER_JOBS", DEFAULT_MAX_JOBS)?,
            zero_components: if allow_zero {
                ZeroComponents::Allow
            } else {
                ZeroComponents::Reject
            },
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| config.lookup(key))
    }

    pub fn require_access_token(&self) -> Result<&str, ConfigError> {
        self.channel_access_token
            .as_deref()
            .ok_or_else(|| ConfigError::Missing("CHANNEL_ACCESS_TOKEN".to_string()))
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Value {
            key: key.to_string(),
            value: raw.clone(),
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(pairs: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn parses_comments_exports_and_quotes() {
        let config = AppConfig::parse(
            "# comment\n\nexport PORT=8080\nCALENDAR_URL=\"http://cal.example\"\nTOKEN='abc'\n",
        )
        .unwrap();
        assert_eq!(config.get("PORT").as_deref(), Some("8080"));
        assert_eq!(config.get("CALENDAR_URL").as_deref(), Some("http://cal.example"));
        assert_eq!(config.get("TOKEN").as_deref(), Some("abc"));
    }

    #[test]
    fn rejects_lines_without_assignment() {
        let err = AppConfig::parse("PORT=1\nnot a pair\n").unwrap_err();
        assert_eq!(
            err,
            ConfigError::Line {
                line: 2,
                content: "not a pair".to_string()
            }
        );
    }

    #[test]
    fn defaults_apply_when_unset() {
        let settings = settings(&[]).unwrap();
        assert_eq!(settings.port, 3000);
        assert_eq!(settings.timezone, chrono_tz::Asia::Tokyo);
        assert_eq!(settings.zero_components, ZeroComponents::Reject);
        assert_eq!(settings.db_location, PathBuf::from("./data"));
        assert!(settings.require_access_token().is_err());
    }

    #[test]
    fn malformed_values_are_errors() {
        assert!(matches!(
            settings(&[("PORT", "eighty")]),
            Err(ConfigError::Value { .. })
        ));
        assert!(matches!(
            settings(&[("REMINDER_TIMEZONE", "Mars/Olympus")]),
            Err(ConfigError::Value { .. })
        ));
    }

    #[test]
    fn zero_policy_is_opt_in() {
        let settings = settings(&[("REMINDER_ALLOW_ZERO", "true"), ("CHANNEL_ACCESS_TOKEN", "t")]).unwrap();
        assert_eq!(settings.zero_components, ZeroComponents::Allow);
        assert_eq!(settings.require_access_token().unwrap(), "t");
    }
}
