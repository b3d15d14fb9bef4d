use crate::error::ConfigError;
use crate::types::SortOrder;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::level_filters::LevelFilter;
use url::Url;

pub const DEFAULT_TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
pub const DEFAULT_API_BASE: &str = "https://oauth.reddit.com";
pub const DEFAULT_OUTPUT_DIR: &str = "reddit_history";
pub const DEFAULT_LOG_LEVEL: &str = "INFO";
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 1050;
pub const DEFAULT_MAX_PAGES: u32 = 1000;
/// Largest page the listing endpoints will serve.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Logging setup resolved once at startup and handed to the subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogConfig {
    pub level: LevelFilter,
}

impl LogConfig {
    /// Accepts logback-style level names (`INFO`, `DEBUG`, `ALL`, `OFF`, ...).
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        let level = match name.trim().to_ascii_uppercase().as_str() {
            "ALL" | "TRACE" => LevelFilter::TRACE,
            "DEBUG" => LevelFilter::DEBUG,
            "INFO" => LevelFilter::INFO,
            "WARN" | "WARNING" => LevelFilter::WARN,
            "ERROR" => LevelFilter::ERROR,
            "OFF" => LevelFilter::OFF,
            _ => {
                return Err(ConfigError::InvalidValue {
                    field: "loglevel".to_string(),
                    value: name.to_string(),
                })
            }
        };
        Ok(Self { level })
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::INFO,
        }
    }
}

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .finish()
    }
}

/// Raw settings as they come from a TOML file or the command line.
///
/// Every field is optional so layers can be stacked with [`FileConfig::merge`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub loglevel: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub user: Option<String>,
    pub sort: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub page_size: Option<u32>,
    pub max_pages: Option<u32>,
    pub max_duration_secs: Option<u64>,
    pub request_delay_ms: Option<u64>,
    pub user_agent: Option<String>,
    pub token_url: Option<String>,
    pub api_base: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::FileNotFound {
                path: path.display().to_string(),
            },
            _ => ConfigError::InvalidFormat {
                details: format!("{}: {}", path.display(), e),
            },
        })?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Layers `overrides` on top of `self`; set fields in `overrides` win.
    pub fn merge(self, overrides: FileConfig) -> FileConfig {
        FileConfig {
            loglevel: overrides.loglevel.or(self.loglevel),
            username: overrides.username.or(self.username),
            password: overrides.password.or(self.password),
            client_id: overrides.client_id.or(self.client_id),
            client_secret: overrides.client_secret.or(self.client_secret),
            user: overrides.user.or(self.user),
            sort: overrides.sort.or(self.sort),
            output_dir: overrides.output_dir.or(self.output_dir),
            page_size: overrides.page_size.or(self.page_size),
            max_pages: overrides.max_pages.or(self.max_pages),
            max_duration_secs: overrides.max_duration_secs.or(self.max_duration_secs),
            request_delay_ms: overrides.request_delay_ms.or(self.request_delay_ms),
            user_agent: overrides.user_agent.or(self.user_agent),
            token_url: overrides.token_url.or(self.token_url),
            api_base: overrides.api_base.or(self.api_base),
        }
    }
}

/// Fully resolved settings for one archive run.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub credentials: Credentials,
    pub user: String,
    pub sort: SortOrder,
    pub log: LogConfig,
    pub output_dir: PathBuf,
    pub page_size: u32,
    pub max_pages: u32,
    pub max_duration: Option<Duration>,
    pub request_delay: Duration,
    pub user_agent: String,
    pub token_url: Url,
    pub api_base: Url,
}

impl AppConfig {
    pub fn resolve(raw: FileConfig) -> Result<Self, ConfigError> {
        let username = required(raw.username, "username")?;
        let password = required(raw.password, "password")?;
        let client_id = required(raw.client_id, "client_id")?;
        let client_secret = required(raw.client_secret, "client_secret")?;
        let user = required(raw.user, "user")?;

        let sort = match raw.sort {
            Some(s) => s.parse()?,
            None => SortOrder::default(),
        };
        let log = LogConfig::from_name(raw.loglevel.as_deref().unwrap_or(DEFAULT_LOG_LEVEL))?;
        let user_agent = raw
            .user_agent
            .unwrap_or_else(|| format!("reddit-history/0.1 by {}", username));

        let config = Self {
            credentials: Credentials {
                username,
                password,
                client_id,
                client_secret,
            },
            user,
            sort,
            log,
            output_dir: raw
                .output_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            page_size: raw.page_size.unwrap_or(MAX_PAGE_SIZE),
            max_pages: raw.max_pages.unwrap_or(DEFAULT_MAX_PAGES),
            max_duration: raw.max_duration_secs.map(Duration::from_secs),
            request_delay: Duration::from_millis(
                raw.request_delay_ms.unwrap_or(DEFAULT_REQUEST_DELAY_MS),
            ),
            user_agent,
            token_url: parse_url("token_url", raw.token_url.as_deref(), DEFAULT_TOKEN_URL)?,
            api_base: parse_url("api_base", raw.api_base.as_deref(), DEFAULT_API_BASE)?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.user.trim().is_empty() || self.user.contains('/') {
            return Err(ConfigError::InvalidValue {
                field: "user".to_string(),
                value: self.user.clone(),
            });
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::InvalidValue {
                field: "page_size".to_string(),
                value: self.page_size.to_string(),
            });
        }
        if self.max_pages == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_pages".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

fn required(value: Option<String>, field: &str) -> Result<String, ConfigError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingField {
            field: field.to_string(),
        })
}

fn parse_url(field: &str, value: Option<&str>, default: &str) -> Result<Url, ConfigError> {
    let raw = value.unwrap_or(default);
    Url::parse(raw).map_err(|e| ConfigError::InvalidValue {
        field: field.to_string(),
        value: format!("{} ({})", raw, e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> FileConfig {
        FileConfig {
            username: Some("me".to_string()),
            password: Some("hunter2".to_string()),
            client_id: Some("id".to_string()),
            client_secret: Some("secret".to_string()),
            user: Some("someone".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_applied() {
        let config = AppConfig::resolve(minimal()).unwrap();
        assert_eq!(config.sort, SortOrder::Top);
        assert_eq!(config.log.level, LevelFilter::INFO);
        assert_eq!(config.output_dir, PathBuf::from("reddit_history"));
        assert_eq!(config.page_size, 100);
        assert_eq!(config.max_pages, 1000);
        assert_eq!(config.request_delay, Duration::from_millis(1050));
        assert_eq!(config.user_agent, "reddit-history/0.1 by me");
        assert_eq!(config.api_base.as_str(), "https://oauth.reddit.com/");
        assert!(config.max_duration.is_none());
    }

    #[test]
    fn test_missing_required_field() {
        let mut raw = minimal();
        raw.client_secret = None;
        match AppConfig::resolve(raw) {
            Err(ConfigError::MissingField { field }) => assert_eq!(field, "client_secret"),
            other => panic!("Expected MissingField, got {:?}", other),
        }

        let mut raw = minimal();
        raw.user = Some("   ".to_string());
        assert!(matches!(
            AppConfig::resolve(raw),
            Err(ConfigError::MissingField { .. })
        ));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut raw = minimal();
        raw.page_size = Some(101);
        assert!(matches!(
            AppConfig::resolve(raw),
            Err(ConfigError::InvalidValue { .. })
        ));

        let mut raw = minimal();
        raw.max_pages = Some(0);
        assert!(matches!(
            AppConfig::resolve(raw),
            Err(ConfigError::InvalidValue { .. })
        ));

        let mut raw = minimal();
        raw.api_base = Some("not a url".to_string());
        assert!(matches!(
            AppConfig::resolve(raw),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_log_level_names() {
        assert_eq!(LogConfig::from_name("debug").unwrap().level, LevelFilter::DEBUG);
        assert_eq!(LogConfig::from_name("ALL").unwrap().level, LevelFilter::TRACE);
        assert_eq!(LogConfig::from_name("Off").unwrap().level, LevelFilter::OFF);
        assert!(LogConfig::from_name("loud").is_err());
    }

    #[test]
    fn test_merge_prefers_overrides() {
        let file = FileConfig::parse(
            r#"
            username = "from_file"
            sort = "new"
            request_delay_ms = 2000
            "#,
        )
        .unwrap();
        let cli = FileConfig {
            username: Some("from_cli".to_string()),
            ..Default::default()
        };

        let merged = file.merge(cli);
        assert_eq!(merged.username.as_deref(), Some("from_cli"));
        assert_eq!(merged.sort.as_deref(), Some("new"));
        assert_eq!(merged.request_delay_ms, Some(2000));
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let result = FileConfig::parse("colour = \"blue\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_credentials_debug_redacts_secrets() {
        let config = AppConfig::resolve(minimal()).unwrap();
        let debug = format!("{:?}", config.credentials);
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("\"secret\""));
        assert!(debug.contains("me"));
    }
}
