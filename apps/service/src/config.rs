use std::collections::{HashMap, HashSet};
use std::{env, fmt, fs, path};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read { path: path::PathBuf, source: std::io::Error },
    #[error("failed to write config {path}: {source}")]
    Write { path: path::PathBuf, source: std::io::Error },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("no config path available (set XDG_CONFIG_HOME or HOME)")]
    PathUnavailable,
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: impl Into<String>, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub monitor: MonitorSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub zeromq: ZeroMQ,
    /// Pushover credentials keyed by account name
    #[serde(default)]
    pub pushover: HashMap<String, PushoverAccount>,
    #[serde(default)]
    pub sites: Vec<SiteConfig>,
    #[serde(default)]
    pub users: Vec<UserConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    pub tick_seconds: u64,
    pub confirmation_delay_ms: u64,
    pub user_agent: String,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            tick_seconds: 10,
            confirmation_delay_ms: 500,
            user_agent: concat!("sitewatch/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub format: Option<String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { level: "info".into(), format: None }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    #[default]
    Console,
    Libsql { path: path::PathBuf },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZeroMQ {
    pub bind: String,
    pub port: u16,
}

impl Default for ZeroMQ {
    fn default() -> Self {
        Self { bind: "*".into(), port: 5556 }
    }
}

impl ZeroMQ {
    pub fn endpoint(&self) -> String {
        format!("tcp://{}:{}", self.bind, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushoverAccount {
    pub user_token: String,
    pub app_token: String,
    #[serde(default = "default_pushover_api")]
    pub api_url: String,
}

fn default_pushover_api() -> String {
    "https://api.pushover.net/1/messages.json".to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteKind {
    #[default]
    Http,
    Https,
}

/// Either one required substring or a set that must all be present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentRequirement {
    Single(String),
    All(Vec<String>),
}

impl ContentRequirement {
    /// Empty strings and empty lists mean no requirement.
    pub fn normalized(self) -> Option<Self> {
        match self {
            ContentRequirement::Single(s) if s.is_empty() => None,
            ContentRequirement::All(v) if v.is_empty() => None,
            other => Some(other),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub name: String,
    pub url: String,
    #[serde(rename = "type", default)]
    pub kind: SiteKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<ContentRequirement>,
    /// Check interval in seconds
    pub interval: u64,
    /// Request timeout in seconds
    pub timeout: u64,
    #[serde(default, alias = "downtime")]
    pub quiet_hours: Vec<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    pub username: String,
    #[serde(default)]
    pub contact_methods: Vec<ContactMethod>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContactMethod {
    Base,
    Pushover {
        account: String,
        #[serde(default, alias = "devicename")]
        device: Option<String>,
        #[serde(default)]
        quiet_hours: Vec<u32>,
    },
    Zeromq {
        #[serde(default = "default_topic")]
        topic: String,
        #[serde(default)]
        quiet_hours: Vec<u32>,
    },
}

fn default_topic() -> String {
    "sitewatch".to_string()
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

/// Get default config path ($XDG_CONFIG_HOME/sitewatch/config.toml or
/// $HOME/.config/...)
fn default_config_path() -> Result<path::PathBuf, ConfigError> {
    let path = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Some(home_dir) = env::home_dir() {
        home_dir.join(".config")
    } else {
        return Err(ConfigError::PathUnavailable);
    };

    Ok(path.join("sitewatch/config.toml"))
}

fn check_hours(field: &str, hours: &[u32]) -> Result<(), ConfigError> {
    match hours.iter().find(|h| **h > 23) {
        Some(h) => Err(invalid(field, format!("hour {h} is outside 0..=23"))),
        None => Ok(()),
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_title_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str| {
                writeln!(f, "{:indent$}{}", "", label, indent = level * 2)
            }
        };

        let write_title_1 = write_title_indented(1);
        let write_title_2 = write_title_indented(2);
        let write_1 = write_indented(1);
        let write_2 = write_indented(2);

        writeln!(f, "Current Monitor Configuration:")?;
        write_title_1(f, "Monitor")?;
        write_1(f, "Tick", &format!("{}s", self.monitor.tick_seconds))?;
        write_1(f, "Confirmation Delay", &format!("{}ms", self.monitor.confirmation_delay_ms))?;
        write_1(f, "User Agent", &self.monitor.user_agent)?;

        write_title_1(f, "Storage")?;
        match &self.storage {
            StorageConfig::Console => write_1(f, "Type", &"console")?,
            StorageConfig::Libsql { path } => {
                write_1(f, "Type", &"libsql")?;
                write_1(f, "Path", &path.display())?;
            }
        }

        write_title_1(f, "ZeroMQ")?;
        write_1(f, "Endpoint", &self.zeromq.endpoint())?;

        write_title_1(f, "Sites")?;
        for site in &self.sites {
            write_title_2(f, &site.name)?;
            write_2(f, "Url", &site.url)?;
            write_2(f, "Interval", &format!("{}s", site.interval))?;
            write_2(f, "Timeout", &format!("{}s", site.timeout))?;
            if !site.quiet_hours.is_empty() {
                write_2(f, "Quiet Hours", &format!("{:?}", site.quiet_hours))?;
            }
        }

        write_title_1(f, "Users")?;
        for user in &self.users {
            write_2(f, &user.username, &format!("{} contact method(s)", user.contact_methods.len()))?;
        }

        Ok(())
    }
}

impl Config {
    /// Generate Config structure from file
    ///
    /// Creates a default config in ~/.config/sitewatch/config.toml
    ///  or the specified path, with the name config.toml if one does not exist
    ///
    /// ```no_run
    /// let cfg = sitewatch::config::Config::from_config(None::<&std::path::Path>)?;
    /// println!("{}", cfg);
    /// # Ok::<(), sitewatch::config::ConfigError>(())
    /// ```
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, ConfigError> {
        let config_path: path::PathBuf = if let Some(path) = optional_path {
            normalize_toml_path(path.as_ref())
        } else {
            default_config_path()?
        };

        if config_path.exists() {
            let raw_string = fs::read_to_string(&config_path)
                .map_err(|source| ConfigError::Read { path: config_path.clone(), source })?;
            Self::from_toml(&raw_string)
        } else {
            let config = Self::default();
            config.write_config(&config_path)?;
            Ok(config)
        }
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(raw)?;
        for site in &mut config.sites {
            site.content = site.content.take().and_then(ContentRequirement::normalized);
        }
        Ok(config)
    }

    /// Serialize and write a config to a file
    pub fn write_config(&self, path: &path::Path) -> Result<(), ConfigError> {
        let config_str: String = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|source| ConfigError::Write { path: parent.to_path_buf(), source })?;
        }

        fs::write(path, config_str)
            .map_err(|source| ConfigError::Write { path: path.to_path_buf(), source })
    }

    /// Reject configurations the monitor cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.monitor.tick_seconds == 0 {
            return Err(invalid("monitor.tick_seconds", "must be greater than zero"));
        }

        let mut names = HashSet::new();
        for site in &self.sites {
            let field = |name: &str| format!("sites.{}.{name}", site.name);

            if site.name.trim().is_empty() {
                return Err(invalid("sites.name", "must not be empty"));
            }
            if !names.insert(site.name.as_str()) {
                return Err(invalid(field("name"), "duplicate site name"));
            }
            if site.interval == 0 {
                return Err(invalid(field("interval"), "must be greater than zero"));
            }
            if site.timeout == 0 {
                return Err(invalid(field("timeout"), "must be greater than zero"));
            }
            check_hours(&field("quiet_hours"), &site.quiet_hours)?;

            let resolved = site.url.replace(crate::monitoring::site::EPOCH_PLACEHOLDER, "0");
            let url = Url::parse(&resolved).map_err(|e| invalid(field("url"), e.to_string()))?;
            match (url.scheme(), site.kind) {
                ("https", _) | ("http", SiteKind::Http) => {}
                ("http", SiteKind::Https) => {
                    return Err(invalid(field("url"), "type is https but url uses http"));
                }
                (other, _) => {
                    return Err(invalid(field("url"), format!("unsupported scheme {other}")));
                }
            }
        }

        for user in &self.users {
            for method in &user.contact_methods {
                let field = format!("users.{}.contact_methods", user.username);
                match method {
                    ContactMethod::Base => {}
                    ContactMethod::Pushover { account, quiet_hours, .. } => {
                        if !self.pushover.contains_key(account) {
                            return Err(invalid(field, format!("unknown pushover account {account}")));
                        }
                        check_hours(&field, quiet_hours)?;
                    }
                    ContactMethod::Zeromq { quiet_hours, .. } => check_hours(&field, quiet_hours)?,
                }
            }
        }

        Ok(())
    }
}
