use std::time::Duration;

use config::{Config, ConfigError, File};
use serde::Deserialize;

use super::cli::{Cli, LogFormat};
use crate::error::AppError;
use crate::relay::{Message, RelayConfig, DEFAULT_CAPACITY};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub relay: RelaySettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Listen address; a leading ":" means all interfaces
    #[serde(default = "default_addr")]
    pub addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelaySettings {
    /// Messages buffered per user before the oldest are dropped
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Long-poll deadline in seconds
    #[serde(default = "default_pull_timeout_seconds")]
    pub pull_timeout_seconds: u64,
    /// Title of the message seeded into every new user queue
    #[serde(default = "default_welcome_title")]
    pub welcome_title: String,
    /// Body of the message seeded into every new user queue
    #[serde(default = "default_welcome_message")]
    pub welcome_message: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
}

fn default_addr() -> String {
    ":8088".to_string()
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_pull_timeout_seconds() -> u64 {
    30
}

fn default_welcome_title() -> String {
    "message title".to_string()
}

fn default_welcome_message() -> String {
    "Here's my message to you!".to_string()
}

impl Settings {
    /// Load settings with no command-line overrides.
    pub fn new() -> Result<Self, AppError> {
        Self::load(&Cli::default())
    }

    /// Load defaults, then the config file, then command-line overrides.
    pub fn load(cli: &Cli) -> Result<Self, AppError> {
        let file = match &cli.config {
            Some(path) => File::from(path.as_path()).required(true),
            None => File::with_name("config/default").required(false),
        };

        let settings: Settings = Config::builder()
            // Start with default values
            .set_default("server.addr", default_addr())?
            .set_default("relay.capacity", DEFAULT_CAPACITY as u64)?
            .set_default("relay.pull_timeout_seconds", default_pull_timeout_seconds())?
            .set_default("relay.welcome_title", default_welcome_title())?
            .set_default("relay.welcome_message", default_welcome_message())?
            .set_default("logging.format", LogFormat::default().as_str())?
            // Load config file if exists
            .add_source(file)
            // Command-line options win
            .set_override_option("server.addr", cli.addr.clone())?
            .set_override_option("logging.format", cli.log_format.map(|f| f.as_str()))?
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.relay.capacity == 0 {
            return Err(ConfigError::Message("relay.capacity must be at least 1".into()).into());
        }
        if self.relay.pull_timeout_seconds == 0 {
            return Err(
                ConfigError::Message("relay.pull_timeout_seconds must be at least 1".into()).into(),
            );
        }
        self.bind_addr()?;
        Ok(())
    }

    /// Address in a form `TcpListener::bind` accepts.
    ///
    /// `":8088"` becomes `"0.0.0.0:8088"`; anything else must already be
    /// `host:port`.
    pub fn bind_addr(&self) -> Result<String, AppError> {
        let addr = self.server.addr.trim();
        let addr = if addr.starts_with(':') {
            format!("0.0.0.0{}", addr)
        } else {
            addr.to_string()
        };

        match addr.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => Ok(addr),
            _ => Err(AppError::InvalidAddress(self.server.addr.clone())),
        }
    }

    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            capacity: self.relay.capacity,
            pull_timeout: Duration::from_secs(self.relay.pull_timeout_seconds),
            welcome: Message::new(
                self.relay.welcome_title.clone(),
                self.relay.welcome_message.clone(),
            ),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
        }
    }
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            pull_timeout_seconds: default_pull_timeout_seconds(),
            welcome_title: default_welcome_title(),
            welcome_message: default_welcome_message(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let settings = Settings::new().unwrap();
        assert_eq!(settings.server.addr, ":8088");
        assert_eq!(settings.relay.capacity, 100);
        assert_eq!(settings.relay.pull_timeout_seconds, 30);
        assert_eq!(settings.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli {
            addr: Some("127.0.0.1:9000".to_string()),
            log_format: Some(LogFormat::Json),
            ..Default::default()
        };
        let settings = Settings::load(&cli).unwrap();
        assert_eq!(settings.bind_addr().unwrap(), "127.0.0.1:9000");
        assert_eq!(settings.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_bind_addr_without_host() {
        let settings = Settings::default();
        assert_eq!(settings.bind_addr().unwrap(), "0.0.0.0:8088");
    }

    #[test]
    fn test_invalid_addr_rejected() {
        let cli = Cli {
            addr: Some("nowhere".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            Settings::load(&cli),
            Err(AppError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut settings = Settings::default();
        settings.relay.capacity = 0;
        assert!(matches!(settings.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_relay_config_conversion() {
        let config = Settings::default().relay_config();
        assert_eq!(config.capacity, 100);
        assert_eq!(config.pull_timeout, Duration::from_secs(30));
        assert_eq!(config.welcome.title, "message title");
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let cli = Cli {
            config: Some("does/not/exist.toml".into()),
            ..Default::default()
        };
        assert!(matches!(Settings::load(&cli), Err(AppError::Config(_))));
    }
}
