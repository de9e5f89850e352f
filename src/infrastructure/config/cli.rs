use std::path::PathBuf;

use clap::ValueEnum;
use serde::Deserialize;

/// Command-line options. Anything given here overrides the config file.
#[derive(Debug, Default, clap::Parser)]
#[command(name = "pebble-relay", version, about)]
pub struct Cli {
    /// HTTP service address, e.g. ":8088" or "127.0.0.1:8088"
    #[arg(long)]
    pub addr: Option<String>,

    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_parse_overrides() {
        let cli = Cli::parse_from(["pebble-relay", "--addr", ":9000", "--log-format", "json"]);
        assert_eq!(cli.addr.as_deref(), Some(":9000"));
        assert_eq!(cli.log_format, Some(LogFormat::Json));
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_parse_defaults() {
        let cli = Cli::parse_from(["pebble-relay"]);
        assert!(cli.addr.is_none());
        assert!(cli.log_format.is_none());
    }
}
