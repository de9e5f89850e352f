mod cli;
mod settings;

pub use cli::{Cli, LogFormat};
pub use settings::{LoggingConfig, RelaySettings, ServerConfig, Settings};
