// crates/jd-server/src/config.rs
//
// Listen configuration for the server process.
// Loaded from a TOML file or populated with sensible defaults. Secrets and
// integration settings come from the validated environment instead.

use serde::Deserialize;
use std::fs;

/// Listen configuration for the server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address for the RPC endpoint.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port for the RPC endpoint.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file at the given path.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: ServerConfig = toml::from_str(contents)?;
        Ok(config)
    }
}
