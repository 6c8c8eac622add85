// crates/jd-core/src/env.rs
//
// Validated environment schema for the server and the client.
//
// Validation runs once at process start. Every missing required variable is
// reported together; malformed values halt startup as well.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Variables the server refuses to start without.
pub const REQUIRED_SERVER_VARS: [&str; 7] = [
    "GITHUB_CLIENT_ID",
    "GITHUB_CLIENT_SECRET",
    "DISCORD_ID",
    "DISCORD_SECRET",
    "AUTH_SECRET",
    "BASE_URL",
    "DATABASE_URL",
];

/// Configuration errors. Fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<String>),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: String, reason: String },
}

/// Deployment mode, used for both `NODE_ENV` and the client `MODE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Development,
    Production,
    Test,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Development => "development",
            Mode::Production => "production",
            Mode::Test => "test",
        }
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "development" => Ok(Mode::Development),
            "production" => Ok(Mode::Production),
            "test" => Ok(Mode::Test),
            other => Err(format!(
                "expected one of development, production, test; got {:?}",
                other
            )),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn parse_mode(name: &str, raw: Option<String>) -> Result<Mode, ConfigError> {
    match raw {
        None => Ok(Mode::default()),
        Some(v) => v.parse().map_err(|reason| ConfigError::Invalid {
            name: name.to_string(),
            reason,
        }),
    }
}

// ---------------------------------------------------------------------------
// ServerEnv
// ---------------------------------------------------------------------------

/// Server-side environment.
#[derive(Clone)]
pub struct ServerEnv {
    pub node_env: Mode,
    /// `ENABLE_VC_BUILD`, a "1"/"0" string parsed to an integer. Defaults to 1.
    pub enable_vc_build: i64,
    pub github_client_id: String,
    pub github_client_secret: String,
    pub discord_id: String,
    pub discord_secret: String,
    pub auth_secret: String,
    pub auth_trust_host: Option<String>,
    pub auth_url: Option<String>,
    pub base_url: String,
    pub database_url: String,
}

impl fmt::Debug for ServerEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerEnv")
            .field("node_env", &self.node_env)
            .field("enable_vc_build", &self.enable_vc_build)
            .field("github_client_id", &self.github_client_id)
            .field("github_client_secret", &"<redacted>")
            .field("discord_id", &self.discord_id)
            .field("discord_secret", &"<redacted>")
            .field("auth_secret", &"<redacted>")
            .field("auth_trust_host", &self.auth_trust_host)
            .field("auth_url", &self.auth_url)
            .field("base_url", &self.base_url)
            .field("database_url", &"<redacted>")
            .finish()
    }
}

impl ServerEnv {
    /// Read and validate the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Validate using an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let missing: Vec<String> = REQUIRED_SERVER_VARS
            .iter()
            .filter(|name| lookup(name).is_none())
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let required = |name: &str| lookup(name).ok_or_else(|| ConfigError::Missing(vec![name.to_string()]));

        let node_env = parse_mode("NODE_ENV", lookup("NODE_ENV"))?;
        let raw_vc = lookup("ENABLE_VC_BUILD").unwrap_or_else(|| "1".to_string());
        let enable_vc_build = raw_vc
            .trim()
            .parse::<i64>()
            .map_err(|e| ConfigError::Invalid {
                name: "ENABLE_VC_BUILD".to_string(),
                reason: format!("{:?} is not an integer ({})", raw_vc, e),
            })?;

        Ok(Self {
            node_env,
            enable_vc_build,
            github_client_id: required("GITHUB_CLIENT_ID")?,
            github_client_secret: required("GITHUB_CLIENT_SECRET")?,
            discord_id: required("DISCORD_ID")?,
            discord_secret: required("DISCORD_SECRET")?,
            auth_secret: required("AUTH_SECRET")?,
            auth_trust_host: lookup("AUTH_TRUST_HOST"),
            auth_url: lookup("AUTH_URL"),
            base_url: required("BASE_URL")?,
            database_url: required("DATABASE_URL")?,
        })
    }

    /// Whether `AUTH_TRUST_HOST` asks to trust the incoming host header.
    pub fn trust_host(&self) -> bool {
        matches!(
            self.auth_trust_host.as_deref().map(str::trim),
            Some("true") | Some("1")
        )
    }

    pub fn vc_build_enabled(&self) -> bool {
        self.enable_vc_build != 0
    }

    /// Base URL of the identity provider's REST endpoints.
    pub fn auth_base_url(&self) -> String {
        match &self.auth_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("{}/api/auth", self.base_url.trim_end_matches('/')),
        }
    }
}

// ---------------------------------------------------------------------------
// ClientEnv
// ---------------------------------------------------------------------------

/// Client-side environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClientEnv {
    pub mode: Mode,
}

impl ClientEnv {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            mode: parse_mode("MODE", lookup("MODE"))?,
        })
    }
}
