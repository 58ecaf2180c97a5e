//! Server Configuration

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};

use tedai_core::SessionPolicy;

/// Browser origins always allowed to call the API (Vite and CRA dev servers)
pub const DEV_ORIGINS: [&str; 2] = ["http://localhost:5173", "http://localhost:3000"];

const DEFAULT_PORT: u16 = 5001;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// Extra origin for a deployed frontend
    pub frontend_url: Option<String>,

    /// Directory holding the built UI
    pub static_dir: String,

    pub sessions: SessionPolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: DEFAULT_PORT,
            frontend_url: None,
            static_dir: "static".into(),
            sessions: SessionPolicy::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let port = match non_empty("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("PORT must be a port number, got '{raw}'"))?,
            None => defaults.port,
        };

        let mut sessions = defaults.sessions.clone();
        if let Some(raw) = non_empty("SESSION_TTL_SECS") {
            let secs: u64 = raw
                .parse()
                .with_context(|| format!("SESSION_TTL_SECS must be a number, got '{raw}'"))?;
            sessions.idle_ttl = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(raw) = non_empty("MAX_SESSIONS") {
            let max: usize = raw
                .parse()
                .with_context(|| format!("MAX_SESSIONS must be a number, got '{raw}'"))?;
            sessions.max_sessions = (max > 0).then_some(max);
        }

        Ok(Self {
            host: non_empty("HOST").unwrap_or(defaults.host),
            port,
            frontend_url: non_empty("FRONTEND_URL")
                .map(|url| url.trim_end_matches('/').to_string()),
            static_dir: non_empty("STATIC_DIR").unwrap_or(defaults.static_dir),
            sessions,
        })
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", self.host, self.port))
    }

    /// Origins allowed by CORS
    pub fn allowed_origins(&self) -> Vec<String> {
        let mut origins: Vec<String> = DEV_ORIGINS.iter().map(ToString::to_string).collect();
        if let Some(url) = &self.frontend_url {
            if !origins.contains(url) {
                origins.push(url.clone());
            }
        }
        origins
    }
}
