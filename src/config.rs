//! Server configuration.
//!
//! Settings start from [`Configuration::default`], are overlaid by an optional TOML file, and
//! finally by command-line flags or their matching `DASHBOARD_*` environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::{Error, Result, DEFAULT_UPSTREAM_URL};

/// Everything the server needs to know before it starts serving.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(default)]
pub struct Configuration {
    /// The address to bind the HTTP server to.
    pub address: String,
    pub port: u16,
    /// Where `/refresh` fetches the authoritative experiment list from.
    pub upstream_url: String,
    /// How long a refresh waits on the upstream before giving up.
    pub fetch_timeout_secs: u64,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: 5500,
            upstream_url: DEFAULT_UPSTREAM_URL.to_string(),
            fetch_timeout_secs: 10,
        }
    }
}

impl Configuration {
    /// Generates a [`Configuration`] from a TOML file. Missing keys take their default values.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let config_str = std::fs::read_to_string(file.as_ref())
            .map_err(|e| Error::from(("Error reading config file", e)))?;
        Configuration::parse_toml(&config_str).map_err(|e| match e {
            Error::DeserializeError(_, source) => Error::from((
                format!("Error in config file {}", file.as_ref().display()),
                source,
            )),
            other => other,
        })
    }

    fn parse_toml(toml: &str) -> Result<Self> {
        let configuration = toml::from_str::<Self>(toml)
            .map_err(|e| Error::from(("Error parsing config toml", e)))?;
        Ok(configuration)
    }

    /// Ensures the upstream url is usable and the timeout is non-zero.
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.upstream_url).map_err(|e| {
            Error::ValidationError(format!(
                "upstream_url {:?} is not a valid url: {e}",
                self.upstream_url
            ))
        })?;

        if self.fetch_timeout_secs == 0 {
            return Err(Error::ValidationError(
                "fetch_timeout_secs must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

/// Command-line arguments for the dashboard server.
#[derive(Parser, Debug)]
#[command(version, about = "Serves the experiment dashboard")]
pub struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "DASHBOARD_CONFIG")]
    pub config: Option<PathBuf>,
    #[arg(short, long, env = "DASHBOARD_ADDRESS")]
    pub address: Option<String>,
    #[arg(short, long, env = "DASHBOARD_PORT")]
    pub port: Option<u16>,
    /// Where `/refresh` fetches experiments from
    #[arg(short, long, env = "DASHBOARD_UPSTREAM_URL")]
    pub upstream_url: Option<String>,
    /// Upstream fetch timeout, in seconds
    #[arg(short = 't', long, env = "DASHBOARD_FETCH_TIMEOUT")]
    pub fetch_timeout: Option<u64>,
}

impl Args {
    /// Layers these arguments over the config file (or the defaults) and validates the result.
    pub fn into_configuration(self) -> Result<Configuration> {
        let mut configuration = match self.config {
            Some(ref path) => Configuration::from_file(path)?,
            None => Configuration::default(),
        };

        if let Some(address) = self.address {
            configuration.address = address;
        }
        if let Some(port) = self.port {
            configuration.port = port;
        }
        if let Some(upstream_url) = self.upstream_url {
            configuration.upstream_url = upstream_url;
        }
        if let Some(fetch_timeout) = self.fetch_timeout {
            configuration.fetch_timeout_secs = fetch_timeout;
        }

        configuration.validate()?;
        Ok(configuration)
    }
}
