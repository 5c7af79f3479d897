//! A small experiment-tracking dashboard.
//!
//! Experiments are kept in an in-memory [`store::ExperimentStore`], served as JSON and HTML by
//! the handlers in [`routes`], and can be refreshed from an upstream experiments service through
//! [`upstream::Upstream`].

use axum::http::StatusCode;
use axum::response::IntoResponse;
use log::error;
use serde_json::Value;

pub mod config;
pub mod render;
pub mod routes;
pub mod store;
pub mod upstream;

/// Where the chaos controller publishes its experiment list when nothing else is configured.
pub const DEFAULT_UPSTREAM_URL: &str = "http://localhost:8080/experiments";

/// A specialised [`Result`] type for dashboard operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for dashboard operations.
///
/// Validation errors come from malformed request bodies and are returned to the caller.
/// Upstream errors come from the refresh call and are recovered inside the refresh handler, so
/// they never reach a client as an error status. IO and deserialize errors only happen while the
/// server is starting up.
#[derive(Debug)]
pub enum Error {
    ValidationError(String),
    UpstreamFetchError(String, reqwest::Error),
    UpstreamParseError(String, Option<serde_json::Error>),
    IOError(String, std::io::Error),
    DeserializeError(String, toml::de::Error),
}

impl Error {
    /// Best-effort status codes for use with HTTP Servers.
    pub fn status_code(&self) -> StatusCode {
        match *self {
            Error::ValidationError(..) => StatusCode::BAD_REQUEST,
            Error::UpstreamFetchError(..) => StatusCode::BAD_GATEWAY,
            Error::UpstreamParseError(..) => StatusCode::BAD_GATEWAY,
            Error::IOError(..) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::DeserializeError(..) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        error!("{}", self);
        let body = self.to_string();
        let code = self.status_code();
        (code, body).into_response()
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Error::ValidationError(ref message) => {
                write!(f, "Validation error: {message}")
            }
            Error::UpstreamFetchError(ref message, ref source) => {
                write!(f, "{message}: {source}")
            }
            Error::UpstreamParseError(ref message, Some(ref source)) => {
                write!(f, "{message}: {source}")
            }
            Error::UpstreamParseError(ref message, None) => {
                write!(f, "{message}")
            }
            Error::IOError(ref message, ref source) => {
                write!(f, "{message}: {source}")
            }
            Error::DeserializeError(ref message, ref source) => {
                write!(f, "{message}: {source}")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            Self::ValidationError(_) => None,
            Self::UpstreamFetchError(.., ref source) => Some(source),
            Self::UpstreamParseError(.., Some(ref source)) => Some(source),
            Self::UpstreamParseError(.., None) => None,
            Self::IOError(.., ref source) => Some(source),
            Self::DeserializeError(.., ref source) => Some(source),
        }
    }
}

impl From<(&str, reqwest::Error)> for Error {
    fn from(value: (&str, reqwest::Error)) -> Self {
        Error::UpstreamFetchError(value.0.to_string(), value.1)
    }
}

impl From<(&str, std::io::Error)> for Error {
    fn from(value: (&str, std::io::Error)) -> Self {
        Error::IOError(value.0.to_string(), value.1)
    }
}

impl From<(String, std::io::Error)> for Error {
    fn from(value: (String, std::io::Error)) -> Self {
        Error::IOError(value.0, value.1)
    }
}

impl From<(&str, toml::de::Error)> for Error {
    fn from(value: (&str, toml::de::Error)) -> Self {
        Error::DeserializeError(value.0.to_string(), value.1)
    }
}

impl From<(String, toml::de::Error)> for Error {
    fn from(value: (String, toml::de::Error)) -> Self {
        Error::DeserializeError(value.0, value.1)
    }
}

/// A short name for the kind of a JSON value, used in error messages.
pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
