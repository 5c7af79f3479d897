//! Client for the upstream experiments service that `/refresh` pulls from.

use std::time::Duration;

use log::debug;
use reqwest::{Client, Url};
use serde_json::Value;

use crate::{json_kind, store::Experiment, Error, Result};

/// The largest upstream response body a refresh will read.
pub const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

/// The upstream service that owns the authoritative experiment list.
pub struct Upstream {
    client: Client,
    url: Url,
    max_body_bytes: usize,
}

impl Upstream {
    /// Builds a client for `url` whose requests give up after `timeout`.
    pub fn build(url: &str, timeout: Duration) -> Result<Self> {
        let url = Url::parse(url).map_err(|e| {
            Error::ValidationError(format!("Invalid upstream url {url:?}: {e}"))
        })?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::from(("Unable to build upstream client", e)))?;

        Ok(Upstream {
            client,
            url,
            max_body_bytes: MAX_BODY_BYTES,
        })
    }

    /// Caps the response body size, overriding [`MAX_BODY_BYTES`].
    pub fn with_body_limit(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Fetches the current experiment list.
    ///
    /// Fails on connection errors, timeouts, non-success statuses, bodies over the size limit,
    /// and any body that isn't a JSON array of objects.
    pub async fn fetch(&self) -> Result<Vec<Experiment>> {
        debug!("Fetching experiments from {}", self.url);
        let mut response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|e| Error::from(("Error contacting upstream", e)))?
            .error_for_status()
            .map_err(|e| Error::from(("Upstream rejected the request", e)))?;

        if let Some(length) = response.content_length() {
            if length > self.max_body_bytes as u64 {
                return Err(self.too_large());
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Error::from(("Error reading upstream response", e)))?
        {
            if body.len() + chunk.len() > self.max_body_bytes {
                return Err(self.too_large());
            }
            body.extend_from_slice(&chunk);
        }

        parse_experiments(&body)
    }

    fn too_large(&self) -> Error {
        Error::UpstreamParseError(
            format!(
                "Upstream response is larger than {} bytes",
                self.max_body_bytes
            ),
            None,
        )
    }
}

/// Parses an upstream response body into experiments.
pub fn parse_experiments(body: &[u8]) -> Result<Vec<Experiment>> {
    let value: Value = serde_json::from_slice(body).map_err(|e| {
        Error::UpstreamParseError(
            "Upstream response is not valid JSON".to_string(),
            Some(e),
        )
    })?;

    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(Error::UpstreamParseError(
                format!(
                    "Expected a JSON array of experiments, got {}",
                    json_kind(&other)
                ),
                None,
            ))
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(experiment) => Ok(experiment),
            other => Err(Error::UpstreamParseError(
                format!(
                    "Experiment {index} in the upstream response is {}, expected an object",
                    json_kind(&other)
                ),
                None,
            )),
        })
        .collect()
}
