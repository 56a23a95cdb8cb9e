//! API client library.
//!
//! A small reqwest-based client for the ledsync HTTP API, used by the CLI.
//! Devices poll with [`Client::state`] and compare `rev` to detect changes.

use reqwest::StatusCode;

use crate::{
    api::{Failure, HealthResponse, WriteRequest, WriteSuccess},
    error::{Error, Result},
    store::StateRecord,
};

/// Client for one ledsync server.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    http: reqwest::Client,
}

impl Client {
    /// Create a client for the server at `base_url` (e.g.
    /// `http://127.0.0.1:5000`).
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Fetch the current state.
    pub async fn state(&self) -> Result<StateRecord> {
        let response = self
            .http
            .get(self.url("/api/state"))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    /// Store a new color and count, returning the resulting record.
    ///
    /// A rejected write comes back as [`Error::Api`] carrying the server's
    /// reason.
    pub async fn set_state(&self, color: &str, count: u8) -> Result<StateRecord> {
        let request = WriteRequest {
            color: color.to_string(),
            count,
        };
        let response = self
            .http
            .post(self.url("/api/state"))
            .json(&request)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                let success: WriteSuccess = response.json().await?;
                Ok(success.state)
            }
            StatusCode::BAD_REQUEST | StatusCode::INTERNAL_SERVER_ERROR => {
                let failure: Failure = response.json().await?;
                Err(Error::Api(failure.error))
            }
            _ => Err(response.error_for_status().err().map_or_else(
                || Error::Api("unexpected response".to_string()),
                Error::Http,
            )),
        }
    }

    /// Check that the server is up.
    pub async fn health(&self) -> Result<HealthResponse> {
        let response = self
            .http
            .get(self.url("/api/health"))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}
