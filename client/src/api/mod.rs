//! Bearer-authenticated REST calls to the WageDesk application backend.
//!
//! Callers pass the access token they just read from the store; nothing here
//! caches a token.

pub mod companies;
pub mod context;

use std::time::Duration;

use reqwest::{header::AUTHORIZATION, Response};
use serde::de::DeserializeOwned;

use crate::{
    config::Config,
    error::{Result, StoreError},
};

#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::new(cfg.api_base_url.clone(), cfg.request_timeout)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str, token: &str) -> Result<T> {
        let resp = self
            .http
            .get(self.url(path))
            .header(AUTHORIZATION, bearer(token))
            .send()
            .await?;
        read_json(resp).await
    }
}

pub(crate) fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

/// Decode a 2xx body, or turn the error body into `StoreError::Api`.
pub(crate) async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let resp = check_status(resp).await?;
    Ok(resp.json::<T>().await?)
}

pub(crate) async fn check_status(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(StoreError::Api {
        status,
        message: error_message(&body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string()
        }),
    })
}

/// Pull a human-readable message out of an error body from either backend.
pub(crate) fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["msg", "error_description", "message", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
