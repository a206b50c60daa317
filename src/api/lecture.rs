//! Lecture server REST API
//!
//! - `GET /api/languages` → `{languages: {code: {name, flag?}}, source}`
//! - `GET /api/current` → `{subtitles: {code: text}, source}`

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

use crate::models::{CurrentSubtitles, LanguagesUpdate};

/// Lecture API error types
#[derive(Error, Debug)]
pub enum LectureError {
    #[error("Endpoint not found (404) - is this a lecture server?")]
    NotFound,

    #[error("Server error: {0}")]
    ServerError(u16),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
}

/// Lecture server REST client
pub struct LectureClient {
    base_url: String,
    client: reqwest::Client,
}

impl LectureClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, Duration::from_secs(10))
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, endpoint);
        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(LectureError::from)
            .with_context(|| format!("GET {}", url))?;

        match response.status() {
            StatusCode::OK => {
                let body = response.text().await.map_err(LectureError::from)?;
                let parsed: T = serde_json::from_str(&body).map_err(|e| {
                    LectureError::InvalidResponse(format!("JSON parse error: {}", e))
                })?;
                Ok(parsed)
            }
            StatusCode::NOT_FOUND => Err(LectureError::NotFound.into()),
            status => Err(LectureError::ServerError(status.as_u16()).into()),
        }
    }

    /// Languages currently offered, in announced order
    pub async fn languages(&self) -> Result<LanguagesUpdate> {
        self.get("/api/languages").await
    }

    /// Latest subtitle text per language
    pub async fn current(&self) -> Result<CurrentSubtitles> {
        self.get("/api/current").await
    }
}
