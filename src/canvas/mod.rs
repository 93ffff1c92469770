pub mod dto;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, header::LINK};
use tracing::debug;

use crate::error::AppError;
use crate::retry::{RetryPolicy, send_with_retry};

const SERVICE: &str = "Canvas";

#[derive(Clone, Debug)]
pub struct CanvasConfig {
    /// Without trailing slash, e.g. `https://canvas.asu.edu`.
    pub base_url: String,
    pub access_token: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

#[async_trait]
pub trait CanvasClient: Send + Sync {
    async fn fetch_course(&self, course_id: u64) -> Result<dto::Course, AppError>;
    async fn fetch_assignments(&self, course_id: u64) -> Result<Vec<dto::Assignment>, AppError>;
}

pub struct CanvasHttpClient {
    client: Client,
    config: CanvasConfig,
}

impl CanvasHttpClient {
    pub fn new(config: CanvasConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout.min(Duration::from_secs(10)))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build http client: {}", e)))?;
        Ok(Self { client, config })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, AppError> {
        send_with_retry(SERVICE, &self.config.retry, || {
            self.client
                .get(url)
                .bearer_auth(&self.config.access_token)
                .header("Accept", "application/json")
        })
        .await
    }

    /// Follows `rel="next"` links until Canvas stops sending one.
    async fn get_paginated<T>(&self, first_url: String) -> Result<Vec<T>, AppError>
    where
        T: serde::de::DeserializeOwned + Send,
    {
        let mut items = Vec::new();
        let mut next_url = Some(first_url);
        let mut pages = 0usize;

        while let Some(url) = next_url.take() {
            let response = self.get(&url).await?;
            next_url = response
                .headers()
                .get(LINK)
                .and_then(|value| value.to_str().ok())
                .and_then(next_link);

            let body = response.text().await?;
            let page: Vec<T> = serde_json::from_str(&body).map_err(|e| {
                AppError::Parse(format!("Failed to parse Canvas response from {}: {}", url, e))
            })?;
            pages += 1;
            items.extend(page);
        }

        debug!("Fetched {} Canvas records over {} page(s)", items.len(), pages);
        Ok(items)
    }
}

#[async_trait]
impl CanvasClient for CanvasHttpClient {
    async fn fetch_course(&self, course_id: u64) -> Result<dto::Course, AppError> {
        let url = format!("{}/api/v1/courses/{}", self.config.base_url, course_id);
        let body = self.get(&url).await?.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| AppError::Parse(format!("Failed to parse Canvas course {}: {}", course_id, e)))
    }

    async fn fetch_assignments(&self, course_id: u64) -> Result<Vec<dto::Assignment>, AppError> {
        let url = format!(
            "{}/api/v1/courses/{}/assignments?per_page=100&include[]=submission",
            self.config.base_url, course_id
        );
        self.get_paginated(url).await
    }
}

/// Extracts the `rel="next"` target from a `Link` header.
pub fn next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|part| {
        let mut segments = part.split(';');
        let target = segments.next()?.trim();
        let is_next = segments.any(|param| {
            let param = param.trim();
            param == r#"rel="next""# || param == "rel=next"
        });
        if !is_next {
            return None;
        }
        target
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
            .map(str::to_string)
    })
}
