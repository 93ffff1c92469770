pub mod dto;
pub mod properties;
pub mod schema;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use tracing::{debug, info};

use crate::error::AppError;
use crate::models::{NotionRow, RowChange};
use crate::retry::{RetryPolicy, send_with_retry};

pub use schema::{DatabaseSchema, PropertySpec, SchemaLayout, SchemaPlan, plan_schema};

const SERVICE: &str = "Notion";
pub const NOTION_API: &str = "https://api.notion.com/v1";
const NOTION_VERSION: &str = "2022-06-28";
const PAGE_SIZE: u32 = 100;

#[derive(Clone, Debug)]
pub struct NotionConfig {
    /// [`NOTION_API`] outside of tests.
    pub api_base: String,
    pub api_token: String,
    pub database_id: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

#[async_trait]
pub trait NotionClient: Send + Sync {
    async fn fetch_schema(&self) -> Result<DatabaseSchema, AppError>;
    async fn add_properties(&self, plan: &SchemaPlan) -> Result<(), AppError>;
    /// Every row in the database, oldest first.
    async fn fetch_rows(&self) -> Result<Vec<NotionRow>, AppError>;
    /// Returns the new page id.
    async fn create_row(&self, layout: &SchemaLayout, changes: &[RowChange]) -> Result<String, AppError>;
    async fn update_row(
        &self,
        page_id: &str,
        layout: &SchemaLayout,
        changes: &[RowChange],
    ) -> Result<(), AppError>;
}

pub struct NotionHttpClient {
    client: Client,
    config: NotionConfig,
}

impl NotionHttpClient {
    pub fn new(config: NotionConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout.min(Duration::from_secs(10)))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build http client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.config.api_token)
            .header("Notion-Version", NOTION_VERSION)
    }

    async fn query_page(
        &self,
        start_cursor: Option<String>,
    ) -> Result<dto::QueryDatabaseResponse, AppError> {
        let url = format!("{}/databases/{}/query", self.config.api_base, self.config.database_id);

        let request_body = dto::QueryDatabaseRequest {
            sorts: Some(vec![serde_json::json!({
                "timestamp": "created_time",
                "direction": "ascending"
            })]),
            start_cursor,
            page_size: Some(PAGE_SIZE),
        };

        let response = send_with_retry(SERVICE, &self.config.retry, || {
            self.authorized(self.client.post(&url)).json(&request_body)
        })
        .await?;

        let body_text = response.text().await?;
        serde_json::from_str::<dto::QueryDatabaseResponse>(&body_text).map_err(|e| {
            tracing::error!("Failed to parse: {}", e);
            AppError::Parse(format!("Failed to parse Notion response: {}", e))
        })
    }
}

#[async_trait]
impl NotionClient for NotionHttpClient {
    async fn fetch_schema(&self) -> Result<DatabaseSchema, AppError> {
        let url = format!("{}/databases/{}", self.config.api_base, self.config.database_id);
        let response = send_with_retry(SERVICE, &self.config.retry, || {
            self.authorized(self.client.get(&url))
        })
        .await?;

        let body_text = response.text().await?;
        let database: dto::DatabaseResponse = serde_json::from_str(&body_text)
            .map_err(|e| AppError::Parse(format!("Failed to parse Notion database: {}", e)))?;

        Ok(DatabaseSchema {
            properties: database
                .properties
                .into_iter()
                .map(|(name, schema)| (name, schema.kind))
                .collect(),
        })
    }

    async fn add_properties(&self, plan: &SchemaPlan) -> Result<(), AppError> {
        if plan.is_ready() {
            return Ok(());
        }
        let url = format!("{}/databases/{}", self.config.api_base, self.config.database_id);
        let request_body = dto::UpdateDatabaseRequest {
            properties: plan.patch_body(),
        };

        send_with_retry(SERVICE, &self.config.retry, || {
            self.authorized(self.client.patch(&url)).json(&request_body)
        })
        .await?;

        for spec in &plan.missing {
            info!("Created property {}", spec.name);
        }
        Ok(())
    }

    async fn fetch_rows(&self) -> Result<Vec<NotionRow>, AppError> {
        let mut rows = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let response = self.query_page(cursor.take()).await?;
            rows.extend(
                response
                    .results
                    .iter()
                    .filter(|page| !page.archived)
                    .map(properties::row_from_page),
            );

            if !response.has_more {
                break;
            }
            match response.next_cursor {
                Some(next) => cursor = Some(next),
                None => {
                    return Err(AppError::Parse(
                        "Notion reported more results without a cursor".to_string(),
                    ));
                }
            }
        }

        debug!("Fetched {} Notion rows", rows.len());
        Ok(rows)
    }

    async fn create_row(&self, layout: &SchemaLayout, changes: &[RowChange]) -> Result<String, AppError> {
        let url = format!("{}/pages", self.config.api_base);
        let request_body = dto::CreatePageRequest {
            parent: dto::Parent {
                database_id: self.config.database_id.clone(),
            },
            properties: properties::build_properties(changes, layout),
        };

        // A retried POST after a server error could leave two pages behind.
        let policy = self.config.retry.non_idempotent();
        let response = send_with_retry(SERVICE, &policy, || {
            self.authorized(self.client.post(&url)).json(&request_body)
        })
        .await?;

        let body_text = response.text().await?;
        let created: dto::CreatedPage = serde_json::from_str(&body_text)
            .map_err(|e| AppError::Parse(format!("Failed to parse created page: {}", e)))?;
        Ok(created.id)
    }

    async fn update_row(
        &self,
        page_id: &str,
        layout: &SchemaLayout,
        changes: &[RowChange],
    ) -> Result<(), AppError> {
        let url = format!("{}/pages/{}", self.config.api_base, page_id);
        let request_body = dto::UpdatePageRequest {
            properties: properties::build_properties(changes, layout),
        };

        send_with_retry(SERVICE, &self.config.retry, || {
            self.authorized(self.client.patch(&url)).json(&request_body)
        })
        .await?;
        Ok(())
    }
}
