use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
pub struct QueryDatabaseResponse {
    pub results: Vec<Page>,
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Page {
    pub id: String,
    pub properties: HashMap<String, Property>,
    #[serde(default)]
    pub archived: bool,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Property {
    Title { title: Vec<RichText> },
    RichText { rich_text: Vec<RichText> },
    Select { select: Option<SelectOption> },
    Status { status: Option<SelectOption> },
    Date { date: Option<DateValue> },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
pub struct RichText {
    pub plain_text: String,
}

#[derive(Debug, Deserialize)]
pub struct SelectOption {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct DateValue {
    pub start: String,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseResponse {
    pub properties: HashMap<String, PropertySchema>,
}

#[derive(Debug, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Serialize)]
pub struct QueryDatabaseRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sorts: Option<Vec<serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_cursor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct CreatePageRequest {
    pub parent: Parent,
    pub properties: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct Parent {
    pub database_id: String,
}

#[derive(Debug, Serialize)]
pub struct UpdatePageRequest {
    pub properties: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct UpdateDatabaseRequest {
    pub properties: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct CreatedPage {
    pub id: String,
}
