use serde_json::{Map, Value, json};

use super::dto;
use super::schema::{ClassKind, SchemaLayout, StatusKind};
use crate::models::{NotionRow, RowChange};

/// Builds the `properties` object for a create or update call.
pub fn build_properties(changes: &[RowChange], layout: &SchemaLayout) -> Value {
    let mut properties = Map::new();

    for change in changes {
        let value = match change {
            RowChange::Task(task) => json!({ "title": text_runs(task) }),
            RowChange::Class(class) => match layout.class {
                ClassKind::Select => select(class),
                ClassKind::RichText => json!({ "rich_text": text_runs(class) }),
            },
            RowChange::Type(kind) => select(kind.as_str()),
            RowChange::Due(Some(due)) => json!({ "date": { "start": due.to_rfc3339() } }),
            RowChange::Due(None) => json!({ "date": null }),
            RowChange::Time(time) => json!({ "rich_text": text_runs(time) }),
            RowChange::Status(status) => match layout.status {
                StatusKind::Status => json!({ "status": { "name": status.as_str() } }),
                StatusKind::Select => select(status.as_str()),
            },
            RowChange::Key(key) => json!({ "rich_text": text_runs(key) }),
        };
        properties.insert(change.property().to_string(), value);
    }

    Value::Object(properties)
}

fn select(name: &str) -> Value {
    json!({ "select": { "name": name } })
}

fn text_runs(content: &str) -> Value {
    if content.is_empty() {
        return json!([]);
    }
    json!([{ "type": "text", "text": { "content": content } }])
}

pub fn row_from_page(page: &dto::Page) -> NotionRow {
    NotionRow {
        page_id: page.id.clone(),
        key: get_property_text(page, "Key").unwrap_or_default(),
        task: get_property_text(page, "Task"),
        class: get_property_text(page, "Class").or_else(|| get_property_option(page, "Class")),
        kind: get_property_option(page, "Type"),
        due: get_property_date(page, "Due"),
        time: get_property_text(page, "Time"),
        status: get_property_option(page, "Status"),
    }
}

fn get_property_text(page: &dto::Page, key: &str) -> Option<String> {
    page.properties.get(key).and_then(|prop| match prop {
        dto::Property::Title { title } => Some(join_plain_text(title)),
        dto::Property::RichText { rich_text } => Some(join_plain_text(rich_text)),
        _ => None,
    })
}

/// Select or status name, whichever the column happens to be.
fn get_property_option(page: &dto::Page, key: &str) -> Option<String> {
    page.properties.get(key).and_then(|prop| match prop {
        dto::Property::Select { select } => select.as_ref().map(|s| s.name.clone()),
        dto::Property::Status { status } => status.as_ref().map(|s| s.name.clone()),
        _ => None,
    })
}

fn get_property_date(page: &dto::Page, key: &str) -> Option<String> {
    page.properties.get(key).and_then(|prop| match prop {
        dto::Property::Date { date } => date.as_ref().map(|d| d.start.clone()),
        _ => None,
    })
}

fn join_plain_text(runs: &[dto::RichText]) -> String {
    runs.iter().map(|t| t.plain_text.as_str()).collect()
}
