use std::collections::HashMap;

use serde_json::{Value, json};

use crate::error::AppError;
use crate::models::{ItemKind, TaskStatus};

/// Property name → Notion property type, as reported by the database.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatabaseSchema {
    pub properties: HashMap<String, String>,
}

impl DatabaseSchema {
    pub fn kind_of(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    Select,
    RichText,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Status,
    Select,
}

/// How the two flexible columns are typed in this particular database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaLayout {
    pub class: ClassKind,
    pub status: StatusKind,
}

impl Default for SchemaLayout {
    fn default() -> Self {
        Self {
            class: ClassKind::Select,
            status: StatusKind::Select,
        }
    }
}

/// One entry of a `PATCH /v1/databases/{id}` body.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertySpec {
    pub name: String,
    pub definition: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SchemaPlan {
    pub layout: SchemaLayout,
    pub missing: Vec<PropertySpec>,
}

impl SchemaPlan {
    pub fn is_ready(&self) -> bool {
        self.missing.is_empty()
    }

    pub fn patch_body(&self) -> Value {
        let properties: serde_json::Map<String, Value> = self
            .missing
            .iter()
            .map(|spec| (spec.name.clone(), spec.definition.clone()))
            .collect();
        Value::Object(properties)
    }
}

/// Checks the database against the seven columns the sync writes.
///
/// Missing columns are planned for creation. A title column under another
/// name is renamed to `Task`, since a database has exactly one title.
/// Columns present with a type the sync cannot write are a hard error.
pub fn plan_schema(schema: &DatabaseSchema) -> Result<SchemaPlan, AppError> {
    let mut missing = Vec::new();
    let mut layout = SchemaLayout::default();

    match schema.kind_of("Task") {
        Some("title") => {}
        Some(other) => return Err(mismatch("Task", "title", other)),
        None => {
            let current = schema
                .properties
                .iter()
                .find(|(_, kind)| kind.as_str() == "title")
                .map(|(name, _)| name.clone());
            match current {
                Some(name) => missing.push(PropertySpec {
                    name,
                    definition: json!({ "name": "Task" }),
                }),
                None => missing.push(spec("Task", json!({ "title": {} }))),
            }
        }
    }

    match schema.kind_of("Class") {
        Some("select") => layout.class = ClassKind::Select,
        Some("rich_text") => layout.class = ClassKind::RichText,
        Some(other) => return Err(mismatch("Class", "select or rich_text", other)),
        None => missing.push(spec("Class", json!({ "select": {} }))),
    }

    require(schema, &mut missing, "Type", "select", || {
        json!({ "select": { "options": options(ItemKind::ALL.iter().map(ItemKind::as_str)) } })
    })?;
    require(schema, &mut missing, "Due", "date", || json!({ "date": {} }))?;
    require(schema, &mut missing, "Time", "rich_text", || json!({ "rich_text": {} }))?;

    // The API cannot create status-typed columns, so a new Status is a select.
    match schema.kind_of("Status") {
        Some("status") => layout.status = StatusKind::Status,
        Some("select") => layout.status = StatusKind::Select,
        Some(other) => return Err(mismatch("Status", "status or select", other)),
        None => missing.push(spec(
            "Status",
            json!({ "select": { "options": options(TaskStatus::ALL.iter().map(TaskStatus::as_str)) } }),
        )),
    }

    require(schema, &mut missing, "Key", "rich_text", || json!({ "rich_text": {} }))?;

    Ok(SchemaPlan { layout, missing })
}

fn require(
    schema: &DatabaseSchema,
    missing: &mut Vec<PropertySpec>,
    name: &str,
    expected: &str,
    definition: impl FnOnce() -> Value,
) -> Result<(), AppError> {
    match schema.kind_of(name) {
        Some(kind) if kind == expected => Ok(()),
        Some(other) => Err(mismatch(name, expected, other)),
        None => {
            missing.push(spec(name, definition()));
            Ok(())
        }
    }
}

fn spec(name: &str, definition: Value) -> PropertySpec {
    PropertySpec {
        name: name.to_string(),
        definition,
    }
}

fn options<'a>(names: impl Iterator<Item = &'a str>) -> Vec<Value> {
    names.map(|name| json!({ "name": name })).collect()
}

fn mismatch(property: &str, expected: &str, found: &str) -> AppError {
    AppError::SchemaMismatch {
        property: property.to_string(),
        expected: expected.to_string(),
        found: found.to_string(),
    }
}
