use chrono::{DateTime, FixedOffset};

use super::{ItemKind, TaskStatus};

/// A page in the target database, reduced to the properties the sync owns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotionRow {
    pub page_id: String,
    /// Empty for rows created before keys were stamped.
    pub key: String,
    pub task: Option<String>,
    pub class: Option<String>,
    pub kind: Option<String>,
    /// `date.start` exactly as Notion returns it.
    pub due: Option<String>,
    pub time: Option<String>,
    pub status: Option<String>,
}

impl NotionRow {
    pub fn has_key(&self) -> bool {
        !self.key.trim().is_empty()
    }
}

/// One property write. A create carries all seven; an update only the ones that differ.
#[derive(Debug, Clone, PartialEq)]
pub enum RowChange {
    Task(String),
    Class(String),
    Type(ItemKind),
    Due(Option<DateTime<FixedOffset>>),
    Time(String),
    Status(TaskStatus),
    Key(String),
}

impl RowChange {
    pub fn property(&self) -> &'static str {
        match self {
            RowChange::Task(_) => "Task",
            RowChange::Class(_) => "Class",
            RowChange::Type(_) => "Type",
            RowChange::Due(_) => "Due",
            RowChange::Time(_) => "Time",
            RowChange::Status(_) => "Status",
            RowChange::Key(_) => "Key",
        }
    }
}
