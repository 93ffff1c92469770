use std::fmt;

use chrono::DateTime;
use chrono_tz::Tz;

/// A Canvas assignment or quiz normalized for syncing.
#[derive(Debug, Clone, PartialEq)]
pub struct DueItem {
    pub course_id: u64,
    pub item_id: u64,
    pub course_name: String,
    pub kind: ItemKind,
    pub title: String,
    pub due_at: Option<DateTime<Tz>>,
    pub status: TaskStatus,
}

impl DueItem {
    pub fn key(&self) -> String {
        crate::sync::key::key_for(self.course_id, self.item_id)
    }

    /// Local clock time shown in the Time column, e.g. `4:59 PM`.
    pub fn time_label(&self) -> String {
        self.due_at
            .map(|due| due.format("%-I:%M %p").to_string())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Assignment,
    Quiz,
    Exam,
}

impl ItemKind {
    pub const ALL: [ItemKind; 3] = [ItemKind::Assignment, ItemKind::Quiz, ItemKind::Exam];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Assignment => "Assignment",
            ItemKind::Quiz => "Quiz",
            ItemKind::Exam => "Exam",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    ToDo,
    InProgress,
    Complete,
    /// Past due with nothing submitted.
    Dnf,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::ToDo,
        TaskStatus::InProgress,
        TaskStatus::Complete,
        TaskStatus::Dnf,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::ToDo => "To do",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Complete => "Complete",
            TaskStatus::Dnf => "DNF",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
