use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;

use crate::canvas::dto::{Assignment, Course, Submission};
use crate::models::{DueItem, ItemKind, TaskStatus};

const EXAM_KEYWORDS: [&str; 3] = ["exam", "midterm", "final"];
const MAX_TITLE_CHARS: usize = 1000;

/// Course identity plus the name written to the Class column.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseContext {
    pub course_id: u64,
    pub name: String,
}

impl CourseContext {
    /// Override first, then `course_code`, then `name`, then `Course {id}`.
    ///
    /// Commas are dropped, Notion refuses them in select option names.
    pub fn resolve(course: &Course, overrides: &HashMap<u64, String>) -> Self {
        let name = [
            overrides.get(&course.id).map(String::as_str),
            course.course_code.as_deref(),
            course.name.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(select_safe)
        .find(|name| !name.is_empty())
        .unwrap_or_else(|| format!("Course {}", course.id));

        Self {
            course_id: course.id,
            name,
        }
    }
}

/// Window of due dates worth syncing, evaluated against a fixed `now`.
#[derive(Debug, Clone)]
pub struct Horizon {
    pub now: DateTime<Utc>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub tz: Tz,
    pub include_undated: bool,
}

impl Horizon {
    pub fn new(
        now: DateTime<Utc>,
        tz: Tz,
        lookback_days: i64,
        lookahead_days: i64,
        include_undated: bool,
    ) -> Self {
        let start = Duration::try_days(lookback_days)
            .and_then(|back| now.checked_sub_signed(back))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let end = Duration::try_days(lookahead_days)
            .and_then(|ahead| now.checked_add_signed(ahead))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            now,
            start,
            end,
            tz,
            include_undated,
        }
    }

    pub fn contains(&self, due: &DateTime<Tz>) -> bool {
        let due = due.with_timezone(&Utc);
        due >= self.start && due <= self.end
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MappingOutcome {
    Item(DueItem),
    Undated,
    OutOfRange,
    InvalidDue(String),
}

pub fn map_assignment(
    course: &CourseContext,
    assignment: &Assignment,
    horizon: &Horizon,
) -> MappingOutcome {
    let due_at = match assignment.due_at.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => match DateTime::parse_from_rfc3339(raw) {
            Ok(parsed) => Some(parsed.with_timezone(&horizon.tz)),
            Err(_) => return MappingOutcome::InvalidDue(raw.to_string()),
        },
    };

    match &due_at {
        None if !horizon.include_undated => return MappingOutcome::Undated,
        Some(due) if !horizon.contains(due) => return MappingOutcome::OutOfRange,
        _ => {}
    }

    MappingOutcome::Item(DueItem {
        course_id: course.course_id,
        item_id: assignment.id,
        course_name: course.name.clone(),
        kind: classify_kind(assignment.quiz_id, assignment.name.as_deref()),
        title: title_for(assignment),
        status: decide_status(assignment.submission.as_ref(), due_at.as_ref(), horizon.now),
        due_at,
    })
}

/// A linked quiz always wins; otherwise exam-like names mark an Exam.
pub fn classify_kind(quiz_id: Option<u64>, name: Option<&str>) -> ItemKind {
    if quiz_id.is_some() {
        return ItemKind::Quiz;
    }
    let name = name.unwrap_or_default().to_lowercase();
    if EXAM_KEYWORDS.iter().any(|keyword| name.contains(keyword)) {
        ItemKind::Exam
    } else {
        ItemKind::Assignment
    }
}

pub fn decide_status(
    submission: Option<&Submission>,
    due_at: Option<&DateTime<Tz>>,
    now: DateTime<Utc>,
) -> TaskStatus {
    if let Some(submission) = submission {
        let state = submission.workflow_state.as_deref();
        let submitted = submission
            .submitted_at
            .as_deref()
            .is_some_and(|at| !at.trim().is_empty());
        if matches!(state, Some("submitted") | Some("graded")) || submitted {
            return TaskStatus::Complete;
        }
        if state == Some("pending_review") {
            return TaskStatus::InProgress;
        }
    }

    match due_at {
        Some(due) if due.with_timezone(&Utc) < now => TaskStatus::Dnf,
        _ => TaskStatus::ToDo,
    }
}

fn title_for(assignment: &Assignment) -> String {
    match non_blank(assignment.name.as_deref()) {
        Some(name) => name.chars().take(MAX_TITLE_CHARS).collect(),
        None => format!("Assignment {}", assignment.id),
    }
}

fn select_safe(name: &str) -> String {
    name.replace(',', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
