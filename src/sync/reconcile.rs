use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::{debug, warn};

use crate::models::{DueItem, NotionRow, RowChange};

#[derive(Debug, Clone, PartialEq)]
pub enum SyncAction {
    Create {
        key: String,
        changes: Vec<RowChange>,
    },
    Update {
        key: String,
        page_id: String,
        changes: Vec<RowChange>,
    },
}

impl SyncAction {
    pub fn key(&self) -> &str {
        match self {
            SyncAction::Create { key, .. } | SyncAction::Update { key, .. } => key,
        }
    }

    pub fn changes(&self) -> &[RowChange] {
        match self {
            SyncAction::Create { changes, .. } | SyncAction::Update { changes, .. } => changes,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SyncAction::Create { .. } => "create",
            SyncAction::Update { .. } => "update",
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReconcilePlan {
    pub actions: Vec<SyncAction>,
    pub unchanged: usize,
    /// Keys found on more than one existing row; the first row is the one kept in sync.
    pub duplicate_keys: Vec<String>,
}

/// Decide create / update / no-op for every due item.
///
/// `rows` must be in creation order so the oldest row wins when a key is
/// already duplicated. Keyless rows are adopted when Task, Class and Due all
/// match, which stamps the key onto them instead of creating a twin.
pub fn reconcile(items: &[DueItem], rows: &[NotionRow]) -> ReconcilePlan {
    let mut plan = ReconcilePlan::default();

    let mut by_key: HashMap<&str, &NotionRow> = HashMap::new();
    let mut legacy: Vec<&NotionRow> = Vec::new();
    for row in rows {
        if !row.has_key() {
            legacy.push(row);
            continue;
        }
        let key = row.key.trim();
        if by_key.contains_key(key) {
            warn!("Duplicate Key {} on page {}; keeping the oldest row", key, row.page_id);
            if !plan.duplicate_keys.iter().any(|k| k == key) {
                plan.duplicate_keys.push(key.to_string());
            }
            continue;
        }
        by_key.insert(key, row);
    }

    let mut seen: HashSet<String> = HashSet::new();
    let mut adopted: HashSet<&str> = HashSet::new();

    for item in items {
        let key = item.key();
        if !seen.insert(key.clone()) {
            warn!("Canvas returned {} twice; ignoring the repeat", key);
            continue;
        }

        if let Some(row) = by_key.get(key.as_str()) {
            let changes = diff(item, &key, row);
            if changes.is_empty() {
                plan.unchanged += 1;
            } else {
                debug!("{} changed: {:?}", key, changed_names(&changes));
                plan.actions.push(SyncAction::Update {
                    key,
                    page_id: row.page_id.clone(),
                    changes,
                });
            }
            continue;
        }

        let legacy_match = legacy.iter().find(|row| {
            !adopted.contains(row.page_id.as_str())
                && row.task.as_deref() == Some(item.title.as_str())
                && row.class.as_deref() == Some(item.course_name.as_str())
                && same_due(row.due.as_deref(), item.due_at.as_ref())
        });

        match legacy_match {
            Some(row) => {
                debug!("{} adopts keyless page {}", key, row.page_id);
                adopted.insert(row.page_id.as_str());
                let changes = diff(item, &key, row);
                plan.actions.push(SyncAction::Update {
                    key,
                    page_id: row.page_id.clone(),
                    changes,
                });
            }
            None => {
                let changes = full_row(item, &key);
                plan.actions.push(SyncAction::Create { key, changes });
            }
        }
    }

    plan
}

/// All seven properties, in column order.
pub fn full_row(item: &DueItem, key: &str) -> Vec<RowChange> {
    vec![
        RowChange::Task(item.title.clone()),
        RowChange::Class(item.course_name.clone()),
        RowChange::Type(item.kind),
        RowChange::Due(item.due_at.map(|due| due.fixed_offset())),
        RowChange::Time(item.time_label()),
        RowChange::Status(item.status),
        RowChange::Key(key.to_string()),
    ]
}

fn diff(item: &DueItem, key: &str, row: &NotionRow) -> Vec<RowChange> {
    full_row(item, key)
        .into_iter()
        .filter(|change| differs(change, item, row))
        .collect()
}

fn differs(change: &RowChange, item: &DueItem, row: &NotionRow) -> bool {
    match change {
        RowChange::Task(task) => row.task.as_deref() != Some(task.as_str()),
        RowChange::Class(class) => row.class.as_deref() != Some(class.as_str()),
        RowChange::Type(kind) => row.kind.as_deref() != Some(kind.as_str()),
        RowChange::Due(_) => !same_due(row.due.as_deref(), item.due_at.as_ref()),
        RowChange::Time(time) => row.time.as_deref().unwrap_or_default() != time,
        RowChange::Status(status) => row.status.as_deref() != Some(status.as_str()),
        RowChange::Key(key) => row.key.trim() != key,
    }
}

/// Compares instants; Notion rewrites the string (milliseconds, offset) on save.
fn same_due(stored: Option<&str>, expected: Option<&DateTime<Tz>>) -> bool {
    let stored = stored.map(str::trim).filter(|s| !s.is_empty());
    match (stored, expected) {
        (None, None) => true,
        (Some(raw), Some(due)) => DateTime::parse_from_rfc3339(raw)
            .map(|parsed| parsed.with_timezone(&Utc) == due.with_timezone(&Utc))
            .unwrap_or(false),
        _ => false,
    }
}

fn changed_names(changes: &[RowChange]) -> Vec<&'static str> {
    changes.iter().map(RowChange::property).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ItemKind, TaskStatus};
    use chrono::TimeZone;

    fn tz() -> Tz {
        "America/Phoenix".parse().unwrap()
    }

    fn item(item_id: u64, title: &str) -> DueItem {
        DueItem {
            course_id: 100,
            item_id,
            course_name: "CSE 485".to_string(),
            kind: ItemKind::Assignment,
            title: title.to_string(),
            due_at: Some(tz().with_ymd_and_hms(2024, 3, 10, 16, 59, 0).unwrap()),
            status: TaskStatus::ToDo,
        }
    }

    fn row_for(item: &DueItem, page_id: &str) -> NotionRow {
        NotionRow {
            page_id: page_id.to_string(),
            key: item.key(),
            task: Some(item.title.clone()),
            class: Some(item.course_name.clone()),
            kind: Some(item.kind.to_string()),
            due: Some("2024-03-10T16:59:00.000-07:00".to_string()),
            time: Some(item.time_label()),
            status: Some(item.status.to_string()),
        }
    }

    #[test]
    fn missing_row_produces_full_create() {
        let hw = item(501, "HW 3");
        let plan = reconcile(&[hw.clone()], &[]);
        assert_eq!(plan.actions.len(), 1);
        let SyncAction::Create { key, changes } = &plan.actions[0] else {
            panic!("expected create");
        };
        assert_eq!(key, "100:501");
        assert_eq!(changes.len(), 7);
        assert!(changes.contains(&RowChange::Time("4:59 PM".to_string())));
        assert!(changes.contains(&RowChange::Key("100:501".to_string())));
    }

    #[test]
    fn matching_row_is_a_no_op() {
        let hw = item(501, "HW 3");
        let plan = reconcile(&[hw.clone()], &[row_for(&hw, "page-1")]);
        assert!(plan.actions.is_empty());
        assert_eq!(plan.unchanged, 1);
    }

    #[test]
    fn due_change_touches_only_due_when_time_of_day_is_kept() {
        let hw = item(501, "HW 3");
        let row = row_for(&hw, "page-1");
        let mut moved = hw.clone();
        moved.due_at = Some(tz().with_ymd_and_hms(2024, 3, 12, 16, 59, 0).unwrap());

        let plan = reconcile(&[moved.clone()], &[row]);
        let SyncAction::Update { page_id, changes, .. } = &plan.actions[0] else {
            panic!("expected update");
        };
        assert_eq!(page_id, "page-1");
        assert_eq!(
            changes,
            &vec![RowChange::Due(moved.due_at.map(|d| d.fixed_offset()))]
        );
    }

    #[test]
    fn due_and_time_change_together() {
        let hw = item(501, "HW 3");
        let row = row_for(&hw, "page-1");
        let mut moved = hw.clone();
        moved.due_at = Some(tz().with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap());

        let plan = reconcile(&[moved], &[row]);
        let names = changed_names(plan.actions[0].changes());
        assert_eq!(names, vec!["Due", "Time"]);
    }

    #[test]
    fn date_only_value_never_matches_timed_due() {
        let hw = item(501, "HW 3");
        let mut row = row_for(&hw, "page-1");
        row.due = Some("2024-03-10".to_string());
        let plan = reconcile(&[hw], &[row]);
        assert_eq!(changed_names(plan.actions[0].changes()), vec!["Due"]);
    }

    #[test]
    fn duplicated_keys_keep_the_first_row() {
        let hw = item(501, "HW 3");
        let first = row_for(&hw, "page-old");
        let mut second = row_for(&hw, "page-new");
        second.status = Some("Complete".to_string());

        let plan = reconcile(&[hw], &[first, second]);
        assert!(plan.actions.is_empty());
        assert_eq!(plan.duplicate_keys, vec!["100:501".to_string()]);
    }

    #[test]
    fn keyless_row_with_same_task_class_and_due_is_adopted() {
        let hw = item(501, "HW 3");
        let mut legacy = row_for(&hw, "page-legacy");
        legacy.key = String::new();

        let plan = reconcile(&[hw], &[legacy]);
        let SyncAction::Update { page_id, changes, .. } = &plan.actions[0] else {
            panic!("expected update");
        };
        assert_eq!(page_id, "page-legacy");
        assert_eq!(changes, &vec![RowChange::Key("100:501".to_string())]);
    }

    #[test]
    fn keyless_row_is_adopted_only_once() {
        let a = item(501, "HW 3");
        let mut b = item(502, "HW 3");
        b.due_at = a.due_at;
        let mut legacy = row_for(&a, "page-legacy");
        legacy.key = String::new();

        let plan = reconcile(&[a, b], &[legacy]);
        assert_eq!(plan.actions[0].label(), "update");
        assert_eq!(plan.actions[1].label(), "create");
    }

    #[test]
    fn repeated_canvas_item_is_planned_once() {
        let hw = item(501, "HW 3");
        let plan = reconcile(&[hw.clone(), hw], &[]);
        assert_eq!(plan.actions.len(), 1);
    }

    #[test]
    fn status_change_is_detected() {
        let hw = item(501, "HW 3");
        let row = row_for(&hw, "page-1");
        let mut done = hw.clone();
        done.status = TaskStatus::Complete;

        let plan = reconcile(&[done], &[row]);
        assert_eq!(
            plan.actions[0].changes(),
            &[RowChange::Status(TaskStatus::Complete)]
        );
    }
}
