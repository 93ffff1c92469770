use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::{debug, info, warn};

use crate::canvas::CanvasClient;
use crate::error::AppError;
use crate::models::DueItem;
use crate::notion::{NotionClient, SchemaLayout, plan_schema};
use crate::sync::{
    CourseContext, Horizon, MappingOutcome, ReconcilePlan, SyncAction, map_assignment, reconcile,
};

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub course_ids: Vec<u64>,
    pub course_name_overrides: HashMap<u64, String>,
    pub timezone: Tz,
    pub lookahead_days: i64,
    pub lookback_days: i64,
    pub include_undated: bool,
    pub dry_run: bool,
    pub write_delay: Duration,
}

pub struct SyncService {
    canvas: Arc<dyn CanvasClient>,
    notion: Arc<dyn NotionClient>,
    options: SyncOptions,
}

#[derive(Debug, Default)]
pub struct SyncStats {
    pub courses: usize,
    pub fetched: usize,
    pub skipped: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
}

#[derive(Debug, Clone)]
pub struct RowFailure {
    pub key: String,
    pub action: &'static str,
    pub error: String,
}

#[derive(Debug, Default)]
pub struct SyncReport {
    pub stats: SyncStats,
    pub failures: Vec<RowFailure>,
    pub dry_run: bool,
}

impl SyncReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

impl SyncService {
    pub fn new(
        canvas: Arc<dyn CanvasClient>,
        notion: Arc<dyn NotionClient>,
        options: SyncOptions,
    ) -> Self {
        Self {
            canvas,
            notion,
            options,
        }
    }

    /// One full pull-and-reconcile pass. Every read happens before the first
    /// write, so a failed read leaves Notion untouched.
    pub async fn sync_all(&self, now: DateTime<Utc>) -> Result<SyncReport, AppError> {
        info!("Starting sync...");
        let mut report = SyncReport {
            dry_run: self.options.dry_run,
            ..SyncReport::default()
        };

        info!("Step 1: Checking Notion database schema");
        let layout = self.ensure_schema().await?;

        info!("Step 2: Fetching due items from Canvas");
        let horizon = Horizon::new(
            now,
            self.options.timezone,
            self.options.lookback_days,
            self.options.lookahead_days,
            self.options.include_undated,
        );
        let items = self.collect_due_items(&horizon, &mut report.stats).await?;
        info!(
            "Collected {} due items from {} courses, skipped {}",
            items.len(),
            report.stats.courses,
            report.stats.skipped
        );

        info!("Step 3: Reading existing Notion rows");
        let rows = self.notion.fetch_rows().await?;
        info!("Found {} existing rows", rows.len());

        info!("Step 4: Reconciling");
        let plan = reconcile(&items, &rows);
        report.stats.unchanged = plan.unchanged;
        if !plan.duplicate_keys.is_empty() {
            warn!(
                "{} keys already appear on more than one row: {:?}",
                plan.duplicate_keys.len(),
                plan.duplicate_keys
            );
        }

        info!("Step 5: Writing {} changes to Notion", plan.actions.len());
        self.apply(&layout, plan, &mut report).await?;

        info!("Sync completed: {:?}", report.stats);
        if report.has_failures() {
            warn!("{} row(s) failed to write", report.failures.len());
        }
        Ok(report)
    }

    async fn ensure_schema(&self) -> Result<SchemaLayout, AppError> {
        let schema = self.notion.fetch_schema().await?;
        let plan = plan_schema(&schema)?;

        if !plan.is_ready() {
            let names: Vec<&str> = plan.missing.iter().map(|spec| spec.name.as_str()).collect();
            if self.options.dry_run {
                info!("[DRY RUN] Would add or rename properties: {:?}", names);
            } else {
                info!("Adding missing properties: {:?}", names);
                self.notion.add_properties(&plan).await?;
            }
        }
        Ok(plan.layout)
    }

    async fn collect_due_items(
        &self,
        horizon: &Horizon,
        stats: &mut SyncStats,
    ) -> Result<Vec<DueItem>, AppError> {
        let mut items = Vec::new();

        for &course_id in &self.options.course_ids {
            let course = self.canvas.fetch_course(course_id).await?;
            let context = CourseContext::resolve(&course, &self.options.course_name_overrides);
            info!("- {} ({})", context.name, context.course_id);

            let assignments = self.canvas.fetch_assignments(course_id).await?;
            stats.courses += 1;
            stats.fetched += assignments.len();

            for assignment in &assignments {
                match map_assignment(&context, assignment, horizon) {
                    MappingOutcome::Item(item) => items.push(item),
                    MappingOutcome::Undated => {
                        debug!("Skipping {} (no due date)", assignment.id);
                        stats.skipped += 1;
                    }
                    MappingOutcome::OutOfRange => {
                        debug!("Skipping {} (outside sync window)", assignment.id);
                        stats.skipped += 1;
                    }
                    MappingOutcome::InvalidDue(raw) => {
                        warn!("Skipping {} (unparseable due_at {:?})", assignment.id, raw);
                        stats.skipped += 1;
                    }
                }
            }
        }

        Ok(items)
    }

    async fn apply(
        &self,
        layout: &SchemaLayout,
        plan: ReconcilePlan,
        report: &mut SyncReport,
    ) -> Result<(), AppError> {
        for (index, action) in plan.actions.into_iter().enumerate() {
            let fields: Vec<&str> = action.changes().iter().map(|c| c.property()).collect();

            if self.options.dry_run {
                info!("[DRY RUN] Would {} {} {:?}", action.label(), action.key(), fields);
                count(&action, &mut report.stats);
                continue;
            }

            if index > 0 && !self.options.write_delay.is_zero() {
                tokio::time::sleep(self.options.write_delay).await;
            }

            let result = match &action {
                SyncAction::Create { changes, .. } => self
                    .notion
                    .create_row(layout, changes)
                    .await
                    .map(|page_id| debug!("Created page {}", page_id)),
                SyncAction::Update {
                    page_id, changes, ..
                } => self.notion.update_row(page_id, layout, changes).await,
            };

            match result {
                Ok(()) => {
                    debug!("{} {} {:?}", action.label(), action.key(), fields);
                    count(&action, &mut report.stats);
                }
                // Bad credentials will fail every remaining row the same way.
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    report.failures.push(RowFailure {
                        key: action.key().to_string(),
                        action: action.label(),
                        error: e.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

fn count(action: &SyncAction, stats: &mut SyncStats) {
    match action {
        SyncAction::Create { .. } => stats.created += 1,
        SyncAction::Update { .. } => stats.updated += 1,
    }
}
