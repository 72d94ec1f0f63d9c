//! Plan record operations and queries.

use jiff::Timestamp;
use rusqlite::{params, OptionalExtension};

use super::{status_column, timestamp_column};
use crate::{
    error::{CoordinatorError, DatabaseResultExt, Result},
    models::{Plan, PlanStatus},
};

const INSERT_PLAN_SQL: &str = "INSERT INTO plans (id, workspace, goal, status, created_by, auto_advance, max_parallel, current_step_index, revised, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL, 0, ?8, ?8)";
// The active step count is derived from the steps table on every read.
const SELECT_PLAN_COLUMNS: &str = "SELECT p.id, p.workspace, p.goal, p.status, p.created_by, p.auto_advance, p.max_parallel, (SELECT COUNT(*) FROM steps s WHERE s.plan_id = p.id AND s.status = 'in_progress'), p.current_step_index, p.revised, p.created_at, p.updated_at FROM plans p";
const CHECK_PLAN_EXISTS_SQL: &str = "SELECT EXISTS(SELECT 1 FROM plans WHERE id = ?1)";
const UPDATE_PLAN_STATUS_SQL: &str = "UPDATE plans SET status = ?1, updated_at = ?2 WHERE id = ?3";
const UPDATE_PLAN_STATUS_AND_INDEX_SQL: &str =
    "UPDATE plans SET status = ?1, current_step_index = ?2, updated_at = ?3 WHERE id = ?4";
const UPDATE_AUTO_ADVANCE_SQL: &str =
    "UPDATE plans SET auto_advance = ?1, updated_at = ?2 WHERE id = ?3";
const MARK_REVISED_SQL: &str = "UPDATE plans SET revised = 1, updated_at = ?1 WHERE id = ?2";
const TOUCH_PLAN_SQL: &str = "UPDATE plans SET updated_at = ?1 WHERE id = ?2";

/// Plan record to insert.
#[derive(Debug, Clone)]
pub struct NewPlan {
    pub id: String,
    pub workspace: String,
    pub goal: String,
    pub created_by: String,
    pub auto_advance: bool,
    pub max_parallel: u32,
    pub created_at: Timestamp,
}

impl super::Database {
    /// Helper function to construct a Plan (without steps) from a row
    fn build_plan_from_row(row: &rusqlite::Row) -> rusqlite::Result<Plan> {
        Ok(Plan {
            id: row.get(0)?,
            workspace: row.get(1)?,
            goal: row.get(2)?,
            status: status_column::<PlanStatus>(row, 3)?,
            created_by: row.get(4)?,
            auto_advance: row.get(5)?,
            max_parallel: row.get(6)?,
            active_step_count: row.get(7)?,
            current_step_index: row.get(8)?,
            revised: row.get(9)?,
            created_at: timestamp_column(row, 10)?,
            updated_at: timestamp_column(row, 11)?,
            steps: Vec::new(),
        })
    }

    /// Inserts a plan record in `planning` status.
    pub fn insert_plan(&self, plan: &NewPlan) -> Result<()> {
        self.connection
            .execute(
                INSERT_PLAN_SQL,
                params![
                    plan.id,
                    plan.workspace,
                    plan.goal,
                    PlanStatus::Planning.as_str(),
                    plan.created_by,
                    plan.auto_advance,
                    plan.max_parallel,
                    plan.created_at.to_string(),
                ],
            )
            .db_context("Failed to insert plan")?;
        Ok(())
    }

    /// Whether a plan with the given id exists.
    pub fn plan_exists(&self, id: &str) -> Result<bool> {
        self.connection
            .query_row(CHECK_PLAN_EXISTS_SQL, params![id], |row| row.get(0))
            .db_context("Failed to check plan existence")
    }

    /// Retrieves a plan by its ID with its steps eagerly loaded.
    pub fn get_plan(&self, id: &str) -> Result<Option<Plan>> {
        let sql = format!("{SELECT_PLAN_COLUMNS} WHERE p.id = ?1");
        let mut plan = self
            .connection
            .query_row(&sql, params![id], Self::build_plan_from_row)
            .optional()
            .db_context("Failed to query plan")?;

        if let Some(ref mut plan) = plan {
            plan.steps = self.list_steps(&plan.id)?;
        }

        Ok(plan)
    }

    /// Retrieves a plan, failing with `PlanNotFound` when it does not exist.
    pub fn require_plan(&self, id: &str) -> Result<Plan> {
        self.get_plan(id)?
            .ok_or_else(|| CoordinatorError::PlanNotFound { id: id.to_string() })
    }

    /// Most recently created plan of the workspace that is still in play
    /// (planning, executing or paused).
    pub fn find_active_plan(&self, workspace: &str) -> Result<Option<Plan>> {
        let sql = format!(
            "{SELECT_PLAN_COLUMNS} WHERE p.workspace = ?1 AND p.status IN ('planning', 'executing', 'paused') ORDER BY p.rowid DESC LIMIT 1"
        );
        let mut plan = self
            .connection
            .query_row(&sql, params![workspace], Self::build_plan_from_row)
            .optional()
            .db_context("Failed to query active plan")?;

        if let Some(ref mut plan) = plan {
            plan.steps = self.list_steps(&plan.id)?;
        }

        Ok(plan)
    }

    /// Sets a plan's status.
    pub fn set_plan_status(&self, id: &str, status: PlanStatus) -> Result<()> {
        let updated = self
            .connection
            .execute(
                UPDATE_PLAN_STATUS_SQL,
                params![status.as_str(), Timestamp::now().to_string(), id],
            )
            .db_context("Failed to update plan status")?;
        expect_row(updated, || format!("set status of plan {id}"))
    }

    /// Sets a plan's status together with its current step index.
    pub fn set_status_and_index(&self, id: &str, status: PlanStatus, index: u32) -> Result<()> {
        let updated = self
            .connection
            .execute(
                UPDATE_PLAN_STATUS_AND_INDEX_SQL,
                params![status.as_str(), index, Timestamp::now().to_string(), id],
            )
            .db_context("Failed to update plan status and index")?;
        expect_row(updated, || format!("set status and index of plan {id}"))
    }

    /// Turns automatic dispatch on or off.
    pub fn set_auto_advance(&self, id: &str, enabled: bool) -> Result<()> {
        let updated = self
            .connection
            .execute(
                UPDATE_AUTO_ADVANCE_SQL,
                params![enabled, Timestamp::now().to_string(), id],
            )
            .db_context("Failed to update auto-advance")?;
        expect_row(updated, || format!("set auto-advance of plan {id}"))
    }

    /// Flags the plan as revised after creation.
    pub fn mark_revised(&self, id: &str) -> Result<()> {
        let updated = self
            .connection
            .execute(MARK_REVISED_SQL, params![Timestamp::now().to_string(), id])
            .db_context("Failed to mark plan revised")?;
        expect_row(updated, || format!("mark plan {id} revised"))
    }

    /// Bumps the plan's `updated_at` after one of its steps changed.
    pub(crate) fn touch_plan(&self, id: &str) -> Result<()> {
        self.connection
            .execute(TOUCH_PLAN_SQL, params![Timestamp::now().to_string(), id])
            .db_context("Failed to update plan timestamp")?;
        Ok(())
    }
}

/// Turns a zero-row update into `MissingRow`.
pub(crate) fn expect_row(updated: usize, what: impl FnOnce() -> String) -> Result<()> {
    if updated == 0 {
        Err(CoordinatorError::MissingRow { what: what() })
    } else {
        Ok(())
    }
}
