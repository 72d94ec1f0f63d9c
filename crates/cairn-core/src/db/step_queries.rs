//! Step record operations and queries.

use jiff::Timestamp;
use rusqlite::{params, types::Type, OptionalExtension};
use serde_json::Value;

use super::{plan_queries::expect_row, status_column, timestamp_column};
use crate::{
    error::{CoordinatorError, DatabaseResultExt, Result},
    models::{Dependencies, Step, StepStatus},
};

const INSERT_STEP_SQL: &str = "INSERT INTO steps (id, plan_id, step_index, position, description, action, params, depends_on, status, result, error_message, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, NULL, NULL, ?10, ?10)";
const STEP_COLUMNS: &str = "id, plan_id, step_index, position, description, action, params, depends_on, status, result, error_message, created_at, updated_at";
const CHECK_STEP_EXISTS_SQL: &str = "SELECT EXISTS(SELECT 1 FROM steps WHERE id = ?1)";
const NEXT_STEP_INDEX_SQL: &str =
    "SELECT COALESCE(MAX(step_index), -1) + 1 FROM steps WHERE plan_id = ?1";
const SHIFT_POSITIONS_SQL: &str =
    "UPDATE steps SET position = position + 1 WHERE plan_id = ?1 AND position > ?2";
const UPDATE_STEP_STATUS_SQL: &str =
    "UPDATE steps SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4";
const COMPLETE_STEP_SQL: &str = "UPDATE steps SET status = 'completed', result = ?1, updated_at = ?2 WHERE id = ?3 AND status = 'in_progress'";
const FAIL_STEP_SQL: &str = "UPDATE steps SET status = 'failed', error_message = ?1, updated_at = ?2 WHERE id = ?3 AND status = 'in_progress'";
const RESET_FAILED_STEP_SQL: &str = "UPDATE steps SET status = 'pending', error_message = NULL, updated_at = ?1 WHERE id = ?2 AND status = 'failed'";
const UPDATE_STEP_PARAMS_SQL: &str = "UPDATE steps SET params = ?1, updated_at = ?2 WHERE id = ?3";
const UPDATE_STEP_DESCRIPTION_SQL: &str =
    "UPDATE steps SET description = ?1, updated_at = ?2 WHERE id = ?3";

impl super::Database {
    /// Helper function to construct a Step from a database row
    fn build_step_from_row(row: &rusqlite::Row) -> rusqlite::Result<Step> {
        let params: String = row.get(6)?;
        let params = serde_json::from_str::<Value>(&params)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?;

        // Lenient on purpose: a broken payload surfaces as Dependencies::Malformed
        let depends_on: String = row.get(7)?;

        let result = row
            .get::<_, Option<String>>(9)?
            .map(|raw| serde_json::from_str::<Value>(&raw).unwrap_or(Value::String(raw)));

        Ok(Step {
            id: row.get(0)?,
            plan_id: row.get(1)?,
            step_index: row.get(2)?,
            position: row.get(3)?,
            description: row.get(4)?,
            action: row.get(5)?,
            params,
            depends_on: Dependencies::parse(&depends_on),
            status: status_column::<StepStatus>(row, 8)?,
            result,
            error_message: row.get(10)?,
            created_at: timestamp_column(row, 11)?,
            updated_at: timestamp_column(row, 12)?,
        })
    }

    /// Inserts a fully built step record.
    pub fn insert_step(&self, step: &Step) -> Result<()> {
        let params_json = serde_json::to_string(&step.params)?;
        self.connection
            .execute(
                INSERT_STEP_SQL,
                params![
                    step.id,
                    step.plan_id,
                    step.step_index,
                    step.position,
                    step.description,
                    step.action,
                    params_json,
                    step.depends_on.to_stored(),
                    step.status.as_str(),
                    step.created_at.to_string(),
                ],
            )
            .db_context("Failed to insert step")?;
        Ok(())
    }

    /// Inserts `step` directly after `reference` in display order. Later
    /// steps shift down by one position; step indices are untouched.
    pub fn insert_step_after(&self, reference: &Step, step: &Step) -> Result<()> {
        self.connection
            .execute(
                SHIFT_POSITIONS_SQL,
                params![reference.plan_id, reference.position],
            )
            .db_context("Failed to shift step positions")?;
        self.insert_step(step)?;
        self.touch_plan(&reference.plan_id)
    }

    /// Next free creation index within a plan.
    pub fn next_step_index(&self, plan_id: &str) -> Result<u32> {
        self.connection
            .query_row(NEXT_STEP_INDEX_SQL, params![plan_id], |row| row.get(0))
            .db_context("Failed to get next step index")
    }

    /// Whether a step with the given id exists in any plan.
    pub fn step_exists(&self, id: &str) -> Result<bool> {
        self.connection
            .query_row(CHECK_STEP_EXISTS_SQL, params![id], |row| row.get(0))
            .db_context("Failed to check step existence")
    }

    /// Retrieves all steps for a given plan in display order.
    pub fn list_steps(&self, plan_id: &str) -> Result<Vec<Step>> {
        let sql = format!("SELECT {STEP_COLUMNS} FROM steps WHERE plan_id = ?1 ORDER BY position");
        let mut stmt = self
            .connection
            .prepare(&sql)
            .db_context("Failed to prepare query")?;

        let steps = stmt
            .query_map(params![plan_id], Self::build_step_from_row)
            .db_context("Failed to query steps")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .db_context("Failed to collect steps")?;

        Ok(steps)
    }

    /// Retrieves a single step by its ID.
    pub fn get_step(&self, id: &str) -> Result<Option<Step>> {
        let sql = format!("SELECT {STEP_COLUMNS} FROM steps WHERE id = ?1");
        self.connection
            .query_row(&sql, params![id], Self::build_step_from_row)
            .optional()
            .db_context("Failed to query step")
    }

    /// Retrieves a step, failing with `StepNotFound` when it does not exist.
    pub fn require_step(&self, id: &str) -> Result<Step> {
        self.get_step(id)?
            .ok_or_else(|| CoordinatorError::StepNotFound { id: id.to_string() })
    }

    /// Atomically moves a step from `from` to `to`. Fails with `MissingRow`
    /// when the step is no longer in `from`.
    pub fn transition_step(&self, id: &str, from: StepStatus, to: StepStatus) -> Result<Step> {
        let updated = self
            .connection
            .execute(
                UPDATE_STEP_STATUS_SQL,
                params![to.as_str(), Timestamp::now().to_string(), id, from.as_str()],
            )
            .db_context("Failed to update step status")?;
        expect_row(updated, || {
            format!("move step {id} from {} to {}", from.as_str(), to.as_str())
        })?;
        self.reload_step(id)
    }

    /// Marks an in-progress step completed and stores its result.
    pub fn set_step_result(&self, id: &str, result: &Value) -> Result<Step> {
        let result_json = serde_json::to_string(result)?;
        let updated = self
            .connection
            .execute(
                COMPLETE_STEP_SQL,
                params![result_json, Timestamp::now().to_string(), id],
            )
            .db_context("Failed to complete step")?;
        expect_row(updated, || format!("complete step {id}"))?;
        self.reload_step(id)
    }

    /// Marks an in-progress step failed and stores its error message.
    pub fn set_step_error(&self, id: &str, message: &str) -> Result<Step> {
        let updated = self
            .connection
            .execute(
                FAIL_STEP_SQL,
                params![message, Timestamp::now().to_string(), id],
            )
            .db_context("Failed to fail step")?;
        expect_row(updated, || format!("fail step {id}"))?;
        self.reload_step(id)
    }

    /// Moves a failed step back to pending and clears its error.
    pub fn reset_failed_step(&self, id: &str) -> Result<Step> {
        let updated = self
            .connection
            .execute(
                RESET_FAILED_STEP_SQL,
                params![Timestamp::now().to_string(), id],
            )
            .db_context("Failed to reset step")?;
        expect_row(updated, || format!("reset failed step {id}"))?;
        self.reload_step(id)
    }

    /// Replaces a step's params.
    pub fn set_step_params(&self, id: &str, params_value: &Value) -> Result<Step> {
        let params_json = serde_json::to_string(params_value)?;
        let updated = self
            .connection
            .execute(
                UPDATE_STEP_PARAMS_SQL,
                params![params_json, Timestamp::now().to_string(), id],
            )
            .db_context("Failed to update step params")?;
        expect_row(updated, || format!("update params of step {id}"))?;
        self.reload_step(id)
    }

    /// Replaces a step's description.
    pub fn set_step_description(&self, id: &str, description: &str) -> Result<Step> {
        let updated = self
            .connection
            .execute(
                UPDATE_STEP_DESCRIPTION_SQL,
                params![description, Timestamp::now().to_string(), id],
            )
            .db_context("Failed to update step description")?;
        expect_row(updated, || format!("update description of step {id}"))?;
        self.reload_step(id)
    }

    fn reload_step(&self, id: &str) -> Result<Step> {
        self.get_step(id)?.ok_or_else(|| CoordinatorError::MissingRow {
            what: format!("reload step {id}"),
        })
    }
}
