//! Database schema initialization.

use crate::error::{DatabaseResultExt, Result};

const SCHEMA_SQL: &str = r"
CREATE TABLE IF NOT EXISTS plans (
    id                 TEXT PRIMARY KEY,
    workspace          TEXT NOT NULL,
    goal               TEXT NOT NULL,
    status             TEXT NOT NULL DEFAULT 'planning'
        CHECK (status IN ('planning', 'executing', 'paused', 'completed', 'failed', 'cancelled')),
    created_by         TEXT NOT NULL,
    auto_advance       INTEGER NOT NULL DEFAULT 0,
    max_parallel       INTEGER NOT NULL DEFAULT 3 CHECK (max_parallel >= 1),
    current_step_index INTEGER,
    revised            INTEGER NOT NULL DEFAULT 0,
    created_at         TEXT NOT NULL,
    updated_at         TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS steps (
    id            TEXT PRIMARY KEY,
    plan_id       TEXT NOT NULL REFERENCES plans(id) ON DELETE CASCADE,
    step_index    INTEGER NOT NULL,
    position      INTEGER NOT NULL,
    description   TEXT NOT NULL,
    action        TEXT NOT NULL,
    params        TEXT NOT NULL DEFAULT 'null',
    depends_on    TEXT NOT NULL DEFAULT '[]',
    status        TEXT NOT NULL DEFAULT 'pending'
        CHECK (status IN ('pending', 'blocked', 'in_progress', 'completed', 'failed', 'skipped')),
    result        TEXT,
    error_message TEXT,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL,
    UNIQUE (plan_id, step_index)
);

CREATE INDEX IF NOT EXISTS idx_steps_plan_position ON steps(plan_id, position);
CREATE INDEX IF NOT EXISTS idx_steps_plan_status ON steps(plan_id, status);
CREATE INDEX IF NOT EXISTS idx_plans_workspace ON plans(workspace, status, created_at);
";

impl super::Database {
    /// Initializes the database schema.
    pub(super) fn initialize_schema(&self) -> Result<()> {
        // Enable foreign keys for this connection
        self.connection
            .execute("PRAGMA foreign_keys = ON", [])
            .db_context("Failed to enable foreign keys")?;

        self.connection
            .execute_batch(SCHEMA_SQL)
            .db_context("Failed to initialize database schema")?;

        Ok(())
    }
}
