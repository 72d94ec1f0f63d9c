//! SQLite persistence for plans and steps.
//!
//! This module is the bundled plan/step store. It provides the record-level
//! operations the engine builds on: inserts, lookups, and guarded single-row
//! status transitions. Every coordinator operation runs its writes inside
//! [`Database::atomically`], so a rejected operation leaves no partial state.

use std::{path::Path, time::Duration};

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::error::{DatabaseResultExt, Result};

pub mod migrations;
pub mod plan_queries;
pub mod step_queries;

pub use plan_queries::NewPlan;

/// How long a connection waits for a lock held by another connection.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database connection and operations handler.
pub struct Database {
    connection: Connection,
}

impl Database {
    /// Creates a new database connection and initializes the schema.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let connection = Connection::open(path).db_context("Failed to open database connection")?;
        connection
            .busy_timeout(BUSY_TIMEOUT)
            .db_context("Failed to set busy timeout")?;

        let db = Self { connection };
        db.initialize_schema()?;
        Ok(db)
    }

    /// Runs `f` inside a transaction that is committed only if `f` succeeds.
    ///
    /// The write lock is taken up front so that two connections never both
    /// read and then race to upgrade.
    pub fn atomically<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Self) -> Result<T>,
    {
        let tx = Transaction::new_unchecked(&self.connection, TransactionBehavior::Immediate)
            .db_context("Failed to begin transaction")?;
        let value = f(self)?;
        tx.commit().db_context("Failed to commit transaction")?;
        Ok(value)
    }
}

/// Parses an RFC 3339 timestamp column.
pub(crate) fn timestamp_column(
    row: &rusqlite::Row<'_>,
    index: usize,
) -> rusqlite::Result<jiff::Timestamp> {
    row.get::<_, String>(index)?
        .parse::<jiff::Timestamp>()
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                index,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}

/// Parses a status column through its `FromStr` implementation.
pub(crate) fn status_column<S>(row: &rusqlite::Row<'_>, index: usize) -> rusqlite::Result<S>
where
    S: std::str::FromStr<Err = String>,
{
    let raw: String = row.get(index)?;
    raw.parse::<S>().map_err(|reason| {
        rusqlite::Error::FromSqlConversionFailure(
            index,
            rusqlite::types::Type::Text,
            reason.into(),
        )
    })
}
