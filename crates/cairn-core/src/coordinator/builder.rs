//! Builder for creating and configuring Coordinator instances.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use log::info;
use tokio::{sync::mpsc, task};

use super::{dispatch, locks::PlanLocks, Coordinator, Inner};
use crate::{
    db::Database,
    error::{CoordinatorError, Result},
    events::{BroadcastSink, NoopSink},
    executor::Executor,
    models::DEFAULT_MAX_PARALLEL,
};

/// Builder for creating and configuring Coordinator instances.
#[derive(Clone)]
pub struct CoordinatorBuilder {
    database_path: Option<PathBuf>,
    executor: Option<Arc<dyn Executor>>,
    sink: Arc<dyn BroadcastSink>,
    default_max_parallel: u32,
}

impl CoordinatorBuilder {
    /// Creates a new builder with default settings: no executor, events
    /// discarded, three parallel steps per plan.
    pub fn new() -> Self {
        Self {
            database_path: None,
            executor: None,
            sink: Arc::new(NoopSink),
            default_max_parallel: DEFAULT_MAX_PARALLEL,
        }
    }

    /// Sets a custom database file path.
    ///
    /// If not specified, uses XDG Base Directory specification:
    /// `$XDG_DATA_HOME/cairn/cairn.db` or `~/.local/share/cairn/cairn.db`
    pub fn with_database_path<P: AsRef<Path>>(mut self, path: Option<P>) -> Self {
        if let Some(path) = path {
            self.database_path = Some(path.as_ref().to_path_buf());
        }
        self
    }

    /// Registers the executor that runs dispatched steps. Without one, the
    /// scheduler stays idle and callers run steps themselves.
    pub fn with_executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Sets where change notifications go.
    pub fn with_sink(mut self, sink: Arc<dyn BroadcastSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Concurrency bound for plans created without one.
    pub fn with_default_max_parallel(mut self, max_parallel: u32) -> Self {
        self.default_max_parallel = max_parallel;
        self
    }

    /// Builds the configured coordinator. Must be called inside a tokio
    /// runtime when an executor is registered.
    ///
    /// # Errors
    ///
    /// Returns `CoordinatorError::InvalidInput` if the default parallelism is 0
    /// Returns `CoordinatorError::FileSystem` if the database path is invalid
    /// Returns `CoordinatorError::Database` if database initialization fails
    pub async fn build(self) -> Result<Coordinator> {
        if self.default_max_parallel == 0 {
            return Err(CoordinatorError::invalid_input("max_parallel")
                .with_reason("default must be at least 1"));
        }

        let db_path = if let Some(path) = self.database_path {
            path
        } else {
            Self::default_database_path()?
        };

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| CoordinatorError::FileSystem {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }

        let db_path_clone = db_path.clone();
        task::spawn_blocking(move || {
            let _db = Database::new(&db_path_clone)?;
            Ok::<(), CoordinatorError>(())
        })
        .await
        .map_err(|e| CoordinatorError::Configuration {
            message: format!("Task join error: {e}"),
        })??;

        let (dispatcher, rx) = match self.executor {
            Some(executor) => {
                let (tx, rx) = mpsc::unbounded_channel();
                (Some(tx), Some((executor, rx)))
            }
            None => (None, None),
        };

        let inner = Arc::new(Inner {
            db_path,
            locks: PlanLocks::default(),
            sink: self.sink,
            dispatcher,
            default_max_parallel: self.default_max_parallel,
        });

        if let Some((executor, rx)) = rx {
            dispatch::spawn(Arc::downgrade(&inner), executor, rx);
        }

        info!(
            "coordinator ready at {} ({})",
            inner.db_path.display(),
            if inner.dispatcher.is_some() {
                "executor registered"
            } else {
                "manual execution"
            }
        );
        Ok(Coordinator { inner })
    }

    /// Returns the default database path following XDG Base Directory
    /// specification.
    fn default_database_path() -> Result<PathBuf> {
        xdg::BaseDirectories::with_prefix("cairn")
            .place_data_file("cairn.db")
            .map_err(|e| CoordinatorError::XdgDirectory(e.to_string()))
    }
}

impl Default for CoordinatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
