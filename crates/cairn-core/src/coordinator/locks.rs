//! Per-plan serialization.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One async mutex per plan id. Holding the guard gives exclusive
/// read-modify-write access to that plan.
#[derive(Debug, Default)]
pub(crate) struct PlanLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl PlanLocks {
    pub(crate) async fn lock(&self, plan_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // Drop entries nobody holds or waits on
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(plan_id.to_string()).or_default())
        };
        lock.lock_owned().await
    }
}
