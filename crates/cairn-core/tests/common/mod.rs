use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use cairn_core::{
    Actor, Coordinator, CoordinatorBuilder, CreatePlan, ExecutionOutcome, Executor, ExecutorError,
    Plan, Role, Step, StepDraft,
};
use tempfile::TempDir;

/// Helper function to create a test coordinator
pub async fn create_test_coordinator(builder: CoordinatorBuilder) -> (TempDir, Coordinator) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");
    let coordinator = builder
        .with_database_path(Some(&db_path))
        .build()
        .await
        .expect("Failed to create coordinator");
    (temp_dir, coordinator)
}

pub fn owner() -> Actor {
    Actor::new("ana", Role::Owner)
}

pub fn draft(id: &str, deps: &[&str]) -> StepDraft {
    StepDraft {
        id: Some(id.to_string()),
        description: format!("Run {id}"),
        action: "test.run".to_string(),
        params: serde_json::json!({ "step": id }),
        depends_on: deps.iter().map(|d| d.to_string()).collect(),
    }
}

pub fn plan_params(id: &str, auto_advance: bool, max_parallel: u32, steps: Vec<StepDraft>) -> CreatePlan {
    CreatePlan {
        id: Some(id.to_string()),
        workspace: "studio".to_string(),
        goal: format!("Goal of {id}"),
        auto_advance,
        max_parallel: Some(max_parallel),
        steps,
    }
}

/// Polls until `done` holds for the plan.
#[allow(dead_code)]
pub async fn wait_for_plan(coordinator: &Coordinator, plan_id: &str, done: impl Fn(&Plan) -> bool) -> Plan {
    for _ in 0..300 {
        let plan = coordinator.get_plan(plan_id).await.expect("plan");
        if done(&plan) {
            return plan;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("plan {plan_id} never reached the expected state");
}

/// Executor that echoes each step's params back as its result.
#[allow(dead_code)]
#[derive(Default)]
pub struct EchoExecutor {
    pub seen: Mutex<Vec<String>>,
}

#[async_trait]
impl Executor for EchoExecutor {
    async fn execute(&self, step: Step) -> Result<ExecutionOutcome, ExecutorError> {
        self.seen.lock().unwrap().push(step.id.clone());
        if step.action == "test.fail" {
            return Err(ExecutorError::new(format!("{} refused", step.id)));
        }
        Ok(ExecutionOutcome::Completed(step.params))
    }
}

#[allow(dead_code)]
pub fn echo() -> Arc<EchoExecutor> {
    Arc::new(EchoExecutor::default())
}
