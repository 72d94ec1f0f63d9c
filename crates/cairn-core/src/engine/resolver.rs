//! Dependency resolution: which steps may run right now.
//!
//! Pure functions over a plan's loaded steps. Nothing here touches the store.

use std::collections::HashMap;

use log::warn;

use crate::models::{Step, StepStatus};

/// Pending steps whose dependencies are all completed or skipped, ordered by
/// ascending step index and capped at `limit`.
///
/// A dependency id that names no step of the plan is never satisfied. A
/// malformed `depends_on` payload counts as "no dependencies".
pub fn executable_steps(steps: &[Step], limit: usize) -> Vec<&Step> {
    let statuses: HashMap<&str, StepStatus> = steps
        .iter()
        .map(|step| (step.id.as_str(), step.status))
        .collect();

    let mut runnable: Vec<&Step> = steps
        .iter()
        .filter(|step| step.status == StepStatus::Pending)
        .filter(|step| {
            if step.depends_on.is_malformed() {
                warn!(
                    "step {} has malformed depends_on; treating it as having no dependencies",
                    step.id
                );
            }
            step.depends_on.ids().iter().all(|dep| {
                statuses
                    .get(dep.as_str())
                    .is_some_and(StepStatus::is_resolved)
            })
        })
        .collect();

    runnable.sort_by_key(|step| step.step_index);
    runnable.truncate(limit);
    runnable
}

/// Whether the plan still owes work: a step is pending, blocked, in flight or
/// failed. A failed step keeps the plan open so it can still be retried.
pub fn has_work_left(steps: &[Step]) -> bool {
    steps.iter().any(|step| {
        matches!(
            step.status,
            StepStatus::Pending | StepStatus::Blocked | StepStatus::InProgress | StepStatus::Failed
        )
    })
}

/// Number of steps currently in progress.
pub fn active_count(steps: &[Step]) -> u32 {
    let active = steps
        .iter()
        .filter(|step| step.status == StepStatus::InProgress)
        .count();
    u32::try_from(active).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{engine::fixtures::step, models::Dependencies};

    fn ids(steps: Vec<&Step>) -> Vec<&str> {
        steps.into_iter().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn test_step_without_dependencies_is_executable() {
        let steps = vec![step("a", 0, StepStatus::Pending, &[])];
        assert_eq!(ids(executable_steps(&steps, 5)), vec!["a"]);
    }

    #[test]
    fn test_dependency_must_be_completed_or_skipped() {
        for (dep_status, expected) in [
            (StepStatus::Pending, false),
            (StepStatus::Blocked, false),
            (StepStatus::InProgress, false),
            (StepStatus::Failed, false),
            (StepStatus::Completed, true),
            (StepStatus::Skipped, true),
        ] {
            let steps = vec![
                step("a", 0, dep_status, &[]),
                step("b", 1, StepStatus::Pending, &["a"]),
            ];
            let runnable = ids(executable_steps(&steps, 5));
            assert_eq!(runnable.contains(&"b"), expected, "dep status {dep_status:?}");
        }
    }

    #[test]
    fn test_every_dependency_must_be_resolved() {
        let steps = vec![
            step("a", 0, StepStatus::Completed, &[]),
            step("b", 1, StepStatus::InProgress, &[]),
            step("c", 2, StepStatus::Pending, &["a", "b"]),
        ];
        assert!(executable_steps(&steps, 5).is_empty());
    }

    #[test]
    fn test_unknown_dependency_is_never_satisfied() {
        let steps = vec![step("a", 0, StepStatus::Pending, &["ghost"])];
        assert!(executable_steps(&steps, 5).is_empty());
    }

    #[test]
    fn test_results_ordered_by_index_and_capped() {
        let mut steps = vec![
            step("c", 2, StepStatus::Pending, &[]),
            step("a", 0, StepStatus::Pending, &[]),
            step("b", 1, StepStatus::Pending, &[]),
        ];
        // Display position must not influence selection order
        steps[0].position = 0;
        assert_eq!(ids(executable_steps(&steps, 2)), vec!["a", "b"]);
        assert!(executable_steps(&steps, 0).is_empty());
    }

    #[test]
    fn test_malformed_dependencies_count_as_none() {
        let mut broken = step("a", 0, StepStatus::Pending, &[]);
        broken.depends_on = Dependencies::Malformed("{".into());
        let steps = vec![broken];
        assert_eq!(ids(executable_steps(&steps, 1)), vec!["a"]);
    }

    #[test]
    fn test_work_left_until_every_step_resolved() {
        let mut steps = vec![
            step("a", 0, StepStatus::Completed, &[]),
            step("b", 1, StepStatus::Blocked, &[]),
            step("c", 2, StepStatus::Skipped, &[]),
        ];
        assert!(has_work_left(&steps));
        assert_eq!(active_count(&steps), 0);

        for status in [StepStatus::Pending, StepStatus::InProgress, StepStatus::Failed] {
            steps[1].status = status;
            assert!(has_work_left(&steps), "{status:?}");
        }
        steps[1].status = StepStatus::Completed;
        assert!(!has_work_left(&steps));
    }
}
