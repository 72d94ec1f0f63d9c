//! Mid-flight edits to steps that have not run yet.

use jiff::Timestamp;
use log::info;

use super::{graph, machine, scheduler, Session};
use crate::{
    error::{CoordinatorError, Result},
    models::{Actor, Dependencies, Plan, Step, StepStatus},
    params::{Revision, StepDraft},
};

/// Applies one revision and flags the plan as revised.
///
/// The target must belong to the plan and still be pending or blocked.
/// Returns the updated, skipped or inserted step.
pub fn apply_revision(
    session: &mut Session<'_>,
    plan_id: &str,
    actor: &Actor,
    revision: &Revision,
) -> Result<Step> {
    actor.require_edit()?;
    let plan = session.db.require_plan(plan_id)?;
    if plan.status.is_terminal() {
        return Err(CoordinatorError::plan_transition(plan_id, plan.status, "revise"));
    }

    let target_id = revision.target_step_id();
    let Some(target) = plan.step(target_id) else {
        return Err(CoordinatorError::invalid_input("step_id")
            .with_reason(format!("step '{target_id}' does not belong to plan '{plan_id}'")));
    };
    if !target.status.is_revisable() {
        return Err(CoordinatorError::step_transition(
            target_id,
            target.status,
            "revise",
        ));
    }

    let step = match revision {
        Revision::UpdateParams { step_id, params } => {
            let step = session.db.set_step_params(step_id, params)?;
            session.record_updated(step.clone());
            step
        }
        Revision::UpdateDescription {
            step_id,
            description,
        } => {
            if description.trim().is_empty() {
                return Err(CoordinatorError::invalid_input("description")
                    .with_reason("must not be empty"));
            }
            let step = session.db.set_step_description(step_id, description)?;
            session.record_updated(step.clone());
            step
        }
        Revision::Skip { step_id } => machine::skip_step(session, step_id)?,
        Revision::InsertAfter { step, .. } => insert_after(session, &plan, target, step)?,
    };

    session.mark_revised(plan_id)?;
    info!(
        "plan {plan_id} revised by {}: {} on step {target_id}",
        actor.id,
        revision.name()
    );
    Ok(step)
}

fn insert_after(
    session: &mut Session<'_>,
    plan: &Plan,
    reference: &Step,
    draft: &StepDraft,
) -> Result<Step> {
    draft.validate()?;

    let id = draft.id.clone().unwrap_or_else(machine::generate_id);
    if session.db.step_exists(&id)? {
        return Err(CoordinatorError::invalid_input("id")
            .with_reason(format!("step '{id}' already exists")));
    }

    let mut nodes: Vec<graph::Node<'_>> = plan
        .steps
        .iter()
        .map(|step| graph::Node {
            id: &step.id,
            depends_on: step.depends_on.ids(),
        })
        .collect();
    nodes.push(graph::Node {
        id: &id,
        depends_on: &draft.depends_on,
    });
    graph::validate(&nodes)?;

    // Starts blocked behind a dependency that already failed or is blocked
    let status = if draft.depends_on.iter().any(|dep| {
        plan.step(dep)
            .is_some_and(|s| matches!(s.status, StepStatus::Failed | StepStatus::Blocked))
    }) {
        StepStatus::Blocked
    } else {
        StepStatus::Pending
    };

    let now = Timestamp::now();
    let step = Step {
        id: id.clone(),
        plan_id: plan.id.clone(),
        step_index: session.db.next_step_index(&plan.id)?,
        position: reference.position + 1,
        description: draft.description.clone(),
        action: draft.action.clone(),
        params: draft.params.clone(),
        depends_on: Dependencies::from(draft.depends_on.clone()),
        status,
        result: None,
        error_message: None,
        created_at: now,
        updated_at: now,
    };
    session.db.insert_step_after(reference, &step)?;

    let created = session.db.require_step(&id)?;
    session.record_created(created.clone());
    scheduler::run(session, &plan.id)?;
    Ok(created)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::NamedTempFile;

    use super::*;
    use crate::{
        db::Database,
        engine::{StepChange, Transition},
        models::{PlanStatus, Role},
        params::CreatePlan,
    };

    fn owner() -> Actor {
        Actor::new("ana", Role::Owner)
    }

    fn draft(id: &str, deps: &[&str]) -> StepDraft {
        StepDraft {
            id: Some(id.to_string()),
            description: format!("step {id}"),
            action: "noop".to_string(),
            params: json!({}),
            depends_on: deps.iter().map(|d| d.to_string()).collect(),
        }
    }

    fn setup(steps: Vec<StepDraft>) -> (NamedTempFile, Database) {
        let temp_file = NamedTempFile::new().unwrap();
        let db = Database::new(temp_file.path()).unwrap();
        let params = CreatePlan {
            id: Some("p".to_string()),
            workspace: "ws".to_string(),
            goal: "ship it".to_string(),
            steps,
            ..Default::default()
        };
        machine::create_plan(&db, &params, &owner(), 3).unwrap();
        (temp_file, db)
    }

    fn revise(db: &Database, revision: Revision) -> Result<(Step, Transition)> {
        db.atomically(|db| {
            let mut session = Session::new(db, false);
            let step = apply_revision(&mut session, "p", &owner(), &revision)?;
            Ok((step, session.finish("p")?))
        })
    }

    #[test]
    fn test_update_params_marks_plan_revised() {
        let (_temp, db) = setup(vec![draft("a", &[])]);
        let (step, transition) = revise(
            &db,
            Revision::UpdateParams {
                step_id: "a".to_string(),
                params: json!({"size": 2}),
            },
        )
        .unwrap();
        assert_eq!(step.params, json!({"size": 2}));
        assert!(transition.plan.revised);
        assert!(transition.plan_changed);
    }

    #[test]
    fn test_skip_revision_releases_dependent() {
        let (_temp, db) = setup(vec![draft("b", &[]), draft("c", &["b"])]);
        db.transition_step("c", StepStatus::Pending, StepStatus::Blocked)
            .unwrap();

        let (_, transition) = revise(
            &db,
            Revision::Skip {
                step_id: "b".to_string(),
            },
        )
        .unwrap();
        assert_eq!(db.require_step("c").unwrap().status, StepStatus::Pending);
        assert_eq!(transition.changes.len(), 2);
    }

    #[test]
    fn test_insert_after_shifts_positions_but_not_indices() {
        let (_temp, db) = setup(vec![draft("a", &[]), draft("b", &["a"])]);
        let (step, transition) = revise(
            &db,
            Revision::InsertAfter {
                step_id: "a".to_string(),
                step: draft("x", &["a"]),
            },
        )
        .unwrap();

        assert_eq!(step.step_index, 2);
        assert_eq!(step.position, 1);
        assert_eq!(step.status, StepStatus::Pending);
        assert!(matches!(transition.changes[0], StepChange::Created(_)));

        let order: Vec<_> = transition
            .plan
            .steps
            .iter()
            .map(|s| (s.id.as_str(), s.step_index, s.position))
            .collect();
        assert_eq!(order, vec![("a", 0, 0), ("x", 2, 1), ("b", 1, 2)]);
    }

    #[test]
    fn test_insert_after_failed_dependency_starts_blocked() {
        let (_temp, db) = setup(vec![draft("a", &[]), draft("b", &[])]);
        db.atomically(|db| {
            let mut session = Session::new(db, false);
            machine::approve(&mut session, "p", &owner())?;
            machine::advance(&mut session, "p", &owner())?;
            machine::fail_step(&mut session, "a", "boom")?;
            Ok(())
        })
        .unwrap();

        let (step, _) = revise(
            &db,
            Revision::InsertAfter {
                step_id: "b".to_string(),
                step: draft("x", &["a"]),
            },
        )
        .unwrap();
        assert_eq!(step.status, StepStatus::Blocked);
    }

    #[test]
    fn test_insert_after_rejects_unknown_dependency() {
        let (_temp, db) = setup(vec![draft("a", &[])]);
        let err = revise(
            &db,
            Revision::InsertAfter {
                step_id: "a".to_string(),
                step: draft("x", &["ghost"]),
            },
        )
        .unwrap_err();
        assert!(matches!(err, CoordinatorError::InvalidInput { .. }));
        assert!(!db.step_exists("x").unwrap());
    }

    #[test]
    fn test_revising_a_started_step_is_rejected() {
        let (_temp, db) = setup(vec![draft("a", &[])]);
        db.atomically(|db| {
            let mut session = Session::new(db, false);
            machine::approve(&mut session, "p", &owner())?;
            machine::advance(&mut session, "p", &owner())?;
            Ok(())
        })
        .unwrap();

        let err = revise(
            &db,
            Revision::UpdateDescription {
                step_id: "a".to_string(),
                description: "new".to_string(),
            },
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot revise step a: current status is in_progress"
        );
        assert!(!db.require_plan("p").unwrap().revised);
        assert_eq!(
            db.require_plan("p").unwrap().status,
            PlanStatus::Executing
        );
    }

    #[test]
    fn test_viewer_cannot_revise() {
        let (_temp, db) = setup(vec![draft("a", &[])]);
        let viewer = Actor::new("vic", Role::Viewer);
        let err = db
            .atomically(|db| {
                apply_revision(
                    &mut Session::new(db, false),
                    "p",
                    &viewer,
                    &Revision::Skip {
                        step_id: "a".to_string(),
                    },
                )
            })
            .unwrap_err();
        assert!(matches!(err, CoordinatorError::PermissionDenied { .. }));
    }
}
