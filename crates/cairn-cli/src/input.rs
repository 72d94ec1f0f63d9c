//! JSON documents accepted on the command line.
//!
//! Plans and revisions are written by a planner, so the CLI takes them as
//! JSON files (or `-` for stdin) rather than as flags.

use std::{io::Read, path::Path};

use anyhow::{Context, Result};
use cairn_core::{CreatePlan, Revision, StepDraft};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;

/// A plan proposal as written to disk. The workspace falls back to the one
/// given on the command line.
#[derive(Debug, Deserialize)]
pub struct PlanFile {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub workspace: Option<String>,
    pub goal: String,
    #[serde(default)]
    pub auto_advance: bool,
    #[serde(default)]
    pub max_parallel: Option<u32>,
    pub steps: Vec<StepDraft>,
}

impl PlanFile {
    pub fn into_params(self, workspace: &str) -> CreatePlan {
        CreatePlan {
            id: self.id,
            workspace: self.workspace.unwrap_or_else(|| workspace.to_string()),
            goal: self.goal,
            auto_advance: self.auto_advance,
            max_parallel: self.max_parallel,
            steps: self.steps,
        }
    }
}

/// One revision or a batch applied in order.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RevisionFile {
    Many(Vec<Revision>),
    One(Revision),
}

impl RevisionFile {
    pub fn into_revisions(self) -> Vec<Revision> {
        match self {
            RevisionFile::Many(revisions) => revisions,
            RevisionFile::One(revision) => vec![revision],
        }
    }
}

/// Reads and parses a JSON document from a file, or from stdin for `-`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = if path == Path::new("-") {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read stdin")?;
        buffer
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?
    };
    parse_json(&text, path)
}

fn parse_json<T: DeserializeOwned>(text: &str, source: &Path) -> Result<T> {
    serde_json::from_str(text).with_context(|| format!("Invalid JSON in {}", source.display()))
}

/// Interprets a step result given on the command line: JSON when it parses,
/// a plain string otherwise.
pub fn result_value(raw: Option<String>) -> Value {
    match raw {
        None => Value::Null,
        Some(raw) => serde_json::from_str(&raw).unwrap_or(Value::String(raw)),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_plan_file_uses_cli_workspace() {
        let file: PlanFile = parse_json(
            r#"{"goal":"Ship","steps":[{"id":"a","description":"A","action":"x"}]}"#,
            Path::new("plan.json"),
        )
        .unwrap();
        let params = file.into_params("studio");

        assert_eq!(params.workspace, "studio");
        assert_eq!(params.goal, "Ship");
        assert_eq!(params.steps[0].id.as_deref(), Some("a"));
        assert!(params.max_parallel.is_none());
    }

    #[test]
    fn test_plan_file_keeps_own_workspace() {
        let file: PlanFile = parse_json(
            r#"{"workspace":"ops","goal":"Ship","max_parallel":2,"steps":[]}"#,
            Path::new("plan.json"),
        )
        .unwrap();
        let params = file.into_params("studio");

        assert_eq!(params.workspace, "ops");
        assert_eq!(params.max_parallel, Some(2));
    }

    #[test]
    fn test_revision_file_accepts_one_or_many() {
        let one: RevisionFile =
            parse_json(r#"{"action":"skip","step_id":"b"}"#, Path::new("r.json")).unwrap();
        assert_eq!(one.into_revisions().len(), 1);

        let many: RevisionFile = parse_json(
            r#"[{"action":"skip","step_id":"b"},
                {"action":"update_description","step_id":"c","description":"C2"}]"#,
            Path::new("r.json"),
        )
        .unwrap();
        let revisions = many.into_revisions();
        let names: Vec<&str> = revisions.iter().map(|r| r.name()).collect();
        assert_eq!(names, ["skip", "update_description"]);
    }

    #[test]
    fn test_invalid_json_names_source() {
        let err = parse_json::<PlanFile>("{", Path::new("broken.json")).unwrap_err();
        assert!(err.to_string().contains("broken.json"));
    }

    #[test]
    fn test_result_value() {
        assert_eq!(result_value(None), Value::Null);
        assert_eq!(result_value(Some(r#"{"n":1}"#.into())), json!({"n": 1}));
        assert_eq!(result_value(Some("done".into())), json!("done"));
    }
}
