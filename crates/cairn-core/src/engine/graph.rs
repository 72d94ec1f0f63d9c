//! Structural validation of a plan's dependency graph.

use std::collections::{HashMap, HashSet};

use crate::error::{CoordinatorError, Result};

/// One node of the graph: a step id and the ids it depends on.
#[derive(Debug, Clone, Copy)]
pub struct Node<'a> {
    pub id: &'a str,
    pub depends_on: &'a [String],
}

/// Checks that ids are unique, that every dependency names a node of the
/// same graph, and that the graph has no cycle.
///
/// # Errors
///
/// * `CoordinatorError::InvalidInput` - on duplicate ids, dangling
///   dependencies, or a cycle (the reason names the steps involved)
pub fn validate(nodes: &[Node<'_>]) -> Result<()> {
    let mut seen = HashSet::new();
    for node in nodes {
        if !seen.insert(node.id) {
            return Err(CoordinatorError::invalid_input("steps")
                .with_reason(format!("duplicate step id '{}'", node.id)));
        }
    }

    for node in nodes {
        if let Some(missing) = node
            .depends_on
            .iter()
            .find(|dep| !seen.contains(dep.as_str()))
        {
            return Err(CoordinatorError::invalid_input("depends_on").with_reason(format!(
                "step '{}' depends on unknown step '{missing}'",
                node.id
            )));
        }
    }

    if let Some(cycle) = find_cycle(nodes) {
        return Err(CoordinatorError::invalid_input("depends_on")
            .with_reason(format!("dependency cycle: {}", cycle.join(" -> "))));
    }

    Ok(())
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// Depth-first search with an explicit stack; returns the ids along the
/// first cycle found, closing back on its first id.
fn find_cycle<'a>(nodes: &[Node<'a>]) -> Option<Vec<&'a str>> {
    let edges: HashMap<&str, &[String]> = nodes.iter().map(|n| (n.id, n.depends_on)).collect();
    let mut marks: HashMap<&str, Mark> = HashMap::new();

    for root in nodes {
        if marks.contains_key(root.id) {
            continue;
        }
        // (node, index of the next dependency to visit)
        let mut stack: Vec<(&'a str, usize)> = vec![(root.id, 0)];
        marks.insert(root.id, Mark::Visiting);

        while let Some(&mut (id, ref mut next)) = stack.last_mut() {
            let deps = edges.get(id).copied().unwrap_or_default();
            if let Some(dep) = deps.get(*next) {
                *next += 1;
                let Some(dep) = nodes.iter().map(|n| n.id).find(|n| *n == dep.as_str()) else {
                    continue;
                };
                match marks.get(dep) {
                    Some(Mark::Visiting) => {
                        let start = stack.iter().position(|(n, _)| *n == dep).unwrap_or(0);
                        let mut cycle: Vec<&str> = stack[start..].iter().map(|(n, _)| *n).collect();
                        cycle.push(dep);
                        return Some(cycle);
                    }
                    Some(Mark::Done) => {}
                    None => {
                        marks.insert(dep, Mark::Visiting);
                        stack.push((dep, 0));
                    }
                }
            } else {
                marks.insert(id, Mark::Done);
                stack.pop();
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deps(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_acyclic_graph_is_valid() {
        let a = deps(&[]);
        let b = deps(&["a"]);
        let c = deps(&["a", "b"]);
        let nodes = [
            Node { id: "a", depends_on: &a },
            Node { id: "b", depends_on: &b },
            Node { id: "c", depends_on: &c },
        ];
        assert!(validate(&nodes).is_ok());
    }

    #[test]
    fn test_cycle_is_rejected() {
        let a = deps(&["c"]);
        let b = deps(&["a"]);
        let c = deps(&["b"]);
        let nodes = [
            Node { id: "a", depends_on: &a },
            Node { id: "b", depends_on: &b },
            Node { id: "c", depends_on: &c },
        ];
        let err = validate(&nodes).unwrap_err();
        assert!(err.to_string().contains("dependency cycle"), "{err}");
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let a = deps(&["a"]);
        let nodes = [Node { id: "a", depends_on: &a }];
        let err = validate(&nodes).unwrap_err();
        assert!(err.to_string().contains("a -> a"), "{err}");
    }

    #[test]
    fn test_unknown_dependency_is_rejected() {
        let a = deps(&["ghost"]);
        let nodes = [Node { id: "a", depends_on: &a }];
        let err = validate(&nodes).unwrap_err();
        assert!(err.to_string().contains("unknown step 'ghost'"), "{err}");
    }

    #[test]
    fn test_duplicate_id_is_rejected() {
        let empty = deps(&[]);
        let nodes = [
            Node { id: "a", depends_on: &empty },
            Node { id: "a", depends_on: &empty },
        ];
        assert!(validate(&nodes).is_err());
    }
}
