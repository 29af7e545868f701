//! Step ordering helpers.
//!
//! The engine itself never reorders steps. `topological_order` is an opt-in
//! pre-pass for callers that submit steps out of dependency order.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::error::EngineError;
use crate::models::WorkflowStep;

/// Reject step lists that reuse an id.
pub fn ensure_unique_ids(steps: &[WorkflowStep]) -> Result<(), EngineError> {
    let mut seen = HashSet::with_capacity(steps.len());
    for step in steps {
        if !seen.insert(step.id.as_str()) {
            return Err(EngineError::InvalidWorkflow(format!(
                "duplicate step id '{}'",
                step.id
            )));
        }
    }
    Ok(())
}

/// Kahn's algorithm; ties are broken by original list position, so an
/// already-valid list comes back unchanged.
pub fn topological_order(steps: &[WorkflowStep]) -> Result<Vec<WorkflowStep>, EngineError> {
    ensure_unique_ids(steps)?;

    let index: HashMap<&str, usize> = steps
        .iter()
        .enumerate()
        .map(|(i, s)| (s.id.as_str(), i))
        .collect();

    let mut indegree = vec![0usize; steps.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); steps.len()];

    for (i, step) in steps.iter().enumerate() {
        for dep in &step.depends_on {
            let j = *index.get(dep.as_str()).ok_or_else(|| {
                EngineError::InvalidWorkflow(format!(
                    "step '{}' depends on unknown step '{}'",
                    step.id, dep
                ))
            })?;
            indegree[i] += 1;
            dependents[j].push(i);
        }
    }

    let mut ready: BTreeSet<usize> = (0..steps.len()).filter(|&i| indegree[i] == 0).collect();
    let mut order = Vec::with_capacity(steps.len());

    while let Some(i) = ready.pop_first() {
        order.push(i);
        for &k in &dependents[i] {
            indegree[k] -= 1;
            if indegree[k] == 0 {
                ready.insert(k);
            }
        }
    }

    if order.len() != steps.len() {
        let stuck: Vec<&str> = steps
            .iter()
            .enumerate()
            .filter(|(i, _)| indegree[*i] > 0)
            .map(|(_, s)| s.id.as_str())
            .collect();
        return Err(EngineError::InvalidWorkflow(format!(
            "dependency cycle between steps: {}",
            stuck.join(", ")
        )));
    }

    Ok(order.into_iter().map(|i| steps[i].clone()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(id: &str, deps: &[&str]) -> WorkflowStep {
        WorkflowStep::new(id, "workspace", "gmail", "send_message").depends_on(deps.iter().copied())
    }

    fn ids(steps: &[WorkflowStep]) -> Vec<&str> {
        steps.iter().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn test_valid_order_is_unchanged() {
        let steps = vec![step("a", &[]), step("b", &["a"]), step("c", &[])];
        let sorted = topological_order(&steps).unwrap();
        assert_eq!(ids(&sorted), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_reorders_stably() {
        let steps = vec![
            step("mail", &["doc", "file"]),
            step("doc", &[]),
            step("share", &["file"]),
            step("file", &[]),
        ];
        let sorted = topological_order(&steps).unwrap();
        assert_eq!(ids(&sorted), vec!["doc", "file", "mail", "share"]);
    }

    #[test]
    fn test_rejects_cycles_and_unknown_ids() {
        let cyclic = vec![step("a", &["b"]), step("b", &["a"]), step("c", &[])];
        let err = topological_order(&cyclic).unwrap_err();
        assert!(err.to_string().contains("cycle"));
        assert!(err.to_string().contains("a, b"));

        let unknown = vec![step("a", &["ghost"])];
        let err = topological_order(&unknown).unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let steps = vec![step("a", &[]), step("a", &[])];
        assert!(matches!(
            ensure_unique_ids(&steps),
            Err(EngineError::InvalidWorkflow(_))
        ));
    }
}
