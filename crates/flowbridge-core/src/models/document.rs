//! Workflow documents: the execution request body and workflow files.
//!
//! A document can be written in YAML or JSON:
//!
//! ```yaml
//! name: "Share meeting notes"
//! order: list          # list | topological
//! input:
//!   attendee: "bob@example.com"
//! steps:
//!   - id: notes
//!     provider: workspace
//!     service: docs
//!     function: create_document
//!     payload:
//!       title: "Meeting notes"
//!   - id: mail
//!     provider: workspace
//!     service: gmail
//!     function: send_message
//!     depends_on: [notes]
//!     payload:
//!       to: "${input.attendee}"
//!       subject: "Notes"
//!       body: "See document ${notes.document_id}"
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::step::WorkflowStep;
use crate::engine::topological_order;
use crate::error::EngineError;

/// How the steps of a document are ordered before execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StepOrder {
    /// Run exactly in the listed order (default).
    #[default]
    List,
    /// Stable topological order over `depends_on`.
    Topological,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub order: StepOrder,

    #[serde(default)]
    pub input: Map<String, Value>,

    pub steps: Vec<WorkflowStep>,
}

impl WorkflowDocument {
    /// Parse a document from YAML (JSON documents parse too).
    pub fn from_yaml(yaml: &str) -> Result<Self, String> {
        serde_yaml::from_str(yaml).map_err(|e| format!("Failed to parse workflow document: {}", e))
    }

    /// Load a document from a `.yaml`, `.yml` or `.json` file.
    pub fn from_file(path: &str) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read workflow file '{}': {}", path, e))?;
        if path.ends_with(".json") {
            serde_json::from_str(&content)
                .map_err(|e| format!("Failed to parse workflow JSON '{}': {}", path, e))
        } else {
            Self::from_yaml(&content)
        }
    }

    /// Steps in execution order, plus the input.
    pub fn into_parts(self) -> Result<(Vec<WorkflowStep>, Map<String, Value>), EngineError> {
        let steps = match self.order {
            StepOrder::List => self.steps,
            StepOrder::Topological => topological_order(&self.steps)?,
        };
        Ok((steps, self.input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_yaml_document() {
        let yaml = r#"
name: "Notes"
input:
  attendee: "bob@example.com"
steps:
  - id: notes
    provider: workspace
    service: docs
    function: create_document
    payload:
      title: "Meeting notes"
  - id: mail
    provider: workspace
    service: gmail
    function: send_message
    depends_on: [notes]
    retry_policy:
      max_retries: 3
      retry_delay: 100
"#;
        let doc = WorkflowDocument::from_yaml(yaml).unwrap();
        assert_eq!(doc.name.as_deref(), Some("Notes"));
        assert_eq!(doc.order, StepOrder::List);
        assert_eq!(doc.steps.len(), 2);
        assert_eq!(doc.steps[1].depends_on, vec!["notes".to_string()]);
        assert_eq!(
            doc.steps[1].retry_policy.as_ref().map(|p| p.backoff_factor),
            Some(1.0)
        );
        assert_eq!(doc.input["attendee"], "bob@example.com");
    }

    #[test]
    fn test_parse_json_document_with_order() {
        let doc: WorkflowDocument = serde_json::from_value(serde_json::json!({
            "order": "topological",
            "steps": []
        }))
        .unwrap();
        assert_eq!(doc.order, StepOrder::Topological);
        assert!(doc.steps.is_empty());
    }

    #[test]
    fn test_topological_document_is_reordered() {
        let doc: WorkflowDocument = serde_json::from_value(serde_json::json!({
            "order": "topological",
            "steps": [
                { "id": "mail", "provider": "workspace", "service": "gmail",
                  "function": "send_message", "depends_on": ["notes"] },
                { "id": "notes", "provider": "workspace", "service": "docs",
                  "function": "create_document" }
            ]
        }))
        .unwrap();
        let (steps, input) = doc.into_parts().unwrap();
        let ids: Vec<&str> = steps.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["notes", "mail"]);
        assert!(input.is_empty());
    }

    #[test]
    fn test_from_file_picks_format_by_extension() {
        let dir = tempfile::tempdir().unwrap();

        let json_path = dir.path().join("wf.json");
        std::fs::write(&json_path, r#"{"name": "json", "steps": []}"#).unwrap();
        let doc = WorkflowDocument::from_file(&json_path.to_string_lossy()).unwrap();
        assert_eq!(doc.name.as_deref(), Some("json"));

        let yaml_path = dir.path().join("wf.yml");
        std::fs::write(&yaml_path, "name: yaml\nsteps: []\n").unwrap();
        let doc = WorkflowDocument::from_file(&yaml_path.to_string_lossy()).unwrap();
        assert_eq!(doc.name.as_deref(), Some("yaml"));

        let missing = dir.path().join("missing.yaml");
        let err = WorkflowDocument::from_file(&missing.to_string_lossy()).unwrap_err();
        assert!(err.contains("Failed to read workflow file"));
    }
}
