use serde::Deserialize;
use std::path::{Path, PathBuf};

/// State accumulated while one descriptor moves through the pipeline.
/// Created with only the descriptor path; each stage fills in its fields.
#[derive(Debug, Clone, Default)]
pub struct ImportContext {
    pub source_path: PathBuf,
    pub identity: Option<String>,
    pub payload_file_name: Option<String>,
    pub task_code: Option<String>,
    pub mime_type: Option<String>,
    pub workflow_type: Option<String>,
    pub workflow_href: Option<String>,
    pub upload_href: Option<String>,
}

impl ImportContext {
    pub fn new(source_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            ..Default::default()
        }
    }

    pub fn descriptor_file_name(&self) -> Option<&str> {
        self.source_path.file_name().and_then(|name| name.to_str())
    }

    /// Directory the descriptor was delivered to; the payload is expected next to it.
    pub fn intake_dir(&self) -> &Path {
        self.source_path.parent().unwrap_or_else(|| Path::new(""))
    }

    pub fn payload_path(&self) -> Option<PathBuf> {
        self.payload_file_name
            .as_ref()
            .map(|name| self.intake_dir().join(name))
    }

    pub fn record_fields(&mut self, fields: &DescriptorFields) {
        self.identity = Some(fields.identity.clone());
        self.payload_file_name = Some(fields.payload_file_name.clone());
        self.task_code = Some(fields.task_code.clone());
        self.mime_type = Some(fields.mime_type.clone());
    }
}

/// The four values read from a descriptor. Only built when all four are present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorFields {
    pub identity: String,
    pub payload_file_name: String,
    pub task_code: String,
    pub mime_type: String,
}

/// Search endpoint response: `_embedded.workflows[*]._links.self.href`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkflowSearchResult {
    #[serde(rename = "_embedded", default)]
    pub embedded: EmbeddedWorkflows,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmbeddedWorkflows {
    #[serde(default)]
    pub workflows: Vec<WorkflowSummary>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowSummary {
    #[serde(rename = "_links")]
    pub links: WorkflowLinks,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowLinks {
    #[serde(rename = "self")]
    pub self_link: Link,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Link {
    pub href: String,
}

impl WorkflowSearchResult {
    /// The search is sorted by `lastUpdateTime` descending, so the first entry is the latest.
    pub fn most_recent_href(&self) -> Option<&str> {
        self.embedded
            .workflows
            .first()
            .map(|summary| summary.links.self_link.href.as_str())
    }
}

/// Workflow detail response: `_forms.execute[*]._links.target.{name,href}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkflowActionSet {
    #[serde(rename = "_forms", default)]
    pub forms: WorkflowForms,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkflowForms {
    #[serde(default)]
    pub execute: Vec<WorkflowAction>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowAction {
    #[serde(rename = "_links")]
    pub links: ActionLinks,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActionLinks {
    pub target: ActionTarget,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActionTarget {
    #[serde(default)]
    pub name: String,
    pub href: String,
}

impl WorkflowActionSet {
    pub fn target_href(&self, action_name: &str) -> Option<&str> {
        self.forms
            .execute
            .iter()
            .find(|action| action.links.target.name == action_name)
            .map(|action| action.links.target.href.as_str())
    }
}

/// Multipart body sent to the upload transition. Built once, consumed by the send.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub comment: String,
    pub upload_type: String,
    pub file_name: String,
    pub mime_type: String,
    pub content: Vec<u8>,
}
