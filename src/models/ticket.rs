use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of `POST /rest/api/2/issue/`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TicketRequest {
    pub fields: TicketFields,
}

/// Only the fields a builder step contributed are serialized.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TicketFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuetype: Option<IssueType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<Value>,
    #[serde(flatten)]
    pub custom: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectRef {
    pub key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IssueType {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreatedIssue {
    pub key: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchResults {
    pub total: u64,
}

/// Outcome of the create call. Failures are reported, never raised.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum TicketResult {
    Created { key: String },
    Failed { message: String },
}

impl TicketResult {
    pub fn key(&self) -> Option<&str> {
        match self {
            TicketResult::Created { key } => Some(key),
            TicketResult::Failed { .. } => None,
        }
    }
}
