use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single answer: a plain string for scalar field types, a list of strings
/// for checkbox fields. Untagged so the stored JSON matches the wire shape
/// (`"Alice"` / `["a", "b"]`) exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Scalar(String),
    Multi(Vec<String>),
}

impl AnswerValue {
    /// Renders the answer for a CSV cell: list answers joined with `", "`.
    pub fn as_cell(&self) -> String {
        match self {
            AnswerValue::Scalar(s) => s.clone(),
            AnswerValue::Multi(items) => items.join(", "),
        }
    }
}

/// One submission against a form. Answer keys are field ids; keys that do
/// not match the form's fields are tolerated and stored as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormResponse {
    pub id: Uuid,
    pub form_id: Uuid,
    pub answers: BTreeMap<String, AnswerValue>,
    pub submitter_name: Option<String>,
    pub submitter_email: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

/// A response joined with its form's title, for the global listing and the
/// dashboard recents.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseWithForm {
    #[serde(flatten)]
    pub response: FormResponse,
    pub form_title: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_forms: i64,
    pub total_responses: i64,
    pub avg_responses_per_form: String,
    pub recent_responses: Vec<ResponseWithForm>,
}
