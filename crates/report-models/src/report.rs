//! Report payload produced by the mini app form.
//!
//! The field names match the JSON the report-generation endpoint expects,
//! so a `ReportPayload` serializes directly into a `POST /generate` body.

use serde::{Deserialize, Serialize};

/// A single appraised item in a report.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReportItem {
    /// Free-text description of the item.
    pub description: String,

    /// Evaluation amount as entered, possibly space-grouped ("15 000").
    pub evaluation: String,

    /// Uploaded photo URL, if the user attached one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

impl ReportItem {
    /// Creates a new item without a photo.
    pub fn new(description: impl Into<String>, evaluation: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            evaluation: evaluation.into(),
            photo_url: None,
        }
    }

    /// Attaches a photo URL.
    pub fn with_photo(mut self, url: impl Into<String>) -> Self {
        self.photo_url = Some(url.into());
        self
    }
}

/// The structured report the form collects.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReportPayload {
    pub department_number: String,
    pub issue_number: String,
    pub ticket_number: String,
    pub date: String,
    pub region: String,
    #[serde(default)]
    pub items: Vec<ReportItem>,
}

impl ReportPayload {
    /// Converts the payload into the opaque JSON form stored and delivered.
    pub fn to_value(&self) -> serde_json::Value {
        // A struct of strings cannot fail to serialize.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Parses a payload from opaque JSON.
    pub fn from_value(value: serde_json::Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }
}
