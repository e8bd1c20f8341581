//! Element model returned by the partition operation.

use serde::{Deserialize, Serialize};

/// One unit of extracted document content.
///
/// Typing is intentionally loose at this layer: the backend owns the exact
/// element taxonomy and metadata keys, the gateway passes them through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Element category (e.g. "Title", "NarrativeText", "Table").
    #[serde(rename = "type")]
    pub element_type: String,
    /// Stable identifier assigned by the backend.
    pub element_id: String,
    /// Backend-defined metadata (page number, coordinates, source file, ...).
    #[serde(default)]
    pub metadata: serde_json::Value,
    /// Extracted text content.
    pub text: String,
}
