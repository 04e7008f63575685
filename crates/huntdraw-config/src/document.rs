use serde::{Deserialize, Serialize};

/// Metadata for a document uploaded against a data-source node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
  pub id: String,
  /// Blob-store key holding the document body.
  pub key: String,
  pub content_type: String,
}

/// The document formats a task can consume as an override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
  Csv,
  Json,
}

impl DocumentType {
  /// Map a MIME content type onto a supported document type.
  ///
  /// Parameters such as `; charset=utf-8` are ignored.
  pub fn from_mime(content_type: &str) -> Option<Self> {
    let essence = content_type
      .split(';')
      .next()
      .unwrap_or_default()
      .trim()
      .to_ascii_lowercase();

    match essence.as_str() {
      "text/csv" | "application/csv" | "application/vnd.ms-excel" => Some(Self::Csv),
      "application/json" => Some(Self::Json),
      _ => None,
    }
  }
}
