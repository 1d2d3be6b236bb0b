//! Typed chunk variants.
//!
//! Vector stores return documents with free-form JSON metadata. Retrievers
//! convert those into one of two concrete shapes, so material and pedagogy
//! content never mix downstream.

use serde::{Deserialize, Serialize};

/// Free-form metadata attached to a stored chunk.
pub type ChunkMetadata = serde_json::Map<String, serde_json::Value>;

/// A chunk of a teacher-uploaded material (`material_{id}` collection).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialChunk {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_title: Option<String>,
    pub chunk_index: usize,
    /// `1 - distance` for similarity hits, 1.0 for full dumps
    #[serde(default)]
    pub relevance: f32,
}

/// A chunk of the shared pedagogy corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PedagogyChunk {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_title: Option<String>,
    pub chunk_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default)]
    pub relevance: f32,
}

fn meta_str(metadata: &ChunkMetadata, key: &str) -> Option<String> {
    match metadata.get(key)? {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn meta_u64(metadata: &ChunkMetadata, key: &str) -> Option<u64> {
    match metadata.get(key)? {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// `chunk_index` from metadata, if it is a non-negative integer.
pub fn metadata_chunk_index(metadata: &ChunkMetadata) -> Option<usize> {
    meta_u64(metadata, "chunk_index").map(|i| i as usize)
}

/// Filename recorded by ingestion (`filename` or `file_name`).
pub fn metadata_filename(metadata: &ChunkMetadata) -> Option<String> {
    meta_str(metadata, "filename").or_else(|| meta_str(metadata, "file_name"))
}

impl MaterialChunk {
    /// Build from a stored document and its metadata. `position` stands in for
    /// a missing `chunk_index`.
    pub fn from_stored(
        document: &str,
        metadata: &ChunkMetadata,
        position: usize,
        relevance: f32,
    ) -> Self {
        Self {
            content: document.to_string(),
            page_number: meta_u64(metadata, "page_number").map(|p| p as u32),
            section_title: meta_str(metadata, "section_title"),
            chunk_index: metadata_chunk_index(metadata).unwrap_or(position),
            relevance,
        }
    }
}

impl PedagogyChunk {
    pub fn from_stored(
        document: &str,
        metadata: &ChunkMetadata,
        position: usize,
        relevance: f32,
    ) -> Self {
        Self {
            content: document.to_string(),
            page_number: meta_u64(metadata, "page_number").map(|p| p as u32),
            section_title: meta_str(metadata, "section_title"),
            chunk_index: metadata_chunk_index(metadata).unwrap_or(position),
            module: meta_str(metadata, "module"),
            subject: meta_str(metadata, "subject"),
            file_name: meta_str(metadata, "file_name").or_else(|| meta_str(metadata, "filename")),
            relevance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta(value: serde_json::Value) -> ChunkMetadata {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn material_chunk_reads_metadata() {
        let m = meta(json!({"page_number": 4, "section_title": "Euclid", "chunk_index": 7}));
        let chunk = MaterialChunk::from_stored("text", &m, 0, 1.0);
        assert_eq!(chunk.page_number, Some(4));
        assert_eq!(chunk.section_title.as_deref(), Some("Euclid"));
        assert_eq!(chunk.chunk_index, 7);
    }

    #[test]
    fn missing_index_falls_back_to_position() {
        let m = meta(json!({"page_number": "12", "section_title": ""}));
        let chunk = MaterialChunk::from_stored("text", &m, 3, 0.5);
        assert_eq!(chunk.chunk_index, 3);
        assert_eq!(chunk.page_number, Some(12));
        assert!(chunk.section_title.is_none());
    }

    #[test]
    fn pedagogy_chunk_carries_module_fields() {
        let m = meta(json!({"module": "Module 2", "subject": "Science", "file_name": "dpse.pdf"}));
        let chunk = PedagogyChunk::from_stored("inquiry", &m, 0, 0.8);
        assert_eq!(chunk.content, "inquiry");
        assert!((chunk.relevance - 0.8).abs() < f32::EPSILON);
        assert_eq!(chunk.module.as_deref(), Some("Module 2"));
        assert_eq!(chunk.subject.as_deref(), Some("Science"));
        assert_eq!(chunk.file_name.as_deref(), Some("dpse.pdf"));
    }

    #[test]
    fn filename_accepts_either_key() {
        assert_eq!(
            metadata_filename(&meta(json!({"file_name": "a.pdf"}))).as_deref(),
            Some("a.pdf")
        );
        assert!(metadata_filename(&meta(json!({}))).is_none());
    }
}
