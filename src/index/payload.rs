//! Helpers for identifiers and remote payloads.

use crate::index::types::IndexEntry;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use uuid::Uuid;

/// Compute a deterministic SHA-256 hash for the chunk text.
pub fn compute_chunk_hash(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// Derive a stable UUID from arbitrary content.
///
/// The first 16 bytes of the SHA-256 digest become the UUID, so equal content always maps to the
/// same identifier and the remote index accepts it as a point id.
pub fn content_id(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    let mut bytes = [0_u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    Uuid::from_bytes(bytes).to_string()
}

/// Map an entry id onto something the remote index accepts as a point id.
pub(crate) fn point_id(id: &str) -> String {
    match Uuid::parse_str(id) {
        Ok(uuid) => uuid.to_string(),
        Err(_) => content_id(id),
    }
}

/// Build the payload object stored alongside each remote vector.
pub(crate) fn build_payload(entry: &IndexEntry, timestamp_rfc3339: &str) -> Value {
    let metadata = &entry.metadata;
    let mut payload = Map::new();
    payload.insert("chunk_id".into(), Value::String(entry.id.clone()));
    payload.insert("text".into(), Value::String(metadata.text.clone()));
    payload.insert(
        "chunk_hash".into(),
        Value::String(compute_chunk_hash(&metadata.text)),
    );
    payload.insert(
        "ingested_at".into(),
        Value::String(timestamp_rfc3339.to_string()),
    );

    if let Some(source) = metadata.source.as_ref().filter(|value| !value.is_empty()) {
        payload.insert("source".into(), Value::String(source.clone()));
    }
    if let Some(offset) = metadata.source_offset {
        payload.insert("source_offset".into(), Value::from(offset));
    }

    Value::Object(payload)
}

/// Current timestamp formatted for payload storage.
pub(crate) fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}
