//! Immutable audit entry for the hash-chained calculation log

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Provenance;

/// Context recorded alongside inputs and outputs in every audit entry.
/// Hashed as part of the entry content, so tampering with provenance or
/// version metadata breaks verification like tampering with a number.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuditMetadata {
    pub equipment_tag: String,
    /// Source of the resolved material properties.
    pub provenance: Provenance,
}

/// One write-once entry in the audit chain.
///
/// `chain_hash` equals `content_hash`, the SHA-256 of the canonical
/// encoding of `(inputs, outputs, metadata, prev_chain_hash)` plus the
/// identity fields. Entries are never updated or deleted; the store
/// refuses both at its boundary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: Uuid,
    /// Position in the log stream, assigned at append, starting at 0.
    pub sequence: u64,
    pub calculation_id: Uuid,
    pub performed_at: DateTime<Utc>,
    pub performer: String,
    /// Canonical snapshot of the job inputs.
    pub inputs: serde_json::Value,
    /// Canonical snapshot of the assessment outcome.
    pub outputs: serde_json::Value,
    pub metadata: AuditMetadata,
    /// SHA-256 lowercase hex of the canonical inputs.
    pub input_hash: String,
    /// SHA-256 lowercase hex of the canonical outputs.
    pub output_hash: String,
    /// SHA-256 lowercase hex over the full entry content document.
    pub content_hash: String,
    /// Chain head value after this entry; equals `content_hash`.
    pub chain_hash: String,
    /// `chain_hash` of the preceding entry, or the genesis constant.
    pub prev_chain_hash: String,
    pub software_version: String,
    pub calculation_method_version: String,
}
