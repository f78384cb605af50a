//! Audit Log
//!
//! Append-only, hash-chained store of calculation records. `append` is the
//! only mutator; the previous chain head is fetched atomically under the
//! append lock, so no two entries ever share a `prevChainHash` within a
//! stream. Verification recomputes every content hash from the stored
//! inputs/outputs/metadata and reports the first offending entry.
//!
//! Two backends behind one trait: an in-memory store for tests and
//! minimal deployments, and a sled-backed store keyed by big-endian
//! sequence number for natural chronological iteration.

pub mod canonical;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::error::EngineError;
use crate::types::{AuditEntry, AuditMetadata};

pub use canonical::{canonical_json, hash_value, sha256_hex, GENESIS_HASH};

// ============================================================================
// Pending entry and hashing
// ============================================================================

/// Everything the orchestrator supplies for one append. The store assigns
/// id, sequence and the hash fields.
#[derive(Debug, Clone)]
pub struct PendingAuditEntry {
    pub calculation_id: Uuid,
    pub performed_at: DateTime<Utc>,
    pub performer: String,
    pub software_version: String,
    pub calculation_method_version: String,
    pub inputs: Value,
    pub outputs: Value,
    pub metadata: AuditMetadata,
}

/// The canonical content document hashed into `contentHash`. Covers
/// inputs, outputs, metadata and the previous chain hash; the only
/// timestamp inside is `performedAt`.
pub fn content_document(entry: &AuditEntry) -> Result<Value, EngineError> {
    Ok(json!({
        "calculationId": entry.calculation_id.to_string(),
        "performedAt": entry.performed_at.to_rfc3339_opts(SecondsFormat::Micros, true),
        "performer": entry.performer,
        "softwareVersion": entry.software_version,
        "calculationMethodVersion": entry.calculation_method_version,
        "inputs": entry.inputs,
        "outputs": entry.outputs,
        "metadata": serde_json::to_value(&entry.metadata)?,
        "prevChainHash": entry.prev_chain_hash,
    }))
}

fn seal(pending: PendingAuditEntry, sequence: u64, prev_chain_hash: String) -> Result<AuditEntry, EngineError> {
    let input_hash = hash_value(&pending.inputs);
    let output_hash = hash_value(&pending.outputs);

    let mut entry = AuditEntry {
        id: Uuid::new_v4(),
        sequence,
        calculation_id: pending.calculation_id,
        performed_at: pending.performed_at,
        performer: pending.performer,
        inputs: pending.inputs,
        outputs: pending.outputs,
        metadata: pending.metadata,
        input_hash,
        output_hash,
        content_hash: String::new(),
        chain_hash: String::new(),
        prev_chain_hash,
        software_version: pending.software_version,
        calculation_method_version: pending.calculation_method_version,
    };

    let content_hash = hash_value(&content_document(&entry)?);
    entry.chain_hash = content_hash.clone();
    entry.content_hash = content_hash;
    Ok(entry)
}

// ============================================================================
// Verification
// ============================================================================

/// Outcome of a chain verification pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    Ok { entries_checked: usize },
    FirstBadAt {
        sequence: u64,
        chain_hash: String,
        reason: String,
    },
}

impl VerifyOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, VerifyOutcome::Ok { .. })
    }
}

impl std::fmt::Display for VerifyOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerifyOutcome::Ok { entries_checked } => {
                write!(f, "chain verified ({entries_checked} entries)")
            }
            VerifyOutcome::FirstBadAt {
                sequence,
                chain_hash,
                reason,
            } => write!(f, "chain broken at sequence {sequence} ({chain_hash}): {reason}"),
        }
    }
}

/// Recompute every content hash and check linkage over a contiguous run
/// of entries. `expected_prev` anchors the first entry: the genesis hash
/// for a full-stream pass, or the chain hash of the entry preceding the
/// range.
pub fn verify_entries(entries: &[AuditEntry], expected_prev: &str) -> VerifyOutcome {
    let mut prev = expected_prev.to_string();

    for entry in entries {
        if entry.prev_chain_hash != prev {
            return VerifyOutcome::FirstBadAt {
                sequence: entry.sequence,
                chain_hash: entry.chain_hash.clone(),
                reason: format!(
                    "prevChainHash {} does not match preceding chain head {prev}",
                    entry.prev_chain_hash
                ),
            };
        }

        let recomputed = match content_document(entry).map(|doc| hash_value(&doc)) {
            Ok(h) => h,
            Err(e) => {
                return VerifyOutcome::FirstBadAt {
                    sequence: entry.sequence,
                    chain_hash: entry.chain_hash.clone(),
                    reason: format!("content not re-encodable: {e}"),
                }
            }
        };

        if recomputed != entry.content_hash || entry.chain_hash != entry.content_hash {
            return VerifyOutcome::FirstBadAt {
                sequence: entry.sequence,
                chain_hash: entry.chain_hash.clone(),
                reason: format!("content hash mismatch (recomputed {recomputed})"),
            };
        }

        if hash_value(&entry.inputs) != entry.input_hash {
            return VerifyOutcome::FirstBadAt {
                sequence: entry.sequence,
                chain_hash: entry.chain_hash.clone(),
                reason: "input hash mismatch".to_string(),
            };
        }
        if hash_value(&entry.outputs) != entry.output_hash {
            return VerifyOutcome::FirstBadAt {
                sequence: entry.sequence,
                chain_hash: entry.chain_hash.clone(),
                reason: "output hash mismatch".to_string(),
            };
        }

        prev = entry.chain_hash.clone();
    }

    VerifyOutcome::Ok {
        entries_checked: entries.len(),
    }
}

// ============================================================================
// Store trait
// ============================================================================

/// Append-only audit stream. Implementations expose no mutation or
/// deletion surface; immutability is architectural, not conventional.
pub trait AuditStore: Send + Sync {
    /// The only mutator. Assigns sequence and hashes under the stream's
    /// append lock and returns the sealed entry.
    fn append(&self, pending: PendingAuditEntry) -> Result<AuditEntry, EngineError>;

    /// Latest entry for a calculation id.
    fn get(&self, calculation_id: Uuid) -> Result<Option<AuditEntry>, EngineError>;

    /// Entries with `start <= sequence <= end`, in order.
    fn load_range(&self, start: u64, end: u64) -> Result<Vec<AuditEntry>, EngineError>;

    /// Current chain head.
    fn head(&self) -> Result<Option<AuditEntry>, EngineError>;

    /// Number of committed entries.
    fn len(&self) -> Result<u64, EngineError>;

    fn is_empty(&self) -> Result<bool, EngineError> {
        Ok(self.len()? == 0)
    }

    /// Backend name for logging.
    fn backend_name(&self) -> &'static str;

    /// Verify a sequence range, anchoring the first entry against the
    /// entry before the range (or genesis).
    fn verify_range(&self, start: u64, end: u64) -> Result<VerifyOutcome, EngineError> {
        let expected_prev = if start == 0 {
            GENESIS_HASH.to_string()
        } else {
            match self.load_range(start - 1, start - 1)?.pop() {
                Some(prev) => prev.chain_hash,
                None => {
                    return Err(EngineError::internal(format!(
                        "verification anchor {} missing",
                        start - 1
                    )))
                }
            }
        };
        let entries = self.load_range(start, end)?;
        Ok(verify_entries(&entries, &expected_prev))
    }

    /// Verify the whole stream.
    fn verify_all(&self) -> Result<VerifyOutcome, EngineError> {
        let len = self.len()?;
        if len == 0 {
            return Ok(VerifyOutcome::Ok { entries_checked: 0 });
        }
        self.verify_range(0, len - 1)
    }
}

/// Shared append-time invariants: a calculation id can never re-enter the
/// stream with altered inputs or a non-advancing timestamp.
fn check_reissue(
    pending: &PendingAuditEntry,
    existing: Option<&AuditEntry>,
) -> Result<(), EngineError> {
    let Some(existing) = existing else {
        return Ok(());
    };
    if hash_value(&pending.inputs) != existing.input_hash {
        return Err(EngineError::AuditImmutableViolation {
            detail: format!(
                "calculationId {} already audited with different inputs",
                pending.calculation_id
            ),
        });
    }
    if pending.performed_at <= existing.performed_at {
        return Err(EngineError::AuditImmutableViolation {
            detail: format!(
                "performedAt must strictly increase per calculationId {} ({} then {})",
                pending.calculation_id, existing.performed_at, pending.performed_at
            ),
        });
    }
    Ok(())
}

// ============================================================================
// In-memory store
// ============================================================================

/// In-memory audit stream for tests and minimal deployments. Thread-safe;
/// not durable.
pub struct InMemoryAuditStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    entries: Vec<AuditEntry>,
    by_calculation: HashMap<Uuid, usize>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MemoryInner::default()),
        }
    }
}

impl Default for InMemoryAuditStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditStore for InMemoryAuditStore {
    fn append(&self, pending: PendingAuditEntry) -> Result<AuditEntry, EngineError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|e| EngineError::internal(format!("audit lock poisoned: {e}")))?;

        let existing = inner
            .by_calculation
            .get(&pending.calculation_id)
            .map(|&i| &inner.entries[i]);
        check_reissue(&pending, existing)?;

        let (sequence, prev) = match inner.entries.last() {
            Some(head) => (head.sequence + 1, head.chain_hash.clone()),
            None => (0, GENESIS_HASH.to_string()),
        };

        let entry = seal(pending, sequence, prev)?;
        let index = inner.entries.len();
        inner.by_calculation.insert(entry.calculation_id, index);
        inner.entries.push(entry.clone());
        Ok(entry)
    }

    fn get(&self, calculation_id: Uuid) -> Result<Option<AuditEntry>, EngineError> {
        let inner = self
            .inner
            .lock()
            .map_err(|e| EngineError::internal(format!("audit lock poisoned: {e}")))?;
        Ok(inner
            .by_calculation
            .get(&calculation_id)
            .map(|&i| inner.entries[i].clone()))
    }

    fn load_range(&self, start: u64, end: u64) -> Result<Vec<AuditEntry>, EngineError> {
        let inner = self
            .inner
            .lock()
            .map_err(|e| EngineError::internal(format!("audit lock poisoned: {e}")))?;
        Ok(inner
            .entries
            .iter()
            .filter(|e| e.sequence >= start && e.sequence <= end)
            .cloned()
            .collect())
    }

    fn head(&self) -> Result<Option<AuditEntry>, EngineError> {
        let inner = self
            .inner
            .lock()
            .map_err(|e| EngineError::internal(format!("audit lock poisoned: {e}")))?;
        Ok(inner.entries.last().cloned())
    }

    fn len(&self) -> Result<u64, EngineError> {
        let inner = self
            .inner
            .lock()
            .map_err(|e| EngineError::internal(format!("audit lock poisoned: {e}")))?;
        Ok(inner.entries.len() as u64)
    }

    fn backend_name(&self) -> &'static str {
        "InMemory"
    }
}

// ============================================================================
// Sled store
// ============================================================================

/// Durable audit stream on sled.
///
/// Key layout: `entries` tree keyed by sequence as u64 big-endian bytes
/// (sorts chronologically); `by_calculation` tree mapping calculation id
/// bytes to the latest sequence for that id. Appends serialize through a
/// process-level mutex, which also makes the head fetch atomic.
pub struct SledAuditStore {
    db: sled::Db,
    entries: sled::Tree,
    by_calculation: sled::Tree,
    append_lock: Mutex<()>,
}

impl SledAuditStore {
    /// Open or create the audit stream at the given directory.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        let db = sled::open(path)?;
        let entries = db.open_tree("entries")?;
        let by_calculation = db.open_tree("by_calculation")?;
        info!(entries = entries.len(), "opened audit stream");
        Ok(Self {
            db,
            entries,
            by_calculation,
            append_lock: Mutex::new(()),
        })
    }

    /// Flush pending writes to disk.
    pub fn flush(&self) -> Result<(), EngineError> {
        self.db.flush()?;
        Ok(())
    }

    fn decode(value: &[u8]) -> Result<AuditEntry, EngineError> {
        Ok(serde_json::from_slice(value)?)
    }
}

impl AuditStore for SledAuditStore {
    fn append(&self, pending: PendingAuditEntry) -> Result<AuditEntry, EngineError> {
        let _guard = self
            .append_lock
            .lock()
            .map_err(|e| EngineError::internal(format!("audit lock poisoned: {e}")))?;

        let existing = match self.by_calculation.get(pending.calculation_id.as_bytes())? {
            Some(seq_bytes) => match self.entries.get(seq_bytes)? {
                Some(raw) => Some(Self::decode(&raw)?),
                None => None,
            },
            None => None,
        };
        check_reissue(&pending, existing.as_ref())?;

        let (sequence, prev) = match self.entries.last()? {
            Some((_, raw)) => {
                let head = Self::decode(&raw)?;
                (head.sequence + 1, head.chain_hash)
            }
            None => (0, GENESIS_HASH.to_string()),
        };

        let entry = seal(pending, sequence, prev)?;
        let key = entry.sequence.to_be_bytes();
        let value = serde_json::to_vec(&entry)?;

        self.entries.insert(key, value)?;
        self.by_calculation
            .insert(entry.calculation_id.as_bytes(), &key[..])?;

        Ok(entry)
    }

    fn get(&self, calculation_id: Uuid) -> Result<Option<AuditEntry>, EngineError> {
        match self.by_calculation.get(calculation_id.as_bytes())? {
            Some(seq_bytes) => match self.entries.get(seq_bytes)? {
                Some(raw) => Ok(Some(Self::decode(&raw)?)),
                None => Ok(None),
            },
            None => Ok(None),
        }
    }

    fn load_range(&self, start: u64, end: u64) -> Result<Vec<AuditEntry>, EngineError> {
        let mut out = Vec::new();
        for item in self
            .entries
            .range(start.to_be_bytes()..=end.to_be_bytes())
        {
            let (_, raw) = item?;
            out.push(Self::decode(&raw)?);
        }
        Ok(out)
    }

    fn head(&self) -> Result<Option<AuditEntry>, EngineError> {
        match self.entries.last()? {
            Some((_, raw)) => Ok(Some(Self::decode(&raw)?)),
            None => Ok(None),
        }
    }

    fn len(&self) -> Result<u64, EngineError> {
        Ok(self.entries.len() as u64)
    }

    fn backend_name(&self) -> &'static str {
        "Sled"
    }
}
