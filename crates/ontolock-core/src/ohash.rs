//! Ontological hashing and the append-only ledger.
//!
//! An Ohash binds three things into one 256-bit identity: the physical
//! commitment (what device), the canonical digest of the governed artifact
//! (what state), and the previous chain head (what history). The ledger
//! stores Ohash records in causal order under a single logical writer and
//! never updates or deletes; "rollback" is only ever a new record whose
//! lineage marks it as a fork of an earlier one.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::LedgerError;
use crate::extractor::Commitment;

/// Domain separation tag for this deployment identity, version 1.
///
/// Changing the tag changes every downstream Ohash value, so it is versioned
/// explicitly here and must never be edited silently: a new deployment gets
/// a new `_V2` constant and a fresh ledger.
pub const DOMAIN_TAG_V1: &str = "ONTOLOCK_OHASH_V1";

/// Fixed-size 256-bit hash value used throughout the engine.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash256(pub [u8; 32]);

/// Previous-hash value of the first record in a ledger.
pub const GENESIS_SENTINEL: Hash256 = Hash256([0u8; 32]);

impl Hash256 {
    /// SHA-256 of arbitrary bytes.
    pub fn digest(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    /// Parse from a 64-character hex string.
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s).ok()?;
        let arr: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(arr))
    }

    /// Lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Display for Hash256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl std::fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Short form keeps verdict and ledger logs readable.
        write!(f, "Hash256({}..)", &self.to_hex()[..12])
    }
}

impl Serialize for Hash256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).ok_or_else(|| D::Error::custom("expected 64 hex characters"))
    }
}

/// Hash a domain tag string into its fixed-width record field.
pub fn domain_tag_hash(tag: &str) -> Hash256 {
    Hash256::digest(tag.as_bytes())
}

/// One immutable ledger entry.
///
/// Invariant: `id = SHA-256(domain_tag || commitment || artifact_digest ||
/// previous_hash)`. The timestamp is recorded but deliberately excluded from
/// the identity so that `compute_ohash` is reproducible across
/// implementations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OhashRecord {
    pub id: Hash256,
    pub commitment: Commitment,
    pub artifact_digest: Hash256,
    pub domain_tag: Hash256,
    pub previous_hash: Hash256,
    pub timestamp_ms: u64,
}

/// Fixed-width wire size of one record: five 256-bit fields plus a 64-bit
/// timestamp.
pub const RECORD_ENCODED_LEN: usize = 5 * 32 + 8;

impl OhashRecord {
    /// Canonical fixed-width encoding (see [`RECORD_ENCODED_LEN`]). Append
    /// order is the canonical record order; this encoding carries no
    /// sequence number.
    pub fn to_bytes(&self) -> [u8; RECORD_ENCODED_LEN] {
        let mut out = [0u8; RECORD_ENCODED_LEN];
        out[0..32].copy_from_slice(&self.id.0);
        out[32..64].copy_from_slice(&self.commitment.0.0);
        out[64..96].copy_from_slice(&self.artifact_digest.0);
        out[96..128].copy_from_slice(&self.domain_tag.0);
        out[128..160].copy_from_slice(&self.previous_hash.0);
        out[160..168].copy_from_slice(&self.timestamp_ms.to_be_bytes());
        out
    }

    /// Decode a fixed-width record. Returns `None` on length mismatch.
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() != RECORD_ENCODED_LEN {
            return None;
        }
        let field = |i: usize| -> Hash256 {
            let mut arr = [0u8; 32];
            arr.copy_from_slice(&data[i * 32..(i + 1) * 32]);
            Hash256(arr)
        };
        let mut ts = [0u8; 8];
        ts.copy_from_slice(&data[160..168]);
        Some(Self {
            id: field(0),
            commitment: Commitment(field(1)),
            artifact_digest: field(2),
            domain_tag: field(3),
            previous_hash: field(4),
            timestamp_ms: u64::from_be_bytes(ts),
        })
    }
}

/// Compute an Ohash record. Pure and deterministic: the same inputs always
/// produce the same id, across calls and across implementations.
pub fn compute_ohash(
    commitment: &Commitment,
    artifact_digest: Hash256,
    previous_hash: Hash256,
    domain_tag: &str,
    timestamp_ms: u64,
) -> OhashRecord {
    let tag = domain_tag_hash(domain_tag);
    let mut h = Sha256::new();
    h.update(tag.0);
    h.update(commitment.0.0);
    h.update(artifact_digest.0);
    h.update(previous_hash.0);
    OhashRecord {
        id: Hash256(h.finalize().into()),
        commitment: commitment.clone(),
        artifact_digest,
        domain_tag: tag,
        previous_hash,
        timestamp_ms,
    }
}

/// Receipt returned by a successful ledger append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppendReceipt {
    /// Id of the appended record; also the new chain head.
    pub record_id: Hash256,
    /// Zero-based position of the record in append order.
    pub height: u64,
    /// Ledger-local timestamp of the append.
    pub timestamp_ms: u64,
}

struct LedgerInner {
    records: Vec<OhashRecord>,
    by_id: HashMap<Hash256, usize>,
    consumed_parents: HashSet<Hash256>,
}

/// Append-only causal ledger with a single logical writer.
///
/// All mutation funnels through [`Ledger::append`], which holds an exclusive
/// section for the whole "validate against head, insert" step. A record is
/// either fully appended or not appended at all; failed appends leave no
/// observable trace.
pub struct Ledger {
    inner: Mutex<LedgerInner>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    /// Empty ledger whose head is the genesis sentinel.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(LedgerInner {
                records: Vec::new(),
                by_id: HashMap::new(),
                consumed_parents: HashSet::new(),
            }),
        }
    }

    /// Current chain head: id of the last record, or the genesis sentinel
    /// for an empty ledger. O(1).
    pub fn head(&self) -> Hash256 {
        let inner = self.inner.lock().unwrap();
        inner
            .records
            .last()
            .map(|r| r.id)
            .unwrap_or(GENESIS_SENTINEL)
    }

    /// Append a record.
    ///
    /// Fails with [`LedgerError::ChainDiscontinuity`] when the record does
    /// not link to the current head and [`LedgerError::DuplicateIdentity`]
    /// when its id already exists. Errors surface after the exclusive
    /// section releases, with the ledger unchanged.
    pub fn append(&self, record: OhashRecord) -> Result<AppendReceipt, LedgerError> {
        let mut inner = self.inner.lock().unwrap();

        let head = inner
            .records
            .last()
            .map(|r| r.id)
            .unwrap_or(GENESIS_SENTINEL);
        if record.previous_hash != head {
            return Err(LedgerError::ChainDiscontinuity {
                got: record.previous_hash,
                head,
            });
        }
        if inner.by_id.contains_key(&record.id) {
            return Err(LedgerError::DuplicateIdentity(record.id));
        }

        let height = inner.records.len() as u64;
        let receipt = AppendReceipt {
            record_id: record.id,
            height,
            timestamp_ms: record.timestamp_ms,
        };
        log::debug!(
            "ledger append: id={} height={} prev={}",
            record.id,
            height,
            record.previous_hash
        );
        inner.by_id.insert(record.id, height as usize);
        inner.consumed_parents.insert(record.previous_hash);
        inner.records.push(record);
        Ok(receipt)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a record with this id exists.
    pub fn contains(&self, id: Hash256) -> bool {
        self.inner.lock().unwrap().by_id.contains_key(&id)
    }

    /// Fetch a record by id.
    pub fn get(&self, id: Hash256) -> Option<OhashRecord> {
        let inner = self.inner.lock().unwrap();
        inner.by_id.get(&id).map(|&i| inner.records[i].clone())
    }

    /// Whether some admitted record already links to `parent` as its
    /// predecessor.
    pub fn is_consumed(&self, parent: Hash256) -> bool {
        self.inner.lock().unwrap().consumed_parents.contains(&parent)
    }

    /// Snapshot of all records in append order.
    pub fn records(&self) -> Vec<OhashRecord> {
        self.inner.lock().unwrap().records.clone()
    }

    /// Recompute every link and identity in the chain.
    ///
    /// Returns true only when the records form a single connected sequence
    /// starting at the genesis sentinel with every id matching its
    /// recomputation.
    pub fn verify_chain(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        let mut expected_prev = GENESIS_SENTINEL;
        for record in &inner.records {
            if record.previous_hash != expected_prev {
                return false;
            }
            let mut h = Sha256::new();
            h.update(record.domain_tag.0);
            h.update(record.commitment.0.0);
            h.update(record.artifact_digest.0);
            h.update(record.previous_hash.0);
            if Hash256(h.finalize().into()) != record.id {
                return false;
            }
            expected_prev = record.id;
        }
        true
    }
}
