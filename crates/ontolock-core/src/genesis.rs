//! Genesis artifact assembly with triple temporal anchoring.
//!
//! Genesis is the event that makes a system's origin externally verifiable:
//! after it, the past is fixed and disputes reduce to hash comparisons. The
//! assembler here is a pure function of its inputs plus a ledger snapshot;
//! it decides nothing about *when* to assemble. External orchestration
//! checks for a verification pass and supplies the stamp, and the assembler
//! refuses to run without one.
//!
//! The artifact carries three independently sourced timestamps (local clock,
//! network time authority, ledger append receipt) so that no single anchor
//! source can be forged without drifting visibly from the other two.

use std::collections::BTreeMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::algebra::PsiState;
use crate::error::GenesisError;
use crate::extractor::{Commitment, HelperData};
use crate::ohash::{AppendReceipt, Hash256, OhashRecord};

const GENESIS_TAG: &[u8] = b"ONTOLOCK_GENESIS_V1";
const BUNDLE_TAG: &[u8] = b"ONTOLOCK_BUNDLE_V1";
const ANCHOR_TAG: &[u8] = b"ONTOLOCK_ANCHOR_V1";
const WITNESS_TAG: &[u8] = b"ONTOLOCK_WITNESS_V1";

/// Largest timestamp spread the three anchors may show and still count as
/// mutually consistent.
pub const DEFAULT_MAX_DRIFT_MS: u64 = 5_000;

// ---------------------------------------------------------------------------
// Verification stamp
// ---------------------------------------------------------------------------

/// The small text artifact an external verification pass leaves behind.
///
/// Rendered as `Key: Value` lines; the assembler only ever consumes a parsed
/// stamp, and only assembles when its status is PASS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationStamp {
    /// When the verification pass completed (ISO 8601, opaque here).
    pub timestamp: String,
    /// Aggregate digest over the verified sources.
    pub source_hash: Hash256,
    /// Toolchain or environment identifier of the verifying run.
    pub environment: String,
    pub passed: bool,
}

impl VerificationStamp {
    /// Parse the `Key: Value` stamp text.
    pub fn parse(text: &str) -> Result<Self, GenesisError> {
        let mut fields: BTreeMap<&str, &str> = BTreeMap::new();
        for line in text.lines() {
            if let Some((key, value)) = line.split_once(':') {
                fields.insert(key.trim(), value.trim());
            }
        }
        let field = |key: &str| {
            fields
                .get(key)
                .copied()
                .ok_or_else(|| GenesisError::MissingVerificationProof(format!("stamp field '{key}' missing")))
        };

        let source_hash = Hash256::from_hex(field("SourceHash")?).ok_or_else(|| {
            GenesisError::MissingVerificationProof("stamp field 'SourceHash' is not a hash".to_string())
        })?;
        let passed = match field("Status")? {
            "PASS" => true,
            "FAIL" => false,
            other => {
                return Err(GenesisError::MissingVerificationProof(format!(
                    "stamp status '{other}' is neither PASS nor FAIL"
                )));
            }
        };

        Ok(Self {
            timestamp: field("Timestamp")?.to_string(),
            source_hash,
            environment: field("Environment")?.to_string(),
            passed,
        })
    }

    pub fn render(&self) -> String {
        format!(
            "Timestamp: {}\nSourceHash: {}\nEnvironment: {}\nStatus: {}\n",
            self.timestamp,
            self.source_hash,
            self.environment,
            if self.passed { "PASS" } else { "FAIL" }
        )
    }
}

// ---------------------------------------------------------------------------
// File bundle
// ---------------------------------------------------------------------------

/// The declared file set an artifact covers.
///
/// Files are keyed by name in sorted order, so the bundle hash is independent
/// of insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileBundle {
    files: BTreeMap<String, Vec<u8>>,
}

impl FileBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, name: impl Into<String>, content: Vec<u8>) {
        self.files.insert(name.into(), content);
    }

    pub fn file_digest(&self, name: &str) -> Option<Hash256> {
        self.files.get(name).map(|content| Hash256::digest(content))
    }

    /// Per-file digest manifest, keyed by file name.
    pub fn manifest(&self) -> BTreeMap<String, Hash256> {
        self.files
            .iter()
            .map(|(name, content)| (name.clone(), Hash256::digest(content)))
            .collect()
    }

    /// Digest over the whole bundle: the artifact's integrity vector.
    pub fn bundle_hash(&self) -> Hash256 {
        let mut h = Sha256::new();
        h.update(BUNDLE_TAG);
        for (name, content) in &self.files {
            h.update((name.len() as u64).to_be_bytes());
            h.update(name.as_bytes());
            h.update((content.len() as u64).to_be_bytes());
            h.update(content);
        }
        Hash256(h.finalize().into())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Anchors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorKind {
    /// Local system clock.
    System,
    /// Network time authority.
    Network,
    /// Ledger append receipt.
    Ledger,
}

impl std::fmt::Display for AnchorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::System => "system",
            Self::Network => "network",
            Self::Ledger => "ledger",
        };
        write!(f, "{s}")
    }
}

/// One temporal anchor: a timestamp, where it came from, and an optional
/// proof hash (the ledger anchor carries its record id here).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    pub kind: AnchorKind,
    pub timestamp_ms: u64,
    pub source: String,
    pub proof: Option<Hash256>,
}

/// An external source of network time.
///
/// One call is one bounded attempt; `None` means timeout or unreachable.
/// The assembler grants a single retry before failing the anchor.
pub trait TimeAuthority: Send + Sync {
    fn name(&self) -> &str;
    fn fetch_ms(&self) -> Option<u64>;
}

/// Build the system anchor from an explicitly supplied clock reading, so
/// assembly stays a pure function of its inputs.
pub fn system_anchor(now_ms: u64) -> Anchor {
    Anchor {
        kind: AnchorKind::System,
        timestamp_ms: now_ms,
        source: "system_clock".to_string(),
        proof: None,
    }
}

/// Obtain the network anchor from a time authority, retrying once.
pub fn network_anchor(authority: &dyn TimeAuthority) -> Result<Anchor, GenesisError> {
    let timestamp_ms = authority
        .fetch_ms()
        .or_else(|| {
            log::warn!("time authority '{}' timed out, retrying once", authority.name());
            authority.fetch_ms()
        })
        .ok_or_else(|| GenesisError::AnchorUnavailable {
            source: authority.name().to_string(),
        })?;
    Ok(Anchor {
        kind: AnchorKind::Network,
        timestamp_ms,
        source: authority.name().to_string(),
        proof: None,
    })
}

/// Build the ledger anchor from an append receipt; the record id is the
/// proof.
pub fn ledger_anchor(receipt: &AppendReceipt) -> Anchor {
    Anchor {
        kind: AnchorKind::Ledger,
        timestamp_ms: receipt.timestamp_ms,
        source: format!("ledger:{}", receipt.height),
        proof: Some(receipt.record_id),
    }
}

/// Three independently sourced anchors bundled against single-source forgery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripleAnchor {
    pub system: Anchor,
    pub network: Anchor,
    pub ledger: Anchor,
}

impl TripleAnchor {
    pub fn new(system: Anchor, network: Anchor, ledger: Anchor) -> Self {
        Self { system, network, ledger }
    }

    fn anchors(&self) -> [&Anchor; 3] {
        [&self.system, &self.network, &self.ledger]
    }

    /// Spread between the earliest and latest anchor timestamps.
    pub fn max_drift_ms(&self) -> u64 {
        let ts = self.anchors().map(|a| a.timestamp_ms);
        let min = ts.iter().min().copied().unwrap_or(0);
        let max = ts.iter().max().copied().unwrap_or(0);
        max - min
    }

    /// Whether the three sources agree to within `max_drift_ms`. A forged
    /// anchor shows up as drift against the other two.
    pub fn is_consistent(&self, max_drift_ms: u64) -> bool {
        self.max_drift_ms() <= max_drift_ms
    }

    pub fn anchor_hash(&self) -> Hash256 {
        let mut h = Sha256::new();
        h.update(ANCHOR_TAG);
        for anchor in self.anchors() {
            h.update([anchor.kind as u8]);
            h.update(anchor.timestamp_ms.to_be_bytes());
            h.update((anchor.source.len() as u64).to_be_bytes());
            h.update(anchor.source.as_bytes());
            match anchor.proof {
                Some(proof) => {
                    h.update([1u8]);
                    h.update(proof.0);
                }
                None => h.update([0u8]),
            }
        }
        Hash256(h.finalize().into())
    }
}

// ---------------------------------------------------------------------------
// Anchor sink
// ---------------------------------------------------------------------------

/// Receipt returned by an anchor sink on successful registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorReceipt {
    pub identity: Hash256,
    /// Zero-based registration position in the sink.
    pub position: u64,
}

/// External registry of artifact identities.
///
/// Registration is idempotent by refusal: re-registering an identity fails
/// with [`GenesisError::AlreadyRegistered`] instead of overwriting.
pub trait AnchorSink: Send + Sync {
    fn register(&self, identity: Hash256, payload: Vec<u8>) -> Result<AnchorReceipt, GenesisError>;
    fn get(&self, identity: Hash256) -> Option<Vec<u8>>;
}

/// In-memory sink for tests, demos, and single-process deployments.
#[derive(Debug, Default)]
pub struct MemoryAnchorSink {
    entries: Mutex<BTreeMap<Hash256, Vec<u8>>>,
}

impl MemoryAnchorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }
}

impl AnchorSink for MemoryAnchorSink {
    fn register(&self, identity: Hash256, payload: Vec<u8>) -> Result<AnchorReceipt, GenesisError> {
        let mut entries = self.entries.lock().unwrap();
        if entries.contains_key(&identity) {
            return Err(GenesisError::AlreadyRegistered(identity));
        }
        let position = entries.len() as u64;
        entries.insert(identity, payload);
        Ok(AnchorReceipt { identity, position })
    }

    fn get(&self, identity: Hash256) -> Option<Vec<u8>> {
        self.entries.lock().unwrap().get(&identity).cloned()
    }
}

// ---------------------------------------------------------------------------
// Artifact
// ---------------------------------------------------------------------------

/// How descendants may relate to this artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineagePolicy {
    /// Parent artifact hash; `None` for a true genesis.
    pub parent: Option<Hash256>,
    pub fork_allowed: bool,
}

impl LineagePolicy {
    pub fn genesis() -> Self {
        Self {
            parent: None,
            fork_allowed: false,
        }
    }

    pub fn child_of(parent: Hash256) -> Self {
        Self {
            parent: Some(parent),
            fork_allowed: false,
        }
    }
}

/// Digest over the physical witness: the identity commitment plus helper
/// data metadata. The raw secret never enters this hash.
pub fn witness_hash(commitment: &Commitment, helper: &HelperData) -> Hash256 {
    let mut h = Sha256::new();
    h.update(WITNESS_TAG);
    h.update((commitment.0).0);
    h.update((helper.repetition as u64).to_be_bytes());
    h.update((helper.offset.len() as u64).to_be_bytes());
    h.update(helper.check.0);
    Hash256(h.finalize().into())
}

/// The immutable artifact of a genesis event. Created once per admitted
/// root state; descendants reference it by hash only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisArtifact {
    /// Bundle hash over the declared file set.
    pub integrity_vector: Hash256,
    pub identity_commitment: Commitment,
    /// Per-file digest manifest.
    pub bundle_hashes: BTreeMap<String, Hash256>,
    pub witness_hash: Hash256,
    /// Hex-encoded detached signatures over the canonical bytes.
    pub signatures: Vec<String>,
    pub triple_anchor: TripleAnchor,
    pub lineage_policy: LineagePolicy,
}

impl GenesisArtifact {
    /// Canonical byte encoding: fixed-width fields, length-prefixed variable
    /// fields, manifest in sorted name order. Byte-identical inputs produce
    /// byte-identical encodings.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(GENESIS_TAG);
        out.extend_from_slice(&self.integrity_vector.0);
        out.extend_from_slice(&(self.identity_commitment.0).0);

        out.extend_from_slice(&(self.bundle_hashes.len() as u64).to_be_bytes());
        for (name, digest) in &self.bundle_hashes {
            out.extend_from_slice(&(name.len() as u64).to_be_bytes());
            out.extend_from_slice(name.as_bytes());
            out.extend_from_slice(&digest.0);
        }

        out.extend_from_slice(&self.witness_hash.0);

        out.extend_from_slice(&(self.signatures.len() as u64).to_be_bytes());
        for sig in &self.signatures {
            out.extend_from_slice(&(sig.len() as u64).to_be_bytes());
            out.extend_from_slice(sig.as_bytes());
        }

        out.extend_from_slice(&self.triple_anchor.anchor_hash().0);

        match self.lineage_policy.parent {
            Some(parent) => {
                out.push(1);
                out.extend_from_slice(&parent.0);
            }
            None => out.push(0),
        }
        out.push(self.lineage_policy.fork_allowed as u8);
        out
    }

    /// The artifact's own identity: digest of its canonical encoding.
    pub fn artifact_hash(&self) -> Hash256 {
        Hash256::digest(&self.canonical_bytes())
    }

    /// Human-facing JSON export. Display form only: the canonical encoding,
    /// not this JSON, is what [`GenesisArtifact::artifact_hash`] covers.
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).expect("artifact serializes")
    }

    /// Register this artifact's identity with an anchor sink, using the
    /// canonical encoding as payload.
    pub fn anchor(&self, sink: &dyn AnchorSink) -> Result<AnchorReceipt, GenesisError> {
        sink.register(self.artifact_hash(), self.canonical_bytes())
    }
}

/// Assemble a genesis artifact from an admitted state and a ledger snapshot.
///
/// Pure over its inputs: no clock reads, no network, no sink calls. Refuses
/// without a PASS verification stamp, and refuses when the admitted state's
/// predecessor or the declared parent artifact cannot be resolved in the
/// snapshot.
pub fn assemble(
    admitted_state: &PsiState,
    ledger_snapshot: &[OhashRecord],
    commitment: &Commitment,
    helper: &HelperData,
    bundle: &FileBundle,
    stamp: Option<&VerificationStamp>,
    anchors: TripleAnchor,
    lineage: LineagePolicy,
    signatures: Vec<String>,
) -> Result<GenesisArtifact, GenesisError> {
    let stamp = stamp.ok_or_else(|| {
        GenesisError::MissingVerificationProof("no verification stamp supplied".to_string())
    })?;
    if !stamp.passed {
        return Err(GenesisError::MissingVerificationProof(
            "verification stamp status is FAIL".to_string(),
        ));
    }

    let resolvable = |hash: Hash256| ledger_snapshot.iter().any(|r| r.id == hash);
    if !admitted_state.is_root() && !resolvable(admitted_state.previous_state_hash) {
        return Err(GenesisError::IncompleteLineage(admitted_state.previous_state_hash));
    }
    if let Some(parent) = lineage.parent {
        if !resolvable(parent) {
            return Err(GenesisError::IncompleteLineage(parent));
        }
    }

    let artifact = GenesisArtifact {
        integrity_vector: bundle.bundle_hash(),
        identity_commitment: commitment.clone(),
        bundle_hashes: bundle.manifest(),
        witness_hash: witness_hash(commitment, helper),
        signatures,
        triple_anchor: anchors,
        lineage_policy: lineage,
    };
    log::info!(
        "genesis: assembled artifact {} over {} bundle files",
        artifact.artifact_hash(),
        artifact.bundle_hashes.len()
    );
    Ok(artifact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ohash::{DOMAIN_TAG_V1, GENESIS_SENTINEL, compute_ohash};

    fn stamp() -> VerificationStamp {
        VerificationStamp {
            timestamp: "2026-08-23T10:00:00Z".to_string(),
            source_hash: Hash256::digest(b"sources"),
            environment: "rustc-1.85".to_string(),
            passed: true,
        }
    }

    fn bundle() -> FileBundle {
        let mut b = FileBundle::new();
        b.add_file("src/lib.rs", b"pub fn main() {}".to_vec());
        b.add_file("Cargo.toml", b"[package]".to_vec());
        b
    }

    fn anchors(base_ms: u64, record_id: Hash256) -> TripleAnchor {
        TripleAnchor::new(
            system_anchor(base_ms),
            Anchor {
                kind: AnchorKind::Network,
                timestamp_ms: base_ms + 40,
                source: "pool.ntp.org".to_string(),
                proof: None,
            },
            Anchor {
                kind: AnchorKind::Ledger,
                timestamp_ms: base_ms + 90,
                source: "ledger:0".to_string(),
                proof: Some(record_id),
            },
        )
    }

    fn helper() -> HelperData {
        HelperData {
            offset: vec![0xAB; 160],
            repetition: 5,
            check: Hash256::digest(b"key-check"),
        }
    }

    fn commitment() -> Commitment {
        Commitment(Hash256::digest(b"commitment"))
    }

    fn root_state() -> PsiState {
        PsiState {
            timestamp_ms: 1_000,
            location: (40.4, -3.7),
            temperature_c: 21.0,
            environmental_entropy_bits: 150.0,
            previous_state_hash: GENESIS_SENTINEL,
            algebraic_tag: "psi-root".to_string(),
        }
    }

    fn snapshot() -> Vec<OhashRecord> {
        vec![compute_ohash(
            &commitment(),
            Hash256::digest(b"state"),
            GENESIS_SENTINEL,
            DOMAIN_TAG_V1,
            1_000,
        )]
    }

    // ------------------------------------------------------------------
    // Verification stamp
    // ------------------------------------------------------------------

    #[test]
    fn test_stamp_render_parse_round_trip() {
        let s = stamp();
        let parsed = VerificationStamp::parse(&s.render()).unwrap();
        assert_eq!(parsed, s);
    }

    #[test]
    fn test_stamp_fail_status_parses_but_blocks_assembly() {
        let mut s = stamp();
        s.passed = false;
        let parsed = VerificationStamp::parse(&s.render()).unwrap();
        assert!(!parsed.passed);

        let snap = snapshot();
        let err = assemble(
            &root_state(),
            &snap,
            &commitment(),
            &helper(),
            &bundle(),
            Some(&parsed),
            anchors(1_000, snap[0].id),
            LineagePolicy::genesis(),
            Vec::new(),
        )
        .unwrap_err();
        assert!(matches!(err, GenesisError::MissingVerificationProof(_)));
    }

    #[test]
    fn test_stamp_rejects_missing_field_and_bad_status() {
        let err = VerificationStamp::parse("Timestamp: now\nStatus: PASS\n").unwrap_err();
        assert!(matches!(err, GenesisError::MissingVerificationProof(_)));

        let text = stamp().render().replace("PASS", "MAYBE");
        let err = VerificationStamp::parse(&text).unwrap_err();
        assert!(matches!(err, GenesisError::MissingVerificationProof(_)));
    }

    // ------------------------------------------------------------------
    // Bundle
    // ------------------------------------------------------------------

    #[test]
    fn test_bundle_hash_order_independent() {
        let mut a = FileBundle::new();
        a.add_file("b.rs", b"bbb".to_vec());
        a.add_file("a.rs", b"aaa".to_vec());

        let mut b = FileBundle::new();
        b.add_file("a.rs", b"aaa".to_vec());
        b.add_file("b.rs", b"bbb".to_vec());

        assert_eq!(a.bundle_hash(), b.bundle_hash());
        assert_eq!(a.manifest(), b.manifest());
    }

    #[test]
    fn test_bundle_hash_sensitive_to_content() {
        let mut a = bundle();
        let before = a.bundle_hash();
        a.add_file("src/lib.rs", b"pub fn main() { }".to_vec());
        assert_ne!(a.bundle_hash(), before);
        assert_eq!(
            a.file_digest("src/lib.rs").unwrap(),
            Hash256::digest(b"pub fn main() { }")
        );
    }

    // ------------------------------------------------------------------
    // Anchors
    // ------------------------------------------------------------------

    #[test]
    fn test_triple_anchor_drift() {
        let a = anchors(1_000, Hash256([1; 32]));
        assert_eq!(a.max_drift_ms(), 90);
        assert!(a.is_consistent(DEFAULT_MAX_DRIFT_MS));

        let mut forged = a.clone();
        forged.network.timestamp_ms = 1_000 + DEFAULT_MAX_DRIFT_MS + 1;
        assert!(!forged.is_consistent(DEFAULT_MAX_DRIFT_MS));
    }

    struct FlakyAuthority {
        failures_left: Mutex<u32>,
    }

    impl TimeAuthority for FlakyAuthority {
        fn name(&self) -> &str {
            "flaky.ntp"
        }

        fn fetch_ms(&self) -> Option<u64> {
            let mut left = self.failures_left.lock().unwrap();
            if *left > 0 {
                *left -= 1;
                None
            } else {
                Some(5_000)
            }
        }
    }

    #[test]
    fn test_network_anchor_single_retry() {
        let one_failure = FlakyAuthority { failures_left: Mutex::new(1) };
        let anchor = network_anchor(&one_failure).unwrap();
        assert_eq!(anchor.timestamp_ms, 5_000);
        assert_eq!(anchor.source, "flaky.ntp");

        // Two consecutive timeouts exhaust the single retry.
        let two_failures = FlakyAuthority { failures_left: Mutex::new(2) };
        let err = network_anchor(&two_failures).unwrap_err();
        assert_eq!(
            err,
            GenesisError::AnchorUnavailable { source: "flaky.ntp".to_string() }
        );
    }

    #[test]
    fn test_ledger_anchor_carries_record_proof() {
        let receipt = AppendReceipt {
            record_id: Hash256([7; 32]),
            height: 3,
            timestamp_ms: 9_000,
        };
        let anchor = ledger_anchor(&receipt);
        assert_eq!(anchor.kind, AnchorKind::Ledger);
        assert_eq!(anchor.proof, Some(Hash256([7; 32])));
        assert_eq!(anchor.source, "ledger:3");
    }

    // ------------------------------------------------------------------
    // Anchor sink
    // ------------------------------------------------------------------

    #[test]
    fn test_sink_refuses_re_registration() {
        let sink = MemoryAnchorSink::new();
        let id = Hash256::digest(b"artifact");

        let receipt = sink.register(id, b"payload".to_vec()).unwrap();
        assert_eq!(receipt.position, 0);
        assert_eq!(sink.get(id).unwrap(), b"payload");

        let err = sink.register(id, b"other".to_vec()).unwrap_err();
        assert_eq!(err, GenesisError::AlreadyRegistered(id));
        // The original payload survives the refused overwrite.
        assert_eq!(sink.get(id).unwrap(), b"payload");
    }

    // ------------------------------------------------------------------
    // Assembly
    // ------------------------------------------------------------------

    fn assemble_default() -> GenesisArtifact {
        let snap = snapshot();
        let s = stamp();
        assemble(
            &root_state(),
            &snap,
            &commitment(),
            &helper(),
            &bundle(),
            Some(&s),
            anchors(1_000, snap[0].id),
            LineagePolicy::genesis(),
            vec!["deadbeef".to_string()],
        )
        .unwrap()
    }

    #[test]
    fn test_assembly_byte_reproducible() {
        let first = assemble_default();
        let second = assemble_default();
        assert_eq!(first.canonical_bytes(), second.canonical_bytes());
        assert_eq!(first.artifact_hash(), second.artifact_hash());
    }

    #[test]
    fn test_assembly_requires_stamp() {
        let snap = snapshot();
        let err = assemble(
            &root_state(),
            &snap,
            &commitment(),
            &helper(),
            &bundle(),
            None,
            anchors(1_000, snap[0].id),
            LineagePolicy::genesis(),
            Vec::new(),
        )
        .unwrap_err();
        assert!(matches!(err, GenesisError::MissingVerificationProof(_)));
    }

    #[test]
    fn test_assembly_rejects_unresolvable_parent() {
        let snap = snapshot();
        let s = stamp();
        let missing = Hash256::digest(b"nowhere");
        let err = assemble(
            &root_state(),
            &snap,
            &commitment(),
            &helper(),
            &bundle(),
            Some(&s),
            anchors(1_000, snap[0].id),
            LineagePolicy::child_of(missing),
            Vec::new(),
        )
        .unwrap_err();
        assert_eq!(err, GenesisError::IncompleteLineage(missing));
    }

    #[test]
    fn test_assembly_rejects_unresolvable_predecessor() {
        let snap = snapshot();
        let s = stamp();
        let mut state = root_state();
        state.previous_state_hash = Hash256::digest(b"orphan");
        let err = assemble(
            &state,
            &snap,
            &commitment(),
            &helper(),
            &bundle(),
            Some(&s),
            anchors(1_000, snap[0].id),
            LineagePolicy::genesis(),
            Vec::new(),
        )
        .unwrap_err();
        assert_eq!(err, GenesisError::IncompleteLineage(Hash256::digest(b"orphan")));
    }

    #[test]
    fn test_witness_hash_excludes_offset_bytes() {
        // Only helper metadata enters the witness hash: same length, same
        // check digest, different offset contents hash identically.
        let a = helper();
        let mut b = helper();
        b.offset = vec![0xCD; 160];
        assert_eq!(witness_hash(&commitment(), &a), witness_hash(&commitment(), &b));

        let mut c = helper();
        c.check = Hash256::digest(b"other-key");
        assert_ne!(witness_hash(&commitment(), &a), witness_hash(&commitment(), &c));
    }

    #[test]
    fn test_artifact_hash_changes_with_lineage() {
        let base = assemble_default();
        let snap = snapshot();
        let s = stamp();
        let child = assemble(
            &root_state(),
            &snap,
            &commitment(),
            &helper(),
            &bundle(),
            Some(&s),
            anchors(1_000, snap[0].id),
            LineagePolicy::child_of(snap[0].id),
            vec!["deadbeef".to_string()],
        )
        .unwrap();
        assert_ne!(base.artifact_hash(), child.artifact_hash());
    }

    #[test]
    fn test_anchoring_registers_canonical_payload() {
        let artifact = assemble_default();
        let sink = MemoryAnchorSink::new();
        let receipt = artifact.anchor(&sink).unwrap();
        assert_eq!(receipt.identity, artifact.artifact_hash());
        assert_eq!(sink.get(receipt.identity).unwrap(), artifact.canonical_bytes());

        // Genesis happens once: a second anchoring of the same artifact fails.
        assert!(artifact.anchor(&sink).is_err());
    }
}
