//! Typed error taxonomy for the anchoring-and-admissibility engine.
//!
//! Rule violations are deliberately *not* represented here: a rejection is an
//! ordinary outcome carried inside an [`crate::algebra::OmegaVerdict`], not an
//! exceptional one. Everything in this module is a genuine failure of the
//! operation that raised it.

use thiserror::Error;

use crate::ohash::Hash256;

/// Failures of the fuzzy key extractor.
#[derive(Debug, Error, PartialEq)]
pub enum ExtractorError {
    /// The bit-error rate between enrollment and reconstruction measurements
    /// exceeds the error-correcting code's capacity. Recoverable by
    /// re-sampling the source, never by relaxing the threshold.
    #[error("measurement noise exceeds correction capacity ({errors} uncorrected bit errors)")]
    Extraction { errors: usize },

    /// Enrollment-time entropy estimate fell below the configured floor.
    /// Fatal to this enrollment.
    #[error("extractable entropy estimate {estimated_bits:.1} bits below floor of {floor_bits:.1} bits")]
    InsufficientEntropy {
        estimated_bits: f64,
        floor_bits: f64,
    },

    /// The measurement does not carry enough bits for the configured code.
    #[error("measurement of {got} bytes shorter than required {required} bytes")]
    MeasurementTooShort { got: usize, required: usize },

    /// Helper data is malformed (wrong length or truncated check digest).
    #[error("helper data malformed: {0}")]
    MalformedHelper(String),
}

/// Failures of a ledger append. Always fatal to that append attempt; the
/// caller must re-derive the record from the fresh head, never auto-retry
/// with mutated data.
#[derive(Debug, Error, PartialEq)]
pub enum LedgerError {
    /// The record's previous-hash link does not equal the current chain head.
    #[error("chain discontinuity: record links to {got} but head is {head}")]
    ChainDiscontinuity { got: Hash256, head: Hash256 },

    /// A record with this identity hash already exists.
    #[error("duplicate identity {0}")]
    DuplicateIdentity(Hash256),
}

/// Failures of genesis artifact assembly and anchoring.
///
/// `Display` and `Error` are implemented by hand rather than derived because
/// `thiserror` would treat the `source: String` field of
/// [`GenesisError::AnchorUnavailable`] as an implicit error source, which a
/// `String` cannot be.
#[derive(Debug, PartialEq)]
pub enum GenesisError {
    /// A declared parent artifact hash cannot be resolved in the ledger
    /// snapshot.
    IncompleteLineage(Hash256),

    /// An anchor source stayed unreachable after its single bounded retry.
    /// The artifact is never assembled without all three anchors.
    AnchorUnavailable { source: String },

    /// Assembly was requested without a PASS verification stamp.
    MissingVerificationProof(String),

    /// The anchor sink already holds this identity; registration is
    /// idempotent-by-refusal, never a silent overwrite.
    AlreadyRegistered(Hash256),
}

impl std::fmt::Display for GenesisError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IncompleteLineage(parent) => {
                write!(f, "incomplete lineage: parent {parent} not found in ledger snapshot")
            }
            Self::AnchorUnavailable { source } => {
                write!(f, "anchor source '{source}' unavailable after retry")
            }
            Self::MissingVerificationProof(what) => {
                write!(f, "missing verification proof: {what}")
            }
            Self::AlreadyRegistered(identity) => {
                write!(f, "identity {identity} already registered in anchor sink")
            }
        }
    }
}

impl std::error::Error for GenesisError {}

/// Failures of antifragility scoring.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum ScoreError {
    /// `attack_energy == 0` means "no attack, not applicable" — the entry is
    /// excluded from aggregates rather than crashing the scorer.
    #[error("antifragility ratio undefined for zero attack energy")]
    DivisionUndefined,
}
