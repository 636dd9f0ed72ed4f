//! # ontolock-core
//!
//! **Anchor digital state to physics.**
//!
//! `ontolock-core` turns noisy physical measurements into a stable
//! cryptographic identity and guards an append-only causal ledger with a
//! fail-closed admissibility gate.
//!
//! ## Quick Start
//!
//! ```no_run
//! use ontolock_core::extractor::FuzzyExtractor;
//! use ontolock_core::source::PufSource;
//! use ontolock_core::sources::SimulatedPuf;
//!
//! let puf = SimulatedPuf::with_seed(42);
//! let extractor = FuzzyExtractor::default();
//!
//! // Enroll once: derive the public commitment and helper data.
//! let measurement = puf.sample();
//! let enrollment = extractor.enroll(&measurement).unwrap();
//!
//! // Later: reconstruct the stable secret from a noisy re-measurement.
//! let noisy = puf.sample();
//! let secret = extractor.reconstruct(&noisy, &enrollment.helper).unwrap();
//! assert_eq!(secret.commitment(), enrollment.commitment);
//! ```
//!
//! ## Architecture
//!
//! Source → Fuzzy Extractor → (secret, commitment) → Ohash → Ledger
//! append ⟷ Omega gate → Genesis assembler → Antifragility scorer
//!
//! - Every noise source implements the [`source::PufSource`] trait; the
//!   simulated source is a swappable stand-in for real hardware.
//! - The [`ohash::Ledger`] is an explicit, passed-by-reference value with a
//!   single logical writer, never a process-wide singleton.
//! - The [`algebra::OmegaGate`] is fail-closed: an indeterminate result is
//!   a rejection, and every verdict reports all three facets (rules, chain
//!   continuity, signature) together.
//! - [`genesis::assemble`] is a pure function; external orchestration
//!   decides when to call it and must supply a PASS verification stamp.
//! - The [`antifragility`] scorer reports and never feeds back into
//!   admissibility.

pub mod algebra;
pub mod antifragility;
pub mod config;
pub mod entropy;
pub mod error;
pub mod extractor;
pub mod genesis;
pub mod ohash;
pub mod source;
pub mod sources;

pub use algebra::{
    Candidate, GatePhase, GateStats, KeyedHashScheme, OmegaGate, OmegaVerdict, PsiState,
    PsiTrajectory, ReasonCode, SignatureScheme, SigmaRule, Violation, default_rules,
};
pub use antifragility::{AntifragilityReport, AttackTrial, score, score_trial};
pub use config::{ExtractorConfig, GateConfig};
pub use entropy::{compression_ratio, min_entropy, sample_entropy_bits, shannon_entropy};
pub use error::{ExtractorError, GenesisError, LedgerError, ScoreError};
pub use extractor::{Commitment, Enrollment, FuzzyExtractor, HelperData, StableSecret};
pub use genesis::{
    Anchor, AnchorKind, AnchorReceipt, AnchorSink, FileBundle, GenesisArtifact, LineagePolicy,
    MemoryAnchorSink, TimeAuthority, TripleAnchor, VerificationStamp, assemble, witness_hash,
};
pub use ohash::{
    AppendReceipt, DOMAIN_TAG_V1, GENESIS_SENTINEL, Hash256, Ledger, OhashRecord, compute_ohash,
};
pub use source::{PufSource, RawMeasurement, SourceCategory, SourceInfo};
pub use sources::SimulatedPuf;

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
