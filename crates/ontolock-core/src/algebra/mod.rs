//! Sigma-Omega-Psi admissibility algebra.
//!
//! - `psi` — causal trajectory states and the chain tracker.
//! - `rules` — Sigma rules: named, pure predicates over a candidate
//!   transition, represented as data so they can be enumerated, reported by
//!   name, and tested individually.
//! - `gate` — the Omega gate: combines signature validity, rule evaluation,
//!   and chain continuity into one always-produced verdict.
//! - `sig` — the pluggable signature primitive boundary.

pub mod gate;
pub mod psi;
pub mod rules;
pub mod sig;

pub use gate::{Candidate, GatePhase, GateStats, OmegaGate, OmegaVerdict};
pub use psi::{PsiState, PsiTrajectory};
pub use rules::{ReasonCode, RuleContext, RuleOutcome, SigmaRule, Violation, default_rules};
pub use sig::{KeyedHashScheme, SignatureScheme};
