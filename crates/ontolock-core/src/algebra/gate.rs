//! Omega gate: the admissibility decision function.
//!
//! A candidate moves `Proposed -> RuleChecked -> ChainVerified -> Admitted`
//! or lands in `Rejected`; both terminal states are final for that
//! candidate. The gate always evaluates all three facets — Sigma rules,
//! chain continuity, signature — and reports them together: a valid
//! signature over an impossible trajectory is rejected, and a possible
//! trajectory with a bad signature is rejected. Neither check is sufficient
//! alone.
//!
//! Concurrency: evaluation is pure and runs in parallel for independent
//! candidates; the commit re-validates chain continuity inside the ledger's
//! exclusive append section (optimistic evaluation, pessimistic commit).

use std::sync::Mutex;

use serde::Serialize;

use crate::config::GateConfig;
use crate::error::LedgerError;
use crate::extractor::Commitment;
use crate::ohash::{AppendReceipt, DOMAIN_TAG_V1, Ledger, compute_ohash};

use super::psi::{PsiState, PsiTrajectory};
use super::rules::{ReasonCode, RuleContext, RuleOutcome, SigmaRule, Violation, default_rules};
use super::sig::SignatureScheme;

/// Gate state machine phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GatePhase {
    Proposed,
    RuleChecked,
    ChainVerified,
    Admitted,
    Rejected,
}

impl std::fmt::Display for GatePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Proposed => "proposed",
            Self::RuleChecked => "rule_checked",
            Self::ChainVerified => "chain_verified",
            Self::Admitted => "admitted",
            Self::Rejected => "rejected",
        };
        write!(f, "{s}")
    }
}

/// One proposed state transition, as submitted to the gate.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub state: PsiState,
    /// Identity commitment the submitter claims.
    pub commitment: Commitment,
    /// Bit-error rate observed while reconstructing the secret for this
    /// submission.
    pub measured_ber: f64,
    /// Signature over the canonical state hash.
    pub signature: Vec<u8>,
}

/// The gate's decision. Always produced — an absent verdict is a defect,
/// so no gate path returns without one.
#[derive(Debug, Clone, Serialize)]
pub struct OmegaVerdict {
    pub admitted: bool,
    /// Signature facet, reported even when rules already rejected.
    pub signature_valid: bool,
    /// Complete ordered violation list (not just the first).
    pub violations: Vec<Violation>,
    /// Terminal phase this candidate reached.
    pub phase: GatePhase,
}

impl OmegaVerdict {
    pub fn violated_rule_names(&self) -> Vec<&'static str> {
        self.violations.iter().map(|v| v.rule).collect()
    }
}

/// Running admit/reject counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GateStats {
    pub admitted: u64,
    pub rejected: u64,
}

/// The admissibility gate for one enrolled trajectory.
pub struct OmegaGate {
    rules: Vec<SigmaRule>,
    config: GateConfig,
    enrolled_commitment: Commitment,
    max_correctable_ber: f64,
    scheme: Box<dyn SignatureScheme>,
    stats: Mutex<GateStats>,
}

impl OmegaGate {
    pub fn new(
        config: GateConfig,
        enrolled_commitment: Commitment,
        max_correctable_ber: f64,
        scheme: Box<dyn SignatureScheme>,
    ) -> Self {
        Self {
            rules: default_rules(),
            config,
            enrolled_commitment,
            max_correctable_ber,
            scheme,
            stats: Mutex::new(GateStats::default()),
        }
    }

    /// Replace the rule set (order defines reporting order).
    pub fn with_rules(mut self, rules: Vec<SigmaRule>) -> Self {
        self.rules = rules;
        self
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Names of the active rules in evaluation order.
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name).collect()
    }

    pub fn stats(&self) -> GateStats {
        *self.stats.lock().unwrap()
    }

    /// Evaluate a candidate without committing anything.
    ///
    /// Pure over (candidate, ledger, trajectory): safe to run in parallel
    /// across independent candidates. All Sigma rules are evaluated even
    /// after the first violation, chain continuity is checked even when
    /// rules failed, and the signature is checked even when both failed —
    /// the verdict reports every facet.
    pub fn evaluate(
        &self,
        candidate: &Candidate,
        ledger: &Ledger,
        trajectory: &PsiTrajectory,
    ) -> OmegaVerdict {
        log::debug!(
            "gate: candidate tag='{}' phase={}",
            candidate.state.algebraic_tag,
            GatePhase::Proposed
        );

        // Proposed -> RuleChecked: full rule sweep for a complete report.
        let predecessor = trajectory.get(candidate.state.previous_state_hash);
        let ctx = RuleContext {
            candidate,
            predecessor,
            ledger,
            config: &self.config,
            enrolled_commitment: &self.enrolled_commitment,
            max_correctable_ber: self.max_correctable_ber,
        };
        let mut violations: Vec<Violation> = Vec::new();
        for rule in &self.rules {
            if let RuleOutcome::Violated(reason) = rule.check(&ctx) {
                violations.push(Violation {
                    rule: rule.name,
                    reason,
                });
            }
        }
        let rules_ok = violations.is_empty();

        // RuleChecked -> ChainVerified: the candidate must extend the head.
        let chain_ok = candidate.state.previous_state_hash == ledger.head();
        if !chain_ok {
            violations.push(Violation {
                rule: "chain_continuity",
                reason: ReasonCode::StaleOrForkedChain,
            });
        }

        // ChainVerified -> Admitted: signature over the canonical state hash.
        let signature_valid = self.scheme.verify(
            &candidate.commitment,
            &candidate.state.state_hash(),
            &candidate.signature,
        );

        let admitted = rules_ok && chain_ok && signature_valid;
        let phase = if admitted {
            GatePhase::Admitted
        } else {
            GatePhase::Rejected
        };

        if admitted {
            log::info!("gate: admitted tag='{}'", candidate.state.algebraic_tag);
        } else {
            log::info!(
                "gate: rejected tag='{}' signature_valid={} violations={:?}",
                candidate.state.algebraic_tag,
                signature_valid,
                violations.iter().map(|v| v.rule).collect::<Vec<_>>()
            );
        }

        OmegaVerdict {
            admitted,
            signature_valid,
            violations,
            phase,
        }
    }

    /// Evaluate a candidate and, on admission, append its Ohash record.
    ///
    /// The append re-validates chain continuity inside the ledger's
    /// exclusive section. If the head moved between evaluation and commit,
    /// the candidate is rejected with `StaleOrForkedChain`; it cannot be
    /// retried in place — the caller constructs a fresh candidate from the
    /// new head.
    pub fn admit(
        &self,
        candidate: &Candidate,
        ledger: &Ledger,
        trajectory: &mut PsiTrajectory,
    ) -> (OmegaVerdict, Option<AppendReceipt>) {
        let mut verdict = self.evaluate(candidate, ledger, trajectory);
        if !verdict.admitted {
            self.stats.lock().unwrap().rejected += 1;
            return (verdict, None);
        }

        let record = compute_ohash(
            &candidate.commitment,
            candidate.state.state_hash(),
            candidate.state.previous_state_hash,
            DOMAIN_TAG_V1,
            candidate.state.timestamp_ms,
        );

        match ledger.append(record) {
            Ok(receipt) => {
                trajectory.insert(receipt.record_id, candidate.state.clone());
                self.stats.lock().unwrap().admitted += 1;
                (verdict, Some(receipt))
            }
            Err(err) => {
                // Commit failed under the optimistic evaluation; fail closed.
                verdict.admitted = false;
                verdict.phase = GatePhase::Rejected;
                verdict.violations.push(append_failure(&err));
                self.stats.lock().unwrap().rejected += 1;
                (verdict, None)
            }
        }
    }
}

/// Map a ledger append failure onto the verdict's violation vocabulary.
/// Each failure keeps its own cause: a moved head is not a duplicate id.
fn append_failure(err: &LedgerError) -> Violation {
    match err {
        LedgerError::ChainDiscontinuity { .. } => Violation {
            rule: "chain_continuity",
            reason: ReasonCode::StaleOrForkedChain,
        },
        LedgerError::DuplicateIdentity(_) => Violation {
            rule: "ledger_append",
            reason: ReasonCode::DuplicateRecord,
        },
    }
}
