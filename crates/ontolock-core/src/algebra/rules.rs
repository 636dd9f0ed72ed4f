//! Sigma rules: forbidden states and impossible transitions.
//!
//! Rules are data, not a branch chain: each is a named pure predicate over
//! the candidate, its declared predecessor, and the evaluation context.
//! The gate evaluates every rule in the fixed order of [`default_rules`]
//! so verdicts carry a complete, reproducible violation list.
//!
//! Fail-closed is absolute here: a missing datum, a non-finite value, or
//! anything else that prevents a rule from deciding counts as a violation,
//! never as a pass.

use serde::Serialize;

use crate::algebra::gate::Candidate;
use crate::config::GateConfig;
use crate::extractor::Commitment;
use crate::ohash::Ledger;

use super::psi::PsiState;

/// Why a rule rejected a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    RetroactiveTimestamp,
    UnknownPredecessor,
    ImplausibleVelocity,
    TemperatureOutOfEnvelope,
    EntropyBelowFloor,
    CommitmentMismatch,
    BitErrorRateExceeded,
    PredecessorConsumed,
    /// Chain head moved or never matched; reported by the gate's
    /// continuity check rather than a Sigma rule.
    StaleOrForkedChain,
    /// A record with the candidate's identity hash already exists in the
    /// ledger; reported by the gate's commit step rather than a Sigma rule.
    DuplicateRecord,
    /// The rule could not be decided (missing or non-finite input).
    EvaluationFailure,
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::RetroactiveTimestamp => "retroactive_timestamp",
            Self::UnknownPredecessor => "unknown_predecessor",
            Self::ImplausibleVelocity => "implausible_velocity",
            Self::TemperatureOutOfEnvelope => "temperature_out_of_envelope",
            Self::EntropyBelowFloor => "entropy_below_floor",
            Self::CommitmentMismatch => "commitment_mismatch",
            Self::BitErrorRateExceeded => "bit_error_rate_exceeded",
            Self::PredecessorConsumed => "predecessor_consumed",
            Self::StaleOrForkedChain => "stale_or_forked_chain",
            Self::DuplicateRecord => "duplicate_record",
            Self::EvaluationFailure => "evaluation_failure",
        };
        write!(f, "{s}")
    }
}

/// One recorded rule violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Name of the violated rule.
    pub rule: &'static str,
    pub reason: ReasonCode,
}

/// Outcome of evaluating one rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleOutcome {
    Pass,
    Violated(ReasonCode),
}

/// Everything a rule may consult. Rules are pure over this context.
pub struct RuleContext<'a> {
    pub candidate: &'a Candidate,
    /// Predecessor state resolved from the trajectory tracker, when the
    /// candidate declares one and it is known.
    pub predecessor: Option<&'a PsiState>,
    pub ledger: &'a Ledger,
    pub config: &'a GateConfig,
    /// Commitment enrolled for this trajectory.
    pub enrolled_commitment: &'a Commitment,
    /// Correction capacity of the deployed fuzzy extractor.
    pub max_correctable_ber: f64,
}

/// A named pure predicate over a candidate transition.
#[derive(Clone)]
pub struct SigmaRule {
    pub name: &'static str,
    pub description: &'static str,
    check: fn(&RuleContext<'_>) -> RuleOutcome,
}

impl SigmaRule {
    pub fn check(&self, ctx: &RuleContext<'_>) -> RuleOutcome {
        (self.check)(ctx)
    }
}

impl std::fmt::Debug for SigmaRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SigmaRule({})", self.name)
    }
}

/// The default rule set, in its fixed evaluation order.
pub fn default_rules() -> Vec<SigmaRule> {
    vec![
        SigmaRule {
            name: "retroactive_timestamp",
            description: "timestamp must be strictly greater than the predecessor's",
            check: check_timestamp,
        },
        SigmaRule {
            name: "unknown_predecessor",
            description: "previous state hash must resolve to a ledger record",
            check: check_predecessor_known,
        },
        SigmaRule {
            name: "implausible_velocity",
            description: "implied travel velocity must stay within the configured bound",
            check: check_velocity,
        },
        SigmaRule {
            name: "temperature_envelope",
            description: "temperature must lie within the operating envelope",
            check: check_temperature,
        },
        SigmaRule {
            name: "entropy_floor",
            description: "environmental entropy sample must meet the configured floor",
            check: check_entropy_floor,
        },
        SigmaRule {
            name: "commitment_mismatch",
            description: "identity commitment must match the enrolled commitment",
            check: check_commitment,
        },
        SigmaRule {
            name: "bit_error_budget",
            description: "reconstruction bit-error rate must be within correction capacity",
            check: check_ber,
        },
        SigmaRule {
            name: "consumed_predecessor",
            description: "predecessor must not already be consumed by another admitted state",
            check: check_not_consumed,
        },
    ]
}

fn check_timestamp(ctx: &RuleContext<'_>) -> RuleOutcome {
    match ctx.predecessor {
        Some(prev) => {
            if ctx.candidate.state.timestamp_ms > prev.timestamp_ms {
                RuleOutcome::Pass
            } else {
                RuleOutcome::Violated(ReasonCode::RetroactiveTimestamp)
            }
        }
        // A root state has nothing to be retroactive against; a non-root
        // state whose predecessor we cannot resolve is undecidable.
        None if ctx.candidate.state.is_root() => RuleOutcome::Pass,
        None => RuleOutcome::Violated(ReasonCode::EvaluationFailure),
    }
}

fn check_predecessor_known(ctx: &RuleContext<'_>) -> RuleOutcome {
    let prev = ctx.candidate.state.previous_state_hash;
    if ctx.candidate.state.is_root() || ctx.ledger.contains(prev) {
        RuleOutcome::Pass
    } else {
        RuleOutcome::Violated(ReasonCode::UnknownPredecessor)
    }
}

fn check_velocity(ctx: &RuleContext<'_>) -> RuleOutcome {
    let state = &ctx.candidate.state;
    if !location_valid(state.location) {
        return RuleOutcome::Violated(ReasonCode::EvaluationFailure);
    }
    let prev = match ctx.predecessor {
        Some(prev) => prev,
        None if state.is_root() => return RuleOutcome::Pass,
        None => return RuleOutcome::Violated(ReasonCode::EvaluationFailure),
    };
    if !location_valid(prev.location) {
        return RuleOutcome::Violated(ReasonCode::EvaluationFailure);
    }
    if state.timestamp_ms <= prev.timestamp_ms {
        // Velocity is undefined without forward time; the timestamp rule
        // reports the retroactivity itself.
        return RuleOutcome::Violated(ReasonCode::ImplausibleVelocity);
    }
    let meters = haversine_m(prev.location, state.location);
    let seconds = (state.timestamp_ms - prev.timestamp_ms) as f64 / 1000.0;
    if meters / seconds <= ctx.config.max_velocity_mps {
        RuleOutcome::Pass
    } else {
        RuleOutcome::Violated(ReasonCode::ImplausibleVelocity)
    }
}

fn check_temperature(ctx: &RuleContext<'_>) -> RuleOutcome {
    let t = ctx.candidate.state.temperature_c;
    if t.is_finite() && t >= ctx.config.temperature_min_c && t <= ctx.config.temperature_max_c {
        RuleOutcome::Pass
    } else {
        RuleOutcome::Violated(ReasonCode::TemperatureOutOfEnvelope)
    }
}

fn check_entropy_floor(ctx: &RuleContext<'_>) -> RuleOutcome {
    let e = ctx.candidate.state.environmental_entropy_bits;
    if e.is_finite() && e >= ctx.config.entropy_floor_bits {
        RuleOutcome::Pass
    } else {
        RuleOutcome::Violated(ReasonCode::EntropyBelowFloor)
    }
}

fn check_commitment(ctx: &RuleContext<'_>) -> RuleOutcome {
    if &ctx.candidate.commitment == ctx.enrolled_commitment {
        RuleOutcome::Pass
    } else {
        RuleOutcome::Violated(ReasonCode::CommitmentMismatch)
    }
}

fn check_ber(ctx: &RuleContext<'_>) -> RuleOutcome {
    let ber = ctx.candidate.measured_ber;
    if ber.is_finite() && (0.0..=ctx.max_correctable_ber).contains(&ber) {
        RuleOutcome::Pass
    } else {
        RuleOutcome::Violated(ReasonCode::BitErrorRateExceeded)
    }
}

fn check_not_consumed(ctx: &RuleContext<'_>) -> RuleOutcome {
    if ctx.config.allow_forks {
        return RuleOutcome::Pass;
    }
    if ctx.ledger.is_consumed(ctx.candidate.state.previous_state_hash) {
        RuleOutcome::Violated(ReasonCode::PredecessorConsumed)
    } else {
        RuleOutcome::Pass
    }
}

fn location_valid((lat, lon): (f64, f64)) -> bool {
    lat.is_finite() && lon.is_finite() && (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)
}

/// Great-circle distance in meters between two (lat, lon) points.
fn haversine_m(a: (f64, f64), b: (f64, f64)) -> f64 {
    const EARTH_RADIUS_M: f64 = 6_371_000.0;
    let (lat1, lon1) = (a.0.to_radians(), a.1.to_radians());
    let (lat2, lon2) = (b.0.to_radians(), b.1.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().atan2((1.0 - h).sqrt())
}
