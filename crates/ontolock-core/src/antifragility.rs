//! Antifragility scoring over attack history.
//!
//! The ratio `(entropy_after - entropy_before) / attack_energy` measures
//! whether the system gained or lost entropy per unit of attack energy.
//! Positive means the attack strengthened the identity, negative signals a
//! fragility regression. Pure reporting: scores never feed back into
//! admissibility decisions. Any adaptive rule reweighting runs as a
//! separate, independently auditable process that only proposes changes.

use serde::{Deserialize, Serialize};

use crate::error::ScoreError;

/// One observed attack episode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttackTrial {
    /// Energy the attacker expended, in whatever unit the deployment
    /// measures (queries, joules, samples). Zero means "no attack".
    pub attack_energy: f64,
    /// Identity entropy before the episode, in bits.
    pub entropy_before: f64,
    /// Identity entropy after the episode, in bits.
    pub entropy_after: f64,
}

/// Scoring report over a trial history.
#[derive(Debug, Clone, Serialize)]
pub struct AntifragilityReport {
    /// Per-trial ratio, in input order. `Err` marks inapplicable entries.
    pub ratios: Vec<Result<f64, ScoreError>>,
    /// Mean ratio over applicable trials only.
    pub aggregate: Option<f64>,
    pub applicable_trials: usize,
    pub excluded_trials: usize,
}

/// Score a single trial.
///
/// Zero attack energy means "no attack, not applicable", surfaced as
/// [`ScoreError::DivisionUndefined`] rather than an infinity or a crash.
/// Negative ratios pass through unclamped.
pub fn score_trial(trial: &AttackTrial) -> Result<f64, ScoreError> {
    if trial.attack_energy == 0.0 || !trial.attack_energy.is_finite() {
        return Err(ScoreError::DivisionUndefined);
    }
    Ok((trial.entropy_after - trial.entropy_before) / trial.attack_energy)
}

/// Score a trial history: per-entry ratios plus an aggregate mean over the
/// applicable entries. Zero-energy entries are excluded from the aggregate,
/// never fatal to the report.
pub fn score(history: &[AttackTrial]) -> AntifragilityReport {
    let ratios: Vec<Result<f64, ScoreError>> = history.iter().map(score_trial).collect();
    let applicable: Vec<f64> = ratios.iter().filter_map(|r| r.ok()).collect();
    let aggregate = if applicable.is_empty() {
        None
    } else {
        Some(applicable.iter().sum::<f64>() / applicable.len() as f64)
    };
    AntifragilityReport {
        excluded_trials: ratios.len() - applicable.len(),
        applicable_trials: applicable.len(),
        ratios,
        aggregate,
    }
}
