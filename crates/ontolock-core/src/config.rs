//! Configuration for the gate and the extractor.
//!
//! The physical-plausibility bound for velocity and the temperature
//! operating envelope are deployment parameters, not inferred constants.
//! The defaults below are documented starting points: 500 m/s covers
//! supersonic transport with margin, and -40..=85 C is the standard
//! industrial operating range for the electronics a PUF lives in.

use serde::{Deserialize, Serialize};

/// Admissibility gate configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Maximum plausible travel velocity between consecutive states, in
    /// meters per second.
    pub max_velocity_mps: f64,
    /// Lower bound of the temperature operating envelope, in Celsius.
    pub temperature_min_c: f64,
    /// Upper bound of the temperature operating envelope, in Celsius.
    pub temperature_max_c: f64,
    /// Minimum environmental entropy a candidate state must declare, in bits.
    pub entropy_floor_bits: f64,
    /// Whether two admitted children of the same parent record are allowed.
    ///
    /// Disabled by default: a consumed predecessor is treated as replay.
    /// Enabling this makes forks measurable and traceable instead of
    /// rejected outright.
    pub allow_forks: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            max_velocity_mps: 500.0,
            temperature_min_c: -40.0,
            temperature_max_c: 85.0,
            entropy_floor_bits: 128.0,
            allow_forks: false,
        }
    }
}

/// Fuzzy key extractor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Length of the derived stable secret in bytes.
    pub secret_len: usize,
    /// Repetition factor of the error-correcting code. Must be odd; the code
    /// corrects up to `(repetition - 1) / 2` flipped bits per block.
    pub repetition: usize,
    /// Minimum extractable entropy required at enrollment, in bits.
    pub entropy_floor_bits: f64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            secret_len: 32,
            repetition: 5,
            entropy_floor_bits: 128.0,
        }
    }
}

impl ExtractorConfig {
    /// Number of measurement bytes the configured code consumes.
    pub fn required_measurement_bytes(&self) -> usize {
        self.secret_len * self.repetition
    }

    /// Maximum bit-error rate the repetition code corrects reliably.
    ///
    /// A block of `r` repeated bits decodes correctly while strictly fewer
    /// than half its bits flipped.
    pub fn max_correctable_ber(&self) -> f64 {
        ((self.repetition - 1) / 2) as f64 / self.repetition as f64
    }
}
