//! SimulatedPuf — software PUF with seed-derived identity and injected noise.
//!
//! Emulates the two properties the extractor cares about: a device-unique
//! base response (derived from the seed, standing in for silicon process
//! variation) and bounded per-reading drift (random bit flips at a
//! configurable bit-error rate).
//!
//! Not a security boundary. Use only for tests, demos, and development; a
//! real deployment swaps in a hardware-backed [`PufSource`].

use std::sync::Mutex;

use rand::SeedableRng;
use rand::rngs::StdRng;
use sha2::{Digest, Sha256};

use crate::source::{PufSource, RawMeasurement, SourceCategory, SourceInfo};
use crate::sources::helpers::flip_random_bits;

static SIMULATED_INFO: SourceInfo = SourceInfo {
    name: "simulated_puf",
    description: "Seed-derived simulated PUF with configurable bit-error rate",
    physics: "Stands in for silicon process variation: a fixed seed plays the role \
              of the device's unclonable manufacturing fingerprint, and random bit \
              flips at the configured rate emulate thermal and voltage drift between \
              readings.",
    category: SourceCategory::Simulated,
    entropy_rate_estimate: 256.0,
};

/// Simulated PUF. Same seed ⇒ same base response; distinct seeds diverge on
/// essentially every bit.
pub struct SimulatedPuf {
    seed: u64,
    ber: f64,
    response_len: usize,
    // Drift RNG is per-instance so repeated sampling stays reproducible for
    // a given (seed, noise_seed) pair.
    noise: Mutex<StdRng>,
}

impl SimulatedPuf {
    /// Create a simulated PUF.
    ///
    /// `ber` is clamped to `0.0..=0.5`; a BER above one half would mean the
    /// readings are anti-correlated, which no physical source exhibits.
    pub fn new(seed: u64, ber: f64, response_len: usize) -> Self {
        Self {
            seed,
            ber: ber.clamp(0.0, 0.5),
            response_len,
            noise: Mutex::new(StdRng::seed_from_u64(seed ^ 0x9E37_79B9_7F4A_7C15)),
        }
    }

    /// Default 160-byte response (matches the default extractor code length)
    /// at 2% BER.
    pub fn with_seed(seed: u64) -> Self {
        Self::new(seed, 0.02, 160)
    }

    /// Noise-free base response for this device identity.
    fn base_response(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.response_len);
        let mut counter: u64 = 0;
        while out.len() < self.response_len {
            let mut h = Sha256::new();
            h.update(b"ONTOLOCK_SIM_PUF_V1");
            h.update(self.seed.to_be_bytes());
            h.update(counter.to_be_bytes());
            out.extend_from_slice(&h.finalize());
            counter += 1;
        }
        out.truncate(self.response_len);
        out
    }
}

impl PufSource for SimulatedPuf {
    fn info(&self) -> &SourceInfo {
        &SIMULATED_INFO
    }

    fn is_available(&self) -> bool {
        true
    }

    fn sample(&self) -> RawMeasurement {
        let mut bytes = self.base_response();
        let n_flips = ((bytes.len() * 8) as f64 * self.ber).round() as usize;
        {
            let mut rng = self.noise.lock().unwrap();
            flip_random_bits(&mut bytes, n_flips, &mut *rng);
        }
        RawMeasurement {
            declared_entropy_bits: (bytes.len() * 8) as f64,
            declared_ber: self.ber,
            bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::helpers::bit_error_rate;

    #[test]
    fn test_same_seed_same_identity() {
        let a = SimulatedPuf::new(42, 0.0, 64);
        let b = SimulatedPuf::new(42, 0.0, 64);
        assert_eq!(a.sample().bytes, b.sample().bytes);
    }

    #[test]
    fn test_distinct_seeds_diverge() {
        let a = SimulatedPuf::new(1, 0.0, 64);
        let b = SimulatedPuf::new(2, 0.0, 64);
        let ber = bit_error_rate(&a.sample().bytes, &b.sample().bytes);
        // Independent identities should disagree on roughly half the bits.
        assert!(ber > 0.3, "distinct seeds too correlated: ber={ber}");
    }

    #[test]
    fn test_noise_stays_near_declared_ber() {
        let puf = SimulatedPuf::new(7, 0.02, 160);
        let base = SimulatedPuf::new(7, 0.0, 160).sample().bytes;
        let noisy = puf.sample();
        let ber = bit_error_rate(&base, &noisy.bytes);
        assert!(ber > 0.0 && ber < 0.05, "observed ber {ber} out of band");
        assert_eq!(noisy.declared_ber, 0.02);
    }

    #[test]
    fn test_ber_clamped() {
        let puf = SimulatedPuf::new(3, 0.9, 32);
        assert_eq!(puf.sample().declared_ber, 0.5);
    }

    #[test]
    fn test_response_length_respected() {
        for len in [16, 32, 160, 300] {
            let puf = SimulatedPuf::new(11, 0.01, len);
            assert_eq!(puf.sample().bytes.len(), len);
        }
    }
}
