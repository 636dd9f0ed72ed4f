//! Fuzzy key extraction: a stable secret from a noisy physical measurement.
//!
//! Code-offset construction over a bit-repetition code (Dodis-style
//! Gen/Rep). At enrollment a fresh key is drawn from OS entropy, encoded
//! with the repetition code, and offset by the measurement bits; the offset
//! plus a key check digest form the public helper data. Reconstruction
//! XORs a fresh measurement against the offset, majority-decodes each
//! block, and refuses to emit a secret unless the check digest matches —
//! above-capacity noise is a typed failure, never a silently wrong key.
//!
//! The helper data is public by design: the offset one-time-pads the
//! codeword with measurement bits, and the check digest is one-way.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::ExtractorConfig;
use crate::error::ExtractorError;
use crate::ohash::Hash256;
use crate::source::RawMeasurement;

const KDF_TAG: &[u8] = b"ONTOLOCK_FE_KDF_V1";
const CHECK_TAG: &[u8] = b"ONTOLOCK_FE_CHECK_V1";
const COMMIT_TAG: &[u8] = b"ONTOLOCK_COMMIT_V1";

/// Fixed-length stable secret. Exists only transiently in memory during
/// derivation and use; never persisted in cleartext. The [`Commitment`]
/// stands in for it everywhere else.
#[derive(Clone, PartialEq, Eq)]
pub struct StableSecret(pub(crate) [u8; 32]);

impl StableSecret {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// One-way commitment to this secret.
    pub fn commitment(&self) -> Commitment {
        let mut h = Sha256::new();
        h.update(COMMIT_TAG);
        h.update(self.0);
        Commitment(Hash256(h.finalize().into()))
    }
}

impl std::fmt::Debug for StableSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print secret bytes, not even in debug output.
        write!(f, "StableSecret(..)")
    }
}

/// Public one-way hash of a [`StableSecret`]. Persisted and shared freely.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Commitment(pub Hash256);

impl std::fmt::Display for Commitment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Public helper data produced once at enrollment.
///
/// Non-secret: persisted alongside the commitment, never regenerated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelperData {
    /// Codeword XOR enrollment measurement.
    pub offset: Vec<u8>,
    /// Repetition factor the offset was encoded with.
    pub repetition: usize,
    /// One-way digest of the enrolled key; reconstruction gate.
    pub check: Hash256,
}

/// Result of a successful enrollment.
#[derive(Debug, Clone)]
pub struct Enrollment {
    pub commitment: Commitment,
    pub helper: HelperData,
    /// Extractable entropy estimate for this enrollment, in bits.
    pub estimated_entropy_bits: f64,
}

/// Fuzzy key extractor over a repetition code.
#[derive(Debug, Clone)]
pub struct FuzzyExtractor {
    config: ExtractorConfig,
}

impl Default for FuzzyExtractor {
    fn default() -> Self {
        Self::new(ExtractorConfig::default())
    }
}

impl FuzzyExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        assert!(
            config.repetition % 2 == 1 && config.repetition >= 3,
            "repetition factor must be odd and at least 3"
        );
        assert!(config.secret_len > 0, "secret length must be non-zero");
        Self { config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Maximum bit-error rate this extractor corrects reliably.
    pub fn max_correctable_ber(&self) -> f64 {
        self.config.max_correctable_ber()
    }

    /// Extracted-entropy estimate in bits, as a function of code length and
    /// measured bit-error rate. Helper-data leakage is already excluded:
    /// the offset one-time-pads the codeword, so only the key bits count.
    pub fn estimate_entropy_bits(&self, ber: f64) -> f64 {
        let ber = ber.clamp(0.0, 0.5);
        let key_bits = (self.config.secret_len * 8) as f64;
        key_bits * (1.0 - 2.0 * ber).powi(2)
    }

    /// Gen: enroll a measurement, producing a public commitment and public
    /// helper data. The secret itself is recoverable only via
    /// [`FuzzyExtractor::reconstruct`].
    pub fn enroll(&self, measurement: &RawMeasurement) -> Result<Enrollment, ExtractorError> {
        let required = self.config.required_measurement_bytes();
        if measurement.bytes.len() < required {
            return Err(ExtractorError::MeasurementTooShort {
                got: measurement.bytes.len(),
                required,
            });
        }

        let estimated = self.estimate_entropy_bits(measurement.declared_ber);
        if estimated < self.config.entropy_floor_bits {
            return Err(ExtractorError::InsufficientEntropy {
                estimated_bits: estimated,
                floor_bits: self.config.entropy_floor_bits,
            });
        }

        // Fresh key from OS entropy; the measurement hides it inside the
        // offset.
        let mut key = vec![0u8; self.config.secret_len];
        getrandom::fill(&mut key).expect("OS CSPRNG failed");

        let codeword = encode_repetition(&key, self.config.repetition);
        let offset: Vec<u8> = codeword
            .iter()
            .zip(measurement.bytes.iter())
            .map(|(c, m)| c ^ m)
            .collect();

        let secret = derive_secret(&key);
        let enrollment = Enrollment {
            commitment: secret.commitment(),
            helper: HelperData {
                offset,
                repetition: self.config.repetition,
                check: check_digest(&key),
            },
            estimated_entropy_bits: estimated,
        };
        log::info!(
            "enrolled commitment {} ({estimated:.1} bits extractable)",
            enrollment.commitment
        );
        Ok(enrollment)
    }

    /// Rep: reconstruct the stable secret from a fresh measurement and the
    /// enrollment helper data.
    ///
    /// Deterministic: any measurement within the code's correction capacity
    /// of the enrollment reading yields the identical secret. Noise beyond
    /// capacity fails with [`ExtractorError::Extraction`].
    pub fn reconstruct(
        &self,
        measurement: &RawMeasurement,
        helper: &HelperData,
    ) -> Result<StableSecret, ExtractorError> {
        if helper.repetition != self.config.repetition {
            return Err(ExtractorError::MalformedHelper(format!(
                "helper encoded with repetition {}, extractor configured for {}",
                helper.repetition, self.config.repetition
            )));
        }
        let required = self.config.required_measurement_bytes();
        if helper.offset.len() != required {
            return Err(ExtractorError::MalformedHelper(format!(
                "offset is {} bytes, expected {required}",
                helper.offset.len()
            )));
        }
        if measurement.bytes.len() < required {
            return Err(ExtractorError::MeasurementTooShort {
                got: measurement.bytes.len(),
                required,
            });
        }

        let noisy_codeword: Vec<u8> = helper
            .offset
            .iter()
            .zip(measurement.bytes.iter())
            .map(|(o, m)| o ^ m)
            .collect();

        let (key, corrected) = decode_repetition(
            &noisy_codeword,
            self.config.secret_len,
            self.config.repetition,
        );

        if check_digest(&key) != helper.check {
            log::warn!("reconstruction failed: noise beyond correction capacity");
            return Err(ExtractorError::Extraction { errors: corrected });
        }
        Ok(derive_secret(&key))
    }
}

/// Counter-mode SHA-256 KDF: key material to a 32-byte stable secret.
fn derive_secret(key: &[u8]) -> StableSecret {
    let mut h = Sha256::new();
    h.update(KDF_TAG);
    h.update((key.len() as u64).to_be_bytes());
    h.update(key);
    StableSecret(h.finalize().into())
}

fn check_digest(key: &[u8]) -> Hash256 {
    let mut h = Sha256::new();
    h.update(CHECK_TAG);
    h.update(key);
    Hash256(h.finalize().into())
}

fn get_bit(data: &[u8], i: usize) -> u8 {
    (data[i / 8] >> (7 - i % 8)) & 1
}

fn set_bit(data: &mut [u8], i: usize) {
    data[i / 8] |= 1 << (7 - i % 8);
}

/// Repeat every key bit `r` times, MSB-first packing.
fn encode_repetition(key: &[u8], r: usize) -> Vec<u8> {
    let key_bits = key.len() * 8;
    let mut out = vec![0u8; key.len() * r];
    for i in 0..key_bits {
        if get_bit(key, i) == 1 {
            for j in 0..r {
                set_bit(&mut out, i * r + j);
            }
        }
    }
    out
}

/// Majority-decode `r`-bit blocks back into `key_len` bytes.
///
/// Returns the decoded key and the number of minority bits overridden
/// (the observed error count, assuming decoding succeeded).
fn decode_repetition(codeword: &[u8], key_len: usize, r: usize) -> (Vec<u8>, usize) {
    let mut key = vec![0u8; key_len];
    let mut corrected = 0;
    for i in 0..key_len * 8 {
        let ones: usize = (0..r).map(|j| get_bit(codeword, i * r + j) as usize).sum();
        let bit = ones * 2 > r;
        corrected += if bit { r - ones } else { ones };
        if bit {
            set_bit(&mut key, i);
        }
    }
    (key, corrected)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn measurement(bytes: Vec<u8>, ber: f64) -> RawMeasurement {
        RawMeasurement {
            declared_entropy_bits: (bytes.len() * 8) as f64,
            declared_ber: ber,
            bytes,
        }
    }

    fn base_bytes(len: usize) -> Vec<u8> {
        (0..len as u32)
            .map(|i| (i.wrapping_mul(2654435761) >> 11) as u8)
            .collect()
    }

    fn flip_bit(data: &mut [u8], i: usize) {
        data[i / 8] ^= 1 << (7 - i % 8);
    }

    // -----------------------------------------------------------------------
    // Repetition code
    // -----------------------------------------------------------------------

    #[test]
    fn test_repetition_round_trip_clean() {
        let key = vec![0xA5, 0x3C, 0xFF, 0x00];
        let code = encode_repetition(&key, 5);
        assert_eq!(code.len(), key.len() * 5);
        let (decoded, corrected) = decode_repetition(&code, key.len(), 5);
        assert_eq!(decoded, key);
        assert_eq!(corrected, 0);
    }

    #[test]
    fn test_repetition_corrects_up_to_capacity() {
        let key = vec![0x5A; 8];
        let mut code = encode_repetition(&key, 5);
        // Two flips in one 5-bit block: still decodable.
        flip_bit(&mut code, 0);
        flip_bit(&mut code, 1);
        let (decoded, corrected) = decode_repetition(&code, key.len(), 5);
        assert_eq!(decoded, key);
        assert_eq!(corrected, 2);
    }

    #[test]
    fn test_repetition_fails_beyond_capacity() {
        let key = vec![0xFF; 4];
        let mut code = encode_repetition(&key, 5);
        // Three of five bits flipped flips the decoded bit.
        flip_bit(&mut code, 0);
        flip_bit(&mut code, 1);
        flip_bit(&mut code, 2);
        let (decoded, _) = decode_repetition(&code, key.len(), 5);
        assert_ne!(decoded, key);
    }

    // -----------------------------------------------------------------------
    // Enroll / reconstruct
    // -----------------------------------------------------------------------

    #[test]
    fn test_reconstruct_identical_measurement() {
        let fe = FuzzyExtractor::default();
        let m = measurement(base_bytes(160), 0.02);
        let enrollment = fe.enroll(&m).unwrap();
        let secret = fe.reconstruct(&m, &enrollment.helper).unwrap();
        assert_eq!(secret.commitment(), enrollment.commitment);
    }

    #[test]
    fn test_reconstruct_tolerates_noise_below_threshold() {
        let fe = FuzzyExtractor::default();
        let base = base_bytes(160);
        let enrollment = fe.enroll(&measurement(base.clone(), 0.02)).unwrap();

        // One flipped bit per 5-bit block across 40 blocks: well inside
        // capacity, and deterministic.
        let mut noisy = base.clone();
        for block in 0..40 {
            flip_bit(&mut noisy, block * 5);
        }
        let secret = fe.reconstruct(&measurement(noisy, 0.02), &enrollment.helper).unwrap();
        assert_eq!(secret.commitment(), enrollment.commitment);
    }

    #[test]
    fn test_reconstruct_fails_above_threshold() {
        let fe = FuzzyExtractor::default();
        let base = base_bytes(160);
        let enrollment = fe.enroll(&measurement(base.clone(), 0.02)).unwrap();

        // Three flips inside one block defeat the majority vote.
        let mut noisy = base.clone();
        flip_bit(&mut noisy, 0);
        flip_bit(&mut noisy, 1);
        flip_bit(&mut noisy, 2);
        let err = fe
            .reconstruct(&measurement(noisy, 0.3), &enrollment.helper)
            .unwrap_err();
        assert!(matches!(err, ExtractorError::Extraction { .. }));
    }

    #[test]
    fn test_distinct_source_yields_different_secret() {
        let fe = FuzzyExtractor::default();
        let enrollment = fe.enroll(&measurement(base_bytes(160), 0.02)).unwrap();

        // A measurement from a different physical source shares no structure
        // with the enrollment reading.
        let other: Vec<u8> = (0..160u32).map(|i| (i.wrapping_mul(40503) >> 3) as u8).collect();
        match fe.reconstruct(&measurement(other, 0.02), &enrollment.helper) {
            // Overwhelmingly likely: the check digest refuses.
            Err(ExtractorError::Extraction { .. }) => {}
            Err(e) => panic!("unexpected error {e}"),
            Ok(secret) => assert_ne!(secret.commitment(), enrollment.commitment),
        }
    }

    #[test]
    fn test_enrollment_entropy_floor() {
        let fe = FuzzyExtractor::default();
        // 256 * (1 - 2*0.25)^2 = 64 bits < 128.
        let err = fe.enroll(&measurement(base_bytes(160), 0.25)).unwrap_err();
        assert!(matches!(err, ExtractorError::InsufficientEntropy { .. }));

        // 256 * (1 - 2*0.02)^2 = 235.9 bits >= 128.
        let enrollment = fe.enroll(&measurement(base_bytes(160), 0.02)).unwrap();
        assert!(enrollment.estimated_entropy_bits >= 128.0);
    }

    #[test]
    fn test_enroll_rejects_short_measurement() {
        let fe = FuzzyExtractor::default();
        let err = fe.enroll(&measurement(base_bytes(100), 0.02)).unwrap_err();
        assert_eq!(
            err,
            ExtractorError::MeasurementTooShort {
                got: 100,
                required: 160
            }
        );
    }

    #[test]
    fn test_reconstruct_rejects_malformed_helper() {
        let fe = FuzzyExtractor::default();
        let m = measurement(base_bytes(160), 0.02);
        let enrollment = fe.enroll(&m).unwrap();

        let mut wrong_rep = enrollment.helper.clone();
        wrong_rep.repetition = 3;
        assert!(matches!(
            fe.reconstruct(&m, &wrong_rep).unwrap_err(),
            ExtractorError::MalformedHelper(_)
        ));

        let mut truncated = enrollment.helper.clone();
        truncated.offset.truncate(10);
        assert!(matches!(
            fe.reconstruct(&m, &truncated).unwrap_err(),
            ExtractorError::MalformedHelper(_)
        ));
    }

    #[test]
    fn test_helper_reveals_nothing_without_measurement() {
        // Two enrollments of the same measurement draw independent keys, so
        // their commitments differ even though the measurement is identical.
        let fe = FuzzyExtractor::default();
        let m = measurement(base_bytes(160), 0.02);
        let a = fe.enroll(&m).unwrap();
        let b = fe.enroll(&m).unwrap();
        assert_ne!(a.commitment, b.commitment);
        assert_ne!(a.helper.offset, b.helper.offset);
    }

    #[test]
    fn test_secret_debug_redacted() {
        let secret = derive_secret(&[1, 2, 3]);
        assert_eq!(format!("{secret:?}"), "StableSecret(..)");
    }

    #[test]
    fn test_entropy_estimate_monotone_in_ber() {
        let fe = FuzzyExtractor::default();
        assert!(fe.estimate_entropy_bits(0.0) > fe.estimate_entropy_bits(0.1));
        assert!(fe.estimate_entropy_bits(0.1) > fe.estimate_entropy_bits(0.3));
        assert_eq!(fe.estimate_entropy_bits(0.5), 0.0);
    }
}
