//! Abstract physical noise source trait.
//!
//! Every PUF-style noise source implements the [`PufSource`] trait, which
//! provides metadata via [`SourceInfo`], availability checking, and raw
//! measurement sampling. Variants (simulated, SRAM power-up, optical
//! speckle, serial bridge) are swappable implementations behind this single
//! contract, selected by configuration — never by type inspection.

/// Category of physical source based on the underlying mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceCategory {
    /// SRAM power-up state skew.
    Sram,
    /// Optical speckle patterns.
    Optical,
    /// Software simulation with injected noise.
    Simulated,
    /// External microcontroller bridge (serial-attached hardware).
    Bridge,
}

impl std::fmt::Display for SourceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sram => write!(f, "sram"),
            Self::Optical => write!(f, "optical"),
            Self::Simulated => write!(f, "simulated"),
            Self::Bridge => write!(f, "bridge"),
        }
    }
}

/// Metadata about a physical noise source.
#[derive(Debug, Clone)]
pub struct SourceInfo {
    /// Unique identifier (e.g. `"simulated_puf"`).
    pub name: &'static str,
    /// One-line human-readable description.
    pub description: &'static str,
    /// Physics explanation of where the uniqueness and noise come from.
    pub physics: &'static str,
    /// Source category for classification.
    pub category: SourceCategory,
    /// Estimated raw entropy per measurement, in bits.
    pub entropy_rate_estimate: f64,
}

/// One raw physical reading.
///
/// Ephemeral by design: owned by the sampling code, consumed by the fuzzy
/// extractor, and discarded after extraction. Never persisted.
#[derive(Debug, Clone)]
pub struct RawMeasurement {
    /// Ordered sample bytes from one source reading.
    pub bytes: Vec<u8>,
    /// Entropy the source declares for this reading, in bits.
    pub declared_entropy_bits: f64,
    /// Bit-error rate the source declares between repeated readings.
    pub declared_ber: f64,
}

/// Trait every physical noise source must implement.
pub trait PufSource: Send + Sync {
    /// Source metadata.
    fn info(&self) -> &SourceInfo;

    /// Check if this source can operate on the current machine.
    fn is_available(&self) -> bool;

    /// Take one raw measurement. No logic beyond sampling: conditioning,
    /// error correction, and entropy extraction all live downstream.
    fn sample(&self) -> RawMeasurement;

    /// Convenience: name from info.
    fn name(&self) -> &'static str {
        self.info().name
    }
}
