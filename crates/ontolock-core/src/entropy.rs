//! Quick entropy estimation for raw measurements and environmental samples.
//!
//! [`sample_entropy_bits`] measures a live reading to produce the
//! environmental entropy a candidate state declares to the gate; the
//! per-byte estimators double as source diagnostics at enrollment. They are
//! intentionally cheap: Shannon entropy and min-entropy over a byte
//! histogram, plus a compression-ratio cross-check (incompressible data
//! compresses poorly).

use flate2::Compression;
use flate2::write::ZlibEncoder;
use std::io::Write;

/// Shannon entropy in bits per byte (0.0 to 8.0).
pub fn shannon_entropy(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mut counts = [0u64; 256];
    for &b in data {
        counts[b as usize] += 1;
    }
    let n = data.len() as f64;
    let mut h = 0.0;
    for &c in &counts {
        if c > 0 {
            let p = c as f64 / n;
            h -= p * p.log2();
        }
    }
    h
}

/// Min-entropy in bits per byte (0.0 to 8.0). More conservative than
/// Shannon: driven entirely by the most probable byte value.
pub fn min_entropy(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mut counts = [0u64; 256];
    for &b in data {
        counts[b as usize] += 1;
    }
    let max = counts.iter().copied().max().unwrap_or(0);
    if max == 0 {
        return 0.0;
    }
    let p_max = max as f64 / data.len() as f64;
    -p_max.log2()
}

/// Zlib compression ratio: compressed size over input size.
///
/// Values near 1.0 indicate incompressible (high-entropy) data; structured
/// data compresses well below 1.0.
pub fn compression_ratio(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(data).unwrap_or_default();
    let compressed = encoder.finish().unwrap_or_default();
    compressed.len() as f64 / data.len() as f64
}

/// Total entropy estimate for a sample, in bits: min-entropy per byte times
/// sample length.
pub fn sample_entropy_bits(data: &[u8]) -> f64 {
    min_entropy(data) * data.len() as f64
}
