//! Shared bit-level helpers used by source implementations and tests.

use rand::Rng;

/// Hamming distance between two equal-length byte slices, in bits.
///
/// # Panics
/// Panics if the slices differ in length; callers compare measurements of
/// the same source and code length.
pub fn hamming_distance(a: &[u8], b: &[u8]) -> usize {
    assert_eq!(a.len(), b.len(), "hamming distance needs equal lengths");
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x ^ y).count_ones() as usize)
        .sum()
}

/// Bit-error rate between two equal-length byte slices (0.0 to 1.0).
pub fn bit_error_rate(a: &[u8], b: &[u8]) -> f64 {
    if a.is_empty() {
        return 0.0;
    }
    hamming_distance(a, b) as f64 / (a.len() * 8) as f64
}

/// Flip `n_flips` randomly chosen distinct bit positions in `data`.
///
/// Used to emulate physical measurement drift.
pub fn flip_random_bits<R: Rng>(data: &mut [u8], n_flips: usize, rng: &mut R) {
    let total_bits = data.len() * 8;
    if total_bits == 0 {
        return;
    }
    let mut flipped = vec![false; total_bits];
    let mut done = 0;
    while done < n_flips.min(total_bits) {
        let pos = rng.random_range(0..total_bits);
        if flipped[pos] {
            continue;
        }
        flipped[pos] = true;
        data[pos / 8] ^= 1 << (pos % 8);
        done += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_hamming_distance_counts_bits() {
        assert_eq!(hamming_distance(&[0x00], &[0xFF]), 8);
        assert_eq!(hamming_distance(&[0b1010], &[0b1000]), 1);
        assert_eq!(hamming_distance(&[1, 2, 3], &[1, 2, 3]), 0);
    }

    #[test]
    fn test_bit_error_rate_bounds() {
        assert_eq!(bit_error_rate(&[0u8; 8], &[0u8; 8]), 0.0);
        assert_eq!(bit_error_rate(&[0u8; 8], &[0xFFu8; 8]), 1.0);
    }

    #[test]
    fn test_flip_random_bits_exact_count() {
        let mut rng = StdRng::seed_from_u64(7);
        let original = vec![0u8; 64];
        let mut data = original.clone();
        flip_random_bits(&mut data, 20, &mut rng);
        assert_eq!(hamming_distance(&original, &data), 20);
    }

    #[test]
    fn test_flip_random_bits_empty_input() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut data: Vec<u8> = Vec::new();
        flip_random_bits(&mut data, 5, &mut rng);
        assert!(data.is_empty());
    }
}
