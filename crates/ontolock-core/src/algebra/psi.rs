//! Psi states: nodes in the causal trajectory chain.
//!
//! A `PsiState` is the snapshot the gate judges: when and where the system
//! claims to be, under what physical conditions, and which prior state it
//! extends. States form a singly-linked trajectory through
//! `previous_state_hash`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::ohash::{GENESIS_SENTINEL, Hash256};

const PSI_TAG: &[u8] = b"ONTOLOCK_PSI_V1";

/// One proposed or admitted trajectory state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PsiState {
    /// Unix timestamp in milliseconds.
    pub timestamp_ms: u64,
    /// (latitude, longitude) in degrees.
    pub location: (f64, f64),
    /// Declared device temperature in Celsius.
    pub temperature_c: f64,
    /// Entropy of the environmental sample accompanying this state, in bits.
    pub environmental_entropy_bits: f64,
    /// Hash of the predecessor state's ledger record; the genesis sentinel
    /// for a root state.
    pub previous_state_hash: Hash256,
    /// Free-form algebraic tag (trajectory position marker).
    pub algebraic_tag: String,
}

impl PsiState {
    /// Canonical state hash over fixed-width big-endian field encodings.
    ///
    /// Float fields hash their IEEE-754 bit patterns, so two states hash
    /// equal exactly when their fields are bit-identical.
    pub fn state_hash(&self) -> Hash256 {
        let mut h = Sha256::new();
        h.update(PSI_TAG);
        h.update(self.timestamp_ms.to_be_bytes());
        h.update(self.location.0.to_bits().to_be_bytes());
        h.update(self.location.1.to_bits().to_be_bytes());
        h.update(self.temperature_c.to_bits().to_be_bytes());
        h.update(self.environmental_entropy_bits.to_bits().to_be_bytes());
        h.update(self.previous_state_hash.0);
        h.update((self.algebraic_tag.len() as u64).to_be_bytes());
        h.update(self.algebraic_tag.as_bytes());
        Hash256(h.finalize().into())
    }

    /// Whether this state claims to be a trajectory root.
    pub fn is_root(&self) -> bool {
        self.previous_state_hash == GENESIS_SENTINEL
    }
}

/// Tracker over admitted states, keyed by the ledger record id that admitted
/// them. Append-only; the gate reads it to resolve predecessors.
#[derive(Debug, Default)]
pub struct PsiTrajectory {
    states: HashMap<Hash256, PsiState>,
    order: Vec<Hash256>,
}

impl PsiTrajectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an admitted state under its ledger record id.
    pub fn insert(&mut self, record_id: Hash256, state: PsiState) {
        self.states.insert(record_id, state);
        self.order.push(record_id);
    }

    /// Resolve a state by the record id that admitted it.
    pub fn get(&self, record_id: Hash256) -> Option<&PsiState> {
        self.states.get(&record_id)
    }

    /// Most recently admitted state.
    pub fn head_state(&self) -> Option<&PsiState> {
        self.order.last().and_then(|id| self.states.get(id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Admitted record ids in admission order.
    pub fn record_ids(&self) -> &[Hash256] {
        &self.order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(ts: u64) -> PsiState {
        PsiState {
            timestamp_ms: ts,
            location: (51.5, -0.12),
            temperature_c: 21.0,
            environmental_entropy_bits: 140.0,
            previous_state_hash: GENESIS_SENTINEL,
            algebraic_tag: "psi-0".to_string(),
        }
    }

    #[test]
    fn test_state_hash_deterministic() {
        assert_eq!(state(100).state_hash(), state(100).state_hash());
        assert_ne!(state(100).state_hash(), state(101).state_hash());
    }

    #[test]
    fn test_state_hash_sensitive_to_tag() {
        let a = state(100);
        let mut b = state(100);
        b.algebraic_tag = "psi-1".to_string();
        assert_ne!(a.state_hash(), b.state_hash());
    }

    #[test]
    fn test_root_detection() {
        let mut s = state(100);
        assert!(s.is_root());
        s.previous_state_hash = Hash256([1; 32]);
        assert!(!s.is_root());
    }

    #[test]
    fn test_trajectory_tracks_order_and_lookup() {
        let mut traj = PsiTrajectory::new();
        assert!(traj.head_state().is_none());

        let id1 = Hash256([1; 32]);
        let id2 = Hash256([2; 32]);
        traj.insert(id1, state(100));
        traj.insert(id2, state(200));

        assert_eq!(traj.len(), 2);
        assert_eq!(traj.get(id1).unwrap().timestamp_ms, 100);
        assert_eq!(traj.head_state().unwrap().timestamp_ms, 200);
        assert_eq!(traj.record_ids(), &[id1, id2]);
    }
}
