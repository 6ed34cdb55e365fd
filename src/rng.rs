//! Deterministic random number generation.
//!
//! The simulation draws every random value from a 16-bit Galois LFSR whose
//! state is stored in the saved city, so a loaded game replays exactly.

use rand::RngCore;

const LFSR_TAPS: u16 = 0xB400;
const FALLBACK_STATE: u16 = 0xACE1;

/// Source of 16-bit pseudo-random values consumed by the simulation systems.
pub trait RandomSource {
    fn next_u16(&mut self) -> u16;

    fn next_byte(&mut self) -> u8 {
        (self.next_u16() & 0xff) as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimRng {
    state: u16,
}

impl SimRng {
    pub fn new(state: u16) -> Self {
        let state = if state == 0 { FALLBACK_STATE } else { state };
        Self { state }
    }

    /// Takes a starting LFSR state from the next word of `expander`.
    pub fn from_expander(expander: &mut impl RngCore) -> Self {
        Self::new((expander.next_u32() & 0xffff) as u16)
    }

    pub fn state(&self) -> u16 {
        self.state
    }
}

impl Default for SimRng {
    fn default() -> Self {
        Self::new(FALLBACK_STATE)
    }
}

impl RandomSource for SimRng {
    fn next_u16(&mut self) -> u16 {
        let lsb = self.state & 1;
        self.state >>= 1;
        if lsb == 1 {
            self.state ^= LFSR_TAPS;
        }
        self.state
    }
}

impl RngCore for SimRng {
    fn next_u32(&mut self) -> u32 {
        let hi = self.next_u16() as u32;
        let lo = self.next_u16() as u32;
        (hi << 16) | lo
    }

    fn next_u64(&mut self) -> u64 {
        let hi = RngCore::next_u32(self) as u64;
        let lo = RngCore::next_u32(self) as u64;
        (hi << 32) | lo
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for byte in dest.iter_mut() {
            *byte = self.next_byte();
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn same_state_replays_same_sequence() {
        let mut a = SimRng::new(1234);
        let mut b = SimRng::new(1234);
        let seq_a: Vec<u16> = (0..64).map(|_| a.next_u16()).collect();
        let seq_b: Vec<u16> = (0..64).map(|_| b.next_u16()).collect();
        assert_eq!(seq_a, seq_b);
    }

    #[test]
    fn zero_state_never_locks() {
        let mut rng = SimRng::new(0);
        assert_eq!(rng.state(), FALLBACK_STATE);
        for _ in 0..1000 {
            assert_ne!(rng.next_u16(), 0);
        }
    }

    #[test]
    fn lfsr_step_matches_hand_computation() {
        let mut rng = SimRng::new(0b11);
        // lsb set: 0b1 ^ taps
        assert_eq!(rng.next_u16(), 0b1 ^ LFSR_TAPS);
        let mut even = SimRng::new(0b100);
        assert_eq!(even.next_u16(), 0b10);
    }

    #[test]
    fn lfsr_cycles_through_many_states() {
        let mut rng = SimRng::new(1);
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            seen.insert(rng.next_u16());
        }
        assert_eq!(seen.len(), 10_000, "period should exceed 10k draws");
    }

    #[test]
    fn scenario_seed_expansion_is_stable() {
        let a = SimRng::from_expander(&mut ChaCha8Rng::seed_from_u64(42));
        let b = SimRng::from_expander(&mut ChaCha8Rng::seed_from_u64(42));
        assert_eq!(a, b);
        assert_ne!(a.state(), 0);
    }

    #[test]
    fn rng_core_adapter_feeds_rand_helpers() {
        let mut a = SimRng::new(99);
        let mut b = SimRng::new(99);
        let x: u8 = a.gen_range(0..10);
        let y: u8 = b.gen_range(0..10);
        assert_eq!(x, y);
        assert!(x < 10);
    }
}
