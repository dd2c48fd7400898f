//! Consumer-side pop jitter for stress runs.
//!
//! With probability `p` a popped stripe is held for `delay`, requeued at the
//! tail, and the pop retried. This shakes out ordering and wake-up races
//! between producer and consumers without touching the production path:
//! a composer built without a [`JitterConfig`] never constructs one.

use std::time::Duration;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use stripecast_core::JitterConfig;

pub struct PopJitter {
    probability: f64,
    delay: Duration,
    rng: Mutex<StdRng>,
}

impl PopJitter {
    pub fn new(config: &JitterConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Deterministic jitter for reproducible runs.
    pub fn seeded(config: &JitterConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: &JitterConfig, rng: StdRng) -> Self {
        Self {
            probability: config.probability.clamp(0.0, 1.0),
            delay: config.delay(),
            rng: Mutex::new(rng),
        }
    }

    /// Decide whether the next popped stripe gets requeued.
    pub fn roll(&self) -> bool {
        self.rng.lock().gen_bool(self.probability)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extremes_are_deterministic() {
        let never = PopJitter::new(&JitterConfig { probability: 0.0, delay_ms: 1 });
        let always = PopJitter::new(&JitterConfig { probability: 1.0, delay_ms: 1 });
        assert!((0..100).all(|_| !never.roll()));
        assert!((0..100).all(|_| always.roll()));
    }

    #[test]
    fn seeded_jitter_repeats() {
        let cfg = JitterConfig { probability: 0.5, delay_ms: 0 };
        let a = PopJitter::seeded(&cfg, 11);
        let b = PopJitter::seeded(&cfg, 11);
        let ra: Vec<bool> = (0..32).map(|_| a.roll()).collect();
        let rb: Vec<bool> = (0..32).map(|_| b.roll()).collect();
        assert_eq!(ra, rb);
        assert_eq!(a.delay(), Duration::ZERO);
    }
}
