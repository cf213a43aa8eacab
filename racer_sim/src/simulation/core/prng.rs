// racer_sim/src/simulation/core/prng.rs

use bevy::prelude::Resource;
use rand::rngs::OsRng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// The one deterministic random source of the simulation. Network weights for
/// training agents are drawn from it.
#[derive(Resource)]
pub struct SimulationRng(pub ChaCha8Rng);

impl SimulationRng {
    /// Seeded runs are reproducible; unseeded ones draw from the OS.
    pub fn from_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self(ChaCha8Rng::seed_from_u64(seed)),
            None => Self(ChaCha8Rng::from_rng(OsRng).unwrap_or_else(|_| ChaCha8Rng::seed_from_u64(0))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn seeded_rngs_agree() {
        let mut a = SimulationRng::from_seed(Some(42));
        let mut b = SimulationRng::from_seed(Some(42));
        assert_eq!(a.0.gen::<u64>(), b.0.gen::<u64>());
    }
}
