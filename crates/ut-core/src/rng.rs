//! Seeded RNG wrappers.
//!
//! Two streams exist per run.  The traffic manager draws spawn nodes, entry
//! ports and lanes from one [`SimRng`]; each vehicle draws its turns from its
//! own [`AgentRng`], seeded from the run seed and its id:
//!
//!   seed = run_seed XOR (agent_id * GOLDEN_GAMMA)
//!
//! so a vehicle's route does not shift when other vehicles come and go, and
//! a run replays exactly from the same seed.

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::AgentId;

/// 2^64 / φ, odd.  Consecutive ids land far apart in seed space.
const GOLDEN_GAMMA: u64 = 0x9e37_79b9_7f4a_7c15;

/// RNG owned by one vehicle controller.
pub struct AgentRng(SmallRng);

impl AgentRng {
    pub fn new(run_seed: u64, agent: AgentId) -> Self {
        let mixed = run_seed ^ u64::from(agent.0).wrapping_mul(GOLDEN_GAMMA);
        Self(SmallRng::seed_from_u64(mixed))
    }

    /// Borrow the generator for the road network's random queries.
    #[inline]
    pub fn inner(&mut self) -> &mut SmallRng {
        &mut self.0
    }

    #[inline]
    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: rand::distributions::uniform::SampleUniform,
        R: rand::distributions::uniform::SampleRange<T>,
    {
        self.0.gen_range(range)
    }
}

/// RNG of the traffic manager's population control.
pub struct SimRng(SmallRng);

impl SimRng {
    pub fn new(run_seed: u64) -> Self {
        Self(SmallRng::seed_from_u64(run_seed))
    }

    #[inline]
    pub fn inner(&mut self) -> &mut SmallRng {
        &mut self.0
    }

    /// Uniform pick; `None` for an empty slice.
    #[inline]
    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        items.choose(&mut self.0)
    }
}
