//! Sources of dice rolls.
//!
//! The turn engine takes its dice as a type parameter so games can be
//! replayed from a seed or scripted roll by roll in tests.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Something that rolls two six-sided dice
pub trait Dice {
    /// Two independent faces, each 1-6
    fn roll(&mut self) -> (u8, u8);
}

/// Uniform random dice backed by a seedable RNG
#[derive(Debug, Clone)]
pub struct RandomDice {
    rng: StdRng,
}

impl RandomDice {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl Dice for RandomDice {
    fn roll(&mut self) -> (u8, u8) {
        (self.rng.gen_range(1..=6), self.rng.gen_range(1..=6))
    }
}

/// Dice that replay a fixed script, cycling when it runs out
#[derive(Debug, Clone)]
pub struct LoadedDice {
    script: Vec<(u8, u8)>,
    next: usize,
}

impl LoadedDice {
    pub fn new(script: Vec<(u8, u8)>) -> Self {
        Self { script, next: 0 }
    }

    /// Dice that always show the same pair
    pub fn always(first: u8, second: u8) -> Self {
        Self::new(vec![(first, second)])
    }
}

impl Dice for LoadedDice {
    fn roll(&mut self) -> (u8, u8) {
        if self.script.is_empty() {
            return (1, 1);
        }
        let faces = self.script[self.next % self.script.len()];
        self.next += 1;
        faces
    }
}
