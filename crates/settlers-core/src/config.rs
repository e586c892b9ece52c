//! Rule constants for a game.

use serde::{Deserialize, Serialize};

/// Tunable rule constants. Missing fields fall back to the standard rules
/// when deserializing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Points needed to win
    pub victory_target: u32,
    /// Players holding more cards than this discard on a 7
    pub discard_threshold: u32,
    pub max_roads: usize,
    pub max_settlements: usize,
    pub max_cities: usize,
    /// Knights needed before largest army can be claimed
    pub largest_army_min: u32,
    /// Seeds board, deck and dice when set
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            victory_target: 10,
            discard_threshold: 7,
            max_roads: 15,
            max_settlements: 5,
            max_cities: 4,
            largest_army_min: 3,
            seed: None,
        }
    }
}
