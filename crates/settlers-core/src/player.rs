//! Player records and resource bookkeeping.
//!
//! This module contains:
//! - ResourceHand, five non-negative counters indexed by [`Resource`]
//! - Building costs
//! - PortAccess, the per-resource trade ratios a player has earned
//! - Player, a plain record mutated only by the turn engine

use crate::board::{PlayerId, PortKind, Resource};
use crate::deck::DevCard;
use crate::hex::EdgeAddress;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Index;

/// Ratio for bank trades without a port
pub const DEFAULT_TRADE_RATIO: u32 = 4;

/// A bundle of resource cards
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceHand {
    counts: [u32; Resource::COUNT],
}

impl ResourceHand {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a hand with specific amounts
    pub fn with_amounts(brick: u32, wool: u32, ore: u32, grain: u32, lumber: u32) -> Self {
        Self {
            counts: [brick, wool, ore, grain, lumber],
        }
    }

    /// A hand holding `amount` of a single resource
    pub fn single(resource: Resource, amount: u32) -> Self {
        let mut hand = Self::new();
        hand.add(resource, amount);
        hand
    }

    pub fn get(&self, resource: Resource) -> u32 {
        self.counts[resource.index()]
    }

    /// Total number of resource cards
    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn add(&mut self, resource: Resource, amount: u32) {
        self.counts[resource.index()] += amount;
    }

    /// Add another hand to this one
    pub fn add_hand(&mut self, other: &ResourceHand) {
        for resource in Resource::ALL {
            self.add(resource, other.get(resource));
        }
    }

    /// Whether every counter covers the cost
    pub fn can_afford(&self, cost: &ResourceHand) -> bool {
        Resource::ALL.iter().all(|r| self.get(*r) >= cost.get(*r))
    }

    /// Subtract a cost, or return false and leave the hand untouched
    pub fn try_subtract(&mut self, cost: &ResourceHand) -> bool {
        if !self.can_afford(cost) {
            return false;
        }
        for resource in Resource::ALL {
            self.counts[resource.index()] -= cost.get(resource);
        }
        true
    }

    /// Remove every card of one resource, returning how many there were
    pub fn take_all(&mut self, resource: Resource) -> u32 {
        std::mem::take(&mut self.counts[resource.index()])
    }

    /// Non-zero counters in resource order
    pub fn iter(&self) -> impl Iterator<Item = (Resource, u32)> + '_ {
        Resource::ALL
            .into_iter()
            .map(|r| (r, self.get(r)))
            .filter(|(_, n)| *n > 0)
    }
}

impl Index<Resource> for ResourceHand {
    type Output = u32;

    fn index(&self, resource: Resource) -> &u32 {
        &self.counts[resource.index()]
    }
}

impl fmt::Display for ResourceHand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("nothing");
        }
        let parts: Vec<String> = self.iter().map(|(r, n)| format!("{n} {r}")).collect();
        f.write_str(&parts.join(", "))
    }
}

/// Building costs
pub mod costs {
    use super::ResourceHand;

    /// 1 brick, 1 lumber
    pub fn road() -> ResourceHand {
        ResourceHand::with_amounts(1, 0, 0, 0, 1)
    }

    /// 1 brick, 1 wool, 1 grain, 1 lumber
    pub fn settlement() -> ResourceHand {
        ResourceHand::with_amounts(1, 1, 0, 1, 1)
    }

    /// 3 ore, 2 grain
    pub fn city() -> ResourceHand {
        ResourceHand::with_amounts(0, 0, 3, 2, 0)
    }

    /// 1 wool, 1 ore, 1 grain
    pub fn development_card() -> ResourceHand {
        ResourceHand::with_amounts(0, 1, 1, 1, 0)
    }
}

/// Port benefits a player has earned by building on the coast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortAccess {
    pub general: bool,
    pub specific: [bool; Resource::COUNT],
}

impl PortAccess {
    pub fn grant(&mut self, kind: PortKind) {
        match kind {
            PortKind::General => self.general = true,
            PortKind::Specific(resource) => self.specific[resource.index()] = true,
        }
    }

    /// How many of `resource` the bank wants for one card
    pub fn ratio_for(&self, resource: Resource) -> u32 {
        if self.specific[resource.index()] {
            PortKind::Specific(resource).ratio()
        } else if self.general {
            PortKind::General.ratio()
        } else {
            DEFAULT_TRADE_RATIO
        }
    }
}

/// A development card in a player's hand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeldCard {
    pub card: DevCard,
    /// Turn number the card was bought on
    pub drawn_on_turn: u32,
}

/// A single player's state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Seat index (0-3)
    pub id: PlayerId,
    pub name: String,
    pub resources: ResourceHand,
    /// Maintained incrementally by the turn engine
    pub victory_points: u32,
    /// Unplayed cards, plus victory-point cards which stay forever
    pub dev_cards: Vec<HeldCard>,
    pub knights_played: u32,
    pub has_largest_army: bool,
    /// Roads in the order they were placed
    pub roads: Vec<EdgeAddress>,
    pub ports: PortAccess,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            resources: ResourceHand::new(),
            victory_points: 0,
            dev_cards: Vec::new(),
            knights_played: 0,
            has_largest_army: false,
            roads: Vec::new(),
            ports: PortAccess::default(),
        }
    }

    /// Victory-point cards held
    pub fn victory_cards_held(&self) -> u32 {
        self.dev_cards
            .iter()
            .filter(|c| c.card == DevCard::VictoryPoint)
            .count() as u32
    }
}
