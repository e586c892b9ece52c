//! Development cards and the draw pile.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Development card types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DevCard {
    /// Move the robber and steal; counts toward largest army
    Knight,
    /// Place up to two roads for free
    RoadBuilding,
    /// Every opponent hands over all of one named resource
    Monopoly,
    /// Take any two resources from the bank
    YearOfPlenty,
    /// Worth one victory point from the moment it is drawn
    VictoryPoint,
}

impl DevCard {
    /// Victory-point cards are never played as an action
    pub fn is_playable(&self) -> bool {
        !matches!(self, DevCard::VictoryPoint)
    }
}

impl fmt::Display for DevCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DevCard::Knight => "knight",
            DevCard::RoadBuilding => "road building",
            DevCard::Monopoly => "monopoly",
            DevCard::YearOfPlenty => "year of plenty",
            DevCard::VictoryPoint => "victory point",
        };
        f.write_str(name)
    }
}

/// The face-down development card pile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck {
    /// Top of the pile is the end of the vec
    cards: Vec<DevCard>,
}

impl Deck {
    /// Standard 25-card composition, shuffled
    pub fn standard_with_rng<R: Rng>(rng: &mut R) -> Self {
        let mut cards = Vec::with_capacity(25);
        cards.extend(std::iter::repeat(DevCard::Knight).take(14));
        cards.extend(std::iter::repeat(DevCard::VictoryPoint).take(5));
        cards.extend(std::iter::repeat(DevCard::RoadBuilding).take(2));
        cards.extend(std::iter::repeat(DevCard::YearOfPlenty).take(2));
        cards.extend(std::iter::repeat(DevCard::Monopoly).take(2));
        cards.shuffle(rng);
        Self { cards }
    }

    /// A deck that deals `cards` in the given order
    pub fn from_cards(mut cards: Vec<DevCard>) -> Self {
        cards.reverse();
        Self { cards }
    }

    pub fn draw(&mut self) -> Option<DevCard> {
        self.cards.pop()
    }

    pub fn remaining(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}
