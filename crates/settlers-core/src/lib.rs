//! Settlers - rules engine for a hex-board resource-trading game
//!
//! This crate provides the core game logic, including:
//! - Tile, edge and vertex addressing with full adjacency
//! - Board state with placement legality and resource production
//! - Player records, resource hands and building costs
//! - A turn engine that consumes decisions and emits events
//!
//! # Architecture
//!
//! The engine never asks anyone for input. It publishes what it is waiting
//! for through [`Game::pending_request`] and accepts answers through
//! [`Game::apply`]. Humans, bots and test scripts all sit on the other side
//! of that contract.
//!
//! # Modules
//!
//! - [`hex`]: Coordinate system for tiles, vertices and edges
//! - [`board`]: Board state and placement rules
//! - [`player`]: Player records and resources
//! - [`deck`]: Development cards
//! - [`dice`]: Injectable dice
//! - [`actions`]: Decisions, requests and events
//! - [`config`]: Rule constants
//! - [`game`]: Turn engine

pub mod actions;
pub mod board;
pub mod config;
pub mod deck;
pub mod dice;
pub mod game;
pub mod hex;
pub mod player;

// Re-export commonly used types
pub use actions::{Decision, DecisionRequest, GameEvent, StealChoice, TradeOffer};
pub use board::{
    Board, Piece, PlacementMode, PlayerId, Port, PortKind, Resource, Road, Structure,
    StructureKind, Terrain, Tile,
};
pub use config::GameConfig;
pub use deck::{Deck, DevCard};
pub use dice::{Dice, LoadedDice, RandomDice};
pub use game::{Game, GameError, Phase};
pub use hex::{EdgeAddress, EdgeOrientation, TileAddress, VertexAddress, VertexOrientation};
pub use player::{costs, HeldCard, Player, PortAccess, ResourceHand};
