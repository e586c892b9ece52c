//! The decision contract between the engine and its collaborators.
//!
//! This module defines:
//! - `Decision`, a structured choice submitted by a player
//! - `DecisionRequest`, what the engine is currently waiting for
//! - `GameEvent`, the state deltas produced by an accepted decision

use crate::board::{PlayerId, Resource};
use crate::deck::DevCard;
use crate::hex::{EdgeAddress, TileAddress, VertexAddress};
use crate::player::ResourceHand;
use serde::{Deserialize, Serialize};

/// A trade proposed by the acting player to one opponent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeOffer {
    pub from: PlayerId,
    pub to: PlayerId,
    /// Cards `from` hands over
    pub give: ResourceHand,
    /// Cards `from` wants back
    pub receive: ResourceHand,
}

impl TradeOffer {
    pub fn new(from: PlayerId, to: PlayerId, give: ResourceHand, receive: ResourceHand) -> Self {
        Self {
            from,
            to,
            give,
            receive,
        }
    }

    /// Both sides non-empty and addressed to someone else
    pub fn is_valid(&self) -> bool {
        self.from != self.to && !self.give.is_empty() && !self.receive.is_empty()
    }
}

/// Which opponent to rob after moving the robber, and which resource to take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StealChoice {
    pub victim: PlayerId,
    pub resource: Resource,
}

/// Everything a player can submit to the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    // ==================== Setup ====================
    /// Initial settlement plus a road touching it
    PlaceSetup {
        settlement: VertexAddress,
        road: EdgeAddress,
    },

    // ==================== Turn start ====================
    RollDice,
    /// Play the card at this index of the player's hand
    PlayDevCard(usize),

    // ==================== Robber ====================
    /// Cards to give up after a 7
    Discard(ResourceHand),
    MoveRobber(TileAddress),
    /// `None` declines to steal
    Steal(Option<StealChoice>),

    // ==================== Trading ====================
    ProposeTrade(TradeOffer),
    RespondToTrade { accept: bool },
    /// Give the port ratio of `give` for one `receive`
    BankTrade { give: Resource, receive: Resource },

    // ==================== Building ====================
    /// Paid road in the action loop, free road while road building
    BuildRoad(EdgeAddress),
    BuildSettlement(VertexAddress),
    BuildCity(VertexAddress),
    BuyDevCard,

    // ==================== Card follow-ups ====================
    /// Stop road building before both roads are placed
    FinishRoadBuilding,
    ClaimMonopoly(Resource),
    ClaimYearOfPlenty(Resource, Resource),

    EndTurn,
}

/// What the engine is blocked on, and from whom
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionRequest {
    /// `round` is 1 going forward, 2 coming back
    SetupPlacement { player: PlayerId, round: u8 },
    RollOrPlayCard { player: PlayerId },
    Discard { player: PlayerId, count: u32 },
    MoveRobber { player: PlayerId },
    Steal { player: PlayerId, victims: Vec<PlayerId> },
    Action { player: PlayerId },
    TradeResponse { player: PlayerId, offer: TradeOffer },
    FreeRoad { player: PlayerId, remaining: u8 },
    MonopolyResource { player: PlayerId },
    YearOfPlentyResources { player: PlayerId },
}

impl DecisionRequest {
    /// The player who must answer
    pub fn player(&self) -> PlayerId {
        match self {
            DecisionRequest::SetupPlacement { player, .. }
            | DecisionRequest::RollOrPlayCard { player }
            | DecisionRequest::Discard { player, .. }
            | DecisionRequest::MoveRobber { player }
            | DecisionRequest::Steal { player, .. }
            | DecisionRequest::Action { player }
            | DecisionRequest::TradeResponse { player, .. }
            | DecisionRequest::FreeRoad { player, .. }
            | DecisionRequest::MonopolyResource { player }
            | DecisionRequest::YearOfPlentyResources { player } => *player,
        }
    }
}

/// State deltas emitted by accepted decisions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    SettlementPlaced {
        player: PlayerId,
        location: VertexAddress,
    },
    RoadPlaced {
        player: PlayerId,
        location: EdgeAddress,
        /// Placed during setup or by a road-building card
        free: bool,
    },
    CityBuilt {
        player: PlayerId,
        location: VertexAddress,
    },
    SetupComplete,

    DiceRolled {
        player: PlayerId,
        roll: (u8, u8),
        total: u8,
    },
    /// Everything one roll produced, credited in a single step
    ResourcesProduced {
        production: Vec<(PlayerId, ResourceHand)>,
    },

    CardsDiscarded {
        player: PlayerId,
        cards: ResourceHand,
    },
    RobberMoved {
        player: PlayerId,
        from: TileAddress,
        to: TileAddress,
    },
    /// `resource` is `None` when the victim held none of the named type
    ResourceStolen {
        thief: PlayerId,
        victim: PlayerId,
        resource: Option<Resource>,
    },

    TradeProposed {
        offer: TradeOffer,
    },
    TradeCompleted {
        offer: TradeOffer,
    },
    TradeRejected {
        offer: TradeOffer,
    },
    BankTrade {
        player: PlayerId,
        gave: Resource,
        gave_count: u32,
        received: Resource,
    },

    DevCardDrawn {
        player: PlayerId,
        card: DevCard,
    },
    DevCardPlayed {
        player: PlayerId,
        card: DevCard,
    },
    MonopolyClaimed {
        player: PlayerId,
        resource: Resource,
        total_taken: u32,
    },
    YearOfPlentyClaimed {
        player: PlayerId,
        resources: (Resource, Resource),
    },
    LargestArmyChanged {
        previous: Option<PlayerId>,
        current: PlayerId,
        knights: u32,
    },
    VictoryPointsChanged {
        player: PlayerId,
        victory_points: u32,
    },

    TurnEnded {
        player: PlayerId,
        next_player: PlayerId,
    },
    GameWon {
        player: PlayerId,
        victory_points: u32,
    },
}
