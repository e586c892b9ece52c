//! The turn engine.
//!
//! `Game` owns the board, the players and the development deck, and moves
//! through a phase state machine one [`Decision`] at a time:
//!
//! - snake-order setup placements
//! - roll, then production or the discard and robber sequence on a 7
//! - the action loop: trades, builds, card purchases and plays
//! - the end-of-round victory check
//!
//! A rejected decision returns a [`GameError`] and leaves every piece of
//! state exactly as it was.

use crate::actions::{Decision, DecisionRequest, GameEvent, StealChoice, TradeOffer};
use crate::board::{
    Board, Piece, PlacementMode, PlayerId, PortKind, Resource, Structure, StructureKind,
    ROBBER_TOTAL,
};
use crate::config::GameConfig;
use crate::deck::{Deck, DevCard};
use crate::dice::{Dice, RandomDice};
use crate::hex::{EdgeAddress, TileAddress, VertexAddress};
use crate::player::{costs, HeldCard, Player, ResourceHand};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info};

pub const MIN_PLAYERS: usize = 3;
pub const MAX_PLAYERS: usize = 4;

/// Bonus for holding largest army
const LARGEST_ARMY_POINTS: u32 = 2;

/// Roads granted by a road-building card
const FREE_ROADS: u8 = 2;

/// Errors that can occur when applying decisions
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GameError {
    #[error("{0} is outside the board")]
    OutOfBounds(String),

    #[error("illegal placement at {0}")]
    IllegalPlacement(String),

    #[error("not enough resources")]
    InsufficientResources,

    #[error("no {0} pieces left")]
    CapacityExceeded(Piece),

    #[error("robber cannot move to {0}")]
    InvalidRobberMove(String),

    #[error("no development cards remain")]
    DeckExhausted,

    #[error("no playable development card at index {0}")]
    InvalidDevCardSelection(usize),

    #[error("not your turn")]
    NotYourTurn,

    #[error("decision not accepted in the current phase")]
    InvalidPhase,

    #[error("must discard {expected} cards, got {got}")]
    InvalidDiscard { expected: u32, got: u32 },

    #[error("invalid trade")]
    InvalidTrade,

    #[error("player {0} cannot be robbed")]
    InvalidTarget(PlayerId),

    #[error("games need 3 or 4 players, got {0}")]
    InvalidPlayerCount(usize),

    #[error("invalid board layout: {0}")]
    InvalidLayout(String),

    #[error("game is over")]
    GameOver,
}

/// Where the turn engine is in the game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Initial placements; `step` counts placements made so far
    Setup { step: usize },

    /// Start of a turn: roll, or play a card first
    Roll,

    /// A 7 was rolled; each listed player owes this many cards
    Discard { pending: BTreeMap<PlayerId, u32> },

    /// Acting player must relocate the robber
    MoveRobber,

    /// Robber moved; acting player may rob one of these opponents
    Steal { victims: Vec<PlayerId> },

    /// Action loop: trade, build, buy, play, end turn
    Actions,

    /// Waiting for the named opponent to answer a trade
    AwaitingTrade { offer: TradeOffer },

    /// Road-building card in play
    RoadBuilding { remaining: u8 },

    /// Monopoly card in play; waiting for a resource
    Monopoly,

    /// Year-of-plenty card in play; waiting for two resources
    YearOfPlenty,

    Finished { winner: PlayerId },
}

/// Seat that places during a setup step: forward once, then back
fn setup_seat(step: usize, player_count: usize) -> PlayerId {
    let seat = if step < player_count {
        step
    } else {
        2 * player_count - 1 - step
    };
    seat as PlayerId
}

/// The complete game
#[derive(Debug, Clone)]
pub struct Game<D: Dice = RandomDice> {
    pub config: GameConfig,
    pub board: Board,
    pub players: Vec<Player>,
    pub deck: Deck,
    phase: Phase,
    current: PlayerId,
    /// 0 during setup, then +1 per completed turn
    turn: u32,
    /// Whether the acting player has rolled this turn
    rolled: bool,
    last_roll: Option<(u8, u8)>,
    dice: D,
}

impl Game<RandomDice> {
    /// A game on a random standard board. With `config.seed` set, board,
    /// deck and dice are all reproducible.
    pub fn new(config: GameConfig, names: Vec<String>) -> Result<Self, GameError> {
        let (board, deck, dice) = match config.seed {
            Some(seed) => {
                let mut rng = StdRng::seed_from_u64(seed);
                let board = Board::standard_with_rng(&mut rng);
                let deck = Deck::standard_with_rng(&mut rng);
                (board, deck, RandomDice::from_seed(rng.gen()))
            }
            None => (
                Board::standard(),
                Deck::standard_with_rng(&mut rand::thread_rng()),
                RandomDice::from_entropy(),
            ),
        };
        Self::with_parts(config, names, board, deck, dice)
    }
}

impl<D: Dice> Game<D> {
    /// A game from explicit parts
    pub fn with_parts(
        config: GameConfig,
        names: Vec<String>,
        board: Board,
        deck: Deck,
        dice: D,
    ) -> Result<Self, GameError> {
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&names.len()) {
            return Err(GameError::InvalidPlayerCount(names.len()));
        }

        let players = names
            .into_iter()
            .enumerate()
            .map(|(i, name)| Player::new(i as PlayerId, name))
            .collect();

        Ok(Self {
            config,
            board,
            players,
            deck,
            phase: Phase::Setup { step: 0 },
            current: 0,
            turn: 0,
            rolled: false,
            last_roll: None,
            dice,
        })
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn current_player(&self) -> PlayerId {
        self.current
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn last_roll(&self) -> Option<(u8, u8)> {
        self.last_roll
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(id as usize)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, Phase::Finished { .. })
    }

    pub fn winner(&self) -> Option<PlayerId> {
        match self.phase {
            Phase::Finished { winner } => Some(winner),
            _ => None,
        }
    }

    pub fn largest_army_holder(&self) -> Option<PlayerId> {
        self.players.iter().find(|p| p.has_largest_army).map(|p| p.id)
    }

    /// Victory points recomputed from the board and the player's flags
    pub fn audited_victory_points(&self, id: PlayerId) -> u32 {
        let Some(player) = self.player(id) else {
            return 0;
        };

        let settlements = self.board.structure_count(id, StructureKind::Settlement) as u32;
        let cities = self.board.structure_count(id, StructureKind::City) as u32;
        let army = if player.has_largest_army {
            LARGEST_ARMY_POINTS
        } else {
            0
        };

        settlements * StructureKind::Settlement.victory_points()
            + cities * StructureKind::City.victory_points()
            + army
            + player.victory_cards_held()
    }

    /// The decision the engine is waiting for, or `None` once finished
    pub fn pending_request(&self) -> Option<DecisionRequest> {
        let player = self.current;
        let request = match &self.phase {
            Phase::Setup { step } => DecisionRequest::SetupPlacement {
                player,
                round: if *step < self.player_count() { 1 } else { 2 },
            },
            Phase::Roll => DecisionRequest::RollOrPlayCard { player },
            Phase::Discard { pending } => {
                let (&player, &count) = pending.iter().next()?;
                DecisionRequest::Discard { player, count }
            }
            Phase::MoveRobber => DecisionRequest::MoveRobber { player },
            Phase::Steal { victims } => DecisionRequest::Steal {
                player,
                victims: victims.clone(),
            },
            Phase::Actions => DecisionRequest::Action { player },
            Phase::AwaitingTrade { offer } => DecisionRequest::TradeResponse {
                player: offer.to,
                offer: offer.clone(),
            },
            Phase::RoadBuilding { remaining } => DecisionRequest::FreeRoad {
                player,
                remaining: *remaining,
            },
            Phase::Monopoly => DecisionRequest::MonopolyResource { player },
            Phase::YearOfPlenty => DecisionRequest::YearOfPlentyResources { player },
            Phase::Finished { .. } => return None,
        };
        Some(request)
    }

    /// Apply one decision from `player`.
    ///
    /// Returns the events the decision produced. On error nothing changed.
    pub fn apply(&mut self, player: PlayerId, decision: Decision) -> Result<Vec<GameEvent>, GameError> {
        if self.is_finished() {
            return Err(GameError::GameOver);
        }

        let events = self.dispatch(player, &decision)?;
        debug!(player, ?decision, events = events.len(), "decision accepted");

        debug_assert!(
            self.players
                .iter()
                .all(|p| p.victory_points == self.audited_victory_points(p.id)),
            "victory point counters drifted from the board"
        );

        Ok(events)
    }

    fn dispatch(&mut self, player: PlayerId, decision: &Decision) -> Result<Vec<GameEvent>, GameError> {
        match decision {
            // ==================== Setup ====================
            Decision::PlaceSetup { settlement, road } => {
                let Phase::Setup { step } = self.phase else {
                    return Err(GameError::InvalidPhase);
                };
                self.expect_turn(player)?;
                self.place_setup(player, step, *settlement, *road)
            }

            // ==================== Turn start ====================
            Decision::RollDice => {
                self.expect_turn(player)?;
                self.expect_phase(Phase::Roll)?;
                Ok(self.roll(player))
            }

            Decision::PlayDevCard(index) => {
                self.expect_turn(player)?;
                if !matches!(self.phase, Phase::Roll | Phase::Actions) {
                    return Err(GameError::InvalidPhase);
                }
                self.play_dev_card(player, *index)
            }

            // ==================== Robber ====================
            Decision::Discard(cards) => self.discard(player, cards),

            Decision::MoveRobber(tile) => {
                self.expect_turn(player)?;
                self.expect_phase(Phase::MoveRobber)?;
                self.move_robber(player, *tile)
            }

            Decision::Steal(choice) => {
                self.expect_turn(player)?;
                let Phase::Steal { victims } = &self.phase else {
                    return Err(GameError::InvalidPhase);
                };
                if let Some(choice) = choice {
                    if !victims.contains(&choice.victim) {
                        return Err(GameError::InvalidTarget(choice.victim));
                    }
                }

                let events = choice
                    .map(|choice| self.steal(player, choice))
                    .into_iter()
                    .collect();
                self.resume();
                Ok(events)
            }

            // ==================== Trading ====================
            Decision::ProposeTrade(offer) => {
                self.expect_turn(player)?;
                self.expect_phase(Phase::Actions)?;
                self.propose_trade(player, offer)
            }

            Decision::RespondToTrade { accept } => self.respond_to_trade(player, *accept),

            Decision::BankTrade { give, receive } => {
                self.expect_turn(player)?;
                self.expect_phase(Phase::Actions)?;
                self.bank_trade(player, *give, *receive)
            }

            // ==================== Building ====================
            Decision::BuildRoad(edge) => {
                self.expect_turn(player)?;
                match self.phase {
                    Phase::Actions => self.build_road(player, *edge, true),
                    Phase::RoadBuilding { remaining } => {
                        let events = self.build_road(player, *edge, false)?;
                        if remaining > 1 {
                            self.phase = Phase::RoadBuilding {
                                remaining: remaining - 1,
                            };
                        } else {
                            self.resume();
                        }
                        Ok(events)
                    }
                    _ => Err(GameError::InvalidPhase),
                }
            }

            Decision::BuildSettlement(vertex) => {
                self.expect_turn(player)?;
                self.expect_phase(Phase::Actions)?;
                self.build_settlement(player, *vertex)
            }

            Decision::BuildCity(vertex) => {
                self.expect_turn(player)?;
                self.expect_phase(Phase::Actions)?;
                self.build_city(player, *vertex)
            }

            Decision::BuyDevCard => {
                self.expect_turn(player)?;
                self.expect_phase(Phase::Actions)?;
                self.buy_dev_card(player)
            }

            // ==================== Card follow-ups ====================
            Decision::FinishRoadBuilding => {
                self.expect_turn(player)?;
                if !matches!(self.phase, Phase::RoadBuilding { .. }) {
                    return Err(GameError::InvalidPhase);
                }
                self.resume();
                Ok(Vec::new())
            }

            Decision::ClaimMonopoly(resource) => {
                self.expect_turn(player)?;
                self.expect_phase(Phase::Monopoly)?;

                let mut total_taken = 0;
                for other in self.players.iter_mut().filter(|p| p.id != player) {
                    total_taken += other.resources.take_all(*resource);
                }
                self.player_mut(player).resources.add(*resource, total_taken);
                self.resume();

                Ok(vec![GameEvent::MonopolyClaimed {
                    player,
                    resource: *resource,
                    total_taken,
                }])
            }

            Decision::ClaimYearOfPlenty(first, second) => {
                self.expect_turn(player)?;
                self.expect_phase(Phase::YearOfPlenty)?;

                let hand = &mut self.player_mut(player).resources;
                hand.add(*first, 1);
                hand.add(*second, 1);
                self.resume();

                Ok(vec![GameEvent::YearOfPlentyClaimed {
                    player,
                    resources: (*first, *second),
                }])
            }

            // ==================== Turn management ====================
            Decision::EndTurn => {
                self.expect_turn(player)?;
                self.expect_phase(Phase::Actions)?;
                Ok(self.end_turn(player))
            }
        }
    }

    // ==================== Validation helpers ====================

    fn expect_turn(&self, player: PlayerId) -> Result<(), GameError> {
        if player != self.current {
            return Err(GameError::NotYourTurn);
        }
        Ok(())
    }

    fn expect_phase(&self, phase: Phase) -> Result<(), GameError> {
        if self.phase != phase {
            return Err(GameError::InvalidPhase);
        }
        Ok(())
    }

    fn player_mut(&mut self, id: PlayerId) -> &mut Player {
        &mut self.players[id as usize]
    }

    fn check_capacity(&self, player: PlayerId, piece: Piece) -> Result<(), GameError> {
        let (count, cap) = match piece {
            Piece::Road => (self.board.road_count(player), self.config.max_roads),
            Piece::Settlement => (
                self.board.structure_count(player, StructureKind::Settlement),
                self.config.max_settlements,
            ),
            Piece::City => (
                self.board.structure_count(player, StructureKind::City),
                self.config.max_cities,
            ),
        };
        if count >= cap {
            return Err(GameError::CapacityExceeded(piece));
        }
        Ok(())
    }

    fn check_afford(&self, player: PlayerId, cost: &ResourceHand) -> Result<(), GameError> {
        if !self.players[player as usize].resources.can_afford(cost) {
            return Err(GameError::InsufficientResources);
        }
        Ok(())
    }

    /// Back to wherever the turn was before a robber or card interlude
    fn resume(&mut self) {
        self.phase = if self.rolled { Phase::Actions } else { Phase::Roll };
    }

    fn award_points(&mut self, player: PlayerId, points: u32) -> GameEvent {
        let p = self.player_mut(player);
        p.victory_points += points;
        GameEvent::VictoryPointsChanged {
            player,
            victory_points: p.victory_points,
        }
    }

    fn grant_ports(&mut self, player: PlayerId, vertex: VertexAddress) {
        let ports: Vec<PortKind> = self.board.ports_at(vertex).collect();
        let p = self.player_mut(player);
        for kind in ports {
            p.ports.grant(kind);
        }
    }

    // ==================== Setup ====================

    fn place_setup(
        &mut self,
        player: PlayerId,
        step: usize,
        settlement: VertexAddress,
        road: EdgeAddress,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.board.vertex_at(settlement)?;
        if self.board.edge_at(road)?.is_some() || !road.endpoints().contains(&settlement) {
            return Err(GameError::IllegalPlacement(road.to_string()));
        }
        self.check_capacity(player, Piece::Settlement)?;
        self.check_capacity(player, Piece::Road)?;

        if !self.board.place_structure(settlement, player, PlacementMode::Setup)? {
            return Err(GameError::IllegalPlacement(settlement.to_string()));
        }
        // Free edge touching the settlement just placed
        let placed = self.board.place_road(road, player)?;
        debug_assert!(placed);

        self.player_mut(player).roads.push(road);
        self.grant_ports(player, settlement);

        let mut events = vec![
            GameEvent::SettlementPlaced {
                player,
                location: settlement,
            },
            GameEvent::RoadPlaced {
                player,
                location: road,
                free: true,
            },
        ];
        events.push(self.award_points(player, StructureKind::Settlement.victory_points()));

        let next = step + 1;
        if next == 2 * self.player_count() {
            self.phase = Phase::Roll;
            self.current = 0;
            self.turn = 1;
            self.rolled = false;
            info!(players = self.player_count(), "setup complete");
            events.push(GameEvent::SetupComplete);
        } else {
            self.phase = Phase::Setup { step: next };
            self.current = setup_seat(next, self.player_count());
        }

        Ok(events)
    }

    // ==================== Production ====================

    fn roll(&mut self, player: PlayerId) -> Vec<GameEvent> {
        let (first, second) = self.dice.roll();
        let total = first + second;
        self.rolled = true;
        self.last_roll = Some((first, second));
        debug!(player, first, second, total, "dice rolled");

        let mut events = vec![GameEvent::DiceRolled {
            player,
            roll: (first, second),
            total,
        }];

        if total == ROBBER_TOTAL {
            let threshold = self.config.discard_threshold;
            let pending: BTreeMap<PlayerId, u32> = self
                .players
                .iter()
                .map(|p| (p.id, p.resources.total()))
                .filter(|(_, held)| *held > threshold)
                .map(|(id, held)| (id, held - held / 2))
                .collect();

            self.phase = if pending.is_empty() {
                Phase::MoveRobber
            } else {
                Phase::Discard { pending }
            };
            return events;
        }

        // Computed in full before any hand is credited
        let production = self.board.distribute_resources(total);
        for (id, hand) in &production {
            self.player_mut(*id).resources.add_hand(hand);
        }
        if !production.is_empty() {
            events.push(GameEvent::ResourcesProduced {
                production: production.into_iter().collect(),
            });
        }

        self.phase = Phase::Actions;
        events
    }

    // ==================== Robber ====================

    fn discard(&mut self, player: PlayerId, cards: &ResourceHand) -> Result<Vec<GameEvent>, GameError> {
        let Phase::Discard { pending } = &mut self.phase else {
            return Err(GameError::InvalidPhase);
        };
        let Some(&expected) = pending.get(&player) else {
            return Err(GameError::NotYourTurn);
        };
        if cards.total() != expected {
            return Err(GameError::InvalidDiscard {
                expected,
                got: cards.total(),
            });
        }
        if !self.players[player as usize].resources.try_subtract(cards) {
            return Err(GameError::InsufficientResources);
        }

        pending.remove(&player);
        if pending.is_empty() {
            self.phase = Phase::MoveRobber;
        }

        Ok(vec![GameEvent::CardsDiscarded {
            player,
            cards: *cards,
        }])
    }

    fn move_robber(&mut self, player: PlayerId, tile: TileAddress) -> Result<Vec<GameEvent>, GameError> {
        let from = self.board.robber_location();
        self.board.set_robber_location(tile)?;

        let victims: Vec<PlayerId> = self
            .board
            .players_on_tile(tile)
            .into_iter()
            .filter(|id| *id != player && !self.players[*id as usize].resources.is_empty())
            .collect();

        if victims.is_empty() {
            self.resume();
        } else {
            self.phase = Phase::Steal { victims };
        }

        Ok(vec![GameEvent::RobberMoved {
            player,
            from,
            to: tile,
        }])
    }

    fn steal(&mut self, thief: PlayerId, choice: StealChoice) -> GameEvent {
        let StealChoice { victim, resource } = choice;
        let taken = self.players[victim as usize]
            .resources
            .try_subtract(&ResourceHand::single(resource, 1));
        if taken {
            self.player_mut(thief).resources.add(resource, 1);
        }

        GameEvent::ResourceStolen {
            thief,
            victim,
            resource: taken.then_some(resource),
        }
    }

    // ==================== Trading ====================

    fn propose_trade(&mut self, player: PlayerId, offer: &TradeOffer) -> Result<Vec<GameEvent>, GameError> {
        if offer.from != player || !offer.is_valid() || offer.to as usize >= self.player_count() {
            return Err(GameError::InvalidTrade);
        }
        self.check_afford(player, &offer.give)?;

        self.phase = Phase::AwaitingTrade {
            offer: offer.clone(),
        };
        Ok(vec![GameEvent::TradeProposed {
            offer: offer.clone(),
        }])
    }

    fn respond_to_trade(&mut self, player: PlayerId, accept: bool) -> Result<Vec<GameEvent>, GameError> {
        let Phase::AwaitingTrade { offer } = &self.phase else {
            return Err(GameError::InvalidPhase);
        };
        if player != offer.to {
            return Err(GameError::NotYourTurn);
        }
        let offer = offer.clone();

        if !accept {
            self.phase = Phase::Actions;
            return Ok(vec![GameEvent::TradeRejected { offer }]);
        }

        self.check_afford(offer.from, &offer.give)?;
        self.check_afford(offer.to, &offer.receive)?;

        let proposer = &mut self.player_mut(offer.from).resources;
        proposer.try_subtract(&offer.give);
        proposer.add_hand(&offer.receive);
        let target = &mut self.player_mut(offer.to).resources;
        target.try_subtract(&offer.receive);
        target.add_hand(&offer.give);

        self.phase = Phase::Actions;
        Ok(vec![GameEvent::TradeCompleted { offer }])
    }

    fn bank_trade(&mut self, player: PlayerId, give: Resource, receive: Resource) -> Result<Vec<GameEvent>, GameError> {
        if give == receive {
            return Err(GameError::InvalidTrade);
        }

        let p = self.player_mut(player);
        let ratio = p.ports.ratio_for(give);
        if !p.resources.try_subtract(&ResourceHand::single(give, ratio)) {
            return Err(GameError::InsufficientResources);
        }
        p.resources.add(receive, 1);

        Ok(vec![GameEvent::BankTrade {
            player,
            gave: give,
            gave_count: ratio,
            received: receive,
        }])
    }

    // ==================== Building ====================

    fn build_road(&mut self, player: PlayerId, edge: EdgeAddress, paid: bool) -> Result<Vec<GameEvent>, GameError> {
        self.board.edge_at(edge)?;
        if paid {
            self.check_afford(player, &costs::road())?;
        }
        self.check_capacity(player, Piece::Road)?;

        if !self.board.place_road(edge, player)? {
            return Err(GameError::IllegalPlacement(edge.to_string()));
        }

        let p = self.player_mut(player);
        if paid {
            p.resources.try_subtract(&costs::road());
        }
        p.roads.push(edge);

        Ok(vec![GameEvent::RoadPlaced {
            player,
            location: edge,
            free: !paid,
        }])
    }

    fn build_settlement(&mut self, player: PlayerId, vertex: VertexAddress) -> Result<Vec<GameEvent>, GameError> {
        self.board.vertex_at(vertex)?;
        self.check_afford(player, &costs::settlement())?;
        self.check_capacity(player, Piece::Settlement)?;

        if !self.board.place_structure(vertex, player, PlacementMode::Main)? {
            return Err(GameError::IllegalPlacement(vertex.to_string()));
        }

        self.player_mut(player).resources.try_subtract(&costs::settlement());
        self.grant_ports(player, vertex);

        Ok(vec![
            GameEvent::SettlementPlaced {
                player,
                location: vertex,
            },
            self.award_points(player, StructureKind::Settlement.victory_points()),
        ])
    }

    fn build_city(&mut self, player: PlayerId, vertex: VertexAddress) -> Result<Vec<GameEvent>, GameError> {
        if self.board.vertex_at(vertex)? != Some(Structure::settlement(player)) {
            return Err(GameError::IllegalPlacement(vertex.to_string()));
        }
        self.check_afford(player, &costs::city())?;
        self.check_capacity(player, Piece::City)?;

        self.board.set_structure(vertex, Structure::city(player))?;
        self.player_mut(player).resources.try_subtract(&costs::city());

        let extra = StructureKind::City.victory_points() - StructureKind::Settlement.victory_points();
        Ok(vec![
            GameEvent::CityBuilt {
                player,
                location: vertex,
            },
            self.award_points(player, extra),
        ])
    }

    // ==================== Development cards ====================

    fn buy_dev_card(&mut self, player: PlayerId) -> Result<Vec<GameEvent>, GameError> {
        if self.deck.is_empty() {
            return Err(GameError::DeckExhausted);
        }
        self.check_afford(player, &costs::development_card())?;
        let Some(card) = self.deck.draw() else {
            return Err(GameError::DeckExhausted);
        };

        let turn = self.turn;
        let p = self.player_mut(player);
        p.resources.try_subtract(&costs::development_card());
        p.dev_cards.push(HeldCard {
            card,
            drawn_on_turn: turn,
        });

        let mut events = vec![GameEvent::DevCardDrawn { player, card }];
        if card == DevCard::VictoryPoint {
            events.push(self.award_points(player, 1));
        }
        Ok(events)
    }

    fn play_dev_card(&mut self, player: PlayerId, index: usize) -> Result<Vec<GameEvent>, GameError> {
        let held = self.players[player as usize]
            .dev_cards
            .get(index)
            .copied()
            .ok_or(GameError::InvalidDevCardSelection(index))?;
        if held.drawn_on_turn >= self.turn {
            return Err(GameError::InvalidDevCardSelection(index));
        }

        let next = match held.card {
            DevCard::Knight => Phase::MoveRobber,
            DevCard::RoadBuilding => Phase::RoadBuilding {
                remaining: FREE_ROADS,
            },
            DevCard::Monopoly => Phase::Monopoly,
            DevCard::YearOfPlenty => Phase::YearOfPlenty,
            DevCard::VictoryPoint => return Err(GameError::InvalidDevCardSelection(index)),
        };

        self.player_mut(player).dev_cards.remove(index);
        let mut events = vec![GameEvent::DevCardPlayed {
            player,
            card: held.card,
        }];

        if held.card == DevCard::Knight {
            self.player_mut(player).knights_played += 1;
            events.extend(self.update_largest_army(player));
        }

        self.phase = next;
        Ok(events)
    }

    /// The first player to the minimum takes largest army; after that it
    /// moves only to a player with strictly more knights than the holder.
    fn update_largest_army(&mut self, player: PlayerId) -> Vec<GameEvent> {
        let knights = self.players[player as usize].knights_played;
        if knights < self.config.largest_army_min {
            return Vec::new();
        }

        let previous = self.largest_army_holder();
        if let Some(holder) = previous {
            if holder == player || self.players[holder as usize].knights_played >= knights {
                return Vec::new();
            }
        }

        let mut events = Vec::new();
        if let Some(holder) = previous {
            let p = self.player_mut(holder);
            p.has_largest_army = false;
            p.victory_points = p.victory_points.saturating_sub(LARGEST_ARMY_POINTS);
            events.push(GameEvent::VictoryPointsChanged {
                player: holder,
                victory_points: p.victory_points,
            });
        }

        self.player_mut(player).has_largest_army = true;
        info!(player, knights, ?previous, "largest army changed hands");
        events.push(GameEvent::LargestArmyChanged {
            previous,
            current: player,
            knights,
        });
        events.push(self.award_points(player, LARGEST_ARMY_POINTS));
        events
    }

    // ==================== Turn management ====================

    fn end_turn(&mut self, player: PlayerId) -> Vec<GameEvent> {
        let next_player = ((player as usize + 1) % self.player_count()) as PlayerId;
        let mut events = vec![GameEvent::TurnEnded {
            player,
            next_player,
        }];

        self.current = next_player;
        self.turn += 1;
        self.rolled = false;
        self.last_roll = None;
        self.phase = Phase::Roll;

        // Victory is only checked once the whole round is over
        if next_player == 0 {
            if let Some(winner) = self.round_winner() {
                let victory_points = self.players[winner as usize].victory_points;
                info!(winner, victory_points, turn = self.turn, "game won");
                self.phase = Phase::Finished { winner };
                events.push(GameEvent::GameWon {
                    player: winner,
                    victory_points,
                });
            }
        }

        events
    }

    /// A player at or over the target with strictly more points than
    /// everyone else
    fn round_winner(&self) -> Option<PlayerId> {
        let best = self.players.iter().max_by_key(|p| p.victory_points)?;
        let tied = self
            .players
            .iter()
            .filter(|p| p.victory_points == best.victory_points)
            .count();

        (best.victory_points >= self.config.victory_target && tied == 1).then_some(best.id)
    }

    // ==================== Valid decisions ====================

    /// Concrete decisions `player` could submit right now, each of which
    /// would be accepted. Player-to-player trade offers are open-ended and
    /// are not listed.
    pub fn valid_decisions(&self, player: PlayerId) -> Vec<Decision> {
        let mut decisions = Vec::new();
        let Some(p) = self.player(player) else {
            return decisions;
        };

        match &self.phase {
            Phase::Finished { .. } => {}

            Phase::Setup { .. } => {
                if player != self.current {
                    return decisions;
                }
                for settlement in self.board.legal_structure_spots(player, PlacementMode::Setup) {
                    for road in settlement.edges() {
                        if matches!(self.board.edge_at(road), Ok(None)) {
                            decisions.push(Decision::PlaceSetup { settlement, road });
                        }
                    }
                }
            }

            Phase::Roll => {
                if player != self.current {
                    return decisions;
                }
                decisions.push(Decision::RollDice);
                decisions.extend(playable_cards(p, self.turn).map(Decision::PlayDevCard));
            }

            Phase::Discard { pending } => {
                if let Some(&count) = pending.get(&player) {
                    decisions.push(Decision::Discard(suggested_discard(&p.resources, count)));
                }
            }

            Phase::MoveRobber => {
                if player != self.current {
                    return decisions;
                }
                let robber = self.board.robber_location();
                decisions.extend(
                    self.board
                        .land_tiles()
                        .filter(|t| t.address != robber)
                        .map(|t| Decision::MoveRobber(t.address)),
                );
            }

            Phase::Steal { victims } => {
                if player != self.current {
                    return decisions;
                }
                decisions.push(Decision::Steal(None));
                for victim in victims {
                    let held = &self.players[*victim as usize].resources;
                    for (resource, _) in held.iter() {
                        decisions.push(Decision::Steal(Some(StealChoice {
                            victim: *victim,
                            resource,
                        })));
                    }
                }
            }

            Phase::Actions => {
                if player != self.current {
                    return decisions;
                }
                self.push_action_decisions(p, &mut decisions);
            }

            Phase::AwaitingTrade { offer } => {
                if player == offer.to {
                    let both_can_pay = self.players[offer.from as usize].resources.can_afford(&offer.give)
                        && p.resources.can_afford(&offer.receive);
                    if both_can_pay {
                        decisions.push(Decision::RespondToTrade { accept: true });
                    }
                    decisions.push(Decision::RespondToTrade { accept: false });
                }
            }

            Phase::RoadBuilding { .. } => {
                if player != self.current {
                    return decisions;
                }
                decisions.push(Decision::FinishRoadBuilding);
                if self.check_capacity(player, Piece::Road).is_ok() {
                    decisions.extend(self.board.legal_road_spots(player).into_iter().map(Decision::BuildRoad));
                }
            }

            Phase::Monopoly => {
                if player == self.current {
                    decisions.extend(Resource::ALL.into_iter().map(Decision::ClaimMonopoly));
                }
            }

            Phase::YearOfPlenty => {
                if player == self.current {
                    for (i, first) in Resource::ALL.into_iter().enumerate() {
                        for second in Resource::ALL.into_iter().skip(i) {
                            decisions.push(Decision::ClaimYearOfPlenty(first, second));
                        }
                    }
                }
            }
        }

        decisions
    }

    fn push_action_decisions(&self, p: &Player, decisions: &mut Vec<Decision>) {
        let player = p.id;
        let hand = &p.resources;

        if hand.can_afford(&costs::road()) && self.check_capacity(player, Piece::Road).is_ok() {
            decisions.extend(self.board.legal_road_spots(player).into_iter().map(Decision::BuildRoad));
        }

        if hand.can_afford(&costs::settlement()) && self.check_capacity(player, Piece::Settlement).is_ok() {
            decisions.extend(
                self.board
                    .legal_structure_spots(player, PlacementMode::Main)
                    .into_iter()
                    .map(Decision::BuildSettlement),
            );
        }

        if hand.can_afford(&costs::city()) && self.check_capacity(player, Piece::City).is_ok() {
            decisions.extend(
                self.board
                    .upgradable_settlements(player)
                    .into_iter()
                    .map(Decision::BuildCity),
            );
        }

        if hand.can_afford(&costs::development_card()) && !self.deck.is_empty() {
            decisions.push(Decision::BuyDevCard);
        }

        decisions.extend(playable_cards(p, self.turn).map(Decision::PlayDevCard));

        for give in Resource::ALL {
            if hand.get(give) < p.ports.ratio_for(give) {
                continue;
            }
            for receive in Resource::ALL.into_iter().filter(|r| *r != give) {
                decisions.push(Decision::BankTrade { give, receive });
            }
        }

        decisions.push(Decision::EndTurn);
    }
}

/// Hand indices of cards that may be played on `turn`
fn playable_cards(p: &Player, turn: u32) -> impl Iterator<Item = usize> + '_ {
    p.dev_cards
        .iter()
        .enumerate()
        .filter(move |(_, held)| held.card.is_playable() && held.drawn_on_turn < turn)
        .map(|(i, _)| i)
}

/// A legal discard of `count` cards, taken from the largest piles first
fn suggested_discard(hand: &ResourceHand, count: u32) -> ResourceHand {
    let mut remaining = *hand;
    let mut discard = ResourceHand::new();
    for _ in 0..count {
        let Some(resource) = Resource::ALL.into_iter().max_by_key(|r| remaining.get(*r)) else {
            break;
        };
        remaining.try_subtract(&ResourceHand::single(resource, 1));
        discard.add(resource, 1);
    }
    discard
}
