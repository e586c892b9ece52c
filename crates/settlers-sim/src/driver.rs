//! Seeded random players and the loop that feeds their decisions to a game.

use anyhow::bail;
use rand::prelude::*;
use settlers_core::{
    Decision, DecisionRequest, Dice, Game, GameEvent, PlayerId, Resource, ResourceHand, TradeOffer,
};
use tracing::{debug, info, warn};

/// Rejections tolerated before a run is abandoned
const MAX_REJECTED: usize = 50;

/// Chance of proposing a trade when one is possible
const TRADE_CHANCE: f64 = 0.05;

/// Chance of taking a bank trade over other actions
const BANK_TRADE_CHANCE: f64 = 0.2;

/// Picks legal decisions at random, preferring to build
pub struct RandomDecider {
    rng: StdRng,
}

impl RandomDecider {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Answer whatever `request` asks of its player
    pub fn choose<D: Dice>(&mut self, game: &Game<D>, request: &DecisionRequest) -> Option<Decision> {
        let player = request.player();
        let decisions = game.valid_decisions(player);

        if let DecisionRequest::Action { .. } = request {
            if self.rng.gen_bool(TRADE_CHANCE) {
                if let Some(offer) = self.trade_offer(game, player) {
                    return Some(Decision::ProposeTrade(offer));
                }
            }
            return self.choose_action(&decisions);
        }

        decisions.choose(&mut self.rng).cloned()
    }

    /// Builds first, then cards, then maybe a bank trade, then end the turn
    fn choose_action(&mut self, decisions: &[Decision]) -> Option<Decision> {
        let preferences: [fn(&Decision) -> bool; 4] = [
            |d| matches!(d, Decision::BuildCity(_)),
            |d| matches!(d, Decision::BuildSettlement(_)),
            |d| matches!(d, Decision::BuyDevCard | Decision::PlayDevCard(_)),
            |d| matches!(d, Decision::BuildRoad(_)),
        ];
        for filter in preferences {
            if let Some(choice) = matching(decisions, filter).choose(&mut self.rng) {
                return Some((*choice).clone());
            }
        }

        if self.rng.gen_bool(BANK_TRADE_CHANCE) {
            let trades = matching(decisions, |d| matches!(d, Decision::BankTrade { .. }));
            if let Some(choice) = trades.choose(&mut self.rng) {
                return Some((*choice).clone());
            }
        }

        decisions
            .iter()
            .find(|d| matches!(d, Decision::EndTurn))
            .cloned()
    }

    /// One of the player's most plentiful cards for one they lack
    fn trade_offer<D: Dice>(&mut self, game: &Game<D>, player: PlayerId) -> Option<TradeOffer> {
        let hand = &game.player(player)?.resources;
        let give = Resource::ALL.into_iter().max_by_key(|r| hand.get(*r))?;
        let receive = Resource::ALL.into_iter().min_by_key(|r| hand.get(*r))?;
        if hand.get(give) < 2 || give == receive {
            return None;
        }

        let opponents: Vec<PlayerId> = game
            .players
            .iter()
            .map(|p| p.id)
            .filter(|id| *id != player)
            .collect();
        let to = *opponents.choose(&mut self.rng)?;

        Some(TradeOffer::new(
            player,
            to,
            ResourceHand::single(give, 1),
            ResourceHand::single(receive, 1),
        ))
    }
}

fn matching(decisions: &[Decision], filter: fn(&Decision) -> bool) -> Vec<&Decision> {
    decisions.iter().filter(|d| filter(d)).collect()
}

/// What happened during a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub decisions: usize,
    pub rejected: usize,
    pub rounds: u32,
}

/// Play until someone wins or `max_rounds` full rounds have passed
pub fn run<D: Dice>(
    game: &mut Game<D>,
    decider: &mut RandomDecider,
    max_rounds: u32,
) -> anyhow::Result<RunSummary> {
    let mut summary = RunSummary::default();
    let players = game.player_count() as u32;

    while let Some(request) = game.pending_request() {
        summary.rounds = game.turn().saturating_sub(1) / players;
        if summary.rounds >= max_rounds {
            info!(max_rounds, "round limit reached");
            break;
        }

        let player = request.player();
        let Some(decision) = decider.choose(game, &request) else {
            bail!("player {player} has nothing to do for {request:?}");
        };

        match game.apply(player, decision) {
            Ok(events) => {
                summary.decisions += 1;
                for event in &events {
                    log_event(game, event);
                }
            }
            Err(error) => {
                summary.rejected += 1;
                warn!(player, %error, "decision rejected");
                if summary.rejected > MAX_REJECTED {
                    bail!("too many rejected decisions ({})", summary.rejected);
                }
            }
        }
    }

    Ok(summary)
}

fn log_event<D: Dice>(game: &Game<D>, event: &GameEvent) {
    match event {
        GameEvent::TurnEnded {
            player,
            next_player,
        } => {
            let victory_points = game.player(*player).map_or(0, |p| p.victory_points);
            info!(turn = game.turn(), player, victory_points, next_player, "turn ended");
        }
        GameEvent::GameWon {
            player,
            victory_points,
        } => info!(player, victory_points, "game over"),
        other => debug!(?other, "event"),
    }
}
