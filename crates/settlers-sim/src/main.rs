//! Headless settlers simulator.
//!
//! Plays one seeded game between random players and prints the final
//! standings as JSON. Configured through the environment:
//!
//! - `SIM_SEED`: seed for board, deck, dice and players; overrides the
//!   config file's seed, random if neither is set
//! - `SIM_PLAYERS`: 3 or 4 (default 4)
//! - `SIM_MAX_ROUNDS`: give up after this many rounds (default 500)
//! - `SIM_CONFIG`: path to a JSON `GameConfig`

use anyhow::Context;
use serde::Serialize;
use settlers_core::{Game, GameConfig, StructureKind};
use std::env;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod driver;

use driver::RandomDecider;

const DEFAULT_PLAYERS: usize = 4;
const DEFAULT_MAX_ROUNDS: u32 = 500;

struct Settings {
    seed: u64,
    players: usize,
    max_rounds: u32,
    config: GameConfig,
}

impl Settings {
    fn from_env() -> anyhow::Result<Self> {
        let env_seed = match env::var("SIM_SEED") {
            Ok(value) => Some(value.parse().context("SIM_SEED must be an unsigned integer")?),
            Err(_) => None,
        };
        let players = match env::var("SIM_PLAYERS") {
            Ok(value) => value.parse().context("SIM_PLAYERS must be 3 or 4")?,
            Err(_) => DEFAULT_PLAYERS,
        };
        let max_rounds = match env::var("SIM_MAX_ROUNDS") {
            Ok(value) => value.parse().context("SIM_MAX_ROUNDS must be an unsigned integer")?,
            Err(_) => DEFAULT_MAX_ROUNDS,
        };

        let mut config = match env::var("SIM_CONFIG") {
            Ok(path) => {
                let text = std::fs::read_to_string(&path)
                    .with_context(|| format!("reading game config {path}"))?;
                serde_json::from_str(&text).with_context(|| format!("parsing game config {path}"))?
            }
            Err(_) => GameConfig::default(),
        };
        let seed = resolve_seed(env_seed, &mut config);

        Ok(Self {
            seed,
            players,
            max_rounds,
            config,
        })
    }
}

/// Pick the seed the run actually uses and pin it in `config`
fn resolve_seed(env_seed: Option<u64>, config: &mut GameConfig) -> u64 {
    let seed = env_seed.or(config.seed).unwrap_or_else(rand::random);
    config.seed = Some(seed);
    seed
}

#[derive(Serialize)]
struct Standing {
    name: String,
    victory_points: u32,
    settlements: usize,
    cities: usize,
    roads: usize,
    knights_played: u32,
    largest_army: bool,
}

#[derive(Serialize)]
struct Report {
    seed: u64,
    rounds: u32,
    decisions: usize,
    winner: Option<String>,
    standings: Vec<Standing>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::from_env()?;
    info!(
        seed = settings.seed,
        players = settings.players,
        max_rounds = settings.max_rounds,
        "starting simulation"
    );

    let names = (1..=settings.players).map(|i| format!("Player {i}")).collect();
    let mut game = Game::new(settings.config, names)?;
    let mut decider = RandomDecider::with_seed(settings.seed);
    let summary = driver::run(&mut game, &mut decider, settings.max_rounds)?;

    let standings = game
        .players
        .iter()
        .map(|p| Standing {
            name: p.name.clone(),
            victory_points: p.victory_points,
            settlements: game.board.structure_count(p.id, StructureKind::Settlement),
            cities: game.board.structure_count(p.id, StructureKind::City),
            roads: game.board.road_count(p.id),
            knights_played: p.knights_played,
            largest_army: p.has_largest_army,
        })
        .collect();

    let report = Report {
        seed: settings.seed,
        rounds: summary.rounds,
        decisions: summary.decisions,
        winner: game.winner().and_then(|id| game.player(id)).map(|p| p.name.clone()),
        standings,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
