//! Board state: tiles, roads, structures, ports and the robber.
//!
//! The board is the only owner of spatial state and the only authority on
//! placement legality. It never touches player hands: production is handed
//! back to the turn engine as a per-player ledger to credit in one step.

use crate::game::GameError;
use crate::hex::{EdgeAddress, TileAddress, VertexAddress};
use crate::player::ResourceHand;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Player identifier, the player's seat index (0-3)
pub type PlayerId = u8;

/// Cell at the middle of the board
pub const CENTER: TileAddress = TileAddress::new(4, 4);

/// Land extends this many steps from the centre
const LAND_RADIUS: u32 = 2;

/// Sea ring sits one step beyond the land
const SEA_RADIUS: u32 = 3;

/// Number of land tiles on the board
pub const LAND_TILE_COUNT: usize = 19;

/// Number of ports around the coast
pub const PORT_COUNT: usize = 9;

/// Dice total that never produces
pub const ROBBER_TOTAL: u8 = 7;

/// Resource kinds, in the order counters are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Resource {
    Brick,
    Wool,
    Ore,
    Grain,
    Lumber,
}

impl Resource {
    pub const COUNT: usize = 5;

    pub const ALL: [Resource; Resource::COUNT] = [
        Resource::Brick,
        Resource::Wool,
        Resource::Ore,
        Resource::Grain,
        Resource::Lumber,
    ];

    /// Position of this resource in a counter array
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Resource::Brick => "brick",
            Resource::Wool => "wool",
            Resource::Ore => "ore",
            Resource::Grain => "grain",
            Resource::Lumber => "lumber",
        };
        f.write_str(name)
    }
}

/// What a tile is made of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Terrain {
    /// Produces its resource when its token is rolled
    Resource(Resource),
    /// Never produces; the robber starts here
    Desert,
    /// Surrounds the land; never holds pieces of its own
    Sea,
}

impl Terrain {
    pub fn resource(&self) -> Option<Resource> {
        match self {
            Terrain::Resource(r) => Some(*r),
            Terrain::Desert | Terrain::Sea => None,
        }
    }

    pub fn is_land(&self) -> bool {
        !matches!(self, Terrain::Sea)
    }
}

/// A single hex tile on the board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub address: TileAddress,
    pub terrain: Terrain,
    /// Production token (2-12, never 7); `None` for desert and sea
    pub token: Option<u8>,
    pub has_robber: bool,
}

impl Tile {
    pub fn resource(&self) -> Option<Resource> {
        self.terrain.resource()
    }
}

/// Settlement or city
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StructureKind {
    Settlement,
    City,
}

impl StructureKind {
    /// Units produced per adjacent producing tile
    pub fn yield_per_tile(&self) -> u32 {
        match self {
            StructureKind::Settlement => 1,
            StructureKind::City => 2,
        }
    }

    /// Victory points the structure is worth on the board
    pub fn victory_points(&self) -> u32 {
        match self {
            StructureKind::Settlement => 1,
            StructureKind::City => 2,
        }
    }
}

/// A piece occupying a vertex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Structure {
    pub owner: PlayerId,
    pub kind: StructureKind,
}

impl Structure {
    pub fn settlement(owner: PlayerId) -> Self {
        Self {
            owner,
            kind: StructureKind::Settlement,
        }
    }

    pub fn city(owner: PlayerId) -> Self {
        Self {
            owner,
            kind: StructureKind::City,
        }
    }
}

/// A road occupying an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Road {
    pub owner: PlayerId,
}

/// Piece types with a per-player cap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Piece {
    Road,
    Settlement,
    City,
}

impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Piece::Road => "road",
            Piece::Settlement => "settlement",
            Piece::City => "city",
        };
        f.write_str(name)
    }
}

/// Trade ratio granted by a port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortKind {
    /// 3:1 for any resource
    General,
    /// 2:1 for one resource
    Specific(Resource),
}

impl PortKind {
    pub fn ratio(&self) -> u32 {
        match self {
            PortKind::General => 3,
            PortKind::Specific(_) => 2,
        }
    }
}

/// A port and the two coastal vertices that reach it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    pub vertices: [VertexAddress; 2],
    pub kind: PortKind,
}

/// Whether a structure placement happens during initial setup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlacementMode {
    /// Initial placement: no road connection required
    Setup,
    /// Main game: the vertex must touch one of the player's roads
    Main,
}

/// Land terrain for the fixed layout, in [`land_addresses`] order
const FIXED_TERRAIN: [Terrain; LAND_TILE_COUNT] = [
    Terrain::Resource(Resource::Ore),
    Terrain::Resource(Resource::Wool),
    Terrain::Resource(Resource::Lumber),
    Terrain::Resource(Resource::Grain),
    Terrain::Resource(Resource::Brick),
    Terrain::Resource(Resource::Wool),
    Terrain::Resource(Resource::Brick),
    Terrain::Resource(Resource::Grain),
    Terrain::Resource(Resource::Lumber),
    Terrain::Desert,
    Terrain::Resource(Resource::Lumber),
    Terrain::Resource(Resource::Ore),
    Terrain::Resource(Resource::Lumber),
    Terrain::Resource(Resource::Ore),
    Terrain::Resource(Resource::Grain),
    Terrain::Resource(Resource::Wool),
    Terrain::Resource(Resource::Brick),
    Terrain::Resource(Resource::Grain),
    Terrain::Resource(Resource::Wool),
];

/// Tokens for the fixed layout, handed out to non-desert tiles in order
const FIXED_TOKENS: [u8; LAND_TILE_COUNT - 1] =
    [10, 2, 9, 12, 6, 4, 10, 9, 11, 3, 8, 8, 3, 4, 5, 5, 6, 11];

/// Standard token multiset: one 2 and 12, two of everything else but 7
const STANDARD_TOKENS: [u8; LAND_TILE_COUNT - 1] =
    [2, 3, 3, 4, 4, 5, 5, 6, 6, 8, 8, 9, 9, 10, 10, 11, 11, 12];

const FIXED_PORTS: [PortKind; PORT_COUNT] = [
    PortKind::General,
    PortKind::Specific(Resource::Grain),
    PortKind::Specific(Resource::Ore),
    PortKind::General,
    PortKind::Specific(Resource::Wool),
    PortKind::General,
    PortKind::General,
    PortKind::Specific(Resource::Brick),
    PortKind::Specific(Resource::Lumber),
];

/// Land cells in row-major order
pub fn land_addresses() -> Vec<TileAddress> {
    cells_within(LAND_RADIUS)
}

fn cells_within(radius: u32) -> Vec<TileAddress> {
    let mut cells = Vec::new();
    for row in crate::hex::MIN_COORD..=crate::hex::MAX_COORD {
        for column in crate::hex::MIN_COORD..=crate::hex::MAX_COORD {
            let cell = TileAddress::new(column, row);
            if cell.distance_to(&CENTER) <= radius {
                cells.push(cell);
            }
        }
    }
    cells
}

/// The complete game board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    tiles: BTreeMap<TileAddress, Tile>,
    structures: BTreeMap<VertexAddress, Structure>,
    roads: BTreeMap<EdgeAddress, Road>,
    ports: Vec<Port>,
    robber: TileAddress,
}

impl Board {
    /// The fixed layout: desert in the centre, known tokens and ports
    pub fn fixed() -> Self {
        let mut tokens = FIXED_TOKENS.iter().copied();
        let land = land_addresses()
            .into_iter()
            .zip(FIXED_TERRAIN)
            .map(|(address, terrain)| {
                let token = terrain.resource().and_then(|_| tokens.next());
                (address, terrain, token)
            })
            .collect();
        Self::assemble(land, &FIXED_PORTS)
    }

    /// A randomized standard board
    pub fn standard() -> Self {
        let mut rng = rand::thread_rng();
        Self::standard_with_rng(&mut rng)
    }

    /// A randomized standard board drawn from the provided RNG.
    ///
    /// Terrain and ports are shuffled; tokens are reshuffled until no 6 and 8
    /// sit on neighbouring tiles.
    pub fn standard_with_rng<R: Rng>(rng: &mut R) -> Self {
        let mut terrain: Vec<Terrain> = FIXED_TERRAIN.to_vec();
        terrain.shuffle(rng);

        let addresses = land_addresses();
        let producing: Vec<TileAddress> = addresses
            .iter()
            .zip(&terrain)
            .filter(|(_, t)| t.resource().is_some())
            .map(|(a, _)| *a)
            .collect();
        let tokens = assign_tokens_avoiding_adjacent_6_8(&producing, rng);
        let token_at: BTreeMap<TileAddress, u8> = producing.into_iter().zip(tokens).collect();

        let land = addresses
            .into_iter()
            .zip(terrain)
            .map(|(address, terrain)| (address, terrain, token_at.get(&address).copied()))
            .collect();

        let mut ports = FIXED_PORTS.to_vec();
        ports.shuffle(rng);

        Self::assemble(land, &ports)
    }

    /// Build a board from explicit land terrain and tokens.
    ///
    /// `land` lists the 19 land tiles in [`land_addresses`] order. Fails with
    /// `InvalidLayout` unless there is exactly one desert, every resource tile
    /// carries a token in 2-12 other than 7, and the desert carries none.
    pub fn from_layout(
        land: &[(Terrain, Option<u8>)],
        port_kinds: &[PortKind],
    ) -> Result<Self, GameError> {
        if land.len() != LAND_TILE_COUNT {
            return Err(GameError::InvalidLayout(format!(
                "expected {} land tiles, got {}",
                LAND_TILE_COUNT,
                land.len()
            )));
        }
        if port_kinds.len() > PORT_COUNT {
            return Err(GameError::InvalidLayout(format!(
                "at most {} ports fit the coast, got {}",
                PORT_COUNT,
                port_kinds.len()
            )));
        }

        let deserts = land.iter().filter(|(t, _)| *t == Terrain::Desert).count();
        if deserts != 1 {
            return Err(GameError::InvalidLayout(format!(
                "expected exactly one desert, got {deserts}"
            )));
        }

        for (terrain, token) in land {
            match (terrain, token) {
                (Terrain::Sea, _) => {
                    return Err(GameError::InvalidLayout("sea listed as land".into()));
                }
                (Terrain::Desert, Some(t)) => {
                    return Err(GameError::InvalidLayout(format!("desert carries token {t}")));
                }
                (Terrain::Resource(r), None) => {
                    return Err(GameError::InvalidLayout(format!("{r} tile has no token")));
                }
                (Terrain::Resource(_), Some(t)) if !(2..=12).contains(t) || *t == ROBBER_TOTAL => {
                    return Err(GameError::InvalidLayout(format!("token {t} is not allowed")));
                }
                _ => {}
            }
        }

        let land = land_addresses()
            .into_iter()
            .zip(land.iter().copied())
            .map(|(address, (terrain, token))| (address, terrain, token))
            .collect();
        Ok(Self::assemble(land, port_kinds))
    }

    fn assemble(land: Vec<(TileAddress, Terrain, Option<u8>)>, port_kinds: &[PortKind]) -> Self {
        let mut tiles = BTreeMap::new();
        let mut robber = CENTER;

        for (address, terrain, token) in land {
            let has_robber = terrain == Terrain::Desert;
            if has_robber {
                robber = address;
            }
            tiles.insert(
                address,
                Tile {
                    address,
                    terrain,
                    token,
                    has_robber,
                },
            );
        }

        for address in cells_within(SEA_RADIUS) {
            tiles.entry(address).or_insert(Tile {
                address,
                terrain: Terrain::Sea,
                token: None,
                has_robber: false,
            });
        }

        let mut board = Self {
            tiles,
            structures: BTreeMap::new(),
            roads: BTreeMap::new(),
            ports: Vec::new(),
            robber,
        };

        board.ports = board
            .port_edges()
            .into_iter()
            .zip(port_kinds.iter().copied())
            .map(|(edge, kind)| Port {
                vertices: edge.endpoints(),
                kind,
            })
            .collect();

        board
    }

    /// Coastal edges spread evenly around the island
    fn port_edges(&self) -> Vec<EdgeAddress> {
        let coastal: BTreeSet<EdgeAddress> = self
            .land_tiles()
            .flat_map(|t| t.address.edges())
            .filter(|e| e.tiles().iter().filter(|t| self.is_land(t)).count() == 1)
            .collect();

        let (cx, cy) = CENTER.to_pixel(1.0);
        let mut around: Vec<(f64, EdgeAddress)> = coastal
            .into_iter()
            .map(|edge| {
                let (x, y) = edge.to_pixel(1.0);
                ((y - cy).atan2(x - cx), edge)
            })
            .collect();
        around.sort_by(|a, b| a.0.total_cmp(&b.0));

        let len = around.len();
        (0..PORT_COUNT.min(len))
            .map(|i| around[i * len / PORT_COUNT].1)
            .collect()
    }

    // ==================== Lookups ====================

    /// The tile at `address`
    pub fn tile_at(&self, address: TileAddress) -> Result<&Tile, GameError> {
        self.tiles
            .get(&address)
            .ok_or_else(|| GameError::OutOfBounds(address.to_string()))
    }

    /// The road on `address`, if any
    pub fn edge_at(&self, address: EdgeAddress) -> Result<Option<Road>, GameError> {
        if !self.edge_in_bounds(address) {
            return Err(GameError::OutOfBounds(address.to_string()));
        }
        Ok(self.roads.get(&address).copied())
    }

    /// The structure on `address`, if any
    pub fn vertex_at(&self, address: VertexAddress) -> Result<Option<Structure>, GameError> {
        if !self.vertex_in_bounds(address) {
            return Err(GameError::OutOfBounds(address.to_string()));
        }
        Ok(self.structures.get(&address).copied())
    }

    pub fn is_land(&self, address: &TileAddress) -> bool {
        self.tiles.get(address).is_some_and(|t| t.terrain.is_land())
    }

    /// An edge exists on the board when it borders at least one land tile
    pub fn edge_in_bounds(&self, address: EdgeAddress) -> bool {
        address.cell().in_grid() && address.tiles().iter().any(|t| self.is_land(t))
    }

    /// A vertex exists on the board when it touches at least one land tile
    pub fn vertex_in_bounds(&self, address: VertexAddress) -> bool {
        address.cell().in_grid() && address.tiles().iter().any(|t| self.is_land(t))
    }

    pub fn land_tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.values().filter(|t| t.terrain.is_land())
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.values()
    }

    /// Every vertex on the board, sorted
    pub fn vertices(&self) -> BTreeSet<VertexAddress> {
        self.land_tiles().flat_map(|t| t.address.vertices()).collect()
    }

    /// Every edge on the board, sorted
    pub fn edges(&self) -> BTreeSet<EdgeAddress> {
        self.land_tiles().flat_map(|t| t.address.edges()).collect()
    }

    pub fn structures(&self) -> impl Iterator<Item = (&VertexAddress, &Structure)> {
        self.structures.iter()
    }

    pub fn roads(&self) -> impl Iterator<Item = (&EdgeAddress, &Road)> {
        self.roads.iter()
    }

    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    // ==================== Robber ====================

    pub fn robber_location(&self) -> TileAddress {
        self.robber
    }

    /// Move the robber. Staying put and moving onto the sea are both rejected.
    pub fn set_robber_location(&mut self, address: TileAddress) -> Result<(), GameError> {
        let tile = self.tile_at(address)?;
        if address == self.robber || !tile.terrain.is_land() {
            return Err(GameError::InvalidRobberMove(address.to_string()));
        }

        if let Some(previous) = self.tiles.get_mut(&self.robber) {
            previous.has_robber = false;
        }
        if let Some(next) = self.tiles.get_mut(&address) {
            next.has_robber = true;
        }
        self.robber = address;
        Ok(())
    }

    // ==================== Placement ====================

    /// Place a road for `player` if the edge is free and touches the
    /// player's network. Returns `Ok(false)` without mutating otherwise.
    pub fn place_road(&mut self, address: EdgeAddress, player: PlayerId) -> Result<bool, GameError> {
        if self.edge_at(address)?.is_some() || !self.touches_network(address, player) {
            return Ok(false);
        }
        self.roads.insert(address, Road { owner: player });
        Ok(true)
    }

    /// Place a settlement for `player` if the vertex and all its neighbours
    /// are free and, in the main game, one of the player's roads reaches it.
    /// Returns `Ok(false)` without mutating otherwise.
    pub fn place_structure(
        &mut self,
        address: VertexAddress,
        player: PlayerId,
        mode: PlacementMode,
    ) -> Result<bool, GameError> {
        if !self.can_place_structure(address, player, mode)? {
            return Ok(false);
        }
        self.structures.insert(address, Structure::settlement(player));
        Ok(true)
    }

    /// Overwrite a vertex. Used for the settlement-to-city upgrade once the
    /// caller has checked ownership; occupancy rules are not re-run.
    pub fn set_structure(&mut self, address: VertexAddress, structure: Structure) -> Result<(), GameError> {
        if !self.vertex_in_bounds(address) {
            return Err(GameError::OutOfBounds(address.to_string()));
        }
        self.structures.insert(address, structure);
        Ok(())
    }

    fn can_place_structure(
        &self,
        address: VertexAddress,
        player: PlayerId,
        mode: PlacementMode,
    ) -> Result<bool, GameError> {
        if self.vertex_at(address)?.is_some() {
            return Ok(false);
        }
        let crowded = address
            .adjacent_vertices()
            .iter()
            .any(|v| self.structures.contains_key(v));
        if crowded {
            return Ok(false);
        }
        Ok(match mode {
            PlacementMode::Setup => true,
            PlacementMode::Main => address.edges().iter().any(|e| self.owns_road(e, player)),
        })
    }

    fn owns_road(&self, edge: &EdgeAddress, player: PlayerId) -> bool {
        self.roads.get(edge).is_some_and(|r| r.owner == player)
    }

    fn owns_structure(&self, vertex: &VertexAddress, player: PlayerId) -> bool {
        self.structures.get(vertex).is_some_and(|s| s.owner == player)
    }

    /// Whether an edge shares an endpoint with the player's structure or road
    fn touches_network(&self, edge: EdgeAddress, player: PlayerId) -> bool {
        edge.endpoints().iter().any(|v| {
            self.owns_structure(v, player)
                || v.edges().iter().any(|e| *e != edge && self.owns_road(e, player))
        })
    }

    // ==================== Legality projections ====================

    /// Vertices where `player` could place a settlement right now
    pub fn legal_structure_spots(&self, player: PlayerId, mode: PlacementMode) -> Vec<VertexAddress> {
        self.vertices()
            .into_iter()
            .filter(|v| matches!(self.can_place_structure(*v, player, mode), Ok(true)))
            .collect()
    }

    /// Edges where `player` could place a road right now
    pub fn legal_road_spots(&self, player: PlayerId) -> Vec<EdgeAddress> {
        self.edges()
            .into_iter()
            .filter(|e| !self.roads.contains_key(e) && self.touches_network(*e, player))
            .collect()
    }

    /// The player's settlements, all of which may become cities
    pub fn upgradable_settlements(&self, player: PlayerId) -> Vec<VertexAddress> {
        self.structures
            .iter()
            .filter(|(_, s)| **s == Structure::settlement(player))
            .map(|(v, _)| *v)
            .collect()
    }

    pub fn structure_count(&self, player: PlayerId, kind: StructureKind) -> usize {
        self.structures
            .values()
            .filter(|s| s.owner == player && s.kind == kind)
            .count()
    }

    pub fn road_count(&self, player: PlayerId) -> usize {
        self.roads.values().filter(|r| r.owner == player).count()
    }

    /// Owners of structures on the corners of a tile
    pub fn players_on_tile(&self, address: TileAddress) -> BTreeSet<PlayerId> {
        address
            .vertices()
            .iter()
            .filter_map(|v| self.structures.get(v))
            .map(|s| s.owner)
            .collect()
    }

    /// Ports reachable from a vertex
    pub fn ports_at(&self, vertex: VertexAddress) -> impl Iterator<Item = PortKind> + '_ {
        self.ports
            .iter()
            .filter(move |p| p.vertices.contains(&vertex))
            .map(|p| p.kind)
    }

    /// Ports reachable from any of the player's structures
    pub fn player_ports(&self, player: PlayerId) -> Vec<PortKind> {
        self.ports
            .iter()
            .filter(|p| p.vertices.iter().any(|v| self.owns_structure(v, player)))
            .map(|p| p.kind)
            .collect()
    }

    // ==================== Production ====================

    /// What a dice total produces for each player.
    ///
    /// Every tile whose token matches and that is free of the robber pays its
    /// resource to each adjacent structure: 1 per settlement, 2 per city.
    /// A total of 7 produces nothing.
    pub fn distribute_resources(&self, total: u8) -> BTreeMap<PlayerId, ResourceHand> {
        let mut production: BTreeMap<PlayerId, ResourceHand> = BTreeMap::new();
        if total == ROBBER_TOTAL {
            return production;
        }

        for tile in self.tiles.values() {
            if tile.token != Some(total) || tile.has_robber {
                continue;
            }
            let Some(resource) = tile.resource() else {
                continue;
            };

            for vertex in tile.address.vertices() {
                if let Some(structure) = self.structures.get(&vertex) {
                    production
                        .entry(structure.owner)
                        .or_default()
                        .add(resource, structure.kind.yield_per_tile());
                }
            }
        }

        production
    }
}

/// Shuffle tokens onto the producing tiles until no 6 and 8 are neighbours
fn assign_tokens_avoiding_adjacent_6_8<R: Rng>(producing: &[TileAddress], rng: &mut R) -> Vec<u8> {
    const MAX_ATTEMPTS: usize = 1000;

    let mut tokens = STANDARD_TOKENS.to_vec();
    for _ in 0..MAX_ATTEMPTS {
        tokens.shuffle(rng);
        if !has_adjacent_6_8(producing, &tokens) {
            break;
        }
    }
    tokens
}

fn has_adjacent_6_8(producing: &[TileAddress], tokens: &[u8]) -> bool {
    let hot: Vec<TileAddress> = producing
        .iter()
        .zip(tokens)
        .filter(|(_, t)| **t == 6 || **t == 8)
        .map(|(a, _)| *a)
        .collect();
    hot.iter()
        .enumerate()
        .any(|(i, a)| hot[i + 1..].iter().any(|b| a.distance_to(b) == 1))
}
