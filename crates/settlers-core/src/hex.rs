//! Board addressing on an axial hex grid.
//!
//! Three address kinds describe one planar graph:
//! - `TileAddress`: a hex cell, `(column, row)`
//! - `EdgeAddress`: one of the three sides a cell owns (north-east, east, south-east)
//! - `VertexAddress`: one of the two corners a cell owns (north, south)
//!
//! The remaining three sides and four corners of a cell are owned by its
//! neighbours, so every edge and vertex has exactly one address and no
//! canonicalization step is needed. All adjacency below is closed-form
//! arithmetic over `(column, row, orientation)` and holds for any grid size.
//!
//! Layout is pointy-top: `column` increases going east, `row` increases
//! going south-east.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Smallest column/row index of the playable grid
pub const MIN_COORD: i32 = 1;

/// Largest column/row index of the playable grid
pub const MAX_COORD: i32 = 7;

/// Which of its three owned sides an edge address names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EdgeOrientation {
    /// Side between the north corner and the north-east corner
    NorthEast,
    /// Side between the north-east and south-east corners
    East,
    /// Side between the south-east corner and the south corner
    SouthEast,
}

impl EdgeOrientation {
    pub const ALL: [EdgeOrientation; 3] = [
        EdgeOrientation::NorthEast,
        EdgeOrientation::East,
        EdgeOrientation::SouthEast,
    ];

    /// Decode the numeric orientation used by input collaborators (0, 1 or 2)
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(EdgeOrientation::NorthEast),
            1 => Some(EdgeOrientation::East),
            2 => Some(EdgeOrientation::SouthEast),
            _ => None,
        }
    }

    pub fn index(self) -> u8 {
        self as u8
    }
}

/// Which of its two owned corners a vertex address names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VertexOrientation {
    /// Top corner of the cell
    North,
    /// Bottom corner of the cell
    South,
}

impl VertexOrientation {
    pub const ALL: [VertexOrientation; 2] = [VertexOrientation::North, VertexOrientation::South];

    /// Decode the numeric orientation used by input collaborators (0 or 1)
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(VertexOrientation::North),
            1 => Some(VertexOrientation::South),
            _ => None,
        }
    }

    pub fn index(self) -> u8 {
        self as u8
    }
}

/// Axial address of a hex cell.
///
/// The implicit third cube coordinate is `s = -column - row`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct TileAddress {
    pub column: i32,
    pub row: i32,
}

impl TileAddress {
    pub const fn new(column: i32, row: i32) -> Self {
        Self { column, row }
    }

    /// The implicit third coordinate
    pub const fn s(&self) -> i32 {
        -self.column - self.row
    }

    /// Whether both coordinates lie in the playable range
    pub fn in_grid(&self) -> bool {
        (MIN_COORD..=MAX_COORD).contains(&self.column) && (MIN_COORD..=MAX_COORD).contains(&self.row)
    }

    /// The six neighbouring cells, clockwise starting from east
    pub fn neighbors(&self) -> [TileAddress; 6] {
        let (q, r) = (self.column, self.row);
        [
            TileAddress::new(q + 1, r),     // East
            TileAddress::new(q, r + 1),     // SouthEast
            TileAddress::new(q - 1, r + 1), // SouthWest
            TileAddress::new(q - 1, r),     // West
            TileAddress::new(q, r - 1),     // NorthWest
            TileAddress::new(q + 1, r - 1), // NorthEast
        ]
    }

    /// Distance to another cell in hex steps
    pub fn distance_to(&self, other: &TileAddress) -> u32 {
        let dq = (self.column - other.column).abs();
        let dr = (self.row - other.row).abs();
        let ds = (self.s() - other.s()).abs();
        ((dq + dr + ds) / 2) as u32
    }

    /// The six corners of this cell, clockwise starting from north
    pub fn vertices(&self) -> [VertexAddress; 6] {
        let (q, r) = (self.column, self.row);
        [
            VertexAddress::north(q, r),
            VertexAddress::south(q + 1, r - 1),
            VertexAddress::north(q, r + 1),
            VertexAddress::south(q, r),
            VertexAddress::north(q - 1, r + 1),
            VertexAddress::south(q, r - 1),
        ]
    }

    /// The six sides of this cell, clockwise starting from north-east
    pub fn edges(&self) -> [EdgeAddress; 6] {
        let (q, r) = (self.column, self.row);
        [
            EdgeAddress::new(q, r, EdgeOrientation::NorthEast),
            EdgeAddress::new(q, r, EdgeOrientation::East),
            EdgeAddress::new(q, r, EdgeOrientation::SouthEast),
            EdgeAddress::new(q - 1, r + 1, EdgeOrientation::NorthEast),
            EdgeAddress::new(q - 1, r, EdgeOrientation::East),
            EdgeAddress::new(q, r - 1, EdgeOrientation::SouthEast),
        ]
    }

    /// Centre of the cell in pixel space for a hex of the given radius
    pub fn to_pixel(&self, hex_size: f64) -> (f64, f64) {
        let q = self.column as f64;
        let r = self.row as f64;
        let x = hex_size * 3.0_f64.sqrt() * (q + r / 2.0);
        let y = hex_size * 1.5 * r;
        (x, y)
    }
}

impl fmt::Display for TileAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tile ({}, {})", self.column, self.row)
    }
}

/// Address of a road slot: a cell plus one of the three sides it owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeAddress {
    pub column: i32,
    pub row: i32,
    pub orientation: EdgeOrientation,
}

impl EdgeAddress {
    pub const fn new(column: i32, row: i32, orientation: EdgeOrientation) -> Self {
        Self {
            column,
            row,
            orientation,
        }
    }

    /// The cell that owns this edge
    pub const fn cell(&self) -> TileAddress {
        TileAddress::new(self.column, self.row)
    }

    /// The two cells separated by this edge; the owning cell comes first
    pub fn tiles(&self) -> [TileAddress; 2] {
        let (q, r) = (self.column, self.row);
        let other = match self.orientation {
            EdgeOrientation::NorthEast => TileAddress::new(q + 1, r - 1),
            EdgeOrientation::East => TileAddress::new(q + 1, r),
            EdgeOrientation::SouthEast => TileAddress::new(q, r + 1),
        };
        [self.cell(), other]
    }

    /// The two corners this edge joins
    pub fn endpoints(&self) -> [VertexAddress; 2] {
        let (q, r) = (self.column, self.row);
        match self.orientation {
            EdgeOrientation::NorthEast => [VertexAddress::north(q, r), VertexAddress::south(q + 1, r - 1)],
            EdgeOrientation::East => [VertexAddress::south(q + 1, r - 1), VertexAddress::north(q, r + 1)],
            EdgeOrientation::SouthEast => [VertexAddress::north(q, r + 1), VertexAddress::south(q, r)],
        }
    }

    /// Edges sharing an endpoint with this one (always four)
    pub fn adjacent_edges(&self) -> Vec<EdgeAddress> {
        self.endpoints()
            .iter()
            .flat_map(|v| v.edges())
            .filter(|e| e != self)
            .collect()
    }

    /// Midpoint of the edge in pixel space
    pub fn to_pixel(&self, hex_size: f64) -> (f64, f64) {
        let [a, b] = self.endpoints();
        let (x1, y1) = a.to_pixel(hex_size);
        let (x2, y2) = b.to_pixel(hex_size);
        ((x1 + x2) / 2.0, (y1 + y2) / 2.0)
    }
}

impl fmt::Display for EdgeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "edge ({}, {}, {})",
            self.column,
            self.row,
            self.orientation.index()
        )
    }
}

/// Address of a settlement slot: a cell plus one of the two corners it owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VertexAddress {
    pub column: i32,
    pub row: i32,
    pub orientation: VertexOrientation,
}

impl VertexAddress {
    pub const fn new(column: i32, row: i32, orientation: VertexOrientation) -> Self {
        Self {
            column,
            row,
            orientation,
        }
    }

    pub const fn north(column: i32, row: i32) -> Self {
        Self::new(column, row, VertexOrientation::North)
    }

    pub const fn south(column: i32, row: i32) -> Self {
        Self::new(column, row, VertexOrientation::South)
    }

    /// The cell that owns this vertex
    pub const fn cell(&self) -> TileAddress {
        TileAddress::new(self.column, self.row)
    }

    /// The three cells meeting at this corner; the owning cell comes first
    pub fn tiles(&self) -> [TileAddress; 3] {
        let (q, r) = (self.column, self.row);
        match self.orientation {
            VertexOrientation::North => [
                self.cell(),
                TileAddress::new(q, r - 1),
                TileAddress::new(q + 1, r - 1),
            ],
            VertexOrientation::South => [
                self.cell(),
                TileAddress::new(q - 1, r + 1),
                TileAddress::new(q, r + 1),
            ],
        }
    }

    /// The three edges meeting at this corner
    pub fn edges(&self) -> [EdgeAddress; 3] {
        let (q, r) = (self.column, self.row);
        match self.orientation {
            VertexOrientation::North => [
                EdgeAddress::new(q, r, EdgeOrientation::NorthEast),
                EdgeAddress::new(q, r - 1, EdgeOrientation::SouthEast),
                EdgeAddress::new(q, r - 1, EdgeOrientation::East),
            ],
            VertexOrientation::South => [
                EdgeAddress::new(q, r, EdgeOrientation::SouthEast),
                EdgeAddress::new(q - 1, r + 1, EdgeOrientation::NorthEast),
                EdgeAddress::new(q - 1, r + 1, EdgeOrientation::East),
            ],
        }
    }

    /// The three corners one edge away, in the same order as [`Self::edges`]
    pub fn adjacent_vertices(&self) -> [VertexAddress; 3] {
        let (q, r) = (self.column, self.row);
        match self.orientation {
            VertexOrientation::North => [
                VertexAddress::south(q + 1, r - 1),
                VertexAddress::south(q, r - 1),
                VertexAddress::south(q + 1, r - 2),
            ],
            VertexOrientation::South => [
                VertexAddress::north(q, r + 1),
                VertexAddress::north(q - 1, r + 1),
                VertexAddress::north(q - 1, r + 2),
            ],
        }
    }

    /// Position of the corner in pixel space
    pub fn to_pixel(&self, hex_size: f64) -> (f64, f64) {
        let (x, y) = self.cell().to_pixel(hex_size);
        match self.orientation {
            VertexOrientation::North => (x, y - hex_size),
            VertexOrientation::South => (x, y + hex_size),
        }
    }
}

impl fmt::Display for VertexAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "vertex ({}, {}, {})",
            self.column,
            self.row,
            self.orientation.index()
        )
    }
}
