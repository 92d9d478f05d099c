//! Grid geometry and first-fit tile placement
//!
//! A board's grid is described by a [`Layout`] (rows x columns, serialized as
//! `"4x6"`-style descriptors) and addressed by [`Cell`]s. Boards overflow to
//! additional pages of the same layout when a page fills up.
//!
//! Placement scans the free-cell set in a deterministic order: page
//! ascending, then row, then column. A brand-new page is always free, so the
//! scan always yields a cell. "Slot occupied" is its own retryable condition
//! ([`PlacementError::CellOccupied`]), distinct from out-of-bounds.

use std::collections::HashSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Largest row or column count a layout may declare
pub const MAX_LAYOUT_DIM: u8 = 12;

/// Errors from layout parsing and validation
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// Row count outside `1..=MAX_LAYOUT_DIM`
    #[error("layout rows out of range: {0}")]
    RowsOutOfRange(u8),

    /// Column count outside `1..=MAX_LAYOUT_DIM`
    #[error("layout columns out of range: {0}")]
    ColumnsOutOfRange(u8),

    /// Descriptor did not look like `"4x6"`
    #[error("malformed layout descriptor: {0:?}")]
    Malformed(String),
}

/// Row/column shape of a board grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Layout {
    rows: u8,
    columns: u8,
}

impl Layout {
    /// Build a layout, validating both dimensions against `1..=MAX_LAYOUT_DIM`
    pub fn new(rows: u8, columns: u8) -> Result<Self, LayoutError> {
        if rows == 0 || rows > MAX_LAYOUT_DIM {
            return Err(LayoutError::RowsOutOfRange(rows));
        }
        if columns == 0 || columns > MAX_LAYOUT_DIM {
            return Err(LayoutError::ColumnsOutOfRange(columns));
        }
        Ok(Self { rows, columns })
    }

    /// Rows per page
    #[inline]
    #[must_use]
    pub const fn rows(self) -> u8 {
        self.rows
    }

    /// Columns per page
    #[inline]
    #[must_use]
    pub const fn columns(self) -> u8 {
        self.columns
    }

    /// Number of cells on one page
    #[inline]
    #[must_use]
    pub const fn cells_per_page(self) -> u16 {
        self.rows as u16 * self.columns as u16
    }

    /// Whether `cell`'s row and column fit this layout (any page)
    #[inline]
    #[must_use]
    pub const fn contains(self, cell: Cell) -> bool {
        cell.row < self.rows && cell.col < self.columns
    }

    /// All cells of `page`, in scan order (row-major)
    pub fn page_cells(self, page: u16) -> impl Iterator<Item = Cell> {
        let columns = self.columns;
        (0..self.rows).flat_map(move |row| (0..columns).map(move |col| Cell { page, row, col }))
    }

    /// First cell not in `occupied`, scanning page 0 upward
    ///
    /// The page after the last occupied one is empty by definition, so this
    /// always yields a cell.
    #[must_use]
    pub fn first_free_cell(self, occupied: &HashSet<Cell>) -> Cell {
        let last_page = occupied
            .iter()
            .map(|cell| cell.page)
            .max()
            .map_or(0, |page| page.saturating_add(1));
        (0..=last_page)
            .flat_map(|page| self.page_cells(page))
            .find(|cell| !occupied.contains(cell))
            .unwrap_or_else(|| Cell::new(last_page.saturating_add(1), 0, 0))
    }
}

impl Default for Layout {
    /// The stock communicator shape
    fn default() -> Self {
        Self { rows: 4, columns: 6 }
    }
}

impl std::fmt::Display for Layout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.rows, self.columns)
    }
}

impl FromStr for Layout {
    type Err = LayoutError;

    /// Parse `"4x6"`-style descriptors (rows x columns)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (rows, columns) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| LayoutError::Malformed(s.to_owned()))?;
        let rows = rows
            .trim()
            .parse::<u8>()
            .map_err(|_| LayoutError::Malformed(s.to_owned()))?;
        let columns = columns
            .trim()
            .parse::<u8>()
            .map_err(|_| LayoutError::Malformed(s.to_owned()))?;
        Self::new(rows, columns)
    }
}

impl From<Layout> for String {
    fn from(layout: Layout) -> Self {
        layout.to_string()
    }
}

impl TryFrom<String> for Layout {
    type Error = LayoutError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// One grid position: page, then row and column within the page
///
/// Field order gives `Ord` the placement scan order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cell {
    /// Page index, 0-based
    pub page: u16,
    /// Row within the page, 0-based
    pub row: u8,
    /// Column within the page, 0-based
    pub col: u8,
}

impl Cell {
    /// Build a cell address
    #[inline]
    #[must_use]
    pub const fn new(page: u16, row: u8, col: u8) -> Self {
        Self { page, row, col }
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "p{}r{}c{}", self.page, self.row, self.col)
    }
}

/// Errors from placing a tile into a grid
///
/// `CellOccupied` is retryable with the next candidate cell; `OutOfBounds`
/// is not.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum PlacementError {
    /// The requested cell already holds a tile
    #[error("cell {0} is already occupied")]
    CellOccupied(Cell),

    /// The requested cell does not exist in this layout
    #[error("cell {cell} is outside the {layout} layout")]
    OutOfBounds {
        /// Requested cell
        cell: Cell,
        /// Layout it was checked against
        layout: Layout,
    },
}
