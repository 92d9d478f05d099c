//! Boards: named tile grids forming a navigation graph
//!
//! A board starts life under a temporary identifier, acquires a permanent
//! one when persisted, and from then on is referenced only by it. Replica
//! shells are built here ([`Board::replica_shell`]); the replication engine
//! owns when they persist and how their references get rewritten.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::grid::{Cell, Layout, PlacementError};
use crate::ids::{BoardId, PermId, TempId};
use crate::tile::{Tile, TileContent};

/// Owning user stamped onto private boards
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerRef {
    /// Display name
    pub name: String,
    /// Contact address
    pub email: String,
}

impl OwnerRef {
    /// Build an owner reference
    #[must_use]
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

/// A named grid of tiles; a node in the navigation graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    /// Identifier, in either space
    pub id: BoardId,
    /// Display name
    pub name: String,
    /// Naming key for preset-bundle boards, e.g. `"cboard.board.home"`
    pub name_key: Option<String>,
    /// Free-form description
    pub description: Option<String>,
    /// Owning user; none for public or system boards
    pub owner: Option<OwnerRef>,
    /// Whether the board is listed publicly
    pub is_public: bool,
    /// Whether the board is hidden from the owner's own listings
    pub hidden: bool,
    /// Grid shape
    pub layout: Layout,
    /// Locale tag, e.g. `"en"` or `"es-ES"`
    pub language: String,
    /// Tiles in grid order
    pub tiles: Vec<Tile>,
    /// Stamped by the store when first persisted
    pub created_at: Option<DateTime<Utc>>,
}

impl Board {
    /// A new, empty board under a fresh temporary identifier
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: BoardId::Temp(TempId::new()),
            name: name.into(),
            name_key: None,
            description: None,
            owner: None,
            is_public: false,
            hidden: false,
            layout: Layout::default(),
            language: "en".to_owned(),
            tiles: Vec::new(),
            created_at: None,
        }
    }

    /// Set the grid shape
    #[must_use]
    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    /// Set the locale tag
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Replace the tile sequence
    #[must_use]
    pub fn with_tiles(mut self, tiles: Vec<Tile>) -> Self {
        self.tiles = tiles;
        self
    }

    /// Set the owning user
    #[must_use]
    pub fn with_owner(mut self, owner: OwnerRef) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Set the preset naming key
    #[must_use]
    pub fn with_name_key(mut self, key: impl Into<String>) -> Self {
        self.name_key = Some(key.into());
        self
    }

    /// Set the description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Mark the board publicly listed
    #[must_use]
    pub fn public(mut self) -> Self {
        self.is_public = true;
        self
    }

    /// Whether any tile carries real content
    #[must_use]
    pub fn has_real_tiles(&self) -> bool {
        self.tiles.iter().any(Tile::is_real)
    }

    /// True for boards in summary form: no tiles at all, or only virtual
    /// placeholders. Such boards need a full fetch before they are copyable.
    #[must_use]
    pub fn has_only_virtual_tiles(&self) -> bool {
        !self.has_real_tiles()
    }

    /// Iterator over real tile payloads, skipping virtual placeholders
    pub fn real_tiles(&self) -> impl Iterator<Item = &TileContent> {
        self.tiles.iter().filter_map(Tile::content)
    }

    /// Boards this one links to, one per real non-shared navigation tile,
    /// in tile order
    pub fn child_targets(&self) -> impl Iterator<Item = BoardId> + '_ {
        self.tiles.iter().filter_map(Tile::child_target)
    }

    /// Name shown to users: the name, else the tail of the preset naming
    /// key, else `"Untitled"`
    #[must_use]
    pub fn display_name(&self) -> String {
        if !self.name.trim().is_empty() {
            return self.name.clone();
        }
        if let Some(key) = &self.name_key {
            if let Some(tail) = key.rsplit('.').next().filter(|tail| !tail.is_empty()) {
                return tail.to_owned();
            }
        }
        "Untitled".to_owned()
    }

    /// Build the private copy shell of this board
    ///
    /// Fresh temporary identifier, private visibility, the requesting owner
    /// stamped on, layout and language carried over verbatim. Real tiles are
    /// copied as-is, navigation targets still pointing at the originals (the
    /// backpatch pass corrects them after persist); virtual placeholders are
    /// dropped, so a summary-only source copies as a valid empty board.
    #[must_use]
    pub fn replica_shell(&self, temp: TempId, owner: &OwnerRef) -> Self {
        Self {
            id: BoardId::Temp(temp),
            name: self.display_name(),
            name_key: self.name_key.clone(),
            description: self.description.clone(),
            owner: Some(owner.clone()),
            is_public: false,
            hidden: false,
            layout: self.layout,
            language: self.language.clone(),
            tiles: self
                .tiles
                .iter()
                .filter(|tile| tile.is_real())
                .cloned()
                .collect(),
            created_at: None,
        }
    }

    /// Finish the shell-to-replica transition once the store has assigned a
    /// permanent identifier. The temporary identifier is discarded here and
    /// never referenced again.
    #[must_use]
    pub fn into_persisted(mut self, id: PermId) -> Self {
        self.id = BoardId::Perm(id);
        self
    }

    /// Cells occupied by real tiles
    ///
    /// Tiles without an explicit position occupy cells in row-major index
    /// order, overflowing to later pages.
    #[must_use]
    pub fn occupied_cells(&self) -> HashSet<Cell> {
        self.real_tiles()
            .enumerate()
            .map(|(index, content)| content.position.unwrap_or_else(|| self.index_cell(index)))
            .collect()
    }

    /// Cell the `index`-th real tile occupies when it has no explicit
    /// position
    fn index_cell(&self, index: usize) -> Cell {
        let per_page = usize::from(self.layout.cells_per_page());
        let columns = usize::from(self.layout.columns());
        let page = u16::try_from(index / per_page).unwrap_or(u16::MAX);
        let slot = index % per_page;
        let row = u8::try_from(slot / columns).unwrap_or(u8::MAX);
        let col = u8::try_from(slot % columns).unwrap_or(u8::MAX);
        Cell::new(page, row, col)
    }

    /// Insert a real tile at an explicit cell
    ///
    /// `CellOccupied` is retryable with a different cell; `OutOfBounds` is
    /// not.
    pub fn insert_tile_at(
        &mut self,
        cell: Cell,
        mut content: TileContent,
    ) -> Result<(), PlacementError> {
        if !self.layout.contains(cell) {
            return Err(PlacementError::OutOfBounds {
                cell,
                layout: self.layout,
            });
        }
        if self.occupied_cells().contains(&cell) {
            return Err(PlacementError::CellOccupied(cell));
        }
        content.position = Some(cell);
        self.tiles.push(Tile::Real(content));
        Ok(())
    }

    /// Place a tile at the first free cell, scanning pages in order and
    /// retrying past occupied slots
    pub fn place_tile(&mut self, content: TileContent) -> Cell {
        let mut occupied = self.occupied_cells();
        loop {
            let cell = self.layout.first_free_cell(&occupied);
            match self.insert_tile_at(cell, content.clone()) {
                Ok(()) => return cell,
                Err(_) => {
                    // Scan past the contested cell and try the next candidate.
                    occupied.insert(cell);
                }
            }
        }
    }
}
