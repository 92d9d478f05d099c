//! Tiles: the cells of a board grid
//!
//! Summary listings report tile counts with [`Tile::Virtual`] placeholders
//! that carry no payload; only [`Tile::Real`] tiles are usable content. The
//! discriminator is explicit both in the type and on the wire (a `kind`
//! tag), never inferred from null-like values.

use serde::{Deserialize, Serialize};

use crate::grid::Cell;
use crate::ids::BoardId;

/// A navigation link from a tile to another board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavLink {
    /// Board this tile navigates to
    pub target: BoardId,
    /// When set, the tile merely points at an independently-owned board and
    /// replication must not copy the target along with the parent
    #[serde(default)]
    pub shared_link: bool,
}

impl NavLink {
    /// A link whose target is copied along with the parent
    #[inline]
    #[must_use]
    pub fn to(target: impl Into<BoardId>) -> Self {
        Self {
            target: target.into(),
            shared_link: false,
        }
    }

    /// A link to an independently-owned board, never followed by replication
    #[inline]
    #[must_use]
    pub fn shared(target: impl Into<BoardId>) -> Self {
        Self {
            target: target.into(),
            shared_link: true,
        }
    }
}

/// Payload of a fully hydrated tile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileContent {
    /// Text spoken or displayed by the tile
    pub label: String,
    /// Image reference
    pub image: Option<String>,
    /// Audio reference
    pub sound: Option<String>,
    /// Background color, CSS-style
    pub background_color: Option<String>,
    /// Explicit grid position; tiles without one occupy cells in row-major
    /// index order
    pub position: Option<Cell>,
    /// Navigation link, for folder tiles
    pub nav: Option<NavLink>,
}

impl TileContent {
    /// A plain speaking tile with the given label
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            image: None,
            sound: None,
            background_color: None,
            position: None,
            nav: None,
        }
    }

    /// Attach a navigation link
    #[must_use]
    pub fn with_nav(mut self, nav: NavLink) -> Self {
        self.nav = Some(nav);
        self
    }

    /// Attach an image reference
    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Pin the tile to an explicit cell
    #[must_use]
    pub fn with_position(mut self, cell: Cell) -> Self {
        self.position = Some(cell);
        self
    }
}

/// One cell of a board grid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Tile {
    /// Placeholder from a summary view; no payload
    Virtual,
    /// Fully hydrated tile
    Real(TileContent),
}

impl Tile {
    /// Whether this tile carries real content
    #[inline]
    #[must_use]
    pub const fn is_real(&self) -> bool {
        matches!(self, Self::Real(_))
    }

    /// Whether this tile is a summary placeholder
    #[inline]
    #[must_use]
    pub const fn is_virtual(&self) -> bool {
        matches!(self, Self::Virtual)
    }

    /// Payload of a real tile
    #[inline]
    #[must_use]
    pub fn content(&self) -> Option<&TileContent> {
        match self {
            Self::Real(content) => Some(content),
            Self::Virtual => None,
        }
    }

    /// Mutable payload of a real tile
    #[inline]
    pub fn content_mut(&mut self) -> Option<&mut TileContent> {
        match self {
            Self::Real(content) => Some(content),
            Self::Virtual => None,
        }
    }

    /// Navigation link, for real tiles that link somewhere
    #[inline]
    #[must_use]
    pub fn nav(&self) -> Option<&NavLink> {
        self.content().and_then(|content| content.nav.as_ref())
    }

    /// Target replication must follow: set only for real, non-shared links
    #[inline]
    #[must_use]
    pub fn child_target(&self) -> Option<BoardId> {
        self.nav()
            .filter(|nav| !nav.shared_link)
            .map(|nav| nav.target)
    }
}
