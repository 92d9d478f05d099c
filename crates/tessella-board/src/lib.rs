//! Tessella Board Model
//!
//! Boards, tiles, and grid layouts for the board replication engine.
//!
//! # Core Concepts
//!
//! - [`Board`]: A named grid of tiles; a node in the navigation graph
//! - [`Tile`]: Either real content or a virtual placeholder from summary
//!   listings
//! - [`BoardId`]: An identifier in the temporary or permanent space; only
//!   [`PermId`]s are fetchable
//! - [`Layout`]: Grid shape with first-fit cell placement
//!
//! # Example
//!
//! ```rust,ignore
//! use tessella_board::{Board, NavLink, PermId, Tile, TileContent};
//!
//! let home = Board::new("Home")
//!     .public()
//!     .with_tiles(vec![Tile::Real(
//!         TileContent::new("food").with_nav(NavLink::to(PermId::new(4))),
//!     )]);
//!
//! assert_eq!(home.child_targets().count(), 1);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod board;
pub mod grid;
pub mod ids;
pub mod tile;

// Re-exports for convenience
pub use board::{Board, OwnerRef};
pub use grid::{Cell, Layout, LayoutError, PlacementError, MAX_LAYOUT_DIM};
pub use ids::{BoardId, PermId, TempId};
pub use tile::{NavLink, Tile, TileContent};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[test]
    fn board_graph_edges_follow_nav_tiles() {
        let owner = OwnerRef::new("Ada", "ada@example.org");
        let source = Board::new("Home")
            .public()
            .with_layout(Layout::new(3, 4).unwrap())
            .with_tiles(vec![
                Tile::Real(TileContent::new("food").with_nav(NavLink::to(PermId::new(2)))),
                Tile::Real(TileContent::new("hello")),
                Tile::Virtual,
                Tile::Real(TileContent::new("help").with_nav(NavLink::shared(PermId::new(9)))),
            ]);

        // Shared links are reachable but not part of the copied graph.
        let children: Vec<_> = source.child_targets().collect();
        assert_eq!(children, vec![BoardId::Perm(PermId::new(2))]);

        let shell = source.replica_shell(TempId::new(), &owner);
        assert!(shell.id.is_temp());
        let replica = shell.into_persisted(PermId::new(40));
        assert_eq!(replica.id, BoardId::Perm(PermId::new(40)));
        assert_eq!(replica.tiles.len(), 3);
    }

    #[test]
    fn layout_round_trips_through_its_descriptor() {
        let layout = Layout::new(5, 8).unwrap();
        let descriptor = layout.to_string();
        assert_eq!(descriptor.parse::<Layout>().unwrap(), layout);
    }
}
