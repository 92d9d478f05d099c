//! Board identifier types
//!
//! Boards live in two identifier spaces that must never be confused:
//! - [`TempId`]: client-generated placeholder, valid only until the board is
//!   first persisted
//! - [`PermId`]: store-assigned, durable for the lifetime of the board
//!
//! [`BoardId`] is the union of the two, used wherever a reference may point
//! into either space (tile navigation targets, working-set keys). Store
//! operations take [`PermId`] directly, so a temporary identifier cannot be
//! asked of the store by construction.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Client-generated placeholder identifier for a not-yet-persisted board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TempId(pub Uuid);

impl TempId {
    /// Generate a fresh temporary ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TempId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TempId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tmp-{}", self.0)
    }
}

/// Store-assigned identifier, valid for the lifetime of the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PermId(pub u64);

impl PermId {
    /// Wrap a raw store-assigned value
    #[inline]
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw store-assigned value
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for PermId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl std::fmt::Display for PermId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A board reference in either identifier space
///
/// Serialized with an explicit `space` tag so the two spaces stay
/// distinguishable on the wire as well as in the type system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "space", content = "id", rename_all = "snake_case")]
pub enum BoardId {
    /// Not yet persisted; known only to the client that created it
    Temp(TempId),
    /// Durably persisted under a store-assigned identifier
    Perm(PermId),
}

impl BoardId {
    /// The permanent identifier, when this reference is in the permanent space
    #[inline]
    #[must_use]
    pub const fn as_perm(self) -> Option<PermId> {
        match self {
            Self::Perm(id) => Some(id),
            Self::Temp(_) => None,
        }
    }

    /// Whether this reference is in the permanent space
    #[inline]
    #[must_use]
    pub const fn is_perm(self) -> bool {
        matches!(self, Self::Perm(_))
    }

    /// Whether this reference is in the temporary space
    #[inline]
    #[must_use]
    pub const fn is_temp(self) -> bool {
        matches!(self, Self::Temp(_))
    }
}

impl From<TempId> for BoardId {
    fn from(id: TempId) -> Self {
        Self::Temp(id)
    }
}

impl From<PermId> for BoardId {
    fn from(id: PermId) -> Self {
        Self::Perm(id)
    }
}

impl std::fmt::Display for BoardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Temp(id) => write!(f, "{}", id),
            Self::Perm(id) => write!(f, "{}", id),
        }
    }
}
