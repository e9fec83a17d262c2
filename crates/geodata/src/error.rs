// Error taxonomy for the geometry engine
//
// Decode errors are produced by the parsers in vmap/ and mmap/; the store
// wraps them with the identity of the originating file. Pathfinding errors
// are ordinary recoverable outcomes, not exceptional conditions.

use std::fmt;

use thiserror::Error;

use crate::math::Vector3;

/// Failure while decoding one binary buffer. Total over the input space:
/// every possible byte sequence maps to a record or to one of these.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    /// A read would cross the end of the buffer
    #[error("read past end of buffer: offset {offset}, needed {needed} bytes, {available} available")]
    OutOfBounds {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// Header tag mismatch: the buffer is not this format at all
    #[error("invalid magic: expected {expected:?}, found {found:?}")]
    InvalidMagic { expected: String, found: String },

    /// Right format, incompatible version
    #[error("{what} version mismatch: expected {expected}, found {found}")]
    VersionMismatch {
        what: &'static str,
        expected: u32,
        found: u32,
    },

    /// A count field exceeds its sanity ceiling; checked before allocation
    #[error("unreasonable {what}: {count} exceeds ceiling {ceiling}")]
    UnreasonableCount {
        what: &'static str,
        count: u32,
        ceiling: u32,
    },

    /// Declared tile size inconsistent with the buffer
    #[error("declared tile size {declared} inconsistent with buffer ({available} bytes remaining)")]
    InvalidTileSize { declared: u32, available: usize },
}

/// Identity of the file a decode error originated from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceFile {
    pub map_id: u32,
    pub kind: &'static str,
    pub tile: Option<(i32, i32)>,
}

impl fmt::Display for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tile {
            Some((x, y)) => write!(f, "map {} {} [{},{}]", self.map_id, self.kind, x, y),
            None => write!(f, "map {} {}", self.map_id, self.kind),
        }
    }
}

/// Failure at the geometry store boundary
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to decode {file}: {source}")]
    Decode {
        file: SourceFile,
        #[source]
        source: DecodeError,
    },

    /// Query against data the caller never supplied
    #[error("{what} not loaded for map {map_id}")]
    NotLoaded { map_id: u32, what: &'static str },
}

/// Pathfinding failure; expected control flow for callers
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PathError {
    #[error("no navigation polygon within {radius} units of ({}, {}, {})", .position.x, .position.y, .position.z)]
    NoPolygonNear { position: Vector3, radius: f32 },

    #[error("no path between start and end polygons")]
    NoPathFound,

    #[error("search limit of {limit} node expansions exceeded")]
    SearchLimitExceeded { limit: u32 },
}
