// geodata - static collision (vmap) and navigation mesh (mmap) engine
//
// Decodes the binary geometry files produced by the map extractors and
// answers line-of-sight and pathfinding queries against them. Buffers are
// supplied by the caller; this crate never touches disk or network.

pub mod config;
pub mod error;
pub mod log;
pub mod los;
pub mod math;
pub mod mmap;
pub mod path;
pub mod store;
pub mod util;
pub mod vmap;

#[cfg(test)]
pub(crate) mod test_support;

/// Edge length of one collision grid tile in world units (one ADT tile)
pub const GRID_SIZE: f32 = 533.333_3;

/// Tiles per map side
pub const MAP_TILE_COUNT: i32 = 64;

/// World-space extent of half a map; the grid is centered on the origin
pub const MAP_HALF_SIZE: f32 = GRID_SIZE * 32.0;

/// Collision grid tile index for one world coordinate.
/// Tile indices grow opposite to the world axis, offset so that the
/// map center falls between tiles 31 and 32.
pub fn world_to_tile(coord: f32) -> i32 {
    ((MAP_HALF_SIZE - coord) / GRID_SIZE).floor() as i32
}
