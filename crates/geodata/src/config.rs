// Engine configuration
//
// All sanity ceilings and query limits in one place. The surrounding server
// deserializes this from its own configuration file; every field falls back
// to its default when absent.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Loaded-tile ceiling per map and kind before LRU eviction kicks in
    pub max_loaded_tiles: usize,

    /// Model spawn records allowed in one collision tile
    pub max_spawn_count: u32,

    /// Bytes allowed in one length-prefixed model name
    pub max_name_length: u32,

    /// Node records allowed in one collision tree
    pub max_tree_nodes: u32,

    /// Groups allowed in one world model
    pub max_group_count: u32,

    /// Vertices or triangles allowed in one world model group
    pub max_model_verts: u32,

    /// Declared navigation tile payload ceiling in bytes
    pub max_tile_bytes: u32,

    /// Vertices or polygons allowed in one navigation tile
    pub max_nav_elements: u32,

    /// A* node expansions before the search is abandoned
    pub max_search_nodes: u32,

    /// Horizontal radius searched when locating the polygon for a point
    pub polygon_search_radius: f32,

    /// Vertical slack allowed between a query point and a polygon surface
    pub vertical_tolerance: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_loaded_tiles: 256,
            max_spawn_count: 10_000,
            max_name_length: 500,
            max_tree_nodes: 10_000_000,
            max_group_count: 1_000,
            max_model_verts: 1_000_000,
            max_tile_bytes: 50 * 1024 * 1024,
            max_nav_elements: 1 << 20,
            max_search_nodes: 4096,
            polygon_search_radius: 10.0,
            vertical_tolerance: 5.0,
        }
    }
}
