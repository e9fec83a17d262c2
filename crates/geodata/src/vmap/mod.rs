// Visibility map (vmap) decoders: the static collision side of the engine.
//
// Three file families share the 8-byte "VMAP_006" magic: the per-map
// bounding interval hierarchy (tree), the per-grid-cell model spawn lists
// (tile) and the triangle mesh models the spawns reference by name.

pub mod model;
pub mod tile;
pub mod tree;

/// Magic tag shared by every vmap file
pub const VMAP_MAGIC: &[u8; 8] = b"VMAP_006";

pub use model::{ModelGroup, WorldModel, decode_model};
pub use tile::{CollisionTile, ModelSpawn, decode_tile};
pub use tree::{Axis, CollisionTree, TreeNode, decode_tree};
