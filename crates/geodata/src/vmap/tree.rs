// Collision tree decoder
//
// One bounding interval hierarchy per map. The node records are decoded
// structurally; geometric sanity of the split planes is a query-time
// concern, not a parse-time one.

use crate::config::EngineConfig;
use crate::error::DecodeError;
use crate::math::{Aabb, Vector3};
use crate::util::ByteCursor;
use crate::vmap::VMAP_MAGIC;

/// Tag preceding the node block
pub const NODE_TAG: &[u8; 4] = b"NODE";

/// Axis value marking a leaf node
const AXIS_LEAF: u32 = 3;

/// Encoded width of one node record
const NODE_RECORD_SIZE: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// One tree node, kept exactly as decoded. The format has no discriminant
/// field for leaves: a node is a leaf when both child indices are zero and
/// the axis carries the leaf marker. That ambiguity is part of the format
/// and is resolved by the derived accessors, never rewritten at parse time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeNode {
    pub child_lo: u32,
    pub child_hi: u32,
    pub split_lo: f32,
    pub split_hi: f32,
    pub axis: u32,
}

impl TreeNode {
    pub fn is_leaf(&self) -> bool {
        self.child_lo == 0 && self.child_hi == 0 && self.axis == AXIS_LEAF
    }

    /// Split axis of an internal node; `None` for the leaf marker or for
    /// an out-of-range axis value in a corrupt record
    pub fn split_axis(&self) -> Option<Axis> {
        match self.axis {
            0 => Some(Axis::X),
            1 => Some(Axis::Y),
            2 => Some(Axis::Z),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollisionTree {
    pub bounds: Aabb,
    pub nodes: Vec<TreeNode>,
}

pub fn decode_tree(buffer: &[u8], config: &EngineConfig) -> Result<CollisionTree, DecodeError> {
    let mut cursor = ByteCursor::new(buffer);
    cursor.read_tag(VMAP_MAGIC)?;
    cursor.read_tag(NODE_TAG)?;

    let min = cursor.read_vector3()?;
    let max = cursor.read_vector3()?;
    let bounds = Aabb { min, max };

    let node_count = cursor.read_u32()?;
    if node_count > config.max_tree_nodes {
        return Err(DecodeError::UnreasonableCount {
            what: "tree node count",
            count: node_count,
            ceiling: config.max_tree_nodes,
        });
    }
    cursor.require(node_count as usize * NODE_RECORD_SIZE)?;

    let mut nodes = Vec::with_capacity(node_count as usize);
    for _ in 0..node_count {
        nodes.push(TreeNode {
            child_lo: cursor.read_u32()?,
            child_hi: cursor.read_u32()?,
            split_lo: cursor.read_f32()?,
            split_hi: cursor.read_f32()?,
            axis: cursor.read_u32()?,
        });
    }

    Ok(CollisionTree { bounds, nodes })
}
