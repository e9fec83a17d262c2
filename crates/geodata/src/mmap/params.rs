// Navigation mesh parameter decoder
//
// The per-map .mmap equivalent: grid origin and tile dimensions followed
// by the mesh capacity limits the generator was run with.

use crate::error::DecodeError;
use crate::math::Vector3;
use crate::mmap::{MMAP_MAGIC, MMAP_VERSION};
use crate::util::ByteCursor;

#[derive(Debug, Clone, PartialEq)]
pub struct NavMeshParams {
    pub origin: Vector3,
    pub tile_width: f32,
    pub tile_height: f32,
    pub max_tiles: i32,
    pub max_polys: i32,
    pub offmesh_connection_count: u32,
}

pub fn decode_params(buffer: &[u8]) -> Result<NavMeshParams, DecodeError> {
    let mut cursor = ByteCursor::new(buffer);

    let magic = cursor.read_u32()?;
    if magic != MMAP_MAGIC {
        return Err(DecodeError::InvalidMagic {
            expected: format!("{MMAP_MAGIC:#010x}"),
            found: format!("{magic:#010x}"),
        });
    }

    let version = cursor.read_u32()?;
    if version != MMAP_VERSION {
        return Err(DecodeError::VersionMismatch {
            what: "navmesh params",
            expected: MMAP_VERSION,
            found: version,
        });
    }

    let origin = cursor.read_vector3()?;
    let tile_width = cursor.read_f32()?;
    let tile_height = cursor.read_f32()?;
    let max_tiles = cursor.read_i32()?;
    let max_polys = cursor.read_i32()?;
    let offmesh_connection_count = cursor.read_u32()?;

    Ok(NavMeshParams {
        origin,
        tile_width,
        tile_height,
        max_tiles,
        max_polys,
        offmesh_connection_count,
    })
}
