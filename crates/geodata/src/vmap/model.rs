// World model decoder
//
// Triangle meshes referenced by model spawns. Chunked layout: WMOD root
// chunk, then an optional GMOD chunk holding the group list with VERT and
// TRIM sub-chunks. A model with no GMOD chunk has no geometry (doodad
// spawn points produce these) and is still a valid model.

use crate::config::EngineConfig;
use crate::error::DecodeError;
use crate::math::{Aabb, Vector3};
use crate::util::ByteCursor;
use crate::vmap::VMAP_MAGIC;

const ROOT_TAG: &[u8; 4] = b"WMOD";
const GROUP_LIST_TAG: &[u8; 4] = b"GMOD";
const VERTICES_TAG: &[u8; 4] = b"VERT";
const TRIANGLES_TAG: &[u8; 4] = b"TRIM";

#[derive(Debug, Clone, PartialEq)]
pub struct ModelGroup {
    pub bounds: Aabb,
    pub mogp_flags: u32,
    pub group_id: u32,
    pub vertices: Vec<Vector3>,
    /// Vertex index triples. Indices are not validated at decode time;
    /// query code skips triangles whose indices fall outside `vertices`.
    pub triangles: Vec<[u32; 3]>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorldModel {
    pub root_id: u32,
    pub groups: Vec<ModelGroup>,
}

pub fn decode_model(buffer: &[u8], config: &EngineConfig) -> Result<WorldModel, DecodeError> {
    let mut cursor = ByteCursor::new(buffer);
    cursor.read_tag(VMAP_MAGIC)?;

    cursor.read_tag(ROOT_TAG)?;
    let _chunk_size = cursor.read_u32()?;
    let root_id = cursor.read_u32()?;

    // geometry-free model
    if cursor.remaining() == 0 {
        return Ok(WorldModel {
            root_id,
            groups: Vec::new(),
        });
    }

    cursor.read_tag(GROUP_LIST_TAG)?;
    let group_count = cursor.read_u32()?;
    if group_count > config.max_group_count {
        return Err(DecodeError::UnreasonableCount {
            what: "model group count",
            count: group_count,
            ceiling: config.max_group_count,
        });
    }

    let mut groups = Vec::with_capacity(group_count as usize);
    for _ in 0..group_count {
        groups.push(read_group(&mut cursor, config)?);
    }

    Ok(WorldModel { root_id, groups })
}

fn read_group(cursor: &mut ByteCursor<'_>, config: &EngineConfig) -> Result<ModelGroup, DecodeError> {
    let bounds = Aabb {
        min: cursor.read_vector3()?,
        max: cursor.read_vector3()?,
    };
    let mogp_flags = cursor.read_u32()?;
    let group_id = cursor.read_u32()?;

    cursor.read_tag(VERTICES_TAG)?;
    let _chunk_size = cursor.read_u32()?;
    let vert_count = cursor.read_u32()?;
    if vert_count > config.max_model_verts {
        return Err(DecodeError::UnreasonableCount {
            what: "model vertex count",
            count: vert_count,
            ceiling: config.max_model_verts,
        });
    }
    cursor.require(vert_count as usize * 12)?;
    let mut vertices = Vec::with_capacity(vert_count as usize);
    for _ in 0..vert_count {
        vertices.push(cursor.read_vector3()?);
    }

    cursor.read_tag(TRIANGLES_TAG)?;
    let _chunk_size = cursor.read_u32()?;
    let tri_count = cursor.read_u32()?;
    if tri_count > config.max_model_verts {
        return Err(DecodeError::UnreasonableCount {
            what: "model triangle count",
            count: tri_count,
            ceiling: config.max_model_verts,
        });
    }
    cursor.require(tri_count as usize * 12)?;
    let mut triangles = Vec::with_capacity(tri_count as usize);
    for _ in 0..tri_count {
        let i0 = cursor.read_u32()?;
        let i1 = cursor.read_u32()?;
        let i2 = cursor.read_u32()?;
        triangles.push([i0, i1, i2]);
    }

    Ok(ModelGroup {
        bounds,
        mogp_flags,
        group_id,
        vertices,
        triangles,
    })
}
