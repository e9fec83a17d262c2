// Collision tile decoder
//
// One spawn list per 64-unit grid cell. Spawn field order is part of the
// format contract; the tile coordinates come from the grid convention on
// the caller's side, not from the buffer.

use crate::config::EngineConfig;
use crate::error::DecodeError;
use crate::math::{Aabb, Vector3};
use crate::util::ByteCursor;
use crate::vmap::VMAP_MAGIC;

/// One model placed in the world. `rotation` is Euler degrees applied
/// Z, then Y, then X; `bounds` is the transformed world-space box the
/// extractor computed at assembly time.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSpawn {
    pub flags: u32,
    pub id: u32,
    pub name: String,
    pub position: Vector3,
    pub rotation: Vector3,
    pub scale: f32,
    pub bounds: Aabb,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollisionTile {
    pub tile_x: i32,
    pub tile_y: i32,
    pub spawns: Vec<ModelSpawn>,
}

pub fn decode_tile(
    buffer: &[u8],
    tile_x: i32,
    tile_y: i32,
    config: &EngineConfig,
) -> Result<CollisionTile, DecodeError> {
    let mut cursor = ByteCursor::new(buffer);
    cursor.read_tag(VMAP_MAGIC)?;

    let spawn_count = cursor.read_u32()?;
    if spawn_count > config.max_spawn_count {
        return Err(DecodeError::UnreasonableCount {
            what: "spawn count",
            count: spawn_count,
            ceiling: config.max_spawn_count,
        });
    }

    let mut spawns = Vec::with_capacity(spawn_count as usize);
    for _ in 0..spawn_count {
        spawns.push(read_spawn(&mut cursor, config)?);
    }

    Ok(CollisionTile {
        tile_x,
        tile_y,
        spawns,
    })
}

fn read_spawn(cursor: &mut ByteCursor<'_>, config: &EngineConfig) -> Result<ModelSpawn, DecodeError> {
    let flags = cursor.read_u32()?;
    let id = cursor.read_u32()?;

    let name_length = cursor.read_u32()?;
    if name_length > config.max_name_length {
        return Err(DecodeError::UnreasonableCount {
            what: "spawn name length",
            count: name_length,
            ceiling: config.max_name_length,
        });
    }
    let name = String::from_utf8_lossy(cursor.read_bytes(name_length as usize)?).into_owned();

    let position = cursor.read_vector3()?;
    let rotation = cursor.read_vector3()?;
    let scale = cursor.read_f32()?;
    let bounds = Aabb {
        min: cursor.read_vector3()?,
        max: cursor.read_vector3()?,
    };

    Ok(ModelSpawn {
        flags,
        id,
        name,
        position,
        rotation,
        scale,
        bounds,
    })
}
