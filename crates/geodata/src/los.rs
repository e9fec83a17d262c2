// Line-of-sight engine
//
// Walks the collision grid tiles crossed by the query segment and tests it
// against every model spawned in those tiles. Tiles (or models) that were
// never supplied are gaps in the data, not walls: they are logged and
// treated as non-obstructing.

use serde::Serialize;
use tracing::debug;

use crate::math::{Mat3, Vector3, deg_to_rad, ray_triangle_intersect, segment_intersects_aabb};
use crate::store::GeometryStore;
use crate::vmap::ModelSpawn;
use crate::{GRID_SIZE, MAP_HALF_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LineOfSight {
    pub obstructed: bool,
    pub hit_point: Option<Vector3>,
}

impl LineOfSight {
    const CLEAR: LineOfSight = LineOfSight {
        obstructed: false,
        hit_point: None,
    };
}

pub fn check_line_of_sight(
    store: &GeometryStore,
    map_id: u32,
    start: Vector3,
    end: Vector3,
) -> LineOfSight {
    let dir = end - start;
    if dir.length() < f32::EPSILON {
        return LineOfSight::CLEAR;
    }

    // nearest hit across every crossed tile, parameterized over [0, 1]
    let mut nearest: Option<f32> = None;
    for (tile_x, tile_y) in tiles_crossed(start, end) {
        let tile = match store.tile(map_id, tile_x, tile_y) {
            Ok(tile) => tile,
            Err(_) => {
                debug!(map_id, tile_x, tile_y, "collision tile not loaded, treating as clear");
                continue;
            }
        };
        for spawn in &tile.spawns {
            if let Some(t) = test_spawn(store, map_id, spawn, start, dir) {
                nearest = Some(nearest.map_or(t, |n: f32| n.min(t)));
            }
        }
    }

    match nearest {
        Some(t) => LineOfSight {
            obstructed: true,
            hit_point: Some(start + dir * t),
        },
        None => LineOfSight::CLEAR,
    }
}

/// Grid tiles crossed by the segment, in traversal order from start to
/// end. Incremental traversal over the cell boundaries; the cell count is
/// bounded by the manhattan distance between the end cells.
fn tiles_crossed(start: Vector3, end: Vector3) -> Vec<(i32, i32)> {
    // grid space: one unit per tile, axes inverted relative to the world
    let u0 = (MAP_HALF_SIZE - start.x) / GRID_SIZE;
    let v0 = (MAP_HALF_SIZE - start.y) / GRID_SIZE;
    let u1 = (MAP_HALF_SIZE - end.x) / GRID_SIZE;
    let v1 = (MAP_HALF_SIZE - end.y) / GRID_SIZE;

    let mut cx = u0.floor() as i32;
    let mut cy = v0.floor() as i32;
    let target_x = u1.floor() as i32;
    let target_y = v1.floor() as i32;

    let du = u1 - u0;
    let dv = v1 - v0;
    let step_x: i32 = if du > 0.0 { 1 } else { -1 };
    let step_y: i32 = if dv > 0.0 { 1 } else { -1 };

    let t_delta_x = if du != 0.0 { (1.0 / du).abs() } else { f32::INFINITY };
    let t_delta_y = if dv != 0.0 { (1.0 / dv).abs() } else { f32::INFINITY };

    let next_boundary = |cell: i32, positive: bool| {
        if positive { cell as f32 + 1.0 } else { cell as f32 }
    };
    let mut t_max_x = if du != 0.0 {
        (next_boundary(cx, du > 0.0) - u0) / du
    } else {
        f32::INFINITY
    };
    let mut t_max_y = if dv != 0.0 {
        (next_boundary(cy, dv > 0.0) - v0) / dv
    } else {
        f32::INFINITY
    };

    let mut cells = vec![(cx, cy)];
    let max_steps = (target_x - cx).abs() + (target_y - cy).abs();
    for _ in 0..max_steps {
        if t_max_x < t_max_y {
            cx += step_x;
            t_max_x += t_delta_x;
        } else {
            cy += step_y;
            t_max_y += t_delta_y;
        }
        cells.push((cx, cy));
        if cx == target_x && cy == target_y {
            break;
        }
    }
    cells
}

/// Nearest intersection of the segment with one spawn's model mesh, or
/// `None` when it misses, the bounds pretest fails, or the model was
/// never loaded.
fn test_spawn(
    store: &GeometryStore,
    map_id: u32,
    spawn: &ModelSpawn,
    start: Vector3,
    dir: Vector3,
) -> Option<f32> {
    if !segment_intersects_aabb(start, dir, 1.0, &spawn.bounds) {
        return None;
    }

    let Some(model) = store.model(map_id, &spawn.name) else {
        debug!(map_id, name = %spawn.name, "spawn model not loaded, treating as clear");
        return None;
    };
    if spawn.scale.abs() < f32::EPSILON {
        return None;
    }

    // take the segment into model space; the transform is affine so the
    // segment parameter t carries over unchanged
    let rotation = Mat3::from_euler_zyx(
        deg_to_rad(spawn.rotation.y),
        deg_to_rad(spawn.rotation.x),
        deg_to_rad(spawn.rotation.z),
    );
    let inverse = rotation.transposed();
    let inv_scale = 1.0 / spawn.scale;
    let local_start = inverse.mul_vec3(start - spawn.position) * inv_scale;
    let local_dir = inverse.mul_vec3(dir) * inv_scale;

    let mut nearest: Option<f32> = None;
    for group in &model.groups {
        for tri in &group.triangles {
            let (Some(&v0), Some(&v1), Some(&v2)) = (
                group.vertices.get(tri[0] as usize),
                group.vertices.get(tri[1] as usize),
                group.vertices.get(tri[2] as usize),
            ) else {
                continue;
            };
            if let Some(t) = ray_triangle_intersect(local_start, local_dir, 1.0, v0, v1, v2) {
                nearest = Some(nearest.map_or(t, |n: f32| n.min(t)));
            }
        }
    }
    nearest
}
