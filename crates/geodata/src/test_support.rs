// Shared test fixtures: in-memory encoders for every file family the
// decoders read, written with the same byteorder primitives the real
// extractor uses.

use byteorder::{LittleEndian, WriteBytesExt};

use crate::GRID_SIZE;
use crate::math::{Aabb, Vector3};
use crate::mmap::{
    MMAP_MAGIC, MMAP_VERSION, MeshHeader, NAVMESH_MAGIC, NAVMESH_VERSION, NavMeshParams, NavTile,
    Polygon, TileHeader, VERTS_PER_POLYGON,
};
use crate::vmap::tree::NODE_TAG;
use crate::vmap::{CollisionTree, ModelGroup, ModelSpawn, VMAP_MAGIC, WorldModel};

fn write_vector3(buf: &mut Vec<u8>, v: Vector3) {
    buf.write_f32::<LittleEndian>(v.x).unwrap();
    buf.write_f32::<LittleEndian>(v.y).unwrap();
    buf.write_f32::<LittleEndian>(v.z).unwrap();
}

pub fn encode_tree(tree: &CollisionTree) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(VMAP_MAGIC);
    buf.extend_from_slice(NODE_TAG);
    write_vector3(&mut buf, tree.bounds.min);
    write_vector3(&mut buf, tree.bounds.max);
    buf.write_u32::<LittleEndian>(tree.nodes.len() as u32).unwrap();
    for node in &tree.nodes {
        buf.write_u32::<LittleEndian>(node.child_lo).unwrap();
        buf.write_u32::<LittleEndian>(node.child_hi).unwrap();
        buf.write_f32::<LittleEndian>(node.split_lo).unwrap();
        buf.write_f32::<LittleEndian>(node.split_hi).unwrap();
        buf.write_u32::<LittleEndian>(node.axis).unwrap();
    }
    buf
}

pub fn encode_spawn(buf: &mut Vec<u8>, spawn: &ModelSpawn) {
    buf.write_u32::<LittleEndian>(spawn.flags).unwrap();
    buf.write_u32::<LittleEndian>(spawn.id).unwrap();
    buf.write_u32::<LittleEndian>(spawn.name.len() as u32).unwrap();
    buf.extend_from_slice(spawn.name.as_bytes());
    write_vector3(buf, spawn.position);
    write_vector3(buf, spawn.rotation);
    buf.write_f32::<LittleEndian>(spawn.scale).unwrap();
    write_vector3(buf, spawn.bounds.min);
    write_vector3(buf, spawn.bounds.max);
}

pub fn encode_collision_tile(spawns: &[ModelSpawn]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(VMAP_MAGIC);
    buf.write_u32::<LittleEndian>(spawns.len() as u32).unwrap();
    for spawn in spawns {
        encode_spawn(&mut buf, spawn);
    }
    buf
}

pub fn encode_model(model: &WorldModel) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(VMAP_MAGIC);
    buf.extend_from_slice(b"WMOD");
    buf.write_u32::<LittleEndian>(8).unwrap();
    buf.write_u32::<LittleEndian>(model.root_id).unwrap();
    if model.groups.is_empty() {
        return buf;
    }
    buf.extend_from_slice(b"GMOD");
    buf.write_u32::<LittleEndian>(model.groups.len() as u32).unwrap();
    for group in &model.groups {
        write_vector3(&mut buf, group.bounds.min);
        write_vector3(&mut buf, group.bounds.max);
        buf.write_u32::<LittleEndian>(group.mogp_flags).unwrap();
        buf.write_u32::<LittleEndian>(group.group_id).unwrap();

        buf.extend_from_slice(b"VERT");
        buf.write_u32::<LittleEndian>(4 + group.vertices.len() as u32 * 12).unwrap();
        buf.write_u32::<LittleEndian>(group.vertices.len() as u32).unwrap();
        for v in &group.vertices {
            write_vector3(&mut buf, *v);
        }

        buf.extend_from_slice(b"TRIM");
        buf.write_u32::<LittleEndian>(4 + group.triangles.len() as u32 * 12).unwrap();
        buf.write_u32::<LittleEndian>(group.triangles.len() as u32).unwrap();
        for tri in &group.triangles {
            for &idx in tri {
                buf.write_u32::<LittleEndian>(idx).unwrap();
            }
        }
    }
    buf
}

/// Vertical square wall in the local Y-Z plane at x = 0, from -half to
/// +half on both axes. Blocks any segment crossing the local x = 0 plane
/// within that window.
pub fn wall_model(half: f32) -> WorldModel {
    let vertices = vec![
        Vector3::new(0.0, -half, -half),
        Vector3::new(0.0, half, -half),
        Vector3::new(0.0, half, half),
        Vector3::new(0.0, -half, half),
    ];
    let mut bounds = Aabb::from_point(vertices[0]);
    for v in &vertices[1..] {
        bounds.merge_point(*v);
    }
    WorldModel {
        root_id: 1,
        groups: vec![ModelGroup {
            bounds,
            mogp_flags: 0,
            group_id: 0,
            vertices,
            triangles: vec![[0, 1, 2], [0, 2, 3]],
        }],
    }
}

pub fn sample_params() -> NavMeshParams {
    NavMeshParams {
        origin: Vector3::new(-32.0 * GRID_SIZE, -32.0 * GRID_SIZE, 0.0),
        tile_width: GRID_SIZE,
        tile_height: GRID_SIZE,
        max_tiles: 4096,
        max_polys: 1 << 12,
        offmesh_connection_count: 0,
    }
}

pub fn encode_params(params: &NavMeshParams) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.write_u32::<LittleEndian>(MMAP_MAGIC).unwrap();
    buf.write_u32::<LittleEndian>(MMAP_VERSION).unwrap();
    write_vector3(&mut buf, params.origin);
    buf.write_f32::<LittleEndian>(params.tile_width).unwrap();
    buf.write_f32::<LittleEndian>(params.tile_height).unwrap();
    buf.write_i32::<LittleEndian>(params.max_tiles).unwrap();
    buf.write_i32::<LittleEndian>(params.max_polys).unwrap();
    buf.write_u32::<LittleEndian>(params.offmesh_connection_count).unwrap();
    buf
}

fn write_mesh_header(buf: &mut Vec<u8>, header: &MeshHeader) {
    buf.write_i32::<LittleEndian>(header.x).unwrap();
    buf.write_i32::<LittleEndian>(header.y).unwrap();
    buf.write_i32::<LittleEndian>(header.layer).unwrap();
    buf.write_u32::<LittleEndian>(header.user_id).unwrap();
    buf.write_i32::<LittleEndian>(header.poly_count).unwrap();
    buf.write_i32::<LittleEndian>(header.vert_count).unwrap();
    buf.write_i32::<LittleEndian>(header.max_link_count).unwrap();
    buf.write_i32::<LittleEndian>(header.detail_mesh_count).unwrap();
    buf.write_i32::<LittleEndian>(header.detail_vert_count).unwrap();
    buf.write_i32::<LittleEndian>(header.detail_tri_count).unwrap();
    buf.write_i32::<LittleEndian>(header.bv_node_count).unwrap();
    buf.write_i32::<LittleEndian>(header.off_mesh_con_count).unwrap();
    buf.write_i32::<LittleEndian>(header.off_mesh_base).unwrap();
    buf.write_f32::<LittleEndian>(header.walkable_height).unwrap();
    buf.write_f32::<LittleEndian>(header.walkable_radius).unwrap();
    buf.write_f32::<LittleEndian>(header.walkable_climb).unwrap();
    write_vector3(buf, header.bmin);
    write_vector3(buf, header.bmax);
    buf.write_f32::<LittleEndian>(header.bv_quant_factor).unwrap();
}

pub fn encode_nav_tile(tile: &NavTile) -> Vec<u8> {
    let mut mesh = Vec::new();
    mesh.write_u32::<LittleEndian>(NAVMESH_MAGIC).unwrap();
    mesh.write_u32::<LittleEndian>(NAVMESH_VERSION).unwrap();
    write_mesh_header(&mut mesh, &tile.header);
    for v in &tile.verts {
        write_vector3(&mut mesh, *v);
    }
    for poly in &tile.polys {
        mesh.write_u32::<LittleEndian>(poly.first_link).unwrap();
        for &v in &poly.vert_indices {
            mesh.write_u16::<LittleEndian>(v).unwrap();
        }
        for &n in &poly.neighbor_indices {
            mesh.write_u16::<LittleEndian>(n).unwrap();
        }
        mesh.write_u16::<LittleEndian>(poly.flags).unwrap();
        mesh.write_u8(poly.vert_count).unwrap();
        mesh.write_u8(poly.area_and_type).unwrap();
    }
    if let Some(detail) = &tile.detail {
        for record in &detail.meshes {
            mesh.write_u32::<LittleEndian>(record.vert_base).unwrap();
            mesh.write_u32::<LittleEndian>(record.tri_base).unwrap();
            mesh.write_u8(record.vert_count).unwrap();
            mesh.write_u8(record.tri_count).unwrap();
        }
        for v in &detail.verts {
            write_vector3(&mut mesh, *v);
        }
        for tri in &detail.tris {
            mesh.extend_from_slice(&tri.indices);
            mesh.push(tri.flags);
        }
    }

    let mut buf = Vec::new();
    buf.write_u32::<LittleEndian>(MMAP_MAGIC).unwrap();
    buf.write_u32::<LittleEndian>(NAVMESH_VERSION).unwrap();
    buf.write_u32::<LittleEndian>(MMAP_VERSION).unwrap();
    buf.write_u32::<LittleEndian>(mesh.len() as u32).unwrap();
    buf.write_u32::<LittleEndian>(u32::from(tile.container.uses_liquids)).unwrap();
    buf.extend_from_slice(&mesh);
    buf
}

/// Polygon with the given vertex slots and per-edge neighbor values;
/// ground area, walkable flags.
pub fn make_poly(indices: &[u16], neighbors: &[u16]) -> Polygon {
    let mut vert_indices = [0u16; VERTS_PER_POLYGON];
    let mut neighbor_indices = [0u16; VERTS_PER_POLYGON];
    vert_indices[..indices.len()].copy_from_slice(indices);
    neighbor_indices[..neighbors.len()].copy_from_slice(neighbors);
    Polygon {
        first_link: u32::MAX,
        vert_indices,
        neighbor_indices,
        flags: 1,
        vert_count: indices.len() as u8,
        area_and_type: 11,
    }
}

/// Navigation tile around the given geometry; header counts and bounds
/// are derived from the arrays.
pub fn make_nav_tile(x: i32, y: i32, verts: Vec<Vector3>, polys: Vec<Polygon>) -> NavTile {
    let mut bounds = verts
        .first()
        .map(|v| Aabb::from_point(*v))
        .unwrap_or_default();
    for v in &verts {
        bounds.merge_point(*v);
    }
    NavTile {
        x,
        y,
        container: TileHeader {
            byte_size: 0, // recomputed by encode_nav_tile
            uses_liquids: false,
        },
        header: MeshHeader {
            x,
            y,
            layer: 0,
            user_id: 0,
            poly_count: polys.len() as i32,
            vert_count: verts.len() as i32,
            max_link_count: 0,
            detail_mesh_count: 0,
            detail_vert_count: 0,
            detail_tri_count: 0,
            bv_node_count: 0,
            off_mesh_con_count: 0,
            off_mesh_base: 0,
            walkable_height: 2.0,
            walkable_radius: 0.6,
            walkable_climb: 1.0,
            bmin: bounds.min,
            bmax: bounds.max,
            bv_quant_factor: 1.0,
        },
        verts,
        polys,
        detail: None,
    }
}

/// Single square ground polygon spanning (0,0) to (10,10) at z = 0
pub fn one_poly_tile(x: i32, y: i32) -> NavTile {
    make_nav_tile(
        x,
        y,
        vec![
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(10.0, 0.0, 0.0),
            Vector3::new(10.0, 10.0, 0.0),
            Vector3::new(0.0, 10.0, 0.0),
        ],
        vec![make_poly(&[0, 1, 2, 3], &[0, 0, 0, 0])],
    )
}
