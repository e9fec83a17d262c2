// Navigation tile decoder
//
// Outer container header, embedded mesh header, then vertex and polygon
// arrays in the fixed dtMeshHeader-compatible layout. Detail meshes are
// decoded only on request; skipping them costs no allocation.

use crate::config::EngineConfig;
use crate::error::DecodeError;
use crate::math::Vector3;
use crate::mmap::{MMAP_MAGIC, MMAP_VERSION, NAVMESH_MAGIC, NAVMESH_VERSION};
use crate::util::ByteCursor;

/// Vertex slots per polygon
pub const VERTS_PER_POLYGON: usize = 6;

/// Neighbor index flag marking an edge that crosses into an adjacent tile
pub const EXTERNAL_LINK: u16 = 0x8000;

/// Encoded widths
const POLYGON_RECORD_SIZE: usize = 32;
const DETAIL_RECORD_SIZE: usize = 10;
const VECTOR_SIZE: usize = 12;

/// Outer container header, written by the extractor around the mesh blob
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileHeader {
    pub byte_size: u32,
    pub uses_liquids: bool,
}

/// Embedded mesh header
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshHeader {
    pub x: i32,
    pub y: i32,
    pub layer: i32,
    pub user_id: u32,
    pub poly_count: i32,
    pub vert_count: i32,
    pub max_link_count: i32,
    pub detail_mesh_count: i32,
    pub detail_vert_count: i32,
    pub detail_tri_count: i32,
    pub bv_node_count: i32,
    pub off_mesh_con_count: i32,
    pub off_mesh_base: i32,
    pub walkable_height: f32,
    pub walkable_radius: f32,
    pub walkable_climb: f32,
    pub bmin: Vector3,
    pub bmax: Vector3,
    pub bv_quant_factor: f32,
}

/// One mesh polygon. `neighbor_indices[j]` describes the edge from vertex
/// slot j to j+1: zero is a border, `n` links to polygon `n-1` of the same
/// tile, and the EXTERNAL_LINK bit marks an edge into an adjacent tile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Polygon {
    pub first_link: u32,
    pub vert_indices: [u16; VERTS_PER_POLYGON],
    pub neighbor_indices: [u16; VERTS_PER_POLYGON],
    pub flags: u16,
    pub vert_count: u8,
    pub area_and_type: u8,
}

impl Polygon {
    pub fn area(&self) -> u8 {
        self.area_and_type & 0x3F
    }

    pub fn is_off_mesh_connection(&self) -> bool {
        (self.area_and_type >> 6) == 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetailTriangle {
    pub indices: [u8; 3],
    pub flags: u8,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetailRecord {
    pub vert_base: u32,
    pub tri_base: u32,
    pub vert_count: u8,
    pub tri_count: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetailMesh {
    pub meshes: Vec<DetailRecord>,
    pub verts: Vec<Vector3>,
    pub tris: Vec<DetailTriangle>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NavTile {
    pub x: i32,
    pub y: i32,
    pub container: TileHeader,
    pub header: MeshHeader,
    pub verts: Vec<Vector3>,
    pub polys: Vec<Polygon>,
    /// Present only when requested at decode time
    pub detail: Option<DetailMesh>,
}

impl NavTile {
    /// Centroid of one polygon, in mesh space
    pub fn poly_center(&self, poly: &Polygon) -> Vector3 {
        let mut center = Vector3::default();
        let count = (poly.vert_count as usize).min(VERTS_PER_POLYGON);
        if count == 0 {
            return center;
        }
        for &vi in &poly.vert_indices[..count] {
            if let Some(v) = self.verts.get(vi as usize) {
                center = center + *v;
            }
        }
        center * (1.0 / count as f32)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NavTileOptions {
    pub load_detail_meshes: bool,
}

pub fn decode_tile(
    buffer: &[u8],
    x: i32,
    y: i32,
    options: NavTileOptions,
    config: &EngineConfig,
) -> Result<NavTile, DecodeError> {
    let mut cursor = ByteCursor::new(buffer);

    // outer container
    let magic = cursor.read_u32()?;
    if magic != MMAP_MAGIC {
        return Err(DecodeError::InvalidMagic {
            expected: format!("{MMAP_MAGIC:#010x}"),
            found: format!("{magic:#010x}"),
        });
    }
    let navmesh_version = cursor.read_u32()?;
    if navmesh_version != NAVMESH_VERSION {
        return Err(DecodeError::VersionMismatch {
            what: "container navmesh",
            expected: NAVMESH_VERSION,
            found: navmesh_version,
        });
    }
    let container_version = cursor.read_u32()?;
    if container_version != MMAP_VERSION {
        return Err(DecodeError::VersionMismatch {
            what: "container",
            expected: MMAP_VERSION,
            found: container_version,
        });
    }

    let byte_size = cursor.read_u32()?;
    let uses_liquids = cursor.read_u32()? != 0;
    if byte_size as usize > cursor.remaining() || byte_size > config.max_tile_bytes {
        return Err(DecodeError::InvalidTileSize {
            declared: byte_size,
            available: cursor.remaining(),
        });
    }
    let container = TileHeader {
        byte_size,
        uses_liquids,
    };

    // embedded mesh
    let mesh_magic = cursor.read_u32()?;
    if mesh_magic != NAVMESH_MAGIC {
        return Err(DecodeError::InvalidMagic {
            expected: format!("{NAVMESH_MAGIC:#010x}"),
            found: format!("{mesh_magic:#010x}"),
        });
    }
    let mesh_version = cursor.read_u32()?;
    if mesh_version != NAVMESH_VERSION {
        return Err(DecodeError::VersionMismatch {
            what: "mesh",
            expected: NAVMESH_VERSION,
            found: mesh_version,
        });
    }

    let header = read_mesh_header(&mut cursor)?;
    check_count(header.vert_count, "nav vertex count", config)?;
    check_count(header.poly_count, "nav polygon count", config)?;
    check_count(header.detail_mesh_count, "detail mesh count", config)?;
    check_count(header.detail_vert_count, "detail vertex count", config)?;
    check_count(header.detail_tri_count, "detail triangle count", config)?;

    cursor.require(header.vert_count as usize * VECTOR_SIZE)?;
    let mut verts = Vec::with_capacity(header.vert_count as usize);
    for _ in 0..header.vert_count {
        verts.push(cursor.read_vector3()?);
    }

    cursor.require(header.poly_count as usize * POLYGON_RECORD_SIZE)?;
    let mut polys = Vec::with_capacity(header.poly_count as usize);
    for _ in 0..header.poly_count {
        polys.push(read_polygon(&mut cursor)?);
    }

    let detail_bytes = header.detail_mesh_count as usize * DETAIL_RECORD_SIZE
        + header.detail_vert_count as usize * VECTOR_SIZE
        + header.detail_tri_count as usize * 4;
    let detail = if options.load_detail_meshes {
        cursor.require(detail_bytes)?;
        Some(read_detail(&mut cursor, &header)?)
    } else {
        cursor.skip(detail_bytes)?;
        None
    };

    Ok(NavTile {
        x,
        y,
        container,
        header,
        verts,
        polys,
        detail,
    })
}

fn check_count(count: i32, what: &'static str, config: &EngineConfig) -> Result<(), DecodeError> {
    // negative counts wrap to huge values and fail the same ceiling
    let raw = count as u32;
    if raw > config.max_nav_elements {
        return Err(DecodeError::UnreasonableCount {
            what,
            count: raw,
            ceiling: config.max_nav_elements,
        });
    }
    Ok(())
}

fn read_mesh_header(cursor: &mut ByteCursor<'_>) -> Result<MeshHeader, DecodeError> {
    Ok(MeshHeader {
        x: cursor.read_i32()?,
        y: cursor.read_i32()?,
        layer: cursor.read_i32()?,
        user_id: cursor.read_u32()?,
        poly_count: cursor.read_i32()?,
        vert_count: cursor.read_i32()?,
        max_link_count: cursor.read_i32()?,
        detail_mesh_count: cursor.read_i32()?,
        detail_vert_count: cursor.read_i32()?,
        detail_tri_count: cursor.read_i32()?,
        bv_node_count: cursor.read_i32()?,
        off_mesh_con_count: cursor.read_i32()?,
        off_mesh_base: cursor.read_i32()?,
        walkable_height: cursor.read_f32()?,
        walkable_radius: cursor.read_f32()?,
        walkable_climb: cursor.read_f32()?,
        bmin: cursor.read_vector3()?,
        bmax: cursor.read_vector3()?,
        bv_quant_factor: cursor.read_f32()?,
    })
}

fn read_polygon(cursor: &mut ByteCursor<'_>) -> Result<Polygon, DecodeError> {
    let first_link = cursor.read_u32()?;
    let mut vert_indices = [0u16; VERTS_PER_POLYGON];
    for v in &mut vert_indices {
        *v = cursor.read_u16()?;
    }
    let mut neighbor_indices = [0u16; VERTS_PER_POLYGON];
    for n in &mut neighbor_indices {
        *n = cursor.read_u16()?;
    }
    let flags = cursor.read_u16()?;
    let vert_count = cursor.read_u8()?;
    let area_and_type = cursor.read_u8()?;

    Ok(Polygon {
        first_link,
        vert_indices,
        neighbor_indices,
        flags,
        vert_count,
        area_and_type,
    })
}

fn read_detail(cursor: &mut ByteCursor<'_>, header: &MeshHeader) -> Result<DetailMesh, DecodeError> {
    let mut meshes = Vec::with_capacity(header.detail_mesh_count as usize);
    for _ in 0..header.detail_mesh_count {
        meshes.push(DetailRecord {
            vert_base: cursor.read_u32()?,
            tri_base: cursor.read_u32()?,
            vert_count: cursor.read_u8()?,
            tri_count: cursor.read_u8()?,
        });
    }

    let mut verts = Vec::with_capacity(header.detail_vert_count as usize);
    for _ in 0..header.detail_vert_count {
        verts.push(cursor.read_vector3()?);
    }

    let mut tris = Vec::with_capacity(header.detail_tri_count as usize);
    for _ in 0..header.detail_tri_count {
        let bytes = cursor.read_bytes(4)?;
        tris.push(DetailTriangle {
            indices: [bytes[0], bytes[1], bytes[2]],
            flags: bytes[3],
        });
    }

    Ok(DetailMesh { meshes, verts, tris })
}
