// Move map (mmap) decoders: the navigation mesh side of the engine.
//
// One parameter file per map, one polygon mesh tile per grid cell. The
// tile files carry two independent magic/version pairs: the outer
// container written by the extractor and the embedded mesh format.

pub mod params;
pub mod tile;

/// Container magic ('MMAP')
pub const MMAP_MAGIC: u32 = 0x4d4d_4150;

/// Container format version
pub const MMAP_VERSION: u32 = 8;

/// Embedded mesh magic ('DNAV' on disk)
pub const NAVMESH_MAGIC: u32 = 0x5641_4e44;

/// Embedded mesh format version
pub const NAVMESH_VERSION: u32 = 7;

pub use params::{NavMeshParams, decode_params};
pub use tile::{
    DetailMesh, DetailRecord, DetailTriangle, EXTERNAL_LINK, MeshHeader, NavTile, NavTileOptions,
    Polygon, TileHeader, VERTS_PER_POLYGON, decode_tile,
};
