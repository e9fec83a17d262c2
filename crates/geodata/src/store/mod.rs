// Geometry store
//
// Per-map aggregation of everything the decoders produce. The store owns
// all decoded records and hands out Arc snapshots; decoders never see the
// cache and queries never trigger decoding. One writer at a time per map;
// lookups and queries on other maps are never blocked.
//
// There is deliberately no process-wide instance: callers construct a
// store and pass it by reference, which keeps lifecycle explicit.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use rayon::prelude::*;
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::{DecodeError, SourceFile, StoreError};
use crate::math::Aabb;
use crate::mmap::{self, NavMeshParams, NavTile, NavTileOptions};
use crate::vmap::{self, CollisionTile, CollisionTree, WorldModel};

/// Tile cache entry. The access stamp is atomic so lookups can refresh it
/// while holding only the shared lock.
struct CachedTile<T> {
    record: Arc<T>,
    last_access: AtomicU64,
}

impl<T> CachedTile<T> {
    fn new(record: T, stamp: u64) -> Self {
        CachedTile {
            record: Arc::new(record),
            last_access: AtomicU64::new(stamp),
        }
    }

    fn touch(&self, stamp: u64) {
        self.last_access.store(stamp, Ordering::Relaxed);
    }
}

#[derive(Default)]
struct CollisionData {
    tree: Option<Arc<CollisionTree>>,
    tiles: HashMap<(i32, i32), CachedTile<CollisionTile>>,
    models: HashMap<String, Arc<WorldModel>>,
}

#[derive(Default)]
struct NavData {
    params: Option<Arc<NavMeshParams>>,
    tiles: HashMap<(i32, i32), CachedTile<NavTile>>,
}

#[derive(Default)]
struct MapGeometry {
    collision: RwLock<CollisionData>,
    nav: RwLock<NavData>,
}

pub struct GeometryStore {
    config: EngineConfig,
    clock: AtomicU64,
    maps: RwLock<HashMap<u32, Arc<MapGeometry>>>,
}

impl Default for GeometryStore {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl GeometryStore {
    pub fn new(config: EngineConfig) -> Self {
        GeometryStore {
            config,
            clock: AtomicU64::new(0),
            maps: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    /// Map entry, created empty on first access from a load path
    fn map_entry(&self, map_id: u32) -> Arc<MapGeometry> {
        if let Some(map) = self.maps.read().get(&map_id) {
            return map.clone();
        }
        self.maps.write().entry(map_id).or_default().clone()
    }

    fn map(&self, map_id: u32) -> Option<Arc<MapGeometry>> {
        self.maps.read().get(&map_id).cloned()
    }

    // ---- collision side ----

    pub fn load_tree(&self, map_id: u32, buffer: &[u8]) -> Result<(), StoreError> {
        let tree = vmap::decode_tree(buffer, &self.config)
            .map_err(|source| decode_error(map_id, "vmtree", None, source))?;
        let map = self.map_entry(map_id);
        map.collision.write().tree = Some(Arc::new(tree));
        debug!(map_id, "collision tree loaded");
        Ok(())
    }

    pub fn load_tile(
        &self,
        map_id: u32,
        tile_x: i32,
        tile_y: i32,
        buffer: &[u8],
    ) -> Result<(), StoreError> {
        let tile = vmap::decode_tile(buffer, tile_x, tile_y, &self.config)
            .map_err(|source| decode_error(map_id, "vmtile", Some((tile_x, tile_y)), source))?;
        let map = self.map_entry(map_id);
        let mut collision = map.collision.write();
        collision
            .tiles
            .insert((tile_x, tile_y), CachedTile::new(tile, self.tick()));
        evict_excess(&mut collision.tiles, self.config.max_loaded_tiles, map_id, "vmtile");
        Ok(())
    }

    /// Decode a batch of collision tiles in parallel, then insert them
    /// under one write lock. Results come back in input order.
    pub fn load_tiles(
        &self,
        map_id: u32,
        buffers: &[((i32, i32), &[u8])],
    ) -> Vec<Result<(), StoreError>> {
        let decoded: Vec<_> = buffers
            .par_iter()
            .map(|&((tile_x, tile_y), buffer)| {
                vmap::decode_tile(buffer, tile_x, tile_y, &self.config)
                    .map_err(|source| decode_error(map_id, "vmtile", Some((tile_x, tile_y)), source))
            })
            .collect();

        let map = self.map_entry(map_id);
        let mut collision = map.collision.write();
        let results = decoded
            .into_iter()
            .map(|decoded| {
                decoded.map(|tile| {
                    let key = (tile.tile_x, tile.tile_y);
                    collision.tiles.insert(key, CachedTile::new(tile, self.tick()));
                })
            })
            .collect();
        evict_excess(&mut collision.tiles, self.config.max_loaded_tiles, map_id, "vmtile");
        results
    }

    pub fn load_model(&self, map_id: u32, name: &str, buffer: &[u8]) -> Result<(), StoreError> {
        let model = vmap::decode_model(buffer, &self.config)
            .map_err(|source| decode_error(map_id, "vmo model", None, source))?;
        let map = self.map_entry(map_id);
        map.collision
            .write()
            .models
            .insert(name.to_string(), Arc::new(model));
        Ok(())
    }

    pub fn tree(&self, map_id: u32) -> Result<Arc<CollisionTree>, StoreError> {
        self.map(map_id)
            .and_then(|map| map.collision.read().tree.clone())
            .ok_or(StoreError::NotLoaded {
                map_id,
                what: "collision tree",
            })
    }

    pub fn tile(&self, map_id: u32, tile_x: i32, tile_y: i32) -> Result<Arc<CollisionTile>, StoreError> {
        let not_loaded = || StoreError::NotLoaded {
            map_id,
            what: "collision tile",
        };
        let map = self.map(map_id).ok_or_else(not_loaded)?;
        let collision = map.collision.read();
        let cached = collision.tiles.get(&(tile_x, tile_y)).ok_or_else(not_loaded)?;
        cached.touch(self.tick());
        Ok(cached.record.clone())
    }

    pub fn model(&self, map_id: u32, name: &str) -> Option<Arc<WorldModel>> {
        self.map(map_id)?.collision.read().models.get(name).cloned()
    }

    // ---- navigation side ----

    pub fn load_params(&self, map_id: u32, buffer: &[u8]) -> Result<(), StoreError> {
        let params = mmap::decode_params(buffer)
            .map_err(|source| decode_error(map_id, "mmap params", None, source))?;
        let map = self.map_entry(map_id);
        map.nav.write().params = Some(Arc::new(params));
        debug!(map_id, "navmesh params loaded");
        Ok(())
    }

    pub fn load_nav_tile(
        &self,
        map_id: u32,
        x: i32,
        y: i32,
        buffer: &[u8],
        options: NavTileOptions,
    ) -> Result<(), StoreError> {
        let tile = mmap::decode_tile(buffer, x, y, options, &self.config)
            .map_err(|source| decode_error(map_id, "mmtile", Some((x, y)), source))?;
        let map = self.map_entry(map_id);
        let mut nav = map.nav.write();
        nav.tiles.insert((x, y), CachedTile::new(tile, self.tick()));
        evict_excess(&mut nav.tiles, self.config.max_loaded_tiles, map_id, "mmtile");
        Ok(())
    }

    /// Navigation-side counterpart of `load_tiles`
    pub fn load_nav_tiles(
        &self,
        map_id: u32,
        buffers: &[((i32, i32), &[u8])],
        options: NavTileOptions,
    ) -> Vec<Result<(), StoreError>> {
        let decoded: Vec<_> = buffers
            .par_iter()
            .map(|&((x, y), buffer)| {
                mmap::decode_tile(buffer, x, y, options, &self.config)
                    .map_err(|source| decode_error(map_id, "mmtile", Some((x, y)), source))
            })
            .collect();

        let map = self.map_entry(map_id);
        let mut nav = map.nav.write();
        let results = decoded
            .into_iter()
            .map(|decoded| {
                decoded.map(|tile| {
                    let key = (tile.x, tile.y);
                    nav.tiles.insert(key, CachedTile::new(tile, self.tick()));
                })
            })
            .collect();
        evict_excess(&mut nav.tiles, self.config.max_loaded_tiles, map_id, "mmtile");
        results
    }

    pub fn params(&self, map_id: u32) -> Result<Arc<NavMeshParams>, StoreError> {
        self.map(map_id)
            .and_then(|map| map.nav.read().params.clone())
            .ok_or(StoreError::NotLoaded {
                map_id,
                what: "navmesh params",
            })
    }

    pub fn nav_tile(&self, map_id: u32, x: i32, y: i32) -> Result<Arc<NavTile>, StoreError> {
        let not_loaded = || StoreError::NotLoaded {
            map_id,
            what: "navigation tile",
        };
        let map = self.map(map_id).ok_or_else(not_loaded)?;
        let nav = map.nav.read();
        let cached = nav.tiles.get(&(x, y)).ok_or_else(not_loaded)?;
        cached.touch(self.tick());
        Ok(cached.record.clone())
    }

    /// All currently loaded navigation tiles of one map. Snapshot reads do
    /// not count as tile accesses for eviction.
    pub fn nav_tiles_snapshot(&self, map_id: u32) -> Vec<Arc<NavTile>> {
        let Some(map) = self.map(map_id) else {
            return Vec::new();
        };
        let nav = map.nav.read();
        let mut tiles: Vec<_> = nav.tiles.values().map(|c| c.record.clone()).collect();
        tiles.sort_by_key(|t| (t.x, t.y));
        tiles
    }

    /// Union of the tree bounds and every loaded collision tile's spawn
    /// bounds; recomputed on demand.
    pub fn aggregate_bounds(&self, map_id: u32) -> Result<Aabb, StoreError> {
        let not_loaded = || StoreError::NotLoaded {
            map_id,
            what: "collision geometry",
        };
        let map = self.map(map_id).ok_or_else(not_loaded)?;
        let collision = map.collision.read();

        let mut bounds: Option<Aabb> = collision.tree.as_ref().map(|t| t.bounds);
        for cached in collision.tiles.values() {
            for spawn in &cached.record.spawns {
                bounds = Some(match bounds {
                    Some(current) => current.union(spawn.bounds),
                    None => spawn.bounds,
                });
            }
        }
        bounds.ok_or_else(not_loaded)
    }
}

fn decode_error(
    map_id: u32,
    kind: &'static str,
    tile: Option<(i32, i32)>,
    source: DecodeError,
) -> StoreError {
    StoreError::Decode {
        file: SourceFile { map_id, kind, tile },
        source,
    }
}

/// Drop least-recently-accessed tiles until the map is back under its
/// ceiling. The caller holds the write lock; trees, params and models are
/// not subject to eviction.
fn evict_excess<T>(
    tiles: &mut HashMap<(i32, i32), CachedTile<T>>,
    max_tiles: usize,
    map_id: u32,
    kind: &str,
) {
    while tiles.len() > max_tiles {
        let oldest = tiles
            .iter()
            .min_by_key(|(key, cached)| (cached.last_access.load(Ordering::Relaxed), **key))
            .map(|(key, _)| *key);
        let Some(key) = oldest else {
            break;
        };
        tiles.remove(&key);
        debug!(map_id, kind, tile_x = key.0, tile_y = key.1, "evicted tile");
    }
}
