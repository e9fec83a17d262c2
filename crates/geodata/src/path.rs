// Pathfinder
//
// Three stages over the loaded navigation tiles: locate the polygons
// containing (or nearest to) the endpoints, A* over polygon adjacency,
// then funnel simplification of the polygon corridor into a taut waypoint
// list. The whole query runs against the snapshot of tiles loaded at call
// time.
//
// Polygon winding is counter-clockwise in the XY plane; portal left/right
// assignment and the funnel tests rely on it.

use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;

use crate::error::PathError;
use crate::math::{Vector3, tri_area_2d};
use crate::mmap::{EXTERNAL_LINK, NavTile, Polygon, VERTS_PER_POLYGON};
use crate::store::GeometryStore;

/// Two portal endpoints are considered the same vertex within this range
const WELD_EPSILON: f32 = 0.01;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavPath {
    pub waypoints: Vec<Vector3>,
    pub cost: f32,
}

/// Degraded fallback for callers operating without navigation data: the
/// straight segment between the endpoints, no mesh consultation. This is
/// a separate operation; `find_path` never silently substitutes it.
pub fn straight_line_path(start: Vector3, end: Vector3) -> NavPath {
    NavPath {
        cost: start.distance(end),
        waypoints: vec![start, end],
    }
}

pub fn find_path(
    store: &GeometryStore,
    map_id: u32,
    start: Vector3,
    end: Vector3,
) -> Result<NavPath, PathError> {
    let config = store.config();
    let mesh = MeshView::new(store.nav_tiles_snapshot(map_id));

    let radius = config.polygon_search_radius;
    let start_poly = mesh
        .locate(start, radius, config.vertical_tolerance)
        .ok_or(PathError::NoPolygonNear {
            position: start,
            radius,
        })?;
    let end_poly = mesh
        .locate(end, radius, config.vertical_tolerance)
        .ok_or(PathError::NoPolygonNear {
            position: end,
            radius,
        })?;

    if start_poly == end_poly {
        return Ok(NavPath {
            cost: start.distance(end),
            waypoints: vec![start, end],
        });
    }

    let corridor = astar(&mesh, start_poly, end_poly, end, config.max_search_nodes)?;
    let waypoints = string_pull(&mesh, &corridor, start, end);
    let cost = waypoints
        .windows(2)
        .map(|pair| pair[0].distance(pair[1]))
        .sum();
    Ok(NavPath { waypoints, cost })
}

/// Polygon identity within one query's tile snapshot. Tile order is the
/// snapshot's (sorted by grid coordinate), so identities are stable across
/// identical snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct PolyId {
    tile: usize,
    poly: usize,
}

struct MeshView {
    tiles: Vec<Arc<NavTile>>,
    by_coord: HashMap<(i32, i32), usize>,
}

impl MeshView {
    fn new(tiles: Vec<Arc<NavTile>>) -> Self {
        let by_coord = tiles
            .iter()
            .enumerate()
            .map(|(idx, tile)| ((tile.x, tile.y), idx))
            .collect();
        MeshView { tiles, by_coord }
    }

    fn poly(&self, id: PolyId) -> &Polygon {
        &self.tiles[id.tile].polys[id.poly]
    }

    fn center(&self, id: PolyId) -> Vector3 {
        self.tiles[id.tile].poly_center(self.poly(id))
    }

    /// Vertices of one polygon, in winding order; `None` when the record
    /// is structurally unusable (bad count or dangling vertex index)
    fn poly_verts(&self, tile_idx: usize, poly: &Polygon) -> Option<Vec<Vector3>> {
        let count = poly.vert_count as usize;
        if !(3..=VERTS_PER_POLYGON).contains(&count) {
            return None;
        }
        let tile = &self.tiles[tile_idx];
        poly.vert_indices[..count]
            .iter()
            .map(|&vi| tile.verts.get(vi as usize).copied())
            .collect()
    }

    /// Containing polygon first (XY containment plus vertical tolerance
    /// against the polygon center), else the nearest polygon center within
    /// the search radius. Iteration order is fixed, so ties resolve to the
    /// lowest polygon identity.
    fn locate(&self, point: Vector3, radius: f32, vertical_tolerance: f32) -> Option<PolyId> {
        let mut nearest: Option<(f32, PolyId)> = None;
        for (tile_idx, tile) in self.tiles.iter().enumerate() {
            for (poly_idx, poly) in tile.polys.iter().enumerate() {
                if poly.is_off_mesh_connection() {
                    continue;
                }
                let Some(verts) = self.poly_verts(tile_idx, poly) else {
                    continue;
                };
                let id = PolyId {
                    tile: tile_idx,
                    poly: poly_idx,
                };
                let center = self.center(id);
                if point_in_poly_2d(point, &verts)
                    && (point.z - center.z).abs() <= vertical_tolerance
                {
                    return Some(id);
                }
                let distance = point.distance(center);
                if distance <= radius && nearest.is_none_or(|(best, _)| distance < best) {
                    nearest = Some((distance, id));
                }
            }
        }
        nearest.map(|(_, id)| id)
    }

    /// Traversable edges of one polygon: the neighbor polygon plus the
    /// portal endpoints (left, right) seen when crossing toward it
    fn neighbors(&self, id: PolyId) -> Vec<(PolyId, (Vector3, Vector3))> {
        let tile = &self.tiles[id.tile];
        let poly = self.poly(id);
        let count = poly.vert_count as usize;
        if !(3..=VERTS_PER_POLYGON).contains(&count) {
            return Vec::new();
        }

        let mut edges = Vec::new();
        for j in 0..count {
            let nei = poly.neighbor_indices[j];
            if nei == 0 {
                continue;
            }
            let (Some(&a), Some(&b)) = (
                tile.verts.get(poly.vert_indices[j] as usize),
                tile.verts.get(poly.vert_indices[(j + 1) % count] as usize),
            ) else {
                continue;
            };
            // CCW winding: crossing the edge a->b leaves b on the left
            let portal = (b, a);

            if nei & EXTERNAL_LINK != 0 {
                if let Some(other) = self.connect_external(id.tile, a, b) {
                    edges.push((other, portal));
                }
            } else {
                let poly_idx = (nei - 1) as usize;
                if poly_idx < tile.polys.len() {
                    edges.push((
                        PolyId {
                            tile: id.tile,
                            poly: poly_idx,
                        },
                        portal,
                    ));
                }
            }
        }
        edges
    }

    /// Resolve an external edge by matching its endpoints against the
    /// polygons of the four adjacent tiles
    fn connect_external(&self, tile_idx: usize, a: Vector3, b: Vector3) -> Option<PolyId> {
        let tile = &self.tiles[tile_idx];
        for (dx, dy) in [(-1, 0), (1, 0), (0, -1), (0, 1)] {
            let Some(&other_idx) = self.by_coord.get(&(tile.x + dx, tile.y + dy)) else {
                continue;
            };
            let other = &self.tiles[other_idx];
            for (poly_idx, poly) in other.polys.iter().enumerate() {
                if poly.is_off_mesh_connection() {
                    continue;
                }
                let count = poly.vert_count as usize;
                if !(3..=VERTS_PER_POLYGON).contains(&count) {
                    continue;
                }
                for j in 0..count {
                    let (Some(&c), Some(&d)) = (
                        other.verts.get(poly.vert_indices[j] as usize),
                        other.verts.get(poly.vert_indices[(j + 1) % count] as usize),
                    ) else {
                        continue;
                    };
                    let forward = welded(a, c) && welded(b, d);
                    let reverse = welded(a, d) && welded(b, c);
                    if forward || reverse {
                        return Some(PolyId {
                            tile: other_idx,
                            poly: poly_idx,
                        });
                    }
                }
            }
        }
        None
    }
}

fn welded(a: Vector3, b: Vector3) -> bool {
    (a - b).length() <= WELD_EPSILON
}

fn point_in_poly_2d(point: Vector3, verts: &[Vector3]) -> bool {
    let mut inside = false;
    let mut j = verts.len() - 1;
    for i in 0..verts.len() {
        let (vi, vj) = (verts[i], verts[j]);
        if (vi.y > point.y) != (vj.y > point.y)
            && point.x < (vj.x - vi.x) * (point.y - vi.y) / (vj.y - vi.y) + vi.x
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Open-set entry; the heap pops the lowest f first, ties broken by
/// polygon identity so repeated searches expand in the same order
#[derive(Debug)]
struct OpenNode {
    f: f32,
    id: PolyId,
}

impl PartialEq for OpenNode {
    fn eq(&self, other: &Self) -> bool {
        self.f == other.f && self.id == other.id
    }
}

impl Eq for OpenNode {}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.id.cmp(&self.id))
    }
}

/// A* over polygon adjacency; cost and heuristic are straight-line
/// distances between polygon centers. Returns the polygon corridor from
/// start to end inclusive.
fn astar(
    mesh: &MeshView,
    start: PolyId,
    end: PolyId,
    end_point: Vector3,
    max_search_nodes: u32,
) -> Result<Vec<PolyId>, PathError> {
    let mut open = BinaryHeap::new();
    let mut g_score: HashMap<PolyId, f32> = HashMap::new();
    let mut parent: HashMap<PolyId, PolyId> = HashMap::new();
    let mut closed: HashSet<PolyId> = HashSet::new();

    g_score.insert(start, 0.0);
    open.push(OpenNode {
        f: mesh.center(start).distance(end_point),
        id: start,
    });

    let mut expansions = 0u32;
    while let Some(OpenNode { id, .. }) = open.pop() {
        if id == end {
            let mut corridor = vec![id];
            let mut current = id;
            while let Some(&prev) = parent.get(&current) {
                corridor.push(prev);
                current = prev;
            }
            corridor.reverse();
            return Ok(corridor);
        }
        if !closed.insert(id) {
            continue;
        }

        expansions += 1;
        if expansions > max_search_nodes {
            return Err(PathError::SearchLimitExceeded {
                limit: max_search_nodes,
            });
        }

        let current_g = g_score[&id];
        let current_center = mesh.center(id);
        for (next, _) in mesh.neighbors(id) {
            if closed.contains(&next) {
                continue;
            }
            let next_center = mesh.center(next);
            let tentative = current_g + current_center.distance(next_center);
            if g_score.get(&next).is_none_or(|&g| tentative < g) {
                g_score.insert(next, tentative);
                parent.insert(next, id);
                open.push(OpenNode {
                    f: tentative + next_center.distance(end_point),
                    id: next,
                });
            }
        }
    }

    Err(PathError::NoPathFound)
}

/// Funnel simplification: pull the path taut against the portal edges
/// shared by consecutive corridor polygons
fn string_pull(mesh: &MeshView, corridor: &[PolyId], start: Vector3, end: Vector3) -> Vec<Vector3> {
    let mut portals = Vec::with_capacity(corridor.len());
    for pair in corridor.windows(2) {
        let portal = mesh
            .neighbors(pair[0])
            .into_iter()
            .find(|(next, _)| *next == pair[1])
            .map(|(_, portal)| portal);
        match portal {
            Some(portal) => portals.push(portal),
            // corridor edge vanished (corrupt adjacency); degrade to the
            // polygon center so the path stays connected
            None => {
                let center = mesh.center(pair[1]);
                portals.push((center, center));
            }
        }
    }
    portals.push((end, end));

    let mut waypoints = vec![start];
    let (mut apex, mut left, mut right) = (start, start, start);
    let (mut apex_i, mut left_i, mut right_i) = (0usize, 0usize, 0usize);

    let mut i = 0;
    while i < portals.len() {
        let (portal_left, portal_right) = portals[i];

        // tighten the right side
        if tri_area_2d(apex, right, portal_right) <= 0.0 {
            if welded(apex, right) || tri_area_2d(apex, left, portal_right) > 0.0 {
                right = portal_right;
                right_i = i;
            } else {
                // right swept past the left boundary: the left corner is
                // a waypoint; restart the funnel there
                waypoints.push(left);
                apex = left;
                apex_i = left_i;
                left = apex;
                right = apex;
                right_i = apex_i;
                i = apex_i + 1;
                continue;
            }
        }

        // tighten the left side
        if tri_area_2d(apex, left, portal_left) >= 0.0 {
            if welded(apex, left) || tri_area_2d(apex, right, portal_left) < 0.0 {
                left = portal_left;
                left_i = i;
            } else {
                waypoints.push(right);
                apex = right;
                apex_i = right_i;
                left = apex;
                right = apex;
                left_i = apex_i;
                i = apex_i + 1;
                continue;
            }
        }

        i += 1;
    }

    if waypoints.last().is_none_or(|&last| !welded(last, end)) {
        waypoints.push(end);
    }
    waypoints
}

#[cfg(test)]
mod tests {
    use crate::config::EngineConfig;
    use crate::mmap::NavTileOptions;
    use crate::test_support::{encode_nav_tile, make_nav_tile, make_poly, one_poly_tile};

    use super::*;

    fn load_tile(store: &GeometryStore, map_id: u32, tile: &NavTile) {
        store
            .load_nav_tile(map_id, tile.x, tile.y, &encode_nav_tile(tile), NavTileOptions::default())
            .unwrap();
    }

    /// Three squares forming an L: (0..10, 0..10), (10..20, 0..10),
    /// (10..20, 10..20), all CCW, linked through internal neighbors
    fn l_corridor_tile() -> NavTile {
        let verts = vec![
            Vector3::new(0.0, 0.0, 0.0),   // 0
            Vector3::new(10.0, 0.0, 0.0),  // 1
            Vector3::new(10.0, 10.0, 0.0), // 2
            Vector3::new(0.0, 10.0, 0.0),  // 3
            Vector3::new(20.0, 0.0, 0.0),  // 4
            Vector3::new(20.0, 10.0, 0.0), // 5
            Vector3::new(20.0, 20.0, 0.0), // 6
            Vector3::new(10.0, 20.0, 0.0), // 7
        ];
        let polys = vec![
            // edges: 0-1, 1-2 (-> poly 1), 2-3, 3-0
            make_poly(&[0, 1, 2, 3], &[0, 2, 0, 0]),
            // edges: 1-4, 4-5, 5-2 (-> poly 2), 2-1 (-> poly 0)
            make_poly(&[1, 4, 5, 2], &[0, 0, 3, 1]),
            // edges: 2-5 (-> poly 1), 5-6, 6-7, 7-2
            make_poly(&[2, 5, 6, 7], &[2, 0, 0, 0]),
        ];
        make_nav_tile(0, 0, verts, polys)
    }

    #[test]
    fn test_same_polygon_two_point_path() {
        let store = GeometryStore::new(EngineConfig::default());
        load_tile(&store, 0, &one_poly_tile(0, 0));

        let start = Vector3::new(2.0, 2.0, 0.0);
        let end = Vector3::new(8.0, 6.0, 0.0);
        let path = find_path(&store, 0, start, end).unwrap();
        assert_eq!(path.waypoints, vec![start, end]);
        assert!((path.cost - start.distance(end)).abs() < 1e-5);
    }

    #[test]
    fn test_no_polygon_near() {
        let store = GeometryStore::new(EngineConfig::default());
        load_tile(&store, 0, &one_poly_tile(0, 0));

        let far = Vector3::new(500.0, 500.0, 0.0);
        let err = find_path(&store, 0, far, Vector3::new(5.0, 5.0, 0.0)).unwrap_err();
        assert!(matches!(err, PathError::NoPolygonNear { .. }));
    }

    #[test]
    fn test_no_tiles_loaded_is_no_polygon_near() {
        let store = GeometryStore::new(EngineConfig::default());
        let err = find_path(
            &store,
            0,
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(5.0, 5.0, 0.0),
        )
        .unwrap_err();
        assert!(matches!(err, PathError::NoPolygonNear { .. }));
    }

    #[test]
    fn test_disconnected_islands_no_path() {
        // two squares with no adjacency between them
        let verts = vec![
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(10.0, 0.0, 0.0),
            Vector3::new(10.0, 10.0, 0.0),
            Vector3::new(0.0, 10.0, 0.0),
            Vector3::new(30.0, 0.0, 0.0),
            Vector3::new(40.0, 0.0, 0.0),
            Vector3::new(40.0, 10.0, 0.0),
            Vector3::new(30.0, 10.0, 0.0),
        ];
        let polys = vec![
            make_poly(&[0, 1, 2, 3], &[0, 0, 0, 0]),
            make_poly(&[4, 5, 6, 7], &[0, 0, 0, 0]),
        ];
        let store = GeometryStore::new(EngineConfig::default());
        load_tile(&store, 0, &make_nav_tile(0, 0, verts, polys));

        let err = find_path(
            &store,
            0,
            Vector3::new(5.0, 5.0, 0.0),
            Vector3::new(35.0, 5.0, 0.0),
        )
        .unwrap_err();
        assert_eq!(err, PathError::NoPathFound);
    }

    #[test]
    fn test_l_corridor_emits_inner_corner() {
        let store = GeometryStore::new(EngineConfig::default());
        load_tile(&store, 0, &l_corridor_tile());

        let start = Vector3::new(5.0, 5.0, 0.0);
        let end = Vector3::new(15.0, 15.0, 0.0);
        let path = find_path(&store, 0, start, end).unwrap();

        assert_eq!(path.waypoints.len(), 3, "{:?}", path.waypoints);
        assert_eq!(path.waypoints[0], start);
        let corner = path.waypoints[1];
        assert!((corner.x - 10.0).abs() < 1e-3 && (corner.y - 10.0).abs() < 1e-3);
        assert_eq!(*path.waypoints.last().unwrap(), end);
        assert!(path.cost + 1e-3 >= start.distance(end));
    }

    #[test]
    fn test_straight_corridor_stays_two_points() {
        let store = GeometryStore::new(EngineConfig::default());
        load_tile(&store, 0, &l_corridor_tile());

        let start = Vector3::new(5.0, 5.0, 0.0);
        let end = Vector3::new(15.0, 5.0, 0.0);
        let path = find_path(&store, 0, start, end).unwrap();
        assert_eq!(path.waypoints, vec![start, end]);
        assert!((path.cost - 10.0).abs() < 1e-5);
    }

    #[test]
    fn test_cross_tile_path_over_external_edge() {
        // square (0..10) in tile (0,0) whose east edge is external, and
        // square (10..20) in tile (1,0) whose west edge is external
        let west = make_nav_tile(
            0,
            0,
            vec![
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(10.0, 0.0, 0.0),
                Vector3::new(10.0, 10.0, 0.0),
                Vector3::new(0.0, 10.0, 0.0),
            ],
            vec![make_poly(&[0, 1, 2, 3], &[0, EXTERNAL_LINK, 0, 0])],
        );
        let east = make_nav_tile(
            1,
            0,
            vec![
                Vector3::new(10.0, 0.0, 0.0),
                Vector3::new(20.0, 0.0, 0.0),
                Vector3::new(20.0, 10.0, 0.0),
                Vector3::new(10.0, 10.0, 0.0),
            ],
            vec![make_poly(&[0, 1, 2, 3], &[0, 0, 0, EXTERNAL_LINK])],
        );

        let store = GeometryStore::new(EngineConfig::default());
        load_tile(&store, 0, &west);
        load_tile(&store, 0, &east);

        let start = Vector3::new(5.0, 5.0, 0.0);
        let end = Vector3::new(15.0, 5.0, 0.0);
        let path = find_path(&store, 0, start, end).unwrap();
        assert_eq!(path.waypoints, vec![start, end]);
    }

    #[test]
    fn test_search_limit_exceeded() {
        let store = GeometryStore::new(EngineConfig {
            max_search_nodes: 1,
            ..EngineConfig::default()
        });
        load_tile(&store, 0, &l_corridor_tile());

        let err = find_path(
            &store,
            0,
            Vector3::new(5.0, 5.0, 0.0),
            Vector3::new(15.0, 15.0, 0.0),
        )
        .unwrap_err();
        assert_eq!(err, PathError::SearchLimitExceeded { limit: 1 });
    }

    #[test]
    fn test_deterministic_repeat() {
        let store = GeometryStore::new(EngineConfig::default());
        load_tile(&store, 0, &l_corridor_tile());

        let start = Vector3::new(2.0, 8.0, 0.0);
        let end = Vector3::new(18.0, 18.0, 0.0);
        let first = find_path(&store, 0, start, end).unwrap();
        for _ in 0..5 {
            assert_eq!(find_path(&store, 0, start, end).unwrap(), first);
        }
    }

    #[test]
    fn test_straight_line_path_is_separate_operation() {
        let start = Vector3::new(0.0, 0.0, 0.0);
        let end = Vector3::new(3.0, 4.0, 0.0);
        let path = straight_line_path(start, end);
        assert_eq!(path.waypoints, vec![start, end]);
        assert!((path.cost - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_nearest_polygon_fallback_within_radius() {
        let store = GeometryStore::new(EngineConfig::default());
        load_tile(&store, 0, &one_poly_tile(0, 0));

        // just outside the square, well inside the search radius
        let start = Vector3::new(-2.0, 5.0, 0.0);
        let end = Vector3::new(8.0, 5.0, 0.0);
        let path = find_path(&store, 0, start, end).unwrap();
        assert_eq!(path.waypoints.first(), Some(&start));
        assert_eq!(path.waypoints.last(), Some(&end));
    }
}
