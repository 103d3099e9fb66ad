// Navigation mesh polygon: triangles, edges, and adjacency.
//
// `NavMeshPolygon` is the geometric substrate of the navigation graph: a
// triangulated walkable region stored as welded points, a table of unique
// undirected edges, and triangles that reference their three bounding
// edges. Each edge back-references the triangles that border it, which is
// what the graph builder consults to find internal ("doorway") edges.
//
// Two construction paths exist. `from_triangles` accepts externally
// triangulated data and only welds/indexes it. `triangulate` runs the
// built-in ear-clipping triangulator: obstacle holes are first bridged into
// the outer contour (rightmost-vertex visibility bridge, the standard
// earcut approach), then ears are clipped off the resulting simple
// polygon. Bridge cuts run through walkable space, so the coincident bridge
// edges deliberately unify into ordinary shared edges — they are
// traversable portals like any other internal edge.
//
// All indices are plain integers into the polygon's own arrays; iteration
// order is construction order and therefore deterministic. The edge-dedup
// map (`FxHashMap`) is construction-internal only and never observable.
//
// See also: `navgraph.rs` for the graph built on top of this, `query.rs`
// for point localization during path queries.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use waymark_graph::types::Vec2;

/// Tolerance for geometric sign tests (point-in-triangle, convexity).
const GEOM_EPSILON: f32 = 1e-5;

/// Distance below which two points are welded into one.
const WELD_EPSILON: f32 = 1e-4;

/// Compact identifier for a mesh edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeIndex(pub u32);

/// Compact identifier for a mesh triangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TriangleIndex(pub u32);

/// A unique undirected edge between two point indices, with back-references
/// to the triangles that border it (1 for boundary edges, 2 for internal
/// edges shared by adjacent triangles).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MeshEdge {
    pub a: u32,
    pub b: u32,
    pub triangles: SmallVec<[TriangleIndex; 2]>,
}

/// A triangle: three point indices plus the indices of its bounding edges.
/// Edge k connects vertices k and (k + 1) % 3.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MeshTriangle {
    pub vertices: [u32; 3],
    pub edges: [EdgeIndex; 3],
}

/// Errors from mesh construction. All indicate unusable input geometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeshError {
    /// Contour has fewer than 3 vertices.
    TooFewVertices(usize),
    /// Contour (or a leftover sub-polygon during ear clipping) has no area.
    DegenerateContour,
    /// Construction produced no triangles at all.
    NoTriangles,
    /// A triangle referenced a point index outside the point list.
    VertexOutOfRange { triangle: usize, vertex: u32 },
}

impl fmt::Display for MeshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooFewVertices(n) => {
                write!(f, "contour needs at least 3 vertices, got {n}")
            }
            Self::DegenerateContour => write!(f, "contour has no usable area"),
            Self::NoTriangles => write!(f, "triangulation produced no triangles"),
            Self::VertexOutOfRange { triangle, vertex } => {
                write!(f, "triangle {triangle} references missing point {vertex}")
            }
        }
    }
}

impl std::error::Error for MeshError {}

/// A triangulated walkable region.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NavMeshPolygon {
    points: Vec<Vec2>,
    edges: Vec<MeshEdge>,
    triangles: Vec<MeshTriangle>,
}

impl NavMeshPolygon {
    /// Index externally triangulated data: weld coincident points, build the
    /// unique edge table, and record edge/triangle adjacency.
    ///
    /// Degenerate triangles (repeated vertex after welding, or near-zero
    /// area) are dropped. Fails if any index is out of range or nothing
    /// usable remains.
    pub fn from_triangles(
        points: Vec<Vec2>,
        triangles: &[[u32; 3]],
    ) -> Result<Self, MeshError> {
        for (ti, tri) in triangles.iter().enumerate() {
            for &v in tri {
                if v as usize >= points.len() {
                    return Err(MeshError::VertexOutOfRange {
                        triangle: ti,
                        vertex: v,
                    });
                }
            }
        }

        // Weld coincident points so coincident edges (e.g. either side of a
        // hole bridge, or seams in caller-supplied data) share indices and
        // unify in the edge table.
        let mut welded: Vec<Vec2> = Vec::with_capacity(points.len());
        let mut remap: Vec<u32> = Vec::with_capacity(points.len());
        for p in &points {
            match welded.iter().position(|q| q.distance(*p) <= WELD_EPSILON) {
                Some(existing) => remap.push(existing as u32),
                None => {
                    remap.push(welded.len() as u32);
                    welded.push(*p);
                }
            }
        }

        let mut mesh = Self {
            points: welded,
            edges: Vec::new(),
            triangles: Vec::new(),
        };
        let mut edge_lookup: FxHashMap<(u32, u32), EdgeIndex> = FxHashMap::default();

        for tri in triangles {
            let v = [
                remap[tri[0] as usize],
                remap[tri[1] as usize],
                remap[tri[2] as usize],
            ];
            if v[0] == v[1] || v[1] == v[2] || v[2] == v[0] {
                continue;
            }
            let area = signed_area_of(
                mesh.points[v[0] as usize],
                mesh.points[v[1] as usize],
                mesh.points[v[2] as usize],
            );
            if area.abs() <= GEOM_EPSILON {
                continue;
            }

            let t = TriangleIndex(mesh.triangles.len() as u32);
            let mut edges = [EdgeIndex(0); 3];
            for (k, (i, j)) in [(v[0], v[1]), (v[1], v[2]), (v[2], v[0])]
                .into_iter()
                .enumerate()
            {
                let key = if i < j { (i, j) } else { (j, i) };
                let edge = *edge_lookup.entry(key).or_insert_with(|| {
                    let edge = EdgeIndex(mesh.edges.len() as u32);
                    mesh.edges.push(MeshEdge {
                        a: key.0,
                        b: key.1,
                        triangles: SmallVec::new(),
                    });
                    edge
                });
                mesh.edges[edge.0 as usize].triangles.push(t);
                edges[k] = edge;
            }
            mesh.triangles.push(MeshTriangle { vertices: v, edges });
        }

        if mesh.triangles.is_empty() {
            return Err(MeshError::NoTriangles);
        }
        Ok(mesh)
    }

    /// Triangulate a contour with optional holes (ear clipping).
    ///
    /// The outer contour is normalized to counter-clockwise winding, holes
    /// to clockwise. Holes are bridged into the contour right-to-left; a
    /// hole whose bridge cannot be placed (entirely outside the contour) is
    /// skipped rather than failing the whole mesh.
    pub fn triangulate(contour: &[Vec2], holes: &[Vec<Vec2>]) -> Result<Self, MeshError> {
        if contour.len() < 3 {
            return Err(MeshError::TooFewVertices(contour.len()));
        }

        let mut outer_points = contour.to_vec();
        let area = signed_area(&outer_points);
        if area.abs() <= GEOM_EPSILON {
            return Err(MeshError::DegenerateContour);
        }
        if area < 0.0 {
            outer_points.reverse();
        }

        let mut points: Vec<Vec2> = Vec::new();
        let mut polygon: Vec<u32> = Vec::new();
        for p in outer_points {
            polygon.push(points.len() as u32);
            points.push(p);
        }

        let mut hole_loops: Vec<Vec<u32>> = Vec::new();
        for hole in holes {
            if hole.len() < 3 {
                continue;
            }
            let mut hole_points = hole.clone();
            if signed_area(&hole_points) > 0.0 {
                hole_points.reverse(); // holes wind clockwise
            }
            let mut indices = Vec::with_capacity(hole_points.len());
            for p in hole_points {
                indices.push(points.len() as u32);
                points.push(p);
            }
            hole_loops.push(indices);
        }

        // Bridge holes right-to-left so earlier bridges cannot occlude the
        // rightmost vertex of a later hole.
        hole_loops.sort_by(|a, b| {
            let ax = a
                .iter()
                .map(|&i| points[i as usize].x)
                .fold(f32::MIN, f32::max);
            let bx = b
                .iter()
                .map(|&i| points[i as usize].x)
                .fold(f32::MIN, f32::max);
            bx.total_cmp(&ax)
        });
        for hole in &hole_loops {
            bridge_hole(&mut polygon, hole, &points);
        }

        let triangles = ear_clip(polygon, &points)?;
        Self::from_triangles(points, &triangles)
    }

    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    pub fn edges(&self) -> &[MeshEdge] {
        &self.edges
    }

    pub fn triangles(&self) -> &[MeshTriangle] {
        &self.triangles
    }

    /// Midpoint of an edge — where the doorway node for a shared edge sits.
    pub fn edge_midpoint(&self, edge: EdgeIndex) -> Vec2 {
        let e = &self.edges[edge.0 as usize];
        self.points[e.a as usize].midpoint(self.points[e.b as usize])
    }

    /// The triangles bordering an edge: one for a boundary edge, two for an
    /// internal edge.
    pub fn triangles_sharing_edge(&self, edge: EdgeIndex) -> &[TriangleIndex] {
        &self.edges[edge.0 as usize].triangles
    }

    pub fn triangle_corners(&self, triangle: TriangleIndex) -> [Vec2; 3] {
        let t = &self.triangles[triangle.0 as usize];
        [
            self.points[t.vertices[0] as usize],
            self.points[t.vertices[1] as usize],
            self.points[t.vertices[2] as usize],
        ]
    }

    /// Boundary-inclusive containment test for one triangle.
    pub fn triangle_contains(&self, triangle: TriangleIndex, p: Vec2) -> bool {
        let [a, b, c] = self.triangle_corners(triangle);
        point_in_triangle(p, a, b, c)
    }

    /// Linear scan for the triangle containing a point. Points on a shared
    /// edge belong to whichever bordering triangle comes first.
    pub fn triangle_containing(&self, p: Vec2) -> Option<TriangleIndex> {
        (0..self.triangles.len())
            .map(|i| TriangleIndex(i as u32))
            .find(|&t| self.triangle_contains(t, p))
    }
}

/// Boundary-inclusive point-in-triangle test, tolerant of either winding.
pub fn point_in_triangle(p: Vec2, a: Vec2, b: Vec2, c: Vec2) -> bool {
    let d1 = (b - a).cross(p - a);
    let d2 = (c - b).cross(p - b);
    let d3 = (a - c).cross(p - c);
    let has_neg = d1 < -GEOM_EPSILON || d2 < -GEOM_EPSILON || d3 < -GEOM_EPSILON;
    let has_pos = d1 > GEOM_EPSILON || d2 > GEOM_EPSILON || d3 > GEOM_EPSILON;
    !(has_neg && has_pos)
}

/// Expand a convex obstacle shape outward: each vertex moves away from the
/// shape's centroid by `radius`. Keeps an agent-radius safety margin around
/// obstacles when they are subtracted from the walkable region.
///
/// The push is radial, so the margin is exactly `radius` at vertices but
/// shrinks toward edge midpoints (for a corner half-angle of theta the
/// midpoint clearance is `radius * cos(theta)`, e.g. `radius / sqrt(2)` on
/// a square). Callers needing a hard guarantee along edges should scale
/// `radius` up accordingly.
pub fn expand_shape(shape: &[Vec2], radius: f32) -> Vec<Vec2> {
    if shape.is_empty() {
        return Vec::new();
    }
    let centroid = shape.iter().fold(Vec2::ZERO, |acc, &p| acc + p) / shape.len() as f32;
    shape
        .iter()
        .map(|&v| v + (v - centroid).normalized() * radius)
        .collect()
}

/// Signed area of a polygon (shoelace). Positive for counter-clockwise.
fn signed_area(points: &[Vec2]) -> f32 {
    let mut sum = 0.0;
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        sum += a.cross(b);
    }
    sum * 0.5
}

/// Signed area of one triangle.
fn signed_area_of(a: Vec2, b: Vec2, c: Vec2) -> f32 {
    (b - a).cross(c - a) * 0.5
}

/// Splice a hole loop into the outer polygon with a bridge at a mutually
/// visible vertex pair (rightmost hole vertex, +x visibility ray).
fn bridge_hole(outer: &mut Vec<u32>, hole: &[u32], points: &[Vec2]) {
    // Rightmost hole vertex.
    let Some(mi) = (0..hole.len()).max_by(|&i, &j| {
        points[hole[i] as usize]
            .x
            .total_cmp(&points[hole[j] as usize].x)
    }) else {
        return;
    };
    let m = points[hole[mi] as usize];

    // Nearest intersection of the +x ray from m with an outer edge.
    let n = outer.len();
    let mut best: Option<(f32, usize)> = None;
    for i in 0..n {
        let a = points[outer[i] as usize];
        let b = points[outer[(i + 1) % n] as usize];
        if (a.y > m.y) == (b.y > m.y) {
            continue; // edge does not straddle the ray's y
        }
        let t = (m.y - a.y) / (b.y - a.y);
        let ix = a.x + t * (b.x - a.x);
        if ix < m.x - GEOM_EPSILON {
            continue;
        }
        if best.is_none_or(|(bx, _)| ix < bx) {
            best = Some((ix, i));
        }
    }
    let Some((ix, edge_start)) = best else {
        return; // hole lies outside the contour; skip it
    };

    // Candidate bridge vertex: the intersected edge's endpoint on the far
    // side of the ray. If another outer vertex occludes the bridge triangle,
    // take the occluder with the smallest angle off the ray instead.
    let a_pos = edge_start;
    let b_pos = (edge_start + 1) % n;
    let mut chosen = if points[outer[a_pos] as usize].x > points[outer[b_pos] as usize].x {
        a_pos
    } else {
        b_pos
    };
    let ray_hit = Vec2::new(ix, m.y);
    let candidate = points[outer[chosen] as usize];
    let mut best_slope = f32::INFINITY;
    for i in 0..n {
        if i == chosen {
            continue;
        }
        let v = points[outer[i] as usize];
        if !point_in_triangle(v, m, ray_hit, candidate) {
            continue;
        }
        let dx = v.x - m.x;
        if dx <= GEOM_EPSILON {
            continue;
        }
        let slope = (v.y - m.y).abs() / dx;
        if slope < best_slope {
            best_slope = slope;
            chosen = i;
        }
    }

    // Splice: outer up to the bridge vertex, the whole hole loop starting
    // and ending at m, then back to the bridge vertex and the rest of the
    // outer ring. Indices are reused, so both sides of the bridge share
    // point indices and the cut unifies into shared edges.
    let mut spliced = Vec::with_capacity(outer.len() + hole.len() + 2);
    spliced.extend_from_slice(&outer[..=chosen]);
    for k in 0..=hole.len() {
        spliced.push(hole[(mi + k) % hole.len()]);
    }
    spliced.push(outer[chosen]);
    spliced.extend_from_slice(&outer[chosen + 1..]);
    *outer = spliced;
}

/// Ear-clipping triangulation of a counter-clockwise simple polygon
/// (possibly with bridge-duplicated vertices).
fn ear_clip(mut polygon: Vec<u32>, points: &[Vec2]) -> Result<Vec<[u32; 3]>, MeshError> {
    let mut triangles = Vec::new();

    while polygon.len() > 3 {
        if !clip_one_ear(&mut polygon, points, &mut triangles) {
            return Err(MeshError::DegenerateContour);
        }
    }
    if polygon.len() == 3 {
        triangles.push([polygon[0], polygon[1], polygon[2]]);
    }
    if triangles.is_empty() {
        return Err(MeshError::NoTriangles);
    }
    Ok(triangles)
}

/// Find and remove one ear. Returns false if no ear exists (degenerate or
/// self-intersecting input).
fn clip_one_ear(polygon: &mut Vec<u32>, points: &[Vec2], out: &mut Vec<[u32; 3]>) -> bool {
    let n = polygon.len();
    for i in 0..n {
        let prev = polygon[(i + n - 1) % n];
        let cur = polygon[i];
        let next = polygon[(i + 1) % n];
        let (a, b, c) = (
            points[prev as usize],
            points[cur as usize],
            points[next as usize],
        );

        // Convex corner of a CCW polygon.
        if (b - a).cross(c - b) <= GEOM_EPSILON {
            continue;
        }
        if ear_is_blocked(polygon, points, a, b, c) {
            continue;
        }

        out.push([prev, cur, next]);
        polygon.remove(i);
        return true;
    }
    false
}

/// True if any polygon vertex lies inside or on the boundary of the
/// candidate ear. Boundary counts: a reflex vertex sitting exactly on the
/// ear's diagonal would make the clipped triangle cross the contour.
/// Vertices coinciding with an ear corner (bridge duplicates) don't block.
fn ear_is_blocked(polygon: &[u32], points: &[Vec2], a: Vec2, b: Vec2, c: Vec2) -> bool {
    polygon.iter().any(|&idx| {
        let v = points[idx as usize];
        if v.distance(a) <= WELD_EPSILON
            || v.distance(b) <= WELD_EPSILON
            || v.distance(c) <= WELD_EPSILON
        {
            return false;
        }
        point_in_triangle(v, a, b, c)
    })
}
