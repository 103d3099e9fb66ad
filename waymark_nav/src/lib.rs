// waymark_nav — navigation mesh pathfinding.
//
// Converts a triangulated walkable-area polygon into a traversal graph and
// answers point-to-point shortest-path queries over it. An agent asks for a
// path from position A to position B inside a bounded, obstacle-punctured
// 2D region; the answer is a sequence of waypoint positions.
//
// Module overview:
// - `mesh.rs`:     NavMeshPolygon — triangles, unique edges, edge/triangle
//                  adjacency, point-in-triangle tests, ear-clipping
//                  triangulation with hole bridging, shape expansion.
// - `navgraph.rs`: NavGraph — doorway nodes at the midpoints of shared
//                  triangle edges, built over a `waymark_graph`
//                  WeightedGraph; owns its backing polygon.
// - `query.rs`:    find_path — triangle localization, clone-per-query graph
//                  augmentation, A* with a Chebyshev heuristic, waypoint
//                  extraction.
//
// The base NavGraph is built once per walkable region and is logically
// immutable afterwards; each query clones the graph, grafts temporary
// start/goal nodes onto the clone, searches it, and discards it. Because
// clones are independent and the polygon is shared read-only, concurrent
// queries against one base graph need no synchronization.
//
// Out of scope: funnel/string-pulling path smoothing, dynamic
// re-triangulation when obstacles move, multi-agent avoidance.

pub mod mesh;
pub mod navgraph;
pub mod query;
