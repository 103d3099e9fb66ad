// waymark_graph — generic weighted graph + heuristic search.
//
// This crate contains the graph layer of the waymark navigation system:
// an indexed, optionally-undirected weighted graph container and an A*
// search engine that is generic over node and connection types. It knows
// nothing about navigation meshes — the companion crate `waymark_nav`
// specializes it with doorway nodes derived from triangulated walkable
// regions.
//
// Module overview:
// - `types.rs`:  Vec2 (2D position math) and the NodeIndex handle.
// - `graph.rs`:  WeightedGraph container, GraphNode/GraphConnection traits,
//                GraphError taxonomy.
// - `search.rs`: A* search with pluggable heuristic and configurable
//                per-hop penalty, plus the stock heuristic functions.
//
// **Critical constraint: determinism.** Search results are a pure function
// of graph contents and query endpoints. All query-visible state lives in
// `Vec`/`BTreeMap` for deterministic iteration order; f32 ordering goes
// through `total_cmp`. No `HashMap`, no randomness.

pub mod graph;
pub mod search;
pub mod types;
