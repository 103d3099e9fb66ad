// Point-to-point path queries against a `NavGraph`.
//
// A query never mutates the base graph. It clones the doorway graph, grafts
// two temporary nodes (the agent's position and the destination) into the
// clone, then runs A* between them. The clone is dropped when the query
// returns, so any number of queries may run concurrently against the same
// shared `&NavGraph`.
//
// Two non-search outcomes short-circuit before the clone is taken:
// - either endpoint outside every triangle: empty path ("no path", not an
//   error),
// - both endpoints in the same triangle: the direct segment is free of
//   obstacles by construction, so the path is just the end position.
//
// Errors surface only for structural violations inside the graph itself
// (a dangling node index); "no route exists" is an empty `Vec`, matching
// the outside-region case so callers handle both the same way.

use crate::mesh::TriangleIndex;
use crate::navgraph::{NavConnection, NavGraph, NavNode};
use waymark_graph::graph::{GraphError, WeightedGraph};
use waymark_graph::search::{AStar, DEFAULT_HOP_PENALTY, Heuristic, heuristics};
use waymark_graph::types::{NodeIndex, Vec2};

impl NavGraph {
    /// Find a waypoint path from `start` to `end` with the default
    /// Chebyshev heuristic and hop penalty.
    ///
    /// Returns the position sequence from start to end, an empty `Vec` when
    /// no path exists or an endpoint is off the mesh, or an error if the
    /// graph itself is structurally broken.
    pub fn find_path(&self, start: Vec2, end: Vec2) -> Result<Vec<Vec2>, GraphError> {
        self.find_path_with(start, end, heuristics::chebyshev, DEFAULT_HOP_PENALTY)
    }

    /// `find_path` with an explicit heuristic and per-hop penalty. A zero
    /// penalty makes the search rank purely by geometric distance.
    pub fn find_path_with(
        &self,
        start: Vec2,
        end: Vec2,
        heuristic: Heuristic,
        hop_penalty: f32,
    ) -> Result<Vec<Vec2>, GraphError> {
        let polygon = self.polygon();

        // Single scan, stopping as soon as both endpoints are located.
        let mut start_triangle = None;
        let mut end_triangle = None;
        for i in 0..polygon.triangles().len() {
            let triangle = TriangleIndex(i as u32);
            if start_triangle.is_none() && polygon.triangle_contains(triangle, start) {
                start_triangle = Some(triangle);
            }
            if end_triangle.is_none() && polygon.triangle_contains(triangle, end) {
                end_triangle = Some(triangle);
            }
            if start_triangle.is_some() && end_triangle.is_some() {
                break;
            }
        }
        let (Some(start_triangle), Some(end_triangle)) = (start_triangle, end_triangle) else {
            return Ok(Vec::new());
        };

        if start_triangle == end_triangle {
            return Ok(vec![end]);
        }

        let mut graph = self.graph().clone();
        let start_index = graft_endpoint(&mut graph, self, start_triangle, start)?;
        let end_index = graft_endpoint(&mut graph, self, end_triangle, end)?;

        let pathfinder = AStar::with_hop_penalty(&graph, heuristic, hop_penalty);
        let Some(found) = pathfinder.find_path(start_index, end_index)? else {
            return Ok(Vec::new());
        };

        let mut path = Vec::with_capacity(found.nodes.len());
        for index in found.nodes {
            let node = graph
                .node(index)
                .ok_or(GraphError::NodeNotFound(index))?;
            path.push(node.position);
        }
        Ok(path)
    }
}

/// Insert a temporary node at `position` and connect it to every doorway of
/// `triangle`. Boundary edges of the triangle have no doorway and are
/// skipped.
fn graft_endpoint(
    graph: &mut WeightedGraph<NavNode, NavConnection>,
    base: &NavGraph,
    triangle: TriangleIndex,
    position: Vec2,
) -> Result<NodeIndex, GraphError> {
    let index = graph.next_free_index();
    graph.add_node(NavNode {
        index,
        position,
        source_edge: None,
    })?;

    let edges = base.polygon().triangles()[triangle.0 as usize].edges;
    for edge in edges {
        let Some(doorway) = base.node_index_from_edge(edge) else {
            continue;
        };
        let doorway_position = graph
            .node(doorway)
            .ok_or(GraphError::NodeNotFound(doorway))?
            .position;
        graph.add_connection(NavConnection::with_cost(
            doorway,
            index,
            position.distance(doorway_position),
        ))?;
    }
    Ok(index)
}
