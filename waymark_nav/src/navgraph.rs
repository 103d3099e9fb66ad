// Navigation graph: doorway nodes over a triangulated walkable region.
//
// `NavGraph` specializes the generic `WeightedGraph` with `NavNode`s placed
// at the midpoints of internal triangle edges — edges shared by two
// triangles, i.e. the "doorways" an agent crosses when moving between
// adjacent triangles. Boundary edges (outer contour, hole rims) produce no
// node; they are walls, not portals.
//
// Construction:
// 1. Expand each obstacle shape by the agent radius and punch it out of the
//    contour, then triangulate (`mesh.rs`).
// 2. One node per edge shared by more than one triangle, tagged with the
//    source edge index.
// 3. Per triangle, connect its doorway nodes: 2 doorways make one
//    connection, 3 make a 3-cycle, fewer make none.
// 4. Overwrite all connection costs with Euclidean distance between the
//    doorway midpoints.
//
// The graph owns its backing polygon behind an `Arc`: clones used for
// query augmentation share the immutable geometry instead of
// re-triangulating, while graph data is deep-copied so a clone can be
// mutated freely.
//
// See also: `query.rs` for the clone-and-graft path query built on this.

use crate::mesh::{EdgeIndex, MeshError, NavMeshPolygon, expand_shape};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;
use waymark_graph::graph::{GraphConnection, GraphError, GraphNode, WeightedGraph};
use waymark_graph::types::{NodeIndex, Vec2};

/// A navigation node: a doorway at the midpoint of a shared triangle edge,
/// or a temporary query node (`source_edge` = `None`) grafted at an agent's
/// position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NavNode {
    pub index: NodeIndex,
    pub position: Vec2,
    /// The mesh edge this node sits on, or `None` for synthetic query nodes.
    pub source_edge: Option<EdgeIndex>,
}

impl GraphNode for NavNode {
    fn index(&self) -> NodeIndex {
        self.index
    }
    fn position(&self) -> Vec2 {
        self.position
    }
}

/// A weighted link between two navigation nodes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NavConnection {
    pub from: NodeIndex,
    pub to: NodeIndex,
    pub cost: f32,
}

impl NavConnection {
    /// Connection with a placeholder cost, to be overwritten by the bulk
    /// distance pass.
    pub fn new(from: NodeIndex, to: NodeIndex) -> Self {
        Self {
            from,
            to,
            cost: 0.0,
        }
    }

    pub fn with_cost(from: NodeIndex, to: NodeIndex, cost: f32) -> Self {
        Self { from, to, cost }
    }
}

impl GraphConnection for NavConnection {
    fn source(&self) -> NodeIndex {
        self.from
    }
    fn target(&self) -> NodeIndex {
        self.to
    }
    fn cost(&self) -> f32 {
        self.cost
    }
    fn set_cost(&mut self, cost: f32) {
        self.cost = cost;
    }
}

/// Errors from navigation graph construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildError {
    Mesh(MeshError),
    Graph(GraphError),
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mesh(e) => write!(f, "mesh construction failed: {e}"),
            Self::Graph(e) => write!(f, "graph construction failed: {e}"),
        }
    }
}

impl std::error::Error for BuildError {}

impl From<MeshError> for BuildError {
    fn from(e: MeshError) -> Self {
        Self::Mesh(e)
    }
}

impl From<GraphError> for BuildError {
    fn from(e: GraphError) -> Self {
        Self::Graph(e)
    }
}

/// The navigation graph for one walkable region.
///
/// Built once when the region is established; logically immutable
/// afterwards. Queries clone it (`query.rs`) rather than mutating it, so a
/// shared `&NavGraph` is safe to query from multiple threads.
#[derive(Clone, Debug)]
pub struct NavGraph {
    graph: WeightedGraph<NavNode, NavConnection>,
    polygon: Arc<NavMeshPolygon>,
}

impl NavGraph {
    /// Build the walkable region (contour minus obstacle shapes, each
    /// expanded by `agent_radius`), triangulate it, and derive the doorway
    /// graph.
    pub fn build(
        contour: &[Vec2],
        obstacles: &[Vec<Vec2>],
        agent_radius: f32,
    ) -> Result<Self, BuildError> {
        let holes: Vec<Vec<Vec2>> = obstacles
            .iter()
            .map(|shape| expand_shape(shape, agent_radius))
            .collect();
        let polygon = NavMeshPolygon::triangulate(contour, &holes)?;
        Self::from_polygon(polygon)
    }

    /// Derive the doorway graph over an already-triangulated polygon.
    pub fn from_polygon(polygon: NavMeshPolygon) -> Result<Self, BuildError> {
        let mut graph: WeightedGraph<NavNode, NavConnection> = WeightedGraph::new(false);

        // One node per internal edge, at its midpoint.
        for edge_index in 0..polygon.edges().len() {
            let edge = EdgeIndex(edge_index as u32);
            if polygon.triangles_sharing_edge(edge).len() > 1 {
                graph.add_node(NavNode {
                    index: graph.next_free_index(),
                    position: polygon.edge_midpoint(edge),
                    source_edge: Some(edge),
                })?;
            }
        }

        // Connect doorways through each triangle.
        for triangle in polygon.triangles() {
            let mut doorways: SmallVec<[NodeIndex; 3]> = SmallVec::new();
            for &edge in &triangle.edges {
                if let Some(node) = doorway_for_edge(&graph, edge) {
                    doorways.push(node);
                }
            }
            match doorways.len() {
                2 => {
                    graph.add_connection(NavConnection::new(doorways[0], doorways[1]))?;
                }
                3 => {
                    graph.add_connection(NavConnection::new(doorways[0], doorways[1]))?;
                    graph.add_connection(NavConnection::new(doorways[1], doorways[2]))?;
                    graph.add_connection(NavConnection::new(doorways[2], doorways[0]))?;
                }
                _ => {}
            }
        }

        graph.set_all_connection_costs_to_distance();

        Ok(Self {
            graph,
            polygon: Arc::new(polygon),
        })
    }

    /// The doorway node created for a mesh edge, if that edge is internal.
    /// Linear scan; fine at navmesh scale (hundreds of nodes).
    pub fn node_index_from_edge(&self, edge: EdgeIndex) -> Option<NodeIndex> {
        doorway_for_edge(&self.graph, edge)
    }

    pub fn graph(&self) -> &WeightedGraph<NavNode, NavConnection> {
        &self.graph
    }

    pub fn polygon(&self) -> &NavMeshPolygon {
        &self.polygon
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn connection_count(&self) -> usize {
        self.graph.connection_count()
    }
}

fn doorway_for_edge(
    graph: &WeightedGraph<NavNode, NavConnection>,
    edge: EdgeIndex,
) -> Option<NodeIndex> {
    graph
        .nodes()
        .find(|n| n.source_edge == Some(edge))
        .map(|n| n.index)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Unit square split by one diagonal: two triangles, one shared edge.
    fn diagonal_square() -> NavMeshPolygon {
        let points = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ];
        NavMeshPolygon::from_triangles(points, &[[0, 1, 2], [0, 2, 3]]).unwrap()
    }

    /// A 2x2 grid of unit quads over points (0..2, 0..2), each quad split by
    /// the diagonal from its lower-left to its upper-right corner.
    fn quad_grid_triangles() -> (Vec<Vec2>, Vec<[u32; 3]>) {
        let mut points = Vec::new();
        for j in 0..3 {
            for i in 0..3 {
                points.push(Vec2::new(i as f32, j as f32));
            }
        }
        let mut triangles = Vec::new();
        for j in 0..2u32 {
            for i in 0..2u32 {
                let a = j * 3 + i; // lower-left
                let b = a + 1; // lower-right
                let c = b + 3; // upper-right
                let d = a + 3; // upper-left
                triangles.push([a, b, c]);
                triangles.push([a, c, d]);
            }
        }
        (points, triangles)
    }

    #[test]
    fn single_shared_edge_gives_one_node_no_connections() {
        let nav = NavGraph::from_polygon(diagonal_square()).unwrap();
        // The diagonal is the only internal edge; with no second doorway in
        // either triangle there is nothing to connect.
        assert_eq!(nav.node_count(), 1);
        assert_eq!(nav.connection_count(), 0);
        let node = nav.graph().nodes().next().unwrap();
        assert_eq!(node.position, Vec2::new(0.5, 0.5));
    }

    #[test]
    fn quad_grid_has_expected_topology() {
        let (points, triangles) = quad_grid_triangles();
        let polygon = NavMeshPolygon::from_triangles(points, &triangles).unwrap();
        let nav = NavGraph::from_polygon(polygon).unwrap();

        // Internal edges: 4 diagonals + the 4 half-edges of the central
        // cross. The 8 outer-ring edges border one triangle each.
        assert_eq!(nav.node_count(), 8);
        // Worked per triangle: 1+1+0+3+3+0+1+1 connections.
        assert_eq!(nav.connection_count(), 10);
    }

    #[test]
    fn one_node_per_shared_edge_regardless_of_triangle_order() {
        let (points, mut triangles) = quad_grid_triangles();
        triangles.reverse();
        let polygon = NavMeshPolygon::from_triangles(points, &triangles).unwrap();
        let nav = NavGraph::from_polygon(polygon).unwrap();
        assert_eq!(nav.node_count(), 8);
        assert_eq!(nav.connection_count(), 10);
    }

    #[test]
    fn connection_costs_equal_endpoint_distance() {
        let (points, triangles) = quad_grid_triangles();
        let polygon = NavMeshPolygon::from_triangles(points, &triangles).unwrap();
        let nav = NavGraph::from_polygon(polygon).unwrap();

        for connection in nav.graph().connections() {
            let a = nav.graph().node(connection.from).unwrap().position;
            let b = nav.graph().node(connection.to).unwrap().position;
            assert!((connection.cost - a.distance(b)).abs() < 1e-6);
            assert!(connection.cost > 0.0);
        }
    }

    #[test]
    fn node_index_from_edge_distinguishes_internal_and_boundary() {
        let nav = NavGraph::from_polygon(diagonal_square()).unwrap();
        let polygon = nav.polygon();

        let mut internal = 0;
        let mut boundary = 0;
        for i in 0..polygon.edges().len() {
            let edge = EdgeIndex(i as u32);
            let node = nav.node_index_from_edge(edge);
            if polygon.triangles_sharing_edge(edge).len() > 1 {
                assert!(node.is_some());
                internal += 1;
            } else {
                assert!(node.is_none());
                boundary += 1;
            }
        }
        assert_eq!(internal, 1);
        assert_eq!(boundary, 4);
    }

    #[test]
    fn build_punches_expanded_obstacle_out_of_contour() {
        let contour = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(20.0, 0.0),
            Vec2::new(20.0, 20.0),
            Vec2::new(0.0, 20.0),
        ];
        let obstacle = vec![
            Vec2::new(9.0, 9.0),
            Vec2::new(11.0, 9.0),
            Vec2::new(11.0, 11.0),
            Vec2::new(9.0, 11.0),
        ];
        let nav = NavGraph::build(&contour, &[obstacle], 1.0).unwrap();

        assert!(nav.node_count() > 0);
        assert!(nav.connection_count() > 0);
        // The obstacle is expanded by the agent radius, so a point just
        // outside its raw outline but within the margin is unwalkable.
        assert!(nav.polygon().triangle_containing(Vec2::new(10.0, 10.0)).is_none());
        assert!(nav.polygon().triangle_containing(Vec2::new(2.0, 2.0)).is_some());
    }

    #[test]
    fn clone_copies_graph_and_shares_polygon() {
        let nav = NavGraph::from_polygon(diagonal_square()).unwrap();
        let mut copy = nav.clone();

        assert!(Arc::ptr_eq(&nav.polygon, &copy.polygon));

        let index = copy.graph.next_free_index();
        copy.graph
            .add_node(NavNode {
                index,
                position: Vec2::new(0.1, 0.1),
                source_edge: None,
            })
            .unwrap();
        assert_eq!(copy.node_count(), 2);
        assert_eq!(nav.node_count(), 1);
    }

    #[test]
    fn nav_node_serialization_roundtrip() {
        let node = NavNode {
            index: NodeIndex(3),
            position: Vec2::new(1.5, 2.5),
            source_edge: Some(EdgeIndex(7)),
        };
        let json = serde_json::to_string(&node).unwrap();
        let restored: NavNode = serde_json::from_str(&json).unwrap();
        assert_eq!(node, restored);
    }
}
