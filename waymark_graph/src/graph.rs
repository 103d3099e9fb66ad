// Generic weighted graph container.
//
// `WeightedGraph` owns a set of indexed nodes plus the weighted connections
// between them, and is generic over the node and connection types via the
// `GraphNode` / `GraphConnection` traits so the search engine can work on
// any specialization (navigation doorway nodes, test fixtures, ...).
//
// Storage follows an arena scheme: nodes live in a `BTreeMap` keyed by
// `NodeIndex` (deterministic iteration, stable handles), connections live
// in a `Vec<Option<C>>` arena where removal tombstones the slot, and a
// per-node adjacency table maps each node to its incident arena slots.
// Undirected graphs register each connection slot under both endpoints, so
// a connection is queryable from either side while being stored once.
//
// Mutations are all-or-nothing: `add_node` and `add_connection` validate
// before touching any state, so a failed insert leaves the graph unchanged.
//
// See also: `search.rs` for the A* engine that consumes this container,
// `waymark_nav::navgraph` for the navigation specialization.

use crate::types::{NodeIndex, Vec2};
use std::collections::BTreeMap;
use std::fmt;

/// A graph vertex: anything with a stable index and a 2D position.
pub trait GraphNode: Clone {
    fn index(&self) -> NodeIndex;
    fn position(&self) -> Vec2;
}

/// A weighted graph edge between two node indices.
///
/// `cost` must be non-negative; connections with zero or negative cost on a
/// cycle are a precondition violation, not a checked error.
pub trait GraphConnection: Clone {
    fn source(&self) -> NodeIndex;
    fn target(&self) -> NodeIndex;
    fn cost(&self) -> f32;
    fn set_cost(&mut self, cost: f32);
}

/// Errors surfaced by graph mutation and search.
///
/// These indicate programmer errors (builder or caller bugs), not runtime
/// conditions — "no path exists" is reported as an empty result, never as
/// a `GraphError`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GraphError {
    /// `add_node` was given an index that is already occupied.
    DuplicateIndex(NodeIndex),
    /// `add_connection` referenced a node absent from the graph.
    InvalidEndpoint {
        source: NodeIndex,
        target: NodeIndex,
        missing: NodeIndex,
    },
    /// A search was started from or aimed at a node absent from the graph.
    NodeNotFound(NodeIndex),
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateIndex(idx) => {
                write!(f, "node index {idx} is already in use")
            }
            Self::InvalidEndpoint {
                source,
                target,
                missing,
            } => {
                write!(
                    f,
                    "connection {source} -> {target} references missing node {missing}"
                )
            }
            Self::NodeNotFound(idx) => {
                write!(f, "node {idx} does not exist in the graph")
            }
        }
    }
}

impl std::error::Error for GraphError {}

/// An indexed, weighted, directed-or-undirected graph.
#[derive(Clone, Debug)]
pub struct WeightedGraph<N, C> {
    directed: bool,
    nodes: BTreeMap<NodeIndex, N>,
    /// Connection arena. Removal tombstones the slot (`None`) so adjacency
    /// slot lists stay valid without reindexing.
    connections: Vec<Option<C>>,
    /// Arena slots incident to each node. For undirected graphs a slot is
    /// listed under both endpoints.
    adjacency: BTreeMap<NodeIndex, Vec<usize>>,
    /// Monotonic index allocator. Never decremented, so removed indices are
    /// never handed out again.
    next_index: u32,
}

impl<N: GraphNode, C: GraphConnection> WeightedGraph<N, C> {
    pub fn new(directed: bool) -> Self {
        Self {
            directed,
            nodes: BTreeMap::new(),
            connections: Vec::new(),
            adjacency: BTreeMap::new(),
            next_index: 0,
        }
    }

    pub fn is_directed(&self) -> bool {
        self.directed
    }

    /// Insert a node under its own index.
    ///
    /// Fails with `DuplicateIndex` if the index is occupied; the graph is
    /// left untouched on failure. Advances the index allocator past the
    /// inserted index so `next_free_index` never collides with it.
    pub fn add_node(&mut self, node: N) -> Result<NodeIndex, GraphError> {
        let index = node.index();
        if self.nodes.contains_key(&index) {
            return Err(GraphError::DuplicateIndex(index));
        }
        self.next_index = self.next_index.max(index.0 + 1);
        self.adjacency.insert(index, Vec::new());
        self.nodes.insert(index, node);
        Ok(index)
    }

    /// Insert a connection between two existing nodes.
    ///
    /// Fails with `InvalidEndpoint` if either endpoint is absent; the graph
    /// is left untouched on failure.
    pub fn add_connection(&mut self, connection: C) -> Result<(), GraphError> {
        let source = connection.source();
        let target = connection.target();
        for endpoint in [source, target] {
            if !self.nodes.contains_key(&endpoint) {
                return Err(GraphError::InvalidEndpoint {
                    source,
                    target,
                    missing: endpoint,
                });
            }
        }

        let slot = self.connections.len();
        self.connections.push(Some(connection));
        self.adjacency.entry(source).or_default().push(slot);
        if !self.directed && target != source {
            self.adjacency.entry(target).or_default().push(slot);
        }
        Ok(())
    }

    /// Look up a node by index.
    pub fn node(&self, index: NodeIndex) -> Option<&N> {
        self.nodes.get(&index)
    }

    pub fn contains_node(&self, index: NodeIndex) -> bool {
        self.nodes.contains_key(&index)
    }

    /// All live connections incident to a node. For an undirected graph this
    /// includes connections where the node is either endpoint.
    pub fn node_connections(&self, index: NodeIndex) -> impl Iterator<Item = &C> {
        self.adjacency
            .get(&index)
            .into_iter()
            .flatten()
            .filter_map(|&slot| self.connections[slot].as_ref())
    }

    /// An index guaranteed not to be in use. Monotonic: indices freed by
    /// `remove_node` are never returned again, so callers may hold handles
    /// across removals without collision.
    pub fn next_free_index(&self) -> NodeIndex {
        NodeIndex(self.next_index)
    }

    /// Overwrite every connection's cost with the Euclidean distance between
    /// its endpoint positions. Idempotent.
    pub fn set_all_connection_costs_to_distance(&mut self) {
        for slot in 0..self.connections.len() {
            let Some(connection) = self.connections[slot].as_ref() else {
                continue;
            };
            let source = connection.source();
            let target = connection.target();
            let (Some(a), Some(b)) = (self.nodes.get(&source), self.nodes.get(&target)) else {
                continue;
            };
            let distance = a.position().distance(b.position());
            if let Some(connection) = self.connections[slot].as_mut() {
                connection.set_cost(distance);
            }
        }
    }

    /// Remove a node and tombstone every connection referencing it, so
    /// lookups never return dangling connections. Returns the removed node,
    /// or `None` if the index was not present.
    pub fn remove_node(&mut self, index: NodeIndex) -> Option<N> {
        let node = self.nodes.remove(&index)?;
        self.adjacency.remove(&index);

        // Tombstone every slot referencing the node. A full scan also
        // catches incoming directed connections, which are not listed in
        // the removed node's own adjacency.
        for slot in self.connections.iter_mut() {
            let dangling = slot
                .as_ref()
                .is_some_and(|c| c.source() == index || c.target() == index);
            if dangling {
                *slot = None;
            }
        }

        let connections = &self.connections;
        for slots in self.adjacency.values_mut() {
            slots.retain(|&slot| connections[slot].is_some());
        }

        Some(node)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of live (non-tombstoned) connections.
    pub fn connection_count(&self) -> usize {
        self.connections.iter().filter(|c| c.is_some()).count()
    }

    /// All nodes, in index order.
    pub fn nodes(&self) -> impl Iterator<Item = &N> {
        self.nodes.values()
    }

    /// All live connections, in insertion order.
    pub fn connections(&self) -> impl Iterator<Item = &C> {
        self.connections.iter().filter_map(|c| c.as_ref())
    }
}
