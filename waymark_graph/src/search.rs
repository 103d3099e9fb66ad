// A* search over a WeightedGraph.
//
// Implements best-first search using a `BinaryHeap` (min-heap via reversed
// ordering) plus a `BTreeMap` of the best known g-cost per node. The heap
// may hold stale entries for a node that was later reached more cheaply;
// they are skipped on pop. This preserves the replace-if-cheaper rule: a
// candidate path is recorded iff it is strictly cheaper than every cost
// already recorded for that node, and a cheaper candidate re-opens a node
// that was already finalized.
//
// Each traversal step costs `hop_penalty + connection.cost`. The per-hop
// penalty (default 1.0) biases the search toward paths with fewer hops at
// equal distance; pass 0.0 for a pure-distance model.
//
// The heuristic is a plain function value `h(|dx|, |dy|)` — Chebyshev,
// Euclidean, octile and Manhattan are provided in `heuristics`. With an
// admissible heuristic the returned path is cost-optimal.
//
// **Critical constraint: determinism.** Ties on f-cost break by node index
// via `total_cmp`-based ordering, so equal queries on equal graphs always
// produce the same path.

use crate::graph::{GraphConnection, GraphError, GraphNode, WeightedGraph};
use crate::types::{NodeIndex, Vec2};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};

/// Heuristic function: estimated remaining cost from the absolute coordinate
/// deltas to the goal. Must never overestimate for optimality guarantees.
pub type Heuristic = fn(f32, f32) -> f32;

/// Stock heuristic functions.
pub mod heuristics {
    use std::f32::consts::SQRT_2;

    /// Chebyshev distance: max of the deltas. A cheap admissible lower bound
    /// for straight-line movement in any direction.
    pub fn chebyshev(dx: f32, dy: f32) -> f32 {
        dx.max(dy)
    }

    /// Straight-line distance.
    pub fn euclidean(dx: f32, dy: f32) -> f32 {
        (dx * dx + dy * dy).sqrt()
    }

    /// Manhattan distance. Admissible only for 4-directional movement.
    pub fn manhattan(dx: f32, dy: f32) -> f32 {
        dx + dy
    }

    /// Octile distance: diagonal steps cost sqrt(2), straight steps cost 1.
    pub fn octile(dx: f32, dy: f32) -> f32 {
        let (lo, hi) = if dx < dy { (dx, dy) } else { (dy, dx) };
        hi + (SQRT_2 - 1.0) * lo
    }
}

/// Default per-hop penalty added to every traversal step.
pub const DEFAULT_HOP_PENALTY: f32 = 1.0;

/// The result of a successful search.
#[derive(Clone, Debug)]
pub struct PathResult {
    /// Node indices from start to goal, inclusive.
    pub nodes: Vec<NodeIndex>,
    /// Accumulated g-cost at the goal: connection costs plus hop penalties.
    pub total_cost: f32,
}

/// Entry in the open set (min-heap via reversed ordering). `g` is carried
/// so stale entries can be detected against the best-known-cost map.
struct OpenEntry {
    index: NodeIndex,
    g: f32,
    f: f32,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.f.total_cmp(&other.f) == Ordering::Equal && self.index == other.index
    }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for min-heap: smallest f is "greatest".
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.index.0.cmp(&self.index.0))
    }
}

/// A* search engine borrowing a graph, a heuristic, and a hop penalty.
///
/// Holds no state between calls — every `find_path` call is independent.
pub struct AStar<'g, N, C> {
    graph: &'g WeightedGraph<N, C>,
    heuristic: Heuristic,
    hop_penalty: f32,
}

impl<'g, N: GraphNode, C: GraphConnection> AStar<'g, N, C> {
    pub fn new(graph: &'g WeightedGraph<N, C>, heuristic: Heuristic) -> Self {
        Self::with_hop_penalty(graph, heuristic, DEFAULT_HOP_PENALTY)
    }

    pub fn with_hop_penalty(
        graph: &'g WeightedGraph<N, C>,
        heuristic: Heuristic,
        hop_penalty: f32,
    ) -> Self {
        Self {
            graph,
            heuristic,
            hop_penalty,
        }
    }

    /// Find the cheapest path from `start` to `goal`.
    ///
    /// Returns `Err(NodeNotFound)` if either endpoint is absent from the
    /// graph (a caller bug, distinct from "no path"), `Ok(None)` if the goal
    /// is unreachable, and `Ok(Some(path))` otherwise.
    pub fn find_path(
        &self,
        start: NodeIndex,
        goal: NodeIndex,
    ) -> Result<Option<PathResult>, GraphError> {
        let start_node = self
            .graph
            .node(start)
            .ok_or(GraphError::NodeNotFound(start))?;
        let goal_node = self.graph.node(goal).ok_or(GraphError::NodeNotFound(goal))?;
        let goal_pos = goal_node.position();

        if start == goal {
            return Ok(Some(PathResult {
                nodes: vec![start],
                total_cost: 0.0,
            }));
        }

        // best_g[node] = cost of the cheapest known path from start to node.
        let mut best_g: BTreeMap<NodeIndex, f32> = BTreeMap::new();
        let mut came_from: BTreeMap<NodeIndex, NodeIndex> = BTreeMap::new();
        best_g.insert(start, 0.0);

        let mut open = BinaryHeap::new();
        open.push(OpenEntry {
            index: start,
            g: 0.0,
            f: self.estimate(start_node.position(), goal_pos),
        });

        while let Some(current) = open.pop() {
            // Stale entry: this node was re-opened with a cheaper path after
            // the entry was pushed.
            if best_g
                .get(&current.index)
                .is_some_and(|&g| g < current.g)
            {
                continue;
            }

            if current.index == goal {
                return Ok(Some(PathResult {
                    nodes: reconstruct(&came_from, start, goal),
                    total_cost: current.g,
                }));
            }

            for connection in self.graph.node_connections(current.index) {
                // Undirected connections are incident from either side; the
                // neighbor is whichever endpoint we are not standing on.
                let neighbor = if connection.source() == current.index {
                    connection.target()
                } else {
                    connection.source()
                };
                let Some(neighbor_node) = self.graph.node(neighbor) else {
                    continue;
                };

                let candidate_g = current.g + self.hop_penalty + connection.cost();
                let known_g = best_g.get(&neighbor).copied().unwrap_or(f32::INFINITY);
                // Replace-if-cheaper: an existing record that is at least as
                // cheap wins; only a strict improvement is recorded.
                if candidate_g >= known_g {
                    continue;
                }

                best_g.insert(neighbor, candidate_g);
                came_from.insert(neighbor, current.index);
                open.push(OpenEntry {
                    index: neighbor,
                    g: candidate_g,
                    f: candidate_g + self.estimate(neighbor_node.position(), goal_pos),
                });
            }
        }

        // Open set exhausted without reaching the goal: disconnected.
        Ok(None)
    }

    fn estimate(&self, from: Vec2, goal: Vec2) -> f32 {
        (self.heuristic)((goal.x - from.x).abs(), (goal.y - from.y).abs())
    }
}

/// Walk the back-pointers from goal to start, then reverse.
fn reconstruct(
    came_from: &BTreeMap<NodeIndex, NodeIndex>,
    start: NodeIndex,
    goal: NodeIndex,
) -> Vec<NodeIndex> {
    let mut nodes = vec![goal];
    let mut current = goal;
    while current != start {
        match came_from.get(&current) {
            Some(&previous) => {
                nodes.push(previous);
                current = previous;
            }
            None => break,
        }
    }
    nodes.reverse();
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug)]
    struct TestNode {
        index: NodeIndex,
        position: Vec2,
    }

    impl GraphNode for TestNode {
        fn index(&self) -> NodeIndex {
            self.index
        }
        fn position(&self) -> Vec2 {
            self.position
        }
    }

    #[derive(Clone, Debug)]
    struct TestConnection {
        source: NodeIndex,
        target: NodeIndex,
        cost: f32,
    }

    impl GraphConnection for TestConnection {
        fn source(&self) -> NodeIndex {
            self.source
        }
        fn target(&self) -> NodeIndex {
            self.target
        }
        fn cost(&self) -> f32 {
            self.cost
        }
        fn set_cost(&mut self, cost: f32) {
            self.cost = cost;
        }
    }

    fn zero_heuristic(_dx: f32, _dy: f32) -> f32 {
        0.0
    }

    fn graph_with(
        positions: &[(f32, f32)],
        connections: &[(u32, u32, f32)],
    ) -> WeightedGraph<TestNode, TestConnection> {
        let mut graph = WeightedGraph::new(false);
        for (i, &(x, y)) in positions.iter().enumerate() {
            graph
                .add_node(TestNode {
                    index: NodeIndex(i as u32),
                    position: Vec2::new(x, y),
                })
                .unwrap();
        }
        for &(a, b, cost) in connections {
            graph
                .add_connection(TestConnection {
                    source: NodeIndex(a),
                    target: NodeIndex(b),
                    cost,
                })
                .unwrap();
        }
        graph
    }

    /// Cheapest cost over all simple paths, found by exhaustive DFS. Ground
    /// truth for optimality checks on small graphs.
    fn exhaustive_best_cost(
        graph: &WeightedGraph<TestNode, TestConnection>,
        start: NodeIndex,
        goal: NodeIndex,
        hop_penalty: f32,
    ) -> Option<f32> {
        fn dfs(
            graph: &WeightedGraph<TestNode, TestConnection>,
            current: NodeIndex,
            goal: NodeIndex,
            hop_penalty: f32,
            cost: f32,
            visited: &mut Vec<NodeIndex>,
            best: &mut Option<f32>,
        ) {
            if current == goal {
                *best = Some(best.map_or(cost, |b: f32| b.min(cost)));
                return;
            }
            for connection in graph.node_connections(current) {
                let neighbor = if connection.source() == current {
                    connection.target()
                } else {
                    connection.source()
                };
                if visited.contains(&neighbor) {
                    continue;
                }
                visited.push(neighbor);
                dfs(
                    graph,
                    neighbor,
                    goal,
                    hop_penalty,
                    cost + hop_penalty + connection.cost(),
                    visited,
                    best,
                );
                visited.pop();
            }
        }

        let mut best = None;
        let mut visited = vec![start];
        dfs(graph, start, goal, hop_penalty, 0.0, &mut visited, &mut best);
        best
    }

    #[test]
    fn start_equals_goal_is_trivial_path() {
        let graph = graph_with(&[(0.0, 0.0)], &[]);
        let search = AStar::new(&graph, heuristics::chebyshev);
        let path = search.find_path(NodeIndex(0), NodeIndex(0)).unwrap().unwrap();
        assert_eq!(path.nodes, vec![NodeIndex(0)]);
        assert_eq!(path.total_cost, 0.0);
    }

    #[test]
    fn missing_endpoints_are_errors_not_empty_paths() {
        let graph = graph_with(&[(0.0, 0.0)], &[]);
        let search = AStar::new(&graph, heuristics::chebyshev);
        assert_eq!(
            search.find_path(NodeIndex(5), NodeIndex(0)).unwrap_err(),
            GraphError::NodeNotFound(NodeIndex(5))
        );
        assert_eq!(
            search.find_path(NodeIndex(0), NodeIndex(5)).unwrap_err(),
            GraphError::NodeNotFound(NodeIndex(5))
        );
    }

    #[test]
    fn unreachable_goal_is_none_not_error() {
        let graph = graph_with(&[(0.0, 0.0), (10.0, 0.0)], &[]);
        let search = AStar::new(&graph, heuristics::chebyshev);
        assert!(search.find_path(NodeIndex(0), NodeIndex(1)).unwrap().is_none());
    }

    #[test]
    fn chain_cost_includes_hop_penalty() {
        let graph = graph_with(
            &[(0.0, 0.0), (5.0, 0.0), (10.0, 0.0)],
            &[(0, 1, 5.0), (1, 2, 5.0)],
        );
        let search = AStar::new(&graph, heuristics::chebyshev);
        let path = search.find_path(NodeIndex(0), NodeIndex(2)).unwrap().unwrap();
        assert_eq!(path.nodes, vec![NodeIndex(0), NodeIndex(1), NodeIndex(2)]);
        // 5 + 5 distance plus two hop penalties of 1.
        assert_eq!(path.total_cost, 12.0);
    }

    #[test]
    fn hop_penalty_prefers_fewer_hops_at_equal_distance() {
        // Two routes of equal total distance 10: direct (1 hop) and via a
        // midpoint (2 hops).
        let graph = graph_with(
            &[(0.0, 0.0), (5.0, 0.0), (10.0, 0.0)],
            &[(0, 2, 10.0), (0, 1, 5.0), (1, 2, 5.0)],
        );

        let search = AStar::new(&graph, heuristics::chebyshev);
        let path = search.find_path(NodeIndex(0), NodeIndex(2)).unwrap().unwrap();
        assert_eq!(path.nodes, vec![NodeIndex(0), NodeIndex(2)]);
        assert_eq!(path.total_cost, 11.0);

        // With the penalty disabled both routes cost 10; whichever wins, the
        // total must be the pure distance.
        let search = AStar::with_hop_penalty(&graph, heuristics::chebyshev, 0.0);
        let path = search.find_path(NodeIndex(0), NodeIndex(2)).unwrap().unwrap();
        assert_eq!(path.total_cost, 10.0);
    }

    #[test]
    fn cheaper_late_path_replaces_earlier_record() {
        // With a zero heuristic node 2 is first reached through the
        // expensive direct connection, then re-opened through the cheap
        // detour. The final cost must reflect the detour.
        let graph = graph_with(
            &[(0.0, 0.0), (1.0, 1.0), (2.0, 0.0)],
            &[(0, 2, 100.0), (0, 1, 1.0), (1, 2, 1.0)],
        );
        let search = AStar::with_hop_penalty(&graph, zero_heuristic, 0.0);
        let path = search.find_path(NodeIndex(0), NodeIndex(2)).unwrap().unwrap();
        assert_eq!(path.nodes, vec![NodeIndex(0), NodeIndex(1), NodeIndex(2)]);
        assert_eq!(path.total_cost, 2.0);
    }

    #[test]
    fn matches_exhaustive_search_on_small_graphs() {
        // A 4x4 grid (16 nodes) with one long shortcut and one dead end.
        let mut positions = Vec::new();
        let mut connections = Vec::new();
        for y in 0..4u32 {
            for x in 0..4u32 {
                positions.push((x as f32, y as f32));
                let i = y * 4 + x;
                if x > 0 {
                    connections.push((i - 1, i, 1.0));
                }
                if y > 0 {
                    connections.push((i - 4, i, 1.0));
                }
            }
        }
        connections.push((0, 15, 7.5)); // shortcut corner to corner
        let graph = graph_with(&positions, &connections);

        for hop_penalty in [0.0, 1.0] {
            let search = AStar::with_hop_penalty(&graph, heuristics::chebyshev, hop_penalty);
            for goal in 1..16u32 {
                let expected =
                    exhaustive_best_cost(&graph, NodeIndex(0), NodeIndex(goal), hop_penalty)
                        .unwrap();
                let path = search
                    .find_path(NodeIndex(0), NodeIndex(goal))
                    .unwrap()
                    .unwrap();
                assert!(
                    (path.total_cost - expected).abs() < 1e-4,
                    "goal {goal}, hop {hop_penalty}: astar {} vs exhaustive {expected}",
                    path.total_cost,
                );
            }
        }
    }

    #[test]
    fn cost_is_symmetric_on_undirected_graphs() {
        let graph = graph_with(
            &[(0.0, 0.0), (2.0, 1.0), (4.0, 0.0), (2.0, -2.0)],
            &[(0, 1, 2.2), (1, 2, 2.2), (0, 3, 2.8), (3, 2, 2.8)],
        );
        let search = AStar::new(&graph, heuristics::euclidean);
        let forward = search.find_path(NodeIndex(0), NodeIndex(2)).unwrap().unwrap();
        let backward = search.find_path(NodeIndex(2), NodeIndex(0)).unwrap().unwrap();
        assert!((forward.total_cost - backward.total_cost).abs() < 1e-5);
    }

    #[test]
    fn repeated_queries_are_deterministic() {
        let graph = graph_with(
            &[(0.0, 0.0), (3.0, 0.0), (6.0, 0.0), (3.0, 3.0)],
            &[(0, 1, 3.0), (1, 2, 3.0), (0, 3, 4.0), (3, 2, 4.0)],
        );
        let search = AStar::new(&graph, heuristics::chebyshev);
        let first = search.find_path(NodeIndex(0), NodeIndex(2)).unwrap().unwrap();
        let second = search.find_path(NodeIndex(0), NodeIndex(2)).unwrap().unwrap();
        assert_eq!(first.nodes, second.nodes);
        assert_eq!(first.total_cost, second.total_cost);
    }

    #[test]
    fn heuristic_functions_behave() {
        assert_eq!(heuristics::chebyshev(3.0, 4.0), 4.0);
        assert_eq!(heuristics::euclidean(3.0, 4.0), 5.0);
        assert_eq!(heuristics::manhattan(3.0, 4.0), 7.0);
        let octile = heuristics::octile(3.0, 4.0);
        assert!((octile - (4.0 + 3.0 * (std::f32::consts::SQRT_2 - 1.0))).abs() < 1e-6);
    }
}
