//! Single-source shortest paths over the road network (Dijkstra).
//!
//! Edge lengths are Euclidean polyline sums and therefore non-negative.
//! The heap is keyed on `(distance, node id)`, so among equal tentative
//! distances the lower node id is settled first. A predecessor is only
//! replaced on a strictly shorter distance, which makes the first incident
//! edge in adjacency order win between equal-length alternatives. No
//! randomness is involved: identical input always yields identical paths.

use crate::graph::{Graph, NodeId};
use ordered_float::OrderedFloat;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

/// Distances and predecessor links from one source to every node.
#[derive(Debug, Clone)]
pub struct ShortestPaths {
    pub source: NodeId,
    pub distance: HashMap<NodeId, f64>,
    pub predecessor: HashMap<NodeId, Option<NodeId>>,
}

impl ShortestPaths {
    /// Distance to `node`, `+inf` when unreachable or unknown.
    pub fn distance_to(&self, node: NodeId) -> f64 {
        self.distance.get(&node).copied().unwrap_or(f64::INFINITY)
    }

    pub fn is_reachable(&self, node: NodeId) -> bool {
        self.distance_to(node).is_finite()
    }

    /// Node sequence from the source to `target`, both included.
    pub fn path_to(&self, target: NodeId) -> Option<Vec<NodeId>> {
        if !self.is_reachable(target) {
            return None;
        }

        let mut path = vec![target];
        let mut current = target;
        while current != self.source {
            current = (*self.predecessor.get(&current)?)?;
            path.push(current);
            if path.len() > self.predecessor.len() + 1 {
                // Predecessor links form a cycle; only possible with corrupt data.
                return None;
            }
        }
        path.reverse();
        Some(path)
    }
}

/// Run Dijkstra from `source` over `graph`.
///
/// Every node of the graph appears in the result. Unreachable nodes keep a
/// distance of `+inf` and no predecessor; a source that is not part of the
/// graph leaves everything unreachable.
pub fn shortest_paths(graph: &Graph, source: NodeId) -> ShortestPaths {
    let mut distance: HashMap<NodeId, f64> = graph.nodes().map(|n| (n.id, f64::INFINITY)).collect();
    let mut predecessor: HashMap<NodeId, Option<NodeId>> = graph.nodes().map(|n| (n.id, None)).collect();

    if !graph.contains(source) {
        return ShortestPaths { source, distance, predecessor };
    }

    let mut heap: BinaryHeap<Reverse<(OrderedFloat<f64>, NodeId)>> = BinaryHeap::new();
    distance.insert(source, 0.0);
    heap.push(Reverse((OrderedFloat(0.0), source)));

    while let Some(Reverse((OrderedFloat(dist), node))) = heap.pop() {
        if dist > distance[&node] {
            continue; // stale entry
        }

        for edge in graph.incident_edges(node) {
            let Some(next) = edge.other(node) else { continue };
            let candidate = dist + edge.length;
            let entry = distance.entry(next).or_insert(f64::INFINITY);
            if candidate < *entry {
                *entry = candidate;
                predecessor.insert(next, Some(node));
                heap.push(Reverse((OrderedFloat(candidate), next)));
            }
        }
    }

    ShortestPaths { source, distance, predecessor }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Point;

    /// 0 - 1 - 2 along the x axis plus a long detour 0 - 3 - 2, and an
    /// isolated node 4.
    fn line_graph() -> Graph {
        let mut g = Graph::new();
        g.add_node(0, 0.0, 0.0);
        g.add_node(1, 5.0, 0.0);
        g.add_node(2, 10.0, 0.0);
        g.add_node(3, 5.0, 20.0);
        g.add_node(4, 100.0, 100.0);
        g.add_straight_edge(0, 0, 1).unwrap();
        g.add_straight_edge(1, 1, 2).unwrap();
        g.add_straight_edge(2, 0, 3).unwrap();
        g.add_straight_edge(3, 3, 2).unwrap();
        g
    }

    #[test]
    fn test_distances_and_paths() {
        let g = line_graph();
        let sp = shortest_paths(&g, 0);
        assert_eq!(sp.distance_to(0), 0.0);
        assert!((sp.distance_to(2) - 10.0).abs() < 1e-10);
        assert_eq!(sp.path_to(2), Some(vec![0, 1, 2]));
        assert_eq!(sp.path_to(0), Some(vec![0]));
    }

    #[test]
    fn test_unreachable_node_is_infinite() {
        let g = line_graph();
        let sp = shortest_paths(&g, 0);
        assert!(sp.distance_to(4).is_infinite());
        assert_eq!(sp.predecessor[&4], None);
        assert!(sp.path_to(4).is_none());
    }

    #[test]
    fn test_unknown_source() {
        let g = line_graph();
        let sp = shortest_paths(&g, 77);
        assert!(sp.distance.values().all(|d| d.is_infinite()));
        assert!(sp.path_to(0).is_none());
    }

    #[test]
    fn test_curved_edge_uses_polyline_length() {
        let mut g = Graph::new();
        g.add_node(0, 0.0, 0.0);
        g.add_node(1, 6.0, 0.0);
        g.add_edge(
            0,
            0,
            1,
            vec![Point::new(0.0, 0.0), Point::new(3.0, 4.0), Point::new(6.0, 0.0)],
        )
        .unwrap();
        let sp = shortest_paths(&g, 1);
        assert!((sp.distance_to(0) - 10.0).abs() < 1e-10);
    }

    #[test]
    fn test_equal_length_ties_are_stable() {
        // Two equal routes 0 -> 1 -> 3 and 0 -> 2 -> 3.
        let mut g = Graph::new();
        g.add_node(0, 0.0, 0.0);
        g.add_node(1, 5.0, 5.0);
        g.add_node(2, 5.0, -5.0);
        g.add_node(3, 10.0, 0.0);
        g.add_straight_edge(0, 0, 1).unwrap();
        g.add_straight_edge(1, 0, 2).unwrap();
        g.add_straight_edge(2, 1, 3).unwrap();
        g.add_straight_edge(3, 2, 3).unwrap();

        let first = shortest_paths(&g, 0).path_to(3);
        for _ in 0..10 {
            assert_eq!(shortest_paths(&g, 0).path_to(3), first);
        }
        assert_eq!(first, Some(vec![0, 1, 3]));
    }
}
