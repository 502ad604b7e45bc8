//! Road-network graph model.
//!
//! This module handles the JSON graph schema produced by the graph editor
//! (`nodes`, `edges`, `adjacency`, `startId`), validates it, and exposes the
//! read-only [`Graph`] the planner works on. All planning happens in working
//! coordinates; graphs stored with normalized `[0, 1]` coordinates are scaled
//! with [`GraphData::denormalize`] first.

use crate::error::{PlanError, Result};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub type NodeId = usize;
pub type EdgeId = usize;

/// A 2D point in working coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    #[inline]
    pub fn distance(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Point at fraction `t` of the way from `self` to `other`.
    #[inline]
    pub fn lerp(&self, other: &Point, t: f64) -> Point {
        Point {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }
}

/// Sum of consecutive point distances.
pub fn polyline_length(points: &[Point]) -> f64 {
    points.windows(2).map(|w| w[0].distance(&w[1])).sum()
}

/// A road-network node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub x: f64,
    pub y: f64,
}

impl Node {
    pub fn new(id: NodeId, x: f64, y: f64) -> Self {
        Node { id, x, y }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// An undirected road segment between nodes `a` and `b`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub a: NodeId,
    pub b: NodeId,
    /// Road classification ("primary", "secondary", ...). Only the renderer
    /// looks at it.
    #[serde(default)]
    pub level: String,
    /// Geometry from `a` to `b`.
    #[serde(default)]
    pub polyline: Vec<Point>,
    #[serde(default)]
    pub length: f64,
}

impl Edge {
    /// Endpoint opposite to `node`, if `node` is an endpoint at all.
    pub fn other(&self, node: NodeId) -> Option<NodeId> {
        if self.a == node {
            Some(self.b)
        } else if self.b == node {
            Some(self.a)
        } else {
            None
        }
    }

    /// Polyline oriented so that it starts at `from`.
    pub fn polyline_from(&self, from: NodeId) -> Vec<Point> {
        let mut points = self.polyline.clone();
        if from != self.a {
            points.reverse();
        }
        points
    }
}

/// Graph as it arrives from the editor or a file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphData {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    /// Node id -> incident edge ids. Derived from `edges` when absent.
    #[serde(default)]
    pub adjacency: Option<BTreeMap<NodeId, Vec<EdgeId>>>,
    #[serde(default)]
    pub start_id: Option<NodeId>,
    /// Coordinates are in `[0, 1]` and must be denormalized before planning.
    #[serde(default)]
    pub normalized: bool,
}

impl GraphData {
    /// Parse the JSON graph schema from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let data = serde_json::from_reader(BufReader::new(file))?;
        Ok(data)
    }

    /// Scale normalized coordinates into a `width` x `height` working space.
    /// Polylines are scaled too and edge lengths recomputed. No-op when the
    /// data is already in working coordinates.
    pub fn denormalize(&mut self, width: f64, height: f64) {
        if !self.normalized {
            return;
        }

        for node in &mut self.nodes {
            node.x *= width;
            node.y *= height;
        }
        for edge in &mut self.edges {
            for p in &mut edge.polyline {
                p.x *= width;
                p.y *= height;
            }
            edge.length = polyline_length(&edge.polyline);
        }
        self.normalized = false;
    }
}

/// Validated, read-only road-network graph
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: BTreeMap<NodeId, Node>,
    edges: BTreeMap<EdgeId, Edge>,
    adjacency: BTreeMap<NodeId, Vec<EdgeId>>,
    start_id: Option<NodeId>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from parsed data, checking that every edge references
    /// existing nodes and has a usable length.
    pub fn from_data(data: GraphData) -> Result<Self> {
        if data.normalized {
            return Err(PlanError::invalid_graph(
                "graph coordinates are normalized; denormalize them before planning",
            ));
        }

        let mut graph = Graph::new();
        for node in data.nodes {
            if graph.nodes.insert(node.id, node.clone()).is_some() {
                return Err(PlanError::invalid_graph(format!("duplicate node id {}", node.id)));
            }
        }

        let derive_adjacency = data.adjacency.is_none();
        let mut edges = data.edges;
        edges.sort_by_key(|e| e.id);
        for edge in edges {
            graph.insert_edge(edge, derive_adjacency)?;
        }

        if let Some(adjacency) = data.adjacency {
            for (node, incident) in adjacency {
                if !graph.nodes.contains_key(&node) {
                    return Err(PlanError::invalid_graph(format!(
                        "adjacency lists unknown node {}",
                        node
                    )));
                }
                for edge_id in &incident {
                    let edge = graph.edges.get(edge_id).ok_or_else(|| {
                        PlanError::invalid_graph(format!(
                            "adjacency of node {} lists unknown edge {}",
                            node, edge_id
                        ))
                    })?;
                    if edge.other(node).is_none() {
                        return Err(PlanError::invalid_graph(format!(
                            "edge {} listed under node {} is not incident to it",
                            edge_id, node
                        )));
                    }
                }
                graph.adjacency.insert(node, incident);
            }

            // Edges are undirected: each must be listed under both endpoints.
            for edge in graph.edges.values() {
                for end in [edge.a, edge.b] {
                    let listed = graph.adjacency.get(&end).is_some_and(|ids| ids.contains(&edge.id));
                    if !listed {
                        return Err(PlanError::invalid_graph(format!(
                            "edge {} is missing from the adjacency of its endpoint {}",
                            edge.id, end
                        )));
                    }
                }
            }
        }

        if let Some(start) = data.start_id {
            if !graph.nodes.contains_key(&start) {
                return Err(PlanError::invalid_graph(format!("start node {} does not exist", start)));
            }
            graph.start_id = Some(start);
        }

        Ok(graph)
    }

    /// Denormalize (if needed) into the given working space, then build.
    pub fn from_data_in_space(mut data: GraphData, width: f64, height: f64) -> Result<Self> {
        data.denormalize(width, height);
        Self::from_data(data)
    }

    /// Load a graph from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_data(GraphData::from_file(path)?)
    }

    pub fn add_node(&mut self, id: NodeId, x: f64, y: f64) {
        self.nodes.insert(id, Node::new(id, x, y));
        self.adjacency.entry(id).or_default();
    }

    /// Add an edge with explicit geometry; the length is taken from the
    /// polyline.
    pub fn add_edge(&mut self, id: EdgeId, a: NodeId, b: NodeId, polyline: Vec<Point>) -> Result<()> {
        let edge = Edge {
            id,
            a,
            b,
            level: String::new(),
            polyline,
            length: f64::NAN,
        };
        self.insert_edge(edge, true)
    }

    /// Add a straight edge between two existing nodes.
    pub fn add_straight_edge(&mut self, id: EdgeId, a: NodeId, b: NodeId) -> Result<()> {
        self.add_edge(id, a, b, Vec::new())
    }

    pub fn set_start(&mut self, start: NodeId) {
        self.start_id = Some(start);
    }

    fn insert_edge(&mut self, mut edge: Edge, update_adjacency: bool) -> Result<()> {
        let pos_a = self.position(edge.a).ok_or_else(|| {
            PlanError::invalid_graph(format!("edge {} references missing node {}", edge.id, edge.a))
        })?;
        let pos_b = self.position(edge.b).ok_or_else(|| {
            PlanError::invalid_graph(format!("edge {} references missing node {}", edge.id, edge.b))
        })?;

        if edge.polyline.is_empty() {
            edge.polyline = vec![pos_a, pos_b];
        }
        if !edge.length.is_finite() || edge.length <= 0.0 {
            edge.length = polyline_length(&edge.polyline);
        }
        if !edge.length.is_finite() || edge.length < 0.0 {
            return Err(PlanError::invalid_graph(format!(
                "edge {} has unusable length {}",
                edge.id, edge.length
            )));
        }

        if self.edges.contains_key(&edge.id) {
            return Err(PlanError::invalid_graph(format!("duplicate edge id {}", edge.id)));
        }

        if update_adjacency {
            self.adjacency.entry(edge.a).or_default().push(edge.id);
            if edge.b != edge.a {
                self.adjacency.entry(edge.b).or_default().push(edge.id);
            }
        }
        self.edges.insert(edge.id, edge);
        Ok(())
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn position(&self, id: NodeId) -> Option<Point> {
        self.nodes.get(&id).map(Node::position)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn start_id(&self) -> Option<NodeId> {
        self.start_id
    }

    /// Incident edges of `node`, in adjacency order.
    pub fn incident_edges(&self, node: NodeId) -> impl Iterator<Item = &Edge> {
        self.adjacency
            .get(&node)
            .into_iter()
            .flatten()
            .filter_map(move |id| self.edges.get(id))
    }

    /// Edge connecting `u` and `v`. With parallel edges the shortest one is
    /// returned, lowest id on ties.
    pub fn edge_between(&self, u: NodeId, v: NodeId) -> Option<&Edge> {
        self.incident_edges(u)
            .filter(|e| e.other(u) == Some(v))
            .min_by_key(|e| (OrderedFloat(e.length), e.id))
    }

    /// Nodes reachable from `source` (breadth-first).
    pub fn reachable_from(&self, source: NodeId) -> HashSet<NodeId> {
        let mut seen = HashSet::new();
        if !self.contains(source) {
            return seen;
        }

        let mut queue = VecDeque::from([source]);
        seen.insert(source);
        while let Some(node) = queue.pop_front() {
            for edge in self.incident_edges(node) {
                if let Some(next) = edge.other(node) {
                    if seen.insert(next) {
                        queue.push_back(next);
                    }
                }
            }
        }
        seen
    }

    /// Get statistics about the graph
    pub fn statistics(&self) -> GraphStatistics {
        let lengths: Vec<f64> = self.edges.values().map(|e| e.length).collect();
        let total_length: f64 = lengths.iter().sum();
        let avg_edge_length = if lengths.is_empty() {
            0.0
        } else {
            total_length / lengths.len() as f64
        };
        let max_edge_length = lengths.iter().cloned().fold(0.0, f64::max);

        let degrees: Vec<usize> = self
            .nodes
            .keys()
            .map(|id| self.adjacency.get(id).map_or(0, Vec::len))
            .collect();
        let avg_degree = if degrees.is_empty() {
            0.0
        } else {
            degrees.iter().sum::<usize>() as f64 / degrees.len() as f64
        };

        let mut levels: BTreeMap<String, usize> = BTreeMap::new();
        for edge in self.edges.values() {
            let level = if edge.level.is_empty() { "unclassified" } else { edge.level.as_str() };
            *levels.entry(level.to_string()).or_insert(0) += 1;
        }

        let reachable_from_start = self.start_id.map(|s| self.reachable_from(s).len());

        GraphStatistics {
            num_nodes: self.nodes.len(),
            num_edges: self.edges.len(),
            total_length,
            avg_edge_length,
            max_edge_length,
            avg_degree,
            isolated_nodes: degrees.iter().filter(|&&d| d == 0).count(),
            levels,
            start_id: self.start_id,
            reachable_from_start,
        }
    }
}

/// Statistics about a road-network graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphStatistics {
    pub num_nodes: usize,
    pub num_edges: usize,
    pub total_length: f64,
    pub avg_edge_length: f64,
    pub max_edge_length: f64,
    pub avg_degree: f64,
    pub isolated_nodes: usize,
    pub levels: BTreeMap<String, usize>,
    pub start_id: Option<NodeId>,
    pub reachable_from_start: Option<usize>,
}

impl std::fmt::Display for GraphStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Graph")?;
        writeln!(f, "  Nodes: {}", self.num_nodes)?;
        writeln!(f, "  Edges: {}", self.num_edges)?;
        writeln!(f, "  Total road length: {:.2}", self.total_length)?;
        writeln!(f, "  Avg edge length: {:.2}", self.avg_edge_length)?;
        writeln!(f, "  Max edge length: {:.2}", self.max_edge_length)?;
        writeln!(f, "  Avg degree: {:.2}", self.avg_degree)?;
        writeln!(f, "  Isolated nodes: {}", self.isolated_nodes)?;
        for (level, count) in &self.levels {
            writeln!(f, "  Edges [{}]: {}", level, count)?;
        }
        match (self.start_id, self.reachable_from_start) {
            (Some(start), Some(reachable)) => writeln!(
                f,
                "  Start: {} ({} of {} nodes reachable)",
                start, reachable, self.num_nodes
            ),
            _ => writeln!(f, "  Start: none"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Graph {
        let mut g = Graph::new();
        g.add_node(0, 0.0, 0.0);
        g.add_node(1, 10.0, 0.0);
        g.add_node(2, 10.0, 10.0);
        g.add_node(3, 0.0, 10.0);
        g.add_straight_edge(0, 0, 1).unwrap();
        g.add_straight_edge(1, 1, 2).unwrap();
        g.add_straight_edge(2, 2, 3).unwrap();
        g.add_straight_edge(3, 3, 0).unwrap();
        g
    }

    #[test]
    fn test_straight_edge_length() {
        let g = square();
        let edge = g.edge(0).unwrap();
        assert!((edge.length - 10.0).abs() < 1e-10);
        assert_eq!(edge.polyline.len(), 2);
    }

    #[test]
    fn test_edge_to_missing_node_is_rejected() {
        let mut g = square();
        let err = g.add_straight_edge(9, 0, 42).unwrap_err();
        assert_eq!(err.kind(), "InvalidGraph");
    }

    #[test]
    fn test_polyline_orientation() {
        let mut g = square();
        g.add_edge(
            7,
            0,
            2,
            vec![Point::new(0.0, 0.0), Point::new(3.0, 4.0), Point::new(10.0, 10.0)],
        )
        .unwrap();
        let edge = g.edge(7).unwrap();
        assert_eq!(edge.polyline_from(0)[0], Point::new(0.0, 0.0));
        assert_eq!(edge.polyline_from(2)[0], Point::new(10.0, 10.0));
        assert_eq!(edge.other(2), Some(0));
        assert_eq!(edge.other(1), None);
    }

    #[test]
    fn test_edge_between_prefers_shortest_parallel_edge() {
        let mut g = square();
        g.add_edge(
            8,
            0,
            1,
            vec![Point::new(0.0, 0.0), Point::new(5.0, 5.0), Point::new(10.0, 0.0)],
        )
        .unwrap();
        assert_eq!(g.edge_between(0, 1).unwrap().id, 0);
        assert_eq!(g.edge_between(1, 0).unwrap().id, 0);
        assert!(g.edge_between(0, 2).is_none());
    }

    #[test]
    fn test_json_schema_and_denormalize() {
        let json = r#"{
            "nodes": [{"id": 1, "x": 0.0, "y": 0.0}, {"id": 2, "x": 1.0, "y": 0.5}],
            "edges": [{"id": 5, "a": 1, "b": 2, "level": "primary",
                       "polyline": [{"x": 0.0, "y": 0.0}, {"x": 1.0, "y": 0.5}], "length": 1.118}],
            "adjacency": {"1": [5], "2": [5]},
            "startId": 1,
            "normalized": true
        }"#;
        let data: GraphData = serde_json::from_str(json).unwrap();
        assert!(Graph::from_data(data.clone()).is_err());

        let g = Graph::from_data_in_space(data, 100.0, 200.0).unwrap();
        assert_eq!(g.position(2), Some(Point::new(100.0, 100.0)));
        let edge = g.edge(5).unwrap();
        assert!((edge.length - 100.0 * 2f64.sqrt()).abs() < 1e-9);
        assert_eq!(g.start_id(), Some(1));
    }

    #[test]
    fn test_adjacency_must_match_edges() {
        let json = r#"{
            "nodes": [{"id": 1, "x": 0, "y": 0}, {"id": 2, "x": 1, "y": 0}, {"id": 3, "x": 2, "y": 0}],
            "edges": [{"id": 5, "a": 1, "b": 2}],
            "adjacency": {"3": [5]}
        }"#;
        let data: GraphData = serde_json::from_str(json).unwrap();
        let err = Graph::from_data(data).unwrap_err();
        assert_eq!(err.kind(), "InvalidGraph");
    }

    #[test]
    fn test_adjacency_must_list_edge_under_both_endpoints() {
        let json = r#"{
            "nodes": [{"id": 0, "x": 0, "y": 0}, {"id": 1, "x": 10, "y": 0}, {"id": 2, "x": 20, "y": 0}],
            "edges": [{"id": 0, "a": 0, "b": 1}, {"id": 1, "a": 1, "b": 2}],
            "adjacency": {"0": [0], "1": [0, 1], "2": []},
            "startId": 2
        }"#;
        let data: GraphData = serde_json::from_str(json).unwrap();
        let err = Graph::from_data(data).unwrap_err();
        assert_eq!(err.kind(), "InvalidGraph");
        assert!(err.to_string().contains("edge 1"));

        let fixed = json.replace(r#""2": []"#, r#""2": [1]"#);
        let data: GraphData = serde_json::from_str(&fixed).unwrap();
        let g = Graph::from_data(data).unwrap();
        assert!(g.edge_between(2, 1).is_some());
    }

    #[test]
    fn test_statistics() {
        let mut g = square();
        g.add_node(9, 50.0, 50.0);
        g.set_start(0);
        let stats = g.statistics();
        assert_eq!(stats.num_nodes, 5);
        assert_eq!(stats.num_edges, 4);
        assert!((stats.total_length - 40.0).abs() < 1e-10);
        assert_eq!(stats.isolated_nodes, 1);
        assert_eq!(stats.reachable_from_start, Some(4));
    }
}
