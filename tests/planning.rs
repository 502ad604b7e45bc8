use route_planner::graph::{Graph, GraphData, Point};
use route_planner::heuristics::{Budget, LocalSearch, Strategy, TwoOptSearch};
use route_planner::{
    spawn_plan, stitch, DistanceMatrix, PlanError, PlanRequest, Planner, PlannerConfig, Solution,
};
use std::sync::Arc;

/// Unit square scaled by ten: four corners joined by their
/// sides and both diagonals, start at the origin.
fn square_graph() -> Graph {
    let json = r#"{
        "nodes": [
            {"id": 0, "x": 0.0, "y": 0.0},
            {"id": 1, "x": 10.0, "y": 0.0},
            {"id": 2, "x": 10.0, "y": 10.0},
            {"id": 3, "x": 0.0, "y": 10.0}
        ],
        "edges": [
            {"id": 0, "a": 0, "b": 1, "level": "primary", "polyline": [{"x": 0.0, "y": 0.0}, {"x": 10.0, "y": 0.0}], "length": 10.0},
            {"id": 1, "a": 1, "b": 2, "level": "primary", "polyline": [{"x": 10.0, "y": 0.0}, {"x": 10.0, "y": 10.0}], "length": 10.0},
            {"id": 2, "a": 2, "b": 3, "level": "primary", "polyline": [{"x": 10.0, "y": 10.0}, {"x": 0.0, "y": 10.0}], "length": 10.0},
            {"id": 3, "a": 3, "b": 0, "level": "primary", "polyline": [{"x": 0.0, "y": 10.0}, {"x": 0.0, "y": 0.0}], "length": 10.0},
            {"id": 4, "a": 0, "b": 2, "level": "secondary", "polyline": [{"x": 0.0, "y": 0.0}, {"x": 10.0, "y": 10.0}], "length": 14.142135623730951},
            {"id": 5, "a": 1, "b": 3, "level": "secondary", "polyline": [{"x": 10.0, "y": 0.0}, {"x": 0.0, "y": 10.0}], "length": 14.142135623730951}
        ],
        "startId": 0
    }"#;
    let data: GraphData = serde_json::from_str(json).unwrap();
    Graph::from_data(data).unwrap()
}

/// A 5x5 street grid with unit spacing 100, node id = row * 5 + col.
fn grid_graph() -> Graph {
    let mut g = Graph::new();
    for row in 0..5 {
        for col in 0..5 {
            g.add_node(row * 5 + col, col as f64 * 100.0, row as f64 * 100.0);
        }
    }
    let mut edge_id = 0;
    for row in 0..5 {
        for col in 0..5 {
            let id = row * 5 + col;
            if col + 1 < 5 {
                g.add_straight_edge(edge_id, id, id + 1).unwrap();
                edge_id += 1;
            }
            if row + 1 < 5 {
                g.add_straight_edge(edge_id, id, id + 5).unwrap();
                edge_id += 1;
            }
        }
    }
    g.set_start(0);
    g
}

#[test]
fn test_square_nearest_neighbor_and_two_opt() {
    let g = square_graph();
    let planner = Planner::new(&g, PlannerConfig::default());

    let nearest = planner
        .plan(&PlanRequest::new(vec![1, 2, 3]).with_strategy(Strategy::Nearest))
        .unwrap();
    assert_eq!(nearest.order, vec![0, 1, 2, 3]);
    assert!((nearest.distance - 30.0).abs() < 1e-9);

    let matrix = DistanceMatrix::build(&g, &[0, 1, 2, 3]).unwrap();
    let mut solution = Solution::from_tour(&matrix, vec![0, 1, 2, 3], "NearestNeighbor");
    let improved = TwoOptSearch::new().improve(&matrix, &mut solution, &Budget::unlimited());
    assert!(!improved);
    assert_eq!(solution.tour, vec![0, 1, 2, 3]);
}

#[test]
fn test_every_strategy_produces_a_valid_route() {
    let g = grid_graph();
    let planner = Planner::new(&g, PlannerConfig::default());
    let destinations = vec![24, 3, 17, 9, 12, 20, 6];

    for strategy in Strategy::ALL {
        let request = PlanRequest::new(destinations.clone()).with_strategy(strategy).with_seed(9);
        let result = planner.plan(&request).unwrap();

        assert_eq!(result.order[0], 0, "{}", strategy);
        let mut visited = result.order[1..].to_vec();
        visited.sort_unstable();
        let mut expected = destinations.clone();
        expected.sort_unstable();
        assert_eq!(visited, expected, "{}", strategy);

        let first = result.stitched_path.first().copied().unwrap();
        let last = result.stitched_path.last().copied().unwrap();
        let end = g.position(*result.order.last().unwrap()).unwrap();
        assert!(first.distance(&Point::new(0.0, 0.0)) < 1e-9, "{}", strategy);
        assert!(last.distance(&end) < 1e-9, "{}", strategy);

        // On a grid every stitched hop is axis-aligned, so the drawn
        // length equals the matrix distance.
        let drawn = result.traversal().total_length();
        assert!((drawn - result.distance).abs() < 1e-6, "{}", strategy);
    }
}

#[test]
fn test_heuristic_beats_or_matches_nearest() {
    let g = grid_graph();
    let planner = Planner::new(&g, PlannerConfig::default());
    let destinations = vec![4, 20, 24, 12, 7, 16];

    let nearest = planner
        .plan(&PlanRequest::new(destinations.clone()).with_strategy(Strategy::Nearest))
        .unwrap();
    let heuristic = planner.plan(&PlanRequest::new(destinations)).unwrap();
    assert!(heuristic.distance <= nearest.distance + 1e-9);
}

#[test]
fn test_unknown_destination_is_unreachable() {
    let g = square_graph();
    let planner = Planner::new(&g, PlannerConfig::default());
    let err = planner.plan(&PlanRequest::new(vec![1, 99])).unwrap_err();
    assert!(matches!(err, PlanError::UnreachableStop { to: 99, .. }));
    assert_eq!(err.report().kind, "UnreachableStop");
}

#[test]
fn test_stitch_and_sample_round_trip() {
    let g = grid_graph();
    let matrix = DistanceMatrix::build(&g, &[0, 24]).unwrap();
    let path = stitch(&g, &[0, 1], &matrix, 0.01).unwrap();

    assert_eq!(path.cost, 800.0);
    assert_eq!(path.points.first(), Some(&Point::new(0.0, 0.0)));
    assert_eq!(path.points.last(), Some(&Point::new(400.0, 400.0)));
    for pair in path.points.windows(2) {
        assert!(pair[0].distance(&pair[1]) > 0.01);
    }

    let traversal = route_planner::Traversal::new(path.points);
    assert_eq!(traversal.sample(0.0).unwrap().position, Point::new(0.0, 0.0));
    assert_eq!(traversal.sample(1e6).unwrap().position, Point::new(400.0, 400.0));
    let mid = traversal.at_time(4.0, 100.0).unwrap();
    assert!((mid.position.x + mid.position.y - 400.0).abs() < 1e-9);
}

#[test]
fn test_normalized_graph_is_scaled_before_planning() {
    let json = r#"{
        "nodes": [{"id": 0, "x": 0.0, "y": 0.0}, {"id": 1, "x": 0.5, "y": 0.0}],
        "edges": [{"id": 0, "a": 0, "b": 1, "polyline": [{"x": 0.0, "y": 0.0}, {"x": 0.5, "y": 0.0}], "length": 0.5}],
        "startId": 0,
        "normalized": true
    }"#;
    let data: GraphData = serde_json::from_str(json).unwrap();
    assert!(Graph::from_data(data.clone()).is_err());

    let g = Graph::from_data_in_space(data, 1000.0, 1000.0).unwrap();
    let result = Planner::new(&g, PlannerConfig::default())
        .plan(&PlanRequest::new(vec![1]))
        .unwrap();
    assert!((result.distance - 500.0).abs() < 1e-9);
}

#[test]
fn test_background_plan_delivers_one_result() {
    let g = Arc::new(grid_graph());
    let request = PlanRequest::new(vec![24, 4, 20]).with_strategy(Strategy::Genetic);
    let handle = spawn_plan(g, PlannerConfig::default(), request);
    let result = handle.wait().unwrap();
    assert_eq!(result.order.len(), 4);
    assert_eq!(result.strategy, Strategy::Genetic);
}
