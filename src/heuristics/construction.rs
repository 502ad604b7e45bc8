//! Tour construction heuristics.
//!
//! - Nearest neighbor: greedy extension from the start stop.
//! - Christofides-style: MST + odd-vertex matching + walk shortcutting.

use crate::matrix::DistanceMatrix;
use crate::solution::Solution;
use ordered_float::OrderedFloat;
use std::collections::HashSet;

pub trait ConstructionHeuristic {
    fn construct(&self, matrix: &DistanceMatrix) -> Solution;
    fn name(&self) -> &str;
}

/// Nearest Neighbor Heuristic
///
/// Builds a tour by repeatedly visiting the nearest unvisited stop.
/// Equal distances go to the lower stop index, so the result depends only
/// on the matrix. The tour always starts at stop 0.
pub struct NearestNeighborHeuristic;

impl NearestNeighborHeuristic {
    pub fn new() -> Self {
        NearestNeighborHeuristic
    }

    fn find_nearest(&self, matrix: &DistanceMatrix, current: usize, visited: &[bool]) -> Option<usize> {
        (0..matrix.len())
            .filter(|&n| !visited[n])
            .min_by_key(|&n| (OrderedFloat(matrix.distance(current, n)), n))
    }
}

impl Default for NearestNeighborHeuristic {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstructionHeuristic for NearestNeighborHeuristic {
    fn construct(&self, matrix: &DistanceMatrix) -> Solution {
        let start = std::time::Instant::now();
        let k = matrix.len();
        if k == 0 {
            return Solution::from_tour(matrix, Vec::new(), self.name());
        }

        let mut tour = Vec::with_capacity(k);
        let mut visited = vec![false; k];
        let mut current = 0;
        tour.push(current);
        visited[current] = true;

        while let Some(next) = self.find_nearest(matrix, current, &visited) {
            tour.push(next);
            visited[next] = true;
            current = next;
        }

        let mut solution = Solution::from_tour(matrix, tour, self.name());
        solution.computation_time = start.elapsed().as_secs_f64();
        solution
    }

    fn name(&self) -> &str {
        "NearestNeighbor"
    }
}

/// How odd-degree MST vertices are paired up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matching {
    /// Repeatedly take the shortest remaining pair. Cheap, but loses the
    /// 1.5-approximation guarantee.
    Greedy,
    /// Minimum-weight perfect matching by subset dynamic programming, with
    /// an Eulerian circuit for the walk. Falls back to greedy above
    /// [`EXACT_MATCHING_LIMIT`] odd vertices.
    Exact,
}

/// Largest odd-vertex set matched exactly (2^16 DP states).
pub const EXACT_MATCHING_LIMIT: usize = 16;

/// Christofides-style construction
///
/// Builds a minimum spanning tree (Prim), pairs its odd-degree vertices,
/// merges tree and matching into a multigraph and walks it from the start,
/// keeping the first visit of every stop. With [`Matching::Greedy`] this is
/// a heuristic, not a true 1.5-approximation.
pub struct ChristofidesHeuristic {
    pub matching: Matching,
}

impl ChristofidesHeuristic {
    pub fn new() -> Self {
        ChristofidesHeuristic { matching: Matching::Greedy }
    }

    pub fn exact() -> Self {
        ChristofidesHeuristic { matching: Matching::Exact }
    }

    /// Prim's algorithm over the complete stop graph. Returns tree edges.
    fn minimum_spanning_tree(&self, matrix: &DistanceMatrix) -> Vec<(usize, usize)> {
        let k = matrix.len();
        let mut in_tree = vec![false; k];
        let mut best = vec![f64::INFINITY; k];
        let mut parent: Vec<Option<usize>> = vec![None; k];
        let mut edges = Vec::with_capacity(k.saturating_sub(1));

        best[0] = 0.0;
        for _ in 0..k {
            let Some(u) = (0..k)
                .filter(|&v| !in_tree[v])
                .min_by_key(|&v| (OrderedFloat(best[v]), v))
            else {
                break;
            };
            in_tree[u] = true;
            if let Some(p) = parent[u] {
                edges.push((p, u));
            }
            for v in 0..k {
                if !in_tree[v] && matrix.distance(u, v) < best[v] {
                    best[v] = matrix.distance(u, v);
                    parent[v] = Some(u);
                }
            }
        }
        edges
    }

    fn greedy_matching(&self, matrix: &DistanceMatrix, odd: &[usize]) -> Vec<(usize, usize)> {
        let mut pairs: Vec<(usize, usize)> = Vec::new();
        for (a, &u) in odd.iter().enumerate() {
            for &v in &odd[a + 1..] {
                pairs.push((u, v));
            }
        }
        pairs.sort_by_key(|&(u, v)| (OrderedFloat(matrix.distance(u, v)), u, v));

        let mut matched = HashSet::new();
        let mut matching = Vec::with_capacity(odd.len() / 2);
        for (u, v) in pairs {
            if !matched.contains(&u) && !matched.contains(&v) {
                matched.insert(u);
                matched.insert(v);
                matching.push((u, v));
            }
        }
        matching
    }

    /// Minimum-weight perfect matching over `odd` (even count) by DP over
    /// subsets: the lowest unmatched vertex is always paired next.
    fn exact_matching(&self, matrix: &DistanceMatrix, odd: &[usize]) -> Vec<(usize, usize)> {
        let m = odd.len();
        let full = (1usize << m) - 1;
        let mut cost = vec![f64::INFINITY; 1 << m];
        let mut choice: Vec<Option<(usize, usize)>> = vec![None; 1 << m];
        cost[0] = 0.0;

        for mask in 0..full {
            if !cost[mask].is_finite() {
                continue;
            }
            let Some(first) = (0..m).find(|&b| mask & (1 << b) == 0) else { continue };
            for second in first + 1..m {
                if mask & (1 << second) != 0 {
                    continue;
                }
                let next = mask | (1 << first) | (1 << second);
                let candidate = cost[mask] + matrix.distance(odd[first], odd[second]);
                if candidate < cost[next] {
                    cost[next] = candidate;
                    choice[next] = Some((first, second));
                }
            }
        }

        let mut matching = Vec::with_capacity(m / 2);
        let mut mask = full;
        while mask != 0 {
            let Some((a, b)) = choice[mask] else { break };
            matching.push((odd[a], odd[b]));
            mask &= !((1 << a) | (1 << b));
        }
        matching
    }

    /// Depth-first walk over the multigraph with an explicit stack, keeping
    /// each stop's first visit. Neighbours are explored in ascending order.
    fn depth_first_walk(&self, adjacency: &[Vec<usize>], k: usize) -> Vec<usize> {
        let mut visited = vec![false; k];
        let mut tour = Vec::with_capacity(k);
        let mut stack = vec![0usize];

        while let Some(u) = stack.pop() {
            if visited[u] {
                continue;
            }
            visited[u] = true;
            tour.push(u);
            let mut neighbours: Vec<usize> = adjacency[u].iter().copied().filter(|&v| !visited[v]).collect();
            neighbours.sort_unstable();
            neighbours.dedup();
            // Reverse so the smallest neighbour is popped first.
            stack.extend(neighbours.into_iter().rev());
        }

        tour.extend((0..k).filter(|&v| !visited[v]));
        tour
    }

    /// Iterative Hierholzer circuit from stop 0, shortcut to first visits.
    fn eulerian_walk(&self, adjacency: &[Vec<usize>], k: usize) -> Vec<usize> {
        let mut remaining: Vec<Vec<usize>> = adjacency.to_vec();
        for list in &mut remaining {
            list.sort_unstable_by(|a, b| b.cmp(a));
        }

        let mut circuit = Vec::new();
        let mut stack = vec![0usize];
        while let Some(&u) = stack.last() {
            if let Some(v) = remaining[u].pop() {
                if let Some(pos) = remaining[v].iter().position(|&w| w == u) {
                    remaining[v].remove(pos);
                }
                stack.push(v);
            } else {
                circuit.push(u);
                stack.pop();
            }
        }
        circuit.reverse();

        let mut visited = vec![false; k];
        let mut tour = Vec::with_capacity(k);
        for u in circuit {
            if !visited[u] {
                visited[u] = true;
                tour.push(u);
            }
        }
        tour.extend((0..k).filter(|&v| !visited[v]));
        tour
    }
}

impl Default for ChristofidesHeuristic {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstructionHeuristic for ChristofidesHeuristic {
    fn construct(&self, matrix: &DistanceMatrix) -> Solution {
        let start = std::time::Instant::now();
        let k = matrix.len();
        if k <= 2 {
            return Solution::from_tour(matrix, (0..k).collect(), self.name());
        }

        let tree = self.minimum_spanning_tree(matrix);
        let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); k];
        for &(u, v) in &tree {
            adjacency[u].push(v);
            adjacency[v].push(u);
        }

        let odd: Vec<usize> = (0..k).filter(|&v| adjacency[v].len() % 2 == 1).collect();
        let matching = match self.matching {
            Matching::Exact if odd.len() <= EXACT_MATCHING_LIMIT => self.exact_matching(matrix, &odd),
            _ => self.greedy_matching(matrix, &odd),
        };
        log::debug!(
            "christofides: {} tree edges, {} odd vertices, {} matched pairs",
            tree.len(),
            odd.len(),
            matching.len()
        );

        for &(u, v) in &matching {
            adjacency[u].push(v);
            adjacency[v].push(u);
        }

        let tour = match self.matching {
            Matching::Greedy => self.depth_first_walk(&adjacency, k),
            Matching::Exact => self.eulerian_walk(&adjacency, k),
        };

        let mut solution = Solution::from_tour(matrix, tour, self.name());
        solution.computation_time = start.elapsed().as_secs_f64();
        solution
    }

    fn name(&self) -> &str {
        match self.matching {
            Matching::Greedy => "Christofides-Greedy",
            Matching::Exact => "Christofides-Exact",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn euclidean(points: &[(f64, f64)]) -> DistanceMatrix {
        DistanceMatrix::from_rows(
            points
                .iter()
                .map(|a| {
                    points
                        .iter()
                        .map(|b| ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt())
                        .collect()
                })
                .collect(),
        )
    }

    fn square() -> DistanceMatrix {
        euclidean(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)])
    }

    fn scattered() -> DistanceMatrix {
        euclidean(&[
            (0.0, 0.0),
            (3.0, 7.0),
            (9.0, 1.0),
            (4.0, 4.0),
            (8.0, 8.0),
            (1.0, 9.0),
            (6.0, 2.0),
            (2.0, 5.0),
            (7.0, 6.0),
        ])
    }

    #[test]
    fn test_nearest_neighbor_square() {
        let m = square();
        let solution = NearestNeighborHeuristic::new().construct(&m);
        assert_eq!(solution.tour, vec![0, 1, 2, 3]);
        assert!((solution.cost - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_nearest_neighbor_tie_breaks_on_lower_index() {
        let m = DistanceMatrix::from_rows(vec![
            vec![0.0, 4.0, 4.0],
            vec![4.0, 0.0, 1.0],
            vec![4.0, 1.0, 0.0],
        ]);
        let solution = NearestNeighborHeuristic::new().construct(&m);
        assert_eq!(solution.tour, vec![0, 1, 2]);
    }

    #[test]
    fn test_christofides_produces_permutation() {
        let m = scattered();
        for heuristic in [ChristofidesHeuristic::new(), ChristofidesHeuristic::exact()] {
            let solution = heuristic.construct(&m);
            assert!(solution.is_complete(m.len()), "{:?}", solution.tour);
            assert!((solution.cost - m.tour_cost(&solution.tour)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_mst_has_k_minus_one_edges() {
        let m = scattered();
        let tree = ChristofidesHeuristic::new().minimum_spanning_tree(&m);
        assert_eq!(tree.len(), m.len() - 1);
    }

    #[test]
    fn test_exact_matching_not_worse_than_greedy() {
        let m = scattered();
        let h = ChristofidesHeuristic::exact();
        let odd = vec![1, 2, 4, 5, 6, 8];
        let weight = |pairs: &[(usize, usize)]| pairs.iter().map(|&(u, v)| m.distance(u, v)).sum::<f64>();
        let exact = h.exact_matching(&m, &odd);
        let greedy = h.greedy_matching(&m, &odd);
        assert_eq!(exact.len(), 3);
        assert_eq!(greedy.len(), 3);
        assert!(weight(&exact) <= weight(&greedy) + 1e-9);
    }

    #[test]
    fn test_christofides_small_inputs() {
        let m = DistanceMatrix::from_rows(vec![vec![0.0, 2.0], vec![2.0, 0.0]]);
        let solution = ChristofidesHeuristic::new().construct(&m);
        assert_eq!(solution.tour, vec![0, 1]);
    }
}
