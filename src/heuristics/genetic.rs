//! Genetic Algorithm over stop permutations.
//!
//! Individuals are random permutations with the start stop fixed at
//! position 0. Each generation keeps an elite unchanged and breeds the rest
//! with tournament selection, order crossover and swap mutation.

use crate::heuristics::Budget;
use crate::matrix::DistanceMatrix;
use crate::solution::Solution;
use ordered_float::OrderedFloat;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Individual in the genetic algorithm population
#[derive(Debug, Clone)]
pub struct Individual {
    /// The tour representation
    pub tour: Vec<usize>,
    /// 1 / (1 + cost), higher is better
    pub fitness: f64,
    /// Open-path cost
    pub cost: f64,
}

impl Individual {
    pub fn new(tour: Vec<usize>, matrix: &DistanceMatrix) -> Self {
        let cost = matrix.tour_cost(&tour);
        Individual {
            tour,
            fitness: 1.0 / (1.0 + cost),
            cost,
        }
    }
}

/// Genetic Algorithm configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GAConfig {
    /// Population size
    pub population_size: usize,
    /// Number of generations; `None` scales with the number of stops
    pub generations: Option<usize>,
    /// Elite count (best individuals preserved)
    pub elite_count: usize,
    /// Tournament size for selection
    pub tournament_size: usize,
    /// Per-offspring swap mutation probability
    pub mutation_prob: f64,
    /// Random seed
    pub seed: u64,
}

impl Default for GAConfig {
    fn default() -> Self {
        GAConfig {
            population_size: 50,
            generations: None,
            elite_count: 5,
            tournament_size: 3,
            mutation_prob: 0.1,
            seed: 42,
        }
    }
}

impl GAConfig {
    /// Default generation count for `k` stops.
    pub fn generations_for(k: usize) -> usize {
        (20 * k).clamp(50, 500)
    }
}

/// Genetic Algorithm implementation
pub struct GeneticAlgorithm<'a, R: Rng = ChaCha8Rng> {
    config: GAConfig,
    matrix: &'a DistanceMatrix,
    population: Vec<Individual>,
    rng: R,
    generation: usize,
}

impl<'a> GeneticAlgorithm<'a, ChaCha8Rng> {
    pub fn new(matrix: &'a DistanceMatrix, config: GAConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self::with_rng(matrix, config, rng)
    }
}

impl<'a, R: Rng> GeneticAlgorithm<'a, R> {
    /// Run with an explicit random source instead of the configured seed.
    pub fn with_rng(matrix: &'a DistanceMatrix, config: GAConfig, rng: R) -> Self {
        GeneticAlgorithm {
            config,
            matrix,
            population: Vec::new(),
            rng,
            generation: 0,
        }
    }

    fn initialize_population(&mut self) {
        self.population.clear();
        let k = self.matrix.len();
        let size = self.config.population_size.max(2);

        for _ in 0..size {
            let mut rest: Vec<usize> = (1..k).collect();
            rest.shuffle(&mut self.rng);
            let mut tour = Vec::with_capacity(k);
            tour.push(0);
            tour.extend(rest);
            self.population.push(Individual::new(tour, self.matrix));
        }

        self.sort_population();
    }

    fn sort_population(&mut self) {
        self.population
            .sort_by_key(|ind| (OrderedFloat(-ind.fitness), ind.tour.clone()));
    }

    /// Tournament selection
    fn tournament_select(&mut self) -> usize {
        let n = self.population.len();
        let mut best_idx = self.rng.gen_range(0..n);

        for _ in 1..self.config.tournament_size.max(1) {
            let idx = self.rng.gen_range(0..n);
            if self.population[idx].fitness > self.population[best_idx].fitness {
                best_idx = idx;
            }
        }

        best_idx
    }

    /// Order Crossover (OX)
    ///
    /// Copies a contiguous slice of `parent1` and fills the remaining
    /// positions with `parent2`'s stops in order, skipping duplicates.
    fn order_crossover(&mut self, parent1: &[usize], parent2: &[usize]) -> Vec<usize> {
        let n = parent1.len();
        if n < 3 {
            return parent1.to_vec();
        }

        let start = self.rng.gen_range(1..n);
        let end = self.rng.gen_range(start..n);

        let mut child = vec![usize::MAX; n];
        child[0] = 0;
        child[start..=end].copy_from_slice(&parent1[start..=end]);

        let segment_set: HashSet<usize> = parent1[start..=end].iter().cloned().collect();
        let mut fill = parent2
            .iter()
            .filter(|&&x| x != 0 && !segment_set.contains(&x))
            .cloned();

        for slot in child.iter_mut().skip(1) {
            if *slot == usize::MAX {
                if let Some(stop) = fill.next() {
                    *slot = stop;
                }
            }
        }

        if child.contains(&usize::MAX) {
            return parent1.to_vec();
        }

        child
    }

    /// Swap mutation
    fn mutate_swap(&mut self, tour: &mut [usize]) {
        let n = tour.len();
        if n < 3 {
            return;
        }

        let i = self.rng.gen_range(1..n);
        let j = self.rng.gen_range(1..n);
        if i != j {
            tour.swap(i, j);
        }
    }

    /// Create new generation
    fn evolve(&mut self) {
        let size = self.population.len();
        let elite = self.config.elite_count.min(size);
        let mut new_population = Vec::with_capacity(size);

        new_population.extend(self.population.iter().take(elite).cloned());

        while new_population.len() < size {
            let p1 = self.tournament_select();
            let p2 = self.tournament_select();
            let parent1 = self.population[p1].tour.clone();
            let parent2 = self.population[p2].tour.clone();

            let mut child = self.order_crossover(&parent1, &parent2);
            if self.rng.gen::<f64>() < self.config.mutation_prob {
                self.mutate_swap(&mut child);
            }

            new_population.push(Individual::new(child, self.matrix));
        }

        self.population = new_population;
        self.sort_population();
        self.generation += 1;
    }

    /// Run the genetic algorithm and return the best individual of the
    /// final population.
    pub fn run(&mut self, budget: &Budget) -> Solution {
        let start = std::time::Instant::now();
        let k = self.matrix.len();
        if k < 3 {
            let mut solution = Solution::from_tour(self.matrix, (0..k).collect(), "GeneticAlgorithm");
            solution.iterations = Some(0);
            return solution;
        }

        let generations = self.config.generations.unwrap_or_else(|| GAConfig::generations_for(k));
        let mut budget_exhausted = false;

        self.initialize_population();
        while self.generation < generations {
            if budget.expired() {
                budget_exhausted = true;
                break;
            }
            self.evolve();

            if self.generation % 50 == 0 {
                if let Some(best) = self.population.first() {
                    log::debug!(
                        "[GA] Gen {}  Best cost {:.3}  Diversity {:.2}",
                        self.generation,
                        best.cost,
                        self.population_diversity()
                    );
                }
            }
        }

        let tour = self
            .population
            .first()
            .map(|best| best.tour.clone())
            .unwrap_or_else(|| (0..k).collect());

        let mut solution = Solution::from_tour(self.matrix, tour, "GeneticAlgorithm");
        solution.computation_time = start.elapsed().as_secs_f64();
        solution.iterations = Some(self.generation);
        solution.budget_exhausted = budget_exhausted;
        solution
    }

    /// Get current generation
    pub fn current_generation(&self) -> usize {
        self.generation
    }

    /// Get population diversity (average positional difference between
    /// individuals)
    pub fn population_diversity(&self) -> f64 {
        if self.population.len() < 2 {
            return 0.0;
        }

        let mut total_diff = 0.0;
        let mut count = 0;

        for i in 0..self.population.len().min(20) {
            for j in i + 1..self.population.len().min(20) {
                let diff = self.population[i]
                    .tour
                    .iter()
                    .zip(self.population[j].tour.iter())
                    .filter(|(a, b)| a != b)
                    .count();
                total_diff += diff as f64;
                count += 1;
            }
        }

        if count > 0 {
            total_diff / count as f64
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_matrix() -> DistanceMatrix {
        let points = [
            (0.0, 0.0),
            (1.0, 0.0),
            (2.0, 0.0),
            (1.0, 1.0),
            (2.0, 1.0),
            (3.0, 2.0),
            (0.0, 2.0),
        ];
        DistanceMatrix::from_rows(
            points
                .iter()
                .map(|a: &(f64, f64)| {
                    points
                        .iter()
                        .map(|b| ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt())
                        .collect()
                })
                .collect(),
        )
    }

    #[test]
    fn test_genetic_algorithm() {
        let matrix = create_test_matrix();
        let config = GAConfig {
            population_size: 20,
            generations: Some(30),
            ..Default::default()
        };

        let mut ga = GeneticAlgorithm::new(&matrix, config);
        let solution = ga.run(&Budget::unlimited());

        assert!(solution.is_complete(matrix.len()));
        assert_eq!(solution.iterations, Some(30));
        assert_eq!(ga.current_generation(), 30);
    }

    #[test]
    fn test_same_seed_same_result() {
        let matrix = create_test_matrix();
        let run = |seed| {
            let config = GAConfig { seed, generations: Some(20), ..Default::default() };
            GeneticAlgorithm::new(&matrix, config).run(&Budget::unlimited()).tour
        };
        assert_eq!(run(7), run(7));
    }

    #[test]
    fn test_order_crossover_keeps_permutation() {
        let matrix = create_test_matrix();
        let mut ga = GeneticAlgorithm::with_rng(&matrix, GAConfig::default(), ChaCha8Rng::seed_from_u64(3));
        let p1 = vec![0, 1, 2, 3, 4, 5, 6];
        let p2 = vec![0, 6, 5, 4, 3, 2, 1];
        for _ in 0..50 {
            let child = ga.order_crossover(&p1, &p2);
            let solution = Solution::from_tour(&matrix, child, "ox");
            assert!(solution.is_complete(7));
        }
    }

    #[test]
    fn test_elites_never_get_worse() {
        let matrix = create_test_matrix();
        let mut ga = GeneticAlgorithm::new(&matrix, GAConfig::default());
        ga.initialize_population();
        let mut best = ga.population[0].cost;
        for _ in 0..25 {
            ga.evolve();
            assert!(ga.population[0].cost <= best + 1e-12);
            best = ga.population[0].cost;
        }
    }

    #[test]
    fn test_two_stops() {
        let matrix = DistanceMatrix::from_rows(vec![vec![0.0, 3.0], vec![3.0, 0.0]]);
        let solution = GeneticAlgorithm::new(&matrix, GAConfig::default()).run(&Budget::unlimited());
        assert_eq!(solution.tour, vec![0, 1]);
        assert_eq!(solution.cost, 3.0);
    }
}
