use std::cmp::Reverse;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use itertools::Itertools;
use log::{debug, info};
use ordered_float::OrderedFloat;
use rand::Rng;
use rand::prelude::SmallRng;
use rayon::prelude::*;
use thousands::Separable;

use crate::config::{GaConfig, NestConfig};
use crate::ga::{Chromosome, Decoded, PackingProblem, RectPacker};

const TARGET_FITNESS: f64 = 1.0;

/// Outcome of an evolution run
#[derive(Clone, Debug)]
pub struct GaResult {
    /// Best chromosome found over all generations
    pub best: Chromosome,
    pub decoded: Decoded,
    /// Best fitness after every generation, the initial population included. Non-decreasing.
    pub history: Vec<f64>,
    pub n_decodes: usize,
    /// Whether the run was cancelled before it converged
    pub interrupted: bool,
}

/// Evolves packing orders of rectangles, every chromosome is evaluated by decoding it with a [`RectPacker`]
pub struct GaOptimizer<'a> {
    problem: &'a PackingProblem,
    config: GaConfig,
    rotatable: bool,
    /// SmallRng is a fast, non-cryptographic PRNG <https://rust-random.github.io/book/guide-rngs.html>
    rng: SmallRng,
    n_decodes: usize,
}

impl<'a> GaOptimizer<'a> {
    pub fn new(problem: &'a PackingProblem, config: &NestConfig, rng: SmallRng) -> Self {
        GaOptimizer {
            problem,
            config: config.ga,
            rotatable: config.rotatable,
            rng,
            n_decodes: 0,
        }
    }

    /// Runs until the target fitness is reached, the best fitness stagnates, the generations run out
    /// or `cancel` is set. `progress` receives the percentage of generations done.
    pub fn run(&mut self, cancel: &AtomicBool, mut progress: impl FnMut(u8)) -> GaResult {
        let start = Instant::now();
        let cfg = self.config;

        let mut population = self.initial_population();
        let mut fitness = self.evaluate(&population);
        let (mut best, mut best_fitness) = fittest(&population, &fitness);
        let mut history = vec![best_fitness];
        let mut stagnant = 0;
        let mut interrupted = false;

        for generation in 0..cfg.max_generations {
            if best_fitness >= TARGET_FITNESS - 1e-9 || stagnant >= cfg.stagnation_limit {
                break;
            }
            if cancel.load(Ordering::Relaxed) {
                interrupted = true;
                break;
            }

            population = self.next_generation(&population, &fitness);
            fitness = self.evaluate(&population);

            let (gen_best, gen_best_fitness) = fittest(&population, &fitness);
            if gen_best_fitness > best_fitness {
                best = gen_best;
                best_fitness = gen_best_fitness;
                stagnant = 0;
            } else {
                stagnant += 1;
            }
            history.push(best_fitness);
            debug!("[GA] generation {generation}: best fitness {best_fitness:.5}");
            progress((((generation + 1) * 100) / cfg.max_generations) as u8);
        }

        let decoded = RectPacker::new(self.problem).decode(&best);
        info!(
            "[GA] {} generations, best fitness {:.5} ({} decodes in {:.3}ms)",
            history.len() - 1,
            best_fitness,
            self.n_decodes.separate_with_commas(),
            start.elapsed().as_secs_f64() * 1000.0
        );

        GaResult {
            best,
            decoded,
            history,
            n_decodes: self.n_decodes,
            interrupted,
        }
    }

    /// The area-descending unrotated order, followed by random chromosomes
    fn initial_population(&mut self) -> Vec<Chromosome> {
        let rects = &self.problem.rects;
        let by_area = (0..rects.len())
            .sorted_by_key(|i| Reverse(OrderedFloat(rects[*i].area())))
            .collect_vec();
        let mut population = vec![Chromosome::from_order(&by_area)];
        while population.len() < self.config.population_size {
            population.push(Chromosome::random(rects.len(), self.rotatable, &mut self.rng));
        }
        population
    }

    /// Fitness of every chromosome, decoded in parallel
    fn evaluate(&mut self, population: &[Chromosome]) -> Vec<f64> {
        self.n_decodes += population.len();
        let problem = self.problem;
        population
            .par_iter()
            .map(|c| RectPacker::new(problem).decode(c).fitness)
            .collect()
    }

    fn next_generation(&mut self, population: &[Chromosome], fitness: &[f64]) -> Vec<Chromosome> {
        let cfg = self.config;
        let mut next = (0..population.len())
            .sorted_by_key(|i| Reverse(OrderedFloat(fitness[*i])))
            .take(cfg.elite_count)
            .map(|i| population[i].clone())
            .collect_vec();

        while next.len() < cfg.population_size {
            let p1 = self.tournament(population, fitness);
            let p2 = self.tournament(population, fitness);
            let mut child = match self.rng.random_bool(cfg.crossover_rate) {
                true => p1.order_crossover(p2, &mut self.rng),
                false => p1.clone(),
            };
            if self.rng.random_bool(cfg.mutation_rate) {
                child.swap_mutation(&mut self.rng);
            }
            if self.rotatable && self.rng.random_bool(cfg.flip_rate) {
                child.flip_mutation(&mut self.rng);
            }
            debug_assert!(child.is_valid());
            next.push(child);
        }
        next
    }

    /// Fittest of `tournament_size` randomly drawn chromosomes
    fn tournament<'p>(&mut self, population: &'p [Chromosome], fitness: &[f64]) -> &'p Chromosome {
        let n = population.len();
        let winner = (0..self.config.tournament_size)
            .map(|_| self.rng.random_range(0..n))
            .max_by_key(|i| OrderedFloat(fitness[*i]))
            .unwrap_or(0);
        &population[winner]
    }
}

/// Best chromosome of a population, the first one on ties
fn fittest(population: &[Chromosome], fitness: &[f64]) -> (Chromosome, f64) {
    let i = (0..population.len())
        .rev()
        .max_by_key(|i| OrderedFloat(fitness[*i]))
        .unwrap_or(0);
    (population[i].clone(), fitness.get(i).copied().unwrap_or(0.0))
}
