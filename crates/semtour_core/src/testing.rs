//! Stand-in collaborators for unit tests.

use std::collections::{HashMap, HashSet};

use crate::{
    Embedding, Error, Point, Result,
    collab::{Embedder, Projector, RouteOptimizer, Termination},
    routing::{Location, Problem, RoutingMatrix, Solution, Stop, Tour},
};

/// Looks each text up in a fixed table; unknown texts are an error.
pub(crate) fn table_embedder(table: &[(&str, Embedding)]) -> impl Embedder + use<> {
    let table: HashMap<String, Embedding> = table
        .iter()
        .map(|(text, vector)| (text.to_string(), vector.clone()))
        .collect();
    move |texts: &[String]| -> Result<Vec<Embedding>> {
        texts
            .iter()
            .map(|text| {
                table
                    .get(text)
                    .cloned()
                    .ok_or_else(|| Error::invalid_input(format!("no vector for {text:?}")))
            })
            .collect()
    }
}

/// Two well separated clusters: animals and vehicles.
pub(crate) fn animals_and_vehicles() -> impl Embedder {
    table_embedder(&[
        ("Cat", vec![1.0, 0.1, 0.0]),
        ("Dog", vec![0.95, 0.2, 0.05]),
        ("Car", vec![0.1, 1.0, 0.0]),
        ("Truck", vec![0.15, 0.9, 0.1]),
    ])
}

pub(crate) fn failing_embedder(message: &'static str) -> impl Embedder {
    move |_: &[String]| -> Result<Vec<Embedding>> { Err(Error::other(message)) }
}

/// Lays items out by index.
pub(crate) fn index_projector() -> impl Projector {
    |vectors: &[Embedding]| -> Result<Vec<Point>> {
        Ok((0..vectors.len())
            .map(|index| [index as f32, (index % 3) as f32])
            .collect())
    }
}

pub(crate) fn panicking_projector() -> impl Projector {
    |_: &[Embedding]| -> Result<Vec<Point>> { panic!("projection blew up") }
}

/// Job places in reverse declaration order followed by shift starts, so
/// solver order never matches item order.
fn solver_locations(problem: &Problem) -> Vec<Location> {
    let mut jobs: Vec<Location> = problem.job_locations().copied().collect();
    jobs.reverse();

    let mut seen = HashSet::new();
    jobs.into_iter()
        .chain(problem.shift_locations().copied())
        .filter(|location| seen.insert(location.key()))
        .collect()
}

/// Tries every open path from the shift start. Only for tiny problems.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct ExhaustiveOptimizer;

impl RouteOptimizer for ExhaustiveOptimizer {
    fn locations(&self, problem: &Problem) -> Result<Vec<Location>> {
        Ok(solver_locations(problem))
    }

    fn solve(
        &self,
        problem: &Problem,
        matrices: &[RoutingMatrix],
        _termination: &Termination,
    ) -> Result<Solution> {
        let matrix = matrices
            .first()
            .ok_or_else(|| Error::invalid_input("no matrix"))?;
        let locations = solver_locations(problem);
        if matrix.dimension() != Some(locations.len()) {
            return Err(Error::invalid_input("matrix does not match locations"));
        }
        let start = problem
            .start_location()
            .and_then(|start| locations.iter().position(|l| l.key() == start.key()))
            .ok_or_else(|| Error::invalid_input("no shift start"))?;

        let mut remaining: Vec<usize> = (0..locations.len()).filter(|&i| i != start).collect();
        let mut path = vec![start];
        let mut best = (i64::MAX, Vec::new());
        search(matrix, &mut remaining, &mut path, 0, &mut best);

        let job_ids: HashMap<(u64, u64), &str> = problem
            .plan
            .jobs
            .iter()
            .flat_map(|job| {
                job.deliveries
                    .iter()
                    .flat_map(|task| task.places.iter())
                    .map(move |place| (place.location.key(), job.id.as_str()))
            })
            .collect();

        let stops = best
            .1
            .iter()
            .map(|&index| Stop {
                location: locations[index],
                job_id: job_ids
                    .get(&locations[index].key())
                    .map(|id| id.to_string()),
            })
            .collect();

        Ok(Solution {
            tours: vec![Tour {
                vehicle_id: "semantic_vehicle_1".to_string(),
                stops,
            }],
        })
    }
}

fn search(
    matrix: &RoutingMatrix,
    remaining: &mut Vec<usize>,
    path: &mut Vec<usize>,
    cost: i64,
    best: &mut (i64, Vec<usize>),
) {
    if cost >= best.0 {
        return;
    }
    if remaining.is_empty() {
        *best = (cost, path.clone());
        return;
    }
    let Some(&current) = path.last() else {
        return;
    };
    for slot in 0..remaining.len() {
        let next = remaining.swap_remove(slot);
        let step = matrix.distance(current, next).unwrap_or(i64::MAX / 4);
        path.push(next);
        search(matrix, remaining, path, cost + step, best);
        path.pop();
        remaining.push(next);
        let last = remaining.len() - 1;
        remaining.swap(slot, last);
    }
}

/// Answers every problem with an empty solution.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct EmptyOptimizer;

impl RouteOptimizer for EmptyOptimizer {
    fn locations(&self, problem: &Problem) -> Result<Vec<Location>> {
        Ok(solver_locations(problem))
    }

    fn solve(&self, _: &Problem, _: &[RoutingMatrix], _: &Termination) -> Result<Solution> {
        Ok(Solution::default())
    }
}

/// Reports one extra location that no item encodes to and routes through it
/// right after the start.
#[derive(Clone, Copy, Debug)]
pub(crate) struct StrayLocationOptimizer {
    pub(crate) stray: Location,
}

impl StrayLocationOptimizer {
    fn with_stray(&self, problem: &Problem) -> Vec<Location> {
        let mut locations = solver_locations(problem);
        locations.push(self.stray);
        locations
    }
}

impl RouteOptimizer for StrayLocationOptimizer {
    fn locations(&self, problem: &Problem) -> Result<Vec<Location>> {
        Ok(self.with_stray(problem))
    }

    fn solve(&self, problem: &Problem, _: &[RoutingMatrix], _: &Termination) -> Result<Solution> {
        let start = problem
            .start_location()
            .copied()
            .ok_or_else(|| Error::invalid_input("no shift start"))?;
        let rest = solver_locations(problem)
            .into_iter()
            .filter(|location| location.key() != start.key());
        let stops = [start, self.stray]
            .into_iter()
            .chain(rest)
            .map(|location| Stop {
                location,
                job_id: None,
            })
            .collect();

        Ok(Solution {
            tours: vec![Tour {
                vehicle_id: "semantic_vehicle_1".to_string(),
                stops,
            }],
        })
    }
}
