use std::{
    fmt::{self, Display, Formatter},
    path::PathBuf,
};

use rand::{Rng, SeedableRng, rngs::StdRng};

use super::tsplib::SpecWriter;
use crate::collab::Termination;

const RUNS: usize = 1;
const TRACE_LEVEL: usize = 0;
const MIN_MAX_TRIALS: usize = 1;
pub(crate) const DEFAULT_BASE_SEED: u64 = 12_345;

/// One LKH parameter file.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct LkhParams {
    pub(crate) problem_file: PathBuf,
    pub(crate) tour_file: PathBuf,
    pub(crate) runs: usize,
    pub(crate) max_trials: usize,
    /// Seconds; LKH accepts fractions.
    pub(crate) time_limit: f64,
    pub(crate) seed: u64,
    pub(crate) trace_level: usize,
}

impl LkhParams {
    pub(crate) fn new(
        problem_file: PathBuf,
        tour_file: PathBuf,
        termination: &Termination,
        base_seed: u64,
    ) -> Self {
        Self {
            problem_file,
            tour_file,
            runs: RUNS,
            max_trials: termination.max_generations.max(MIN_MAX_TRIALS),
            time_limit: termination.max_time_secs,
            seed: derive_seed(base_seed),
            trace_level: TRACE_LEVEL,
        }
    }
}

/// Deterministic per-solve seed from the optimizer's base seed.
fn derive_seed(base_seed: u64) -> u64 {
    // LKH rejects SEED = 0 as "random".
    StdRng::seed_from_u64(base_seed).random_range(1..=u64::from(u32::MAX))
}

impl Display for LkhParams {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut writer = SpecWriter::new(f);

        writer.kv_eq("PROBLEM_FILE", self.problem_file.display())?;
        writer.kv_eq("OUTPUT_TOUR_FILE", self.tour_file.display())?;
        writer.kv_eq("RUNS", self.runs)?;
        writer.kv_eq("MAX_TRIALS", self.max_trials)?;
        writer.kv_eq("TIME_LIMIT", ryu::Buffer::new().format(self.time_limit))?;
        writer.kv_eq("SEED", self.seed)?;
        writer.kv_eq("TRACE_LEVEL", self.trace_level)
    }
}
