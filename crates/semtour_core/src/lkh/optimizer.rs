use std::{
    collections::{HashMap, HashSet},
    fs,
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};

use super::{
    params::{DEFAULT_BASE_SEED, LkhParams},
    process::LkhProcess,
    tsplib::{OpenPathProblem, parse_tour},
};
use crate::{
    Error, Result,
    collab::{RouteOptimizer, Termination},
    routing::{Location, Problem, RoutingMatrix, Solution, Stop, Tour},
};

const PROBLEM_NAME: &str = "semtour";
const PROBLEM_FILE: &str = "problem.atsp";
const PAR_FILE: &str = "problem.par";
const TOUR_FILE: &str = "problem.tour";
/// Below this LKH is not worth spawning: the order is forced.
const MIN_LKH_NODES: usize = 3;
const FALLBACK_VEHICLE_ID: &str = "vehicle_1";

/// [`RouteOptimizer`] backed by an external LKH executable.
pub struct LkhOptimizer {
    process: LkhProcess,
    work_dir: PathBuf,
    base_seed: u64,
    solves: AtomicU64,
}

impl LkhOptimizer {
    /// Checks that `exe` exists and prepares `work_dir` for per-solve files.
    pub fn load(exe: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Result<Self> {
        let exe = exe.into();
        if !exe.is_file() {
            return Err(Error::initialization(format!(
                "LKH executable not found at {}",
                exe.display()
            )));
        }
        let work_dir = work_dir.into();
        fs::create_dir_all(&work_dir)?;

        log::info!("lkh: ready exe={} work_dir={}", exe.display(), work_dir.display());
        Ok(Self {
            process: LkhProcess::new(exe),
            work_dir,
            base_seed: DEFAULT_BASE_SEED,
            solves: AtomicU64::new(0),
        })
    }

    pub fn with_seed(mut self, base_seed: u64) -> Self {
        self.base_seed = base_seed;
        self
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    fn run_lkh(
        &self,
        matrix: &RoutingMatrix,
        n: usize,
        start: usize,
        termination: &Termination,
    ) -> Result<Vec<usize>> {
        let run_dir = RunDir::create(&self.work_dir, self.solves.fetch_add(1, Ordering::Relaxed))?;
        let problem_file = run_dir.path().join(PROBLEM_FILE);
        let par_file = run_dir.path().join(PAR_FILE);
        let tour_file = run_dir.path().join(TOUR_FILE);

        let problem = OpenPathProblem::new(PROBLEM_NAME, &matrix.distances, n, start)?;
        fs::write(&problem_file, problem.to_string())?;

        let params = LkhParams::new(problem_file, tour_file.clone(), termination, self.base_seed);
        fs::write(&par_file, params.to_string())?;

        log::debug!(
            "lkh.run: start n={n} seed={} max_trials={} time_limit_s={}",
            params.seed,
            params.max_trials,
            params.time_limit
        );
        self.process.run(
            &par_file,
            run_dir.path(),
            format!("LKH failed (n={n}, seed={})", params.seed),
        )?;

        if !tour_file.exists() {
            return Err(Error::invalid_data(
                "LKH finished but tour file was not created",
            ));
        }
        let tour = parse_tour(&fs::read_to_string(&tour_file)?)?;
        log::debug!("lkh.run: done n={n} tour_len={}", tour.len());
        Ok(tour)
    }
}

impl RouteOptimizer for LkhOptimizer {
    fn locations(&self, problem: &Problem) -> Result<Vec<Location>> {
        Ok(canonical_locations(problem))
    }

    #[semtour_derive::timer("lkh.solve")]
    fn solve(
        &self,
        problem: &Problem,
        matrices: &[RoutingMatrix],
        termination: &Termination,
    ) -> Result<Solution> {
        let locations = canonical_locations(problem);
        let n = locations.len();

        let profile = problem
            .fleet
            .vehicles
            .first()
            .map(|vehicle| vehicle.profile.matrix.as_str());
        let matrix = matrices
            .iter()
            .find(|matrix| Some(matrix.profile.as_str()) == profile)
            .or_else(|| matrices.first())
            .ok_or_else(|| Error::invalid_input("no routing matrix supplied"))?;
        if matrix.dimension() != Some(n) {
            return Err(Error::invalid_input(format!(
                "matrix has {} cells but the problem has {n} locations",
                matrix.distances.len()
            )));
        }

        let start_location = problem
            .start_location()
            .ok_or_else(|| Error::invalid_input("problem has no shift start"))?;
        let start = locations
            .iter()
            .position(|location| location.key() == start_location.key())
            .ok_or_else(|| Error::invalid_input("shift start is not a known location"))?;

        let tour = if n < MIN_LKH_NODES {
            log::debug!("lkh: trivial n={n}, skipping solver");
            (0..n).collect()
        } else {
            self.run_lkh(matrix, n, start, termination)?
        };

        let order = rotate_to_start(tour, start, n)?;
        Ok(solution_from_order(problem, &locations, &order))
    }
}

/// Unique locations as LKH indexes them: job places first, shift starts last.
fn canonical_locations(problem: &Problem) -> Vec<Location> {
    let mut seen = HashSet::new();
    problem
        .job_locations()
        .chain(problem.shift_locations())
        .copied()
        .filter(|location| seen.insert(location.key()))
        .collect()
}

/// Checks `tour` visits each of `n` nodes once and rotates it to begin at `start`.
fn rotate_to_start(mut tour: Vec<usize>, start: usize, n: usize) -> Result<Vec<usize>> {
    let mut seen = vec![false; n];
    for &node in &tour {
        match seen.get_mut(node) {
            Some(visited) if !*visited => *visited = true,
            Some(_) => {
                return Err(Error::invalid_data(format!("tour visits node {node} twice")));
            }
            None => {
                return Err(Error::invalid_data(format!(
                    "tour node {node} is outside a {n} node problem"
                )));
            }
        }
    }
    if tour.len() != n {
        return Err(Error::invalid_data(format!(
            "tour has {} nodes, expected {n}",
            tour.len()
        )));
    }

    let offset = tour
        .iter()
        .position(|&node| node == start)
        .ok_or_else(|| Error::invalid_data("tour does not visit the start"))?;
    tour.rotate_left(offset);
    Ok(tour)
}

fn solution_from_order(problem: &Problem, locations: &[Location], order: &[usize]) -> Solution {
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

    let stops = order
        .iter()
        .map(|&node| {
            let location = locations[node];
            Stop {
                location,
                job_id: job_ids.get(&location.key()).map(|id| id.to_string()),
            }
        })
        .collect();

    let vehicle_id = problem
        .fleet
        .vehicles
        .first()
        .and_then(|vehicle| vehicle.vehicle_ids.first())
        .map_or_else(|| FALLBACK_VEHICLE_ID.to_string(), Clone::clone);

    Solution {
        tours: vec![Tour { vehicle_id, stops }],
    }
}

/// Per-solve scratch directory, removed on drop.
struct RunDir(PathBuf);

impl RunDir {
    fn create(root: &Path, solve: u64) -> Result<Self> {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos())
            .unwrap_or_default();
        let path = root.join(format!("run-{}-{solve}-{nanos}", std::process::id()));
        fs::create_dir_all(&path)?;
        Ok(Self(path))
    }

    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for RunDir {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_dir_all(&self.0) {
            log::warn!("lkh: failed to remove {}: {err}", self.0.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        fs,
        path::PathBuf,
        time::{SystemTime, UNIX_EPOCH},
    };

    use super::{LkhOptimizer, canonical_locations, rotate_to_start};
    use crate::{
        Error,
        codec::LocationCodec,
        collab::{RouteOptimizer, Termination},
        routing::{MatrixBuilder, ProblemAssembler, SolutionDecoder},
    };

    const TERMINATION: Termination = Termination {
        max_time_secs: 1.0,
        max_generations: 10,
    };

    fn unique_temp_dir(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after epoch")
            .as_nanos();
        std::env::temp_dir().join(format!("semtour-lkh-tests-{name}-{nanos}"))
    }

    fn problem(n: usize) -> crate::routing::Problem {
        let items: Vec<String> = (0..n).map(|i| format!("item {i}")).collect();
        ProblemAssembler::new(LocationCodec::default(), "semantic")
            .assemble(&items)
            .expect("assemble")
    }

    fn embeddings(n: usize) -> Vec<Vec<f32>> {
        (0..n).map(|i| vec![1.0, i as f32]).collect()
    }

    #[test]
    fn canonical_locations_put_the_anchor_last() {
        let codec = LocationCodec::default();
        let locations = canonical_locations(&problem(4));
        let indices: Vec<usize> = locations
            .iter()
            .map(|location| codec.decode(location).expect("decode"))
            .collect();
        assert_eq!(indices, vec![1, 2, 3, 0]);
    }

    #[test]
    fn rotate_to_start_validates_the_permutation() {
        assert_eq!(rotate_to_start(vec![1, 2, 0], 2, 3).expect("rotate"), vec![2, 0, 1]);
        assert!(matches!(rotate_to_start(vec![1, 1, 0], 0, 3), Err(Error::InvalidData(_))));
        assert!(matches!(rotate_to_start(vec![1, 5, 0], 0, 3), Err(Error::InvalidData(_))));
        assert!(matches!(rotate_to_start(vec![1, 0], 0, 3), Err(Error::InvalidData(_))));
    }

    #[test]
    fn load_fails_without_an_executable() {
        let dir = unique_temp_dir("missing-exe");
        let err = LkhOptimizer::load(dir.join("LKH"), &dir)
            .err()
            .expect("missing exe should fail");
        assert!(matches!(err, Error::Initialization(_)));
    }

    #[test]
    fn two_locations_are_solved_without_spawning_lkh() {
        let dir = unique_temp_dir("trivial");
        fs::create_dir_all(&dir).expect("create temp dir");
        let exe = dir.join("LKH");
        fs::write(&exe, "not a real executable").expect("write fake exe");

        let codec = LocationCodec::default();
        let optimizer = LkhOptimizer::load(&exe, dir.join("work")).expect("load");
        let problem = problem(2);
        let locations = optimizer.locations(&problem).expect("locations");
        let matrix = MatrixBuilder::new(codec).build(&embeddings(2), &locations, "semantic");

        let solution = optimizer
            .solve(&problem, &[matrix], &TERMINATION)
            .expect("solve");
        let order = SolutionDecoder::new(codec).decode(&solution).expect("decode");
        assert_eq!(order, vec![0, 1]);
        assert_eq!(solution.tours[0].vehicle_id, "semantic_vehicle_1");
        assert_eq!(solution.tours[0].stops[1].job_id.as_deref(), Some("item_1"));

        fs::remove_dir_all(&dir).expect("cleanup temp dir");
    }

    #[test]
    fn solve_rejects_a_matrix_of_the_wrong_size() {
        let dir = unique_temp_dir("bad-matrix");
        fs::create_dir_all(&dir).expect("create temp dir");
        let exe = dir.join("LKH");
        fs::write(&exe, "").expect("write fake exe");

        let codec = LocationCodec::default();
        let optimizer = LkhOptimizer::load(&exe, dir.join("work")).expect("load");
        let problem = problem(3);
        let locations = optimizer.locations(&problem).expect("locations");
        let matrix = MatrixBuilder::new(codec).build(&embeddings(3), &locations[..2], "semantic");

        assert!(matches!(
            optimizer.solve(&problem, &[matrix], &TERMINATION),
            Err(Error::InvalidInput(_))
        ));
        fs::remove_dir_all(&dir).expect("cleanup temp dir");
    }

    #[cfg(unix)]
    #[test]
    fn solve_drives_an_lkh_executable_and_cleans_up() {
        use std::os::unix::fs::PermissionsExt;

        let dir = unique_temp_dir("scripted");
        fs::create_dir_all(&dir).expect("create temp dir");

        // Answers with job 2, anchor, job 1 in TSPLIB ids.
        let good = dir.join("lkh-good.sh");
        fs::write(
            &good,
            "#!/bin/sh\n\
             tour=$(sed -n 's/^OUTPUT_TOUR_FILE = //p' \"$1\")\n\
             printf 'TOUR_SECTION\\n2\\n3\\n1\\n-1\\nEOF\\n' > \"$tour\"\n",
        )
        .expect("write script");
        let bad = dir.join("lkh-bad.sh");
        fs::write(&bad, "#!/bin/sh\necho boom >&2\nexit 3\n").expect("write script");
        for script in [&good, &bad] {
            fs::set_permissions(script, fs::Permissions::from_mode(0o755)).expect("chmod");
        }

        let codec = LocationCodec::default();
        let problem = problem(3);

        let work = dir.join("work-good");
        let optimizer = LkhOptimizer::load(&good, &work).expect("load");
        let locations = optimizer.locations(&problem).expect("locations");
        let matrix = MatrixBuilder::new(codec).build(&embeddings(3), &locations, "semantic");
        let solution = optimizer
            .solve(&problem, std::slice::from_ref(&matrix), &TERMINATION)
            .expect("solve");
        let order = SolutionDecoder::new(codec).decode(&solution).expect("decode");
        assert_eq!(order, vec![0, 1, 2]);
        assert_eq!(fs::read_dir(&work).expect("read work dir").count(), 0);

        let optimizer = LkhOptimizer::load(&bad, dir.join("work-bad")).expect("load");
        let err = optimizer
            .solve(&problem, &[matrix], &TERMINATION)
            .expect_err("failing LKH");
        match err {
            Error::ProcessFailed { stderr, .. } => assert!(stderr.contains("boom")),
            other => panic!("expected ProcessFailed, got {other:?}"),
        }

        fs::remove_dir_all(&dir).expect("cleanup temp dir");
    }
}
