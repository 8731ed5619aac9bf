//! The routing-side data model and the three bridges between item indices
//! and the solver's view of the world: problem assembly, cost matrices and
//! solution decoding.

mod matrix;
mod problem;
mod solution;

pub use matrix::{MatrixBuilder, RoutingMatrix, cosine_distance, cosine_similarity};
pub use problem::{
    Fleet, Job, JobPlace, JobTask, Location, MatrixProfile, Plan, Problem, ProblemAssembler,
    ShiftPlace, VehicleCosts, VehicleProfile, VehicleShift, VehicleType,
};
pub use solution::{Solution, SolutionDecoder, Stop, Tour};
