use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result, codec::LocationCodec};

const MIN_ITEMS: usize = 2;
const ANCHOR_INDEX: usize = 0;
const JOB_ID_PREFIX: &str = "item_";
const VEHICLE_TYPE_ID: &str = "semantic_vehicle";
const UNIT_DEMAND: i32 = 1;

/// Geographic-shaped coordinate understood by the routing solver.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Bitwise identity, used when locations are deduplicated.
    pub(crate) fn key(&self) -> (u64, u64) {
        (self.lat.to_bits(), self.lng.to_bits())
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lat = ryu::Buffer::new();
        let mut lng = ryu::Buffer::new();
        write!(f, "{},{}", lat.format(self.lat), lng.format(self.lng))
    }
}

/// Routing problem in the solver's job/fleet shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    pub plan: Plan,
    pub fleet: Fleet,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub jobs: Vec<Job>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub deliveries: Vec<JobTask>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobTask {
    pub places: Vec<JobPlace>,
    pub demand: Vec<i32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobPlace {
    pub location: Location,
    pub duration: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Fleet {
    pub vehicles: Vec<VehicleType>,
    pub profiles: Vec<MatrixProfile>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleType {
    pub type_id: String,
    pub vehicle_ids: Vec<String>,
    pub profile: VehicleProfile,
    pub costs: VehicleCosts,
    pub shifts: Vec<VehicleShift>,
    pub capacity: Vec<i32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VehicleProfile {
    pub matrix: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VehicleCosts {
    pub fixed: f64,
    pub distance: f64,
    pub time: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VehicleShift {
    pub start: ShiftPlace,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<ShiftPlace>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShiftPlace {
    pub location: Location,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatrixProfile {
    pub name: String,
}

impl Problem {
    /// Every job place location, in declaration order.
    pub fn job_locations(&self) -> impl Iterator<Item = &Location> {
        self.plan
            .jobs
            .iter()
            .flat_map(|job| job.deliveries.iter())
            .flat_map(|task| task.places.iter())
            .map(|place| &place.location)
    }

    /// Every shift start (and end, when present), in fleet order.
    pub fn shift_locations(&self) -> impl Iterator<Item = &Location> {
        self.fleet
            .vehicles
            .iter()
            .flat_map(|vehicle| vehicle.shifts.iter())
            .flat_map(|shift| {
                std::iter::once(&shift.start.location)
                    .chain(shift.end.as_ref().map(|end| &end.location))
            })
    }

    /// Where the first vehicle's first shift begins.
    pub fn start_location(&self) -> Option<&Location> {
        self.fleet
            .vehicles
            .first()
            .and_then(|vehicle| vehicle.shifts.first())
            .map(|shift| &shift.start.location)
    }
}

/// Turns an ordered item list into a single-vehicle routing problem: item 0
/// is where the shift starts, every other item is one job.
#[derive(Clone, Debug)]
pub struct ProblemAssembler {
    codec: LocationCodec,
    profile: String,
}

impl ProblemAssembler {
    pub fn new(codec: LocationCodec, profile: impl Into<String>) -> Self {
        Self {
            codec,
            profile: profile.into(),
        }
    }

    pub fn assemble<S: AsRef<str>>(&self, items: &[S]) -> Result<Problem> {
        let n = items.len();
        if n < MIN_ITEMS {
            return Err(Error::invalid_input(format!(
                "need at least {MIN_ITEMS} items to build a route, got {n}"
            )));
        }

        let jobs = (ANCHOR_INDEX + 1..n)
            .map(|index| -> Result<Job> {
                Ok(Job {
                    id: format!("{JOB_ID_PREFIX}{index}"),
                    deliveries: vec![JobTask {
                        places: vec![JobPlace {
                            location: self.codec.encode(index)?,
                            duration: 0.0,
                        }],
                        demand: vec![UNIT_DEMAND],
                    }],
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let capacity = i32::try_from(n)
            .map_err(|_| Error::invalid_input(format!("{n} items exceed vehicle capacity")))?;

        let vehicle = VehicleType {
            type_id: VEHICLE_TYPE_ID.to_string(),
            vehicle_ids: vec![format!("{VEHICLE_TYPE_ID}_1")],
            profile: VehicleProfile {
                matrix: self.profile.clone(),
            },
            costs: VehicleCosts {
                fixed: 0.0,
                distance: 1.0,
                time: 0.0,
            },
            shifts: vec![VehicleShift {
                start: ShiftPlace {
                    location: self.codec.encode(ANCHOR_INDEX)?,
                },
                end: None,
            }],
            capacity: vec![capacity],
        };

        log::debug!("assembler: built jobs={} anchor={ANCHOR_INDEX}", jobs.len());

        Ok(Problem {
            plan: Plan { jobs },
            fleet: Fleet {
                vehicles: vec![vehicle],
                profiles: vec![MatrixProfile {
                    name: self.profile.clone(),
                }],
            },
        })
    }
}
