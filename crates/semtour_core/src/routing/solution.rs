use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{Error, ItemIndex, Result, codec::LocationCodec, routing::Location};

/// Optimizer output: one tour per used vehicle.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    #[serde(default)]
    pub tours: Vec<Tour>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tour {
    pub vehicle_id: String,
    #[serde(default)]
    pub stops: Vec<Stop>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stop {
    pub location: Location,
    /// Job served at this stop; `None` for the departure stop.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
}

/// Recovers the visiting order of item indices from an optimizer solution.
#[derive(Clone, Copy, Debug)]
pub struct SolutionDecoder {
    codec: LocationCodec,
}

impl SolutionDecoder {
    pub fn new(codec: LocationCodec) -> Self {
        Self { codec }
    }

    /// Decodes stops in tour order, keeping the first visit of each item.
    pub fn decode(&self, solution: &Solution) -> Result<Vec<ItemIndex>> {
        let Some(first) = solution.tours.first() else {
            return Err(Error::EmptyTour);
        };
        if first.stops.is_empty() {
            return Err(Error::EmptyTour);
        }

        let mut seen = HashSet::new();
        let mut order = Vec::with_capacity(first.stops.len());
        for stop in &first.stops {
            let index = self.codec.decode(&stop.location)?;
            if seen.insert(index) {
                order.push(index);
            }
        }

        if order.len() < first.stops.len() {
            log::debug!(
                "decoder: dropped revisits stops={} unique={}",
                first.stops.len(),
                order.len()
            );
        }

        Ok(order)
    }
}
