use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    Embedding, ItemIndex,
    codec::LocationCodec,
    options::{DEFAULT_ALIGNMENT_PENALTY, DEFAULT_DISTANCE_SCALE},
    routing::Location,
};

/// Flattened, row-major square cost matrix for one routing profile.
///
/// Both layers hold the same values: only one cost dimension is meaningful
/// for semantic routing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingMatrix {
    pub profile: String,
    pub distances: Vec<i64>,
    pub travel_times: Vec<i64>,
}

impl RoutingMatrix {
    /// Side length, or `None` when the layers are not square or disagree.
    pub fn dimension(&self) -> Option<usize> {
        let len = self.distances.len();
        let side = (len as f64).sqrt().round() as usize;
        (side * side == len && self.travel_times.len() == len).then_some(side)
    }

    pub fn distance(&self, from: usize, to: usize) -> Option<i64> {
        let side = self.dimension()?;
        if from >= side || to >= side {
            return None;
        }
        self.distances.get(from * side + to).copied()
    }
}

/// Cosine similarity of two vectors. Zero-magnitude or mismatched input
/// yields `0.0`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        return 0.0;
    }
    (dot / denom) as f32
}

/// `1 - cosine_similarity`, clamped to `[0, 1]`. Identical vectors are `0`;
/// non-finite input is as far as it gets.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    if a == b {
        return 0.0;
    }
    let distance = 1.0 - cosine_similarity(a, b);
    if distance.is_nan() {
        return 1.0;
    }
    distance.clamp(0.0, 1.0)
}

/// Builds cost matrices in the solver's own location order.
#[derive(Clone, Debug)]
pub struct MatrixBuilder {
    codec: LocationCodec,
    scale: f64,
    penalty: i64,
}

impl MatrixBuilder {
    pub fn new(codec: LocationCodec) -> Self {
        Self {
            codec,
            scale: DEFAULT_DISTANCE_SCALE,
            penalty: DEFAULT_ALIGNMENT_PENALTY,
        }
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_penalty(mut self, penalty: i64) -> Self {
        self.penalty = penalty;
        self
    }

    /// Cell `(i, j)` is the cost between the items behind `locations[i]` and
    /// `locations[j]`. A location that does not resolve to an embedded item
    /// costs `penalty` in its whole row and column instead of failing the build.
    #[semtour_derive::timer("matrix.build")]
    pub fn build(
        &self,
        embeddings: &[Embedding],
        locations: &[Location],
        profile: &str,
    ) -> RoutingMatrix {
        let aligned: Vec<Option<ItemIndex>> = locations
            .iter()
            .map(|location| self.align(embeddings, location))
            .collect();
        let misaligned = aligned.iter().filter(|index| index.is_none()).count();

        let distances: Vec<i64> = aligned
            .par_iter()
            .map(|&from| {
                aligned
                    .iter()
                    .map(|&to| self.cost(embeddings, from, to))
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>()
            .concat();

        log::debug!(
            "matrix: built n={} cells={} penalties={misaligned}",
            locations.len(),
            distances.len()
        );

        RoutingMatrix {
            profile: profile.to_string(),
            travel_times: distances.clone(),
            distances,
        }
    }

    fn align(&self, embeddings: &[Embedding], location: &Location) -> Option<ItemIndex> {
        match self.codec.decode(location) {
            Ok(index) if index < embeddings.len() => Some(index),
            Ok(index) => {
                log::warn!(
                    "matrix: location={location} decodes to index={index} without an embedding (n={}); using penalty={}",
                    embeddings.len(),
                    self.penalty
                );
                None
            }
            Err(err) => {
                log::warn!(
                    "matrix: location={location} does not decode ({err}); using penalty={}",
                    self.penalty
                );
                None
            }
        }
    }

    fn cost(&self, embeddings: &[Embedding], from: Option<ItemIndex>, to: Option<ItemIndex>) -> i64 {
        match (from, to) {
            (Some(a), Some(b)) if a == b => 0,
            (Some(a), Some(b)) => {
                let distance = f64::from(cosine_distance(&embeddings[a], &embeddings[b]));
                (distance * self.scale).round() as i64
            }
            _ => self.penalty,
        }
    }
}
