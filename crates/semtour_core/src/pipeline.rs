use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    Embedding, Error, ItemIndex, Point, Result,
    codec::LocationCodec,
    collab::{Collaborators, Termination},
    options::PipelineOptions,
    routing::{MatrixBuilder, ProblemAssembler, SolutionDecoder, cosine_distance},
};

const MIN_ITEMS: usize = 2;

/// Where a pipeline run currently is. Runs only ever move forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idle,
    Embedding,
    Projecting,
    AssemblingProblem,
    QueryingLocations,
    BuildingMatrix,
    Solving,
    Decoding,
    Done,
    Failed,
}

impl Stage {
    /// Progress line shown to the user when the stage starts.
    pub fn status_message(self) -> &'static str {
        match self {
            Stage::Idle => "Waiting",
            Stage::Embedding => "Generating embeddings...",
            Stage::Projecting => "Projecting embeddings to 2D...",
            Stage::AssemblingProblem => "Building routing problem...",
            Stage::QueryingLocations => "Querying solver locations...",
            Stage::BuildingMatrix => "Computing distance matrix...",
            Stage::Solving => "Solving route...",
            Stage::Decoding => "Decoding route...",
            Stage::Done => "Done",
            Stage::Failed => "Failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Done | Stage::Failed)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Embedding => "embedding",
            Stage::Projecting => "projecting",
            Stage::AssemblingProblem => "assembling problem",
            Stage::QueryingLocations => "querying locations",
            Stage::BuildingMatrix => "building matrix",
            Stage::Solving => "solving",
            Stage::Decoding => "decoding",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Receives a progress update before each stage begins.
pub trait ProgressSink {
    fn status(&mut self, stage: Stage, message: &str);
}

impl<F> ProgressSink for F
where
    F: FnMut(Stage, &str),
{
    fn status(&mut self, stage: Stage, message: &str) {
        self(stage, message)
    }
}

/// Terminal payload of a successful run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SortResult {
    /// Visiting order of item indices; starts at item 0.
    pub order: Vec<ItemIndex>,
    pub embeddings: Vec<Embedding>,
    pub coordinates: Vec<Point>,
    pub items: Vec<String>,
}

impl SortResult {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn ordered_items(&self) -> impl Iterator<Item = &str> {
        self.order
            .iter()
            .filter_map(|&index| self.items.get(index).map(String::as_str))
    }
}

/// Semantic cost of consecutive hops along an order.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OrderMetrics {
    pub hops: usize,
    pub total: f64,
    pub longest: f64,
    pub average: f64,
}

impl OrderMetrics {
    pub fn measure(order: &[ItemIndex], embeddings: &[Embedding]) -> Self {
        let distances: Vec<f64> = order
            .windows(2)
            .filter_map(|pair| {
                let from = embeddings.get(pair[0])?;
                let to = embeddings.get(pair[1])?;
                Some(f64::from(cosine_distance(from, to)))
            })
            .collect();

        if distances.is_empty() {
            log::info!("metrics: n < 2 so there's nothing to report");
            return Self::default();
        }

        let hops = distances.len();
        let total: f64 = distances.iter().sum();
        let longest = distances.iter().copied().fold(0.0_f64, f64::max);
        let average = total / hops as f64;

        log::info!(
            "metrics: n={} hops={hops} total={total:.4} longest={longest:.4} avg={average:.4}",
            order.len()
        );

        Self {
            hops,
            total,
            longest,
            average,
        }
    }
}

/// One sort run: embed, project, route, decode. Single use.
pub struct Pipeline {
    options: PipelineOptions,
    stage: Stage,
}

impl Pipeline {
    pub fn new(options: PipelineOptions) -> Self {
        Self {
            options,
            stage: Stage::Idle,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Runs every stage in order. On failure the pipeline ends in
    /// [`Stage::Failed`] and the error names the stage that broke.
    #[semtour_derive::timer("pipeline.run")]
    pub fn run(
        &mut self,
        items: Vec<String>,
        collaborators: &mut Collaborators,
        progress: &mut dyn ProgressSink,
    ) -> Result<SortResult> {
        if self.stage != Stage::Idle {
            return Err(Error::other(format!(
                "pipeline already used (stage={})",
                self.stage
            )));
        }
        if items.len() < MIN_ITEMS {
            self.stage = Stage::Failed;
            return Err(Error::validation(format!(
                "need at least {MIN_ITEMS} items, got {}",
                items.len()
            )));
        }

        log::info!("pipeline: start n={}", items.len());
        match self.execute(items, collaborators, progress) {
            Ok(result) => {
                self.stage = Stage::Done;
                log::info!("pipeline: done n={}", result.order.len());
                Ok(result)
            }
            Err(err) => {
                let failed_at = self.stage;
                self.stage = Stage::Failed;
                log::warn!("pipeline: failed stage={failed_at} err={err}");
                Err(err.in_stage(failed_at))
            }
        }
    }

    fn enter(&mut self, stage: Stage, progress: &mut dyn ProgressSink) {
        self.stage = stage;
        log::debug!("pipeline: stage={stage}");
        progress.status(stage, stage.status_message());
    }

    fn execute(
        &mut self,
        items: Vec<String>,
        collaborators: &mut Collaborators,
        progress: &mut dyn ProgressSink,
    ) -> Result<SortResult> {
        let n = items.len();

        self.enter(Stage::Embedding, progress);
        let embeddings = collaborators.embedder.embed(&items)?;
        check_count("embedder", "vectors", embeddings.len(), n)?;
        check_dimensions(&embeddings)?;

        self.enter(Stage::Projecting, progress);
        let coordinates = collaborators.projector.project(&embeddings)?;
        check_count("projector", "points", coordinates.len(), n)?;

        self.enter(Stage::AssemblingProblem, progress);
        let codec = LocationCodec::for_item_count(self.options.codec_base, n)?;
        let problem = ProblemAssembler::new(codec, &self.options.profile).assemble(&items)?;

        self.enter(Stage::QueryingLocations, progress);
        let locations = collaborators.optimizer.locations(&problem)?;
        if locations.is_empty() {
            return Err(Error::invalid_data("optimizer reported no locations"));
        }
        log::debug!("pipeline: locations n={}", locations.len());

        self.enter(Stage::BuildingMatrix, progress);
        let matrix = MatrixBuilder::new(codec)
            .with_scale(self.options.distance_scale)
            .with_penalty(self.options.alignment_penalty)
            .build(&embeddings, &locations, &self.options.profile);

        self.enter(Stage::Solving, progress);
        let termination = Termination {
            max_time_secs: self.options.max_time_secs,
            max_generations: self.options.max_generations,
        };
        let solution =
            collaborators
                .optimizer
                .solve(&problem, std::slice::from_ref(&matrix), &termination)?;

        self.enter(Stage::Decoding, progress);
        let decoded = SolutionDecoder::new(codec).decode(&solution)?;
        let order = known_items(decoded, n);
        if order.len() < n {
            log::warn!("pipeline: unassigned items n={} ordered={}", n, order.len());
        }
        let metrics = OrderMetrics::measure(&order, &embeddings);
        log::debug!(
            "pipeline: decoded ordered={} total={:.4} longest={:.4}",
            order.len(),
            metrics.total,
            metrics.longest
        );

        Ok(SortResult {
            order,
            embeddings,
            coordinates,
            items,
        })
    }
}

/// Drops decoded indices that name no input item. They come from locations
/// the matrix already charged the alignment penalty for.
fn known_items(decoded: Vec<ItemIndex>, n: usize) -> Vec<ItemIndex> {
    let (order, stray): (Vec<ItemIndex>, Vec<ItemIndex>) =
        decoded.into_iter().partition(|&index| index < n);
    if !stray.is_empty() {
        log::warn!("pipeline: dropped stops without an item n={n} stray={stray:?}");
    }
    order
}

fn check_count(collaborator: &str, what: &str, got: usize, expected: usize) -> Result<()> {
    if got != expected {
        return Err(Error::invalid_data(format!(
            "{collaborator} returned {got} {what} for {expected} items"
        )));
    }
    Ok(())
}

fn check_dimensions(embeddings: &[Embedding]) -> Result<()> {
    let Some(first) = embeddings.first() else {
        return Ok(());
    };
    let dimension = first.len();
    if dimension == 0 {
        return Err(Error::invalid_data("embedder returned empty vectors"));
    }
    if let Some(position) = embeddings.iter().position(|vector| vector.len() != dimension) {
        return Err(Error::invalid_data(format!(
            "embedding {position} has dimension {} but expected {dimension}",
            embeddings[position].len()
        )));
    }
    if let Some(position) = embeddings
        .iter()
        .position(|vector| vector.iter().any(|value| !value.is_finite()))
    {
        return Err(Error::invalid_data(format!(
            "embedding {position} has non-finite components"
        )));
    }
    Ok(())
}
