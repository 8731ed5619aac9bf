use serde::Serialize;

use super::{VisualParameters, camera::Bounds};
use crate::{ItemIndex, pipeline::SortResult, routing::cosine_similarity};

/// Link lines are drawn thinner than the route.
const LINK_WIDTH_FACTOR: f64 = 0.5;

/// One drawable layer, rebuilt from the result and the visual parameters.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Layer {
    Points(PointLayer),
    Path(PathLayer),
    Labels(LabelLayer),
    Links(LinkLayer),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PointLayer {
    pub radius: f64,
    pub points: Vec<PointMark>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PointMark {
    pub index: ItemIndex,
    pub position: [f64; 2],
    /// Position in the visiting order, when the item was routed.
    pub rank: Option<usize>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PathLayer {
    pub width: f64,
    pub segments: Vec<PathSegment>,
}

/// Hop between consecutive items of the order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PathSegment {
    pub from: ItemIndex,
    pub to: ItemIndex,
    pub source: [f64; 2],
    pub target: [f64; 2],
    pub similarity: f32,
    /// Below the similarity threshold.
    pub weak: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LabelLayer {
    pub size: f64,
    pub labels: Vec<Label>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Label {
    pub index: ItemIndex,
    pub text: String,
    pub position: [f64; 2],
    pub rank: Option<usize>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LinkLayer {
    pub width: f64,
    pub links: Vec<Link>,
}

/// Pair of items at least as similar as the threshold, routed next to each
/// other or not.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Link {
    pub a: ItemIndex,
    pub b: ItemIndex,
    pub source: [f64; 2],
    pub target: [f64; 2],
    pub similarity: f32,
}

/// Builds the visible layers. Pure: depends only on its arguments and never
/// on camera state.
pub fn derive_layers(result: &SortResult, params: &VisualParameters) -> Vec<Layer> {
    let bounds = Bounds::from_points(&result.coordinates);
    let positions: Vec<[f64; 2]> = result
        .coordinates
        .iter()
        .map(|&point| bounds.normalize(point))
        .collect();

    let mut ranks = vec![None; positions.len()];
    for (rank, &index) in result.order.iter().enumerate() {
        if let Some(slot) = ranks.get_mut(index) {
            *slot = Some(rank);
        }
    }

    let mut layers = Vec::with_capacity(4);
    if params.show_links {
        layers.push(Layer::Links(links(result, &positions, params)));
    }
    if params.show_path {
        layers.push(Layer::Path(path(result, &positions, params)));
    }
    if params.show_points {
        layers.push(Layer::Points(PointLayer {
            radius: params.radius,
            points: positions
                .iter()
                .enumerate()
                .map(|(index, &position)| PointMark {
                    index,
                    position,
                    rank: ranks[index],
                })
                .collect(),
        }));
    }
    if params.show_labels {
        layers.push(Layer::Labels(LabelLayer {
            size: params.label_size,
            labels: positions
                .iter()
                .zip(&result.items)
                .enumerate()
                .map(|(index, (&position, text))| Label {
                    index,
                    text: text.clone(),
                    position,
                    rank: ranks[index],
                })
                .collect(),
        }));
    }
    layers
}

fn similarity(result: &SortResult, a: ItemIndex, b: ItemIndex) -> f32 {
    match (result.embeddings.get(a), result.embeddings.get(b)) {
        (Some(a), Some(b)) => cosine_similarity(a, b),
        _ => 0.0,
    }
}

fn path(result: &SortResult, positions: &[[f64; 2]], params: &VisualParameters) -> PathLayer {
    let segments = result
        .order
        .windows(2)
        .filter_map(|pair| {
            let (from, to) = (pair[0], pair[1]);
            let similarity = similarity(result, from, to);
            Some(PathSegment {
                from,
                to,
                source: *positions.get(from)?,
                target: *positions.get(to)?,
                similarity,
                weak: similarity < params.similarity_threshold,
            })
        })
        .collect();

    PathLayer {
        width: params.line_width,
        segments,
    }
}

fn links(result: &SortResult, positions: &[[f64; 2]], params: &VisualParameters) -> LinkLayer {
    let mut links = Vec::new();
    for a in 0..positions.len() {
        for b in a + 1..positions.len() {
            let similarity = similarity(result, a, b);
            if similarity >= params.similarity_threshold {
                links.push(Link {
                    a,
                    b,
                    source: positions[a],
                    target: positions[b],
                    similarity,
                });
            }
        }
    }

    LinkLayer {
        width: params.line_width * LINK_WIDTH_FACTOR,
        links,
    }
}

#[cfg(test)]
mod tests {
    use super::{Layer, derive_layers};
    use crate::{pipeline::SortResult, view::VisualParameters};

    fn result() -> SortResult {
        SortResult {
            order: vec![0, 2, 1],
            embeddings: vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 0.1]],
            coordinates: vec![[0.0, 0.0], [10.0, 10.0], [1.0, 0.0]],
            items: vec!["Cat".to_string(), "Car".to_string(), "Dog".to_string()],
        }
    }

    fn path_of(layers: &[Layer]) -> &super::PathLayer {
        layers
            .iter()
            .find_map(|layer| match layer {
                Layer::Path(path) => Some(path),
                _ => None,
            })
            .expect("path layer")
    }

    #[test]
    fn path_follows_the_order_and_flags_weak_hops() {
        let layers = derive_layers(&result(), &VisualParameters::default());
        let path = path_of(&layers);

        let hops: Vec<(usize, usize)> = path.segments.iter().map(|s| (s.from, s.to)).collect();
        assert_eq!(hops, vec![(0, 2), (2, 1)]);
        assert!(!path.segments[0].weak);
        assert!(path.segments[1].weak);
        assert!(path.segments[0].similarity > 0.99);
    }

    #[test]
    fn toggles_hide_layers_and_links_respect_the_threshold() {
        let params = VisualParameters::default()
            .with_show_links(true)
            .with_show_labels(false)
            .with_similarity_threshold(0.9_f32);
        let layers = derive_layers(&result(), &params);

        assert!(!layers.iter().any(|layer| matches!(layer, Layer::Labels(_))));
        let links = layers
            .iter()
            .find_map(|layer| match layer {
                Layer::Links(links) => Some(links),
                _ => None,
            })
            .expect("links layer");
        let pairs: Vec<(usize, usize)> = links.links.iter().map(|l| (l.a, l.b)).collect();
        assert_eq!(pairs, vec![(0, 2)]);
    }

    #[test]
    fn labels_carry_text_and_route_rank() {
        let layers = derive_layers(&result(), &VisualParameters::default());
        let labels = layers
            .iter()
            .find_map(|layer| match layer {
                Layer::Labels(labels) => Some(labels),
                _ => None,
            })
            .expect("labels layer");

        assert_eq!(labels.labels[1].text, "Car");
        assert_eq!(labels.labels[1].rank, Some(2));
        assert_eq!(labels.labels[2].rank, Some(1));
    }

    #[test]
    fn radius_changes_leave_positions_alone() {
        let small = derive_layers(&result(), &VisualParameters::default());
        let large = derive_layers(&result(), &VisualParameters::default().with_radius(20.0));

        assert_eq!(path_of(&small), path_of(&large));
        let radius = |layers: &[Layer]| {
            layers.iter().find_map(|layer| match layer {
                Layer::Points(points) => Some(points.radius),
                _ => None,
            })
        };
        assert_eq!(radius(&large), Some(20.0));
        assert_ne!(radius(&small), radius(&large));
    }
}
