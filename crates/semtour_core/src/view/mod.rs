//! Interactive view state over a finished sort: visual parameters, camera
//! and the layers a renderer draws.

mod camera;
mod layers;

use std::sync::Arc;

use semtour_derive::WithMethods;
use serde::{Deserialize, Serialize};

pub use camera::{
    Bounds, CameraState, CameraTransition, DEFAULT_ZOOM, FOCUS_TRANSITION_MS, FOCUS_ZOOM,
    SCENE_SIZE,
};
pub use layers::{
    Label, LabelLayer, Layer, Link, LinkLayer, PathLayer, PathSegment, PointLayer, PointMark,
    derive_layers,
};

use crate::{Error, ItemIndex, Result, pipeline::SortResult};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, WithMethods)]
#[serde(default)]
pub struct VisualParameters {
    pub radius: f64,
    pub line_width: f64,
    pub label_size: f64,
    /// Hops below this cosine similarity are drawn as weak; pairs at or
    /// above it get a link.
    pub similarity_threshold: f32,
    pub show_points: bool,
    pub show_path: bool,
    pub show_labels: bool,
    pub show_links: bool,
}

impl Default for VisualParameters {
    fn default() -> Self {
        Self {
            radius: 6.0,
            line_width: 2.0,
            label_size: 12.0,
            similarity_threshold: 0.5,
            show_points: true,
            show_path: true,
            show_labels: true,
            show_links: false,
        }
    }
}

/// What the user is looking at. Parameter edits only restyle; the camera is
/// reframed only when a different result is installed.
#[derive(Clone, Debug)]
pub struct ViewState {
    result: Arc<SortResult>,
    params: VisualParameters,
    bounds: Bounds,
    camera: CameraState,
}

impl ViewState {
    pub fn new(result: Arc<SortResult>) -> Self {
        Self::with_params(result, VisualParameters::default())
    }

    pub fn with_params(result: Arc<SortResult>, params: VisualParameters) -> Self {
        let bounds = Bounds::from_points(&result.coordinates);
        Self {
            camera: CameraState::framing(&bounds),
            bounds,
            params,
            result,
        }
    }

    /// Swaps in `result`. Returns whether the camera was reframed, which
    /// happens only when `result` is a different allocation.
    pub fn install(&mut self, result: Arc<SortResult>) -> bool {
        if Arc::ptr_eq(&self.result, &result) {
            return false;
        }
        self.bounds = Bounds::from_points(&result.coordinates);
        self.camera = CameraState::framing(&self.bounds);
        self.result = result;
        log::debug!("view: installed result n={}", self.result.len());
        true
    }

    pub fn result(&self) -> &Arc<SortResult> {
        &self.result
    }

    pub fn params(&self) -> &VisualParameters {
        &self.params
    }

    pub fn set_params(&mut self, params: VisualParameters) {
        self.params = params;
    }

    pub fn update_params(&mut self, update: impl FnOnce(&mut VisualParameters)) {
        update(&mut self.params);
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    pub fn camera(&self) -> &CameraState {
        &self.camera
    }

    pub fn layers(&self) -> Vec<Layer> {
        derive_layers(&self.result, &self.params)
    }

    /// Points the camera at one item using the framing bounds.
    pub fn focus_item(&mut self, index: ItemIndex) -> Result<&CameraTransition> {
        let Some(&point) = self.result.coordinates.get(index) else {
            return Err(Error::invalid_input(format!(
                "no item {index} in a result of {}",
                self.result.len()
            )));
        };
        let to = self.bounds.normalize(point);
        Ok(self.camera.focus(to))
    }

    pub fn reset_camera(&mut self) {
        self.camera = CameraState::framing(&self.bounds);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{CameraState, DEFAULT_ZOOM, FOCUS_ZOOM, SCENE_SIZE, ViewState, VisualParameters};
    use crate::pipeline::SortResult;

    fn result(offset: f32) -> Arc<SortResult> {
        Arc::new(SortResult {
            order: vec![0, 1, 2],
            embeddings: vec![vec![1.0, 0.0], vec![0.7, 0.7], vec![0.0, 1.0]],
            coordinates: vec![
                [offset, 0.0],
                [offset + 2.0, 1.0],
                [offset + 4.0, 2.0],
            ],
            items: vec!["a".to_string(), "b".to_string(), "c".to_string()],
        })
    }

    #[test]
    fn parameter_changes_never_move_the_camera() {
        let mut view = ViewState::new(result(0.0));
        view.focus_item(2).expect("focus");
        let camera: CameraState = *view.camera();
        let before = view.layers();

        view.update_params(|params| params.radius = 30.0);
        view.set_params(VisualParameters::default().with_label_size(20.0));

        assert_eq!(*view.camera(), camera);
        assert_eq!(view.layers().len(), before.len());
    }

    #[test]
    fn reinstalling_the_same_result_keeps_the_camera() {
        let first = result(0.0);
        let mut view = ViewState::new(Arc::clone(&first));
        view.focus_item(1).expect("focus");
        let focused = *view.camera();

        assert!(!view.install(Arc::clone(&first)));
        assert_eq!(*view.camera(), focused);

        assert!(view.install(result(0.0)));
        assert_eq!(view.camera().zoom, DEFAULT_ZOOM);
        assert!(view.camera().transition.is_none());
    }

    #[test]
    fn focus_item_targets_the_normalised_position() {
        let mut view = ViewState::new(result(10.0));
        let params = view.params().clone();
        let transition = *view.focus_item(2).expect("focus");

        assert_eq!(transition.to, [SCENE_SIZE / 2.0, SCENE_SIZE / 4.0]);
        assert_eq!(transition.zoom, FOCUS_ZOOM);
        assert_eq!(view.camera().target, transition.to);
        assert_eq!(*view.params(), params);
    }

    #[test]
    fn focus_item_rejects_unknown_indices() {
        let mut view = ViewState::new(result(0.0));
        let camera = *view.camera();
        assert!(view.focus_item(9).is_err());
        assert_eq!(*view.camera(), camera);
    }
}
