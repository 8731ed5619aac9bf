use serde::{Deserialize, Serialize};

use crate::Point;

/// Side length of the square the layout is normalised into.
pub const SCENE_SIZE: f64 = 100.0;
pub const DEFAULT_ZOOM: f64 = 1.0;
pub const FOCUS_ZOOM: f64 = 4.0;
pub const FOCUS_TRANSITION_MS: u64 = 800;

/// Axis-aligned extent of the projected coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: [f64; 2],
    pub max: [f64; 2],
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            min: [0.0, 0.0],
            max: [1.0, 1.0],
        }
    }
}

impl Bounds {
    /// Non-finite points are skipped. Zero-width spans widen to 1 around
    /// their centre so normalisation never divides by zero.
    pub fn from_points(points: &[Point]) -> Self {
        let mut min = [f64::INFINITY; 2];
        let mut max = [f64::NEG_INFINITY; 2];
        for point in points {
            let (x, y) = (f64::from(point[0]), f64::from(point[1]));
            if !(x.is_finite() && y.is_finite()) {
                continue;
            }
            min = [min[0].min(x), min[1].min(y)];
            max = [max[0].max(x), max[1].max(y)];
        }
        if !min[0].is_finite() {
            return Self::default();
        }

        for axis in 0..2 {
            if max[axis] - min[axis] <= f64::EPSILON {
                let centre = (min[axis] + max[axis]) / 2.0;
                min[axis] = centre - 0.5;
                max[axis] = centre + 0.5;
            }
        }
        Self { min, max }
    }

    pub fn centre(&self) -> [f64; 2] {
        [
            (self.min[0] + self.max[0]) / 2.0,
            (self.min[1] + self.max[1]) / 2.0,
        ]
    }

    pub fn span(&self) -> f64 {
        (self.max[0] - self.min[0]).max(self.max[1] - self.min[1])
    }

    /// Maps a point into `[-SCENE_SIZE / 2, SCENE_SIZE / 2]` on both axes,
    /// keeping the aspect ratio, with the bounds' centre at the origin.
    pub fn normalize(&self, point: Point) -> [f64; 2] {
        self.to_scene([f64::from(point[0]), f64::from(point[1])])
    }

    fn to_scene(&self, point: [f64; 2]) -> [f64; 2] {
        let centre = self.centre();
        let scale = SCENE_SIZE / self.span();
        [(point[0] - centre[0]) * scale, (point[1] - centre[1]) * scale]
    }
}

/// Animated move the renderer should perform.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraTransition {
    pub from: [f64; 2],
    pub to: [f64; 2],
    pub zoom: f64,
    pub duration_ms: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraState {
    pub target: [f64; 2],
    pub zoom: f64,
    pub transition: Option<CameraTransition>,
}

impl CameraState {
    /// Whole-layout framing for `bounds`.
    pub fn framing(bounds: &Bounds) -> Self {
        Self {
            target: bounds.to_scene(bounds.centre()),
            zoom: DEFAULT_ZOOM,
            transition: None,
        }
    }

    pub(crate) fn focus(&mut self, to: [f64; 2]) -> &CameraTransition {
        let transition = CameraTransition {
            from: self.target,
            to,
            zoom: FOCUS_ZOOM,
            duration_ms: FOCUS_TRANSITION_MS,
        };
        self.target = to;
        self.zoom = FOCUS_ZOOM;
        self.transition.insert(transition)
    }
}
