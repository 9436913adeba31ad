// Kinematic derivation: velocity, acceleration, jerk, path efficiency, curvature.
//
// All derivatives are taken frame-to-frame at the configured sampling
// interval. Values that are undefined at the head of a series (no previous
// frame to difference against) are `None` rather than NaN.

use crate::config::KinematicsConfig;
use crate::features::smoothing::gaussian_smooth;
use crate::tracking::{EntityId, Point, PositionSample};
use thiserror::Error;

/// Path length (yards) below which path efficiency is reported as 1.0.
pub const PATH_LENGTH_EPSILON: f64 = 0.1;

/// Added to frame distance before dividing in the curvature formula.
pub const CURVATURE_DISTANCE_EPSILON: f64 = 0.01;

/// Series at or below this length are differentiated without smoothing.
const MIN_SMOOTHING_SAMPLES: usize = 3;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureError {
    #[error("entity {entity_id} has no position samples")]
    EmptySeries { entity_id: EntityId },

    #[error("entity {entity_id} has a non-finite position at frame {frame_index}")]
    NonFiniteSample { entity_id: EntityId, frame_index: u32 },
}

// ---------------------------------------------------------------------------
// Series types
// ---------------------------------------------------------------------------

/// A 2D vector quantity (velocity, acceleration or jerk).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vector2 {
    pub x: f64,
    pub y: f64,
}

impl Vector2 {
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Heading in degrees, 0 = +x, 90 = +y, wrapped to [0, 360).
    pub fn heading_degrees(&self) -> f64 {
        self.y.atan2(self.x).to_degrees().rem_euclid(360.0)
    }
}

/// Derived attributes for one frame of one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct KinematicFrame {
    pub frame_index: u32,
    pub position: Point,
    /// yd/s
    pub velocity: Option<Vector2>,
    pub speed: Option<f64>,
    /// Movement direction in degrees, [0, 360).
    pub direction: Option<f64>,
    /// yd/s^2
    pub acceleration: Option<Vector2>,
    pub accel_magnitude: Option<f64>,
    /// yd/s^3, never smoothed.
    pub jerk: Option<Vector2>,
    pub jerk_magnitude: Option<f64>,
    /// Cumulative distance travelled up to and including this frame.
    pub path_length: f64,
    /// Straight-line distance from the first frame.
    pub straight_line: f64,
    /// `straight_line / path_length`, in [0, 1].
    pub path_efficiency: f64,
    /// Degrees of heading change per yard travelled.
    pub curvature: Option<f64>,
}

/// Kinematics for one entity over one window, ordered by frame index.
#[derive(Debug, Clone, PartialEq)]
pub struct KinematicSeries {
    pub entity_id: EntityId,
    pub frame_interval: f64,
    pub frames: Vec<KinematicFrame>,
}

impl KinematicSeries {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn jerk_magnitudes(&self) -> Vec<Option<f64>> {
        self.frames.iter().map(|f| f.jerk_magnitude).collect()
    }

    /// Path efficiency at the last frame, or 1.0 for an empty series.
    pub fn final_path_efficiency(&self) -> f64 {
        self.frames.last().map_or(1.0, |f| f.path_efficiency)
    }

    /// Position in `frames` of the given frame index.
    pub fn position_of_frame(&self, frame_index: u32) -> Option<usize> {
        self.frames.iter().position(|f| f.frame_index == frame_index)
    }

    /// Distance from the entity to a fixed point at every frame.
    pub fn distance_to(&self, target: &Point) -> Vec<f64> {
        self.frames
            .iter()
            .map(|f| f.position.distance_to(target))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Angle helpers
// ---------------------------------------------------------------------------

/// Wrap an angle difference in degrees to [-180, 180).
pub fn wrap_degrees(delta: f64) -> f64 {
    (delta + 180.0).rem_euclid(360.0) - 180.0
}

/// Bearing in degrees from `from` to `to`, wrapped to [0, 360).
pub fn bearing_degrees(from: &Point, to: &Point) -> f64 {
    Vector2 {
        x: to.x - from.x,
        y: to.y - from.y,
    }
    .heading_degrees()
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Derives a `KinematicSeries` from raw positions. Holds only constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KinematicsEngine {
    frame_interval: f64,
    smooth_sigma: f64,
}

impl Default for KinematicsEngine {
    fn default() -> Self {
        KinematicsEngine {
            frame_interval: 0.1,
            smooth_sigma: 1.0,
        }
    }
}

impl KinematicsEngine {
    pub fn new(config: &KinematicsConfig) -> Self {
        KinematicsEngine {
            frame_interval: config.frame_interval,
            smooth_sigma: config.smooth_sigma,
        }
    }

    pub fn frame_interval(&self) -> f64 {
        self.frame_interval
    }

    /// Compute the full kinematic series for one entity.
    ///
    /// Samples are sorted by frame index first, so callers may pass them in
    /// any order.
    pub fn compute(
        &self,
        entity_id: EntityId,
        samples: &[PositionSample],
    ) -> Result<KinematicSeries, FeatureError> {
        if samples.is_empty() {
            return Err(FeatureError::EmptySeries { entity_id });
        }
        if let Some(bad) = samples.iter().find(|s| !(s.x.is_finite() && s.y.is_finite())) {
            return Err(FeatureError::NonFiniteSample {
                entity_id,
                frame_index: bad.frame_index,
            });
        }

        let mut ordered = samples.to_vec();
        ordered.sort_by_key(|s| s.frame_index);
        let n = ordered.len();
        let smooth = n > MIN_SMOOTHING_SAMPLES;

        let xs: Vec<Option<f64>> = ordered.iter().map(|s| Some(s.x)).collect();
        let ys: Vec<Option<f64>> = ordered.iter().map(|s| Some(s.y)).collect();

        let vx = self.smooth_axis(self.differentiate(&xs), smooth);
        let vy = self.smooth_axis(self.differentiate(&ys), smooth);
        let ax = self.smooth_axis(self.differentiate(&vx), smooth);
        let ay = self.smooth_axis(self.differentiate(&vy), smooth);
        let jx = self.differentiate(&ax);
        let jy = self.differentiate(&ay);

        let velocity = zip_vectors(&vx, &vy);
        let acceleration = zip_vectors(&ax, &ay);
        let jerk = zip_vectors(&jx, &jy);
        let direction: Vec<Option<f64>> = velocity
            .iter()
            .map(|v| v.map(|v| v.heading_degrees()))
            .collect();

        let path = path_metrics(&ordered, &direction);

        let frames = ordered
            .iter()
            .enumerate()
            .map(|(i, s)| KinematicFrame {
                frame_index: s.frame_index,
                position: s.point(),
                velocity: velocity[i],
                speed: velocity[i].map(|v| v.magnitude()),
                direction: direction[i],
                acceleration: acceleration[i],
                accel_magnitude: acceleration[i].map(|a| a.magnitude()),
                jerk: jerk[i],
                jerk_magnitude: jerk[i].map(|j| j.magnitude()),
                path_length: path.path_length[i],
                straight_line: path.straight_line[i],
                path_efficiency: path.efficiency[i],
                curvature: path.curvature[i],
            })
            .collect();

        Ok(KinematicSeries {
            entity_id,
            frame_interval: self.frame_interval,
            frames,
        })
    }

    /// Backward difference divided by the frame interval. The first element
    /// and any element next to an undefined value is undefined.
    fn differentiate(&self, values: &[Option<f64>]) -> Vec<Option<f64>> {
        let mut out = Vec::with_capacity(values.len());
        if values.is_empty() {
            return out;
        }
        out.push(None);
        for w in values.windows(2) {
            out.push(match (w[0], w[1]) {
                (Some(prev), Some(cur)) => Some((cur - prev) / self.frame_interval),
                _ => None,
            });
        }
        out
    }

    /// Gaussian-smooth one axis, filling undefined values with zero first.
    /// Without smoothing the series is returned untouched.
    fn smooth_axis(&self, values: Vec<Option<f64>>, smooth: bool) -> Vec<Option<f64>> {
        if !smooth {
            return values;
        }
        let filled: Vec<f64> = values.iter().map(|v| v.unwrap_or(0.0)).collect();
        gaussian_smooth(&filled, self.smooth_sigma)
            .into_iter()
            .map(Some)
            .collect()
    }
}

fn zip_vectors(xs: &[Option<f64>], ys: &[Option<f64>]) -> Vec<Option<Vector2>> {
    xs.iter()
        .zip(ys)
        .map(|(x, y)| match (x, y) {
            (Some(x), Some(y)) => Some(Vector2 { x: *x, y: *y }),
            _ => None,
        })
        .collect()
}

struct PathMetrics {
    path_length: Vec<f64>,
    straight_line: Vec<f64>,
    efficiency: Vec<f64>,
    curvature: Vec<Option<f64>>,
}

fn path_metrics(samples: &[PositionSample], direction: &[Option<f64>]) -> PathMetrics {
    let n = samples.len();
    if n < 2 {
        return PathMetrics {
            path_length: vec![0.0; n],
            straight_line: vec![0.0; n],
            efficiency: vec![1.0; n],
            curvature: vec![Some(0.0); n],
        };
    }

    let start = samples[0].point();
    let mut path_length = Vec::with_capacity(n);
    let mut straight_line = Vec::with_capacity(n);
    let mut efficiency = Vec::with_capacity(n);
    let mut curvature = Vec::with_capacity(n);

    let mut travelled = 0.0;
    for i in 0..n {
        let here = samples[i].point();
        let step = if i == 0 {
            None
        } else {
            Some(samples[i - 1].point().distance_to(&here))
        };
        travelled += step.unwrap_or(0.0);
        let straight = start.distance_to(&here);

        path_length.push(travelled);
        straight_line.push(straight);
        efficiency.push(if travelled > PATH_LENGTH_EPSILON {
            (straight / travelled).clamp(0.0, 1.0)
        } else {
            1.0
        });

        let turn = match (i.checked_sub(1).and_then(|p| direction[p]), direction[i], step) {
            (Some(prev), Some(cur), Some(step)) => {
                Some(wrap_degrees(cur - prev).abs() / (step + CURVATURE_DISTANCE_EPSILON))
            }
            _ => None,
        };
        curvature.push(turn);
    }

    PathMetrics {
        path_length,
        straight_line,
        efficiency,
        curvature,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
