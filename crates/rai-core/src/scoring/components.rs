// The five RAI component scorers.
//
// Every scorer is a pure function of a kinematic series (and, for two of
// them, a target point or a second series). Numeric edge cases resolve to
// documented fallback values instead of errors or NaN.

use crate::features::kinematics::{bearing_degrees, wrap_degrees, KinematicSeries};
use crate::features::reaction::onset_frame;
use crate::features::separation::separation_series;
use crate::tracking::Point;
use serde::{Deserialize, Serialize};

/// Score used when a component does not apply to an entity's role.
pub const NEUTRAL_SCORE: f64 = 0.5;

/// Frames on each side of the break point used for speed comparison.
const BREAK_WINDOW: usize = 3;

/// Pre-break speed (yd/s) below which the entity counts as stationary.
const STATIONARY_SPEED: f64 = 0.1;

/// Curvature (deg/yd) that maps to a full curvature score.
const CURVATURE_SCALE: f64 = 50.0;

const SPEED_MAINTENANCE_WEIGHT: f64 = 0.6;
const CURVATURE_WEIGHT: f64 = 0.4;

/// Minimum frames for break-point and coverage scoring.
const MIN_SHAPE_FRAMES: usize = 3;

// ---------------------------------------------------------------------------
// Component identifiers and raw scores
// ---------------------------------------------------------------------------

/// The five RAI components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Component {
    ReactionDelay,
    TrajectoryEfficiency,
    BreakPointQuality,
    CoverageMaintenance,
    SeparationDelta,
}

impl Component {
    pub const ALL: [Component; 5] = [
        Component::ReactionDelay,
        Component::TrajectoryEfficiency,
        Component::BreakPointQuality,
        Component::CoverageMaintenance,
        Component::SeparationDelta,
    ];

    /// Short column name used in reports.
    pub fn key(&self) -> &'static str {
        match self {
            Component::ReactionDelay => "rtd",
            Component::TrajectoryEfficiency => "te",
            Component::BreakPointQuality => "bpq",
            Component::CoverageMaintenance => "cms",
            Component::SeparationDelta => "sd",
        }
    }
}

/// Raw (un-normalized) component values for one entity on one play.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentScores {
    /// Reaction time delay in frames. Lower is better.
    pub rtd: f64,
    /// Trajectory efficiency, [0, 1].
    pub te: f64,
    /// Break point quality, [0, 1].
    pub bpq: f64,
    /// Coverage maintenance, [0, 1].
    pub cms: f64,
    /// Separation delta in yards. Positive = moved apart.
    pub sd: f64,
}

impl ComponentScores {
    pub fn get(&self, component: Component) -> f64 {
        match component {
            Component::ReactionDelay => self.rtd,
            Component::TrajectoryEfficiency => self.te,
            Component::BreakPointQuality => self.bpq,
            Component::CoverageMaintenance => self.cms,
            Component::SeparationDelta => self.sd,
        }
    }
}

// ---------------------------------------------------------------------------
// Scorers
// ---------------------------------------------------------------------------

/// Frame index of the reaction onset, or the series length when the entity
/// never reacts.
pub fn reaction_delay(series: &KinematicSeries, jerk_threshold: f64, min_consecutive: usize) -> f64 {
    match onset_frame(series, jerk_threshold, min_consecutive) {
        Some(frame) => frame as f64,
        None => series.len() as f64,
    }
}

/// Final path efficiency, clamped to [0, 1].
pub fn trajectory_efficiency(series: &KinematicSeries) -> f64 {
    let te = series.final_path_efficiency();
    if te.is_finite() {
        te.clamp(0.0, 1.0)
    } else {
        1.0
    }
}

/// Sharpness and speed maintenance at the route break.
///
/// The break is the first frame of maximum curvature unless `break_frame`
/// names one explicitly. Returns the neutral score when the series is too
/// short, has no defined curvature, or the named frame is absent.
pub fn break_point_quality(series: &KinematicSeries, break_frame: Option<u32>) -> f64 {
    if series.len() < MIN_SHAPE_FRAMES {
        return NEUTRAL_SCORE;
    }

    let max_curvature_at = series
        .frames
        .iter()
        .enumerate()
        .filter_map(|(i, f)| f.curvature.filter(|c| c.is_finite()).map(|c| (i, c)))
        .fold(None, |best: Option<(usize, f64)>, (i, c)| match best {
            Some((_, best_c)) if best_c >= c => best,
            _ => Some((i, c)),
        });
    let Some((max_pos, _)) = max_curvature_at else {
        return NEUTRAL_SCORE;
    };

    let pos = match break_frame {
        None => max_pos,
        Some(frame) => match series.position_of_frame(frame) {
            Some(pos) => pos,
            None => return NEUTRAL_SCORE,
        },
    };

    let pre_start = pos.saturating_sub(BREAK_WINDOW);
    let post_end = (pos + BREAK_WINDOW + 1).min(series.len());
    let pre_speed = mean_speed(series, pre_start, pos);
    let post_speed = mean_speed(series, pos, post_end);

    let speed_maintenance = if pre_speed < STATIONARY_SPEED {
        NEUTRAL_SCORE
    } else {
        (post_speed / (pre_speed + STATIONARY_SPEED)).min(1.0)
    };
    let speed_maintenance = if speed_maintenance.is_finite() {
        speed_maintenance
    } else {
        NEUTRAL_SCORE
    };

    let curvature = series.frames[pos]
        .curvature
        .filter(|c| c.is_finite())
        .unwrap_or(0.0);
    let curvature_score = (curvature / CURVATURE_SCALE).min(1.0);

    SPEED_MAINTENANCE_WEIGHT * speed_maintenance + CURVATURE_WEIGHT * curvature_score
}

/// Mean of the defined speeds in `frames[start..end]`, 0.0 if none.
fn mean_speed(series: &KinematicSeries, start: usize, end: usize) -> f64 {
    let speeds: Vec<f64> = series.frames[start..end]
        .iter()
        .filter_map(|f| f.speed)
        .collect();
    if speeds.is_empty() {
        0.0
    } else {
        speeds.iter().sum::<f64>() / speeds.len() as f64
    }
}

/// How closely the entity's heading tracks the bearing to `target`.
///
/// 1.0 = always moving straight at the target, 0.0 = always moving directly
/// away. Neutral for fewer than three frames.
pub fn coverage_maintenance(series: &KinematicSeries, target: &Point) -> f64 {
    if series.len() < MIN_SHAPE_FRAMES {
        return NEUTRAL_SCORE;
    }

    let diffs: Vec<f64> = series
        .frames
        .iter()
        .filter_map(|f| {
            f.direction.map(|actual| {
                let ideal = bearing_degrees(&f.position, target);
                wrap_degrees(ideal - actual).abs()
            })
        })
        .collect();
    if diffs.is_empty() {
        return NEUTRAL_SCORE;
    }

    let mean_diff = diffs.iter().sum::<f64>() / diffs.len() as f64;
    (1.0 - mean_diff / 180.0).clamp(0.0, 1.0)
}

/// Final minus initial separation over the frames both entities share.
///
/// 0.0 without a comparison entity or with fewer than two shared frames.
pub fn separation_delta(series: &KinematicSeries, other: Option<&KinematicSeries>) -> f64 {
    let Some(other) = other else {
        return 0.0;
    };
    let sep = separation_series(series, other);
    match (sep.first(), sep.last()) {
        (Some(first), Some(last)) if sep.len() >= 2 => last.separation - first.separation,
        _ => 0.0,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
