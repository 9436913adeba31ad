// Reaction onset detection: first sustained jerk excursion above a threshold.

use crate::features::kinematics::KinematicSeries;

/// Position of the first run of `min_consecutive` samples that are all
/// defined and strictly above `threshold`.
///
/// Returns `None` when no such run exists, which includes any series
/// shorter than `min_consecutive`. A `min_consecutive` of zero is treated
/// as one.
pub fn detect_onset(jerk: &[Option<f64>], threshold: f64, min_consecutive: usize) -> Option<usize> {
    let run = min_consecutive.max(1);
    jerk.windows(run)
        .position(|w| w.iter().all(|j| j.is_some_and(|v| v > threshold)))
}

/// Frame index of the reaction onset for a kinematic series.
pub fn onset_frame(series: &KinematicSeries, threshold: f64, min_consecutive: usize) -> Option<u32> {
    detect_onset(&series.jerk_magnitudes(), threshold, min_consecutive)
        .map(|pos| series.frames[pos].frame_index)
}
