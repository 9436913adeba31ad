// Pairwise separation between two entities over their shared frames.

use crate::features::kinematics::KinematicSeries;
use std::collections::HashMap;

/// Separation at one frame both entities were tracked in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeparationFrame {
    pub frame_index: u32,
    /// Euclidean distance in yards.
    pub separation: f64,
    /// Rate at which the gap shrinks (yd/s). Positive = closing,
    /// negative = separating. Undefined on the first shared frame.
    pub closing_speed: Option<f64>,
}

/// Inner join of two series on frame index, in `a`'s frame order.
pub fn separation_series(a: &KinematicSeries, b: &KinematicSeries) -> Vec<SeparationFrame> {
    let b_positions: HashMap<u32, _> = b
        .frames
        .iter()
        .map(|f| (f.frame_index, f.position))
        .collect();

    let mut out: Vec<SeparationFrame> = Vec::new();
    for frame in &a.frames {
        let Some(other) = b_positions.get(&frame.frame_index) else {
            continue;
        };
        let separation = frame.position.distance_to(other);
        let closing_speed = out
            .last()
            .map(|prev| -(separation - prev.separation) / a.frame_interval);
        out.push(SeparationFrame {
            frame_index: frame.frame_index,
            separation,
            closing_speed,
        });
    }
    out
}

/// Separation at the first frame the two series share.
pub fn initial_separation(a: &KinematicSeries, b: &KinematicSeries) -> Option<f64> {
    separation_series(a, b).first().map(|f| f.separation)
}
