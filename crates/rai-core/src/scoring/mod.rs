// Scoring: component scorers, role-weighted aggregation, per-play orchestration.

pub mod aggregate;
pub mod components;
pub mod play;
