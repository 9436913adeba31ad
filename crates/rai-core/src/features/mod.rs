// Feature engineering: physics quantities derived from raw positions.

pub mod kinematics;
pub mod reaction;
pub mod separation;
pub mod smoothing;
