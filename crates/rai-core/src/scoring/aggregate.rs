// Normalization and role-weighted composite of the five component scores.

use crate::config::{ComponentWeights, NormStats, RoleProfile, ScoringConfig};
use crate::scoring::components::{Component, ComponentScores};
use crate::tracking::RoleLabel;

/// Standard deviations below this normalize to zero.
const STD_EPSILON: f64 = 1e-9;

/// Combines component scores into a single RAI value.
///
/// Holds only the scoring configuration; every method is a pure function of
/// its arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct RaiAggregator {
    config: ScoringConfig,
}

impl RaiAggregator {
    pub fn new(config: ScoringConfig) -> Self {
        RaiAggregator { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Profile (weights and jerk threshold) for a role. `Passer` and
    /// `Other` share the default profile.
    pub fn profile(&self, role: RoleLabel) -> &RoleProfile {
        self.config.roles.for_role(role)
    }

    pub fn jerk_threshold(&self, role: RoleLabel) -> f64 {
        self.profile(role).jerk_threshold
    }

    fn norm(&self, component: Component) -> &NormStats {
        let norms = &self.config.norms;
        match component {
            Component::ReactionDelay => &norms.rtd,
            Component::TrajectoryEfficiency => &norms.te,
            Component::BreakPointQuality => &norms.bpq,
            Component::CoverageMaintenance => &norms.cms,
            Component::SeparationDelta => &norms.sd,
        }
    }

    /// Z-score of a raw component value against its reference distribution.
    pub fn normalize(&self, value: f64, component: Component) -> f64 {
        let norm = self.norm(component);
        if norm.std.abs() < STD_EPSILON {
            return 0.0;
        }
        (value - norm.mean) / norm.std
    }

    /// Weighted sum of normalized components for the given role.
    pub fn composite(&self, scores: &ComponentScores, role: RoleLabel) -> f64 {
        let weights = &self.profile(role).weights;
        Component::ALL
            .iter()
            .map(|&c| weight_of(weights, c) * self.normalize(scores.get(c), c))
            .sum()
    }
}

fn weight_of(weights: &ComponentWeights, component: Component) -> f64 {
    match component {
        Component::ReactionDelay => weights.rtd,
        Component::TrajectoryEfficiency => weights.te,
        Component::BreakPointQuality => weights.bpq,
        Component::CoverageMaintenance => weights.cms,
        Component::SeparationDelta => weights.sd,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    fn aggregator() -> RaiAggregator {
        RaiAggregator::new(ScoringConfig::default())
    }

    fn league_average() -> ComponentScores {
        ComponentScores {
            rtd: 4.0,
            te: 0.85,
            bpq: 0.60,
            cms: 0.50,
            sd: 0.0,
        }
    }

    // ---- normalize ----

    #[test]
    fn normalize_uses_reference_norms() {
        let agg = aggregator();
        assert!(approx_eq(agg.normalize(6.0, Component::ReactionDelay), 1.0, 1e-12));
        assert!(approx_eq(agg.normalize(0.75, Component::TrajectoryEfficiency), -1.0, 1e-9));
        assert!(approx_eq(agg.normalize(1.0, Component::CoverageMaintenance), 2.0, 1e-12));
        assert!(approx_eq(agg.normalize(-3.0, Component::SeparationDelta), -1.5, 1e-12));
    }

    #[test]
    fn normalize_zero_std_is_zero() {
        let mut config = ScoringConfig::default();
        config.norms.bpq.std = 0.0;
        let agg = RaiAggregator::new(config);
        assert_eq!(agg.normalize(0.9, Component::BreakPointQuality), 0.0);
    }

    // ---- composite ----

    #[test]
    fn average_scores_give_zero_composite() {
        let agg = aggregator();
        for role in [
            RoleLabel::DefensiveCoverage,
            RoleLabel::TargetedReceiver,
            RoleLabel::PassRoute,
            RoleLabel::PassRush,
            RoleLabel::Other,
        ] {
            assert!(approx_eq(agg.composite(&league_average(), role), 0.0, 1e-12));
        }
    }

    #[test]
    fn faster_reaction_raises_composite() {
        let agg = aggregator();
        let mut quick = league_average();
        quick.rtd = 2.0;
        // -0.25 * (2 - 4) / 2
        let rai = agg.composite(&quick, RoleLabel::DefensiveCoverage);
        assert!(approx_eq(rai, 0.25, 1e-12));
    }

    #[test]
    fn composite_matches_hand_computation() {
        let agg = aggregator();
        let scores = ComponentScores {
            rtd: 6.0,
            te: 0.95,
            bpq: 0.90,
            cms: 0.50,
            sd: 2.0,
        };
        // Targeted receiver: -0.15*1 + 0.20*1 + 0.35*2 + 0.05*0 + 0.25*1
        let rai = agg.composite(&scores, RoleLabel::TargetedReceiver);
        assert!(approx_eq(rai, 1.0, 1e-9), "rai was {rai}");
    }

    #[test]
    fn unrecognized_role_matches_default_profile() {
        let agg = aggregator();
        let scores = ComponentScores {
            rtd: 1.0,
            te: 0.7,
            bpq: 0.4,
            cms: 0.9,
            sd: -2.5,
        };
        let unknown = RoleLabel::from_label("Special Teams Gunner");
        let literal = RoleLabel::from_label("default");
        assert_eq!(
            agg.composite(&scores, unknown),
            agg.composite(&scores, literal)
        );
        assert_eq!(agg.jerk_threshold(unknown), agg.jerk_threshold(literal));
        assert_eq!(agg.profile(RoleLabel::Passer), agg.profile(RoleLabel::Other));
    }

    #[test]
    fn role_thresholds() {
        let agg = aggregator();
        assert_eq!(agg.jerk_threshold(RoleLabel::DefensiveCoverage), 8.0);
        assert_eq!(agg.jerk_threshold(RoleLabel::TargetedReceiver), 5.0);
        assert_eq!(agg.jerk_threshold(RoleLabel::PassRoute), 6.0);
        assert_eq!(agg.jerk_threshold(RoleLabel::PassRush), 12.0);
        assert_eq!(agg.jerk_threshold(RoleLabel::PassBlock), 10.0);
        assert_eq!(agg.jerk_threshold(RoleLabel::Other), 8.0);
    }
}
