// Per-play orchestration: score every entity, isolate failures, assemble rows.

use crate::config::{validate_scoring, ConfigError, ScoringConfig, SeparationPairing};
use crate::features::kinematics::{FeatureError, KinematicSeries, KinematicsEngine};
use crate::scoring::aggregate::RaiAggregator;
use crate::scoring::components::{
    break_point_quality, coverage_maintenance, reaction_delay, separation_delta,
    trajectory_efficiency, ComponentScores, NEUTRAL_SCORE,
};
use crate::tracking::{EntityId, EntityTrack, PlayInput, PlayKey, Point};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tracing::debug;

// ---------------------------------------------------------------------------
// Errors and outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoringError {
    #[error("entity {entity_id} has no post-event frames")]
    InsufficientData { entity_id: EntityId },

    #[error("entity {entity_id} has no pre-pass role record")]
    MissingRole { entity_id: EntityId },

    #[error(transparent)]
    Feature(#[from] FeatureError),
}

/// Why an entity produced no row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkipReason {
    InsufficientData,
    MissingRole,
    NonFiniteSample { frame_index: u32 },
}

impl SkipReason {
    /// Stable label used when counting skips across a batch.
    pub fn label(&self) -> &'static str {
        match self {
            SkipReason::InsufficientData => "insufficient_data",
            SkipReason::MissingRole => "missing_role",
            SkipReason::NonFiniteSample { .. } => "non_finite_sample",
        }
    }
}

impl From<&ScoringError> for SkipReason {
    fn from(err: &ScoringError) -> Self {
        match err {
            ScoringError::InsufficientData { .. }
            | ScoringError::Feature(FeatureError::EmptySeries { .. }) => SkipReason::InsufficientData,
            ScoringError::MissingRole { .. } => SkipReason::MissingRole,
            ScoringError::Feature(FeatureError::NonFiniteSample { frame_index, .. }) => {
                SkipReason::NonFiniteSample {
                    frame_index: *frame_index,
                }
            }
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::InsufficientData => write!(f, "no post-event frames"),
            SkipReason::MissingRole => write!(f, "no pre-pass role record"),
            SkipReason::NonFiniteSample { frame_index } => {
                write!(f, "non-finite position at frame {frame_index}")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkippedEntity {
    pub entity_id: EntityId,
    pub reason: SkipReason,
}

// ---------------------------------------------------------------------------
// Result rows
// ---------------------------------------------------------------------------

/// One scored entity on one play.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaiComponents {
    pub entity_id: EntityId,
    /// Role label as reported by the feed.
    pub role_label: String,
    pub rtd: f64,
    pub te: f64,
    pub bpq: f64,
    pub cms: f64,
    pub sd: f64,
    pub rai: f64,
}

impl RaiComponents {
    pub fn new(entity_id: EntityId, role_label: String, scores: ComponentScores, rai: f64) -> Self {
        RaiComponents {
            entity_id,
            role_label,
            rtd: scores.rtd,
            te: scores.te,
            bpq: scores.bpq,
            cms: scores.cms,
            sd: scores.sd,
            rai,
        }
    }

    pub fn scores(&self) -> ComponentScores {
        ComponentScores {
            rtd: self.rtd,
            te: self.te,
            bpq: self.bpq,
            cms: self.cms,
            sd: self.sd,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntityOutcome {
    Scored(RaiComponents),
    Skipped { entity_id: EntityId, reason: SkipReason },
}

/// Scored rows for one play, ordered by entity id.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayResult {
    pub key: PlayKey,
    pub rows: Vec<RaiComponents>,
    pub skipped: Vec<SkippedEntity>,
    pub passer_location: Option<Point>,
}

impl PlayResult {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Calculator
// ---------------------------------------------------------------------------

/// Kinematics engine plus aggregator. Immutable once built, so one instance
/// can be shared across threads.
#[derive(Debug, Clone)]
pub struct RaiCalculator {
    engine: KinematicsEngine,
    aggregator: RaiAggregator,
}

impl Default for RaiCalculator {
    fn default() -> Self {
        RaiCalculator::build(ScoringConfig::default())
    }
}

impl RaiCalculator {
    /// Validate `config` and build a calculator from it. A zero frame
    /// interval or norm std would otherwise turn every score into inf/NaN.
    pub fn new(config: ScoringConfig) -> Result<Self, ConfigError> {
        validate_scoring(&config)?;
        Ok(RaiCalculator::build(config))
    }

    fn build(config: ScoringConfig) -> Self {
        RaiCalculator {
            engine: KinematicsEngine::new(&config.kinematics),
            aggregator: RaiAggregator::new(config),
        }
    }

    pub fn engine(&self) -> &KinematicsEngine {
        &self.engine
    }

    pub fn aggregator(&self) -> &RaiAggregator {
        &self.aggregator
    }

    /// Score one entity's post-event window.
    ///
    /// BPQ is only computed for route runners and CMS only for coverage
    /// roles; every other role gets the neutral 0.5 for those components.
    /// An entity without a role record cannot be weighted and is rejected.
    pub fn score_entity(
        &self,
        play: &PlayInput,
        entity: &EntityTrack,
    ) -> Result<RaiComponents, ScoringError> {
        if !entity.has_role_record() {
            return Err(ScoringError::MissingRole {
                entity_id: entity.entity_id,
            });
        }
        if entity.post_event.is_empty() {
            return Err(ScoringError::InsufficientData {
                entity_id: entity.entity_id,
            });
        }

        let role = entity.role();
        let series = self.engine.compute(entity.entity_id, &entity.post_event)?;
        let comparison = self.comparison_series(play, entity);

        let scores = ComponentScores {
            rtd: reaction_delay(
                &series,
                self.aggregator.jerk_threshold(role),
                self.aggregator.config().reaction.min_consecutive_frames,
            ),
            te: trajectory_efficiency(&series),
            bpq: if role.is_route_runner() {
                break_point_quality(&series, None)
            } else {
                NEUTRAL_SCORE
            },
            cms: if role.is_coverage() {
                coverage_maintenance(&series, &play.target)
            } else {
                NEUTRAL_SCORE
            },
            sd: separation_delta(&series, comparison.as_ref()),
        };
        let rai = self.aggregator.composite(&scores, role);

        Ok(RaiComponents::new(
            entity.entity_id,
            entity.role_label.clone(),
            scores,
            rai,
        ))
    }

    pub fn evaluate_entity(&self, play: &PlayInput, entity: &EntityTrack) -> EntityOutcome {
        match self.score_entity(play, entity) {
            Ok(row) => EntityOutcome::Scored(row),
            Err(err) => EntityOutcome::Skipped {
                entity_id: entity.entity_id,
                reason: SkipReason::from(&err),
            },
        }
    }

    /// Score every entity on a play. One entity failing never affects the
    /// others.
    pub fn score_play(&self, play: &PlayInput) -> PlayResult {
        let mut rows = Vec::with_capacity(play.entities.len());
        let mut skipped = Vec::new();

        for entity in &play.entities {
            match self.evaluate_entity(play, entity) {
                EntityOutcome::Scored(row) => rows.push(row),
                EntityOutcome::Skipped { entity_id, reason } => {
                    debug!("play {}: skipping entity {}: {}", play.key, entity_id, reason);
                    skipped.push(SkippedEntity { entity_id, reason });
                }
            }
        }
        rows.sort_by_key(|r| r.entity_id);

        PlayResult {
            key: play.key,
            rows,
            skipped,
            passer_location: play.passer_location(),
        }
    }

    fn comparison_series(&self, play: &PlayInput, entity: &EntityTrack) -> Option<KinematicSeries> {
        match self.aggregator.config().separation.pairing {
            SeparationPairing::None => None,
            SeparationPairing::NearestOpponent => {
                let opponent = nearest_opponent(play, entity)?;
                match self.engine.compute(opponent.entity_id, &opponent.post_event) {
                    Ok(series) => Some(series),
                    Err(e) => {
                        debug!(
                            "play {}: no separation partner for entity {}: {}",
                            play.key, entity.entity_id, e
                        );
                        None
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Separation pairing
// ---------------------------------------------------------------------------

/// The opposite-side entity closest to `entity` at the first post-event
/// frame they share. Ties go to the lower entity id.
pub fn nearest_opponent<'a>(play: &'a PlayInput, entity: &EntityTrack) -> Option<&'a EntityTrack> {
    let opposing = entity.effective_side()?.opposite();

    let mut own = entity.post_event.clone();
    own.sort_by_key(|s| s.frame_index);

    let mut best: Option<(f64, &EntityTrack)> = None;
    for candidate in play
        .entities
        .iter()
        .filter(|c| c.entity_id != entity.entity_id && c.effective_side() == Some(opposing))
    {
        let positions: HashMap<u32, Point> = candidate
            .post_event
            .iter()
            .map(|s| (s.frame_index, s.point()))
            .collect();
        let Some(distance) = own
            .iter()
            .find_map(|s| positions.get(&s.frame_index).map(|p| s.point().distance_to(p)))
        else {
            continue;
        };
        if !distance.is_finite() {
            continue;
        }

        best = match best {
            Some((d, current))
                if d < distance || (d == distance && current.entity_id < candidate.entity_id) =>
            {
                Some((d, current))
            }
            _ => Some((distance, candidate)),
        };
    }
    best.map(|(_, e)| e)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
