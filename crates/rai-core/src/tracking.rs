// Tracking data model: position samples, roles, and per-play inputs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tracked player identifier (the feed's `nfl_id`).
pub type EntityId = u32;

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// A field location in yards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// One frame of one entity's position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    pub entity_id: EntityId,
    pub frame_index: u32,
    pub x: f64,
    pub y: f64,
}

impl PositionSample {
    pub fn new(entity_id: EntityId, frame_index: u32, x: f64, y: f64) -> Self {
        PositionSample {
            entity_id,
            frame_index,
            x,
            y,
        }
    }

    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// Which team an entity plays for on a given play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Offense,
    Defense,
}

impl Side {
    /// Parse the feed's `player_side` value ("Offense" / "Defense").
    pub fn from_label(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "offense" => Some(Side::Offense),
            "defense" => Some(Side::Defense),
            _ => None,
        }
    }

    pub fn opposite(&self) -> Side {
        match self {
            Side::Offense => Side::Defense,
            Side::Defense => Side::Offense,
        }
    }
}

/// Role of an entity on one play. Drives threshold and weight lookups.
///
/// `Other` covers both the literal "default" label and anything the feed
/// sends that is not in this list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoleLabel {
    DefensiveCoverage,
    TargetedReceiver,
    PassRoute,
    PassRush,
    PassBlock,
    Passer,
    Other,
}

impl RoleLabel {
    /// Parse a feed role label. Never fails; unknown labels become `Other`.
    pub fn from_label(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "defensive coverage" => RoleLabel::DefensiveCoverage,
            "targeted receiver" => RoleLabel::TargetedReceiver,
            "pass route" => RoleLabel::PassRoute,
            "pass rush" => RoleLabel::PassRush,
            "pass block" => RoleLabel::PassBlock,
            "passer" => RoleLabel::Passer,
            _ => RoleLabel::Other,
        }
    }

    pub fn display_str(&self) -> &'static str {
        match self {
            RoleLabel::DefensiveCoverage => "Defensive Coverage",
            RoleLabel::TargetedReceiver => "Targeted Receiver",
            RoleLabel::PassRoute => "Pass Route",
            RoleLabel::PassRush => "Pass Rush",
            RoleLabel::PassBlock => "Pass Block",
            RoleLabel::Passer => "Passer",
            RoleLabel::Other => "default",
        }
    }

    /// Roles that run a route and therefore have a break point.
    pub fn is_route_runner(&self) -> bool {
        matches!(self, RoleLabel::TargetedReceiver | RoleLabel::PassRoute)
    }

    /// Roles whose job is to track the ball in coverage.
    pub fn is_coverage(&self) -> bool {
        matches!(self, RoleLabel::DefensiveCoverage)
    }

    /// Team side implied by the role, if any.
    pub fn side(&self) -> Option<Side> {
        match self {
            RoleLabel::DefensiveCoverage | RoleLabel::PassRush => Some(Side::Defense),
            RoleLabel::TargetedReceiver
            | RoleLabel::PassRoute
            | RoleLabel::PassBlock
            | RoleLabel::Passer => Some(Side::Offense),
            RoleLabel::Other => None,
        }
    }
}

impl fmt::Display for RoleLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_str())
    }
}

// ---------------------------------------------------------------------------
// Per-play input
// ---------------------------------------------------------------------------

/// Identifies a single play across the season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayKey {
    pub game_id: u64,
    pub play_id: u32,
}

impl fmt::Display for PlayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.game_id, self.play_id)
    }
}

/// One entity's tracking for one play, split at pass release.
#[derive(Debug, Clone)]
pub struct EntityTrack {
    pub entity_id: EntityId,
    /// Role label exactly as the feed reported it. Empty when the entity has
    /// no pre-pass rows, so no role was ever recorded.
    pub role_label: String,
    /// Side from the feed's `player_side` column, when present.
    pub side: Option<Side>,
    /// Frames before the pass is released.
    pub pre_event: Vec<PositionSample>,
    /// Frames while the ball is in the air. This is the scored window.
    pub post_event: Vec<PositionSample>,
}

impl EntityTrack {
    pub fn new(entity_id: EntityId, role_label: impl Into<String>) -> Self {
        EntityTrack {
            entity_id,
            role_label: role_label.into(),
            side: None,
            pre_event: Vec::new(),
            post_event: Vec::new(),
        }
    }

    pub fn role(&self) -> RoleLabel {
        RoleLabel::from_label(&self.role_label)
    }

    pub fn has_role_record(&self) -> bool {
        !self.role_label.is_empty()
    }

    /// Last pre-event position, if this entity is the passer.
    pub fn release_point(&self) -> Option<Point> {
        if self.role() != RoleLabel::Passer {
            return None;
        }
        self.pre_event
            .iter()
            .max_by_key(|s| s.frame_index)
            .map(PositionSample::point)
    }

    /// Explicit side if the feed gave one, otherwise the role's side.
    pub fn effective_side(&self) -> Option<Side> {
        self.side.or_else(|| self.role().side())
    }
}

/// Everything the scoring core needs for one play.
#[derive(Debug, Clone)]
pub struct PlayInput {
    pub key: PlayKey,
    /// Ball landing location.
    pub target: Point,
    pub entities: Vec<EntityTrack>,
    /// Passer position at release, captured when the passer itself is not
    /// among `entities`.
    pub passer: Option<Point>,
}

impl PlayInput {
    pub fn new(key: PlayKey, target: Point) -> Self {
        PlayInput {
            key,
            target,
            entities: Vec::new(),
            passer: None,
        }
    }

    pub fn entity(&self, entity_id: EntityId) -> Option<&EntityTrack> {
        self.entities.iter().find(|e| e.entity_id == entity_id)
    }

    /// The passer's position at the last pre-event frame.
    pub fn passer_location(&self) -> Option<Point> {
        self.passer.or_else(|| self.entities.iter().find_map(EntityTrack::release_point))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
