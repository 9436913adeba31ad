// Tracking CSV loading and play assembly.
//
// Reads the weekly pre-pass (`input_<season>_wNN.csv`) and ball-in-air
// (`output_<season>_wNN.csv`) tracking files and groups their rows into
// one `PlayInput` per play.

use rai_core::config::PipelineConfig;
use rai_core::tracking::{
    EntityId, EntityTrack, PlayInput, PlayKey, Point, PositionSample, Side,
};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Role label for pre-pass rows whose `player_role` cell is blank.
pub const BLANK_ROLE: &str = "default";

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("validation error: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Parsed rows
// ---------------------------------------------------------------------------

/// One pre-pass tracking row.
#[derive(Debug, Clone, PartialEq)]
pub struct InputRow {
    pub key: PlayKey,
    pub entity_id: EntityId,
    pub frame_index: u32,
    pub role_label: String,
    pub side: Option<Side>,
    pub position: Point,
    pub ball_land: Point,
}

/// One ball-in-air tracking row.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRow {
    pub key: PlayKey,
    pub entity_id: EntityId,
    pub frame_index: u32,
    pub position: Point,
}

// ---------------------------------------------------------------------------
// Raw CSV serde structs (private)
// ---------------------------------------------------------------------------

/// Pre-pass row. The feed carries many more columns (speed, orientation,
/// player metadata); they are absorbed by `_extra`.
#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct RawInputRow {
    game_id: u64,
    play_id: u32,
    nfl_id: u32,
    frame_id: u32,
    #[serde(default)]
    player_role: String,
    #[serde(default)]
    player_side: String,
    x: f64,
    y: f64,
    ball_land_x: f64,
    ball_land_y: f64,
    #[serde(flatten)]
    _extra: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct RawOutputRow {
    game_id: u64,
    play_id: u32,
    nfl_id: u32,
    frame_id: u32,
    x: f64,
    y: f64,
    #[serde(flatten)]
    _extra: HashMap<String, serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Reader-based loaders (private, enable testing without temp files)
// ---------------------------------------------------------------------------

fn input_rows_from_reader<R: Read>(rdr: R) -> Result<Vec<InputRow>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut rows = Vec::new();
    for result in reader.deserialize::<RawInputRow>() {
        match result {
            Ok(raw) => {
                if !(raw.x.is_finite() && raw.y.is_finite()) {
                    warn!(
                        "skipping input row for entity {} (play {}/{}, frame {}): non-finite position",
                        raw.nfl_id, raw.game_id, raw.play_id, raw.frame_id
                    );
                    continue;
                }
                let side = if raw.player_side.trim().is_empty() {
                    None
                } else {
                    let side = Side::from_label(&raw.player_side);
                    if side.is_none() {
                        debug!("unknown player_side '{}' for entity {}", raw.player_side, raw.nfl_id);
                    }
                    side
                };
                rows.push(InputRow {
                    key: PlayKey {
                        game_id: raw.game_id,
                        play_id: raw.play_id,
                    },
                    entity_id: raw.nfl_id,
                    frame_index: raw.frame_id,
                    role_label: match raw.player_role.trim() {
                        "" => BLANK_ROLE.to_string(),
                        role => role.to_string(),
                    },
                    side,
                    position: Point::new(raw.x, raw.y),
                    ball_land: Point::new(raw.ball_land_x, raw.ball_land_y),
                });
            }
            Err(e) => {
                warn!("skipping malformed input row: {}", e);
            }
        }
    }
    Ok(rows)
}

fn output_rows_from_reader<R: Read>(rdr: R) -> Result<Vec<OutputRow>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut rows = Vec::new();
    for result in reader.deserialize::<RawOutputRow>() {
        match result {
            Ok(raw) => {
                if !(raw.x.is_finite() && raw.y.is_finite()) {
                    warn!(
                        "skipping output row for entity {} (play {}/{}, frame {}): non-finite position",
                        raw.nfl_id, raw.game_id, raw.play_id, raw.frame_id
                    );
                    continue;
                }
                rows.push(OutputRow {
                    key: PlayKey {
                        game_id: raw.game_id,
                        play_id: raw.play_id,
                    },
                    entity_id: raw.nfl_id,
                    frame_index: raw.frame_id,
                    position: Point::new(raw.x, raw.y),
                });
            }
            Err(e) => {
                warn!("skipping malformed output row: {}", e);
            }
        }
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Public path-based loaders
// ---------------------------------------------------------------------------

pub fn load_input_rows(path: &Path) -> Result<Vec<InputRow>, LoadError> {
    let file = std::fs::File::open(path).map_err(|e| LoadError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    input_rows_from_reader(file).map_err(|e| LoadError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

pub fn load_output_rows(path: &Path) -> Result<Vec<OutputRow>, LoadError> {
    let file = std::fs::File::open(path).map_err(|e| LoadError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    output_rows_from_reader(file).map_err(|e| LoadError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

/// Paths of the pre-pass and ball-in-air files for one week.
pub fn week_file_paths(data_dir: &Path, season: u16, week: u8) -> (PathBuf, PathBuf) {
    (
        data_dir.join(format!("input_{season}_w{week:02}.csv")),
        data_dir.join(format!("output_{season}_w{week:02}.csv")),
    )
}

/// Load and assemble one week. `Ok(None)` if either file is missing.
pub fn load_week(data_dir: &Path, season: u16, week: u8) -> Result<Option<Vec<PlayInput>>, LoadError> {
    let (input_path, output_path) = week_file_paths(data_dir, season, week);
    for path in [&input_path, &output_path] {
        if !path.exists() {
            warn!("week {}: {} not found, skipping", week, path.display());
            return Ok(None);
        }
    }

    let inputs = load_input_rows(&input_path)?;
    let outputs = load_output_rows(&output_path)?;
    let plays = assemble_plays(inputs, outputs);
    info!("week {}: loaded {} plays", week, plays.len());
    Ok(Some(plays))
}

/// Load every configured week and return the plays ordered by play key.
pub fn load_season(config: &PipelineConfig) -> Result<Vec<PlayInput>, LoadError> {
    let data_dir = Path::new(&config.data_dir);
    let mut plays = Vec::new();
    for &week in &config.weeks {
        if let Some(week_plays) = load_week(data_dir, config.season, week)? {
            plays.extend(week_plays);
        }
    }

    if plays.is_empty() {
        return Err(LoadError::Validation(format!(
            "no plays loaded from {} for season {}",
            data_dir.display(),
            config.season
        )));
    }
    plays.sort_by_key(|p| p.key);
    Ok(plays)
}

// ---------------------------------------------------------------------------
// Play assembly
// ---------------------------------------------------------------------------

#[derive(Default)]
struct PlayBuilder {
    target: Option<Point>,
    entities: BTreeMap<EntityId, EntityTrack>,
}

/// Group parsed rows into plays.
///
/// Only entities with ball-in-air frames are kept. The passer's release
/// point is stored on the play before its track is dropped. Entities that
/// never appear in the pre-pass file keep an empty role label and are
/// skipped at scoring time. Plays without a finite ball landing location
/// are dropped.
pub fn assemble_plays(inputs: Vec<InputRow>, outputs: Vec<OutputRow>) -> Vec<PlayInput> {
    let mut builders: BTreeMap<PlayKey, PlayBuilder> = BTreeMap::new();

    for row in inputs {
        let builder = builders.entry(row.key).or_default();
        if builder.target.is_none() && row.ball_land.is_finite() {
            builder.target = Some(row.ball_land);
        }
        let track = builder
            .entities
            .entry(row.entity_id)
            .or_insert_with(|| EntityTrack::new(row.entity_id, row.role_label.clone()));
        if track.side.is_none() {
            track.side = row.side;
        }
        track.pre_event.push(PositionSample::new(
            row.entity_id,
            row.frame_index,
            row.position.x,
            row.position.y,
        ));
    }

    for row in outputs {
        let builder = builders.entry(row.key).or_default();
        let track = builder.entities.entry(row.entity_id).or_insert_with(|| {
            debug!(
                "play {}: entity {} has no pre-pass rows, no role recorded",
                row.key, row.entity_id
            );
            EntityTrack::new(row.entity_id, String::new())
        });
        track.post_event.push(PositionSample::new(
            row.entity_id,
            row.frame_index,
            row.position.x,
            row.position.y,
        ));
    }

    let mut plays = Vec::with_capacity(builders.len());
    for (key, builder) in builders {
        let Some(target) = builder.target else {
            warn!("play {}: no ball landing location, skipping", key);
            continue;
        };
        let mut play = PlayInput::new(key, target);
        for mut track in builder.entities.into_values() {
            if play.passer.is_none() {
                play.passer = track.release_point();
            }
            if track.post_event.is_empty() {
                continue;
            }
            track.pre_event.sort_by_key(|s| s.frame_index);
            track.post_event.sort_by_key(|s| s.frame_index);
            play.entities.push(track);
        }
        plays.push(play);
    }
    plays
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
