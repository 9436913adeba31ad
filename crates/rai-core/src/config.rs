// Configuration loading and parsing (scoring.toml, pipeline.toml).

use crate::tracking::RoleLabel;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub scoring: ScoringConfig,
    pub pipeline: PipelineConfig,
}

// ---------------------------------------------------------------------------
// scoring.toml structs
// ---------------------------------------------------------------------------

/// Everything the scoring core reads: kinematics constants, reaction
/// detection, population norms and per-role profiles.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScoringConfig {
    pub kinematics: KinematicsConfig,
    pub reaction: ReactionConfig,
    #[serde(default)]
    pub separation: SeparationConfig,
    pub norms: ComponentNorms,
    pub roles: RoleProfiles,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct KinematicsConfig {
    /// Seconds between frames.
    pub frame_interval: f64,
    /// Standard deviation (in frames) of the Gaussian smoothing kernel.
    pub smooth_sigma: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ReactionConfig {
    pub min_consecutive_frames: usize,
}

/// How the comparison entity for separation delta is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeparationPairing {
    /// No comparison entity; separation delta is always 0.0.
    #[default]
    None,
    /// Opposite-side entity closest at the first shared post-event frame.
    NearestOpponent,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct SeparationConfig {
    pub pairing: SeparationPairing,
}

/// Fixed population mean and standard deviation for one component.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct NormStats {
    pub mean: f64,
    pub std: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ComponentNorms {
    pub rtd: NormStats,
    pub te: NormStats,
    pub bpq: NormStats,
    pub cms: NormStats,
    pub sd: NormStats,
}

/// Signed component weights. A negative weight means lower is better.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ComponentWeights {
    pub rtd: f64,
    pub te: f64,
    pub bpq: f64,
    pub cms: f64,
    pub sd: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RoleProfile {
    pub jerk_threshold: f64,
    pub weights: ComponentWeights,
}

/// One profile per role, plus the fallback used for anything unrecognized.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RoleProfiles {
    pub defensive_coverage: RoleProfile,
    pub targeted_receiver: RoleProfile,
    pub pass_route: RoleProfile,
    pub pass_rush: RoleProfile,
    pub pass_block: RoleProfile,
    pub default: RoleProfile,
}

impl RoleProfiles {
    pub fn for_role(&self, role: RoleLabel) -> &RoleProfile {
        match role {
            RoleLabel::DefensiveCoverage => &self.defensive_coverage,
            RoleLabel::TargetedReceiver => &self.targeted_receiver,
            RoleLabel::PassRoute => &self.pass_route,
            RoleLabel::PassRush => &self.pass_rush,
            RoleLabel::PassBlock => &self.pass_block,
            RoleLabel::Passer | RoleLabel::Other => &self.default,
        }
    }

    fn named(&self) -> [(&'static str, &RoleProfile); 6] {
        [
            ("defensive_coverage", &self.defensive_coverage),
            ("targeted_receiver", &self.targeted_receiver),
            ("pass_route", &self.pass_route),
            ("pass_rush", &self.pass_rush),
            ("pass_block", &self.pass_block),
            ("default", &self.default),
        ]
    }
}

const DEFAULT_WEIGHTS: ComponentWeights = ComponentWeights {
    rtd: -0.20,
    te: 0.25,
    bpq: 0.20,
    cms: 0.20,
    sd: 0.15,
};

impl Default for ScoringConfig {
    fn default() -> Self {
        ScoringConfig {
            kinematics: KinematicsConfig {
                frame_interval: 0.1,
                smooth_sigma: 1.0,
            },
            reaction: ReactionConfig {
                min_consecutive_frames: 2,
            },
            separation: SeparationConfig::default(),
            norms: ComponentNorms {
                rtd: NormStats { mean: 4.0, std: 2.0 },
                te: NormStats { mean: 0.85, std: 0.10 },
                bpq: NormStats { mean: 0.60, std: 0.15 },
                cms: NormStats { mean: 0.50, std: 0.25 },
                sd: NormStats { mean: 0.0, std: 2.0 },
            },
            roles: RoleProfiles {
                defensive_coverage: RoleProfile {
                    jerk_threshold: 8.0,
                    weights: ComponentWeights {
                        rtd: -0.25,
                        te: 0.20,
                        bpq: 0.05,
                        cms: 0.35,
                        sd: -0.15,
                    },
                },
                targeted_receiver: RoleProfile {
                    jerk_threshold: 5.0,
                    weights: ComponentWeights {
                        rtd: -0.15,
                        te: 0.20,
                        bpq: 0.35,
                        cms: 0.05,
                        sd: 0.25,
                    },
                },
                pass_route: RoleProfile {
                    jerk_threshold: 6.0,
                    weights: ComponentWeights {
                        rtd: -0.20,
                        te: 0.25,
                        bpq: 0.30,
                        cms: 0.05,
                        sd: 0.20,
                    },
                },
                pass_rush: RoleProfile {
                    jerk_threshold: 12.0,
                    weights: ComponentWeights {
                        rtd: -0.35,
                        te: 0.35,
                        bpq: 0.05,
                        cms: 0.10,
                        sd: 0.15,
                    },
                },
                pass_block: RoleProfile {
                    jerk_threshold: 10.0,
                    weights: DEFAULT_WEIGHTS,
                },
                default: RoleProfile {
                    jerk_threshold: 8.0,
                    weights: DEFAULT_WEIGHTS,
                },
            },
        }
    }
}

// ---------------------------------------------------------------------------
// pipeline.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire pipeline.toml file.
#[derive(Debug, Clone, Deserialize)]
struct PipelineFile {
    data: DataSection,
    output: OutputSection,
    batch: BatchSection,
}

#[derive(Debug, Clone, Deserialize)]
struct DataSection {
    dir: String,
    season: u16,
    weeks: Vec<u8>,
}

#[derive(Debug, Clone, Deserialize)]
struct OutputSection {
    dir: String,
}

#[derive(Debug, Clone, Deserialize)]
struct BatchSection {
    parallel: bool,
    /// 0 means no limit.
    #[serde(default)]
    max_plays: usize,
}

/// Where tracking data lives and where reports go.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub data_dir: String,
    pub season: u16,
    pub weeks: Vec<u8>,
    pub output_dir: String,
    pub parallel: bool,
    pub max_plays: Option<usize>,
}

impl From<PipelineFile> for PipelineConfig {
    fn from(file: PipelineFile) -> Self {
        PipelineConfig {
            data_dir: file.data.dir,
            season: file.data.season,
            weeks: file.data.weeks,
            output_dir: file.output.dir,
            parallel: file.batch.parallel,
            max_plays: (file.batch.max_plays > 0).then_some(file.batch.max_plays),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/scoring.toml` and
/// `config/pipeline.toml`, relative to the given `base_dir`.
///
/// Does not copy defaults; `load_config()` does that first.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    let scoring_path = config_dir.join(CONFIG_FILES[0]);
    let scoring_text = read_file(&scoring_path)?;
    let scoring: ScoringConfig =
        toml::from_str(&scoring_text).map_err(|e| ConfigError::ParseError {
            path: scoring_path.clone(),
            source: e,
        })?;

    let pipeline_path = config_dir.join(CONFIG_FILES[1]);
    let pipeline_text = read_file(&pipeline_path)?;
    let pipeline_file: PipelineFile =
        toml::from_str(&pipeline_text).map_err(|e| ConfigError::ParseError {
            path: pipeline_path.clone(),
            source: e,
        })?;

    let config = Config {
        scoring,
        pipeline: pipeline_file.into(),
    };

    validate(&config)?;

    Ok(config)
}

/// Config files the pipeline reads, in load order.
pub const CONFIG_FILES: [&str; 2] = ["scoring.toml", "pipeline.toml"];

/// Copy each of `CONFIG_FILES` from `defaults/` into `config/` unless the
/// user already has one. Returns the files that were copied.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");
    let copy_error = |message: String| ConfigError::DefaultsCopyError { message };

    let mut copied = Vec::new();
    for name in CONFIG_FILES {
        let target = config_dir.join(name);
        if target.exists() {
            continue;
        }
        let source = defaults_dir.join(name);
        if !source.is_file() {
            return Err(copy_error(format!(
                "{} is missing and there is no {} to copy it from",
                target.display(),
                source.display()
            )));
        }
        std::fs::create_dir_all(&config_dir)
            .map_err(|e| copy_error(format!("failed to create {}: {e}", config_dir.display())))?;
        std::fs::copy(&source, &target).map_err(|e| {
            copy_error(format!(
                "failed to copy {} to {}: {e}",
                source.display(),
                target.display()
            ))
        })?;
        copied.push(target);
    }

    Ok(copied)
}

/// Convenience wrapper: loads config relative to the current working directory.
/// Ensures default config files are copied before loading.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn invalid(field: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_scoring(&config.scoring)?;

    let pipeline = &config.pipeline;
    if pipeline.weeks.is_empty() {
        return Err(invalid("data.weeks", "must list at least one week"));
    }
    if let Some(week) = pipeline.weeks.iter().find(|w| !(1..=18).contains(*w)) {
        return Err(invalid(
            "data.weeks",
            format!("weeks must be between 1 and 18, got {week}"),
        ));
    }
    if pipeline.output_dir.trim().is_empty() {
        return Err(invalid("output.dir", "must not be empty"));
    }

    Ok(())
}

/// Validate the scoring section on its own (used when a scoring config is
/// built in code rather than loaded from disk).
pub fn validate_scoring(scoring: &ScoringConfig) -> Result<(), ConfigError> {
    let k = &scoring.kinematics;
    if !(k.frame_interval.is_finite() && k.frame_interval > 0.0) {
        return Err(invalid(
            "kinematics.frame_interval",
            format!("must be > 0, got {}", k.frame_interval),
        ));
    }
    if !(k.smooth_sigma.is_finite() && k.smooth_sigma > 0.0) {
        return Err(invalid(
            "kinematics.smooth_sigma",
            format!("must be > 0, got {}", k.smooth_sigma),
        ));
    }

    if scoring.reaction.min_consecutive_frames == 0 {
        return Err(invalid("reaction.min_consecutive_frames", "must be >= 1"));
    }

    let n = &scoring.norms;
    let norm_fields: &[(&str, NormStats)] = &[
        ("norms.rtd", n.rtd),
        ("norms.te", n.te),
        ("norms.bpq", n.bpq),
        ("norms.cms", n.cms),
        ("norms.sd", n.sd),
    ];
    for (name, stats) in norm_fields {
        if !stats.mean.is_finite() {
            return Err(invalid(format!("{name}.mean"), "must be finite"));
        }
        if !(stats.std.is_finite() && stats.std > 0.0) {
            return Err(invalid(
                format!("{name}.std"),
                format!("must be > 0, got {}", stats.std),
            ));
        }
    }

    for (name, profile) in scoring.roles.named() {
        if !(profile.jerk_threshold.is_finite() && profile.jerk_threshold >= 0.0) {
            return Err(invalid(
                format!("roles.{name}.jerk_threshold"),
                format!("must be >= 0, got {}", profile.jerk_threshold),
            ));
        }
        let w = &profile.weights;
        if ![w.rtd, w.te, w.bpq, w.cms, w.sd].iter().all(|v| v.is_finite()) {
            return Err(invalid(format!("roles.{name}.weights"), "must be finite"));
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
