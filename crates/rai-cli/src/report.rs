// Report export: per-row results CSV, per-player summary CSV, run summary JSON.

use crate::batch::{BatchOutcome, PlayRow};
use chrono::{DateTime, Utc};
use rai_core::tracking::EntityId;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

pub const RESULTS_FILE: &str = "rai_results.csv";
pub const PLAYER_SUMMARY_FILE: &str = "player_summary.csv";
pub const RUN_SUMMARY_FILE: &str = "summary.json";

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("JSON error in {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
}

// ---------------------------------------------------------------------------
// Summaries
// ---------------------------------------------------------------------------

/// Per-entity averages across every play the entity was scored on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerSummary {
    pub entity_id: EntityId,
    /// Role label from the first scored play.
    pub role_label: String,
    pub plays: usize,
    pub mean_rai: f64,
    /// Sample standard deviation; `None` for a single play.
    pub std_rai: Option<f64>,
    pub mean_rtd: f64,
    pub mean_te: f64,
    pub mean_bpq: f64,
    pub mean_cms: f64,
    pub mean_sd: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleSummary {
    pub count: usize,
    pub mean_rai: f64,
    pub std_rai: Option<f64>,
    pub mean_rtd: f64,
    pub mean_te: f64,
}

/// Run-level statistics written to `summary.json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub generated_at: DateTime<Utc>,
    pub rows: usize,
    pub plays_scored: usize,
    pub plays_empty: usize,
    pub entities_skipped: usize,
    pub skip_reasons: BTreeMap<String, usize>,
    pub mean_rai: Option<f64>,
    /// Sample standard deviation; `None` with fewer than two rows.
    pub std_rai: Option<f64>,
    pub mean_rtd: Option<f64>,
    pub mean_te: Option<f64>,
    pub roles: BTreeMap<String, RoleSummary>,
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

/// Average every component per entity, best mean RAI first. Ties go to the
/// lower entity id.
pub fn summarize_players(rows: &[PlayRow]) -> Vec<PlayerSummary> {
    let mut grouped: BTreeMap<EntityId, Vec<&PlayRow>> = BTreeMap::new();
    for row in rows {
        grouped.entry(row.components.entity_id).or_default().push(row);
    }

    let mut summaries: Vec<PlayerSummary> = grouped
        .into_iter()
        .map(|(entity_id, rows)| {
            let n = rows.len() as f64;
            let avg = |f: fn(&PlayRow) -> f64| rows.iter().map(|r| f(r)).sum::<f64>() / n;
            let rai: Vec<f64> = rows.iter().map(|r| r.components.rai).collect();
            PlayerSummary {
                entity_id,
                role_label: rows[0].components.role_label.clone(),
                plays: rows.len(),
                mean_rai: avg(|r| r.components.rai),
                std_rai: sample_std(&rai),
                mean_rtd: avg(|r| r.components.rtd),
                mean_te: avg(|r| r.components.te),
                mean_bpq: avg(|r| r.components.bpq),
                mean_cms: avg(|r| r.components.cms),
                mean_sd: avg(|r| r.components.sd),
            }
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.mean_rai
            .total_cmp(&a.mean_rai)
            .then(a.entity_id.cmp(&b.entity_id))
    });
    summaries
}

pub fn build_run_summary(outcome: &BatchOutcome, generated_at: DateTime<Utc>) -> RunSummary {
    let rai: Vec<f64> = outcome.rows.iter().map(|r| r.components.rai).collect();
    let rtd: Vec<f64> = outcome.rows.iter().map(|r| r.components.rtd).collect();
    let te: Vec<f64> = outcome.rows.iter().map(|r| r.components.te).collect();

    let mut by_role: BTreeMap<&str, Vec<&PlayRow>> = BTreeMap::new();
    for row in &outcome.rows {
        by_role
            .entry(row.components.role_label.as_str())
            .or_default()
            .push(row);
    }
    let roles = by_role
        .into_iter()
        .map(|(role, rows)| {
            let column = |f: fn(&PlayRow) -> f64| rows.iter().map(|r| f(r)).collect::<Vec<f64>>();
            let rai = column(|r| r.components.rai);
            let summary = RoleSummary {
                count: rows.len(),
                mean_rai: mean(&rai).unwrap_or(0.0),
                std_rai: sample_std(&rai),
                mean_rtd: mean(&column(|r| r.components.rtd)).unwrap_or(0.0),
                mean_te: mean(&column(|r| r.components.te)).unwrap_or(0.0),
            };
            (role.to_string(), summary)
        })
        .collect();

    RunSummary {
        generated_at,
        rows: outcome.rows.len(),
        plays_scored: outcome.plays_scored,
        plays_empty: outcome.plays_empty,
        entities_skipped: outcome.entities_skipped,
        skip_reasons: outcome.skip_reasons.clone(),
        mean_rai: mean(&rai),
        std_rai: sample_std(&rai),
        mean_rtd: mean(&rtd),
        mean_te: mean(&te),
        roles,
    }
}

// ---------------------------------------------------------------------------
// Writer-based exporters
// ---------------------------------------------------------------------------

fn fmt4(v: f64) -> String {
    format!("{v:.4}")
}

pub fn write_results_to<W: Write>(writer: W, rows: &[PlayRow]) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record([
        "game_id", "play_id", "entity_id", "role_label", "rtd", "te", "bpq", "cms", "sd", "rai",
    ])?;
    for row in rows {
        let c = &row.components;
        wtr.write_record([
            row.key.game_id.to_string(),
            row.key.play_id.to_string(),
            c.entity_id.to_string(),
            c.role_label.clone(),
            fmt4(c.rtd),
            fmt4(c.te),
            fmt4(c.bpq),
            fmt4(c.cms),
            fmt4(c.sd),
            fmt4(c.rai),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_player_summary_to<W: Write>(
    writer: W,
    summaries: &[PlayerSummary],
) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record([
        "entity_id", "role_label", "plays", "mean_rai", "std_rai", "mean_rtd", "mean_te",
        "mean_bpq", "mean_cms", "mean_sd",
    ])?;
    for s in summaries {
        wtr.write_record([
            s.entity_id.to_string(),
            s.role_label.clone(),
            s.plays.to_string(),
            fmt4(s.mean_rai),
            s.std_rai.map(fmt4).unwrap_or_default(),
            fmt4(s.mean_rtd),
            fmt4(s.mean_te),
            fmt4(s.mean_bpq),
            fmt4(s.mean_cms),
            fmt4(s.mean_sd),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Path-based exporters
// ---------------------------------------------------------------------------

/// Files written by `write_reports`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportPaths {
    pub results: PathBuf,
    pub player_summary: PathBuf,
    pub run_summary: PathBuf,
}

fn create_file(path: &Path) -> Result<std::fs::File, ReportError> {
    std::fs::File::create(path).map_err(|e| ReportError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

/// Write all three reports into `output_dir`, creating it if needed.
pub fn write_reports(
    output_dir: &Path,
    outcome: &BatchOutcome,
    generated_at: DateTime<Utc>,
) -> Result<ReportPaths, ReportError> {
    std::fs::create_dir_all(output_dir).map_err(|e| ReportError::Io {
        path: output_dir.display().to_string(),
        source: e,
    })?;

    let paths = ReportPaths {
        results: output_dir.join(RESULTS_FILE),
        player_summary: output_dir.join(PLAYER_SUMMARY_FILE),
        run_summary: output_dir.join(RUN_SUMMARY_FILE),
    };

    write_results_to(create_file(&paths.results)?, &outcome.rows).map_err(|e| {
        ReportError::Csv {
            path: paths.results.display().to_string(),
            source: e,
        }
    })?;

    let players = summarize_players(&outcome.rows);
    write_player_summary_to(create_file(&paths.player_summary)?, &players).map_err(|e| {
        ReportError::Csv {
            path: paths.player_summary.display().to_string(),
            source: e,
        }
    })?;

    let summary = build_run_summary(outcome, generated_at);
    let json = serde_json::to_string_pretty(&summary).map_err(|e| ReportError::Json {
        path: paths.run_summary.display().to_string(),
        source: e,
    })?;
    std::fs::write(&paths.run_summary, json).map_err(|e| ReportError::Io {
        path: paths.run_summary.display().to_string(),
        source: e,
    })?;

    info!(
        "wrote {} rows and {} player summaries to {}",
        outcome.rows.len(),
        players.len(),
        output_dir.display()
    );
    Ok(paths)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rai_core::scoring::play::RaiComponents;
    use rai_core::tracking::PlayKey;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    fn row(play_id: u32, entity_id: EntityId, role: &str, rai: f64) -> PlayRow {
        PlayRow {
            key: PlayKey {
                game_id: 2023090700,
                play_id,
            },
            components: RaiComponents {
                entity_id,
                role_label: role.to_string(),
                rtd: 3.0,
                te: 0.9,
                bpq: 0.5,
                cms: 0.75,
                sd: 0.0,
                rai,
            },
        }
    }

    fn outcome() -> BatchOutcome {
        let mut skip_reasons = BTreeMap::new();
        skip_reasons.insert("insufficient_data".to_string(), 1);
        BatchOutcome {
            rows: vec![
                row(1, 10, "Defensive Coverage", 0.5),
                row(1, 20, "Targeted Receiver", -0.25),
                row(2, 10, "Defensive Coverage", 1.5),
            ],
            plays_scored: 2,
            plays_empty: 0,
            entities_skipped: 1,
            skip_reasons,
        }
    }

    fn timestamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
    }

    // ---- results CSV ----

    #[test]
    fn results_csv_has_header_and_four_decimals() {
        let mut buf = Vec::new();
        write_results_to(&mut buf, &outcome().rows).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "game_id,play_id,entity_id,role_label,rtd,te,bpq,cms,sd,rai");
        assert_eq!(
            lines[1],
            "2023090700,1,10,Defensive Coverage,3.0000,0.9000,0.5000,0.7500,0.0000,0.5000"
        );
        assert_eq!(lines.len(), 4);
    }

    // ---- player summary ----

    #[test]
    fn players_sorted_by_mean_rai() {
        let players = summarize_players(&outcome().rows);
        assert_eq!(players.len(), 2);
        assert_eq!(players[0].entity_id, 10);
        assert_eq!(players[0].plays, 2);
        assert!(approx_eq(players[0].mean_rai, 1.0, 1e-12));
        assert_eq!(players[0].role_label, "Defensive Coverage");
        // Sample std of [0.5, 1.5].
        assert!(approx_eq(players[0].std_rai.unwrap(), 0.7071067812, 1e-9));
        assert_eq!(players[1].entity_id, 20);
        assert!(approx_eq(players[1].mean_rai, -0.25, 1e-12));
        assert!(players[1].std_rai.is_none());
    }

    #[test]
    fn player_summary_csv_leaves_single_play_std_blank() {
        let mut buf = Vec::new();
        write_player_summary_to(&mut buf, &summarize_players(&outcome().rows)).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "entity_id,role_label,plays,mean_rai,std_rai,mean_rtd,mean_te,mean_bpq,mean_cms,mean_sd"
        );
        assert!(lines[1].starts_with("10,Defensive Coverage,2,1.0000,0.7071,3.0000,"));
        assert!(lines[2].starts_with("20,Targeted Receiver,1,-0.2500,,3.0000,"));
    }

    // ---- run summary ----

    #[test]
    fn run_summary_statistics() {
        let summary = build_run_summary(&outcome(), timestamp());
        assert_eq!(summary.rows, 3);
        assert!(approx_eq(summary.mean_rai.unwrap(), 0.5833333333, 1e-9));
        // Sample std of [0.5, -0.25, 1.5].
        assert!(approx_eq(summary.std_rai.unwrap(), 0.8779711460, 1e-9));
        assert_eq!(summary.roles["Defensive Coverage"].count, 2);
        let coverage = &summary.roles["Defensive Coverage"];
        assert!(approx_eq(coverage.mean_rai, 1.0, 1e-12));
        assert!(approx_eq(coverage.std_rai.unwrap(), 0.7071067812, 1e-9));
        assert!(approx_eq(coverage.mean_rtd, 3.0, 1e-12));
        assert!(approx_eq(coverage.mean_te, 0.9, 1e-12));
        assert!(summary.roles["Targeted Receiver"].std_rai.is_none());
        assert_eq!(summary.skip_reasons["insufficient_data"], 1);
    }

    #[test]
    fn empty_batch_summary_has_no_statistics() {
        let summary = build_run_summary(&BatchOutcome::default(), timestamp());
        assert_eq!(summary.rows, 0);
        assert!(summary.mean_rai.is_none());
        assert!(summary.std_rai.is_none());
        assert!(summary.roles.is_empty());
    }

    // ---- files ----

    #[test]
    fn write_reports_creates_all_files() {
        let dir = std::env::temp_dir().join("rai_report_write_all");
        let _ = std::fs::remove_dir_all(&dir);

        let paths = write_reports(&dir, &outcome(), timestamp()).unwrap();
        assert!(paths.results.exists());
        assert!(paths.player_summary.exists());

        let json = std::fs::read_to_string(&paths.run_summary).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["rows"], 3);
        assert_eq!(value["generated_at"], "2024-01-15T12:00:00Z");

        let _ = std::fs::remove_dir_all(&dir);
    }
}
