// Integration tests for the RAI pipeline.
//
// These run the fixture tracking files through loading, batch scoring and
// report export using the library crates' public API.

use rai_cli::batch::{self, BatchOutcome};
use rai_cli::loader;
use rai_cli::report;
use rai_core::config::{PipelineConfig, ScoringConfig, SeparationPairing};
use rai_core::scoring::components::NEUTRAL_SCORE;
use rai_core::scoring::play::{RaiCalculator, RaiComponents};
use rai_core::tracking::{PlayInput, Point};

use chrono::TimeZone;

// ===========================================================================
// Test helpers
// ===========================================================================

/// Fixture directory path (relative to the crate root, which is the cwd for
/// `cargo test`).
const FIXTURES: &str = "tests/fixtures";

fn pipeline_config(weeks: Vec<u8>) -> PipelineConfig {
    PipelineConfig {
        data_dir: FIXTURES.to_string(),
        season: 2023,
        weeks,
        output_dir: "outputs".to_string(),
        parallel: false,
        max_plays: None,
    }
}

fn load_fixture_plays() -> Vec<PlayInput> {
    loader::load_season(&pipeline_config(vec![1, 2])).expect("fixture week should load")
}

fn score(config: ScoringConfig) -> BatchOutcome {
    batch::score_plays(&RaiCalculator::new(config).unwrap(), &load_fixture_plays(), false)
}

fn row_for(outcome: &BatchOutcome, entity_id: u32) -> &RaiComponents {
    &outcome
        .rows
        .iter()
        .find(|r| r.components.entity_id == entity_id)
        .expect("entity should have a row")
        .components
}

// ===========================================================================
// Test: Loading
// ===========================================================================

#[test]
fn fixture_week_loads_two_plays() {
    let plays = load_fixture_plays();
    assert_eq!(plays.len(), 2);
    assert_eq!(plays[0].key.play_id, 101);
    assert_eq!(plays[1].key.play_id, 102);

    let first = &plays[0];
    assert_eq!(first.target, Point::new(52.0, 45.0));
    let ids: Vec<u32> = first.entities.iter().map(|e| e.entity_id).collect();
    // Passer and pass blocker have no ball-in-air frames and are dropped.
    assert_eq!(ids, vec![501, 601]);
    assert_eq!(first.passer_location(), Some(Point::new(28.8, 26.0)));

    // 903 only appears in the ball-in-air file.
    let ids: Vec<u32> = plays[1].entities.iter().map(|e| e.entity_id).collect();
    assert_eq!(ids, vec![502, 602, 903]);
    assert!(!plays[1].entity(903).unwrap().has_role_record());

    // The malformed row is skipped, the rest of the entity survives.
    let slot = plays[1].entity(602).unwrap();
    assert_eq!(slot.post_event.len(), 8);
}

// ===========================================================================
// Test: Scoring
// ===========================================================================

#[test]
fn fixture_plays_score_with_role_gating() {
    let outcome = score(ScoringConfig::default());
    assert_eq!(outcome.rows.len(), 4);
    assert_eq!(outcome.plays_scored, 2);
    // The passer is not in the ball-in-air window and is never counted.
    assert_eq!(outcome.skip_reasons.get("insufficient_data"), None);
    // The output-only entity has no role record.
    assert_eq!(outcome.entities_skipped, 1);
    assert_eq!(outcome.skip_reasons.get("missing_role"), Some(&1));
    assert!(outcome.rows.iter().all(|r| r.components.entity_id != 903));

    for row in &outcome.rows {
        let c = &row.components;
        assert!(c.rai.is_finite(), "entity {} rai {}", c.entity_id, c.rai);
        assert!((0.0..=1.0).contains(&c.te));
        assert_eq!(c.sd, 0.0);
    }

    let rusher = row_for(&outcome, 502);
    assert_eq!(rusher.role_label, "Pass Rush");
    assert_eq!(rusher.bpq, NEUTRAL_SCORE);
    assert_eq!(rusher.cms, NEUTRAL_SCORE);

    let corner = row_for(&outcome, 601);
    assert_eq!(corner.bpq, NEUTRAL_SCORE);
    assert!(corner.cms > 0.5, "corner drifts toward the ball: {}", corner.cms);

    let receiver = row_for(&outcome, 501);
    assert_eq!(receiver.cms, NEUTRAL_SCORE);
    assert!(receiver.bpq != NEUTRAL_SCORE);
}

#[test]
fn nearest_opponent_pairing_fills_separation() {
    let mut config = ScoringConfig::default();
    config.separation.pairing = SeparationPairing::NearestOpponent;
    let outcome = score(config);

    // Receiver runs away from the trailing corner.
    assert!(row_for(&outcome, 501).sd > 0.0);
    assert!(row_for(&outcome, 601).sd > 0.0);
}

#[test]
fn parallel_batch_matches_sequential() {
    let plays = load_fixture_plays();
    let calc = RaiCalculator::default();
    assert_eq!(
        batch::score_plays(&calc, &plays, false),
        batch::score_plays(&calc, &plays, true)
    );
}

#[test]
fn max_plays_limits_the_batch() {
    let plays = batch::limit_plays(load_fixture_plays(), Some(1));
    let outcome = batch::score_plays(&RaiCalculator::default(), &plays, false);
    assert_eq!(outcome.plays_scored, 1);
    assert!(outcome.rows.iter().all(|r| r.key.play_id == 101));
}

// ===========================================================================
// Test: Reports
// ===========================================================================

#[test]
fn reports_written_for_fixture_batch() {
    let outcome = score(ScoringConfig::default());
    let dir = std::env::temp_dir().join("rai_integration_reports");
    let _ = std::fs::remove_dir_all(&dir);

    let generated_at = chrono::Utc.with_ymd_and_hms(2024, 2, 1, 8, 30, 0).unwrap();
    let paths = report::write_reports(&dir, &outcome, generated_at).unwrap();

    let mut rdr = csv::Reader::from_path(&paths.results).unwrap();
    let headers = rdr.headers().unwrap().clone();
    assert_eq!(headers.len(), 10);
    assert_eq!(&headers[5], "te");
    let records: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
    assert_eq!(records.len(), 4);
    assert_eq!(&records[0][2], "501");

    let mut rdr = csv::Reader::from_path(&paths.player_summary).unwrap();
    let means: Vec<f64> = rdr
        .records()
        .map(|r| r.unwrap()[3].parse::<f64>().unwrap())
        .collect();
    assert_eq!(means.len(), 4);
    assert!(means.windows(2).all(|w| w[0] >= w[1]));

    let json = std::fs::read_to_string(&paths.run_summary).unwrap();
    let summary: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(summary["rows"], 4);
    assert_eq!(summary["entities_skipped"], 1);
    assert_eq!(summary["skip_reasons"]["missing_role"], 1);
    assert_eq!(summary["roles"]["Pass Rush"]["count"], 1);

    let _ = std::fs::remove_dir_all(&dir);
}
