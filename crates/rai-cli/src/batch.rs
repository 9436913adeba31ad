// Batch scoring across plays, optionally in parallel.

use rai_core::scoring::play::{PlayResult, RaiCalculator, RaiComponents};
use rai_core::tracking::{PlayInput, PlayKey};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

/// Below this many plays the batch runs sequentially.
const PARALLEL_THRESHOLD: usize = 32;

/// One scored row, tagged with the play it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayRow {
    pub key: PlayKey,
    pub components: RaiComponents,
}

/// Everything produced by scoring a set of plays.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchOutcome {
    /// Rows ordered by play key, then entity id.
    pub rows: Vec<PlayRow>,
    /// Plays that produced at least one row.
    pub plays_scored: usize,
    /// Plays where every entity was skipped.
    pub plays_empty: usize,
    pub entities_skipped: usize,
    /// Skip counts keyed by reason label.
    pub skip_reasons: BTreeMap<String, usize>,
}

impl BatchOutcome {
    fn absorb(&mut self, result: PlayResult) {
        if result.is_empty() {
            self.plays_empty += 1;
        } else {
            self.plays_scored += 1;
        }
        self.entities_skipped += result.skipped.len();
        for skipped in &result.skipped {
            *self
                .skip_reasons
                .entry(skipped.reason.label().to_string())
                .or_insert(0) += 1;
        }
        let key = result.key;
        self.rows.extend(
            result
                .rows
                .into_iter()
                .map(|components| PlayRow { key, components }),
        );
    }
}

/// Truncate to the first `max_plays` plays when a limit is set.
pub fn limit_plays(mut plays: Vec<PlayInput>, max_plays: Option<usize>) -> Vec<PlayInput> {
    if let Some(max) = max_plays {
        if plays.len() > max {
            info!("limiting batch to {} of {} plays", max, plays.len());
            plays.truncate(max);
        }
    }
    plays
}

/// Score every play. Output order is by play key regardless of `parallel`.
pub fn score_plays(calculator: &RaiCalculator, plays: &[PlayInput], parallel: bool) -> BatchOutcome {
    let mut results: Vec<PlayResult> = if parallel && plays.len() > PARALLEL_THRESHOLD {
        plays.par_iter().map(|p| calculator.score_play(p)).collect()
    } else {
        plays.iter().map(|p| calculator.score_play(p)).collect()
    };
    results.sort_by_key(|r| r.key);

    let mut outcome = BatchOutcome::default();
    for result in results {
        outcome.absorb(result);
    }

    info!(
        "scored {} plays ({} empty), {} rows, {} entities skipped",
        outcome.plays_scored,
        outcome.plays_empty,
        outcome.rows.len(),
        outcome.entities_skipped
    );
    outcome
}
