// RAI batch scorer entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file)
// 2. Load config (copying defaults on first run)
// 3. Load tracking CSVs for the configured weeks
// 4. Score every play
// 5. Write results, player summary and run summary

use rai_cli::{batch, loader, report};
use rai_core::config;
use rai_core::scoring::play::RaiCalculator;

use anyhow::Context;
use std::path::Path;
use tracing::info;

fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing
    init_tracing()?;
    info!("RAI scorer starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: season {}, {} weeks, pairing {:?}",
        config.pipeline.season,
        config.pipeline.weeks.len(),
        config.scoring.separation.pairing
    );

    // 3. Load tracking data
    let plays = loader::load_season(&config.pipeline).context("failed to load tracking data")?;
    let plays = batch::limit_plays(plays, config.pipeline.max_plays);
    info!("Loaded {} plays from {}", plays.len(), config.pipeline.data_dir);

    // 4. Score
    let calculator =
        RaiCalculator::new(config.scoring.clone()).context("invalid scoring configuration")?;
    let outcome = batch::score_plays(&calculator, &plays, config.pipeline.parallel);

    // 5. Export
    let paths = report::write_reports(
        Path::new(&config.pipeline.output_dir),
        &outcome,
        chrono::Utc::now(),
    )
    .context("failed to write reports")?;

    println!(
        "Scored {} rows across {} plays ({} entities skipped)",
        outcome.rows.len(),
        outcome.plays_scored,
        outcome.entities_skipped
    );
    println!("Results: {}", paths.results.display());
    println!("Player summary: {}", paths.player_summary.display());
    println!("Run summary: {}", paths.run_summary.display());

    info!("RAI scorer finished");
    Ok(())
}

/// Initialize tracing to log to `logs/rai.log`.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("rai.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("rai=info,rai_cli=info,rai_core=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
