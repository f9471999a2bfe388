use crate::config::{LoggingSettings, Settings};
use crate::db::scrapes::{end_scrape_run, get_recent_scrapes, start_scrape_run};
use crate::db::{count_listings, init_db, Database};
use crate::domain::Criteria;
use crate::enrichment::{Enricher, PointsOfInterest};
use crate::errors::AppError;
use crate::filters::PostingFilter;
use crate::notify::{LogNotifier, Notifier, SlackNotifier};
use crate::pipeline::{CyclePlan, CycleReport, Scout};
use crate::routing::{OsrmRouter, RoutingService};
use crate::scraper::CraigslistSource;
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod config;
mod db;
mod domain;
mod enrichment;
mod errors;
mod filters;
mod geos;
mod notify;
mod pipeline;
mod routing;
mod scraper;

#[cfg(test)]
mod tests;

/// Watch housing listings and post the good ones to Slack.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// Extra configuration file, layered over config/default.toml and config/local.toml
    #[arg(long)]
    config: Option<PathBuf>,
    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,
    /// Log messages instead of posting them
    #[arg(long)]
    dry_run: bool,
}

fn init_logging(logging: &LoggingSettings) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    if logging.format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}

fn main() {
    let args = Args::parse();

    let settings = match Settings::load(args.config.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&settings.logging);

    if let Err(e) = run(&settings, &args) {
        error!(error = %e, "startup failed");
        std::process::exit(1);
    }
}

/// Build the collaborators once, then cycle until killed.
fn run(settings: &Settings, args: &Args) -> Result<(), AppError> {
    settings.validate()?;

    let db = Database::new(settings.runtime.database_path.clone());
    init_db(&db)?;
    log_previous_state(&db)?;

    let poi = PointsOfInterest::from_settings(settings)?;
    info!(
        transit_stops = poi.transit.len(),
        shuttle_stops = poi.shuttle.len(),
        "points of interest loaded"
    );

    let router = match &settings.routing {
        Some(r) => Some(
            OsrmRouter::new(&r.base_url, &r.profile, r.timeout())
                .map_err(|e| AppError::Config(e.to_string()))?,
        ),
        None => None,
    };
    let enricher = Enricher::new(&poi, router.as_ref().map(|r| r as &dyn RoutingService));

    let http_timeout = settings.runtime.http_timeout();
    let mut source = CraigslistSource::new(http_timeout).map_err(|e| AppError::Config(e.to_string()))?;
    if let Some(base) = &settings.craigslist.base_url {
        source = source.with_base_url(base.clone());
    }

    let desirability = PostingFilter::new(&settings.preferences.disallowed_phrases, http_timeout)
        .map_err(|e| AppError::Config(e.to_string()))?;

    let notifier: Box<dyn Notifier> = if args.dry_run {
        Box::new(LogNotifier)
    } else {
        if settings.slack.token.is_empty() {
            return Err(AppError::Config(
                "slack.token is empty; set SCOUT__SLACK__TOKEN or use --dry-run".into(),
            ));
        }
        Box::new(
            SlackNotifier::new(
                settings.slack.token.clone(),
                &settings.slack.base_url,
                settings.slack.username.clone(),
                settings.slack.icon_emoji.clone(),
                http_timeout,
            )
            .map_err(|e| AppError::Notify(e.to_string()))?,
        )
    };

    let criteria = Criteria::from_preferences(
        &settings.preferences,
        !poi.transit.is_empty(),
        !poi.shuttle.is_empty(),
    );

    let scout = Scout::new(
        &source,
        &db,
        enricher,
        criteria,
        &desirability,
        notifier.as_ref(),
        settings.runtime.workers,
    )?;
    let plan = CyclePlan::from(&settings.craigslist);

    loop {
        match run_recorded_cycle(&scout, &db, &plan) {
            Ok(report) => info!(?report, "cycle complete"),
            Err(e) => error!(error = %e, "cycle failed; retrying after sleep"),
        }

        if args.once {
            return Ok(());
        }

        std::thread::sleep(settings.runtime.sleep_interval());
    }
}

fn log_previous_state(db: &Database) -> Result<(), AppError> {
    let stored = count_listings(db)?;
    let runs = db.with_conn(|conn| get_recent_scrapes(conn))?;

    match runs.first() {
        Some(last) => info!(
            stored,
            run_id = last.id,
            started_at = last.started_at,
            finished_at = ?last.finished_at,
            seen = ?last.listings_seen,
            new = ?last.listings_new,
            posted = ?last.listings_posted,
            success = last.success,
            error = ?last.error_message,
            "resuming after previous run"
        ),
        None => info!(stored, "no previous runs"),
    }
    Ok(())
}

/// Runs one cycle and records it in `scrape_runs`.
fn run_recorded_cycle(scout: &Scout, db: &Database, plan: &CyclePlan) -> Result<CycleReport, AppError> {
    let run_id = db.with_conn(|conn| start_scrape_run(conn, now_unix()))?;

    let result = scout.run_cycle(plan);

    let (totals, err) = match &result {
        Ok(report) => (report.totals(), None),
        Err(e) => (Default::default(), Some(e.to_string())),
    };
    if let Err(e) = db.with_conn(|conn| end_scrape_run(conn, run_id, now_unix(), &totals, err)) {
        error!(error = %e, run_id, "failed to record scrape run");
    }

    result
}
