// src/pipeline.rs

use crate::config::{CraigslistSettings, SectionSettings};
use crate::db::{insert_listing, listing_exists, Database};
use crate::db::scrapes::RunTotals;
use crate::domain::{evaluate, Criteria, Listing, Rejection};
use crate::enrichment::Enricher;
use crate::errors::AppError;
use crate::filters::DesirabilityCheck;
use crate::notify::{format_listing, Notifier};
use crate::scraper::{ListingSource, SearchQuery};
use rayon::prelude::*;
use rayon::ThreadPool;
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

/// What happened to one new listing.
#[derive(Debug)]
pub enum Outcome {
    Accepted(Listing),
    Rejected(Rejection),
    /// Enrichment or desirability hit a transient failure; not stored, so it is retried next cycle.
    Skipped,
    /// Stored concurrently by someone else between the existence check and the insert.
    AlreadyKnown,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    pub seen: usize,
    pub source_errors: usize,
    pub new: usize,
    pub skipped: usize,
    pub rejected: usize,
    pub already_known: usize,
    pub posted: usize,
    pub delivery_failures: usize,
}

impl CycleReport {
    pub fn totals(&self) -> RunTotals {
        RunTotals {
            seen: self.seen,
            new: self.new,
            posted: self.posted,
        }
    }
}

enum Verdict {
    Accept,
    Reject(Rejection),
}

/// What to search each cycle.
#[derive(Debug, Clone)]
pub struct CyclePlan {
    pub site: String,
    pub areas: Vec<String>,
    pub sections: Vec<SectionSettings>,
    pub limit: usize,
}

impl From<&CraigslistSettings> for CyclePlan {
    fn from(cl: &CraigslistSettings) -> Self {
        Self {
            site: cl.site.clone(),
            areas: cl.areas.clone(),
            sections: cl.sections.clone(),
            limit: cl.limit,
        }
    }
}

/// One full pass: fetch, dedup, enrich, filter, store, post.
pub struct Scout<'a> {
    source: &'a dyn ListingSource,
    db: &'a Database,
    enricher: Enricher<'a>,
    criteria: Criteria,
    desirability: &'a dyn DesirabilityCheck,
    notifier: &'a dyn Notifier,
    pool: ThreadPool,
}

impl<'a> Scout<'a> {
    /// `workers` bounds how many routing and desirability calls run at once.
    pub fn new(
        source: &'a dyn ListingSource,
        db: &'a Database,
        enricher: Enricher<'a>,
        criteria: Criteria,
        desirability: &'a dyn DesirabilityCheck,
        notifier: &'a dyn Notifier,
        workers: usize,
    ) -> Result<Self, AppError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("scout-worker-{i}"))
            .build()
            .map_err(|e| AppError::Config(format!("worker pool: {e}")))?;

        Ok(Self {
            source,
            db,
            enricher,
            criteria,
            desirability,
            notifier,
            pool,
        })
    }

    /// Store failures abort the cycle; anything local to one listing is logged and skipped.
    ///
    /// Listings accepted before a store failure are still posted, since they are already
    /// stored and the next cycle would never see them again.
    pub fn run_cycle(&self, plan: &CyclePlan) -> Result<CycleReport, AppError> {
        let mut report = CycleReport::default();

        for section in &plan.sections {
            let fresh = self.collect_new(plan, section, &mut report)?;
            report.new += fresh.len();

            let outcomes: Vec<Result<Outcome, AppError>> = self
                .pool
                .install(|| fresh.into_par_iter().map(|l| self.process(l)).collect());

            let mut accepted = Vec::new();
            let mut store_error = None;
            for outcome in outcomes {
                match outcome {
                    Ok(Outcome::Accepted(listing)) => accepted.push(listing),
                    Ok(Outcome::Rejected(reason)) => {
                        report.rejected += 1;
                        debug!(section = %section.code, %reason, "listing rejected");
                    }
                    Ok(Outcome::Skipped) => report.skipped += 1,
                    Ok(Outcome::AlreadyKnown) => report.already_known += 1,
                    Err(e) => {
                        error!(section = %section.code, error = %e, "store failed mid-cycle");
                        store_error.get_or_insert(e);
                    }
                }
            }

            info!(
                section = %section.code,
                accepted = accepted.len(),
                "section processed"
            );

            for listing in &accepted {
                match self.notifier.send(&section.channel, &format_listing(listing)) {
                    Ok(()) => report.posted += 1,
                    Err(e) => {
                        report.delivery_failures += 1;
                        warn!(id = listing.id, channel = %section.channel, error = %e, "failed to post listing");
                    }
                }
            }

            if let Some(e) = store_error {
                return Err(e);
            }
        }

        Ok(report)
    }

    /// Walk every area of a section and keep listings the store hasn't seen.
    fn collect_new(
        &self,
        plan: &CyclePlan,
        section: &SectionSettings,
        report: &mut CycleReport,
    ) -> Result<Vec<Listing>, AppError> {
        let mut fresh = Vec::new();
        let mut batch_ids = HashSet::new();

        for area in &plan.areas {
            let query = SearchQuery {
                site: plan.site.clone(),
                area: area.clone(),
                section: section.code.clone(),
                min_price: section.min_price,
                max_price: section.max_price,
                limit: plan.limit,
            };

            for item in self.source.listings(&query) {
                let raw = match item {
                    Ok(raw) => raw,
                    Err(e) => {
                        report.source_errors += 1;
                        warn!(%area, section = %section.code, error = %e, "skipping unreadable listing");
                        continue;
                    }
                };
                report.seen += 1;

                if !batch_ids.insert(raw.id) || listing_exists(self.db, raw.id)? {
                    continue;
                }

                match Listing::from_raw(&raw) {
                    Ok(listing) => fresh.push(listing),
                    Err(e) => {
                        report.source_errors += 1;
                        warn!(id = raw.id, error = %e, "skipping malformed listing");
                    }
                }
            }
        }

        Ok(fresh)
    }

    /// Transient failures skip the listing without storing it. Permanent ones are
    /// stored as rejections so they are not fetched or routed again.
    fn process(&self, listing: Listing) -> Result<Outcome, AppError> {
        let (listing, verdict) = match self.enricher.enrich_listing(&listing) {
            Ok(annotation) => {
                let listing = listing.with_annotation(annotation);
                match self.judge(&listing) {
                    Some(verdict) => (listing, verdict),
                    None => return Ok(Outcome::Skipped),
                }
            }
            Err(e) if e.is_retryable() => {
                warn!(id = listing.id, error = %e, "skipping listing until next cycle");
                return Ok(Outcome::Skipped);
            }
            Err(e) => {
                warn!(id = listing.id, error = %e, "listing cannot be routed");
                (listing, Verdict::Reject(Rejection::Unroutable))
            }
        };

        if !insert_listing(self.db, &listing)? {
            return Ok(Outcome::AlreadyKnown);
        }

        Ok(match verdict {
            Verdict::Accept => Outcome::Accepted(listing),
            Verdict::Reject(reason) => Outcome::Rejected(reason),
        })
    }

    /// Criteria first, then the posting check. `None` means try again next cycle.
    fn judge(&self, listing: &Listing) -> Option<Verdict> {
        if let Err(reason) = evaluate(listing, &self.criteria) {
            return Some(Verdict::Reject(reason));
        }

        match self.desirability.is_desirable(&listing.url) {
            Ok(true) => Some(Verdict::Accept),
            Ok(false) => Some(Verdict::Reject(Rejection::Undesirable)),
            Err(e) if e.is_retryable() => {
                warn!(id = listing.id, error = %e, "could not check posting; retrying next cycle");
                None
            }
            Err(e) => {
                warn!(id = listing.id, error = %e, "posting is unreadable");
                Some(Verdict::Reject(Rejection::Unreadable))
            }
        }
    }
}
