//! Page-cycle and target-set drivers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, info, info_span, warn};

use crate::browser::{navigate_with_retry, Page};
use crate::error::{DataPolicy, ScrapeError};
use crate::output::{RawDump, ResultSink};
use crate::parser::{self, validate::validate_data_count};
use crate::record::{ScrapeResult, ScrapedReview, Target};
use crate::settings::Settings;
use crate::sites::Scraper;

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub policy: DataPolicy,
    pub timeout: Duration,
    /// Pause before every navigation.
    pub rate_limit: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
}

impl RunOptions {
    pub fn from_settings(s: &Settings) -> Result<Self, ScrapeError> {
        Ok(RunOptions {
            policy: s.policy(),
            timeout: s.timeout(),
            rate_limit: s.rate_limit()?,
            max_retries: s.max_navigation_retries,
            retry_backoff: s.retry_backoff(),
        })
    }
}

fn check_interrupt(interrupt: &AtomicBool) -> Result<(), ScrapeError> {
    if interrupt.load(Ordering::SeqCst) {
        Err(ScrapeError::Interrupted)
    } else {
        Ok(())
    }
}

fn spinner(target: &Target) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {prefix}: {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_prefix(target.name.clone());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// Scrape every page of one target, then reconcile against the site's total.
pub fn scrape_target(
    page: &dyn Page,
    scraper: &Scraper,
    target: &Target,
    opts: &RunOptions,
    mut dump: Option<&mut RawDump>,
    interrupt: &AtomicBool,
) -> Result<ScrapeResult, ScrapeError> {
    let span = info_span!("target", name = %target.name, url = %target.entry_url);
    let _guard = span.enter();

    check_interrupt(interrupt)?;
    navigate_with_retry(page, &target.entry_url, opts.max_retries, opts.retry_backoff)?;
    scraper
        .navigators
        .wait_for_entry(page, opts.timeout)
        .map_err(|e| ScrapeError::NavigationFailure {
            url: target.entry_url.clone(),
            reason: format!("entry page never loaded: {}", e),
        })?;

    let mut result = ScrapeResult::new(target.clone());
    let pb = spinner(target);

    loop {
        check_interrupt(interrupt)?;
        result.pages += 1;
        let before = result.len();

        let seq = scraper.parsers.extract_page_text(&page.content()?);
        let found = parser::extract_data(&seq, scraper, opts.policy)?;
        let mut skipped = found.skipped;

        for block in found.blocks {
            if let Some(d) = dump.as_deref_mut() {
                d.write_block(target, result.pages, &block)?;
            }
            match scraper.parsers.parse_data_block(&block, target) {
                Ok(record) => result.reviews.push(ScrapedReview { record, block }),
                Err(e) => {
                    opts.policy.check(Err(e))?;
                    skipped += 1;
                }
            }
        }
        debug_assert!(result.len() >= before);

        if skipped > 0 {
            debug!("Skipped {} bad blocks on page {}", skipped, result.pages);
        }
        pb.set_message(format!("page {}, {} reviews", result.pages, result.len()));

        if !scraper.navigators.check_next_page(page)? {
            break;
        }
        thread::sleep(opts.rate_limit);
        let fingerprint = scraper.navigators.capture_page(page)?;
        scraper.navigators.grab_next_page(page)?;
        let changed = opts
            .policy
            .check(scraper.navigators.wait_for_page(page, &fingerprint, opts.timeout))?;
        if !changed {
            // Re-reading a stale page would only duplicate records.
            info!("Stopped paging after page {}: next page never rendered", result.pages);
            break;
        }
    }
    pb.finish_and_clear();

    result.expected_total = opts
        .policy
        .non_critical(scraper.parsers.extract_total_count(page))?;
    match result.expected_total {
        Some(expected) => {
            opts.policy.check(validate_data_count(result.len(), expected))?;
        }
        None => warn!("No site-reported total, skipping count check"),
    }

    info!("Scraped {} reviews over {} pages", result.len(), result.pages);
    Ok(result)
}

#[derive(Debug, Default)]
pub struct BatchSummary {
    pub succeeded: Vec<(String, usize)>,
    pub failed: Vec<(String, ScrapeError)>,
    pub interrupted: bool,
}

impl BatchSummary {
    pub fn records(&self) -> usize {
        self.succeeded.iter().map(|(_, n)| n).sum()
    }

    pub fn print(&self) {
        for (name, n) in &self.succeeded {
            println!("  ok      {:<32} {:>6} reviews", name, n);
        }
        for (name, e) in &self.failed {
            let first_line = e.to_string().lines().next().unwrap_or_default().to_string();
            println!("  FAILED  {:<32} {}", name, first_line);
        }
        println!(
            "{} targets ok, {} failed, {} reviews saved{}",
            self.succeeded.len(),
            self.failed.len(),
            self.records(),
            if self.interrupted { " (interrupted)" } else { "" }
        );
    }
}

/// Run every target in order. A failure on one target is logged and recorded;
/// only fatal errors end the batch early. Any failure that lands after an
/// interrupt counts as the interrupt, since Chrome gets the same signal.
pub fn scrape_targets(
    page: &dyn Page,
    scraper: &Scraper,
    targets: &[Target],
    opts: &RunOptions,
    sink: &mut dyn ResultSink,
    mut dump: Option<&mut RawDump>,
    interrupt: &AtomicBool,
) -> Result<BatchSummary, ScrapeError> {
    let mut summary = BatchSummary::default();

    for (i, target) in targets.iter().enumerate() {
        if interrupt.load(Ordering::SeqCst) {
            summary.interrupted = true;
            break;
        }
        if i > 0 {
            thread::sleep(opts.rate_limit);
        }
        info!("[{}/{}] Scraping {} ({})", i + 1, targets.len(), target.name, target.entry_url);

        match scrape_target(page, scraper, target, opts, dump.as_deref_mut(), interrupt) {
            Ok(result) => {
                sink.persist(&result)?;
                summary.succeeded.push((target.name.clone(), result.len()));
            }
            Err(e) if matches!(e, ScrapeError::Interrupted) || interrupt.load(Ordering::SeqCst) => {
                warn!("Interrupted while scraping {}, nothing saved for it", target.name);
                debug!("Error after interrupt: {}", e);
                summary.interrupted = true;
                break;
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                error!("Failed to scrape {} ({}): {}", target.name, target.entry_url, e);
                summary.failed.push((target.name.clone(), e));
            }
        }
    }

    Ok(summary)
}
