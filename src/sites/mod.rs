//! Per-site capability contracts and the registry that maps a config's
//! `scraper` name to one implementation of each.

pub mod seek;

use std::time::Duration;

use regex::Regex;

use crate::browser::Page;
use crate::error::ScrapeError;
use crate::parser::blocks::{self, BlockLayout, DataBlock, IndexWindow, RawTextSequence};
use crate::parser::validate;
use crate::record::{ReviewRecord, Target};

/// Names accepted in a scrape config's `scraper` key.
pub const AVAILABLE: &[&str] = &["Seek"];

pub trait Validators {
    /// Shape every entry URL for this site must have.
    fn url_pattern(&self) -> &Regex;

    fn validate_url(&self, url: &str) -> Result<(), ScrapeError> {
        validate::validate_url(self.url_pattern(), url)
    }

    /// Structural assertions on a located block. Runs before parsing.
    fn validate_data_block(&self, block: &DataBlock) -> Result<(), ScrapeError>;
}

pub trait Parsers {
    fn layout(&self) -> &BlockLayout;

    /// The site-reported number of reviews. Best-effort.
    fn extract_total_count(&self, page: &dyn Page) -> Result<usize, ScrapeError>;

    fn extract_page_text(&self, markup: &str) -> RawTextSequence;

    fn extract_data_indices(&self, seq: &RawTextSequence) -> Vec<usize> {
        blocks::extract_data_indices(seq, &self.layout().anchor)
    }

    fn extract_data_bounds(&self, idx: usize) -> IndexWindow {
        self.layout().window_at(idx)
    }

    fn parse_data_block(&self, block: &DataBlock, target: &Target) -> Result<ReviewRecord, ScrapeError>;
}

/// Opaque snapshot of page content, compared to tell whether new content has
/// rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint(pub Vec<String>);

pub trait Navigators {
    /// Block until the page's always-present marker shows up.
    fn wait_for_entry(&self, page: &dyn Page, timeout: Duration) -> Result<(), ScrapeError>;

    /// Whether the next-page control is present and enabled. Does not touch
    /// the page.
    fn check_next_page(&self, page: &dyn Page) -> Result<bool, ScrapeError>;

    fn grab_next_page(&self, page: &dyn Page) -> Result<(), ScrapeError>;

    fn capture_page(&self, page: &dyn Page) -> Result<Fingerprint, ScrapeError>;

    /// Block until the content fingerprint differs from `before`. A timeout
    /// is a data-quality failure, not a navigation one.
    fn wait_for_page(&self, page: &dyn Page, before: &Fingerprint, timeout: Duration) -> Result<(), ScrapeError>;
}

/// One site's implementation of every capability.
pub struct Scraper {
    pub name: &'static str,
    pub validators: Box<dyn Validators>,
    pub parsers: Box<dyn Parsers>,
    pub navigators: Box<dyn Navigators>,
}

pub fn build(name: &str) -> Result<Scraper, ScrapeError> {
    match name {
        "Seek" => Ok(seek::site()),
        other => Err(ScrapeError::InvalidConfigFile(format!(
            "unknown scraper {:?}, available: {}",
            other,
            AVAILABLE.join(", ")
        ))),
    }
}
