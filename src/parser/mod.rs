pub mod blocks;
pub mod fields;
pub mod text;
pub mod validate;

use tracing::debug;

use crate::error::{DataPolicy, ScrapeError};
use crate::sites::Scraper;
use blocks::{DataBlock, IndexWindow, RawTextSequence};

/// Validated blocks of one page, plus how many candidates lenient mode
/// dropped.
#[derive(Debug, Default)]
pub struct PageBlocks {
    pub blocks: Vec<DataBlock>,
    pub skipped: usize,
}

/// Per-page pipeline: anchors → windows → bounds/overlap checks → slice →
/// site structural checks. Soft failures go through `policy`.
pub fn extract_data(
    seq: &RawTextSequence,
    scraper: &Scraper,
    policy: DataPolicy,
) -> Result<PageBlocks, ScrapeError> {
    let mut out = PageBlocks::default();
    let mut accepted: Vec<IndexWindow> = Vec::new();

    for idx in scraper.parsers.extract_data_indices(seq) {
        let window = scraper.parsers.extract_data_bounds(idx);
        if !policy.check(validate::validate_data_bounds(window, seq))? {
            out.skipped += 1;
            continue;
        }
        if !policy.check(validate::validate_for_overlap(&accepted, window))? {
            out.skipped += 1;
            continue;
        }
        let Some(block) = blocks::extract_data_block(seq, window) else {
            out.skipped += 1;
            continue;
        };
        if !policy.check(scraper.validators.validate_data_block(&block))? {
            out.skipped += 1;
            continue;
        }
        accepted.push(window);
        out.blocks.push(block);
    }

    debug!(
        "{} blocks located in {} fragments ({} skipped)",
        out.blocks.len(),
        seq.len(),
        out.skipped
    );
    Ok(out)
}
