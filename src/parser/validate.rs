//! Site-independent validation. Site-specific structural checks live with
//! each site's `Validators` implementation.

use std::sync::LazyLock;

use regex::Regex;

use super::blocks::{IndexWindow, RawTextSequence};
use crate::error::{render_fragments, ScrapeError};

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9\s\-.,()'&#]+$").unwrap());

pub fn validate_name(name: &str) -> Result<(), ScrapeError> {
    if NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(ScrapeError::InvalidConfigFile(format!(
            "JSON contains invalid name format: {}",
            name
        )))
    }
}

pub fn validate_url(pattern: &Regex, url: &str) -> Result<(), ScrapeError> {
    if pattern.is_match(url) {
        Ok(())
    } else {
        Err(ScrapeError::InvalidConfigFile(format!(
            "JSON contains invalid URL format: {}\n expected: {}",
            url,
            pattern.as_str()
        )))
    }
}

/// Accepts a window iff `start >= 0` and `end < len`. The last fragment of a
/// page is never part of a block.
pub fn validate_data_bounds(window: IndexWindow, seq: &RawTextSequence) -> Result<(), ScrapeError> {
    if window.start >= 0 && window.end < seq.len() as isize {
        return Ok(());
    }
    Err(ScrapeError::OutOfBounds {
        start: window.start,
        end: window.end,
        len: seq.len(),
        context: render_fragments(seq.fragments()),
    })
}

pub fn validate_for_overlap(accepted: &[IndexWindow], window: IndexWindow) -> Result<(), ScrapeError> {
    match accepted.iter().find(|w| w.overlaps(&window)) {
        Some(w) => Err(ScrapeError::UnexpectedData {
            reason: format!(
                "overlapping data bounds [{}, {}) and [{}, {})",
                w.start, w.end, window.start, window.end
            ),
            context: String::new(),
        }),
        None => Ok(()),
    }
}

pub fn validate_data_count(actual: usize, expected: usize) -> Result<(), ScrapeError> {
    if actual == expected {
        Ok(())
    } else {
        Err(ScrapeError::UnexpectedData {
            reason: format!("expected {} reviews, got {}", expected, actual),
            context: String::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq_of(n: usize) -> RawTextSequence {
        (0..n).map(|i| i.to_string()).collect::<Vec<_>>().into()
    }

    #[test]
    fn bounds_edges() {
        let seq = seq_of(10);
        assert!(validate_data_bounds(IndexWindow { start: 0, end: 5 }, &seq).is_ok());
        assert!(validate_data_bounds(IndexWindow { start: 3, end: 9 }, &seq).is_ok());
        let err = validate_data_bounds(IndexWindow { start: 3, end: 10 }, &seq).unwrap_err();
        assert!(matches!(err, ScrapeError::OutOfBounds { end: 10, len: 10, .. }));
        assert!(validate_data_bounds(IndexWindow { start: -1, end: 5 }, &seq).is_err());
    }

    #[test]
    fn overlap_rejected() {
        let accepted = vec![IndexWindow { start: 0, end: 29 }];
        assert!(validate_for_overlap(&accepted, IndexWindow { start: 29, end: 58 }).is_ok());
        let err = validate_for_overlap(&accepted, IndexWindow { start: 20, end: 49 }).unwrap_err();
        assert!(err.is_data_quality());
    }

    #[test]
    fn names() {
        assert!(validate_name("Kmart").is_ok());
        assert!(validate_name("Woolworths Group (Retail) - QLD").is_ok());
        assert!(validate_name("Johnson & Johnson's #1").is_ok());
        assert!(validate_name("Bad<script>").is_err());
        assert!(validate_name("").is_err());
    }

    #[test]
    fn counts() {
        assert!(validate_data_count(45, 45).is_ok());
        assert!(validate_data_count(44, 45).unwrap_err().is_data_quality());
    }
}
