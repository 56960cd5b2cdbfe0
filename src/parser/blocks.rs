use regex::Regex;

/// Text fragments of one rendered page, in document order. Every offset in a
/// `BlockLayout` is relative to positions in this sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTextSequence(pub Vec<String>);

impl RawTextSequence {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn fragments(&self) -> &[String] {
        &self.0
    }
}

impl From<Vec<String>> for RawTextSequence {
    fn from(v: Vec<String>) -> Self {
        RawTextSequence(v)
    }
}

/// Half-open window `[start, end)` into a `RawTextSequence`. Signed so that a
/// window computed from an anchor too close to the top of the page can be
/// represented and rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexWindow {
    pub start: isize,
    pub end: isize,
}

impl IndexWindow {
    pub fn overlaps(&self, other: &IndexWindow) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Fixed-length slice of a sequence believed to hold one review's fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataBlock {
    pub window: IndexWindow,
    pub fields: Vec<String>,
}

impl DataBlock {
    pub fn get(&self, idx: usize) -> Option<&str> {
        self.fields.get(idx).map(String::as_str)
    }

    /// Index of the first fragment equal to `label` (after trimming).
    pub fn position_of(&self, label: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.trim() == label)
    }
}

/// Where a site's review blocks sit relative to their anchor fragment.
#[derive(Debug, Clone)]
pub struct BlockLayout {
    /// Matches exactly one fragment per review.
    pub anchor: Regex,
    /// Distance of the anchor from the start of its block.
    pub anchor_offset: usize,
    /// Number of fragments in a block.
    pub length: usize,
}

impl BlockLayout {
    pub fn window_at(&self, idx: usize) -> IndexWindow {
        extract_data_bounds(idx, self.anchor_offset, self.length)
    }
}

/// Every position whose fragment matches the anchor.
pub fn extract_data_indices(seq: &RawTextSequence, anchor: &Regex) -> Vec<usize> {
    seq.0
        .iter()
        .enumerate()
        .filter(|(_, text)| anchor.is_match(text))
        .map(|(i, _)| i)
        .collect()
}

pub fn extract_data_bounds(idx: usize, offset: usize, length: usize) -> IndexWindow {
    let idx = idx as isize;
    let offset = offset as isize;
    IndexWindow {
        start: idx - offset,
        end: idx + length as isize - offset,
    }
}

/// Slice the window out of the sequence. Callers validate bounds first; a
/// window that still falls outside yields `None`.
pub fn extract_data_block(seq: &RawTextSequence, window: IndexWindow) -> Option<DataBlock> {
    if window.start < 0 || window.end < window.start {
        return None;
    }
    let fields = seq.0.get(window.start as usize..window.end as usize)?;
    Some(DataBlock {
        window,
        fields: fields.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(items: &[&str]) -> RawTextSequence {
        items.iter().map(|s| s.to_string()).collect::<Vec<_>>().into()
    }

    #[test]
    fn bounds_arithmetic() {
        for (idx, offset, length) in [(25, 25, 29), (0, 0, 1), (100, 7, 12), (3, 10, 29)] {
            let w = extract_data_bounds(idx, offset, length);
            assert_eq!(w.start, idx as isize - offset as isize);
            assert_eq!(w.end, (idx + length) as isize - offset as isize);
            assert_eq!(w.end - w.start, length as isize);
        }
    }

    #[test]
    fn anchor_too_close_to_top_goes_negative() {
        let w = extract_data_bounds(3, 25, 29);
        assert_eq!(w, IndexWindow { start: -22, end: 7 });
    }

    #[test]
    fn indices_match_anchor() {
        let anchor = Regex::new(r"^The good things$").unwrap();
        let s = seq(&["x", "The good things", "y", "The good things and more", "The good things"]);
        assert_eq!(extract_data_indices(&s, &anchor), vec![1, 4]);
    }

    #[test]
    fn block_slices_window() {
        let s = seq(&["a", "b", "c", "d"]);
        let block = extract_data_block(&s, IndexWindow { start: 1, end: 3 }).unwrap();
        assert_eq!(block.fields, vec!["b", "c"]);
        assert_eq!(block.position_of("c"), Some(1));
        assert!(extract_data_block(&s, IndexWindow { start: -1, end: 2 }).is_none());
        assert!(extract_data_block(&s, IndexWindow { start: 2, end: 9 }).is_none());
    }

    #[test]
    fn overlap() {
        let a = IndexWindow { start: 0, end: 29 };
        let b = IndexWindow { start: 29, end: 58 };
        let c = IndexWindow { start: 28, end: 57 };
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&b));
    }
}
