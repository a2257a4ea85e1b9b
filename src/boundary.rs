//! Page-end selection at natural punctuation.
//!
//! A page ends at `start + budget` unless one of the delimiter glyphs occurs
//! shortly after it. The lookahead is bounded to a fraction of the budget,
//! so page sizes vary by at most that fraction and each search is O(budget).

use std::ops::Range;

use log::trace;

/// Default delimiter priority: full-width space, full-width period,
/// closing corner bracket, ellipsis.
pub const DEFAULT_DELIMITERS: [char; 4] = ['\u{3000}', '。', '」', '…'];

/// Default lookahead as a fraction of the page budget.
pub const DEFAULT_SEARCH_FRACTION: f64 = 0.05;

/// Chooses page-end offsets over a document's visible text.
pub struct BoundarySelector<'a> {
    text: &'a [char],
    budget: usize,
    search_fraction: f64,
    delimiters: &'a [char],
}

impl<'a> BoundarySelector<'a> {
    pub fn new(
        text: &'a [char],
        budget: usize,
        search_fraction: f64,
        delimiters: &'a [char],
    ) -> Self {
        Self {
            text,
            budget,
            search_fraction,
            delimiters,
        }
    }

    /// Lookahead length: `ceil(budget × fraction)`.
    pub fn window_len(&self) -> usize {
        (self.budget as f64 * self.search_fraction).ceil() as usize
    }

    /// Search window for a page starting at `start`, clipped to the text.
    pub fn window(&self, start: usize) -> Range<usize> {
        let total = self.text.len();
        let candidate = (start + self.budget).min(total);
        let end = (candidate + self.window_len()).min(total);
        candidate..end
    }

    /// End offset (exclusive) of the page starting at `start`.
    ///
    /// The last page always runs to the end of the text. Otherwise the first
    /// delimiter class with a match in the window wins and the page ends just
    /// before its earliest occurrence, so the delimiter opens the next page.
    /// With no match the page ends at the raw candidate.
    pub fn end_for(&self, start: usize, is_final: bool) -> usize {
        if is_final {
            return self.text.len();
        }
        let window = self.window(start);
        let scan = &self.text[window.clone()];
        for &delim in self.delimiters {
            if let Some(rel) = scan.iter().position(|&c| c == delim) {
                let end = window.start + rel;
                trace!(
                    "boundary: start={start} window={window:?} matched {delim:?} at {end}"
                );
                return end;
            }
        }
        trace!("boundary: start={start} window={window:?} no delimiter, using candidate");
        window.start
    }
}
