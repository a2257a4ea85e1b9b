//! Page assembly: visible-budget pagination with overlap and ruby safety.
//!
//! Pipeline: [`PositionMap`] → [`BoundarySelector`] → slice overlap / main
//! markup → [`chunk_markup`]. The resulting [`PageSet`] is immutable.

use std::ops::Range;
use std::time::Instant;

use log::{debug, info, warn};
use serde::Serialize;

use crate::boundary::{BoundarySelector, DEFAULT_DELIMITERS, DEFAULT_SEARCH_FRACTION};
use crate::chunk::{DEFAULT_CHUNK_SIZE, chunk_markup};
use crate::position::PositionMap;

/// Default upper bound of visible characters per page.
pub const DEFAULT_MAX_CHARS_PER_PAGE: usize = 10_000;

/// Default visible characters repeated from the previous page.
pub const DEFAULT_OVERLAP_CHARS: usize = 10;

/// Pagination parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct PaginationOptions {
    pub max_chars_per_page: usize,
    pub overlap_chars: usize,
    pub chunk_size: usize,
    /// Lookahead for a delimiter, as a fraction of the per-page budget.
    pub boundary_search_fraction: f64,
    /// Delimiters in priority order.
    pub delimiter_priority: Vec<char>,
}

impl Default for PaginationOptions {
    fn default() -> Self {
        Self {
            max_chars_per_page: DEFAULT_MAX_CHARS_PER_PAGE,
            overlap_chars: DEFAULT_OVERLAP_CHARS,
            chunk_size: DEFAULT_CHUNK_SIZE,
            boundary_search_fraction: DEFAULT_SEARCH_FRACTION,
            delimiter_priority: DEFAULT_DELIMITERS.to_vec(),
        }
    }
}

/// One page of a paginated document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub index: usize,
    /// Visible range shown on this page, overlap included.
    pub visible: Range<usize>,
    /// First visible index not repeated from the previous page.
    pub main_start: usize,
    /// Markup repeated from the end of the previous page (dimmed by renderers).
    pub overlap: Vec<String>,
    /// Markup of the page's own content, split into render chunks.
    pub main: Vec<String>,
    pub visible_char_count: usize,
}

impl Page {
    /// Visible range owned by this page (overlap excluded).
    pub fn main_range(&self) -> Range<usize> {
        self.main_start..self.visible.end
    }

    pub fn overlap_range(&self) -> Range<usize> {
        self.visible.start..self.main_start
    }

    pub fn is_empty(&self) -> bool {
        self.visible_char_count == 0
    }

    /// All fragments in display order.
    pub fn fragments(&self) -> impl Iterator<Item = &str> {
        self.overlap.iter().chain(self.main.iter()).map(String::as_str)
    }
}

/// Pages of one document, created once per document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageSet {
    pages: Vec<Page>,
    total_visible_chars: usize,
    chars_per_page: usize,
}

impl PageSet {
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page(&self, index: usize) -> Option<&Page> {
        self.pages.get(index)
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Pages with at least one visible character.
    pub fn valid_page_count(&self) -> usize {
        self.pages.iter().filter(|p| !p.is_empty()).count()
    }

    /// Whether `index` (0-based) names a non-empty page.
    pub fn is_valid_page(&self, index: usize) -> bool {
        self.pages.get(index).is_some_and(|p| !p.is_empty())
    }

    pub fn total_visible_chars(&self) -> usize {
        self.total_visible_chars
    }

    /// Per-page budget the pages were cut against (0 for an empty document).
    pub fn chars_per_page(&self) -> usize {
        self.chars_per_page
    }

    /// Page owning visible character `v` (overlap copies are not counted).
    pub fn page_containing(&self, v: usize) -> Option<usize> {
        if v >= self.total_visible_chars {
            return None;
        }
        let idx = self.pages.partition_point(|p| p.main_start <= v);
        idx.checked_sub(1)
    }
}

/// Paginate `markup` with `options`.
pub fn paginate(markup: &str, options: &PaginationOptions) -> PageSet {
    let map = PositionMap::build(markup);
    paginate_with_map(markup, &map, options)
}

/// Paginate using a prebuilt map of the same `markup`.
pub fn paginate_with_map(markup: &str, map: &PositionMap, options: &PaginationOptions) -> PageSet {
    let start_time = Instant::now();
    let total = map.visible_len();

    if total == 0 {
        info!("paginate: document has no visible characters, emitting one empty page");
        return PageSet {
            pages: vec![Page {
                index: 0,
                visible: 0..0,
                main_start: 0,
                overlap: Vec::new(),
                main: Vec::new(),
                visible_char_count: 0,
            }],
            total_visible_chars: 0,
            chars_per_page: 0,
        };
    }

    let max_chars = options.max_chars_per_page.max(1);
    let page_count = total.div_ceil(max_chars);
    let budget = total.div_ceil(page_count);
    // Overlap must stay below the budget or pages stop advancing.
    let overlap = if options.overlap_chars >= budget {
        let clamped = budget.saturating_sub(1);
        warn!(
            "paginate: overlap {} >= budget {budget}, clamping to {clamped}",
            options.overlap_chars
        );
        clamped
    } else {
        options.overlap_chars
    };
    let selector = BoundarySelector::new(
        map.text(),
        budget,
        options.boundary_search_fraction,
        &options.delimiter_priority,
    );

    let mut pages = Vec::with_capacity(page_count);
    let mut prev_end = 0;
    for index in 0..page_count {
        // A ruby group can carry a page past several budgets.
        if index > 0 && prev_end >= total {
            debug!("paginate: text exhausted after {index} pages");
            break;
        }
        let is_final = index + 1 == page_count;
        let start = if index == 0 {
            0
        } else {
            map.snap_backward(prev_end.saturating_sub(overlap))
        };
        let mut end = selector.end_for(start, is_final);
        if end <= prev_end {
            // start was pulled back over a long group; measure from the main start
            end = selector.end_for(prev_end, is_final);
        }
        let end = map.snap_forward(end);
        let main_start = if index == 0 { 0 } else { prev_end };

        let overlap_segments = if main_start > start {
            vec![map.slice(markup, start..main_start)]
        } else {
            Vec::new()
        };
        let main_markup = map.slice(markup, main_start..end);
        let main = chunk_markup(&main_markup, options.chunk_size);

        debug!(
            "page {}: visible {start}..{end} ({} chars, overlap {} chars, {} chunks)",
            index + 1,
            end - start,
            main_start - start,
            main.len()
        );
        pages.push(Page {
            index,
            visible: start..end,
            main_start,
            overlap: overlap_segments,
            main,
            visible_char_count: end - start,
        });
        prev_end = end;
    }

    info!(
        "paginate: completed in {:.1}ms ({} visible chars, {} pages, budget {budget})",
        start_time.elapsed().as_secs_f64() * 1000.0,
        total,
        pages.len()
    );
    PageSet {
        pages,
        total_visible_chars: total,
        chars_per_page: budget,
    }
}
