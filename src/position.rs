//! Visible-character ↔ raw-markup offset mapping.
//!
//! Built in one linear pass over [`Tokenizer`] output. Besides the offset
//! column the map keeps the decoded visible text (for boundary search) and
//! the visible extent of every ruby group, so callers can keep cuts outside
//! protected elements.

use std::ops::Range;
use std::time::Instant;

use log::{debug, trace};

use crate::markup::{FULL_WIDTH_SPACE, Token, Tokenizer};

/// Visible extent of one ruby group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RubyGroup {
    /// Visible characters covered by the group (base text and readings).
    pub visible: Range<usize>,
    /// Raw offset of the group's opening `<ruby>` tag.
    pub open_raw: usize,
}

/// Mapping between visible character indices and raw byte offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionMap {
    /// `offsets[v]` is the raw start of visible char `v`; the last entry is
    /// the sentinel `raw_len`.
    offsets: Vec<usize>,
    text: Vec<char>,
    groups: Vec<RubyGroup>,
}

impl PositionMap {
    /// Scan `markup` once and build the map.
    pub fn build(markup: &str) -> Self {
        let start = Instant::now();
        let mut offsets = Vec::with_capacity(markup.len() / 3 + 1);
        let mut text = Vec::with_capacity(markup.len() / 3);
        let mut groups = Vec::new();
        // (visible start, raw offset of <ruby>) of the group being scanned
        let mut open: Option<(usize, usize)> = None;

        let mut tokens = Tokenizer::new(markup);
        while let Some(token) = tokens.next() {
            match &token {
                Token::Tag(tag) if tag.is_ruby() => {
                    let depth = tokens.ruby_depth();
                    if !tag.closing && depth == 1 {
                        open = Some((text.len(), tag.raw.start));
                    } else if tag.closing
                        && depth == 0
                        && let Some((vis_start, open_raw)) = open.take()
                    {
                        push_group(&mut groups, vis_start..text.len(), open_raw);
                    }
                }
                Token::Tag(_) => {}
                Token::LineBreak { raw, .. } => {
                    offsets.push(raw.start);
                    text.push(FULL_WIDTH_SPACE);
                }
                Token::Char { ch, raw, .. } => {
                    offsets.push(raw.start);
                    text.push(*ch);
                }
            }
        }
        // Unclosed group at end of input: protect through the end.
        if let Some((vis_start, open_raw)) = open {
            push_group(&mut groups, vis_start..text.len(), open_raw);
        }
        offsets.push(markup.len());

        debug!(
            "position: built map in {:.1}ms ({} visible chars, {} raw bytes, {} ruby groups)",
            start.elapsed().as_secs_f64() * 1000.0,
            text.len(),
            markup.len(),
            groups.len()
        );
        Self {
            offsets,
            text,
            groups,
        }
    }

    /// Total visible characters.
    pub fn visible_len(&self) -> usize {
        self.text.len()
    }

    /// Byte length of the markup the map was built from.
    pub fn raw_len(&self) -> usize {
        self.offsets[self.offsets.len() - 1]
    }

    /// Decoded visible text, one `char` per visible index.
    pub fn text(&self) -> &[char] {
        &self.text
    }

    pub fn visible_string(&self, range: Range<usize>) -> String {
        let end = range.end.min(self.text.len());
        let start = range.start.min(end);
        self.text[start..end].iter().collect()
    }

    pub fn ruby_groups(&self) -> &[RubyGroup] {
        &self.groups
    }

    /// `(visible index, raw offset)` pairs, sentinel included.
    pub fn entries(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.offsets.iter().copied().enumerate()
    }

    /// Raw offset of visible char `v`. Indices past the end clamp to the
    /// sentinel (`raw_len`).
    pub fn raw_offset(&self, v: usize) -> usize {
        self.offsets[v.min(self.offsets.len() - 1)]
    }

    /// Visible index of the first visible char starting at or after `raw`.
    /// Offsets past the last visible char clamp to `visible_len`.
    pub fn visible_index(&self, raw: usize) -> usize {
        self.offsets[..self.text.len()].partition_point(|&o| o < raw)
    }

    /// Group that a cut before visible char `v` would split, if any.
    fn group_split_at(&self, v: usize) -> Option<&RubyGroup> {
        let idx = self.groups.partition_point(|g| g.visible.start < v);
        let group = self.groups.get(idx.checked_sub(1)?)?;
        (v < group.visible.end).then_some(group)
    }

    /// Move a cut that falls inside a ruby group to the group's end.
    pub fn snap_forward(&self, v: usize) -> usize {
        match self.group_split_at(v) {
            Some(g) => {
                trace!("position: cut {v} inside ruby {:?}, moving to end", g.visible);
                g.visible.end
            }
            None => v,
        }
    }

    /// Move a cut that falls inside a ruby group to the group's start.
    pub fn snap_backward(&self, v: usize) -> usize {
        match self.group_split_at(v) {
            Some(g) => {
                trace!("position: cut {v} inside ruby {:?}, moving to start", g.visible);
                g.visible.start
            }
            None => v,
        }
    }

    /// Raw offset for a cut placed before visible char `v`.
    ///
    /// A cut at the first character of a ruby group lands before the group's
    /// opening tag, so the `<ruby><rb>` prefix travels with its text.
    pub fn boundary_raw(&self, v: usize) -> usize {
        let idx = self.groups.partition_point(|g| g.visible.start < v);
        match self.groups.get(idx) {
            Some(g) if g.visible.start == v => g.open_raw,
            _ => self.raw_offset(v),
        }
    }

    /// Raw byte range holding visible range `range`.
    ///
    /// The document's leading and trailing markup belongs to the first and
    /// last ranges respectively.
    pub fn raw_range(&self, range: Range<usize>) -> Range<usize> {
        let total = self.visible_len();
        let end = range.end.min(total);
        let start = range.start.min(end);
        let raw_start = if start == 0 { 0 } else { self.boundary_raw(start) };
        let raw_end = if end == total {
            self.raw_len()
        } else {
            self.boundary_raw(end)
        };
        raw_start..raw_end.max(raw_start)
    }

    /// Re-serialize visible range `range` of `markup` as standalone markup.
    ///
    /// `<br>` is written as the full-width space it counts as, so the
    /// fragment's visible length equals `range.len()`.
    pub fn slice(&self, markup: &str, range: Range<usize>) -> String {
        if range.start >= range.end.min(self.visible_len()) {
            return String::new();
        }
        let raw = self.raw_range(range);
        let src = &markup[raw];
        let mut out = String::with_capacity(src.len());
        for token in Tokenizer::new(src) {
            match token {
                Token::LineBreak { .. } => out.push(FULL_WIDTH_SPACE),
                other => out.push_str(&src[other.raw()]),
            }
        }
        out
    }
}

fn push_group(groups: &mut Vec<RubyGroup>, visible: Range<usize>, open_raw: usize) {
    // Empty groups protect nothing.
    if !visible.is_empty() {
        groups.push(RubyGroup { visible, open_raw });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::{ruby_balance, visible_len};

    const NEKO: &str = "吾輩は猫である。<ruby><rb>名前</rb><rp>（</rp><rt>なまえ</rt><rp>）</rp></ruby>はまだ無い。";

    #[test]
    fn one_entry_per_visible_char_plus_sentinel() {
        let map = PositionMap::build(NEKO);
        let entries: Vec<(usize, usize)> = map.entries().collect();
        assert_eq!(map.visible_len(), visible_len(NEKO));
        assert_eq!(entries.len(), map.visible_len() + 1);
        assert_eq!(*entries.last().unwrap(), (21, NEKO.len()));
        for pair in entries.windows(2) {
            assert!(pair[0].0 < pair[1].0);
            assert!(pair[0].1 < pair[1].1, "raw offsets must increase: {pair:?}");
        }
    }

    #[test]
    fn raw_offsets_point_at_characters() {
        let map = PositionMap::build(NEKO);
        for (v, &ch) in map.text().iter().enumerate() {
            let raw = map.raw_offset(v);
            assert_eq!(NEKO[raw..].chars().next(), Some(ch), "visible {v}");
        }
    }

    #[test]
    fn lookup_clamps_past_end() {
        let map = PositionMap::build("abc");
        assert_eq!(map.raw_offset(3), 3);
        assert_eq!(map.raw_offset(100), 3);
        assert_eq!(map.visible_index(100), 3);
    }

    #[test]
    fn inverse_lookup() {
        let map = PositionMap::build("a<ruby>b</ruby>c");
        // 'a' at 0, 'b' at 7, 'c' at 15
        assert_eq!(map.visible_index(0), 0);
        assert_eq!(map.visible_index(1), 1); // inside <ruby> → next visible is 'b'
        assert_eq!(map.visible_index(7), 1);
        assert_eq!(map.visible_index(8), 2);
        assert_eq!(map.visible_index(15), 2);
        assert_eq!(map.visible_index(16), 3);
    }

    #[test]
    fn records_ruby_groups() {
        let map = PositionMap::build(NEKO);
        let open_raw = NEKO.find("<ruby>").unwrap();
        assert_eq!(
            map.ruby_groups(),
            &[RubyGroup {
                visible: 8..15,
                open_raw
            }]
        );
    }

    #[test]
    fn adjacent_groups_stay_distinct() {
        let map = PositionMap::build("<ruby>ab</ruby><ruby>cd</ruby>");
        let ranges: Vec<Range<usize>> = map.ruby_groups().iter().map(|g| g.visible.clone()).collect();
        assert_eq!(ranges, vec![0..2, 2..4]);
        assert_eq!(map.snap_forward(2), 2);
        assert_eq!(map.snap_forward(1), 2);
        assert_eq!(map.snap_forward(3), 4);
        assert_eq!(map.snap_backward(3), 2);
    }

    #[test]
    fn snapping_outside_groups_is_identity() {
        let map = PositionMap::build(NEKO);
        for v in [0, 5, 8, 15, 20, 21] {
            assert_eq!(map.snap_forward(v), v);
            assert_eq!(map.snap_backward(v), v);
        }
        assert_eq!(map.snap_forward(9), 15);
        assert_eq!(map.snap_backward(14), 8);
    }

    #[test]
    fn boundary_before_group_includes_opening_tag() {
        let map = PositionMap::build(NEKO);
        assert_eq!(map.boundary_raw(8), NEKO.find("<ruby>").unwrap());
        assert_eq!(map.boundary_raw(15), NEKO.find("はまだ").unwrap());
    }

    #[test]
    fn slice_whole_document_is_identity() {
        let map = PositionMap::build(NEKO);
        assert_eq!(map.slice(NEKO, 0..21), NEKO);
    }

    #[test]
    fn slice_keeps_ruby_intact() {
        let map = PositionMap::build(NEKO);
        let head = map.slice(NEKO, 0..8);
        let group = map.slice(NEKO, 8..15);
        let tail = map.slice(NEKO, 15..21);
        assert_eq!(head, "吾輩は猫である。");
        assert_eq!(
            group,
            "<ruby><rb>名前</rb><rp>（</rp><rt>なまえ</rt><rp>）</rp></ruby>"
        );
        assert_eq!(tail, "はまだ無い。");
        assert_eq!(format!("{head}{group}{tail}"), NEKO);
        assert_eq!(ruby_balance(&group), 0);
    }

    #[test]
    fn slice_replaces_line_breaks() {
        let markup = "あ<br>い";
        let map = PositionMap::build(markup);
        assert_eq!(map.visible_len(), 3);
        assert_eq!(map.slice(markup, 0..3), "あ\u{3000}い");
        assert_eq!(map.slice(markup, 1..2), "\u{3000}");
    }

    #[test]
    fn slice_never_splits_entities() {
        let markup = "a&amp;b";
        let map = PositionMap::build(markup);
        assert_eq!(map.slice(markup, 1..2), "&amp;");
        assert_eq!(map.visible_string(0..3), "a&b");
    }

    #[test]
    fn empty_and_inverted_ranges() {
        let map = PositionMap::build(NEKO);
        assert_eq!(map.slice(NEKO, 5..5), "");
        assert_eq!(map.slice(NEKO, 30..40), "");
        assert_eq!(map.slice(NEKO, 10..3), "");
    }

    #[test]
    fn empty_document() {
        let map = PositionMap::build("");
        assert_eq!(map.visible_len(), 0);
        assert_eq!(map.raw_len(), 0);
        assert_eq!(map.raw_offset(0), 0);
        assert_eq!(map.entries().collect::<Vec<_>>(), vec![(0, 0)]);
    }

    #[test]
    fn unterminated_group_protects_to_end() {
        let map = PositionMap::build("a<ruby>bcd");
        assert_eq!(map.ruby_groups()[0].visible, 1..4);
        assert_eq!(map.snap_forward(2), 4);
    }
}
