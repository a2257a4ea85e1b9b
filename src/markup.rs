//! Markup tokenizer for sanitized inline ruby markup.
//!
//! The input is never arbitrary HTML: an upstream sanitizer guarantees that
//! only `ruby` / `rb` / `rp` / `rt` / `br` appear, that ruby groups are
//! balanced and at most one level deep, and that attribute values are
//! escaped. The tokenizer therefore does not build a tree; it walks the
//! string once and classifies every raw position.
//!
//! Every consumer (position map, chunker, page serializer) shares this one
//! scanner so tag-boundary and nesting rules cannot drift apart.

use std::ops::Range;

use log::warn;

/// Grouping element that must never be split.
pub const RUBY: &str = "ruby";

/// Line-break element. Counts as one visible full-width space.
pub const LINE_BREAK: &str = "br";

/// U+3000 IDEOGRAPHIC SPACE.
pub const FULL_WIDTH_SPACE: char = '\u{3000}';

/// Longest character reference we try to decode (`&#x10FFFF;` is 10 bytes).
const MAX_ENTITY_LEN: usize = 10;

/// Classification of a raw markup position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    /// Visible text outside any ruby group.
    OutsideVisible,
    /// Visible text inside a ruby group (base text, parentheses or reading).
    ProtectedVisible,
    /// Part of a tag's `<...>` syntax.
    InsideTag,
}

/// A tag, with its raw byte range in the scanned string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag<'a> {
    pub raw: Range<usize>,
    /// Element name as written (case preserved).
    pub name: &'a str,
    pub closing: bool,
}

impl<'a> Tag<'a> {
    fn parse(src: &'a str, raw: Range<usize>) -> Self {
        // Strip `<` and `>`.
        let inner = src[raw.start + 1..raw.end - 1].trim_start();
        let (closing, rest) = match inner.strip_prefix('/') {
            Some(r) => (true, r.trim_start()),
            None => (false, inner),
        };
        let name_len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
            .unwrap_or(rest.len());
        Tag {
            raw,
            name: &rest[..name_len],
            closing,
        }
    }

    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    pub fn is_ruby(&self) -> bool {
        self.is(RUBY)
    }
}

/// One scanned unit of markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    /// Any tag other than a line break.
    Tag(Tag<'a>),
    /// `<br>`: tag syntax in the raw string, one full-width space when visible.
    LineBreak { raw: Range<usize>, protected: bool },
    /// A visible character. `raw` spans several bytes for multi-byte UTF-8
    /// and for character references such as `&amp;`.
    Char {
        ch: char,
        raw: Range<usize>,
        protected: bool,
    },
}

impl Token<'_> {
    pub fn raw(&self) -> Range<usize> {
        match self {
            Token::Tag(tag) => tag.raw.clone(),
            Token::LineBreak { raw, .. } | Token::Char { raw, .. } => raw.clone(),
        }
    }

    /// The character this token contributes to the visible stream, if any.
    pub fn visible_char(&self) -> Option<char> {
        match self {
            Token::Tag(_) => None,
            Token::LineBreak { .. } => Some(FULL_WIDTH_SPACE),
            Token::Char { ch, .. } => Some(*ch),
        }
    }

    /// Classification of the token's raw bytes.
    pub fn class(&self) -> CharClass {
        match self {
            Token::Tag(_) | Token::LineBreak { .. } => CharClass::InsideTag,
            Token::Char {
                protected: true, ..
            } => CharClass::ProtectedVisible,
            Token::Char { .. } => CharClass::OutsideVisible,
        }
    }
}

/// Streaming tokenizer over a markup string.
///
/// Never fails: a `<` without a matching `>` ends tag recognition and the
/// rest of the input is yielded as plain visible characters.
pub struct Tokenizer<'a> {
    src: &'a str,
    pos: usize,
    ruby_depth: usize,
    truncated: bool,
}

impl<'a> Tokenizer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            ruby_depth: 0,
            truncated: false,
        }
    }

    /// Ruby nesting depth after the most recently yielded token.
    pub fn ruby_depth(&self) -> usize {
        self.ruby_depth
    }

    /// Whether an unterminated tag was hit.
    pub fn truncated(&self) -> bool {
        self.truncated
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        let rest = self.src.get(self.pos..)?;
        let ch = rest.chars().next()?;
        let start = self.pos;

        if ch == '<' && !self.truncated {
            match rest[1..].find('>') {
                Some(rel) => {
                    let end = start + 1 + rel + 1;
                    self.pos = end;
                    let tag = Tag::parse(self.src, start..end);
                    if tag.is_ruby() {
                        if tag.closing {
                            self.ruby_depth = self.ruby_depth.saturating_sub(1);
                        } else {
                            self.ruby_depth += 1;
                        }
                    }
                    if tag.is(LINE_BREAK) {
                        return Some(Token::LineBreak {
                            raw: start..end,
                            protected: self.ruby_depth > 0,
                        });
                    }
                    return Some(Token::Tag(tag));
                }
                None => {
                    warn!(
                        "markup: unterminated tag at byte {start}, treating remaining {} bytes as text",
                        rest.len()
                    );
                    self.truncated = true;
                }
            }
        }

        let protected = self.ruby_depth > 0;
        if ch == '&'
            && let Some((decoded, len)) = decode_entity(rest)
        {
            self.pos += len;
            return Some(Token::Char {
                ch: decoded,
                raw: start..start + len,
                protected,
            });
        }

        self.pos += ch.len_utf8();
        Some(Token::Char {
            ch,
            raw: start..self.pos,
            protected,
        })
    }
}

/// Decode a character reference at the start of `s`.
///
/// Returns the character and the reference's byte length. Unknown or
/// unterminated references yield `None` and the `&` stays a plain character.
fn decode_entity(s: &str) -> Option<(char, usize)> {
    let semi = s.bytes().take(MAX_ENTITY_LEN + 1).position(|b| b == b';')?;
    let body = &s[1..semi];
    let ch = match body {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{00A0}',
        _ => {
            let num = body.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse::<u32>().ok()?,
            };
            char::from_u32(code)?
        }
    };
    Some((ch, semi + 1))
}

/// Number of visible characters in `markup`.
pub fn visible_len(markup: &str) -> usize {
    Tokenizer::new(markup)
        .filter(|t| t.visible_char().is_some())
        .count()
}

/// The visible text of `markup` with tags removed and references decoded.
pub fn visible_text(markup: &str) -> String {
    Tokenizer::new(markup).filter_map(|t| t.visible_char()).collect()
}

/// Opening minus closing ruby tags in `fragment`. Zero for a fragment that
/// can be mounted on its own.
pub fn ruby_balance(fragment: &str) -> i64 {
    Tokenizer::new(fragment)
        .filter_map(|t| match t {
            Token::Tag(tag) if tag.is_ruby() => Some(if tag.closing { -1 } else { 1 }),
            _ => None,
        })
        .sum()
}
