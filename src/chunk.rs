//! Ruby-safe chunking of a page segment into small render units.
//!
//! Chunks carry no navigation meaning; they only let a renderer mount and
//! unmount small pieces of a long page. A cut is only ever made at ruby
//! depth 0, so each chunk is independently well-formed.

use crate::markup::{Token, Tokenizer};

/// Default visible characters per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 50;

/// Split `segment` into fragments of about `chunk_size` visible characters.
///
/// A fragment ends as soon as its visible count reaches `chunk_size` while
/// outside any ruby group: right after a visible character, or right after
/// the `</ruby>` that closes a group which pushed the count past the limit.
/// Tags are neither counted nor split. Empty input yields no fragments.
pub fn chunk_markup(segment: &str, chunk_size: usize) -> Vec<String> {
    let chunk_size = chunk_size.max(1);
    let mut chunks = Vec::new();
    let mut last = 0;
    let mut count = 0;

    let mut tokens = Tokenizer::new(segment);
    while let Some(token) = tokens.next() {
        match &token {
            Token::Tag(tag) if tag.is_ruby() && tag.closing => {}
            Token::Tag(_) => continue,
            Token::LineBreak { .. } | Token::Char { .. } => count += 1,
        }
        if count >= chunk_size && tokens.ruby_depth() == 0 {
            let cut = token.raw().end;
            chunks.push(segment[last..cut].to_string());
            last = cut;
            count = 0;
        }
    }
    if last < segment.len() {
        chunks.push(segment[last..].to_string());
    }
    chunks
}
