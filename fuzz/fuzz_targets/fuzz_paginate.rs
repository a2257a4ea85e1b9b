#![no_main]

use libfuzzer_sys::fuzz_target;
use tateyomi::markup::{Token, Tokenizer, ruby_balance, visible_len};
use tateyomi::paginate::{PaginationOptions, paginate};

fuzz_target!(|data: &[u8]| {
    // First bytes pick the options, the rest is the document.
    let [max, overlap, chunk, rest @ ..] = data else {
        return;
    };
    let Ok(markup) = std::str::from_utf8(rest) else {
        return;
    };
    let opts = PaginationOptions {
        max_chars_per_page: *max as usize + 1,
        overlap_chars: *overlap as usize % (*max as usize / 2 + 1),
        chunk_size: *chunk as usize + 1,
        ..PaginationOptions::default()
    };

    let set = paginate(markup, &opts);
    let total = visible_len(markup);
    assert_eq!(set.total_visible_chars(), total);

    let last = set.pages().last().expect("page set is never empty");
    assert_eq!(last.visible.end, total);

    let mut prev_end = 0;
    for page in set.pages() {
        assert!(page.visible.start <= prev_end, "gap before page {}", page.index);
        if page.index > 0 {
            assert!(page.visible.end > prev_end, "page {} does not advance", page.index);
        }
        let counted: usize = page.fragments().map(visible_len).sum();
        assert_eq!(counted, page.visible_char_count);
        prev_end = page.visible.end;
    }

    // Ruby safety only holds for input that keeps the balanced-group contract.
    if well_formed(markup) {
        for page in set.pages() {
            for frag in page.fragments() {
                assert_eq!(ruby_balance(frag), 0, "page {} splits a group: {frag:?}", page.index);
            }
        }
    }

    assert_eq!(paginate(markup, &opts), set);
});

/// Ruby groups balanced and never nested.
fn well_formed(markup: &str) -> bool {
    let mut depth = 0;
    for token in Tokenizer::new(markup) {
        if let Token::Tag(tag) = token
            && tag.is_ruby()
        {
            match (tag.closing, depth) {
                (false, 0) => depth = 1,
                (true, 1) => depth = 0,
                _ => return false,
            }
        }
    }
    depth == 0
}
