use std::time::{Duration, Instant};

use tateyomi::boundary::DEFAULT_DELIMITERS;
use tateyomi::chunk::chunk_markup;
use tateyomi::markup::{ruby_balance, visible_len, visible_text};
use tateyomi::paginate::{PageSet, PaginationOptions, paginate};
use tateyomi::position::PositionMap;
use tateyomi::reader::{Direction, ReaderConfig, ReaderSession, ScrollMetrics, ScrollReset};
use tateyomi::render::page_document;

const NEKO: &str = "吾輩は猫である。<ruby><rb>名前</rb><rp>（</rp><rt>なまえ</rt><rp>）</rp></ruby>はまだ無い。";

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Deterministic document generator (xorshift), mixing plain text,
/// delimiters, line breaks, entities and ruby groups.
fn document(seed: u64, pieces: usize) -> String {
    let mut state = seed | 1;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state
    };
    let mut out = String::new();
    for _ in 0..pieces {
        match next() % 10 {
            0 => out.push_str("<ruby><rb>漢字</rb><rp>（</rp><rt>かんじ</rt><rp>）</rp></ruby>"),
            1 => out.push_str("<ruby>猫<rt>ねこ</rt></ruby>"),
            2 => out.push_str("<br>"),
            3 => out.push('。'),
            4 => out.push_str("&amp;"),
            5 => out.push('」'),
            _ => {
                let n = (next() % 12) as usize + 1;
                for _ in 0..n {
                    let c = char::from_u32(0x3042 + (next() % 80) as u32).unwrap_or('あ');
                    out.push(c);
                }
            }
        }
    }
    out
}

fn corpus() -> Vec<String> {
    let mut docs = vec![
        String::new(),
        NEKO.to_string(),
        "あ".repeat(10_001),
        NEKO.repeat(400),
        "<ruby>".to_string() + &"長".repeat(300) + "</ruby>",
    ];
    for seed in 1..=12 {
        docs.push(document(seed * 7919, 400 + seed as usize * 150));
    }
    docs
}

fn option_grid() -> Vec<PaginationOptions> {
    let mut grid = Vec::new();
    for (max, overlap, chunk) in [(10_000, 10, 50), (100, 10, 50), (37, 5, 7), (250, 0, 1), (60, 30, 13)] {
        grid.push(PaginationOptions {
            max_chars_per_page: max,
            overlap_chars: overlap,
            chunk_size: chunk,
            ..PaginationOptions::default()
        });
    }
    grid
}

fn for_each_case(mut check: impl FnMut(&str, &PaginationOptions, &PageSet)) {
    init_logger();
    for doc in corpus() {
        for opts in option_grid() {
            let set = paginate(&doc, &opts);
            check(&doc, &opts, &set);
        }
    }
}

#[test]
fn coverage_without_gaps() {
    for_each_case(|doc, opts, set| {
        let total = set.total_visible_chars();
        assert_eq!(total, visible_len(doc));
        let mut covered = 0;
        for page in set.pages() {
            assert!(
                page.visible.start <= covered,
                "gap before page {} (max {})",
                page.index,
                opts.max_chars_per_page
            );
            covered = covered.max(page.visible.end);
        }
        assert_eq!(covered, total);

        // main ranges partition the document exactly
        let mains: Vec<_> = set.pages().iter().map(|p| p.main_range()).collect();
        for pair in mains.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
    });
}

#[test]
fn fragments_reassemble_visible_text() {
    for_each_case(|doc, _opts, set| {
        let expected = visible_text(doc);
        let mut rebuilt = String::new();
        for page in set.pages() {
            for frag in &page.main {
                rebuilt.push_str(&visible_text(frag));
            }
        }
        assert_eq!(rebuilt, expected);
    });
}

#[test]
fn ruby_safety_for_pages_and_chunks() {
    for_each_case(|_doc, opts, set| {
        for page in set.pages() {
            for frag in page.fragments() {
                assert_eq!(
                    ruby_balance(frag),
                    0,
                    "page {} splits a ruby group (max {}): {frag:?}",
                    page.index,
                    opts.max_chars_per_page
                );
            }
            let counted: usize = page.fragments().map(visible_len).sum();
            assert_eq!(counted, page.visible_char_count);
        }
    });
}

#[test]
fn pagination_is_idempotent() {
    for_each_case(|doc, opts, set| {
        assert_eq!(&paginate(doc, opts), set);
    });
}

#[test]
fn monotonic_boundaries() {
    for_each_case(|doc, opts, set| {
        let map = PositionMap::build(doc);
        for pair in set.pages().windows(2) {
            let (prev, page) = (&pair[0], &pair[1]);
            assert!(page.visible.end > page.visible.start);
            assert!(page.visible.end > prev.visible.end);
            let expected = prev.visible.end.saturating_sub(opts.overlap_chars);
            // only a ruby group straddling the overlap start moves it back
            assert!(page.visible.start <= expected);
            if page.visible.start < expected {
                assert!(
                    map.ruby_groups()
                        .iter()
                        .any(|g| g.visible.start == page.visible.start && g.visible.end > expected),
                    "page {} start {} moved without a ruby group",
                    page.index,
                    page.visible.start
                );
            }
        }
    });
}

#[test]
fn overlap_is_exact_for_plain_text() {
    init_logger();
    let text = "あいうえお".repeat(2_000);
    let set = paginate(&text, &PaginationOptions::default());
    for pair in set.pages().windows(2) {
        assert_eq!(pair[1].visible.start, pair[0].visible.end - 10);
    }
}

#[test]
fn last_page_totality() {
    for_each_case(|_doc, _opts, set| {
        let last = set.pages().last().expect("at least one page");
        assert_eq!(last.visible.end, set.total_visible_chars());
    });
}

#[test]
fn single_page_ruby_example() {
    init_logger();
    let set = paginate(NEKO, &PaginationOptions::default());
    assert_eq!(set.page_count(), 1);
    let page = &set.pages()[0];
    assert!(page.overlap.is_empty());
    assert_eq!(page.main, vec![NEKO.to_string()]);
}

#[test]
fn ten_thousand_and_one_example() {
    init_logger();
    let set = paginate(&"字".repeat(10_001), &PaginationOptions::default());
    assert_eq!(set.page_count(), 2);
    assert_eq!(set.chars_per_page(), 5001);
    let (p1, p2) = (&set.pages()[0], &set.pages()[1]);
    assert_eq!(p2.visible.start, p1.visible.end.saturating_sub(10));
}

#[test]
fn no_delimiter_example() {
    init_logger();
    let opts = PaginationOptions {
        max_chars_per_page: 1_000,
        ..PaginationOptions::default()
    };
    let set = paginate(&"の".repeat(5_000), &opts);
    assert_eq!(set.chars_per_page(), 1_000);
    let first = &set.pages()[0];
    assert_eq!(first.visible.end - first.visible.start, 1_000);
    assert!(!DEFAULT_DELIMITERS.contains(&'の'));
}

#[test]
fn unterminated_tag_degrades_to_text() {
    init_logger();
    let doc = format!("{}<ruby", "あ".repeat(50));
    let set = paginate(&doc, &PaginationOptions::default());
    assert_eq!(set.total_visible_chars(), 55);
    assert_eq!(set.pages()[0].main.concat(), doc);
}

#[test]
fn chunks_of_a_page_are_renderable() {
    init_logger();
    let doc = document(42, 3_000);
    let opts = PaginationOptions {
        max_chars_per_page: 2_000,
        ..PaginationOptions::default()
    };
    let set = paginate(&doc, &opts);
    for (i, page) in set.pages().iter().enumerate() {
        let rechunked = chunk_markup(&page.main.concat(), opts.chunk_size);
        assert_eq!(rechunked, page.main);
        let html = page_document(&set, i, "doc").expect("page exists");
        for frag in &page.main {
            assert!(html.contains(frag.as_str()));
        }
    }
}

#[test]
fn reader_walks_through_a_paginated_document() {
    init_logger();
    let opts = PaginationOptions {
        max_chars_per_page: 500,
        ..PaginationOptions::default()
    };
    let set = paginate(&document(3, 2_000), &opts);
    assert!(set.page_count() > 2);

    let config = ReaderConfig::default();
    let settle = config.settle;
    let mut session = ReaderSession::new(&set, config);
    let mut now = Instant::now();
    let vh = 600.0;
    let content = 6_000.0;
    let at = |scroll_top: f64| ScrollMetrics {
        scroll_top,
        viewport_height: vh,
        content_height: content,
    };

    for expected in 2..=set.page_count() {
        session.on_scroll(at(300.0), now);
        let prompt = session
            .on_scroll(at(content - vh), now)
            .expect("forward prompt at the end of the page");
        assert_eq!(prompt.direction, Direction::Forward);
        assert_eq!(prompt.default_page, expected);
        assert_eq!(session.confirm(prompt.default_page, now), Ok(ScrollReset::Top));
        now += settle + Duration::from_millis(1);
    }
    // last page: no further forward prompt
    session.on_scroll(at(300.0), now);
    assert_eq!(session.on_scroll(at(content - vh), now), None);
}
