#![no_main]

use libfuzzer_sys::fuzz_target;
use tateyomi::markup::{Tokenizer, visible_len};
use tateyomi::position::PositionMap;

fuzz_target!(|data: &[u8]| {
    let Ok(markup) = std::str::from_utf8(data) else {
        return;
    };

    // Tokens must tile the input without gaps.
    let mut pos = 0;
    for token in Tokenizer::new(markup) {
        let raw = token.raw();
        assert_eq!(raw.start, pos, "token gap at {pos}: {token:?}");
        assert!(raw.end > raw.start, "empty token at {pos}");
        pos = raw.end;
    }
    assert_eq!(pos, markup.len());

    let map = PositionMap::build(markup);
    assert_eq!(map.visible_len(), visible_len(markup));
    assert_eq!(map.raw_len(), markup.len());

    // Offsets strictly increase and round-trip through the inverse lookup.
    let entries: Vec<(usize, usize)> = map.entries().collect();
    for pair in entries.windows(2) {
        assert!(pair[0].1 < pair[1].1, "offsets not increasing: {pair:?}");
    }
    for v in 0..map.visible_len() {
        assert_eq!(map.visible_index(map.raw_offset(v)), v);
    }

    // Groups are ordered, disjoint and snapping leaves no cut inside one.
    for pair in map.ruby_groups().windows(2) {
        assert!(pair[0].visible.end <= pair[1].visible.start);
    }
    for v in 0..=map.visible_len() {
        let f = map.snap_forward(v);
        let b = map.snap_backward(v);
        assert!(b <= v && v <= f);
        assert_eq!(map.snap_forward(f), f);
        assert_eq!(map.snap_backward(b), b);
    }
});
