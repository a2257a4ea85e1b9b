use std::time::Instant;

use log::info;
use tateyomi::paginate::{PaginationOptions, paginate};

fn main() {
    env_logger::init();

    let path = std::env::args().nth(1).unwrap_or_else(|| {
        eprintln!("Usage: reproduce <artifact-file-or-markup>");
        std::process::exit(1);
    });

    let data = std::fs::read(&path).unwrap_or_else(|e| {
        eprintln!("Failed to read {path}: {e}");
        std::process::exit(1);
    });

    let markup = match std::str::from_utf8(&data) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Input is not valid UTF-8: {e}");
            std::process::exit(1);
        }
    };

    let iterations = std::env::var("ITERATIONS")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(1);
    let max_chars = std::env::var("MAX_CHARS")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(100);

    eprintln!("=== Input: {} ({} bytes), {} iteration(s) ===", path, markup.len(), iterations);

    let opts = PaginationOptions {
        max_chars_per_page: max_chars,
        ..PaginationOptions::default()
    };
    for i in 0..iterations {
        let iter_start = Instant::now();
        let set = paginate(markup, &opts);
        info!(
            "iteration {}: {} pages in {:.1}ms",
            i,
            set.page_count(),
            iter_start.elapsed().as_secs_f64() * 1000.0
        );
    }
}
