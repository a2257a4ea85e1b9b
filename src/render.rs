//! Standalone vertical-text HTML for one page.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use log::{debug, info};

use crate::paginate::PageSet;

const STYLE: &str = "\
body {
  display: flex;
  justify-content: center;
  font-family: 'Yu Mincho', 'YuMincho', 'Hiragino Mincho Pro', serif;
  font-feature-settings: 'pkna';
  margin: 0;
  padding: 0;
  overflow-x: hidden;
}
#page {
  writing-mode: vertical-rl;
  white-space: nowrap;
  letter-spacing: 0.25em;
  line-height: 1.8;
  font-size: 23px;
  padding: 2em;
}
ruby rt {
  font-size: 0.5em;
}
.overlap {
  opacity: 0.5;
}
";

/// Escape text for an HTML text node or attribute.
fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Build the HTML document for page `index` (0-based). `None` if out of range.
///
/// Fragments are inserted as-is; the markup is already sanitized. Overlap
/// fragments are wrapped in `<span class="overlap">` so they render dimmed.
pub fn page_document(page_set: &PageSet, index: usize, title: &str) -> Option<String> {
    let page = page_set.page(index)?;
    let mut body = String::new();
    for frag in &page.overlap {
        let _ = write!(body, "<span class=\"overlap\">{frag}</span>");
    }
    for frag in &page.main {
        let _ = write!(body, "<span>{frag}</span>");
    }
    Some(format!(
        "<!DOCTYPE html>\n\
         <html lang=\"ja\">\n\
         <head>\n\
         <meta charset=\"UTF-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width,initial-scale=1\">\n\
         <title>{title} ({page}/{total})</title>\n\
         <style>\n{STYLE}</style>\n\
         </head>\n\
         <body>\n\
         <div id=\"page\" data-page=\"{page}\" data-chars=\"{chars}\">{body}</div>\n\
         </body>\n\
         </html>\n",
        title = escape_html(title),
        page = index + 1,
        total = page_set.page_count(),
        chars = page.visible_char_count,
    ))
}

/// Output path for page `index` (0-based): `{dir}/{stem}-{NNN}.html`.
pub fn page_path(dir: &Path, stem: &str, index: usize) -> PathBuf {
    dir.join(format!("{stem}-{:03}.html", index + 1))
}

/// Write every page of `page_set` into `dir`.
///
/// Returns `(path, visible_char_count)` per written page.
pub fn write_pages(
    page_set: &PageSet,
    dir: &Path,
    stem: &str,
    title: &str,
) -> Result<Vec<(PathBuf, usize)>> {
    let start = Instant::now();
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    let mut written = Vec::with_capacity(page_set.page_count());
    for (index, page) in page_set.pages().iter().enumerate() {
        let Some(html) = page_document(page_set, index, title) else {
            continue;
        };
        let path = page_path(dir, stem, index);
        std::fs::write(&path, html)
            .with_context(|| format!("failed to write {}", path.display()))?;
        debug!("render: wrote {} ({} chars)", path.display(), page.visible_char_count);
        written.push((path, page.visible_char_count));
    }
    info!(
        "render: wrote {} pages in {:.1}ms",
        written.len(),
        start.elapsed().as_secs_f64() * 1000.0
    );
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paginate::{PaginationOptions, paginate};

    fn two_pages() -> PageSet {
        let opts = PaginationOptions {
            max_chars_per_page: 10,
            overlap_chars: 2,
            ..PaginationOptions::default()
        };
        paginate("あいうえおかきくけこ<ruby>漢<rt>かん</rt></ruby>さしすせそ", &opts)
    }

    #[test]
    fn document_wraps_fragments() {
        let set = two_pages();
        let html = page_document(&set, 1, "test").unwrap();
        assert!(html.contains("writing-mode: vertical-rl"));
        assert!(html.contains("<span class=\"overlap\">"));
        assert!(html.contains("<ruby>漢<rt>かん</rt></ruby>"));
        assert!(html.contains("<title>test (2/2)</title>"));

        let first = page_document(&set, 0, "test").unwrap();
        assert!(!first.contains("class=\"overlap\">"));
    }

    #[test]
    fn out_of_range_page() {
        assert!(page_document(&two_pages(), 5, "x").is_none());
    }

    #[test]
    fn title_is_escaped() {
        let set = paginate("本文", &PaginationOptions::default());
        let html = page_document(&set, 0, "<a&b>").unwrap();
        assert!(html.contains("<title>&lt;a&amp;b&gt; (1/1)</title>"));
    }

    #[test]
    fn page_path_is_one_based() {
        assert_eq!(
            page_path(Path::new("/out"), "neko", 0),
            PathBuf::from("/out/neko-001.html")
        );
        assert_eq!(
            page_path(Path::new("/out"), "neko", 41),
            PathBuf::from("/out/neko-042.html")
        );
    }

    #[test]
    fn writes_one_file_per_page() {
        let dir = tempfile::tempdir().unwrap();
        let set = two_pages();
        let written = write_pages(&set, dir.path(), "doc", "doc").unwrap();
        assert_eq!(written.len(), 2);
        for (i, (path, chars)) in written.iter().enumerate() {
            assert!(path.exists());
            assert_eq!(*chars, set.pages()[i].visible_char_count);
        }
        let html = std::fs::read_to_string(&written[0].0).unwrap();
        assert!(html.contains("data-page=\"1\""));
    }
}
