//! Ruby-safe pagination for long vertical Japanese texts.
//!
//! Pipeline: [`markup`] tokens → [`position::PositionMap`] →
//! [`boundary::BoundarySelector`] → [`paginate::paginate`] →
//! [`chunk::chunk_markup`]. [`reader::ReaderSession`] turns host scroll
//! events into page-turn prompts over the resulting [`paginate::PageSet`].

pub mod boundary;
pub mod chunk;
pub mod config;
pub mod input;
pub mod markup;
pub mod paginate;
pub mod position;
pub mod preset;
pub mod reader;
pub mod render;
pub mod watch;

pub use paginate::{Page, PageSet, PaginationOptions, paginate};
pub use reader::{ReaderConfig, ReaderSession};
