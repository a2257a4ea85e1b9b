//! Page-turn state machine driven by host scroll events.
//!
//! The host reports scroll metrics; the session decides when to open a
//! "go to page" prompt and what scroll reset to perform after a switch.
//! Rendering and input live in the host.

use std::fmt;
use std::time::{Duration, Instant};

use log::{debug, info};
use serde::Serialize;
use thiserror::Error;

use crate::paginate::PageSet;

/// Thresholds for arming and opening page-turn prompts.
#[derive(Debug, Clone, PartialEq)]
pub struct ReaderConfig {
    /// Distance in pixels from an edge that still counts as "at the edge".
    pub edge_tolerance_px: f64,
    /// Forward arms once the reader is this many viewports above the end.
    pub forward_arm_fraction: f64,
    /// Backward arm threshold on the first page, in viewports from the top.
    pub first_page_backward_arm_fraction: f64,
    pub backward_arm_fraction: f64,
    /// Scroll events are ignored for this long after a page switch.
    pub settle: Duration,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            edge_tolerance_px: 5.0,
            forward_arm_fraction: 0.25,
            first_page_backward_arm_fraction: 0.64,
            backward_arm_fraction: 0.25,
            settle: Duration::from_millis(50),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    Forward,
    Backward,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Forward => f.write_str("forward"),
            Direction::Backward => f.write_str("backward"),
        }
    }
}

/// A request for the host to ask which page to go to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TurnPrompt {
    pub direction: Direction,
    /// Suggested target, 1-based.
    pub default_page: usize,
    pub max_page: usize,
}

/// Where the host should put the scroll position after a switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollReset {
    Top,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMetrics {
    pub scroll_top: f64,
    pub viewport_height: f64,
    pub content_height: f64,
}

impl ScrollMetrics {
    fn bottom(&self) -> f64 {
        self.scroll_top + self.viewport_height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    PrimedForward,
    PrimedBackward,
    Switching,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReaderState {
    /// 0-based.
    pub current_page: usize,
    pub forward_armed: bool,
    pub backward_armed: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NavigationError {
    #[error("page {requested} is out of range (1-{max})")]
    OutOfRange { requested: usize, max: usize },
    #[error("page {requested} has no content (1-{max})")]
    EmptyPage { requested: usize, max: usize },
    #[error("no page-turn prompt is open")]
    NoPrompt,
}

#[derive(Debug, Clone, Copy)]
enum Switch {
    Prompting(TurnPrompt),
    Settling { until: Instant },
}

/// Page-count facts the session needs from a [`PageSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
struct PageFacts {
    valid: Vec<bool>,
    valid_count: usize,
}

impl PageFacts {
    fn of(page_set: &PageSet) -> Self {
        let valid: Vec<bool> = (0..page_set.page_count())
            .map(|i| page_set.is_valid_page(i))
            .collect();
        let valid_count = valid.iter().filter(|v| **v).count();
        Self { valid, valid_count }
    }

    fn count(&self) -> usize {
        self.valid.len()
    }

    fn is_valid(&self, index: usize) -> bool {
        self.valid.get(index).copied().unwrap_or(false)
    }
}

/// Reading session over one [`PageSet`].
pub struct ReaderSession {
    config: ReaderConfig,
    pages: PageFacts,
    state: ReaderState,
    switch: Option<Switch>,
}

impl ReaderSession {
    pub fn new(page_set: &PageSet, config: ReaderConfig) -> Self {
        let pages = PageFacts::of(page_set);
        debug!(
            "reader: new session ({} pages, {} valid)",
            pages.count(),
            pages.valid_count
        );
        Self {
            config,
            pages,
            state: ReaderState::default(),
            switch: None,
        }
    }

    /// Replace the page set and reset to the first page.
    pub fn load(&mut self, page_set: &PageSet) {
        self.pages = PageFacts::of(page_set);
        self.state = ReaderState::default();
        self.switch = None;
        info!(
            "reader: loaded {} pages ({} valid)",
            self.pages.count(),
            self.pages.valid_count
        );
    }

    pub fn state(&self) -> ReaderState {
        self.state
    }

    pub fn current_page(&self) -> usize {
        self.state.current_page
    }

    pub fn phase(&self) -> Phase {
        if self.switch.is_some() {
            Phase::Switching
        } else if self.state.forward_armed {
            Phase::PrimedForward
        } else if self.state.backward_armed {
            Phase::PrimedBackward
        } else {
            Phase::Idle
        }
    }

    pub fn pending_prompt(&self) -> Option<TurnPrompt> {
        match self.switch {
            Some(Switch::Prompting(prompt)) => Some(prompt),
            _ => None,
        }
    }

    /// Feed one scroll event. Returns a prompt when one opens.
    pub fn on_scroll(&mut self, m: ScrollMetrics, now: Instant) -> Option<TurnPrompt> {
        match self.switch {
            Some(Switch::Prompting(_)) => return None,
            Some(Switch::Settling { until }) => {
                if now < until {
                    return None;
                }
                debug!("reader: settle window over");
                self.switch = None;
            }
            None => {}
        }
        if self.pages.count() <= 1 {
            return None;
        }

        let edge = self.config.edge_tolerance_px;
        let current = self.state.current_page;

        if m.bottom() >= m.content_height - edge {
            if self.state.forward_armed && self.pages.is_valid(current + 1) {
                return Some(self.open_prompt(Direction::Forward, current + 2));
            }
        } else if m.bottom() < m.content_height - m.viewport_height * self.config.forward_arm_fraction
            && !self.state.forward_armed
        {
            debug!("reader: forward armed at scroll_top={}", m.scroll_top);
            self.state.forward_armed = true;
        }

        let backward_fraction = if current == 0 {
            self.config.first_page_backward_arm_fraction
        } else {
            self.config.backward_arm_fraction
        };
        if m.scroll_top <= edge {
            if self.state.backward_armed {
                // page 1 wraps around to the last valid page
                let default_page = if current == 0 {
                    self.pages.valid_count
                } else {
                    current
                };
                return Some(self.open_prompt(Direction::Backward, default_page));
            }
        } else if m.scroll_top > m.viewport_height * backward_fraction && !self.state.backward_armed {
            debug!("reader: backward armed at scroll_top={}", m.scroll_top);
            self.state.backward_armed = true;
        }
        None
    }

    fn open_prompt(&mut self, direction: Direction, default_page: usize) -> TurnPrompt {
        let prompt = TurnPrompt {
            direction,
            default_page,
            max_page: self.pages.count(),
        };
        info!(
            "reader: {direction} prompt on page {} (default {default_page}/{})",
            self.state.current_page + 1,
            prompt.max_page
        );
        self.switch = Some(Switch::Prompting(prompt));
        prompt
    }

    fn validate(&self, page_number: usize) -> Result<usize, NavigationError> {
        let max = self.pages.count();
        if page_number == 0 || page_number > max {
            return Err(NavigationError::OutOfRange {
                requested: page_number,
                max,
            });
        }
        let index = page_number - 1;
        if !self.pages.is_valid(index) {
            return Err(NavigationError::EmptyPage {
                requested: page_number,
                max,
            });
        }
        Ok(index)
    }

    fn switch_to(&mut self, index: usize, now: Instant) {
        debug!(
            "reader: switching page {} → {}",
            self.state.current_page + 1,
            index + 1
        );
        self.state = ReaderState {
            current_page: index,
            forward_armed: false,
            backward_armed: false,
        };
        self.switch = Some(Switch::Settling {
            until: now + self.config.settle,
        });
    }

    /// Accept the open prompt with `page_number` (1-based).
    ///
    /// On error the prompt stays open.
    pub fn confirm(&mut self, page_number: usize, now: Instant) -> Result<ScrollReset, NavigationError> {
        let Some(prompt) = self.pending_prompt() else {
            return Err(NavigationError::NoPrompt);
        };
        let index = self.validate(page_number)?;
        self.switch_to(index, now);
        let reset = match prompt.direction {
            Direction::Forward => ScrollReset::Top,
            Direction::Backward if index + 1 == self.pages.count() => ScrollReset::Top,
            Direction::Backward => ScrollReset::Bottom,
        };
        info!("reader: now on page {page_number}, scroll to {reset:?}");
        Ok(reset)
    }

    /// Dismiss the open prompt and disarm both directions.
    pub fn decline(&mut self) {
        if self.pending_prompt().is_some() {
            debug!("reader: prompt declined");
        }
        self.state.forward_armed = false;
        self.state.backward_armed = false;
        self.switch = None;
    }

    /// Go straight to `page_number` (1-based) without a prompt.
    pub fn jump_to(&mut self, page_number: usize, now: Instant) -> Result<ScrollReset, NavigationError> {
        let index = self.validate(page_number)?;
        self.switch_to(index, now);
        Ok(ScrollReset::Top)
    }
}
