//! Log view model
//!
//! State behind an interactive log panel: level filtering, debounced literal
//! search over the filtered lines, and a wrapping cursor over search results.
//! Rendering is left to the embedding UI (the CLI, or a web frontend talking
//! to the orchestrator's filtered log endpoint).

pub mod debounce;
pub mod keys;
pub mod search;

use std::collections::BTreeSet;
use std::time::Duration;

use crate::domain::log::{LogLevel, LogLine};

pub use debounce::{DEFAULT_DEBOUNCE, Debouncer};
pub use search::SearchPattern;

/// A line matching the current search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchResult {
    /// Position within the level-filtered lines
    pub line_number: usize,
    /// Position within the raw, unfiltered lines
    pub log_index: usize,
}

/// Filtering and search state for one log panel
#[derive(Debug, Clone)]
pub struct LogViewer {
    lines: Vec<LogLine>,
    levels: BTreeSet<LogLevel>,
    query: String,
    pending_query: Debouncer<String>,
    pattern: Option<SearchPattern>,
    /// Raw indices of lines passing the level filter
    filtered: Vec<usize>,
    results: Vec<SearchResult>,
    current: Option<usize>,
    generation: u64,
}

impl LogViewer {
    /// Creates a viewer with every level enabled and the default search delay
    pub fn new(lines: Vec<LogLine>) -> Self {
        Self::with_debounce(lines, DEFAULT_DEBOUNCE)
    }

    pub fn with_debounce(lines: Vec<LogLine>, delay: Duration) -> Self {
        let mut viewer = Self {
            lines,
            levels: LogLevel::ALL.into_iter().collect(),
            query: String::new(),
            pending_query: Debouncer::new(delay),
            pattern: None,
            filtered: Vec::new(),
            results: Vec::new(),
            current: None,
            generation: 0,
        };
        viewer.recompute();
        viewer
    }

    // =========================================================================
    // Inputs
    // =========================================================================

    /// Replaces the underlying lines (e.g. after a refresh)
    pub fn set_lines(&mut self, lines: Vec<LogLine>) {
        self.lines = lines;
        self.recompute();
    }

    /// Appends newly streamed lines
    pub fn extend_lines(&mut self, lines: impl IntoIterator<Item = LogLine>) {
        let before = self.lines.len();
        self.lines.extend(lines);
        if self.lines.len() != before {
            self.recompute();
        }
    }

    pub fn set_level_enabled(&mut self, level: LogLevel, enabled: bool) {
        let changed = if enabled {
            self.levels.insert(level)
        } else {
            self.levels.remove(&level)
        };
        if changed {
            self.recompute();
        }
    }

    pub fn toggle_level(&mut self, level: LogLevel) {
        let enabled = !self.levels.contains(&level);
        self.set_level_enabled(level, enabled);
    }

    /// Enables exactly the given levels
    pub fn set_levels(&mut self, levels: impl IntoIterator<Item = LogLevel>) {
        self.levels = levels.into_iter().collect();
        self.recompute();
    }

    /// Records a keystroke in the search box.
    ///
    /// Nothing is recomputed until the input has been quiet for the debounce
    /// delay; see [`LogViewer::poll_search`] and [`LogViewer::settle_search`].
    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.pending_query.push(query.into());
    }

    /// Applies a pending query whose delay has elapsed.
    ///
    /// Returns whether a recomputation happened.
    pub fn poll_search(&mut self) -> bool {
        match self.pending_query.take_ready() {
            Some(query) => {
                self.apply_query(query);
                true
            }
            None => false,
        }
    }

    /// Waits for the pending query (if any) to settle and applies it
    pub async fn settle_search(&mut self) -> bool {
        match self.pending_query.settled().await {
            Some(query) => {
                self.apply_query(query);
                true
            }
            None => false,
        }
    }

    /// Applies a query right away, bypassing the debounce
    pub fn search_now(&mut self, query: impl Into<String>) {
        self.pending_query.cancel();
        self.apply_query(query.into());
    }

    fn apply_query(&mut self, query: String) {
        self.pattern = SearchPattern::literal(&query);
        self.query = query;
        self.recompute();
    }

    // =========================================================================
    // Result navigation
    // =========================================================================

    /// Moves to the next result, wrapping from the last to the first
    pub fn next_result(&mut self) -> Option<&SearchResult> {
        let total = self.results.len();
        if total == 0 {
            return None;
        }
        self.current = Some(self.current.map_or(0, |i| (i + 1) % total));
        self.current_result()
    }

    /// Moves to the previous result, wrapping from the first to the last
    pub fn previous_result(&mut self) -> Option<&SearchResult> {
        let total = self.results.len();
        if total == 0 {
            return None;
        }
        self.current = Some(match self.current {
            Some(0) | None => total - 1,
            Some(i) => i - 1,
        });
        self.current_result()
    }

    /// Jumps to result `index`, clamped into range
    pub fn navigate_to_result(&mut self, index: usize) -> Option<&SearchResult> {
        let total = self.results.len();
        if total == 0 {
            return None;
        }
        self.current = Some(index.min(total - 1));
        self.current_result()
    }

    // =========================================================================
    // Outputs
    // =========================================================================

    pub fn filtered_logs(&self) -> impl Iterator<Item = &LogLine> + '_ {
        self.filtered.iter().map(|&i| &self.lines[i])
    }

    pub fn filtered_len(&self) -> usize {
        self.filtered.len()
    }

    pub fn search_results(&self) -> &[SearchResult] {
        &self.results
    }

    pub fn total_results(&self) -> usize {
        self.results.len()
    }

    pub fn current_result_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_result(&self) -> Option<&SearchResult> {
        self.current.and_then(|i| self.results.get(i))
    }

    /// The query currently applied (not the one still being debounced)
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn pattern(&self) -> Option<&SearchPattern> {
        self.pattern.as_ref()
    }

    pub fn is_level_enabled(&self, level: LogLevel) -> bool {
        self.levels.contains(&level)
    }

    /// Incremented on every recomputation of the filtered lines and results
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn recompute(&mut self) {
        self.filtered = self
            .lines
            .iter()
            .enumerate()
            .filter(|(_, line)| self.levels.contains(&line.level))
            .map(|(i, _)| i)
            .collect();

        self.results = match &self.pattern {
            Some(pattern) => self
                .filtered
                .iter()
                .enumerate()
                .filter(|&(_, &raw)| pattern.matches(&self.lines[raw]))
                .map(|(line_number, &log_index)| SearchResult {
                    line_number,
                    log_index,
                })
                .collect(),
            None => Vec::new(),
        };

        self.current = if self.results.is_empty() {
            None
        } else {
            Some(self.current.unwrap_or(0).min(self.results.len() - 1))
        };

        self.generation += 1;
    }
}
