//! Literal log search

use std::ops::Range;

use regex::{Regex, RegexBuilder};

use crate::domain::log::LogLine;

/// Case-insensitive literal matcher built from user input
///
/// Regex metacharacters in the query are escaped, so `.*` only matches the
/// two characters `.*`.
#[derive(Debug, Clone)]
pub struct SearchPattern {
    regex: Regex,
}

impl SearchPattern {
    /// Builds a pattern, or `None` for a blank query
    pub fn literal(query: &str) -> Option<Self> {
        if query.trim().is_empty() {
            return None;
        }

        RegexBuilder::new(&regex::escape(query))
            .case_insensitive(true)
            .build()
            .ok()
            .map(|regex| Self { regex })
    }

    /// Whether the line's message or source contains the query
    pub fn matches(&self, line: &LogLine) -> bool {
        self.regex.is_match(&line.message)
            || line
                .source
                .as_deref()
                .is_some_and(|source| self.regex.is_match(source))
    }

    /// Byte ranges of every occurrence in `text`, for highlighting
    pub fn find_ranges(&self, text: &str) -> Vec<Range<usize>> {
        self.regex.find_iter(text).map(|m| m.range()).collect()
    }
}
