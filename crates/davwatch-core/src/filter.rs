//! Reject-filter patterns
//!
//! Paths matching any pattern are excluded from synchronization. The patterns
//! live in a JSON side file (not the main YAML config) so they can be edited
//! while the daemon runs: the ingest task reloads them at the start of every
//! sync cycle instead of caching them.

use std::path::Path;

use anyhow::Context;
use regex::Regex;
use tracing::warn;

/// JSON key holding the pattern list in the side file.
const PATTERNS_KEY: &str = "reject_filter_patterns";

/// An ordered list of compiled reject patterns
#[derive(Debug, Default)]
pub struct RejectPatterns {
    patterns: Vec<Regex>,
}

impl RejectPatterns {
    /// Loads and compiles patterns from the JSON side file.
    ///
    /// The file is expected to contain an object with a
    /// `reject_filter_patterns` array of regex strings. A missing key yields
    /// an empty pattern list; an invalid individual pattern is skipped with
    /// a warning so one bad entry does not disable the whole filter.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not valid JSON.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read reject patterns file {}", path.display()))?;

        let doc: serde_json::Value = serde_json::from_str(&content)
            .with_context(|| format!("Invalid JSON in reject patterns file {}", path.display()))?;

        let raw: Vec<String> = match doc.get(PATTERNS_KEY) {
            Some(value) => serde_json::from_value(value.clone())
                .context("reject_filter_patterns must be an array of strings")?,
            None => Vec::new(),
        };

        let mut patterns = Vec::with_capacity(raw.len());
        for source in &raw {
            match Regex::new(source) {
                Ok(re) => patterns.push(re),
                Err(e) => {
                    warn!(pattern = %source, error = %e, "Skipping invalid reject pattern");
                }
            }
        }

        Ok(Self { patterns })
    }

    /// Builds a pattern set from already-compiled regexes (used by tests
    /// and callers that do not go through the side file).
    pub fn from_regexes(patterns: Vec<Regex>) -> Self {
        Self { patterns }
    }

    /// Returns true when `path` matches any reject pattern.
    pub fn is_rejected(&self, path: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(path))
    }

    /// Number of loaded patterns.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// True when no patterns are loaded.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
