// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Dependency matching heuristics.
//!
//! Decide whether the source text of a class refers to a changed token. Three
//! heuristics are tried in order, and the first one that succeeds wins:
//!
//! 1. __Exact__: the token occurs verbatim in the source text.
//! 2. __Regex__: the token, used as a case-insensitive regular expression,
//!    finds a match in the source text.
//! 3. __Fuzzy__: the Sørensen–Dice coefficient over character bigrams of the
//!    token and the source text reaches the configured threshold.
//!
//! # Raw Regex Tokens
//!
//! By default the token is handed to the regex engine as is. Metacharacters in
//! a token are therefore live, e.g., a token `Foo.Bar` also matches `FooXBar`.
//! Callers that want tokens treated literally must turn off
//! [`MatchOptions::raw_regex`], which escapes the token first. A raw token that
//! is not a valid pattern never matches through the regex heuristic.

use regex::{Regex, RegexBuilder};
use std::{
    collections::HashMap,
    fmt::{Display, Formatter, Result as FmtResult},
};
use tracing::debug;

/// Default acceptance threshold of fuzzy matching.
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.6;

/// Tunables for dependency matching.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchOptions {
    /// Minimum similarity score for a fuzzy match, within `[0, 1]`.
    pub fuzzy_threshold: f64,

    /// Use tokens as live regex patterns instead of escaping them.
    pub raw_regex: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            raw_regex: true,
        }
    }
}

/// Heuristic that detected a dependency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchKind {
    /// Token occurs verbatim.
    Exact,

    /// Token matched as case-insensitive regex.
    Regex,

    /// Token is similar enough, with its similarity score.
    Fuzzy(f64),
}

impl Display for MatchKind {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Exact => fmt.write_str("exact match"),
            Self::Regex => fmt.write_str("regex match"),
            Self::Fuzzy(score) => write!(fmt, "fuzzy match ({score:.3})"),
        }
    }
}

/// Matcher compiled for one token.
#[derive(Debug, Clone)]
pub struct DependencyMatcher {
    token: String,
    pattern: Option<Regex>,
    profile: BigramProfile,
    fuzzy_threshold: f64,
}

impl DependencyMatcher {
    /// Compile matcher for token.
    pub fn new(token: impl Into<String>, options: &MatchOptions) -> Self {
        let token = token.into();
        let source = if options.raw_regex {
            token.clone()
        } else {
            regex::escape(&token)
        };

        let pattern = match RegexBuilder::new(&source).case_insensitive(true).build() {
            Ok(pattern) => Some(pattern),
            Err(error) => {
                debug!("token {token:?} is not a valid pattern, regex matching disabled: {error}");
                None
            }
        };

        Self {
            profile: BigramProfile::new(&token),
            token,
            pattern,
            fuzzy_threshold: options.fuzzy_threshold,
        }
    }

    /// Match source text against token.
    pub fn matches(&self, source: &str) -> Option<MatchKind> {
        self.literal_match(source)
            .or_else(|| self.fuzzy_match(&BigramProfile::new(source)))
    }

    /// Match source text through exact and regex heuristics only.
    pub fn literal_match(&self, source: &str) -> Option<MatchKind> {
        if source.contains(self.token.as_str()) {
            return Some(MatchKind::Exact);
        }

        match &self.pattern {
            Some(pattern) if pattern.is_match(source) => Some(MatchKind::Regex),
            _ => None,
        }
    }

    /// Match precomputed bigram profile of source text through fuzzy heuristic.
    pub fn fuzzy_match(&self, source: &BigramProfile) -> Option<MatchKind> {
        let score = self.profile.similarity(source);
        (score >= self.fuzzy_threshold).then_some(MatchKind::Fuzzy(score))
    }
}

/// Character bigram counts of whitespace stripped text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BigramProfile {
    compact: String,
    len: usize,
    bigrams: HashMap<(char, char), usize>,
}

impl BigramProfile {
    /// Build profile of text.
    pub fn new(text: &str) -> Self {
        let compact = text
            .chars()
            .filter(|ch| !ch.is_whitespace())
            .collect::<String>();
        let chars = compact.chars().collect::<Vec<_>>();

        let mut bigrams = HashMap::new();
        for pair in chars.windows(2) {
            *bigrams.entry((pair[0], pair[1])).or_insert(0) += 1;
        }

        Self {
            len: chars.len(),
            compact,
            bigrams,
        }
    }

    /// Sørensen–Dice coefficient between two profiles.
    ///
    /// Scores agree with `strsim::sorensen_dice` on ASCII text. Lengths count
    /// characters rather than bytes, and a profile is kept per class so that
    /// source text is only split into bigrams once per search.
    ///
    /// Identical texts score `1.0`. Texts shorter than two characters have no
    /// bigrams and score `0.0` against anything else.
    pub fn similarity(&self, other: &Self) -> f64 {
        if self.compact == other.compact {
            return 1.0;
        }

        if self.len < 2 || other.len < 2 {
            return 0.0;
        }

        let shared = self
            .bigrams
            .iter()
            .map(|(bigram, count)| {
                other
                    .bigrams
                    .get(bigram)
                    .map_or(0, |other_count| (*count).min(*other_count))
            })
            .sum::<usize>();

        (2 * shared) as f64 / (self.len + other.len - 2) as f64
    }
}

/// Sørensen–Dice coefficient between two texts, whitespace ignored.
pub fn similarity(left: &str, right: &str) -> f64 {
    BigramProfile::new(left).similarity(&BigramProfile::new(right))
}
