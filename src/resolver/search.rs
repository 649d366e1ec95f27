// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Frontier search over class sources.
//!
//! Dependencies between classes are never declared anywhere, so they are
//! discovered on the fly. Each changed token is matched against the source
//! text of every code class that has a test class. A class whose source
//! matches depends on the token, so its test class must run, and the class
//! itself becomes a new token whose dependents are looked up next. Thus,
//! dependencies are found transitively in breadth-first order.
//!
//! # Depth Limit
//!
//! The search expands one token per step. A non-negative maximum depth caps the
//! number of steps taken, while a negative maximum depth lets the search run
//! until the frontier is exhausted.

use crate::{
    resolver::{
        frontier::{ClosedList, Frontier},
        matcher::{BigramProfile, DependencyMatcher, MatchKind, MatchOptions},
        strategy::StrategyPlan,
    },
    source::{SourceIndex, DEFAULT_NAMING_CONVENTION},
};

use std::collections::{BTreeSet, HashMap};
use tracing::{debug, instrument};

/// Settings of frontier search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    /// Suffix pairing a code class with its test class.
    pub naming_convention: String,

    /// Maximum number of expansion steps, negative for no limit.
    pub max_depth: i64,

    /// Dependency matching tunables.
    pub matching: MatchOptions,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            naming_convention: DEFAULT_NAMING_CONVENTION.into(),
            max_depth: -1,
            matching: MatchOptions::default(),
        }
    }
}

/// Single discovered dependency.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchEvent {
    /// Expansion step the dependency was found at.
    pub depth: usize,

    /// Token that was searched for.
    pub token: String,

    /// Code class whose source matched the token.
    pub class_name: String,

    /// Test class queued because of the match.
    pub test_class: String,

    /// Heuristic that produced the match.
    pub kind: MatchKind,
}

/// Complete state of frontier search.
///
/// Searching consumes a state and hands back the advanced state, so nothing
/// outside of it is touched.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SearchState {
    /// Tokens awaiting expansion.
    pub frontier: Frontier,

    /// Tokens already expanded.
    pub closed: ClosedList,

    /// Test classes that must run.
    pub tests: BTreeSet<String>,

    /// Code classes affected by the changes.
    pub changed_classes: BTreeSet<String>,

    /// Discovered dependencies in discovery order.
    pub trace: Vec<MatchEvent>,

    /// Number of expansion steps taken.
    pub depth: usize,
}

impl SearchState {
    /// Construct search state seeded with tokens.
    pub fn seeded(tokens: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            frontier: tokens.into_iter().collect(),
            ..Self::default()
        }
    }
}

impl From<StrategyPlan> for SearchState {
    fn from(plan: StrategyPlan) -> Self {
        Self {
            frontier: plan.frontier,
            tests: plan.tests,
            changed_classes: plan.changed_classes,
            ..Self::default()
        }
    }
}

/// Expand frontier until it runs dry or the depth limit is hit.
#[instrument(skip_all, level = "debug")]
pub fn expand(mut state: SearchState, index: &SourceIndex, options: &SearchOptions) -> SearchState {
    let mut profiles: HashMap<&str, BigramProfile> = HashMap::new();

    while within_depth(state.depth, options.max_depth) {
        let Some(token) = state.frontier.pop() else {
            break;
        };
        state.closed.close(token.as_str());
        debug!("expand token {token:?} at depth {}", state.depth);

        let matcher = DependencyMatcher::new(token.as_str(), &options.matching);
        for (class_name, source) in index.code_classes() {
            let Some(test_class) = index.test_for(class_name, &options.naming_convention) else {
                continue;
            };

            // INVARIANT: Fuzzy matching runs only if literal matching failed.
            let kind = match matcher.literal_match(source) {
                Some(kind) => kind,
                None => {
                    let profile = profiles
                        .entry(class_name)
                        .or_insert_with(|| BigramProfile::new(source));
                    match matcher.fuzzy_match(profile) {
                        Some(kind) => kind,
                        None => continue,
                    }
                }
            };

            debug!("{class_name} depends on {token:?} by {kind}, queue {test_class}");
            state.changed_classes.insert(class_name.to_string());
            state.tests.insert(test_class.clone());
            if !state.frontier.contains(class_name) && !state.closed.contains(class_name) {
                state.frontier.push(class_name);
            }

            state.trace.push(MatchEvent {
                depth: state.depth,
                token: token.clone(),
                class_name: class_name.to_string(),
                test_class,
                kind,
            });
        }

        state.depth += 1;
    }

    state
}

fn within_depth(depth: usize, max_depth: i64) -> bool {
    match u64::try_from(max_depth) {
        Ok(max_depth) => (depth as u64) < max_depth,
        Err(_) => true,
    }
}
