// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Delta test dependency resolution.
//!
//! Expand a set of changed metadata components into the set of Apex test
//! classes that must run to validate them.
//!
//! # Resolution Steps
//!
//! 1. [`strategy`]: Decide between a full test run and a delta search, and
//!    seed the frontier with changed component names.
//! 2. [`search`]: Walk the implicit dependency graph between classes by
//!    matching source text against the frontier.
//! 3. [`coverage`]: Optionally add tests that coverage data links to the
//!    changed code classes.
//! 4. Shape the collected tests into a [`TestDirective`].
//!
//! # Result Shaping
//!
//! | Condition                                   | Test level          |
//! |---------------------------------------------|---------------------|
//! | Full strategy                               | `RunLocalTests`     |
//! | Nothing seeded into the frontier            | `NoTestRun`         |
//! | No test found, or every known test found    | `NoTestRun`         |
//! | Otherwise                                   | `RunSpecifiedTests` |
//!
//! A full strategy is reported as `RunLocalTests` in the directive itself.
//! Older tooling printed `NoTestRun` there and left callers to notice the full
//! run through a separate flag. Callers matching on `NoTestRun` to detect a
//! full run must check [`Resolution::strategy`] or the test level instead.

pub mod coverage;
pub mod frontier;
pub mod matcher;
pub mod search;
pub mod strategy;

use crate::{
    config::StrategyConfig,
    directive::TestDirective,
    manifest::Manifest,
    resolver::{
        coverage::{narrow_with_coverage, CoverageSource, SfCliCoverage},
        matcher::MatchOptions,
        search::{expand, MatchEvent, SearchOptions, SearchState},
        strategy::{plan_strategy, Strategy, StrategyPlan},
    },
    source::{SourceIndex, DEFAULT_NAMING_CONVENTION},
};

use std::collections::BTreeSet;
use tracing::{info, instrument, warn};

/// Settings of dependency resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolverSettings {
    /// Suffix that pairs a code class with its test class.
    pub naming_convention: String,

    /// Maximum number of search steps, negative for no limit.
    pub max_depth: i64,

    /// Dependency matching tunables.
    pub matching: MatchOptions,

    /// Consult coverage data for the changed code classes.
    pub use_code_coverage: bool,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            naming_convention: DEFAULT_NAMING_CONVENTION.into(),
            max_depth: -1,
            matching: MatchOptions::default(),
            use_code_coverage: false,
        }
    }
}

impl ResolverSettings {
    fn search_options(&self) -> SearchOptions {
        SearchOptions {
            naming_convention: self.naming_convention.clone(),
            max_depth: self.max_depth,
            matching: self.matching,
        }
    }
}

/// Outcome of dependency resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Run-wide strategy that was picked.
    pub strategy: Strategy,

    /// What to run.
    pub directive: TestDirective,

    /// Code classes affected by the changes.
    pub changed_classes: BTreeSet<String>,

    /// Dependencies discovered by the search, in discovery order.
    pub trace: Vec<MatchEvent>,
}

impl Resolution {
    fn terminal(strategy: Strategy, directive: TestDirective) -> Self {
        Self {
            strategy,
            directive,
            changed_classes: BTreeSet::new(),
            trace: Vec::new(),
        }
    }
}

/// Dependency resolver.
///
/// Holds the strategy table and settings for one run, plus the coverage
/// source consulted when coverage lookups are enabled.
#[derive(Debug)]
pub struct Resolver<C = SfCliCoverage>
where
    C: CoverageSource,
{
    strategies: StrategyConfig,
    settings: ResolverSettings,
    coverage: Option<C>,
}

impl Resolver {
    /// Construct new resolver without coverage source.
    pub fn new(strategies: StrategyConfig, settings: ResolverSettings) -> Self {
        Self {
            strategies,
            settings,
            coverage: None,
        }
    }
}

impl<C> Resolver<C>
where
    C: CoverageSource,
{
    /// Construct new resolver with coverage source.
    pub fn with_coverage(strategies: StrategyConfig, settings: ResolverSettings, coverage: C) -> Self {
        Self {
            strategies,
            settings,
            coverage: Some(coverage),
        }
    }

    /// Settings of resolver.
    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    /// Determine strategy and seed frontier for changes.
    pub fn plan(&self, deploy: &Manifest, destroy: &Manifest) -> StrategyPlan {
        plan_strategy(
            &self.strategies,
            deploy,
            destroy,
            &self.settings.naming_convention,
        )
    }

    /// Finish resolution of a plan against indexed sources.
    ///
    /// The source index is only consulted if the plan needs a search, so an
    /// empty index is fine for any other plan.
    ///
    /// # Errors
    ///
    /// - Return [`ResolverError::CoverageUnavailable`] if coverage lookups are
    ///   enabled, but no coverage source was given.
    /// - Return [`ResolverError::Coverage`] if coverage lookup fails.
    #[instrument(skip_all, level = "debug")]
    pub async fn finish(&self, plan: StrategyPlan, index: &SourceIndex) -> Result<Resolution> {
        if plan.strategy == Strategy::Full {
            info!("full test run required");
            return Ok(Resolution::terminal(
                Strategy::Full,
                TestDirective::run_local_tests(),
            ));
        }

        if plan.frontier.is_empty() {
            if !plan.tests.is_empty() {
                warn!(
                    "no dependency to search for, changed test classes {:?} are not run",
                    plan.tests
                );
            }
            info!("nothing to resolve, no tests required");
            return Ok(Resolution::terminal(
                plan.strategy,
                TestDirective::no_test_run(),
            ));
        }

        let strategy = plan.strategy;
        let state = expand(SearchState::from(plan), index, &self.settings.search_options());
        info!(
            "search expanded {} tokens, found {} test classes",
            state.depth,
            state.tests.len()
        );

        let SearchState {
            mut tests,
            changed_classes,
            trace,
            ..
        } = state;

        if self.settings.use_code_coverage && !changed_classes.is_empty() {
            let source = self
                .coverage
                .as_ref()
                .ok_or(ResolverError::CoverageUnavailable)?;
            narrow_with_coverage(&mut tests, &changed_classes, source).await?;
        }

        let directive = if tests.is_empty() || set_equals(&tests, index.test_classes()) {
            info!("found no tests, or every known test, no specific tests required");
            TestDirective::no_test_run()
        } else {
            TestDirective::run_specified_tests(tests)
        };

        Ok(Resolution {
            strategy,
            directive,
            changed_classes,
            trace,
        })
    }

    /// Resolve changes into tests to run.
    ///
    /// # Errors
    ///
    /// - Return [`ResolverError`] if coverage lookup fails.
    pub async fn resolve(
        &self,
        deploy: &Manifest,
        destroy: &Manifest,
        index: &SourceIndex,
    ) -> Result<Resolution> {
        let plan = self.plan(deploy, destroy);
        self.finish(plan, index).await
    }
}

/// Two sets hold the same elements.
///
/// Order independent, and two empty sets are equal.
pub fn set_equals<T>(left: &BTreeSet<T>, right: &BTreeSet<T>) -> bool
where
    T: Ord,
{
    left.len() == right.len() && left.iter().all(|item| right.contains(item))
}

/// Resolution error types.
#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    /// Coverage lookup fails.
    #[error(transparent)]
    Coverage(#[from] crate::resolver::coverage::CoverageError),

    /// Coverage lookup was requested without a coverage source.
    #[error("code coverage lookup enabled, but no coverage source is available")]
    CoverageUnavailable,
}

/// Friendly result alias :3
pub type Result<T, E = ResolverError> = std::result::Result<T, E>;
