// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Strategy determination.
//!
//! Walk the test strategy table, and decide whether the changes at hand force
//! a full test run, or whether a targeted dependency search is enough. While
//! doing so, collect the initial frontier of changed tokens to search with.
//!
//! # Full Test Runs
//!
//! A single metadata type with changes whose effective strategy is `full`
//! forces a full test run regardless of every other type. Types are visited
//! in lexical key order, so the type that forces the full run is always the
//! same one for the same table.
//!
//! # Unconfigured Types
//!
//! Only types present in the strategy table are looked at. A type that is
//! absent from the table never contributes to the frontier, and can never
//! force a full run, exactly like an explicit `skip`.
//!
//! # Apex Classes
//!
//! Deployed Apex classes get special treatment. A class that follows the test
//! naming convention is a test already, so it is queued for execution
//! directly. Any other deployed class is remembered as a changed code class
//! for coverage lookups, and is searched for like every other token.

use crate::{
    config::{metadata_type_name, StrategyConfig, StrategySetting, TestStrategy},
    manifest::{ChangeKind, Manifest, WILDCARD_MEMBER},
    resolver::frontier::Frontier,
};

use std::{
    collections::BTreeSet,
    fmt::{Display, Formatter, Result as FmtResult},
};
use tracing::{debug, info, instrument, warn};

/// Metadata type name of Apex classes.
pub const APEX_CLASS_TYPE: &str = "ApexClass";

/// Run-wide test strategy.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// No configured type took part in strategy determination.
    #[default]
    Unconfigured,

    /// Run every local test.
    Full,

    /// Search for dependent test classes.
    Delta,
}

impl Display for Strategy {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Unconfigured => fmt.write_str("unconfigured"),
            Self::Full => fmt.write_str("full"),
            Self::Delta => fmt.write_str("delta"),
        }
    }
}

/// Outcome of strategy determination.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StrategyPlan {
    /// Run-wide strategy.
    pub strategy: Strategy,

    /// Changed tokens to search dependents of.
    pub frontier: Frontier,

    /// Test classes that must run no matter what the search finds.
    pub tests: BTreeSet<String>,

    /// Deployed code classes, used for coverage lookups.
    pub changed_classes: BTreeSet<String>,
}

impl StrategyPlan {
    /// Dependency search has to run to finish this plan.
    pub fn needs_search(&self) -> bool {
        self.strategy == Strategy::Delta && !self.frontier.is_empty()
    }
}

/// Determine run-wide strategy, and seed frontier.
///
/// Iterates the strategy table in lexical key order. Type keys are mapped to
/// manifest type names by uppercasing their first letter, any other casing
/// mismatch silently finds no members.
#[instrument(skip_all, level = "debug")]
pub fn plan_strategy(
    config: &StrategyConfig,
    deploy: &Manifest,
    destroy: &Manifest,
    naming_convention: &str,
) -> StrategyPlan {
    let mut plan = StrategyPlan::default();

    for (key, setting) in config {
        if setting.is_skip() {
            debug!("skip metadata type {key}");
            continue;
        }

        let type_name = metadata_type_name(key);
        let deployed = deploy.members(&type_name);
        let destroyed = destroy.members(&type_name);

        if forces_full_run(setting, deployed, destroyed) {
            info!("changes to {type_name} require a full test run");
            plan.strategy = Strategy::Full;
            return plan;
        }

        plan.strategy = Strategy::Delta;
        let is_apex_class = type_name == APEX_CLASS_TYPE;

        if setting.on_deploy() != TestStrategy::Skip {
            for member in deployed {
                seed(&mut plan, member, ChangeKind::Deploy, is_apex_class, naming_convention);
            }
        }

        if setting.on_destroy() != TestStrategy::Skip {
            for member in destroyed {
                seed(&mut plan, member, ChangeKind::Destroy, is_apex_class, naming_convention);
            }
        }
    }

    plan
}

fn forces_full_run(setting: &StrategySetting, deployed: &[String], destroyed: &[String]) -> bool {
    (!deployed.is_empty() && setting.on_deploy() == TestStrategy::Full)
        || (!destroyed.is_empty() && setting.on_destroy() == TestStrategy::Full)
}

fn seed(
    plan: &mut StrategyPlan,
    member: &str,
    kind: ChangeKind,
    is_apex_class: bool,
    naming_convention: &str,
) {
    if member == WILDCARD_MEMBER {
        warn!("wildcard member in {kind} manifest names no component, ignoring it");
        return;
    }

    if is_apex_class && kind == ChangeKind::Deploy {
        if member.ends_with(naming_convention) {
            debug!("changed test class {member} queued for execution");
            plan.tests.insert(member.to_string());
            return;
        }

        plan.changed_classes.insert(member.to_string());
    }

    debug!("seed frontier with {kind} member {member}");
    plan.frontier.extend(expand_dotted(member));
}

/// Expand dotted member name into itself and all of its strict suffixes.
///
/// Repeatedly strips the leading segment up to and including the first `.`,
/// e.g., `Account.Rating__c` yields `Account.Rating__c` and `Rating__c`. Empty
/// suffixes are never produced.
pub fn expand_dotted(member: &str) -> Vec<String> {
    let mut tokens = vec![member.to_string()];
    let mut rest = member;
    while let Some((_, suffix)) = rest.split_once('.') {
        if suffix.is_empty() {
            break;
        }

        tokens.push(suffix.to_string());
        rest = suffix;
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use simple_test_case::test_case;

    fn uniform(strategy: TestStrategy) -> StrategySetting {
        StrategySetting::Uniform(strategy)
    }

    fn frontier_of(plan: &StrategyPlan) -> Vec<&str> {
        plan.frontier.iter().collect()
    }

    #[test_case("Foo", vec!["Foo"]; "plain name")]
    #[test_case("Account.Field__c", vec!["Account.Field__c", "Field__c"]; "qualified field")]
    #[test_case("a.b.c", vec!["a.b.c", "b.c", "c"]; "nested segments")]
    #[test_case("Account.", vec!["Account."]; "trailing dot")]
    #[test]
    fn dotted_name_expansion(member: &str, expect: Vec<&str>) {
        pretty_assertions::assert_eq!(expand_dotted(member), expect);
    }

    #[test]
    fn skipped_and_memberless_types_leave_frontier_empty() {
        let config = StrategyConfig::from_iter([
            ("apexClass", uniform(TestStrategy::Delta)),
            ("layout", uniform(TestStrategy::Skip)),
        ]);
        let deploy = Manifest::from_iter([("Layout", "Account-Account Layout")]);

        let plan = plan_strategy(&config, &deploy, &Manifest::new(), "Test");
        assert_eq!(plan.strategy, Strategy::Delta);
        assert!(plan.frontier.is_empty());
        assert!(!plan.needs_search());
    }

    #[test]
    fn full_type_short_circuits() {
        let config = StrategyConfig::from_iter([
            ("apexClass", uniform(TestStrategy::Full)),
            ("customField", uniform(TestStrategy::Delta)),
        ]);
        let deploy = Manifest::from_iter([
            ("ApexClass", "Foo"),
            ("CustomField", "Account.Rating__c"),
        ]);

        let plan = plan_strategy(&config, &deploy, &Manifest::new(), "Test");
        assert_eq!(plan.strategy, Strategy::Full);
        assert!(plan.frontier.is_empty());
    }

    #[test]
    fn full_on_destroy_only_applies_to_destroyed_members() {
        let config = StrategyConfig::from_iter([(
            "customField",
            StrategySetting::Split {
                on_deploy: TestStrategy::Delta,
                on_destroy: TestStrategy::Full,
            },
        )]);
        let changes = Manifest::from_iter([("CustomField", "Account.Rating__c")]);

        let plan = plan_strategy(&config, &changes, &Manifest::new(), "Test");
        assert_eq!(plan.strategy, Strategy::Delta);
        assert_eq!(frontier_of(&plan), vec!["Account.Rating__c", "Rating__c"]);

        let plan = plan_strategy(&config, &Manifest::new(), &changes, "Test");
        assert_eq!(plan.strategy, Strategy::Full);
    }

    #[test]
    fn apex_classes_split_into_tests_and_changed_classes() {
        let config = StrategyConfig::from_iter([("apexClass", uniform(TestStrategy::Delta))]);
        let deploy = Manifest::from_iter([("ApexClass", "Foo"), ("ApexClass", "BarTest")]);
        let destroy = Manifest::from_iter([("ApexClass", "Gone")]);

        let plan = plan_strategy(&config, &deploy, &destroy, "Test");
        assert_eq!(frontier_of(&plan), vec!["Foo", "Gone"]);
        assert_eq!(plan.tests, BTreeSet::from(["BarTest".to_string()]));
        assert_eq!(plan.changed_classes, BTreeSet::from(["Foo".to_string()]));
    }

    #[test]
    fn unconfigured_type_never_forces_full_run() {
        let config = StrategyConfig::from_iter([("apexClass", uniform(TestStrategy::Delta))]);
        let deploy = Manifest::from_iter([("ApexClass", "Foo"), ("Profile", "Admin")]);

        let plan = plan_strategy(&config, &deploy, &Manifest::new(), "Test");
        assert_eq!(plan.strategy, Strategy::Delta);
        assert_eq!(frontier_of(&plan), vec!["Foo"]);
    }

    #[test]
    fn empty_config_is_unconfigured() {
        let deploy = Manifest::from_iter([("ApexClass", "Foo")]);
        let plan = plan_strategy(&StrategyConfig::new(), &deploy, &Manifest::new(), "Test");
        assert_eq!(plan.strategy, Strategy::Unconfigured);
        assert!(plan.frontier.is_empty());
    }

    #[test]
    fn split_skip_drops_that_side() {
        let config = StrategyConfig::from_iter([(
            "customField",
            StrategySetting::Split {
                on_deploy: TestStrategy::Skip,
                on_destroy: TestStrategy::Delta,
            },
        )]);
        let deploy = Manifest::from_iter([("CustomField", "Account.Deployed__c")]);
        let destroy = Manifest::from_iter([("CustomField", "Account.Removed__c")]);

        let plan = plan_strategy(&config, &deploy, &destroy, "Test");
        assert_eq!(frontier_of(&plan), vec!["Account.Removed__c", "Removed__c"]);
    }

    #[test]
    fn wildcard_members_are_ignored() {
        let config = StrategyConfig::from_iter([("apexTrigger", uniform(TestStrategy::Delta))]);
        let deploy = Manifest::from_iter([("ApexTrigger", "*"), ("ApexTrigger", "AccountTrigger")]);

        let plan = plan_strategy(&config, &deploy, &Manifest::new(), "Test");
        assert_eq!(frontier_of(&plan), vec!["AccountTrigger"]);
    }
}
