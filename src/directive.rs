// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Test execution directives.
//!
//! The final answer of a run is a test level plus an optional list of test
//! classes. It is either printed as deployment command flags, e.g.,
//! `-l RunSpecifiedTests -r FooTest,BarTest`, or as a JSON object.

use serde::Serialize;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Test level understood by deployments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TestLevel {
    /// Run no tests.
    NoTestRun,

    /// Run all local tests.
    RunLocalTests,

    /// Run listed tests only.
    RunSpecifiedTests,
}

impl Display for TestLevel {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::NoTestRun => fmt.write_str("NoTestRun"),
            Self::RunLocalTests => fmt.write_str("RunLocalTests"),
            Self::RunSpecifiedTests => fmt.write_str("RunSpecifiedTests"),
        }
    }
}

/// Test level with the test classes it applies to.
///
/// # Invariant
///
/// - Class list is only non-empty for [`TestLevel::RunSpecifiedTests`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestDirective {
    test_level: TestLevel,
    class_list: Vec<String>,
}

impl TestDirective {
    /// Run no tests.
    pub fn no_test_run() -> Self {
        Self {
            test_level: TestLevel::NoTestRun,
            class_list: Vec::new(),
        }
    }

    /// Run all local tests.
    pub fn run_local_tests() -> Self {
        Self {
            test_level: TestLevel::RunLocalTests,
            class_list: Vec::new(),
        }
    }

    /// Run given test classes.
    ///
    /// Classes keep iteration order. An empty listing runs no tests.
    pub fn run_specified_tests(classes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let class_list = classes.into_iter().map(Into::into).collect::<Vec<_>>();
        if class_list.is_empty() {
            return Self::no_test_run();
        }

        Self {
            test_level: TestLevel::RunSpecifiedTests,
            class_list,
        }
    }

    /// Test level of directive.
    pub fn test_level(&self) -> TestLevel {
        self.test_level
    }

    /// Test classes to run.
    pub fn class_list(&self) -> &[String] {
        &self.class_list
    }

    /// Render directive as JSON object.
    ///
    /// # Errors
    ///
    /// - Return [`serde_json::Error`] if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl Display for TestDirective {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(fmt, "-l {}", self.test_level)?;
        if !self.class_list.is_empty() {
            write!(fmt, " -r {}", self.class_list.join(","))?;
        }

        Ok(())
    }
}
