// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Coverage based test selection.
//!
//! An org remembers which test classes exercised which classes the last time
//! tests ran. Asking for the tests that cover the changed code classes finds
//! tests that textual dependency matching misses. Coverage results only ever
//! add test classes, never remove them.

use futures::future::{BoxFuture, FutureExt};
use serde::Deserialize;
use std::{collections::BTreeSet, ffi::OsString};
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// Default command line interface used to query an org.
pub const DEFAULT_SF_PROGRAM: &str = "sf";

/// Source of code coverage data.
pub trait CoverageSource: Send + Sync {
    /// Find test classes known to cover any of the given classes.
    fn covering_tests<'a>(
        &'a self,
        classes: &'a BTreeSet<String>,
    ) -> BoxFuture<'a, Result<BTreeSet<String>>>;
}

/// Union covering tests of changed classes into set of tests to run.
///
/// Returns the number of test classes that were not already present.
///
/// # Errors
///
/// - Return [`CoverageError`] if coverage source fails. No partial results
///   are merged in that case.
#[instrument(skip_all, level = "debug")]
pub async fn narrow_with_coverage(
    tests: &mut BTreeSet<String>,
    changed_classes: &BTreeSet<String>,
    source: &(impl CoverageSource + ?Sized),
) -> Result<usize> {
    if changed_classes.is_empty() {
        return Ok(0);
    }

    let covering = source.covering_tests(changed_classes).await?;
    let before = tests.len();
    tests.extend(covering);
    let added = tests.len() - before;
    info!("code coverage added {added} test classes");

    Ok(added)
}

/// Coverage source backed by the Tooling API through the `sf` executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SfCliCoverage {
    program: OsString,
    target_org: Option<String>,
}

impl SfCliCoverage {
    /// Construct new coverage source querying target org, or the default org
    /// of the project if no target org is given.
    pub fn new(target_org: Option<String>) -> Self {
        Self {
            program: DEFAULT_SF_PROGRAM.into(),
            target_org,
        }
    }

    /// Use a different executable instead of `sf`.
    pub fn with_program(mut self, program: impl Into<OsString>) -> Self {
        self.program = program.into();
        self
    }

    fn query_args(&self, classes: &BTreeSet<String>) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "data".into(),
            "query".into(),
            "--use-tooling-api".into(),
            "--json".into(),
            "--query".into(),
            coverage_query(classes).into(),
        ];

        if let Some(target_org) = &self.target_org {
            args.push("--target-org".into());
            args.push(target_org.into());
        }

        args
    }

    async fn query(&self, classes: &BTreeSet<String>) -> Result<BTreeSet<String>> {
        let args = self.query_args(classes);
        debug!("query coverage of {} classes via {:?}", classes.len(), self.program);

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .await
            .map_err(|err| CoverageError::Spawn {
                source: err,
                program: self.program.to_string_lossy().into_owned(),
            })?;

        let parsed = parse_query_output(&output.stdout);
        if !output.status.success() {
            let message = match parsed {
                Err(CoverageError::Failed { message, .. }) => message,
                _ => String::from_utf8_lossy(&output.stderr).trim().to_string(),
            };
            return Err(CoverageError::Failed {
                status: output.status.code().unwrap_or(-1),
                message,
            });
        }

        parsed
    }
}

impl CoverageSource for SfCliCoverage {
    fn covering_tests<'a>(
        &'a self,
        classes: &'a BTreeSet<String>,
    ) -> BoxFuture<'a, Result<BTreeSet<String>>> {
        self.query(classes).boxed()
    }
}

/// Build Tooling API query selecting test classes covering given classes.
pub fn coverage_query(classes: &BTreeSet<String>) -> String {
    let names = classes
        .iter()
        .map(|name| format!("'{}'", name.replace('\\', "\\\\").replace('\'', "\\'")))
        .collect::<Vec<_>>()
        .join(",");

    format!(
        "SELECT ApexTestClass.Name FROM ApexCodeCoverage WHERE ApexClassOrTrigger.Name IN ({names})"
    )
}

/// Extract covering test class names from JSON output of a query.
///
/// # Errors
///
/// - Return [`CoverageError::Parse`] if output is not a query response.
/// - Return [`CoverageError::Failed`] if response reports a failure.
pub fn parse_query_output(stdout: &[u8]) -> Result<BTreeSet<String>> {
    let response: QueryResponse = serde_json::from_slice(stdout)?;
    if response.status != 0 {
        return Err(CoverageError::Failed {
            status: response.status,
            message: response.message.unwrap_or_default(),
        });
    }

    let records = response.result.map(|result| result.records).unwrap_or_default();
    Ok(records
        .into_iter()
        .filter_map(|record| record.apex_test_class)
        .map(|test_class| test_class.name)
        .collect())
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    status: i32,

    #[serde(default)]
    message: Option<String>,

    #[serde(default)]
    result: Option<QueryResult>,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    #[serde(default)]
    records: Vec<CoverageRecord>,
}

#[derive(Debug, Deserialize)]
struct CoverageRecord {
    #[serde(rename = "ApexTestClass", default)]
    apex_test_class: Option<NamedRecord>,
}

#[derive(Debug, Deserialize)]
struct NamedRecord {
    #[serde(rename = "Name")]
    name: String,
}

/// Coverage query error types.
#[derive(Debug, thiserror::Error)]
pub enum CoverageError {
    /// Query executable cannot be started.
    #[error("failed to run {program:?} for code coverage query")]
    Spawn {
        #[source]
        source: std::io::Error,
        program: String,
    },

    /// Query ran, but reported failure.
    #[error("code coverage query failed with status {status}: {message}")]
    Failed { status: i32, message: String },

    /// Query output is not understood.
    #[error("failed to parse code coverage query output")]
    Parse(#[from] serde_json::Error),
}

/// Friendly result alias :3
pub type Result<T, E = CoverageError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedCoverage {
        tests: BTreeSet<String>,
        calls: AtomicUsize,
    }

    impl FixedCoverage {
        fn new(tests: &[&str]) -> Self {
            Self {
                tests: tests.iter().map(ToString::to_string).collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl CoverageSource for FixedCoverage {
        fn covering_tests<'a>(
            &'a self,
            _classes: &'a BTreeSet<String>,
        ) -> BoxFuture<'a, Result<BTreeSet<String>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            futures::future::ready(Ok(self.tests.clone())).boxed()
        }
    }

    struct BrokenCoverage;

    impl CoverageSource for BrokenCoverage {
        fn covering_tests<'a>(
            &'a self,
            _classes: &'a BTreeSet<String>,
        ) -> BoxFuture<'a, Result<BTreeSet<String>>> {
            futures::future::ready(Err(CoverageError::Failed {
                status: 1,
                message: "no default org".into(),
            }))
            .boxed()
        }
    }

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn union_is_idempotent() -> anyhow::Result<()> {
        let source = FixedCoverage::new(&["ATest", "CTest"]);
        let changed = set(&["A"]);
        let mut tests = set(&["ATest"]);

        let added = narrow_with_coverage(&mut tests, &changed, &source).await?;
        assert_eq!(added, 1);
        assert_eq!(tests, set(&["ATest", "CTest"]));

        let added = narrow_with_coverage(&mut tests, &changed, &source).await?;
        assert_eq!(added, 0);
        assert_eq!(tests, set(&["ATest", "CTest"]));

        Ok(())
    }

    #[tokio::test]
    async fn no_changed_classes_skips_query() -> anyhow::Result<()> {
        let source = FixedCoverage::new(&["ATest"]);
        let mut tests = BTreeSet::new();

        narrow_with_coverage(&mut tests, &BTreeSet::new(), &source).await?;
        assert!(tests.is_empty());
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);

        Ok(())
    }

    #[tokio::test]
    async fn query_failure_propagates() {
        let mut tests = set(&["ATest"]);
        let result = narrow_with_coverage(&mut tests, &set(&["A"]), &BrokenCoverage).await;

        assert!(matches!(result, Err(CoverageError::Failed { .. })));
        assert_eq!(tests, set(&["ATest"]));
    }

    #[tokio::test]
    async fn missing_executable_is_spawn_error() {
        let source = SfCliCoverage::new(None).with_program("/nonexistent/apex-testdeps/sf");
        let result = source.covering_tests(&set(&["A"])).await;
        assert!(matches!(result, Err(CoverageError::Spawn { .. })));
    }

    #[test]
    fn query_lists_escaped_class_names() {
        let result = coverage_query(&set(&["A", "O'Brien"]));
        let expect = "SELECT ApexTestClass.Name FROM ApexCodeCoverage \
            WHERE ApexClassOrTrigger.Name IN ('A','O\\'Brien')";
        assert_eq!(result, expect);
    }

    #[test]
    fn query_args_include_target_org() {
        let source = SfCliCoverage::new(Some("ci@acme.org".into()));
        let args = source.query_args(&set(&["A"]));
        assert_eq!(args[..4], ["data", "query", "--use-tooling-api", "--json"].map(OsString::from));
        assert_eq!(args[args.len() - 2..], ["--target-org", "ci@acme.org"].map(OsString::from));
    }

    #[test]
    fn parse_successful_response() -> anyhow::Result<()> {
        let stdout = indoc! {r#"
            {
              "status": 0,
              "result": {
                "records": [
                  { "attributes": { "type": "ApexCodeCoverage" }, "ApexTestClass": { "Name": "ATest" } },
                  { "ApexTestClass": { "Name": "BTest" } },
                  { "ApexTestClass": { "Name": "ATest" } },
                  { "ApexTestClass": null }
                ],
                "totalSize": 4,
                "done": true
              }
            }
        "#};

        let result = parse_query_output(stdout.as_bytes())?;
        assert_eq!(result, set(&["ATest", "BTest"]));
        Ok(())
    }

    #[test]
    fn parse_failed_response() {
        let stdout = br#"{ "status": 1, "name": "NoDefaultEnvError", "message": "No default org" }"#;
        let result = parse_query_output(stdout);
        assert!(matches!(
            result,
            Err(CoverageError::Failed { status: 1, ref message }) if message == "No default org"
        ));
    }

    #[test]
    fn parse_garbage_output() {
        let result = parse_query_output(b"Warning: update available");
        assert!(matches!(result, Err(CoverageError::Parse(_))));
    }
}
