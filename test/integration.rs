// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::{resolve_from, resolve_with, ProjectFixture};

use anyhow::Result;
use apex_testdeps::{
    manifest::ManifestError,
    pipeline::{write_directive, PipelineError, RunOptions},
    resolver::strategy::Strategy,
    ResolverSettings, TestDirective, TestLevel,
};
use indoc::indoc;
use pretty_assertions::assert_eq;
use sealed_test::prelude::*;
use std::env::current_dir;

const DELTA_PROJECT: &str = indoc! {r#"
    {
      "packageDirectories": [{ "path": "force-app", "default": true }],
      "sourceApiVersion": "62.0",
      "plugins": {
        "mdataDeltaTests": {
          "apexClass": "delta",
          "customField": { "onDeploy": "delta", "onDestroy": "full" },
          "layout": "skip"
        }
      }
    }
"#};

fn account_project() -> Result<ProjectFixture> {
    let project = ProjectFixture::new(current_dir()?, DELTA_PROJECT)?;
    project.add_class(
        "force-app",
        "AccountService",
        "public class AccountService { void rate(Account acct) { acct.Rating__c = 'Hot'; } }",
    )?;
    project.add_class(
        "force-app",
        "AccountServiceTest",
        "@isTest class AccountServiceTest { }",
    )?;
    project.add_class(
        "force-app",
        "BillingJob",
        "public class BillingJob { void run() { new AccountService().rate(null); } }",
    )?;
    project.add_class("force-app", "BillingJobTest", "@isTest class BillingJobTest { }")?;
    project.add_class("force-app", "Reporter", "public class Reporter { }")?;
    project.add_class("force-app", "ReporterTest", "@isTest class ReporterTest { }")?;
    Ok(project)
}

#[sealed_test]
fn changed_field_selects_dependent_tests() -> Result<()> {
    let project = account_project()?;
    let deploy = project.add_manifest("package.xml", &[("CustomField", &["Account.Rating__c"])])?;

    let result = resolve_from(project.root(), Some(&deploy), None, ResolverSettings::default())?;
    assert_eq!(result.strategy, Strategy::Delta);
    assert_eq!(
        result.directive.to_string(),
        "-l RunSpecifiedTests -r AccountServiceTest,BillingJobTest"
    );

    Ok(())
}

#[sealed_test]
fn depth_limit_applies_end_to_end() -> Result<()> {
    let project = account_project()?;
    let deploy = project.add_manifest("package.xml", &[("CustomField", &["Account.Rating__c"])])?;
    let settings = ResolverSettings {
        max_depth: 2,
        ..ResolverSettings::default()
    };

    let result = resolve_from(project.root(), Some(&deploy), None, settings)?;
    assert_eq!(
        result.directive,
        TestDirective::run_specified_tests(["AccountServiceTest"])
    );

    Ok(())
}

#[sealed_test]
fn destroyed_field_forces_full_run() -> Result<()> {
    let project = account_project()?;
    let destroy = project.add_manifest(
        "destructiveChanges.xml",
        &[("CustomField", &["Account.Rating__c"])],
    )?;

    let result = resolve_from(project.root(), None, Some(&destroy), ResolverSettings::default())?;
    assert_eq!(result.strategy, Strategy::Full);
    assert_eq!(result.directive.to_string(), "-l RunLocalTests");

    Ok(())
}

#[sealed_test]
fn skipped_and_unconfigured_types_run_nothing() -> Result<()> {
    let project = account_project()?;
    let deploy = project.add_manifest(
        "package.xml",
        &[
            ("Layout", &["Account-Account Layout"]),
            ("Profile", &["Admin"]),
        ],
    )?;

    let result = resolve_from(project.root(), Some(&deploy), None, ResolverSettings::default())?;
    assert_eq!(result.directive.test_level(), TestLevel::NoTestRun);

    Ok(())
}

#[sealed_test]
fn changed_test_class_runs_with_found_tests() -> Result<()> {
    let project = account_project()?;
    let deploy = project.add_manifest(
        "package.xml",
        &[("ApexClass", &["Reporter", "BillingJobTest"])],
    )?;

    let result = resolve_from(project.root(), Some(&deploy), None, ResolverSettings::default())?;
    assert_eq!(
        result.directive,
        TestDirective::run_specified_tests(["BillingJobTest", "ReporterTest"])
    );
    assert!(result.changed_classes.contains("Reporter"));

    Ok(())
}

#[sealed_test]
fn forceignored_classes_are_never_searched() -> Result<()> {
    let project = account_project()?;
    project.add_file(".forceignore", "**/BillingJob.cls\n")?;
    let deploy = project.add_manifest("package.xml", &[("CustomField", &["Account.Rating__c"])])?;

    let result = resolve_from(project.root(), Some(&deploy), None, ResolverSettings::default())?;
    assert_eq!(
        result.directive,
        TestDirective::run_specified_tests(["AccountServiceTest"])
    );

    Ok(())
}

#[sealed_test]
fn project_package_directory_is_scanned() -> Result<()> {
    let project = ProjectFixture::new(
        current_dir()?,
        indoc! {r#"
            {
              "packageDirectories": [{ "path": "core" }, { "path": "app", "default": true }],
              "plugins": { "mdataDeltaTests": { "apexTrigger": "delta" } }
            }
        "#},
    )?;
    project.add_class("core", "Stale", "public class Stale { AccountTrigger t; }")?;
    project.add_class("core", "StaleTest", "@isTest class StaleTest { }")?;
    project.add_class("app", "Handler", "public class Handler { AccountTrigger t; }")?;
    project.add_class("app", "HandlerTest", "@isTest class HandlerTest { }")?;
    project.add_class("app", "Other", "public class Other { }")?;
    project.add_class("app", "OtherTest", "@isTest class OtherTest { }")?;
    let deploy = project.add_manifest("package.xml", &[("ApexTrigger", &["AccountTrigger"])])?;

    let result = resolve_from(project.root(), Some(&deploy), None, ResolverSettings::default())?;
    assert_eq!(
        result.directive,
        TestDirective::run_specified_tests(["HandlerTest"])
    );

    Ok(())
}

#[sealed_test]
fn missing_project_definition_runs_nothing() -> Result<()> {
    let cwd = current_dir()?;
    std::fs::write(
        cwd.join("package.xml"),
        "<Package><types><members>Foo</members><name>ApexClass</name></types></Package>",
    )?;

    let result = resolve_from(&cwd, Some(&cwd.join("package.xml")), None, ResolverSettings::default())?;
    assert_eq!(result.directive, TestDirective::no_test_run());

    Ok(())
}

#[sealed_test]
fn missing_manifest_is_fatal() -> Result<()> {
    let project = account_project()?;
    let missing = project.root().join("manifest/nope.xml");

    let result = resolve_from(project.root(), Some(&missing), None, ResolverSettings::default());
    let error = result.expect_err("missing manifest must fail");
    assert!(matches!(
        error.downcast_ref::<PipelineError>(),
        Some(PipelineError::Manifest {
            source: ManifestError::Read { .. },
            ..
        })
    ));

    Ok(())
}

#[sealed_test]
fn json_output_lists_tests() -> Result<()> {
    let project = account_project()?;
    let deploy = project.add_manifest("package.xml", &[("ApexClass", &["Reporter"])])?;

    let result = resolve_from(project.root(), Some(&deploy), None, ResolverSettings::default())?;
    let mut stdout = Vec::new();
    write_directive(&mut stdout, &result.directive, true)?;
    let expect = indoc! {r#"
        {
          "testLevel": "RunSpecifiedTests",
          "classList": [
            "ReporterTest"
          ]
        }
    "#};
    assert_eq!(String::from_utf8(stdout)?, expect);

    Ok(())
}

#[sealed_test]
fn flag_output_lists_tests() -> Result<()> {
    let project = account_project()?;
    let deploy = project.add_manifest("package.xml", &[("ApexClass", &["Reporter"])])?;

    let result = resolve_from(project.root(), Some(&deploy), None, ResolverSettings::default())?;
    let mut stdout = Vec::new();
    write_directive(&mut stdout, &result.directive, false)?;
    assert_eq!(String::from_utf8(stdout)?, "-l RunSpecifiedTests -r ReporterTest\n");

    Ok(())
}

#[sealed_test]
fn package_dir_flag_overrides_project_default() -> Result<()> {
    let project = account_project()?;
    project.add_class(
        "vendor",
        "Importer",
        "public class Importer { void run() { new BillingJob().run(); } }",
    )?;
    project.add_class("vendor", "ImporterTest", "@isTest class ImporterTest { }")?;
    project.add_class("vendor", "BillingJobTest", "@isTest class BillingJobTest { }")?;
    let deploy = project.add_manifest("package.xml", &[("ApexClass", &["BillingJob"])])?;

    let options = RunOptions {
        manifest: Some(deploy.display().to_string()),
        package_dir: Some(project.root().join("vendor").display().to_string()),
        ..RunOptions::default()
    };
    let result = resolve_with(project.root(), &options)?;
    assert_eq!(
        result.directive,
        TestDirective::run_specified_tests(["ImporterTest"])
    );

    Ok(())
}

#[sealed_test]
fn class_pattern_limits_indexed_files() -> Result<()> {
    let project = account_project()?;
    let deploy = project.add_manifest("package.xml", &[("CustomField", &["Account.Rating__c"])])?;

    let options = RunOptions {
        manifest: Some(deploy.display().to_string()),
        class_pattern: "[AR]*.cls".into(),
        ..RunOptions::default()
    };
    let result = resolve_with(project.root(), &options)?;
    assert_eq!(
        result.directive,
        TestDirective::run_specified_tests(["AccountServiceTest"])
    );

    Ok(())
}
