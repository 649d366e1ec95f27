// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use apex_testdeps::{
    logging::LogSettings,
    path::{find_project_root, PROJECT_FILE},
    pipeline::{resolve_project, write_directive, RunOptions},
    resolver::{
        coverage::SfCliCoverage,
        matcher::{MatchOptions, DEFAULT_FUZZY_THRESHOLD},
        ResolverSettings,
    },
    source::{DEFAULT_CLASS_PATTERN, DEFAULT_NAMING_CONVENTION},
    wizard::{configure_project, InquirePrompter, WizardError},
};

use anyhow::{anyhow, Result};
use clap::Parser;
use std::{env::current_dir, io::stdout, path::PathBuf, process::exit};
use tracing::{debug, error, warn};

#[derive(Debug, Clone, Parser)]
#[command(
    about = "Determine which Apex test classes must run to validate a deployment",
    override_usage = "\n  apex-testdeps [options] -x <path> [--destructivemanifest <path>]\n  apex-testdeps --config",
    version
)]
struct Cli {
    /// Metadata types to consider, accepted for compatibility only.
    #[arg(short, long, value_name = "types")]
    pub metadata: Option<String>,

    /// Suffix that names a test class after the class it tests.
    #[arg(
        short = 'n',
        long = "nameconv",
        value_name = "suffix",
        default_value = DEFAULT_NAMING_CONVENTION
    )]
    pub naming_convention: String,

    /// Maximum number of search steps, negative for no limit.
    #[arg(
        short = 'l',
        long,
        value_name = "depth",
        default_value_t = -1,
        allow_negative_numbers = true
    )]
    pub depth: i64,

    /// Path to manifest of deployed components.
    #[arg(short = 'x', long, value_name = "path")]
    pub manifest: Option<String>,

    /// Path to manifest of destroyed components.
    #[arg(long = "destructivemanifest", value_name = "path")]
    pub destructive_manifest: Option<String>,

    /// Minimum similarity score of a fuzzy dependency match.
    #[arg(
        long = "fuzzythreshold",
        value_name = "score",
        default_value_t = DEFAULT_FUZZY_THRESHOLD,
        value_parser = parse_threshold
    )]
    pub fuzzy_threshold: f64,

    /// Add tests that code coverage of the target org links to changed classes.
    #[arg(long = "usecodecoverage")]
    pub use_code_coverage: bool,

    /// Username or alias of org to query code coverage from.
    #[arg(short = 'u', long = "targetusername", value_name = "org")]
    pub target_username: Option<String>,

    /// Directory to look for Apex classes in.
    #[arg(short = 'p', long = "packagedir", value_name = "path")]
    pub package_dir: Option<String>,

    /// Glob selecting Apex class files by file name.
    #[arg(long, value_name = "glob", default_value = DEFAULT_CLASS_PATTERN)]
    pub pattern: String,

    /// Match changed names literally instead of as regular expressions.
    #[arg(long = "literalregex")]
    pub literal_regex: bool,

    /// Configure test strategies of metadata types interactively.
    #[arg(long)]
    pub config: bool,

    /// Print result as JSON, and silence all logs.
    #[arg(long)]
    pub json: bool,

    /// Log every dependency match.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    fn log_settings(&self) -> LogSettings {
        LogSettings {
            json_output: self.json,
            verbose: self.verbose,
        }
    }

    fn resolver_settings(&self) -> ResolverSettings {
        ResolverSettings {
            naming_convention: self.naming_convention.clone(),
            max_depth: self.depth,
            matching: MatchOptions {
                fuzzy_threshold: self.fuzzy_threshold,
                raw_regex: !self.literal_regex,
            },
            use_code_coverage: self.use_code_coverage,
        }
    }

    async fn run(self) -> Result<()> {
        if self.config {
            return run_config(find_project_root(current_dir()?));
        }

        self.run_resolve().await
    }

    fn run_options(&self) -> RunOptions {
        RunOptions {
            manifest: self.manifest.clone(),
            destructive_manifest: self.destructive_manifest.clone(),
            package_dir: self.package_dir.clone(),
            class_pattern: self.pattern.clone(),
            resolver: self.resolver_settings(),
            log: self.log_settings(),
        }
    }

    async fn run_resolve(self) -> Result<()> {
        if let Some(metadata) = &self.metadata {
            debug!("metadata filter {metadata:?} has no effect on delta resolution");
        }

        let coverage = SfCliCoverage::new(self.target_username.clone());
        let resolution = resolve_project(current_dir()?, &self.run_options(), coverage).await?;
        write_directive(&mut stdout().lock(), &resolution.directive, self.json)?;

        Ok(())
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json = cli.json;

    if let Err(error) = cli.log_settings().init() {
        eprintln!("{error:?}");
        exit(1);
    }

    if let Err(error) = cli.run().await {
        if json {
            let report = serde_json::json!({ "status": 1, "message": format!("{error:#}") });
            println!("{report}");
        } else {
            error!("{error:?}");
        }
        exit(1);
    }

    exit(0)
}

fn run_config(root: Option<PathBuf>) -> Result<()> {
    let root = root.ok_or_else(|| {
        anyhow!("no {PROJECT_FILE} found, run inside a project to configure test strategies")
    })?;

    match configure_project(root.join(PROJECT_FILE), &mut InquirePrompter::new()) {
        Ok(_) => Ok(()),
        Err(WizardError::Canceled) => {
            warn!("configuration canceled, {PROJECT_FILE} left unchanged");
            Ok(())
        }
        Err(error) => Err(error.into()),
    }
}

fn parse_threshold(raw: &str) -> Result<f64, String> {
    let value = raw.parse::<f64>().map_err(|err| err.to_string())?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{value} is not within 0 and 1"))
    }
}
