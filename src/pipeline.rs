// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! End-to-end resolution of a project.
//!
//! Locate the project definition from a working directory, load the change
//! manifests, index the package directory if a search is needed, and resolve
//! the tests to run. The resulting directive is written out either as command
//! line flags or as JSON.

use crate::{
    config::ProjectConfig,
    directive::TestDirective,
    logging::{LogSettings, LoggingError},
    manifest::{ChangeKind, Manifest, ManifestError},
    path::{expand_path, find_project_root, ExpandError, PROJECT_FILE},
    resolver::{coverage::CoverageSource, Resolution, Resolver, ResolverError, ResolverSettings},
    source::{SourceError, SourceIndex, SourceSettings, DEFAULT_CLASS_PATTERN},
};

use std::{
    io::Write,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument, warn};

/// Inputs of a resolution run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    /// Path to manifest of deployed components.
    pub manifest: Option<String>,

    /// Path to manifest of destroyed components.
    pub destructive_manifest: Option<String>,

    /// Directory holding Apex classes, overriding the project default.
    pub package_dir: Option<String>,

    /// File name pattern selecting class files.
    pub class_pattern: String,

    /// Dependency resolution settings.
    pub resolver: ResolverSettings,

    /// Logging and progress display settings.
    pub log: LogSettings,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            manifest: None,
            destructive_manifest: None,
            package_dir: None,
            class_pattern: DEFAULT_CLASS_PATTERN.into(),
            resolver: ResolverSettings::default(),
            log: LogSettings::default(),
        }
    }
}

/// Resolve tests to run for the project containing `cwd`.
///
/// A missing project definition is not an error. Every metadata type is
/// unconfigured in that case, so nothing selects tests.
///
/// # Errors
///
/// - Return [`PipelineError::Config`] if project definition is invalid.
/// - Return [`PipelineError::Manifest`] if a given manifest cannot be used.
/// - Return [`PipelineError::Source`] if package directory cannot be indexed.
/// - Return [`PipelineError::Resolver`] if coverage lookup fails.
#[instrument(skip_all, level = "debug")]
pub async fn resolve_project<C>(
    cwd: impl AsRef<Path>,
    options: &RunOptions,
    coverage: C,
) -> Result<Resolution>
where
    C: CoverageSource,
{
    let cwd = cwd.as_ref();
    let root = find_project_root(cwd);
    let project = match &root {
        Some(root) => ProjectConfig::load(root.join(PROJECT_FILE))?,
        None => {
            warn!("no {PROJECT_FILE} found, no test strategies are configured");
            ProjectConfig::default()
        }
    };

    let deploy = load_manifest(options.manifest.as_deref())?;
    let destroy = load_manifest(options.destructive_manifest.as_deref())?;
    if deploy.is_empty() && destroy.is_empty() {
        info!("no changed components given");
    }
    for change in deploy
        .changes(ChangeKind::Deploy)
        .iter()
        .chain(&destroy.changes(ChangeKind::Destroy))
    {
        debug!(
            "{} {} {}",
            change.change_kind, change.metadata_type, change.member_name
        );
    }

    let resolver = Resolver::with_coverage(project.strategies()?, options.resolver.clone(), coverage);
    let plan = resolver.plan(&deploy, &destroy);

    let index = if plan.needs_search() {
        let base = root.unwrap_or_else(|| cwd.to_path_buf());
        let dir = package_dir(&base, options.package_dir.as_deref(), &project)?;
        info!("index Apex classes in {:?}", dir.display());
        let settings = SourceSettings {
            naming_convention: options.resolver.naming_convention.clone(),
            class_pattern: options.class_pattern.clone(),
        };
        SourceIndex::scan(&dir, &settings)?
    } else {
        SourceIndex::default()
    };

    let bar = if options.resolver.use_code_coverage && plan.needs_search() {
        options.log.spinner("resolving test dependencies")?
    } else {
        indicatif::ProgressBar::hidden()
    };
    let resolution = resolver.finish(plan, &index).await;
    bar.finish_and_clear();
    let resolution = resolution?;

    info!(
        "{} strategy found {} dependencies, run {}",
        resolution.strategy,
        resolution.trace.len(),
        resolution.directive.test_level()
    );

    Ok(resolution)
}

/// Write directive either as flags or as JSON.
///
/// # Errors
///
/// - Return [`PipelineError::Render`] if directive cannot be serialized.
/// - Return [`PipelineError::Output`] if writing fails.
pub fn write_directive(
    out: &mut impl Write,
    directive: &TestDirective,
    json_output: bool,
) -> Result<()> {
    if json_output {
        writeln!(out, "{}", directive.to_json()?)?;
    } else {
        writeln!(out, "{directive}")?;
    }

    Ok(())
}

fn load_manifest(raw: Option<&str>) -> Result<Manifest> {
    let Some(raw) = raw else {
        return Ok(Manifest::new());
    };

    let path = expand_path(raw)?;
    Manifest::load(&path).map_err(|source| PipelineError::Manifest {
        raw: raw.to_string(),
        source,
    })
}

fn package_dir(base: &Path, raw: Option<&str>, project: &ProjectConfig) -> Result<PathBuf> {
    if let Some(raw) = raw {
        return Ok(expand_path(raw)?);
    }

    Ok(base.join(project.default_package_dir()?))
}

/// Resolution run error types.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Project definition cannot be used.
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    /// User supplied path cannot be expanded.
    #[error(transparent)]
    Expand(#[from] ExpandError),

    /// Manifest cannot be used.
    #[error("cannot use manifest {raw:?}")]
    Manifest {
        raw: String,

        #[source]
        source: ManifestError,
    },

    /// Package directory cannot be indexed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Dependency resolution fails.
    #[error(transparent)]
    Resolver(#[from] ResolverError),

    /// Progress spinner cannot be drawn.
    #[error(transparent)]
    Logging(#[from] LoggingError),

    /// Directive cannot be serialized.
    #[error("failed to serialize test directive")]
    Render(#[from] serde_json::Error),

    /// Directive cannot be written out.
    #[error("failed to write test directive")]
    Output(#[from] std::io::Error),
}

/// Friendly result alias :3
pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
