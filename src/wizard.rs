// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Interactive test strategy configuration.
//!
//! Walk through common metadata types, plus every type that is configured
//! already, and ask for the test strategy of each one. The answers replace
//! the strategy table of the project definition. Nothing is written unless
//! every question was answered.

use crate::config::{
    config_key, metadata_type_name, ConfigError, ProjectConfig, StrategyConfig, StrategySetting,
    TestStrategy,
};

use inquire::{InquireError, Select};
use std::{
    collections::BTreeSet,
    fmt::{Display, Formatter, Result as FmtResult},
    path::Path,
};
use tracing::{debug, info, instrument};

/// Metadata types always offered for configuration.
pub const KNOWN_METADATA_TYPES: &[&str] = &[
    "ApexClass",
    "ApexComponent",
    "ApexPage",
    "ApexTrigger",
    "AuraDefinitionBundle",
    "CustomField",
    "CustomLabels",
    "CustomMetadata",
    "CustomObject",
    "Flow",
    "Layout",
    "LightningComponentBundle",
    "PermissionSet",
    "Profile",
    "RecordType",
    "StaticResource",
    "ValidationRule",
    "Workflow",
];

/// Source of answers for the configuration wizard.
pub trait StrategyPrompter {
    /// Ask for test strategy of metadata type.
    ///
    /// Returns `None` to leave metadata type unconfigured.
    ///
    /// # Errors
    ///
    /// - Return [`WizardError::Canceled`] if user backs out.
    fn choose(
        &mut self,
        type_name: &str,
        current: Option<&StrategySetting>,
    ) -> Result<Option<StrategySetting>>;
}

/// Ask for test strategy of every known and configured metadata type.
///
/// # Errors
///
/// - Return [`WizardError`] if prompter fails. Nothing of the answers given so
///   far is kept in that case.
#[instrument(skip_all, level = "debug")]
pub fn run_wizard(
    current: &StrategyConfig,
    prompter: &mut impl StrategyPrompter,
) -> Result<StrategyConfig> {
    let mut keys = KNOWN_METADATA_TYPES
        .iter()
        .map(config_key)
        .collect::<BTreeSet<_>>();
    keys.extend(current.iter().map(|(key, _)| key.clone()));

    let mut updated = StrategyConfig::new();
    for key in keys {
        let type_name = metadata_type_name(&key);
        match prompter.choose(&type_name, current.get(&key))? {
            Some(setting) => {
                debug!("configure {type_name} as {setting}");
                updated.insert(key, setting);
            }
            None => debug!("leave {type_name} unconfigured"),
        }
    }

    Ok(updated)
}

/// Run wizard against project definition file, and write answers back.
///
/// # Errors
///
/// - Return [`WizardError::Config`] if project definition cannot be read or
///   written.
/// - Return [`WizardError`] if prompter fails, leaving the file untouched.
pub fn configure_project(
    project_file: impl AsRef<Path>,
    prompter: &mut impl StrategyPrompter,
) -> Result<StrategyConfig> {
    let project_file = project_file.as_ref();
    let mut project = ProjectConfig::load(project_file)?;
    let strategies = run_wizard(&project.strategies()?, prompter)?;

    project.set_strategies(&strategies)?;
    project.save(project_file)?;
    info!(
        "saved {} test strategies to {:?}",
        strategies.len(),
        project_file.display()
    );

    Ok(strategies)
}

/// Terminal prompter backed by `inquire` selection menus.
#[derive(Default, Debug, Clone, Copy)]
pub struct InquirePrompter;

impl InquirePrompter {
    /// Construct new terminal prompter.
    pub fn new() -> Self {
        Self
    }

    fn select_side(message: &str, current: TestStrategy) -> Result<TestStrategy> {
        let options = vec![TestStrategy::Delta, TestStrategy::Full, TestStrategy::Skip];
        let cursor = options.iter().position(|strategy| *strategy == current).unwrap_or(0);
        let strategy = Select::new(message, options)
            .with_starting_cursor(cursor)
            .prompt()?;

        Ok(strategy)
    }
}

impl StrategyPrompter for InquirePrompter {
    fn choose(
        &mut self,
        type_name: &str,
        current: Option<&StrategySetting>,
    ) -> Result<Option<StrategySetting>> {
        let cursor = Choice::of(current) as usize;
        let message = format!("Test strategy for {type_name}:");
        let choice = Select::new(&message, Choice::ALL.to_vec())
            .with_starting_cursor(cursor)
            .prompt()?;

        let setting = match choice {
            Choice::Delta => Some(StrategySetting::Uniform(TestStrategy::Delta)),
            Choice::Full => Some(StrategySetting::Uniform(TestStrategy::Full)),
            Choice::Skip => Some(StrategySetting::Uniform(TestStrategy::Skip)),
            Choice::Unconfigured => None,
            Choice::Split => {
                let on_deploy = Self::select_side(
                    &format!("Test strategy for deployed {type_name}:"),
                    current.map_or(TestStrategy::Delta, StrategySetting::on_deploy),
                )?;
                let on_destroy = Self::select_side(
                    &format!("Test strategy for destroyed {type_name}:"),
                    current.map_or(TestStrategy::Delta, StrategySetting::on_destroy),
                )?;
                Some(StrategySetting::Split {
                    on_deploy,
                    on_destroy,
                })
            }
        };

        Ok(setting)
    }
}

// INVARIANT: Discriminants index into `Choice::ALL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Choice {
    Delta = 0,
    Full = 1,
    Skip = 2,
    Split = 3,
    Unconfigured = 4,
}

impl Choice {
    const ALL: [Choice; 5] = [
        Choice::Delta,
        Choice::Full,
        Choice::Skip,
        Choice::Split,
        Choice::Unconfigured,
    ];

    fn of(setting: Option<&StrategySetting>) -> Self {
        match setting {
            None => Self::Unconfigured,
            Some(StrategySetting::Uniform(TestStrategy::Delta)) => Self::Delta,
            Some(StrategySetting::Uniform(TestStrategy::Full)) => Self::Full,
            Some(StrategySetting::Uniform(TestStrategy::Skip)) => Self::Skip,
            Some(StrategySetting::Split { .. }) => Self::Split,
        }
    }
}

impl Display for Choice {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Delta => fmt.write_str("delta: run tests of dependent classes"),
            Self::Full => fmt.write_str("full: run all local tests"),
            Self::Skip => fmt.write_str("skip: changes never select tests"),
            Self::Split => fmt.write_str("split: separate deploy and destroy strategies"),
            Self::Unconfigured => fmt.write_str("unconfigured"),
        }
    }
}

/// Configuration wizard error types.
#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    /// User backed out of the wizard.
    #[error("configuration canceled, nothing was written")]
    Canceled,

    /// Terminal prompt fails.
    #[error(transparent)]
    Prompt(InquireError),

    /// Project definition cannot be read or written.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<InquireError> for WizardError {
    fn from(error: InquireError) -> Self {
        match error {
            InquireError::OperationCanceled | InquireError::OperationInterrupted => Self::Canceled,
            error => Self::Prompt(error),
        }
    }
}

/// Friendly result alias :3
pub type Result<T, E = WizardError> = std::result::Result<T, E>;
