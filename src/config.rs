// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout of the project definition file to simplify the process
//! of serialization and deserialization. The project definition is a JSON
//! document owned by the platform tooling, so only the parts this tool cares
//! about are given typed views. Every other key is kept verbatim such that
//! writing the document back never loses information.
//!
//! # Test Strategy Layout
//!
//! Test strategies live under `plugins.mdataDeltaTests`. Each key is a
//! metadata type name with its first letter lowercased, e.g., `apexClass` for
//! `ApexClass`. Each value is either a single strategy, or a pair of strategies
//! that differ between deployment and destruction:
//!
//! ```json
//! {
//!   "plugins": {
//!     "mdataDeltaTests": {
//!       "apexClass": "delta",
//!       "customField": { "onDeploy": "full", "onDestroy": "delta" },
//!       "layout": "skip"
//!     }
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{
    collections::{btree_map, BTreeMap},
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    fs::{read_to_string, write},
    path::{Path, PathBuf},
    str::FromStr,
};

/// Key of plugin settings section in project definition.
pub const PLUGINS_KEY: &str = "plugins";

/// Key of test strategy table inside plugin settings section.
pub const STRATEGIES_KEY: &str = "mdataDeltaTests";

/// Package directory used when project definition does not name one.
pub const FALLBACK_PACKAGE_DIR: &str = "force-app";

/// Project definition layout.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectConfig {
    document: Value,
}

impl ProjectConfig {
    /// Load project definition from file.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Read`] if file cannot be read.
    /// - Return [`ConfigError::Deserialize`] if file is not valid JSON.
    /// - Return [`ConfigError::InvalidLayout`] if top-level is not an object.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = read_to_string(path).map_err(|err| ConfigError::Read {
            source: err,
            path: path.to_path_buf(),
        })?;

        content.parse()
    }

    /// Write project definition to file.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Serialize`] if document cannot be serialized.
    /// - Return [`ConfigError::Write`] if file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut content =
            serde_json::to_string_pretty(&self.document).map_err(ConfigError::Serialize)?;
        content.push('\n');
        write(path, content).map_err(|err| ConfigError::Write {
            source: err,
            path: path.to_path_buf(),
        })
    }

    /// List package directories of project.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Deserialize`] if listing is malformed.
    pub fn package_directories(&self) -> Result<Vec<PackageDirectory>> {
        match self.document.get("packageDirectories") {
            Some(value) => {
                Vec::<PackageDirectory>::deserialize(value).map_err(ConfigError::Deserialize)
            }
            None => Ok(Vec::new()),
        }
    }

    /// Determine default package directory.
    ///
    /// Picks the entry flagged as default, or the first entry, or falls back
    /// to [`FALLBACK_PACKAGE_DIR`] if the project lists no directories at all.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Deserialize`] if listing is malformed.
    pub fn default_package_dir(&self) -> Result<String> {
        let directories = self.package_directories()?;
        let path = directories
            .iter()
            .find(|dir| dir.default)
            .or_else(|| directories.first())
            .map(|dir| dir.path.clone())
            .unwrap_or_else(|| FALLBACK_PACKAGE_DIR.to_string());

        Ok(path)
    }

    /// Extract test strategy table.
    ///
    /// Missing plugin section or missing strategy table simply produces an
    /// empty table.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Deserialize`] if strategy table is malformed.
    pub fn strategies(&self) -> Result<StrategyConfig> {
        match self
            .document
            .get(PLUGINS_KEY)
            .and_then(|plugins| plugins.get(STRATEGIES_KEY))
        {
            Some(value) => StrategyConfig::deserialize(value).map_err(ConfigError::Deserialize),
            None => Ok(StrategyConfig::default()),
        }
    }

    /// Replace test strategy table.
    ///
    /// Creates plugin settings section if missing. All other plugin settings
    /// are left untouched.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::InvalidLayout`] if plugin section exists, but
    ///   is not an object.
    /// - Return [`ConfigError::Serialize`] if strategy table cannot be
    ///   serialized.
    pub fn set_strategies(&mut self, strategies: &StrategyConfig) -> Result<()> {
        let table = serde_json::to_value(strategies).map_err(ConfigError::Serialize)?;

        // INVARIANT: Top-level is always an object, see `FromStr`.
        let root = self
            .document
            .as_object_mut()
            .ok_or(ConfigError::InvalidLayout("top-level must be an object"))?;
        let plugins = root
            .entry(PLUGINS_KEY)
            .or_insert_with(|| Value::Object(Map::new()))
            .as_object_mut()
            .ok_or(ConfigError::InvalidLayout("\"plugins\" must be an object"))?;
        plugins.insert(STRATEGIES_KEY.to_string(), table);

        Ok(())
    }
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            document: Value::Object(Map::new()),
        }
    }
}

impl FromStr for ProjectConfig {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let document: Value = serde_json::from_str(data).map_err(ConfigError::Deserialize)?;
        if !document.is_object() {
            return Err(ConfigError::InvalidLayout("top-level must be an object"));
        }

        Ok(Self { document })
    }
}

impl Display for ProjectConfig {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            serde_json::to_string_pretty(&self.document)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Package directory entry of project definition.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct PackageDirectory {
    /// Path to package directory relative to project root.
    pub path: String,

    /// Package directory is the default one.
    #[serde(default)]
    pub default: bool,
}

/// Strategy to pick tests with when a metadata type changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStrategy {
    /// Run every local test.
    #[serde(alias = "Full")]
    Full,

    /// Run only the tests of classes that depend on the change.
    #[serde(alias = "Delta")]
    Delta,

    /// Changes never influence test selection.
    #[serde(alias = "Skip")]
    Skip,
}

impl Display for TestStrategy {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Full => fmt.write_str("full"),
            Self::Delta => fmt.write_str("delta"),
            Self::Skip => fmt.write_str("skip"),
        }
    }
}

/// Configured test strategy of one metadata type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum StrategySetting {
    /// Same strategy for deployment and destruction.
    Uniform(TestStrategy),

    /// Separate strategies for deployment and destruction.
    #[serde(rename_all = "camelCase")]
    Split {
        on_deploy: TestStrategy,
        on_destroy: TestStrategy,
    },
}

impl StrategySetting {
    /// Effective strategy for deployed members.
    pub fn on_deploy(&self) -> TestStrategy {
        match self {
            Self::Uniform(strategy) => *strategy,
            Self::Split { on_deploy, .. } => *on_deploy,
        }
    }

    /// Effective strategy for destroyed members.
    pub fn on_destroy(&self) -> TestStrategy {
        match self {
            Self::Uniform(strategy) => *strategy,
            Self::Split { on_destroy, .. } => *on_destroy,
        }
    }

    /// Metadata type is explicitly skipped as a whole.
    ///
    /// Only a single `skip` counts. A split setting whose sides are both
    /// `skip` still takes part in strategy determination.
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Uniform(TestStrategy::Skip))
    }
}

impl Display for StrategySetting {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Uniform(strategy) => write!(fmt, "{strategy}"),
            Self::Split {
                on_deploy,
                on_destroy,
            } => write!(fmt, "{on_deploy} on deploy, {on_destroy} on destroy"),
        }
    }
}

/// Test strategy table.
///
/// # Invariant
///
/// - Keys iterate in lexical order, making strategy determination
///   reproducible.
/// - Keys are metadata type names with a lowercased first letter.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(transparent)]
pub struct StrategyConfig(BTreeMap<String, StrategySetting>);

impl StrategyConfig {
    /// Construct new empty strategy table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lookup strategy of metadata type by its configuration key.
    pub fn get(&self, key: impl AsRef<str>) -> Option<&StrategySetting> {
        self.0.get(key.as_ref())
    }

    /// Set strategy of metadata type by its configuration key.
    pub fn insert(&mut self, key: impl Into<String>, setting: StrategySetting) {
        self.0.insert(key.into(), setting);
    }

    /// Iterate through configured metadata types in lexical order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, StrategySetting> {
        self.0.iter()
    }

    /// No metadata type configured.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of configured metadata types.
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl<K> FromIterator<(K, StrategySetting)> for StrategyConfig
where
    K: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, StrategySetting)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(key, value)| (key.into(), value)).collect())
    }
}

impl<'a> IntoIterator for &'a StrategyConfig {
    type Item = (&'a String, &'a StrategySetting);
    type IntoIter = btree_map::Iter<'a, String, StrategySetting>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Convert configuration key to metadata type name.
///
/// Only the first letter is uppercased, e.g., `apexClass` becomes `ApexClass`.
pub fn metadata_type_name(key: impl AsRef<str>) -> String {
    let mut chars = key.as_ref().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Convert metadata type name to configuration key.
///
/// Only the first letter is lowercased, e.g., `ApexClass` becomes `apexClass`.
pub fn config_key(type_name: impl AsRef<str>) -> String {
    let mut chars = type_name.as_ref().chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error("failed to deserialize project definition")]
    Deserialize(#[source] serde_json::Error),

    /// Failed to serialize configuration.
    #[error("failed to serialize project definition")]
    Serialize(#[source] serde_json::Error),

    /// Configuration is valid JSON, but not laid out as expected.
    #[error("invalid project definition layout: {0}")]
    InvalidLayout(&'static str),

    /// Configuration file cannot be read from.
    #[error("failed to read project definition at {:?}", .path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Configuration file cannot be written to.
    #[error("failed to write project definition at {:?}", .path.display())]
    Write {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;
