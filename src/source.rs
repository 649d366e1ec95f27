// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Apex source indexing.
//!
//! Enumerate the class files of a package directory, and partition them into
//! __code classes__ and __test classes__ through a naming convention. A class
//! whose name ends with the naming convention suffix is a test class, e.g.,
//! `AccountServiceTest` with the default suffix `Test`. Every other class is a
//! code class whose full text is kept around for dependency matching.
//!
//! Files excluded by `.forceignore` rules are never indexed. Rules are picked
//! up from the package directory, its subdirectories, and its parents, so the
//! usual `.forceignore` at the project root applies too.

use glob::{MatchOptions, Pattern};
use ignore::WalkBuilder;
use std::{
    collections::{BTreeMap, BTreeSet},
    fs::read_to_string,
    path::{Path, PathBuf},
};
use tracing::{debug, instrument, warn};

/// Ignore file honored while walking package directories.
pub const FORCEIGNORE_FILE: &str = ".forceignore";

/// Default naming convention suffix of test classes.
pub const DEFAULT_NAMING_CONVENTION: &str = "Test";

/// Default file name pattern of class files.
pub const DEFAULT_CLASS_PATTERN: &str = "*.cls";

/// Settings for source indexing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSettings {
    /// Suffix that marks a class as a test class.
    pub naming_convention: String,

    /// File name pattern selecting class files.
    pub class_pattern: String,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            naming_convention: DEFAULT_NAMING_CONVENTION.into(),
            class_pattern: DEFAULT_CLASS_PATTERN.into(),
        }
    }
}

/// Index of code classes and test classes.
///
/// # Invariant
///
/// - Code classes and test classes never overlap.
/// - Class names iterate in lexical order.
#[derive(Default, Debug, PartialEq, Eq, Clone)]
pub struct SourceIndex {
    code: BTreeMap<String, String>,
    tests: BTreeSet<String>,
}

impl SourceIndex {
    /// Construct index from code class sources and test class names.
    ///
    /// Test class names win over code classes of the same name.
    pub fn from_parts(
        code: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
        tests: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let tests = tests.into_iter().map(Into::into).collect::<BTreeSet<_>>();
        let code = code
            .into_iter()
            .map(|(name, text)| (name.into(), text.into()))
            .filter(|(name, _)| !tests.contains(name))
            .collect();

        Self { code, tests }
    }

    /// Scan package directory for class files.
    ///
    /// # Errors
    ///
    /// - Return [`SourceError::MissingDir`] if package directory does not
    ///   exist.
    /// - Return [`SourceError::Pattern`] if class file pattern is invalid.
    /// - Return [`SourceError::Walk`] if directory traversal fails.
    /// - Return [`SourceError::Read`] if class file cannot be read.
    #[instrument(skip(dir, settings), level = "debug")]
    pub fn scan(dir: impl AsRef<Path>, settings: &SourceSettings) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(SourceError::MissingDir(dir.to_path_buf()));
        }

        let pattern = Pattern::new(&settings.class_pattern)?;
        let options = MatchOptions {
            case_sensitive: false,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };

        let mut index = Self::default();
        let walker = WalkBuilder::new(dir)
            .standard_filters(false)
            .parents(true)
            .add_custom_ignore_filename(FORCEIGNORE_FILE)
            .build();
        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_some_and(|kind| kind.is_file()) {
                continue;
            }

            let path = entry.path();
            let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            if !pattern.matches_with(file_name, options) {
                continue;
            }

            let Some(class_name) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };

            if class_name.ends_with(&settings.naming_convention) {
                debug!("index test class {class_name}");
                if !index.tests.insert(class_name.to_string()) {
                    warn!("duplicate test class {class_name} at {:?}", path.display());
                }
                continue;
            }

            let text = read_to_string(path).map_err(|err| SourceError::Read {
                source: err,
                path: path.to_path_buf(),
            })?;
            debug!("index code class {class_name}");
            if index.code.insert(class_name.to_string(), text).is_some() {
                warn!("duplicate code class {class_name} at {:?}", path.display());
            }
        }

        Ok(index)
    }

    /// Iterate through code classes and their source text in lexical order.
    pub fn code_classes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.code
            .iter()
            .map(|(name, text)| (name.as_str(), text.as_str()))
    }

    /// Source text of code class.
    pub fn source_of(&self, class_name: impl AsRef<str>) -> Option<&str> {
        self.code.get(class_name.as_ref()).map(String::as_str)
    }

    /// Set of all test class names.
    pub fn test_classes(&self) -> &BTreeSet<String> {
        &self.tests
    }

    /// Class is a known test class.
    pub fn is_test(&self, class_name: impl AsRef<str>) -> bool {
        self.tests.contains(class_name.as_ref())
    }

    /// Test class paired with code class by naming convention, if indexed.
    pub fn test_for(&self, class_name: &str, naming_convention: &str) -> Option<String> {
        let test_class = format!("{class_name}{naming_convention}");
        self.tests.contains(&test_class).then_some(test_class)
    }

    /// Number of code classes.
    pub fn code_len(&self) -> usize {
        self.code.len()
    }
}

/// Source indexing error types.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Package directory does not exist.
    #[error("package directory {:?} does not exist", .0.display())]
    MissingDir(PathBuf),

    /// Class file pattern is invalid.
    #[error(transparent)]
    Pattern(#[from] glob::PatternError),

    /// Directory traversal failed.
    #[error(transparent)]
    Walk(#[from] ignore::Error),

    /// Class file cannot be read from.
    #[error("failed to read class file at {:?}", .path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = SourceError> = std::result::Result<T, E>;
