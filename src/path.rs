// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine relevent path information for project files that need to be
//! read, e.g., the project definition file, change manifests, and the package
//! directory holding Apex sources.

use std::path::{Path, PathBuf};

/// Name of the project definition file at the top-level of every project.
pub const PROJECT_FILE: &str = "sfdx-project.json";

/// Locate project root by walking upward from a starting directory.
///
/// The project root is the first directory that contains a [`PROJECT_FILE`].
/// Returns `None` if no such directory exists between `start` and the root
/// of the file system.
pub fn find_project_root(start: impl AsRef<Path>) -> Option<PathBuf> {
    start
        .as_ref()
        .ancestors()
        .find(|dir| dir.join(PROJECT_FILE).is_file())
        .map(Path::to_path_buf)
}

/// Perform shell expansion on user supplied path.
///
/// Expands `~` and environment variables. Does not check if the path returned
/// actually exists.
///
/// # Errors
///
/// - Return [`ExpandError`] if a referenced environment variable is not set.
pub fn expand_path(raw: impl AsRef<str>) -> Result<PathBuf> {
    let raw = raw.as_ref();
    shellexpand::full(raw)
        .map(|expanded| PathBuf::from(expanded.into_owned()))
        .map_err(|source| ExpandError {
            raw: raw.to_string(),
            source,
        })
}

/// Shell expansion of user supplied path failed.
#[derive(Debug, thiserror::Error)]
#[error("cannot expand path {raw:?}")]
pub struct ExpandError {
    raw: String,

    #[source]
    source: shellexpand::LookupError<std::env::VarError>,
}

/// Friendly result alias :3
pub type Result<T, E = ExpandError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;

    #[sealed_test(env = [("MANIFESTS", "/work/manifests")])]
    fn expand_path_substitutes_variables() -> anyhow::Result<()> {
        let result = expand_path("$MANIFESTS/package.xml")?;
        assert_eq!(result, PathBuf::from("/work/manifests/package.xml"));
        Ok(())
    }

    #[sealed_test]
    fn expand_path_rejects_unset_variables() {
        std::env::remove_var("APEX_TESTDEPS_UNSET");
        assert!(expand_path("$APEX_TESTDEPS_UNSET/package.xml").is_err());
    }

    #[sealed_test]
    fn find_project_root_walks_upward() -> anyhow::Result<()> {
        let root = std::env::current_dir()?;
        std::fs::create_dir_all(root.join("force-app/main/default"))?;
        std::fs::write(root.join(PROJECT_FILE), "{}")?;

        let result = find_project_root(root.join("force-app/main/default"));
        assert_eq!(result, Some(root));
        Ok(())
    }
}
