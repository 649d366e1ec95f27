// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Change manifest handling.
//!
//! A __manifest__ lists changed metadata components grouped by metadata type.
//! Two manifests take part in every run: the deploy manifest naming components
//! that are created or updated, and the destructive manifest naming components
//! that are deleted. Both share the platform's `package.xml` layout:
//!
//! ```xml
//! <Package xmlns="http://soap.sforce.com/2006/04/metadata">
//!     <types>
//!         <members>AccountService</members>
//!         <members>Account.Rating__c</members>
//!         <name>ApexClass</name>
//!     </types>
//!     <version>62.0</version>
//! </Package>
//! ```

use serde::Deserialize;
use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter, Result as FmtResult},
    fs::read_to_string,
    path::{Path, PathBuf},
    str::FromStr,
};

/// Member name that stands for every component of a metadata type.
pub const WILDCARD_MEMBER: &str = "*";

/// Parsed change manifest.
///
/// # Invariant
///
/// - Metadata types iterate in lexical order.
/// - Members of a metadata type keep manifest order, duplicates removed.
#[derive(Default, Debug, PartialEq, Eq, Clone)]
pub struct Manifest {
    types: BTreeMap<String, Vec<String>>,
}

impl Manifest {
    /// Construct new empty manifest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load manifest from file.
    ///
    /// # Errors
    ///
    /// - Return [`ManifestError::Read`] if manifest cannot be read.
    /// - Return [`ManifestError::Parse`] if manifest is malformed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = read_to_string(path).map_err(|err| ManifestError::Read {
            source: err,
            path: path.to_path_buf(),
        })?;

        parse_package_xml(&content).map_err(|err| ManifestError::Parse {
            source: err,
            origin: format!("{:?}", path.display()),
        })
    }

    /// Add member of metadata type.
    pub fn insert(&mut self, type_name: impl Into<String>, member: impl Into<String>) {
        let member = member.into();
        let members = self.types.entry(type_name.into()).or_default();
        if !members.contains(&member) {
            members.push(member);
        }
    }

    /// List members of metadata type.
    ///
    /// Unknown metadata types simply have no members.
    pub fn members(&self, type_name: impl AsRef<str>) -> &[String] {
        self.types
            .get(type_name.as_ref())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Flatten manifest into individual changes of given kind.
    pub fn changes(&self, kind: ChangeKind) -> Vec<MetadataChange> {
        self.types
            .iter()
            .flat_map(|(type_name, members)| {
                members.iter().map(move |member| MetadataChange {
                    metadata_type: type_name.clone(),
                    member_name: member.clone(),
                    change_kind: kind,
                })
            })
            .collect()
    }

    /// Manifest names no member at all.
    pub fn is_empty(&self) -> bool {
        self.types.values().all(Vec::is_empty)
    }
}

impl FromStr for Manifest {
    type Err = ManifestError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        parse_package_xml(data).map_err(|err| ManifestError::Parse {
            source: err,
            origin: "inline listing".into(),
        })
    }
}

impl<T, M> FromIterator<(T, M)> for Manifest
where
    T: Into<String>,
    M: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (T, M)>>(iter: I) -> Self {
        let mut manifest = Self::new();
        for (type_name, member) in iter {
            manifest.insert(type_name, member);
        }
        manifest
    }
}

fn parse_package_xml(data: &str) -> Result<Manifest, quick_xml::DeError> {
    let package: PackageXml = quick_xml::de::from_str(data)?;
    let mut manifest = Manifest::new();
    for entry in package.types {
        // INVARIANT: A listed type always exists in the manifest, even if empty.
        manifest.types.entry(entry.name.trim().to_string()).or_default();
        for member in entry.members {
            manifest.insert(entry.name.trim(), member.trim());
        }
    }

    Ok(manifest)
}

#[derive(Debug, Deserialize)]
struct PackageXml {
    #[serde(default)]
    types: Vec<PackageTypes>,
}

#[derive(Debug, Deserialize)]
struct PackageTypes {
    #[serde(default)]
    members: Vec<String>,

    name: String,
}

/// Kind of change a manifest describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// Component is created or updated.
    Deploy,

    /// Component is deleted.
    Destroy,
}

impl Display for ChangeKind {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Deploy => fmt.write_str("deploy"),
            Self::Destroy => fmt.write_str("destroy"),
        }
    }
}

/// Single changed metadata component.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetadataChange {
    /// Metadata type name, e.g., `ApexClass`.
    pub metadata_type: String,

    /// Component name, e.g., `AccountService`.
    pub member_name: String,

    /// Whether the component is deployed or destroyed.
    pub change_kind: ChangeKind,
}

/// Manifest error types.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// Manifest file cannot be read from.
    #[error("failed to read manifest at {:?}", .path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Manifest content is not a valid package listing.
    #[error("failed to parse manifest from {origin}")]
    Parse {
        #[source]
        source: quick_xml::DeError,
        origin: String,
    },
}

/// Friendly result alias :3
pub type Result<T, E = ManifestError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_package_listing() -> anyhow::Result<()> {
        let result: Manifest = indoc! {r#"
            <?xml version="1.0" encoding="UTF-8"?>
            <Package xmlns="http://soap.sforce.com/2006/04/metadata">
                <types>
                    <members>AccountService</members>
                    <members>AccountServiceTest</members>
                    <name>ApexClass</name>
                </types>
                <types>
                    <members>Account.Rating__c</members>
                    <name>CustomField</name>
                </types>
                <version>62.0</version>
            </Package>
        "#}
        .parse()?;

        let expect = Manifest::from_iter([
            ("ApexClass", "AccountService"),
            ("ApexClass", "AccountServiceTest"),
            ("CustomField", "Account.Rating__c"),
        ]);
        assert_eq!(result, expect);
        assert_eq!(result.members("CustomField"), ["Account.Rating__c"]);
        assert!(result.members("Layout").is_empty());

        Ok(())
    }

    #[test]
    fn parse_empty_package() -> anyhow::Result<()> {
        let result: Manifest = indoc! {r#"
            <?xml version="1.0" encoding="UTF-8"?>
            <Package xmlns="http://soap.sforce.com/2006/04/metadata">
                <version>62.0</version>
            </Package>
        "#}
        .parse()?;

        assert!(result.is_empty());
        Ok(())
    }

    #[test]
    fn type_without_members_is_empty() -> anyhow::Result<()> {
        let result: Manifest = indoc! {r#"
            <Package>
                <types>
                    <name>ApexTrigger</name>
                </types>
            </Package>
        "#}
        .parse()?;

        assert!(result.members("ApexTrigger").is_empty());
        assert!(result.is_empty());
        Ok(())
    }

    #[test]
    fn malformed_package_is_rejected() {
        let result = "<Package><types><members>Foo</types>".parse::<Manifest>();
        assert!(matches!(result, Err(ManifestError::Parse { .. })));
    }

    #[test]
    fn missing_manifest_file_is_rejected() {
        let result = Manifest::load("/nonexistent/apex-testdeps/package.xml");
        assert!(matches!(result, Err(ManifestError::Read { .. })));
    }

    #[test]
    fn flatten_into_changes() {
        let manifest = Manifest::from_iter([("ApexClass", "Foo"), ("ApexClass", "Foo")]);
        let result = manifest.changes(ChangeKind::Destroy);
        let expect = vec![MetadataChange {
            metadata_type: "ApexClass".into(),
            member_name: "Foo".into(),
            change_kind: ChangeKind::Destroy,
        }];
        assert_eq!(result, expect);
    }
}
