//! Ecosystem kinds and package identifiers.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A package-manager or build-tool family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PackageType {
    Ant,
    Bower,
    Cargo,
    Cocoapods,
    Composer,
    Git,
    Go,
    Gradle,
    Maven,
    Npm,
    NuGet,
    Pip,
    Ruby,
    Sbt,
    Custom,
}

impl PackageType {
    /// Fetcher tag used in locators for packages of this kind.
    ///
    /// Kinds that resolve through the same registry share a tag; every other
    /// kind uses its own canonical name.
    pub fn fetcher(&self) -> String {
        match self {
            PackageType::Gradle | PackageType::Ant => "mvn".to_string(),
            _ => self.to_string(),
        }
    }
}

impl std::fmt::Display for PackageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PackageType::Ant => write!(f, "ant"),
            PackageType::Bower => write!(f, "bower"),
            PackageType::Cargo => write!(f, "cargo"),
            PackageType::Cocoapods => write!(f, "pod"),
            PackageType::Composer => write!(f, "comp"),
            PackageType::Git => write!(f, "git"),
            PackageType::Go => write!(f, "go"),
            PackageType::Gradle => write!(f, "gradle"),
            PackageType::Maven => write!(f, "mvn"),
            PackageType::Npm => write!(f, "npm"),
            PackageType::NuGet => write!(f, "nuget"),
            PackageType::Pip => write!(f, "pip"),
            PackageType::Ruby => write!(f, "gem"),
            PackageType::Sbt => write!(f, "sbt"),
            PackageType::Custom => write!(f, "custom"),
        }
    }
}

impl FromStr for PackageType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s.to_ascii_lowercase().as_str() {
            "ant" => PackageType::Ant,
            "bower" => PackageType::Bower,
            "cargo" | "rust" => PackageType::Cargo,
            "pod" | "cocoapods" => PackageType::Cocoapods,
            "comp" | "composer" | "php" => PackageType::Composer,
            "git" => PackageType::Git,
            "go" | "golang" => PackageType::Go,
            "gradle" => PackageType::Gradle,
            "mvn" | "maven" => PackageType::Maven,
            "npm" | "node" | "nodejs" => PackageType::Npm,
            "nuget" | "dotnet" => PackageType::NuGet,
            "pip" | "python" => PackageType::Pip,
            "gem" | "ruby" | "bundler" => PackageType::Ruby,
            "sbt" | "scala" => PackageType::Sbt,
            "custom" => PackageType::Custom,
            _ => {
                return Err(Error::UnknownPackageType {
                    name: s.to_string(),
                })
            }
        };
        Ok(kind)
    }
}

impl Serialize for PackageType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PackageType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Identity of a package within one ecosystem. An empty revision means the
/// package could not be resolved to a concrete version.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PackageId {
    pub kind: PackageType,
    pub name: String,
    pub revision: String,
}

impl PackageId {
    pub fn new(kind: PackageType, name: impl Into<String>, revision: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            revision: revision.into(),
        }
    }
}

/// A dependency fact: one package and the packages it directly imports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub id: PackageId,
    pub imports: Vec<PackageId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jvm_build_tools_share_fetcher() {
        assert_eq!(PackageType::Gradle.fetcher(), PackageType::Ant.fetcher());
        assert_eq!(PackageType::Gradle.fetcher(), PackageType::Maven.fetcher());
    }

    #[test]
    fn test_sbt_keeps_its_own_fetcher() {
        assert_eq!(PackageType::Sbt.fetcher(), "sbt");
        let id = PackageId::new(PackageType::Sbt, "cats-core", "2.9.0");
        assert_eq!(crate::locator::Locator::from(&id).to_string(), "sbt+cats-core$2.9.0");
    }

    #[test]
    fn test_default_fetcher_is_canonical_name() {
        assert_eq!(PackageType::NuGet.fetcher(), "nuget");
        assert_eq!(PackageType::Npm.fetcher(), "npm");
        assert_eq!(PackageType::Go.fetcher(), "go");
        assert_eq!(PackageType::Custom.fetcher(), "custom");
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!("dotnet".parse::<PackageType>().unwrap(), PackageType::NuGet);
        assert_eq!("NuGet".parse::<PackageType>().unwrap(), PackageType::NuGet);
        assert_eq!("maven".parse::<PackageType>().unwrap(), PackageType::Maven);
        assert_eq!("nodejs".parse::<PackageType>().unwrap(), PackageType::Npm);
    }

    #[test]
    fn test_parse_unknown_kind() {
        let err = "haskell".parse::<PackageType>().unwrap_err();
        assert!(matches!(err, Error::UnknownPackageType { name } if name == "haskell"));
    }

    #[test]
    fn test_display_round_trips() {
        for kind in [
            PackageType::Ant,
            PackageType::Cargo,
            PackageType::Cocoapods,
            PackageType::Composer,
            PackageType::Maven,
            PackageType::NuGet,
            PackageType::Ruby,
        ] {
            assert_eq!(kind.to_string().parse::<PackageType>().unwrap(), kind);
        }
    }
}
