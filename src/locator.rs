//! Canonical package identity: locators and import paths.
//!
//! A locator encodes as `fetcher+project$revision`. For `git` locators the
//! project is a normalized source-control URL so that SSH, HTTPS and
//! `.git`-suffixed remotes of one repository compare equal.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::pkg::PackageId;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Locator {
    fetcher: String,
    project: String,
    revision: String,
}

impl Locator {
    pub fn new(
        fetcher: impl Into<String>,
        project: impl Into<String>,
        revision: impl Into<String>,
    ) -> Self {
        Self {
            fetcher: fetcher.into(),
            project: project.into(),
            revision: revision.into(),
        }
    }

    pub fn fetcher(&self) -> &str {
        &self.fetcher
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn revision(&self) -> &str {
        &self.revision
    }

    pub fn is_resolved(&self) -> bool {
        !self.revision.is_empty()
    }

    /// The same locator with a `git` project normalized. Used as the
    /// comparison key when deduplicating.
    pub fn canonical(&self) -> Locator {
        if self.fetcher != "git" {
            return self.clone();
        }
        Locator {
            fetcher: self.fetcher.clone(),
            project: normalize_git_url(&self.project),
            revision: self.revision.clone(),
        }
    }

    /// Encoding for lookups against the dependency service, which addresses
    /// Go modules through their source repositories.
    pub fn query_string(&self) -> String {
        if self.fetcher == "go" {
            return Locator {
                fetcher: "git".to_string(),
                project: self.project.clone(),
                revision: self.revision.clone(),
            }
            .to_string();
        }
        self.to_string()
    }
}

/// Normalize a git remote to `host/owner/repo`.
pub fn normalize_git_url(project: &str) -> String {
    // A project may still carry the fetcher prefix if it was cut out of a
    // locator string by hand.
    let project = project.strip_prefix("git+").unwrap_or(project);
    let project = project.strip_suffix(".git").unwrap_or(project);
    let project = project.replacen("git@github.com:", "github.com/", 1);
    let project = project.strip_prefix("http://").unwrap_or(&project);
    let project = project.strip_prefix("https://").unwrap_or(project);
    project.to_string()
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.fetcher == "git" {
            write!(f, "git+{}${}", normalize_git_url(&self.project), self.revision)
        } else {
            write!(f, "{}+{}${}", self.fetcher, self.project, self.revision)
        }
    }
}

impl FromStr for Locator {
    type Err = Error;

    /// Split on the first `+`, then split the remainder on the first `$`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || Error::MalformedLocator {
            input: s.to_string(),
        };
        let (fetcher, rest) = s.split_once('+').ok_or_else(malformed)?;
        if fetcher.contains('$') {
            return Err(malformed());
        }
        let (project, revision) = rest.split_once('$').ok_or_else(malformed)?;
        Ok(Locator::new(fetcher, project, revision))
    }
}

impl From<&PackageId> for Locator {
    fn from(id: &PackageId) -> Self {
        Locator::new(id.kind.fetcher(), id.name.clone(), id.revision.clone())
    }
}

impl Serialize for Locator {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Locator {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Route from a module root to one of its dependencies, root first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImportPath(Vec<Locator>);

impl ImportPath {
    /// Returns `None` for an empty chain.
    pub fn new(locators: Vec<Locator>) -> Option<Self> {
        if locators.is_empty() {
            None
        } else {
            Some(Self(locators))
        }
    }

    pub fn locators(&self) -> &[Locator] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; an import path has at least its root.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn root(&self) -> &Locator {
        &self.0[0]
    }

    pub fn terminal(&self) -> &Locator {
        &self.0[self.0.len() - 1]
    }
}

impl std::fmt::Display for ImportPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, locator) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", locator)?;
        }
        Ok(())
    }
}

impl FromStr for ImportPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let locators = s
            .split(' ')
            .map(str::parse)
            .collect::<Result<Vec<Locator>, _>>()?;
        ImportPath::new(locators).ok_or_else(|| Error::MalformedLocator {
            input: s.to_string(),
        })
    }
}

impl Serialize for ImportPath {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ImportPath {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pkg::PackageType;

    #[test]
    fn test_encode_plain_locator() {
        let loc = Locator::new("npm", "lodash", "4.17.21");
        assert_eq!(loc.to_string(), "npm+lodash$4.17.21");
    }

    #[test]
    fn test_decode_reverses_encode() {
        for loc in [
            Locator::new("npm", "@babel/core", "7.22.0"),
            Locator::new("mvn", "org.apache.commons:commons-lang3", "3.12.0"),
            Locator::new("nuget", "Newtonsoft.Json", ""),
            Locator::new("custom", "github.com/acme/app", "abc123"),
        ] {
            assert_eq!(loc.to_string().parse::<Locator>().unwrap(), loc);
        }
    }

    #[test]
    fn test_normalize_git_url() {
        assert_eq!(normalize_git_url("git@github.com:foo/bar.git"), "github.com/foo/bar");
        assert_eq!(normalize_git_url("https://github.com/foo/bar.git"), "github.com/foo/bar");
        assert_eq!(normalize_git_url("http://gitlab.com/foo/bar"), "gitlab.com/foo/bar");
        assert_eq!(normalize_git_url("git+github.com/foo/bar"), "github.com/foo/bar");
    }

    #[test]
    fn test_normalize_git_url_is_idempotent() {
        for url in [
            "git@github.com:foo/bar.git",
            "https://github.com/foo/bar.git",
            "git+https://example.com/x/y.git",
            "github.com/foo/bar",
        ] {
            let once = normalize_git_url(url);
            assert_eq!(normalize_git_url(&once), once);
        }
    }

    #[test]
    fn test_git_locator_decodes_to_normalized_project() {
        let loc = Locator::new("git", "git@github.com:foo/bar.git", "deadbeef");
        assert_eq!(loc.to_string(), "git+github.com/foo/bar$deadbeef");
        let decoded: Locator = loc.to_string().parse().unwrap();
        assert_eq!(decoded.project(), normalize_git_url(loc.project()));
        assert_eq!(decoded, loc.canonical());
    }

    #[test]
    fn test_decode_splits_on_first_separators() {
        let loc: Locator = "mvn+a+b$1.0$beta".parse().unwrap();
        assert_eq!(loc.fetcher(), "mvn");
        assert_eq!(loc.project(), "a+b");
        assert_eq!(loc.revision(), "1.0$beta");
    }

    #[test]
    fn test_decode_rejects_missing_separators() {
        for bad in ["", "npm", "npm+lodash", "npm$lodash", "npm$1+lodash"] {
            let err = bad.parse::<Locator>().unwrap_err();
            assert!(matches!(err, Error::MalformedLocator { .. }), "{bad:?}");
        }
    }

    #[test]
    fn test_is_resolved() {
        assert!(Locator::new("npm", "a", "1").is_resolved());
        assert!(!Locator::new("npm", "a", "").is_resolved());
        assert!(!"npm+a$".parse::<Locator>().unwrap().is_resolved());
    }

    #[test]
    fn test_query_string_rewrites_go() {
        let loc = Locator::new("go", "github.com/pkg/errors", "v0.9.1");
        assert_eq!(loc.to_string(), "go+github.com/pkg/errors$v0.9.1");
        assert_eq!(loc.query_string(), "git+github.com/pkg/errors$v0.9.1");
        let npm = Locator::new("npm", "left-pad", "1.3.0");
        assert_eq!(npm.query_string(), npm.to_string());
    }

    #[test]
    fn test_locator_of_package_id_uses_fetcher() {
        let id = PackageId::new(PackageType::Gradle, "com.google.guava:guava", "31.1-jre");
        let loc = Locator::from(&id);
        assert_eq!(loc.to_string(), "mvn+com.google.guava:guava$31.1-jre");
    }

    #[test]
    fn test_import_path_round_trip() {
        let path = ImportPath::new(vec![
            Locator::new("nuget", "App", "1.0.0"),
            Locator::new("nuget", "Serilog", "2.12.0"),
            Locator::new("nuget", "System.Memory", ""),
        ])
        .unwrap();
        let encoded = path.to_string();
        assert_eq!(
            encoded,
            "nuget+App$1.0.0 nuget+Serilog$2.12.0 nuget+System.Memory$"
        );
        assert_eq!(encoded.parse::<ImportPath>().unwrap(), path);
        assert_eq!(path.len(), 3);
        assert_eq!(path.root().project(), "App");
        assert_eq!(path.terminal().project(), "System.Memory");
    }

    #[test]
    fn test_import_path_rejects_empty_and_bad_elements() {
        assert!(ImportPath::new(Vec::new()).is_none());
        assert!("".parse::<ImportPath>().is_err());
        assert!("npm+a$1 bogus".parse::<ImportPath>().is_err());
    }

    #[test]
    fn test_serde_uses_string_encoding() {
        let loc = Locator::new("cargo", "serde", "1.0.150");
        let json = serde_json::to_string(&loc).unwrap();
        assert_eq!(json, "\"cargo+serde$1.0.150\"");
        let back: Locator = serde_json::from_str(&json).unwrap();
        assert_eq!(back, loc);
    }
}
