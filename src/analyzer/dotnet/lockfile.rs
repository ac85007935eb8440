use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Deserialize;

use crate::error::{read_to_string, Error, Result};

static NO_IMPORTS: BTreeMap<String, String> = BTreeMap::new();

/// NuGet restore output (`obj/project.assets.json`).
///
/// The per-target dependency map is flattened into a lookup by package name
/// when the lockfile is built and never changes afterwards. Package IDs are
/// case-insensitive, so lookups are too.
#[derive(Debug, Default)]
pub struct Lockfile {
    resolved: HashMap<String, Resolved>,
}

#[derive(Debug)]
struct Resolved {
    /// Spelling used by the lock key.
    name: String,
    version: String,
    imports: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct AssetsFile {
    #[serde(default)]
    targets: BTreeMap<String, BTreeMap<String, Target>>,
}

/// One `"<name>/<version>"` entry of a restore target.
#[derive(Debug, Default, Deserialize)]
pub struct Target {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
}

impl Lockfile {
    pub fn read(path: &Path) -> Result<Self> {
        let content = read_to_string(path)?;
        let assets: AssetsFile =
            serde_json::from_str(&content).map_err(|e| Error::LockfileParse {
                path: path.to_path_buf(),
                details: e.to_string(),
            })?;
        Ok(Self::from_targets(assets.targets))
    }

    /// Flatten `target -> "<name>/<version>" -> entry` into a by-name lookup.
    ///
    /// Keys are split on the first `/`, which assumes NuGet IDs never contain
    /// one. A key without `/` is kept as an unresolved name. When several
    /// targets lock the same package, the last target in sorted order wins.
    pub fn from_targets(targets: BTreeMap<String, BTreeMap<String, Target>>) -> Self {
        let mut resolved = HashMap::new();
        for deps in targets.into_values() {
            for (key, target) in deps {
                let (name, version) = key.split_once('/').unwrap_or((key.as_str(), ""));
                resolved.insert(
                    name.to_lowercase(),
                    Resolved {
                        name: name.to_string(),
                        version: version.to_string(),
                        imports: target.dependencies,
                    },
                );
            }
        }
        Self { resolved }
    }

    /// Locked version of `name`, or `""` if it was never locked.
    pub fn resolve(&self, name: &str) -> &str {
        self.resolved
            .get(&name.to_lowercase())
            .map(|r| r.version.as_str())
            .unwrap_or("")
    }

    /// The locked package's own spelling of `name`, if it is locked.
    pub fn name(&self, name: &str) -> Option<&str> {
        self.resolved
            .get(&name.to_lowercase())
            .map(|r| r.name.as_str())
    }

    /// Direct imports (`name -> version`) of the locked package `name`.
    pub fn imports(&self, name: &str) -> &BTreeMap<String, String> {
        self.resolved
            .get(&name.to_lowercase())
            .map(|r| &r.imports)
            .unwrap_or(&NO_IMPORTS)
    }

    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn target(deps: &[(&str, &str)]) -> Target {
        Target {
            kind: "package".to_string(),
            dependencies: deps
                .iter()
                .map(|(n, v)| (n.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_flatten_resolves_by_name() {
        let mut t = BTreeMap::new();
        t.insert("pkg/1.2.3".to_string(), target(&[("dep", "4.5.6")]));
        let mut targets = BTreeMap::new();
        targets.insert("T".to_string(), t);

        let lock = Lockfile::from_targets(targets);
        assert_eq!(lock.resolve("pkg"), "1.2.3");
        let imports = lock.imports("pkg");
        assert_eq!(imports.len(), 1);
        assert_eq!(imports["dep"], "4.5.6");
        assert_eq!(lock.resolve("missing"), "");
        assert!(lock.imports("missing").is_empty());
    }

    #[test]
    fn test_key_without_version_is_unresolved() {
        let mut t = BTreeMap::new();
        t.insert("Orphan".to_string(), target(&[]));
        let mut targets = BTreeMap::new();
        targets.insert("net6.0".to_string(), t);

        let lock = Lockfile::from_targets(targets);
        assert_eq!(lock.len(), 1);
        assert_eq!(lock.resolve("Orphan"), "");
    }

    #[test]
    fn test_lookup_ignores_case() {
        let mut t = BTreeMap::new();
        t.insert("Newtonsoft.Json/13.0.1".to_string(), target(&[]));
        let mut targets = BTreeMap::new();
        targets.insert("net6.0".to_string(), t);

        let lock = Lockfile::from_targets(targets);
        assert_eq!(lock.resolve("newtonsoft.json"), "13.0.1");
        assert_eq!(lock.name("NEWTONSOFT.JSON"), Some("Newtonsoft.Json"));
        assert_eq!(lock.name("Serilog"), None);
    }

    #[test]
    fn test_read_assets_file() {
        let json = r#"{
  "version": 3,
  "targets": {
    "net6.0": {
      "Serilog/2.12.0": {
        "type": "package",
        "dependencies": { "System.Memory": "4.5.4" }
      },
      "System.Memory/4.5.4": { "type": "package" },
      "Acme.Core/1.0.0": { "type": "project" }
    }
  },
  "libraries": {}
}"#;
        let mut f = NamedTempFile::new().unwrap();
        write!(f, "{}", json).unwrap();
        let lock = Lockfile::read(f.path()).unwrap();
        assert_eq!(lock.len(), 3);
        assert_eq!(lock.resolve("Serilog"), "2.12.0");
        assert_eq!(lock.imports("Serilog")["System.Memory"], "4.5.4");
        assert_eq!(lock.resolve("Acme.Core"), "1.0.0");
    }

    #[test]
    fn test_read_rejects_invalid_json() {
        let mut f = NamedTempFile::new().unwrap();
        write!(f, "{{ not json").unwrap();
        let err = Lockfile::read(f.path()).unwrap_err();
        assert!(matches!(err, Error::LockfileParse { .. }));
    }
}
