use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{read_to_string, Error, Result};
use crate::module::{Module, NpmOptions};
use crate::pkg::{Package, PackageId, PackageType};

use super::exact_version;

/// Analyzer for npm projects.
///
/// Direct dependencies come from `package.json`; locked versions and the
/// edges between packages come from a v2/v3 `package-lock.json`. Package
/// names may contain `/` (`@scope/name`), so the lock is keyed by install
/// path (`node_modules/@scope/name`) instead of a split `name/version` key.
pub struct NodeAnalyzer {
    options: NpmOptions,
}

impl NodeAnalyzer {
    pub fn new(options: NpmOptions) -> Self {
        Self { options }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackageJson {
    #[serde(default)]
    name: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
    #[serde(default)]
    dev_dependencies: BTreeMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
struct PackageLock {
    #[serde(default)]
    packages: BTreeMap<String, LockEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LockEntry {
    #[serde(default)]
    version: String,
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
    #[serde(default)]
    optional_dependencies: BTreeMap<String, String>,
}

impl super::Analyzer for NodeAnalyzer {
    fn is_built(&self, module: &Module) -> Result<bool> {
        Ok(module.dir.join("package-lock.json").exists())
    }

    fn analyze(&self, module: &Module) -> Result<Module> {
        let manifest_path = module.dir.join("package.json");
        let manifest: PackageJson = read_json(&manifest_path, false)?;

        let lock_path = module.dir.join("package-lock.json");
        let lock: PackageLock = if lock_path.exists() {
            read_json(&lock_path, true)?
        } else {
            PackageLock::default()
        };

        let mut declared: Vec<(&String, &String)> = manifest.dependencies.iter().collect();
        if self.options.include_dev {
            declared.extend(manifest.dev_dependencies.iter());
        }

        let mut graph = Graph {
            lock: &lock,
            deps: BTreeMap::new(),
        };
        let imports = declared
            .into_iter()
            .map(|(name, range)| graph.import("", name, range))
            .collect();

        let name = if manifest.name.is_empty() {
            module.name.clone()
        } else {
            manifest.name.clone()
        };

        let mut analyzed = module.clone();
        analyzed.id = PackageId::new(PackageType::Npm, name, manifest.version.clone());
        analyzed.imports = imports;
        analyzed.deps = graph.deps;
        Ok(analyzed)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, lockfile: bool) -> Result<T> {
    let content = read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| {
        let path = path.to_path_buf();
        let details = e.to_string();
        if lockfile {
            Error::LockfileParse { path, details }
        } else {
            Error::ManifestParse { path, details }
        }
    })
}

struct Graph<'a> {
    lock: &'a PackageLock,
    deps: BTreeMap<PackageId, Package>,
}

impl<'a> Graph<'a> {
    /// Resolve `name` as required by the package installed at `from` and
    /// record it (and everything it pulls in) as a dependency fact.
    fn import(&mut self, from: &str, name: &str, range: &str) -> PackageId {
        let Some((path, entry)) = self.locate(from, name) else {
            let id = PackageId::new(PackageType::Npm, name, exact_version(range));
            self.deps.entry(id.clone()).or_insert_with(|| Package {
                id: id.clone(),
                imports: Vec::new(),
            });
            return id;
        };

        let id = PackageId::new(PackageType::Npm, name, entry.version.clone());
        if self.deps.contains_key(&id) {
            return id;
        }
        self.deps.insert(
            id.clone(),
            Package {
                id: id.clone(),
                imports: Vec::new(),
            },
        );

        let imports = entry
            .dependencies
            .iter()
            .chain(entry.optional_dependencies.iter())
            .map(|(dep, range)| self.import(&path, dep, range))
            .collect();
        self.deps.insert(id.clone(), Package { id: id.clone(), imports });
        id
    }

    /// Node's lookup: `<from>/node_modules/<name>`, then each ancestor
    /// install directory up to the project root.
    fn locate(&self, from: &str, name: &str) -> Option<(String, &'a LockEntry)> {
        let mut base = from.to_string();
        loop {
            let candidate = if base.is_empty() {
                format!("node_modules/{name}")
            } else {
                format!("{base}/node_modules/{name}")
            };
            if let Some(entry) = self.lock.packages.get(&candidate) {
                return Some((candidate, entry));
            }
            if base.is_empty() {
                return None;
            }
            base = parent_install_path(&base).to_string();
        }
    }
}

/// `node_modules/a/node_modules/@s/b` -> `node_modules/a`; `node_modules/a` -> ``.
fn parent_install_path(path: &str) -> &str {
    match path.rfind("node_modules/") {
        Some(idx) => path[..idx].trim_end_matches('/'),
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Analyzer;
    use crate::module::ModuleOptions;

    const PACKAGE_JSON: &str = r#"{
  "name": "my-app",
  "version": "1.0.0",
  "dependencies": {
    "express": "4.18.2",
    "@scope/util": "~2.0.0",
    "unlocked": "^3.1.0"
  },
  "devDependencies": {
    "jest": "^29.0.0"
  }
}"#;

    const PACKAGE_LOCK: &str = r#"{
  "name": "my-app",
  "lockfileVersion": 3,
  "packages": {
    "": { "name": "my-app", "version": "1.0.0" },
    "node_modules/express": {
      "version": "4.18.2",
      "dependencies": { "debug": "2.6.9", "@scope/util": "^2.0.0" }
    },
    "node_modules/express/node_modules/debug": { "version": "2.6.9" },
    "node_modules/debug": { "version": "4.3.4" },
    "node_modules/@scope/util": { "version": "2.0.1" },
    "node_modules/jest": { "version": "29.7.0" }
  }
}"#;

    fn setup(lock: bool) -> (tempfile::TempDir, Module) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("package.json"), PACKAGE_JSON).unwrap();
        if lock {
            std::fs::write(dir.path().join("package-lock.json"), PACKAGE_LOCK).unwrap();
        }
        let m = Module::new(
            "web",
            PackageType::Npm,
            "package.json",
            dir.path(),
            ModuleOptions::None,
        );
        (dir, m)
    }

    #[test]
    fn test_lock_resolves_nested_and_scoped_packages() {
        let (_dir, m) = setup(true);
        let analyzer = NodeAnalyzer::new(NpmOptions::default());
        assert!(analyzer.is_built(&m).unwrap());
        let analyzed = analyzer.analyze(&m).unwrap();

        assert_eq!(analyzed.id, PackageId::new(PackageType::Npm, "my-app", "1.0.0"));
        let scoped = PackageId::new(PackageType::Npm, "@scope/util", "2.0.1");
        let express = PackageId::new(PackageType::Npm, "express", "4.18.2");
        // A range that the lock does not cover pins nothing.
        let unlocked = PackageId::new(PackageType::Npm, "unlocked", "");
        assert_eq!(analyzed.imports, vec![scoped.clone(), express.clone(), unlocked]);

        // express gets its own nested debug, not the hoisted one.
        let nested_debug = PackageId::new(PackageType::Npm, "debug", "2.6.9");
        assert_eq!(analyzed.deps[&express].imports, vec![scoped, nested_debug]);
        assert!(!analyzed
            .deps
            .contains_key(&PackageId::new(PackageType::Npm, "debug", "4.3.4")));
    }

    #[test]
    fn test_dev_dependencies_opt_in() {
        let (_dir, m) = setup(true);
        let analyzed = NodeAnalyzer::new(NpmOptions { include_dev: true })
            .analyze(&m)
            .unwrap();
        assert!(analyzed
            .imports
            .contains(&PackageId::new(PackageType::Npm, "jest", "29.7.0")));
    }

    #[test]
    fn test_manifest_only_keeps_exact_versions() {
        let (_dir, m) = setup(false);
        let analyzer = NodeAnalyzer::new(NpmOptions::default());
        assert!(!analyzer.is_built(&m).unwrap());
        let analyzed = analyzer.analyze(&m).unwrap();
        let revisions: Vec<&str> = analyzed.imports.iter().map(|i| i.revision.as_str()).collect();
        assert_eq!(revisions, vec!["", "4.18.2", ""]);
    }

    #[test]
    fn test_missing_package_json_fails() {
        let dir = tempfile::tempdir().unwrap();
        let m = Module::new("x", PackageType::Npm, ".", dir.path(), ModuleOptions::None);
        let err = NodeAnalyzer::new(NpmOptions::default()).analyze(&m).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_parent_install_path() {
        assert_eq!(parent_install_path("node_modules/a"), "");
        assert_eq!(parent_install_path("node_modules/a/node_modules/@s/b"), "node_modules/a");
    }
}
