use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{read_to_string, Error, Result};
use crate::module::Module;
use crate::pkg::{Package, PackageId, PackageType};

use super::exact_version;

#[derive(Debug, Deserialize)]
struct CargoToml {
    package: Option<CargoTomlPackage>,
    #[serde(default)]
    dependencies: BTreeMap<String, DependencySpec>,
}

#[derive(Debug, Deserialize)]
struct CargoTomlPackage {
    name: String,
    /// Absent or `{ workspace = true }` in workspace members.
    #[serde(default)]
    version: Option<toml::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DependencySpec {
    Version(String),
    Detailed {
        #[serde(default)]
        version: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
struct CargoLock {
    #[serde(default)]
    package: Vec<CargoLockPackage>,
}

#[derive(Debug, Deserialize)]
struct CargoLockPackage {
    name: String,
    version: String,
    /// Packages without a `source` field are local workspace members.
    source: Option<String>,
    /// `"name"`, `"name version"` or `"name version (source)"`.
    #[serde(default)]
    dependencies: Vec<String>,
}

/// Analyzer for Cargo packages: `Cargo.toml` plus `Cargo.lock`.
pub struct RustAnalyzer;

impl RustAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl super::Analyzer for RustAnalyzer {
    fn is_built(&self, module: &Module) -> Result<bool> {
        Ok(module.dir.join("Cargo.lock").exists())
    }

    fn analyze(&self, module: &Module) -> Result<Module> {
        let manifest_path = module.dir.join("Cargo.toml");
        let manifest: CargoToml = read_toml(&manifest_path, false)?;

        let lock_path = module.dir.join("Cargo.lock");
        let lock = if lock_path.exists() {
            Some(read_toml::<CargoLock>(&lock_path, true)?)
        } else {
            None
        };

        let (name, version) = match &manifest.package {
            Some(p) => (
                p.name.clone(),
                p.version
                    .as_ref()
                    .and_then(toml::Value::as_str)
                    .unwrap_or("")
                    .to_string(),
            ),
            None => (module.name.clone(), String::new()),
        };

        let mut analyzed = module.clone();
        match &lock {
            Some(lock) => {
                let graph = LockGraph::new(lock);
                let root = lock
                    .package
                    .iter()
                    .position(|p| p.name == name && p.source.is_none());
                analyzed.imports = match root {
                    Some(idx) => graph.edges(idx),
                    None => manifest
                        .dependencies
                        .keys()
                        .map(|dep| graph.id_by_name(dep))
                        .collect(),
                };
                analyzed.deps = graph.facts(root);
            }
            None => {
                let mut deps = BTreeMap::new();
                let mut imports = Vec::new();
                for (dep, spec) in &manifest.dependencies {
                    let declared = match spec {
                        DependencySpec::Version(v) => v.as_str(),
                        DependencySpec::Detailed { version } => version.as_deref().unwrap_or(""),
                    };
                    let id = PackageId::new(PackageType::Cargo, dep, cargo_version(declared));
                    deps.insert(
                        id.clone(),
                        Package {
                            id: id.clone(),
                            imports: Vec::new(),
                        },
                    );
                    imports.push(id);
                }
                analyzed.imports = imports;
                analyzed.deps = deps;
            }
        }
        analyzed.id = PackageId::new(PackageType::Cargo, name, version);
        Ok(analyzed)
    }
}

fn read_toml<T: serde::de::DeserializeOwned>(path: &Path, lockfile: bool) -> Result<T> {
    let content = read_to_string(path)?;
    toml::from_str(&content).map_err(|e| {
        let path = path.to_path_buf();
        let details = e.message().to_string();
        if lockfile {
            Error::LockfileParse { path, details }
        } else {
            Error::ManifestParse { path, details }
        }
    })
}

/// Lookups over `Cargo.lock` packages.
struct LockGraph<'a> {
    lock: &'a CargoLock,
    by_name: BTreeMap<&'a str, Vec<usize>>,
}

impl<'a> LockGraph<'a> {
    fn new(lock: &'a CargoLock) -> Self {
        let mut by_name: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (idx, p) in lock.package.iter().enumerate() {
            by_name.entry(p.name.as_str()).or_default().push(idx);
        }
        Self { lock, by_name }
    }

    fn id(&self, idx: usize) -> PackageId {
        let p = &self.lock.package[idx];
        PackageId::new(PackageType::Cargo, p.name.clone(), p.version.clone())
    }

    /// Find the package a dependency entry refers to. The version is only
    /// present when several versions of the name are locked.
    fn find(&self, entry: &str) -> Option<usize> {
        let mut parts = entry.split_whitespace();
        let name = parts.next()?;
        let version = parts.next();
        let candidates = self.by_name.get(name)?;
        match version {
            Some(v) => candidates
                .iter()
                .copied()
                .find(|&idx| self.lock.package[idx].version == v),
            None => candidates.first().copied(),
        }
    }

    fn id_by_name(&self, name: &str) -> PackageId {
        match self.find(name) {
            Some(idx) => self.id(idx),
            None => PackageId::new(PackageType::Cargo, name, ""),
        }
    }

    fn edges(&self, idx: usize) -> Vec<PackageId> {
        self.lock.package[idx]
            .dependencies
            .iter()
            .map(|entry| match self.find(entry) {
                Some(dep) => self.id(dep),
                None => {
                    let name = entry.split_whitespace().next().unwrap_or(entry);
                    PackageId::new(PackageType::Cargo, name, "")
                }
            })
            .collect()
    }

    /// One fact per locked package except the root itself.
    fn facts(&self, root: Option<usize>) -> BTreeMap<PackageId, Package> {
        (0..self.lock.package.len())
            .filter(|&idx| Some(idx) != root)
            .map(|idx| {
                let id = self.id(idx);
                let package = Package {
                    id: id.clone(),
                    imports: self.edges(idx),
                };
                (id, package)
            })
            .collect()
    }
}

/// A bare Cargo requirement (`1.0`) is a caret range; only `=1.0.5` pins.
fn cargo_version(declared: &str) -> &str {
    match declared.trim().strip_prefix('=') {
        Some(pinned) => exact_version(pinned),
        None => "",
    }
}
