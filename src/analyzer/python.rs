use std::collections::{BTreeMap, HashSet};

use regex::Regex;
use serde::Deserialize;

use crate::error::{read_to_string, Error, Result};
use crate::module::{Module, PipOptions};
use crate::pkg::{Package, PackageId, PackageType};

/// Analyzer for Python projects.
///
/// `Pipfile.lock` (pinned) is preferred; `requirements.txt` fills in any
/// package the lock does not mention. Neither format records which package
/// pulled in which, so every entry is a direct import. Names are compared
/// case-insensitively.
pub struct PythonAnalyzer {
    options: PipOptions,
}

impl PythonAnalyzer {
    pub fn new(options: PipOptions) -> Self {
        Self { options }
    }
}

#[derive(Debug, Default, Deserialize)]
struct PipfileLock {
    #[serde(default)]
    default: BTreeMap<String, PipfileEntry>,
    #[serde(default)]
    develop: BTreeMap<String, PipfileEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct PipfileEntry {
    #[serde(default)]
    version: Option<String>,
}

impl super::Analyzer for PythonAnalyzer {
    fn is_built(&self, module: &Module) -> Result<bool> {
        Ok(module.dir.join("Pipfile.lock").exists())
    }

    fn analyze(&self, module: &Module) -> Result<Module> {
        let mut declared: Vec<(String, String)> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut found_any = false;

        let pipfile_lock = module.dir.join("Pipfile.lock");
        if pipfile_lock.exists() {
            found_any = true;
            let content = read_to_string(&pipfile_lock)?;
            let lock: PipfileLock =
                serde_json::from_str(&content).map_err(|e| Error::LockfileParse {
                    path: pipfile_lock.clone(),
                    details: e.to_string(),
                })?;
            for (name, entry) in lock.default.into_iter().chain(lock.develop) {
                let version = entry
                    .version
                    .as_deref()
                    .unwrap_or("")
                    .trim_start_matches("==")
                    .to_string();
                if seen.insert(name.to_lowercase()) {
                    declared.push((name, version));
                }
            }
        }

        let requirements = match &self.options.requirements {
            Some(path) => module.dir.join(path),
            None => module.dir.join("requirements.txt"),
        };
        if requirements.exists() {
            found_any = true;
            let parsed = parse_requirements_txt(&read_to_string(&requirements)?).map_err(|e| {
                Error::ManifestParse {
                    path: requirements.clone(),
                    details: e.to_string(),
                }
            })?;
            for (name, version) in parsed {
                if seen.insert(name.to_lowercase()) {
                    declared.push((name, version));
                }
            }
        }

        if !found_any {
            return Err(Error::ManifestParse {
                path: module.dir.clone(),
                details: "no Pipfile.lock or requirements file found".to_string(),
            });
        }

        let mut analyzed = module.clone();
        analyzed.id = PackageId::new(PackageType::Pip, module.name.clone(), "");
        analyzed.deps = BTreeMap::new();
        analyzed.imports = Vec::new();
        for (name, version) in declared {
            let id = PackageId::new(PackageType::Pip, name, version);
            analyzed.deps.insert(
                id.clone(),
                Package {
                    id: id.clone(),
                    imports: Vec::new(),
                },
            );
            analyzed.imports.push(id);
        }
        Ok(analyzed)
    }
}

/// Parse `requirements.txt`. `name==version` pins a version; any other
/// specifier leaves the requirement unresolved.
fn parse_requirements_txt(content: &str) -> std::result::Result<Vec<(String, String)>, regex::Error> {
    let re = Regex::new(r"^([A-Za-z0-9_\-\.]+)(?:\[[^\]]*\])?\s*(==\s*([^\s;,]+))?")?;
    let mut deps = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('-') {
            continue;
        }
        if let Some(caps) = re.captures(line) {
            let name = caps[1].to_string();
            let version = caps.get(3).map(|m| m.as_str().to_string()).unwrap_or_default();
            deps.push((name, version));
        }
    }

    Ok(deps)
}
