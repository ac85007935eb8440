use std::collections::BTreeMap;
use std::path::PathBuf;

use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;

use crate::error::{read_to_string, Error, Result};
use crate::module::{GradleOptions, Module};
use crate::pkg::{Package, PackageId, PackageType};

use super::exact_version;

/// Analyzer for Maven projects (`pom.xml`).
///
/// Only declared dependencies are visible without running Maven, so every
/// dependency is a direct import with no further edges. Versions written as
/// `${property}` or as ranges stay unresolved.
pub struct MavenAnalyzer;

impl MavenAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MavenAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl super::Analyzer for MavenAnalyzer {
    fn is_built(&self, module: &Module) -> Result<bool> {
        Ok(module.dir.join("pom.xml").exists())
    }

    fn analyze(&self, module: &Module) -> Result<Module> {
        let pom_path = module.dir.join("pom.xml");
        let pom = parse_pom_xml(&read_to_string(&pom_path)?).map_err(|details| {
            Error::ManifestParse {
                path: pom_path.clone(),
                details,
            }
        })?;

        let name = match coordinate(&pom.group_id, &pom.artifact_id) {
            n if n.is_empty() => module.name.clone(),
            n => n,
        };
        let declared = pom
            .dependencies
            .iter()
            .map(|d| (coordinate(&d.group_id, &d.artifact_id), maven_version(&d.version)));

        let mut analyzed = module.clone();
        analyzed.id = PackageId::new(PackageType::Maven, name, maven_version(&pom.version));
        flat_facts(&mut analyzed, PackageType::Maven, declared);
        Ok(analyzed)
    }
}

/// Analyzer for Gradle projects.
///
/// `gradle.lockfile` pins every resolved configuration dependency; without
/// it the `dependencies { }` declarations in the build script are used.
/// Gradle packages share Maven's registry and emit `mvn` locators.
pub struct GradleAnalyzer {
    options: GradleOptions,
}

impl GradleAnalyzer {
    pub fn new(options: GradleOptions) -> Self {
        Self { options }
    }

    fn lockfile_path(&self, module: &Module) -> PathBuf {
        match &self.options.lockfile {
            Some(path) => module.dir.join(path),
            None => module.dir.join("gradle.lockfile"),
        }
    }
}

impl super::Analyzer for GradleAnalyzer {
    fn is_built(&self, module: &Module) -> Result<bool> {
        Ok(self.lockfile_path(module).exists())
    }

    fn analyze(&self, module: &Module) -> Result<Module> {
        let lock_path = self.lockfile_path(module);
        let declared = if lock_path.exists() {
            parse_gradle_lockfile(&read_to_string(&lock_path)?)
        } else {
            let script = ["build.gradle", "build.gradle.kts"]
                .iter()
                .map(|f| module.dir.join(f))
                .find(|p| p.exists())
                .ok_or_else(|| Error::ManifestParse {
                    path: module.dir.clone(),
                    details: "no build.gradle or build.gradle.kts found".to_string(),
                })?;
            parse_build_gradle(&read_to_string(&script)?).map_err(|e| Error::ManifestParse {
                path: script.clone(),
                details: e.to_string(),
            })?
        };

        let mut analyzed = module.clone();
        analyzed.id = PackageId::new(PackageType::Gradle, module.name.clone(), "");
        flat_facts(&mut analyzed, PackageType::Gradle, declared.into_iter());
        Ok(analyzed)
    }
}

/// Record `(name, version)` pairs as direct imports without edges.
fn flat_facts(module: &mut Module, kind: PackageType, declared: impl Iterator<Item = (String, String)>) {
    let mut deps = BTreeMap::new();
    let mut imports = Vec::new();
    for (name, version) in declared {
        let id = PackageId::new(kind, name, version);
        if deps.contains_key(&id) {
            continue;
        }
        deps.insert(
            id.clone(),
            Package {
                id: id.clone(),
                imports: Vec::new(),
            },
        );
        imports.push(id);
    }
    module.imports = imports;
    module.deps = deps;
}

fn coordinate(group_id: &str, artifact_id: &str) -> String {
    if group_id.is_empty() {
        artifact_id.to_string()
    } else {
        format!("{}:{}", group_id, artifact_id)
    }
}

/// `1.2.3` and `[1.2.3]` pin a version; ranges and `${property}` do not.
fn maven_version(version: &str) -> String {
    let version = version.trim();
    let version = version
        .strip_prefix('[')
        .and_then(|v| v.strip_suffix(']'))
        .unwrap_or(version);
    exact_version(version).to_string()
}

#[derive(Debug, Default)]
struct Pom {
    group_id: String,
    artifact_id: String,
    version: String,
    dependencies: Vec<PomDependency>,
}

#[derive(Debug, Default)]
struct PomDependency {
    group_id: String,
    artifact_id: String,
    version: String,
}

/// Parse `pom.xml` using the quick-xml event API.
///
/// Project coordinates are the direct children of `<project>`; dependencies
/// are read from `<project><dependencies>` only, so plugin and
/// dependency-management sections are skipped.
fn parse_pom_xml(content: &str) -> std::result::Result<Pom, String> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut pom = Pom::default();
    let mut stack: Vec<String> = Vec::new();
    let mut current: Option<PomDependency> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let name = String::from_utf8_lossy(e.name().local_name().as_ref()).into_owned();
                let path_is_dependency = name == "dependency"
                    && stack.len() == 2
                    && stack[0] == "project"
                    && stack[1] == "dependencies";
                if path_is_dependency {
                    current = Some(PomDependency::default());
                }
                stack.push(name);
            }
            Ok(Event::End(_)) => {
                if stack.len() == 3 && stack[2] == "dependency" {
                    if let Some(dep) = current.take() {
                        if !dep.artifact_id.is_empty() {
                            pom.dependencies.push(dep);
                        }
                    }
                }
                stack.pop();
            }
            Ok(Event::Text(ref e)) => {
                let text = e.unescape().map_err(|e| e.to_string())?.into_owned();
                let Some(tag) = stack.last() else { continue };
                match (stack.len(), current.as_mut()) {
                    (2, _) if stack[0] == "project" => match tag.as_str() {
                        "groupId" => pom.group_id = text,
                        "artifactId" => pom.artifact_id = text,
                        "version" => pom.version = text,
                        _ => {}
                    },
                    (4, Some(dep)) => match tag.as_str() {
                        "groupId" => dep.group_id = text,
                        "artifactId" => dep.artifact_id = text,
                        "version" => dep.version = text,
                        _ => {}
                    },
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.to_string()),
            _ => {}
        }
    }

    Ok(pom)
}

/// Parse `build.gradle` or `build.gradle.kts` with regex.
fn parse_build_gradle(content: &str) -> std::result::Result<Vec<(String, String)>, regex::Error> {
    // Matches: implementation 'group:artifact:version'
    //          implementation("group:artifact:version")
    let re_shorthand = Regex::new(
        r#"(?:implementation|api|compileOnly|runtimeOnly|testImplementation)\s*\(?\s*['"]([^'":]+):([^'":]+):([^'"]+)['"]"#,
    )?;

    // Matches: group: 'com.example', name: 'foo', version: '1.0'
    let re_map = Regex::new(
        r#"(?:implementation|api|compileOnly|runtimeOnly|testImplementation)\s+group:\s*['"]([^'"]+)['"]\s*,\s*name:\s*['"]([^'"]+)['"]\s*,\s*version:\s*['"]([^'"]+)['"]"#,
    )?;

    Ok(re_shorthand
        .captures_iter(content)
        .chain(re_map.captures_iter(content))
        .map(|caps| (coordinate(&caps[1], &caps[2]), exact_version(&caps[3]).to_string()))
        .collect())
}

/// Parse `gradle.lockfile`: `group:artifact:version=configurations`.
fn parse_gradle_lockfile(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with("empty="))
        .filter_map(|line| {
            let coords = line.split('=').next()?;
            let mut parts = coords.splitn(3, ':');
            let group = parts.next()?;
            let artifact = parts.next()?;
            let version = parts.next()?;
            Some((coordinate(group, artifact), version.to_string()))
        })
        .collect()
}
