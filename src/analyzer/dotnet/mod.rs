//! Analyzer for .NET projects restored with NuGet.
//!
//! Reads the MSBuild project file for declared references and the restore
//! output (`obj/project.assets.json`) for locked versions and the packages
//! each locked package pulls in. Without restore output, only the manifest
//! is used and unpinned references stay unresolved.

pub mod lockfile;
pub mod manifest;

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::module::{Module, NuGetOptions};
use crate::pkg::{Package, PackageId, PackageType};

use lockfile::Lockfile;
use manifest::{read_packages_config, Manifest, Reference};

const PROJECT_EXTENSIONS: [&str; 3] = ["csproj", "fsproj", "vbproj"];

pub struct DotNetAnalyzer {
    options: NuGetOptions,
}

impl DotNetAnalyzer {
    pub fn new(options: NuGetOptions) -> Self {
        Self { options }
    }

    fn lockfile_path(&self, module: &Module) -> PathBuf {
        match &self.options.lockfile {
            Some(path) => module.dir.join(path),
            None => module.dir.join("obj").join("project.assets.json"),
        }
    }
}

impl super::Analyzer for DotNetAnalyzer {
    fn is_built(&self, module: &Module) -> Result<bool> {
        Ok(self.lockfile_path(module).exists())
    }

    fn analyze(&self, module: &Module) -> Result<Module> {
        let manifest_path = find_project_file(module)?;
        let manifest = Manifest::read(&manifest_path)?;

        let lock_path = self.lockfile_path(module);
        let lockfile = if lock_path.exists() {
            Some(Lockfile::read(&lock_path)?)
        } else {
            None
        };

        let name = match manifest.name() {
            "" => module.name.as_str(),
            name => name,
        };
        let id = PackageId::new(PackageType::NuGet, name, manifest.version());

        let mut graph = Graph::new(lockfile.as_ref(), &manifest_path, id.clone());
        let mut imports = graph.references(&manifest, &module.dir)?;

        let packages_config = module.dir.join("packages.config");
        if packages_config.exists() {
            for reference in read_packages_config(&packages_config)? {
                let id = graph.package(&reference.include, &reference.version);
                if !imports.contains(&id) {
                    imports.push(id);
                }
            }
        }

        let mut analyzed = module.clone();
        analyzed.id = id;
        analyzed.imports = imports;
        analyzed.deps = graph.deps;
        Ok(analyzed)
    }
}

/// Accumulates dependency facts while walking project and package references.
struct Graph<'a> {
    lockfile: Option<&'a Lockfile>,
    deps: BTreeMap<PackageId, Package>,
    /// Project files already expanded (or being expanded).
    projects: HashSet<PathBuf>,
    /// The module's own project file and identity. A reference back to it
    /// resolves to the module itself.
    root: (PathBuf, PackageId),
}

impl<'a> Graph<'a> {
    fn new(lockfile: Option<&'a Lockfile>, root_path: &Path, root_id: PackageId) -> Self {
        let root_path = canonical(root_path);
        Self {
            lockfile,
            deps: BTreeMap::new(),
            projects: HashSet::from([root_path.clone()]),
            root: (root_path, root_id),
        }
    }

    /// Mark a project file as expanded. Returns `false` if it already was.
    fn enter(&mut self, path: &Path) -> bool {
        self.projects.insert(canonical(path))
    }

    fn references(&mut self, manifest: &Manifest, dir: &Path) -> Result<Vec<PackageId>> {
        let mut ids = Vec::new();
        for reference in manifest.projects() {
            ids.push(self.project(reference, dir)?);
        }
        for reference in manifest.packages() {
            if reference.include.is_empty() {
                continue;
            }
            ids.push(self.package(&reference.include, &reference.version));
        }
        Ok(ids)
    }

    /// Locked version first, then an exact pin from the declaration.
    fn revision(&self, name: &str, declared: &str) -> String {
        let locked = self.lockfile.map(|l| l.resolve(name)).unwrap_or("");
        if locked.is_empty() {
            pinned_version(declared).to_string()
        } else {
            locked.to_string()
        }
    }

    fn package(&mut self, name: &str, declared: &str) -> PackageId {
        // NuGet IDs are case-insensitive; the lock's spelling is the identity.
        let locked_name = self.lockfile.and_then(|l| l.name(name)).unwrap_or(name);
        let id = PackageId::new(PackageType::NuGet, locked_name, self.revision(name, declared));
        if self.deps.contains_key(&id) {
            return id;
        }
        // Placeholder so that a lockfile cycle does not recurse forever.
        self.deps.insert(
            id.clone(),
            Package {
                id: id.clone(),
                imports: Vec::new(),
            },
        );

        let locked: Vec<(String, String)> = match self.lockfile {
            Some(lockfile) => lockfile
                .imports(name)
                .iter()
                .map(|(n, v)| (n.clone(), v.clone()))
                .collect(),
            None => Vec::new(),
        };
        let imports = locked
            .iter()
            .map(|(dep, version)| self.package(dep, version))
            .collect();

        self.deps.insert(id.clone(), Package { id: id.clone(), imports });
        id
    }

    fn project(&mut self, reference: &Reference, dir: &Path) -> Result<PackageId> {
        let path = dir.join(reference.include.replace('\\', "/"));
        if canonical(&path) == self.root.0 {
            return Ok(self.root.1.clone());
        }
        let manifest = Manifest::read(&path)?;
        let name = match manifest.name() {
            "" => path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| reference.include.clone()),
            name => name.to_string(),
        };
        let id = PackageId::new(PackageType::NuGet, name, manifest.version());
        if !self.enter(&path) {
            return Ok(id);
        }

        self.deps.insert(
            id.clone(),
            Package {
                id: id.clone(),
                imports: Vec::new(),
            },
        );
        let project_dir = path.parent().unwrap_or(dir).to_path_buf();
        let imports = self.references(&manifest, &project_dir)?;
        self.deps.insert(id.clone(), Package { id: id.clone(), imports });
        Ok(id)
    }
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// The version a declaration pins exactly: `1.2.3` or `[1.2.3]`. Ranges and
/// floating versions pin nothing.
fn pinned_version(declared: &str) -> &str {
    let declared = declared.trim();
    if let Some(inner) = declared.strip_prefix('[').and_then(|d| d.strip_suffix(']')) {
        if !inner.contains(',') {
            return inner.trim();
        }
        return "";
    }
    if declared.starts_with('(') || declared.contains('*') || declared.contains(',') {
        return "";
    }
    declared
}

/// The module's project file: the build target itself, or the first project
/// file in the module directory.
fn find_project_file(module: &Module) -> Result<PathBuf> {
    let target = module.target_path();
    if target.is_file() {
        return Ok(target);
    }
    let entries = std::fs::read_dir(&module.dir).map_err(|e| Error::io(&module.dir, e))?;
    let mut candidates: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|p| {
            p.extension()
                .and_then(|s| s.to_str())
                .is_some_and(|ext| PROJECT_EXTENSIONS.contains(&ext))
        })
        .collect();
    candidates.sort();
    candidates.into_iter().next().ok_or_else(|| Error::ManifestParse {
        path: module.dir.clone(),
        details: "no .csproj, .fsproj or .vbproj file found".to_string(),
    })
}
