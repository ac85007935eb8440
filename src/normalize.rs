//! Fold analyzed modules into source units keyed by canonical locators.
//!
//! Every dependency reachable from a module's direct imports becomes one
//! [`Dependency`], carrying each distinct import path that reaches it. The
//! walk does not expand a locator that is already on the current path.
//! Routes never exceed [`MAX_PATH_LEN`] locators: past that depth a package is
//! still recorded, once, under the first `MAX_PATH_LEN - 1` locators of the
//! route followed by the package itself.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::Serialize;

use crate::locator::{ImportPath, Locator};
use crate::module::Module;
use crate::pkg::PackageId;

/// Longest import path, counting the module root.
pub const MAX_PATH_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SourceUnit {
    pub name: String,
    #[serde(rename = "Type")]
    pub kind: String,
    /// Build target the module was analyzed from.
    pub manifest: String,
    pub locator: Locator,
    pub build: Build,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Build {
    pub artifact: String,
    pub succeeded: bool,
    /// The module's direct dependencies.
    pub imports: Vec<Locator>,
    pub dependencies: Vec<Dependency>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Dependency {
    pub locator: Locator,
    /// Locators this dependency imports directly.
    pub imports: Vec<Locator>,
    pub import_paths: Vec<ImportPath>,
}

impl SourceUnit {
    /// Number of dependencies without a resolved revision.
    pub fn unresolved(&self) -> usize {
        self.build
            .dependencies
            .iter()
            .filter(|d| !d.locator.is_resolved())
            .count()
    }
}

/// One source unit per module, in input order.
pub fn normalize(modules: &[Module]) -> Vec<SourceUnit> {
    modules.iter().map(normalize_module).collect()
}

fn normalize_module(module: &Module) -> SourceUnit {
    let root = locate(&module.id);

    let mut walk = Walk {
        module,
        path: vec![root.clone()],
        found: BTreeMap::new(),
        deep: HashSet::new(),
    };
    for import in &module.imports {
        walk.visit(import);
    }

    let imports: BTreeSet<Locator> = module.imports.iter().map(locate).collect();
    let dependencies = walk
        .found
        .into_iter()
        .map(|(locator, found)| Dependency {
            locator,
            imports: found.imports.into_iter().collect(),
            import_paths: found.paths.into_iter().collect(),
        })
        .collect();

    SourceUnit {
        name: module.name.clone(),
        kind: module.kind.to_string(),
        manifest: module.build_target.clone(),
        locator: root,
        build: Build {
            artifact: "default".to_string(),
            succeeded: true,
            imports: imports.into_iter().collect(),
            dependencies,
        },
    }
}

fn locate(id: &PackageId) -> Locator {
    Locator::from(id).canonical()
}

#[derive(Default)]
struct Found {
    imports: BTreeSet<Locator>,
    paths: BTreeSet<ImportPath>,
}

struct Walk<'a> {
    module: &'a Module,
    /// Locators from the module root to the package being visited.
    path: Vec<Locator>,
    found: BTreeMap<Locator, Found>,
    /// Packages already expanded below the depth cap.
    deep: HashSet<Locator>,
}

impl<'a> Walk<'a> {
    fn imports(&self, id: &PackageId) -> &'a [PackageId] {
        let module = self.module;
        module
            .deps
            .get(id)
            .map(|p| p.imports.as_slice())
            .unwrap_or(&[])
    }

    fn record(&mut self, locator: Locator, imports: &[PackageId], route: Vec<Locator>) {
        let found = self.found.entry(locator).or_default();
        found.imports.extend(imports.iter().map(locate));
        if let Some(path) = ImportPath::new(route) {
            found.paths.insert(path);
        }
    }

    fn visit(&mut self, id: &'a PackageId) {
        let locator = locate(id);
        if self.path.contains(&locator) {
            return;
        }
        if self.path.len() >= MAX_PATH_LEN {
            self.visit_deep(id);
            return;
        }

        let imports = self.imports(id);
        self.path.push(locator.clone());
        let route = self.path.clone();
        self.record(locator, imports, route);
        for import in imports {
            self.visit(import);
        }
        self.path.pop();
    }

    /// Record everything reachable from `id` under the truncated route,
    /// expanding each package once.
    fn visit_deep(&mut self, id: &'a PackageId) {
        let mut pending = vec![id];
        while let Some(id) = pending.pop() {
            let locator = locate(id);
            if self.path.contains(&locator) || !self.deep.insert(locator.clone()) {
                continue;
            }
            let imports = self.imports(id);
            let mut route = self.path[..MAX_PATH_LEN - 1].to_vec();
            route.push(locator.clone());
            self.record(locator, imports, route);
            pending.extend(imports.iter().rev());
        }
    }
}
