use std::path::Path;

use crate::module::{Module, ModuleOptions};
use crate::pkg::PackageType;

const DOTNET_EXTENSIONS: [&str; 3] = ["csproj", "fsproj", "vbproj"];

/// Discover modules by scanning `root` for known manifest files.
///
/// Only the root directory itself is scanned. Every .NET project file is
/// its own module; the other ecosystems contribute at most one module each.
/// Results are sorted by build target.
pub fn detect_modules(root: &Path) -> Vec<Module> {
    let mut found: Vec<(PackageType, String)> = Vec::new();

    if let Ok(entries) = std::fs::read_dir(root) {
        for entry in entries.flatten() {
            let path = entry.path();
            let is_project = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| DOTNET_EXTENSIONS.contains(&ext));
            if is_project && path.is_file() {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    found.push((PackageType::NuGet, name.to_string()));
                }
            }
        }
    }

    if root.join("package.json").exists() {
        found.push((PackageType::Npm, "package.json".to_string()));
    }

    if root.join("Cargo.toml").exists() {
        found.push((PackageType::Cargo, "Cargo.toml".to_string()));
    }

    if root.join("pom.xml").exists() {
        found.push((PackageType::Maven, "pom.xml".to_string()));
    }

    if let Some(script) = ["build.gradle", "build.gradle.kts"]
        .into_iter()
        .find(|f| root.join(f).exists())
    {
        found.push((PackageType::Gradle, script.to_string()));
    }

    if let Some(manifest) = ["Pipfile.lock", "requirements.txt"]
        .into_iter()
        .find(|f| root.join(f).exists())
    {
        found.push((PackageType::Pip, manifest.to_string()));
    }

    found.sort_by(|a, b| a.1.cmp(&b.1));
    found
        .into_iter()
        .map(|(kind, target)| {
            let name = module_name(root, kind, &target);
            let options = ModuleOptions::from_table(kind, toml::Table::new()).unwrap_or_default();
            Module::new(name, kind, target, root, options)
        })
        .collect()
}

/// Project file stem for .NET, otherwise the directory name.
fn module_name(root: &Path, kind: PackageType, target: &str) -> String {
    if kind == PackageType::NuGet {
        if let Some(stem) = Path::new(target).file_stem().and_then(|s| s.to_str()) {
            return stem.to_string();
        }
    }
    root.canonicalize()
        .ok()
        .as_deref()
        .and_then(Path::file_name)
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| target.to_string())
}
