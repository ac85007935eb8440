//! Buildable units and their per-ecosystem options.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::pkg::{Package, PackageId, PackageType};

/// One buildable unit of the analyzed project.
///
/// `imports` and `deps` are empty until an analyzer fills them in.
#[derive(Debug, Clone)]
pub struct Module {
    /// Display name chosen by the caller.
    pub name: String,
    pub kind: PackageType,
    /// Manifest path (or directory) the analyzer starts from.
    pub build_target: String,
    /// Directory containing the build target.
    pub dir: PathBuf,
    pub options: ModuleOptions,
    /// Declared identity, replaced by the analyzer.
    pub id: PackageId,
    /// Direct dependencies.
    pub imports: Vec<PackageId>,
    /// Every reachable dependency, keyed by identity.
    pub deps: BTreeMap<PackageId, Package>,
}

impl Module {
    /// Build a module rooted at `root`. A target pointing at a file uses its
    /// parent directory; any other target is treated as a directory.
    pub fn new(
        name: impl Into<String>,
        kind: PackageType,
        build_target: impl Into<String>,
        root: &Path,
        options: ModuleOptions,
    ) -> Self {
        let name = name.into();
        let build_target = build_target.into();
        let target = root.join(&build_target);
        let dir = if target.is_file() {
            target
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| root.to_path_buf())
        } else {
            target
        };
        Self {
            id: PackageId::new(kind, name.clone(), ""),
            name,
            kind,
            build_target,
            dir,
            options,
            imports: Vec::new(),
            deps: BTreeMap::new(),
        }
    }

    /// Absolute path of the build target.
    pub fn target_path(&self) -> PathBuf {
        let file_name = Path::new(&self.build_target).file_name();
        match file_name {
            Some(name) if self.dir.join(name).is_file() => self.dir.join(name),
            _ => self.dir.clone(),
        }
    }
}

/// Typed analyzer options, one schema per ecosystem kind.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ModuleOptions {
    NuGet(NuGetOptions),
    Npm(NpmOptions),
    Gradle(GradleOptions),
    Pip(PipOptions),
    #[default]
    None,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct NuGetOptions {
    /// Path to `project.assets.json`, relative to the module directory.
    pub lockfile: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct NpmOptions {
    pub include_dev: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct GradleOptions {
    pub lockfile: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct PipOptions {
    pub requirements: Option<PathBuf>,
}

impl ModuleOptions {
    /// Validate a raw option table against the schema for `kind`.
    pub fn from_table(kind: PackageType, table: toml::Table) -> Result<Self> {
        let options = match kind {
            PackageType::NuGet => ModuleOptions::NuGet(decode(kind, table)?),
            PackageType::Npm => ModuleOptions::Npm(decode(kind, table)?),
            PackageType::Gradle => ModuleOptions::Gradle(decode(kind, table)?),
            PackageType::Pip => ModuleOptions::Pip(decode(kind, table)?),
            _ if table.is_empty() => ModuleOptions::None,
            _ => {
                let keys: Vec<&str> = table.keys().map(String::as_str).collect();
                return Err(Error::InvalidOptions {
                    kind,
                    details: format!("{kind} modules take no options (got {})", keys.join(", ")),
                });
            }
        };
        Ok(options)
    }

    /// Parse `key:value` pairs from the command line.
    ///
    /// Values are coerced to booleans or integers where they look like one;
    /// everything else stays a string. The schema check then decides whether
    /// the coerced value fits.
    pub fn from_flags(kind: PackageType, flags: &[String]) -> Result<Self> {
        let mut table = toml::Table::new();
        for flag in flags {
            let (key, value) = flag.split_once(':').ok_or_else(|| Error::InvalidOptions {
                kind,
                details: format!("option {flag:?} is not of the form key:value"),
            })?;
            table.insert(key.to_string(), coerce(value));
        }
        Self::from_table(kind, table)
    }
}

fn coerce(value: &str) -> toml::Value {
    match value {
        "true" => toml::Value::Boolean(true),
        "false" => toml::Value::Boolean(false),
        _ => match value.parse::<i64>() {
            Ok(i) => toml::Value::Integer(i),
            Err(_) => toml::Value::String(value.to_string()),
        },
    }
}

fn decode<T: DeserializeOwned>(kind: PackageType, table: toml::Table) -> Result<T> {
    toml::Value::Table(table)
        .try_into()
        .map_err(|e: toml::de::Error| Error::InvalidOptions {
            kind,
            details: e.message().to_string(),
        })
}
