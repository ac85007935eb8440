//! Per-ecosystem analyzers.
//!
//! Each analyzer turns one [`Module`] into a module carrying dependency
//! facts: its declared identity, direct imports, and every reachable package
//! with that package's own imports. Analyzers hold only their typed options,
//! so one instance may serve concurrent calls.

use crate::error::{Error, Result};
use crate::module::{Module, ModuleOptions};
use crate::pkg::PackageType;

pub mod dotnet;
pub mod java;
pub mod node;
pub mod python;
pub mod rust;

pub trait Analyzer: Send + Sync {
    /// Whether the artifacts needed for full resolution (usually a lockfile)
    /// exist. A `false` answer does not stop analysis.
    fn is_built(&self, module: &Module) -> Result<bool>;

    /// Produce the module with its dependency facts filled in.
    fn analyze(&self, module: &Module) -> Result<Module>;
}

/// Select the analyzer for a module's kind.
pub fn new(module: &Module) -> Result<Box<dyn Analyzer>> {
    let analyzer: Box<dyn Analyzer> = match (module.kind, &module.options) {
        (PackageType::NuGet, ModuleOptions::NuGet(opts)) => {
            Box::new(dotnet::DotNetAnalyzer::new(opts.clone()))
        }
        (PackageType::NuGet, _) => Box::new(dotnet::DotNetAnalyzer::new(Default::default())),
        (PackageType::Npm, ModuleOptions::Npm(opts)) => {
            Box::new(node::NodeAnalyzer::new(opts.clone()))
        }
        (PackageType::Npm, _) => Box::new(node::NodeAnalyzer::new(Default::default())),
        (PackageType::Cargo, _) => Box::new(rust::RustAnalyzer::new()),
        (PackageType::Maven, _) => Box::new(java::MavenAnalyzer::new()),
        (PackageType::Gradle, ModuleOptions::Gradle(opts)) => {
            Box::new(java::GradleAnalyzer::new(opts.clone()))
        }
        (PackageType::Gradle, _) => Box::new(java::GradleAnalyzer::new(Default::default())),
        (PackageType::Pip, ModuleOptions::Pip(opts)) => {
            Box::new(python::PythonAnalyzer::new(opts.clone()))
        }
        (PackageType::Pip, _) => Box::new(python::PythonAnalyzer::new(Default::default())),
        (kind, _) => return Err(Error::AnalyzerUnavailable { kind }),
    };
    Ok(analyzer)
}

/// The version `declared` names exactly, or `""` if it is a range.
///
/// Accepts `1.2.3`, `=1.2.3` and `v1.2.3`, with pre-release and build
/// suffixes. Operators, wildcards (`*`, `x`, `+` segments), unions and tags
/// such as `latest` pin nothing, so the dependency stays unresolved.
pub(crate) fn exact_version(declared: &str) -> &str {
    let declared = declared.trim();
    let version = declared.strip_prefix('=').unwrap_or(declared).trim_start();
    let version = version.strip_prefix('v').unwrap_or(version);
    let exact = version.starts_with(|c: char| c.is_ascii_digit())
        && version
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '+'))
        && !version
            .split('.')
            .any(|part| matches!(part, "x" | "X" | "*" | "+"));
    if exact {
        version
    } else {
        ""
    }
}
