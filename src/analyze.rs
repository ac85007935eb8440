//! Run the analyzer for each configured module.

use crate::analyzer;
use crate::error::{Error, Result};
use crate::module::Module;
use crate::ui::Ui;

/// What to do when a module's analysis fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop at the first failure.
    #[default]
    Abort,
    /// Warn and leave the module out of the results.
    KeepGoing,
}

/// Analyze `modules` in order.
///
/// A module whose kind has no analyzer is skipped with a warning. A module
/// that does not look built is still analyzed. A failed analysis is reported
/// as [`Error::AnalysisFailed`]; under [`FailurePolicy::KeepGoing`] it is
/// only a warning. Results are all-or-nothing per module.
pub fn modules(modules: &[Module], policy: FailurePolicy, ui: &Ui) -> Result<Vec<Module>> {
    let total = modules.len();
    let mut analyzed = Vec::with_capacity(total);

    for (i, module) in modules.iter().enumerate() {
        let pb = ui.spinner(format!("Analyzing module ({}/{}): {}", i + 1, total, module.name));
        let result = analyze_one(module, ui);
        if let Some(pb) = pb {
            pb.finish_and_clear();
        }

        match result {
            Ok(Some(m)) => {
                ui.debug(format!(
                    "{}: {} direct, {} total dependencies",
                    module.name,
                    m.imports.len(),
                    m.deps.len()
                ));
                analyzed.push(m);
            }
            Ok(None) => {}
            Err(err) if policy == FailurePolicy::KeepGoing => ui.warn_error(&err),
            Err(err) => return Err(err),
        }
    }

    Ok(analyzed)
}

/// `Ok(None)` when no analyzer exists for the module's kind.
fn analyze_one(module: &Module, ui: &Ui) -> Result<Option<Module>> {
    let analyzer = match analyzer::new(module) {
        Ok(analyzer) => analyzer,
        Err(err) => {
            ui.warn(format!("Could not load analyzer: {err}"));
            return Ok(None);
        }
    };

    match analyzer.is_built(module) {
        Ok(true) => {}
        Ok(false) => ui.warn(
            Error::UnbuiltModule {
                module: module.name.clone(),
                dir: module.dir.clone(),
            }
            .to_string(),
        ),
        Err(err) => ui.warn(format!("Could not determine whether module is built: {err}")),
    }

    analyzer
        .analyze(module)
        .map(Some)
        .map_err(|source| Error::AnalysisFailed {
            module: module.name.clone(),
            kind: module.kind,
            source: Box::new(source),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::ModuleOptions;
    use crate::pkg::{PackageId, PackageType};

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("web")).unwrap();
        std::fs::write(
            dir.path().join("web/package.json"),
            r#"{"name": "web", "version": "1.0.0", "dependencies": {"left-pad": "1.3.0"}}"#,
        )
        .unwrap();
        std::fs::create_dir(dir.path().join("broken")).unwrap();
        std::fs::write(dir.path().join("broken/package.json"), "{ not json").unwrap();
        dir
    }

    fn module(dir: &tempfile::TempDir, name: &str, kind: PackageType, target: &str) -> Module {
        Module::new(name, kind, target, dir.path(), ModuleOptions::None)
    }

    #[test]
    fn test_unbuilt_module_is_still_analyzed() {
        let dir = fixture();
        let result = modules(
            &[module(&dir, "web", PackageType::Npm, "web/package.json")],
            FailurePolicy::Abort,
            &Ui::default(),
        )
        .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(
            result[0].imports,
            vec![PackageId::new(PackageType::Npm, "left-pad", "1.3.0")]
        );
    }

    #[test]
    fn test_module_without_analyzer_is_skipped() {
        let dir = fixture();
        let result = modules(
            &[
                module(&dir, "pods", PackageType::Cocoapods, "."),
                module(&dir, "web", PackageType::Npm, "web/package.json"),
            ],
            FailurePolicy::Abort,
            &Ui::default(),
        )
        .unwrap();
        let names: Vec<&str> = result.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["web"]);
    }

    #[test]
    fn test_failure_aborts_by_default() {
        let dir = fixture();
        let err = modules(
            &[
                module(&dir, "broken", PackageType::Npm, "broken/package.json"),
                module(&dir, "web", PackageType::Npm, "web/package.json"),
            ],
            FailurePolicy::Abort,
            &Ui::default(),
        )
        .unwrap_err();
        match err {
            Error::AnalysisFailed { module, kind, source } => {
                assert_eq!(module, "broken");
                assert_eq!(kind, PackageType::Npm);
                assert!(matches!(*source, Error::ManifestParse { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_keep_going_skips_failed_module() {
        let dir = fixture();
        let result = modules(
            &[
                module(&dir, "broken", PackageType::Npm, "broken/package.json"),
                module(&dir, "web", PackageType::Npm, "web/package.json"),
            ],
            FailurePolicy::KeepGoing,
            &Ui::default(),
        )
        .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].name, "web");
    }
}
