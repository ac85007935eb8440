use std::path::Path;
use std::process::Command;

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;

use crate::detector::detect_modules;
use crate::module::{Module, ModuleOptions};
use crate::pkg::PackageType;
use crate::ui::Ui;

/// Environment variable consulted for the API key when the file has none.
pub const API_KEY_ENV: &str = "DEPLOCATR_API_KEY";

/// Root configuration structure, deserialized from `.deplocatr/config.toml`.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub project: ProjectConfig,
    /// Modules to analyze. Empty means discover them.
    #[serde(default)]
    pub modules: Vec<ModuleConfig>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the dependency service.
    pub server: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProjectConfig {
    pub fetcher: Option<String>,
    pub name: Option<String>,
    pub revision: Option<String>,
    pub title: Option<String>,
    pub branch: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ModuleConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: PackageType,
    pub target: String,
    #[serde(default)]
    pub options: toml::Table,
}

/// Load the configuration, searching in order:
///
/// 1. `config_override`: path passed via `--config`
/// 2. `<project_path>/.deplocatr/config.toml`
/// 3. `~/.config/deplocatr/config.toml`
/// 4. Built-in [`Config::default`]
pub fn load_config(project_path: &Path, config_override: Option<&Path>) -> Result<Config> {
    load_config_from(project_path, config_override, dirs::home_dir().as_deref())
}

/// [`load_config`] with an explicit home directory.
fn load_config_from(
    project_path: &Path,
    config_override: Option<&Path>,
    home: Option<&Path>,
) -> Result<Config> {
    if let Some(path) = config_override {
        return read_config(path);
    }

    let project_config = project_path.join(".deplocatr").join("config.toml");
    if project_config.exists() {
        return read_config(&project_config);
    }

    if let Some(home) = home {
        let home_config = home.join(".config").join("deplocatr").join("config.toml");
        if home_config.exists() {
            return read_config(&home_config);
        }
    }

    Ok(Config::default())
}

fn read_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("could not read config {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("could not parse config {}", path.display()))
}

/// Values given on the command line. They win over the file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub endpoint: Option<String>,
    pub fetcher: Option<String>,
    pub project: Option<String>,
    pub revision: Option<String>,
    pub title: Option<String>,
    pub branch: Option<String>,
}

/// What the working copy says about itself.
#[derive(Debug, Default, Clone)]
pub struct GitInfo {
    pub remote: Option<String>,
    pub revision: Option<String>,
    pub branch: Option<String>,
}

impl GitInfo {
    /// Ask `git` about the repository containing `dir`. Anything git cannot
    /// answer (no repository, detached HEAD, git not installed) is `None`.
    pub fn read(dir: &Path) -> Self {
        Self {
            remote: git(dir, &["remote", "get-url", "origin"]),
            revision: git(dir, &["rev-parse", "HEAD"]),
            branch: git(dir, &["rev-parse", "--abbrev-ref", "HEAD"]).filter(|b| b != "HEAD"),
        }
    }
}

fn git(dir: &Path, args: &[&str]) -> Option<String> {
    let output = Command::new("git").arg("-C").arg(dir).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let value = String::from_utf8(output.stdout).ok()?.trim().to_string();
    (!value.is_empty()).then_some(value)
}

/// Effective project and service settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub fetcher: String,
    pub project: String,
    pub revision: String,
    pub title: String,
    pub branch: String,
}

impl Settings {
    /// Resolve each key from the first non-empty source in its precedence
    /// order: command line, config file, then environment or git.
    pub fn resolve(
        flags: &Overrides,
        config: &Config,
        git: &GitInfo,
        env_api_key: Option<String>,
    ) -> Self {
        let file = &config.project;
        let project = first([&flags.project, &file.name, &git.remote]).unwrap_or_default();
        Self {
            endpoint: first([&flags.endpoint, &config.api.server]),
            api_key: first([&config.api.api_key, &env_api_key]),
            fetcher: first([&flags.fetcher, &file.fetcher]).unwrap_or_else(|| "custom".to_string()),
            revision: first([&flags.revision, &file.revision, &git.revision]).unwrap_or_default(),
            title: first([&flags.title, &file.title]).unwrap_or_else(|| project.clone()),
            branch: first([&flags.branch, &file.branch, &git.branch])
                .unwrap_or_else(|| "master".to_string()),
            project,
        }
    }

    pub fn endpoint(&self) -> Result<&str> {
        self.endpoint
            .as_deref()
            .ok_or_else(|| anyhow!("no service endpoint configured (set --endpoint or [api] server)"))
    }
}

fn first<const N: usize>(candidates: [&Option<String>; N]) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .find(|value| !value.is_empty())
        .cloned()
}

/// Build the module list: the `kind:target` argument if given, else the
/// configured modules, else whatever is discovered under `root`.
pub fn modules(
    arg: Option<&str>,
    options: &[String],
    config: &Config,
    root: &Path,
    ui: &Ui,
) -> Result<Vec<Module>> {
    if let Some(arg) = arg {
        let (kind, target) = arg
            .split_once(':')
            .ok_or_else(|| anyhow!("module {arg:?} is not of the form <type>:<target>"))?;
        let kind: PackageType = kind.parse()?;
        if target.is_empty() {
            bail!("module {arg:?} has no build target");
        }
        let options = ModuleOptions::from_flags(kind, options)?;
        let module = Module::new(target, kind, target, root, options);
        ui.debug(format!("Parsed module from arguments: {module:?}"));
        return Ok(vec![module]);
    }

    if !options.is_empty() {
        ui.warn(format!(
            "Found {} options passed via command line, but modules are being loaded from configuration. Ignoring options.",
            options.len()
        ));
    }

    if config.modules.is_empty() {
        let discovered = detect_modules(root);
        ui.debug(format!("Discovered {} modules in {}", discovered.len(), root.display()));
        return Ok(discovered);
    }

    config
        .modules
        .iter()
        .map(|m| {
            let options = ModuleOptions::from_table(m.kind, m.options.clone())
                .with_context(|| format!("module {}", m.name))?;
            Ok(Module::new(m.name.clone(), m.kind, m.target.clone(), root, options))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::NpmOptions;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CONFIG: &str = r#"
[api]
server = "https://deps.example.com"
api_key = "file-key"

[project]
name = "github.com/acme/widget"
branch = "develop"

[[modules]]
name = "web"
type = "npm"
target = "web/package.json"
options = { include-dev = true }

[[modules]]
name = "App"
type = "nuget"
target = "src/App/App.csproj"
"#;

    fn config(content: &str) -> Config {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        load_config(Path::new("."), Some(file.path())).unwrap()
    }

    fn git_info() -> GitInfo {
        GitInfo {
            remote: Some("git@github.com:acme/widget-fork.git".to_string()),
            revision: Some("abc123".to_string()),
            branch: Some("feature/x".to_string()),
        }
    }

    #[test]
    fn test_file_values_beat_git() {
        let cfg = config(CONFIG);
        let settings = Settings::resolve(&Overrides::default(), &cfg, &git_info(), None);
        assert_eq!(settings.endpoint.as_deref(), Some("https://deps.example.com"));
        assert_eq!(settings.api_key.as_deref(), Some("file-key"));
        assert_eq!(settings.fetcher, "custom");
        assert_eq!(settings.project, "github.com/acme/widget");
        assert_eq!(settings.revision, "abc123");
        assert_eq!(settings.title, "github.com/acme/widget");
        assert_eq!(settings.branch, "develop");
    }

    #[test]
    fn test_flags_beat_file() {
        let cfg = config(CONFIG);
        let flags = Overrides {
            endpoint: Some("http://localhost:8080".to_string()),
            project: Some("widget".to_string()),
            title: Some("Widget".to_string()),
            branch: Some("release".to_string()),
            ..Default::default()
        };
        let settings = Settings::resolve(&flags, &cfg, &git_info(), None);
        assert_eq!(settings.endpoint().unwrap(), "http://localhost:8080");
        assert_eq!(settings.project, "widget");
        assert_eq!(settings.title, "Widget");
        assert_eq!(settings.branch, "release");
    }

    #[test]
    fn test_fallbacks_without_file_or_git() {
        let settings = Settings::resolve(
            &Overrides::default(),
            &Config::default(),
            &GitInfo::default(),
            Some("env-key".to_string()),
        );
        assert!(settings.endpoint().is_err());
        assert_eq!(settings.api_key.as_deref(), Some("env-key"));
        assert_eq!(settings.fetcher, "custom");
        assert_eq!(settings.project, "");
        assert_eq!(settings.branch, "master");

        let settings = Settings::resolve(&Overrides::default(), &Config::default(), &git_info(), None);
        assert_eq!(settings.project, "git@github.com:acme/widget-fork.git");
        assert_eq!(settings.branch, "feature/x");
    }

    #[test]
    fn test_empty_values_are_skipped() {
        let flags = Overrides {
            fetcher: Some(String::new()),
            ..Default::default()
        };
        let settings = Settings::resolve(&flags, &Config::default(), &GitInfo::default(), None);
        assert_eq!(settings.fetcher, "custom");
    }

    #[test]
    fn test_modules_from_file() {
        let cfg = config(CONFIG);
        let modules = modules(None, &[], &cfg, Path::new("/repo"), &Ui::default()).unwrap();
        assert_eq!(modules.len(), 2);
        assert_eq!(modules[0].kind, PackageType::Npm);
        assert_eq!(
            modules[0].options,
            ModuleOptions::Npm(NpmOptions { include_dev: true })
        );
        assert_eq!(modules[1].build_target, "src/App/App.csproj");
    }

    #[test]
    fn test_module_argument_wins() {
        let cfg = config(CONFIG);
        let modules = modules(
            Some("npm:client/package.json"),
            &["include-dev:true".to_string()],
            &cfg,
            Path::new("/repo"),
            &Ui::default(),
        )
        .unwrap();
        assert_eq!(modules.len(), 1);
        assert_eq!(modules[0].name, "client/package.json");
        assert_eq!(
            modules[0].options,
            ModuleOptions::Npm(NpmOptions { include_dev: true })
        );
    }

    #[test]
    fn test_bad_module_argument() {
        let cfg = Config::default();
        let ui = Ui::default();
        assert!(modules(Some("package.json"), &[], &cfg, Path::new("."), &ui).is_err());
        assert!(modules(Some("leiningen:project.clj"), &[], &cfg, Path::new("."), &ui).is_err());
        assert!(modules(Some("npm:"), &[], &cfg, Path::new("."), &ui).is_err());
    }

    #[test]
    fn test_invalid_file_options_are_rejected() {
        let cfg = config(
            r#"
[[modules]]
name = "lib"
type = "cargo"
target = "Cargo.toml"
options = { features = "all" }
"#,
        );
        let err = modules(None, &[], &cfg, Path::new("."), &Ui::default()).unwrap_err();
        assert!(format!("{err:#}").contains("cargo modules take no options"));
    }

    #[test]
    fn test_default_when_no_config() {
        let project = tempfile::tempdir().unwrap();
        let home = tempfile::tempdir().unwrap();
        let cfg = load_config_from(project.path(), None, Some(home.path())).unwrap();
        assert!(cfg.api.server.is_none());
        assert!(cfg.modules.is_empty());
        let cfg = load_config_from(project.path(), None, None).unwrap();
        assert!(cfg.api.server.is_none());
    }

    #[test]
    fn test_home_config_is_the_fallback() {
        let project = tempfile::tempdir().unwrap();
        let home = tempfile::tempdir().unwrap();
        let home_config = home.path().join(".config/deplocatr/config.toml");
        std::fs::create_dir_all(home_config.parent().unwrap()).unwrap();
        std::fs::write(&home_config, "[api]\nserver = \"https://home.example.com\"\n").unwrap();

        let cfg = load_config_from(project.path(), None, Some(home.path())).unwrap();
        assert_eq!(cfg.api.server.as_deref(), Some("https://home.example.com"));

        // A project config shadows the home one.
        std::fs::create_dir_all(project.path().join(".deplocatr")).unwrap();
        std::fs::write(
            project.path().join(".deplocatr/config.toml"),
            "[api]\nserver = \"https://project.example.com\"\n",
        )
        .unwrap();
        let cfg = load_config_from(project.path(), None, Some(home.path())).unwrap();
        assert_eq!(cfg.api.server.as_deref(), Some("https://project.example.com"));
    }
}
