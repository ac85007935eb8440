use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::Overrides;

#[derive(Parser, Debug)]
#[command(
    name = "deplocatr",
    about = "Inventory project dependencies under canonical locators",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Config file [default: ./.deplocatr/config.toml, fallback ~/.config/deplocatr/config.toml]
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print debug output
    #[arg(long, global = true)]
    pub debug: bool,

    /// Only print warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colors and spinners
    #[arg(long, global = true)]
    pub no_ansi: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze built dependencies and upload or print the result
    Analyze(AnalyzeArgs),

    /// Generate reports from analyzed dependencies
    Report {
        #[command(subcommand)]
        report: ReportCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum ReportCommand {
    /// Third-party license notice grouped by license
    Licenses(LicensesArgs),
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub modules: ModuleArgs,

    #[command(flatten)]
    pub project: ProjectArgs,

    /// Write the analysis to FILE ("-" for stdout) instead of uploading it
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<String>,

    /// Render the analysis through a handlebars template instead of JSON
    #[arg(short, long, value_name = "FILE")]
    pub template: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct LicensesArgs {
    #[command(flatten)]
    pub modules: ModuleArgs,

    #[command(flatten)]
    pub project: ProjectArgs,

    /// Output file for the report ("-" for stdout)
    #[arg(short, long, value_name = "FILE", default_value = "-")]
    pub output: String,

    /// Render through a handlebars template instead of the built-in notice
    #[arg(short, long, value_name = "FILE")]
    pub template: Option<PathBuf>,

    /// Also look up dependencies without a resolved revision (one request each, slow)
    #[arg(long)]
    pub unknown: bool,
}

#[derive(Args, Debug)]
pub struct ModuleArgs {
    /// Module to analyze, as <type>:<target> (e.g. nuget:src/App/App.csproj)
    #[arg(value_name = "MODULE")]
    pub module: Option<String>,

    /// Analyzer option for MODULE as key:value (repeatable)
    #[arg(long = "option", value_name = "KEY:VALUE")]
    pub options: Vec<String>,

    /// Project path
    #[arg(long, default_value = ".")]
    pub path: PathBuf,

    /// Skip modules whose analysis fails instead of stopping
    #[arg(long)]
    pub keep_going: bool,
}

#[derive(Args, Debug)]
pub struct ProjectArgs {
    /// Dependency service base URL
    #[arg(short, long)]
    pub endpoint: Option<String>,

    /// Fetcher for the project locator [default: custom]
    #[arg(long)]
    pub fetcher: Option<String>,

    /// Project name [default: git remote "origin"]
    #[arg(short, long)]
    pub project: Option<String>,

    /// Project revision [default: git HEAD]
    #[arg(short, long)]
    pub revision: Option<String>,

    /// Display title [default: project name]
    #[arg(long)]
    pub title: Option<String>,

    /// Branch [default: current git branch, then master]
    #[arg(short, long)]
    pub branch: Option<String>,
}

impl ProjectArgs {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            endpoint: self.endpoint.clone(),
            fetcher: self.fetcher.clone(),
            project: self.project.clone(),
            revision: self.revision.clone(),
            title: self.title.clone(),
            branch: self.branch.clone(),
        }
    }
}
