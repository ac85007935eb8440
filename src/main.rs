use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;

use deplocatr::analyze::{self, FailurePolicy};
use deplocatr::api::upload::report_url;
use deplocatr::api::ApiClient;
use deplocatr::cli::{AnalyzeArgs, Cli, Command, LicensesArgs, ModuleArgs, ProjectArgs, ReportCommand};
use deplocatr::config::{self, load_config, GitInfo, Settings, API_KEY_ENV};
use deplocatr::normalize::{normalize, SourceUnit};
use deplocatr::report;
use deplocatr::ui::Ui;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let ui = Ui::new(cli.quiet, cli.debug, cli.no_ansi);

    let result = match &cli.command {
        Command::Analyze(args) => run_analyze(&cli, args, &ui).await,
        Command::Report {
            report: ReportCommand::Licenses(args),
        } => run_licenses(&cli, args, &ui).await,
    };

    if let Err(err) = result {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

/// Everything a command needs once modules are analyzed.
struct Analysis {
    settings: Settings,
    units: Vec<SourceUnit>,
}

fn prepare(cli: &Cli, modules: &ModuleArgs, project: &ProjectArgs, ui: &Ui) -> Result<Analysis> {
    let root: PathBuf = modules
        .path
        .canonicalize()
        .unwrap_or_else(|_| modules.path.clone());

    let config = load_config(&root, cli.config.as_deref())?;
    let settings = Settings::resolve(
        &project.overrides(),
        &config,
        &GitInfo::read(&root),
        std::env::var(API_KEY_ENV).ok(),
    );
    ui.debug(format!("Settings: {settings:?}"));

    let modules_to_analyze = config::modules(
        modules.module.as_deref(),
        &modules.options,
        &config,
        &root,
        ui,
    )?;
    if modules_to_analyze.is_empty() {
        bail!("No modules specified and none found in {}", root.display());
    }

    let policy = if modules.keep_going {
        FailurePolicy::KeepGoing
    } else {
        FailurePolicy::Abort
    };
    let analyzed = analyze::modules(&modules_to_analyze, policy, ui)?;
    let units = normalize(&analyzed);
    report::terminal::render(&units, ui.is_quiet());

    Ok(Analysis { settings, units })
}

async fn run_analyze(cli: &Cli, args: &AnalyzeArgs, ui: &Ui) -> Result<()> {
    let Analysis { settings, units } = prepare(cli, &args.modules, &args.project, ui)?;

    if args.output.is_some() || args.template.is_some() {
        let output = args.output.as_deref().unwrap_or("-");
        return report::write(output, args.template.as_deref(), &units);
    }

    let client = ApiClient::new(settings.endpoint()?, settings.api_key.as_deref())?;
    let pb = ui.spinner("Uploading analysis...");
    let uploaded = client.upload(&settings, &units).await;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    let locator = uploaded?;

    ui.notice(format!("Uploaded {locator}"));
    println!("{}", report_url(client.endpoint(), &locator, &settings.branch));
    Ok(())
}

async fn run_licenses(cli: &Cli, args: &LicensesArgs, ui: &Ui) -> Result<()> {
    let Analysis { settings, units } = prepare(cli, &args.modules, &args.project, ui)?;

    let locators = report::licenses::lookup_locators(&units, args.unknown);

    let client = ApiClient::new(settings.endpoint()?, settings.api_key.as_deref())?;
    ui.notice(format!("Fetching license info for {} dependencies", locators.len()));
    let revisions = if args.unknown {
        client.revisions_each(&locators, ui).await
    } else {
        client.revisions(&locators, ui).await?
    };

    let groups = report::licenses::group_by_license(&revisions);
    let notice = report::licenses::render(&groups, args.template.as_deref())?;
    report::emit(&args.output, &notice)
}
