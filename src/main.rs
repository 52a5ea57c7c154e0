use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};

use esgf_build::build::{BuildOptions, BumpRequest};
use esgf_build::config::{self, Config};
use esgf_build::decision::{DecisionProvider, InteractiveDecisions, ScriptedDecisions};
use esgf_build::directory;
use esgf_build::git::Git2VersionControl;
use esgf_build::logging;
use esgf_build::pipeline::{Pipeline, PipelineOptions, PipelineReport};
use esgf_build::preflight;
use esgf_build::process::SystemRunner;
use esgf_build::release::{GitHubReleases, ReleaseActionKind, ReleaseOptions};
use esgf_build::selector::{self, RepoRequest};
use esgf_build::sync::BranchDirective;
use esgf_build::ui;
use esgf_build::version::VersionBump;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BumpArg {
    Major,
    Minor,
    Patch,
    Prompt,
}

impl From<BumpArg> for BumpRequest {
    fn from(arg: BumpArg) -> Self {
        match arg {
            BumpArg::Major => BumpRequest::Component(VersionBump::Major),
            BumpArg::Minor => BumpRequest::Component(VersionBump::Minor),
            BumpArg::Patch => BumpRequest::Component(VersionBump::Patch),
            BumpArg::Prompt => BumpRequest::Prompt,
        }
    }
}

#[derive(clap::Parser)]
#[command(
    name = "esgf-build",
    version,
    about = "Sync, build and release the ESGF repositories"
)]
struct Args {
    #[arg(help = "Repositories to build, or 'all'; omitted shows a menu")]
    repos: Vec<String>,

    #[arg(long, value_name = "INDEXES", help = "Comma-separated registry indexes, e.g. 0,2")]
    select: Option<String>,

    #[arg(short, long, help = "Branch to check out, or 'latest' for the most recent tag")]
    branch: Option<String>,

    #[arg(
        long,
        alias = "bumpversion",
        value_enum,
        help = "Create a new version tag before building"
    )]
    bump: Option<BumpArg>,

    #[arg(short, long, help = "Root directory holding the checkouts")]
    directory: Option<PathBuf>,

    #[arg(short, long, help = "Release name (defaults to the tag)")]
    name: Option<String>,

    #[arg(long, conflicts_with = "no_upload", help = "Upload build artifacts without asking")]
    upload: bool,

    #[arg(long, help = "Skip the release stage without asking")]
    no_upload: bool,

    #[arg(short, long, help = "Mark created releases as prereleases")]
    prerelease: bool,

    #[arg(
        short = 'r',
        long = "dryrun",
        help = "Show release actions without changing anything on GitHub"
    )]
    dry_run: bool,

    #[arg(short, long, help = "Custom configuration file path")]
    config: Option<String>,

    #[arg(short, long, help = "Answer every question with its default")]
    yes: bool,

    #[arg(long, help = "Skip the compiler version check")]
    skip_preflight: bool,

    #[arg(long, help = "Show the repository registry and exit")]
    list: bool,

    #[arg(short, long, help = "Enable debug logging")]
    verbose: bool,
}

impl Args {
    fn upload(&self) -> Option<bool> {
        if self.upload {
            Some(true)
        } else if self.no_upload {
            Some(false)
        } else {
            None
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    let config = match config::load_config(args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            ui::display_error(&format!("Error loading config: {}", e));
            std::process::exit(1);
        }
    };

    if args.list {
        ui::display_menu(&config.registry().menu());
        return Ok(());
    }

    if let Err(e) = run(&args, &config) {
        ui::display_error(&e.to_string());
        std::process::exit(1);
    }
    Ok(())
}

fn run(args: &Args, config: &Config) -> Result<()> {
    let runner = SystemRunner;

    if args.skip_preflight {
        ui::display_status("Skipping compiler check");
    } else {
        let found = preflight::check_compiler(&runner, &config.preflight)?;
        ui::display_success(&format!("Found {} {}", config.preflight.compiler, found));
    }

    let mut decisions: Box<dyn DecisionProvider> = if args.yes {
        Box::new(ScriptedDecisions::assume_yes())
    } else {
        Box::new(InteractiveDecisions::stdio())
    };

    let root = directory::resolve_directory(args.directory.as_deref(), decisions.as_mut())?;

    let registry = config.registry();
    let request = RepoRequest::from_args(&args.repos, args.select.as_deref());
    let selection = selector::select_repos(&registry, &request, decisions.as_mut())?;

    let options = PipelineOptions {
        branch: BranchDirective::from_arg(args.branch.as_deref()),
        build: BuildOptions {
            tool: config.build.tool.clone(),
            status_marker: config.build.status_marker.clone(),
            bump: args.bump.map(BumpRequest::from),
        },
        release: ReleaseOptions {
            organization: config.release.organization.clone(),
            upload: args.upload(),
            name: args.name.clone(),
            prerelease: args.prerelease,
            dry_run: args.dry_run,
        },
    };

    let vcs = Git2VersionControl::new();
    let host = GitHubReleases::new(&config.release)?;
    let report = Pipeline {
        vcs: &vcs,
        runner: &runner,
        host: &host,
        decisions: decisions.as_mut(),
    }
    .run(&root, &selection, &options)?;

    display_summary(&report);
    Ok(())
}

fn display_summary(report: &PipelineReport) {
    ui::display_stage("Summary");
    for record in &report.tags {
        ui::display_status(&format!(
            "{}: {}",
            record.repo,
            record.tag.as_deref().unwrap_or("(no tags)")
        ));
    }
    for (repo, tag) in &report.build.new_tags {
        ui::display_success(&format!("Tagged {} as {}", repo, tag));
    }
    ui::display_status(&format!(
        "Build history: {}",
        report.build.history_file.display()
    ));
    for action in &report.releases {
        let verb = match &action.kind {
            ReleaseActionKind::UpdateAssets => "updated assets of".to_string(),
            ReleaseActionKind::CreateRelease { name } => format!("created release '{}' for", name),
        };
        let prefix = if action.dry_run { "[dry run] would have " } else { "" };
        ui::display_success(&format!(
            "{}{} {} {} ({} assets)",
            prefix,
            verb,
            action.repo,
            action.tag,
            action.assets.len()
        ));
    }
}
