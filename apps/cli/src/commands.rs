//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use press_collectors::{
    EncyclopediaCollector, FeedCollector, OpenAiSummarizer, PageFetcher, PageSummarizer,
    RetryPolicy, http_client,
};
use press_core::{
    Collectors, PipelineOrchestrator, ProgressReporter, RunSummary, SubjectReport, run_all,
    write_index,
};
use press_render::TemplateRenderer;
use press_shared::{AppConfig, api_key, init_config, load_config, load_subjects};
use press_storage::{SnapshotStore, Storage, SubjectStore};

/// Crates whose log level follows `-v`.
const LOG_TARGETS: &[&str] = &[
    "press_cli",
    "press_core",
    "press_collectors",
    "press_render",
    "press_storage",
    "press_shared",
];

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// press — track named subjects across feeds, encyclopedia entries, and linked pages.
#[derive(Parser)]
#[command(
    name = "press",
    version,
    about = "Aggregate public activity about named subjects into per-subject articles.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Storage and output locations (override the config file).
#[derive(Args, Debug, Default)]
pub(crate) struct PathArgs {
    /// Database file.
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Directory for generated HTML pages.
    #[arg(long)]
    pub site: Option<PathBuf>,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Process every subject and regenerate the site.
    Run {
        /// Skip all network collection; render from stored data.
        #[arg(long, env = "PRESS_SKIP_NETWORK")]
        offline: bool,

        /// Subject list (.toml with [[subjects]] tables, or one name per line).
        #[arg(long)]
        subjects: Option<PathBuf>,

        #[command(flatten)]
        paths: PathArgs,
    },

    /// Regenerate index.html from stored subjects.
    Index {
        #[command(flatten)]
        paths: PathArgs,
    },

    /// Print the stored snapshot diffs for a subject.
    History {
        /// Subject name.
        name: String,

        #[command(flatten)]
        paths: PathArgs,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let directives = LOG_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",");

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run {
            offline,
            subjects,
            paths,
        } => cmd_run(offline, subjects.as_deref(), &paths).await,
        Command::Index { paths } => cmd_index(&paths).await,
        Command::History { name, paths } => cmd_history(&name, &paths).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

/// Resolved database and site locations.
fn resolve_paths(paths: &PathArgs, config: &AppConfig) -> (PathBuf, PathBuf) {
    let db = paths
        .db
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.defaults.database));
    let site = paths
        .site
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.defaults.site_dir));
    (db, site)
}

async fn cmd_run(offline: bool, subjects: Option<&Path>, paths: &PathArgs) -> Result<()> {
    let config = load_config()?;
    let (db_path, site_dir) = resolve_paths(paths, &config);

    let configured_subjects = config.defaults.subjects_file.as_ref().map(PathBuf::from);
    let descriptors = load_subjects(
        subjects.or(configured_subjects.as_deref()),
        Path::new(&config.defaults.data_dir),
    )?;

    info!(
        subjects = descriptors.len(),
        db = %db_path.display(),
        site = %site_dir.display(),
        offline,
        "starting run"
    );

    let storage = Arc::new(Storage::open(&db_path).await?);

    let client = http_client(&config.collectors)?;
    let summarizer = Arc::new(OpenAiSummarizer::new(
        client.clone(),
        config.llm.clone(),
        api_key(&config.llm),
    ));
    let links = PageSummarizer::new(
        PageFetcher::new(client.clone(), config.collectors.page_text_limit),
        summarizer,
        storage.clone(),
        RetryPolicy::from_config(&config.llm),
    );
    let collectors = Collectors {
        identity: Arc::new(EncyclopediaCollector::new(
            client.clone(),
            config.collectors.encyclopedia_endpoint.clone(),
        )),
        feeds: Arc::new(FeedCollector::new(client)),
        links: Arc::new(links),
    };

    let orchestrator =
        PipelineOrchestrator::new(storage, collectors, Arc::new(TemplateRenderer), &site_dir)
            .with_baseline(config.snapshot.baseline);

    let reporter = CliProgress::new();
    let summary = run_all(&orchestrator, &descriptors, !offline, &reporter).await;

    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!();
    for report in &summary.reports {
        if let Some(reason) = &report.rejected {
            println!("  ✗ {:<24} rejected: {reason}", report.subject);
            continue;
        }
        let page = report
            .output_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(no page)".to_string());
        println!(
            "  ✓ {:<24} {} activities  {}",
            report.subject, report.activities, page
        );
        for (stage, outcome) in report.problems() {
            println!("      {stage}: {outcome}");
        }
    }
    println!();
    println!("  Subjects:   {}", summary.subjects());
    println!("  Activities: {}", summary.activities());
    println!("  Snapshots:  {}", summary.snapshots());
    println!("  Problems:   {}", summary.problems());
    if let Some(index) = &summary.index_path {
        println!("  Index:      {}", index.display());
    }
    println!("  Time:       {:.1}s", summary.elapsed.as_secs_f64());
    println!();
}

async fn cmd_index(paths: &PathArgs) -> Result<()> {
    let config = load_config()?;
    let (db_path, site_dir) = resolve_paths(paths, &config);

    let storage = Storage::open_readonly(&db_path).await?;
    let path = write_index(&storage, &site_dir).await?;
    println!("Index written to: {}", path.display());
    Ok(())
}

async fn cmd_history(name: &str, paths: &PathArgs) -> Result<()> {
    let config = load_config()?;
    let (db_path, _) = resolve_paths(paths, &config);

    let storage = Storage::open_readonly(&db_path).await?;
    let subject = storage
        .get_subject(name)
        .await?
        .ok_or_else(|| eyre!("unknown subject '{name}'"))?;

    let snapshots = storage.list_snapshots(&subject.id).await?;
    if snapshots.is_empty() {
        println!("No snapshots recorded for {name}.");
        return Ok(());
    }

    for snapshot in snapshots {
        println!("== {} ==", snapshot.taken_on);
        println!("{}", snapshot.diff);
        println!();
    }
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn subject_started(&self, name: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Processing [{current}/{total}] {name}"));
    }

    fn subject_finished(&self, report: &SubjectReport) {
        let problems = report.problems().count();
        if problems > 0 {
            self.spinner.println(format!(
                "  {} finished with {problems} degraded stage(s)",
                report.subject
            ));
        }
    }

    fn done(&self, _summary: &RunSummary) {
        self.spinner.finish_and_clear();
    }
}
