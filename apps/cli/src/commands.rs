//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use sietsemap_core::{BuildConfig, BuildReport, ProgressReporter};
use sietsemap_geocode::NominatimGeocoder;
use sietsemap_publish::{PublishOptions, PublishOutcome};
use sietsemap_shared::{AppConfig, init_config, init_config_at, load_config, load_config_from};
use sietsemap_storage::RestaurantCache;
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Sietsemap: map every restaurant in Robert Sietsema's newsletter.
#[derive(Parser)]
#[command(
    name = "sietsemap",
    version,
    about = "Build and publish a map of the NYC restaurants Robert Sietsema writes about.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ./sietsemap.toml, then ~/.sietsemap/sietsemap.toml).
    #[arg(long, global = true, env = "SIETSEMAP_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Scan the feed, geocode new restaurants, and render the map.
    Build(BuildArgs),

    /// Commit and push the cache and map if they changed.
    Publish(PublishArgs),

    /// The daily job: build, then publish.
    Run {
        #[command(flatten)]
        build: BuildArgs,

        #[command(flatten)]
        publish: PublishArgs,
    },

    /// List cached restaurants.
    List,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Overrides for the `[feed]`, `[geocoder]`, and `[output]` config sections.
#[derive(Args, Debug, Default)]
pub(crate) struct BuildArgs {
    /// RSS feed URL.
    #[arg(long)]
    pub feed_url: Option<String>,

    /// Restaurant cache file.
    #[arg(long)]
    pub cache: Option<String>,

    /// Output map file.
    #[arg(long)]
    pub out: Option<String>,

    /// Minimum milliseconds between geocoding requests.
    #[arg(long)]
    pub rate_limit_ms: Option<u64>,
}

#[derive(Args, Debug)]
pub(crate) struct PublishArgs {
    /// Repository to commit in.
    #[arg(long, default_value = ".")]
    pub repo: PathBuf,

    /// Commit but do not push.
    #[arg(long)]
    pub no_push: bool,
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

    let filter = match cli.verbose {
        0 => "sietsemap=info",
        1 => "sietsemap=debug",
        _ => "sietsemap=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Command::Build(args) => {
            let config = resolve_config(config_path, &args)?;
            cmd_build(&config).await.map(|_| ())
        }
        Command::Publish(args) => {
            let config = resolve_config(config_path, &BuildArgs::default())?;
            cmd_publish(&config, &args).await
        }
        Command::Run { build, publish } => {
            let config = resolve_config(config_path, &build)?;
            cmd_build(&config).await?;
            cmd_publish(&config, &publish).await
        }
        Command::List => {
            let config = resolve_config(config_path, &BuildArgs::default())?;
            cmd_list(&config)
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(config_path),
            ConfigAction::Show => {
                let config = resolve_config(config_path, &BuildArgs::default())?;
                cmd_config_show(&config)
            }
        },
    }
}

/// Load config from `--config` or the default lookup, then apply flag overrides.
fn resolve_config(path: Option<&Path>, args: &BuildArgs) -> Result<AppConfig> {
    let mut config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    apply_overrides(&mut config, args);
    Ok(config)
}

fn apply_overrides(config: &mut AppConfig, args: &BuildArgs) {
    if let Some(url) = &args.feed_url {
        config.feed.url = url.clone();
    }
    if let Some(cache) = &args.cache {
        config.output.cache_file = cache.clone();
    }
    if let Some(out) = &args.out {
        config.output.map_file = out.clone();
    }
    if let Some(ms) = args.rate_limit_ms {
        config.geocoder.rate_limit_ms = ms;
    }
}

fn today() -> chrono::NaiveDate {
    chrono::Utc::now().date_naive()
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_build(config: &AppConfig) -> Result<BuildReport> {
    let build_config = BuildConfig::from_config(config, today())?;
    let geocoder = NominatimGeocoder::new(&config.geocoder)?;

    info!(
        feed = %build_config.feed_url,
        cache = %build_config.cache_path.display(),
        "building map"
    );

    let reporter = CliProgress::new();
    let report = sietsemap_core::build(&build_config, &geocoder, &reporter).await?;

    println!();
    println!("  Map built!");
    println!("  Posts:     {}", report.posts);
    println!("  Mentions:  {}", report.candidates);
    println!("  Known:     {}", report.already_known);
    println!("  Added:     {}", report.added);
    println!("  Failed:    {}", report.geocode_failures);
    println!("  Total:     {}", report.total);
    println!("  Map:       {}", report.map_path.display());
    println!(
        "  Time:      {:.1}s",
        report.elapsed.as_secs_f64()
    );
    println!();

    Ok(report)
}

async fn cmd_publish(config: &AppConfig, args: &PublishArgs) -> Result<()> {
    if !args.repo.join(".git").exists() {
        return Err(eyre!(
            "'{}' is not a git repository",
            args.repo.display()
        ));
    }

    let opts = PublishOptions {
        push: !args.no_push,
        ..PublishOptions::from_config(config)
    };

    info!(
        repo = %args.repo.display(),
        push = opts.push,
        token = opts.token.is_some(),
        "publishing"
    );

    match sietsemap_publish::publish(&args.repo, &opts, today()).await? {
        PublishOutcome::NoChanges => println!("  No changes to commit."),
        PublishOutcome::Committed { message, pushed } => {
            println!("  Committed: {message}");
            if pushed {
                println!("  Pushed to {}", opts.remote);
            }
        }
    }

    Ok(())
}

fn cmd_list(config: &AppConfig) -> Result<()> {
    let cache = RestaurantCache::load(Path::new(&config.output.cache_file))?;

    if cache.is_empty() {
        println!("No restaurants cached yet in {}.", cache.path().display());
        return Ok(());
    }

    for r in cache.iter() {
        println!("{}  {:<40}  {}", r.date_added, r.name, r.address);
    }
    println!();
    println!("{} restaurants in {}", cache.len(), cache.path().display());

    Ok(())
}

fn cmd_config_init(path: Option<&Path>) -> Result<()> {
    let path = match path {
        Some(p) => {
            init_config_at(p)?;
            p.to_path_buf()
        }
        None => init_config()?,
    };
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
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
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn post_scanned(&self, title: &str, current: usize, total: usize) {
        self.spinner.set_message(format!(
            "Scanning [{current}/{total}] {title}"
        ));
    }

    fn geocoded(&self, address: &str, found: bool) {
        let mark = if found { "+" } else { "?" };
        self.spinner.set_message(format!("Geocoding {mark} {address}"));
    }

    fn done(&self, _report: &BuildReport) {
        self.spinner.finish_and_clear();
    }
}
