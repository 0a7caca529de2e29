use clap::{Parser, ValueEnum};
use fpid_cli::fpid_core::{init_thread_pool, ExtractorConfig, SearchStrategy};
use fpid_cli::{
    load_image, render_matches, summary_line, Config, DirectoryGallery, Gallery, IdentifyError, Identifier,
    ProgressReporter,
};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Preset {
    Fast,
    Precision,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Identify a fingerprint against a gallery directory")]
struct Cli {
    /// Probe fingerprint image
    probe: PathBuf,
    /// Directory of reference fingerprint images
    gallery: PathBuf,
    /// TOML or JSON configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Detector preset, replaces the extractor section of the config file
    #[arg(long, value_enum)]
    preset: Option<Preset>,
    /// Lowe ratio threshold, overrides the config file
    #[arg(long)]
    ratio: Option<f32>,
    /// Exact brute-force matching
    #[arg(long, conflicts_with = "kd_tree")]
    exact: bool,
    /// Approximate kd-tree matching
    #[arg(long)]
    kd_tree: bool,
    /// Leaf checks per kd-tree query, 0 for unbounded
    #[arg(long, requires = "kd_tree")]
    checks: Option<usize>,
    /// Worker threads
    #[arg(short = 'j', long)]
    threads: Option<usize>,
    /// Gallery entries between progress messages
    #[arg(long)]
    progress_interval: Option<usize>,
    /// Stop scanning after this many seconds and report the best so far
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,
    /// Where to write the match overlay
    #[arg(short, long, default_value = "match_result.png")]
    output: PathBuf,
    /// Overlay upscale factor
    #[arg(long, default_value_t = 2)]
    scale: u32,
    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn resolve_config(&self) -> Result<Config, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        match self.preset {
            Some(Preset::Fast) => config.extractor = ExtractorConfig::fast_preset(),
            Some(Preset::Precision) => config.extractor = ExtractorConfig::precision_preset(),
            None => {}
        }
        if let Some(ratio) = self.ratio {
            config.matcher.ratio_threshold = ratio;
        }
        if self.exact {
            config.matcher.strategy = SearchStrategy::Exact;
        }
        if self.kd_tree {
            config.matcher.strategy = match (SearchStrategy::kd_tree(), self.checks) {
                (SearchStrategy::KdTree { leaf_size, .. }, Some(max_checks)) => {
                    SearchStrategy::KdTree { leaf_size, max_checks }
                }
                (strategy, _) => strategy,
            };
        }
        if let Some(threads) = self.threads {
            config.n_threads = threads;
        }
        if let Some(interval) = self.progress_interval {
            config.progress_interval = interval;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "fpid_cli=debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_target(false)
        .init();

    let config = cli.resolve_config()?;
    if cli.print_config {
        println!("{}", config.to_toml()?);
        return Ok(());
    }

    init_thread_pool(config.n_threads)?;
    info!("extractor: {}", config.extractor.summary());

    let probe = load_image(&cli.probe).map_err(|e| IdentifyError::InvalidProbe(e.to_string()))?;
    let gallery = DirectoryGallery::open(&cli.gallery)?;
    info!(entries = gallery.len(), "gallery {}", gallery.root().display());

    let mut identifier = Identifier::new(config.clone())?;
    if let Some(secs) = cli.timeout {
        identifier = identifier.with_deadline(Instant::now() + Duration::from_secs(secs));
    }

    let reporter = ProgressReporter::new(config.progress_interval);
    let (ident, report) = identifier.identify_observed(&probe, &gallery, &reporter)?;

    if report.cancelled {
        info!(not_visited = report.not_visited, "scan stopped early, result covers visited entries only");
    }
    if !report.skipped.is_empty() {
        info!(skipped = report.skipped.len(), "some gallery entries were excluded");
    }
    println!("{}", summary_line(&ident));

    if let Some(index) = ident.index {
        let candidate = gallery.load(index)?;
        render_matches(&probe, &candidate, &ident, cli.scale).save(&cli.output)?;
        info!("saved match overlay to {}", cli.output.display());
    }

    Ok(())
}
