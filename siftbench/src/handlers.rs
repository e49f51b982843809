use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use siftbench_core::compare::{Comparison, PipelineSpec, error_report};
use siftbench_core::config::ComparisonConfig;
use siftbench_core::pipeline::{PipelineConfig, PipelineRunner};
use siftbench_core::report::{ReportFormat, write_artifacts};
use siftbench_scanner::{CrawlConfig, HostMatch, StrategyKind};
use std::fs;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Route logs to stderr; stdout carries reports only.
pub fn init_tracing(verbose: bool, quiet: bool, default_level: &str) {
    let level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        default_level
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();
}

// Helper functions for seed handling

/// Collect seeds from repeated --seed flags and an optional seeds file
pub fn load_urls_from_source(
    seeds: &[Url],
    seeds_file: Option<&PathBuf>,
) -> Result<Vec<String>, String> {
    let mut urls: Vec<String> = seeds.iter().map(|u| u.as_str().to_string()).collect();
    if let Some(path) = seeds_file {
        urls.extend(load_urls_from_file(path)?);
    }
    if urls.is_empty() {
        return Err("Either --seed or --seeds-file must be provided".to_string());
    }
    Ok(urls)
}

/// Load and parse URLs from a file
pub fn load_urls_from_file(path: &PathBuf) -> Result<Vec<String>, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read seeds file {}: {}", path.display(), e))?;

    let urls: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(parse_url_line)
        .collect();

    if urls.is_empty() {
        return Err(format!("No valid URLs found in {}", path.display()));
    }

    Ok(urls)
}

/// Parse a single line as a URL, trying to add https:// if needed
pub fn parse_url_line(line: &str) -> Option<String> {
    if let Ok(url) = Url::parse(line) {
        if url.has_host() {
            return Some(line.to_string());
        }
    }

    let with_scheme = format!("https://{}", line);
    if let Ok(url) = Url::parse(&with_scheme) {
        if url.host_str().is_some_and(|h| !h.is_empty()) {
            return Some(with_scheme);
        }
    }

    eprintln!("⚠️  Skipping invalid URL '{}'", line);
    None
}

/// Build the crawl configuration shared by `pipeline` and `compare`
pub fn crawl_config_from_args(args: &ArgMatches) -> Result<CrawlConfig, String> {
    let seeds: Vec<Url> = args
        .get_many::<Url>("seed")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    let seeds = load_urls_from_source(&seeds, args.get_one::<PathBuf>("seeds-file"))?;

    let allowed_hosts: Vec<String> = args
        .get_many::<String>("allow-host")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    let host_match = if args.get_flag("suffix-hosts") {
        HostMatch::Suffix
    } else {
        HostMatch::Exact
    };

    let mut config = CrawlConfig::new(seeds)
        .with_allowed_hosts(allowed_hosts)
        .with_host_match(host_match);
    if let Some(max_pages) = args.get_one::<usize>("max-pages") {
        config = config.with_max_pages(*max_pages);
    }
    if let Some(max_depth) = args.get_one::<usize>("max-depth") {
        config = config.with_max_depth(*max_depth);
    }
    if let Some(timeout) = args.get_one::<u64>("timeout") {
        config = config.with_timeout(Duration::from_secs(*timeout));
    }

    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

/// Render a crawl configuration back into `pipeline` subcommand flags
pub fn forward_crawl_args(config: &CrawlConfig, use_sitemaps: bool) -> Vec<String> {
    let mut args = Vec::new();
    for seed in &config.seeds {
        args.push("--seed".to_string());
        args.push(seed.clone());
    }
    for host in &config.allowed_hosts {
        args.push("--allow-host".to_string());
        args.push(host.clone());
    }
    if config.host_match == HostMatch::Suffix {
        args.push("--suffix-hosts".to_string());
    }
    args.push("--max-pages".to_string());
    args.push(config.max_pages.to_string());
    args.push("--max-depth".to_string());
    args.push(config.max_depth.to_string());
    args.push("--timeout".to_string());
    args.push(config.timeout.as_secs().max(1).to_string());
    if use_sitemaps {
        args.push("--sitemap".to_string());
    }
    args
}

/// Run one pipeline and print its self-report on stdout.
///
/// Exits 0 whenever a JSON report (success or error) was written.
pub async fn handle_pipeline(args: &ArgMatches) -> i32 {
    let strategy = args
        .get_one::<String>("strategy")
        .and_then(|s| StrategyKind::from_str(s))
        .unwrap_or(StrategyKind::StaticParse);
    let name = args
        .get_one::<String>("name")
        .cloned()
        .unwrap_or_else(|| strategy.pipeline_name().to_string());

    let outcome = match crawl_config_from_args(args) {
        Ok(crawl) => {
            let config = PipelineConfig::new(strategy, crawl)
                .with_name(name.clone())
                .with_sitemaps(args.get_flag("sitemap"));
            PipelineRunner::new(config)
                .run()
                .await
                .map_err(|e| e.to_string())
        }
        Err(e) => Err(e),
    };

    let json = match outcome {
        Ok(report) => report.to_json(),
        Err(message) => {
            tracing::error!("{}: {}", name, message);
            serde_json::to_string_pretty(&error_report(&name, &message))
        }
    };

    match json {
        Ok(json) => {
            println!("{}", json);
            0
        }
        Err(e) => {
            eprintln!("✗ Failed to serialize report: {}", e);
            1
        }
    }
}

/// Build the pipeline list for `compare`: a config file, in-process tasks, or self re-invocation
pub fn comparison_specs(args: &ArgMatches) -> Result<(Vec<PipelineSpec>, bool), String> {
    let parallel_flag = args.get_flag("parallel");
    let pipeline_timeout = args.get_one::<u64>("pipeline-timeout").copied();

    if let Some(path) = args.get_one::<PathBuf>("config") {
        let expanded = shellexpand::tilde(&path.to_string_lossy()).to_string();
        let config = ComparisonConfig::load(Path::new(&expanded))
            .map_err(|e| format!("Failed to load {}: {}", expanded, e))?
            .with_default_timeout(pipeline_timeout);
        let parallel = config.parallel || parallel_flag;
        let specs = config.into_specs().map_err(|e| e.to_string())?;
        return Ok((specs, parallel));
    }

    let crawl = crawl_config_from_args(args)?;
    let use_sitemaps = args.get_flag("sitemap");
    let timeout = pipeline_timeout.map(Duration::from_secs);

    if args.get_flag("in-process") {
        let specs = StrategyKind::ALL
            .iter()
            .map(|kind| {
                let config = PipelineConfig::new(*kind, crawl.clone()).with_sitemaps(use_sitemaps);
                PipelineSpec::in_process(config).with_timeout(timeout)
            })
            .collect();
        return Ok((specs, parallel_flag));
    }

    let exe = std::env::current_exe()
        .map_err(|e| format!("Cannot locate the siftbench executable: {}", e))?;
    let config = ComparisonConfig::builtin(
        &exe.to_string_lossy(),
        &forward_crawl_args(&crawl, use_sitemaps),
    )
    .with_default_timeout(pipeline_timeout);
    let specs = config.into_specs().map_err(|e| e.to_string())?;
    Ok((specs, parallel_flag))
}

pub async fn handle_compare(args: &ArgMatches, quiet: bool) -> i32 {
    let (specs, parallel) = match comparison_specs(args) {
        Ok(specs) => specs,
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), e);
            return 1;
        }
    };

    let format = args
        .get_one::<String>("format")
        .and_then(|f| ReportFormat::from_str(f))
        .unwrap_or(ReportFormat::Text);
    let output_dir = args
        .get_one::<String>("output-dir")
        .map(|d| shellexpand::tilde(d).to_string())
        .unwrap_or_else(|| ".".to_string());

    let total = specs.len();
    let spinner = if quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new_spinner()
    };
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message(format!("Running {} pipeline(s)...", total));

    let progress = spinner.clone();
    let rows = Comparison::new(specs)
        .parallel(parallel)
        .with_progress_callback(Arc::new(move |index: usize, name: &str| {
            progress.set_message(format!("[{}/{}] {} finished", index + 1, total, name));
        }))
        .run()
        .await;
    spinner.finish_and_clear();

    let artifacts = match write_artifacts(&rows, Path::new(&output_dir)) {
        Ok(artifacts) => artifacts,
        Err(e) => {
            eprintln!("{} Failed to write reports to {}: {}", "✗".red().bold(), output_dir, e);
            return 1;
        }
    };

    match format.render(&rows) {
        Ok(rendered) => print!("{}", rendered),
        Err(e) => {
            eprintln!("{} Failed to render report: {}", "✗".red().bold(), e);
            return 1;
        }
    }

    if !quiet {
        eprintln!("{} Reports written:", "✓".green().bold());
        for path in [&artifacts.json, &artifacts.csv, &artifacts.html] {
            eprintln!("  {} {}", "→".blue(), path.display().to_string().bright_white());
        }
    }
    0
}

pub fn handle_strategies() {
    println!("{}", "Available strategies:".bright_white().bold());
    for kind in StrategyKind::ALL {
        println!(
            "  {:<10} {:<16} {}",
            kind.as_str().green(),
            kind.pipeline_name(),
            kind.description().dimmed()
        );
    }
}
