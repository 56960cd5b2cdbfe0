mod browser;
mod controller;
mod error;
mod output;
mod parser;
mod record;
mod settings;
mod sites;
mod targets;

use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Local;
use clap::{Args, Parser, Subcommand};

use browser::BrowserSession;
use controller::RunOptions;
use output::{CsvOutput, RawDump};
use settings::Settings;

const EXIT_TARGETS_FAILED: i32 = 2;
const EXIT_INTERRUPTED: i32 = 130;

#[derive(Parser)]
#[command(name = "review_scraper", about = "Employer review scraper driven by a headless browser")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape every target in a scrape config
    Run(RunArgs),
    /// Load and validate a scrape config without starting a browser
    Check {
        /// Config path, or a bare name looked up in the config directory
        config: String,
    },
    /// List available site scrapers
    Sites,
    /// Print the effective settings
    Settings,
}

#[derive(Args)]
struct RunArgs {
    /// Config path, or a bare name looked up in the config directory
    config: String,
    /// Output file name without extension (default: <base>-<timestamp>)
    #[arg(short, long)]
    output: Option<String>,
    /// Abort a target on the first bad block
    #[arg(long, conflicts_with = "lenient")]
    strict: bool,
    /// Skip bad blocks and keep going
    #[arg(long)]
    lenient: bool,
    /// Show the browser window
    #[arg(long)]
    visible: bool,
    /// Verbose Chrome logging
    #[arg(long)]
    browser_logging: bool,
    /// Seconds to wait before each navigation
    #[arg(long)]
    delay: Option<f64>,
    /// Seconds to wait for a page to load or change
    #[arg(long)]
    timeout: Option<u64>,
    /// Append every located raw block to <output>.raw.txt
    #[arg(long)]
    dump_raw: bool,
    /// Add the raw pre-parse fields as an extra column
    #[arg(long)]
    include_raw: bool,
    /// Exit non-zero if any target failed
    #[arg(long)]
    fail_on_error: bool,
}

impl RunArgs {
    fn apply(&self, s: &mut Settings) {
        if self.strict {
            s.data_strict = true;
        }
        if self.lenient {
            s.data_strict = false;
        }
        s.browser_visible |= self.visible;
        s.browser_logging |= self.browser_logging;
        s.dump_raw_data |= self.dump_raw;
        s.include_raw_fields |= self.include_raw;
        s.fail_on_target_error |= self.fail_on_error;
        if let Some(delay) = self.delay {
            s.rate_limit_delay_secs = delay;
        }
        if let Some(timeout) = self.timeout {
            s.timeout_secs = timeout;
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let code = match cli.command {
        Commands::Run(args) => run(args)?,
        Commands::Check { config } => {
            let settings = Settings::load()?;
            let path = targets::resolve_path(&config, &settings.config_directory);
            let cfg = targets::load_config(&path)?;
            println!("{}: scraper {}, {} targets", path.display(), cfg.scraper, cfg.targets.len());
            for t in &cfg.targets {
                println!("  {}: {}", t.name, t.entry_url);
            }
            0
        }
        Commands::Sites => {
            for name in sites::AVAILABLE {
                println!("{}", name);
            }
            0
        }
        Commands::Settings => {
            let settings = Settings::load()?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
            0
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    if code != 0 {
        process::exit(code);
    }
    Ok(())
}

/// Returns the process exit code. Config and settings errors bubble up.
fn run(args: RunArgs) -> anyhow::Result<i32> {
    let mut settings = Settings::load()?;
    args.apply(&mut settings);

    let config_path = targets::resolve_path(&args.config, &settings.config_directory);
    let config = targets::load_config(&config_path)?;
    let scraper = sites::build(&config.scraper)?;

    let name = args.output.clone().unwrap_or_else(|| {
        format!(
            "{}-{}",
            settings.output_name_base,
            Local::now().format("%Y%m%d-%H%M%S")
        )
    });
    let mut sink = CsvOutput::open(
        &settings.output_directory.join(format!("{}.csv", name)),
        settings.include_raw_fields,
    )?;
    let mut dump = if settings.dump_raw_data {
        Some(RawDump::open(
            &settings.output_directory.join(format!("{}.raw.txt", name)),
        )?)
    } else {
        None
    };

    let interrupt = Arc::new(AtomicBool::new(false));
    {
        let flag = Arc::clone(&interrupt);
        ctrlc::set_handler(move || {
            flag.store(true, Ordering::SeqCst);
        })?;
    }

    let opts = RunOptions::from_settings(&settings)?;
    println!(
        "Scraping {} targets with {} ({} mode)...",
        config.targets.len(),
        scraper.name,
        if opts.policy.strict { "strict" } else { "lenient" }
    );

    // The browser lives only for the batch, so it is gone before any exit.
    let summary = {
        let session = BrowserSession::launch(
            settings.browser_visible,
            settings.browser_logging,
            settings.timeout(),
        )?;
        controller::scrape_targets(
            &session,
            &scraper,
            &config.targets,
            &opts,
            &mut sink,
            dump.as_mut(),
            &interrupt,
        )
    }?;

    summary.print();
    println!("Output: {}", sink.path().display());

    if summary.interrupted {
        return Ok(EXIT_INTERRUPTED);
    }
    if settings.fail_on_target_error && !summary.failed.is_empty() {
        return Ok(EXIT_TARGETS_FAILED);
    }
    Ok(0)
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
