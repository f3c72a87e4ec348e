// Copyright 2026 SocialCheck Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use socialcheck::cli::{self, output};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "socialcheck",
    about = "SocialCheck: discover and validate social media links for a list of domains",
    version,
    after_help = "Run 'socialcheck <command> --help' for details on each command."
)]
struct Cli {
    /// Output results as JSON (machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    /// Configuration file (overrides SOCIALCHECK_CONFIG and ./socialcheck.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check domains, scrape them for social links, and validate every link
    Run {
        /// File with one domain per line
        domains: PathBuf,
        /// Report path (default: output_<MM-DD_HH>.csv)
        #[arg(long, short)]
        out: Option<PathBuf>,
        /// Record every source domain of a shared link instead of the first
        #[arg(long)]
        all_sources: bool,
        /// Accept invalid TLS certificates on organization sites
        #[arg(long)]
        insecure: bool,
    },
    /// Check which domains resolve to a reachable page
    Check {
        /// File with one domain per line
        domains: PathBuf,
        /// Output path for reachable URLs (default: checked_urls.txt)
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
    /// Scrape pages for social media links
    Scrape {
        /// File with one URL per line
        urls: PathBuf,
        /// Output CSV (default: social_links.csv)
        #[arg(long, short)]
        out: Option<PathBuf>,
        /// Record every source domain of a shared link instead of the first
        #[arg(long)]
        all_sources: bool,
    },
    /// Validate social links from a file of `source,link` rows or bare links
    Validate {
        /// Links file
        links: PathBuf,
        /// Report path (default: output_<MM-DD_HH>.csv)
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
    /// Check environment and diagnose issues
    Doctor,
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

fn init_tracing(cli: &Cli) {
    let level = if cli.verbose {
        "debug"
    } else if cli.quiet || cli.json {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("socialcheck={level}")));

    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global flags via environment variables so all modules can check them
    if cli.json {
        std::env::set_var(output::JSON_ENV, "1");
    }
    if cli.quiet {
        std::env::set_var(output::QUIET_ENV, "1");
    }
    if cli.verbose {
        std::env::set_var(output::VERBOSE_ENV, "1");
    }
    init_tracing(&cli);

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Run {
            domains,
            out,
            all_sources,
            insecure,
        } => cli::run_cmd::run(config, &domains, out, all_sources, insecure).await,
        Commands::Check { domains, out } => cli::check_cmd::run(config, &domains, out).await,
        Commands::Scrape {
            urls,
            out,
            all_sources,
        } => cli::scrape_cmd::run(config, &urls, out, all_sources).await,
        Commands::Validate { links, out } => cli::validate_cmd::run(config, &links, out).await,
        Commands::Doctor => cli::doctor::run(config).await,
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "socialcheck", &mut std::io::stdout());
            Ok(())
        }
    };

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        if output::is_json() {
            output::print_json(&serde_json::json!({
                "error": true,
                "message": format!("{e:#}"),
            }));
        } else if !output::is_quiet() {
            eprintln!("  Error: {e:#}");
        }
        std::process::exit(1);
    }

    result
}
