use clap::{CommandFactory, Parser, Subcommand};
use commands::image::handlers;
use libimageq::ImageQuery;
use libimageq::config::OutputFormat;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod commands;
mod context;
mod format;

/// imageq - Container Image Metadata Explorer
///
/// Resolves container image references against Docker Hub, GHCR, GCR, ECR
/// Public, ACR, Quay and custom registries, and reports tags, sizes, dates
/// and descriptions.
#[derive(Parser, Debug)]
#[command(name = "imageq")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Configuration file (defaults to <config dir>/imageq/config.yaml)
    #[arg(short, long, global = true, env = "IMAGEQ_CONFIG")]
    config: Option<PathBuf>,

    /// Output format: pretty, json, yaml
    #[arg(short, long, global = true)]
    format: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show aggregated information about an image
    Show {
        /// Image reference (e.g. nginx, bitnami/redis:7.2, ghcr.io/org/app:v1)
        image: String,
    },
    /// List the tags of an image, newest version first
    #[command(visible_alias = "versions")]
    Tags {
        /// Image reference
        image: String,
        /// Show only tags that parse as semantic versions
        #[arg(long)]
        semver: bool,
        /// Limit number of results
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print the highest semantically versioned tag
    Latest {
        /// Image reference
        image: String,
    },
    /// Print the web page of the repository
    Browse {
        /// Image reference
        image: String,
    },
    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completion for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn run(cli: Cli) -> Result<(), String> {
    // Precedence: defaults > config file > env vars > CLI flags
    let connect = || -> Result<(OutputFormat, ImageQuery), String> {
        let ctx = context::AppContext::build(cli.config.as_deref(), cli.format.as_deref())
            .map_err(|e| e.to_string())?;
        let query = ctx.query().map_err(|e| e.to_string())?;
        Ok((ctx.format, query))
    };

    let output = match &cli.command {
        Commands::Show { image } => {
            let (format, mut query) = connect()?;
            handlers::show(&mut query, image, format)?
        }
        Commands::Tags {
            image,
            semver,
            limit,
        } => {
            let (format, query) = connect()?;
            handlers::tags(&query, image, *semver, *limit, format)?
        }
        Commands::Latest { image } => {
            let (format, query) = connect()?;
            handlers::latest(&query, image, format)?
        }
        Commands::Browse { image } => {
            let (format, query) = connect()?;
            handlers::browse(&query, image, format)?
        }
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let bin_name = cmd.get_name().to_string();
            clap_complete::generate(*shell, &mut cmd, bin_name, &mut std::io::stdout());
            return Ok(());
        }
    };

    for warning in &output.warnings {
        format::warning(warning);
    }
    println!("{}", output.text);
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(message) = run(cli) {
        format::error(&message);
        std::process::exit(1);
    }
}
