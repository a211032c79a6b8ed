//! Kubefold CLI
//!
//! Converts compose projects into Kubernetes manifests whose config and
//! credential files come from ConfigMaps and Secrets.

mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use kubefold_engine::EngineConfig;
use output::OutputFormat;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file (defaults to KUBEFOLD_CONFIG, ./kubefold.toml, ~/.config/kubefold/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format (table, json, yaml)
    #[arg(short, long, global = true, default_value = "table")]
    output: String,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Compose converter binary
    #[arg(long, global = true)]
    kompose_bin: Option<String>,

    /// Cluster CLI binary used to render ConfigMaps and Secrets
    #[arg(long, global = true)]
    kubectl_bin: Option<String>,

    /// Output directory name inside each compose folder
    #[arg(long, global = true)]
    output_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert every compose folder under a root directory
    Convert {
        /// Root directory to search
        #[arg(default_value = ".")]
        root: PathBuf,
        /// Report what would change without running tools or writing files
        #[arg(long)]
        dry_run: bool,
    },
    /// Rewrite the pod manifests of an existing output directory
    Rewrite {
        /// Directory holding the generated manifests
        dir: PathBuf,
        /// Report what would change without writing files
        #[arg(long)]
        dry_run: bool,
    },
    /// Show how file names are classified
    Classify {
        /// File names or paths
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Print a sample configuration file
    Config {
        /// Print the effective configuration instead
        #[arg(long)]
        show: bool,
    },
    /// Generate shell completions
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let format = OutputFormat::from_str(&cli.output);

    match &cli.command {
        Commands::Completions { shell } => {
            generate_completions(*shell);
            return Ok(ExitCode::SUCCESS);
        }
        Commands::Config { show: false } => {
            print!("{}", EngineConfig::generate_sample());
            return Ok(ExitCode::SUCCESS);
        }
        _ => {}
    }

    let overrides = config::Overrides {
        kompose_bin: cli.kompose_bin.clone(),
        kubectl_bin: cli.kubectl_bin.clone(),
        output_dir: cli.output_dir.clone(),
        verbose: cli.verbose,
    };
    let engine_config = config::load(cli.config.as_deref(), &overrides)?;

    // Held until exit so the file writer flushes
    let _log_guard = engine_config
        .logging
        .init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;
    tracing::debug!("Output format: {:?}", format);

    let failures = match cli.command {
        Commands::Convert { root, dry_run } => {
            commands::convert::handle_convert_command(&root, dry_run, engine_config, format).await?
        }
        Commands::Rewrite { dir, dry_run } => {
            commands::rewrite::handle_rewrite_command(&dir, dry_run, &engine_config, format)?
        }
        Commands::Classify { names } => {
            commands::classify::handle_classify_command(&names, &engine_config.classification, format)?;
            0
        }
        Commands::Config { .. } => {
            output::print_single(&engine_config, format)?;
            0
        }
        Commands::Completions { .. } => 0,
    };

    Ok(if failures > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// Generate shell completions
fn generate_completions(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();

    generate(shell, &mut cmd, name, &mut io::stdout());
}
