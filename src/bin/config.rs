//! Settings CLI
//!
//! Shows, creates and checks the settings used by `schema-fix`.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use skaffold_schema::ToolConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schema-config")]
#[command(about = "Manage skaffold-schema tool settings")]
struct Cli {
    /// Settings file layered over the default locations
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the effective settings
    Show {
        /// Print JSON instead of TOML
        #[arg(long, conflicts_with = "toml")]
        json: bool,
        #[arg(long)]
        toml: bool,
    },

    /// Write a settings file with the default values
    Init {
        #[arg(default_value = "skaffold-schema.toml")]
        output: PathBuf,
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },

    /// Check the effective settings
    Validate,

    /// Print where the per-user settings file is looked up
    Path,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Show { json, .. } => {
            let settings = ToolConfig::load_from(cli.config.as_deref())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&settings)?);
            } else {
                print!("{}", toml::to_string_pretty(&settings)?);
            }
            Ok(())
        }

        Commands::Init { output, force } => {
            if output.exists() && !force {
                bail!("{} already exists (use --force to replace it)", output.display());
            }
            let path = output.to_string_lossy();
            ToolConfig::default().save(&path)?;
            info!(path = %path, "wrote default settings");
            println!("✅ Wrote {}", output.display());
            Ok(())
        }

        Commands::Validate => {
            let settings = ToolConfig::load_from(cli.config.as_deref())?;
            match settings.validate() {
                Ok(()) => {
                    println!("✅ Settings are valid");
                    Ok(())
                }
                Err(reason) => {
                    println!("❌ Settings are invalid");
                    println!("   └─ {}", reason);
                    bail!("invalid settings");
                }
            }
        }

        Commands::Path => {
            match ToolConfig::user_config_path() {
                Some(path) => println!("{}", path.display()),
                None => bail!("no home directory to hold user settings"),
            }
            Ok(())
        }
    }
}
