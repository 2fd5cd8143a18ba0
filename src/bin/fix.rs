//! Config Fixer CLI
//!
//! Detects, inspects and upgrades skaffold.yaml files.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use similar::TextDiff;
use skaffold_schema::parse::STDIN;
use skaffold_schema::{
    check_compatibility, decode_all, is_skaffold_config, marshal, parse_and_upgrade_str,
    parse_config, parse_config_and_upgrade, read_input, resolve_common_version, upgrade_to,
    Checksum, Lineage, SchemaError, SchemaRegistry, ToolConfig,
};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "schema-fix")]
#[command(about = "Inspect and upgrade skaffold configuration files")]
struct Cli {
    /// Settings file layered over the default locations
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that a file holds valid configuration documents
    Check {
        /// Config file, or "-" for stdin
        file: Option<PathBuf>,
    },

    /// Print the documents fully upgraded
    Show {
        file: Option<PathBuf>,
        /// Print JSON instead of YAML
        #[arg(long)]
        json: bool,
    },

    /// Upgrade a file to the newest version of its lineage, or to --version
    Upgrade {
        file: Option<PathBuf>,
        /// Stop at this version instead of the lineage's newest
        #[arg(short, long)]
        version: Option<String>,
        /// Write the result back to the file
        #[arg(long)]
        overwrite: bool,
        /// Print a unified diff of the changes
        #[arg(long)]
        diff: bool,
    },

    /// Check whether a file can be upgraded to a version
    Compat {
        file: Option<PathBuf>,
        #[arg(short, long)]
        version: String,
    },

    /// List every known schema version
    Versions,

    /// Find config files under a directory and report their versions
    Scan {
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let settings = match ToolConfig::load_from(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: could not load settings: {}", e);
            std::process::exit(1);
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli.command, &settings) {
        eprintln!("Error: {}", e);
        if let Some(hint) = e.downcast_ref::<SchemaError>().and_then(SchemaError::hint) {
            eprintln!("  └─ {}", hint);
        }
        std::process::exit(1);
    }
}

fn run(command: Commands, settings: &ToolConfig) -> Result<()> {
    let registry = SchemaRegistry::builtin();
    let input =
        |file: Option<PathBuf>| file.unwrap_or_else(|| settings.parse.default_filename.clone());

    match command {
        Commands::Check { file } => {
            let path = input(file);
            if is_skaffold_config(&registry, &path) {
                let batch = parse_config(&registry, &path)?;
                println!("✅ {} - {} document(s)", path.display(), batch.len());
                for config in &batch {
                    println!("   └─ {}", config.version());
                }
                return Ok(());
            }

            println!("❌ {} is not a skaffold config", path.display());
            // Decoding again gives the reason, when there is one.
            parse_config(&registry, &path)?;
            bail!("{} has no configuration documents", path.display());
        }

        Commands::Show { file, json } => {
            let path = input(file);
            let batch = parse_config_and_upgrade(&registry, &path)?;
            if json {
                let documents = batch
                    .iter()
                    .map(|config| config.to_json())
                    .collect::<serde_json::Result<Vec<_>>>()?;
                println!("{}", serde_json::to_string_pretty(&documents)?);
            } else {
                print!("{}", marshal(&batch)?);
            }
            Ok(())
        }

        Commands::Upgrade {
            file,
            version,
            overwrite,
            diff,
        } => {
            let path = input(file);
            let original = read_input(&path)?;
            let before = decode_all(&registry, &original)?;
            if before.is_empty() {
                bail!("{} has no configuration documents", path.display());
            }

            let upgraded = match &version {
                Some(target) => upgrade_to(&registry, &before, target)?,
                None => parse_and_upgrade_str(&registry, &original)?,
            };

            let output = marshal(&upgraded)?;
            let checksum = Checksum::of_documents(&output);
            let unchanged = before
                .iter()
                .zip(&upgraded)
                .all(|(old, new)| old.version() == new.version());
            if unchanged || checksum == Checksum::of_documents(&original) {
                debug!(%checksum, "upgrade left the documents as they were");
                println!("✅ {} is up to date", path.display());
                return Ok(());
            }

            let overwrite = overwrite || settings.fix.overwrite;
            if diff || (settings.fix.show_diff && overwrite) {
                print_diff(&path, &original, &output);
            }

            if overwrite {
                if path.as_os_str() == STDIN {
                    bail!("cannot overwrite stdin");
                }
                std::fs::write(&path, &output)
                    .with_context(|| format!("writing {}", path.display()))?;
                println!(
                    "📦 {} upgraded to {} ({})",
                    path.display(),
                    upgraded[0].version(),
                    checksum.short()
                );
            } else if !diff {
                print!("{}", output);
            }
            Ok(())
        }

        Commands::Compat { file, version } => {
            let path = input(file);
            let batch = parse_config(&registry, &path)?;
            println!("🔍 Checking {} against {}", path.display(), version);

            let report = check_compatibility(&registry, &batch, &version)?;
            for v in &report.lineage_mismatch {
                println!("   └─ {} is in another lineage than {}", v, report.lineage);
            }
            for v in &report.too_new {
                println!("   └─ {} is newer than {}", v, version);
            }

            if report.is_compatible() {
                println!("✅ Compatible with {}", version);
            } else {
                println!("❌ Not compatible with {}", version);
            }
            Ok(report.into_result()?)
        }

        Commands::Versions => {
            for lineage in Lineage::ALL {
                println!("📦 Lineage {}", lineage);
                for entry in registry.all_versions_of(lineage) {
                    let marker = if entry.api_version == registry.latest() {
                        " (latest)"
                    } else if registry.is_terminal(entry.api_version) {
                        " (final)"
                    } else {
                        ""
                    };
                    println!("   └─ {}{}", entry.api_version, marker);
                }
            }
            Ok(())
        }

        Commands::Scan { dir } => scan(&registry, &dir, settings),
    }
}

fn print_diff(path: &Path, original: &str, output: &str) {
    let diff = TextDiff::from_lines(original, output);
    let name = path.display().to_string();
    print!(
        "{}",
        diff.unified_diff()
            .context_radius(3)
            .header(&name, &format!("{} (upgraded)", name))
    );
}

fn scan(registry: &SchemaRegistry, dir: &Path, settings: &ToolConfig) -> Result<()> {
    println!("🔍 Scanning {}", dir.display());

    let walker = WalkDir::new(dir)
        .max_depth(settings.scan.max_depth)
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || !settings
                    .scan
                    .skip_dirs
                    .iter()
                    .any(|skip| entry.file_name().to_string_lossy() == skip.as_str())
        });

    let mut found = 0;
    let mut outdated = 0;
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        let path = entry.path();
        let is_yaml = path
            .extension()
            .is_some_and(|ext| ext == "yaml" || ext == "yml");
        if !entry.file_type().is_file() || !is_yaml || !is_skaffold_config(registry, path) {
            continue;
        }

        found += 1;
        let batch = match parse_config(registry, path) {
            Ok(batch) => batch,
            Err(e) => {
                outdated += 1;
                println!("❌ {} - {}", path.display(), e);
                continue;
            }
        };
        let versions: Vec<&str> = batch.iter().map(|config| config.version()).collect();
        match resolve_common_version(registry, &batch) {
            Ok(target) if versions.iter().all(|v| *v == target) => {
                println!("✅ {} - {}", path.display(), versions.join(", "));
            }
            Ok(target) => {
                outdated += 1;
                println!(
                    "📦 {} - {} (upgradable to {})",
                    path.display(),
                    versions.join(", "),
                    target
                );
            }
            Err(e) => {
                outdated += 1;
                println!("❌ {} - {}", path.display(), e);
            }
        }
    }

    println!();
    println!("{} config file(s), {} need attention", found, outdated);
    Ok(())
}
