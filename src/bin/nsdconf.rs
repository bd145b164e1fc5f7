use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nsdconf::{
    Plan,
    deploy::{FileContent, LocalWriter},
    load_manifest,
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, rename_all = "kebab-case")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a manifest without writing anything
    Check {
        /// Path to the JSON manifest
        #[arg(value_name = "MANIFEST")]
        manifest: PathBuf,
    },
    /// Validate a manifest and write every file it declares
    Render {
        /// Path to the JSON manifest
        #[arg(value_name = "MANIFEST")]
        manifest: PathBuf,
        /// Directory that absolute destinations are placed under
        #[arg(long, value_name = "DIR", default_value = "/")]
        root: PathBuf,
        /// Change owner and group of written files (needs root)
        #[arg(long)]
        apply_ownership: bool,
        /// Print rendered files instead of writing them
        #[arg(long)]
        dry_run: bool,
    },
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Command::Check { manifest } => {
            let plan = build_plan(&manifest)?;
            info!("{} is valid ({} files)", manifest.display(), plan.files.len());
        }
        Command::Render {
            manifest,
            root,
            apply_ownership,
            dry_run,
        } => {
            let plan = build_plan(&manifest)?;
            if dry_run {
                print_plan(&plan);
                return Ok(());
            }
            let writer = LocalWriter::new(&root).with_ownership(apply_ownership);
            plan.deploy(&writer)
                .with_context(|| format!("failed to deploy under {}", root.display()))?;
        }
    }

    Ok(())
}

fn build_plan(path: &Path) -> Result<Plan> {
    let manifest = load_manifest(path)
        .with_context(|| format!("failed to load manifest {}", path.display()))?;
    let plan = Plan::build(&manifest).context("configuration rejected")?;
    Ok(plan)
}

fn print_plan(plan: &Plan) {
    for file in &plan.files {
        println!(
            "==> {} (mode {:04o}, owner {}:{})",
            file.path.display(),
            file.mode,
            file.owner,
            file.group
        );
        match &file.content {
            FileContent::Inline(text) => print!("{text}"),
            FileContent::Source(location) => println!("<copied from {location}>"),
        }
        println!();
    }
}

fn init_tracing() {
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}
