//! `coder`: teach a model a source tree and let it code, review or map it.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use coder::exit_codes;
use coder::io::backend::OpenAiChatBackend;
use coder::io::config::{CoderConfig, default_config_path, load_config, write_config};
use coder::io::snapshot::{SnapshotOptions, include_names_from_glob, read_snapshot};
use coder::session::{
    FeatureRequest, ReviewRequest, discover_dependencies, run_feature_session, run_review_session,
};

#[derive(Parser)]
#[command(
    name = "coder",
    version,
    about = "Teach a model a repository and apply the changes it proposes"
)]
struct Cli {
    /// Config file (defaults to `<repo>/.coder/config.toml`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Repository root.
    #[arg(long, global = true, default_value = ".")]
    repo: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default `.coder/config.toml`.
    Init {
        /// Overwrite an existing config.
        #[arg(short, long)]
        force: bool,
    },
    /// List the files a session would teach the model.
    Snapshot {
        /// Only read files with these base names (comma separated).
        #[arg(long, value_delimiter = ',')]
        include: Vec<String>,
        /// Add the base names of files matching this glob (relative to the repo).
        #[arg(long)]
        include_glob: Option<String>,
    },
    /// Implement a feature and write the resulting changes.
    Code {
        /// Natural-language description of the feature.
        #[arg(long)]
        task: String,
        #[arg(long, value_delimiter = ',')]
        include: Vec<String>,
        #[arg(long)]
        include_glob: Option<String>,
        /// Print the proposed actions instead of applying them.
        #[arg(long)]
        dry_run: bool,
    },
    /// Review every file and write findings under the review output dir.
    Review {
        #[arg(long, value_delimiter = ',')]
        include: Vec<String>,
        #[arg(long)]
        include_glob: Option<String>,
    },
    /// Print the in-repository dependencies of one file as JSON.
    Deps {
        #[arg(long)]
        file: PathBuf,
    },
}

fn main() {
    coder::logging::init();
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        std::process::exit(exit_codes::for_error(&err));
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| default_config_path(&cli.repo));
    match cli.command {
        Command::Init { force } => cmd_init(&config_path, force),
        Command::Snapshot {
            include,
            include_glob,
        } => {
            let cfg = load_config(&config_path)?;
            let include = resolve_include(&cli.repo, include, include_glob.as_deref())?;
            cmd_snapshot(&cfg, &cli.repo, include)
        }
        Command::Code {
            task,
            include,
            include_glob,
            dry_run,
        } => {
            let cfg = load_config(&config_path)?;
            let include = resolve_include(&cli.repo, include, include_glob.as_deref())?;
            let backend = OpenAiChatBackend::from_env(&cfg.model)?;
            let request = FeatureRequest {
                repo_root: cli.repo,
                task,
                include,
                dry_run,
            };
            let outcome = run_feature_session(&backend, &cfg, &request)?;
            if let Some(applied) = outcome.applied {
                println!(
                    "applied {} actions ({} created, {} updated, {} deleted) from {} taught files",
                    applied.total(),
                    applied.created,
                    applied.updated,
                    applied.deleted,
                    outcome.files_taught
                );
            } else {
                let payload =
                    serde_json::to_string_pretty(&outcome.actions).context("serialize actions")?;
                println!("{payload}");
            }
            Ok(())
        }
        Command::Review {
            include,
            include_glob,
        } => {
            let cfg = load_config(&config_path)?;
            let include = resolve_include(&cli.repo, include, include_glob.as_deref())?;
            let backend = OpenAiChatBackend::from_env(&cfg.model)?;
            let request = ReviewRequest {
                repo_root: cli.repo,
                include,
            };
            for review in run_review_session(&backend, &cfg, &request)? {
                match review.report_path {
                    Some(path) => println!(
                        "{}: {} issues -> {}",
                        review.file_path.display(),
                        review.findings.len(),
                        path.display()
                    ),
                    None => println!("{}: no issues", review.file_path.display()),
                }
            }
            Ok(())
        }
        Command::Deps { file } => {
            let cfg = load_config(&config_path)?;
            let backend = OpenAiChatBackend::from_env(&cfg.model)?;
            let deps = discover_dependencies(&backend, &cfg, &cli.repo, &file)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&deps).context("serialize dependencies")?
            );
            Ok(())
        }
    }
}

fn cmd_init(config_path: &Path, force: bool) -> Result<()> {
    if config_path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        );
    }
    write_config(config_path, &CoderConfig::default())?;
    println!("wrote {}", config_path.display());
    Ok(())
}

fn cmd_snapshot(cfg: &CoderConfig, repo: &Path, include: Option<Vec<String>>) -> Result<()> {
    let options = SnapshotOptions::new(cfg.snapshot.excluded_dirs.clone()).with_include(include);
    let snapshot = read_snapshot(repo, &options)?;
    for (path, content) in snapshot.iter() {
        println!("{}\t{}", content.len(), path.display());
    }
    println!("{} files", snapshot.len());
    Ok(())
}

/// Trim names and drop empties; an empty list means "no allow-list".
fn include_list(names: Vec<String>) -> Option<Vec<String>> {
    let names: Vec<String> = names
        .into_iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect();
    (!names.is_empty()).then_some(names)
}

/// Merge `--include` names with the base names matched by `--include-glob`.
fn resolve_include(
    repo: &Path,
    names: Vec<String>,
    glob: Option<&str>,
) -> Result<Option<Vec<String>>> {
    let mut names = include_list(names).unwrap_or_default();
    if let Some(pattern) = glob {
        for name in include_names_from_glob(repo, pattern)? {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    Ok((!names.is_empty()).then_some(names))
}
