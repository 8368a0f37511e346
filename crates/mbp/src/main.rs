//! MegaBrain Parser CLI.
//!
//! `mbp parse` walks files or directories and prints semantic chunks;
//! `mbp grammars` administers the grammar cache (stats, versions, cleanup,
//! rollback).

use anyhow::Result;
use clap::{Parser, Subcommand};
use mbp_domain::Chunk;
use mbp_grammars::GrammarManager;
use mbp_grammars::manager::DEFAULT_CLEANUP_KEEP;
use mbp_parsers::ParserRegistry;
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "mbp", about = "Structure-aware multi-language source parser")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse files or directories into semantic chunks
    Parse {
        /// Files or directories to parse
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Emit chunks as JSON lines instead of a summary table
        #[arg(long)]
        json: bool,
    },
    /// Grammar cache administration
    Grammars {
        #[command(subcommand)]
        command: GrammarCommand,
    },
}

#[derive(Subcommand)]
enum GrammarCommand {
    /// Aggregate cache statistics
    Stats,
    /// Cached versions and load history for a language
    Versions { language: String },
    /// Remove old cached versions
    Cleanup {
        /// Versions to keep per language
        #[arg(long, default_value_t = DEFAULT_CLEANUP_KEEP)]
        keep: usize,
        /// Restrict cleanup to one language
        #[arg(long)]
        language: Option<String>,
    },
    /// Roll a language back to a cached version
    Rollback {
        language: String,
        /// Target version; defaults to the previous working version
        #[arg(long)]
        version: Option<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Parse { paths, json } => parse_paths(&paths, json),
        Command::Grammars { command } => run_grammar_command(command),
    }
}

fn parse_paths(paths: &[PathBuf], json: bool) -> Result<()> {
    let manager = Arc::new(GrammarManager::new());
    let registry = ParserRegistry::with_default_parsers(&manager);

    let files: Vec<PathBuf> = paths
        .iter()
        .flat_map(|path| {
            WalkDir::new(path)
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file())
                .map(|entry| entry.into_path())
                .collect::<Vec<_>>()
        })
        .collect();

    info!(files = files.len(), "parsing input set");

    let chunks: Vec<Chunk> = files
        .par_iter()
        .flat_map(|file| match registry.parse(file) {
            Ok(chunks) => chunks,
            Err(err) => {
                warn!(path = %file.display(), error = %err, "skipping file");
                Vec::new()
            }
        })
        .collect();

    if json {
        use std::io::Write;
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        for chunk in &chunks {
            serde_json::to_writer(&mut out, chunk)?;
            writeln!(out)?;
        }
    } else {
        for chunk in &chunks {
            println!(
                "{:10} {:12} {}:{}-{} {}",
                chunk.language,
                chunk.entity_type,
                chunk.source_file,
                chunk.start_line,
                chunk.end_line,
                chunk.entity_name
            );
        }
        println!("{} chunks from {} files", chunks.len(), files.len());
    }
    Ok(())
}

fn run_grammar_command(command: GrammarCommand) -> Result<()> {
    let manager = GrammarManager::new();
    match command {
        GrammarCommand::Stats => {
            let stats = manager.cache_stats();
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        GrammarCommand::Versions { language } => {
            let versions = manager.get_cached_versions(&language);
            println!("cached versions for {language}: {versions:?}");
            if let Some(info) = manager.get_version_info(&language, None) {
                println!("newest: {}", serde_json::to_string(&info)?);
            }
            for entry in manager.get_version_history(&language) {
                let status = if entry.success { "ok" } else { "failed" };
                println!(
                    "{} {} {} {}",
                    entry.timestamp.to_rfc3339(),
                    entry.version,
                    status,
                    entry.error_message.unwrap_or_default()
                );
            }
        }
        GrammarCommand::Cleanup { keep, language } => {
            let removed = match language {
                Some(language) => manager.cleanup_old_versions(&language, keep)?,
                None => manager.cleanup_all_old_versions(keep)?,
            };
            println!("removed {removed} cached grammar versions");
        }
        GrammarCommand::Rollback { language, version } => {
            let result = match version {
                Some(version) => manager.rollback_to_version(&language, &version),
                None => manager.rollback_to_previous(&language),
            };
            println!("{}", serde_json::to_string_pretty(&result)?);
            if !result.success {
                anyhow::bail!(
                    "rollback failed: {}",
                    result.error_message.unwrap_or_default()
                );
            }
        }
    }
    Ok(())
}
