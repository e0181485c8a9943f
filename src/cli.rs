use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::ingest::{ingest, IngestOptions};
use crate::patterns::PatternInput;
use crate::resolve::DEFAULT_MAX_FILE_SIZE;

/// CLI for llm-ingest: flatten a repository into a prompt-ready digest.
#[derive(Parser)]
#[clap(
    name = "llm-ingest",
    version,
    about = "Flatten a Git repository into a single prompt-ready text digest"
)]
pub struct Cli {
    /// Repository URL, host/owner/repo shorthand, or local directory
    pub source: String,

    /// Write the digest (tree plus file contents) to this file
    #[clap(short, long)]
    pub output: Option<PathBuf>,

    /// Maximum size of a single file to ingest, in bytes
    #[clap(short = 's', long, default_value_t = DEFAULT_MAX_FILE_SIZE)]
    pub max_file_size: u64,

    /// Only ingest paths matching these patterns (comma or space separated)
    #[clap(short, long)]
    pub include_pattern: Option<String>,

    /// Exclude paths matching these patterns, on top of the default excludes
    #[clap(short, long)]
    pub exclude_pattern: Option<String>,

    /// Branch to ingest, overriding any branch in the source URL
    #[clap(short, long)]
    pub branch: Option<String>,

    /// Treat the source as a remote repository even without a URL scheme
    #[clap(long)]
    pub from_web: bool,
}

/// Extracted async CLI logic entrypoint for integration tests and main().
pub async fn run(cli: Cli) -> Result<()> {
    let options = IngestOptions {
        max_file_size: cli.max_file_size,
        from_web: cli.from_web,
        include_patterns: cli.include_pattern.map(PatternInput::Raw),
        exclude_patterns: cli.exclude_pattern.map(PatternInput::Raw),
        branch: cli.branch,
        output: cli.output.clone(),
    };
    let digest = ingest(&cli.source, options).await?;

    println!("{}", digest.summary);
    if let Some(output) = &cli.output {
        println!("Digest written to {}", output.display());
    } else {
        println!("{}", digest.tree);
    }
    Ok(())
}
