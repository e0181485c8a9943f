//! Orchestrator: resolve → fetch → scan → render → cleanup.
//!
//! The top-level [`ingest`] either returns all three rendered outputs or one
//! typed error; there is no partial success. Temporary clones are removed at
//! the very end whether the run succeeded or failed.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::fs;
use tracing::{info, warn};

use crate::error::IngestError;
use crate::fetch::{Fetcher, GitCli};
use crate::limiter::Limiter;
use crate::overrides;
use crate::patterns::PatternInput;
use crate::render::{render_content, render_summary, render_tree};
use crate::resolve::{parse_source, IngestQuery, ResourceKind, DEFAULT_MAX_FILE_SIZE};
use crate::scan::{self, Node, NON_TEXT_SENTINEL};

/// Options for one top-level ingestion run.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub max_file_size: u64,
    /// Force remote interpretation of the source string.
    pub from_web: bool,
    pub include_patterns: Option<PatternInput>,
    pub exclude_patterns: Option<PatternInput>,
    /// Overrides any branch resolved from the source string.
    pub branch: Option<String>,
    /// When set, `{tree}\n{content}` is written here.
    pub output: Option<PathBuf>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            from_web: false,
            include_patterns: None,
            exclude_patterns: None,
            branch: None,
            output: None,
        }
    }
}

/// The three rendered outputs of one ingestion.
#[derive(Debug, Clone, Serialize)]
pub struct Digest {
    pub summary: String,
    pub tree: String,
    pub content: String,
}

/// Ingest `source` with the production git/HTTP fetcher.
pub async fn ingest(source: &str, options: IngestOptions) -> Result<Digest, IngestError> {
    let limiter = Limiter::default();
    let fetcher = GitCli::new(limiter.clone());
    ingest_with(source, options, &fetcher, &limiter).await
}

/// Same as [`ingest`], with a caller-supplied fetcher and limiter. This is
/// the seam tests and embedders use.
pub async fn ingest_with(
    source: &str,
    options: IngestOptions,
    fetcher: &dyn Fetcher,
    limiter: &Limiter,
) -> Result<Digest, IngestError> {
    let mut query = parse_source(
        source,
        options.max_file_size,
        options.from_web,
        options.include_patterns.as_ref(),
        options.exclude_patterns.as_ref(),
        fetcher,
    )
    .await?;
    if let Some(branch) = &options.branch {
        query.branch = Some(branch.clone());
    }

    let result = fetch_and_ingest(&mut query, fetcher, limiter).await;
    if query.is_remote() {
        // Guaranteed release of the temp clone, success or failure.
        cleanup_clone(&query, limiter).await;
    }
    let digest = result?;

    if let Some(path) = &options.output {
        let rendered = format!("{}\n{}", digest.tree, digest.content);
        limiter.run(fs::write(path, rendered)).await?;
        info!(path = %path.display(), "wrote digest");
    }
    Ok(digest)
}

async fn fetch_and_ingest(
    query: &mut IngestQuery,
    fetcher: &dyn Fetcher,
    limiter: &Limiter,
) -> Result<Digest, IngestError> {
    if let Some(clone_config) = query.clone_config() {
        fetcher.clone_repo(&clone_config).await?;
    }
    ingest_query(query, limiter).await
}

/// Produce the digest for an already-materialized query target.
pub async fn ingest_query(
    query: &mut IngestQuery,
    limiter: &Limiter,
) -> Result<Digest, IngestError> {
    let target = query.target_path();
    let meta = limiter.run(fs::metadata(&target)).await?;

    if query.kind == Some(ResourceKind::Blob) || meta.is_file() {
        return ingest_single_file(&target, meta.len(), query, limiter).await;
    }

    apply_overrides(query, &target, limiter).await;
    let root = scan::scan(query, limiter).await?;
    info!(slug = %query.slug, files = root.file_count, dirs = root.dir_count, "scan complete");
    Ok(Digest {
        summary: render_summary(query, root.file_count),
        tree: render_tree(&root),
        content: render_content(&root, query),
    })
}

async fn ingest_single_file(
    path: &Path,
    size: u64,
    query: &IngestQuery,
    limiter: &Limiter,
) -> Result<Digest, IngestError> {
    if !limiter.run(scan::is_text_file(path)).await {
        return Err(IngestError::NotATextFile(path.to_path_buf()));
    }
    let content = if size > query.max_file_size {
        NON_TEXT_SENTINEL.to_string()
    } else {
        limiter.run(fs::read_to_string(path)).await?
    };
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned());
    let node = Node::file(name, path.to_path_buf(), size, content);
    Ok(Digest {
        summary: render_summary(query, 1),
        tree: render_tree(&node),
        content: render_content(&node, query),
    })
}

/// Merge `.gitingest` ignore overrides into the query before scanning.
async fn apply_overrides(query: &mut IngestQuery, target: &Path, limiter: &Limiter) {
    // The override file itself never lands in the digest.
    let _ = query.ignore_patterns.insert(overrides::OVERRIDE_FILE_NAME);
    for pattern in overrides::load_ignore_overrides(target, limiter).await {
        if let Err(e) = query.ignore_patterns.insert(&pattern) {
            warn!(pattern = %pattern, error = %e, "skipping invalid override pattern");
        }
    }
}

async fn cleanup_clone(query: &IngestQuery, limiter: &Limiter) {
    // local_path is {temp_root}/{id}/{slug}; drop the whole session directory.
    let Some(session_dir) = query.local_path.parent() else {
        return;
    };
    match limiter.run(fs::remove_dir_all(session_dir)).await {
        Ok(()) => info!(path = %session_dir.display(), "removed temporary clone"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            warn!(path = %session_dir.display(), error = %e, "could not remove temporary clone")
        }
    }
}
