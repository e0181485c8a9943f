//! Directory scanner: concurrent, bounded filesystem traversal producing a
//! [`Node`] tree.
//!
//! Children of one directory are processed concurrently through the shared
//! [`Limiter`]; determinism comes from the post-hoc sort, never from task
//! order. Per-item failures (unreadable file, broken symlink, unlistable
//! directory) drop the item and nothing else. Ceiling breaches on file count
//! or total bytes are fatal for the whole scan: there is no silently
//! truncated partial success.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use futures::future::{try_join_all, BoxFuture};
use tokio::fs;
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

use crate::error::IngestError;
use crate::limiter::Limiter;
use crate::resolve::IngestQuery;

/// Subtrees deeper than this yield nothing.
pub const MAX_DIRECTORY_DEPTH: u64 = 20;
/// Ceiling on the number of files one scan may visit.
pub const MAX_FILES: u64 = 10_000;
/// Ceiling on the cumulative size of visited files (500 MiB).
pub const MAX_TOTAL_SIZE_BYTES: u64 = 500 * 1024 * 1024;

/// Placeholder stored instead of content for binary, oversized or unreadable
/// files.
pub const NON_TEXT_SENTINEL: &str = "[Non-text file]";

/// Sample window for the binary sniff.
const TEXT_SAMPLE_BYTES: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Directory,
}

/// One filesystem entry in the produced tree. Built bottom-up during the
/// scan, immutable once returned.
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub kind: NodeKind,
    pub size: u64,
    pub path: PathBuf,
    pub children: Vec<Node>,
    /// File content; [`NON_TEXT_SENTINEL`] when intentionally not captured.
    pub content: Option<String>,
    /// Files in the (filtered) subtree; directories only.
    pub file_count: u64,
    /// Directories in the (filtered) subtree; directories only.
    pub dir_count: u64,
    /// Set when include filtering dropped at least one direct child file.
    pub content_suppressed: bool,
}

impl Node {
    pub(crate) fn directory(name: String, path: PathBuf) -> Self {
        Self {
            name,
            kind: NodeKind::Directory,
            size: 0,
            path,
            children: Vec::new(),
            content: None,
            file_count: 0,
            dir_count: 0,
            content_suppressed: false,
        }
    }

    pub(crate) fn file(name: String, path: PathBuf, size: u64, content: String) -> Self {
        Self {
            name,
            kind: NodeKind::File,
            size,
            path,
            children: Vec::new(),
            content: Some(content),
            file_count: 0,
            dir_count: 0,
            content_suppressed: false,
        }
    }

    pub fn is_hidden(&self) -> bool {
        self.name.starts_with('.')
    }
}

/// Mutable scan counters, shared across all concurrently issued child tasks.
#[derive(Debug, Default)]
struct ScanStats {
    total_files: AtomicU64,
    total_bytes: AtomicU64,
}

#[derive(Debug, Clone, Copy)]
struct ScanLimits {
    max_files: u64,
    max_total_bytes: u64,
}

impl Default for ScanLimits {
    fn default() -> Self {
        Self {
            max_files: MAX_FILES,
            max_total_bytes: MAX_TOTAL_SIZE_BYTES,
        }
    }
}

enum ChildOutcome {
    Keep(Node),
    /// Include filtering dropped a direct child file.
    Suppressed,
    Skip,
}

/// Scan the query's target subtree into a node tree.
pub async fn scan(query: &IngestQuery, limiter: &Limiter) -> Result<Node, IngestError> {
    let root = query.target_path();
    let root_canonical = limiter.run(fs::canonicalize(&root)).await?;
    let scanner = Scanner {
        query,
        root: root.clone(),
        root_canonical,
        limiter: limiter.clone(),
        stats: ScanStats::default(),
        limits: ScanLimits::default(),
        seen: Mutex::new(HashSet::new()),
    };
    let name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| query.slug.clone());
    let node = scanner.scan_dir(root.clone(), 0).await?;
    Ok(node.unwrap_or_else(|| Node::directory(name, root)))
}

struct Scanner<'a> {
    query: &'a IngestQuery,
    root: PathBuf,
    root_canonical: PathBuf,
    limiter: Limiter,
    stats: ScanStats,
    limits: ScanLimits,
    /// Canonicalized paths already visited; re-entrant symlinks and repeated
    /// hardlink targets yield nothing on later visits.
    seen: Mutex<HashSet<PathBuf>>,
}

impl Scanner<'_> {
    fn scan_dir(&self, dir: PathBuf, depth: u64) -> BoxFuture<'_, Result<Option<Node>, IngestError>> {
        Box::pin(async move {
            if depth > MAX_DIRECTORY_DEPTH {
                warn!(path = %dir.display(), depth = depth, "depth cap reached, skipping subtree");
                return Ok(None);
            }
            if self.limits_reached() {
                return Ok(None);
            }
            let canonical = match self.limiter.run(fs::canonicalize(&dir)).await {
                Ok(canonical) => canonical,
                Err(_) => return Ok(None),
            };
            if !self.mark_seen(canonical) {
                return Ok(None);
            }

            let name = dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| dir.to_string_lossy().into_owned());
            let mut node = Node::directory(name, dir.clone());

            let entries = match self.list_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(path = %dir.display(), error = %e, "could not list directory");
                    return Ok(Some(node));
                }
            };

            let outcomes =
                try_join_all(entries.into_iter().map(|path| self.scan_entry(path, depth)))
                    .await?;
            for outcome in outcomes {
                match outcome {
                    ChildOutcome::Keep(child) => {
                        node.size += child.size;
                        match child.kind {
                            NodeKind::File => node.file_count += 1,
                            NodeKind::Directory => {
                                node.file_count += child.file_count;
                                node.dir_count += child.dir_count + 1;
                            }
                        }
                        node.children.push(child);
                    }
                    ChildOutcome::Suppressed => node.content_suppressed = true,
                    ChildOutcome::Skip => {}
                }
            }
            sort_children(&mut node.children);
            Ok(Some(node))
        })
    }

    async fn scan_entry(&self, path: PathBuf, depth: u64) -> Result<ChildOutcome, IngestError> {
        let rel = self.relative(&path);
        if self.query.ignore_patterns.matches(&rel) {
            debug!(path = %rel, "excluded by pattern");
            return Ok(ChildOutcome::Skip);
        }
        let meta = match self.limiter.run(fs::symlink_metadata(&path)).await {
            Ok(meta) => meta,
            Err(_) => return Ok(ChildOutcome::Skip),
        };
        let file_type = meta.file_type();

        if file_type.is_symlink() {
            return self.scan_symlink(&path, &rel, depth).await;
        }
        if file_type.is_file() {
            if !self.include_allows(&rel) {
                return Ok(ChildOutcome::Suppressed);
            }
            // Hardlinked or symlink-aliased targets yield nothing twice.
            if let Ok(canonical) = self.limiter.run(fs::canonicalize(&path)).await {
                if !self.mark_seen(canonical) {
                    return Ok(ChildOutcome::Skip);
                }
            }
            return self.scan_file(&path, meta.len()).await;
        }
        if file_type.is_dir() {
            return match self.scan_dir(path, depth + 1).await? {
                Some(child) if self.keep_directory(&child) => Ok(ChildOutcome::Keep(child)),
                _ => Ok(ChildOutcome::Skip),
            };
        }
        // Sockets, fifos and other special files never land in the digest.
        Ok(ChildOutcome::Skip)
    }

    /// Resolve a symlink and report its target under the link's own name and
    /// path. Broken links, already-seen targets and targets outside the
    /// traversal root are skipped.
    async fn scan_symlink(
        &self,
        link: &Path,
        rel: &str,
        depth: u64,
    ) -> Result<ChildOutcome, IngestError> {
        let target = match self.limiter.run(fs::canonicalize(link)).await {
            Ok(target) => target,
            Err(_) => return Ok(ChildOutcome::Skip),
        };
        if !target.starts_with(&self.root_canonical) {
            debug!(link = %rel, target = %target.display(), "symlink escapes the root");
            return Ok(ChildOutcome::Skip);
        }
        let meta = match self.limiter.run(fs::metadata(&target)).await {
            Ok(meta) => meta,
            Err(_) => return Ok(ChildOutcome::Skip),
        };

        if meta.is_file() {
            if !self.include_allows(rel) {
                return Ok(ChildOutcome::Suppressed);
            }
            if !self.mark_seen(target) {
                return Ok(ChildOutcome::Skip);
            }
            return self.scan_file(link, meta.len()).await;
        }
        if meta.is_dir() {
            return match self.scan_dir(target, depth + 1).await? {
                Some(mut child) => {
                    child.name = link
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or(child.name);
                    child.path = link.to_path_buf();
                    if self.keep_directory(&child) {
                        Ok(ChildOutcome::Keep(child))
                    } else {
                        Ok(ChildOutcome::Skip)
                    }
                }
                None => Ok(ChildOutcome::Skip),
            };
        }
        Ok(ChildOutcome::Skip)
    }

    async fn scan_file(&self, path: &Path, size: u64) -> Result<ChildOutcome, IngestError> {
        self.record_file(size)?;
        let content = self.file_content(path, size).await;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Ok(ChildOutcome::Keep(Node::file(
            name,
            path.to_path_buf(),
            size,
            content,
        )))
    }

    async fn file_content(&self, path: &Path, size: u64) -> String {
        if size > self.query.max_file_size {
            debug!(path = %path.display(), size = size, "file exceeds max file size");
            return NON_TEXT_SENTINEL.to_string();
        }
        if !self.limiter.run(is_text_file(path)).await {
            return NON_TEXT_SENTINEL.to_string();
        }
        match self.limiter.run(fs::read_to_string(path)).await {
            Ok(raw) => {
                if path.extension().is_some_and(|ext| ext == "ipynb") {
                    annotate_notebook(path, raw)
                } else {
                    raw
                }
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not read file");
                NON_TEXT_SENTINEL.to_string()
            }
        }
    }

    /// Atomic increment-and-check: two concurrent files can never both slip
    /// past a ceiling.
    fn record_file(&self, size: u64) -> Result<(), IngestError> {
        let total_bytes = self.stats.total_bytes.fetch_add(size, Ordering::SeqCst) + size;
        if total_bytes > self.limits.max_total_bytes {
            return Err(IngestError::MaxTotalBytesExceeded {
                limit: self.limits.max_total_bytes,
            });
        }
        let total_files = self.stats.total_files.fetch_add(1, Ordering::SeqCst) + 1;
        if total_files > self.limits.max_files {
            return Err(IngestError::MaxFilesExceeded {
                limit: self.limits.max_files,
            });
        }
        Ok(())
    }

    fn limits_reached(&self) -> bool {
        self.stats.total_files.load(Ordering::SeqCst) >= self.limits.max_files
            || self.stats.total_bytes.load(Ordering::SeqCst) >= self.limits.max_total_bytes
    }

    fn include_allows(&self, rel: &str) -> bool {
        self.query
            .include_patterns
            .as_ref()
            .map_or(true, |include| include.matches(rel))
    }

    /// With include patterns active a directory is only worth keeping once
    /// its subtree contributed at least one included file.
    fn keep_directory(&self, child: &Node) -> bool {
        self.query.include_patterns.is_none() || child.file_count > 0
    }

    fn mark_seen(&self, canonical: PathBuf) -> bool {
        self.seen
            .lock()
            .expect("seen-paths lock poisoned")
            .insert(canonical)
    }

    async fn list_dir(&self, dir: &Path) -> std::io::Result<Vec<PathBuf>> {
        self.limiter
            .run(async {
                let mut entries = fs::read_dir(dir).await?;
                let mut paths = Vec::new();
                while let Some(entry) = entries.next_entry().await? {
                    paths.push(entry.path());
                }
                Ok(paths)
            })
            .await
    }

    /// Forward-slash path relative to the traversal root.
    fn relative(&self, path: &Path) -> String {
        let rel = path
            .strip_prefix(&self.root)
            .or_else(|_| path.strip_prefix(&self.root_canonical))
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| PathBuf::from(path.file_name().unwrap_or(path.as_os_str())));
        rel.components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Deterministic child order: README.md first, then visible files, hidden
/// files, visible directories, hidden directories; ties break by name.
fn sort_children(children: &mut [Node]) {
    children.sort_by(|a, b| sort_rank(a).cmp(&sort_rank(b)).then_with(|| a.name.cmp(&b.name)));
}

fn sort_rank(node: &Node) -> u8 {
    match node.kind {
        NodeKind::File => {
            if node.name.eq_ignore_ascii_case("README.md") {
                0
            } else if node.is_hidden() {
                2
            } else {
                1
            }
        }
        NodeKind::Directory => {
            if node.is_hidden() {
                4
            } else {
                3
            }
        }
    }
}

/// Sniff the first [`TEXT_SAMPLE_BYTES`] of a file: any NUL byte means
/// binary, and so does more than 10% of bytes outside printable ASCII plus
/// the 7..=13 whitespace controls.
pub(crate) async fn is_text_file(path: &Path) -> bool {
    let mut file = match fs::File::open(path).await {
        Ok(file) => file,
        Err(_) => return false,
    };
    let mut buf = [0u8; TEXT_SAMPLE_BYTES];
    let mut filled = 0;
    loop {
        match file.read(&mut buf[filled..]).await {
            Ok(0) => break,
            Ok(n) => {
                filled += n;
                if filled == buf.len() {
                    break;
                }
            }
            Err(_) => return false,
        }
    }
    is_text_sample(&buf[..filled])
}

fn is_text_sample(sample: &[u8]) -> bool {
    if sample.is_empty() {
        return true;
    }
    if sample.contains(&0) {
        return false;
    }
    let suspicious = sample
        .iter()
        .filter(|&&b| !(matches!(b, 7..=13) || (32..=126).contains(&b)))
        .count();
    (suspicious as f64) / (sample.len() as f64) <= 0.10
}

fn annotate_notebook(path: &Path, raw: String) -> String {
    match serde_json::from_str::<serde_json::Value>(&raw) {
        Ok(_) => format!("# Jupyter notebook: {}\n\n{raw}", path.display()),
        Err(e) => format!("Error processing notebook: {e}"),
    }
}
