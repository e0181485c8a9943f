//! Source resolver: turn a user-supplied string into an [`IngestQuery`].
//!
//! A source is either a local directory/file or a remote repository reference.
//! Remote references come in several shapes (`https://host/owner/repo/...`,
//! `host/owner/repo`, bare `owner/repo`) and may carry a branch, a commit hash
//! and a subpath after the owner/repo segments. Resolution may need the remote
//! itself: bare `owner/repo` input is probed against the known hosts, and
//! ambiguous branch segments are matched against the real branch list.

use std::path::PathBuf;

use percent_encoding::percent_decode_str;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::error::IngestError;
use crate::fetch::{CloneConfig, Fetcher};
use crate::patterns::{PatternInput, PatternSet};

/// Recognized git hosting domains, in probing priority order.
pub const KNOWN_GIT_HOSTS: &[&str] = &[
    "github.com",
    "gitlab.com",
    "bitbucket.org",
    "gitea.com",
    "codeberg.org",
];

/// Default ceiling on the size of a single ingested file (10 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// URL path marker after owner/repo: `blob` addresses a single file,
/// anything else content-bearing addresses a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Tree,
    Blob,
}

/// Resolved target of one ingestion run.
#[derive(Debug, Clone)]
pub struct IngestQuery {
    pub user_name: Option<String>,
    pub repo_name: Option<String>,
    /// Where the repository content lives (or will live, after cloning).
    pub local_path: PathBuf,
    /// Canonical remote URL; `None` for local sources.
    pub url: Option<String>,
    /// Human identifier: `owner-repo` for remotes, `parent/dir` for locals.
    pub slug: String,
    /// Opaque per-ingestion session id.
    pub id: String,
    /// Forward-slash subpath within the repository, `/` for the root.
    pub subpath: String,
    pub kind: Option<ResourceKind>,
    pub branch: Option<String>,
    /// Pinned 40-hex commit, if the source addressed one.
    pub commit: Option<String>,
    pub max_file_size: u64,
    pub ignore_patterns: PatternSet,
    pub include_patterns: Option<PatternSet>,
}

impl IngestQuery {
    fn new(local_path: PathBuf, slug: String) -> Self {
        Self {
            user_name: None,
            repo_name: None,
            local_path,
            url: None,
            slug,
            id: Uuid::new_v4().to_string(),
            subpath: "/".to_string(),
            kind: None,
            branch: None,
            commit: None,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            ignore_patterns: PatternSet::defaults(),
            include_patterns: None,
        }
    }

    pub fn is_remote(&self) -> bool {
        self.url.is_some()
    }

    /// Clone parameters for the fetcher; `None` for local sources.
    pub fn clone_config(&self) -> Option<CloneConfig> {
        self.url.as_ref().map(|url| CloneConfig {
            url: url.clone(),
            local_path: self.local_path.clone(),
            commit: self.commit.clone(),
            branch: self.branch.clone(),
            subpath: self.subpath.clone(),
        })
    }

    /// Filesystem root the scan starts from: local path plus subpath.
    pub fn target_path(&self) -> PathBuf {
        let trimmed = self.subpath.trim_start_matches('/');
        if trimmed.is_empty() {
            self.local_path.clone()
        } else {
            self.local_path.join(trimmed)
        }
    }
}

/// Resolve `source` into a query, applying pattern inputs on top of the
/// default exclude catalog.
pub async fn parse_source(
    source: &str,
    max_file_size: u64,
    from_web: bool,
    include_patterns: Option<&PatternInput>,
    ignore_patterns: Option<&PatternInput>,
    fetcher: &dyn Fetcher,
) -> Result<IngestQuery, IngestError> {
    let looks_remote = from_web
        || source.contains("://")
        || KNOWN_GIT_HOSTS.iter().any(|host| source.contains(host));
    let mut query = if looks_remote {
        parse_remote_source(source, fetcher).await?
    } else {
        parse_local_source(source)?
    };
    query.max_file_size = max_file_size;

    let mut ignore = PatternSet::defaults();
    if let Some(input) = ignore_patterns {
        ignore.merge(&PatternSet::from_input(input)?);
    }
    if let Some(input) = include_patterns {
        let include = PatternSet::from_input(input)?;
        if !include.is_empty() {
            // Include wins: identical patterns drop out of the exclude set.
            ignore.subtract(&include);
            query.include_patterns = Some(include);
        }
    }
    query.ignore_patterns = ignore;

    debug!(
        slug = %query.slug,
        remote = query.is_remote(),
        subpath = %query.subpath,
        "resolved source"
    );
    Ok(query)
}

fn parse_local_source(source: &str) -> Result<IngestQuery, IngestError> {
    let path = std::path::absolute(source)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned());
    let slug = match path.parent().and_then(|p| p.file_name()) {
        Some(parent) => format!("{}/{}", parent.to_string_lossy(), name),
        None => name,
    };
    Ok(IngestQuery::new(path, slug))
}

async fn parse_remote_source(
    source: &str,
    fetcher: &dyn Fetcher,
) -> Result<IngestQuery, IngestError> {
    let decoded = percent_decode_str(source).decode_utf8_lossy().into_owned();

    let url_str = if decoded.contains("://") {
        decoded.clone()
    } else {
        let trimmed = decoded.trim_start_matches('/');
        let first = trimmed.split('/').next().unwrap_or("");
        if first.contains('.') {
            // A dotted first segment is a literal host.
            format!("https://{trimmed}")
        } else {
            let host = probe_known_hosts(trimmed, fetcher).await?;
            format!("https://{host}/{trimmed}")
        }
    };

    let url = Url::parse(&url_str)
        .map_err(|_| IngestError::InvalidUrl(format!("could not parse '{source}' as a URL")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(IngestError::InvalidUrl(format!(
            "unsupported scheme '{}' in '{source}'",
            url.scheme()
        )));
    }
    let host = url
        .host_str()
        .ok_or_else(|| IngestError::InvalidUrl(format!("no host in '{source}'")))?
        .to_lowercase();
    if !KNOWN_GIT_HOSTS.contains(&host.as_str()) {
        return Err(IngestError::InvalidUrl(format!(
            "unknown git host '{host}'"
        )));
    }

    let segments: Vec<String> = url
        .path()
        .split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if segments.len() < 2 {
        return Err(IngestError::InvalidUrl(format!(
            "expected {host}/owner/repo, got '{source}'"
        )));
    }
    let user_name = segments[0].clone();
    let repo_name = segments[1].trim_end_matches(".git").to_string();
    let canonical_url = format!("https://{host}/{user_name}/{repo_name}");
    let slug = format!("{user_name}-{repo_name}");
    let id = Uuid::new_v4().to_string();
    let local_path = std::env::temp_dir()
        .join("llm-ingest")
        .join(&id)
        .join(&slug);

    let mut query = IngestQuery::new(local_path, slug);
    query.id = id;
    query.user_name = Some(user_name);
    query.repo_name = Some(repo_name);
    query.url = Some(canonical_url.clone());

    let rest = &segments[2..];
    let Some(kind) = rest.first() else {
        return Ok(query);
    };
    if kind == "issues" || kind == "pull" {
        // Not a content path; everything past it is ignored.
        return Ok(query);
    }
    query.kind = Some(if kind == "blob" {
        ResourceKind::Blob
    } else {
        ResourceKind::Tree
    });

    let rest = &rest[1..];
    if rest.is_empty() {
        return Ok(query);
    }

    let consumed = if is_commit_hash(&rest[0]) {
        query.commit = Some(rest[0].clone());
        1
    } else {
        resolve_branch(&mut query, &canonical_url, rest, fetcher).await
    };

    let leftover = &rest[consumed..];
    if !leftover.is_empty() {
        query.subpath = format!("/{}", leftover.join("/"));
    }
    Ok(query)
}

/// Match the leading path segments against the real remote branch list,
/// preferring the longest branch name. When the remote cannot be reached the
/// first segment is assumed to be the branch; with multi-segment branch names
/// this fallback can guess wrong, which is accepted as a known limitation.
async fn resolve_branch(
    query: &mut IngestQuery,
    url: &str,
    segments: &[String],
    fetcher: &dyn Fetcher,
) -> usize {
    match fetcher.list_remote_branches(url).await {
        Ok(branches) => {
            for take in (1..=segments.len()).rev() {
                let candidate = segments[..take].join("/");
                if branches.iter().any(|b| *b == candidate) {
                    query.branch = Some(candidate);
                    return take;
                }
            }
            0
        }
        Err(e) => {
            warn!(url = %url, error = %e, "branch listing failed, assuming first segment is the branch");
            query.branch = Some(segments[0].clone());
            1
        }
    }
}

async fn probe_known_hosts(path: &str, fetcher: &dyn Fetcher) -> Result<String, IngestError> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() < 2 {
        return Err(IngestError::InvalidUrl(format!(
            "expected owner/repo, got '{path}'"
        )));
    }
    let (owner, repo) = (segments[0], segments[1]);
    for host in KNOWN_GIT_HOSTS {
        let candidate = format!("https://{host}/{owner}/{repo}");
        if fetcher.exists(&candidate).await {
            info!(host = host, owner = owner, repo = repo, "resolved host by probing");
            return Ok(host.to_string());
        }
    }
    Err(IngestError::RepositoryNotFound(format!(
        "{owner}/{repo} on any known host"
    )))
}

fn is_commit_hash(segment: &str) -> bool {
    segment.len() == 40 && segment.chars().all(|c| c.is_ascii_hexdigit())
}
