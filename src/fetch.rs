//! Repository fetcher: the external-collaborator boundary around git.
//!
//! The core only depends on the [`Fetcher`] trait. The production
//! implementation, [`GitCli`], shells out to the installed `git` binary and
//! probes hosts over HTTP; tests plug in the generated [`MockFetcher`]
//! instead, so no network or git installation is needed to exercise the
//! pipeline.

use std::path::PathBuf;

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::IngestError;
use crate::limiter::Limiter;

/// Parameters for one clone operation, derived from the resolved query.
#[derive(Debug, Clone)]
pub struct CloneConfig {
    pub url: String,
    pub local_path: PathBuf,
    pub commit: Option<String>,
    pub branch: Option<String>,
    /// Forward-slash subpath within the repository, `/` for the whole tree.
    pub subpath: String,
}

impl CloneConfig {
    /// Whether only a subtree is wanted, so the clone can be sparse.
    pub fn is_partial(&self) -> bool {
        !self.subpath.trim_matches('/').is_empty()
    }
}

/// Contract for all remote git interaction.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Lightweight reachability probe: does a repository live at `url`?
    async fn exists(&self, url: &str) -> bool;

    /// Branch names advertised by the remote, in the remote's order.
    async fn list_remote_branches(&self, url: &str) -> Result<Vec<String>, IngestError>;

    /// Clone the repository described by `config` into `config.local_path`.
    async fn clone_repo(&self, config: &CloneConfig) -> Result<(), IngestError>;
}

/// Production fetcher backed by the `git` binary and an HTTP client.
pub struct GitCli {
    http: reqwest::Client,
    limiter: Limiter,
}

impl GitCli {
    pub fn new(limiter: Limiter) -> Self {
        Self {
            http: reqwest::Client::new(),
            limiter,
        }
    }

    async fn run_git(&self, args: &[&str]) -> Result<std::process::Output, IngestError> {
        let command = format!("git {}", args.join(" "));
        debug!(command = %command, "running git");
        let mut cmd = Command::new("git");
        cmd.args(args);
        let output = self
            .limiter
            .run(cmd.output())
            .await
            .map_err(|e| IngestError::git(&command, format!("failed to launch git: {e}")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(IngestError::git(&command, stderr));
        }
        Ok(output)
    }
}

#[async_trait]
impl Fetcher for GitCli {
    async fn exists(&self, url: &str) -> bool {
        let response = self.limiter.run(self.http.head(url).send()).await;
        match response {
            Ok(response) => {
                let status = response.status();
                status.is_success() || status.is_redirection()
            }
            Err(e) => {
                warn!(url = %url, error = %e, "existence probe failed");
                false
            }
        }
    }

    async fn list_remote_branches(&self, url: &str) -> Result<Vec<String>, IngestError> {
        let output = self.run_git(&["ls-remote", "--heads", url]).await?;
        let branches = parse_ls_remote(&String::from_utf8_lossy(&output.stdout));
        debug!(url = %url, count = branches.len(), "listed remote branches");
        Ok(branches)
    }

    async fn clone_repo(&self, config: &CloneConfig) -> Result<(), IngestError> {
        if let Some(parent) = config.local_path.parent() {
            self.limiter.run(fs::create_dir_all(parent)).await?;
        }
        if !self.exists(&config.url).await {
            return Err(IngestError::RepositoryNotFound(config.url.clone()));
        }

        let local_path = config.local_path.to_string_lossy().into_owned();
        let mut args = vec![
            "clone",
            "--single-branch",
            "--depth=1",
            "--recurse-submodules",
        ];
        if config.is_partial() {
            args.push("--filter=blob:none");
            args.push("--sparse");
        }
        if config.commit.is_none() {
            if let Some(branch) = config.branch.as_deref() {
                // The default branch arrives without --branch anyway.
                if branch != "main" && branch != "master" {
                    args.push("--branch");
                    args.push(branch);
                }
            }
        }
        args.push(&config.url);
        args.push(&local_path);
        self.run_git(&args).await?;

        if config.is_partial() {
            let subpath = config.subpath.trim_matches('/').to_string();
            self.run_git(&["-C", &local_path, "sparse-checkout", "set", &subpath])
                .await?;
        }
        if let Some(commit) = config.commit.as_deref() {
            self.run_git(&["-C", &local_path, "checkout", commit])
                .await?;
        }

        info!(
            url = %config.url,
            path = %config.local_path.display(),
            branch = config.branch.as_deref().unwrap_or("default"),
            commit = config.commit.as_deref().unwrap_or("none"),
            partial = config.is_partial(),
            "cloned repository"
        );
        Ok(())
    }
}

/// Extract branch names from `git ls-remote --heads` output.
fn parse_ls_remote(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter_map(|line| line.split('\t').nth(1))
        .filter_map(|r| r.strip_prefix("refs/heads/"))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ls_remote_heads_output() {
        let stdout = "4f2ab9d7a3087ba4653c44df3ee041b4009b4ebc\trefs/heads/main\n\
                      77afed1f1e9e4c83e0e52d5c0c1d5013e0f16d3c\trefs/heads/feature/fix-42\n";
        let branches = parse_ls_remote(stdout);
        assert_eq!(branches, vec!["main", "feature/fix-42"]);
    }

    #[test]
    fn ls_remote_parsing_skips_malformed_lines() {
        let stdout = "garbage\nabc\trefs/tags/v1.0\n0000\trefs/heads/dev\n";
        assert_eq!(parse_ls_remote(stdout), vec!["dev"]);
    }

    #[test]
    fn partial_clone_requires_a_narrower_subpath() {
        let mut config = CloneConfig {
            url: "https://github.com/acme/widgets".to_string(),
            local_path: PathBuf::from("/tmp/x"),
            commit: None,
            branch: None,
            subpath: "/".to_string(),
        };
        assert!(!config.is_partial());
        config.subpath = "/src".to_string();
        assert!(config.is_partial());
    }
}
