// Remote ingestion flow with a mock fetcher standing in for git and the
// network: the mock materializes a fake clone on disk, and the tests verify
// the digest plus the guaranteed cleanup of the temporary clone.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use llm_ingest::fetch::MockFetcher;
use llm_ingest::{ingest_with, IngestError, IngestOptions, Limiter};

/// Shared slot the clone mock uses to report where it cloned to.
type ClonePathSlot = Arc<Mutex<Option<PathBuf>>>;

fn fetcher_with_fake_clone(slot: ClonePathSlot) -> MockFetcher {
    let mut fetcher = MockFetcher::new();
    fetcher
        .expect_list_remote_branches()
        .returning(|_| Ok(vec!["main".to_string()]));
    fetcher.expect_clone_repo().times(1).returning(move |config| {
        std::fs::create_dir_all(&config.local_path).expect("create clone dir");
        std::fs::write(config.local_path.join("README.md"), "# widgets\n").expect("write");
        std::fs::write(config.local_path.join("lib.rs"), "pub fn widget() {}\n").expect("write");
        *slot.lock().expect("slot lock") = Some(config.local_path.clone());
        Ok(())
    });
    fetcher
}

#[tokio::test]
async fn remote_url_is_cloned_scanned_and_cleaned_up() {
    let slot: ClonePathSlot = Arc::new(Mutex::new(None));
    let fetcher = fetcher_with_fake_clone(slot.clone());

    let digest = ingest_with(
        "https://github.com/acme/widgets",
        IngestOptions::default(),
        &fetcher,
        &Limiter::default(),
    )
    .await
    .expect("ingestion succeeds");

    assert!(digest.summary.contains("Repository: acme/widgets"));
    assert!(digest.summary.contains("Files analyzed: 2"));
    assert!(digest.tree.contains("README.md"));
    assert!(digest.content.contains("# widgets"));

    let clone_path = slot
        .lock()
        .expect("slot lock")
        .clone()
        .expect("clone mock ran");
    assert!(!clone_path.exists(), "temporary clone must be removed");
}

#[tokio::test]
async fn subpath_url_scans_only_the_subtree() {
    let mut fetcher = MockFetcher::new();
    fetcher
        .expect_list_remote_branches()
        .returning(|_| Ok(vec!["main".to_string()]));
    fetcher
        .expect_clone_repo()
        .times(1)
        .withf(|config| config.subpath == "/src" && config.branch.as_deref() == Some("main"))
        .returning(|config| {
            let src = config.local_path.join("src");
            std::fs::create_dir_all(&src).expect("create clone dir");
            std::fs::write(src.join("inner.rs"), "pub struct Inner;\n").expect("write");
            std::fs::write(config.local_path.join("outer.txt"), "outside").expect("write");
            Ok(())
        });

    let digest = ingest_with(
        "https://github.com/acme/widgets/tree/main/src",
        IngestOptions::default(),
        &fetcher,
        &Limiter::default(),
    )
    .await
    .expect("ingestion succeeds");

    assert!(digest.summary.contains("Subpath: /src"));
    assert!(digest.tree.contains("inner.rs"));
    assert!(!digest.tree.contains("outer.txt"));
}

#[tokio::test]
async fn branch_option_overrides_the_resolved_branch() {
    let mut fetcher = MockFetcher::new();
    fetcher
        .expect_clone_repo()
        .times(1)
        .withf(|config| config.branch.as_deref() == Some("release-1.2"))
        .returning(|config| {
            std::fs::create_dir_all(&config.local_path).expect("create clone dir");
            std::fs::write(config.local_path.join("a.txt"), "pinned").expect("write");
            Ok(())
        });

    let options = IngestOptions {
        branch: Some("release-1.2".to_string()),
        ..IngestOptions::default()
    };
    let digest = ingest_with(
        "https://github.com/acme/widgets",
        options,
        &fetcher,
        &Limiter::default(),
    )
    .await
    .expect("ingestion succeeds");
    assert!(digest.summary.contains("Branch: release-1.2"));
}

#[tokio::test]
async fn clone_failure_surfaces_and_still_cleans_up() {
    let mut fetcher = MockFetcher::new();
    fetcher.expect_clone_repo().times(1).returning(|_| {
        Err(IngestError::RepositoryNotFound(
            "acme/widgets on github.com".to_string(),
        ))
    });

    let err = ingest_with(
        "https://github.com/acme/widgets",
        IngestOptions::default(),
        &fetcher,
        &Limiter::default(),
    )
    .await
    .expect_err("must fail");
    assert!(matches!(err, IngestError::RepositoryNotFound(_)));
}
