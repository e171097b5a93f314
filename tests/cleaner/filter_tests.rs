// Decision filter behavior

use futures::FutureExt;
use modclean::cleaner::{AsyncFilter, Candidate, ModClean, Options};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::support::{fixture, snapshot};

fn options(cwd: &std::path::Path) -> Options {
    Options::new()
        .with_cwd(cwd)
        .with_patterns(Vec::<String>::new())
        .with_additional_patterns(["*.md", "test"])
}

#[tokio::test]
async fn test_rejecting_filter_skips_everything() {
    let dir = fixture(&[
        "node_modules/a/README.md",
        "node_modules/a/test/x.js",
        "node_modules/b/HISTORY.md",
    ]);
    let before = snapshot(dir.path());

    let cleaner = ModClean::new(
        options(dir.path())
            .with_filter(|_: &Candidate| false)
            .with_remove_empty_dirs(false),
    )
    .unwrap();
    let results = cleaner.clean().await.unwrap();

    assert_eq!(results.files.len(), 3);
    assert!(results.deleted.is_empty());
    assert_eq!(results.skipped.len(), results.files.len());
    assert_eq!(snapshot(dir.path()), before);
}

#[tokio::test]
async fn test_sync_filter_sees_candidate_details() {
    let dir = fixture(&["node_modules/a/README.md", "node_modules/a/test/x.js"]);
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let cleaner = ModClean::new(options(dir.path()).with_filter(move |c: &Candidate| {
        counter.fetch_add(1, Ordering::SeqCst);
        !c.is_dir
    }))
    .unwrap();
    let results = cleaner.clean().await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(results.deleted, vec![dir.path().join("node_modules/a/README.md")]);
    assert!(dir.path().join("node_modules/a/test/x.js").exists());
}

#[tokio::test]
async fn test_async_filter() {
    let dir = fixture(&["node_modules/a/README.md", "node_modules/b/CHANGES.md"]);

    let filter = AsyncFilter(|c: &Candidate| {
        let keep = c.full_path.to_string_lossy().contains("CHANGES");
        async move {
            tokio::task::yield_now().await;
            !keep
        }
        .boxed()
    });

    let cleaner = ModClean::new(options(dir.path()).with_filter(filter).with_test(true)).unwrap();
    let results = cleaner.clean().await.unwrap();

    assert_eq!(results.deleted, vec![dir.path().join("node_modules/a/README.md")]);
    assert_eq!(results.skipped, vec![dir.path().join("node_modules/b/CHANGES.md")]);
}
