// End-to-end tests for ModClean::clean

use modclean::cleaner::{CleanEvent, ModClean, Options};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use super::support::{fixture, snapshot};

fn options(cwd: &std::path::Path, patterns: &[&str]) -> Options {
    Options::new()
        .with_cwd(cwd)
        .with_patterns(Vec::<String>::new())
        .with_additional_patterns(patterns.iter().copied())
}

#[tokio::test]
async fn test_dry_run_module_scenario() {
    let dir = fixture(&[
        "node_modules/pkgA/README.md",
        "node_modules/pkgA/test/index.spec.js",
        "node_modules/pkgA/index.js",
    ]);
    let modules = dir.path().join("node_modules");
    let before = snapshot(dir.path());

    let mut cleaner = ModClean::new(options(dir.path(), &["README.md", "test"]).with_test(true)).unwrap();
    assert_eq!(cleaner.root(), modules.as_path());

    let ready = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&ready);
    cleaner.on(move |event| {
        if let CleanEvent::CandidatesReady(files) = event {
            *sink.lock().unwrap() = Some(files.len());
        }
    });

    let results = cleaner.clean().await.unwrap();

    assert_eq!(*ready.lock().unwrap(), Some(2));
    let deleted: HashSet<PathBuf> = results.deleted.iter().cloned().collect();
    assert_eq!(
        deleted,
        HashSet::from([modules.join("pkgA/README.md"), modules.join("pkgA/test")])
    );
    assert!(modules.join("pkgA/index.js").exists());
    assert_eq!(snapshot(dir.path()), before);
    assert!(results.errors.is_empty());
}

#[tokio::test]
async fn test_real_run_deletes_and_prunes() {
    let dir = fixture(&[
        "node_modules/pkgA/README.md",
        "node_modules/pkgA/test/index.spec.js",
        "node_modules/pkgA/index.js",
        "node_modules/pkgB/CHANGELOG.md",
        "node_modules/pkgB/Thumbs.db",
    ]);
    let modules = dir.path().join("node_modules");

    let cleaner = ModClean::new(options(dir.path(), &["*.md", "test"])).unwrap();
    let results = cleaner.clean().await.unwrap();

    assert_eq!(results.files.len(), 3);
    assert_eq!(results.deleted.len(), 3);
    assert!(!modules.join("pkgA/README.md").exists());
    assert!(!modules.join("pkgA/test").exists());
    assert!(modules.join("pkgA/index.js").exists());

    assert_eq!(results.empty, vec![modules.join("pkgB")]);
    assert_eq!(results.empty_deleted, vec![modules.join("pkgB")]);
    assert!(!modules.join("pkgB").exists());
    assert!(results.errors.is_empty());
}

#[tokio::test]
async fn test_keep_empty_dirs() {
    let dir = fixture(&["node_modules/pkgB/CHANGELOG.md"]);
    let modules = dir.path().join("node_modules");

    let cleaner = ModClean::new(options(dir.path(), &["*.md"]).with_remove_empty_dirs(false)).unwrap();
    let results = cleaner.clean().await.unwrap();

    assert_eq!(results.deleted.len(), 1);
    assert!(results.empty.is_empty());
    assert!(modules.join("pkgB").exists());
    assert_eq!(cleaner.clean_empty_dirs().await.unwrap(), None);
}

#[tokio::test]
async fn test_dry_run_leaves_filesystem_unchanged() {
    let dir = fixture(&[
        "node_modules/a/docs/guide.md",
        "node_modules/a/lib/main.js",
        "node_modules/b/.npmignore",
        "node_modules/b/empty/",
    ]);
    let before = snapshot(dir.path());

    let cleaner = ModClean::new(Options::new().with_cwd(dir.path()).with_test(true)).unwrap();
    let results = cleaner.clean().await.unwrap();

    assert!(!results.deleted.is_empty());
    assert_eq!(results.deleted.len() + results.skipped.len(), results.files.len());
    assert_eq!(results.empty_deleted, results.empty);
    assert_eq!(snapshot(dir.path()), before);
}

#[tokio::test]
async fn test_module_roots_are_protected() {
    let dir = fixture(&[
        "node_modules/docs/package.json",
        "node_modules/docs/index.js",
        "node_modules/lib/docs/api.txt",
    ]);
    let modules = dir.path().join("node_modules");

    let cleaner = ModClean::new(options(dir.path(), &["docs"]).with_filter(|_: &modclean::cleaner::Candidate| true))
        .unwrap();
    let results = cleaner.clean().await.unwrap();

    assert_eq!(results.skipped, vec![modules.join("docs")]);
    assert_eq!(results.deleted, vec![modules.join("lib/docs")]);
    assert!(modules.join("docs/index.js").exists());

    let cleaner = ModClean::new(options(dir.path(), &["docs"]).with_skip_modules(false)).unwrap();
    let results = cleaner.clean().await.unwrap();
    assert_eq!(results.deleted, vec![modules.join("docs")]);
    assert!(!modules.join("docs").exists());
}

#[tokio::test]
async fn test_overlapping_candidates_are_tolerated() {
    let dir = fixture(&["node_modules/a/docs/guide.md", "node_modules/a/docs/api.md"]);

    let cleaner = ModClean::new(options(dir.path(), &["docs", "*.md"]).with_concurrency(1)).unwrap();
    let results = cleaner.clean().await.unwrap();

    assert_eq!(results.files.len(), 3);
    assert_eq!(results.deleted.len(), 3);
    assert!(results.failed.is_empty());
    assert!(results.errors.is_empty());
}

#[tokio::test]
async fn test_second_run_finds_nothing() {
    let dir = fixture(&["node_modules/a/README.md", "node_modules/a/index.js"]);

    let cleaner = ModClean::new(options(dir.path(), &["README.md"])).unwrap();
    let first = cleaner.clean().await.unwrap();
    assert_eq!(first.deleted.len(), 1);

    let second = cleaner.clean().await.unwrap();
    assert!(second.files.is_empty());
    assert!(second.deleted.is_empty());
    assert!(second.errors.is_empty());
}

#[tokio::test]
async fn test_running_inside_modules_dir() {
    let dir = fixture(&["node_modules/a/README.md"]);
    let modules = dir.path().join("node_modules");

    let cleaner = ModClean::new(options(&modules, &["README.md"]).with_test(true)).unwrap();
    assert_eq!(cleaner.root(), modules.as_path());

    let results = cleaner.clean().await.unwrap();
    assert_eq!(results.deleted, vec![modules.join("a/README.md")]);
}

#[tokio::test]
async fn test_find_and_process_separately() {
    let dir = fixture(&["node_modules/a/x.log", "node_modules/a/y.tmp", "node_modules/a/keep.txt"]);

    let cleaner = ModClean::new(options(dir.path(), &["*.@(log|tmp)"])).unwrap();
    let found = cleaner.find().await.unwrap();
    let names: HashSet<String> = found.iter().map(|c| c.name.clone()).collect();
    assert_eq!(names, HashSet::from(["x.log".to_string(), "y.tmp".to_string()]));

    let processed = cleaner.process(&found).await.unwrap();
    assert_eq!(processed.deleted.len(), 2);
    assert!(dir.path().join("node_modules/a/keep.txt").exists());
}
