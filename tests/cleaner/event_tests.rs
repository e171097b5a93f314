// Event ordering and payloads

use modclean::cleaner::{CleanEvent, ModClean, Options, SearchSettings};
use std::sync::{Arc, Mutex};

use super::support::{count, fixture, record_events};

#[tokio::test]
async fn test_event_order() {
    let dir = fixture(&[
        "node_modules/a/README.md",
        "node_modules/a/index.js",
        "node_modules/b/",
    ]);

    let mut cleaner = ModClean::new(
        Options::new()
            .with_cwd(dir.path())
            .with_patterns(Vec::<String>::new())
            .with_additional_patterns(["README.md"])
            .with_test(true),
    )
    .unwrap();
    let log = record_events(&mut cleaner);

    cleaner.clean().await.unwrap();

    let names = log.lock().unwrap().clone();
    let position = |name: &str| names.iter().position(|n| n == name).unwrap();

    assert_eq!(names.first().map(String::as_str), Some("clean:start"));
    assert_eq!(names.last().map(String::as_str), Some("clean:complete"));
    assert!(position("pattern-search:begin") < position("candidates:ready"));
    assert!(position("candidates:ready") < position("delete:begin"));
    assert!(position("delete:begin") < position("candidate:deleted"));
    assert!(position("candidate:deleted") < position("delete:done"));
    assert!(position("delete:done") < position("emptydir:begin"));
    assert!(position("emptydir:begin") < position("emptydir:list"));
    assert!(position("emptydir:list") < position("emptydir:deleted"));
    assert!(position("emptydir:deleted") < position("emptydir:done"));
    assert_eq!(count(&log, "error"), 0);
}

#[tokio::test]
async fn test_no_emptydir_events_when_disabled() {
    let dir = fixture(&["node_modules/a/README.md"]);

    let mut cleaner = ModClean::new(
        Options::new()
            .with_cwd(dir.path())
            .with_test(true)
            .with_remove_empty_dirs(false),
    )
    .unwrap();
    let log = record_events(&mut cleaner);

    cleaner.clean().await.unwrap();

    assert_eq!(count(&log, "emptydir:begin"), 0);
    assert_eq!(count(&log, "clean:complete"), 1);
}

#[tokio::test]
async fn test_pattern_search_payload() {
    let dir = fixture(&["node_modules/a/x.log"]);
    let seen: Arc<Mutex<Option<(Vec<String>, Vec<String>)>>> = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&seen);

    let mut cleaner = ModClean::new(
        Options::new()
            .with_cwd(dir.path())
            .with_patterns(Vec::<String>::new())
            .with_additional_patterns(["*.log", "*.tmp"])
            .with_ignore_patterns(["**/vendor/**"])
            .with_test(true),
    )
    .unwrap();
    cleaner.on(move |event| {
        if let CleanEvent::PatternSearchBegin { allow, ignore, .. } = event {
            *sink.lock().unwrap() = Some((allow.clone(), ignore.clone()));
        }
    });

    let results = cleaner.clean().await.unwrap();

    let (allow, ignore) = seen.lock().unwrap().clone().unwrap();
    assert_eq!(allow, vec!["*.log".to_string(), "*.tmp".to_string()]);
    assert_eq!(ignore, vec!["**/vendor/**".to_string()]);
    assert_eq!(results.deleted, vec![dir.path().join("node_modules/a/x.log")]);
}

#[tokio::test]
async fn test_clean_start_payload() {
    let dir = fixture(&["vendor/a/x.log"]);
    let started: Arc<Mutex<Option<(std::path::PathBuf, SearchSettings, bool)>>> = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&started);

    let mut cleaner = ModClean::new(
        Options::new()
            .with_cwd(dir.path())
            .with_modules_dir(Some("vendor".to_string()))
            .with_patterns(Vec::<String>::new())
            .with_additional_patterns(["*.log"])
            .with_ignore_case(false)
            .with_test(true),
    )
    .unwrap();
    cleaner.on(move |event| {
        if let CleanEvent::CleanStart { root, settings, dry_run } = event {
            *sink.lock().unwrap() = Some((root.clone(), settings.clone(), *dry_run));
        }
    });

    cleaner.clean().await.unwrap();

    let (root, settings, dry_run) = started.lock().unwrap().clone().unwrap();
    assert_eq!(root, dir.path().join("vendor"));
    assert!(!settings.ignore_case);
    assert!(settings.dot_files);
    assert!(dry_run);
}
