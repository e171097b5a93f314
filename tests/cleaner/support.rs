// Shared fixtures for cleaner tests

use modclean::cleaner::{CleanEvent, ModClean};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Create `files` (relative paths; trailing `/` makes a directory) under a fresh temp dir
pub fn fixture(files: &[&str]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for file in files {
        let path = dir.path().join(file.trim_end_matches('/'));
        if file.ends_with('/') {
            fs::create_dir_all(&path).unwrap();
        } else {
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, file.as_bytes()).unwrap();
        }
    }
    dir
}

/// Every file and directory under `root` with its contents (empty for directories)
pub fn snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    let mut entries = BTreeMap::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                entries.insert(path.clone(), Vec::new());
                stack.push(path);
            } else {
                entries.insert(path.clone(), fs::read(&path).unwrap());
            }
        }
    }
    entries
}

/// Names of events seen, in order
pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn record_events(cleaner: &mut ModClean) -> EventLog {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    cleaner.on(move |event: &CleanEvent| sink.lock().unwrap().push(event.name().to_string()));
    log
}

pub fn count(log: &EventLog, name: &str) -> usize {
    log.lock().unwrap().iter().filter(|n| n.as_str() == name).count()
}
