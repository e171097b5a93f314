// Pattern sources loaded from files and custom registries

use modclean::cleaner::{CleanError, ConfigError, ModClean, Options, PatternRegistry, PatternSource};
use std::fs;

use super::support::fixture;

#[tokio::test]
async fn test_toml_source_file() {
    let dir = fixture(&["node_modules/a/debug.log", "node_modules/a/notes.txt"]);
    let rules = dir.path().join("rules.toml");
    fs::write(
        &rules,
        r#"
"$default" = "logs"
logs = ["*.log"]
text = { patterns = ["*.txt"] }
"#,
    )
    .unwrap();

    let selector = format!("{}", rules.display());
    let cleaner = ModClean::new(
        Options::new()
            .with_cwd(dir.path())
            .with_patterns([selector.clone()])
            .with_test(true),
    )
    .unwrap();
    assert_eq!(cleaner.patterns().allow, vec!["*.log".to_string()]);

    let results = cleaner.clean().await.unwrap();
    assert_eq!(results.deleted, vec![dir.path().join("node_modules/a/debug.log")]);

    let cleaner = ModClean::new(
        Options::new()
            .with_cwd(dir.path())
            .with_patterns([format!("{}:*", selector)]),
    )
    .unwrap();
    assert_eq!(cleaner.patterns().allow.len(), 2);

    let err = ModClean::new(Options::new().with_patterns([format!("{}:missing", selector)]))
        .err()
        .unwrap();
    assert!(matches!(err, CleanError::Config(ConfigError::UnknownRule { .. })));
}

#[test]
fn test_custom_registry_source() {
    let mut registry = PatternRegistry::new();
    registry.register(
        PatternSource::from_json_str("internal", r#"{ "build": { "patterns": ["dist"], "ignore": ["keep"] } }"#)
            .unwrap(),
    );

    let cleaner = ModClean::with_registry(Options::new().with_patterns(["internal"]), &registry).unwrap();
    assert_eq!(cleaner.patterns().allow, vec!["dist".to_string()]);
    assert_eq!(cleaner.patterns().ignore, vec!["keep".to_string()]);

    let err = ModClean::new(Options::new().with_patterns(["internal"])).err().unwrap();
    assert!(matches!(err, CleanError::Config(ConfigError::PatternSourceNotFound { .. })));
}

#[test]
fn test_bundled_rules_are_disjoint_from_ignore() {
    let registry = PatternRegistry::new();
    for selector in ["default:safe", "default:caution", "default:danger", "default:*"] {
        let set = registry.resolve(&[selector.to_string()], &[], &[]).unwrap();
        assert!(set.allow.iter().all(|p| !set.ignore.contains(p)), "{}", selector);
    }
}
