//! Pattern sources, rule selection and glob compilation.
//!
//! A pattern source maps rule names to glob lists. Selectors of the form
//! `source[:rule[,rule...]]` pick rules out of sources; the union of all
//! picked rules plus any extra patterns becomes a [`PatternSet`].

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::error::ConfigError;

/// Name of the bundled pattern source
pub const DEFAULT_SOURCE: &str = "default";

/// Conventional prefix of installable pattern packages
pub const SOURCE_PREFIX: &str = "modclean-patterns-";

/// Keys starting with this marker are metadata, not rules
const META_MARKER: char = '$';

const DEFAULT_RULE_KEY: &str = "$default";

const BUNDLED_DEFAULT: &str = include_str!("../../patterns/default.toml");

/// One named rule inside a pattern source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rule {
    pub patterns: Vec<String>,
    pub ignore: Vec<String>,
}

/// A loaded pattern source
#[derive(Debug, Clone)]
pub struct PatternSource {
    name: String,
    default_rule: Option<String>,
    /// Rules in declaration order
    rules: Vec<(String, Rule)>,
}

impl PatternSource {
    /// Build a source from a parsed document. The top level must be a mapping.
    pub fn from_value(name: &str, value: Value) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidPatternSource {
            source: name.to_string(),
            reason,
        };

        let map = match value {
            Value::Object(map) => map,
            _ => return Err(invalid("did not contain a mapping of rules".to_string())),
        };

        let mut default_rule = None;
        let mut rules = Vec::new();

        for (key, value) in map {
            if key.starts_with(META_MARKER) {
                if key == DEFAULT_RULE_KEY {
                    match value {
                        Value::String(rule) => default_rule = Some(rule),
                        _ => return Err(invalid(format!("\"{}\" must be a string", key))),
                    }
                }
                continue;
            }

            let rule = match value {
                Value::Array(items) => Rule {
                    patterns: string_list(&items).ok_or_else(|| {
                        invalid(format!("rule \"{}\" must be a list of strings", key))
                    })?,
                    ignore: Vec::new(),
                },
                Value::Object(fields) => {
                    let mut rule = Rule::default();
                    for (field, target) in [("patterns", &mut rule.patterns), ("ignore", &mut rule.ignore)] {
                        match fields.get(field) {
                            None => {}
                            Some(Value::Array(items)) => {
                                *target = string_list(items).ok_or_else(|| {
                                    invalid(format!("\"{}.{}\" must be a list of strings", key, field))
                                })?;
                            }
                            Some(_) => {
                                return Err(invalid(format!("\"{}.{}\" must be a list", key, field)))
                            }
                        }
                    }
                    rule
                }
                _ => return Err(invalid(format!("rule \"{}\" has an unsupported shape", key))),
            };

            rules.push((key, rule));
        }

        Ok(Self {
            name: name.to_string(),
            default_rule,
            rules,
        })
    }

    pub fn from_toml_str(name: &str, content: &str) -> Result<Self, ConfigError> {
        let value: Value = toml::from_str(content).map_err(|e| ConfigError::InvalidPatternSource {
            source: name.to_string(),
            reason: e.to_string(),
        })?;
        Self::from_value(name, value)
    }

    pub fn from_json_str(name: &str, content: &str) -> Result<Self, ConfigError> {
        let value: Value =
            serde_json::from_str(content).map_err(|e| ConfigError::InvalidPatternSource {
                source: name.to_string(),
                reason: e.to_string(),
            })?;
        Self::from_value(name, value)
    }

    /// Load a `.json` or `.toml` file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let name = path.display().to_string();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        let parse: fn(&str, &str) -> Result<Self, ConfigError> = match ext.as_deref() {
            Some("json") => Self::from_json_str,
            Some("toml") => Self::from_toml_str,
            _ => {
                return Err(ConfigError::InvalidPatternSource {
                    source: name,
                    reason: "expected a .json or .toml file".to_string(),
                })
            }
        };

        let content = fs::read_to_string(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ConfigError::PatternSourceNotFound {
                source: name.clone(),
            },
            _ => ConfigError::InvalidPatternSource {
                source: name.clone(),
                reason: e.to_string(),
            },
        })?;

        parse(&name, &content)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared default rule, or the first rule
    pub fn default_rule(&self) -> Option<&str> {
        self.default_rule
            .as_deref()
            .or_else(|| self.rules.first().map(|(name, _)| name.as_str()))
    }

    pub fn rule_names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|(name, _)| name.as_str())
    }

    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.rules
            .iter()
            .find(|(rule_name, _)| rule_name == name)
            .map(|(_, rule)| rule)
    }

    /// Rules selected by `selection`: `None` for the default, `*` for all,
    /// otherwise a comma-separated list of names.
    pub fn select(&self, selection: Option<&str>) -> Result<Vec<&Rule>, ConfigError> {
        let names: Vec<&str> = match selection {
            None => match self.default_rule() {
                Some(name) => vec![name],
                None => {
                    return Err(ConfigError::InvalidPatternSource {
                        source: self.name.clone(),
                        reason: "defines no rules".to_string(),
                    })
                }
            },
            Some("*") => self.rule_names().collect(),
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .collect(),
        };

        names
            .into_iter()
            .map(|name| {
                self.rule(name).ok_or_else(|| ConfigError::UnknownRule {
                    source: self.name.clone(),
                    rule: name.to_string(),
                })
            })
            .collect()
    }
}

fn string_list(items: &[Value]) -> Option<Vec<String>> {
    items
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect()
}

/// Resolved allow/ignore globs. `allow` is never empty and shares nothing with `ignore`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternSet {
    pub allow: Vec<String>,
    pub ignore: Vec<String>,
}

impl PatternSet {
    /// Deduplicate both lists (first occurrence wins) and subtract `ignore` from `allow`.
    pub fn new(allow: Vec<String>, ignore: Vec<String>) -> Result<Self, ConfigError> {
        let ignore = dedup(ignore);
        let ignored: HashSet<&str> = ignore.iter().map(String::as_str).collect();
        let allow: Vec<String> = dedup(allow)
            .into_iter()
            .filter(|p| !ignored.contains(p.as_str()))
            .collect();

        if allow.is_empty() {
            return Err(ConfigError::NoPatterns);
        }

        Ok(Self { allow, ignore })
    }
}

fn dedup(patterns: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    patterns
        .into_iter()
        .filter(|p| !p.is_empty() && seen.insert(p.clone()))
        .collect()
}

/// Registry of statically linked pattern sources plus a file loader for
/// user-supplied paths.
#[derive(Debug, Clone)]
pub struct PatternRegistry {
    bundled: HashMap<String, PatternSource>,
    base_dir: PathBuf,
}

impl Default for PatternRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternRegistry {
    /// Registry with the bundled `default` source, resolving paths against
    /// the process working directory.
    pub fn new() -> Self {
        let mut registry = Self {
            bundled: HashMap::new(),
            base_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        };
        match PatternSource::from_toml_str(DEFAULT_SOURCE, BUNDLED_DEFAULT) {
            Ok(source) => registry.register(source),
            Err(e) => tracing::error!(target: "modclean", "bundled patterns are broken: {}", e),
        }
        registry
    }

    /// Resolve relative source paths against `dir`
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = dir.into();
        self
    }

    /// Add or replace a statically linked source, keyed by its name
    pub fn register(&mut self, source: PatternSource) {
        self.bundled.insert(source.name.clone(), source);
    }

    pub fn bundled(&self, name: &str) -> Option<&PatternSource> {
        self.bundled.get(name)
    }

    /// Merge every selector and the extra globs into one [`PatternSet`].
    pub fn resolve(
        &self,
        selectors: &[String],
        additional_allow: &[String],
        additional_ignore: &[String],
    ) -> Result<PatternSet, ConfigError> {
        let mut loaded: HashMap<String, PatternSource> = HashMap::new();
        let mut allow = Vec::new();
        let mut ignore = Vec::new();

        for selector in selectors {
            let (source_name, rules) = parse_selector(selector);

            if !loaded.contains_key(source_name) {
                let source = self.load(source_name)?;
                loaded.insert(source_name.to_string(), source);
            }
            let source = &loaded[source_name];

            for rule in source.select(rules)? {
                allow.extend(rule.patterns.iter().cloned());
                ignore.extend(rule.ignore.iter().cloned());
            }
        }

        allow.extend(additional_allow.iter().cloned());
        ignore.extend(additional_ignore.iter().cloned());

        let set = PatternSet::new(allow, ignore)?;
        tracing::debug!(
            target: "modclean",
            allow = set.allow.len(),
            ignore = set.ignore.len(),
            "resolved patterns"
        );
        Ok(set)
    }

    fn load(&self, name: &str) -> Result<PatternSource, ConfigError> {
        if is_path_like(name) {
            let path = Path::new(name);
            let path = if path.is_absolute() {
                path.to_path_buf()
            } else {
                self.base_dir.join(path)
            };
            return PatternSource::from_file(&path);
        }

        let short = name.strip_prefix(SOURCE_PREFIX).unwrap_or(name);
        self.bundled
            .get(short)
            .cloned()
            .ok_or_else(|| ConfigError::PatternSourceNotFound {
                source: format!("{}{}", SOURCE_PREFIX, short),
            })
    }
}

fn is_path_like(name: &str) -> bool {
    name.contains('/') || name.contains('\\')
}

/// Split `source[:rules]`. A colon followed by a path separator is part of
/// the source (Windows drive letters).
fn parse_selector(selector: &str) -> (&str, Option<&str>) {
    let (source, rules) = match selector.rsplit_once(':') {
        Some((source, rules)) if !is_path_like(rules) => (source, Some(rules)),
        _ => (selector, None),
    };

    let source = if source.is_empty() { DEFAULT_SOURCE } else { source };
    let rules = rules.filter(|r| !r.is_empty());
    (source, rules)
}

/// Rewrite extglob `@(a|b)` groups as `{a,b}` alternations.
pub fn translate_extglob(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    // true for groups opened by `@(`, false for plain parentheses
    let mut groups: Vec<bool> = Vec::new();
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                out.push(c);
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            '@' if chars.peek() == Some(&'(') => {
                chars.next();
                groups.push(true);
                out.push('{');
            }
            '(' => {
                groups.push(false);
                out.push(c);
            }
            '|' if groups.last() == Some(&true) => out.push(','),
            ')' => match groups.pop() {
                Some(true) => out.push('}'),
                _ => out.push(c),
            },
            _ => out.push(c),
        }
    }

    out
}

/// Options that affect how globs compile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobOptions {
    pub case_insensitive: bool,
    /// `*` and `?` do not cross `/`
    pub literal_separator: bool,
}

fn build_glob(pattern: &str, raw: &str, opts: GlobOptions) -> Result<globset::Glob, ConfigError> {
    GlobBuilder::new(pattern)
        .case_insensitive(opts.case_insensitive)
        .literal_separator(opts.literal_separator)
        .backslash_escape(true)
        .build()
        .map_err(|e| ConfigError::InvalidGlob {
            pattern: raw.to_string(),
            reason: e.kind().to_string(),
        })
}

/// Compile allow patterns so each matches at any depth. A leading `/`
/// anchors the pattern at the root instead.
pub fn compile_allow(patterns: &[String], opts: GlobOptions) -> Result<GlobSet, ConfigError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let translated = translate_extglob(pattern);
        let anchored = match translated.strip_prefix('/') {
            Some(rooted) => rooted.to_string(),
            None if translated.starts_with("**/") => translated,
            None => format!("**/{}", translated),
        };
        builder.add(build_glob(&anchored, pattern, opts)?);
    }
    builder.build().map_err(|e| ConfigError::InvalidGlob {
        pattern: patterns.join("|"),
        reason: e.to_string(),
    })
}

/// Compile ignore patterns; they match paths relative to the root.
pub fn compile_ignore(patterns: &[String], opts: GlobOptions) -> Result<GlobSet, ConfigError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let translated = translate_extglob(pattern);
        let rooted = translated.trim_start_matches('/');
        builder.add(build_glob(rooted, pattern, opts)?);
    }
    builder.build().map_err(|e| ConfigError::InvalidGlob {
        pattern: patterns.join("|"),
        reason: e.to_string(),
    })
}
