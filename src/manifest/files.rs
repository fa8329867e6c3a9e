use serde_json::Value;

use super::{Code, Issue};
use crate::errors::{format_err, Result};
use crate::util::{ensure_dot_slash, show_vec_with, strip_dot_slash};

/// Entries shipped no matter what the files list says.
pub const ALWAYS_INCLUDED: &[&str] = &["package.json", "README*", "LICENSE*", "CHANGELOG*"];

/// Capabilities the embedder supplies for the few places parsing touches a
/// file tree: listing a `directories.bin` directory and probing file
/// existence. The core itself performs no I/O.
pub trait FileSystemProbe {
    fn list_directory(&self, path: &str) -> Option<Vec<String>>;
    fn file_exists(&self, path: &str) -> bool;
}

/// The parsed `files` array.
#[derive(Clone, Debug, Default)]
pub struct FilesList {
    pub patterns: Vec<String>,
    /// Leading-`!` entries, stored without the marker.
    pub negations: Vec<String>,
    pub has_globs: bool,
    /// True only when the manifest had no `files` field at all.
    pub include_all: bool,
}

impl FilesList {
    pub fn always_included(&self) -> &'static [&'static str] {
        ALWAYS_INCLUDED
    }

    /// Whether a path is reachable under the declared patterns.
    pub fn covers(&self, target: &str) -> bool {
        if self.include_all {
            return true;
        }
        let target = strip_dot_slash(target);
        if ALWAYS_INCLUDED
            .iter()
            .any(|p| glob_matches(p, target))
        {
            return true;
        }
        let matched = self.patterns.iter().any(|p| pattern_covers(p, target));
        matched && !self.negations.iter().any(|p| pattern_covers(p, target))
    }
}

fn glob_matches(pattern: &str, target: &str) -> bool {
    glob::Pattern::new(pattern)
        .map(|g| g.matches(target))
        .unwrap_or(false)
}

fn pattern_covers(pattern: &str, target: &str) -> bool {
    let pattern = strip_dot_slash(pattern).trim_end_matches('/');
    if pattern == target {
        return true;
    }
    // A bare directory entry includes everything beneath it.
    if target.starts_with(pattern) && target.as_bytes().get(pattern.len()) == Some(&b'/') {
        return true;
    }
    glob_matches(pattern, target)
}

fn has_glob_chars(text: &str) -> bool {
    text.chars().any(|c| matches!(c, '*' | '?' | '[' | '{'))
}

/// Parse the `files` array. With `validate`, suspicious entries and an
/// unreachable `main` produce warnings.
pub fn parse_files(
    files: Option<&Value>,
    main: Option<&str>,
    validate: bool,
) -> (FilesList, Vec<Issue>) {
    let mut issues = Vec::new();
    let Some(Value::Array(items)) = files else {
        return (
            FilesList {
                include_all: true,
                ..FilesList::default()
            },
            issues,
        );
    };

    let mut list = FilesList::default();
    for item in items {
        let Some(entry) = item.as_str() else { continue };
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        if let Some(negated) = entry.strip_prefix('!') {
            list.negations.push(negated.to_string());
            continue;
        }
        if validate && entry.ends_with('/') && !has_glob_chars(entry) {
            issues.push(Issue::new(
                "files",
                Code::SuspiciousIncludePattern,
                format!(
                    "'{}' includes a whole directory; prefer an explicit glob",
                    entry
                ),
            ));
        }
        list.patterns.push(entry.to_string());
    }
    list.has_globs = list.patterns.iter().chain(&list.negations).any(|p| has_glob_chars(p));

    if validate {
        if let Some(main) = main {
            if !list.covers(main) {
                issues.push(Issue::new(
                    "files",
                    Code::MainNotIncluded,
                    format!("main entry '{}' is not covered by the files list", main),
                ));
            }
        }
    }
    (list, issues)
}

/// One executable exposed by the package.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BinEntry {
    pub name: String,
    pub path: String,
}

/// Parsed `bin` entries, in declaration order.
#[derive(Clone, Debug, Default)]
pub struct BinMap {
    pub entries: Vec<BinEntry>,
}

impl BinMap {
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    /// Look a binary up by name; without a name the first-defined entry
    /// wins. Unknown names fail with the known names listed.
    pub fn lookup(&self, name: Option<&str>) -> Result<&BinEntry> {
        match name {
            None => self
                .entries
                .first()
                .ok_or_else(|| format_err!("package declares no binaries")),
            Some(wanted) => self.entries.iter().find(|e| e.name == wanted).ok_or_else(|| {
                format_err!(
                    "unknown binary '{}'; known binaries: {}",
                    wanted,
                    show_vec_with(&self.entries, |e| e.name.clone())
                )
            }),
        }
    }
}

fn bin_name_ok(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
}

fn check_bin_path(path: &str) -> std::result::Result<String, String> {
    if path.is_empty() {
        return Err("binary path must not be empty".to_string());
    }
    if path.starts_with('/') {
        return Err(format!("binary path '{}' must be relative", path));
    }
    if path.contains("://") || path.starts_with("file:") {
        return Err(format!("binary path '{}' must not use a URI scheme", path));
    }
    if path.split('/').any(|seg| seg == "..") {
        return Err(format!("binary path '{}' must not traverse upward", path));
    }
    Ok(ensure_dot_slash(path))
}

/// The package's local name with any scope stripped; the key used when `bin`
/// is a plain string.
fn unscoped_name(package_name: &str) -> &str {
    match package_name.rsplit_once('/') {
        Some((_, local)) if package_name.starts_with('@') => local,
        _ => package_name,
    }
}

/// Parse the `bin` field. Falls back to listing `directories.bin` through
/// the supplied probe when no `bin` is present.
pub fn parse_bin(
    bin: Option<&Value>,
    directories_bin: Option<&str>,
    package_name: &str,
    probe: Option<&dyn FileSystemProbe>,
    validate: bool,
    validate_paths: bool,
) -> (BinMap, Vec<Issue>) {
    let mut map = BinMap::default();
    let mut issues = Vec::new();

    let mut push = |name: &str, path: &str, issues: &mut Vec<Issue>| {
        if validate && !bin_name_ok(name) {
            issues.push(Issue::new(
                format!("bin.{}", name),
                Code::InvalidBinName,
                format!("'{}' is not a valid binary name", name),
            ));
            return;
        }
        match check_bin_path(path) {
            Ok(normalized) => map.entries.push(BinEntry {
                name: name.to_string(),
                path: normalized,
            }),
            Err(message) => {
                if validate || validate_paths {
                    issues.push(Issue::new(
                        format!("bin.{}", name),
                        Code::InvalidBinName,
                        message,
                    ));
                }
            }
        }
    };

    match bin {
        Some(Value::String(path)) => {
            push(unscoped_name(package_name), path, &mut issues);
        }
        Some(Value::Object(entries)) => {
            for (name, path_value) in entries {
                let Some(path) = path_value.as_str() else {
                    if validate {
                        issues.push(Issue::new(
                            format!("bin.{}", name),
                            Code::InvalidBinName,
                            "binary path must be a string",
                        ));
                    }
                    continue;
                };
                push(name, path, &mut issues);
            }
        }
        _ => {
            if let (Some(dir), Some(probe)) = (directories_bin, probe) {
                let dir = strip_dot_slash(dir).trim_end_matches('/').to_string();
                for file in probe.list_directory(&dir).unwrap_or_default() {
                    if file.starts_with('.') {
                        continue;
                    }
                    let path = format!("{}/{}", dir, file);
                    if !probe.file_exists(&path) {
                        continue;
                    }
                    let name = match file.rsplit_once('.') {
                        Some((stem, _)) if !stem.is_empty() => stem,
                        _ => file.as_str(),
                    };
                    push(name, &path, &mut issues);
                }
            }
        }
    }
    (map, issues)
}
