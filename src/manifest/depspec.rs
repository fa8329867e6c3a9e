use std::sync::LazyLock;

use regex::Regex;
use serde_derive::Serialize;

use crate::semver::{self, range, Options};

/// How a dependency specifier resolves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    Exact,
    Range,
    Git,
    GitHub,
    File,
    Alias,
    Workspace,
    Url,
    Tag,
}

/// A classified dependency entry.
#[derive(Clone, Debug, Serialize)]
pub struct DependencySpec {
    pub name: String,
    pub specifier: String,
    pub kind: DependencyKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub real_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DependencySpec {
    fn new(name: &str, specifier: &str, kind: DependencyKind) -> DependencySpec {
        DependencySpec {
            name: name.to_string(),
            specifier: specifier.to_string(),
            kind,
            url: None,
            path: None,
            git_ref: None,
            real_name: None,
            version: None,
            valid: true,
            error: None,
        }
    }
}

static GITHUB_SHORTHAND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.-]+/[A-Za-z0-9_.-]+(?:#(.+))?$").unwrap());

fn looks_like_range(specifier: &str) -> bool {
    specifier.is_empty()
        || specifier.contains("||")
        || specifier.contains(" - ")
        || specifier
            .chars()
            .next()
            .is_some_and(|c| matches!(c, '^' | '~' | '>' | '<' | '=' | '*' | 'x' | 'X' | 'v') || c.is_ascii_digit())
}

/// Classify one `{name, specifier}` dependency entry. With `validate`,
/// range-shaped specifiers that do not parse are flagged invalid.
pub fn parse_dependency(name: &str, specifier: &str, validate: bool) -> DependencySpec {
    // Protocol-marked forms first; none of these can be a version range.
    if specifier.starts_with("git+")
        || specifier.starts_with("git://")
        || specifier.starts_with("git@")
        || specifier.ends_with(".git")
    {
        let mut spec = DependencySpec::new(name, specifier, DependencyKind::Git);
        spec.url = Some(specifier.to_string());
        return spec;
    }
    if let Some(rest) = specifier.strip_prefix("npm:") {
        let mut spec = DependencySpec::new(name, specifier, DependencyKind::Alias);
        // The real name may itself be scoped, so split on the last '@'.
        match rest.rfind('@') {
            Some(at) if at > 0 => {
                spec.real_name = Some(rest[..at].to_string());
                spec.version = Some(rest[at + 1..].to_string());
            }
            _ => {
                spec.real_name = Some(rest.to_string());
            }
        }
        if validate && spec.real_name.as_deref().map_or(true, str::is_empty) {
            spec.valid = false;
            spec.error = Some(format!("alias specifier '{}' names no package", specifier));
        }
        return spec;
    }
    if let Some(path) = specifier.strip_prefix("file:") {
        let mut spec = DependencySpec::new(name, specifier, DependencyKind::File);
        spec.path = Some(path.to_string());
        return spec;
    }
    if specifier.starts_with("workspace:") {
        return DependencySpec::new(name, specifier, DependencyKind::Workspace);
    }
    if specifier.starts_with("http://") || specifier.starts_with("https://") {
        let mut spec = DependencySpec::new(name, specifier, DependencyKind::Url);
        spec.url = Some(specifier.to_string());
        return spec;
    }

    if semver::parse(specifier, Options::default()).is_some() {
        return DependencySpec::new(name, specifier, DependencyKind::Exact);
    }
    if looks_like_range(specifier) {
        let mut spec = DependencySpec::new(name, specifier, DependencyKind::Range);
        if validate && range::valid_range(specifier, Options::default()).is_none() {
            spec.valid = false;
            spec.error = Some(format!("'{}' is not a valid version range", specifier));
        }
        return spec;
    }
    if let Some(caps) = GITHUB_SHORTHAND_RE.captures(specifier) {
        let mut spec = DependencySpec::new(name, specifier, DependencyKind::GitHub);
        spec.git_ref = caps.get(1).map(|m| m.as_str().to_string());
        return spec;
    }
    DependencySpec::new(name, specifier, DependencyKind::Tag)
}
