use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use itertools::Itertools;
use regex::Regex;
use serde_derive::{Deserialize, Serialize};
use thiserror::Error;

use crate::errors::Result;

/// Vulnerability severity. Declaration order is severity order: a lower
/// ordinal is more severe, so `Critical < High < Medium < Low`.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "critical" => Ok(Severity::Critical),
            "high" => Ok(Severity::High),
            "medium" => Ok(Severity::Medium),
            "low" => Ok(Severity::Low),
            other => Err(format!("unknown severity '{}'", other)),
        }
    }
}

/// A known vulnerability attached to package metadata.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Vulnerability {
    pub id: String,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    Blocklisted,
    NotInAllowlist,
    LicenseViolation,
    Vulnerability,
    SizeExceeded,
}

impl ViolationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::Blocklisted => "blocklisted",
            ViolationKind::NotInAllowlist => "not_in_allowlist",
            ViolationKind::LicenseViolation => "license_violation",
            ViolationKind::Vulnerability => "vulnerability",
            ViolationKind::SizeExceeded => "size_exceeded",
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Violation {
    #[serde(rename = "type")]
    pub kind: ViolationKind,
    pub package: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
}

impl Violation {
    fn new(kind: ViolationKind, package: &str, message: impl Into<String>) -> Violation {
        Violation {
            kind,
            package: package.to_string(),
            message: message.into(),
            suggestion: None,
            details: None,
            severity: None,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct CheckResult {
    pub allowed: bool,
    pub package: String,
    pub violations: Vec<Violation>,
}

impl CheckResult {
    fn from_violations(package: &str, violations: Vec<Violation>) -> CheckResult {
        CheckResult {
            allowed: violations.is_empty(),
            package: package.to_string(),
            violations,
        }
    }
}

/// Everything `check_all` inspects about a package besides its name.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PackageMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vulnerabilities: Vec<Vulnerability>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// The plain-record form of a policy; serializable and recoverable from any
/// compiled [`SecurityPolicy`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deny: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_licenses: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_severity: Option<Severity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_package_size: Option<u64>,
}

/// Packages with a history of registry compromise or typosquatting, denied
/// by every preset.
pub const DEFAULT_DENY: &[&str] = &[
    "event-stream",
    "flatmap-stream",
    "getcookies",
    "crossenv",
    "cross-env.js",
    "mongose",
    "babelcli",
    "http-proxy.js",
];

const CONSERVATIVE_LICENSES: &[&str] = &[
    "MIT",
    "ISC",
    "BSD-2-Clause",
    "BSD-3-Clause",
    "Apache-2.0",
];

const STANDARD_LICENSES: &[&str] = &[
    "MIT",
    "ISC",
    "BSD-2-Clause",
    "BSD-3-Clause",
    "Apache-2.0",
    "MPL-2.0",
    "Unlicense",
    "CC0-1.0",
    "0BSD",
    "BlueOak-1.0.0",
    "Zlib",
    "Python-2.0",
];

const STANDARD_ALLOW: &[&str] = &[
    "@types/*",
    "@babel/*",
    "react",
    "react-*",
    "lodash",
    "lodash.*",
    "express",
    "axios",
    "typescript",
    "vite",
    "vitest",
    "jest",
    "eslint",
    "eslint-*",
    "prettier",
    "zod",
    "chalk",
    "commander",
    "semver",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Preset {
    Restricted,
    Standard,
    Permissive,
}

impl FromStr for Preset {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "restricted" => Ok(Preset::Restricted),
            "standard" => Ok(Preset::Standard),
            "permissive" => Ok(Preset::Permissive),
            other => Err(format!("unknown policy preset '{}'", other)),
        }
    }
}

#[derive(Debug, Error)]
#[error("{message}")]
pub struct PolicyError {
    pub message: String,
    /// Highest vulnerability severity among the violations, when any.
    pub severity: Option<Severity>,
}

/// Compiled allow/deny policy. Immutable once built; the original
/// configuration is recoverable via [`SecurityPolicy::config`].
pub struct SecurityPolicy {
    config: PolicyConfig,
    allow: Option<Vec<Regex>>,
    deny: Vec<Regex>,
    allowed_licenses: Option<HashSet<String>>,
}

/// Shell-glob matching with `*` as the only wildcard; everything else is
/// literal and the match is anchored to the whole name.
fn compile_pattern(pattern: &str) -> Regex {
    let mut source = String::from("^");
    for chunk in pattern.split('*') {
        if !source.ends_with('^') {
            source.push_str(".*");
        }
        source.push_str(&regex::escape(chunk));
    }
    source.push('$');
    Regex::new(&source).expect("escaped pattern is always a valid regex")
}

fn compile_patterns(patterns: &[String]) -> Vec<Regex> {
    patterns.iter().map(|p| compile_pattern(p)).collect()
}

fn matches_any(patterns: &[Regex], name: &str) -> bool {
    patterns.iter().any(|p| p.is_match(name))
}

impl SecurityPolicy {
    pub fn new(config: PolicyConfig) -> SecurityPolicy {
        SecurityPolicy {
            allow: config.allow.as_deref().map(compile_patterns),
            deny: config.deny.as_deref().map(compile_patterns).unwrap_or_default(),
            allowed_licenses: config
                .allowed_licenses
                .as_ref()
                .map(|l| l.iter().cloned().collect()),
            config,
        }
    }

    pub fn preset(preset: Preset) -> SecurityPolicy {
        let deny = Some(DEFAULT_DENY.iter().map(|s| s.to_string()).collect());
        let config = match preset {
            Preset::Restricted => PolicyConfig {
                allow: Some(Vec::new()),
                deny,
                allowed_licenses: Some(
                    CONSERVATIVE_LICENSES.iter().map(|s| s.to_string()).collect(),
                ),
                max_severity: Some(Severity::Low),
                max_package_size: Some(5 * 1024 * 1024),
            },
            Preset::Standard => PolicyConfig {
                allow: Some(STANDARD_ALLOW.iter().map(|s| s.to_string()).collect()),
                deny,
                allowed_licenses: Some(
                    STANDARD_LICENSES.iter().map(|s| s.to_string()).collect(),
                ),
                max_severity: Some(Severity::High),
                max_package_size: Some(50 * 1024 * 1024),
            },
            Preset::Permissive => PolicyConfig {
                allow: None,
                deny,
                allowed_licenses: None,
                max_severity: Some(Severity::Critical),
                max_package_size: Some(200 * 1024 * 1024),
            },
        };
        SecurityPolicy::new(config)
    }

    /// The plain-record configuration this policy was compiled from.
    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Name check: the deny list wins over any allow list, and a configured
    /// allow list (even an empty one) denies anything it does not match.
    pub fn check(&self, package: &str) -> CheckResult {
        let mut violations = Vec::new();
        if package.is_empty() {
            violations.push(Violation::new(
                ViolationKind::Blocklisted,
                package,
                "empty package names are not allowed",
            ));
            return CheckResult::from_violations(package, violations);
        }
        if matches_any(&self.deny, package) {
            let mut violation = Violation::new(
                ViolationKind::Blocklisted,
                package,
                format!("package '{}' is blocklisted by policy", package),
            );
            violation.suggestion =
                Some("remove the dependency or pick a maintained alternative".to_string());
            violations.push(violation);
        }
        if let Some(allow) = &self.allow {
            if !matches_any(allow, package) {
                violations.push(Violation::new(
                    ViolationKind::NotInAllowlist,
                    package,
                    format!("package '{}' is not in the allow list", package),
                ));
            }
        }
        CheckResult::from_violations(package, violations)
    }

    /// License check against the allowed set. `OR` passes when any side is
    /// allowed, `AND` requires every side, `X WITH E` is judged by `X`.
    pub fn check_license(&self, package: &str, license: Option<&str>) -> CheckResult {
        let Some(allowed) = &self.allowed_licenses else {
            return CheckResult::from_violations(package, Vec::new());
        };
        let mut violations = Vec::new();
        match license {
            None => violations.push(Violation::new(
                ViolationKind::LicenseViolation,
                package,
                format!("package '{}' declares no license", package),
            )),
            Some("UNLICENSED") => violations.push(Violation::new(
                ViolationKind::LicenseViolation,
                package,
                format!("package '{}' is UNLICENSED", package),
            )),
            Some(license) => {
                if !license_allowed(license, allowed) {
                    let mut violation = Violation::new(
                        ViolationKind::LicenseViolation,
                        package,
                        format!(
                            "license '{}' of package '{}' is not in the allowed set",
                            license, package
                        ),
                    );
                    violation.details = Some(license.to_string());
                    violations.push(violation);
                }
            }
        }
        CheckResult::from_violations(package, violations)
    }

    /// Vulnerabilities at or above (i.e. at least as severe as) the
    /// configured ceiling are violations.
    pub fn check_vulnerabilities(
        &self,
        package: &str,
        vulnerabilities: &[Vulnerability],
    ) -> CheckResult {
        let Some(max) = self.config.max_severity else {
            return CheckResult::from_violations(package, Vec::new());
        };
        let violations = vulnerabilities
            .iter()
            .filter(|v| v.severity <= max)
            .map(|v| {
                let mut violation = Violation::new(
                    ViolationKind::Vulnerability,
                    package,
                    format!(
                        "package '{}' has a {} severity vulnerability ({})",
                        package, v.severity, v.id
                    ),
                );
                violation.severity = Some(v.severity);
                violation.details = v.description.clone();
                violation
            })
            .collect();
        CheckResult::from_violations(package, violations)
    }

    pub fn check_size(&self, package: &str, size: u64) -> CheckResult {
        let mut violations = Vec::new();
        if let Some(max) = self.config.max_package_size {
            if size > max {
                let mut violation = Violation::new(
                    ViolationKind::SizeExceeded,
                    package,
                    format!(
                        "package '{}' is {} bytes, above the {} byte limit",
                        package, size, max
                    ),
                );
                violation.details = Some(format!("{}", size));
                violations.push(violation);
            }
        }
        CheckResult::from_violations(package, violations)
    }

    /// All checks under one policy; `allowed` is the conjunction.
    pub fn check_all(&self, package: &str, metadata: &PackageMetadata) -> CheckResult {
        let mut violations = self.check(package).violations;
        violations.extend(
            self.check_license(package, metadata.license.as_deref())
                .violations,
        );
        violations.extend(
            self.check_vulnerabilities(package, &metadata.vulnerabilities)
                .violations,
        );
        if let Some(size) = metadata.size {
            violations.extend(self.check_size(package, size).violations);
        }
        CheckResult::from_violations(package, violations)
    }

    /// Layer another configuration on top: allow and deny lists concatenate,
    /// scalar fields take the additional value when set.
    pub fn extend(&self, additional: &PolicyConfig) -> SecurityPolicy {
        let concat = |a: &Option<Vec<String>>, b: &Option<Vec<String>>| match (a, b) {
            (None, None) => None,
            (a, b) => Some(
                a.iter()
                    .flatten()
                    .chain(b.iter().flatten())
                    .cloned()
                    .collect(),
            ),
        };
        SecurityPolicy::new(PolicyConfig {
            allow: concat(&self.config.allow, &additional.allow),
            deny: concat(&self.config.deny, &additional.deny),
            allowed_licenses: additional
                .allowed_licenses
                .clone()
                .or_else(|| self.config.allowed_licenses.clone()),
            max_severity: additional.max_severity.or(self.config.max_severity),
            max_package_size: additional
                .max_package_size
                .or(self.config.max_package_size),
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.config)?)
    }

    pub fn from_json(text: &str) -> Result<SecurityPolicy> {
        let config: PolicyConfig = serde_json::from_str(text)?;
        Ok(SecurityPolicy::new(config))
    }

    /// Name check that fails with a consolidated message.
    pub fn assert(&self, package: &str) -> Result<()> {
        Self::raise(self.check(package))
    }

    /// Full check that fails with a consolidated message carrying the
    /// highest vulnerability severity encountered.
    pub fn assert_all(&self, package: &str, metadata: &PackageMetadata) -> Result<()> {
        Self::raise(self.check_all(package, metadata))
    }

    fn raise(result: CheckResult) -> Result<()> {
        if result.allowed {
            return Ok(());
        }
        let severity = result
            .violations
            .iter()
            .filter_map(|v| v.severity)
            .min();
        let message = format!(
            "security policy rejected '{}': {}",
            result.package,
            result.violations.iter().map(|v| v.message.as_str()).join("; ")
        );
        log::warn!("{}", message);
        Err(PolicyError { message, severity }.into())
    }
}

fn license_allowed(license: &str, allowed: &HashSet<String>) -> bool {
    let expr = license
        .trim()
        .trim_start_matches('(')
        .trim_end_matches(')')
        .trim();
    let side_allowed = |side: &str| {
        let id = side.trim().split(" WITH ").next().unwrap_or("").trim();
        allowed.contains(id)
    };
    if expr.contains(" OR ") {
        expr.split(" OR ").any(side_allowed)
    } else if expr.contains(" AND ") {
        expr.split(" AND ").all(side_allowed)
    } else {
        side_allowed(expr)
    }
}
