use serde_json::Value;
use url::Url;

use super::{Code, Issue};
use crate::semver::{self, Options};

pub const MAX_NAME_LENGTH: usize = 214;

/// Names no registry will accept.
pub const NAME_BLACKLIST: &[&str] = &["node_modules", "favicon.ico"];

/// Platform core-module identifiers that would shadow built-ins.
pub const CORE_MODULES: &[&str] = &[
    "assert",
    "async_hooks",
    "buffer",
    "child_process",
    "cluster",
    "console",
    "constants",
    "crypto",
    "dgram",
    "dns",
    "domain",
    "events",
    "fs",
    "http",
    "http2",
    "https",
    "inspector",
    "module",
    "net",
    "os",
    "path",
    "perf_hooks",
    "process",
    "punycode",
    "querystring",
    "readline",
    "repl",
    "stream",
    "string_decoder",
    "timers",
    "tls",
    "trace_events",
    "tty",
    "url",
    "util",
    "v8",
    "vm",
    "worker_threads",
    "zlib",
];

fn issue(code: Code, message: impl Into<String>) -> Issue {
    Issue::new("name", code, message)
}

fn name_char_ok(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '-' | '_')
}

/// Validate a package name, collecting every failed rule in rule order.
/// Scoped names (`@scope/name`) apply the same character rules to both
/// halves.
pub fn validate_package_name(name: &str) -> Vec<Issue> {
    if name.is_empty() {
        return vec![issue(Code::InvalidName, "name must not be empty")];
    }
    if name.starts_with('@') {
        return validate_scoped_name(name);
    }

    let mut issues = Vec::new();
    if name.len() > MAX_NAME_LENGTH {
        issues.push(issue(
            Code::NameTooLong,
            format!("name must be at most {} characters", MAX_NAME_LENGTH),
        ));
    }
    if name.starts_with('.') {
        issues.push(issue(
            Code::NameCannotStartWithDot,
            "name must not start with a period",
        ));
    }
    if name.starts_with('_') {
        issues.push(issue(
            Code::NameCannotStartWithUnderscore,
            "name must not start with an underscore",
        ));
    }
    issues.extend(character_rules(name, false));
    if NAME_BLACKLIST.contains(&name) {
        issues.push(issue(
            Code::NameBlacklisted,
            format!("'{}' is a blacklisted name", name),
        ));
    }
    if CORE_MODULES.contains(&name) {
        issues.push(issue(
            Code::NameCoreModule,
            format!("'{}' is a core module name", name),
        ));
    }
    issues
}

/// The shared character-class rules. For the scope half of a scoped name,
/// uppercase reports as an invalid scope rather than a lowercase violation.
fn character_rules(text: &str, is_scope: bool) -> Vec<Issue> {
    let mut issues = Vec::new();
    let has_upper = text.chars().any(|c| c.is_ascii_uppercase());
    let has_whitespace = text.chars().any(char::is_whitespace);
    let has_slash = text.contains('/');
    let has_forbidden = text
        .chars()
        .any(|c| !name_char_ok(c) && !c.is_ascii_uppercase() && !c.is_whitespace() && c != '/');

    if has_upper {
        if is_scope {
            issues.push(issue(
                Code::NameInvalidScope,
                "scope must not contain uppercase characters",
            ));
        } else {
            issues.push(issue(
                Code::NameMustBeLowercase,
                "name must not contain uppercase characters",
            ));
        }
    }
    if has_whitespace {
        issues.push(issue(
            Code::NameContainsInvalidChars,
            "name must not contain whitespace",
        ));
    }
    if has_slash {
        issues.push(issue(
            Code::NameUrlUnsafe,
            "name must not contain '/'",
        ));
    }
    if has_forbidden && !has_whitespace {
        issues.push(issue(
            Code::NameContainsInvalidChars,
            "name contains characters outside [a-z0-9._-]",
        ));
    }
    issues
}

fn validate_scoped_name(name: &str) -> Vec<Issue> {
    let rest = &name[1..];
    let mut parts = rest.splitn(3, '/');
    let scope = parts.next().unwrap_or("");
    let local = parts.next();
    let extra = parts.next();

    let Some(local) = local else {
        return vec![issue(
            Code::NameInvalidScope,
            "scoped name must take the form @scope/name",
        )];
    };
    if extra.is_some() {
        return vec![issue(
            Code::NameInvalidScope,
            "scoped name must contain exactly one '/'",
        )];
    }
    if scope.is_empty() {
        return vec![issue(Code::NameInvalidScope, "scope must not be empty")];
    }
    if local.is_empty() {
        return vec![issue(Code::NameInvalidScope, "scoped name must not be empty")];
    }

    let mut issues = Vec::new();
    if name.len() > MAX_NAME_LENGTH {
        issues.push(issue(
            Code::NameTooLong,
            format!("name must be at most {} characters", MAX_NAME_LENGTH),
        ));
    }
    issues.extend(character_rules(scope, true));
    if local.starts_with('.') {
        issues.push(issue(
            Code::NameCannotStartWithDot,
            "name must not start with a period",
        ));
    }
    if local.starts_with('_') {
        issues.push(issue(
            Code::NameCannotStartWithUnderscore,
            "name must not start with an underscore",
        ));
    }
    issues.extend(character_rules(local, false));
    issues
}

/// A version field is valid iff it parses under strict semver. Specific
/// shapes get specific messages.
pub fn validate_version_field(version: &str) -> Vec<Issue> {
    if version.is_empty() {
        return vec![Issue::new(
            "version",
            Code::InvalidVersion,
            "version must not be empty",
        )];
    }
    if version.starts_with('v') || version.starts_with('V') {
        return vec![Issue::new(
            "version",
            Code::InvalidSemver,
            "version must not carry a 'v' prefix",
        )];
    }
    if version.starts_with('-')
        && version[1..].chars().next().is_some_and(|c| c.is_ascii_digit())
    {
        return vec![Issue::new(
            "version",
            Code::InvalidSemver,
            "version must not be negative",
        )];
    }
    if semver::parse(version, Options::default()).is_none() {
        return vec![Issue::new(
            "version",
            Code::InvalidSemver,
            format!("'{}' is not valid semver", version),
        )];
    }
    Vec::new()
}

/// Any URL is valid iff the URL parser accepts it.
pub fn validate_url(field: &str, input: &str) -> Vec<Issue> {
    if Url::parse(input).is_err() {
        vec![Issue::new(
            field,
            Code::InvalidUrl,
            format!("'{}' is not a valid URL", input),
        )
        .with_value(Value::String(input.to_string()))]
    } else {
        Vec::new()
    }
}

/// Homepage must additionally use http or https.
pub fn validate_homepage(input: &str) -> Vec<Issue> {
    match Url::parse(input) {
        Err(_) => vec![Issue::new(
            "homepage",
            Code::InvalidUrl,
            format!("'{}' is not a valid URL", input),
        )],
        Ok(url) if !matches!(url.scheme(), "http" | "https") => vec![Issue::new(
            "homepage",
            Code::InvalidUrlProtocol,
            format!("homepage must use http or https, got '{}:'", url.scheme()),
        )],
        Ok(_) => Vec::new(),
    }
}

pub fn is_valid_email(input: &str) -> bool {
    let Some((local, domain)) = input.split_once('@') else {
        return false;
    };
    !local.is_empty() && !domain.is_empty() && domain.contains('.') && !domain.contains('@')
}

pub fn validate_email(field: &str, input: &str) -> Vec<Issue> {
    if is_valid_email(input) {
        Vec::new()
    } else {
        vec![Issue::new(
            field,
            Code::InvalidEmail,
            format!("'{}' is not a valid email address", input),
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name_codes(name: &str) -> Vec<&'static str> {
        validate_package_name(name)
            .iter()
            .map(|i| i.code.as_str())
            .collect()
    }

    #[test]
    fn test_valid_names() {
        for name in ["lodash", "my-package", "a", "under_score", "num2", "p.js"] {
            assert!(validate_package_name(name).is_empty(), "{}", name);
        }
    }

    #[test]
    fn test_name_rule_codes() {
        assert_eq!(name_codes(""), vec!["INVALID_NAME"]);
        assert_eq!(name_codes(".hidden"), vec!["NAME_CANNOT_START_WITH_DOT"]);
        assert_eq!(
            name_codes("_private"),
            vec!["NAME_CANNOT_START_WITH_UNDERSCORE"]
        );
        assert_eq!(name_codes("MyPackage"), vec!["NAME_MUST_BE_LOWERCASE"]);
        assert_eq!(name_codes("my package"), vec!["NAME_CONTAINS_INVALID_CHARS"]);
        assert_eq!(name_codes("my/package"), vec!["NAME_URL_UNSAFE"]);
        assert_eq!(name_codes("caf\u{e9}"), vec!["NAME_CONTAINS_INVALID_CHARS"]);
        assert_eq!(name_codes("node_modules"), vec!["NAME_BLACKLISTED"]);
        assert_eq!(name_codes("favicon.ico"), vec!["NAME_BLACKLISTED"]);
        assert_eq!(name_codes("fs"), vec!["NAME_CORE_MODULE"]);
        assert_eq!(name_codes("http"), vec!["NAME_CORE_MODULE"]);
    }

    #[test]
    fn test_name_length_boundary() {
        let ok = "a".repeat(214);
        assert!(validate_package_name(&ok).is_empty());
        let too_long = "a".repeat(215);
        assert_eq!(name_codes(&too_long), vec!["NAME_TOO_LONG"]);
    }

    #[test]
    fn test_scoped_names() {
        assert!(validate_package_name("@scope/name").is_empty());
        assert!(validate_package_name("@my-org/my.pkg").is_empty());
        assert_eq!(name_codes("@scope"), vec!["NAME_INVALID_SCOPE"]);
        assert_eq!(name_codes("@/name"), vec!["NAME_INVALID_SCOPE"]);
        assert_eq!(name_codes("@scope/"), vec!["NAME_INVALID_SCOPE"]);
        assert_eq!(name_codes("@scope/a/b"), vec!["NAME_INVALID_SCOPE"]);
        assert_eq!(name_codes("@Scope/name"), vec!["NAME_INVALID_SCOPE"]);
        assert_eq!(name_codes("@scope/Name"), vec!["NAME_MUST_BE_LOWERCASE"]);
    }

    #[test]
    fn test_multiple_violations_collected() {
        let codes = name_codes("_My Pkg");
        assert!(codes.contains(&"NAME_CANNOT_START_WITH_UNDERSCORE"));
        assert!(codes.contains(&"NAME_MUST_BE_LOWERCASE"));
        assert!(codes.contains(&"NAME_CONTAINS_INVALID_CHARS"));
    }

    #[test]
    fn test_version_field() {
        assert!(validate_version_field("1.2.3").is_empty());
        assert!(validate_version_field("1.2.3-rc.1+build").is_empty());

        let empty = validate_version_field("");
        assert_eq!(empty[0].code, Code::InvalidVersion);

        for bad in ["v1.2.3", "V1.2.3", "-1.0.0", "1.2", "01.0.0", "1.2.3.4"] {
            let issues = validate_version_field(bad);
            assert_eq!(issues[0].code, Code::InvalidSemver, "{}", bad);
        }
    }

    #[test]
    fn test_urls() {
        assert!(validate_url("repository.url", "https://example.com/a").is_empty());
        assert!(validate_url("repository.url", "git+ssh://git@host/x").is_empty());
        assert_eq!(
            validate_url("repository.url", "not a url")[0].code,
            Code::InvalidUrl
        );

        assert!(validate_homepage("https://example.com").is_empty());
        assert_eq!(
            validate_homepage("ftp://example.com")[0].code,
            Code::InvalidUrlProtocol
        );
        assert_eq!(validate_homepage("%%%")[0].code, Code::InvalidUrl);
    }

    #[test]
    fn test_email() {
        assert!(is_valid_email("dev@example.com"));
        assert!(!is_valid_email("dev"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("dev@localhost"));
        assert_eq!(
            validate_email("bugs.email", "nope")[0].code,
            Code::InvalidEmail
        );
    }
}
