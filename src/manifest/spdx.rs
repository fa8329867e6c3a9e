use serde_derive::Serialize;

use super::{Code, Issue};

/// Recognized SPDX license identifiers, canonical case.
pub const LICENSES: &[&str] = &[
    "0BSD",
    "AFL-3.0",
    "AGPL-3.0-only",
    "AGPL-3.0-or-later",
    "Apache-1.1",
    "Apache-2.0",
    "APSL-2.0",
    "Artistic-1.0",
    "Artistic-2.0",
    "BlueOak-1.0.0",
    "BSD-1-Clause",
    "BSD-2-Clause",
    "BSD-2-Clause-Patent",
    "BSD-3-Clause",
    "BSD-3-Clause-Clear",
    "BSD-4-Clause",
    "BSL-1.0",
    "CC-BY-3.0",
    "CC-BY-4.0",
    "CC-BY-SA-3.0",
    "CC-BY-SA-4.0",
    "CC0-1.0",
    "CDDL-1.0",
    "CDDL-1.1",
    "CECILL-2.1",
    "CPL-1.0",
    "ECL-2.0",
    "EPL-1.0",
    "EPL-2.0",
    "EUPL-1.1",
    "EUPL-1.2",
    "GFDL-1.3-only",
    "GFDL-1.3-or-later",
    "GPL-2.0-only",
    "GPL-2.0-or-later",
    "GPL-3.0-only",
    "GPL-3.0-or-later",
    "ISC",
    "LGPL-2.0-only",
    "LGPL-2.0-or-later",
    "LGPL-2.1-only",
    "LGPL-2.1-or-later",
    "LGPL-3.0-only",
    "LGPL-3.0-or-later",
    "MIT",
    "MIT-0",
    "MPL-1.1",
    "MPL-2.0",
    "MS-PL",
    "MS-RL",
    "NCSA",
    "ODbL-1.0",
    "OFL-1.1",
    "OpenSSL",
    "OSL-3.0",
    "PostgreSQL",
    "Python-2.0",
    "Ruby",
    "SSPL-1.0",
    "Unicode-DFS-2016",
    "Unlicense",
    "UPL-1.0",
    "Vim",
    "W3C",
    "WTFPL",
    "X11",
    "Zlib",
    "ZPL-2.1",
];

/// Recognized SPDX license exceptions (the `WITH` operands).
pub const EXCEPTIONS: &[&str] = &[
    "Autoconf-exception-3.0",
    "Bison-exception-2.2",
    "Classpath-exception-2.0",
    "GCC-exception-3.1",
    "LGPL-3.0-linking-exception",
    "Linux-syscall-note",
    "LLVM-exception",
    "OpenJDK-assembly-exception-1.0",
    "WxWindows-exception-3.1",
];

/// Deprecated identifiers still accepted, with the replacement to suggest.
pub const DEPRECATED: &[(&str, &str)] = &[
    ("AGPL-3.0", "AGPL-3.0-only"),
    ("AGPL-3.0+", "AGPL-3.0-or-later"),
    ("GFDL-1.3", "GFDL-1.3-only"),
    ("GPL-2.0", "GPL-2.0-only"),
    ("GPL-2.0+", "GPL-2.0-or-later"),
    ("GPL-3.0", "GPL-3.0-only"),
    ("GPL-3.0+", "GPL-3.0-or-later"),
    ("LGPL-2.0", "LGPL-2.0-only"),
    ("LGPL-2.0+", "LGPL-2.0-or-later"),
    ("LGPL-2.1", "LGPL-2.1-only"),
    ("LGPL-2.1+", "LGPL-2.1-or-later"),
    ("LGPL-3.0", "LGPL-3.0-only"),
    ("LGPL-3.0+", "LGPL-3.0-or-later"),
    ("BSD-2-Clause-FreeBSD", "BSD-2-Clause"),
    ("BSD-2-Clause-NetBSD", "BSD-2-Clause"),
];

/// Case-insensitive lookup yielding the canonical-case identifier.
pub fn canonical_license(id: &str) -> Option<&'static str> {
    LICENSES.iter().find(|l| l.eq_ignore_ascii_case(id)).copied()
}

pub fn canonical_exception(id: &str) -> Option<&'static str> {
    EXCEPTIONS
        .iter()
        .find(|e| e.eq_ignore_ascii_case(id))
        .copied()
}

pub fn deprecated_license(id: &str) -> Option<(&'static str, &'static str)> {
    DEPRECATED
        .iter()
        .find(|(old, _)| old.eq_ignore_ascii_case(id))
        .copied()
}

/// Structured view of a validated license field.
#[derive(Clone, Debug, Default, Serialize)]
pub struct LicenseInfo {
    /// Canonical identifier or rebuilt expression, when recognized.
    pub canonical: Option<String>,
    /// The package is explicitly unpublishable (`UNLICENSED`).
    pub unlicensed: bool,
    /// File reference from `SEE LICENSE IN <file>`.
    pub file: Option<String>,
}

pub struct LicenseCheck {
    pub info: LicenseInfo,
    pub errors: Vec<Issue>,
    pub warnings: Vec<Issue>,
}

enum ExprState {
    ExpectId,
    ExpectOp,
    ExpectException,
}

/// Validate a license field: a single identifier, `UNLICENSED`,
/// `SEE LICENSE IN <file>`, or a compound `OR`/`AND`/`WITH` expression
/// optionally wrapped in one pair of parentheses.
pub fn validate_license(input: &str) -> LicenseCheck {
    let mut check = LicenseCheck {
        info: LicenseInfo::default(),
        errors: Vec::new(),
        warnings: Vec::new(),
    };
    let trimmed = input.trim();

    if trimmed.is_empty() {
        check.errors.push(Issue::new(
            "license",
            Code::InvalidSpdxIdentifier,
            "license must not be empty",
        ));
        return check;
    }

    if trimmed == "UNLICENSED" {
        check.info.unlicensed = true;
        check.info.canonical = Some("UNLICENSED".to_string());
        return check;
    }

    if let Some(file) = trimmed.strip_prefix("SEE LICENSE IN ") {
        let file = file.trim();
        if file.is_empty() {
            check.errors.push(Issue::new(
                "license",
                Code::InvalidSpdxExpression,
                "'SEE LICENSE IN' must name a file",
            ));
        } else {
            check.info.file = Some(file.to_string());
        }
        return check;
    }

    // A single outer pair of parentheses is allowed around an expression.
    let body = match (trimmed.strip_prefix('('), trimmed.ends_with(')')) {
        (Some(inner), true) => inner[..inner.len() - 1].trim(),
        _ => trimmed,
    };

    let mut state = ExprState::ExpectId;
    let mut canonical_parts: Vec<String> = Vec::new();
    for token in body.split_whitespace() {
        match state {
            ExprState::ExpectId => {
                if matches!(token, "OR" | "AND" | "WITH") {
                    check.errors.push(Issue::new(
                        "license",
                        Code::InvalidSpdxExpression,
                        format!("operator '{}' is not allowed here", token),
                    ));
                    return check;
                }
                if let Some(id) = canonical_license(token) {
                    canonical_parts.push(id.to_string());
                } else if let Some((id, replacement)) = deprecated_license(token) {
                    canonical_parts.push(id.to_string());
                    check.warnings.push(
                        Issue::new(
                            "license",
                            Code::DeprecatedLicense,
                            format!(
                                "license '{}' is deprecated; use '{}' instead",
                                id, replacement
                            ),
                        )
                        .with_value(serde_json::Value::String(replacement.to_string())),
                    );
                } else {
                    check.errors.push(Issue::new(
                        "license",
                        Code::InvalidSpdxIdentifier,
                        format!("unrecognized SPDX license identifier '{}'", token),
                    ));
                    return check;
                }
                state = ExprState::ExpectOp;
            }
            ExprState::ExpectOp => match token {
                "OR" | "AND" => {
                    canonical_parts.push(token.to_string());
                    state = ExprState::ExpectId;
                }
                "WITH" => {
                    canonical_parts.push(token.to_string());
                    state = ExprState::ExpectException;
                }
                other => {
                    check.errors.push(Issue::new(
                        "license",
                        Code::InvalidSpdxExpression,
                        format!("expected OR, AND or WITH, got '{}'", other),
                    ));
                    return check;
                }
            },
            ExprState::ExpectException => {
                if let Some(exception) = canonical_exception(token) {
                    canonical_parts.push(exception.to_string());
                    state = ExprState::ExpectOp;
                } else {
                    check.errors.push(Issue::new(
                        "license",
                        Code::InvalidSpdxIdentifier,
                        format!("unrecognized SPDX license exception '{}'", token),
                    ));
                    return check;
                }
            }
        }
    }
    if !matches!(state, ExprState::ExpectOp) {
        check.errors.push(Issue::new(
            "license",
            Code::InvalidSpdxExpression,
            "license expression must not end with an operator",
        ));
        return check;
    }
    check.info.canonical = Some(canonical_parts.join(" "));
    check
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(input: &str) -> LicenseInfo {
        let check = validate_license(input);
        assert!(check.errors.is_empty(), "{}: {:?}", input, check.errors);
        check.info
    }

    #[test]
    fn test_single_identifier() {
        assert_eq!(ok("MIT").canonical.as_deref(), Some("MIT"));
        // Recognition is case-insensitive, the result is canonical case.
        assert_eq!(ok("mit").canonical.as_deref(), Some("MIT"));
        assert_eq!(ok("apache-2.0").canonical.as_deref(), Some("Apache-2.0"));
    }

    #[test]
    fn test_unlicensed_and_file() {
        let info = ok("UNLICENSED");
        assert!(info.unlicensed);
        let info = ok("SEE LICENSE IN LICENSE.txt");
        assert_eq!(info.file.as_deref(), Some("LICENSE.txt"));
    }

    #[test]
    fn test_compound_expressions() {
        assert_eq!(
            ok("MIT OR Apache-2.0").canonical.as_deref(),
            Some("MIT OR Apache-2.0")
        );
        assert_eq!(
            ok("(MIT OR Apache-2.0)").canonical.as_deref(),
            Some("MIT OR Apache-2.0")
        );
        assert_eq!(
            ok("GPL-2.0-only WITH Classpath-exception-2.0 OR MIT")
                .canonical
                .as_deref(),
            Some("GPL-2.0-only WITH Classpath-exception-2.0 OR MIT")
        );
    }

    #[test]
    fn test_deprecated_identifier_warns() {
        let check = validate_license("GPL-3.0");
        assert!(check.errors.is_empty());
        assert_eq!(check.warnings.len(), 1);
        assert_eq!(check.warnings[0].code, Code::DeprecatedLicense);
        assert!(check.warnings[0].message.contains("GPL-3.0-only"));
        assert_eq!(check.info.canonical.as_deref(), Some("GPL-3.0"));
    }

    #[test]
    fn test_invalid_identifier() {
        let check = validate_license("Not-A-License");
        assert_eq!(check.errors[0].code, Code::InvalidSpdxIdentifier);
    }

    #[test]
    fn test_operator_position_errors() {
        for bad in ["OR MIT", "MIT OR", "MIT AND OR ISC", "MIT WITH"] {
            let check = validate_license(bad);
            assert!(
                check
                    .errors
                    .iter()
                    .any(|i| i.code == Code::InvalidSpdxExpression),
                "{}",
                bad
            );
        }
    }

    #[test]
    fn test_with_requires_exception() {
        let check = validate_license("MIT WITH Apache-2.0");
        assert_eq!(check.errors[0].code, Code::InvalidSpdxIdentifier);
    }

    #[test]
    fn test_empty_license() {
        let check = validate_license("   ");
        assert_eq!(check.errors[0].code, Code::InvalidSpdxIdentifier);
    }
}
