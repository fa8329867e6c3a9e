use std::fmt;

use serde_derive::Serialize;

use crate::errors::{bail, Result};

/// Why a registry name failed validation. The string forms are stable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegistryNameError {
    EmptyInput,
    InvalidScopePrefix,
    MissingSlash,
    MultipleSlashes,
    EmptyScope,
    EmptyName,
}

impl RegistryNameError {
    pub fn as_str(&self) -> &'static str {
        use RegistryNameError::*;
        match self {
            EmptyInput => "EMPTY_INPUT",
            InvalidScopePrefix => "INVALID_SCOPE_PREFIX",
            MissingSlash => "MISSING_SLASH",
            MultipleSlashes => "MULTIPLE_SLASHES",
            EmptyScope => "EMPTY_SCOPE",
            EmptyName => "EMPTY_NAME",
        }
    }
}

impl fmt::Display for RegistryNameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of registry-name validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RegistryNameInfo {
    pub valid: bool,
    pub scoped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RegistryNameError>,
}

impl RegistryNameInfo {
    fn invalid(error: RegistryNameError) -> RegistryNameInfo {
        RegistryNameInfo {
            valid: false,
            scoped: false,
            scope: None,
            name: None,
            error: Some(error),
        }
    }
}

/// Validate the shape of a name for registry routing. Character-level rules
/// are the manifest layer's concern; this only gates the `@scope/name`
/// structure.
pub fn validate_package_name_for_registry(name: &str) -> RegistryNameInfo {
    use RegistryNameError::*;
    if name.is_empty() {
        return RegistryNameInfo::invalid(EmptyInput);
    }
    if !name.starts_with('@') {
        return RegistryNameInfo {
            valid: true,
            scoped: false,
            scope: None,
            name: Some(name.to_string()),
            error: None,
        };
    }
    if name.starts_with("@@") {
        return RegistryNameInfo::invalid(InvalidScopePrefix);
    }
    let rest = &name[1..];
    let slashes = rest.matches('/').count();
    if slashes == 0 {
        return RegistryNameInfo::invalid(MissingSlash);
    }
    if slashes > 1 {
        return RegistryNameInfo::invalid(MultipleSlashes);
    }
    let (scope, local) = rest.split_once('/').unwrap();
    if scope.is_empty() {
        return RegistryNameInfo::invalid(EmptyScope);
    }
    if local.is_empty() {
        return RegistryNameInfo::invalid(EmptyName);
    }
    RegistryNameInfo {
        valid: true,
        scoped: true,
        scope: Some(scope.to_string()),
        name: Some(local.to_string()),
        error: None,
    }
}

/// URL-safe form for registry path segments: the `/` of a scoped name
/// becomes `%2F`, unscoped names pass through.
pub fn encode_package_name(name: &str) -> Result<String> {
    let info = validate_package_name_for_registry(name);
    if !info.valid {
        bail!(
            "cannot encode package name '{}': {}",
            name,
            info.error.expect("invalid info carries an error")
        );
    }
    if info.scoped {
        Ok(format!(
            "@{}%2F{}",
            info.scope.expect("scoped info carries a scope"),
            info.name.expect("scoped info carries a name")
        ))
    } else {
        Ok(name.to_string())
    }
}

/// Strict allowlist for multi-tenant path segments: 1-64 characters of
/// `[A-Za-z0-9_-]`, nothing else.
pub fn validate_namespace(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= 64
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unscoped_names_are_valid() {
        let info = validate_package_name_for_registry("lodash");
        assert!(info.valid);
        assert!(!info.scoped);
        assert_eq!(info.name.as_deref(), Some("lodash"));
    }

    #[test]
    fn test_scoped_name_parsing() {
        let info = validate_package_name_for_registry("@types/node");
        assert!(info.valid);
        assert!(info.scoped);
        assert_eq!(info.scope.as_deref(), Some("types"));
        assert_eq!(info.name.as_deref(), Some("node"));
    }

    #[test]
    fn test_registry_name_errors() {
        use RegistryNameError::*;
        let cases = [
            ("", EmptyInput),
            ("@@types/node", InvalidScopePrefix),
            ("@types", MissingSlash),
            ("@types/node/extra", MultipleSlashes),
            ("@/node", EmptyScope),
            ("@types/", EmptyName),
        ];
        for (input, expected) in cases {
            let info = validate_package_name_for_registry(input);
            assert!(!info.valid, "{}", input);
            assert_eq!(info.error, Some(expected), "{}", input);
        }
    }

    #[test]
    fn test_encode_package_name() {
        assert_eq!(encode_package_name("@types/node").unwrap(), "@types%2Fnode");
        assert_eq!(encode_package_name("lodash").unwrap(), "lodash");
        // Idempotent on already-encoded unscoped output.
        let once = encode_package_name("lodash").unwrap();
        assert_eq!(encode_package_name(&once).unwrap(), once);
        assert!(encode_package_name("").is_err());
        assert!(encode_package_name("@broken").is_err());
    }

    #[test]
    fn test_namespace_gate() {
        assert!(validate_namespace("tenant-1"));
        assert!(validate_namespace("A_b-9"));
        assert!(validate_namespace(&"x".repeat(64)));

        assert!(!validate_namespace(""));
        assert!(!validate_namespace(&"x".repeat(65)));
        for bad in ["a/b", "a.b", "a b", "a\nb", "caf\u{e9}", "..", "a:b"] {
            assert!(!validate_namespace(bad), "{:?}", bad);
        }
    }
}
