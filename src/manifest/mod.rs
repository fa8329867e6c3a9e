use std::fmt;

use serde::ser::{Serialize, Serializer};
use serde_json::Value;

use crate::semver::{self, Options, Version};

pub mod depspec;
pub mod exports;
pub mod files;
pub mod normalize;
pub mod scripts;
pub mod spdx;
pub mod validate;

pub use depspec::{parse_dependency, DependencyKind, DependencySpec};
pub use exports::{resolve_entry, ResolveOptions, ResolvedEntry};
pub use files::{parse_bin, parse_files, BinEntry, BinMap, FileSystemProbe, FilesList};
pub use normalize::{
    normalize_bugs, normalize_keywords, normalize_repository, parse_person, Bugs, Person,
    Repository,
};
pub use scripts::{parse_scripts, ScriptEntry};
pub use spdx::{validate_license, LicenseInfo};

/// Stable codes attached to validation issues. The string forms are part of
/// the public contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Code {
    RequiredFieldMissing,
    InvalidName,
    NameMustBeLowercase,
    NameContainsInvalidChars,
    NameCannotStartWithDot,
    NameCannotStartWithUnderscore,
    NameTooLong,
    NameUrlUnsafe,
    NameBlacklisted,
    NameCoreModule,
    NameInvalidScope,
    InvalidVersion,
    InvalidSemver,
    InvalidType,
    InvalidUrl,
    InvalidUrlProtocol,
    InvalidEmail,
    InvalidSpdxIdentifier,
    InvalidSpdxExpression,
    InvalidBinName,
    InvalidDependency,
    JsonParseError,
    DeprecatedLicense,
    InvalidEngineRange,
    KeywordTooLong,
    SuspiciousIncludePattern,
    MainNotIncluded,
    BinNotInFiles,
    PublishConfigOnPrivate,
    DeprecatedField,
}

impl Code {
    pub fn as_str(&self) -> &'static str {
        use Code::*;
        match self {
            RequiredFieldMissing => "REQUIRED_FIELD_MISSING",
            InvalidName => "INVALID_NAME",
            NameMustBeLowercase => "NAME_MUST_BE_LOWERCASE",
            NameContainsInvalidChars => "NAME_CONTAINS_INVALID_CHARS",
            NameCannotStartWithDot => "NAME_CANNOT_START_WITH_DOT",
            NameCannotStartWithUnderscore => "NAME_CANNOT_START_WITH_UNDERSCORE",
            NameTooLong => "NAME_TOO_LONG",
            NameUrlUnsafe => "NAME_URL_UNSAFE",
            NameBlacklisted => "NAME_BLACKLISTED",
            NameCoreModule => "NAME_CORE_MODULE",
            NameInvalidScope => "NAME_INVALID_SCOPE",
            InvalidVersion => "INVALID_VERSION",
            InvalidSemver => "INVALID_SEMVER",
            InvalidType => "INVALID_TYPE",
            InvalidUrl => "INVALID_URL",
            InvalidUrlProtocol => "INVALID_URL_PROTOCOL",
            InvalidEmail => "INVALID_EMAIL",
            InvalidSpdxIdentifier => "INVALID_SPDX_IDENTIFIER",
            InvalidSpdxExpression => "INVALID_SPDX_EXPRESSION",
            InvalidBinName => "INVALID_BIN_NAME",
            InvalidDependency => "INVALID_DEPENDENCY",
            JsonParseError => "JSON_PARSE_ERROR",
            DeprecatedLicense => "DEPRECATED_LICENSE",
            InvalidEngineRange => "INVALID_ENGINE_RANGE",
            KeywordTooLong => "KEYWORD_TOO_LONG",
            SuspiciousIncludePattern => "SUSPICIOUS_INCLUDE_PATTERN",
            MainNotIncluded => "MAIN_NOT_INCLUDED",
            BinNotInFiles => "BIN_NOT_IN_FILES",
            PublishConfigOnPrivate => "PUBLISH_CONFIG_ON_PRIVATE",
            DeprecatedField => "DEPRECATED_FIELD",
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Code {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// One validation error or warning: the field path it concerns, a stable
/// code, a human message, and optionally the offending value.
#[derive(Clone, Debug, serde_derive::Serialize)]
pub struct Issue {
    pub field: String,
    pub code: Code,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl Issue {
    pub fn new(field: impl Into<String>, code: Code, message: impl Into<String>) -> Issue {
        Issue {
            field: field.into(),
            code,
            message: message.into(),
            value: None,
        }
    }

    pub fn with_value(mut self, value: Value) -> Issue {
        self.value = Some(value);
        self
    }
}

/// The module system a package declares via its `type` field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ModuleType {
    #[default]
    CommonJs,
    Module,
}

impl ModuleType {
    pub fn from_field(value: &str) -> Option<ModuleType> {
        match value {
            "commonjs" => Some(ModuleType::CommonJs),
            "module" => Some(ModuleType::Module),
            _ => None,
        }
    }
}

/// A script-runtime requirement such as `engines.node`.
#[derive(Clone, Debug)]
pub struct EngineEntry {
    pub name: String,
    pub range: String,
    pub valid: bool,
}

/// A fully validated package manifest. Only produced when validation found no
/// errors.
#[derive(Clone, Debug, Default)]
pub struct Manifest {
    pub name: String,
    pub version: Option<Version>,
    pub description: Option<String>,
    pub module_type: ModuleType,
    pub private: bool,
    pub license: Option<LicenseInfo>,
    pub homepage: Option<String>,
    pub repository: Option<Repository>,
    pub bugs: Option<Bugs>,
    pub keywords: Vec<String>,
    pub author: Option<Person>,
    pub contributors: Vec<Person>,
    pub dependencies: Vec<DependencySpec>,
    pub dev_dependencies: Vec<DependencySpec>,
    pub peer_dependencies: Vec<DependencySpec>,
    pub optional_dependencies: Vec<DependencySpec>,
    pub scripts: Vec<ScriptEntry>,
    pub engines: Vec<EngineEntry>,
    pub files: FilesList,
    pub bin: BinMap,
    pub main: Option<String>,
    pub module: Option<String>,
    pub types: Option<String>,
    pub exports: Option<Value>,
    pub types_versions: Option<Value>,
}

/// Outcome of manifest validation. `parsed` is populated only when no errors
/// were produced.
#[derive(Debug, Default)]
pub struct Validation {
    pub valid: bool,
    pub errors: Vec<Issue>,
    pub warnings: Vec<Issue>,
    pub parsed: Option<Manifest>,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ValidateOptions {
    /// Skip name/version strictness for manifests marked private.
    pub relax_private: bool,
}

fn string_field(value: &Value, field: &str) -> Option<String> {
    value.get(field).and_then(Value::as_str).map(str::to_string)
}

/// Validate a decoded manifest document, collecting every applicable error
/// and warning in one pass.
pub fn validate_package_json(value: &Value, opts: ValidateOptions) -> Validation {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let mut manifest = Manifest::default();

    manifest.private = value.get("private").and_then(Value::as_bool).unwrap_or(false);
    let relaxed = opts.relax_private && manifest.private;

    // name
    match value.get("name").and_then(Value::as_str) {
        None if relaxed => {}
        None => errors.push(Issue::new(
            "name",
            Code::RequiredFieldMissing,
            "missing required field 'name'",
        )),
        Some(name) => {
            manifest.name = name.to_string();
            if !relaxed {
                errors.extend(validate::validate_package_name(name));
            }
        }
    }

    // version
    match value.get("version").and_then(Value::as_str) {
        None if relaxed => {}
        None => errors.push(Issue::new(
            "version",
            Code::RequiredFieldMissing,
            "missing required field 'version'",
        )),
        Some(version) => {
            let issues = validate::validate_version_field(version);
            if issues.is_empty() {
                manifest.version = semver::parse(version, Options::default());
            } else if !relaxed {
                errors.extend(issues);
            }
        }
    }

    // type
    match value.get("type") {
        None => {}
        Some(Value::String(t)) => match ModuleType::from_field(t) {
            Some(module_type) => manifest.module_type = module_type,
            None => errors.push(
                Issue::new(
                    "type",
                    Code::InvalidType,
                    format!("'type' must be 'module' or 'commonjs', got '{}'", t),
                )
                .with_value(Value::String(t.clone())),
            ),
        },
        Some(other) => errors.push(
            Issue::new("type", Code::InvalidType, "'type' must be a string")
                .with_value(other.clone()),
        ),
    }

    manifest.description = string_field(value, "description");
    manifest.main = string_field(value, "main");
    manifest.module = string_field(value, "module");
    manifest.types = string_field(value, "types").or_else(|| string_field(value, "typings"));
    manifest.exports = value.get("exports").cloned();
    manifest.types_versions = value.get("typesVersions").cloned();

    if manifest.private && value.get("publishConfig").is_some() {
        warnings.push(Issue::new(
            "publishConfig",
            Code::PublishConfigOnPrivate,
            "publishConfig has no effect on a private package",
        ));
    }

    if value.get("preferGlobal").is_some() {
        warnings.push(Issue::new(
            "preferGlobal",
            Code::DeprecatedField,
            "'preferGlobal' is deprecated and ignored by modern package managers",
        ));
    }

    // license
    if let Some(license) = value.get("license").and_then(Value::as_str) {
        let check = validate_license(license);
        errors.extend(check.errors);
        warnings.extend(check.warnings);
        manifest.license = Some(check.info);
    }

    // homepage
    if let Some(homepage) = value.get("homepage").and_then(Value::as_str) {
        let issues = validate::validate_homepage(homepage);
        if issues.is_empty() {
            manifest.homepage = Some(homepage.to_string());
        }
        errors.extend(issues);
    }

    // bugs
    if let Some(bugs_value) = value.get("bugs") {
        let bugs = normalize_bugs(bugs_value);
        if let Some(bugs) = &bugs {
            if let Some(url) = &bugs.url {
                errors.extend(validate::validate_url("bugs.url", url));
            }
            if let Some(email) = &bugs.email {
                errors.extend(validate::validate_email("bugs.email", email));
            }
        }
        manifest.bugs = bugs;
    }

    // repository
    if let Some(repository) = value.get("repository") {
        manifest.repository = normalize_repository(repository);
    }

    // keywords
    if let Some(keywords) = value.get("keywords") {
        manifest.keywords = normalize_keywords(keywords);
        warnings.extend(normalize::keyword_warnings(&manifest.keywords));
    }

    // people
    if let Some(author) = value.get("author") {
        manifest.author = parse_person(author);
    }
    if let Some(Value::Array(contributors)) = value.get("contributors") {
        manifest.contributors = contributors.iter().filter_map(parse_person).collect();
    }

    // dependency-like maps
    for (field, slot) in [
        ("dependencies", 0usize),
        ("devDependencies", 1),
        ("peerDependencies", 2),
        ("optionalDependencies", 3),
    ] {
        let Some(Value::Object(map)) = value.get(field) else {
            continue;
        };
        let mut specs = Vec::with_capacity(map.len());
        for (name, spec_value) in map {
            let Some(specifier) = spec_value.as_str() else {
                errors.push(
                    Issue::new(
                        format!("{}.{}", field, name),
                        Code::InvalidDependency,
                        "dependency specifier must be a string",
                    )
                    .with_value(spec_value.clone()),
                );
                continue;
            };
            let spec = parse_dependency(name, specifier, true);
            if !spec.valid {
                errors.push(Issue::new(
                    format!("{}.{}", field, name),
                    Code::InvalidDependency,
                    spec.error
                        .clone()
                        .unwrap_or_else(|| "invalid dependency specifier".to_string()),
                ));
            }
            specs.push(spec);
        }
        match slot {
            0 => manifest.dependencies = specs,
            1 => manifest.dev_dependencies = specs,
            2 => manifest.peer_dependencies = specs,
            _ => manifest.optional_dependencies = specs,
        }
    }
    // scripts
    if let Some(Value::Object(map)) = value.get("scripts") {
        let entries: Vec<(String, String)> = map
            .iter()
            .filter_map(|(name, command)| {
                command.as_str().map(|c| (name.clone(), c.to_string()))
            })
            .collect();
        manifest.scripts = parse_scripts(&entries);
    }

    // engines
    if let Some(Value::Object(map)) = value.get("engines") {
        for (name, range_value) in map {
            let Some(range) = range_value.as_str() else {
                warnings.push(Issue::new(
                    format!("engines.{}", name),
                    Code::InvalidEngineRange,
                    "engine requirement must be a string",
                ));
                continue;
            };
            let valid = semver::range::valid_range(range, Options::default()).is_some();
            if !valid {
                warnings.push(
                    Issue::new(
                        format!("engines.{}", name),
                        Code::InvalidEngineRange,
                        format!("unparseable engine range '{}'", range),
                    )
                    .with_value(Value::String(range.to_string())),
                );
            }
            manifest.engines.push(EngineEntry {
                name: name.clone(),
                range: range.to_string(),
                valid,
            });
        }
    }

    // files
    let (files, file_issues) =
        parse_files(value.get("files"), manifest.main.as_deref(), true);
    manifest.files = files;
    warnings.extend(file_issues);

    // bin
    let directories_bin = value
        .pointer("/directories/bin")
        .and_then(Value::as_str)
        .map(str::to_string);
    let (bin, bin_issues) = parse_bin(
        value.get("bin"),
        directories_bin.as_deref(),
        &manifest.name,
        None,
        true,
        true,
    );
    errors.extend(bin_issues);
    if !manifest.files.include_all {
        for entry in &bin.entries {
            if !manifest.files.covers(&entry.path) {
                warnings.push(Issue::new(
                    format!("bin.{}", entry.name),
                    Code::BinNotInFiles,
                    format!("binary '{}' is not covered by the files list", entry.path),
                ));
            }
        }
    }
    manifest.bin = bin;

    let valid = errors.is_empty();
    Validation {
        valid,
        errors,
        warnings,
        parsed: valid.then_some(manifest),
    }
}

/// Decode a JSON text and validate it. A decode failure short-circuits with
/// only `JSON_PARSE_ERROR` reported.
pub fn parse_package_json(text: &str, opts: ValidateOptions) -> Validation {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => validate_package_json(&value, opts),
        Err(err) => Validation {
            valid: false,
            errors: vec![Issue::new(
                "",
                Code::JsonParseError,
                format!("invalid JSON: {}", err),
            )],
            warnings: Vec::new(),
            parsed: None,
        },
    }
}
