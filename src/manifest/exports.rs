use serde_json::Value;

use super::{Manifest, ModuleType};
use crate::semver::{range, Options};
use crate::util::strip_dot_slash;

/// Inputs for entry-point resolution. `conditions` is an ordered set the
/// caller promises to honor; `import`/`require` are implied by
/// `module_type`, `default` is the catch-all.
#[derive(Clone, Copy, Debug)]
pub struct ResolveOptions<'a> {
    pub module_type: ModuleType,
    pub subpath: &'a str,
    pub conditions: &'a [&'a str],
    pub resolve_types: bool,
    pub ts_version: Option<&'a str>,
}

impl<'a> ResolveOptions<'a> {
    pub fn new(module_type: ModuleType) -> Self {
        ResolveOptions {
            module_type,
            subpath: ".",
            conditions: &[],
            resolve_types: false,
            ts_version: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolvedEntry {
    pub entry: Option<String>,
    /// The subpath was explicitly mapped to `null`.
    pub restricted: bool,
    pub types: Option<String>,
    pub types_path: Option<String>,
}

enum Selection {
    Found(Value, Option<String>),
    Restricted,
    Missing,
}

/// Resolve the entry point for a subpath per the exports map, falling back
/// to `module`/`main` (and finally `./index.js`) for the root subpath.
pub fn resolve_entry(manifest: &Manifest, opts: &ResolveOptions<'_>) -> ResolvedEntry {
    let mut resolved = ResolvedEntry::default();

    if let Some(exports) = &manifest.exports {
        match select_subpath(exports, opts.subpath) {
            Selection::Restricted => resolved.restricted = true,
            Selection::Found(value, capture) => {
                if let Some(target) = resolve_conditional(&value, opts) {
                    resolved.entry = Some(match capture {
                        Some(capture) => target.replace('*', &capture),
                        None => target,
                    });
                }
            }
            Selection::Missing => {}
        }
    }

    if resolved.entry.is_none() && !resolved.restricted && opts.subpath == "." {
        resolved.entry = match opts.module_type {
            ModuleType::Module => manifest.module.clone().or_else(|| manifest.main.clone()),
            ModuleType::CommonJs => manifest.main.clone().or_else(|| manifest.module.clone()),
        }
        .or_else(|| Some("./index.js".to_string()));
    }

    if opts.resolve_types {
        resolved.types = manifest.types.clone();
        if let (Some(types_versions), Some(ts_version)) =
            (&manifest.types_versions, opts.ts_version)
        {
            resolved.types_path =
                resolve_types_versions(types_versions, ts_version, opts.subpath);
        }
    }
    resolved
}

fn select_subpath(exports: &Value, subpath: &str) -> Selection {
    match exports {
        Value::String(_) | Value::Array(_) => {
            if subpath == "." {
                Selection::Found(exports.clone(), None)
            } else {
                Selection::Missing
            }
        }
        Value::Null => {
            if subpath == "." {
                Selection::Restricted
            } else {
                Selection::Missing
            }
        }
        Value::Object(map) => {
            let is_subpath_map = map.keys().any(|k| k.starts_with('.'));
            if !is_subpath_map {
                // Top-level conditional map: the entry for ".".
                return if subpath == "." {
                    Selection::Found(exports.clone(), None)
                } else {
                    Selection::Missing
                };
            }
            if let Some(value) = map.get(subpath) {
                return if value.is_null() {
                    Selection::Restricted
                } else {
                    Selection::Found(value.clone(), None)
                };
            }
            // `*` patterns: the most specific (longest) prefix wins.
            let mut best: Option<(usize, &Value, String)> = None;
            for (key, value) in map {
                let Some(star) = key.find('*') else { continue };
                let (prefix, suffix) = (&key[..star], &key[star + 1..]);
                if subpath.len() >= prefix.len() + suffix.len()
                    && subpath.starts_with(prefix)
                    && subpath.ends_with(suffix)
                {
                    let capture = subpath[prefix.len()..subpath.len() - suffix.len()].to_string();
                    if best.as_ref().map_or(true, |(len, _, _)| prefix.len() > *len) {
                        best = Some((prefix.len(), value, capture));
                    }
                }
            }
            match best {
                Some((_, value, capture)) => {
                    if value.is_null() {
                        Selection::Restricted
                    } else {
                        Selection::Found(value.clone(), Some(capture))
                    }
                }
                None => Selection::Missing,
            }
        }
        _ => Selection::Missing,
    }
}

/// Walk a conditional value: strings resolve directly, arrays take the first
/// resolvable element, objects are walked in the caller's condition order
/// with the implied `import`/`require` and `default` appended.
fn resolve_conditional(value: &Value, opts: &ResolveOptions<'_>) -> Option<String> {
    match value {
        Value::String(target) => Some(target.clone()),
        Value::Array(items) => items.iter().find_map(|v| resolve_conditional(v, opts)),
        Value::Object(map) => {
            let implied = match opts.module_type {
                ModuleType::Module => "import",
                ModuleType::CommonJs => "require",
            };
            for condition in opts.conditions.iter().copied().chain([implied, "default"]) {
                if let Some(inner) = map.get(condition) {
                    if let Some(found) = resolve_conditional(inner, opts) {
                        return Some(found);
                    }
                }
            }
            None
        }
        _ => None,
    }
}

/// `typesVersions` keys are semver ranges; the first entry (in declaration
/// order) containing `ts_version` wins, then its pattern map is consulted.
fn resolve_types_versions(
    types_versions: &Value,
    ts_version: &str,
    subpath: &str,
) -> Option<String> {
    let map = types_versions.as_object()?;
    let candidate = strip_dot_slash(subpath);
    for (range_key, patterns) in map {
        if !range::satisfies(ts_version, range_key, Options::default()) {
            continue;
        }
        let patterns = patterns.as_object()?;
        if let Some(outputs) = patterns.get(candidate) {
            return first_output(outputs, None);
        }
        for (key, outputs) in patterns {
            let Some(star) = key.find('*') else { continue };
            let (prefix, suffix) = (&key[..star], &key[star + 1..]);
            if candidate.len() >= prefix.len() + suffix.len()
                && candidate.starts_with(prefix)
                && candidate.ends_with(suffix)
            {
                let capture = candidate[prefix.len()..candidate.len() - suffix.len()].to_string();
                return first_output(outputs, Some(&capture));
            }
        }
        return None;
    }
    None
}

fn first_output(outputs: &Value, capture: Option<&str>) -> Option<String> {
    let first = outputs.as_array()?.first()?.as_str()?;
    Some(match capture {
        Some(capture) => first.replace('*', capture),
        None => first.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn manifest(doc: serde_json::Value) -> Manifest {
        let result = super::super::validate_package_json(
            &doc,
            super::super::ValidateOptions::default(),
        );
        result.parsed.expect("fixture manifest must validate")
    }

    fn resolve(doc: serde_json::Value, opts: &ResolveOptions<'_>) -> ResolvedEntry {
        resolve_entry(&manifest(doc), opts)
    }

    #[test]
    fn test_conditional_exports_by_module_type() {
        let doc = json!({
            "name": "pkg",
            "version": "1.0.0",
            "exports": {".": {"import": "./esm.mjs", "require": "./cjs.cjs"}}
        });
        let entry = resolve(doc.clone(), &ResolveOptions::new(ModuleType::Module));
        assert_eq!(entry.entry.as_deref(), Some("./esm.mjs"));
        let entry = resolve(doc, &ResolveOptions::new(ModuleType::CommonJs));
        assert_eq!(entry.entry.as_deref(), Some("./cjs.cjs"));
    }

    #[test]
    fn test_top_level_string_and_conditional_map() {
        let doc = json!({
            "name": "pkg", "version": "1.0.0",
            "exports": "./only.js"
        });
        let entry = resolve(doc, &ResolveOptions::new(ModuleType::CommonJs));
        assert_eq!(entry.entry.as_deref(), Some("./only.js"));

        let doc = json!({
            "name": "pkg", "version": "1.0.0",
            "exports": {"import": "./m.mjs", "default": "./c.js"}
        });
        let entry = resolve(doc, &ResolveOptions::new(ModuleType::CommonJs));
        assert_eq!(entry.entry.as_deref(), Some("./c.js"));
    }

    #[test]
    fn test_caller_conditions_walk_in_order() {
        let doc = json!({
            "name": "pkg", "version": "1.0.0",
            "exports": {".": {
                "node": {"import": "./node.mjs", "default": "./node.cjs"},
                "browser": "./browser.js",
                "default": "./plain.js"
            }}
        });
        let mut opts = ResolveOptions::new(ModuleType::Module);
        opts.conditions = &["browser", "node"];
        let entry = resolve(doc.clone(), &opts);
        assert_eq!(entry.entry.as_deref(), Some("./browser.js"));

        opts.conditions = &["node"];
        let entry = resolve(doc, &opts);
        assert_eq!(entry.entry.as_deref(), Some("./node.mjs"));
    }

    #[test]
    fn test_subpath_pattern_substitution() {
        let doc = json!({
            "name": "pkg", "version": "1.0.0",
            "exports": {
                ".": "./index.js",
                "./features/*": "./dist/features/*.js"
            }
        });
        let mut opts = ResolveOptions::new(ModuleType::CommonJs);
        opts.subpath = "./features/auth";
        let entry = resolve(doc, &opts);
        assert_eq!(entry.entry.as_deref(), Some("./dist/features/auth.js"));
    }

    #[test]
    fn test_restricted_subpath() {
        let doc = json!({
            "name": "pkg", "version": "1.0.0",
            "exports": {".": "./index.js", "./internal/*": null}
        });
        let mut opts = ResolveOptions::new(ModuleType::CommonJs);
        opts.subpath = "./internal/anything";
        let entry = resolve(doc, &opts);
        assert_eq!(entry.entry, None);
        assert!(entry.restricted);
    }

    #[test]
    fn test_fallbacks_without_exports() {
        let doc = json!({
            "name": "pkg", "version": "1.0.0",
            "main": "./lib/main.cjs", "module": "./lib/main.mjs"
        });
        let entry = resolve(doc.clone(), &ResolveOptions::new(ModuleType::Module));
        assert_eq!(entry.entry.as_deref(), Some("./lib/main.mjs"));
        let entry = resolve(doc, &ResolveOptions::new(ModuleType::CommonJs));
        assert_eq!(entry.entry.as_deref(), Some("./lib/main.cjs"));

        let bare = json!({"name": "pkg", "version": "1.0.0"});
        let entry = resolve(bare, &ResolveOptions::new(ModuleType::CommonJs));
        assert_eq!(entry.entry.as_deref(), Some("./index.js"));
    }

    #[test]
    fn test_unknown_subpath_has_no_fallback() {
        let doc = json!({
            "name": "pkg", "version": "1.0.0",
            "main": "./index.js",
            "exports": {".": "./index.js"}
        });
        let mut opts = ResolveOptions::new(ModuleType::CommonJs);
        opts.subpath = "./missing";
        let entry = resolve(doc, &opts);
        assert_eq!(entry.entry, None);
        assert!(!entry.restricted);
    }

    #[test]
    fn test_types_resolution() {
        let doc = json!({
            "name": "pkg", "version": "1.0.0",
            "types": "./index.d.ts",
            "typesVersions": {
                ">=4.0": {"*": ["ts4/*"]},
                "*": {"*": ["ts3/*"]}
            }
        });
        let mut opts = ResolveOptions::new(ModuleType::CommonJs);
        opts.resolve_types = true;
        opts.ts_version = Some("4.5.0");
        opts.subpath = "./helpers";
        let entry = resolve(doc.clone(), &opts);
        assert_eq!(entry.types.as_deref(), Some("./index.d.ts"));
        assert_eq!(entry.types_path.as_deref(), Some("ts4/helpers"));

        opts.ts_version = Some("3.9.0");
        let entry = resolve(doc, &opts);
        assert_eq!(entry.types_path.as_deref(), Some("ts3/helpers"));
    }

    #[test]
    fn test_typings_field_alias() {
        let doc = json!({
            "name": "pkg", "version": "1.0.0",
            "typings": "./legacy.d.ts"
        });
        let mut opts = ResolveOptions::new(ModuleType::CommonJs);
        opts.resolve_types = true;
        let entry = resolve(doc, &opts);
        assert_eq!(entry.types.as_deref(), Some("./legacy.d.ts"));
    }

    #[test]
    fn test_array_fallback_values() {
        let doc = json!({
            "name": "pkg", "version": "1.0.0",
            "exports": {".": [{"unknown-condition": "./no.js"}, "./yes.js"]}
        });
        let entry = resolve(doc, &ResolveOptions::new(ModuleType::CommonJs));
        assert_eq!(entry.entry.as_deref(), Some("./yes.js"));
    }
}
