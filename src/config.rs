use serde::de::IgnoredAny;
use serde_derive::Deserialize;
use toml;

use crate::errors::*;

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use crate::policy::{PolicyConfig, Preset, SecurityPolicy, Severity};
use crate::semver::engine::{
    SemverEngine, RANGE_CACHE_SIZE, SATISFIES_CACHE_SIZE, VERSION_CACHE_SIZE,
};

/// Tool configuration (`edgepack.toml`): the default policy preset, policy
/// overrides layered on top of it, and cache capacities.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    pub preset: Option<String>,
    pub policy: Option<PolicyOverride>,
    pub cache: CacheSettings,

    #[serde(flatten)]
    pub unknown_fields: HashMap<String, IgnoredAny>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct PolicyOverride {
    allow: Option<Vec<String>>,
    deny: Option<Vec<String>>,
    allowed_licenses: Option<Vec<String>>,
    max_severity: Option<String>,
    max_package_size: Option<u64>,

    #[serde(flatten)]
    pub unknown_fields: HashMap<String, IgnoredAny>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct CacheSettings {
    pub versions: usize,
    pub ranges: usize,
    pub satisfies: usize,

    #[serde(flatten)]
    pub unknown_fields: HashMap<String, IgnoredAny>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        CacheSettings {
            versions: VERSION_CACHE_SIZE,
            ranges: RANGE_CACHE_SIZE,
            satisfies: SATISFIES_CACHE_SIZE,
            unknown_fields: HashMap::new(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            preset: None,
            policy: None,
            cache: CacheSettings::default(),
            unknown_fields: HashMap::new(),
        }
    }
}

impl Config {
    pub fn parse(src: &Path) -> Result<Config> {
        let mut config_file = File::open(src)?;
        let mut content = String::new();
        config_file.read_to_string(&mut content)?;

        let config: Config = toml::from_str(&content)?;

        let mut unknown_fields = Vec::new();

        for field in config.unknown_fields.keys() {
            unknown_fields.push(field.clone());
        }
        if let Some(ref policy) = config.policy {
            for field in policy.unknown_fields.keys() {
                unknown_fields.push(format!("policy.{}", field));
            }
        }
        for field in config.cache.unknown_fields.keys() {
            unknown_fields.push(format!("cache.{}", field));
        }

        if !unknown_fields.is_empty() {
            edgepack_log!(
                Tone::Notice,
                "Warning: Unknown fields in {}: {:?}",
                src.display(),
                unknown_fields
            );
            edgepack_log!(
                Tone::Notice,
                "         These fields will be ignored. Please check for typos."
            );
        }

        Ok(config)
    }

    /// The compiled policy: the named preset (default `standard`) extended
    /// with the `[policy]` overrides.
    pub fn security_policy(&self) -> Result<SecurityPolicy> {
        let preset = match self.preset.as_deref() {
            None => Preset::Standard,
            Some(name) => Preset::from_str(name).map_err(|e| format_err!("{}", e))?,
        };
        let base = SecurityPolicy::preset(preset);
        let Some(overrides) = &self.policy else {
            return Ok(base);
        };
        let max_severity = match overrides.max_severity.as_deref() {
            None => None,
            Some(name) => Some(Severity::from_str(name).map_err(|e| format_err!("{}", e))?),
        };
        Ok(base.extend(&PolicyConfig {
            allow: overrides.allow.clone(),
            deny: overrides.deny.clone(),
            allowed_licenses: overrides.allowed_licenses.clone(),
            max_severity,
            max_package_size: overrides.max_package_size,
        }))
    }

    pub fn semver_engine(&self) -> SemverEngine {
        SemverEngine::with_capacities(self.cache.versions, self.cache.ranges, self.cache.satisfies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.cache.versions, VERSION_CACHE_SIZE);
        let policy = config.security_policy().unwrap();
        assert!(policy.check("react").allowed);
    }

    #[test]
    fn test_parse_with_overrides() {
        let text = r#"
            preset = "restricted"

            [policy]
            allow = ["my-org-*"]
            max_severity = "medium"

            [cache]
            versions = 64
        "#;
        let config: Config = toml::from_str(text).unwrap();
        assert_eq!(config.preset.as_deref(), Some("restricted"));
        let policy = config.security_policy().unwrap();
        // The override's allow list concatenates onto the preset's empty one.
        assert!(policy.check("my-org-utils").allowed);
        assert!(!policy.check("lodash").allowed);
        assert_eq!(
            policy.config().max_severity,
            Some(crate::policy::Severity::Medium)
        );
        assert_eq!(config.cache.versions, 64);
        let engine = config.semver_engine();
        assert_eq!(engine.cache_stats().versions.max_size, 64);
    }

    #[test]
    fn test_unknown_preset_rejected() {
        let config = Config {
            preset: Some("wide-open".to_string()),
            ..Config::default()
        };
        assert!(config.security_policy().is_err());
    }
}
