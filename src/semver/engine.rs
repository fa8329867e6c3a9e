use std::cmp::Ordering;
use std::sync::{LazyLock, Mutex};

use crate::cache::{CacheStats, LruCache};

use super::range::{self, Range};
use super::{parse, Options, Version};

pub const VERSION_CACHE_SIZE: usize = 2048;
pub const RANGE_CACHE_SIZE: usize = 2048;
pub const SATISFIES_CACHE_SIZE: usize = 4096;

/// Memoizing front of the range engine. An engine owns its three caches, so
/// separate instances never observe each other; the process-wide instance
/// behind the module-level functions is a convenience on top.
///
/// Not internally synchronized: share an instance across threads only behind
/// a lock.
pub struct SemverEngine {
    versions: LruCache<String, Option<Version>>,
    ranges: LruCache<String, Option<Range>>,
    satisfied: LruCache<String, bool>,
}

// None of the caches above are ever constructed with an eviction callback,
// so there is no non-`Send` state actually stored despite the generic
// `LruCache` type allowing one.
unsafe impl Send for SemverEngine {}

impl SemverEngine {
    pub fn new() -> Self {
        Self::with_capacities(VERSION_CACHE_SIZE, RANGE_CACHE_SIZE, SATISFIES_CACHE_SIZE)
    }

    pub fn with_capacities(versions: usize, ranges: usize, satisfied: usize) -> Self {
        SemverEngine {
            versions: LruCache::new(versions),
            ranges: LruCache::new(ranges),
            satisfied: LruCache::new(satisfied),
        }
    }

    // Option sets get distinct cache keys so a loose lookup never sees a
    // strict entry and vice versa.
    fn version_key(input: &str, opts: Options) -> String {
        if opts.loose {
            format!("loose:{}", input)
        } else {
            input.to_string()
        }
    }

    fn range_key(input: &str, opts: Options) -> String {
        let mut key = String::new();
        if opts.loose {
            key.push_str("loose:");
        }
        if opts.include_prerelease {
            key.push_str("pre:");
        }
        key.push_str(input);
        key
    }

    pub fn parse_version(&mut self, input: &str, opts: Options) -> Option<Version> {
        let key = Self::version_key(input, opts);
        if let Some(cached) = self.versions.get(&key) {
            return cached.clone();
        }
        let parsed = parse(input, opts);
        self.versions.set(key, parsed.clone());
        parsed
    }

    pub fn parse_range(&mut self, input: &str, opts: Options) -> Option<Range> {
        let key = Self::range_key(input, opts);
        if let Some(cached) = self.ranges.get(&key) {
            return cached.clone();
        }
        let parsed = Range::parse(input, opts);
        self.ranges.set(key, parsed.clone());
        parsed
    }

    pub fn satisfies(&mut self, version: &str, range: &str, opts: Options) -> bool {
        let key = format!(
            "{}@{}",
            Self::version_key(version, opts),
            Self::range_key(range, opts)
        );
        if let Some(&cached) = self.satisfied.get(&key) {
            return cached;
        }
        let result = match (self.parse_version(version, opts), self.parse_range(range, opts)) {
            (Some(v), Some(r)) => r.test(&v),
            _ => false,
        };
        self.satisfied.set(key, result);
        result
    }

    pub fn max_satisfying<'a>(
        &mut self,
        versions: impl IntoIterator<Item = &'a str>,
        range: &str,
        opts: Options,
    ) -> Option<Version> {
        self.parse_range(range, opts)?;
        let mut best: Option<Version> = None;
        for candidate in versions {
            if !self.satisfies(candidate, range, opts) {
                continue;
            }
            if let Some(v) = self.parse_version(candidate, opts) {
                if best.as_ref().map_or(true, |b| v.compare(b) == Ordering::Greater) {
                    best = Some(v);
                }
            }
        }
        best
    }

    pub fn min_satisfying<'a>(
        &mut self,
        versions: impl IntoIterator<Item = &'a str>,
        range: &str,
        opts: Options,
    ) -> Option<Version> {
        self.parse_range(range, opts)?;
        let mut best: Option<Version> = None;
        for candidate in versions {
            if !self.satisfies(candidate, range, opts) {
                continue;
            }
            if let Some(v) = self.parse_version(candidate, opts) {
                if best.as_ref().map_or(true, |b| v.compare(b) == Ordering::Less) {
                    best = Some(v);
                }
            }
        }
        best
    }

    pub fn valid_range(&mut self, range: &str, opts: Options) -> Option<String> {
        self.parse_range(range, opts).map(|r| r.format())
    }

    pub fn intersects(&mut self, a: &str, b: &str, opts: Options) -> bool {
        range::intersects(a, b, opts)
    }

    /// Single entry point resetting all three caches.
    pub fn clear_caches(&mut self) {
        self.versions.clear();
        self.ranges.clear();
        self.satisfied.clear();
    }

    pub fn cache_stats(&self) -> EngineStats {
        EngineStats {
            versions: self.versions.stats(),
            ranges: self.ranges.stats(),
            satisfied: self.satisfied.stats(),
        }
    }
}

impl Default for SemverEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct EngineStats {
    pub versions: CacheStats,
    pub ranges: CacheStats,
    pub satisfied: CacheStats,
}

static ENGINE: LazyLock<Mutex<SemverEngine>> = LazyLock::new(|| Mutex::new(SemverEngine::new()));

pub fn satisfies(version: &str, range: &str, opts: Options) -> bool {
    ENGINE.lock().unwrap().satisfies(version, range, opts)
}

pub fn max_satisfying<'a>(
    versions: impl IntoIterator<Item = &'a str>,
    range: &str,
    opts: Options,
) -> Option<Version> {
    ENGINE.lock().unwrap().max_satisfying(versions, range, opts)
}

pub fn min_satisfying<'a>(
    versions: impl IntoIterator<Item = &'a str>,
    range: &str,
    opts: Options,
) -> Option<Version> {
    ENGINE.lock().unwrap().min_satisfying(versions, range, opts)
}

pub fn valid_range(range: &str, opts: Options) -> Option<String> {
    ENGINE.lock().unwrap().valid_range(range, opts)
}

pub fn clear_caches() {
    ENGINE.lock().unwrap().clear_caches()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_sets_do_not_collide() {
        let mut engine = SemverEngine::new();
        assert!(engine.parse_version("v1.2.3", Options::loose()).is_some());
        // A strict lookup for the same text must not reuse the loose entry.
        assert!(engine.parse_version("v1.2.3", Options::default()).is_none());
        assert!(engine.satisfies("2.0.0-alpha", ">1.0.0", Options {
            include_prerelease: true,
            ..Options::default()
        }));
        assert!(!engine.satisfies("2.0.0-alpha", ">1.0.0", Options::default()));
    }

    #[test]
    fn test_satisfaction_is_memoized() {
        let mut engine = SemverEngine::new();
        assert!(engine.satisfies("1.2.3", "^1.0.0", Options::default()));
        let before = engine.cache_stats().satisfied;
        assert!(engine.satisfies("1.2.3", "^1.0.0", Options::default()));
        let after = engine.cache_stats().satisfied;
        assert_eq!(after.hits, before.hits + 1);
        assert_eq!(after.size, 1);
    }

    #[test]
    fn test_invalid_inputs_are_unsatisfied() {
        let mut engine = SemverEngine::new();
        assert!(!engine.satisfies("junk", "*", Options::default()));
        assert!(!engine.satisfies("1.0.0", ">>nope", Options::default()));
        assert_eq!(engine.valid_range(">>nope", Options::default()), None);
    }

    #[test]
    fn test_clear_resets_all_three() {
        let mut engine = SemverEngine::new();
        engine.satisfies("1.2.3", "^1.0.0", Options::default());
        engine.clear_caches();
        let stats = engine.cache_stats();
        assert_eq!(stats.versions.size, 0);
        assert_eq!(stats.ranges.size, 0);
        assert_eq!(stats.satisfied.size, 0);
    }

    #[test]
    fn test_max_satisfying_across_zero_boundary() {
        let mut engine = SemverEngine::new();
        let found = engine
            .max_satisfying(["0.2.0", "0.2.9", "0.3.0", "1.0.0"], "^0.2.0", Options::default())
            .unwrap();
        assert_eq!(found.to_string(), "0.2.9");
    }

    #[test]
    fn test_global_entry_points() {
        clear_caches();
        assert!(satisfies("18.2.0", "^17.0.0 || ^18.0.0", Options::default()));
        assert_eq!(
            valid_range("1.2.x", Options::default()).as_deref(),
            Some(">=1.2.0 <1.3.0-0")
        );
        assert_eq!(
            max_satisfying(["1.0.0", "2.0.0"], "*", Options::default())
                .unwrap()
                .to_string(),
            "2.0.0"
        );
        assert!(min_satisfying(["1.0.0"], "^2.0.0", Options::default()).is_none());
        clear_caches();
    }
}
