use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::de::{self, Deserialize, Deserializer, Visitor};
use serde::ser::{Serialize, Serializer};
use thiserror::Error;

pub mod engine;
pub mod range;

/// Upper bound on accepted input length, matching the widely deployed npm
/// implementation.
pub const MAX_LENGTH: usize = 256;

/// Parsing options shared across the semver engine. All flags default to off.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Options {
    pub loose: bool,
    pub include_prerelease: bool,
}

impl Options {
    pub fn loose() -> Self {
        Options {
            loose: true,
            ..Options::default()
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SemverError {
    #[error("invalid version '{input}'")]
    InvalidVersion { input: String },
    #[error("invalid range '{input}'")]
    InvalidRange { input: String },
}

/// A single dot-separated prerelease identifier. Numeric identifiers order
/// before alphanumeric ones.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Identifier {
    Numeric(u64),
    AlphaNumeric(String),
}

impl Identifier {
    fn parse(text: &str) -> Option<Identifier> {
        if text.is_empty() {
            return None;
        }
        if text.bytes().all(|b| b.is_ascii_digit()) {
            text.parse::<u64>().ok().map(Identifier::Numeric)
        } else {
            Some(Identifier::AlphaNumeric(text.to_string()))
        }
    }
}

impl Ord for Identifier {
    fn cmp(&self, other: &Self) -> Ordering {
        use Identifier::*;
        match (self, other) {
            (Numeric(a), Numeric(b)) => a.cmp(b),
            (Numeric(_), AlphaNumeric(_)) => Ordering::Less,
            (AlphaNumeric(_), Numeric(_)) => Ordering::Greater,
            (AlphaNumeric(a), AlphaNumeric(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for Identifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Numeric(n) => write!(f, "{}", n),
            Identifier::AlphaNumeric(s) => write!(f, "{}", s),
        }
    }
}

/// A parsed semantic version. `raw` preserves the exact input string,
/// including any `v` prefix the canonical form drops; build metadata never
/// participates in precedence.
#[derive(Clone, Debug)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub prerelease: Vec<Identifier>,
    pub build: Vec<String>,
    pub raw: String,
}

impl Version {
    /// Throwing constructor: parse failures carry the offending text.
    pub fn parse(input: &str, opts: Options) -> Result<Version, SemverError> {
        parse(input, opts).ok_or_else(|| SemverError::InvalidVersion {
            input: input.to_string(),
        })
    }

    fn from_parts(major: u64, minor: u64, patch: u64) -> Version {
        let mut v = Version {
            major,
            minor,
            patch,
            prerelease: Vec::new(),
            build: Vec::new(),
            raw: String::new(),
        };
        v.raw = v.to_string();
        v
    }

    /// Precedence comparison per the npm dialect: build metadata is ignored,
    /// a release orders above its prereleases.
    pub fn compare(&self, other: &Version) -> Ordering {
        let ord = (self.major, self.minor, self.patch).cmp(&(
            other.major,
            other.minor,
            other.patch,
        ));
        if ord != Ordering::Equal {
            return ord;
        }
        match (self.prerelease.is_empty(), other.prerelease.is_empty()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => self.prerelease.cmp(&other.prerelease),
        }
    }

    /// As `compare`, breaking ties on build metadata (absent orders first).
    pub fn compare_build(&self, other: &Version) -> Ordering {
        let ord = self.compare(other);
        if ord != Ordering::Equal {
            return ord;
        }
        let mut a = self.build.iter();
        let mut b = other.build.iter();
        loop {
            match (a.next(), b.next()) {
                (None, None) => return Ordering::Equal,
                (None, Some(_)) => return Ordering::Less,
                (Some(_), None) => return Ordering::Greater,
                (Some(x), Some(y)) => {
                    let ord = match (x.parse::<u64>(), y.parse::<u64>()) {
                        (Ok(xn), Ok(yn)) => xn.cmp(&yn),
                        (Ok(_), Err(_)) => Ordering::Less,
                        (Err(_), Ok(_)) => Ordering::Greater,
                        (Err(_), Err(_)) => x.cmp(y),
                    };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
            }
        }
    }

    /// Return a new version bumped per `release`. Build metadata is always
    /// dropped; `raw` on the result is the canonical form.
    pub fn inc(
        &self,
        release: Release,
        identifier: Option<&str>,
        identifier_base: Option<&str>,
    ) -> Version {
        use Release::*;
        let mut v = self.clone();
        v.build.clear();
        match release {
            Major => {
                v.major += 1;
                v.minor = 0;
                v.patch = 0;
                v.prerelease.clear();
            }
            Minor => {
                v.minor += 1;
                v.patch = 0;
                v.prerelease.clear();
            }
            Patch => {
                v.patch += 1;
                v.prerelease.clear();
            }
            Premajor => {
                v.major += 1;
                v.minor = 0;
                v.patch = 0;
                v.prerelease = starting_prerelease(identifier, identifier_base);
            }
            Preminor => {
                v.minor += 1;
                v.patch = 0;
                v.prerelease = starting_prerelease(identifier, identifier_base);
            }
            Prepatch => {
                v.patch += 1;
                v.prerelease = starting_prerelease(identifier, identifier_base);
            }
            Prerelease => {
                if v.prerelease.is_empty() {
                    v.patch += 1;
                    v.prerelease = starting_prerelease(identifier, identifier_base);
                } else {
                    let mut bumped = false;
                    for id in v.prerelease.iter_mut().rev() {
                        if let Identifier::Numeric(n) = id {
                            *n += 1;
                            bumped = true;
                            break;
                        }
                    }
                    if !bumped {
                        v.prerelease.push(Identifier::Numeric(0));
                    }
                }
            }
        }
        v.raw = v.to_string();
        v
    }
}

fn starting_prerelease(identifier: Option<&str>, identifier_base: Option<&str>) -> Vec<Identifier> {
    let start = if identifier_base == Some("false") { 1 } else { 0 };
    match identifier {
        None => vec![Identifier::Numeric(0)],
        Some(id) => vec![
            Identifier::parse(id).unwrap_or_else(|| Identifier::AlphaNumeric(id.to_string())),
            Identifier::Numeric(start),
        ],
    }
}

// Structural equality ignores `raw` (formatting of the input) but keeps build
// metadata; precedence ordering ignores build as well.
impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.major == other.major
            && self.minor == other.minor
            && self.patch == other.patch
            && self.prerelease == other.prerelease
            && self.build == other.build
    }
}

impl Eq for Version {}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        for (i, id) in self.prerelease.iter().enumerate() {
            write!(f, "{}{}", if i == 0 { "-" } else { "." }, id)?;
        }
        for (i, id) in self.build.iter().enumerate() {
            write!(f, "{}{}", if i == 0 { "+" } else { "." }, id)?;
        }
        Ok(())
    }
}

impl Serialize for Version {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct VersionVisitor;

        impl<'de> Visitor<'de> for VersionVisitor {
            type Value = Version;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a version string")
            }

            fn visit_str<E>(self, v: &str) -> std::result::Result<Self::Value, E>
            where
                E: de::Error,
            {
                Version::parse(v, Options::default()).map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_str(VersionVisitor)
    }
}

static STRICT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(0|[1-9]\d*)\.(0|[1-9]\d*)\.(0|[1-9]\d*)(?:-((?:0|[1-9]\d*|\d*[a-zA-Z-][0-9a-zA-Z-]*)(?:\.(?:0|[1-9]\d*|\d*[a-zA-Z-][0-9a-zA-Z-]*))*))?(?:\+([0-9a-zA-Z-]+(?:\.[0-9a-zA-Z-]+)*))?$",
    )
    .unwrap()
});

static LOOSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[=v\s]*(\d+)\.(\d+)\.(\d+)(?:-?((?:\d+|\d*[a-zA-Z-][0-9a-zA-Z-]*)(?:\.(?:\d+|\d*[a-zA-Z-][0-9a-zA-Z-]*))*))?(?:\+([0-9a-zA-Z-]+(?:\.[0-9a-zA-Z-]+)*))?$",
    )
    .unwrap()
});

// The 16-digit cap keeps pathological numeric runs out of coercion.
static COERCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^\d])(\d{1,16})(?:\.(\d{1,16}))?(?:\.(\d{1,16}))?(?:$|[^\d])").unwrap()
});

/// Parse a version string, returning a miss on malformed input.
pub fn parse(input: &str, opts: Options) -> Option<Version> {
    if input.len() > MAX_LENGTH {
        return None;
    }
    let caps = if opts.loose {
        LOOSE_RE.captures(input.trim())
    } else {
        STRICT_RE.captures(input)
    }?;
    let major = caps.get(1)?.as_str().parse::<u64>().ok()?;
    let minor = caps.get(2)?.as_str().parse::<u64>().ok()?;
    let patch = caps.get(3)?.as_str().parse::<u64>().ok()?;
    let prerelease = match caps.get(4) {
        Some(m) => m
            .as_str()
            .split('.')
            .map(Identifier::parse)
            .collect::<Option<Vec<_>>>()?,
        None => Vec::new(),
    };
    let build = match caps.get(5) {
        Some(m) => m.as_str().split('.').map(str::to_string).collect(),
        None => Vec::new(),
    };
    Some(Version {
        major,
        minor,
        patch,
        prerelease,
        build,
        raw: input.to_string(),
    })
}

/// Canonical version string when the input parses, else a miss.
pub fn valid(input: &str, opts: Options) -> Option<String> {
    parse(input, opts).map(|v| v.to_string())
}

/// Trim outer whitespace and leading `=`/`v` markers, then parse strictly.
pub fn clean(input: &str) -> Option<String> {
    let stripped = input.trim().trim_start_matches(['=', 'v']);
    parse(stripped, Options::default()).map(|v| v.to_string())
}

/// Pull the first 1-3 segment numeric run out of arbitrary text and pad
/// missing segments with zero.
pub fn coerce(input: &str) -> Option<Version> {
    let caps = COERCE_RE.captures(input)?;
    let major = caps.get(1)?.as_str().parse::<u64>().ok()?;
    let minor = caps
        .get(2)
        .map_or(Some(0), |m| m.as_str().parse::<u64>().ok())?;
    let patch = caps
        .get(3)
        .map_or(Some(0), |m| m.as_str().parse::<u64>().ok())?;
    Some(Version::from_parts(major, minor, patch))
}

pub fn compare(a: &Version, b: &Version) -> Ordering {
    a.compare(b)
}

pub fn rcompare(a: &Version, b: &Version) -> Ordering {
    b.compare(a)
}

pub fn compare_build(a: &Version, b: &Version) -> Ordering {
    a.compare_build(b)
}

pub fn lt(a: &Version, b: &Version) -> bool {
    compare(a, b) == Ordering::Less
}

pub fn gt(a: &Version, b: &Version) -> bool {
    compare(a, b) == Ordering::Greater
}

pub fn eq(a: &Version, b: &Version) -> bool {
    compare(a, b) == Ordering::Equal
}

pub fn neq(a: &Version, b: &Version) -> bool {
    !eq(a, b)
}

pub fn lte(a: &Version, b: &Version) -> bool {
    !gt(a, b)
}

pub fn gte(a: &Version, b: &Version) -> bool {
    !lt(a, b)
}

/// Stable ascending sort by precedence.
pub fn sort(versions: &mut [Version]) {
    versions.sort_by(compare);
}

/// Stable descending sort by precedence.
pub fn rsort(versions: &mut [Version]) {
    versions.sort_by(rcompare);
}

/// Release levels understood by [`Version::inc`] and named by [`diff`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Release {
    Major,
    Minor,
    Patch,
    Premajor,
    Preminor,
    Prepatch,
    Prerelease,
}

impl Release {
    pub fn as_str(&self) -> &'static str {
        use Release::*;
        match self {
            Major => "major",
            Minor => "minor",
            Patch => "patch",
            Premajor => "premajor",
            Preminor => "preminor",
            Prepatch => "prepatch",
            Prerelease => "prerelease",
        }
    }
}

impl fmt::Display for Release {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Release {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        use Release::*;
        Ok(match s {
            "major" => Major,
            "minor" => Minor,
            "patch" => Patch,
            "premajor" => Premajor,
            "preminor" => Preminor,
            "prepatch" => Prepatch,
            "prerelease" => Prerelease,
            other => return Err(format!("unknown release level '{}'", other)),
        })
    }
}

/// Name the highest level at which two versions differ, or a miss when they
/// share the same precedence. The `pre*` forms are used when either side
/// carries a prerelease.
pub fn diff(a: &Version, b: &Version) -> Option<Release> {
    use Release::*;
    if compare(a, b) == Ordering::Equal {
        return None;
    }
    let pre = !a.prerelease.is_empty() || !b.prerelease.is_empty();
    if a.major != b.major {
        return Some(if pre { Premajor } else { Major });
    }
    if a.minor != b.minor {
        return Some(if pre { Preminor } else { Minor });
    }
    if a.patch != b.patch {
        return Some(if pre { Prepatch } else { Patch });
    }
    Some(Prerelease)
}
