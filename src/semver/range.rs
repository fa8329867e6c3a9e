use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

use itertools::Itertools;
use regex::Regex;

use super::{compare, parse as parse_version, Identifier, Options, Version};

/// Comparator operator. An empty operator in range syntax means equality.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl Op {
    pub fn as_str(&self) -> &'static str {
        use Op::*;
        match self {
            Eq => "",
            Ne => "!=",
            Lt => "<",
            Lte => "<=",
            Gt => ">",
            Gte => ">=",
        }
    }
}

/// An operator plus optional version. A comparator without a version matches
/// every version and prints as `*`.
#[derive(Clone, Debug)]
pub struct Comparator {
    pub op: Op,
    pub version: Option<Version>,
    pub raw: String,
}

impl Comparator {
    fn any() -> Comparator {
        Comparator {
            op: Op::Eq,
            version: None,
            raw: "*".to_string(),
        }
    }

    fn new(op: Op, version: Version) -> Comparator {
        let raw = format!("{}{}", op.as_str(), version);
        Comparator {
            op,
            version: Some(version),
            raw,
        }
    }

    pub fn test(&self, version: &Version) -> bool {
        let Some(cv) = &self.version else {
            return true;
        };
        let ord = compare(version, cv);
        match self.op {
            Op::Eq => ord == Ordering::Equal,
            Op::Ne => ord != Ordering::Equal,
            Op::Lt => ord == Ordering::Less,
            Op::Lte => ord != Ordering::Greater,
            Op::Gt => ord == Ordering::Greater,
            Op::Gte => ord != Ordering::Less,
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// A disjunction of comparator conjunctions. The original string and the
/// options used to parse it are retained.
#[derive(Clone, Debug)]
pub struct Range {
    pub set: Vec<Vec<Comparator>>,
    pub raw: String,
    pub opts: Options,
}

impl Range {
    pub fn parse(input: &str, opts: Options) -> Option<Range> {
        let mut set = Vec::new();
        for alternative in input.split("||") {
            set.push(parse_alternative(alternative.trim())?);
        }
        Some(Range {
            set,
            raw: input.to_string(),
            opts,
        })
    }

    /// True when some alternative is fully satisfied.
    pub fn test(&self, version: &Version) -> bool {
        self.set
            .iter()
            .any(|alt| test_alternative(alt, version, self.opts))
    }

    /// Normalized form: comparators joined by single spaces, alternatives by
    /// ` || `.
    pub fn format(&self) -> String {
        self.set
            .iter()
            .map(|alt| alt.iter().map(|c| c.raw.as_str()).join(" "))
            .join(" || ")
    }
}

fn test_alternative(comparators: &[Comparator], version: &Version, opts: Options) -> bool {
    for c in comparators {
        if !c.test(version) {
            return false;
        }
    }
    // A prerelease only matches when some comparator opts into prereleases of
    // that exact version triple; `>1.0.0` must not accept `2.0.0-alpha`.
    if !version.prerelease.is_empty() && !opts.include_prerelease {
        return comparators.iter().any(|c| {
            matches!(&c.version, Some(cv) if !cv.prerelease.is_empty()
                && cv.major == version.major
                && cv.minor == version.minor
                && cv.patch == version.patch)
        });
    }
    true
}

/// `satisfies` never fails: unparseable version or range is simply unsatisfied.
pub fn satisfies(version: &str, range: &str, opts: Options) -> bool {
    let Some(v) = parse_version(version, opts) else {
        return false;
    };
    let Some(r) = Range::parse(range, opts) else {
        return false;
    };
    r.test(&v)
}

/// Greatest version in the list satisfying the range, or a miss.
pub fn max_satisfying<'a>(
    versions: impl IntoIterator<Item = &'a str>,
    range: &str,
    opts: Options,
) -> Option<Version> {
    let r = Range::parse(range, opts)?;
    let mut best: Option<Version> = None;
    for candidate in versions {
        if let Some(v) = parse_version(candidate, opts) {
            if r.test(&v) && best.as_ref().map_or(true, |b| compare(&v, b) == Ordering::Greater) {
                best = Some(v);
            }
        }
    }
    best
}

/// Least version in the list satisfying the range, or a miss.
pub fn min_satisfying<'a>(
    versions: impl IntoIterator<Item = &'a str>,
    range: &str,
    opts: Options,
) -> Option<Version> {
    let r = Range::parse(range, opts)?;
    let mut best: Option<Version> = None;
    for candidate in versions {
        if let Some(v) = parse_version(candidate, opts) {
            if r.test(&v) && best.as_ref().map_or(true, |b| compare(&v, b) == Ordering::Less) {
                best = Some(v);
            }
        }
    }
    best
}

/// Normalized range string, or a miss for unparseable input.
pub fn valid_range(range: &str, opts: Options) -> Option<String> {
    Range::parse(range, opts).map(|r| r.format())
}

/// True when some pair of alternatives, one from each side, overlaps.
pub fn intersects(a: &str, b: &str, opts: Options) -> bool {
    let (Some(ra), Some(rb)) = (Range::parse(a, opts), Range::parse(b, opts)) else {
        return false;
    };
    ra.set.iter().any(|alt_a| {
        let ia = Interval::of(alt_a);
        rb.set.iter().any(|alt_b| ia.overlaps(&Interval::of(alt_b)))
    })
}

struct Bound<'a> {
    version: &'a Version,
    inclusive: bool,
}

/// Tightest lower/upper bounds of one comparator conjunction. `!=` does not
/// constrain the interval.
struct Interval<'a> {
    lo: Option<Bound<'a>>,
    hi: Option<Bound<'a>>,
    empty: bool,
}

impl<'a> Interval<'a> {
    fn of(comparators: &'a [Comparator]) -> Interval<'a> {
        let mut interval = Interval {
            lo: None,
            hi: None,
            empty: false,
        };
        for c in comparators {
            let Some(v) = &c.version else { continue };
            match c.op {
                Op::Eq => {
                    interval.tighten_lo(v, true);
                    interval.tighten_hi(v, true);
                }
                Op::Gt => interval.tighten_lo(v, false),
                Op::Gte => interval.tighten_lo(v, true),
                Op::Lt => interval.tighten_hi(v, false),
                Op::Lte => interval.tighten_hi(v, true),
                Op::Ne => {}
            }
        }
        if let (Some(lo), Some(hi)) = (&interval.lo, &interval.hi) {
            match compare(lo.version, hi.version) {
                Ordering::Greater => interval.empty = true,
                Ordering::Equal if !(lo.inclusive && hi.inclusive) => interval.empty = true,
                _ => {}
            }
        }
        // `<0.0.0-0` has nothing below it.
        if let Some(hi) = &interval.hi {
            if !hi.inclusive && is_bottom(hi.version) {
                interval.empty = true;
            }
        }
        interval
    }

    fn tighten_lo(&mut self, version: &'a Version, inclusive: bool) {
        let replace = match &self.lo {
            None => true,
            Some(cur) => match compare(version, cur.version) {
                Ordering::Greater => true,
                Ordering::Equal => cur.inclusive && !inclusive,
                Ordering::Less => false,
            },
        };
        if replace {
            self.lo = Some(Bound { version, inclusive });
        }
    }

    fn tighten_hi(&mut self, version: &'a Version, inclusive: bool) {
        let replace = match &self.hi {
            None => true,
            Some(cur) => match compare(version, cur.version) {
                Ordering::Less => true,
                Ordering::Equal => cur.inclusive && !inclusive,
                Ordering::Greater => false,
            },
        };
        if replace {
            self.hi = Some(Bound { version, inclusive });
        }
    }

    fn overlaps(&self, other: &Interval<'_>) -> bool {
        if self.empty || other.empty {
            return false;
        }
        let lo = tighter(&self.lo, &other.lo, Ordering::Greater);
        let hi = tighter(&self.hi, &other.hi, Ordering::Less);
        match (lo, hi) {
            (Some(lo), Some(hi)) => match compare(lo.version, hi.version) {
                Ordering::Less => true,
                Ordering::Equal => lo.inclusive && hi.inclusive,
                Ordering::Greater => false,
            },
            _ => true,
        }
    }
}

fn tighter<'a, 'b>(
    a: &'b Option<Bound<'a>>,
    b: &'b Option<Bound<'a>>,
    prefer: Ordering,
) -> Option<&'b Bound<'a>> {
    match (a, b) {
        (None, None) => None,
        (Some(x), None) => Some(x),
        (None, Some(y)) => Some(y),
        (Some(x), Some(y)) => {
            let ord = compare(x.version, y.version);
            if ord == prefer || (ord == Ordering::Equal && !x.inclusive) {
                Some(x)
            } else {
                Some(y)
            }
        }
    }
}

fn is_bottom(version: &Version) -> bool {
    version.major == 0
        && version.minor == 0
        && version.patch == 0
        && version.prerelease == [Identifier::Numeric(0)]
}

static HYPHEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\S+)\s+-\s+(\S+)$").unwrap());

// Operators may be separated from their version by whitespace; fold it away
// before tokenizing. Longer operators listed first.
static OP_JOIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(>=|<=|!=|~>|>|<|=|~|\^)\s+").unwrap());

fn parse_alternative(text: &str) -> Option<Vec<Comparator>> {
    if text.is_empty() {
        return Some(vec![Comparator::any()]);
    }
    if let Some(caps) = HYPHEN_RE.captures(text) {
        return expand_hyphen(&caps[1], &caps[2]);
    }
    let joined = OP_JOIN_RE.replace_all(text, "$1");
    let mut comparators = Vec::new();
    for token in joined.split_whitespace() {
        comparators.extend(expand_token(token)?);
    }
    if comparators.is_empty() {
        comparators.push(Comparator::any());
    }
    Some(comparators)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Seg {
    Num(u64),
    Wild,
    Missing,
}

impl Seg {
    fn concrete(self) -> Option<u64> {
        match self {
            Seg::Num(n) => Some(n),
            _ => None,
        }
    }
}

struct Partial {
    major: Seg,
    minor: Seg,
    patch: Seg,
    prerelease: Vec<Identifier>,
    build: Vec<String>,
}

fn take_seg(input: &mut &str) -> Option<Seg> {
    let bytes = input.as_bytes();
    if bytes.is_empty() {
        return None;
    }
    if matches!(bytes[0], b'x' | b'X' | b'*') {
        *input = &input[1..];
        return Some(Seg::Wild);
    }
    let digits = input.bytes().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    let value = input[..digits].parse::<u64>().ok()?;
    *input = &input[digits..];
    Some(Seg::Num(value))
}

fn parse_identifiers(text: &str) -> Option<Vec<Identifier>> {
    text.split('.')
        .map(|part| {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-') {
                None
            } else {
                Identifier::parse(part)
            }
        })
        .collect()
}

fn parse_partial(text: &str) -> Option<Partial> {
    let mut rest = text.strip_prefix('v').unwrap_or(text);
    let mut partial = Partial {
        major: Seg::Missing,
        minor: Seg::Missing,
        patch: Seg::Missing,
        prerelease: Vec::new(),
        build: Vec::new(),
    };
    if rest.is_empty() {
        return None;
    }
    partial.major = take_seg(&mut rest)?;
    if let Some(next) = rest.strip_prefix('.') {
        rest = next;
        partial.minor = take_seg(&mut rest)?;
        if let Some(next) = rest.strip_prefix('.') {
            rest = next;
            partial.patch = take_seg(&mut rest)?;
            if !rest.is_empty() {
                // Qualifier: optional `-pre`, optional `+build`. The hyphen is
                // optional itself (`1.2.3beta` parses in range position).
                let (pre_part, build_part) = match rest.find('+') {
                    Some(idx) => (&rest[..idx], Some(&rest[idx + 1..])),
                    None => (rest, None),
                };
                if !pre_part.is_empty() {
                    let pre_part = pre_part.strip_prefix('-').unwrap_or(pre_part);
                    partial.prerelease = parse_identifiers(pre_part)?;
                }
                if let Some(build_part) = build_part {
                    if build_part.is_empty()
                        || !build_part
                            .bytes()
                            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'.')
                    {
                        return None;
                    }
                    partial.build = build_part.split('.').map(str::to_string).collect();
                }
                return Some(partial);
            }
        }
    }
    if !rest.is_empty() {
        return None;
    }
    Some(partial)
}

fn make_version(major: u64, minor: u64, patch: u64, pre_zero: bool) -> Version {
    let prerelease = if pre_zero {
        vec![Identifier::Numeric(0)]
    } else {
        Vec::new()
    };
    let mut v = Version {
        major,
        minor,
        patch,
        prerelease,
        build: Vec::new(),
        raw: String::new(),
    };
    v.raw = v.to_string();
    v
}

fn concrete_version(partial: &Partial) -> Version {
    let mut v = Version {
        major: partial.major.concrete().unwrap_or(0),
        minor: partial.minor.concrete().unwrap_or(0),
        patch: partial.patch.concrete().unwrap_or(0),
        prerelease: partial.prerelease.clone(),
        build: partial.build.clone(),
        raw: String::new(),
    };
    v.raw = v.to_string();
    v
}

fn expand_token(token: &str) -> Option<Vec<Comparator>> {
    if token == "*" || token.eq_ignore_ascii_case("x") {
        return Some(vec![Comparator::any()]);
    }
    if let Some(rest) = token.strip_prefix("~>").or_else(|| token.strip_prefix('~')) {
        return expand_tilde(&parse_partial(rest)?);
    }
    if let Some(rest) = token.strip_prefix('^') {
        return expand_caret(&parse_partial(rest)?);
    }
    for (prefix, op) in [
        (">=", Op::Gte),
        ("<=", Op::Lte),
        ("!=", Op::Ne),
        (">", Op::Gt),
        ("<", Op::Lt),
    ] {
        if let Some(rest) = token.strip_prefix(prefix) {
            return expand_primitive(op, &parse_partial(rest)?);
        }
    }
    let rest = token.strip_prefix('=').unwrap_or(token);
    expand_xrange(&parse_partial(rest)?)
}

/// Plain and `=`-prefixed tokens: wildcards widen to the enclosing interval.
fn expand_xrange(partial: &Partial) -> Option<Vec<Comparator>> {
    let Some(major) = partial.major.concrete() else {
        return Some(vec![Comparator::any()]);
    };
    let Some(minor) = partial.minor.concrete() else {
        return Some(vec![
            Comparator::new(Op::Gte, make_version(major, 0, 0, false)),
            Comparator::new(Op::Lt, make_version(major + 1, 0, 0, true)),
        ]);
    };
    if partial.patch.concrete().is_none() {
        return Some(vec![
            Comparator::new(Op::Gte, make_version(major, minor, 0, false)),
            Comparator::new(Op::Lt, make_version(major, minor + 1, 0, true)),
        ]);
    }
    Some(vec![Comparator::new(Op::Eq, concrete_version(partial))])
}

fn expand_primitive(op: Op, partial: &Partial) -> Option<Vec<Comparator>> {
    let full = partial.major.concrete().is_some()
        && partial.minor.concrete().is_some()
        && partial.patch.concrete().is_some();
    if full {
        return Some(vec![Comparator::new(op, concrete_version(partial))]);
    }
    let unsatisfiable = || vec![Comparator::new(Op::Lt, make_version(0, 0, 0, true))];
    match op {
        // `!=` is only meaningful against a full version.
        Op::Ne | Op::Eq => None,
        Op::Gt => Some(match (partial.major.concrete(), partial.minor.concrete()) {
            (None, _) => unsatisfiable(),
            (Some(major), None) => {
                vec![Comparator::new(Op::Gte, make_version(major + 1, 0, 0, false))]
            }
            (Some(major), Some(minor)) => {
                vec![Comparator::new(Op::Gte, make_version(major, minor + 1, 0, false))]
            }
        }),
        Op::Gte => Some(match (partial.major.concrete(), partial.minor.concrete()) {
            (None, _) => vec![Comparator::any()],
            (Some(major), None) => {
                vec![Comparator::new(Op::Gte, make_version(major, 0, 0, false))]
            }
            (Some(major), Some(minor)) => {
                vec![Comparator::new(Op::Gte, make_version(major, minor, 0, false))]
            }
        }),
        Op::Lt => Some(match (partial.major.concrete(), partial.minor.concrete()) {
            (None, _) => unsatisfiable(),
            (Some(major), None) => {
                vec![Comparator::new(Op::Lt, make_version(major, 0, 0, true))]
            }
            (Some(major), Some(minor)) => {
                vec![Comparator::new(Op::Lt, make_version(major, minor, 0, true))]
            }
        }),
        Op::Lte => Some(match (partial.major.concrete(), partial.minor.concrete()) {
            (None, _) => vec![Comparator::any()],
            (Some(major), None) => {
                vec![Comparator::new(Op::Lt, make_version(major + 1, 0, 0, true))]
            }
            (Some(major), Some(minor)) => {
                vec![Comparator::new(Op::Lt, make_version(major, minor + 1, 0, true))]
            }
        }),
    }
}

fn expand_tilde(partial: &Partial) -> Option<Vec<Comparator>> {
    let Some(major) = partial.major.concrete() else {
        return Some(vec![Comparator::any()]);
    };
    let Some(minor) = partial.minor.concrete() else {
        return Some(vec![
            Comparator::new(Op::Gte, make_version(major, 0, 0, false)),
            Comparator::new(Op::Lt, make_version(major + 1, 0, 0, true)),
        ]);
    };
    let lower = if partial.patch.concrete().is_some() {
        concrete_version(partial)
    } else {
        make_version(major, minor, 0, false)
    };
    Some(vec![
        Comparator::new(Op::Gte, lower),
        Comparator::new(Op::Lt, make_version(major, minor + 1, 0, true)),
    ])
}

fn expand_caret(partial: &Partial) -> Option<Vec<Comparator>> {
    let Some(major) = partial.major.concrete() else {
        return Some(vec![Comparator::any()]);
    };
    let Some(minor) = partial.minor.concrete() else {
        return Some(vec![
            Comparator::new(Op::Gte, make_version(major, 0, 0, false)),
            Comparator::new(Op::Lt, make_version(major + 1, 0, 0, true)),
        ]);
    };
    let Some(patch) = partial.patch.concrete() else {
        let upper = if major == 0 {
            make_version(0, minor + 1, 0, true)
        } else {
            make_version(major + 1, 0, 0, true)
        };
        return Some(vec![
            Comparator::new(Op::Gte, make_version(major, minor, 0, false)),
            Comparator::new(Op::Lt, upper),
        ]);
    };
    let upper = if major > 0 {
        make_version(major + 1, 0, 0, true)
    } else if minor > 0 {
        make_version(0, minor + 1, 0, true)
    } else {
        make_version(0, 0, patch + 1, true)
    };
    Some(vec![
        Comparator::new(Op::Gte, concrete_version(partial)),
        Comparator::new(Op::Lt, upper),
    ])
}

/// `A - B`: inclusive lower, upper widened when B is partial.
fn expand_hyphen(lower: &str, upper: &str) -> Option<Vec<Comparator>> {
    let a = parse_partial(lower)?;
    let b = parse_partial(upper)?;
    let mut comparators = Vec::new();
    match a.major.concrete() {
        None => comparators.push(Comparator::new(Op::Gte, make_version(0, 0, 0, false))),
        Some(_) => comparators.push(Comparator::new(Op::Gte, concrete_version(&a))),
    }
    if let Some(major) = b.major.concrete() {
        match (b.minor.concrete(), b.patch.concrete()) {
            (None, _) => comparators.push(Comparator::new(
                Op::Lt,
                make_version(major + 1, 0, 0, true),
            )),
            (Some(minor), None) => comparators.push(Comparator::new(
                Op::Lt,
                make_version(major, minor + 1, 0, true),
            )),
            (Some(_), Some(_)) => {
                comparators.push(Comparator::new(Op::Lte, concrete_version(&b)))
            }
        }
    }
    Some(comparators)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> Options {
        Options::default()
    }

    fn sat(version: &str, range: &str) -> bool {
        satisfies(version, range, opts())
    }

    #[test]
    fn test_range_normalization() {
        // node-semver range-parse fixtures, in this engine's canonical form.
        let fixtures = [
            ("1.0.0 - 2.0.0", ">=1.0.0 <=2.0.0"),
            ("1 - 2", ">=1.0.0 <3.0.0-0"),
            ("1.0 - 2.0", ">=1.0.0 <2.1.0-0"),
            ("1.0.0", "1.0.0"),
            (">=*", "*"),
            ("", "*"),
            ("*", "*"),
            (">=1.0.0", ">=1.0.0"),
            (">1.0.0", ">1.0.0"),
            ("<=2.0.0", "<=2.0.0"),
            ("1", ">=1.0.0 <2.0.0-0"),
            (">= 1.0.0", ">=1.0.0"),
            (">=  1.0.0", ">=1.0.0"),
            ("> 1.0.0", ">1.0.0"),
            ("<\t2.0.0", "<2.0.0"),
            (">=0.1.97", ">=0.1.97"),
            ("0.1.20 || 1.2.4", "0.1.20 || 1.2.4"),
            (">=0.2.3 || <0.0.1", ">=0.2.3 || <0.0.1"),
            ("2.x.x", ">=2.0.0 <3.0.0-0"),
            ("1.2.x", ">=1.2.0 <1.3.0-0"),
            ("1.2.x || 2.x", ">=1.2.0 <1.3.0-0 || >=2.0.0 <3.0.0-0"),
            ("x", "*"),
            ("2.*.*", ">=2.0.0 <3.0.0-0"),
            ("1.2.*", ">=1.2.0 <1.3.0-0"),
            ("2", ">=2.0.0 <3.0.0-0"),
            ("2.3", ">=2.3.0 <2.4.0-0"),
            ("~2.4", ">=2.4.0 <2.5.0-0"),
            ("~>3.2.1", ">=3.2.1 <3.3.0-0"),
            ("~1", ">=1.0.0 <2.0.0-0"),
            ("~>1", ">=1.0.0 <2.0.0-0"),
            ("~> 1", ">=1.0.0 <2.0.0-0"),
            ("~1.0", ">=1.0.0 <1.1.0-0"),
            ("~ 1.0", ">=1.0.0 <1.1.0-0"),
            ("~0.2.3", ">=0.2.3 <0.3.0-0"),
            ("~0.0.3", ">=0.0.3 <0.1.0-0"),
            ("^0", ">=0.0.0 <1.0.0-0"),
            ("^ 1", ">=1.0.0 <2.0.0-0"),
            ("^0.1", ">=0.1.0 <0.2.0-0"),
            ("^1.0", ">=1.0.0 <2.0.0-0"),
            ("^1.2", ">=1.2.0 <2.0.0-0"),
            ("^0.0", ">=0.0.0 <0.1.0-0"),
            ("^0.0.1", ">=0.0.1 <0.0.2-0"),
            ("^0.0.1-beta", ">=0.0.1-beta <0.0.2-0"),
            ("^0.1.2", ">=0.1.2 <0.2.0-0"),
            ("^1.2.3", ">=1.2.3 <2.0.0-0"),
            ("^1.2.3-beta.4", ">=1.2.3-beta.4 <2.0.0-0"),
            ("<1", "<1.0.0-0"),
            ("< 1", "<1.0.0-0"),
            (">=1", ">=1.0.0"),
            ("<1.2", "<1.2.0-0"),
            (">1", ">=2.0.0"),
            (">1.2", ">=1.3.0"),
            (">X", "<0.0.0-0"),
            ("<X", "<0.0.0-0"),
            ("1.2 - 3.4.5", ">=1.2.0 <=3.4.5"),
            ("1.2.3 - 3.4", ">=1.2.3 <3.5.0-0"),
            ("1.2 - 3.4", ">=1.2.0 <3.5.0-0"),
            ("~1.2.3beta", ">=1.2.3-beta <1.3.0-0"),
            (">01.02.03", ">1.2.3"),
            (">=09090", ">=9090.0.0"),
            ("=1.2.3", "1.2.3"),
            ("v1.2.3", "1.2.3"),
            ("!=1.2.3", "!=1.2.3"),
        ];
        for (input, expected) in fixtures {
            assert_eq!(
                valid_range(input, opts()).as_deref(),
                Some(expected),
                "normalizing {:?}",
                input
            );
        }
    }

    #[test]
    fn test_invalid_ranges() {
        for input in [">>1.2.3", "<<1.0.0", "blerg", "1.2.3 - - 2", "^>=1.2.3", "!=1.2"] {
            assert_eq!(valid_range(input, opts()), None, "{}", input);
            assert!(!sat("1.2.3", input));
        }
        // Invalid version never satisfies, and never panics.
        assert!(!sat("not a version", "*"));
    }

    #[test]
    fn test_satisfies_fixture_table() {
        let yes = [
            ("1.0.0 - 2.0.0", "1.2.3"),
            ("^1.2.3+build", "1.3.0"),
            ("1.2.3-pre+asdf - 2.4.3-pre+asdf", "1.2.3-pre.2"),
            ("1.2.3-pre+asdf - 2.4.3-pre+asdf", "2.4.3-alpha"),
            ("1.0.0", "1.0.0"),
            (">=*", "0.2.4"),
            ("", "1.0.0"),
            ("*", "1.2.3"),
            (">=1.0.0", "1.0.0"),
            (">1.0.0", "1.1.0"),
            ("<=2.0.0", "2.0.0"),
            ("<2.0.0", "0.2.9"),
            ("0.1.20 || 1.2.4", "1.2.4"),
            (">=0.2.3 || <0.0.1", "0.0.0"),
            ("||", "1.3.4"),
            ("2.x.x", "2.1.3"),
            ("1.2.x", "1.2.3"),
            ("1.2.x || 2.x", "2.1.3"),
            ("2", "2.1.2"),
            ("2.3", "2.3.1"),
            ("~0.0.1", "0.0.2"),
            ("~2.4", "2.4.5"),
            ("~>3.2.1", "3.2.2"),
            ("~1", "1.2.3"),
            ("~ 1.0", "1.0.2"),
            ("~ 1.0.3alpha", "1.0.12"),
            ("~v0.5.4-pre", "0.5.5"),
            ("=0.7.x", "0.7.2"),
            ("<=0.7.x", "0.6.2"),
            ("~1.2.1 >=1.2.3", "1.2.3"),
            (">=1.2.1 1.2.3", "1.2.3"),
            ("^1.2.3", "1.8.1"),
            ("^0.1.2", "0.1.2"),
            ("^1.2 ^1", "1.4.2"),
            ("^1.2.3-alpha", "1.2.3-pre"),
            ("^0.0.1-alpha", "0.0.1-beta"),
            ("^0.0.1-alpha", "0.0.1"),
            ("^x", "1.2.3"),
            ("x - 1.0.0", "0.9.7"),
            ("1.0.0 - x", "1.9.7"),
            ("1.x - x", "1.9.7"),
            ("<=7.x", "7.9.9"),
            ("!=1.2.3", "1.2.4"),
        ];
        for (range, version) in yes {
            assert!(sat(version, range), "{} should satisfy {}", version, range);
        }

        let no = [
            ("1.0.0 - 2.0.0", "2.2.3"),
            ("1.2.3+asdf - 2.4.3+asdf", "1.2.3-pre.2"),
            ("1.2.3+asdf - 2.4.3+asdf", "2.4.3-alpha"),
            ("^1.2.3+build", "2.0.0"),
            ("^1.2.3", "1.2.3-pre"),
            ("^1.2", "1.2.0-pre"),
            (">1.2", "1.3.0-beta"),
            ("<=1.2.3", "1.2.3-beta"),
            ("=0.7.x", "0.7.0-asdf"),
            ("1", "1.0.0-beta"),
            ("1.0.0", "1.0.1"),
            (">=1.0.0", "0.1.0"),
            ("<2.0.0", "2.2.9"),
            ("0.1.20 || 1.2.4", "1.2.3"),
            ("2.x.x", "3.1.3"),
            ("1.2.x", "1.3.3"),
            ("2", "1.1.2"),
            ("~0.0.1", "0.1.0"),
            ("~2.4", "2.5.0"),
            ("~>3.2.1", "3.3.2"),
            ("~1", "0.2.3"),
            ("<1", "1.0.0"),
            (">=1.2", "1.1.1"),
            ("~v0.5.4-beta", "0.5.4-alpha"),
            ("<1.2.3", "1.2.3-beta"),
            ("=1.2.3", "1.2.3-beta"),
            (">1.2", "1.2.8"),
            ("^0.0.1", "0.0.2"),
            ("^1.2.3", "2.0.0-alpha"),
            ("^1.2.3", "1.2.2"),
            ("^1.2", "1.1.9"),
            ("*", "1.2.3-foo"),
            ("1 - 2", "2.0.0-pre"),
            ("1 - 2", "1.0.0-pre"),
            ("1.1.x", "1.1.0-a"),
            (">=1.0.0 <1.1.0", "1.1.0"),
            (">=1.0.0 <1.1.0", "1.1.0-pre"),
            (">=1.0.0 <1.1.0-pre", "1.1.0-pre"),
            ("!=1.2.3", "1.2.3"),
        ];
        for (range, version) in no {
            assert!(!sat(version, range), "{} should not satisfy {}", version, range);
        }
    }

    #[test]
    fn test_prerelease_gate_option() {
        assert!(!sat("2.0.0-alpha", ">1.0.0"));
        assert!(satisfies(
            "2.0.0-alpha",
            ">1.0.0",
            Options {
                include_prerelease: true,
                ..Options::default()
            }
        ));
    }

    #[test]
    fn test_caret_zero_boundaries() {
        // ^0.0.3 admits exactly 0.0.3; ^0.2.3 stays inside 0.2.x.
        assert!(sat("0.0.3", "^0.0.3"));
        assert!(!sat("0.0.4", "^0.0.3"));
        assert!(sat("0.2.3", "^0.2.3"));
        assert!(sat("0.2.99", "^0.2.3"));
        assert!(!sat("0.3.0", "^0.2.3"));
    }

    #[test]
    fn test_disjunction() {
        assert!(sat("18.2.0", "^17.0.0 || ^18.0.0"));
        assert!(!sat("19.0.0", "^17.0.0 || ^18.0.0"));
    }

    #[test]
    fn test_hyphen_partial_upper() {
        assert!(sat("2.9.9", "1.0.0 - 2"));
        assert!(!sat("3.0.0", "1.0.0 - 2"));
    }

    #[test]
    fn test_max_and_min_satisfying() {
        let versions = ["0.2.0", "0.2.9", "0.3.0", "1.0.0"];
        assert_eq!(
            max_satisfying(versions, "^0.2.0", opts()).unwrap().to_string(),
            "0.2.9"
        );
        assert_eq!(
            min_satisfying(versions, "^0.2.0", opts()).unwrap().to_string(),
            "0.2.0"
        );
        assert_eq!(max_satisfying(versions, "^2.0.0", opts()), None);
        // Unparseable candidates are skipped rather than failing the call.
        assert_eq!(
            max_satisfying(["junk", "1.0.0"], "*", opts()).unwrap().to_string(),
            "1.0.0"
        );
    }

    #[test]
    fn test_intersects() {
        let yes = [
            ("^1.2.3", "1.x"),
            (">=1.0.0", "<2.0.0"),
            ("~1.2.0", "1.2.5"),
            ("1.2.3", "1.2.3"),
            (">=1.0.0 <2.0.0", ">=1.5.0 <3.0.0"),
            ("^0.2.0 || ^1.0.0", "1.0.x"),
            ("*", "0.0.1"),
            (">=2.0.0", "<=2.0.0"),
        ];
        for (a, b) in yes {
            assert!(intersects(a, b, opts()), "{} should intersect {}", a, b);
            assert!(intersects(b, a, opts()), "{} should intersect {}", b, a);
        }
        let no = [
            ("^1.2.3", "^2.0.0"),
            ("<1.0.0", ">=1.0.0"),
            ("1.2.3", "1.2.4"),
            (">2.0.0", "<=2.0.0"),
            ("^0.2.0", "^0.3.0"),
            (">X", "*"),
        ];
        for (a, b) in no {
            assert!(!intersects(a, b, opts()), "{} should not intersect {}", a, b);
            assert!(!intersects(b, a, opts()), "{} should not intersect {}", b, a);
        }
        assert!(!intersects("nope", "*", opts()));
    }

    #[test]
    fn test_loose_range_versions() {
        assert!(sat("1.2.3", "^v1.2.0"));
        assert!(sat("0.1.97", ">=0.1.97"));
    }

    #[test]
    fn test_raw_retained() {
        let r = Range::parse("  ^1.2.3 || 2.x ", opts()).unwrap();
        assert_eq!(r.raw, "  ^1.2.3 || 2.x ");
        assert_eq!(r.format(), ">=1.2.3 <2.0.0-0 || >=2.0.0 <3.0.0-0");
    }
}
