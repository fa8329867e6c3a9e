use std::cmp::Ordering;

use proptest::prelude::*;

use edgepack::semver::{self, range, Options};

/// Semantic Versioning 2.0.0, the regex from the spec, ASCII-restricted so
/// the generator stays inside the grammar the parser accepts.
const SEMVER_REGEX: &str = r"(?-u:(0|[1-9]\d{0,5})\.(0|[1-9]\d{0,5})\.(0|[1-9]\d{0,5})(?:-((?:0|[1-9]\d{0,5}|\d*[a-zA-Z-][0-9a-zA-Z-]{0,8})(?:\.(?:0|[1-9]\d{0,5}|\d*[a-zA-Z-][0-9a-zA-Z-]{0,8})){0,3}))?(?:\+([0-9a-zA-Z-]{1,9}(?:\.[0-9a-zA-Z-]{1,9}){0,3}))?)";

fn opts() -> Options {
    Options::default()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_parse_format_round_trip(s in SEMVER_REGEX) {
        let parsed = semver::parse(&s, opts()).expect("generated string is valid semver");
        prop_assert_eq!(&parsed.raw, &s);
        let reparsed = semver::parse(&parsed.to_string(), opts())
            .expect("canonical form must reparse");
        prop_assert_eq!(&reparsed, &parsed);
        prop_assert_eq!(reparsed.to_string(), parsed.to_string());
    }

    #[test]
    fn prop_compare_laws(a in SEMVER_REGEX, b in SEMVER_REGEX) {
        let va = semver::parse(&a, opts()).unwrap();
        let vb = semver::parse(&b, opts()).unwrap();
        prop_assert_eq!(semver::compare(&va, &va), Ordering::Equal);
        prop_assert_eq!(semver::compare(&vb, &vb), Ordering::Equal);
        // Antisymmetry: compare(a, b) + compare(b, a) == 0.
        prop_assert_eq!(
            semver::compare(&va, &vb),
            semver::compare(&vb, &va).reverse()
        );
    }

    #[test]
    fn prop_exactly_one_of_lt_eq_gt(a in SEMVER_REGEX, b in SEMVER_REGEX) {
        let va = semver::parse(&a, opts()).unwrap();
        let vb = semver::parse(&b, opts()).unwrap();
        let holds = [
            semver::lt(&va, &vb),
            semver::eq(&va, &vb),
            semver::gt(&va, &vb),
        ];
        prop_assert_eq!(holds.iter().filter(|h| **h).count(), 1);
    }

    #[test]
    fn prop_valid_is_canonical(s in SEMVER_REGEX) {
        let canonical = semver::valid(&s, opts()).unwrap();
        prop_assert_eq!(semver::valid(&canonical, opts()).unwrap(), canonical);
    }

    #[test]
    fn prop_max_satisfying_is_greatest_satisfier(
        versions in proptest::collection::vec(SEMVER_REGEX, 1..8),
        range_text in prop_oneof![
            Just("*".to_string()),
            Just("^1.0.0".to_string()),
            Just("~0.2.0".to_string()),
            Just(">=1.2.3 <4".to_string()),
            Just("1.x || >=2.5.0".to_string()),
            Just("0.1.0 - 2.0.0".to_string()),
        ],
    ) {
        let refs: Vec<&str> = versions.iter().map(String::as_str).collect();
        let found = range::max_satisfying(refs.iter().copied(), &range_text, opts());

        // Brute force over the parsed list.
        let mut satisfiers: Vec<_> = versions
            .iter()
            .filter(|v| range::satisfies(v, &range_text, opts()))
            .map(|v| semver::parse(v, opts()).unwrap())
            .collect();
        satisfiers.sort();

        match (found, satisfiers.last()) {
            (None, None) => {}
            (Some(found), Some(greatest)) => {
                prop_assert_eq!(semver::compare(&found, greatest), Ordering::Equal);
            }
            (found, greatest) => {
                prop_assert!(false, "disagreement: {:?} vs {:?}", found, greatest);
            }
        }
    }

    #[test]
    fn prop_satisfies_matches_direct_range_test(s in SEMVER_REGEX) {
        // A version always satisfies the exact range spelled from itself
        // (prerelease gating permits the same-triple prerelease).
        let version = semver::parse(&s, opts()).unwrap();
        let exact = version.to_string();
        prop_assert!(range::satisfies(&s, &exact, opts()));
    }
}
