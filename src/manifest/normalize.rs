use std::sync::LazyLock;

use regex::Regex;
use serde_derive::Serialize;
use serde_json::Value;

use super::{Code, Issue};

pub const MAX_KEYWORD_LENGTH: usize = 50;

/// Normalized repository field: always the object form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Repository {
    #[serde(rename = "type")]
    pub repo_type: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
}

static SHORTHAND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.-]+/[A-Za-z0-9_.-]+$").unwrap());

fn git_repository(url: String, directory: Option<String>) -> Repository {
    Repository {
        repo_type: "git".to_string(),
        url,
        directory,
    }
}

fn host_url(host: &str, path: &str) -> String {
    let path = path.trim_end_matches(".git");
    format!("git+https://{}/{}.git", host, path)
}

fn normalize_repository_url(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("git://") {
        format!("git+https://{}", rest)
    } else {
        url.to_string()
    }
}

/// Normalize the repository field to `{type, url, directory?}` per the
/// common shorthands. Strings that fit no known shape yield a miss.
pub fn normalize_repository(value: &Value) -> Option<Repository> {
    match value {
        Value::String(text) => normalize_repository_str(text),
        Value::Object(map) => {
            let url = map.get("url").and_then(Value::as_str)?;
            Some(Repository {
                repo_type: map
                    .get("type")
                    .and_then(Value::as_str)
                    .unwrap_or("git")
                    .to_string(),
                url: normalize_repository_url(url),
                directory: map
                    .get("directory")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            })
        }
        _ => None,
    }
}

pub fn normalize_repository_str(text: &str) -> Option<Repository> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    for (prefix, host) in [
        ("github:", "github.com"),
        ("gitlab:", "gitlab.com"),
        ("bitbucket:", "bitbucket.org"),
    ] {
        if let Some(path) = text.strip_prefix(prefix) {
            return Some(git_repository(host_url(host, path), None));
        }
    }
    if text.starts_with("git+") || text.starts_with("http://") || text.starts_with("https://") {
        return Some(git_repository(text.to_string(), None));
    }
    if let Some(rest) = text.strip_prefix("git://") {
        return Some(git_repository(format!("git+https://{}", rest), None));
    }
    if let Some(rest) = text.strip_prefix("git@") {
        // git@host:path -> git+ssh://git@host/path
        let (host, path) = rest.split_once(':')?;
        return Some(git_repository(format!("git+ssh://git@{}/{}", host, path), None));
    }
    if SHORTHAND_RE.is_match(text) {
        return Some(git_repository(host_url("github.com", text), None));
    }
    None
}

/// Lowercase, trim, drop empties and non-strings, de-duplicate preserving
/// first-seen order.
pub fn normalize_keywords(value: &Value) -> Vec<String> {
    let Value::Array(items) = value else {
        return Vec::new();
    };
    let mut seen = Vec::new();
    for item in items {
        let Some(text) = item.as_str() else { continue };
        let keyword = text.trim().to_lowercase();
        if keyword.is_empty() || seen.contains(&keyword) {
            continue;
        }
        seen.push(keyword);
    }
    seen
}

pub fn keyword_warnings(keywords: &[String]) -> Vec<Issue> {
    keywords
        .iter()
        .filter(|k| k.len() > MAX_KEYWORD_LENGTH)
        .map(|k| {
            Issue::new(
                "keywords",
                Code::KeywordTooLong,
                format!(
                    "keyword '{}' exceeds {} characters",
                    k, MAX_KEYWORD_LENGTH
                ),
            )
        })
        .collect()
}

/// The bugs field in object form.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Bugs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Accepts a URL string or an object with `url` and/or `email`; always
/// yields the object form.
pub fn normalize_bugs(value: &Value) -> Option<Bugs> {
    match value {
        Value::String(url) => Some(Bugs {
            url: Some(url.to_string()),
            email: None,
        }),
        Value::Object(map) => {
            let bugs = Bugs {
                url: map.get("url").and_then(Value::as_str).map(str::to_string),
                email: map.get("email").and_then(Value::as_str).map(str::to_string),
            };
            (bugs.url.is_some() || bugs.email.is_some()).then_some(bugs)
        }
        _ => None,
    }
}

/// A person record, parsed from `"Name <email> (url)"` or the object form.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Person {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

static PERSON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([^<(]*)(?:<([^>]*)>)?\s*(?:\(([^)]*)\))?\s*$").unwrap()
});

pub fn parse_person(value: &Value) -> Option<Person> {
    match value {
        Value::String(text) => {
            let caps = PERSON_RE.captures(text.trim())?;
            let name = caps.get(1).map_or("", |m| m.as_str()).trim().to_string();
            let email = caps
                .get(2)
                .map(|m| m.as_str().trim().to_string())
                .filter(|s| !s.is_empty());
            let url = caps
                .get(3)
                .map(|m| m.as_str().trim().to_string())
                .filter(|s| !s.is_empty());
            if name.is_empty() && email.is_none() && url.is_none() {
                return None;
            }
            Some(Person { name, email, url })
        }
        Value::Object(map) => {
            let name = map
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string();
            Some(Person {
                name,
                email: map.get("email").and_then(Value::as_str).map(str::to_string),
                url: map.get("url").and_then(Value::as_str).map(str::to_string),
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_repository_shorthands() {
        let repo = normalize_repository(&json!("user/repo")).unwrap();
        assert_eq!(repo.repo_type, "git");
        assert_eq!(repo.url, "git+https://github.com/user/repo.git");

        let repo = normalize_repository(&json!("github:user/repo")).unwrap();
        assert_eq!(repo.url, "git+https://github.com/user/repo.git");

        let repo = normalize_repository(&json!("gitlab:group/proj")).unwrap();
        assert_eq!(repo.url, "git+https://gitlab.com/group/proj.git");

        let repo = normalize_repository(&json!("bitbucket:team/repo")).unwrap();
        assert_eq!(repo.url, "git+https://bitbucket.org/team/repo.git");
    }

    #[test]
    fn test_repository_url_forms() {
        let repo = normalize_repository(&json!("git://example.com/a/b.git")).unwrap();
        assert_eq!(repo.url, "git+https://example.com/a/b.git");

        let repo = normalize_repository(&json!("git@github.com:user/repo.git")).unwrap();
        assert_eq!(repo.url, "git+ssh://git@github.com/user/repo.git");

        for passthrough in [
            "git+https://github.com/user/repo.git",
            "git+ssh://git@host/x.git",
            "https://example.com/repo",
        ] {
            let repo = normalize_repository(&json!(passthrough)).unwrap();
            assert_eq!(repo.url, passthrough);
        }
    }

    #[test]
    fn test_repository_object_form() {
        let repo = normalize_repository(&json!({
            "type": "git",
            "url": "git://host/a.git",
            "directory": "packages/core"
        }))
        .unwrap();
        assert_eq!(repo.url, "git+https://host/a.git");
        assert_eq!(repo.directory.as_deref(), Some("packages/core"));
    }

    #[test]
    fn test_repository_idempotent() {
        let once = normalize_repository(&json!("github:user/repo")).unwrap();
        let twice = normalize_repository_str(&once.url).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_keywords() {
        let normalized = normalize_keywords(&json!([
            " HTTP ",
            "parser",
            "http",
            "",
            42,
            "Parser"
        ]));
        assert_eq!(normalized, vec!["http", "parser"]);
        // Idempotent on its own output.
        let again = normalize_keywords(&json!(normalized.clone()));
        assert_eq!(again, normalized);
    }

    #[test]
    fn test_keyword_length_warning() {
        let long = "x".repeat(MAX_KEYWORD_LENGTH + 1);
        let warnings = keyword_warnings(&[long]);
        assert_eq!(warnings[0].code, Code::KeywordTooLong);
        assert!(keyword_warnings(&["ok".to_string()]).is_empty());
    }

    #[test]
    fn test_bugs_forms() {
        assert_eq!(
            normalize_bugs(&json!("https://github.com/u/r/issues")),
            Some(Bugs {
                url: Some("https://github.com/u/r/issues".into()),
                email: None
            })
        );
        assert_eq!(
            normalize_bugs(&json!({"email": "bugs@example.com"})),
            Some(Bugs {
                url: None,
                email: Some("bugs@example.com".into())
            })
        );
        assert_eq!(normalize_bugs(&json!({})), None);
        assert_eq!(normalize_bugs(&json!(42)), None);
    }

    #[test]
    fn test_person_parsing() {
        let person = parse_person(&json!("Ada Lovelace <ada@example.com> (https://ada.dev)"))
            .unwrap();
        assert_eq!(person.name, "Ada Lovelace");
        assert_eq!(person.email.as_deref(), Some("ada@example.com"));
        assert_eq!(person.url.as_deref(), Some("https://ada.dev"));

        let person = parse_person(&json!("Just A Name")).unwrap();
        assert_eq!(person.name, "Just A Name");
        assert_eq!(person.email, None);

        let person = parse_person(&json!({"name": "Obj", "email": "o@x.io"})).unwrap();
        assert_eq!(person.name, "Obj");
        assert_eq!(person.email.as_deref(), Some("o@x.io"));

        assert_eq!(parse_person(&json!("")), None);
        assert_eq!(parse_person(&json!(7)), None);
    }
}
