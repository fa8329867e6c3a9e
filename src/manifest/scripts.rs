use serde_derive::Serialize;

/// Script names the package manager runs on its own during install/publish
/// flows.
pub const LIFECYCLE_SCRIPTS: &[&str] = &[
    "preinstall",
    "install",
    "postinstall",
    "prepublish",
    "prepublishOnly",
    "prepack",
    "postpack",
    "prepare",
    "publish",
    "postpublish",
    "preversion",
    "version",
    "postversion",
    "preuninstall",
    "uninstall",
    "postuninstall",
];

/// One parsed script entry with its pre/post companions resolved.
#[derive(Clone, Debug, Serialize)]
pub struct ScriptEntry {
    pub name: String,
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<String>,
    pub lifecycle: bool,
    pub env_vars: Vec<(String, String)>,
    pub references: Vec<String>,
}

fn is_env_assignment(token: &str) -> Option<(String, String)> {
    let (name, value) = token.split_once('=')?;
    if name.is_empty() {
        return None;
    }
    let mut chars = name.chars();
    let first = chars.next()?;
    if !(first.is_ascii_alphabetic() || first == '_') {
        return None;
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    Some((name.to_string(), value.to_string()))
}

/// `NAME=VALUE` assignments at the head of a command line.
fn leading_env_vars(command: &str) -> Vec<(String, String)> {
    let mut vars = Vec::new();
    for token in command.split_whitespace() {
        match is_env_assignment(token) {
            Some(assignment) => vars.push(assignment),
            None => break,
        }
    }
    vars
}

/// Sibling scripts invoked via `npm run <name>` inside a command.
fn script_references(command: &str) -> Vec<String> {
    let tokens: Vec<&str> = command.split_whitespace().collect();
    let mut references = Vec::new();
    let mut i = 0;
    while i + 1 < tokens.len() {
        if tokens[i] == "npm" && tokens[i + 1] == "run" {
            // Skip over flags like `--silent` to the script name.
            let mut j = i + 2;
            while j < tokens.len() && tokens[j].starts_with('-') {
                j += 1;
            }
            if j < tokens.len() {
                let name = tokens[j].trim_matches(|c| matches!(c, '&' | ';' | '|'));
                if !name.is_empty() && !references.iter().any(|r| r == name) {
                    references.push(name.to_string());
                }
            }
            i = j;
        }
        i += 1;
    }
    references
}

/// Parse a script map. Each entry records its raw command, its `pre<name>` /
/// `post<name>` companions, whether the name is a lifecycle hook, leading
/// environment assignments, and referenced sibling scripts.
pub fn parse_scripts(entries: &[(String, String)]) -> Vec<ScriptEntry> {
    entries
        .iter()
        .map(|(name, command)| {
            let find = |wanted: String| {
                entries
                    .iter()
                    .find(|(n, _)| *n == wanted)
                    .map(|(_, c)| c.clone())
            };
            ScriptEntry {
                name: name.clone(),
                command: command.clone(),
                pre: find(format!("pre{}", name)),
                post: find(format!("post{}", name)),
                lifecycle: LIFECYCLE_SCRIPTS.contains(&name.as_str()),
                env_vars: leading_env_vars(command),
                references: script_references(command),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(n, c)| (n.to_string(), c.to_string()))
            .collect()
    }

    #[test]
    fn test_pre_post_pairing() {
        let parsed = parse_scripts(&entries(&[
            ("pretest", "npm run lint"),
            ("test", "vitest run"),
            ("posttest", "echo done"),
            ("lint", "eslint ."),
        ]));
        let test = parsed.iter().find(|s| s.name == "test").unwrap();
        assert_eq!(test.pre.as_deref(), Some("npm run lint"));
        assert_eq!(test.post.as_deref(), Some("echo done"));
        let lint = parsed.iter().find(|s| s.name == "lint").unwrap();
        assert_eq!(lint.pre, None);
        assert_eq!(lint.post, None);
    }

    #[test]
    fn test_lifecycle_flag() {
        let parsed = parse_scripts(&entries(&[
            ("prepare", "node setup.js"),
            ("prepublishOnly", "npm run build"),
            ("build", "tsc"),
        ]));
        assert!(parsed[0].lifecycle);
        assert!(parsed[1].lifecycle);
        assert!(!parsed[2].lifecycle);
    }

    #[test]
    fn test_env_vars_at_head() {
        let parsed = parse_scripts(&entries(&[(
            "build",
            "NODE_ENV=production DEBUG= webpack --mode production",
        )]));
        assert_eq!(
            parsed[0].env_vars,
            vec![
                ("NODE_ENV".to_string(), "production".to_string()),
                ("DEBUG".to_string(), String::new())
            ]
        );
        // Assignments after the command word do not count.
        let parsed = parse_scripts(&entries(&[("run", "webpack NODE_ENV=production")]));
        assert!(parsed[0].env_vars.is_empty());
    }

    #[test]
    fn test_references() {
        let parsed = parse_scripts(&entries(&[(
            "ci",
            "npm run lint && npm run --silent test && npm run lint",
        )]));
        assert_eq!(parsed[0].references, vec!["lint", "test"]);

        let parsed = parse_scripts(&entries(&[("plain", "node index.js run fast")]));
        assert!(parsed[0].references.is_empty());
    }
}
