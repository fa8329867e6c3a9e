use std::fmt;

use itertools::Itertools;

pub fn show_vec_with<'a, T, F>(it: impl IntoIterator<Item = &'a T>, f: F) -> String
where
    T: 'a,
    F: FnMut(&T) -> String,
{
    Itertools::intersperse(it.into_iter().map(f), ", ".to_string()).collect::<String>()
}

pub fn show_vec<'a, T>(it: impl IntoIterator<Item = &'a T>) -> String
where
    T: fmt::Display + 'a,
{
    show_vec_with(it, std::string::ToString::to_string)
}

/// Strip a leading `./` from a relative path string, if present.
pub(crate) fn strip_dot_slash(path: &str) -> &str {
    path.strip_prefix("./").unwrap_or(path)
}

/// Prefix a relative path with `./` unless it already has one.
pub(crate) fn ensure_dot_slash(path: &str) -> String {
    if path.starts_with("./") {
        path.to_string()
    } else {
        format!("./{}", path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_show_vec() {
        assert_eq!(show_vec(&["a".to_string(), "b".to_string()]), "a, b");
        assert_eq!(show_vec(Vec::<&String>::new()), "");
    }

    #[test]
    fn test_dot_slash() {
        assert_eq!(strip_dot_slash("./lib/index.js"), "lib/index.js");
        assert_eq!(strip_dot_slash("lib/index.js"), "lib/index.js");
        assert_eq!(ensure_dot_slash("bin/cli.js"), "./bin/cli.js");
        assert_eq!(ensure_dot_slash("./bin/cli.js"), "./bin/cli.js");
    }
}
