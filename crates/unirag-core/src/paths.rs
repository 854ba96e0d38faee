//! Path helpers for user-provided locations (index dir, model dir).

use std::path::PathBuf;

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_paths_pass_through() {
        assert_eq!(expand_path("indexes/lexical"), PathBuf::from("indexes/lexical"));
    }

    #[test]
    fn env_vars_expand() {
        std::env::set_var("UNIRAG_TEST_BASE", "/data");
        assert_eq!(expand_path("${UNIRAG_TEST_BASE}/idx"), PathBuf::from("/data/idx"));
    }
}
