//! Command handlers for the fewshot CLI.

pub mod config;
pub mod tag;
pub mod train;

use std::path::PathBuf;

/// Expand `~` in a user-supplied path argument.
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_path_passthrough() {
        assert_eq!(expand_path("/tmp/x.jsonl"), PathBuf::from("/tmp/x.jsonl"));
    }

    #[test]
    fn test_expand_path_tilde() {
        let expanded = expand_path("~/data.jsonl");
        assert!(!expanded.to_string_lossy().starts_with('~'));
    }
}
