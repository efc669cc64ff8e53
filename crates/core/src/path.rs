//! Virtual path resolution
//!
//! Virtual paths look like `/container/key/with/slashes`. The first non-empty
//! segment names the container; everything after it is the object key.

use std::fmt;

/// Key delimiter used to synthesize directories from flat keys
pub const DELIMITER: &str = "/";

/// A virtual path split into its container and key parts
///
/// `container` is empty only for the root path; `key` is empty only when the
/// path names the container itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ResolvedPath {
    pub container: String,
    pub key: String,
}

impl ResolvedPath {
    pub fn new(container: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            key: key.into(),
        }
    }

    /// Check if this path is the root of the namespace
    pub fn is_root(&self) -> bool {
        self.container.is_empty()
    }

    /// Check if this path names a container without a key
    pub fn is_container(&self) -> bool {
        !self.container.is_empty() && self.key.is_empty()
    }

    /// Last path segment, or `/` for the root
    pub fn name(&self) -> &str {
        if self.is_root() {
            return DELIMITER;
        }
        if self.key.is_empty() {
            return &self.container;
        }
        self.key.rsplit(DELIMITER).next().unwrap_or(&self.key)
    }

    /// Key prefix used when listing this path as a directory
    pub fn list_prefix(&self) -> String {
        if self.key.is_empty() {
            String::new()
        } else {
            format!("{}{DELIMITER}", self.key)
        }
    }
}

impl fmt::Display for ResolvedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.container.is_empty(), self.key.is_empty()) {
            (true, _) => write!(f, "/"),
            (false, true) => write!(f, "/{}", self.container),
            (false, false) => write!(f, "/{}/{}", self.container, self.key),
        }
    }
}

/// Resolve a virtual path into its container and key
///
/// Empty segments are dropped, so leading, trailing and repeated slashes are
/// tolerated. Never fails: an empty path resolves to the root.
pub fn resolve(path: &str) -> ResolvedPath {
    let mut segments = path.split(DELIMITER).filter(|s| !s.is_empty());

    let container = segments.next().unwrap_or_default().to_string();
    let key = segments.collect::<Vec<_>>().join(DELIMITER);

    ResolvedPath { container, key }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_root() {
        assert_eq!(resolve("/"), ResolvedPath::default());
        assert_eq!(resolve(""), ResolvedPath::default());
        assert_eq!(resolve("///"), ResolvedPath::default());
        assert!(resolve("/").is_root());
    }

    #[test]
    fn test_resolve_container() {
        let path = resolve("/docs");
        assert_eq!(path.container, "docs");
        assert_eq!(path.key, "");
        assert!(path.is_container());
        assert_eq!(resolve("docs/"), path);
    }

    #[test]
    fn test_resolve_nested_key() {
        let path = resolve("/docs/sub/b.txt");
        assert_eq!(path.container, "docs");
        assert_eq!(path.key, "sub/b.txt");
        assert!(!path.is_container());
    }

    #[test]
    fn test_resolve_tolerates_extra_slashes() {
        let path = resolve("//docs//sub///b.txt/");
        assert_eq!(path, ResolvedPath::new("docs", "sub/b.txt"));
    }

    #[test]
    fn test_container_is_first_segment() {
        for p in ["/a/b/c", "a", "a/", "//a//b", "/a/b/"] {
            assert_eq!(resolve(p).container, "a", "path {p}");
        }
    }

    #[test]
    fn test_display_round_trip() {
        assert_eq!(resolve("/").to_string(), "/");
        assert_eq!(resolve("docs/").to_string(), "/docs");
        assert_eq!(resolve("//docs/sub//x").to_string(), "/docs/sub/x");
    }

    #[test]
    fn test_name_and_list_prefix() {
        assert_eq!(resolve("/").name(), "/");
        assert_eq!(resolve("/docs").name(), "docs");
        assert_eq!(resolve("/docs/sub/b.txt").name(), "b.txt");

        assert_eq!(resolve("/docs").list_prefix(), "");
        assert_eq!(resolve("/docs/sub").list_prefix(), "sub/");
    }
}
