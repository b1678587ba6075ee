//! Absolute prim paths.
//!
//! A [`PrimPath`] names one prim in the scene graph (`/World/Body/Collider`).
//! Paths are immutable and share their storage, so cloning one is a
//! reference-count bump. Ordering is lexicographic on the path text, which
//! keeps parents ahead of their children.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Errors produced when validating a path string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("Prim path is empty")]
    Empty,

    #[error("Prim path must be absolute: {0}")]
    NotAbsolute(String),

    #[error("Invalid prim name '{name}' in path {path}")]
    InvalidName { path: String, name: String },
}

/// An absolute, validated prim path.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PrimPath(Arc<str>);

impl PrimPath {
    /// Parse and validate an absolute path.
    pub fn new(path: &str) -> Result<Self, PathError> {
        if path.is_empty() {
            return Err(PathError::Empty);
        }
        if !path.starts_with('/') {
            return Err(PathError::NotAbsolute(path.to_string()));
        }
        if path == "/" {
            return Ok(Self::root());
        }

        for name in path[1..].split('/') {
            if !is_valid_name(name) {
                return Err(PathError::InvalidName {
                    path: path.to_string(),
                    name: name.to_string(),
                });
            }
        }

        Ok(Self(Arc::from(path)))
    }

    /// The pseudo-root `/`, parent of every top-level prim.
    pub fn root() -> Self {
        Self(Arc::from("/"))
    }

    pub fn is_root(&self) -> bool {
        &*self.0 == "/"
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path element; empty for the pseudo-root.
    pub fn name(&self) -> &str {
        match self.0.rfind('/') {
            Some(pos) => &self.0[pos + 1..],
            None => "",
        }
    }

    /// Parent path, or `None` for the pseudo-root.
    pub fn parent(&self) -> Option<PrimPath> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(0) => Some(Self::root()),
            Some(pos) => Some(Self(Arc::from(&self.0[..pos]))),
            None => None,
        }
    }

    /// Append one element.
    pub fn child(&self, name: &str) -> Result<PrimPath, PathError> {
        if !is_valid_name(name) {
            return Err(PathError::InvalidName {
                path: self.to_string(),
                name: name.to_string(),
            });
        }
        let joined = if self.is_root() {
            format!("/{}", name)
        } else {
            format!("{}/{}", self.0, name)
        };
        Ok(Self(Arc::from(joined)))
    }

    /// True if `self` equals `prefix` or lies somewhere below it.
    pub fn has_prefix(&self, prefix: &PrimPath) -> bool {
        if prefix.is_root() {
            return true;
        }
        match self.0.strip_prefix(&*prefix.0) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    /// Walk from `self` up to the top-level prim, `self` first.
    /// The pseudo-root is not yielded.
    pub fn ancestors(&self) -> Ancestors {
        Ancestors {
            next: if self.is_root() { None } else { Some(self.clone()) },
        }
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_')
}

/// Iterator returned by [`PrimPath::ancestors`].
pub struct Ancestors {
    next: Option<PrimPath>,
}

impl Iterator for Ancestors {
    type Item = PrimPath;

    fn next(&mut self) -> Option<PrimPath> {
        let current = self.next.take()?;
        self.next = current.parent().filter(|p| !p.is_root());
        Some(current)
    }
}

impl fmt::Display for PrimPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for PrimPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.0)
    }
}

impl FromStr for PrimPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PrimPath::new(s)
    }
}

impl AsRef<str> for PrimPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for PrimPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> PrimPath {
        PrimPath::new(s).unwrap()
    }

    #[test]
    fn test_validation() {
        assert_eq!(PrimPath::new(""), Err(PathError::Empty));
        assert!(matches!(PrimPath::new("World"), Err(PathError::NotAbsolute(_))));
        assert!(matches!(PrimPath::new("/World//Body"), Err(PathError::InvalidName { .. })));
        assert!(matches!(PrimPath::new("/World/"), Err(PathError::InvalidName { .. })));
        assert!(PrimPath::new("/World/rigid_body0").is_ok());
        assert!(PrimPath::new("/").unwrap().is_root());
    }

    #[test]
    fn test_parent_and_name() {
        let path = p("/World/Body/Collider");
        assert_eq!(path.name(), "Collider");
        assert_eq!(path.parent(), Some(p("/World/Body")));
        assert_eq!(p("/World").parent(), Some(PrimPath::root()));
        assert_eq!(PrimPath::root().parent(), None);
        assert_eq!(PrimPath::root().name(), "");
    }

    #[test]
    fn test_child() {
        assert_eq!(PrimPath::root().child("World").unwrap(), p("/World"));
        assert_eq!(p("/World").child("Body").unwrap(), p("/World/Body"));
        assert!(p("/World").child("a/b").is_err());
    }

    #[test]
    fn test_has_prefix() {
        let path = p("/World/Body");
        assert!(path.has_prefix(&p("/World")));
        assert!(path.has_prefix(&path));
        assert!(path.has_prefix(&PrimPath::root()));
        assert!(!p("/WorldX/Body").has_prefix(&p("/World")));
        assert!(!p("/World").has_prefix(&path));
    }

    #[test]
    fn test_ancestors() {
        let chain: Vec<String> = p("/a/b/c").ancestors().map(|a| a.to_string()).collect();
        assert_eq!(chain, vec!["/a/b/c", "/a/b", "/a"]);
        assert_eq!(PrimPath::root().ancestors().count(), 0);
    }

    #[test]
    fn test_ordering_keeps_parents_first() {
        let mut paths = vec![p("/b"), p("/a/b"), p("/a")];
        paths.sort();
        assert_eq!(paths, vec![p("/a"), p("/a/b"), p("/b")]);
    }
}
