//! Core type definitions for Sealbox
//!
//! This module defines the fundamental types used throughout the system:
//! namespace identifiers, canonical namespace paths, and the namespace
//! record itself.

use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Caller-supplied string-to-string annotations attached to a namespace.
pub type CustomMetadata = BTreeMap<String, String>;

/// Maximum length of a single path segment, in bytes.
pub const MAX_SEGMENT_LENGTH: usize = 128;

/// Maximum nesting depth of a namespace path.
pub const MAX_DEPTH: usize = 32;

/// Top-level mount prefixes claimed by the platform. A namespace segment
/// with one of these names would shadow a system mount.
const RESERVED_SEGMENTS: &[&str] = &["sys", "auth", "audit", "identity", "cubbyhole"];

/// Stable identifier of a namespace.
///
/// Generated once at creation and never changed or reused afterwards,
/// so other subsystems (secret engines, tokens) can hold it as a
/// foreign key without tracking path changes.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display)]
#[display("{_0}")]
pub struct NamespaceId(String);

impl NamespaceId {
    /// ID of the implicit root namespace
    pub const ROOT: &'static str = "root";

    /// Generate a new random namespace ID (8 hex characters)
    #[must_use]
    pub fn generate() -> Self {
        let uuid = Uuid::new_v4().simple().to_string();
        Self(uuid[..8].to_string())
    }

    /// ID of the root namespace
    #[must_use]
    pub fn root() -> Self {
        Self(Self::ROOT.to_string())
    }

    /// Create from an existing identifier string (internal use only)
    #[must_use]
    pub fn new_unchecked(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the identifier as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether this is the root namespace's ID
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0 == Self::ROOT
    }
}

impl fmt::Debug for NamespaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NamespaceId({})", self.0)
    }
}

/// Canonical hierarchical namespace path.
///
/// The canonical form is `/`-joined non-empty segments with a trailing
/// separator (`team1/proj/`). The root namespace is the empty string.
/// Because every non-root path carries the trailing separator, lexical
/// string order over canonical paths respects tree order, which is what
/// lets a sorted index answer child and ancestor queries.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display)]
#[display("{_0}")]
pub struct NamespacePath(String);

impl NamespacePath {
    /// The root namespace path
    #[must_use]
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Parse and canonicalize a raw path string.
    ///
    /// Leading separators and a missing trailing separator are repaired;
    /// empty segments, over-long segments, excessive depth, reserved
    /// segment names, and disallowed characters are rejected.
    /// Parsing an already canonical path returns it unchanged.
    pub fn parse(raw: &str) -> Result<Self, NamespacePathError> {
        let trimmed = raw.trim_start_matches('/');
        if trimmed.is_empty() {
            return Ok(Self::root());
        }

        // A trailing separator is canonical, not an empty final segment
        let body = trimmed.strip_suffix('/').unwrap_or(trimmed);

        let mut canonical = String::with_capacity(body.len() + 1);
        let mut depth = 0usize;
        for segment in body.split('/') {
            Self::validate_segment(segment)?;
            depth += 1;
            if depth > MAX_DEPTH {
                return Err(NamespacePathError::TooDeep);
            }
            canonical.push_str(segment);
            canonical.push('/');
        }

        Ok(Self(canonical))
    }

    fn validate_segment(segment: &str) -> Result<(), NamespacePathError> {
        if segment.is_empty() {
            return Err(NamespacePathError::EmptySegment);
        }
        if segment.len() > MAX_SEGMENT_LENGTH {
            return Err(NamespacePathError::SegmentTooLong);
        }
        for c in segment.chars() {
            if c.is_whitespace() || c.is_control() {
                return Err(NamespacePathError::InvalidChar(c));
            }
        }
        if RESERVED_SEGMENTS.contains(&segment) {
            return Err(NamespacePathError::ReservedSegment(segment.to_string()));
        }
        Ok(())
    }

    /// Create from an already canonical string (internal use only)
    #[must_use]
    pub fn new_unchecked(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Get the canonical path as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether this is the root path
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Path of the parent namespace; `None` for the root.
    ///
    /// The parent of a top-level namespace is the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        let body = &self.0[..self.0.len() - 1];
        match body.rfind('/') {
            Some(idx) => Some(Self(self.0[..=idx].to_string())),
            None => Some(Self::root()),
        }
    }

    /// Iterate over the path's segments, outermost first
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// Nesting depth; 0 for the root
    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// Check whether `other` is an immediate child of this path
    #[must_use]
    pub fn is_parent_of(&self, other: &Self) -> bool {
        other.parent().as_ref() == Some(self)
    }
}

impl fmt::Debug for NamespacePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NamespacePath({:?})", self.0)
    }
}

/// Errors that can occur when parsing a namespace path
#[derive(Debug, Clone, thiserror::Error)]
pub enum NamespacePathError {
    #[error("path contains an empty segment")]
    EmptySegment,
    #[error("path segment exceeds {MAX_SEGMENT_LENGTH} bytes")]
    SegmentTooLong,
    #[error("path exceeds maximum depth of {MAX_DEPTH}")]
    TooDeep,
    #[error("path contains invalid character: {0:?}")]
    InvalidChar(char),
    #[error("path segment {0:?} is reserved")]
    ReservedSegment(String),
}

/// A namespace record: an isolated tenancy boundary identified by a
/// hierarchical path and a stable ID.
///
/// Persisted as JSON so later record revisions can add fields without
/// breaking older readers; unknown fields are ignored on decode and
/// `custom_metadata` defaults to empty when absent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    /// Stable opaque identifier
    pub id: NamespaceId,
    /// Canonical path within the tree
    pub path: NamespacePath,
    /// Caller-supplied annotations
    #[serde(default)]
    pub custom_metadata: CustomMetadata,
}

impl Namespace {
    /// The implicit root namespace. It always exists and is never
    /// persisted.
    #[must_use]
    pub fn root() -> Self {
        Self {
            id: NamespaceId::root(),
            path: NamespacePath::root(),
            custom_metadata: CustomMetadata::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_canonicalizes() {
        assert_eq!(NamespacePath::parse("team1").unwrap().as_str(), "team1/");
        assert_eq!(NamespacePath::parse("team1/").unwrap().as_str(), "team1/");
        assert_eq!(NamespacePath::parse("/team1").unwrap().as_str(), "team1/");
        assert_eq!(
            NamespacePath::parse("team1/proj").unwrap().as_str(),
            "team1/proj/"
        );
    }

    #[test]
    fn test_parse_root() {
        assert!(NamespacePath::parse("").unwrap().is_root());
        assert!(NamespacePath::parse("/").unwrap().is_root());
    }

    #[test]
    fn test_parse_idempotent() {
        let once = NamespacePath::parse("a/b/c").unwrap();
        let twice = NamespacePath::parse(once.as_str()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_parse_rejects() {
        assert!(NamespacePath::parse("a//b").is_err());
        assert!(NamespacePath::parse("a b").is_err());
        assert!(NamespacePath::parse("a\tb").is_err());
        assert!(NamespacePath::parse("sys").is_err());
        assert!(NamespacePath::parse("team1/auth").is_err());
        assert!(NamespacePath::parse(&"x/".repeat(MAX_DEPTH + 1)).is_err());
        assert!(NamespacePath::parse(&"y".repeat(MAX_SEGMENT_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_parent() {
        let path = NamespacePath::parse("a/b/c").unwrap();
        assert_eq!(path.parent().unwrap().as_str(), "a/b/");
        let top = NamespacePath::parse("a").unwrap();
        assert!(top.parent().unwrap().is_root());
        assert!(NamespacePath::root().parent().is_none());
    }

    #[test]
    fn test_segments_and_depth() {
        let path = NamespacePath::parse("a/b/c").unwrap();
        assert_eq!(path.segments().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(path.depth(), 3);
        assert_eq!(NamespacePath::root().depth(), 0);
    }

    #[test]
    fn test_is_parent_of() {
        let parent = NamespacePath::parse("a").unwrap();
        let child = NamespacePath::parse("a/b").unwrap();
        let grandchild = NamespacePath::parse("a/b/c").unwrap();
        assert!(parent.is_parent_of(&child));
        assert!(!parent.is_parent_of(&grandchild));
        assert!(NamespacePath::root().is_parent_of(&parent));
    }

    #[test]
    fn test_id_generate() {
        let id = NamespaceId::generate();
        assert_eq!(id.as_str().len(), 8);
        assert!(!id.is_root());
        assert_ne!(id, NamespaceId::generate());
    }

    #[test]
    fn test_namespace_json_tolerates_unknown_fields() {
        let decoded: Namespace =
            serde_json::from_str(r#"{"id":"abcd1234","path":"team1/","future_field":true}"#)
                .unwrap();
        assert_eq!(decoded.id.as_str(), "abcd1234");
        assert!(decoded.custom_metadata.is_empty());
    }
}
