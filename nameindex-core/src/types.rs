//! Core types used throughout nameindex
//!
//! This module contains the fundamental data types that form the basis of
//! the ordered-name index's data model.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A non-empty byte string, ordered unsigned-byte-lexicographically.
///
/// `Ord` is derived directly from the wrapped bytes: Rust's default
/// ordering for `[u8]` already sorts unsigned-byte-lexicographically, so
/// there is no custom comparator to get wrong here (contrast with
/// MVCC-style internal keys elsewhere in the ecosystem, which usually need
/// one).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Name(Vec<u8>);

impl Name {
    /// Builds a `Name`, rejecting empty byte strings.
    pub fn new(bytes: Vec<u8>) -> Result<Self, Error> {
        if bytes.is_empty() {
            return Err(Error::InvalidName("name must not be empty".to_string()));
        }
        Ok(Self(bytes))
    }

    /// Borrows the underlying bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consumes the `Name`, returning the underlying bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl AsRef<[u8]> for Name {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<Vec<u8>> for Name {
    type Error = Error;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Error> {
        Name::new(bytes)
    }
}

impl TryFrom<&str> for Name {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self, Error> {
        Name::new(s.as_bytes().to_vec())
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

/// An opaque handle assigned by the `SkipList` collaborator on insert.
///
/// Stable until the owning node is deleted. `NodeId` deliberately does not
/// special-case zero as "no id": callers that need to express "no hint,
/// allocate a fresh id" use `Option<NodeId>` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
