//! Permission segment sequences and granted sets

use std::fmt;

use crate::matcher;
use crate::rule::Predicate;

/// Wildcard marker, legal only in granted scope positions
pub const WILDCARD: &str = "*";

/// A parsed permission such as `user:add`
///
/// The first segment is the permission name, the remaining segments are
/// scope qualifiers. Requested permissions never contain [`WILDCARD`];
/// granted permissions may use it in any qualifier position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Permission {
    raw: String,
    segments: Vec<String>,
}

impl Permission {
    /// Builds a permission from an already-validated string
    pub(crate) fn from_validated(raw: &str, scope_delimiter: char) -> Self {
        Self {
            raw: raw.to_string(),
            segments: raw.split(scope_delimiter).map(String::from).collect(),
        }
    }

    /// Permission name (first segment)
    pub fn name(&self) -> &str {
        &self.segments[0]
    }

    /// Scope qualifiers after the name
    pub fn scopes(&self) -> &[String] {
        &self.segments[1..]
    }

    /// All segments, name first
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The permission as written
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether any qualifier is the wildcard marker
    pub fn has_wildcards(&self) -> bool {
        self.scopes().iter().any(|s| s == WILDCARD)
    }

    /// Re-joins the segments with `scope_delimiter`
    pub fn join(&self, scope_delimiter: char) -> String {
        let mut buf = [0u8; 4];
        self.segments.join(scope_delimiter.encode_utf8(&mut buf))
    }

    /// Whether this granted permission satisfies `requested`
    pub fn covers(&self, requested: &Permission) -> bool {
        matcher::matches(&self.segments, &requested.segments)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl AsRef<str> for Permission {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}

/// Permissions granted by a token's claim
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrantedSet {
    permissions: Vec<Permission>,
}

impl GrantedSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_permissions(permissions: Vec<Permission>) -> Self {
        Self { permissions }
    }

    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.permissions.iter()
    }

    /// Membership test: true iff some granted permission covers `requested`
    pub fn contains(&self, requested: &Permission) -> bool {
        self.permissions.iter().any(|granted| granted.covers(requested))
    }
}

impl<'a> IntoIterator for &'a GrantedSet {
    type Item = &'a Permission;
    type IntoIter = std::slice::Iter<'a, Permission>;

    fn into_iter(self) -> Self::IntoIter {
        self.permissions.iter()
    }
}

/// A caller-declared argument: a permission string or a predicate
#[derive(Debug, Clone)]
pub enum Arg {
    Permission(String),
    Predicate(Predicate),
}

impl From<&str> for Arg {
    fn from(s: &str) -> Self {
        Self::Permission(s.to_string())
    }
}

impl From<&String> for Arg {
    fn from(s: &String) -> Self {
        Self::Permission(s.clone())
    }
}

impl From<String> for Arg {
    fn from(s: String) -> Self {
        Self::Permission(s)
    }
}

impl From<Predicate> for Arg {
    fn from(predicate: Predicate) -> Self {
        Self::Predicate(predicate)
    }
}

/// A validated argument, ready to become a rule node
#[derive(Debug, Clone)]
pub enum Requirement {
    Permission(Permission),
    Predicate(Predicate),
}
