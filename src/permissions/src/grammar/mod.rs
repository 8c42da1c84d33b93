//! Permission grammar
//!
//! A permission is one or more runs of `[A-Za-z0-9_]` separated by the scope
//! delimiter (`user:add`). Granted permissions may also use `*` in any
//! qualifier position (`user:*`); requested permissions may not.
//!
//! [`Grammar`] compiles both rules for a given delimiter pair and exposes the
//! two parsers: one for caller-declared arguments, one for token claims.

mod permission;


pub use permission::{Arg, GrantedSet, Permission, Requirement, WILDCARD};

use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use tracing::debug;

use crate::config::{ConfigError, Delimiters};
use crate::error::{GuardError, Result};

/// Characters allowed in a permission name or scope
const CHARSET: &str = "[A-Za-z0-9_]";

/// Compiled permission grammar for one delimiter pair
#[derive(Debug, Clone)]
pub struct Grammar {
    delimiters: Delimiters,
    requested: Regex,
    granted: Regex,
}

impl Grammar {
    /// Compile the requested and granted rules for `delimiters`
    pub fn new(delimiters: Delimiters) -> std::result::Result<Self, ConfigError> {
        let scope = regex::escape(&delimiters.scope().to_string());

        let requested = format!(r"^{c}+(?:{d}{c}+)*$", c = CHARSET, d = scope);
        let granted = format!(r"^{c}+(?:{d}(?:{c}+|\*))*$", c = CHARSET, d = scope);

        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| ConfigError::Malformed(e.to_string()))
        };

        Ok(Self {
            delimiters,
            requested: compile(&requested)?,
            granted: compile(&granted)?,
        })
    }

    pub fn delimiters(&self) -> Delimiters {
        self.delimiters
    }

    /// Whether `s` is a valid requested permission
    pub fn is_requested(&self, s: &str) -> bool {
        self.requested.is_match(s)
    }

    /// Whether `s` is a valid granted permission
    pub fn is_granted(&self, s: &str) -> bool {
        self.granted.is_match(s)
    }

    /// Parse a single requested permission
    pub fn parse_permission(&self, s: &str) -> Result<Permission> {
        self.validate_requested(0, s)
    }

    /// Validate caller-declared arguments
    ///
    /// Permission strings are validated and deduplicated by exact string
    /// equality, keeping the first occurrence. Predicates pass through in
    /// declaration order and are never deduplicated.
    ///
    /// # Errors
    ///
    /// - `GuardError::EmptyArgument` when `args` is empty
    /// - `GuardError::InvalidArgument` naming the first offending index
    pub fn parse_args<I, A>(&self, args: I) -> Result<Vec<Requirement>>
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        let mut seen = HashSet::new();
        let mut requirements = Vec::new();
        let mut empty = true;

        for (index, arg) in args.into_iter().enumerate() {
            empty = false;
            let arg: Arg = arg.into();
            match arg {
                Arg::Permission(s) => {
                    let permission = self.validate_requested(index, &s)?;
                    if seen.insert(s) {
                        requirements.push(Requirement::Permission(permission));
                    }
                }
                Arg::Predicate(predicate) => {
                    requirements.push(Requirement::Predicate(predicate));
                }
            }
        }

        if empty {
            return Err(GuardError::EmptyArgument);
        }

        Ok(requirements)
    }

    /// Parse the granted claim from a token
    ///
    /// Absent, `null`, `""` and `[]` all produce an empty set. A string is
    /// split on the claim delimiter; an array must hold only strings. Any
    /// element that breaks the granted grammar fails the whole claim.
    ///
    /// # Errors
    ///
    /// Returns `GuardError::DataIntegrity` for a wrong-typed claim or a
    /// malformed element.
    pub fn parse_granted(&self, claim: Option<&Value>) -> Result<GrantedSet> {
        let elements: Vec<&str> = match claim {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::String(s)) if s.is_empty() => Vec::new(),
            Some(Value::String(s)) => s.split(self.delimiters.claim()).collect(),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(index, item)| {
                    item.as_str().ok_or_else(|| {
                        GuardError::DataIntegrity(format!(
                            "element {} of the claim is not a string: {}",
                            index, item
                        ))
                    })
                })
                .collect::<Result<_>>()?,
            Some(other) => {
                return Err(GuardError::DataIntegrity(format!(
                    "claim must be a string or an array of strings, got {}",
                    json_type(other)
                )))
            }
        };

        let scope = self.delimiters.scope();
        let mut permissions = Vec::with_capacity(elements.len());
        for element in elements {
            if !self.granted.is_match(element) {
                return Err(GuardError::DataIntegrity(format!(
                    "granted permission '{}' does not follow the permission grammar",
                    element
                )));
            }
            permissions.push(Permission::from_validated(element, scope));
        }

        debug!(granted = permissions.len(), "Parsed granted permissions");
        Ok(GrantedSet::from_permissions(permissions))
    }

    fn validate_requested(&self, index: usize, s: &str) -> Result<Permission> {
        if self.requested.is_match(s) {
            return Ok(Permission::from_validated(s, self.delimiters.scope()));
        }

        let reason = if s.is_empty() {
            "permission cannot be empty".to_string()
        } else if s.contains('*') {
            "wildcards are only allowed in granted permissions".to_string()
        } else {
            format!(
                "expected runs of {} separated by '{}'",
                CHARSET,
                self.delimiters.scope()
            )
        };

        Err(GuardError::invalid_argument(index, s, reason))
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
