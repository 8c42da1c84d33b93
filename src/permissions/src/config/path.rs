//! Dotted lookup paths into decoded token documents

use serde::Deserialize;
use serde_json::Value;
use std::fmt;

use super::ConfigError;

/// Path option as written by the caller: `"auth.user"` or `["auth", "user"]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PathInput {
    Dotted(String),
    Segments(Vec<String>),
}

impl From<&str> for PathInput {
    fn from(s: &str) -> Self {
        Self::Dotted(s.to_string())
    }
}

impl From<String> for PathInput {
    fn from(s: String) -> Self {
        Self::Dotted(s)
    }
}

impl From<Vec<String>> for PathInput {
    fn from(segments: Vec<String>) -> Self {
        Self::Segments(segments)
    }
}

impl From<Vec<&str>> for PathInput {
    fn from(segments: Vec<&str>) -> Self {
        Self::Segments(segments.into_iter().map(String::from).collect())
    }
}

/// Normalized lookup path
///
/// Both input forms normalize to the same dotted representation, so
/// `["auth", "user"]` and `"auth.user"` are equal paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPath {
    dotted: String,
    segments: Vec<String>,
}

impl KeyPath {
    /// Normalizes a path option
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidPath` for an empty path or a path with an
    /// empty segment.
    pub fn parse(option: &'static str, input: PathInput) -> Result<Self, ConfigError> {
        let dotted = match input {
            PathInput::Dotted(s) => s,
            PathInput::Segments(segments) => {
                if segments.is_empty() {
                    return Err(ConfigError::InvalidPath {
                        option,
                        reason: "path segment list is empty".to_string(),
                    });
                }
                segments.join(".")
            }
        };

        if dotted.is_empty() {
            return Err(ConfigError::InvalidPath {
                option,
                reason: "path is empty".to_string(),
            });
        }

        let segments: Vec<String> = dotted.split('.').map(String::from).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(ConfigError::InvalidPath {
                option,
                reason: format!("path '{}' contains an empty segment", dotted),
            });
        }

        Ok(Self { dotted, segments })
    }

    /// Path segments in lookup order
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Dotted representation
    pub fn as_str(&self) -> &str {
        &self.dotted
    }

    /// Walks `root` along this path
    ///
    /// Object keys are matched exactly; array elements are addressed by a
    /// decimal index segment. A `null` at the end of the path is reported as
    /// absent.
    pub fn lookup<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        let mut current = root;
        for segment in &self.segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }

        if current.is_null() {
            None
        } else {
            Some(current)
        }
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dotted)
    }
}
