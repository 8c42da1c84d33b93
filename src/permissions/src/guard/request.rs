//! Request abstraction consumed by guards

use serde_json::Value;
use std::collections::HashMap;

use super::Permissions;
use crate::config::KeyPath;

/// What a guard needs from a request
///
/// The token is looked up inside [`token_root`](GuardRequest::token_root)
/// with the configured `tokenKey`, and a granted check attaches its
/// [`Permissions`] under the configured `requestProperty`.
pub trait GuardRequest {
    /// Document holding the decoded token, if authentication ran
    fn token_root(&self) -> Option<&Value>;

    /// Summary of the request handed to predicates
    fn describe(&self) -> Value {
        Value::Null
    }

    /// Store the capability for later handlers
    fn attach(&mut self, property: &KeyPath, permissions: Permissions);
}

/// Capabilities attached to a request, keyed by `requestProperty`
#[derive(Debug, Clone, Default)]
pub struct AttachedPermissions(HashMap<String, Permissions>);

impl AttachedPermissions {
    pub fn get(&self, property: &str) -> Option<&Permissions> {
        self.0.get(property)
    }

    pub fn insert(&mut self, property: &KeyPath, permissions: Permissions) {
        self.0.insert(property.as_str().to_string(), permissions);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Framework-independent request: a JSON document plus attachments
///
/// ```
/// use cretoai_permissions::RequestDocument;
/// use serde_json::json;
///
/// let request = RequestDocument::new(json!({"user": {"scope": "read"}}));
/// assert!(request.attached("permissions").is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestDocument {
    document: Value,
    summary: Value,
    attached: AttachedPermissions,
}

impl RequestDocument {
    pub fn new(document: Value) -> Self {
        Self {
            document,
            summary: Value::Null,
            attached: AttachedPermissions::default(),
        }
    }

    /// Set the summary passed to predicates
    pub fn with_summary(mut self, summary: Value) -> Self {
        self.summary = summary;
        self
    }

    /// Capability attached under `property`, if any
    pub fn attached(&self, property: &str) -> Option<&Permissions> {
        self.attached.get(property)
    }
}

impl GuardRequest for RequestDocument {
    fn token_root(&self) -> Option<&Value> {
        Some(&self.document)
    }

    fn describe(&self) -> Value {
        self.summary.clone()
    }

    fn attach(&mut self, property: &KeyPath, permissions: Permissions) {
        self.attached.insert(property, permissions);
    }
}
