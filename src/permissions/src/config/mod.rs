//! Guard configuration
//!
//! `GuardOptions` is the caller-facing, loosely-typed input (it can be read
//! from JSON or built in code); `GuardConfig` is the validated, immutable
//! result shared by every middleware a guard produces.

mod delimiter;
mod path;

pub use delimiter::{
    Delimiters, DEFAULT_CLAIM_DELIMITER, DEFAULT_SCOPE_DELIMITER, DELIMITER_PUNCTUATION,
};
pub use path::{KeyPath, PathInput};

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::grammar::Grammar;
use crate::rule::Predicate;

/// Default path of the decoded token in the request document
pub const DEFAULT_TOKEN_KEY: &str = "user";

/// Default path of the granted claim inside the token
pub const DEFAULT_SCOPE_KEY: &str = "scope";

/// Default request slot for the permissions capability
pub const DEFAULT_REQUEST_PROPERTY: &str = "permissions";

/// Configuration errors, raised once when a guard is created
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {option} '{value}': {reason}")]
    InvalidDelimiter {
        option: &'static str,
        value: String,
        reason: String,
    },

    #[error("claimDelimiter and claimScopeDelimiter must differ (both are '{0}')")]
    SameDelimiters(char),

    #[error("invalid {option}: {reason}")]
    InvalidPath {
        option: &'static str,
        reason: String,
    },

    #[error("invalid adminKey: {0}")]
    InvalidAdmin(String),

    #[error("malformed guard options: {0}")]
    Malformed(String),
}

/// How the admin flag is derived for a request
#[derive(Debug, Clone)]
pub enum AdminCheck {
    /// Admin iff the value at this path in the token is exactly `true`
    Path(KeyPath),
    /// Admin iff the predicate returns `Ok(true)`
    Predicate(Predicate),
}

/// Unvalidated guard options
///
/// Field names follow the camelCase keys used in serialized configuration.
/// Unset fields take their documented defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GuardOptions {
    /// Path of the decoded token in the request document (default `user`)
    pub token_key: Option<PathInput>,

    /// Path of the granted claim inside the token (default `scope`)
    pub scope_key: Option<PathInput>,

    /// Path of the admin flag inside the token
    pub admin_key: Option<PathInput>,

    /// Separator between permissions in a claim string (default `,`)
    pub claim_delimiter: Option<String>,

    /// Separator between a permission name and its scopes (default `:`)
    pub claim_scope_delimiter: Option<String>,

    /// Reject requests without a token (default `true`)
    pub credentials_required: Option<bool>,

    /// Deny requests whose granted claim is empty (default `false`)
    pub scope_required: Option<bool>,

    /// Request slot for the capability; `null` disables attaching
    #[serde(default, deserialize_with = "explicit_null")]
    pub request_property: Option<Option<PathInput>>,

    /// Admin predicate, mutually exclusive with `admin_key`
    #[serde(skip)]
    pub admin_predicate: Option<Predicate>,
}

/// Keeps `Some(None)` for an explicit `null`, leaving `None` for "not given"
fn explicit_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl GuardOptions {
    /// Create empty options (all defaults)
    pub fn new() -> Self {
        Self::default()
    }

    /// Read options from a JSON value
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        serde_json::from_value(value).map_err(|e| ConfigError::Malformed(e.to_string()))
    }

    /// Read options from a JSON string
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(|e| ConfigError::Malformed(e.to_string()))
    }

    pub fn with_token_key(mut self, path: impl Into<PathInput>) -> Self {
        self.token_key = Some(path.into());
        self
    }

    pub fn with_scope_key(mut self, path: impl Into<PathInput>) -> Self {
        self.scope_key = Some(path.into());
        self
    }

    pub fn with_admin_key(mut self, path: impl Into<PathInput>) -> Self {
        self.admin_key = Some(path.into());
        self
    }

    pub fn with_admin_predicate(mut self, predicate: Predicate) -> Self {
        self.admin_predicate = Some(predicate);
        self
    }

    pub fn with_claim_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.claim_delimiter = Some(delimiter.into());
        self
    }

    pub fn with_claim_scope_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.claim_scope_delimiter = Some(delimiter.into());
        self
    }

    pub fn with_credentials_required(mut self, required: bool) -> Self {
        self.credentials_required = Some(required);
        self
    }

    pub fn with_scope_required(mut self, required: bool) -> Self {
        self.scope_required = Some(required);
        self
    }

    pub fn with_request_property(mut self, path: impl Into<PathInput>) -> Self {
        self.request_property = Some(Some(path.into()));
        self
    }

    pub fn without_request_property(mut self) -> Self {
        self.request_property = Some(None);
        self
    }
}

/// Validated guard configuration
#[derive(Debug, Clone)]
pub struct GuardConfig {
    token_key: KeyPath,
    scope_key: KeyPath,
    admin: Option<AdminCheck>,
    delimiters: Delimiters,
    credentials_required: bool,
    scope_required: bool,
    request_property: Option<KeyPath>,
    grammar: Grammar,
}

impl GuardConfig {
    /// Validate options and fill in defaults
    pub fn from_options(options: GuardOptions) -> Result<Self, ConfigError> {
        let token_key = KeyPath::parse(
            "tokenKey",
            options.token_key.unwrap_or_else(|| DEFAULT_TOKEN_KEY.into()),
        )?;
        let scope_key = KeyPath::parse(
            "scopeKey",
            options.scope_key.unwrap_or_else(|| DEFAULT_SCOPE_KEY.into()),
        )?;

        let admin = match (options.admin_key, options.admin_predicate) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::InvalidAdmin(
                    "a path and a predicate cannot both be set".to_string(),
                ))
            }
            (Some(path), None) => Some(AdminCheck::Path(KeyPath::parse("adminKey", path)?)),
            (None, Some(predicate)) => Some(AdminCheck::Predicate(predicate)),
            (None, None) => None,
        };

        let claim = options
            .claim_delimiter
            .unwrap_or_else(|| DEFAULT_CLAIM_DELIMITER.to_string());
        let scope = options
            .claim_scope_delimiter
            .unwrap_or_else(|| DEFAULT_SCOPE_DELIMITER.to_string());
        let delimiters = Delimiters::new(&claim, &scope)?;

        let request_property = match options.request_property {
            None => Some(KeyPath::parse("requestProperty", DEFAULT_REQUEST_PROPERTY.into())?),
            Some(None) => None,
            Some(Some(path)) => Some(KeyPath::parse("requestProperty", path)?),
        };

        let grammar = Grammar::new(delimiters)?;

        let config = Self {
            token_key,
            scope_key,
            admin,
            delimiters,
            credentials_required: options.credentials_required.unwrap_or(true),
            scope_required: options.scope_required.unwrap_or(false),
            request_property,
            grammar,
        };

        debug!(
            token_key = %config.token_key,
            scope_key = %config.scope_key,
            claim_delimiter = ?config.delimiters.claim(),
            scope_delimiter = ?config.delimiters.scope(),
            admin = config.admin.is_some(),
            "Guard configuration accepted"
        );

        Ok(config)
    }

    pub fn token_key(&self) -> &KeyPath {
        &self.token_key
    }

    pub fn scope_key(&self) -> &KeyPath {
        &self.scope_key
    }

    pub fn admin(&self) -> Option<&AdminCheck> {
        self.admin.as_ref()
    }

    pub fn delimiters(&self) -> Delimiters {
        self.delimiters
    }

    pub fn credentials_required(&self) -> bool {
        self.credentials_required
    }

    pub fn scope_required(&self) -> bool {
        self.scope_required
    }

    pub fn request_property(&self) -> Option<&KeyPath> {
        self.request_property.as_ref()
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config = GuardConfig::from_options(GuardOptions::new()).unwrap();
        assert_eq!(config.token_key().as_str(), "user");
        assert_eq!(config.scope_key().as_str(), "scope");
        assert_eq!(config.delimiters(), Delimiters::default());
        assert!(config.credentials_required());
        assert!(!config.scope_required());
        assert_eq!(config.request_property().map(KeyPath::as_str), Some("permissions"));
        assert!(config.admin().is_none());
    }

    #[test]
    fn test_from_json() {
        let options = GuardOptions::from_value(json!({
            "tokenKey": ["auth", "token"],
            "scopeKey": "claims.permissions",
            "adminKey": "is_admin",
            "claimDelimiter": " ",
            "claimScopeDelimiter": ".",
            "credentialsRequired": false,
            "requestProperty": null
        }))
        .unwrap();

        let config = GuardConfig::from_options(options).unwrap();
        assert_eq!(config.token_key().as_str(), "auth.token");
        assert_eq!(config.scope_key().as_str(), "claims.permissions");
        assert_eq!(config.delimiters().claim(), ' ');
        assert_eq!(config.delimiters().scope(), '.');
        assert!(!config.credentials_required());
        assert!(config.request_property().is_none());
        assert!(matches!(config.admin(), Some(AdminCheck::Path(p)) if p.as_str() == "is_admin"));
    }

    #[test]
    fn test_wrong_typed_options() {
        assert!(matches!(
            GuardOptions::from_value(json!({"tokenKey": 42})),
            Err(ConfigError::Malformed(_))
        ));
        assert!(matches!(
            GuardOptions::from_value(json!({"adminKey": {"nested": true}})),
            Err(ConfigError::Malformed(_))
        ));
        assert!(matches!(
            GuardOptions::from_value(json!({"claimDelimiter": 1})),
            Err(ConfigError::Malformed(_))
        ));
        assert!(matches!(
            GuardOptions::from_value(json!({"unknownKey": "x"})),
            Err(ConfigError::Malformed(_))
        ));
    }

    #[test]
    fn test_empty_path_rejected() {
        let options = GuardOptions::new().with_token_key("");
        assert!(matches!(
            GuardConfig::from_options(options),
            Err(ConfigError::InvalidPath { option: "tokenKey", .. })
        ));

        let options = GuardOptions::new().with_scope_key(Vec::<String>::new());
        assert!(matches!(
            GuardConfig::from_options(options),
            Err(ConfigError::InvalidPath { option: "scopeKey", .. })
        ));
    }

    #[test]
    fn test_same_delimiters_rejected() {
        let options = GuardOptions::new()
            .with_claim_delimiter(":")
            .with_claim_scope_delimiter(":");
        assert!(matches!(
            GuardConfig::from_options(options),
            Err(ConfigError::SameDelimiters(':'))
        ));
    }

    #[test]
    fn test_admin_path_and_predicate_conflict() {
        let options = GuardOptions::new()
            .with_admin_key("admin")
            .with_admin_predicate(Predicate::from_fn(|_, _| Ok(true)));
        assert!(matches!(
            GuardConfig::from_options(options),
            Err(ConfigError::InvalidAdmin(_))
        ));
    }
}
