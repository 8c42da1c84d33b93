//! Claim delimiter validation

use super::ConfigError;

/// Punctuation allowed for either delimiter
///
/// `_` and `*` are reserved for the permission grammar and never appear here.
pub const DELIMITER_PUNCTUATION: &str = "-!\"#$%&'()+,./:;<=>?@[]^`{|}~";

/// Default separator between permissions in a claim string
pub const DEFAULT_CLAIM_DELIMITER: char = ',';

/// Default separator between a permission name and its scopes
pub const DEFAULT_SCOPE_DELIMITER: char = ':';

/// The two delimiters used to read claim strings
///
/// `claim` separates permissions (`read,write`), `scope` separates a
/// permission name from its scope qualifiers (`user:add`). They are never equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delimiters {
    claim: char,
    scope: char,
}

impl Delimiters {
    /// Validates a delimiter pair
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidDelimiter` when a value is not exactly one
    /// allowed character, and `ConfigError::SameDelimiters` when both match.
    pub fn new(claim: &str, scope: &str) -> Result<Self, ConfigError> {
        let claim = single_char("claimDelimiter", claim, true)?;
        let scope = single_char("claimScopeDelimiter", scope, false)?;

        if claim == scope {
            return Err(ConfigError::SameDelimiters(claim));
        }

        Ok(Self { claim, scope })
    }

    /// Separator between permissions in a claim string
    pub fn claim(&self) -> char {
        self.claim
    }

    /// Separator between a permission name and its scopes
    pub fn scope(&self) -> char {
        self.scope
    }
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            claim: DEFAULT_CLAIM_DELIMITER,
            scope: DEFAULT_SCOPE_DELIMITER,
        }
    }
}

fn single_char(option: &'static str, value: &str, allow_space: bool) -> Result<char, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidDelimiter {
        option,
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let mut chars = value.chars();
    let c = match (chars.next(), chars.next()) {
        (Some(c), None) => c,
        _ => return Err(invalid("must be exactly one character")),
    };

    if c == ' ' {
        return if allow_space {
            Ok(c)
        } else {
            Err(invalid("space is only allowed as claimDelimiter"))
        };
    }

    if !DELIMITER_PUNCTUATION.contains(c) {
        return Err(invalid("must be one of -!\"#$%&'()+,./:;<=>?@[]^`{|}~"));
    }

    Ok(c)
}
