//! # CretoAI Permissions
//!
//! Route-level permission checks against the claims of an already-decoded
//! access token.
//!
//! ## Features
//!
//! - **Scoped permissions** such as `user:add`, with explicit `*` wildcards
//!   on the granted side (`user:*` covers `user` and `user:add`)
//! - **Rule combinators**: AND of a permission list, `.or(...)` alternatives
//!   and `.not(...)` exclusions, evaluated sequentially with short-circuiting
//! - **Async predicates** for checks that go beyond the token's claim, with
//!   an explicit deny-with-reason signal
//! - **Admin bypass** via a token path or a predicate
//! - **axum middleware** (feature `http`, on by default)
//!
//! ## Example
//!
//! ```rust
//! use cretoai_permissions::{Guard, GuardOptions, Outcome, RequestDocument};
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let guard = Guard::new(GuardOptions::new())?;
//! let middleware = guard.check(["read"])?.not(["suspended"])?;
//!
//! let mut request = RequestDocument::new(json!({
//!     "user": { "sub": "alice", "scope": "read,user:*" }
//! }));
//!
//! let outcome = middleware.authorize(&mut request).await?;
//! if let Outcome::Granted(permissions) = outcome {
//!     assert!(permissions.has_permission(["user:add"]).await?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod grammar;
pub mod guard;
pub mod matcher;
pub mod rule;

#[cfg(feature = "http")]
pub mod http;

// Re-export commonly used types
pub use config::{AdminCheck, ConfigError, Delimiters, GuardConfig, GuardOptions, KeyPath};
pub use context::{EvaluationContext, PredicateContext};
pub use error::{GuardError, Result};
pub use grammar::{Arg, GrantedSet, Grammar, Permission, WILDCARD};
pub use guard::{
    AttachedPermissions, Guard, GuardRequest, Middleware, Outcome, Permissions, RequestDocument,
};
pub use rule::{deny, Denial, Predicate, PredicateResult, Rule};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
