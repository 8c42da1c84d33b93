//! User-supplied predicates

use futures::future::{self, BoxFuture, FutureExt};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::context::{EvaluationContext, PredicateContext};
use crate::grammar::GrantedSet;

/// Explicit denial raised by a predicate
///
/// Unlike returning `Ok(false)`, a denial stops the whole evaluation and its
/// reason becomes the `Forbidden` message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct Denial {
    reason: String,
}

impl Denial {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Deny with a reason from inside a predicate
///
/// ```
/// use cretoai_permissions::{deny, Predicate};
///
/// let business_hours = Predicate::from_fn(|_, ctx| {
///     if ctx.token["shift"] == "night" {
///         return deny("Outside business hours");
///     }
///     Ok(true)
/// });
/// ```
pub fn deny<T>(reason: impl Into<String>) -> Result<T, Denial> {
    Err(Denial::new(reason))
}

/// Predicate outcome; only `Ok(true)` passes
pub type PredicateResult = Result<bool, Denial>;

type CheckFn =
    dyn Fn(Arc<GrantedSet>, PredicateContext) -> BoxFuture<'static, PredicateResult> + Send + Sync;

/// A user-supplied check, possibly asynchronous
///
/// Predicates receive the granted set and their own copy of the
/// [`PredicateContext`]. They are awaited one at a time in declaration order.
#[derive(Clone)]
pub struct Predicate {
    name: Arc<str>,
    check: Arc<CheckFn>,
}

impl Predicate {
    /// Wrap an async check
    pub fn new<F, Fut>(check: F) -> Self
    where
        F: Fn(Arc<GrantedSet>, PredicateContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = PredicateResult> + Send + 'static,
    {
        Self {
            name: Arc::from("predicate"),
            check: Arc::new(move |granted, ctx| check(granted, ctx).boxed()),
        }
    }

    /// Wrap a synchronous check
    pub fn from_fn<F>(check: F) -> Self
    where
        F: Fn(&GrantedSet, &PredicateContext) -> PredicateResult + Send + Sync + 'static,
    {
        Self::new(move |granted, ctx| future::ready(check(granted.as_ref(), &ctx)))
    }

    /// Name used in logs and rule rendering
    pub fn named(mut self, name: impl AsRef<str>) -> Self {
        self.name = Arc::from(name.as_ref());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) async fn call(&self, ctx: &EvaluationContext) -> PredicateResult {
        let result = (self.check)(ctx.shared_granted(), ctx.predicate_context()).await;
        debug!(predicate = %self.name, result = ?result, "Predicate evaluated");
        result
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate").field("name", &self.name).finish()
    }
}
