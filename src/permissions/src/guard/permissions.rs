//! Capability attached to authorized requests

use std::sync::Arc;

use crate::config::GuardConfig;
use crate::context::EvaluationContext;
use crate::error::{GuardError, Result};
use crate::grammar::{Arg, GrantedSet};
use crate::rule::Rule;

/// Ad-hoc permission checks bound to one request
///
/// Handlers use this for decisions that depend on data only known inside
/// the handler, e.g. `has_permission(["doc:edit"])` after loading a document.
#[derive(Debug, Clone)]
pub struct Permissions {
    context: Arc<EvaluationContext>,
    config: Arc<GuardConfig>,
}

impl Permissions {
    pub(crate) fn new(context: EvaluationContext, config: Arc<GuardConfig>) -> Self {
        Self {
            context: Arc::new(context),
            config,
        }
    }

    /// Outcome of the admin check for this request
    pub fn is_admin(&self) -> bool {
        self.context.is_admin()
    }

    /// Permissions granted by the token
    pub fn granted(&self) -> &GrantedSet {
        self.context.granted()
    }

    pub fn context(&self) -> &EvaluationContext {
        &self.context
    }

    /// Evaluate `args` (combined with AND) against this request
    ///
    /// The admin flag is not consulted; use [`is_admin`](Self::is_admin).
    ///
    /// # Errors
    ///
    /// Argument errors as for route declaration, and `Forbidden` when a
    /// predicate denies with a reason.
    pub async fn has_permission<I, A>(&self, args: I) -> Result<bool>
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        let rule = Rule::build(self.config.grammar().parse_args(args)?);
        rule.evaluate(&self.context)
            .await
            .map_err(|denial| GuardError::Forbidden(denial.reason().to_string()))
    }
}
