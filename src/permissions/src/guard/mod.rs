//! Guards and per-route middleware
//!
//! # Architecture
//!
//! ```text
//! GuardOptions → Guard (validated config, shared)
//!                  ↓ check(args) / .or(args) / .not(args)
//!               Middleware (compiled rule tree, shared across requests)
//!                  ↓ authorize(request)
//! token lookup → claim parse → admin check → rule evaluation → Permissions
//! ```

mod permissions;
mod request;

pub use permissions::Permissions;
pub use request::{AttachedPermissions, GuardRequest, RequestDocument};

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::{AdminCheck, GuardConfig, GuardOptions};
use crate::context::EvaluationContext;
use crate::error::{GuardError, Result};
use crate::grammar::Arg;
use crate::rule::Rule;

/// Factory for route middleware sharing one configuration
#[derive(Debug, Clone)]
pub struct Guard {
    config: Arc<GuardConfig>,
}

impl Guard {
    /// Validate `options` and create a guard
    ///
    /// # Errors
    ///
    /// Returns `GuardError::Config` for invalid options.
    pub fn new(options: GuardOptions) -> Result<Self> {
        let config = GuardConfig::from_options(options)?;

        info!(
            token_key = %config.token_key(),
            scope_key = %config.scope_key(),
            credentials_required = config.credentials_required(),
            "Permission guard created"
        );

        Ok(Self::from_config(config))
    }

    /// Create a guard from an already-validated configuration
    pub fn from_config(config: GuardConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Declare the permissions a route requires (combined with AND)
    ///
    /// With an admin check configured, `args` may be empty: the route is then
    /// open to admins only.
    ///
    /// # Errors
    ///
    /// `EmptyArgument` when `args` is empty and no admin check is configured,
    /// `InvalidArgument` when a permission breaks the grammar.
    pub fn check<I, A>(&self, args: I) -> Result<Middleware>
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        let args: Vec<Arg> = args.into_iter().map(Into::into).collect();

        let admin_only = args.is_empty() && self.config.admin().is_some();
        let rule = if admin_only {
            Rule::Admin
        } else {
            Rule::build(self.config.grammar().parse_args(args)?)
        };

        let middleware = Middleware {
            config: Arc::clone(&self.config),
            rule: Arc::new(rule),
            admin_only,
        };
        debug!(rule = %middleware.describe_rule(), "Declared route permissions");

        Ok(middleware)
    }
}

/// Result of a successful check
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The expression passed; the capability was attached when configured
    Granted(Permissions),
    /// No token and credentials are optional: nothing was evaluated
    Skipped,
}

impl Outcome {
    pub fn permissions(&self) -> Option<&Permissions> {
        match self {
            Outcome::Granted(permissions) => Some(permissions),
            Outcome::Skipped => None,
        }
    }
}

/// Authorization middleware for one route
///
/// Cheap to clone; the rule tree is shared read-only between requests.
/// `or` and `not` return a new middleware wrapping the current rule.
///
/// Admins bypass the rule, except on admin-only routes where the admin check
/// is the root of the rule (`ADMIN AND NOT suspended`).
#[derive(Debug, Clone)]
pub struct Middleware {
    config: Arc<GuardConfig>,
    rule: Arc<Rule>,
    admin_only: bool,
}

impl Middleware {
    /// Root of the compiled expression
    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    /// Whether the route was declared without permissions
    pub fn is_admin_only(&self) -> bool {
        self.admin_only
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Allow the request when `args` pass, even if the current rule fails
    pub fn or<I, A>(self, args: I) -> Result<Self>
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        let alternative = Rule::build(self.config.grammar().parse_args(args)?);
        let rule = unshare(self.rule).or(alternative);

        Ok(Self::extended(self.config, rule, self.admin_only))
    }

    /// Deny the request when `args` pass, even if the current rule passes
    pub fn not<I, A>(self, args: I) -> Result<Self>
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        let exclusion = Rule::build(self.config.grammar().parse_args(args)?);
        let rule = unshare(self.rule).and_not(exclusion);

        Ok(Self::extended(self.config, rule, self.admin_only))
    }

    /// Run the check for one request
    ///
    /// # Errors
    ///
    /// - `Unauthorized` when no token is found and credentials are required
    /// - `DataIntegrity` when the granted claim is malformed
    /// - `Forbidden` when the expression fails or a predicate denies
    pub async fn authorize<R>(&self, request: &mut R) -> Result<Outcome>
    where
        R: GuardRequest + ?Sized,
    {
        let config = &self.config;

        let token = request
            .token_root()
            .and_then(|root| config.token_key().lookup(root))
            .cloned();

        let token = match token {
            Some(token) => token,
            None if config.credentials_required() => {
                warn!(token_key = %config.token_key(), "No authorization token found");
                return Err(GuardError::Unauthorized(
                    "No authorization token was found".to_string(),
                ));
            }
            None => {
                debug!(token_key = %config.token_key(), "No token, credentials optional");
                return Ok(Outcome::Skipped);
            }
        };

        let claim = config
            .scope_key()
            .lookup(&token)
            .cloned()
            .unwrap_or(Value::Null);

        let granted = config.grammar().parse_granted(Some(&claim)).map_err(|e| {
            error!(scope_key = %config.scope_key(), error = %e, "Rejecting malformed claim");
            e
        })?;

        let mut ctx = EvaluationContext::new(granted, token, claim, request.describe());

        let is_admin = match config.admin() {
            Some(admin) => self.check_admin(admin, &ctx).await?,
            None => false,
        };
        ctx.set_admin(is_admin);

        // Admins skip the rule unless it is rooted at the admin check
        let allowed = (is_admin && !self.admin_only) || self.evaluate_rule(&ctx).await?;
        if !allowed {
            warn!(rule = %self.describe_rule(), "Permission denied");
            return Err(GuardError::Forbidden("Permission denied".to_string()));
        }

        debug!(rule = %self.describe_rule(), is_admin, "Permission granted");

        let permissions = Permissions::new(ctx, Arc::clone(&self.config));
        if let Some(property) = config.request_property() {
            request.attach(property, permissions.clone());
        }

        Ok(Outcome::Granted(permissions))
    }

    async fn check_admin(&self, admin: &AdminCheck, ctx: &EvaluationContext) -> Result<bool> {
        match admin {
            AdminCheck::Path(path) => Ok(path.lookup(ctx.token()) == Some(&Value::Bool(true))),
            AdminCheck::Predicate(predicate) => predicate
                .call(ctx)
                .await
                .map_err(|denial| GuardError::Forbidden(denial.reason().to_string())),
        }
    }

    async fn evaluate_rule(&self, ctx: &EvaluationContext) -> Result<bool> {
        if self.config.scope_required() && !ctx.is_admin() && ctx.granted().is_empty() {
            return Err(GuardError::Forbidden(
                "Permission denied: the token grants no permissions".to_string(),
            ));
        }

        self.rule
            .evaluate(ctx)
            .await
            .map_err(|denial| GuardError::Forbidden(denial.reason().to_string()))
    }

    fn extended(config: Arc<GuardConfig>, rule: Rule, admin_only: bool) -> Self {
        let middleware = Self {
            config,
            rule: Arc::new(rule),
            admin_only,
        };
        debug!(rule = %middleware.describe_rule(), "Extended route permissions");
        middleware
    }

    fn describe_rule(&self) -> String {
        self.rule.to_string()
    }
}

fn unshare(rule: Arc<Rule>) -> Rule {
    Arc::try_unwrap(rule).unwrap_or_else(|shared| (*shared).clone())
}
