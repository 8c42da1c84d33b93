//! Boolean rule trees over granted permissions and predicates
//!
//! Rules are built once when a route is declared and evaluated read-only for
//! every request. Evaluation is sequential and short-circuiting: `All` stops
//! at the first `false`, `Any` at the first `true`, and predicates are
//! awaited one at a time in declaration order.

mod predicate;

#[cfg(test)]
mod tests;

pub use predicate::{deny, Denial, Predicate, PredicateResult};

use futures::future::{BoxFuture, FutureExt};
use std::fmt;

use crate::context::EvaluationContext;
use crate::grammar::{Permission, Requirement};

/// A node of a compiled authorization expression
#[derive(Debug, Clone)]
pub enum Rule {
    /// Satisfied when some granted permission covers this one
    Permission(Permission),
    /// Satisfied when the predicate returns `Ok(true)`
    Predicate(Predicate),
    /// Every child must pass
    All(Vec<Rule>),
    /// At least one child must pass
    Any(Vec<Rule>),
    /// The child must fail
    Not(Box<Rule>),
    /// Satisfied when the request passed the admin check
    ///
    /// Root of an admin-only route; never produced by [`Rule::build`].
    Admin,
}

impl Rule {
    /// Combine validated arguments with AND
    ///
    /// A single requirement becomes the rule itself rather than a one-child
    /// `All`.
    pub fn build(requirements: Vec<Requirement>) -> Self {
        let mut nodes: Vec<Rule> = requirements.into_iter().map(Rule::from).collect();
        if nodes.len() == 1 {
            nodes.remove(0)
        } else {
            Rule::All(nodes)
        }
    }

    /// `Any(self, alternative)`
    pub fn or(self, alternative: Rule) -> Self {
        Rule::Any(vec![self, alternative])
    }

    /// `All(self, Not(exclusion))`
    pub fn and_not(self, exclusion: Rule) -> Self {
        Rule::All(vec![self, Rule::Not(Box::new(exclusion))])
    }

    /// Evaluate against one request's context
    ///
    /// A [`Denial`] from any predicate aborts the evaluation immediately,
    /// including under `Not` and `Any`.
    pub fn evaluate<'a>(
        &'a self,
        ctx: &'a EvaluationContext,
    ) -> BoxFuture<'a, Result<bool, Denial>> {
        async move {
            match self {
                Rule::Permission(permission) => Ok(ctx.granted().contains(permission)),
                Rule::Predicate(predicate) => predicate.call(ctx).await,
                Rule::All(children) => {
                    for child in children {
                        if !child.evaluate(ctx).await? {
                            return Ok(false);
                        }
                    }
                    Ok(true)
                }
                Rule::Any(children) => {
                    for child in children {
                        if child.evaluate(ctx).await? {
                            return Ok(true);
                        }
                    }
                    Ok(false)
                }
                Rule::Not(child) => Ok(!child.evaluate(ctx).await?),
                Rule::Admin => Ok(ctx.is_admin()),
            }
        }
        .boxed()
    }
}

impl From<Requirement> for Rule {
    fn from(requirement: Requirement) -> Self {
        match requirement {
            Requirement::Permission(permission) => Rule::Permission(permission),
            Requirement::Predicate(predicate) => Rule::Predicate(predicate),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |f: &mut fmt::Formatter<'_>, children: &[Rule], op: &str| {
            write!(f, "(")?;
            for (i, child) in children.iter().enumerate() {
                if i > 0 {
                    write!(f, " {} ", op)?;
                }
                write!(f, "{}", child)?;
            }
            write!(f, ")")
        };

        match self {
            Rule::Permission(permission) => write!(f, "{}", permission),
            Rule::Predicate(predicate) => write!(f, "{}()", predicate.name()),
            Rule::All(children) => join(f, children, "AND"),
            Rule::Any(children) => join(f, children, "OR"),
            Rule::Not(child) => write!(f, "NOT {}", child),
            Rule::Admin => write!(f, "ADMIN"),
        }
    }
}
