//! Rule evaluation tests: combinators, short-circuiting and denials

use super::*;
use crate::config::Delimiters;
use crate::grammar::{Arg, Grammar};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn grammar() -> Grammar {
    Grammar::new(Delimiters::default()).unwrap()
}

fn context(claim: &str) -> EvaluationContext {
    let granted = grammar().parse_granted(Some(&json!(claim))).unwrap();
    EvaluationContext::new(granted, json!({"scope": claim}), json!(claim), Value::Null)
}

fn rule<I, A>(args: I) -> Rule
where
    I: IntoIterator<Item = A>,
    A: Into<Arg>,
{
    Rule::build(grammar().parse_args(args).unwrap())
}

/// Predicate returning `result` and counting its calls
fn counted(result: bool, calls: &Arc<AtomicUsize>) -> Predicate {
    let calls = Arc::clone(calls);
    Predicate::from_fn(move |_, _| {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(result)
    })
}

// ============================================================================
// Structure
// ============================================================================

#[test]
fn test_single_argument_is_not_wrapped() {
    assert!(matches!(rule(["read"]), Rule::Permission(_)));
    assert!(matches!(rule(["read", "write"]), Rule::All(ref c) if c.len() == 2));
}

#[test]
fn test_rule_display() {
    let r = rule(["read", "write"])
        .or(rule(["admin"]))
        .and_not(rule([Predicate::from_fn(|_, _| Ok(false)).named("suspended")]));
    assert_eq!(r.to_string(), "(((read AND write) OR admin) AND NOT suspended())");
}

// ============================================================================
// Literal evaluation
// ============================================================================

#[tokio::test]
async fn test_and_of_permissions() {
    let r = rule(["read", "user:add"]);
    assert!(r.evaluate(&context("read,user:*")).await.unwrap());
    assert!(!r.evaluate(&context("read")).await.unwrap());
}

#[tokio::test]
async fn test_wildcard_examples() {
    assert!(rule(["user"]).evaluate(&context("user:*")).await.unwrap());
    assert!(rule(["user:add"]).evaluate(&context("user:*")).await.unwrap());
    assert!(!rule(["user:add"]).evaluate(&context("user")).await.unwrap());
}

#[tokio::test]
async fn test_not_excludes() {
    let r = rule(["read"]).and_not(rule(["write"]));
    assert!(!r.evaluate(&context("read,write")).await.unwrap());
    assert!(r.evaluate(&context("read")).await.unwrap());
}

#[tokio::test]
async fn test_or_alternative() {
    let r = rule(["write"]).or(rule(["admin"]));
    assert!(r.evaluate(&context("admin")).await.unwrap());
    assert!(r.evaluate(&context("write")).await.unwrap());
    assert!(!r.evaluate(&context("read")).await.unwrap());
}

#[tokio::test]
async fn test_empty_granted_set() {
    assert!(!rule(["read"]).evaluate(&context("")).await.unwrap());
}

// ============================================================================
// Short-circuiting
// ============================================================================

#[tokio::test]
async fn test_and_short_circuits() {
    let falsy = Arc::new(AtomicUsize::new(0));
    let truthy = Arc::new(AtomicUsize::new(0));

    let r = rule([counted(false, &falsy), counted(true, &truthy)]);

    assert!(!r.evaluate(&context("read")).await.unwrap());
    assert_eq!(falsy.load(Ordering::SeqCst), 1);
    assert_eq!(truthy.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_or_short_circuits() {
    let falsy = Arc::new(AtomicUsize::new(0));
    let truthy1 = Arc::new(AtomicUsize::new(0));
    let truthy2 = Arc::new(AtomicUsize::new(0));

    let r = rule([counted(false, &falsy)])
        .or(rule([counted(true, &truthy1)]))
        .or(rule([counted(true, &truthy2)]));

    assert!(r.evaluate(&context("read")).await.unwrap());
    assert_eq!(falsy.load(Ordering::SeqCst), 1);
    assert_eq!(truthy1.load(Ordering::SeqCst), 1);
    assert_eq!(truthy2.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_async_predicates_run_in_order() {
    let order = Arc::new(Mutex::new(Vec::new()));

    let slow = {
        let order = Arc::clone(&order);
        Predicate::new(move |_, _| {
            let order = Arc::clone(&order);
            async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                order.lock().unwrap().push("slow");
                Ok(true)
            }
        })
    };
    let fast = {
        let order = Arc::clone(&order);
        Predicate::new(move |_, _| {
            let order = Arc::clone(&order);
            async move {
                order.lock().unwrap().push("fast");
                Ok(true)
            }
        })
    };

    assert!(rule([slow, fast]).evaluate(&context("read")).await.unwrap());
    assert_eq!(*order.lock().unwrap(), vec!["slow", "fast"]);
}

// ============================================================================
// Predicates
// ============================================================================

#[tokio::test]
async fn test_predicate_sees_granted_and_context() {
    let r = rule([Predicate::from_fn(|granted, ctx| {
        Ok(granted.len() == 2 && ctx.claim == json!("read,write") && !ctx.is_admin)
    })]);
    assert!(r.evaluate(&context("read,write")).await.unwrap());
}

#[tokio::test]
async fn test_denial_aborts_evaluation() {
    let after = Arc::new(AtomicUsize::new(0));
    let denying = Predicate::from_fn(|_, _| deny("Account is locked"));

    let r = rule([denying]).or(rule([counted(true, &after)]));
    let err = r.evaluate(&context("read")).await.unwrap_err();

    assert_eq!(err.reason(), "Account is locked");
    assert_eq!(after.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_denial_is_not_inverted_by_not() {
    let r = rule(["read"]).and_not(rule([Predicate::from_fn(|_, _| deny("nope"))]));
    assert!(r.evaluate(&context("read")).await.is_err());
}

#[tokio::test]
async fn test_shared_rule_evaluates_concurrently() {
    let r = Arc::new(rule(["read"]).and_not(rule(["write"])));

    let mut handles = Vec::new();
    for claim in ["read", "read,write", "write", "read"] {
        let r = Arc::clone(&r);
        handles.push(tokio::spawn(async move {
            r.evaluate(&context(claim)).await.unwrap()
        }));
    }

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap());
    }
    assert_eq!(results, vec![true, false, false, true]);
}

#[tokio::test]
async fn test_admin_node_reads_context_flag() {
    let r = Rule::Admin.and_not(rule(["suspended"]));
    assert_eq!(r.to_string(), "(ADMIN AND NOT suspended)");

    let mut ctx = context("read");
    assert!(!r.evaluate(&ctx).await.unwrap());

    ctx.set_admin(true);
    assert!(r.evaluate(&ctx).await.unwrap());

    let mut suspended = context("suspended");
    suspended.set_admin(true);
    assert!(!r.evaluate(&suspended).await.unwrap());
}
