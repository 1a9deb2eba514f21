//! Rule storage and the access evaluator.
//!
//! [`RuleStore`] holds the ordered rule list and answers
//! [`is_blocked`](RuleStore::is_blocked) queries against it. Rules behave
//! like an ordered firewall: the first rule whose method and path match is
//! decisive, so narrow or exception rules must be declared before broader
//! catch-alls. The one exception is a block rule whose exclusion condition is
//! not met: it defers to later rules instead of claiming the request.

use crate::error::DenialReason;
use crate::pattern::Delimiter;
use crate::rule::{Rule, RuleDecl, RulesDecl};
use std::sync::{Arc, PoisonError, RwLock};

/// A stored rule: the declaration as registered plus its compile result.
#[derive(Debug, Clone)]
struct StoredRule {
    decl: RuleDecl,
    compiled: Result<Rule, DenialReason>,
}

impl StoredRule {
    fn new(decl: RuleDecl) -> Self {
        let compiled = Rule::compile(&decl);
        Self { decl, compiled }
    }
}

/// The ordered access rule list and its evaluator.
///
/// Rule replacement swaps in a freshly built list behind an `Arc`, so every
/// evaluation (including ones already in flight) observes either the whole
/// old list or the whole new list, never a partial update. Evaluation itself
/// reads a snapshot and performs no mutation.
///
/// # Example
/// ```
/// use rest_access::{DenialReason, RuleDecl, RuleStore};
///
/// let store = RuleStore::new();
/// store.replace([
///     RuleDecl::block("*", "/*", "audit"),
///     RuleDecl::new("GET", "/signup/*", "tool-*"),
/// ]);
///
/// assert_eq!(store.is_blocked("GET", "/signup/me", "tool-admin"), None);
/// assert_eq!(
///     store.is_blocked("GET", "/signup/me", "audit"),
///     Some(DenialReason::PermissionDenied)
/// );
/// ```
#[derive(Debug, Default)]
pub struct RuleStore {
    rules: RwLock<Arc<Vec<StoredRule>>>,
}

impl RuleStore {
    /// Create an empty store. With no rules registered, every request is
    /// allowed (fail-open when unconfigured).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the given ordered rule list.
    pub fn with_rules(rules: impl IntoIterator<Item = RuleDecl>) -> Self {
        let store = Self::new();
        store.replace(rules);
        store
    }

    /// Append a single rule after the existing ones.
    ///
    /// Intended for single-threaded setup phases; for live reconfiguration
    /// use [`replace`](RuleStore::replace), which publishes a whole list at
    /// once.
    pub fn append(&self, rule: RuleDecl) {
        let mut guard = self.rules.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = guard.as_ref().clone();
        next.push(StoredRule::new(rule));
        *guard = Arc::new(next);
    }

    /// Replace the stored rules wholesale with a new ordered list.
    pub fn replace(&self, rules: impl IntoIterator<Item = RuleDecl>) {
        let next: Vec<StoredRule> = rules.into_iter().map(StoredRule::new).collect();
        let mut guard = self.rules.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(next);
    }

    /// Register rules in any declaration shape: a single rule appends, a
    /// full rule list replaces.
    ///
    /// ```
    /// use rest_access::{RuleDecl, RuleStore};
    ///
    /// let store = RuleStore::new();
    /// // A full list replaces.
    /// store.add_rules(vec![
    ///     RuleDecl::new("GET", "/ajax/*", "read"),
    ///     RuleDecl::new("POST,DELETE,PUT", "/ajax/*", "edit,insert,delete"),
    /// ]);
    /// // A single rule appends.
    /// store.add_rules(RuleDecl::new("GET", "/status", "ops"));
    /// assert_eq!(store.len(), 3);
    /// ```
    pub fn add_rules(&self, rules: impl Into<RulesDecl>) {
        match rules.into() {
            RulesDecl::One(rule) => self.append(rule),
            RulesDecl::Many(rules) => self.replace(rules),
        }
    }

    /// A deep, independent copy of the registered declarations. Mutating the
    /// returned value has no effect on the store.
    pub fn rules(&self) -> Vec<RuleDecl> {
        self.snapshot().iter().map(|stored| stored.decl.clone()).collect()
    }

    /// Number of registered rules.
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    /// Whether no rules are registered.
    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    fn snapshot(&self) -> Arc<Vec<StoredRule>> {
        self.rules.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Evaluate a request against the rules in declaration order.
    ///
    /// Returns `None` when the request is not blocked, or the reason it was
    /// denied. Any query string or fragment is stripped from `path` before
    /// matching. An empty rule list allows everything; a non-empty list that
    /// produces no match denies with
    /// [`DenialReason::NoMatchingRule`] (fail-closed).
    pub fn is_blocked(&self, method: &str, path: &str, permission: &str) -> Option<DenialReason> {
        let rules = self.snapshot();
        if rules.is_empty() {
            return None;
        }

        let path = strip_query(path);
        let path_tokens = Delimiter::Path.split(path);

        for stored in rules.iter() {
            let rule = match &stored.compiled {
                Ok(rule) => rule,
                // A defective rule aborts the whole evaluation. Skipping it
                // could silently widen access.
                Err(reason) => {
                    tracing::error!(reason = %reason, rule = ?stored.decl, "defective access rule");
                    return Some(reason.clone());
                }
            };

            if !rule.matches_method(method) {
                continue;
            }
            if !rule.path().matches_tokens(&path_tokens) {
                continue;
            }

            // Method and path matched; the permission decides.
            let result = rule.permission().check(permission, rule.is_block());

            // A block rule whose exclusion condition was not met does not
            // claim the request.
            if rule.is_block() && result.is_none() {
                continue;
            }

            tracing::debug!(
                method = method,
                path = path,
                permission = permission,
                block = rule.is_block(),
                outcome = ?result,
                "access rule matched"
            );
            return result;
        }

        tracing::debug!(method = method, path = path, permission = permission, "no access rule matched");
        Some(DenialReason::NoMatchingRule)
    }
}

/// Strip a query string or fragment suffix from a request path.
fn strip_query(path: &str) -> &str {
    path.split(['?', '#']).next().unwrap_or(path)
}
