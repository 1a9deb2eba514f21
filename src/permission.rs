//! Permission expression matching.
//!
//! A rule's permission expression is a term-separated list (`,`/`;`/space) of
//! hierarchical scope patterns (`:`/`-` separated, trailing `*` for prefix
//! matching). The caller's permission set is tokenized the same way; a single
//! matching pair of (rule term, caller token) satisfies the expression.
//!
//! One deliberate quirk is preserved from the original rule language: an
//! expression that is exactly the string `"*"` never grants access. Scopes
//! must be named explicitly; `"*"` is not a blanket grant. Under a block rule
//! the same sentinel matches every caller, so the rule always fires. Either
//! way the result is a denial.

use crate::error::DenialReason;
use crate::pattern::{segments_match, Delimiter, WILDCARD};

/// One term of a permission expression, scope-tokenized at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopePattern {
    raw: String,
    tokens: Vec<String>,
}

impl ScopePattern {
    /// Compile a single scope pattern such as `tool-hero-*` or `api:write`.
    pub fn new(term: impl Into<String>) -> Self {
        let raw = term.into();
        let tokens = Delimiter::Scope.split(&raw).into_iter().map(str::to_owned).collect();
        Self { raw, tokens }
    }

    /// The term as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether this term is the bare `*` auto-match token.
    pub fn is_match_all(&self) -> bool {
        self.raw == WILDCARD
    }

    /// Test this term against one caller permission token.
    pub fn matches(&self, permission_token: &str) -> bool {
        segments_match(&self.tokens, &Delimiter::Scope.split(permission_token))
    }
}

/// A rule's required-permission expression, normalized once at registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionExpr {
    /// The literal string `"*"`. Never satisfiable by an allow-rule; matches
    /// every caller under a block rule. Always produces a denial.
    Wildcard,
    /// An ordered list of scope patterns; any one of them may satisfy the
    /// expression.
    Terms(Vec<ScopePattern>),
    /// A permission field that could not be normalized into a non-empty term
    /// sequence. Reported as [`DenialReason::MalformedPermission`] when the
    /// rule is reached.
    Malformed(String),
}

impl PermissionExpr {
    /// Parse an expression from its string form.
    ///
    /// The exact string `*` (surrounding whitespace ignored) is the
    /// [`Wildcard`](PermissionExpr::Wildcard) sentinel; anything else is
    /// term-split. Zero resulting terms is malformed.
    pub fn parse(expression: &str) -> Self {
        if expression.trim() == WILDCARD {
            return PermissionExpr::Wildcard;
        }
        let terms: Vec<ScopePattern> = Delimiter::Term
            .split(expression)
            .into_iter()
            .map(ScopePattern::new)
            .collect();
        if terms.is_empty() {
            PermissionExpr::Malformed(expression.to_owned())
        } else {
            PermissionExpr::Terms(terms)
        }
    }

    /// Build an expression from an already-split term list.
    ///
    /// Note: a list `["*"]` is a one-term list whose term auto-matches, not
    /// the string sentinel; only the *string* form `"*"` always denies.
    pub fn from_terms<I, T>(terms: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let terms: Vec<ScopePattern> = terms.into_iter().map(|t| ScopePattern::new(t.into())).collect();
        if terms.is_empty() {
            PermissionExpr::Malformed(String::new())
        } else {
            PermissionExpr::Terms(terms)
        }
    }

    /// Evaluate the expression against a caller's permission set.
    ///
    /// Returns `None` when access is permitted (for a block rule: when the
    /// exclusion condition is *not* met), or the denial reason otherwise.
    pub fn check(&self, user_permission: &str, block: bool) -> Option<DenialReason> {
        if let PermissionExpr::Wildcard = self {
            return Some(DenialReason::PermissionDenied);
        }

        let user_tokens = Delimiter::Term.split(user_permission);
        if user_tokens.is_empty() {
            return Some(DenialReason::Unauthenticated);
        }

        let terms = match self {
            PermissionExpr::Terms(terms) => terms,
            PermissionExpr::Malformed(raw) => {
                return Some(DenialReason::MalformedPermission(raw.clone()));
            }
            // Handled above; repeated here so the match stays exhaustive.
            PermissionExpr::Wildcard => return Some(DenialReason::PermissionDenied),
        };

        let matches = terms
            .iter()
            .any(|term| term.is_match_all() || user_tokens.iter().any(|token| term.matches(token)));

        if matches == block {
            Some(DenialReason::PermissionDenied)
        } else {
            None
        }
    }
}

/// Test whether a caller's permission set satisfies a required permission.
///
/// This is the standalone form of the matcher used by
/// [`RuleStore::is_blocked`](crate::RuleStore::is_blocked); `route_permission`
/// is parsed as a [`PermissionExpr`] on every call. `block` inverts the
/// outcome: a block rule denies exactly when the permission *does* match.
///
/// # Example
/// ```
/// use rest_access::{has_permission, DenialReason};
///
/// assert_eq!(has_permission("tool-hero-admin", "tool-hero-*", false), None);
/// assert_eq!(
///     has_permission("tool", "tool-hero-*", false),
///     Some(DenialReason::PermissionDenied)
/// );
/// assert_eq!(has_permission("", "manage", false), Some(DenialReason::Unauthenticated));
/// ```
pub fn has_permission(
    user_permission: &str,
    route_permission: &str,
    block: bool,
) -> Option<DenialReason> {
    PermissionExpr::parse(route_permission).check(user_permission, block)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_scope() {
        assert_eq!(has_permission("manage", "manage", false), None);
        assert_eq!(
            has_permission("eatingMango", "manage", false),
            Some(DenialReason::PermissionDenied)
        );
    }

    #[test]
    fn test_hierarchical_wildcard() {
        assert_eq!(has_permission("tool", "tool-*", false), None);
        assert_eq!(has_permission("tool-admin", "tool-*", false), None);
        assert_eq!(has_permission("tool-hero", "tool-hero-*", false), None);
        assert_eq!(has_permission("tool-hero-superadmin", "tool-hero-*", false), None);
        assert_eq!(
            has_permission("tool", "tool-hero-*", false),
            Some(DenialReason::PermissionDenied)
        );
    }

    #[test]
    fn test_exact_scope_does_not_match_children() {
        assert_eq!(has_permission("tool-hero", "tool-hero", false), None);
        assert_eq!(
            has_permission("tool-hero-admin", "tool-hero", false),
            Some(DenialReason::PermissionDenied)
        );
    }

    #[test]
    fn test_glued_wildcard_matches_nothing() {
        for held in ["tool", "tooladmin", "tool-superadmin"] {
            assert_eq!(
                has_permission(held, "tool*", false),
                Some(DenialReason::PermissionDenied),
                "tool* must not match {held}"
            );
        }
    }

    #[test]
    fn test_literal_wildcard_always_denies() {
        assert_eq!(
            has_permission("manage", "*", false),
            Some(DenialReason::PermissionDenied)
        );
        // Even before the unauthenticated check.
        assert_eq!(
            has_permission("", "*", false),
            Some(DenialReason::PermissionDenied)
        );
        // And under a block rule it matches everything, so it still denies.
        assert_eq!(
            has_permission("manage", "*", true),
            Some(DenialReason::PermissionDenied)
        );
    }

    #[test]
    fn test_wildcard_term_in_list_auto_matches() {
        assert_eq!(has_permission("anything", "edit,*", false), None);
        assert_eq!(
            PermissionExpr::from_terms(["*"]).check("anything", false),
            None
        );
    }

    #[test]
    fn test_multi_term_expression() {
        assert_eq!(has_permission("delete", "edit,insert,delete", false), None);
        assert_eq!(has_permission("insert,edit", "edit,manage", false), None);
        assert_eq!(
            has_permission("audit", "edit,insert,delete", false),
            Some(DenialReason::PermissionDenied)
        );
    }

    #[test]
    fn test_unauthenticated() {
        assert_eq!(has_permission("", "manage", false), Some(DenialReason::Unauthenticated));
        assert_eq!(has_permission(" ,; ", "manage", false), Some(DenialReason::Unauthenticated));
        // Block rules see the same reason; the evaluator treats any denial
        // from a block rule as decisive.
        assert_eq!(has_permission("", "manage", true), Some(DenialReason::Unauthenticated));
    }

    #[test]
    fn test_block_inversion() {
        assert_eq!(
            has_permission("audit", "audit", true),
            Some(DenialReason::PermissionDenied)
        );
        assert_eq!(has_permission("manage", "audit", true), None);
    }

    #[test]
    fn test_malformed_expression() {
        assert_eq!(
            has_permission("manage", "", false),
            Some(DenialReason::MalformedPermission(String::new()))
        );
        // The unauthenticated check comes first.
        assert_eq!(
            has_permission("", "", false),
            Some(DenialReason::Unauthenticated)
        );
    }
}
