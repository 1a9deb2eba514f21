//! Rule declarations and their compiled form.
//!
//! A rule is declared positionally, the way it is written in configuration:
//!
//! ```text
//! [methods, path_pattern, permission_expression]            # allow rule
//! [methods, path_pattern, permission_expression, block]     # block rule
//! ```
//!
//! `methods` and `permission_expression` may each be a single delimited
//! string (`"POST,DELETE,PUT"`, `"edit,insert,delete"`) or a list of tokens.
//! Declarations are deliberately loose: a wrong number of fields is
//! representable and is only reported when the evaluator reaches the rule,
//! so a broken configuration surfaces as a loud, categorized denial instead
//! of being silently dropped at registration.

use crate::error::DenialReason;
use crate::pattern::{Delimiter, SegmentPattern, WILDCARD};
use crate::permission::PermissionExpr;
use serde::{Deserialize, Serialize};

/// One positional field of a rule declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleField {
    /// A boolean, valid only as the fourth (block) field.
    Flag(bool),
    /// A single string: a delimited method list, a path pattern, or a
    /// delimited permission expression.
    One(String),
    /// A list of tokens: methods or permission terms.
    Many(Vec<String>),
}

impl From<&str> for RuleField {
    fn from(value: &str) -> Self {
        RuleField::One(value.to_owned())
    }
}

impl From<String> for RuleField {
    fn from(value: String) -> Self {
        RuleField::One(value)
    }
}

impl From<bool> for RuleField {
    fn from(value: bool) -> Self {
        RuleField::Flag(value)
    }
}

impl From<Vec<String>> for RuleField {
    fn from(value: Vec<String>) -> Self {
        RuleField::Many(value)
    }
}

impl From<Vec<&str>> for RuleField {
    fn from(value: Vec<&str>) -> Self {
        RuleField::Many(value.into_iter().map(str::to_owned).collect())
    }
}

impl<const N: usize> From<[&str; N]> for RuleField {
    fn from(value: [&str; N]) -> Self {
        RuleField::Many(value.iter().map(|s| (*s).to_owned()).collect())
    }
}

/// A declared access rule: an ordered tuple of positional fields.
///
/// Well-formed rules have 3 fields (methods, path, permission) or 4
/// (+ block flag). [`RuleDecl::new`] and [`RuleDecl::block`] always build
/// well-formed rules; [`RuleDecl::from_fields`] admits any arity so that
/// defective declarations are caught by the evaluator, not hidden.
///
/// # Example
/// ```
/// use rest_access::RuleDecl;
///
/// let allow = RuleDecl::new("GET,POST", "/signup/*", "tool-*");
/// let multi = RuleDecl::new(["POST", "PUT", "DELETE"], "/filemanager/*", "edit,manage");
/// let block = RuleDecl::block("*", "/*", "audit");
/// assert_eq!(allow.len(), 3);
/// assert_eq!(block.len(), 4);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleDecl {
    fields: Vec<RuleField>,
}

impl RuleDecl {
    /// Declare an allow rule.
    pub fn new(
        methods: impl Into<RuleField>,
        path: impl Into<RuleField>,
        permission: impl Into<RuleField>,
    ) -> Self {
        Self {
            fields: vec![methods.into(), path.into(), permission.into()],
        }
    }

    /// Declare a block rule: it denies when the permission *does* match and
    /// defers to later rules when it does not.
    pub fn block(
        methods: impl Into<RuleField>,
        path: impl Into<RuleField>,
        permission: impl Into<RuleField>,
    ) -> Self {
        Self {
            fields: vec![methods.into(), path.into(), permission.into(), RuleField::Flag(true)],
        }
    }

    /// Build a declaration from raw fields, without arity checking.
    pub fn from_fields(fields: Vec<RuleField>) -> Self {
        Self { fields }
    }

    /// The declaration's fields in order.
    pub fn fields(&self) -> &[RuleField] {
        &self.fields
    }

    /// Number of declared fields.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.fields.len()
    }
}

/// One or many rule declarations, as accepted by
/// [`RuleStore::add_rules`](crate::RuleStore::add_rules).
///
/// Mirrors the declaration grammar: a list whose every element is itself a
/// rule is a full rule set (and replaces the stored rules); a flat list of
/// fields is a single rule (and appends). The untagged deserialization tries
/// the rule-set shape first, which reproduces exactly that detection order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RulesDecl {
    /// A complete ordered rule list; replaces existing rules.
    Many(Vec<RuleDecl>),
    /// A single rule; appended to existing rules.
    One(RuleDecl),
}

impl From<RuleDecl> for RulesDecl {
    fn from(value: RuleDecl) -> Self {
        RulesDecl::One(value)
    }
}

impl From<Vec<RuleDecl>> for RulesDecl {
    fn from(value: Vec<RuleDecl>) -> Self {
        RulesDecl::Many(value)
    }
}

impl<const N: usize> From<[RuleDecl; N]> for RulesDecl {
    fn from(value: [RuleDecl; N]) -> Self {
        RulesDecl::Many(value.into_iter().collect())
    }
}

/// A compiled rule: tokenized once at registration.
#[derive(Debug, Clone)]
pub(crate) struct Rule {
    methods: Vec<String>,
    path: SegmentPattern,
    permission: PermissionExpr,
    block: bool,
}

impl Rule {
    /// Compile a declaration. Arity violations and non-string method or path
    /// fields are configuration defects and come back as
    /// [`DenialReason::MalformedRule`]; a malformed *permission* field
    /// compiles into [`PermissionExpr::Malformed`] so it is reported by the
    /// permission matcher, after the unauthenticated check.
    pub(crate) fn compile(decl: &RuleDecl) -> Result<Rule, DenialReason> {
        let fields = decl.fields();
        if fields.len() < 3 || fields.len() > 4 {
            return Err(DenialReason::MalformedRule);
        }

        let methods = match &fields[0] {
            RuleField::One(s) => Delimiter::Term.split(s).into_iter().map(str::to_owned).collect(),
            RuleField::Many(list) => list.clone(),
            RuleField::Flag(_) => return Err(DenialReason::MalformedRule),
        };

        let path = match &fields[1] {
            RuleField::One(s) => SegmentPattern::new(s.clone(), Delimiter::Path),
            _ => return Err(DenialReason::MalformedRule),
        };

        let permission = match &fields[2] {
            RuleField::One(s) => PermissionExpr::parse(s),
            RuleField::Many(list) => PermissionExpr::from_terms(list.iter().cloned()),
            RuleField::Flag(flag) => PermissionExpr::Malformed(flag.to_string()),
        };

        let block = match fields.get(3) {
            None => false,
            Some(RuleField::Flag(flag)) => *flag,
            Some(_) => return Err(DenialReason::MalformedRule),
        };

        Ok(Rule { methods, path, permission, block })
    }

    /// Whether the rule covers the given request method.
    pub(crate) fn matches_method(&self, method: &str) -> bool {
        self.methods.iter().any(|m| m == method || m == WILDCARD)
    }

    pub(crate) fn path(&self) -> &SegmentPattern {
        &self.path
    }

    pub(crate) fn permission(&self) -> &PermissionExpr {
        &self.permission
    }

    pub(crate) fn is_block(&self) -> bool {
        self.block
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_string_fields() {
        let rule = Rule::compile(&RuleDecl::new("POST,DELETE,PUT", "/ajax/*", "edit,insert,delete"))
            .expect("well-formed rule");
        assert!(rule.matches_method("DELETE"));
        assert!(!rule.matches_method("GET"));
        assert!(rule.path().matches("/ajax/a/b"));
        assert!(!rule.is_block());
    }

    #[test]
    fn test_compile_list_fields() {
        let rule = Rule::compile(&RuleDecl::new(["POST", "PUT"], "/upload/*", ["edit"]))
            .expect("well-formed rule");
        assert!(rule.matches_method("PUT"));
        assert!(!rule.matches_method("DELETE"));
    }

    #[test]
    fn test_any_method_sentinel() {
        let rule = Rule::compile(&RuleDecl::block("*", "/*", "audit")).expect("well-formed rule");
        assert!(rule.matches_method("GET"));
        assert!(rule.matches_method("PATCH"));
        assert!(rule.is_block());
    }

    #[test]
    fn test_bad_arity() {
        let short = RuleDecl::from_fields(vec!["GET".into(), "/a".into()]);
        assert!(matches!(Rule::compile(&short), Err(DenialReason::MalformedRule)));

        let long = RuleDecl::from_fields(vec![
            "GET".into(),
            "/a".into(),
            "manage".into(),
            true.into(),
            "extra".into(),
        ]);
        assert!(matches!(Rule::compile(&long), Err(DenialReason::MalformedRule)));

        let empty = RuleDecl::from_fields(Vec::new());
        assert!(matches!(Rule::compile(&empty), Err(DenialReason::MalformedRule)));
    }

    #[test]
    fn test_bad_field_types() {
        let bool_path = RuleDecl::from_fields(vec!["GET".into(), true.into(), "manage".into()]);
        assert!(matches!(Rule::compile(&bool_path), Err(DenialReason::MalformedRule)));

        let bool_permission = RuleDecl::from_fields(vec!["GET".into(), "/a".into(), true.into()]);
        let rule = Rule::compile(&bool_permission).expect("valid arity");
        assert_eq!(rule.permission(), &PermissionExpr::Malformed("true".to_owned()));
    }

    #[test]
    fn test_rules_decl_detection() {
        // A list of lists deserializes as a full rule set.
        let json = r#"[["GET", "/signup/*", "tool-*"], ["*", "/*", "audit", true]]"#;
        let decl: RulesDecl = serde_json::from_str(json).expect("valid json");
        match decl {
            RulesDecl::Many(rules) => assert_eq!(rules.len(), 2),
            RulesDecl::One(_) => panic!("expected a rule set"),
        }

        // A flat list of fields deserializes as a single rule.
        let json = r#"["GET", "/signup/*", "tool-*"]"#;
        let decl: RulesDecl = serde_json::from_str(json).expect("valid json");
        match decl {
            RulesDecl::One(rule) => assert_eq!(rule.len(), 3),
            RulesDecl::Many(_) => panic!("expected a single rule"),
        }
    }
}
