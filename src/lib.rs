//! # rest-access
//!
//! Rule-based access control middleware for [axum](https://docs.rs/axum) 0.8.
//!
//! Access is described by an ordered list of declarative rules, each a
//! 3- or 4-tuple:
//!
//! - **methods**: uppercase HTTP method tokens (`"GET,POST"`, a list, or
//!   `"*"` for any method)
//! - **path pattern**: `/`-separated segments, `*` as a segment wildcard
//!   (`"/signup/*"`)
//! - **permission expression**: required scopes, comma/semicolon/space
//!   separated; each scope is a `:`/`-`-delimited hierarchy with optional
//!   trailing `*` (`"tool-hero-*"`, `"api:write"`)
//! - **block flag** (optional): invert the rule, denying when the permission
//!   *does* match and deferring to later rules when it does not
//!
//! Rules are evaluated in declaration order and the first rule whose method
//! and path match is decisive, like an ordered firewall: declare narrow or
//! exception rules before broad catch-alls. An empty rule list allows
//! everything (fail-open while unconfigured); a non-empty list with no match
//! denies (fail-closed).
//!
//! ## Quick Start
//!
//! ```no_run
//! use axum::{routing::get, Router};
//! use rest_access::{AccessLayer, RuleDecl, RuleStore};
//!
//! async fn hello() -> &'static str {
//!     "hello"
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = RuleStore::with_rules([
//!         // Auditors can never change anything, anywhere.
//!         RuleDecl::block("*", "/*", "audit"),
//!         // Writers may modify the API.
//!         RuleDecl::new(["POST", "PUT", "DELETE"], "/api/*", "api:write"),
//!         // Readers may look at it.
//!         RuleDecl::new("GET", "/api/*", "api:read,api:write"),
//!     ]);
//!
//!     let app = Router::new()
//!         .route("/api/hello", get(hello))
//!         .layer(AccessLayer::new(store));
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//! ```
//!
//! The caller's permission set is read from the `X-Permission` header by
//! default; see [`PermissionExtractor`] to integrate with a JWT middleware
//! or any other authentication layer. The evaluator itself
//! ([`RuleStore::is_blocked`]) is pure and framework-agnostic: it reads
//! only its arguments and the current rule snapshot.
//!
//! ## Wildcard semantics
//!
//! Wildcards expand at delimiter boundaries only:
//!
//! | Pattern | Matches | Does not match |
//! |---|---|---|
//! | `tool-hero-*` | `tool-hero`, `tool-hero-admin` | `tool` |
//! | `tool-hero` | `tool-hero` | `tool-hero-admin` |
//! | `tool*` | (nothing but the literal `tool*`) | `tool`, `tooladmin` |
//! | `/signup/*` | `/signup`, `/signup/me`, `/signup/a/b` | `/account` |
//! | `/*/glint/role/*` | `/api/glint/role/x` | `/a/b/glint/role/x` |
//!
//! A trailing `*` matches any (possibly empty) suffix of segments; a `*`
//! anywhere else matches exactly one segment; a `*` glued to a literal
//! inside a single segment is not a wildcard.
//!
//! One quirk is deliberate and inherited from the rule language this crate
//! implements: a rule whose *whole* permission expression is the string
//! `"*"` can never be satisfied. Scopes must be granted by name; `"*"` is
//! not a blanket grant. (As one term among several, `*` does auto-match:
//! `"edit,*"` matches everyone.)
//!
//! ## Block rules
//!
//! A block rule is a pre-filter exclusion layer: when its permission
//! condition holds, the request is denied on the spot; when it does not,
//! the rule defers and later rules decide. `["*", "/*", "audit", true]`
//! denies every request from a caller holding `audit` and claims nothing
//! else.
//!
//! ## Single-route guards
//!
//! ```no_run
//! use axum::{routing::get, Router};
//! use rest_access::RestrictLayer;
//!
//! async fn dashboard() -> &'static str {
//!     "admin"
//! }
//!
//! let app: Router = Router::new()
//!     .route("/admin", get(dashboard).layer(RestrictLayer::new("manage")));
//! ```
//!
//! ## Programmatic queries
//!
//! ```
//! use rest_access::{has_permission, RuleDecl, RuleStore};
//!
//! let store = RuleStore::with_rules([RuleDecl::new("GET", "/signup/*", "tool-*")]);
//! assert!(store.is_blocked("GET", "/signup/me", "tool-admin").is_none());
//! assert!(has_permission("tool-admin", "tool-*", false).is_none());
//! ```
//!
//! ## TOML configuration
//!
//! Rules can be loaded from TOML via [`RuleStore::from_toml`] and
//! [`RuleStore::from_toml_file`]; see [`RulesConfig`] for the file format.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod extractor;
mod middleware;
mod pattern;
mod permission;
mod rule;
mod store;

// Re-export main types
pub use config::{ConfigError, RuleConfig, RulesConfig, StringOrList};
pub use error::{
    AccessDenied, DefaultDeniedHandler, DenialReason, DeniedHandler, JsonDeniedHandler,
};
pub use extractor::{
    AnonymousPermissionExtractor, ChainedPermissionExtractor, ExtensionPermissionExtractor,
    FixedPermissionExtractor, HeaderPermissionExtractor, PermissionExtraction, PermissionExtractor,
};
pub use middleware::{
    AccessConfig, AccessLayer, AccessMiddleware, RestrictLayer, RestrictMiddleware, UserCan,
};
pub use pattern::{Delimiter, SegmentPattern};
pub use permission::{has_permission, PermissionExpr, ScopePattern};
pub use rule::{RuleDecl, RuleField, RulesDecl};
pub use store::RuleStore;

/// Prelude module for convenient imports.
///
/// ```
/// use rest_access::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::ConfigError;
    pub use crate::error::{AccessDenied, DenialReason, DeniedHandler};
    pub use crate::extractor::{
        HeaderPermissionExtractor, PermissionExtraction, PermissionExtractor,
    };
    pub use crate::middleware::{AccessLayer, RestrictLayer, UserCan};
    pub use crate::permission::has_permission;
    pub use crate::rule::{RuleDecl, RulesDecl};
    pub use crate::store::RuleStore;
}
