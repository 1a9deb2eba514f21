//! Denial reasons and denied-response handling.

use axum::response::{IntoResponse, Response};
use http::StatusCode;
use std::fmt;

/// Why a request was denied.
///
/// Every denial carries one of these variants; "not blocked" is modeled as
/// the absence of a reason (`Option<DenialReason>` throughout the API), so
/// allow and deny can never be confused through truthiness.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DenialReason {
    /// No permission was present when a rule required one.
    #[error("not authenticated")]
    Unauthenticated,

    /// A permission was present but does not satisfy the matched rule, or it
    /// satisfies a block rule.
    #[error("access not permitted")]
    PermissionDenied,

    /// No rule's method and path matched the request.
    #[error("no matching access rule found")]
    NoMatchingRule,

    /// A registered rule has the wrong number of fields. This is a
    /// configuration defect, not a per-request outcome; the middleware logs
    /// it at error level.
    #[error("wrong access rule definition. must have 3 or 4 arguments")]
    MalformedRule,

    /// A rule's permission field could not be normalized into a token
    /// sequence.
    #[error("wrong permission format: {0}")]
    MalformedPermission(String),
}

impl DenialReason {
    /// The HTTP status this reason maps to: 401 for [`Unauthenticated`],
    /// 403 for everything else.
    ///
    /// [`Unauthenticated`]: DenialReason::Unauthenticated
    pub fn status(&self) -> StatusCode {
        match self {
            DenialReason::Unauthenticated => StatusCode::UNAUTHORIZED,
            _ => StatusCode::FORBIDDEN,
        }
    }

    /// Machine-readable code: the message lowercased with every non-word
    /// character replaced by `_`.
    ///
    /// ```
    /// use rest_access::DenialReason;
    ///
    /// assert_eq!(DenialReason::PermissionDenied.code(), "access_not_permitted");
    /// assert_eq!(DenialReason::Unauthenticated.code(), "not_authenticated");
    /// ```
    pub fn code(&self) -> String {
        self.to_string()
            .to_lowercase()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
            .collect()
    }

    /// Whether this reason indicates a defective rule configuration rather
    /// than an ordinary per-request denial.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            DenialReason::MalformedRule | DenialReason::MalformedPermission(_)
        )
    }
}

/// A denied request: the inputs that were evaluated plus the reason.
#[derive(Debug, Clone)]
pub struct AccessDenied {
    /// The request method.
    pub method: String,
    /// The request path (query and fragment stripped).
    pub path: String,
    /// The permission set the caller presented. Empty if anonymous.
    pub permission: String,
    /// Why the request was denied.
    pub reason: DenialReason,
}

impl AccessDenied {
    /// Create a new denial record.
    pub fn new(
        method: impl Into<String>,
        path: impl Into<String>,
        permission: impl Into<String>,
        reason: DenialReason,
    ) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            permission: permission.into(),
            reason,
        }
    }
}

impl fmt::Display for AccessDenied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rest-access: {} {} with permission: {}, reason {}",
            self.method, self.path, self.permission, self.reason
        )
    }
}

impl std::error::Error for AccessDenied {}

impl IntoResponse for AccessDenied {
    fn into_response(self) -> Response {
        let status = self.reason.status();
        let mut response = (status, self.to_string()).into_response();
        if let Ok(code) = self.reason.code().parse() {
            response.headers_mut().insert("x-denial-code", code);
        }
        response
    }
}

/// Custom response handler for denied requests.
///
/// Implement this trait to customize the response the middleware produces
/// when access is denied.
///
/// # Example
/// ```
/// use rest_access::{AccessDenied, DeniedHandler};
/// use axum::response::{IntoResponse, Response};
///
/// struct TerseHandler;
///
/// impl DeniedHandler for TerseHandler {
///     fn handle(&self, denied: &AccessDenied) -> Response {
///         (denied.reason.status(), "no").into_response()
///     }
/// }
/// ```
pub trait DeniedHandler: Send + Sync {
    /// Build a response for a denied request.
    fn handle(&self, denied: &AccessDenied) -> Response;
}

/// Default handler: plain text body with the full denial message.
#[derive(Debug, Clone, Default)]
pub struct DefaultDeniedHandler;

impl DeniedHandler for DefaultDeniedHandler {
    fn handle(&self, denied: &AccessDenied) -> Response {
        denied.clone().into_response()
    }
}

/// Handler that returns a JSON error body.
#[derive(Debug, Clone, Default)]
pub struct JsonDeniedHandler {
    include_details: bool,
}

impl JsonDeniedHandler {
    /// Create a new JSON denied handler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Include the method, path, and presented permission in the body.
    ///
    /// Echoing the caller's permission set back may be a security risk in
    /// production.
    pub fn with_details(mut self) -> Self {
        self.include_details = true;
        self
    }
}

impl DeniedHandler for JsonDeniedHandler {
    fn handle(&self, denied: &AccessDenied) -> Response {
        use axum::Json;

        let body = if self.include_details {
            serde_json::json!({
                "error": denied.reason.code(),
                "message": denied.reason.to_string(),
                "method": denied.method,
                "path": denied.path,
                "permission": denied.permission,
            })
        } else {
            serde_json::json!({
                "error": denied.reason.code(),
                "message": denied.reason.to_string(),
            })
        };

        let mut response = (denied.reason.status(), Json(body)).into_response();
        if let Ok(code) = denied.reason.code().parse() {
            response.headers_mut().insert("x-denial-code", code);
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(DenialReason::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(DenialReason::PermissionDenied.status(), StatusCode::FORBIDDEN);
        assert_eq!(DenialReason::NoMatchingRule.status(), StatusCode::FORBIDDEN);
        assert_eq!(DenialReason::MalformedRule.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_code_derivation() {
        assert_eq!(
            DenialReason::NoMatchingRule.code(),
            "no_matching_access_rule_found"
        );
        assert_eq!(
            DenialReason::MalformedRule.code(),
            "wrong_access_rule_definition__must_have_3_or_4_arguments"
        );
    }

    #[test]
    fn test_denied_message() {
        let denied = AccessDenied::new("GET", "/signin", "audit", DenialReason::PermissionDenied);
        assert_eq!(
            denied.to_string(),
            "rest-access: GET /signin with permission: audit, reason access not permitted"
        );
    }
}
