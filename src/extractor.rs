//! Permission extraction from HTTP requests.
//!
//! The evaluator core never looks at a request object; it receives the
//! caller's permission set as a plain delimited string. The
//! [`PermissionExtractor`] trait is the seam to whatever authentication
//! layer runs before this middleware: a header set by a gateway, a request
//! extension populated by a JWT verifier, or a fixed value in tests.
//!
//! Extraction is synchronous: it reads headers or extensions, nothing that
//! needs to suspend.

use http::Request;
use std::sync::Arc;

/// Result of permission extraction.
#[derive(Debug, Clone)]
pub enum PermissionExtraction {
    /// A permission set was found (a term-delimited string such as
    /// `"edit,manage"` or a single scope like `"tool-hero-admin"`).
    Permission(String),
    /// No permission could be extracted (anonymous caller).
    Anonymous,
    /// An error occurred during extraction.
    Error(String),
}

impl PermissionExtraction {
    /// The permission string, or `""` for anonymous and failed extractions.
    ///
    /// An empty permission set is what the evaluator treats as
    /// unauthenticated, so anonymous callers flow through naturally.
    pub fn permission_or_empty(self) -> String {
        match self {
            Self::Permission(permission) => permission,
            Self::Anonymous | Self::Error(_) => String::new(),
        }
    }
}

/// Trait for extracting the caller's permission set from a request.
///
/// # Example
/// ```
/// use rest_access::{PermissionExtraction, PermissionExtractor};
/// use http::Request;
///
/// /// Read the scope claim a JWT middleware stashed in an extension.
/// #[derive(Clone)]
/// struct Scope(String);
///
/// struct ScopeExtractor;
///
/// impl<B> PermissionExtractor<B> for ScopeExtractor {
///     fn extract_permission(&self, request: &Request<B>) -> PermissionExtraction {
///         match request.extensions().get::<Scope>() {
///             Some(scope) => PermissionExtraction::Permission(scope.0.clone()),
///             None => PermissionExtraction::Anonymous,
///         }
///     }
/// }
/// ```
pub trait PermissionExtractor<B>: Send + Sync {
    /// Extract the permission set from an HTTP request.
    fn extract_permission(&self, request: &Request<B>) -> PermissionExtraction;
}

impl<B, T: PermissionExtractor<B>> PermissionExtractor<B> for Arc<T> {
    fn extract_permission(&self, request: &Request<B>) -> PermissionExtraction {
        (**self).extract_permission(request)
    }
}

impl<B, T: PermissionExtractor<B> + ?Sized> PermissionExtractor<B> for Box<T> {
    fn extract_permission(&self, request: &Request<B>) -> PermissionExtraction {
        (**self).extract_permission(request)
    }
}

/// Extract the permission set from an HTTP header.
///
/// The default middleware configuration reads `X-Permission`. The header
/// value is used verbatim; delimiters inside it are handled by the matcher.
///
/// # Example
/// ```
/// use rest_access::HeaderPermissionExtractor;
///
/// let extractor = HeaderPermissionExtractor::new("X-Scopes")
///     .with_default_permission("guest");
/// ```
#[derive(Debug, Clone)]
pub struct HeaderPermissionExtractor {
    header_name: String,
    default_permission: Option<String>,
}

impl HeaderPermissionExtractor {
    /// Create a new header permission extractor.
    pub fn new(header_name: impl Into<String>) -> Self {
        Self {
            header_name: header_name.into(),
            default_permission: None,
        }
    }

    /// Permission set to assume when the header is missing or empty.
    pub fn with_default_permission(mut self, permission: impl Into<String>) -> Self {
        self.default_permission = Some(permission.into());
        self
    }

    fn fallback(&self) -> PermissionExtraction {
        match &self.default_permission {
            Some(permission) => PermissionExtraction::Permission(permission.clone()),
            None => PermissionExtraction::Anonymous,
        }
    }
}

impl Default for HeaderPermissionExtractor {
    fn default() -> Self {
        Self::new("X-Permission")
    }
}

impl<B> PermissionExtractor<B> for HeaderPermissionExtractor {
    fn extract_permission(&self, request: &Request<B>) -> PermissionExtraction {
        match request.headers().get(&self.header_name) {
            Some(value) => match value.to_str() {
                Ok(s) if !s.trim().is_empty() => {
                    PermissionExtraction::Permission(s.trim().to_owned())
                }
                Ok(_) => self.fallback(),
                Err(_) => PermissionExtraction::Error(format!(
                    "header {} is not valid UTF-8",
                    self.header_name
                )),
            },
            None => self.fallback(),
        }
    }
}

/// Extract the permission set from a request extension.
///
/// Use this when an authentication middleware ahead of the access layer has
/// already decoded the caller's identity into an extension value.
///
/// # Example
/// ```
/// use rest_access::ExtensionPermissionExtractor;
///
/// #[derive(Clone)]
/// struct AuthenticatedUser {
///     scope: String,
/// }
///
/// let extractor = ExtensionPermissionExtractor::<AuthenticatedUser>::new(|user| user.scope.clone());
/// ```
pub struct ExtensionPermissionExtractor<T> {
    extract_fn: Box<dyn Fn(&T) -> String + Send + Sync>,
}

impl<T> ExtensionPermissionExtractor<T> {
    /// Create a new extension permission extractor.
    ///
    /// `extract_fn` converts the extension value to a permission string.
    pub fn new<F>(extract_fn: F) -> Self
    where
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        Self {
            extract_fn: Box::new(extract_fn),
        }
    }
}

impl<T> std::fmt::Debug for ExtensionPermissionExtractor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionPermissionExtractor")
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

impl<B, T: Clone + Send + Sync + 'static> PermissionExtractor<B> for ExtensionPermissionExtractor<T> {
    fn extract_permission(&self, request: &Request<B>) -> PermissionExtraction {
        match request.extensions().get::<T>() {
            Some(ext) => PermissionExtraction::Permission((self.extract_fn)(ext)),
            None => PermissionExtraction::Anonymous,
        }
    }
}

/// An extractor that always returns a fixed permission set. Useful in tests.
#[derive(Debug, Clone)]
pub struct FixedPermissionExtractor {
    permission: String,
}

impl FixedPermissionExtractor {
    /// Create a new fixed permission extractor.
    pub fn new(permission: impl Into<String>) -> Self {
        Self {
            permission: permission.into(),
        }
    }
}

impl<B> PermissionExtractor<B> for FixedPermissionExtractor {
    fn extract_permission(&self, _request: &Request<B>) -> PermissionExtraction {
        PermissionExtraction::Permission(self.permission.clone())
    }
}

/// An extractor that always reports an anonymous caller.
#[derive(Debug, Clone, Default)]
pub struct AnonymousPermissionExtractor;

impl AnonymousPermissionExtractor {
    /// Create a new anonymous permission extractor.
    pub fn new() -> Self {
        Self
    }
}

impl<B> PermissionExtractor<B> for AnonymousPermissionExtractor {
    fn extract_permission(&self, _request: &Request<B>) -> PermissionExtraction {
        PermissionExtraction::Anonymous
    }
}

/// A composite extractor that tries several extractors in order.
///
/// The first successful extraction wins; permission sets from different
/// extractors are not merged.
pub struct ChainedPermissionExtractor<B> {
    extractors: Vec<Box<dyn PermissionExtractor<B>>>,
}

impl<B> ChainedPermissionExtractor<B> {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self {
            extractors: Vec::new(),
        }
    }

    /// Add an extractor to the end of the chain.
    pub fn add<E: PermissionExtractor<B> + 'static>(mut self, extractor: E) -> Self {
        self.extractors.push(Box::new(extractor));
        self
    }
}

impl<B> Default for ChainedPermissionExtractor<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> std::fmt::Debug for ChainedPermissionExtractor<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainedPermissionExtractor")
            .field("extractors_count", &self.extractors.len())
            .finish()
    }
}

impl<B> PermissionExtractor<B> for ChainedPermissionExtractor<B>
where
    B: Send + Sync,
{
    fn extract_permission(&self, request: &Request<B>) -> PermissionExtraction {
        for extractor in &self.extractors {
            match extractor.extract_permission(request) {
                PermissionExtraction::Permission(permission) => {
                    return PermissionExtraction::Permission(permission)
                }
                PermissionExtraction::Error(e) => {
                    tracing::warn!(error = %e, "permission extractor failed, trying next");
                }
                PermissionExtraction::Anonymous => continue,
            }
        }
        PermissionExtraction::Anonymous
    }
}
