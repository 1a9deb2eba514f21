//! Access-control middleware for axum.
//!
//! [`AccessLayer`] guards a whole router against the rule store;
//! [`RestrictLayer`] guards a single route against one required permission.
//! Both are plain tower layers, so they compose with any tower-compatible
//! stack.

use crate::error::{AccessDenied, DefaultDeniedHandler, DeniedHandler};
use crate::extractor::{HeaderPermissionExtractor, PermissionExtractor};
use crate::permission::has_permission;
use crate::store::RuleStore;

use axum::response::Response as AxumResponse;
use futures_util::future::BoxFuture;
use http::{HeaderValue, Request, Response};
use http_body::Body;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Configuration shared by the access middleware instances.
pub struct AccessConfig<E> {
    /// The rule store consulted on every request.
    pub store: Arc<RuleStore>,
    /// The permission extractor.
    pub extractor: Arc<E>,
    /// The handler that renders denied responses.
    pub denied_handler: Arc<dyn DeniedHandler>,
}

// Manual Clone impl to avoid requiring E: Clone (it is behind an Arc).
impl<E> Clone for AccessConfig<E> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            extractor: self.extractor.clone(),
            denied_handler: self.denied_handler.clone(),
        }
    }
}

/// Per-request permission query, inserted as a request extension by
/// [`AccessMiddleware`] before the rules are evaluated.
///
/// Handlers and templates can ask whether the current caller would satisfy a
/// given permission expression, without going through the rule list:
///
/// ```
/// use axum::Extension;
/// use rest_access::UserCan;
///
/// async fn profile(Extension(user): Extension<UserCan>) -> String {
///     if user.can("manage") {
///         "full profile".to_owned()
///     } else {
///         "public profile".to_owned()
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct UserCan {
    permission: String,
}

impl UserCan {
    /// Create a query for the given caller permission set.
    pub fn new(permission: impl Into<String>) -> Self {
        Self {
            permission: permission.into(),
        }
    }

    /// Whether the caller's permission set satisfies `required`.
    pub fn can(&self, required: &str) -> bool {
        has_permission(&self.permission, required, false).is_none()
    }

    /// The caller's permission set as extracted. Empty for anonymous callers.
    pub fn permission(&self) -> &str {
        &self.permission
    }
}

/// A tower layer that evaluates every request against a [`RuleStore`].
///
/// # Example
/// ```no_run
/// use axum::{routing::get, Router};
/// use rest_access::{AccessLayer, RuleDecl, RuleStore};
///
/// async fn handler() -> &'static str {
///     "hello"
/// }
///
/// #[tokio::main]
/// async fn main() {
///     let store = RuleStore::with_rules([
///         RuleDecl::block("*", "/*", "audit"),
///         RuleDecl::new("GET,POST", "/api/*", "api-*"),
///     ]);
///
///     let app = Router::new()
///         .route("/api/hello", get(handler))
///         .layer(AccessLayer::new(store));
///
///     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
///     axum::serve(listener, app).await.unwrap();
/// }
/// ```
#[derive(Clone)]
pub struct AccessLayer<E = HeaderPermissionExtractor> {
    config: AccessConfig<E>,
}

impl AccessLayer<HeaderPermissionExtractor> {
    /// Create a layer over the given store, extracting the permission from
    /// the `X-Permission` header and answering denials in plain text.
    pub fn new(store: impl Into<Arc<RuleStore>>) -> Self {
        Self {
            config: AccessConfig {
                store: store.into(),
                extractor: Arc::new(HeaderPermissionExtractor::default()),
                denied_handler: Arc::new(DefaultDeniedHandler),
            },
        }
    }
}

impl<E> AccessLayer<E> {
    /// Swap in a custom permission extractor.
    ///
    /// # Example
    /// ```
    /// use rest_access::{AccessLayer, HeaderPermissionExtractor, RuleStore};
    ///
    /// let layer = AccessLayer::new(RuleStore::new())
    ///     .with_extractor(HeaderPermissionExtractor::new("X-Scopes"));
    /// ```
    pub fn with_extractor<E2>(self, extractor: E2) -> AccessLayer<E2> {
        AccessLayer {
            config: AccessConfig {
                store: self.config.store,
                extractor: Arc::new(extractor),
                denied_handler: self.config.denied_handler,
            },
        }
    }

    /// Swap in a custom denied-response handler.
    pub fn with_denied_handler(mut self, handler: impl DeniedHandler + 'static) -> Self {
        self.config.denied_handler = Arc::new(handler);
        self
    }

    /// The rule store this layer evaluates against.
    pub fn store(&self) -> &Arc<RuleStore> {
        &self.config.store
    }
}

impl<S, E: Clone> Layer<S> for AccessLayer<E> {
    type Service = AccessMiddleware<S, E>;

    fn layer(&self, inner: S) -> Self::Service {
        AccessMiddleware {
            inner,
            config: self.config.clone(),
        }
    }
}

/// The access-control middleware service produced by [`AccessLayer`].
#[derive(Clone)]
pub struct AccessMiddleware<S, E> {
    inner: S,
    config: AccessConfig<E>,
}

impl<S, E, ReqBody, ResBody> Service<Request<ReqBody>> for AccessMiddleware<S, E>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    E: PermissionExtractor<ReqBody> + 'static,
    ReqBody: Body + Send + 'static,
    ResBody: Body + Default + Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<ReqBody>) -> Self::Future {
        let config = self.config.clone();
        let mut inner = self.inner.clone();

        // Evaluation is synchronous; only forwarding needs the future.
        let permission = config
            .extractor
            .extract_permission(&request)
            .permission_or_empty();
        let method = request.method().as_str().to_owned();
        let path = request.uri().path().to_owned();

        request
            .extensions_mut()
            .insert(UserCan::new(permission.clone()));

        let outcome = config.store.is_blocked(&method, &path, &permission);

        Box::pin(async move {
            match outcome {
                None => {
                    tracing::trace!(method = %method, path = %path, permission = %permission, "access allowed");
                    inner.call(request).await
                }
                Some(reason) => {
                    if reason.is_config_error() {
                        tracing::error!(
                            method = %method,
                            path = %path,
                            reason = %reason,
                            "access denied by defective rule configuration"
                        );
                    } else {
                        tracing::info!(
                            method = %method,
                            path = %path,
                            permission = %permission,
                            reason = %reason,
                            "access denied"
                        );
                    }

                    let denied = AccessDenied::new(method, path, permission, reason);
                    let response = config.denied_handler.handle(&denied);
                    Ok(convert_denied_response(response, &denied))
                }
            }
        })
    }
}

/// A tower layer guarding a single route with one required permission.
///
/// The counterpart of mounting the full rule evaluator: no rule list is
/// consulted, only [`has_permission`] against the extracted permission set.
///
/// # Example
/// ```no_run
/// use axum::{routing::get, Router};
/// use rest_access::RestrictLayer;
///
/// async fn dashboard() -> &'static str {
///     "admin dashboard"
/// }
///
/// let app: Router = Router::new()
///     .route("/admin", get(dashboard).layer(RestrictLayer::new("manage")));
/// ```
#[derive(Clone)]
pub struct RestrictLayer<E = HeaderPermissionExtractor> {
    permission: String,
    extractor: Arc<E>,
    denied_handler: Arc<dyn DeniedHandler>,
}

impl RestrictLayer<HeaderPermissionExtractor> {
    /// Guard a route with the given required permission expression.
    pub fn new(permission: impl Into<String>) -> Self {
        Self {
            permission: permission.into(),
            extractor: Arc::new(HeaderPermissionExtractor::default()),
            denied_handler: Arc::new(DefaultDeniedHandler),
        }
    }
}

impl<E> RestrictLayer<E> {
    /// Swap in a custom permission extractor.
    pub fn with_extractor<E2>(self, extractor: E2) -> RestrictLayer<E2> {
        RestrictLayer {
            permission: self.permission,
            extractor: Arc::new(extractor),
            denied_handler: self.denied_handler,
        }
    }

    /// Swap in a custom denied-response handler.
    pub fn with_denied_handler(mut self, handler: impl DeniedHandler + 'static) -> Self {
        self.denied_handler = Arc::new(handler);
        self
    }
}

impl<S, E> Layer<S> for RestrictLayer<E> {
    type Service = RestrictMiddleware<S, E>;

    fn layer(&self, inner: S) -> Self::Service {
        RestrictMiddleware {
            inner,
            permission: self.permission.clone(),
            extractor: self.extractor.clone(),
            denied_handler: self.denied_handler.clone(),
        }
    }
}

/// The single-route guard service produced by [`RestrictLayer`].
#[derive(Clone)]
pub struct RestrictMiddleware<S, E> {
    inner: S,
    permission: String,
    extractor: Arc<E>,
    denied_handler: Arc<dyn DeniedHandler>,
}

impl<S, E, ReqBody, ResBody> Service<Request<ReqBody>> for RestrictMiddleware<S, E>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    E: PermissionExtractor<ReqBody> + 'static,
    ReqBody: Body + Send + 'static,
    ResBody: Body + Default + Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        let mut inner = self.inner.clone();
        let required = self.permission.clone();
        let denied_handler = self.denied_handler.clone();

        let permission = self
            .extractor
            .extract_permission(&request)
            .permission_or_empty();
        let method = request.method().as_str().to_owned();
        let path = request.uri().path().to_owned();

        let outcome = has_permission(&permission, &required, false);

        Box::pin(async move {
            match outcome {
                None => inner.call(request).await,
                Some(reason) => {
                    tracing::info!(
                        method = %method,
                        path = %path,
                        permission = %permission,
                        required = %required,
                        reason = %reason,
                        "route restriction denied access"
                    );
                    let denied = AccessDenied::new(method, path, permission, reason);
                    let response = denied_handler.handle(&denied);
                    Ok(convert_denied_response(response, &denied))
                }
            }
        })
    }
}

/// Rebuild a denied response with the middleware's generic body type.
///
/// The handler's body cannot cross the generic boundary, so the status and
/// headers carry the outcome; the `x-denial-code` header is guaranteed even
/// when a custom handler forgets it.
fn convert_denied_response<ResBody: Default>(
    response: AxumResponse,
    denied: &AccessDenied,
) -> Response<ResBody> {
    let (mut parts, _body) = response.into_parts();
    if !parts.headers.contains_key("x-denial-code") {
        if let Ok(code) = HeaderValue::from_str(&denied.reason.code()) {
            parts.headers.insert("x-denial-code", code);
        }
    }
    Response::from_parts(parts, ResBody::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_can() {
        let user = UserCan::new("tool-hero-admin,edit");
        assert!(user.can("tool-hero-*"));
        assert!(user.can("edit"));
        assert!(!user.can("manage"));
        // The literal wildcard expression never grants.
        assert!(!user.can("*"));
    }

    #[test]
    fn test_anonymous_user_can_nothing() {
        let user = UserCan::new("");
        assert!(!user.can("manage"));
        assert_eq!(user.permission(), "");
    }

    // Full request flow is covered by the integration tests in tests/.
}
