//! End-to-end tests: rules mounted on a real axum router.

use axum::body::Body;
use axum::extract::Extension;
use axum::routing::{delete, get, post};
use axum::Router;
use http::{Request, StatusCode};
use http_body_util::BodyExt;
use rest_access::{
    AccessLayer, FixedPermissionExtractor, JsonDeniedHandler, RestrictLayer, RuleDecl, RuleStore,
    UserCan,
};
use tower::ServiceExt;

async fn ok() -> &'static str {
    "ok"
}

fn site_router() -> Router {
    let store = RuleStore::with_rules([
        RuleDecl::new("GET", "/signup/*", "manage"),
        RuleDecl::block("*", "/*", "audit"),
        RuleDecl::new("GET", "/translate/*", "edit,manage"),
        RuleDecl::new(["POST", "DELETE"], "/ajax/*", "edit,insert,delete"),
    ]);

    Router::new()
        .route("/signup/{*rest}", get(ok))
        .route("/translate/{*rest}", get(ok))
        .route("/ajax/{*rest}", post(ok).delete(ok))
        .layer(AccessLayer::new(store))
}

fn request(method: &str, path: &str, permission: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(permission) = permission {
        builder = builder.header("X-Permission", permission);
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn allowed_request_reaches_the_handler() {
    let response = site_router()
        .oneshot(request("GET", "/signup/me", Some("manage")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn denied_request_is_forbidden_with_code_header() {
    let response = site_router()
        .oneshot(request("GET", "/signup/me", Some("eatingMango")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        response.headers().get("x-denial-code").unwrap(),
        "access_not_permitted"
    );
}

#[tokio::test]
async fn anonymous_request_is_unauthorized() {
    let response = site_router()
        .oneshot(request("GET", "/signup/me", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers().get("x-denial-code").unwrap(),
        "not_authenticated"
    );
}

#[tokio::test]
async fn unclaimed_request_is_forbidden() {
    let response = site_router()
        .oneshot(request("DELETE", "/translate/de", Some("manage")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        response.headers().get("x-denial-code").unwrap(),
        "no_matching_access_rule_found"
    );
}

#[tokio::test]
async fn block_rule_stops_auditors_everywhere() {
    let router = site_router();

    let denied = router
        .clone()
        .oneshot(request("GET", "/translate/de", Some("audit")))
        .await
        .unwrap();
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);

    // Non-auditors fall through the block rule to the ordinary rules.
    let allowed = router
        .oneshot(request("GET", "/translate/de", Some("edit")))
        .await
        .unwrap();
    assert_eq!(allowed.status(), StatusCode::OK);
}

#[tokio::test]
async fn query_string_does_not_defeat_path_matching() {
    let response = site_router()
        .oneshot(request("GET", "/signup/me?tab=profile", Some("manage")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn hierarchical_permission_matches_over_http() {
    let store = RuleStore::with_rules([RuleDecl::new("GET", "/signup/*", "tool-hero-*")]);
    let router = Router::new()
        .route("/signup/{*rest}", get(ok))
        .layer(AccessLayer::new(store));

    let allowed = router
        .clone()
        .oneshot(request("GET", "/signup/me", Some("tool-hero-admin")))
        .await
        .unwrap();
    assert_eq!(allowed.status(), StatusCode::OK);

    let denied = router
        .oneshot(request("GET", "/signup/me", Some("tool")))
        .await
        .unwrap();
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn empty_store_lets_everything_through() {
    let router = Router::new()
        .route("/anything", get(ok))
        .layer(AccessLayer::new(RuleStore::new()));

    let response = router.oneshot(request("GET", "/anything", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn malformed_rule_denies_every_request() {
    let store = RuleStore::new();
    store.append(RuleDecl::from_fields(vec!["GET".into(), "/a".into()]));
    let router = Router::new()
        .route("/unrelated", get(ok))
        .layer(AccessLayer::new(store));

    let response = router
        .oneshot(request("GET", "/unrelated", Some("manage")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        response.headers().get("x-denial-code").unwrap(),
        "wrong_access_rule_definition__must_have_3_or_4_arguments"
    );
}

#[tokio::test]
async fn custom_extractor_supplies_the_permission() {
    let store = RuleStore::with_rules([RuleDecl::new("GET", "/admin/*", "manage")]);
    let router = Router::new()
        .route("/admin/users", get(ok))
        .layer(AccessLayer::new(store).with_extractor(FixedPermissionExtractor::new("manage")));

    // No header at all; the extractor vouches for the caller.
    let response = router.oneshot(request("GET", "/admin/users", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn json_denied_handler_keeps_the_status() {
    let store = RuleStore::with_rules([RuleDecl::new("GET", "/admin/*", "manage")]);
    let router = Router::new()
        .route("/admin/users", get(ok))
        .layer(AccessLayer::new(store).with_denied_handler(JsonDeniedHandler::new().with_details()));

    let response = router
        .oneshot(request("GET", "/admin/users", Some("edit")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        response.headers().get("x-denial-code").unwrap(),
        "access_not_permitted"
    );
}

#[tokio::test]
async fn restrict_layer_guards_a_single_route() {
    let router: Router = Router::new().route(
        "/admin",
        get(ok).layer(RestrictLayer::new("manage")),
    );

    let allowed = router
        .clone()
        .oneshot(request("GET", "/admin", Some("manage,edit")))
        .await
        .unwrap();
    assert_eq!(allowed.status(), StatusCode::OK);

    let denied = router
        .clone()
        .oneshot(request("GET", "/admin", Some("edit")))
        .await
        .unwrap();
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);

    let anonymous = router.oneshot(request("GET", "/admin", None)).await.unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn user_can_extension_reaches_the_handler() {
    async fn whoami(Extension(user): Extension<UserCan>) -> String {
        if user.can("manage") {
            "boss".to_owned()
        } else {
            "guest".to_owned()
        }
    }

    let store = RuleStore::with_rules([RuleDecl::new("GET", "/whoami", "manage,edit")]);
    let router = Router::new()
        .route("/whoami", get(whoami))
        .layer(AccessLayer::new(store));

    let response = router
        .clone()
        .oneshot(request("GET", "/whoami", Some("manage")))
        .await
        .unwrap();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"boss");

    let response = router
        .oneshot(request("GET", "/whoami", Some("edit")))
        .await
        .unwrap();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"guest");
}
