//! The request gate: sign-in enforcement plus cookie-cached user sync.
//!
//! Per request, in order:
//! 1. skip entirely when the path is outside [`GateScope`]
//! 2. resolve the identity, and on private routes require it
//! 3. when no validation cookie exists yet, sync the user via `POST /api/sync`
//!    and record the outcome in the cookie
//! 4. pass the request on; only cookies are added to the response
//!
//! Sync failures never block the request. Only the sign-in check can.

use super::cookie::{cookie_name, ValidationRecord};
use super::events::{GateEvent, GateObserver, TracingObserver};
use super::identity::{Identity, IdentityProvider};
use super::routes::{is_sync_exempt, GateScope, RouteClassifier};
use super::sync::{request_origin, sync_url, SyncError, UserSync};
use axum::{
    extract::{Request, State},
    http::{request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tower_cookies::Cookies;

pub struct RequestGate {
    scope: GateScope,
    classifier: RouteClassifier,
    identity: Arc<dyn IdentityProvider>,
    syncer: Arc<dyn UserSync>,
    observer: Arc<dyn GateObserver>,
    secure_cookies: bool,
    trust_forwarded_headers: bool,
}

impl std::fmt::Debug for RequestGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestGate")
            .field("scope", &self.scope)
            .field("classifier", &self.classifier)
            .field("secure_cookies", &self.secure_cookies)
            .field("trust_forwarded_headers", &self.trust_forwarded_headers)
            .finish()
    }
}

impl RequestGate {
    pub fn new(
        classifier: RouteClassifier,
        identity: Arc<dyn IdentityProvider>,
        syncer: Arc<dyn UserSync>,
    ) -> Self {
        Self {
            scope: GateScope,
            classifier,
            identity,
            syncer,
            observer: Arc::new(TracingObserver),
            secure_cookies: false,
            trust_forwarded_headers: false,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn GateObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Mark validation cookies `Secure` (production deployments).
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    /// Build the sync origin from `X-Forwarded-*` headers (behind a trusted proxy only).
    pub fn with_trusted_proxy(mut self, trusted: bool) -> Self {
        self.trust_forwarded_headers = trusted;
        self
    }

    /// Resolve the caller and, on private routes, require them to be signed in.
    ///
    /// `Err` carries the response that ends the request.
    pub async fn enforce(&self, parts: &Parts) -> Result<Option<Identity>, Response> {
        let path = parts.uri.path();
        let is_public = self.classifier.is_public(path);

        let resolved = self.identity.resolve(parts).await;

        if is_public {
            return Ok(resolved.unwrap_or_else(|e| {
                tracing::warn!(path = %path, "Identity lookup failed on public route: {}", e);
                None
            }));
        }

        self.observer.on_event(&GateEvent::PrivateRouteCheck {
            path: path.to_string(),
            identity: resolved.as_ref().ok().cloned().flatten(),
        });

        match resolved {
            Ok(Some(identity)) => Ok(Some(identity)),
            Ok(None) => Err(self.identity.reject(parts)),
            Err(e) => Err(e.into_response()),
        }
    }

    /// Sync the user unless a validation cookie already exists or the path is exempt.
    ///
    /// The existing cookie is only checked for presence, never decoded.
    pub async fn maybe_sync(&self, parts: &Parts, identity: &Identity, cookies: &Cookies) {
        if cookies.get(&cookie_name(identity)).is_some() || is_sync_exempt(parts.uri.path()) {
            return;
        }

        let record = match self.sync(parts, identity).await {
            Ok(status) if status.is_success() => {
                self.observer.on_event(&GateEvent::SyncSucceeded {
                    identity: identity.clone(),
                });
                ValidationRecord::valid()
            }
            // Rejected syncs leave no cookie, so the next request tries again
            Ok(_) => return,
            Err(e) => {
                self.observer.on_event(&GateEvent::SyncFailed {
                    identity: identity.clone(),
                    error: e.to_string(),
                });
                ValidationRecord::sync_failed()
            }
        };

        match record.to_cookie(identity, self.secure_cookies) {
            Ok(cookie) => cookies.add(cookie),
            Err(e) => tracing::error!("Failed to encode validation cookie: {:?}", e),
        }
    }

    async fn sync(&self, parts: &Parts, identity: &Identity) -> Result<StatusCode, SyncError> {
        let url = sync_url(&request_origin(parts, self.trust_forwarded_headers)?)?;
        self.syncer.sync_user(&url, identity).await
    }
}

/// Axum middleware running the [`RequestGate`] around every request.
///
/// Needs `CookieManagerLayer` (and the session layer, for session identities)
/// outside of it.
pub async fn request_gate(
    State(gate): State<Arc<RequestGate>>,
    cookies: Cookies,
    request: Request,
    next: Next,
) -> Response {
    if !gate.scope.applies_to(request.uri().path()) {
        return next.run(request).await;
    }

    let (mut parts, body) = request.into_parts();

    let identity = match gate.enforce(&parts).await {
        Ok(identity) => identity,
        Err(rejection) => return rejection,
    };

    if let Some(identity) = identity {
        gate.maybe_sync(&parts, &identity, &cookies).await;
        parts.extensions.insert(identity);
    }

    next.run(Request::from_parts(parts, body)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_PUBLIC_ROUTES;
    use crate::middleware::cookie::{FAILED_MAX_AGE_SECS, SYNC_FAILED_MESSAGE, VALID_MAX_AGE_SECS};
    use crate::middleware::routes::RoutePattern;
    use crate::middleware::testing::{
        set_cookies, FailingIdentity, FakeSync, FixedIdentity, RecordingObserver, SyncOutcome,
    };
    use axum::{
        body::Body,
        http::header,
        middleware::from_fn_with_state,
        routing::get,
        Extension, Router,
    };
    use time::Duration;
    use tower::ServiceExt;
    use tower_cookies::CookieManagerLayer;
    use url::Url;

    struct Harness {
        app: Router,
        identity: Arc<FixedIdentity>,
        syncer: Arc<FakeSync>,
        observer: Arc<RecordingObserver>,
    }

    fn harness(identity: Option<&str>, outcome: SyncOutcome) -> Harness {
        let identity = Arc::new(FixedIdentity::new(identity));
        let syncer = Arc::new(FakeSync::new(outcome));
        let observer = Arc::new(RecordingObserver::default());

        let classifier = RouteClassifier::new(RoutePattern::parse_list(DEFAULT_PUBLIC_ROUTES).unwrap());
        let gate = RequestGate::new(classifier, identity.clone(), syncer.clone())
            .with_observer(observer.clone());

        let app = Router::new()
            .route("/", get(|| async { "home" }))
            .route("/gallery", get(|| async { "gallery" }))
            .route("/favicon.ico", get(|| async { "icon" }))
            .route("/api/anything", get(|| async { "api" }))
            .route(
                "/whoami",
                get(|Extension(identity): Extension<Identity>| async move { identity.to_string() }),
            )
            .layer(from_fn_with_state(Arc::new(gate), request_gate))
            .layer(CookieManagerLayer::new());

        Harness {
            app,
            identity,
            syncer,
            observer,
        }
    }

    fn get_request(path: &str) -> Request {
        Request::builder()
            .uri(path)
            .header(header::HOST, "localhost:3000")
            .body(Body::empty())
            .unwrap()
    }

    fn private_checks(observer: &RecordingObserver) -> usize {
        observer
            .events()
            .iter()
            .filter(|event| matches!(event, GateEvent::PrivateRouteCheck { .. }))
            .count()
    }

    #[tokio::test]
    async fn test_public_route_allows_anonymous() {
        let h = harness(None, SyncOutcome::Status(StatusCode::OK));

        let response = h.app.oneshot(get_request("/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(h.identity.rejections(), 0);
        assert_eq!(private_checks(&h.observer), 0);
        // No identity, nothing to sync
        assert_eq!(h.syncer.calls(), 0);
        assert!(set_cookies(&response).is_empty());
    }

    #[tokio::test]
    async fn test_private_route_rejects_anonymous() {
        let h = harness(None, SyncOutcome::Status(StatusCode::OK));

        let response = h.app.oneshot(get_request("/gallery")).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(h.identity.rejections(), 1);
        assert_eq!(
            h.observer.events(),
            vec![GateEvent::PrivateRouteCheck {
                path: "/gallery".to_string(),
                identity: None,
            }]
        );
        assert_eq!(h.syncer.calls(), 0);
    }

    #[tokio::test]
    async fn test_private_route_check_is_reported_even_when_signed_in() {
        let h = harness(Some("user_1"), SyncOutcome::Status(StatusCode::OK));

        let response = h.app.oneshot(get_request("/gallery")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(h.identity.rejections(), 0);
        assert_eq!(private_checks(&h.observer), 1);
    }

    #[tokio::test]
    async fn test_successful_sync_sets_valid_cookie() {
        let h = harness(Some("user_1"), SyncOutcome::Status(StatusCode::OK));

        let response = h.app.oneshot(get_request("/gallery")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(h.syncer.calls(), 1);
        assert_eq!(
            h.syncer.last_url.lock().unwrap().as_ref().map(Url::as_str),
            Some("http://localhost:3000/api/sync")
        );

        let cookies = set_cookies(&response);
        assert_eq!(cookies.len(), 1);
        let cookie = &cookies[0];
        assert_eq!(cookie.name(), "userValidatedInDatabase_user_1");
        assert_eq!(cookie.max_age(), Some(Duration::seconds(VALID_MAX_AGE_SECS)));
        assert_eq!(cookie.http_only(), Some(true));

        let record = ValidationRecord::decode(cookie.value()).unwrap();
        assert!(record.is_valid);
        assert_eq!(record.error, None);

        assert!(h
            .observer
            .events()
            .contains(&GateEvent::SyncSucceeded { identity: Identity::new("user_1") }));
    }

    #[tokio::test]
    async fn test_failed_sync_sets_short_lived_invalid_cookie() {
        let h = harness(Some("user_1"), SyncOutcome::TransportError);

        let response = h.app.oneshot(get_request("/gallery")).await.unwrap();

        // Fail-open: the page still renders
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(h.syncer.calls(), 1);

        let cookies = set_cookies(&response);
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].max_age(), Some(Duration::seconds(FAILED_MAX_AGE_SECS)));

        let record = ValidationRecord::decode(cookies[0].value()).unwrap();
        assert!(!record.is_valid);
        assert_eq!(record.error.as_deref(), Some(SYNC_FAILED_MESSAGE));

        assert!(h
            .observer
            .events()
            .iter()
            .any(|event| matches!(event, GateEvent::SyncFailed { .. })));
    }

    #[tokio::test]
    async fn test_rejected_sync_sets_no_cookie() {
        let h = harness(Some("user_1"), SyncOutcome::Status(StatusCode::INTERNAL_SERVER_ERROR));

        let response = h.app.oneshot(get_request("/gallery")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(h.syncer.calls(), 1);
        assert!(set_cookies(&response).is_empty());
        assert_eq!(private_checks(&h.observer), h.observer.events().len());
    }

    #[tokio::test]
    async fn test_existing_cookie_skips_sync() {
        let h = harness(Some("user_1"), SyncOutcome::Status(StatusCode::OK));

        let request = Request::builder()
            .uri("/gallery")
            .header(header::HOST, "localhost:3000")
            .header(
                header::COOKIE,
                r#"userValidatedInDatabase_user_1={"isValid":true,"timestamp":1}"#,
            )
            .body(Body::empty())
            .unwrap();

        let response = h.app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(h.syncer.calls(), 0);
        assert!(set_cookies(&response).is_empty());
    }

    #[tokio::test]
    async fn test_other_users_cookie_does_not_skip_sync() {
        let h = harness(Some("user_2"), SyncOutcome::Status(StatusCode::OK));

        let request = Request::builder()
            .uri("/")
            .header(header::HOST, "localhost:3000")
            .header(header::COOKIE, "userValidatedInDatabase_user_1=x")
            .body(Body::empty())
            .unwrap();

        let response = h.app.oneshot(request).await.unwrap();

        assert_eq!(h.syncer.calls(), 1);
        assert_eq!(set_cookies(&response)[0].name(), "userValidatedInDatabase_user_2");
    }

    #[tokio::test]
    async fn test_api_and_static_paths_never_sync() {
        for path in ["/api/anything", "/favicon.ico"] {
            let h = harness(Some("user_1"), SyncOutcome::Status(StatusCode::OK));

            let response = h.app.oneshot(get_request(path)).await.unwrap();

            assert_eq!(response.status(), StatusCode::OK, "{}", path);
            assert_eq!(h.syncer.calls(), 0, "{}", path);
            assert!(set_cookies(&response).is_empty(), "{}", path);
        }
    }

    #[tokio::test]
    async fn test_static_paths_bypass_gate() {
        let h = harness(None, SyncOutcome::Status(StatusCode::OK));

        let response = h.app.oneshot(get_request("/favicon.ico")).await.unwrap();

        // Private by the allow-list, but the gate never ran
        assert_eq!(response.status(), StatusCode::OK);
        assert!(h.observer.events().is_empty());
    }

    #[tokio::test]
    async fn test_missing_host_counts_as_failed_sync() {
        let h = harness(Some("user_1"), SyncOutcome::Status(StatusCode::OK));

        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = h.app.oneshot(request).await.unwrap();

        assert_eq!(h.syncer.calls(), 0);
        let record = ValidationRecord::decode(set_cookies(&response)[0].value()).unwrap();
        assert!(!record.is_valid);
    }

    #[tokio::test]
    async fn test_identity_is_available_to_handlers() {
        let h = harness(Some("user_7"), SyncOutcome::Status(StatusCode::OK));

        let response = h.app.oneshot(get_request("/whoami")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"user_7");
    }

    fn failing_identity_app(observer: Arc<RecordingObserver>) -> Router {
        let classifier = RouteClassifier::new(RoutePattern::parse_list(DEFAULT_PUBLIC_ROUTES).unwrap());
        let syncer = Arc::new(FakeSync::new(SyncOutcome::Status(StatusCode::OK)));
        let gate = RequestGate::new(classifier, Arc::new(FailingIdentity), syncer)
            .with_observer(observer);

        Router::new()
            .route("/", get(|| async { "home" }))
            .route("/gallery", get(|| async { "gallery" }))
            .layer(from_fn_with_state(Arc::new(gate), request_gate))
            .layer(CookieManagerLayer::new())
    }

    #[tokio::test]
    async fn test_identity_error_on_public_route_is_anonymous() {
        let observer = Arc::new(RecordingObserver::default());
        let app = failing_identity_app(observer.clone());

        let response = app.oneshot(get_request("/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(observer.events().is_empty());
        assert!(set_cookies(&response).is_empty());
    }

    #[tokio::test]
    async fn test_identity_error_on_private_route_is_reported_and_fails() {
        let observer = Arc::new(RecordingObserver::default());
        let app = failing_identity_app(observer.clone());

        let response = app.oneshot(get_request("/gallery")).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            observer.events(),
            vec![GateEvent::PrivateRouteCheck {
                path: "/gallery".to_string(),
                identity: None,
            }]
        );
    }

    #[tokio::test]
    async fn test_forwarded_host_is_ignored_by_default() {
        let h = harness(Some("user_1"), SyncOutcome::Status(StatusCode::OK));

        let request = Request::builder()
            .uri("/gallery")
            .header(header::HOST, "localhost:3000")
            .header("x-forwarded-host", "169.254.169.254")
            .body(Body::empty())
            .unwrap();
        h.app.oneshot(request).await.unwrap();

        assert_eq!(
            h.syncer.last_url.lock().unwrap().as_ref().map(Url::as_str),
            Some("http://localhost:3000/api/sync")
        );
    }

    #[tokio::test]
    async fn test_forwarded_host_is_used_behind_trusted_proxy() {
        let syncer = Arc::new(FakeSync::new(SyncOutcome::Status(StatusCode::OK)));
        let gate = RequestGate::new(
            RouteClassifier::new(Vec::new()),
            Arc::new(FixedIdentity::new(Some("user_1"))),
            syncer.clone(),
        )
        .with_trusted_proxy(true);

        let app = Router::new()
            .route("/gallery", get(|| async { "gallery" }))
            .layer(from_fn_with_state(Arc::new(gate), request_gate))
            .layer(CookieManagerLayer::new());

        let request = Request::builder()
            .uri("/gallery")
            .header(header::HOST, "10.0.0.5:8080")
            .header("x-forwarded-host", "app.example.com")
            .header("x-forwarded-proto", "https")
            .body(Body::empty())
            .unwrap();
        app.oneshot(request).await.unwrap();

        assert_eq!(
            syncer.last_url.lock().unwrap().as_ref().map(Url::as_str),
            Some("https://app.example.com/api/sync")
        );
    }

    #[tokio::test]
    async fn test_secure_flag_follows_configuration() {
        let identity = Arc::new(FixedIdentity::new(Some("user_1")));
        let syncer = Arc::new(FakeSync::new(SyncOutcome::Status(StatusCode::OK)));
        let gate = RequestGate::new(RouteClassifier::new(Vec::new()), identity, syncer)
            .with_secure_cookies(true);

        let app = Router::new()
            .route("/gallery", get(|| async { "gallery" }))
            .layer(from_fn_with_state(Arc::new(gate), request_gate))
            .layer(CookieManagerLayer::new());

        let response = app.oneshot(get_request("/gallery")).await.unwrap();

        assert_eq!(set_cookies(&response)[0].secure(), Some(true));
    }
}
