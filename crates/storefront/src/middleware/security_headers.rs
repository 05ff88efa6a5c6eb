//! Security headers middleware for XSS, clickjacking, and isolation protection.
//!
//! Every response gets the same fixed header set. Scripts, styles and API
//! calls are first-party only; product images are the one cross-origin
//! resource and may come from any https host.

use std::sync::LazyLock;

use axum::{
    extract::Request,
    http::{
        HeaderMap, HeaderName, HeaderValue,
        header::{
            CACHE_CONTROL, CONTENT_SECURITY_POLICY, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS,
            X_DNS_PREFETCH_CONTROL, X_FRAME_OPTIONS,
        },
    },
    middleware::Next,
    response::Response,
};

/// Content Security Policy directives.
///
/// The checkout redirect to the payment provider is a top-level
/// navigation, so neither `connect-src` nor `form-action` needs its host.
const CSP_DIRECTIVES: &[&str] = &[
    "default-src 'none'",
    "script-src 'self'",
    "style-src 'self'",
    "font-src 'self'",
    "img-src 'self' https: data:",
    "connect-src 'self'",
    "frame-src 'none'",
    "object-src 'none'",
    "base-uri 'self'",
    "form-action 'self'",
    "frame-ancestors 'none'",
    "upgrade-insecure-requests",
];

/// Browser features the storefront never uses.
const DENIED_FEATURES: &[&str] = &[
    "accelerometer",
    "autoplay",
    "browsing-topics",
    "camera",
    "display-capture",
    "encrypted-media",
    "fullscreen",
    "geolocation",
    "gyroscope",
    "hid",
    "idle-detection",
    "magnetometer",
    "microphone",
    "midi",
    "payment",
    "picture-in-picture",
    "publickey-credentials-get",
    "screen-wake-lock",
    "serial",
    "usb",
    "xr-spatial-tracking",
];

static SECURITY_HEADERS: LazyLock<HeaderMap> = LazyLock::new(build_security_headers);

fn joined(parts: impl Iterator<Item = String>, separator: &str) -> HeaderValue {
    let value = parts.collect::<Vec<_>>().join(separator);
    // Built from the ASCII constants above
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static(""))
}

fn build_security_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();

    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(REFERRER_POLICY, HeaderValue::from_static("no-referrer"));
    headers.insert(
        CONTENT_SECURITY_POLICY,
        joined(CSP_DIRECTIVES.iter().map(|d| (*d).to_owned()), "; "),
    );
    headers.insert(
        HeaderName::from_static("permissions-policy"),
        joined(DENIED_FEATURES.iter().map(|f| format!("{f}=()")), ", "),
    );

    // Cart and account pages are per-user
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store, max-age=0"));

    headers.insert(
        HeaderName::from_static("cross-origin-opener-policy"),
        HeaderValue::from_static("same-origin"),
    );
    headers.insert(
        HeaderName::from_static("cross-origin-resource-policy"),
        HeaderValue::from_static("same-origin"),
    );
    // Image hosts rarely send CORP headers
    headers.insert(
        HeaderName::from_static("cross-origin-embedder-policy"),
        HeaderValue::from_static("credentialless"),
    );
    headers.insert(X_DNS_PREFETCH_CONTROL, HeaderValue::from_static("off"));

    headers
}

/// Add the security header set to every response.
///
/// Headers a handler already set are overwritten.
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    for (name, value) in SECURITY_HEADERS.iter() {
        headers.insert(name.clone(), value.clone());
    }
    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{Router, body::Body, http::Request, middleware, routing::get};
    use tower::ServiceExt;

    use super::*;

    #[tokio::test]
    async fn test_headers_on_every_response() {
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(middleware::from_fn(security_headers_middleware));

        let response = app
            .oneshot(Request::builder().uri("/missing").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let headers = response.headers();
        assert_eq!(headers[X_FRAME_OPTIONS], "DENY");
        assert_eq!(headers[X_CONTENT_TYPE_OPTIONS], "nosniff");
        let csp = headers[CONTENT_SECURITY_POLICY].to_str().unwrap();
        assert!(csp.contains("script-src 'self'"));
        assert!(csp.contains("img-src 'self' https: data:"));
        assert!(csp.ends_with("upgrade-insecure-requests"));
    }

    #[test]
    fn test_permissions_policy_denies_payment_api() {
        let policy = SECURITY_HEADERS["permissions-policy"].to_str().unwrap();
        assert!(policy.starts_with("accelerometer=()"));
        assert!(policy.contains("payment=()"));
    }
}
