//! `X-Request-ID` propagation.
//!
//! Load balancers and orchestrators that ping the service often stamp their
//! probes with a request ID. The middleware reuses that ID when present
//! (otherwise it generates a UUID v4), runs the handler inside a span carrying
//! it so a "Ping failed" log line can be matched to the probe that saw the
//! failure, and echoes it on the response.

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Instrument as _;
use uuid::Uuid;

pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// The ID assigned to the current request, available as an axum extension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestId(pub String);

pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(String::from)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    req.extensions_mut().insert(RequestId(id.clone()));

    let span = tracing::info_span!("ping_request", request_id = %id);
    let mut response = next.run(req).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(X_REQUEST_ID.clone(), value);
    }

    response
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        routing::get,
        Extension, Router,
    };
    use tower::ServiceExt;

    use super::*;

    fn app() -> Router {
        Router::new()
            .route("/", get(|Extension(id): Extension<RequestId>| async move { id.0 }))
            .layer(axum::middleware::from_fn(request_id_middleware))
    }

    #[tokio::test]
    async fn caller_supplied_id_is_echoed() {
        let req = Request::builder()
            .uri("/")
            .header("x-request-id", "lb-probe-42")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(req).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-request-id"], "lb-probe-42");
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"lb-probe-42");
    }

    #[tokio::test]
    async fn missing_or_empty_id_is_generated() {
        for header in [None, Some("")] {
            let mut builder = Request::builder().uri("/");
            if let Some(value) = header {
                builder = builder.header("x-request-id", value);
            }
            let response = app().oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();

            let id = response.headers()["x-request-id"].to_str().unwrap();
            assert!(Uuid::parse_str(id).is_ok(), "not a uuid: {id:?}");
        }
    }
}
