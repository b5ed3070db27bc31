//! `GET /ping`: run the configured probe and answer with an uncacheable
//! plain-text response.
//!
//! Probes are synchronous and may block (TCP connects, filesystem calls), so
//! each probe runs on the blocking thread pool and only its [`Outcome`] comes
//! back; classification and the fault log entry happen here, once per
//! request. When a request timeout is configured and the probe overruns it,
//! the ping is answered as a recoverable failure (503). Blocking work cannot
//! be cancelled, so the abandoned probe runs to completion in the background:
//! its outcome is discarded and its deprecation notices are dropped.

use std::sync::Arc;

use axum::{
    extract::State,
    http::Version,
    response::{IntoResponse, Response},
};

use super::AppState;
use crate::{
    error::Fault,
    logger::{GatedLogger, PingLogger},
    ping::Outcome,
};

pub async fn ping(State(state): State<Arc<AppState>>, version: Version) -> Response {
    let controller = state.controller();
    let gate = Arc::new(GatedLogger::new(Arc::clone(controller.logger())));
    let task = {
        let controller = Arc::clone(&controller);
        let sink: Arc<dyn PingLogger> = gate.clone();
        tokio::task::spawn_blocking(move || controller.run_probe(&sink))
    };

    let joined = match state.request_timeout {
        Some(limit) => match tokio::time::timeout(limit, task).await {
            Ok(joined) => joined,
            Err(_) => {
                gate.close();
                tracing::debug!(limit_ms = limit.as_millis() as u64, "probe abandoned");
                Ok(Err(Fault::Recoverable(format!(
                    "probe exceeded {} ms",
                    limit.as_millis()
                ))))
            }
        },
        None => task.await,
    };

    let outcome: Outcome = match joined {
        Ok(outcome) => outcome,
        // Panics are caught inside the invoker; this is cancellation at shutdown.
        Err(e) => Err(Fault::Severe(e.to_string())),
    };

    let spec = controller.respond(&outcome, Some(version));
    tracing::debug!(status = spec.status.as_u16(), "ping answered");
    spec.into_response()
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc,
        },
        time::Duration,
    };

    use anyhow::anyhow;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use tower::ServiceExt;

    use crate::{
        api::{router, AppState},
        diagnostic,
        error::{Fault, ProbeError},
        logger::{BufferingLogger, LogLevel, LogRecord, PingLogger},
        ping::{PingController, Probe},
    };

    fn app(probe: Option<Probe>, timeout: Option<Duration>) -> (axum::Router, Arc<BufferingLogger>) {
        let buffer = Arc::new(BufferingLogger::new());
        let logger: Arc<dyn PingLogger> = buffer.clone();
        let state = AppState::from_controller(PingController::new(probe, Some(logger)), timeout);
        (router(Arc::new(state), "/ping"), buffer)
    }

    fn probe<F>(f: F) -> Option<Probe>
    where
        F: Fn() -> Result<(), ProbeError> + Send + Sync + 'static,
    {
        Some(Arc::new(f))
    }

    async fn send(app: axum::Router, req: Request<Body>) -> (StatusCode, axum::http::HeaderMap, String) {
        let response = app.oneshot(req).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, String::from_utf8(body.to_vec()).unwrap())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    // -----------------------------------------------------------------------
    // Success
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn ping_returns_pong_with_uncacheable_headers() {
        let (app, logs) = app(None, None);
        let (status, headers, body) = send(app, get("/ping")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "pong");
        assert_eq!(headers[header::CACHE_CONTROL], "must-revalidate, no-store");
        assert_eq!(headers[header::CONTENT_TYPE], "text/plain; charset=utf-8");
        assert_eq!(headers[header::EXPIRES], "0");
        assert!(headers.contains_key("x-request-id"));
        assert!(logs.clean_logs().is_empty());
    }

    #[tokio::test]
    async fn http_1_0_request_gets_expires() {
        let (app, _) = app(None, None);
        let req = Request::builder()
            .uri("/ping")
            .version(axum::http::Version::HTTP_10)
            .body(Body::empty())
            .unwrap();
        let (status, headers, _) = send(app, req).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::EXPIRES], "0");
    }

    #[tokio::test]
    async fn head_is_served_without_body() {
        let (app, _) = app(None, None);
        let req = Request::builder()
            .method(Method::HEAD)
            .uri("/ping")
            .body(Body::empty())
            .unwrap();
        let (status, headers, body) = send(app, req).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CACHE_CONTROL], "must-revalidate, no-store");
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn other_paths_are_not_found() {
        let (app, _) = app(None, None);
        let (status, _, _) = send(app, get("/pong")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    // -----------------------------------------------------------------------
    // Failures
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn unavailable_dependency_is_503_and_hides_the_message() {
        let (app, logs) = app(probe(|| Err(ProbeError::unavailable(anyhow!("db password wrong")))), None);
        let (status, headers, body) = send(app, get("/ping")).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body, "Service Unavailable");
        assert_eq!(headers[header::EXPIRES], "0");

        let logs = logs.clean_logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].level, LogLevel::Critical);
        assert_eq!(logs[0].message, "Ping failed");
    }

    #[tokio::test]
    async fn panicking_probe_is_500() {
        let (app, logs) = app(probe(|| panic!("Problem")), None);
        let (status, _, body) = send(app, get("/ping")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, "Internal Server Error");
        assert_eq!(logs.clean_logs()[0].fault, Some(Fault::Severe("Problem".into())));
    }

    #[tokio::test]
    async fn slow_probe_times_out_as_unavailable() {
        let (app, logs) = app(
            probe(|| {
                std::thread::sleep(Duration::from_millis(500));
                Ok(())
            }),
            Some(Duration::from_millis(20)),
        );
        let (status, headers, body) = send(app, get("/ping")).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body, "Service Unavailable");
        assert_eq!(headers[header::CACHE_CONTROL], "must-revalidate, no-store");

        let logs = logs.clean_logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].level, LogLevel::Critical);
        assert_eq!(logs[0].fault, Some(Fault::Recoverable("probe exceeded 20 ms".into())));
    }

    #[tokio::test]
    async fn late_failure_after_the_deadline_is_logged_once() {
        let finished = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&finished);
        let (app, logs) = app(
            probe(move || {
                std::thread::sleep(Duration::from_millis(200));
                diagnostic::deprecated("late notice");
                flag.store(true, Ordering::SeqCst);
                Err(ProbeError::failed(anyhow!("late")))
            }),
            Some(Duration::from_millis(20)),
        );
        let (status, _, _) = send(app, get("/ping")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        // Give the abandoned probe time to finish and report.
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(finished.load(Ordering::SeqCst));

        assert_eq!(
            logs.clean_logs(),
            vec![LogRecord::new(
                LogLevel::Critical,
                "Ping failed",
                Some(Fault::Recoverable("probe exceeded 20 ms".into())),
            )]
        );
    }

    #[tokio::test]
    async fn deprecations_before_the_deadline_are_kept() {
        let (app, logs) = app(
            probe(|| {
                diagnostic::deprecated("foo");
                Ok(())
            }),
            Some(Duration::from_secs(5)),
        );
        let (status, _, _) = send(app, get("/ping")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(logs.clean_logs(), vec![LogRecord::new(LogLevel::Notice, "foo", None)]);
    }

    #[tokio::test]
    async fn fast_probe_beats_the_timeout() {
        let (app, _) = app(probe(|| Ok(())), Some(Duration::from_secs(5)));
        let (status, _, body) = send(app, get("/ping")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "pong");
    }
}
