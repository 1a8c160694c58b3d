//! Request instrumentation.
//!
//! Every request that enters [`track_requests`] produces exactly one counter
//! increment and one duration observation. The recording lives in the `Drop`
//! of a [`RequestGuard`], which rides along with the response body, so it
//! fires once the body is fully sent or dropped:
//! - normal and error responses record the final status code,
//! - a panicking handler records `500`,
//! - a request abandoned before a response exists (client went away, the
//!   future was dropped) records `499`.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    body::Body,
    extract::{MatchedPath, Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use bytes::Bytes;
use http_body::{Body as HttpBody, Frame, SizeHint};
use pin_project_lite::pin_project;
use tokio::time::Instant;

use super::metrics::HttpMetrics;

/// Status recorded when the request is dropped before a response exists.
pub const CLIENT_CLOSED_REQUEST: u16 = 499;

pub async fn track_requests(
    State(metrics): State<Arc<HttpMetrics>>,
    req: Request,
    next: Next,
) -> Response {
    let method = req.method().as_str().to_owned();
    let (route, matched) = match req.extensions().get::<MatchedPath>() {
        Some(p) => (p.as_str().to_owned(), true),
        None => (req.uri().path().to_owned(), false),
    };

    let mut guard = RequestGuard::start(metrics, method, route, matched);
    let res = next.run(req).await;
    guard.status = Some(res.status());

    res.map(|inner| {
        Body::new(InstrumentedBody {
            inner,
            _guard: guard,
        })
    })
}

/// Records the request on drop, whatever path got it there.
struct RequestGuard {
    metrics: Arc<HttpMetrics>,
    method: String,
    route: String,
    matched: bool,
    status: Option<StatusCode>,
    start: Instant,
}

impl RequestGuard {
    fn start(metrics: Arc<HttpMetrics>, method: String, route: String, matched: bool) -> Self {
        metrics.request_started();
        Self {
            metrics,
            method,
            route,
            matched,
            status: None,
            start: Instant::now(),
        }
    }
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        let status = match self.status {
            Some(s) => s.as_u16(),
            None if std::thread::panicking() => StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            None => CLIENT_CLOSED_REQUEST,
        };
        self.metrics.request_finished(
            &self.method,
            &self.route,
            self.matched,
            status,
            self.start.elapsed(),
        );
    }
}

pin_project! {
    /// Response body that finalizes its request guard when dropped.
    struct InstrumentedBody {
        #[pin]
        inner: Body,
        _guard: RequestGuard,
    }
}

impl HttpBody for InstrumentedBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        self.project().inner.poll_frame(cx)
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}
