//! HTTP server for Prometheus scraping and kubelet probes

use crate::metrics::ControllerMetrics;
use anyhow::Result;
use http_body_util::Full;
use hyper::{
    body::Bytes,
    header::{HeaderValue, CONTENT_TYPE},
    server::conn::http1,
    service::service_fn,
    Method, Request, Response, StatusCode,
};
use hyper_util::rt::tokio::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Flipped once the controller has started watching
#[derive(Clone, Default)]
pub struct Readiness(Arc<AtomicBool>);

impl Readiness {
    pub fn mark_ready(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_ready(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Accept connections on `addr` until the listener fails
pub async fn serve(addr: SocketAddr, metrics: ControllerMetrics, readiness: Readiness) -> Result<()> {
    let listener = TcpListener::bind(&addr).await?;
    info!("Metrics server listening on {}", addr);

    loop {
        let (stream, peer_addr) = listener.accept().await?;
        let io = TokioIo::new(stream);

        let metrics = metrics.clone();
        let readiness = readiness.clone();

        tokio::task::spawn(async move {
            let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                let response = route(req.method(), req.uri().path(), &metrics, &readiness);
                async move { Ok::<_, Infallible>(response) }
            });

            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                debug!("Error serving HTTP connection from {}: {}", peer_addr, e);
            }
        });
    }
}

/// Map a request line to its response
pub fn route(
    method: &Method,
    path: &str,
    metrics: &ControllerMetrics,
    readiness: &Readiness,
) -> Response<Full<Bytes>> {
    debug!("{} {}", method, path);

    if method != Method::GET {
        return text(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed\n");
    }

    match path {
        "/metrics" => match metrics.gather() {
            Ok(body) => {
                let mut response = text(StatusCode::OK, body);
                response
                    .headers_mut()
                    .insert(CONTENT_TYPE, HeaderValue::from_static(PROMETHEUS_CONTENT_TYPE));
                response
            }
            Err(e) => {
                warn!("Failed to gather metrics: {}", e);
                text(StatusCode::INTERNAL_SERVER_ERROR, "Failed to gather metrics\n")
            }
        },
        "/healthz" => text(StatusCode::OK, "OK\n"),
        "/readyz" if readiness.is_ready() => text(StatusCode::OK, "OK\n"),
        "/readyz" => text(StatusCode::SERVICE_UNAVAILABLE, "Not Ready\n"),
        _ => text(StatusCode::NOT_FOUND, "Not Found\n"),
    }
}

fn text(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response
}
