//! Request logging middleware
//!
//! Every control request is traced with the client address, status and
//! latency. The SSE stream and static assets are too chatty to log.

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{HeaderMap, Request},
    response::Response,
};
use futures::future::BoxFuture;
use std::{
    net::SocketAddr,
    task::{Context, Poll},
    time::Instant,
};
use tower::{Layer, Service};
use tracing::{debug, info};

/// Path prefixes that are not logged
const QUIET_PREFIXES: &[&str] = &["/events", "/static"];

/// Client IP, preferring proxy headers over the socket address
/// Priority: X-Real-IP > X-Forwarded-For (first IP) > ConnectInfo
fn client_ip(headers: &HeaderMap, fallback_ip: &str) -> String {
    if let Some(ip) = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
    {
        return ip.to_string();
    }

    if let Some(ip) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|ips| ips.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
    {
        return ip.to_string();
    }

    fallback_ip.to_string()
}

fn is_quiet(path: &str) -> bool {
    QUIET_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

/// Layer for HTTP request logging
#[derive(Clone, Default)]
pub struct RequestLoggingLayer;

impl<S> Layer<S> for RequestLoggingLayer {
    type Service = RequestLoggingMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestLoggingMiddleware { inner }
    }
}

#[derive(Clone)]
pub struct RequestLoggingMiddleware<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for RequestLoggingMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Send + Clone + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let method = request.method().clone();
            let path = request.uri().path().to_string();

            if is_quiet(&path) {
                return inner.call(request).await;
            }

            let fallback_ip = request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
                .unwrap_or_else(|| "unknown".to_string());
            let ip = client_ip(request.headers(), &fallback_ip);

            let started = Instant::now();
            let response = inner.call(request).await?;
            let elapsed_ms = started.elapsed().as_millis();
            let status = response.status().as_u16();

            if method == axum::http::Method::GET {
                debug!("{} {} from {} -> {} ({}ms)", method, path, ip, status, elapsed_ms);
            } else {
                info!("{} {} from {} -> {} ({}ms)", method, path, ip, status, elapsed_ms);
            }

            Ok(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_client_ip_prefers_proxy_headers() {
        let mut headers = HeaderMap::new();
        assert_eq!(client_ip(&headers, "10.0.0.2"), "10.0.0.2");

        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        assert_eq!(client_ip(&headers, "10.0.0.2"), "203.0.113.7");

        headers.insert("x-real-ip", HeaderValue::from_static(" 198.51.100.4 "));
        assert_eq!(client_ip(&headers, "10.0.0.2"), "198.51.100.4");
    }

    #[test]
    fn test_quiet_paths() {
        assert!(is_quiet("/events"));
        assert!(is_quiet("/static/dashboard.js"));
        assert!(!is_quiet("/search"));
    }
}
