//! W3C Trace Context propagation for outgoing calls to remote stores.
//!
//! Requests built through [`TracedClientExt::traced`] carry the current span's
//! `traceparent`, plus `tracestate` when the span has one. The remote service
//! can then hang its own spans off the operator action that caused the call.
//!
//! See: https://www.w3.org/TR/trace-context/

use opentelemetry::trace::TraceContextExt;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Serialize;
use std::fmt::Display;
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

pub const TRACEPARENT_HEADER: &str = "traceparent";
pub const TRACESTATE_HEADER: &str = "tracestate";

/// Correlation id set on every incoming frontend request.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Headers describing the current span, empty when no valid span is active.
pub fn trace_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    let context = Span::current().context();
    let span = context.span();
    let span_context = span.span_context();
    if !span_context.is_valid() {
        return headers;
    }

    let traceparent = format!(
        "00-{}-{}-{:02x}",
        span_context.trace_id(),
        span_context.span_id(),
        span_context.trace_flags().to_u8()
    );
    if let Ok(value) = HeaderValue::from_str(&traceparent) {
        headers.insert(TRACEPARENT_HEADER, value);
    }

    let state = span_context.trace_state().header();
    if !state.is_empty()
        && let Ok(value) = HeaderValue::from_str(&state)
    {
        headers.insert(TRACESTATE_HEADER, value);
    }
    headers
}

/// Outgoing request that picks up the trace headers of the span it is sent from.
pub struct TracedRequest {
    inner: RequestBuilder,
}

impl TracedRequest {
    /// Query pairs accumulate across calls.
    pub fn query<T: Serialize + ?Sized>(self, query: &T) -> Self {
        Self {
            inner: self.inner.query(query),
        }
    }

    pub fn json<T: Serialize + ?Sized>(self, body: &T) -> Self {
        Self {
            inner: self.inner.json(body),
        }
    }

    pub fn multipart(self, form: reqwest::multipart::Form) -> Self {
        Self {
            inner: self.inner.multipart(form),
        }
    }

    pub fn bearer_auth<T: Display>(self, token: T) -> Self {
        Self {
            inner: self.inner.bearer_auth(token),
        }
    }

    pub async fn send(self) -> Result<Response, reqwest::Error> {
        self.inner.headers(trace_headers()).send().await
    }
}

pub trait TracedClientExt {
    fn traced(&self, method: Method, url: &str) -> TracedRequest;
}

impl TracedClientExt for Client {
    fn traced(&self, method: Method, url: &str) -> TracedRequest {
        TracedRequest {
            inner: self.request(method, url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_active_span_means_no_trace_headers() {
        assert!(trace_headers().is_empty());
    }

    #[test]
    fn traced_request_keeps_method_query_and_bearer() {
        let request = Client::new()
            .traced(Method::PUT, "http://localhost/requests/cancel/4")
            .query(&[("page", "0")])
            .query(&[("size", "10")])
            .bearer_auth("tok")
            .inner
            .build()
            .unwrap();

        assert_eq!(request.method(), Method::PUT);
        assert_eq!(request.url().query(), Some("page=0&size=10"));
        assert_eq!(request.headers().get("authorization").unwrap(), "Bearer tok");
    }
}
