//! tentd HTTP service implementing the hyper `Service` trait.

use std::convert::Infallible;
use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use tentd_auth::{AuthorizationGate, GateDecision, RequestMeta};

use crate::dispatch::{TentdHandler, dispatch_operation};
use crate::error::ApiError;
use crate::response::{error_to_response, rejection_to_response};
use crate::router::resolve_operation;

/// Name sent in the `server` response header.
pub const SERVER_NAME: &str = "tentd";

/// Header carrying the per-request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Hyper `Service` for the tentd API.
///
/// Every protected operation passes through the [`AuthorizationGate`] before
/// the handler sees it; there is no configuration that skips the gate.
#[derive(Debug)]
pub struct TentdHttpService<H: TentdHandler> {
    handler: Arc<H>,
    gate: Arc<AuthorizationGate>,
}

impl<H: TentdHandler> TentdHttpService<H> {
    /// Create a new `TentdHttpService`.
    pub fn new(handler: Arc<H>, gate: Arc<AuthorizationGate>) -> Self {
        Self { handler, gate }
    }
}

impl<H: TentdHandler> Clone for TentdHttpService<H> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            gate: Arc::clone(&self.gate),
        }
    }
}

impl<H, B> hyper::service::Service<http::Request<B>> for TentdHttpService<H>
where
    H: TentdHandler,
    B: http_body::Body + Send + 'static,
    B::Data: Send,
    B::Error: Display,
{
    type Response = http::Response<Full<Bytes>>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<B>) -> Self::Future {
        let handler = Arc::clone(&self.handler);
        let gate = Arc::clone(&self.gate);
        let request_id = uuid::Uuid::new_v4().to_string();

        Box::pin(async move {
            let response = process_request(req, handler.as_ref(), &gate).await;
            Ok(add_common_headers(response, &request_id))
        })
    }
}

/// Process a single request: route, authorize, collect body, dispatch.
async fn process_request<H, B>(
    req: http::Request<B>,
    handler: &H,
    gate: &AuthorizationGate,
) -> http::Response<Full<Bytes>>
where
    H: TentdHandler,
    B: http_body::Body,
    B::Error: Display,
{
    let (parts, incoming) = req.into_parts();

    let op = match resolve_operation(&parts.method, parts.uri.path()) {
        Ok(op) => op,
        Err(err) => return error_to_response(&err),
    };

    let principal = if op.requires_auth() {
        let meta = RequestMeta::from_parts(&parts, gate.config().default_port);
        match gate.authorize(&meta) {
            GateDecision::Authorized(principal) => Some(principal),
            GateDecision::Challenge(rejection) => return rejection_to_response(&rejection),
        }
    } else {
        None
    };

    let body = match collect_body(incoming).await {
        Ok(body) => body,
        Err(err) => return error_to_response(&err),
    };

    match dispatch_operation(handler, op, principal, body).await {
        Ok(response) => response,
        Err(err) => {
            tracing::debug!(error = %err, "operation failed");
            error_to_response(&err)
        }
    }
}

/// Collect the incoming body into a single `Bytes` buffer.
async fn collect_body<B>(incoming: B) -> Result<Bytes, ApiError>
where
    B: http_body::Body,
    B::Error: Display,
{
    incoming
        .collect()
        .await
        .map(http_body_util::Collected::to_bytes)
        .map_err(|e| ApiError::bad_request(format!("Failed to read request body: {e}")))
}

/// Add headers common to every tentd response.
fn add_common_headers(
    mut response: http::Response<Full<Bytes>>,
    request_id: &str,
) -> http::Response<Full<Bytes>> {
    let headers = response.headers_mut();

    if let Ok(hv) = http::HeaderValue::from_str(request_id) {
        headers.entry(REQUEST_ID_HEADER).or_insert(hv);
    }
    headers.insert(
        http::header::SERVER,
        http::HeaderValue::from_static(SERVER_NAME),
    );

    response
}
