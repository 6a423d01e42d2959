//! tentd handler trait and operation dispatch.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use http_body_util::Full;
use tentd_auth::Principal;

use crate::error::ApiError;
use crate::router::TentdOperation;

/// Boxed future returned by [`TentdHandler::handle_operation`].
pub type HandlerFuture =
    Pin<Box<dyn Future<Output = Result<http::Response<Full<Bytes>>, ApiError>> + Send>>;

/// Business logic behind the HTTP API.
///
/// The service calls the handler only after routing, and for protected
/// operations only after the authorization gate accepted the request. The
/// `principal` is `Some` exactly when the operation required authentication.
pub trait TentdHandler: Send + Sync + 'static {
    /// Handle an operation and produce an HTTP response.
    fn handle_operation(
        &self,
        op: TentdOperation,
        principal: Option<Principal>,
        body: Bytes,
    ) -> HandlerFuture;
}

/// Dispatch an operation to the handler.
///
/// # Errors
///
/// Propagates the handler's [`ApiError`].
pub async fn dispatch_operation<H: TentdHandler>(
    handler: &H,
    op: TentdOperation,
    principal: Option<Principal>,
    body: Bytes,
) -> Result<http::Response<Full<Bytes>>, ApiError> {
    tracing::debug!(operation = %op, "dispatching tentd operation");
    handler.handle_operation(op, principal, body).await
}
