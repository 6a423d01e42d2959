//! HTTP service layer for tentd.
//!
//! - **Router**: maps method and path to a [`TentdOperation`]
//! - **Gate**: protected operations are authorized with HTTP MAC before dispatch
//! - **Handler trait**: the boundary between HTTP and business logic
//! - **Service**: hyper `Service` implementation tying these together
//! - **Response helpers**: JSON bodies, API errors, and the MAC challenge

pub mod dispatch;
pub mod error;
pub mod response;
pub mod router;
pub mod service;

pub use dispatch::{HandlerFuture, TentdHandler};
pub use error::{ApiError, ApiErrorCode};
pub use router::TentdOperation;
pub use service::TentdHttpService;
