//! HTTP MAC request authentication for tentd.
//!
//! This crate implements both sides of the HTTP MAC access authentication
//! scheme (`draft-ietf-oauth-v2-http-mac`): clients sign a canonical
//! representation of each request with a shared secret, and the server
//! rebuilds that representation and verifies the signature before a protected
//! operation runs.
//!
//! # Overview
//!
//! A request carries an `Authorization` header such as:
//!
//! ```text
//! MAC id="h480djs93hd8", ts="1336363200", nonce="dj83hs9s", mac="bhCQXTVyfj5cmA9uKkPFx1zeOXM="
//! ```
//!
//! The [`AuthorizationGate`] parses it, checks the timestamp against a
//! freshness window, resolves the keypair from a [`KeyPairRepository`],
//! verifies the HMAC-SHA256 signature in constant time, and records the nonce
//! to reject replays.
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use tentd_auth::{
//!     AuthorizationGate, GateConfig, GateDecision, InMemoryKeyPairRepository,
//!     KeyPairRepository, RequestMeta, RequestSigner,
//! };
//! use tentd_core::EntityRef;
//!
//! let repo = Arc::new(InMemoryKeyPairRepository::new());
//! let keypair = repo.issue(EntityRef::new("https://alice.example.com").unwrap()).unwrap();
//! let gate = AuthorizationGate::new(repo, GateConfig::default());
//!
//! let mut request = RequestMeta {
//!     method: "GET".to_owned(),
//!     path: "/followers/abc".to_owned(),
//!     query: String::new(),
//!     host: "tent.example.com".to_owned(),
//!     port: 80,
//!     authorization: None,
//! };
//! let signer = RequestSigner::new(keypair.id(), keypair.secret().expose());
//! request.authorization = Some(signer.sign_now(&request).to_string());
//!
//! assert!(matches!(gate.authorize(&request), GateDecision::Authorized(_)));
//! ```
//!
//! # Modules
//!
//! - [`error`] - Authentication and repository error types
//! - [`gate`] - The authorization gate and its decision types
//! - [`header`] - `Authorization: MAC` header parsing
//! - [`keypair`] - Keypairs and the repository capability
//! - [`mac`] - HMAC-SHA256 computation and constant-time verification
//! - [`normalize`] - Canonical request string construction
//! - [`replay`] - Timestamp freshness and nonce history
//! - [`sign`] - Client-side request signing

pub mod error;
pub mod gate;
pub mod header;
pub mod keypair;
pub mod mac;
pub mod normalize;
pub mod replay;
pub mod sign;

pub use error::{AuthError, RepositoryError};
pub use gate::{AuthorizationGate, GateConfig, GateDecision, Principal, Rejection};
pub use header::{AuthParams, parse_auth_header};
pub use keypair::{InMemoryKeyPairRepository, KeyPair, KeyPairRepository, MacSecret};
pub use normalize::{RequestMeta, build_canonical_string};
pub use sign::RequestSigner;
