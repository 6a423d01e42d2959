//! Follower endpoints backed by a [`KeyPairRepository`].
//!
//! A follower is represented by the keypair issued to it: the keypair id is
//! the follower id, and a follower can only see or revoke its own record.

use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;
use serde::Deserialize;
use tentd_auth::mac::MAC_ALGORITHM;
use tentd_auth::{KeyPair, KeyPairRepository, Principal};
use tentd_core::EntityRef;
use tentd_http::response::{empty_response, json_response};
use tentd_http::{ApiError, HandlerFuture, TentdHandler, TentdOperation};
use tracing::info;

/// Body of `POST /followers`.
#[derive(Debug, Deserialize)]
struct FollowRequest {
    entity: EntityRef,
}

/// Handles follower registration, lookup, and revocation.
#[derive(Clone)]
pub struct FollowerHandler {
    repository: Arc<dyn KeyPairRepository>,
}

impl std::fmt::Debug for FollowerHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FollowerHandler")
            .field("repository", &"...")
            .finish()
    }
}

impl FollowerHandler {
    /// Create a handler over `repository`.
    pub fn new(repository: Arc<dyn KeyPairRepository>) -> Self {
        Self { repository }
    }

    fn follow(&self, body: &Bytes) -> Result<http::Response<Full<Bytes>>, ApiError> {
        let request: FollowRequest = serde_json::from_slice(body)
            .map_err(|e| ApiError::bad_request(format!("Invalid follow request: {e}")))?;

        let keypair = self.repository.issue(request.entity)?;
        info!(key_id = %keypair.id(), entity = %keypair.owner(), "follower registered");

        Ok(json_response(
            http::StatusCode::OK,
            &serde_json::json!({
                "id": keypair.id(),
                "entity": keypair.owner().as_str(),
                "mac_key_id": keypair.id(),
                "mac_key": keypair.secret().expose(),
                "mac_algorithm": MAC_ALGORITHM,
                "created_at": keypair.created_at().to_rfc3339(),
            }),
        ))
    }

    fn get_follower(
        &self,
        id: &str,
        principal: &Principal,
    ) -> Result<http::Response<Full<Bytes>>, ApiError> {
        let keypair = self.own_keypair(id, principal)?;
        Ok(json_response(
            http::StatusCode::OK,
            &serde_json::json!({
                "id": keypair.id(),
                "entity": keypair.owner().as_str(),
                "created_at": keypair.created_at().to_rfc3339(),
            }),
        ))
    }

    fn delete_follower(
        &self,
        id: &str,
        principal: &Principal,
    ) -> Result<http::Response<Full<Bytes>>, ApiError> {
        let keypair = self.own_keypair(id, principal)?;
        if !self.repository.revoke(keypair.id())? {
            return Err(follower_not_found(id));
        }
        info!(key_id = %keypair.id(), entity = %keypair.owner(), "follower revoked");
        Ok(empty_response())
    }

    /// Look up `id`, treating another follower's record as absent.
    fn own_keypair(&self, id: &str, principal: &Principal) -> Result<KeyPair, ApiError> {
        if id != principal.key_id {
            return Err(follower_not_found(id));
        }
        self.repository
            .lookup(id)?
            .ok_or_else(|| follower_not_found(id))
    }
}

fn follower_not_found(id: &str) -> ApiError {
    ApiError::not_found(format!("Follower {id} not found"))
}

fn missing_principal() -> ApiError {
    ApiError::internal_error("protected operation dispatched without a principal")
}

impl TentdHandler for FollowerHandler {
    fn handle_operation(
        &self,
        op: TentdOperation,
        principal: Option<Principal>,
        body: Bytes,
    ) -> HandlerFuture {
        let handler = self.clone();
        Box::pin(async move {
            match op {
                TentdOperation::Health => Ok(json_response(
                    http::StatusCode::OK,
                    &serde_json::json!({ "status": "running" }),
                )),
                TentdOperation::Follow => handler.follow(&body),
                TentdOperation::GetFollower { id } => {
                    let principal = principal.ok_or_else(missing_principal)?;
                    handler.get_follower(&id, &principal)
                }
                TentdOperation::DeleteFollower { id } => {
                    let principal = principal.ok_or_else(missing_principal)?;
                    handler.delete_follower(&id, &principal)
                }
            }
        })
    }
}
