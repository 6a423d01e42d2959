//! The authorization gate guarding protected operations.
//!
//! The gate walks a request through the authentication pipeline:
//!
//! ```text
//! NoCredentials --parse--> CredentialsResolved --verify--> Authorized
//!       |                        |                            |
//!       +------------------------+--------> Rejected <--------+ (replayed nonce)
//! ```
//!
//! 1. Parse the `Authorization` header
//! 2. Check timestamp freshness
//! 3. Decode the MAC and build the canonical string
//! 4. Resolve the keypair by id and verify the MAC in constant time
//! 5. Record the nonce, rejecting replays
//!
//! The protected operation runs only once the request reaches `Authorized`.
//! Every credential failure yields the same challenge, so a client cannot
//! tell an unknown key id from a bad signature.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tentd_core::{EntityRef, TentdConfig};
use tracing::{debug, error, warn};

use crate::error::AuthError;
use crate::header::parse_auth_header;
use crate::keypair::KeyPairRepository;
use crate::mac::{decode_mac, verify_mac};
use crate::normalize::{RequestMeta, build_canonical_string};
use crate::replay::{NonceCache, check_freshness};

/// Value of the `WWW-Authenticate` header on a challenge.
pub const CHALLENGE_SCHEME: &str = "MAC";

/// Body of every challenge response.
pub const CHALLENGE_BODY: &str = "Invalid MAC Credentials\n";

const UNKNOWN_KEY_SECRET: &[u8] = &[b'0'; 64];

/// Settings for the [`AuthorizationGate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateConfig {
    /// Maximum distance between request timestamp and server clock.
    pub freshness_window: Duration,
    /// Maximum number of remembered nonces per key id.
    pub nonce_cache_capacity: usize,
    /// Port used in the canonical string when the request names none.
    pub default_port: u16,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self::from(&TentdConfig::default())
    }
}

impl From<&TentdConfig> for GateConfig {
    fn from(config: &TentdConfig) -> Self {
        Self {
            freshness_window: Duration::from_secs(config.freshness_window_secs),
            nonce_cache_capacity: config.nonce_cache_capacity,
            default_port: config.default_port,
        }
    }
}

/// The identity a request was authenticated as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Id of the keypair that signed the request.
    pub key_id: String,
    /// Entity owning that keypair.
    pub owner: EntityRef,
}

/// Why a request was refused.
///
/// The wrapped [`AuthError`] is for logging only; the response built from a
/// rejection depends solely on whether the failure was operational.
#[derive(Debug)]
pub struct Rejection {
    error: AuthError,
}

impl Rejection {
    /// The internal reason for the rejection.
    #[must_use]
    pub fn error(&self) -> &AuthError {
        &self.error
    }

    /// HTTP status to respond with: 401 for credential problems, 503 when the
    /// keypair repository is unavailable.
    #[must_use]
    pub fn status(&self) -> http::StatusCode {
        self.error.status_code()
    }

    /// Whether the response should carry a `WWW-Authenticate` challenge.
    #[must_use]
    pub fn is_challenge(&self) -> bool {
        !self.error.is_operational()
    }
}

impl From<AuthError> for Rejection {
    fn from(error: AuthError) -> Self {
        Self { error }
    }
}

/// Outcome of [`AuthorizationGate::authorize`].
#[derive(Debug)]
pub enum GateDecision {
    /// The request is authentic; the protected operation may run.
    Authorized(Principal),
    /// The request must be refused.
    Challenge(Rejection),
}

/// Orchestrates parsing, lookup, verification, and replay checks.
pub struct AuthorizationGate {
    repository: Arc<dyn KeyPairRepository>,
    nonces: NonceCache,
    config: GateConfig,
}

impl std::fmt::Debug for AuthorizationGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationGate")
            .field("repository", &"...")
            .field("nonces", &self.nonces.len())
            .field("config", &self.config)
            .finish()
    }
}

impl AuthorizationGate {
    /// Create a gate backed by `repository`.
    #[must_use]
    pub fn new(repository: Arc<dyn KeyPairRepository>, config: GateConfig) -> Self {
        Self {
            repository,
            nonces: NonceCache::new(config.freshness_window, config.nonce_cache_capacity),
            config,
        }
    }

    /// The gate's settings.
    #[must_use]
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// The nonce history, exposed for periodic purging.
    #[must_use]
    pub fn nonces(&self) -> &NonceCache {
        &self.nonces
    }

    /// Decide whether a request is authentic.
    #[must_use]
    pub fn authorize(&self, request: &RequestMeta) -> GateDecision {
        self.authorize_at(request, Utc::now().timestamp())
    }

    /// Decide whether a request is authentic against an explicit clock.
    #[must_use]
    pub fn authorize_at(&self, request: &RequestMeta, now: i64) -> GateDecision {
        match self.verify(request, now) {
            Ok(principal) => {
                debug!(key_id = %principal.key_id, owner = %principal.owner, "request authorized");
                GateDecision::Authorized(principal)
            }
            Err(err) if err.is_operational() => {
                error!(error = %err, "authorization failed on repository error");
                GateDecision::Challenge(err.into())
            }
            Err(err) => {
                warn!(
                    reason = err.kind(),
                    method = %request.method,
                    path = %request.path,
                    "request rejected"
                );
                GateDecision::Challenge(err.into())
            }
        }
    }

    /// Run `op` only if the request is authorized.
    ///
    /// # Errors
    ///
    /// Returns the [`Rejection`] without calling `op` when authorization fails.
    pub fn guard<T>(
        &self,
        request: &RequestMeta,
        op: impl FnOnce(&Principal) -> T,
    ) -> Result<T, Rejection> {
        match self.authorize(request) {
            GateDecision::Authorized(principal) => Ok(op(&principal)),
            GateDecision::Challenge(rejection) => Err(rejection),
        }
    }

    fn verify(&self, request: &RequestMeta, now: i64) -> Result<Principal, AuthError> {
        let params = parse_auth_header(request.authorization.as_deref())?;

        let ts = params.timestamp()?;
        check_freshness(ts, now, self.config.freshness_window.as_secs())?;

        let supplied =
            decode_mac(&params.mac).ok_or(AuthError::MalformedHeader("mac is not base64"))?;
        let canonical = build_canonical_string(&params, request);

        let Some(keypair) = self.repository.lookup(&params.id)? else {
            // Match the HMAC cost of a known id.
            let _ = std::hint::black_box(verify_mac(UNKNOWN_KEY_SECRET, &canonical, &supplied));
            return Err(AuthError::UnknownKeyId);
        };

        if !verify_mac(keypair.secret().expose().as_bytes(), &canonical, &supplied) {
            debug!(key_id = %params.id, canonical = ?canonical, "MAC mismatch");
            return Err(AuthError::SignatureMismatch);
        }

        self.nonces.check_and_record(&params.id, &params.nonce, ts, now)?;

        Ok(Principal {
            key_id: keypair.id().to_owned(),
            owner: keypair.owner().clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::error::RepositoryError;
    use crate::keypair::{InMemoryKeyPairRepository, KeyPair};
    use crate::sign::RequestSigner;

    const NOW: i64 = 1_700_000_000;

    fn setup() -> (AuthorizationGate, KeyPair) {
        let repo = Arc::new(InMemoryKeyPairRepository::new());
        let keypair = repo
            .issue(EntityRef::new("https://alice.example.com").unwrap())
            .unwrap();
        let gate = AuthorizationGate::new(repo, GateConfig::default());
        (gate, keypair)
    }

    fn request() -> RequestMeta {
        RequestMeta {
            method: "GET".to_owned(),
            path: "/followers/abc".to_owned(),
            query: String::new(),
            host: "tent.example.com".to_owned(),
            port: 80,
            authorization: None,
        }
    }

    fn signed(keypair: &KeyPair, nonce: &str) -> RequestMeta {
        signed_at(keypair, nonce, NOW)
    }

    fn signed_at(keypair: &KeyPair, nonce: &str, ts: i64) -> RequestMeta {
        let mut req = request();
        let header = RequestSigner::new(keypair.id(), keypair.secret().expose())
            .sign(&req, ts, nonce, None);
        req.authorization = Some(header.to_string());
        req
    }

    fn rejection(decision: GateDecision) -> Rejection {
        match decision {
            GateDecision::Challenge(r) => r,
            GateDecision::Authorized(p) => panic!("unexpectedly authorized as {p:?}"),
        }
    }

    #[test]
    fn test_should_authorize_valid_request_and_run_op_once() {
        let (gate, keypair) = setup();
        let req = signed_at(&keypair, "n1", Utc::now().timestamp());
        let calls = Cell::new(0);

        let principal = gate
            .guard(&req, |p| {
                calls.set(calls.get() + 1);
                p.clone()
            })
            .unwrap_or_else(|r| panic!("rejected: {:?}", r.error()));

        assert_eq!(calls.get(), 1);
        assert_eq!(principal.key_id, keypair.id());
        assert_eq!(principal.owner.as_str(), "https://alice.example.com");
    }

    #[test]
    fn test_should_reject_wrong_secret_without_running_op() {
        let (gate, keypair) = setup();
        let mut req = request();
        let header = RequestSigner::new(keypair.id(), "not-the-secret").sign(&req, NOW, "n1", None);
        req.authorization = Some(header.to_string());

        let r = rejection(gate.authorize_at(&req, NOW));
        assert!(matches!(r.error(), AuthError::SignatureMismatch));
        assert_eq!(r.status(), http::StatusCode::UNAUTHORIZED);
        assert!(r.is_challenge());
    }

    #[test]
    fn test_should_reject_unknown_id_like_wrong_secret() {
        let (gate, keypair) = setup();

        let mut unknown = request();
        let header = RequestSigner::new("unknown", keypair.secret().expose()).sign(
            &unknown,
            NOW,
            "n1",
            None,
        );
        unknown.authorization = Some(header.to_string());

        let mut wrong = request();
        let header = RequestSigner::new(keypair.id(), "bad").sign(&wrong, NOW, "n2", None);
        wrong.authorization = Some(header.to_string());

        let a = rejection(gate.authorize_at(&unknown, NOW));
        let b = rejection(gate.authorize_at(&wrong, NOW));
        assert!(matches!(a.error(), AuthError::UnknownKeyId));
        assert_eq!(a.status(), b.status());
        assert_eq!(a.is_challenge(), b.is_challenge());
    }

    #[test]
    fn test_should_reject_missing_header() {
        let (gate, _) = setup();
        let r = rejection(gate.authorize_at(&request(), NOW));
        assert!(matches!(r.error(), AuthError::MalformedHeader(_)));
        assert_eq!(r.status(), http::StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_should_reject_replayed_nonce() {
        let (gate, keypair) = setup();
        let req = signed(&keypair, "once");

        assert!(matches!(
            gate.authorize_at(&req, NOW),
            GateDecision::Authorized(_)
        ));
        let r = rejection(gate.authorize_at(&req, NOW));
        assert!(matches!(r.error(), AuthError::ReplayedNonce));
    }

    #[test]
    fn test_should_not_record_nonce_of_unverified_request() {
        let (gate, keypair) = setup();
        let mut forged = request();
        let header = RequestSigner::new(keypair.id(), "bad").sign(&forged, NOW, "n1", None);
        forged.authorization = Some(header.to_string());
        let _ = gate.authorize_at(&forged, NOW);

        assert!(gate.nonces().is_empty());
        assert!(matches!(
            gate.authorize_at(&signed(&keypair, "n1"), NOW),
            GateDecision::Authorized(_)
        ));
    }

    #[test]
    fn test_should_reject_stale_timestamp() {
        let (gate, keypair) = setup();
        let req = signed(&keypair, "n1");
        let later = NOW + 301;

        let r = rejection(gate.authorize_at(&req, later));
        assert!(matches!(r.error(), AuthError::ExpiredTimestamp));
    }

    #[test]
    fn test_should_reject_tampered_path() {
        let (gate, keypair) = setup();
        let mut req = signed(&keypair, "n1");
        req.path = "/followers/other".to_owned();

        let r = rejection(gate.authorize_at(&req, NOW));
        assert!(matches!(r.error(), AuthError::SignatureMismatch));
    }

    #[test]
    fn test_should_reject_non_base64_mac() {
        let (gate, keypair) = setup();
        let mut req = request();
        req.authorization = Some(format!(
            "MAC id=\"{}\", ts=\"{NOW}\", nonce=\"n\", mac=\"%%%\"",
            keypair.id()
        ));

        let r = rejection(gate.authorize_at(&req, NOW));
        assert!(matches!(r.error(), AuthError::MalformedHeader(_)));
    }

    #[test]
    fn test_should_reject_malformed_mac_before_resolving_unknown_id() {
        let (gate, _) = setup();
        let mut req = request();
        req.authorization = Some(format!(
            "MAC id=\"missing\", ts=\"{NOW}\", nonce=\"n\", mac=\"%%%\""
        ));

        let r = rejection(gate.authorize_at(&req, NOW));
        assert!(matches!(r.error(), AuthError::MalformedHeader(_)));
    }

    #[test]
    fn test_should_verify_against_placeholder_secret_for_unknown_id() {
        let (gate, _) = setup();
        let mut req = request();
        let placeholder = std::str::from_utf8(UNKNOWN_KEY_SECRET).unwrap();
        let header = RequestSigner::new("missing", placeholder).sign(&req, NOW, "n1", None);
        req.authorization = Some(header.to_string());

        // Even a MAC valid under the placeholder secret is refused.
        let r = rejection(gate.authorize_at(&req, NOW));
        assert!(matches!(r.error(), AuthError::UnknownKeyId));
        assert!(gate.nonces().is_empty());
    }

    #[test]
    fn test_should_reject_replay_signed_at_far_edge_of_window() {
        let repo = Arc::new(InMemoryKeyPairRepository::new());
        let keypair = repo
            .issue(EntityRef::new("https://alice.example.com").unwrap())
            .unwrap();
        let config = GateConfig {
            freshness_window: Duration::from_secs(1),
            ..GateConfig::default()
        };
        let gate = AuthorizationGate::new(repo, config);

        // Signed one window ahead of the server clock.
        let req = signed_at(&keypair, "edge", NOW + 1);
        assert!(matches!(
            gate.authorize_at(&req, NOW),
            GateDecision::Authorized(_)
        ));

        // Still fresh two seconds later, so the replay must be caught.
        let r = rejection(gate.authorize_at(&req, NOW + 2));
        assert!(matches!(r.error(), AuthError::ReplayedNonce));

        gate.nonces().purge_expired_at(NOW + 2);
        let r = rejection(gate.authorize_at(&req, NOW + 2));
        assert!(matches!(r.error(), AuthError::ReplayedNonce));

        let r = rejection(gate.authorize_at(&req, NOW + 3));
        assert!(matches!(r.error(), AuthError::ExpiredTimestamp));
    }

    #[test]
    fn test_should_keep_other_keys_authorizing_when_one_key_is_full() {
        let repo = Arc::new(InMemoryKeyPairRepository::new());
        let owner = EntityRef::new("https://alice.example.com").unwrap();
        let key_a = repo.issue(owner.clone()).unwrap();
        let key_b = repo.issue(owner).unwrap();
        let config = GateConfig {
            nonce_cache_capacity: 3,
            ..GateConfig::default()
        };
        let gate = AuthorizationGate::new(repo, config);

        for i in 0..3 {
            assert!(matches!(
                gate.authorize_at(&signed(&key_a, &format!("a{i}")), NOW),
                GateDecision::Authorized(_)
            ));
        }
        let r = rejection(gate.authorize_at(&signed(&key_a, "a3"), NOW));
        assert!(matches!(r.error(), AuthError::NonceCacheFull));
        assert_eq!(r.status(), http::StatusCode::UNAUTHORIZED);
        assert!(r.is_challenge());

        assert!(matches!(
            gate.authorize_at(&signed(&key_b, "b0"), NOW),
            GateDecision::Authorized(_)
        ));
    }

    #[test]
    fn test_should_reject_revoked_keypair() {
        let repo = Arc::new(InMemoryKeyPairRepository::new());
        let keypair = repo
            .issue(EntityRef::new("https://alice.example.com").unwrap())
            .unwrap();
        let gate = AuthorizationGate::new(repo.clone(), GateConfig::default());
        repo.revoke(keypair.id()).unwrap();

        let r = rejection(gate.authorize_at(&signed(&keypair, "n1"), NOW));
        assert!(matches!(r.error(), AuthError::UnknownKeyId));
    }

    struct FailingRepository;

    impl KeyPairRepository for FailingRepository {
        fn issue(&self, _owner: EntityRef) -> Result<KeyPair, RepositoryError> {
            Err(RepositoryError::Backend("down".to_owned()))
        }

        fn lookup(&self, _id: &str) -> Result<Option<KeyPair>, RepositoryError> {
            Err(RepositoryError::Backend("down".to_owned()))
        }

        fn revoke(&self, _id: &str) -> Result<bool, RepositoryError> {
            Err(RepositoryError::Backend("down".to_owned()))
        }
    }

    #[test]
    fn test_should_surface_repository_failure_as_operational() {
        let gate = AuthorizationGate::new(Arc::new(FailingRepository), GateConfig::default());
        let mut req = request();
        req.authorization = Some(format!(
            "MAC id=\"k\", ts=\"{NOW}\", nonce=\"n\", mac=\"Zm9v\""
        ));

        let r = rejection(gate.authorize_at(&req, NOW));
        assert!(matches!(r.error(), AuthError::RepositoryUnavailable(_)));
        assert_eq!(r.status(), http::StatusCode::SERVICE_UNAVAILABLE);
        assert!(!r.is_challenge());
    }
}
