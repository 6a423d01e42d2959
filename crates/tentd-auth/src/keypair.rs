//! MAC keypairs and the repository that issues them.
//!
//! A [`KeyPair`] binds a public key id and a shared secret to the entity it
//! authenticates as. Keypairs are immutable once issued: the repository only
//! creates, reads, and deletes them.

use std::fmt;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rand::RngExt;
use tentd_core::EntityRef;
use tracing::{debug, info};

use crate::error::RepositoryError;

/// Number of random bytes in a key id.
const KEY_ID_BYTES: usize = 16;

/// Number of random bytes in a secret.
const SECRET_BYTES: usize = 32;

/// How many fresh ids [`InMemoryKeyPairRepository::issue`] tries before giving up.
pub const MAX_ISSUE_ATTEMPTS: usize = 8;

/// Shared signing secret.
///
/// `Debug` output is redacted; the value is only reachable through
/// [`MacSecret::expose`].
#[derive(Clone, PartialEq, Eq)]
pub struct MacSecret(String);

impl MacSecret {
    /// Wrap an existing secret value.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Generate a new 256-bit secret, hex encoded.
    #[must_use]
    pub fn generate() -> Self {
        Self(random_hex::<SECRET_BYTES>())
    }

    /// Access the secret value.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for MacSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MacSecret(<redacted>)")
    }
}

/// A MAC credential owned by one entity.
#[derive(Debug, Clone)]
pub struct KeyPair {
    id: String,
    secret: MacSecret,
    owner: EntityRef,
    created_at: DateTime<Utc>,
}

impl KeyPair {
    /// Assemble a keypair from stored parts.
    #[must_use]
    pub fn new(id: String, secret: MacSecret, owner: EntityRef, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            secret,
            owner,
            created_at,
        }
    }

    /// The public key id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The shared secret.
    #[must_use]
    pub fn secret(&self) -> &MacSecret {
        &self.secret
    }

    /// The entity this keypair authenticates as.
    #[must_use]
    pub fn owner(&self) -> &EntityRef {
        &self.owner
    }

    /// When the keypair was issued.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Storage capability the authentication core depends on.
///
/// Implementations must guarantee that two concurrent [`issue`](Self::issue)
/// calls never hand out the same id.
pub trait KeyPairRepository: Send + Sync {
    /// Issue a fresh keypair for `owner`.
    fn issue(&self, owner: EntityRef) -> Result<KeyPair, RepositoryError>;

    /// Look up a keypair by id. Absence is `Ok(None)`.
    fn lookup(&self, id: &str) -> Result<Option<KeyPair>, RepositoryError>;

    /// Delete a keypair. Returns whether it existed.
    fn revoke(&self, id: &str) -> Result<bool, RepositoryError>;

    /// Resolve the entity a key id belongs to.
    fn resolve_owner(&self, id: &str) -> Result<Option<EntityRef>, RepositoryError> {
        Ok(self.lookup(id)?.map(|keypair| keypair.owner().clone()))
    }
}

type IdGenerator = Box<dyn Fn() -> String + Send + Sync>;

/// In-memory keypair repository backed by a [`DashMap`].
///
/// Id uniqueness is enforced with the map's entry API, which locks the shard
/// holding the candidate id for the check and the insert.
pub struct InMemoryKeyPairRepository {
    keypairs: DashMap<String, KeyPair>,
    id_generator: IdGenerator,
}

impl InMemoryKeyPairRepository {
    /// Create an empty repository that generates random 128-bit hex ids.
    #[must_use]
    pub fn new() -> Self {
        Self::with_id_generator(generate_key_id)
    }

    /// Create an empty repository with a custom id generator.
    pub fn with_id_generator(generator: impl Fn() -> String + Send + Sync + 'static) -> Self {
        Self {
            keypairs: DashMap::new(),
            id_generator: Box::new(generator),
        }
    }

    /// Number of stored keypairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keypairs.len()
    }

    /// Whether the repository is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keypairs.is_empty()
    }
}

impl Default for InMemoryKeyPairRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for InMemoryKeyPairRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryKeyPairRepository")
            .field("len", &self.keypairs.len())
            .finish_non_exhaustive()
    }
}

impl KeyPairRepository for InMemoryKeyPairRepository {
    fn issue(&self, owner: EntityRef) -> Result<KeyPair, RepositoryError> {
        for _ in 0..MAX_ISSUE_ATTEMPTS {
            let id = (self.id_generator)();
            match self.keypairs.entry(id) {
                Entry::Occupied(e) => {
                    debug!(key_id = %e.key(), "key id already taken, regenerating");
                }
                Entry::Vacant(e) => {
                    let keypair =
                        KeyPair::new(e.key().clone(), MacSecret::generate(), owner, Utc::now());
                    e.insert(keypair.clone());
                    info!(key_id = %keypair.id(), owner = %keypair.owner(), "issued keypair");
                    return Ok(keypair);
                }
            }
        }

        Err(RepositoryError::IdSpaceExhausted {
            attempts: MAX_ISSUE_ATTEMPTS,
        })
    }

    fn lookup(&self, id: &str) -> Result<Option<KeyPair>, RepositoryError> {
        Ok(self.keypairs.get(id).map(|r| r.value().clone()))
    }

    fn revoke(&self, id: &str) -> Result<bool, RepositoryError> {
        let removed = self.keypairs.remove(id).is_some();
        if removed {
            info!(key_id = %id, "revoked keypair");
        }
        Ok(removed)
    }
}

/// Generate a random 128-bit key id, hex encoded.
#[must_use]
pub fn generate_key_id() -> String {
    random_hex::<KEY_ID_BYTES>()
}

pub(crate) fn random_hex<const N: usize>() -> String {
    let mut rng = rand::rng();
    let mut buf = [0u8; N];
    rng.fill(&mut buf);
    hex::encode(buf)
}
