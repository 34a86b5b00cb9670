//! User id hashing strategies.
//!
//! Storage is addressed by `hash(salt + user_id)` so raw user ids never
//! appear as storage keys.

use sha2::{Digest, Sha256};

use crate::util::{fnv1a_hash_bytes, fnv64, to_hex};

pub trait UserIdHasher {
    fn hash(&self, salted: &str) -> String;
}

/// Uses the salted id unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughHasher;

impl UserIdHasher for PassThroughHasher {
    fn hash(&self, salted: &str) -> String {
        salted.to_string()
    }
}

/// 16 hex digits of FNV-1a 64.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fnv1aHasher;

impl UserIdHasher for Fnv1aHasher {
    fn hash(&self, salted: &str) -> String {
        let hash = fnv1a_hash_bytes(fnv64::OFFSET_BASIS, salted.as_bytes());
        format!("{:016x}", hash)
    }
}

/// 64 hex digits of SHA-256.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl UserIdHasher for Sha256Hasher {
    fn hash(&self, salted: &str) -> String {
        to_hex(&Sha256::digest(salted.as_bytes()))
    }
}

/// Hashes `salt + user`.
pub fn hash_user_id(hasher: &dyn UserIdHasher, salt: &str, user: &str) -> String {
    let mut salted = String::with_capacity(salt.len() + user.len());
    salted.push_str(salt);
    salted.push_str(user);
    hasher.hash(&salted)
}
