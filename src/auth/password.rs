//! Password hashing and verification.
//!
//! New hashes are always bcrypt. The salted SHA-256 form
//! `sha256$<hex salt>$<hex digest>` is only ever verified, so existing
//! accounts keep working until their next successful login rehashes them.

use std::fmt;

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;

pub const BCRYPT_COST: u32 = 10;

const LEGACY_TAG: &str = "sha256";
const BCRYPT_PREFIXES: [&str; 3] = ["$2a$", "$2b$", "$2y$"];

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("password cannot be empty")]
    Empty,

    #[error("password hashing failed: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),
}

/// A stored credential, parsed once from its text form.
#[derive(Clone, PartialEq, Eq)]
pub enum PasswordHash {
    Legacy { salt: Vec<u8>, digest: Vec<u8> },
    Bcrypt(String),
}

impl PasswordHash {
    /// `None` for anything that is not a well-formed legacy or bcrypt hash.
    pub fn parse(stored: &str) -> Option<Self> {
        if BCRYPT_PREFIXES.iter().any(|p| stored.starts_with(p)) {
            return Some(PasswordHash::Bcrypt(stored.to_string()));
        }

        let parts: Vec<&str> = stored.split('$').collect();
        let [tag, salt, digest] = parts.as_slice() else {
            return None;
        };
        if *tag != LEGACY_TAG || digest.is_empty() {
            return None;
        }
        Some(PasswordHash::Legacy {
            salt: hex::decode(salt).ok()?,
            digest: hex::decode(digest).ok()?,
        })
    }

    /// Builds a legacy hash. Only used to seed and test migrations.
    pub fn legacy(salt: &[u8], plaintext: &str) -> Self {
        PasswordHash::Legacy {
            salt: salt.to_vec(),
            digest: legacy_digest(salt, plaintext),
        }
    }

    pub fn verify(&self, plaintext: &str) -> bool {
        if plaintext.is_empty() {
            return false;
        }
        match self {
            PasswordHash::Bcrypt(encoded) => bcrypt::verify(plaintext, encoded).unwrap_or(false),
            PasswordHash::Legacy { salt, digest } => {
                let computed = legacy_digest(salt, plaintext);
                computed.len() == digest.len() && bool::from(computed.ct_eq(digest))
            }
        }
    }

    pub fn needs_rehash(&self) -> bool {
        matches!(self, PasswordHash::Legacy { .. })
    }

    /// Short indicator safe to log: scheme and cost, never the salt or digest.
    pub fn hint(&self) -> String {
        match self {
            PasswordHash::Legacy { .. } => format!("{}$…", LEGACY_TAG),
            PasswordHash::Bcrypt(encoded) => format!("{}…", encoded.get(..7).unwrap_or("$2?$")),
        }
    }
}

impl fmt::Display for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PasswordHash::Legacy { salt, digest } => {
                write!(f, "{}${}${}", LEGACY_TAG, hex::encode(salt), hex::encode(digest))
            }
            PasswordHash::Bcrypt(encoded) => f.write_str(encoded),
        }
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PasswordHash({})", self.hint())
    }
}

fn legacy_digest(salt: &[u8], plaintext: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(plaintext.as_bytes());
    hasher.finalize().to_vec()
}

pub fn hash_password(plaintext: &str) -> Result<PasswordHash, PasswordError> {
    if plaintext.is_empty() {
        return Err(PasswordError::Empty);
    }
    Ok(PasswordHash::Bcrypt(bcrypt::hash(plaintext, BCRYPT_COST)?))
}

/// Never fails: malformed or unknown hashes simply do not match.
pub fn verify_password(plaintext: &str, stored: &str) -> bool {
    PasswordHash::parse(stored).is_some_and(|hash| hash.verify(plaintext))
}
