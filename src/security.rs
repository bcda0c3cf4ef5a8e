//! Shared upload secret.
//!
//! The secret is only ever held as an argon2 PHC string. Candidates are checked
//! with `Argon2::verify_password`, which compares digests in constant time, so the
//! plaintext never takes part in an equality test.

use anyhow::{anyhow, Result};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use password_hash::{PasswordHash, SaltString};

#[derive(Clone)]
pub struct SharedSecret {
    phc: String,
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSecret").finish_non_exhaustive()
    }
}

pub fn hash_secret(secret: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let argon2 = Argon2::default();
    let phc = argon2.hash_password(secret.as_bytes(), &salt).map_err(|e| anyhow!(e.to_string()))?.to_string();
    Ok(phc)
}

impl SharedSecret {
    /// Hash a plaintext secret once; the plaintext is dropped by the caller.
    pub fn from_plaintext(secret: &str) -> Result<Self> {
        if secret.is_empty() { return Err(anyhow!("upload secret must not be empty")); }
        Ok(Self { phc: hash_secret(secret)? })
    }

    /// Accept a pre-computed PHC string (e.g. from configuration).
    pub fn from_phc(phc: &str) -> Result<Self> {
        PasswordHash::new(phc).map_err(|e| anyhow!("invalid secret hash: {e}"))?;
        Ok(Self { phc: phc.to_string() })
    }

    pub fn phc(&self) -> &str { &self.phc }

    pub fn verify(&self, candidate: &str) -> bool {
        if let Ok(parsed) = PasswordHash::new(&self.phc) {
            Argon2::default().verify_password(candidate.as_bytes(), &parsed).is_ok()
        } else { false }
    }
}
