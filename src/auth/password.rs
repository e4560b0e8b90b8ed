//! Password Hashing
//! Salted bcrypt digests for stored credentials

use anyhow::{bail, Context, Result};
use bcrypt::{hash, verify, DEFAULT_COST};

/// Lowest cost bcrypt accepts
pub const MIN_COST: u32 = 4;
/// Highest cost bcrypt accepts
pub const MAX_COST: u32 = 31;
/// bcrypt ignores every byte past this many
pub const MAX_PASSWORD_BYTES: usize = 72;

/// One-way password hasher. Holds only the work factor.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    /// Create a hasher with the given cost, clamped to bcrypt's accepted range
    pub fn new(cost: u32) -> Self {
        Self {
            cost: cost.clamp(MIN_COST, MAX_COST),
        }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a plaintext password with a fresh random salt.
    /// Passwords over [`MAX_PASSWORD_BYTES`] are refused rather than truncated.
    pub fn hash(&self, plaintext: &str) -> Result<String> {
        if plaintext.len() > MAX_PASSWORD_BYTES {
            bail!("Password exceeds {MAX_PASSWORD_BYTES} bytes");
        }
        hash(plaintext, self.cost).context("Failed to hash password")
    }

    /// Check a plaintext password against a stored digest.
    ///
    /// A malformed digest is a mismatch, not an error. So is an over-long
    /// plaintext, which bcrypt would otherwise compare by its prefix only.
    pub fn verify(&self, plaintext: &str, digest: &str) -> bool {
        if plaintext.len() > MAX_PASSWORD_BYTES {
            return false;
        }
        verify(plaintext, digest).unwrap_or(false)
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_COST)
    }
}
