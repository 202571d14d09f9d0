use anyhow::Result;
use bcrypt::{hash, verify};
use brandhub_core::HubError;
use tracing::warn;

/// Hashes and checks credentials with bcrypt.
#[derive(Clone, Copy, Debug)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn hash(&self, password: &str) -> Result<String> {
        hash(password, self.cost).map_err(|e| {
            HubError::general_error("Failed to hash password")
                .with_source(e.into())
                .into_anyhow()
        })
    }

    /// A malformed stored hash counts as a mismatch.
    pub fn verify(&self, password: &str, stored: &str) -> bool {
        match verify(password, stored) {
            Ok(ok) => ok,
            Err(e) => {
                warn!(error = %e, "stored password hash is unreadable");
                false
            }
        }
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_verify_and_never_equal_plaintext() {
        let h = PasswordHasher::new(4);
        let stored = h.hash("correct horse").unwrap();
        assert_ne!(stored, "correct horse");
        assert!(h.verify("correct horse", &stored));
        assert!(!h.verify("wrong horse", &stored));
        assert!(!h.verify("correct horse", "not-a-bcrypt-hash"));
    }
}
