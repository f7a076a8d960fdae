use sha2::{Digest, Sha256};

// SHA-256 of the deployment's original fixed pair; overridable via env.
const DEFAULT_ID_DIGEST: &str =
    "cf299630f090b648affee3c6d37eacf47ef88b6f6f2067f2011ece9a86835315";
const DEFAULT_SECRET_DIGEST: &str =
    "cf299630f090b648affee3c6d37eacf47ef88b6f6f2067f2011ece9a86835315";

pub fn sha256_hex(input: &str) -> String {
    let mut hasher: Sha256 = Digest::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Expected admin credential digests. Presented credentials are hashed and
/// compared; the plaintext pair is never stored or compared directly.
#[derive(Debug, Clone)]
pub struct AdminCredentials {
    id_digest: String,
    secret_digest: String,
}

impl AdminCredentials {
    pub fn new(id_digest: String, secret_digest: String) -> Self {
        AdminCredentials {
            id_digest,
            secret_digest,
        }
    }

    pub fn from_env() -> Self {
        let id_digest = std::env::var("CGPA_ADMIN_ID_SHA256")
            .unwrap_or_else(|_| DEFAULT_ID_DIGEST.to_string());
        let secret_digest = std::env::var("CGPA_ADMIN_SECRET_SHA256")
            .unwrap_or_else(|_| DEFAULT_SECRET_DIGEST.to_string());
        Self::new(id_digest, secret_digest)
    }

    pub fn verify(&self, id: &str, secret: &str) -> bool {
        sha256_hex(id) == self.id_digest && sha256_hex(secret) == self.secret_digest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_to_known_digest() {
        assert_eq!(
            sha256_hex("2020338027"),
            "cf299630f090b648affee3c6d37eacf47ef88b6f6f2067f2011ece9a86835315"
        );
    }

    #[test]
    fn verifies_matching_pair_only() {
        let creds = AdminCredentials::new(sha256_hex("operator"), sha256_hex("hunter2"));
        assert!(creds.verify("operator", "hunter2"));
        assert!(!creds.verify("operator", "wrong"));
        assert!(!creds.verify("wrong", "hunter2"));
        assert!(!creds.verify("", ""));
    }
}
