use rand::Rng;

/// Hash a plaintext password for storage.
pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
}

/// Check a password against a stored hash. Anything that is not a valid
/// bcrypt hash (placeholder strings included) never verifies.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    bcrypt::verify(password, stored_hash).unwrap_or(false)
}

/// A stored value no password can match, for accounts that must not log in.
pub fn unusable_hash() -> String {
    let bytes: [u8; 16] = rand::thread_rng().gen();
    format!("!{}", hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("x").unwrap();
        assert!(verify_password("x", &hash));
        assert!(!verify_password("y", &hash));
    }

    #[test]
    fn literal_placeholder_hash_never_verifies() {
        assert!(!verify_password("demo", "demo"));
        assert!(!verify_password("anything", "demo"));
    }

    #[test]
    fn unusable_hash_never_verifies() {
        let hash = unusable_hash();
        assert!(hash.starts_with('!'));
        assert!(!verify_password("", &hash));
        assert!(!verify_password(&hash, &hash));
    }
}
