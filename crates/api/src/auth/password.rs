//! Password hashing with Argon2

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Hash a password using Argon2id
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::Hashing(e.to_string()))
}

/// Verify a password against a stored hash.
/// A malformed hash is an error, a mismatch is `Ok(false)`.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| PasswordError::InvalidHash(e.to_string()))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Validate a password chosen at registration
pub fn validate_password_strength(password: &str) -> Result<(), PasswordValidationError> {
    let length = password.chars().count();

    if length < MIN_PASSWORD_LENGTH {
        return Err(PasswordValidationError::TooShort);
    }

    if length > MAX_PASSWORD_LENGTH {
        return Err(PasswordValidationError::TooLong);
    }

    if password.trim().is_empty() {
        return Err(PasswordValidationError::Blank);
    }

    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    Hashing(String),
    #[error("Invalid password hash: {0}")]
    InvalidHash(String),
}

#[derive(Debug, thiserror::Error)]
pub enum PasswordValidationError {
    #[error("password must be at least 8 characters")]
    TooShort,
    #[error("password must be at most 128 characters")]
    TooLong,
    #[error("password must not be blank")]
    Blank,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let password = "SecureP@ssw0rd123";
        let hash = hash_password(password).expect("Failed to hash password");

        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password(password, &hash).expect("Verification failed"));
        assert!(!verify_password("wrong_password", &hash).expect("Verification failed"));
    }

    #[test]
    fn test_malformed_hash_is_an_error() {
        assert!(matches!(
            verify_password("secret", "plaintext-in-the-hash-column"),
            Err(PasswordError::InvalidHash(_))
        ));
        assert!(matches!(
            verify_password("secret", ""),
            Err(PasswordError::InvalidHash(_))
        ));
    }

    #[test]
    fn test_password_length_requirements() {
        assert!(matches!(
            validate_password_strength("short"),
            Err(PasswordValidationError::TooShort)
        ));
        assert!(validate_password_strength("exactly8").is_ok());

        let long_password = "a".repeat(MAX_PASSWORD_LENGTH + 1);
        assert!(matches!(
            validate_password_strength(&long_password),
            Err(PasswordValidationError::TooLong)
        ));

        assert!(matches!(
            validate_password_strength("          "),
            Err(PasswordValidationError::Blank)
        ));
    }
}
