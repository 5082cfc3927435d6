//! Password hashing with Argon2

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PasswordError {
    #[error("Hash error: {0}")]
    HashError(String),
    #[error("Password must be at least {0} characters")]
    TooShort(usize),
}

pub struct PasswordService;

impl PasswordService {
    pub fn validate(password: &str, min_length: usize) -> Result<(), PasswordError> {
        if password.chars().count() < min_length {
            return Err(PasswordError::TooShort(min_length));
        }
        Ok(())
    }

    pub fn hash(password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| PasswordError::HashError(e.to_string()))
    }

    pub fn verify(password: &str, hash: &str) -> Result<bool, PasswordError> {
        let parsed_hash = PasswordHash::new(hash).map_err(|e| PasswordError::HashError(e.to_string()))?;
        Ok(Argon2::default().verify_password(password.as_bytes(), &parsed_hash).is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_verify() {
        let hash = PasswordService::hash("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(PasswordService::verify("correct horse", &hash).unwrap());
        assert!(!PasswordService::verify("battery staple", &hash).unwrap());
        assert!(PasswordService::verify("x", "not-a-hash").is_err());
    }

    #[test]
    fn enforces_minimum_length() {
        assert!(PasswordService::validate("short", 8).is_err());
        assert!(PasswordService::validate("long enough", 8).is_ok());
    }
}
