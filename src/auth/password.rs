/// Password Hashing and Verification
///
/// Argon2id with a 16-byte random salt and 32-byte output, stored as a
/// PHC string so verification can read the parameters back out.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

use crate::error::AuthError;

/// 64 MiB
const MEMORY_COST_KIB: u32 = 64 * 1024;
const ITERATIONS: u32 = 3;
const PARALLELISM: u32 = 2;
const OUTPUT_LENGTH: usize = 32;
/// Fixed salt for work done on behalf of a missing credential
const ABSENT_CREDENTIAL_SALT: &str = "Y2hpcnB5LWFic2VudC11c2Vy";

/// Argon2id hasher with fixed cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordHasher {
    memory_kib: u32,
    iterations: u32,
    parallelism: u32,
}

impl PasswordHasher {
    /// Recommended production parameters
    pub fn new() -> Self {
        Self {
            memory_kib: MEMORY_COST_KIB,
            iterations: ITERATIONS,
            parallelism: PARALLELISM,
        }
    }

    /// Custom cost parameters, e.g. a cheaper profile for local development
    pub fn with_params(memory_kib: u32, iterations: u32, parallelism: u32) -> Self {
        Self {
            memory_kib,
            iterations,
            parallelism,
        }
    }

    fn argon2(&self) -> Result<Argon2<'static>, AuthError> {
        let params = Params::new(
            self.memory_kib,
            self.iterations,
            self.parallelism,
            Some(OUTPUT_LENGTH),
        )
        .map_err(|e| AuthError::Hash(format!("invalid parameters: {}", e)))?;

        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    /// Hash a password into a self-describing credential string
    ///
    /// # Errors
    /// `AuthError::Hash` if the parameters are rejected or hashing fails
    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        use argon2::PasswordHasher as _;

        let salt = SaltString::generate(&mut OsRng);

        self.argon2()?
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Hash(e.to_string()))
    }

    /// Verify a password against a stored credential
    ///
    /// The cost parameters embedded in `credential` win over `self`'s.
    ///
    /// # Errors
    /// `AuthError::Hash` if the stored credential cannot be parsed
    pub fn verify(&self, password: &str, credential: &str) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(credential)
            .map_err(|e| AuthError::Hash(format!("unreadable credential: {}", e)))?;

        match self.argon2()?.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AuthError::Hash(e.to_string())),
        }
    }

    /// Spend one hash's worth of work when there is no credential to check
    ///
    /// Always `Ok(false)`; keeps an unknown account as slow as a wrong password.
    pub fn verify_absent(&self, password: &str) -> Result<bool, AuthError> {
        use argon2::PasswordHasher as _;

        let salt = SaltString::from_b64(ABSENT_CREDENTIAL_SALT)
            .map_err(|e| AuthError::Hash(e.to_string()))?;

        self.argon2()?
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::Hash(e.to_string()))?;

        Ok(false)
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Hash a password with the recommended parameters
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    PasswordHasher::new().hash(password)
}

/// Verify a password against a stored credential
pub fn verify_password(password: &str, credential: &str) -> Result<bool, AuthError> {
    PasswordHasher::new().verify(password, credential)
}
