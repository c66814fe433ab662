//! Passcode verifier
//!
//! The passcode is never stored in recoverable form. A salted Argon2id hash
//! in PHC string format is kept instead and checked in constant time.

use crate::{Error, Result};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};
use rand::rngs::OsRng;
use stealth_params::{PinKdfParams, PASSCODE_LENGTH};

/// Check that `candidate` is exactly four ASCII digits
pub fn is_well_formed(candidate: &str) -> bool {
    candidate.len() == PASSCODE_LENGTH && candidate.bytes().all(|b| b.is_ascii_digit())
}

/// Salted one-way passcode verifier
#[derive(Clone, PartialEq, Eq)]
pub struct PasscodeVerifier {
    hash: String,
}

impl PasscodeVerifier {
    /// Hash a passcode with Argon2id
    pub fn hash(passcode: &str, params: &PinKdfParams) -> Result<Self> {
        if !is_well_formed(passcode) {
            return Err(Error::Validation(format!(
                "Passcode must be exactly {} digits",
                PASSCODE_LENGTH
            )));
        }

        let salt = SaltString::generate(&mut OsRng);

        let params = ParamsBuilder::new()
            .m_cost(params.memory_kib)
            .t_cost(params.iterations)
            .p_cost(params.lanes)
            .build()
            .map_err(|e| Error::Security(e.to_string()))?;

        let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params);

        let hash = argon2
            .hash_password(passcode.as_bytes(), &salt)
            .map_err(|e| Error::Security(e.to_string()))?
            .to_string();

        Ok(Self { hash })
    }

    /// Check a candidate against the stored hash.
    ///
    /// Cost parameters are read back from the PHC string.
    pub fn verify(&self, candidate: &str) -> Result<bool> {
        let parsed_hash =
            PasswordHash::new(&self.hash).map_err(|e| Error::Security(e.to_string()))?;

        Ok(Argon2::default()
            .verify_password(candidate.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Get hash string for storage
    pub fn hash_string(&self) -> &str {
        &self.hash
    }

    /// Load from stored hash, rejecting strings that are not Argon2id PHC
    pub fn from_hash(hash: String) -> Result<Self> {
        let algorithm = PasswordHash::new(&hash)
            .map_err(|e| Error::Security(e.to_string()))?
            .algorithm
            .to_string();
        if algorithm != "argon2id" {
            return Err(Error::Security(format!(
                "Unexpected verifier algorithm: {}",
                algorithm
            )));
        }
        Ok(Self { hash })
    }
}

impl std::fmt::Debug for PasscodeVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PasscodeVerifier(..)")
    }
}
