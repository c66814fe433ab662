//! Passcode setup and verification
//!
//! The vault is the only writer of the passcode keys in its store. Every
//! failure mode leans towards refusing the unlock: an unreadable record is
//! never mistaken for a first run, since that would let anyone choose a new
//! passcode.

use crate::{Error, Result};
use stealth_params::PinKdfParams;
use stealth_storage_sqlite::{is_well_formed, keys, PasscodeVerifier, SessionStore};
use std::sync::Arc;

#[derive(Debug)]
enum PasscodeRecord {
    Unconfigured,
    Configured(PasscodeVerifier),
    /// Flag says configured but the record could not be read or parsed
    Unreadable,
}

/// Stores and checks the four-digit passcode
pub struct PinVault<S> {
    store: Arc<S>,
    kdf: PinKdfParams,
    record: PasscodeRecord,
}

impl<S: SessionStore + Sync> PinVault<S> {
    /// Load the passcode record from `store`
    pub fn load(store: Arc<S>, kdf: PinKdfParams) -> Self {
        let record = Self::read_record(store.as_ref());
        Self { store, kdf, record }
    }

    fn read_record(store: &S) -> PasscodeRecord {
        let configured = match store.get(keys::PASSCODE_CONFIGURED) {
            Ok(None) => return PasscodeRecord::Unconfigured,
            Ok(Some(flag)) => flag == "true",
            Err(e) => {
                tracing::warn!("Passcode flag unreadable: {}", e);
                return PasscodeRecord::Unreadable;
            }
        };
        if !configured {
            return PasscodeRecord::Unconfigured;
        }

        match store.get(keys::PASSCODE_VERIFIER) {
            Ok(Some(hash)) => match PasscodeVerifier::from_hash(hash) {
                Ok(verifier) => PasscodeRecord::Configured(verifier),
                Err(e) => {
                    tracing::warn!("Stored passcode verifier rejected: {}", e);
                    PasscodeRecord::Unreadable
                }
            },
            Ok(None) => {
                tracing::warn!("Passcode marked configured but verifier missing");
                PasscodeRecord::Unreadable
            }
            Err(e) => {
                tracing::warn!("Passcode verifier unreadable: {}", e);
                PasscodeRecord::Unreadable
            }
        }
    }

    /// `false` only on a genuine first run
    pub fn is_configured(&self) -> bool {
        !matches!(self.record, PasscodeRecord::Unconfigured)
    }

    /// First-run setup
    pub fn setup(&mut self, candidate: &str) -> Result<()> {
        match self.record {
            PasscodeRecord::Unconfigured => {}
            PasscodeRecord::Configured(_) => return Err(Error::AlreadyConfigured),
            PasscodeRecord::Unreadable => return Err(Error::Unavailable),
        }
        if !is_well_formed(candidate) {
            return Err(Error::InvalidFormat);
        }

        let verifier = PasscodeVerifier::hash(candidate, &self.kdf)?;
        self.persist(&verifier)?;
        self.record = PasscodeRecord::Configured(verifier);

        tracing::info!("Passcode configured");
        Ok(())
    }

    /// Check a candidate.
    ///
    /// Malformed candidates go through the same comparison and come back as
    /// a plain mismatch, so the two failures look alike from outside.
    pub fn verify(&self, candidate: &str) -> Result<bool> {
        let verifier = match &self.record {
            PasscodeRecord::Configured(verifier) => verifier,
            PasscodeRecord::Unconfigured => return Err(Error::NotConfigured),
            PasscodeRecord::Unreadable => return Ok(false),
        };

        let matched = match verifier.verify(candidate) {
            Ok(matched) => matched,
            Err(e) => {
                tracing::warn!("Passcode comparison failed: {}", e);
                false
            }
        };

        Ok(matched && is_well_formed(candidate))
    }

    /// Replace the passcode after checking the current one.
    ///
    /// On any error the stored verifier is left as it was.
    pub fn change(&mut self, current: &str, new: &str) -> Result<()> {
        if !self.verify(current)? {
            return Err(Error::Mismatch);
        }
        if !is_well_formed(new) {
            return Err(Error::InvalidFormat);
        }

        let verifier = PasscodeVerifier::hash(new, &self.kdf)?;
        self.persist(&verifier)?;
        self.record = PasscodeRecord::Configured(verifier);

        tracing::info!("Passcode changed");
        Ok(())
    }

    fn persist(&self, verifier: &PasscodeVerifier) -> Result<()> {
        // Verifier first: a crash in between leaves an unconfigured flag, never
        // a configured flag without a verifier.
        self.store
            .set(keys::PASSCODE_VERIFIER, verifier.hash_string())?;
        self.store.set(keys::PASSCODE_CONFIGURED, "true")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stealth_storage_sqlite::MemoryStore;

    fn fast_kdf() -> PinKdfParams {
        PinKdfParams {
            memory_kib: 1024,
            iterations: 1,
            lanes: 1,
        }
    }

    fn vault() -> (Arc<MemoryStore>, PinVault<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let vault = PinVault::load(Arc::clone(&store), fast_kdf());
        (store, vault)
    }

    #[test]
    fn test_fresh_vault_unconfigured() {
        let (_, vault) = vault();
        assert!(!vault.is_configured());
        assert!(matches!(vault.verify("1234"), Err(Error::NotConfigured)));
    }

    #[test]
    fn test_setup_then_verify() {
        let (store, mut vault) = vault();
        vault.setup("1234").unwrap();

        assert!(vault.is_configured());
        assert!(vault.verify("1234").unwrap());
        assert!(!vault.verify("4321").unwrap());
        assert!(!vault.verify("12a4").unwrap());
        assert!(!vault.verify("").unwrap());

        let stored = store.snapshot();
        assert_eq!(stored.get(keys::PASSCODE_CONFIGURED).map(String::as_str), Some("true"));
        assert!(!stored[keys::PASSCODE_VERIFIER].contains("1234"));
    }

    #[test]
    fn test_setup_rejects_bad_format() {
        let (store, mut vault) = vault();
        assert!(matches!(vault.setup("123"), Err(Error::InvalidFormat)));
        assert!(matches!(vault.setup("abcd"), Err(Error::InvalidFormat)));
        assert!(!vault.is_configured());
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn test_setup_only_once() {
        let (_, mut vault) = vault();
        vault.setup("1234").unwrap();
        assert!(matches!(vault.setup("5678"), Err(Error::AlreadyConfigured)));
        assert!(vault.verify("1234").unwrap());
    }

    #[test]
    fn test_reload_keeps_passcode() {
        let (store, mut vault) = vault();
        vault.setup("2468").unwrap();

        let reloaded = PinVault::load(Arc::clone(&store), fast_kdf());
        assert!(reloaded.is_configured());
        assert!(reloaded.verify("2468").unwrap());
    }

    #[test]
    fn test_repeated_failures_do_not_change_verifier() {
        let (store, mut vault) = vault();
        vault.setup("1357").unwrap();
        let before = store.snapshot();

        for attempt in ["0000", "1111", "abc", "13579", "1356"] {
            assert!(!vault.verify(attempt).unwrap());
        }

        assert_eq!(store.snapshot(), before);
        assert!(vault.verify("1357").unwrap());
    }

    #[test]
    fn test_change_passcode() {
        let (_, mut vault) = vault();
        vault.setup("1234").unwrap();

        assert!(matches!(vault.change("9999", "5678"), Err(Error::Mismatch)));
        assert!(matches!(vault.change("1234", "56"), Err(Error::InvalidFormat)));
        assert!(vault.verify("1234").unwrap());

        vault.change("1234", "5678").unwrap();
        assert!(vault.verify("5678").unwrap());
        assert!(!vault.verify("1234").unwrap());
    }

    #[test]
    fn test_unreadable_record_fails_closed() {
        let store = Arc::new(MemoryStore::new());
        store.set(keys::PASSCODE_CONFIGURED, "true").unwrap();
        store.set(keys::PASSCODE_VERIFIER, "plaintext-1234").unwrap();

        let mut vault = PinVault::load(Arc::clone(&store), fast_kdf());
        assert!(vault.is_configured());
        assert!(!vault.verify("1234").unwrap());
        assert!(matches!(vault.setup("1234"), Err(Error::Unavailable)));
    }

    #[test]
    fn test_storage_down_at_load_fails_closed() {
        let store = Arc::new(MemoryStore::new());
        store.set_reads_fail(true);

        let mut vault = PinVault::load(Arc::clone(&store), fast_kdf());
        assert!(vault.is_configured());
        assert!(matches!(vault.setup("1234"), Err(Error::Unavailable)));
    }

    #[test]
    fn test_setup_write_failure_leaves_unconfigured() {
        let (store, mut vault) = vault();
        store.set_writes_fail(true);

        assert!(matches!(vault.setup("1234"), Err(Error::Storage(_))));
        assert!(!vault.is_configured());
    }
}
