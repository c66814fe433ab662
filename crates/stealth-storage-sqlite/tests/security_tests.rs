//! Security tests for the passcode verifier and its storage
//!
//! Tests cover:
//! - No recoverable passcode in the state file
//! - Verifier round-trip through SQLite
//! - Tampered verifiers are rejected, never trusted

use parking_lot::Mutex;
use stealth_params::PinKdfParams;
use stealth_storage_sqlite::{
    is_well_formed, keys, Database, PasscodeVerifier, SessionStore, SqliteStore,
};
use std::sync::Arc;
use tempfile::TempDir;

fn fast_params() -> PinKdfParams {
    PinKdfParams {
        memory_kib: 1024,
        iterations: 1,
        lanes: 1,
    }
}

#[test]
fn test_state_file_holds_no_passcode() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("stealth.db");

    {
        let db = Arc::new(Mutex::new(Database::open(&path).unwrap()));
        let store = SqliteStore::new(db, "vault").unwrap();
        let verifier = PasscodeVerifier::hash("8642", &fast_params()).unwrap();
        store
            .set(keys::PASSCODE_VERIFIER, verifier.hash_string())
            .unwrap();
        store.set(keys::PASSCODE_CONFIGURED, "true").unwrap();
    }

    let db = Arc::new(Mutex::new(Database::open(&path).unwrap()));
    let dump: Vec<String> = {
        let guard = db.lock();
        let mut stmt = guard.conn().prepare("SELECT value FROM stealth_state").unwrap();
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        rows
    };
    assert!(dump.iter().all(|value| !value.contains("8642")));

    let store = SqliteStore::new(db, "vault").unwrap();
    let stored = store.get(keys::PASSCODE_VERIFIER).unwrap().unwrap();
    let verifier = PasscodeVerifier::from_hash(stored).unwrap();
    assert!(verifier.verify("8642").unwrap());
    assert!(!verifier.verify("8643").unwrap());
}

#[test]
fn test_tampered_verifier_rejected() {
    let verifier = PasscodeVerifier::hash("1234", &fast_params()).unwrap();
    let mut tampered = verifier.hash_string().to_string();
    tampered.truncate(tampered.len() - 4);
    tampered.push_str("AAAA");

    // Either unparseable or a plain mismatch.
    if let Ok(restored) = PasscodeVerifier::from_hash(tampered) {
        assert!(!restored.verify("1234").unwrap());
    }

    assert!(PasscodeVerifier::from_hash(String::new()).is_err());
    assert!(PasscodeVerifier::from_hash("plaintext:1234".to_string()).is_err());
}

#[test]
fn test_verifier_cost_follows_params() {
    let cheap = PasscodeVerifier::hash("0000", &fast_params()).unwrap();
    let custom = PasscodeVerifier::hash(
        "0000",
        &PinKdfParams {
            memory_kib: 2048,
            iterations: 3,
            lanes: 1,
        },
    )
    .unwrap();

    assert!(cheap.hash_string().contains("m=1024,t=1,p=1"));
    assert!(custom.hash_string().contains("m=2048,t=3,p=1"));
    assert!(custom.verify("0000").unwrap());
}

#[test]
fn test_every_well_formed_code_accepted() {
    for code in ["0000", "0001", "9999", "5050"] {
        assert!(is_well_formed(code));
    }
    for code in ["", "000", "00000", "-123", "12.3", "o000"] {
        assert!(!is_well_formed(code));
    }
}
