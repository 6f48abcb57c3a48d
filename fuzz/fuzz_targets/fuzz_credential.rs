#![no_main]

use libfuzzer_sys::fuzz_target;
use linkedin_core::{Credential, Provenance, Secret};

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(secret) = Secret::cookie(raw) {
        let value = secret.expose().to_string();
        assert!(!value.is_empty());
        assert!(!value.contains(';'));

        let credential = Credential::new(secret, Provenance::Environment);

        // Stored form must round-trip
        let json = serde_json::to_string(&credential).unwrap();
        let restored: Credential = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.fingerprint(), credential.fingerprint());
    }
});
