#![no_main]

use facekey_core::PersistedState;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // Try to parse - should not panic
    if let Ok(state) = PersistedState::from_json(text) {
        // A parsed record must survive save and reload unchanged
        let saved = state.to_json().expect("serialize parsed record");
        let reloaded = PersistedState::from_json(&saved).expect("reparse saved record");
        assert_eq!(reloaded.auth_token, state.auth_token);
        assert_eq!(reloaded.password, state.password);
        assert_eq!(reloaded.face_encodings.len(), state.face_encodings.len());
        assert_eq!(reloaded.to_json().expect("serialize reloaded record"), saved);
    }
});
