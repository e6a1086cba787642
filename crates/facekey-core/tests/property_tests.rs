//! Property-based tests for facekey-core using proptest
//!
//! These tests verify invariants that should hold for all valid inputs.

use proptest::prelude::*;
use facekey_core::{FaceEncoding, FaceMatcher, PersistedState, ENCODING_DIMENSIONS};

// ============================================
// Arbitrary Implementations
// ============================================

fn arb_encoding() -> impl Strategy<Value = FaceEncoding> {
    prop::collection::vec(-1.0f64..1.0, ENCODING_DIMENSIONS).prop_map(FaceEncoding::new)
}

fn arb_state() -> impl Strategy<Value = PersistedState> {
    (
        prop::option::of("[0-9a-f]{32}"),
        prop::option::of("[ -~]{0,40}"),
        prop::collection::vec(arb_encoding(), 0..6),
    )
        .prop_map(|(auth_token, password, face_encodings)| PersistedState {
            auth_token,
            password,
            face_encodings,
        })
}

// ============================================
// Persisted record
// ============================================

proptest! {
    #[test]
    fn record_save_load_save_is_stable(state in arb_state()) {
        let saved = state.to_json().unwrap();
        let reloaded = PersistedState::from_json(&saved).unwrap();
        prop_assert_eq!(&reloaded, &state);
        prop_assert_eq!(reloaded.to_json().unwrap(), saved);
    }
}

// ============================================
// Matcher
// ============================================

proptest! {
    #[test]
    fn empty_enrollment_never_matches(candidate in arb_encoding(), tolerance in 0.0f64..100.0) {
        let matcher = FaceMatcher::new(tolerance);
        prop_assert!(!matcher.is_match(&candidate, &[]));
    }

    #[test]
    fn encoding_always_matches_itself(candidate in arb_encoding()) {
        let matcher = FaceMatcher::default();
        prop_assert!(matcher.is_match(&candidate, &[candidate.clone()]));
    }

    #[test]
    fn match_result_ignores_order(
        candidate in arb_encoding(),
        mut known in prop::collection::vec(arb_encoding(), 0..8),
    ) {
        let matcher = FaceMatcher::default();
        let forward = matcher.is_match(&candidate, &known);
        known.reverse();
        prop_assert_eq!(forward, matcher.is_match(&candidate, &known));
    }

    #[test]
    fn distance_is_symmetric(a in arb_encoding(), b in arb_encoding()) {
        prop_assert_eq!(a.distance(&b), b.distance(&a));
    }
}
