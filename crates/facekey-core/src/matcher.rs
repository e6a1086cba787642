//! Biometric matcher
//!
//! Compares a candidate encoding against the enrolled set. A match is declared
//! when any enrolled encoding is within tolerance; there is no voting.

use crate::encoding::FaceEncoding;
use crate::DEFAULT_TOLERANCE;

/// Distance-based face matcher with a fixed tolerance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceMatcher {
    tolerance: f64,
}

impl Default for FaceMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE)
    }
}

impl FaceMatcher {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Distance from the candidate to each known encoding, in order
    ///
    /// Incomparable pairs (length mismatch, non-finite values) report
    /// `f64::INFINITY`.
    pub fn distances(&self, candidate: &FaceEncoding, known: &[FaceEncoding]) -> Vec<f64> {
        known
            .iter()
            .map(|k| candidate.distance(k).unwrap_or(f64::INFINITY))
            .collect()
    }

    /// Index of the first known encoding within tolerance
    pub fn find_match(&self, candidate: &FaceEncoding, known: &[FaceEncoding]) -> Option<usize> {
        known.iter().position(|k| {
            candidate
                .distance(k)
                .map(|d| d <= self.tolerance)
                .unwrap_or(false)
        })
    }

    /// Whether the candidate matches any known encoding
    ///
    /// Always false for an empty enrollment set.
    pub fn is_match(&self, candidate: &FaceEncoding, known: &[FaceEncoding]) -> bool {
        self.find_match(candidate, known).is_some()
    }
}
