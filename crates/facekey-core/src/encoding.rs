//! Face encodings
//!
//! A face encoding is a fixed-length feature vector summarizing one detected
//! face. Two encodings of the same person sit close together under Euclidean
//! distance.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ENCODING_DIMENSIONS;

/// Feature vector for a single face
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FaceEncoding(Vec<f64>);

impl FaceEncoding {
    /// Wrap a raw feature vector without validating its length
    ///
    /// Persisted enrollment sets are accepted as-is; mismatched lengths simply
    /// never match (see [`FaceEncoding::distance`]).
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    /// Wrap a feature vector, requiring the standard dimension count
    pub fn try_new(values: Vec<f64>) -> Result<Self> {
        if values.len() != ENCODING_DIMENSIONS {
            return Err(Error::EncodingLength {
                expected: ENCODING_DIMENSIONS,
                actual: values.len(),
            });
        }
        Ok(Self(values))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Euclidean distance to another encoding
    ///
    /// Returns `None` when the two vectors differ in length or either contains
    /// a non-finite component.
    pub fn distance(&self, other: &FaceEncoding) -> Option<f64> {
        if self.0.len() != other.0.len() || self.0.is_empty() {
            return None;
        }

        let sum: f64 = self
            .0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum();

        let distance = sum.sqrt();
        distance.is_finite().then_some(distance)
    }
}

impl From<Vec<f64>> for FaceEncoding {
    fn from(values: Vec<f64>) -> Self {
        Self::new(values)
    }
}

impl AsRef<[f64]> for FaceEncoding {
    fn as_ref(&self) -> &[f64] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_identical_is_zero() {
        let a = FaceEncoding::new(vec![0.1; ENCODING_DIMENSIONS]);
        assert_eq!(a.distance(&a.clone()), Some(0.0));
    }

    #[test]
    fn test_distance_known_value() {
        let a = FaceEncoding::new(vec![0.0, 0.0]);
        let b = FaceEncoding::new(vec![3.0, 4.0]);
        assert_eq!(a.distance(&b), Some(5.0));
    }

    #[test]
    fn test_distance_length_mismatch() {
        let a = FaceEncoding::new(vec![0.0; 128]);
        let b = FaceEncoding::new(vec![0.0; 127]);
        assert_eq!(a.distance(&b), None);
    }

    #[test]
    fn test_distance_nan_component() {
        let a = FaceEncoding::new(vec![f64::NAN, 0.0]);
        let b = FaceEncoding::new(vec![0.0, 0.0]);
        assert_eq!(a.distance(&b), None);
    }

    #[test]
    fn test_try_new_validates_length() {
        assert!(FaceEncoding::try_new(vec![0.0; ENCODING_DIMENSIONS]).is_ok());
        assert!(matches!(
            FaceEncoding::try_new(vec![0.0; 3]),
            Err(Error::EncodingLength { actual: 3, .. })
        ));
    }

    #[test]
    fn test_serializes_as_plain_list() {
        let a = FaceEncoding::new(vec![0.5, -0.25]);
        assert_eq!(serde_json::to_string(&a).unwrap(), "[0.5,-0.25]");
    }
}
