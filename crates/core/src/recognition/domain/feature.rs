use thiserror::Error;

use crate::shared::constants::FEATURE_DIM;

#[derive(Error, Debug)]
pub enum FeatureDecodeError {
    #[error("feature blob has {actual} bytes, expected {expected}")]
    WrongLength { actual: usize, expected: usize },
}

/// A fixed-size face feature vector.
///
/// Produced by the perception engine, persisted as a little-endian
/// blob by the feature store. The dimensionality is fixed for the
/// lifetime of a store; mixing dimensions is a decode error.
#[derive(Clone, Debug, PartialEq)]
pub struct Feature {
    values: Vec<f32>,
}

impl Feature {
    pub fn new(values: Vec<f32>) -> Self {
        debug_assert_eq!(values.len(), FEATURE_DIM, "feature must have FEATURE_DIM values");
        Self { values }
    }

    pub fn zeroed() -> Self {
        Self {
            values: vec![0.0; FEATURE_DIM],
        }
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.values.len() * 4);
        for v in &self.values {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FeatureDecodeError> {
        if bytes.len() != FEATURE_DIM * 4 {
            return Err(FeatureDecodeError::WrongLength {
                actual: bytes.len(),
                expected: FEATURE_DIM * 4,
            });
        }
        let values = bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Ok(Self { values })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_round_trip() {
        let mut values = vec![0.0f32; FEATURE_DIM];
        values[0] = 1.5;
        values[FEATURE_DIM - 1] = -0.25;
        let feature = Feature::new(values);
        let decoded = Feature::from_bytes(&feature.to_bytes()).unwrap();
        assert_eq!(decoded, feature);
    }

    #[test]
    fn test_from_bytes_rejects_wrong_length() {
        let err = Feature::from_bytes(&[0u8; 7]).unwrap_err();
        assert!(matches!(err, FeatureDecodeError::WrongLength { actual: 7, .. }));
    }

    #[test]
    fn test_zeroed_has_full_dimension() {
        assert_eq!(Feature::zeroed().as_slice().len(), FEATURE_DIM);
    }
}
