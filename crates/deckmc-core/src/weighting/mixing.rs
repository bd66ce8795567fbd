use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Allowed deviation of `face + red` from one.
pub const MIXING_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Error, PartialEq)]
pub enum MixingError {
    #[error("mixing weight '{name}' must lie in [0, 1], got {value}")]
    OutOfRange { name: &'static str, value: f64 },
    #[error("mixing weights must sum to 1, got {sum}")]
    DoesNotSumToOne { sum: f64 },
}

/// Convex combination used by the balance heuristic's denominator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMixingWeights")]
pub struct MixingWeights {
    face: f64,
    red: f64,
}

impl MixingWeights {
    pub fn new(face: f64, red: f64) -> Result<Self, MixingError> {
        for (name, value) in [("face", face), ("red", red)] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(MixingError::OutOfRange { name, value });
            }
        }
        let sum = face + red;
        if (sum - 1.0).abs() > MIXING_TOLERANCE {
            return Err(MixingError::DoesNotSumToOne { sum });
        }
        Ok(Self { face, red })
    }

    pub const fn face(&self) -> f64 {
        self.face
    }

    pub const fn red(&self) -> f64 {
        self.red
    }
}

impl Default for MixingWeights {
    fn default() -> Self {
        Self {
            face: 0.5,
            red: 0.5,
        }
    }
}

#[derive(Deserialize)]
struct RawMixingWeights {
    face: f64,
    red: f64,
}

impl TryFrom<RawMixingWeights> for MixingWeights {
    type Error = MixingError;

    fn try_from(raw: RawMixingWeights) -> Result<Self, Self::Error> {
        MixingWeights::new(raw.face, raw.red)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_even_split() {
        let weights = MixingWeights::default();
        assert_eq!(weights.face(), 0.5);
        assert_eq!(weights.red(), 0.5);
    }

    #[test]
    fn rejects_weights_that_do_not_sum_to_one() {
        assert!(matches!(
            MixingWeights::new(0.5, 0.6),
            Err(MixingError::DoesNotSumToOne { sum }) if (sum - 1.1).abs() < 1e-12
        ));
        assert!(MixingWeights::new(0.3, 0.7).is_ok());
    }

    #[test]
    fn rejects_out_of_range_components() {
        assert!(matches!(
            MixingWeights::new(1.5, -0.5),
            Err(MixingError::OutOfRange { name: "face", .. })
        ));
        assert!(matches!(
            MixingWeights::new(0.5, f64::NAN),
            Err(MixingError::OutOfRange { name: "red", .. })
        ));
    }

    #[test]
    fn deserialization_validates() {
        let ok: MixingWeights = serde_json::from_str(r#"{"face":0.25,"red":0.75}"#).expect("valid");
        assert_eq!(ok.red(), 0.75);
        assert!(serde_json::from_str::<MixingWeights>(r#"{"face":0.25,"red":0.25}"#).is_err());
    }
}
