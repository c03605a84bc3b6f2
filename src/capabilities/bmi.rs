//! Body mass index calculation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Message returned in place of a result when either input is not positive
pub const INVALID_INPUT_MESSAGE: &str = "Weight and height must be positive numbers";

/// BMI weight class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BmiCategory {
    Underweight,
    #[serde(rename = "Normal weight")]
    NormalWeight,
    Overweight,
    Obese,
}

impl BmiCategory {
    /// Classify an unrounded BMI value. Thresholds are checked in ascending
    /// order and the first match wins.
    #[inline]
    pub fn classify(bmi: f64) -> Self {
        if bmi < 18.5 {
            Self::Underweight
        } else if bmi < 25.0 {
            Self::NormalWeight
        } else if bmi < 30.0 {
            Self::Overweight
        } else {
            Self::Obese
        }
    }

    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Underweight => "Underweight",
            Self::NormalWeight => "Normal weight",
            Self::Overweight => "Overweight",
            Self::Obese => "Obese",
        }
    }
}

impl fmt::Display for BmiCategory {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a BMI calculation.
///
/// Invalid input is reported as data (`{"error": ...}`) rather than as a
/// failure, so callers have to inspect the shape of the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BmiResult {
    Computed {
        bmi: f64,
        category: BmiCategory,
        weight_kg: f64,
        height_m: f64,
    },
    Invalid {
        error: String,
    },
}

impl BmiResult {
    #[inline]
    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid { .. })
    }
}

/// Calculate BMI given weight in kg and height in meters
#[inline]
pub fn calculate_bmi(weight_kg: f64, height_m: f64) -> BmiResult {
    // Written so that NaN falls into the invalid branch as well
    if !(weight_kg > 0.0 && height_m > 0.0) {
        return BmiResult::Invalid {
            error: INVALID_INPUT_MESSAGE.to_string(),
        };
    }

    let bmi = weight_kg / height_m.powi(2);
    if !bmi.is_finite() {
        return BmiResult::Invalid {
            error: INVALID_INPUT_MESSAGE.to_string(),
        };
    }

    BmiResult::Computed {
        bmi: round_to_hundredths(bmi),
        category: BmiCategory::classify(bmi),
        weight_kg,
        height_m,
    }
}

/// Round to two decimal places from the exact binary value, ties to even.
///
/// `2.675` is stored as `2.67499...` and becomes `2.67`; the exact tie
/// `22.125` becomes `22.12`.
fn round_to_hundredths(value: f64) -> f64 {
    format!("{:.2}", value).parse().unwrap_or(value)
}
