//! Age-based eligibility gate.

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};

/// Inclusive age band the service is designed for.
pub const ELIGIBLE_AGE_MIN: i32 = 13;
pub const ELIGIBLE_AGE_MAX: i32 = 19;

/// Oldest plausible age; birth years further back fail validation rather
/// than gating.
const MAX_AGE_YEARS: i32 = 120;

/// Outcome of the eligibility gate. Recomputed per request, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Eligibility {
    pub eligible: bool,
    pub message: String,
}

/// Computes age as `current_year - birth_year` and classifies it against
/// the target band. Fails with a validation error when the birth year is
/// outside `[current_year - 120, current_year]`. Deterministic given both
/// years; callers supply `current_year` so tests never depend on the clock.
pub fn assess_birth_year(
    birth_year: i32,
    current_year: i32,
    ineligible_message: &str,
) -> Result<Eligibility, PipelineError> {
    if birth_year < current_year - MAX_AGE_YEARS || birth_year > current_year {
        return Err(PipelineError::Validation(format!(
            "birth_year must be between {} and {}",
            current_year - MAX_AGE_YEARS,
            current_year
        )));
    }

    let age = current_year - birth_year;
    if (ELIGIBLE_AGE_MIN..=ELIGIBLE_AGE_MAX).contains(&age) {
        Ok(Eligibility {
            eligible: true,
            message: "You're in the right place — welcome.".to_string(),
        })
    } else {
        Ok(Eligibility {
            eligible: false,
            message: ineligible_message.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CURRENT_YEAR: i32 = 2026;
    const REDIRECT: &str = "please find support that fits";

    #[test]
    fn every_age_in_band_is_eligible() {
        for age in ELIGIBLE_AGE_MIN..=ELIGIBLE_AGE_MAX {
            let result = assess_birth_year(CURRENT_YEAR - age, CURRENT_YEAR, REDIRECT).unwrap();
            assert!(result.eligible, "age {} should be eligible", age);
        }
    }

    #[test]
    fn ages_outside_band_get_redirect_message() {
        for birth_year in [CURRENT_YEAR - 12, CURRENT_YEAR - 20, 1990] {
            let result = assess_birth_year(birth_year, CURRENT_YEAR, REDIRECT).unwrap();
            assert!(!result.eligible);
            assert_eq!(result.message, REDIRECT);
        }
    }

    #[test]
    fn birth_years_outside_window_fail_validation() {
        assert!(matches!(
            assess_birth_year(CURRENT_YEAR - 121, CURRENT_YEAR, REDIRECT),
            Err(PipelineError::Validation(_))
        ));
        assert!(matches!(
            assess_birth_year(CURRENT_YEAR + 1, CURRENT_YEAR, REDIRECT),
            Err(PipelineError::Validation(_))
        ));
    }

    #[test]
    fn window_boundaries_are_inclusive() {
        assert!(assess_birth_year(CURRENT_YEAR - 120, CURRENT_YEAR, REDIRECT).is_ok());
        assert!(assess_birth_year(CURRENT_YEAR, CURRENT_YEAR, REDIRECT).is_ok());
    }
}
