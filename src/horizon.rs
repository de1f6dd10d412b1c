use chrono::{DateTime, Utc};

use crate::error::ValidationError;

/// Time-step discretization of a fleet's optimization window: a strictly
/// positive step size `dt` (hours), a step count `steps` derived from the
/// longest registered series, and an optional datetime index for labeling
/// results.
#[derive(Debug, Clone)]
pub struct Horizon {
    pub dt: f64,
    pub steps: usize,
    pub datetime_index: Option<Vec<DateTime<Utc>>>,
}

impl Horizon {
    /// Construct a horizon directly from an already-agreed step count, e.g.
    /// once the caller has cross-checked every registered series itself.
    pub fn new(dt: f64, steps: usize) -> Result<Self, ValidationError> {
        if dt <= 0.0 {
            return Err(ValidationError::NonPositiveStep(dt));
        }
        if steps == 0 {
            return Err(ValidationError::EmptyHorizon);
        }
        Ok(Self {
            dt,
            steps,
            datetime_index: None,
        })
    }

    pub fn with_datetime_index(mut self, index: Vec<DateTime<Utc>>) -> Result<Self, ValidationError> {
        if index.len() != self.steps {
            return Err(ValidationError::IndexLengthMismatch {
                actual: index.len(),
                expected: self.steps,
            });
        }
        if !index.windows(2).all(|w| w[0] < w[1]) {
            return Err(ValidationError::NonMonotonicIndex);
        }
        self.datetime_index = Some(index);
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn rejects_non_positive_dt() {
        assert!(Horizon::new(0.0, 10).is_err());
    }

    #[test]
    fn rejects_zero_steps() {
        assert!(Horizon::new(1.0, 0).is_err());
    }

    #[test]
    fn rejects_non_monotonic_index() {
        let horizon = Horizon::new(1.0, 2).unwrap();
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let index = vec![t0, t0];
        assert!(horizon.with_datetime_index(index).is_err());
    }

    #[test]
    fn rejects_mismatched_index_length() {
        let horizon = Horizon::new(1.0, 3).unwrap();
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let index = vec![t0];
        assert!(horizon.with_datetime_index(index).is_err());
    }
}
