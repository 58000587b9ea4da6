use error_stack::{Report, bail};

use crate::error::IndicatorError;

/// Exponentially weighted mean parameterized by center of mass.
///
/// Uses adjusted weights: each output is the weighted average of every
/// observation so far, with weight `(1 - alpha)^k` for the value `k` steps
/// back, `alpha = 1 / (1 + com)`. Outputs before `min_periods` observations
/// are `None`.
#[derive(Debug, Clone)]
pub struct Ewm {
    alpha: f64,
    min_periods: usize,
}

impl Ewm {
    pub fn from_center_of_mass(com: f64, min_periods: usize) -> Result<Self, Report<IndicatorError>> {
        if !com.is_finite() || com < 0.0 {
            bail!(IndicatorError::InvalidParameter {
                name: format!("center of mass must be >= 0, got {com}"),
            });
        }
        Ok(Self {
            alpha: 1.0 / (1.0 + com),
            min_periods,
        })
    }

    pub fn calculate(&self, values: &[f64]) -> Vec<Option<f64>> {
        let decay = 1.0 - self.alpha;
        let mut weighted_sum = 0.0;
        let mut weight_total = 0.0;

        values
            .iter()
            .enumerate()
            .map(|(i, &x)| {
                weighted_sum = weighted_sum * decay + x;
                weight_total = weight_total * decay + 1.0;
                (i + 1 >= self.min_periods).then(|| weighted_sum / weight_total)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_center_of_mass_invalid() {
        assert!(Ewm::from_center_of_mass(-1.0, 1).is_err());
        assert!(Ewm::from_center_of_mass(f64::NAN, 1).is_err());
    }

    #[test]
    fn adjusted_weights_known_values() {
        // alpha = 0.5: [1, 2, 3] -> 1, (2 + 0.5) / 1.5, (3 + 1 + 0.25) / 1.75
        let ewm = Ewm::from_center_of_mass(1.0, 1).unwrap();
        let out = ewm.calculate(&[1.0, 2.0, 3.0]);
        assert!((out[0].unwrap() - 1.0).abs() < 1e-12);
        assert!((out[1].unwrap() - 2.5 / 1.5).abs() < 1e-12);
        assert!((out[2].unwrap() - 4.25 / 1.75).abs() < 1e-12);
    }

    #[test]
    fn values_before_min_periods_are_none() {
        let ewm = Ewm::from_center_of_mass(2.0, 3).unwrap();
        let out = ewm.calculate(&[5.0; 5]);
        assert_eq!(out.len(), 5);
        assert!(out[..2].iter().all(Option::is_none));
        assert!(out[2..].iter().all(|v| v.is_some_and(|x| (x - 5.0).abs() < 1e-12)));
    }

    #[test]
    fn zero_center_of_mass_tracks_last_value() {
        let ewm = Ewm::from_center_of_mass(0.0, 1).unwrap();
        let out = ewm.calculate(&[3.0, 7.0, 1.0]);
        assert_eq!(out, vec![Some(3.0), Some(7.0), Some(1.0)]);
    }
}
