use error_stack::{Report, bail};

use crate::error::IndicatorError;

/// Percent change from the second-to-last to the last price.
///
/// The base is whatever point precedes the latest one in the series, so data
/// gaps are not bridged to a true previous trading day.
pub fn change_percent(prices: &[f64]) -> Result<f64, Report<IndicatorError>> {
    let [.., previous, latest] = prices else {
        bail!(IndicatorError::InsufficientData {
            required: 2,
            available: prices.len(),
        });
    };
    if *previous == 0.0 {
        bail!(IndicatorError::ZeroBase);
    }
    Ok((latest - previous) / previous * 100.0)
}
