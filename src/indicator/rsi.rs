use error_stack::{Report, bail};

use crate::error::IndicatorError;
use crate::indicator::ma::Ewm;

pub const DEFAULT_WINDOW: usize = 14;

/// RSI (Relative Strength Index) with Wilder-style exponential smoothing.
///
/// Gains and losses are smoothed with an adjusted EWM of center of mass
/// `window - 1`. Output is aligned with the input prices; index `i` is
/// defined only once `window` deltas are available (`i >= window`).
#[derive(Debug, Clone)]
pub struct Rsi {
    window: usize,
    smoothing: Ewm,
}

impl Rsi {
    pub fn new(window: usize) -> Result<Self, Report<IndicatorError>> {
        if window == 0 {
            bail!(IndicatorError::InvalidParameter {
                name: "window must be > 0".into(),
            });
        }
        // `window` real deltas plus the leading placeholder.
        let smoothing = Ewm::from_center_of_mass((window - 1) as f64, window + 1)?;
        Ok(Self { window, smoothing })
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Minimum number of prices for the last output to be defined.
    pub fn required_points(&self) -> usize {
        self.window + 1
    }

    pub fn calculate(&self, prices: &[f64]) -> Vec<Option<f64>> {
        // delta[0] has no predecessor and enters the averages as a zero.
        let deltas: Vec<f64> = std::iter::once(0.0)
            .chain(prices.windows(2).map(|w| w[1] - w[0]))
            .take(prices.len())
            .collect();
        let gains: Vec<f64> = deltas.iter().map(|&d| d.max(0.0)).collect();
        let losses: Vec<f64> = deltas.iter().map(|&d| (-d).max(0.0)).collect();

        self.smoothing
            .calculate(&gains)
            .into_iter()
            .zip(self.smoothing.calculate(&losses))
            .map(|(gain, loss)| Some(rsi_value(gain?, loss?)))
            .collect()
    }

    /// RSI at the most recent price, if enough history exists.
    pub fn latest(&self, prices: &[f64]) -> Option<f64> {
        self.calculate(prices).last().copied().flatten()
    }
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        // Flat history has neither gains nor losses; report the midpoint.
        return if avg_gain == 0.0 { 50.0 } else { 100.0 };
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}
