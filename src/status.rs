use std::fmt;

pub const OVERBOUGHT_ABOVE: f64 = 70.0;
pub const OVERSOLD_BELOW: f64 = 30.0;
pub const BUY_WATCH_BELOW: f64 = 40.0;

/// Momentum status derived from the latest RSI value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsiStatus {
    Overbought,
    Oversold,
    BuyWatch,
    Neutral,
}

impl RsiStatus {
    /// Overbought above 70 and oversold below 30, both exclusive; buy-watch on [30, 40).
    pub fn classify(rsi: f64) -> Self {
        if rsi > OVERBOUGHT_ABOVE {
            Self::Overbought
        } else if rsi < OVERSOLD_BELOW {
            Self::Oversold
        } else if rsi < BUY_WATCH_BELOW {
            Self::BuyWatch
        } else {
            Self::Neutral
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Overbought => "🔴 Overbought (risk)",
            Self::Oversold => "🟢 Oversold (opportunity)",
            Self::BuyWatch => "🟡 Buy-watch",
            Self::Neutral => "⚪ Neutral",
        }
    }
}

impl fmt::Display for RsiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
