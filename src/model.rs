use std::fmt;

use chrono::{DateTime, Utc};
use error_stack::{Report, bail};
use serde::{Deserialize, Serialize};

use crate::error::IndicatorError;

/// Lookback window requested from the market-data provider.
///
/// String representations match the config file format (e.g. `"3mo"`, `"1y"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HistoryPeriod {
    Day1,
    Day5,
    Month1,
    Month3,
    Month6,
    Year1,
    Year2,
    Year5,
    Year10,
    YearToDate,
    Max,
}

impl HistoryPeriod {
    /// Parse a config-format string into a `HistoryPeriod`.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "1d" => Some(Self::Day1),
            "5d" => Some(Self::Day5),
            "1mo" => Some(Self::Month1),
            "3mo" => Some(Self::Month3),
            "6mo" => Some(Self::Month6),
            "1y" => Some(Self::Year1),
            "2y" => Some(Self::Year2),
            "5y" => Some(Self::Year5),
            "10y" => Some(Self::Year10),
            "ytd" => Some(Self::YearToDate),
            "max" => Some(Self::Max),
            _ => None,
        }
    }

    /// Return the config-format string, which is also the chart API `range` value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Day1 => "1d",
            Self::Day5 => "5d",
            Self::Month1 => "1mo",
            Self::Month3 => "3mo",
            Self::Month6 => "6mo",
            Self::Year1 => "1y",
            Self::Year2 => "2y",
            Self::Year5 => "5y",
            Self::Year10 => "10y",
            Self::YearToDate => "ytd",
            Self::Max => "max",
        }
    }
}

impl fmt::Display for HistoryPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    Usd,
    Krw,
}

impl Currency {
    /// Korean listings (`.KS` KOSPI, `.KQ` KOSDAQ) quote in won; everything else in dollars.
    pub fn infer(symbol: &str) -> Self {
        if symbol.ends_with(".KS") || symbol.ends_with(".KQ") {
            Self::Krw
        } else {
            Self::Usd
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Usd => "$",
            Self::Krw => "₩",
        }
    }

    /// Format a price with this currency's sign and precision.
    pub fn format_price(self, price: f64) -> String {
        match self {
            Self::Usd => format!("{}{:.2}", self.symbol(), price),
            Self::Krw => format!("{}{}", self.symbol(), group_thousands(price.round() as i64)),
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Usd => write!(f, "usd"),
            Self::Krw => write!(f, "krw"),
        }
    }
}

fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// A named symbol to include in the briefing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortfolioEntry {
    pub name: String,
    pub symbol: String,
    pub currency: Currency,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
}

/// Daily closes in strictly ascending time order, every close finite and positive.
#[derive(Debug, Clone, Default)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(points: Vec<PricePoint>) -> Result<Self, Report<IndicatorError>> {
        for (i, p) in points.iter().enumerate() {
            if !p.close.is_finite() || p.close <= 0.0 {
                bail!(IndicatorError::InvalidSeries {
                    reason: format!("close at index {i} is {}", p.close),
                });
            }
        }
        if let Some(i) = points
            .windows(2)
            .position(|w| w[1].timestamp <= w[0].timestamp)
        {
            bail!(IndicatorError::InvalidSeries {
                reason: format!("timestamp at index {} is not after its predecessor", i + 1),
            });
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn latest(&self) -> Option<&PricePoint> {
        self.points.last()
    }
}
