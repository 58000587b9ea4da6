use derive_more::{Display, Error};

#[derive(Debug, Display, Error)]
pub enum ConfigError {
    #[display("failed to read config file")]
    ReadFile,
    #[display("failed to parse config: {reason}")]
    Parse { reason: String },
    #[display("invalid config: {field}")]
    Validation { field: String },
}

#[derive(Debug, Display, Error)]
pub enum FetchError {
    #[display("request for {symbol} failed")]
    Request { symbol: String },
    #[display("failed to parse market data for {symbol}")]
    ResponseParse { symbol: String },
    #[display("no market data for {symbol}")]
    NotFound { symbol: String },
}

#[derive(Debug, Display, Error)]
pub enum NotifyError {
    #[display("failed to reach {channel}")]
    Transport { channel: String },
    #[display("{channel} rejected the message")]
    Rejected { channel: String },
}

#[derive(Debug, Display, Error)]
pub enum IndicatorError {
    #[display("insufficient data: need {required}, got {available}")]
    InsufficientData { required: usize, available: usize },
    #[display("invalid parameter: {name}")]
    InvalidParameter { name: String },
    #[display("previous close is zero")]
    ZeroBase,
    #[display("price series is not valid: {reason}")]
    InvalidSeries { reason: String },
}

/// Per-entry failure of a briefing run. None of these abort the batch.
#[derive(Debug, Display, Error)]
pub enum BriefingError {
    #[display("insufficient data: need {required}, got {available}")]
    InsufficientData { required: usize, available: usize },
    #[display("failed to fetch history for {symbol}")]
    Fetch { symbol: String },
    #[display("analysis of {symbol} failed")]
    Analysis { symbol: String },
}
