pub mod change;
pub mod ma;
pub mod rsi;
