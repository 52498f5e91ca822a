//! Error taxonomy for the engine.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FxError {
    #[error("invalid instrument name {0:?}, expected Base_Quote e.g. EUR_USD")]
    InvalidInstrument(String),

    #[error("no candle found for {instrument} at or before time {time}")]
    NotFound { instrument: String, time: i64 },

    #[error("calendar exhausted: no trading day at or after the requested date")]
    CalendarExhausted,

    #[error("unsupported data frequency: {0} does not evenly divide a trading day")]
    UnsupportedFrequency(String),

    #[error("unknown trade id {0}")]
    UnknownTrade(uuid::Uuid),
}

pub type FxResult<T> = Result<T, FxError>;
