use thiserror::Error;

#[derive(Debug, Error)]
pub enum TimeError {
    #[error("timezone rule error: {0}")]
    Timezone(#[from] knxtime_core::TzError),
    #[error("telegram decode error: {0}")]
    Decode(#[from] knxtime_core::DecodeError),
}
