use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NormalizeError {
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Amount out of range: {value} with {decimals} decimals")]
    AmountOverflow { value: String, decimals: u32 },

    #[error("Invalid address: {address}")]
    InvalidAddress { address: String },
}

pub type Result<T> = std::result::Result<T, NormalizeError>;

impl From<serde_json::Error> for NormalizeError {
    fn from(err: serde_json::Error) -> Self {
        NormalizeError::MalformedRecord(err.to_string())
    }
}
