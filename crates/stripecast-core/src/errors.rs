use thiserror::Error;

#[derive(Error, Debug)]
pub enum StripeError {
    #[error("Invalid geometry: {reason}")]
    InvalidGeometry { reason: String },

    #[error("Configuration invalid: {reason}")]
    ConfigurationInvalid { reason: String },

    #[error("Frame range out of bounds: offset={offset} len={len} available={available}")]
    FrameOutOfRange {
        offset: usize,
        len: usize,
        available: usize,
    },

    #[error("Config parse error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
