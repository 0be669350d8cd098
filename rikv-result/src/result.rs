use crate::error::Error;

/// Result type alias used throughout rikv.
pub type Result<T> = std::result::Result<T, Error>;
