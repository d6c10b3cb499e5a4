//! Error types for the Reactor3D terrain engine

use thiserror::Error;

/// Main error type for the engine
#[derive(Debug, Error)]
pub enum Error {
    #[error("height maps must have a width and height that are powers of two and at least 2 (got {width}x{height})")]
    HeightmapDimensions { width: u32, height: u32 },

    #[error("classification maps must have a width and height that are powers of two (got {width}x{height})")]
    ClassificationDimensions { width: u32, height: u32 },

    #[error("leaf size must be set to a power of two (got {0})")]
    LeafSize(u32),

    #[error("terrain has not been initialized")]
    NotInitialized,

    #[error("Config error: {0}")]
    Config(String),

    #[error("GPU error: {0}")]
    Gpu(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_precondition() {
        let err = Error::HeightmapDimensions { width: 100, height: 64 };
        assert!(err.to_string().contains("100x64"));
        assert!(err.to_string().contains("power"));

        let err = Error::LeafSize(12);
        assert!(err.to_string().contains("Leaf size") || err.to_string().contains("leaf size"));
        assert!(err.to_string().contains("12"));
    }
}
