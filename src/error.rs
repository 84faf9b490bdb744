use thiserror::Error;

#[derive(Error, Debug)]
pub enum PoolError {
    #[error("Invalid capacity: {0} (pool capacity must be positive)")]
    InvalidCapacity(usize),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Backing store unavailable: could not acquire {capacity} bytes")]
    StoreUnavailable { capacity: usize },

    #[error("Out of space: no free block can hold {requested} bytes (largest free block: {largest_free})")]
    OutOfSpace { requested: usize, largest_free: usize },

    #[error("Invalid block handle: not a live allocation of this pool")]
    InvalidHandle,

    #[error("Pool is not initialized")]
    Uninitialized,

    #[error("Block directory corrupted: {0}")]
    Corrupted(String),

    #[error("Value not found in list: {0}")]
    ValueNotFound(u16),

    #[error("Node is not part of this list")]
    NodeNotFound,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Node encoding error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PoolError>;
