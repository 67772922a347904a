//! Error types for VenomMap

use crate::options::MapState;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for VenomMap operations
pub type Result<T> = std::result::Result<T, MapError>;

/// Errors that can occur while opening, mapping or tearing down a [`Mapping`](crate::Mapping)
#[derive(Debug, Error)]
pub enum MapError {
    /// Target name rejected before reaching the OS
    #[error("Invalid target name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    /// Failed to open an existing shared memory segment
    #[error("Failed to open shared memory '{name}': {source}")]
    SegmentOpen {
        name: String,
        #[source]
        source: io::Error,
    },

    /// Failed to create shared memory
    #[error("Failed to create shared memory '{name}': {source}")]
    SegmentCreate {
        name: String,
        #[source]
        source: io::Error,
    },

    /// The named segment is still held by another handle and cannot be recreated
    #[error("Shared memory '{name}' is still in use and cannot be recreated")]
    SegmentInUse { name: String },

    /// Failed to open or create the backing file
    #[error("Failed to open file '{}': {source}", path.display())]
    FileOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to set the object size
    #[error("Failed to set object size: {0}")]
    Truncate(#[source] io::Error),

    /// Failed to read the object size
    #[error("Failed to query object size: {0}")]
    Metadata(#[source] io::Error),

    /// The object does not have the size that was asked for
    #[error("Size mismatch: requested {requested} bytes, object has {actual} bytes")]
    SizeMismatch { requested: usize, actual: usize },

    /// Zero-length objects cannot be mapped
    #[error("Cannot map an empty object")]
    EmptyObject,

    /// Failed to map memory
    #[error("Failed to map memory: {0}")]
    Mmap(#[source] io::Error),

    /// Failed to unmap memory
    #[error("Failed to unmap memory: {0}")]
    Munmap(#[source] io::Error),

    /// Failed to write dirty pages back
    #[error("Failed to flush mapped memory: {0}")]
    Flush(#[source] io::Error),

    /// Failed to release the backing object
    #[error("Failed to release backing object: {0}")]
    Release(#[source] io::Error),

    /// Operation not valid in the current state
    #[error("Invalid state: expected {expected}, mapping is {actual}")]
    InvalidState { expected: MapState, actual: MapState },

    /// Write access requested on a read-only mapping
    #[error("Mapping is read-only")]
    ReadOnly,
}
