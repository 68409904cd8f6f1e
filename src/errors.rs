//! Error Types
//!
//! This module defines the error type shared by every cache and device object
//! in the crate.
//!
//! # Overview
//!
//! [`GraphicsError`] covers the failure kinds of the device-object core:
//! - Static description failures (render pass, geometry, instance tables)
//! - Backend object creation failures
//! - Archive decoding failures
//! - Recognized-but-unimplemented features
//! - Broken internal bookkeeping (debug aid)
//!
//! Cache misses and unknown-name lookups are **not** errors; they are ordinary
//! return values (`None`, [`INVALID_INDEX`](crate::settings::INVALID_INDEX)).
//!
//! # Usage
//!
//! ```rust,ignore
//! use kiln::errors::{GraphicsError, Result};
//!
//! fn build() -> Result<()> {
//!     Err(GraphicsError::NotSupported("acceleration structure update".into()))
//! }
//! ```

use thiserror::Error;

/// The error type for all fallible operations in the crate.
#[derive(Error, Debug)]
pub enum GraphicsError {
    // ========================================================================
    // Description Errors
    // ========================================================================
    /// A render pass description failed validation.
    #[error("Render pass '{name}': {reason}")]
    InvalidRenderPass {
        /// Name of the offending render pass
        name: String,
        /// Human-readable description of the failed clause
        reason: String,
    },

    /// A BLAS/TLAS geometry or instance description is malformed.
    #[error("Acceleration structure '{name}': {reason}")]
    InvalidGeometryDescription {
        /// Name of the offending acceleration structure
        name: String,
        /// Human-readable description of the failed clause
        reason: String,
    },

    /// Any other description that fails a static predicate.
    #[error("Invalid description: {0}")]
    InvalidDescription(String),

    // ========================================================================
    // Backend Errors
    // ========================================================================
    /// The backend refused to create an object.
    #[error("Failed to create {object}: {reason}")]
    BackendResourceCreationFailed {
        /// Kind of object that was being created ("framebuffer", "shader", ...)
        object: &'static str,
        /// Backend-provided reason
        reason: String,
    },

    // ========================================================================
    // Archive Errors
    // ========================================================================
    /// The archive blob could not be decoded.
    #[error("Archive corrupted: {0}")]
    ArchiveCorrupted(String),

    /// The archive could not be encoded.
    #[error("Archive encode error: {0}")]
    ArchiveEncode(#[from] bincode::error::EncodeError),

    /// Writing the archive to a stream failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ========================================================================
    // Feature & Invariant Errors
    // ========================================================================
    /// The feature is recognized but not implemented.
    #[error("Not supported: {0}")]
    NotSupported(String),

    /// Internal bookkeeping is inconsistent and could not be repaired.
    #[error("Internal invariant violated: {0}")]
    InternalInvariantViolation(String),
}

/// Coarse classification of a [`GraphicsError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidDescription,
    BackendResourceCreationFailed,
    ArchiveCorrupted,
    NotSupported,
    InternalInvariantViolation,
    Io,
}

impl GraphicsError {
    /// Returns the error kind this variant belongs to.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRenderPass { .. }
            | Self::InvalidGeometryDescription { .. }
            | Self::InvalidDescription(_) => ErrorKind::InvalidDescription,
            Self::BackendResourceCreationFailed { .. } => ErrorKind::BackendResourceCreationFailed,
            Self::ArchiveCorrupted(_) => ErrorKind::ArchiveCorrupted,
            Self::NotSupported(_) => ErrorKind::NotSupported,
            Self::InternalInvariantViolation(_) => ErrorKind::InternalInvariantViolation,
            Self::ArchiveEncode(_) | Self::Io(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn creation_failed(object: &'static str, reason: impl Into<String>) -> Self {
        Self::BackendResourceCreationFailed {
            object,
            reason: reason.into(),
        }
    }
}

impl From<bincode::error::DecodeError> for GraphicsError {
    fn from(err: bincode::error::DecodeError) -> Self {
        GraphicsError::ArchiveCorrupted(err.to_string())
    }
}

/// Alias for `Result<T, GraphicsError>`.
pub type Result<T> = std::result::Result<T, GraphicsError>;
