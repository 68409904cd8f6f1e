//! Ray-Tracing Acceleration Structures
//!
//! [`BottomLevelAs`] holds geometry and its name → index table;
//! [`TopLevelAs`] holds instances of BLASes and their hit-group indices.
//! Both report scratch sizes and native handles from the backend.

pub mod blas;
pub mod flags;
pub mod tlas;

pub use blas::{BlasBoundingBoxDesc, BlasDesc, BlasTriangleDesc, BottomLevelAs};
pub use flags::{BuildAsFlags, ScratchBufferSizes, ShaderBindingMode, ValueType};
pub use tlas::{TlasBuildInfo, TlasBuildInstanceData, TlasDesc, TlasInstanceDesc, TopLevelAs};
