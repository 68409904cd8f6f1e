//! Shaders, Serialization & Archives
//!
//! - [`ShaderCreateInfo`] and its canonical xxh3-128 [`content_hash`](ShaderCreateInfo::content_hash)
//! - [`SerializationDevice`] / [`CompilingSerializationDevice`]: compile once per backend
//! - [`Archiver`] / [`Dearchiver`] with the built-in [`ArchiveWriter`] / [`ArchiveReader`]
//! - [`Shader`] / [`PipelineState`]: backend objects

pub mod archive;
pub mod desc;
pub mod hash;
pub mod pipeline;
pub mod serialized;

pub use archive::{ArchiveReader, ArchiveWriter, Archiver, DataBlob, Dearchiver, ARCHIVE_MAGIC, ARCHIVE_VERSION};
pub use desc::{
    ShaderCompileFlags, ShaderCompilerKind, ShaderCreateInfo, ShaderDesc, ShaderMacro, ShaderSource,
    ShaderSourceLanguage, ShaderType,
};
pub use hash::{archive_name, ContentHasher, ShaderHash};
pub use pipeline::{PipelineState, PipelineStateCreateInfo, PipelineType, Shader};
pub use serialized::{
    ArchiveDeviceFlags, CompilingSerializationDevice, DeviceShaderCompiler, SerializationDevice, SerializedShader, ShaderCompiler,
    ShaderRecord,
};
