//! Backend-agnostic serialized shaders.
//!
//! A [`SerializationDevice`] compiles a [`ShaderCreateInfo`] once into a
//! [`SerializedShader`]: the archivable [`ShaderRecord`] (per-backend
//! bytecode) plus, for backends that have a live render device registered,
//! a ready device shader created from that bytecode.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::device::{DeviceType, RenderDevice};
use crate::errors::{GraphicsError, Result};

use super::desc::{ShaderCreateInfo, ShaderDesc, ShaderSource, ShaderSourceLanguage};
use super::pipeline::Shader;

bitflags! {
    /// Backends a shader is serialized for.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ArchiveDeviceFlags: u32 {
        const D3D11  = 1 << 0;
        const D3D12  = 1 << 1;
        const OPENGL = 1 << 2;
        const VULKAN = 1 << 3;
        const METAL  = 1 << 4;
        const WEBGPU = 1 << 5;
    }
}

impl ArchiveDeviceFlags {
    /// Device types selected by the flags, in `DeviceType` order.
    pub fn device_types(self) -> impl Iterator<Item = DeviceType> {
        DeviceType::ALL
            .into_iter()
            .filter(move |t| self.contains(t.archive_flag()))
    }
}

/// Archivable form of a shader: metadata plus bytecode per backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderRecord {
    /// Archive entry name.
    pub name: String,
    pub desc: ShaderDesc,
    pub entry_point: String,
    pub source_language: ShaderSourceLanguage,
    pub bytecode: BTreeMap<DeviceType, Vec<u8>>,
}

impl ShaderRecord {
    /// Create info that loads this record's bytecode for `device_type`.
    #[must_use]
    pub fn create_info_for(&self, device_type: DeviceType) -> Option<ShaderCreateInfo> {
        let bytecode = self.bytecode.get(&device_type)?;
        Some(ShaderCreateInfo {
            desc: self.desc.clone(),
            source: ShaderSource::Bytecode(bytecode.clone()),
            entry_point: self.entry_point.clone(),
            source_language: self.source_language,
            ..ShaderCreateInfo::default()
        })
    }
}

/// A shader compiled once for one or more backends.
pub struct SerializedShader {
    record: ShaderRecord,
    device_shaders: FxHashMap<DeviceType, Arc<dyn Shader>>,
}

impl SerializedShader {
    #[must_use]
    pub fn new(record: ShaderRecord) -> Self {
        Self {
            record,
            device_shaders: FxHashMap::default(),
        }
    }

    /// Attaches a live shader for `device_type`.
    pub fn attach_device_shader(&mut self, device_type: DeviceType, shader: Arc<dyn Shader>) {
        self.device_shaders.insert(device_type, shader);
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.record.name
    }

    #[inline]
    #[must_use]
    pub fn record(&self) -> &ShaderRecord {
        &self.record
    }

    /// The live shader for `device_type`, if one was created.
    #[must_use]
    pub fn device_shader(&self, device_type: DeviceType) -> Option<Arc<dyn Shader>> {
        self.device_shaders.get(&device_type).cloned()
    }
}

impl fmt::Debug for SerializedShader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerializedShader")
            .field("name", &self.record.name)
            .field("backends", &self.record.bytecode.keys().collect::<Vec<_>>())
            .field("device_shaders", &self.device_shaders.keys().collect::<Vec<_>>())
            .finish()
    }
}

// ─── Compilation ─────────────────────────────────────────────────────────────

/// Offline compiler for one backend.
pub trait ShaderCompiler: Send + Sync {
    fn device_type(&self) -> DeviceType;

    /// Compiles `create_info`'s source to backend bytecode.
    fn compile(&self, create_info: &ShaderCreateInfo) -> Result<Vec<u8>>;
}

/// [`ShaderCompiler`] that compiles through a live render device.
pub struct DeviceShaderCompiler {
    device: Arc<dyn RenderDevice>,
}

impl DeviceShaderCompiler {
    #[must_use]
    pub fn new(device: Arc<dyn RenderDevice>) -> Self {
        Self { device }
    }
}

impl ShaderCompiler for DeviceShaderCompiler {
    fn device_type(&self) -> DeviceType {
        self.device.device_type()
    }

    fn compile(&self, create_info: &ShaderCreateInfo) -> Result<Vec<u8>> {
        self.device.compile_shader(create_info)
    }
}

/// Turns create infos into serialized shaders.
pub trait SerializationDevice: Send + Sync {
    /// Compiles `create_info` for every backend in `device_flags`.
    ///
    /// The serialized shader is named after `create_info.desc.name`.
    fn create_shader(
        &self,
        create_info: &ShaderCreateInfo,
        device_flags: ArchiveDeviceFlags,
    ) -> Result<SerializedShader>;
}

/// [`SerializationDevice`] built from per-backend compilers.
///
/// For each backend with a registered render device, the compiled bytecode is
/// also loaded into a live device shader.
#[derive(Default)]
pub struct CompilingSerializationDevice {
    compilers: FxHashMap<DeviceType, Box<dyn ShaderCompiler>>,
    devices: FxHashMap<DeviceType, Arc<dyn RenderDevice>>,
}

impl CompilingSerializationDevice {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialization device for `device`'s own backend: compiles through the
    /// device and loads the bytecode back into it.
    #[must_use]
    pub fn for_render_device(device: Arc<dyn RenderDevice>) -> Self {
        Self::new()
            .with_compiler(DeviceShaderCompiler::new(Arc::clone(&device)))
            .with_render_device(device)
    }

    #[must_use]
    pub fn with_compiler(mut self, compiler: impl ShaderCompiler + 'static) -> Self {
        self.compilers.insert(compiler.device_type(), Box::new(compiler));
        self
    }

    #[must_use]
    pub fn with_render_device(mut self, device: Arc<dyn RenderDevice>) -> Self {
        self.devices.insert(device.device_type(), device);
        self
    }

    /// Backends this device can compile for.
    #[must_use]
    pub fn supported_devices(&self) -> ArchiveDeviceFlags {
        self.compilers
            .keys()
            .fold(ArchiveDeviceFlags::empty(), |acc, t| acc | t.archive_flag())
    }
}

impl SerializationDevice for CompilingSerializationDevice {
    fn create_shader(
        &self,
        create_info: &ShaderCreateInfo,
        device_flags: ArchiveDeviceFlags,
    ) -> Result<SerializedShader> {
        let mut bytecode = BTreeMap::new();
        for device_type in device_flags.device_types() {
            let compiled = match (&create_info.source, self.compilers.get(&device_type)) {
                (ShaderSource::Bytecode(bytes), _) => bytes.clone(),
                (ShaderSource::Source(_), Some(compiler)) => compiler.compile(create_info)?,
                (ShaderSource::Source(_), None) => {
                    log::warn!(
                        "No {device_type:?} compiler registered; shader '{}' is not serialized for it",
                        create_info.name()
                    );
                    continue;
                }
            };
            bytecode.insert(device_type, compiled);
        }

        if bytecode.is_empty() {
            return Err(GraphicsError::creation_failed(
                "serialized shader",
                format!(
                    "shader '{}' could not be compiled for any of {device_flags:?}",
                    create_info.name()
                ),
            ));
        }

        let record = ShaderRecord {
            name: create_info.desc.name.clone(),
            desc: create_info.desc.clone(),
            entry_point: create_info.entry_point.clone(),
            source_language: create_info.source_language,
            bytecode,
        };

        let mut serialized = SerializedShader::new(record);
        for (device_type, device) in &self.devices {
            let Some(ci) = serialized.record().create_info_for(*device_type) else {
                continue;
            };
            match device.create_shader(&ci) {
                Ok(shader) => serialized.attach_device_shader(*device_type, shader),
                Err(e) => log::warn!(
                    "Failed to create {device_type:?} shader '{}' from serialized bytecode: {e}",
                    serialized.name()
                ),
            }
        }
        Ok(serialized)
    }
}
