use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Pipeline stage a shader runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ShaderType {
    #[default]
    Vertex,
    Pixel,
    Geometry,
    Hull,
    Domain,
    Compute,
    Amplification,
    Mesh,
    RayGen,
    RayMiss,
    RayClosestHit,
    RayAnyHit,
    RayIntersection,
    Callable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ShaderSourceLanguage {
    #[default]
    Default,
    Hlsl,
    Glsl,
    GlslVerbatim,
    Msl,
    Wgsl,
}

/// Front-end compiler requested for source shaders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ShaderCompilerKind {
    #[default]
    Default,
    Glslang,
    Dxc,
    Fxc,
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ShaderCompileFlags: u32 {
        const ENABLE_UNBOUNDED_ARRAYS = 1 << 0;
        const SKIP_REFLECTION         = 1 << 1;
        const PACK_MATRIX_ROW_MAJOR   = 1 << 2;
        const HLSL_TO_SPIRV_VIA_GLSL  = 1 << 3;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShaderMacro {
    pub name: String,
    pub definition: String,
}

impl ShaderMacro {
    #[must_use]
    pub fn new(name: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            definition: definition.into(),
        }
    }
}

/// Shader code: source text to compile, or backend bytecode to load.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ShaderSource {
    Source(String),
    Bytecode(Vec<u8>),
}

impl Default for ShaderSource {
    fn default() -> Self {
        Self::Source(String::new())
    }
}

/// Properties a created shader reports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ShaderDesc {
    pub name: String,
    pub shader_type: ShaderType,
    pub use_combined_texture_samplers: bool,
    pub combined_sampler_suffix: String,
}

/// Everything needed to create a shader.
///
/// Content hashing covers every field except `desc.name`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ShaderCreateInfo {
    pub desc: ShaderDesc,
    pub source: ShaderSource,
    pub entry_point: String,
    pub macros: Vec<ShaderMacro>,
    pub source_language: ShaderSourceLanguage,
    pub compiler: ShaderCompilerKind,
    pub compile_flags: ShaderCompileFlags,
}

impl ShaderCreateInfo {
    /// A source shader with entry point `main`.
    #[must_use]
    pub fn from_source(name: impl Into<String>, shader_type: ShaderType, source: impl Into<String>) -> Self {
        Self {
            desc: ShaderDesc {
                name: name.into(),
                shader_type,
                combined_sampler_suffix: "_sampler".into(),
                ..ShaderDesc::default()
            },
            source: ShaderSource::Source(source.into()),
            entry_point: "main".into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_macro(mut self, name: impl Into<String>, definition: impl Into<String>) -> Self {
        self.macros.push(ShaderMacro::new(name, definition));
        self
    }

    #[must_use]
    pub fn with_entry_point(mut self, entry_point: impl Into<String>) -> Self {
        self.entry_point = entry_point.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.desc.name
    }
}
