use bitflags::bitflags;

bitflags! {
    /// Build options of a BLAS or TLAS.
    ///
    /// `PREFER_FAST_TRACE` and `PREFER_FAST_BUILD` should not both be set; the
    /// backend decides which one wins (see
    /// [`AccelerationStructureFactory::resolve_build_flags`](crate::device::AccelerationStructureFactory::resolve_build_flags)).
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct BuildAsFlags: u8 {
        const ALLOW_UPDATE      = 0x01;
        const ALLOW_COMPACTION  = 0x02;
        const PREFER_FAST_TRACE = 0x04;
        const PREFER_FAST_BUILD = 0x08;
        const LOW_MEMORY        = 0x10;
    }
}

/// How TLAS instances map to hit-group records of the shader binding table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ShaderBindingMode {
    /// One record per geometry of every instance.
    #[default]
    PerGeometry,
    /// One record per instance.
    PerInstance,
    /// The caller supplies every instance's index.
    UserDefined,
}

/// Scratch memory needed to build or update an acceleration structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ScratchBufferSizes {
    pub build: u64,
    pub update: u64,
}

/// Scalar type of vertex components and indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ValueType {
    #[default]
    Undefined,
    Int8,
    Int16,
    Int32,
    Uint8,
    Uint16,
    Uint32,
    Float16,
    Float32,
}
