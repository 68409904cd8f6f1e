//! Backend Contracts
//!
//! Traits a concrete backend (D3D12, Vulkan, ...) implements so the caches in
//! this crate can create and release native objects. None of the traits
//! reenter the caches.
//!
//! | Trait | Used by |
//! |-------|---------|
//! | [`RenderDevice`] | [`RenderStateCache`](crate::render_state_cache::RenderStateCache) |
//! | [`FramebufferFactory`] | [`FramebufferCache`](crate::framebuffer::FramebufferCache) |
//! | [`AccelerationStructureFactory`] | [`BottomLevelAs`](crate::raytracing::BottomLevelAs), [`TopLevelAs`](crate::raytracing::TopLevelAs) |

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::NativeHandle;
use crate::errors::Result;
use crate::raytracing::{BlasDesc, BuildAsFlags, ScratchBufferSizes, TlasDesc};
use crate::shader::{ArchiveDeviceFlags, PipelineState, PipelineStateCreateInfo, Shader, ShaderCreateInfo};

/// Graphics API a device runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DeviceType {
    D3D11,
    D3D12,
    Vulkan,
    Metal,
    OpenGL,
    WebGpu,
}

impl DeviceType {
    pub const ALL: [Self; 6] = [
        Self::D3D11,
        Self::D3D12,
        Self::Vulkan,
        Self::Metal,
        Self::OpenGL,
        Self::WebGpu,
    ];

    /// The archive flag that selects this backend.
    #[must_use]
    pub const fn archive_flag(self) -> ArchiveDeviceFlags {
        match self {
            Self::D3D11 => ArchiveDeviceFlags::D3D11,
            Self::D3D12 => ArchiveDeviceFlags::D3D12,
            Self::Vulkan => ArchiveDeviceFlags::VULKAN,
            Self::Metal => ArchiveDeviceFlags::METAL,
            Self::OpenGL => ArchiveDeviceFlags::OPENGL,
            Self::WebGpu => ArchiveDeviceFlags::WEBGPU,
        }
    }
}

// ─── Render device ───────────────────────────────────────────────────────────

/// Creates shaders and pipeline states on one backend.
pub trait RenderDevice: Send + Sync {
    fn device_type(&self) -> DeviceType;

    /// Compiles or loads a shader. Bytecode sources skip compilation.
    fn create_shader(&self, create_info: &ShaderCreateInfo) -> Result<Arc<dyn Shader>>;

    /// Compiles a source shader to this backend's bytecode without creating
    /// a device object. The render state cache archives the result.
    fn compile_shader(&self, create_info: &ShaderCreateInfo) -> Result<Vec<u8>>;

    fn create_pipeline_state(
        &self,
        create_info: &PipelineStateCreateInfo,
    ) -> Result<Arc<dyn PipelineState>>;
}

// ─── Framebuffers ────────────────────────────────────────────────────────────

/// Parameters of a backend framebuffer.
#[derive(Debug, Clone, Copy)]
pub struct FramebufferCreateInfo<'a> {
    pub render_pass: NativeHandle,
    /// Depth-stencil first, then render targets in slot order, then shading rate.
    pub attachments: &'a [NativeHandle],
    pub width: u32,
    pub height: u32,
    pub layers: u32,
}

/// Creates and releases backend framebuffers.
pub trait FramebufferFactory: Send + Sync {
    /// Owning backend framebuffer.
    type Framebuffer: Send;

    fn create_framebuffer(&self, info: &FramebufferCreateInfo<'_>) -> Result<Self::Framebuffer>;

    fn framebuffer_handle(&self, framebuffer: &Self::Framebuffer) -> NativeHandle;

    /// Hands the framebuffer to the backend's deferred-destruction queue.
    ///
    /// It must stay alive until every queue in `queue_mask` has finished the
    /// work submitted so far.
    fn safe_release_framebuffer(&self, framebuffer: Self::Framebuffer, queue_mask: u64);
}

// ─── Acceleration structures ─────────────────────────────────────────────────

/// Backend side of a BLAS or TLAS.
pub trait NativeAccelerationStructure: Send + Sync {
    fn native_handle(&self) -> NativeHandle;

    /// Scratch sizes reported by the backend once memory layout is known.
    fn scratch_sizes(&self) -> ScratchBufferSizes;
}

/// Creates backend acceleration structures.
pub trait AccelerationStructureFactory: Send + Sync {
    fn create_blas(&self, desc: &BlasDesc) -> Result<Box<dyn NativeAccelerationStructure>>;

    fn create_tlas(&self, desc: &TlasDesc) -> Result<Box<dyn NativeAccelerationStructure>>;

    /// Resolves conflicting build preferences before creation.
    ///
    /// The default keeps `PREFER_FAST_TRACE` when both preferences are set.
    fn resolve_build_flags(&self, flags: BuildAsFlags) -> BuildAsFlags {
        if flags.contains(BuildAsFlags::PREFER_FAST_TRACE | BuildAsFlags::PREFER_FAST_BUILD) {
            log::warn!(
                "PREFER_FAST_TRACE and PREFER_FAST_BUILD are both set; PREFER_FAST_BUILD is ignored"
            );
            flags - BuildAsFlags::PREFER_FAST_BUILD
        } else {
            flags
        }
    }
}
