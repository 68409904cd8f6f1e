//! Mock backends shared by the integration tests.
//!
//! - `MockFramebufferFactory`: hands out sequential framebuffer handles and
//!   records deferred releases
//! - `MockAsFactory`: acceleration structures with geometry-derived scratch sizes
//! - `MockDevice`: counts source compilations separately from bytecode loads
//! - `MockCompiler`: offline compiler producing deterministic bytecode

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use kiln::core::{
    DeferredReleaseQueue, DeviceObject, NativeHandle, ObjectId, ObjectKind, ResourceState, TextureFormat, TextureView, TextureViewDesc,
    TextureViewType,
};
use kiln::device::{
    AccelerationStructureFactory, DeviceType, FramebufferCreateInfo, FramebufferFactory, NativeAccelerationStructure,
    RenderDevice,
};
use kiln::errors::{GraphicsError, Result};
use kiln::raytracing::{BlasDesc, ScratchBufferSizes, TlasDesc};
use kiln::render_pass::{
    AttachmentReference, RenderPass, RenderPassAttachmentDesc, RenderPassDesc, SubpassDesc,
};
use kiln::shader::{
    PipelineState, PipelineStateCreateInfo, PipelineType, Shader, ShaderCompiler, ShaderCreateInfo, ShaderDesc,
    ShaderSource,
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(0x1000);

/// A fresh, never-repeated native handle.
pub fn handle() -> NativeHandle {
    NativeHandle::new(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed)).unwrap()
}

// ============================================================================
// Views & render passes
// ============================================================================

pub fn view(name: &str, format: TextureFormat) -> TextureView {
    let view_type = if format.is_depth_stencil() {
        TextureViewType::DepthStencil
    } else {
        TextureViewType::RenderTarget
    };
    TextureView::new(
        TextureViewDesc {
            name: name.into(),
            view_type,
            format,
        },
        handle(),
    )
}

pub fn rtv(name: &str) -> TextureView {
    view(name, TextureFormat::Rgba8Unorm)
}

pub fn dsv(name: &str) -> TextureView {
    view(name, TextureFormat::D32Float)
}

/// One RGBA8 colour attachment kept in RENDER_TARGET.
pub fn color_pass_desc(name: &str) -> RenderPassDesc {
    RenderPassDesc::new(name)
        .with_attachment(RenderPassAttachmentDesc::new(
            TextureFormat::Rgba8Unorm,
            ResourceState::RENDER_TARGET,
        ))
        .with_subpass(SubpassDesc {
            render_target_attachments: vec![AttachmentReference::new(0, ResourceState::RENDER_TARGET)],
            ..SubpassDesc::default()
        })
}

/// One D32 depth attachment kept in DEPTH_WRITE.
pub fn depth_pass_desc(name: &str) -> RenderPassDesc {
    RenderPassDesc::new(name)
        .with_attachment(RenderPassAttachmentDesc::new(
            TextureFormat::D32Float,
            ResourceState::DEPTH_WRITE,
        ))
        .with_subpass(SubpassDesc {
            depth_stencil_attachment: Some(AttachmentReference::new(0, ResourceState::DEPTH_WRITE)),
            ..SubpassDesc::default()
        })
}

pub fn render_pass(desc: RenderPassDesc) -> RenderPass {
    RenderPass::new(desc, handle()).unwrap()
}

// ============================================================================
// Framebuffer factory
// ============================================================================

#[derive(Debug)]
pub struct MockFramebuffer {
    pub handle: NativeHandle,
    pub attachments: Vec<NativeHandle>,
}

#[derive(Default)]
pub struct MockFramebufferFactory {
    pub fail: AtomicBool,
    pub created: Mutex<Vec<MockFramebuffer>>,
    pub released: Mutex<Vec<(NativeHandle, u64)>>,
    /// Released framebuffers wait here for their queues, as on a real backend.
    pub release_queue: DeferredReleaseQueue<MockFramebuffer>,
}

impl MockFramebufferFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().len()
    }

    pub fn released_handles(&self) -> Vec<NativeHandle> {
        self.released.lock().iter().map(|(h, _)| *h).collect()
    }

    pub fn last_attachments(&self) -> Vec<NativeHandle> {
        self.created
            .lock()
            .last()
            .map(|fb| fb.attachments.clone())
            .unwrap_or_default()
    }
}

impl FramebufferFactory for MockFramebufferFactory {
    type Framebuffer = MockFramebuffer;

    fn create_framebuffer(&self, info: &FramebufferCreateInfo<'_>) -> Result<MockFramebuffer> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(GraphicsError::BackendResourceCreationFailed {
                object: "framebuffer",
                reason: "out of memory".into(),
            });
        }
        let fb = MockFramebuffer {
            handle: handle(),
            attachments: info.attachments.to_vec(),
        };
        self.created.lock().push(MockFramebuffer {
            handle: fb.handle,
            attachments: fb.attachments.clone(),
        });
        Ok(fb)
    }

    fn framebuffer_handle(&self, framebuffer: &MockFramebuffer) -> NativeHandle {
        framebuffer.handle
    }

    fn safe_release_framebuffer(&self, framebuffer: MockFramebuffer, queue_mask: u64) {
        self.released.lock().push((framebuffer.handle, queue_mask));
        self.release_queue.safe_release(framebuffer, queue_mask);
    }
}

// ============================================================================
// Acceleration structure factory
// ============================================================================

pub struct MockAs {
    handle: NativeHandle,
    scratch: ScratchBufferSizes,
}

impl NativeAccelerationStructure for MockAs {
    fn native_handle(&self) -> NativeHandle {
        self.handle
    }

    fn scratch_sizes(&self) -> ScratchBufferSizes {
        self.scratch
    }
}

#[derive(Default)]
pub struct MockAsFactory {
    pub fail: AtomicBool,
    pub created_blas: Mutex<Vec<BlasDesc>>,
    pub created_tlas: Mutex<Vec<TlasDesc>>,
}

impl AccelerationStructureFactory for MockAsFactory {
    fn create_blas(&self, desc: &BlasDesc) -> Result<Box<dyn NativeAccelerationStructure>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(GraphicsError::BackendResourceCreationFailed {
                object: "BLAS",
                reason: "ray tracing is not enabled".into(),
            });
        }
        self.created_blas.lock().push(desc.clone());
        let primitives: u64 = desc
            .triangles
            .iter()
            .map(|t| u64::from(t.max_primitive_count))
            .chain(desc.boxes.iter().map(|b| u64::from(b.max_box_count)))
            .sum();
        Ok(Box::new(MockAs {
            handle: handle(),
            scratch: ScratchBufferSizes {
                build: primitives * 64,
                update: primitives * 16,
            },
        }))
    }

    fn create_tlas(&self, desc: &TlasDesc) -> Result<Box<dyn NativeAccelerationStructure>> {
        self.created_tlas.lock().push(desc.clone());
        Ok(Box::new(MockAs {
            handle: handle(),
            scratch: ScratchBufferSizes {
                build: u64::from(desc.max_instance_count) * 128,
                update: u64::from(desc.max_instance_count) * 32,
            },
        }))
    }
}

// ============================================================================
// Render device
// ============================================================================

pub struct MockShader {
    id: ObjectId,
    desc: ShaderDesc,
    device_type: DeviceType,
    pub bytecode: Vec<u8>,
}

impl DeviceObject for MockShader {
    fn unique_id(&self) -> ObjectId {
        self.id
    }

    fn name(&self) -> &str {
        &self.desc.name
    }

    fn kind(&self) -> ObjectKind {
        ObjectKind::Shader
    }
}

impl Shader for MockShader {
    fn desc(&self) -> &ShaderDesc {
        &self.desc
    }

    fn device_type(&self) -> DeviceType {
        self.device_type
    }
}

pub struct MockPipeline {
    id: ObjectId,
    name: String,
    pipeline_type: PipelineType,
}

impl DeviceObject for MockPipeline {
    fn unique_id(&self) -> ObjectId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ObjectKind {
        ObjectKind::PipelineState
    }
}

impl PipelineState for MockPipeline {
    fn pipeline_type(&self) -> PipelineType {
        self.pipeline_type
    }
}

/// Render device that "compiles" by copying the source text.
///
/// `source_compiles` counts both direct source creation and `compile_shader`.
pub struct MockDevice {
    device_type: DeviceType,
    pub source_compiles: AtomicUsize,
    pub bytecode_loads: AtomicUsize,
    pub pipelines: AtomicUsize,
}

impl MockDevice {
    pub fn new(device_type: DeviceType) -> Arc<Self> {
        Arc::new(Self {
            device_type,
            source_compiles: AtomicUsize::new(0),
            bytecode_loads: AtomicUsize::new(0),
            pipelines: AtomicUsize::new(0),
        })
    }

    pub fn source_compiles(&self) -> usize {
        self.source_compiles.load(Ordering::SeqCst)
    }

    pub fn bytecode_loads(&self) -> usize {
        self.bytecode_loads.load(Ordering::SeqCst)
    }
}

impl RenderDevice for MockDevice {
    fn device_type(&self) -> DeviceType {
        self.device_type
    }

    fn create_shader(&self, create_info: &ShaderCreateInfo) -> Result<Arc<dyn Shader>> {
        let bytecode = match &create_info.source {
            ShaderSource::Source(text) => {
                if text.contains("syntax error") {
                    return Err(GraphicsError::BackendResourceCreationFailed {
                        object: "shader",
                        reason: format!("'{}' failed to compile", create_info.name()),
                    });
                }
                self.source_compiles.fetch_add(1, Ordering::SeqCst);
                text.as_bytes().to_vec()
            }
            ShaderSource::Bytecode(bytes) => {
                self.bytecode_loads.fetch_add(1, Ordering::SeqCst);
                bytes.clone()
            }
        };
        Ok(Arc::new(MockShader {
            id: ObjectId::next(),
            desc: create_info.desc.clone(),
            device_type: self.device_type,
            bytecode,
        }))
    }

    fn compile_shader(&self, create_info: &ShaderCreateInfo) -> Result<Vec<u8>> {
        let ShaderSource::Source(text) = &create_info.source else {
            return Err(GraphicsError::InvalidDescription("expected source".into()));
        };
        if text.contains("syntax error") {
            return Err(GraphicsError::BackendResourceCreationFailed {
                object: "shader",
                reason: format!("'{}' failed to compile", create_info.name()),
            });
        }
        self.source_compiles.fetch_add(1, Ordering::SeqCst);
        Ok(text.as_bytes().to_vec())
    }

    fn create_pipeline_state(&self, create_info: &PipelineStateCreateInfo) -> Result<Arc<dyn PipelineState>> {
        self.pipelines.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockPipeline {
            id: ObjectId::next(),
            name: create_info.name.clone(),
            pipeline_type: create_info.pipeline_type,
        }))
    }
}

/// Offline compiler producing `"<backend>:<source>"` bytecode.
pub struct MockCompiler {
    device_type: DeviceType,
    pub compiles: Arc<AtomicUsize>,
}

impl MockCompiler {
    pub fn new(device_type: DeviceType) -> Self {
        Self {
            device_type,
            compiles: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl ShaderCompiler for MockCompiler {
    fn device_type(&self) -> DeviceType {
        self.device_type
    }

    fn compile(&self, create_info: &ShaderCreateInfo) -> Result<Vec<u8>> {
        let ShaderSource::Source(text) = &create_info.source else {
            return Err(GraphicsError::InvalidDescription("expected source".into()));
        };
        if text.contains("syntax error") {
            return Err(GraphicsError::BackendResourceCreationFailed {
                object: "shader",
                reason: "syntax error".into(),
            });
        }
        self.compiles.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{:?}:{text}", self.device_type).into_bytes())
    }
}
