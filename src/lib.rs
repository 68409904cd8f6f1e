#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

//! # Kiln
//!
//! Backend-independent device-object core of a D3D12/Vulkan-class graphics
//! engine.
//!
//! - [`framebuffer`]: framebuffer cache with view/render-pass invalidation and
//!   the dynamic-rendering variant
//! - [`render_state_cache`]: content-addressed shader cache backed by archives
//! - [`raytracing`]: BLAS/TLAS objects, geometry names and hit-group indices
//! - [`render_pass`]: render pass descriptions and their validation
//!
//! Backends plug in through the traits in [`device`].

pub mod core;
pub mod device;
pub mod errors;
pub mod framebuffer;
pub mod raytracing;
pub mod render_pass;
pub mod render_state_cache;
pub mod settings;
pub mod shader;

pub use crate::core::{
    AnyDeviceObject, DeferredReleaseQueue, DeviceObject, NativeHandle, ObjectId, ResourceState, TextureFormat,
    TextureView,
};
pub use device::{AccelerationStructureFactory, DeviceType, FramebufferFactory, RenderDevice};
pub use errors::{ErrorKind, GraphicsError, Result};
pub use framebuffer::{FramebufferCache, FramebufferCacheKey, RenderingInfo};
pub use raytracing::{BottomLevelAs, TopLevelAs};
pub use render_pass::{RenderPass, RenderPassDesc};
pub use render_state_cache::{RenderStateCache, RenderStateCacheCreateInfo};
pub use settings::{CacheLogLevel, RenderStateCacheSettings};
pub use shader::{ShaderCreateInfo, ShaderHash};
