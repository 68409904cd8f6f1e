//! Device-Object Core
//!
//! Value types and lifetime plumbing shared by every cache:
//!
//! - [`TextureFormat`]: attachment formats and their component types
//! - [`ResourceState`], [`PipelineStageFlags`], [`AccessFlags`]: state bitsets
//! - [`ObjectId`], [`NativeHandle`], [`DeviceObject`]: identity and backend handles
//! - [`DestroyCallbacks`]: destruction notifications for caches
//! - [`DeferredReleaseQueue`]: fence-based deferred destruction for backends
//! - [`TextureView`]: the attachment object framebuffers are built from

pub mod format;
pub mod object;
pub mod release;
pub mod state;
pub mod view;

pub use format::{ComponentType, FormatAttribs, TextureFormat};
pub use object::{AnyDeviceObject, DestroyCallbacks, DeviceObject, NativeHandle, ObjectId, ObjectKind};
pub use release::DeferredReleaseQueue;
pub use state::{AccessFlags, PipelineStageFlags, ResourceState};
pub use view::{TextureView, TextureViewDesc, TextureViewType};
