//! Framebuffers
//!
//! - [`FramebufferCache`]: backend framebuffers keyed by [`FramebufferCacheKey`]
//! - [`RenderingInfo`]: the dynamic-rendering replacement for a framebuffer
//! - [`Framebuffer`] / [`FramebufferDesc`]: explicitly created framebuffers

pub mod cache;
pub mod desc;
pub mod key;
pub mod rendering_info;

pub use cache::FramebufferCache;
pub use desc::{Framebuffer, FramebufferDesc};
pub use key::FramebufferCacheKey;
pub use rendering_info::{
    ClearValue, DynamicRenderingAttribs, ImageLayout, Rect2D, RenderingAttachment, RenderingInfo,
    ResolveMode, ShadingRateAttachmentInfo,
};
