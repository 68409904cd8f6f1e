//! Render Passes
//!
//! [`RenderPassDesc`] is a plain value describing attachments, subpasses and
//! subpass dependencies. [`RenderPass::new`] validates it with
//! [`validate_render_pass_desc`] and freezes it.

pub mod desc;
pub mod object;
pub mod validation;

pub use desc::{
    AttachmentLoadOp, AttachmentReference, AttachmentStoreOp, RenderPassAttachmentDesc,
    RenderPassDesc, ShadingRateAttachment, SubpassDependencyDesc, SubpassDesc,
};
pub use object::RenderPass;
pub use validation::validate_render_pass_desc;
