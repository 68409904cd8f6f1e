use std::hash::{Hash, Hasher};

use crate::core::{AccessFlags, PipelineStageFlags, ResourceState, TextureFormat};
use crate::settings::ATTACHMENT_UNUSED;

/// What happens to an attachment's contents at the start of a subpass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AttachmentLoadOp {
    #[default]
    Load,
    Clear,
    Discard,
}

/// What happens to an attachment's contents at the end of a subpass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AttachmentStoreOp {
    #[default]
    Store,
    Discard,
}

/// One attachment of a render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderPassAttachmentDesc {
    pub format: TextureFormat,
    pub sample_count: u8,
    pub load_op: AttachmentLoadOp,
    pub store_op: AttachmentStoreOp,
    pub stencil_load_op: AttachmentLoadOp,
    pub stencil_store_op: AttachmentStoreOp,
    pub initial_state: ResourceState,
    pub final_state: ResourceState,
}

impl Default for RenderPassAttachmentDesc {
    fn default() -> Self {
        Self {
            format: TextureFormat::Unknown,
            sample_count: 1,
            load_op: AttachmentLoadOp::Load,
            store_op: AttachmentStoreOp::Store,
            stencil_load_op: AttachmentLoadOp::Load,
            stencil_store_op: AttachmentStoreOp::Store,
            initial_state: ResourceState::UNDEFINED,
            final_state: ResourceState::UNDEFINED,
        }
    }
}

impl RenderPassAttachmentDesc {
    /// Attachment kept in `state` for the whole pass.
    #[must_use]
    pub fn new(format: TextureFormat, state: ResourceState) -> Self {
        Self {
            format,
            initial_state: state,
            final_state: state,
            ..Self::default()
        }
    }
}

/// Reference from a subpass to one of the pass's attachments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttachmentReference {
    /// Index into [`RenderPassDesc::attachments`], or `ATTACHMENT_UNUSED`.
    pub attachment_index: u32,
    /// State the attachment is in during the subpass.
    pub state: ResourceState,
}

impl AttachmentReference {
    #[must_use]
    pub const fn new(attachment_index: u32, state: ResourceState) -> Self {
        Self {
            attachment_index,
            state,
        }
    }

    pub const UNUSED: Self = Self::new(ATTACHMENT_UNUSED, ResourceState::UNDEFINED);

    #[inline]
    #[must_use]
    pub fn is_used(&self) -> bool {
        self.attachment_index != ATTACHMENT_UNUSED
    }
}

/// Shading-rate attachment of a subpass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShadingRateAttachment {
    pub attachment: AttachmentReference,
    pub tile_size: [u32; 2],
}

/// One subpass.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SubpassDesc {
    pub input_attachments: Vec<AttachmentReference>,
    /// Render-target slots; unused slots hold [`AttachmentReference::UNUSED`].
    pub render_target_attachments: Vec<AttachmentReference>,
    /// When present, one entry per render-target slot.
    pub resolve_attachments: Option<Vec<AttachmentReference>>,
    pub depth_stencil_attachment: Option<AttachmentReference>,
    pub preserve_attachments: Vec<u32>,
    pub shading_rate_attachment: Option<ShadingRateAttachment>,
}

impl SubpassDesc {
    /// Number of render-target slots that reference an attachment.
    #[must_use]
    pub fn used_render_target_count(&self) -> usize {
        self.render_target_attachments
            .iter()
            .filter(|r| r.is_used())
            .count()
    }

    #[must_use]
    pub fn uses_depth_stencil(&self) -> bool {
        self.depth_stencil_attachment
            .is_some_and(|r| r.is_used())
    }
}

/// Execution/memory dependency between two subpasses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubpassDependencyDesc {
    /// Source subpass index, or `SUBPASS_EXTERNAL`.
    pub src_subpass: u32,
    pub dst_subpass: u32,
    pub src_stage_mask: PipelineStageFlags,
    pub dst_stage_mask: PipelineStageFlags,
    pub src_access_mask: AccessFlags,
    pub dst_access_mask: AccessFlags,
}

/// Complete description of a render pass.
///
/// Equality and hashing ignore `name`.
#[derive(Debug, Clone, Default)]
pub struct RenderPassDesc {
    pub name: String,
    pub attachments: Vec<RenderPassAttachmentDesc>,
    pub subpasses: Vec<SubpassDesc>,
    pub dependencies: Vec<SubpassDependencyDesc>,
}

impl RenderPassDesc {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_attachment(mut self, attachment: RenderPassAttachmentDesc) -> Self {
        self.attachments.push(attachment);
        self
    }

    #[must_use]
    pub fn with_subpass(mut self, subpass: SubpassDesc) -> Self {
        self.subpasses.push(subpass);
        self
    }

    #[must_use]
    pub fn with_dependency(mut self, dependency: SubpassDependencyDesc) -> Self {
        self.dependencies.push(dependency);
        self
    }
}

impl PartialEq for RenderPassDesc {
    fn eq(&self, other: &Self) -> bool {
        self.attachments == other.attachments
            && self.subpasses == other.subpasses
            && self.dependencies == other.dependencies
    }
}

impl Eq for RenderPassDesc {}

impl Hash for RenderPassDesc {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.attachments.hash(state);
        self.subpasses.hash(state);
        self.dependencies.hash(state);
    }
}
