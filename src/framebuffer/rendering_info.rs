//! Inline attachment description for dynamic rendering.
//!
//! Backends without persistent framebuffer objects begin rendering with a
//! [`RenderingInfo`] instead. It is built from a
//! [`FramebufferCacheKey`](super::FramebufferCacheKey) by
//! [`FramebufferCache::dynamic_rendering_info`](super::FramebufferCache::dynamic_rendering_info)
//! and never cached.

use crate::core::NativeHandle;
use crate::errors::{GraphicsError, Result};
use crate::render_pass::{AttachmentLoadOp, AttachmentStoreOp};

/// Image layout an attachment is accessed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageLayout {
    #[default]
    Undefined,
    ColorAttachment,
    DepthStencilAttachment,
    DepthStencilReadOnly,
    ShadingRateAttachment,
}

/// Resolve of a multisampled attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResolveMode {
    #[default]
    None,
    Average,
    Min,
    Max,
}

/// Clear value of one attachment.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ClearValue {
    #[default]
    None,
    Color([f32; 4]),
    Depth(f32),
    Stencil(u32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderingAttachment {
    pub view: Option<NativeHandle>,
    pub layout: ImageLayout,
    pub resolve_mode: ResolveMode,
    pub resolve_view: Option<NativeHandle>,
    pub resolve_layout: ImageLayout,
    pub load_op: AttachmentLoadOp,
    pub store_op: AttachmentStoreOp,
    pub clear_value: ClearValue,
}

impl RenderingAttachment {
    fn new(view: Option<NativeHandle>, layout: ImageLayout) -> Self {
        Self {
            view,
            layout,
            resolve_mode: ResolveMode::None,
            resolve_view: None,
            resolve_layout: ImageLayout::Undefined,
            load_op: AttachmentLoadOp::Load,
            store_op: AttachmentStoreOp::Store,
            clear_value: ClearValue::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShadingRateAttachmentInfo {
    pub view: NativeHandle,
    pub layout: ImageLayout,
    pub texel_size: [u32; 2],
}

/// Render area offset and extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect2D {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Caller-side parameters of
/// [`FramebufferCache::dynamic_rendering_info`](super::FramebufferCache::dynamic_rendering_info).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DynamicRenderingAttribs {
    pub width: u32,
    pub height: u32,
    pub layers: u32,
    pub view_mask: u32,
    pub use_depth_attachment: bool,
    pub use_stencil_attachment: bool,
    pub read_only_depth_stencil: bool,
    pub shading_rate_texel_size: [u32; 2],
}

/// Attachments for one dynamic-rendering scope.
///
/// Attachment indices for the clear mask are colour slots first, then depth,
/// then stencil.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderingInfo {
    hash: u64,
    pub render_area: Rect2D,
    pub layer_count: u32,
    pub view_mask: u32,
    pub color_attachments: Vec<RenderingAttachment>,
    pub depth_attachment: Option<RenderingAttachment>,
    pub stencil_attachment: Option<RenderingAttachment>,
    pub shading_rate_attachment: Option<ShadingRateAttachmentInfo>,
    clear_mask: u32,
}

impl RenderingInfo {
    pub(crate) fn new(
        hash: u64,
        color_views: &[Option<NativeHandle>],
        depth_stencil: Option<(Option<NativeHandle>, ImageLayout)>,
        attribs: &DynamicRenderingAttribs,
    ) -> Self {
        let ds_attachment = |enabled: bool| {
            enabled
                .then_some(depth_stencil)
                .flatten()
                .map(|(view, layout)| RenderingAttachment::new(view, layout))
        };

        Self {
            hash,
            render_area: Rect2D {
                x: 0,
                y: 0,
                width: attribs.width,
                height: attribs.height,
            },
            layer_count: attribs.layers,
            view_mask: attribs.view_mask,
            color_attachments: color_views
                .iter()
                .map(|&view| RenderingAttachment::new(view, ImageLayout::ColorAttachment))
                .collect(),
            depth_attachment: ds_attachment(attribs.use_depth_attachment),
            stencil_attachment: ds_attachment(attribs.use_stencil_attachment),
            shading_rate_attachment: None,
            clear_mask: 0,
        }
    }

    /// Hash of the key this info was built from.
    #[inline]
    #[must_use]
    pub fn hash(&self) -> u64 {
        self.hash
    }

    fn depth_index(&self) -> u32 {
        self.color_attachments.len() as u32
    }

    fn stencil_index(&self) -> u32 {
        self.depth_index() + u32::from(self.depth_attachment.is_some())
    }

    /// Clears colour attachment `index` to `color` on load.
    pub fn set_color_clear_value(&mut self, index: usize, color: [f32; 4]) -> Result<()> {
        let count = self.color_attachments.len();
        let attachment = self.color_attachments.get_mut(index).ok_or_else(|| {
            GraphicsError::InvalidDescription(format!(
                "colour attachment {index} is out of range ({count} attachment(s))"
            ))
        })?;
        attachment.clear_value = ClearValue::Color(color);
        attachment.load_op = AttachmentLoadOp::Clear;
        self.clear_mask |= 1 << index;
        Ok(())
    }

    /// Clears the depth attachment to `depth` on load.
    pub fn set_depth_clear_value(&mut self, depth: f32) -> Result<()> {
        let bit = 1 << self.depth_index();
        let attachment = self.depth_attachment.as_mut().ok_or_else(|| {
            GraphicsError::InvalidDescription("rendering info has no depth attachment".into())
        })?;
        attachment.clear_value = ClearValue::Depth(depth);
        attachment.load_op = AttachmentLoadOp::Clear;
        self.clear_mask |= bit;
        Ok(())
    }

    /// Clears the stencil attachment to `stencil` on load.
    pub fn set_stencil_clear_value(&mut self, stencil: u32) -> Result<()> {
        let bit = 1 << self.stencil_index();
        let attachment = self.stencil_attachment.as_mut().ok_or_else(|| {
            GraphicsError::InvalidDescription("rendering info has no stencil attachment".into())
        })?;
        attachment.clear_value = ClearValue::Stencil(stencil);
        attachment.load_op = AttachmentLoadOp::Clear;
        self.clear_mask |= bit;
        Ok(())
    }

    /// Restores `LOAD` on every attachment that was set to clear.
    pub fn reset_clears(&mut self) {
        let depth_index = self.depth_index();
        let stencil_index = self.stencil_index();
        let mut mask = self.clear_mask;
        while mask != 0 {
            let index = mask.trailing_zeros();
            mask &= mask - 1;

            let attachment = if index < depth_index {
                self.color_attachments.get_mut(index as usize)
            } else if index == depth_index && self.depth_attachment.is_some() {
                self.depth_attachment.as_mut()
            } else if index == stencil_index {
                self.stencil_attachment.as_mut()
            } else {
                None
            };
            if let Some(attachment) = attachment {
                attachment.load_op = AttachmentLoadOp::Load;
                attachment.clear_value = ClearValue::None;
            }
        }
        self.clear_mask = 0;
    }

    #[inline]
    #[must_use]
    pub fn has_clears(&self) -> bool {
        self.clear_mask != 0
    }
}
