use std::fmt;
use std::hash::{Hash, Hasher};

use crate::core::{DeviceObject, NativeHandle, ObjectId, ObjectKind, TextureView};
use crate::render_pass::RenderPass;

/// Description of an explicitly created framebuffer.
///
/// Views and the render pass are compared by object identity: two views of
/// the same texture are different attachments. `name` is ignored by equality
/// and hashing.
#[derive(Debug, Clone, Default)]
pub struct FramebufferDesc {
    pub name: String,
    pub render_pass: Option<ObjectId>,
    pub attachments: Vec<Option<ObjectId>>,
    pub width: u32,
    pub height: u32,
    pub num_array_slices: u32,
}

impl FramebufferDesc {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        render_pass: &RenderPass,
        attachments: &[Option<&TextureView>],
        width: u32,
        height: u32,
        num_array_slices: u32,
    ) -> Self {
        Self {
            name: name.into(),
            render_pass: Some(render_pass.unique_id()),
            attachments: attachments
                .iter()
                .map(|v| v.map(DeviceObject::unique_id))
                .collect(),
            width,
            height,
            num_array_slices,
        }
    }
}

impl PartialEq for FramebufferDesc {
    fn eq(&self, other: &Self) -> bool {
        self.render_pass == other.render_pass
            && self.attachments == other.attachments
            && self.width == other.width
            && self.height == other.height
            && self.num_array_slices == other.num_array_slices
    }
}

impl Eq for FramebufferDesc {}

impl Hash for FramebufferDesc {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.render_pass.hash(state);
        self.attachments.hash(state);
        self.width.hash(state);
        self.height.hash(state);
        self.num_array_slices.hash(state);
    }
}

/// A framebuffer created outside the cache, wrapping a backend object.
pub struct Framebuffer {
    id: ObjectId,
    desc: FramebufferDesc,
    native: NativeHandle,
}

impl Framebuffer {
    #[must_use]
    pub fn new(desc: FramebufferDesc, native: NativeHandle) -> Self {
        Self {
            id: ObjectId::next(),
            desc,
            native,
        }
    }

    #[inline]
    #[must_use]
    pub fn desc(&self) -> &FramebufferDesc {
        &self.desc
    }
}

impl DeviceObject for Framebuffer {
    fn unique_id(&self) -> ObjectId {
        self.id
    }

    fn name(&self) -> &str {
        &self.desc.name
    }

    fn kind(&self) -> ObjectKind {
        ObjectKind::Framebuffer
    }

    fn native_handle(&self) -> Option<NativeHandle> {
        Some(self.native)
    }
}

impl fmt::Debug for Framebuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Framebuffer")
            .field("id", &self.id)
            .field("desc", &self.desc)
            .field("native", &self.native)
            .finish()
    }
}
