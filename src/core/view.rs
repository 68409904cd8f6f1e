use std::fmt;

use super::{DestroyCallbacks, DeviceObject, NativeHandle, ObjectId, ObjectKind, TextureFormat};

/// How a texture view may be bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureViewType {
    #[default]
    ShaderResource,
    RenderTarget,
    DepthStencil,
    ReadOnlyDepthStencil,
    UnorderedAccess,
    ShadingRate,
}

#[derive(Debug, Clone, Default)]
pub struct TextureViewDesc {
    pub name: String,
    pub view_type: TextureViewType,
    pub format: TextureFormat,
}

/// A typed view of a texture, usable as a framebuffer attachment.
///
/// Caches that hold keys referencing the view register themselves through
/// [`on_destroy`](Self::on_destroy) and are notified when the view drops.
pub struct TextureView {
    id: ObjectId,
    desc: TextureViewDesc,
    native: NativeHandle,
    callbacks: DestroyCallbacks,
}

impl TextureView {
    #[must_use]
    pub fn new(desc: TextureViewDesc, native: NativeHandle) -> Self {
        Self {
            id: ObjectId::next(),
            desc,
            native,
            callbacks: DestroyCallbacks::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn desc(&self) -> &TextureViewDesc {
        &self.desc
    }

    #[inline]
    #[must_use]
    pub fn format(&self) -> TextureFormat {
        self.desc.format
    }

    #[inline]
    #[must_use]
    pub fn handle(&self) -> NativeHandle {
        self.native
    }

    /// Registers a callback run when this view is destroyed.
    pub fn on_destroy(&self, f: impl FnOnce(ObjectId) + Send + 'static) {
        self.callbacks.register(f);
    }
}

impl DeviceObject for TextureView {
    fn unique_id(&self) -> ObjectId {
        self.id
    }

    fn name(&self) -> &str {
        &self.desc.name
    }

    fn kind(&self) -> ObjectKind {
        ObjectKind::TextureView
    }

    fn native_handle(&self) -> Option<NativeHandle> {
        Some(self.native)
    }
}

impl Drop for TextureView {
    fn drop(&mut self) {
        self.callbacks.run(self.id);
    }
}

impl fmt::Debug for TextureView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextureView")
            .field("id", &self.id)
            .field("name", &self.desc.name)
            .field("format", &self.desc.format)
            .field("native", &self.native)
            .finish_non_exhaustive()
    }
}
