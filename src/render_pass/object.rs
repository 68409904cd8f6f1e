use std::fmt;

use crate::core::{DestroyCallbacks, DeviceObject, NativeHandle, ObjectId, ObjectKind};
use crate::errors::Result;

use super::{validate_render_pass_desc, RenderPassDesc, SubpassDesc};

/// A validated, immutable render pass bound to a backend object.
pub struct RenderPass {
    id: ObjectId,
    desc: RenderPassDesc,
    native: NativeHandle,
    callbacks: DestroyCallbacks,
}

impl RenderPass {
    /// Validates `desc` and wraps the backend object.
    ///
    /// Nothing is created when validation fails.
    pub fn new(desc: RenderPassDesc, native: NativeHandle) -> Result<Self> {
        validate_render_pass_desc(&desc)?;
        log::debug!(
            "Render pass '{}' created: {} attachment(s), {} subpass(es)",
            desc.name,
            desc.attachments.len(),
            desc.subpasses.len()
        );
        Ok(Self {
            id: ObjectId::next(),
            desc,
            native,
            callbacks: DestroyCallbacks::new(),
        })
    }

    #[inline]
    #[must_use]
    pub fn desc(&self) -> &RenderPassDesc {
        &self.desc
    }

    #[inline]
    #[must_use]
    pub fn handle(&self) -> NativeHandle {
        self.native
    }

    #[must_use]
    pub fn subpass(&self, index: usize) -> Option<&SubpassDesc> {
        self.desc.subpasses.get(index)
    }

    /// Registers a callback run when this render pass is destroyed.
    pub fn on_destroy(&self, f: impl FnOnce(ObjectId) + Send + 'static) {
        self.callbacks.register(f);
    }
}

impl DeviceObject for RenderPass {
    fn unique_id(&self) -> ObjectId {
        self.id
    }

    fn name(&self) -> &str {
        &self.desc.name
    }

    fn kind(&self) -> ObjectKind {
        ObjectKind::RenderPass
    }

    fn native_handle(&self) -> Option<NativeHandle> {
        Some(self.native)
    }
}

impl Drop for RenderPass {
    fn drop(&mut self) {
        self.callbacks.run(self.id);
    }
}

impl fmt::Debug for RenderPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderPass")
            .field("id", &self.id)
            .field("desc", &self.desc)
            .field("native", &self.native)
            .finish_non_exhaustive()
    }
}
