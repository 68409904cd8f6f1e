//! Device-object identity and lifetime plumbing.
//!
//! Every device object gets a process-unique [`ObjectId`] on creation, never
//! reused while the process lives. Descriptions that compare objects by
//! identity ([`FramebufferDesc`](crate::framebuffer::FramebufferDesc)) store
//! these ids, so two views of the same image stay distinct.
//!
//! The framebuffer cache keys its entries and both reverse indices by the
//! backend [`NativeHandle`] of each view and render pass instead; a handle is
//! unique among live objects, and destruction removes it from the indices
//! before the backend can hand it out again.
//!
//! Objects that caches index ([`TextureView`](super::TextureView),
//! [`RenderPass`](crate::render_pass::RenderPass)) carry a [`DestroyCallbacks`]
//! list. Caches register a closure holding a `Weak` to themselves; the list
//! runs every closure when the object drops.

use std::fmt;
use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::framebuffer::Framebuffer;
use crate::raytracing::{BottomLevelAs, TopLevelAs};
use crate::render_pass::RenderPass;
use crate::shader::{PipelineState, Shader};

use super::TextureView;

// ─── Identity ────────────────────────────────────────────────────────────────

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a device object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    /// Allocates a fresh id.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque backend handle (`VkImageView`, D3D12 descriptor, ...).
///
/// Zero is reserved for "null"; optional handles are `Option<NativeHandle>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeHandle(NonZeroU64);

impl NativeHandle {
    /// Wraps a raw backend value. Returns `None` for zero.
    #[inline]
    #[must_use]
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    #[inline]
    #[must_use]
    pub fn raw(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

// ─── Device object trait ─────────────────────────────────────────────────────

/// Kind tag of a device object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    TextureView,
    RenderPass,
    Framebuffer,
    BottomLevelAs,
    TopLevelAs,
    Shader,
    PipelineState,
}

/// Capabilities shared by every device object.
pub trait DeviceObject: Send + Sync {
    fn unique_id(&self) -> ObjectId;

    fn name(&self) -> &str;

    fn kind(&self) -> ObjectKind;

    /// Backend handle, if the object has one.
    fn native_handle(&self) -> Option<NativeHandle> {
        None
    }
}

/// A device object of any kind, for containers that hold several kinds.
#[derive(Clone)]
pub enum AnyDeviceObject {
    TextureView(Arc<TextureView>),
    RenderPass(Arc<RenderPass>),
    Framebuffer(Arc<Framebuffer>),
    BottomLevelAs(Arc<BottomLevelAs>),
    TopLevelAs(Arc<TopLevelAs>),
    Shader(Arc<dyn Shader>),
    PipelineState(Arc<dyn PipelineState>),
}

impl AnyDeviceObject {
    /// Borrows the object through the common trait.
    #[must_use]
    pub fn as_device_object(&self) -> &dyn DeviceObject {
        match self {
            Self::TextureView(o) => o.as_ref(),
            Self::RenderPass(o) => o.as_ref(),
            Self::Framebuffer(o) => o.as_ref(),
            Self::BottomLevelAs(o) => o.as_ref(),
            Self::TopLevelAs(o) => o.as_ref(),
            Self::Shader(o) => o.as_ref(),
            Self::PipelineState(o) => o.as_ref(),
        }
    }

    #[must_use]
    pub fn unique_id(&self) -> ObjectId {
        self.as_device_object().unique_id()
    }

    #[must_use]
    pub fn kind(&self) -> ObjectKind {
        self.as_device_object().kind()
    }
}

impl fmt::Debug for AnyDeviceObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let obj = self.as_device_object();
        f.debug_struct("AnyDeviceObject")
            .field("kind", &obj.kind())
            .field("id", &obj.unique_id())
            .field("name", &obj.name())
            .finish()
    }
}

// ─── Destruction callbacks ───────────────────────────────────────────────────

type DestroyCallback = Box<dyn FnOnce(ObjectId) + Send>;

/// Callbacks run once when the owning object drops.
#[derive(Default)]
pub struct DestroyCallbacks {
    callbacks: Mutex<Vec<DestroyCallback>>,
}

impl DestroyCallbacks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `f` to be called with the owner's id on destruction.
    pub fn register(&self, f: impl FnOnce(ObjectId) + Send + 'static) {
        self.callbacks.lock().push(Box::new(f));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.callbacks.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs and drops every registered callback.
    pub fn run(&self, id: ObjectId) {
        // Taken out of the lock so callbacks may register on other objects.
        let callbacks = std::mem::take(&mut *self.callbacks.lock());
        for f in callbacks {
            f(id);
        }
    }
}

impl fmt::Debug for DestroyCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DestroyCallbacks")
            .field("count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn ids_are_unique_and_increasing() {
        let a = ObjectId::next();
        let b = ObjectId::next();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn null_native_handle_is_none() {
        assert!(NativeHandle::new(0).is_none());
        assert_eq!(NativeHandle::new(7).map(NativeHandle::raw), Some(7));
    }

    #[test]
    fn callbacks_run_once() {
        let hits = Arc::new(AtomicUsize::new(0));
        let callbacks = DestroyCallbacks::new();
        for _ in 0..3 {
            let hits = hits.clone();
            callbacks.register(move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
            });
        }
        let id = ObjectId::next();
        callbacks.run(id);
        callbacks.run(id);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
        assert!(callbacks.is_empty());
    }
}
