//! Framebuffer cache keys.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

use rustc_hash::FxHasher;
use smallvec::SmallVec;

use crate::core::{NativeHandle, TextureView};
use crate::errors::{GraphicsError, Result};
use crate::render_pass::RenderPass;
use crate::settings::MAX_RENDER_TARGETS;

type RtvArray = SmallVec<[Option<NativeHandle>; MAX_RENDER_TARGETS]>;

/// Identity of a backend framebuffer: render pass, attachment views and the
/// command queues that may use it.
///
/// The hash is computed on first use and cached. Equality compares the hash
/// before the fields.
pub struct FramebufferCacheKey {
    pass: NativeHandle,
    dsv: Option<NativeHandle>,
    rtvs: RtvArray,
    shading_rate: Option<NativeHandle>,
    command_queue_mask: u64,
    /// 0 until computed.
    hash: AtomicU64,
}

impl FramebufferCacheKey {
    /// Builds a key from raw handles.
    ///
    /// `rtvs` are render-target slots in order; `None` marks an unbound slot.
    pub fn new(
        pass: NativeHandle,
        dsv: Option<NativeHandle>,
        rtvs: &[Option<NativeHandle>],
        shading_rate: Option<NativeHandle>,
        command_queue_mask: u64,
    ) -> Result<Self> {
        if rtvs.len() > MAX_RENDER_TARGETS {
            return Err(GraphicsError::InvalidDescription(format!(
                "framebuffer key has {} render targets; at most {MAX_RENDER_TARGETS} are supported",
                rtvs.len()
            )));
        }
        Ok(Self {
            pass,
            dsv,
            rtvs: rtvs.iter().copied().collect(),
            shading_rate,
            command_queue_mask,
            hash: AtomicU64::new(0),
        })
    }

    /// Builds a key for subpass `subpass_index` of `render_pass`.
    ///
    /// Every used render-target slot of the subpass must have a view and every
    /// unused slot must be empty; a depth-stencil view is required iff the
    /// subpass references a depth-stencil attachment.
    pub fn for_subpass(
        render_pass: &RenderPass,
        subpass_index: usize,
        dsv: Option<&TextureView>,
        rtvs: &[Option<&TextureView>],
        shading_rate: Option<&TextureView>,
        command_queue_mask: u64,
    ) -> Result<Self> {
        let name = &render_pass.desc().name;
        let invalid = |reason: String| {
            Err(GraphicsError::InvalidDescription(format!(
                "framebuffer for render pass '{name}', subpass {subpass_index}: {reason}"
            )))
        };

        let Some(subpass) = render_pass.subpass(subpass_index) else {
            return invalid("subpass index is out of range".into());
        };

        let refs = &subpass.render_target_attachments;
        if rtvs.len() != refs.len() {
            return invalid(format!(
                "{} render target view slot(s) given, subpass has {}",
                rtvs.len(),
                refs.len()
            ));
        }
        for (slot, (view, reference)) in rtvs.iter().zip(refs).enumerate() {
            if view.is_some() != reference.is_used() {
                return invalid(format!(
                    "render target slot {slot} is {} in the subpass but {} in the key",
                    if reference.is_used() { "used" } else { "unused" },
                    if view.is_some() { "bound" } else { "empty" },
                ));
            }
        }
        if dsv.is_some() != subpass.uses_depth_stencil() {
            return invalid(if dsv.is_some() {
                "depth-stencil view given but the subpass has no depth-stencil attachment".into()
            } else {
                "the subpass uses a depth-stencil attachment but no view was given".into()
            });
        }

        let handles: RtvArray = rtvs.iter().map(|v| v.map(TextureView::handle)).collect();
        Self::new(
            render_pass.handle(),
            dsv.map(TextureView::handle),
            &handles,
            shading_rate.map(TextureView::handle),
            command_queue_mask,
        )
    }

    #[inline]
    #[must_use]
    pub fn pass(&self) -> NativeHandle {
        self.pass
    }

    #[inline]
    #[must_use]
    pub fn dsv(&self) -> Option<NativeHandle> {
        self.dsv
    }

    /// Render-target slots, including empty ones.
    #[inline]
    #[must_use]
    pub fn rtvs(&self) -> &[Option<NativeHandle>] {
        &self.rtvs
    }

    #[inline]
    #[must_use]
    pub fn num_render_targets(&self) -> usize {
        self.rtvs.len()
    }

    #[inline]
    #[must_use]
    pub fn shading_rate(&self) -> Option<NativeHandle> {
        self.shading_rate
    }

    #[inline]
    #[must_use]
    pub fn command_queue_mask(&self) -> u64 {
        self.command_queue_mask
    }

    /// `true` if `view` is bound to any slot of this key.
    #[must_use]
    pub fn uses_view(&self, view: NativeHandle) -> bool {
        self.rtvs.contains(&Some(view)) || self.dsv == Some(view) || self.shading_rate == Some(view)
    }

    /// Every bound view, deduplicated, in attachment order.
    #[must_use]
    pub fn views(&self) -> SmallVec<[NativeHandle; MAX_RENDER_TARGETS + 2]> {
        let mut views = SmallVec::new();
        for view in self.attachments() {
            if !views.contains(&view) {
                views.push(view);
            }
        }
        views
    }

    /// Attachments in framebuffer order: depth-stencil, bound render targets,
    /// shading rate.
    #[must_use]
    pub fn attachments(&self) -> SmallVec<[NativeHandle; MAX_RENDER_TARGETS + 2]> {
        self.dsv
            .into_iter()
            .chain(self.rtvs.iter().flatten().copied())
            .chain(self.shading_rate)
            .collect()
    }

    /// The cached 64-bit hash, computed on first call.
    #[must_use]
    pub fn hash_value(&self) -> u64 {
        let cached = self.hash.load(Ordering::Relaxed);
        if cached != 0 {
            return cached;
        }

        let mut hasher = FxHasher::default();
        self.pass.hash(&mut hasher);
        self.rtvs.len().hash(&mut hasher);
        self.dsv.hash(&mut hasher);
        self.shading_rate.hash(&mut hasher);
        self.command_queue_mask.hash(&mut hasher);
        for rtv in &self.rtvs {
            rtv.hash(&mut hasher);
        }
        // 0 is the "not computed" marker.
        let hash = hasher.finish().max(1);
        self.hash.store(hash, Ordering::Relaxed);
        hash
    }
}

impl Clone for FramebufferCacheKey {
    fn clone(&self) -> Self {
        Self {
            pass: self.pass,
            dsv: self.dsv,
            rtvs: self.rtvs.clone(),
            shading_rate: self.shading_rate,
            command_queue_mask: self.command_queue_mask,
            hash: AtomicU64::new(self.hash.load(Ordering::Relaxed)),
        }
    }
}

impl PartialEq for FramebufferCacheKey {
    fn eq(&self, other: &Self) -> bool {
        self.hash_value() == other.hash_value()
            && self.pass == other.pass
            && self.dsv == other.dsv
            && self.shading_rate == other.shading_rate
            && self.command_queue_mask == other.command_queue_mask
            && self.rtvs == other.rtvs
    }
}

impl Eq for FramebufferCacheKey {}

impl Hash for FramebufferCacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash_value());
    }
}

impl fmt::Debug for FramebufferCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FramebufferCacheKey")
            .field("pass", &self.pass)
            .field("dsv", &self.dsv)
            .field("rtvs", &self.rtvs)
            .field("shading_rate", &self.shading_rate)
            .field("command_queue_mask", &self.command_queue_mask)
            .finish()
    }
}
