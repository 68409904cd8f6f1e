//! Framebuffer Cache
//!
//! Memoizes backend framebuffers by [`FramebufferCacheKey`] and releases them
//! as soon as any view or render pass they were built from is destroyed.
//!
//! # Layout
//!
//! ```text
//! cache:        key  → backend framebuffer
//! view_to_keys: view → [key]     (RTV, DSV and shading-rate views)
//! pass_to_keys: pass → [key]
//! ```
//!
//! One mutex guards all three maps. A key is in `cache` iff it is listed under
//! its render pass and under every view it binds; invalidation removes every
//! reverse entry of each dropped key, so neither index holds stale keys.
//!
//! Released framebuffers go to the backend's deferred-destruction queue tagged
//! with the key's command-queue mask.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::core::{NativeHandle, TextureView};
use crate::device::{FramebufferCreateInfo, FramebufferFactory};
use crate::errors::{GraphicsError, Result};
use crate::render_pass::RenderPass;

use super::key::FramebufferCacheKey;
use super::rendering_info::{DynamicRenderingAttribs, ImageLayout, RenderingInfo, ShadingRateAttachmentInfo};

type KeyList = Vec<FramebufferCacheKey>;

struct Inner<F> {
    cache: FxHashMap<FramebufferCacheKey, F>,
    view_to_keys: FxHashMap<NativeHandle, KeyList>,
    pass_to_keys: FxHashMap<NativeHandle, KeyList>,
}

impl<F> Default for Inner<F> {
    fn default() -> Self {
        Self {
            cache: FxHashMap::default(),
            view_to_keys: FxHashMap::default(),
            pass_to_keys: FxHashMap::default(),
        }
    }
}

fn remove_key(map: &mut FxHashMap<NativeHandle, KeyList>, at: NativeHandle, key: &FramebufferCacheKey) {
    if let Some(keys) = map.get_mut(&at) {
        keys.retain(|k| k != key);
        if keys.is_empty() {
            map.remove(&at);
        }
    }
}

/// Thread-safe cache of backend framebuffers.
pub struct FramebufferCache<B: FramebufferFactory> {
    factory: Arc<B>,
    inner: Mutex<Inner<B::Framebuffer>>,
}

impl<B: FramebufferFactory> FramebufferCache<B> {
    #[must_use]
    pub fn new(factory: Arc<B>) -> Self {
        Self {
            factory,
            inner: Mutex::new(Inner::default()),
        }
    }

    #[must_use]
    pub fn factory(&self) -> &Arc<B> {
        &self.factory
    }

    // ── Lookup ───────────────────────────────────────────────────────────────

    /// Returns the framebuffer for `key`, creating it on first use.
    ///
    /// On backend failure nothing is inserted.
    pub fn get_or_create(
        &self,
        key: &FramebufferCacheKey,
        width: u32,
        height: u32,
        layers: u32,
    ) -> Result<NativeHandle> {
        let mut inner = self.inner.lock();

        if let Some(fb) = inner.cache.get(key) {
            return Ok(self.factory.framebuffer_handle(fb));
        }

        let attachments = key.attachments();
        let fb = self
            .factory
            .create_framebuffer(&FramebufferCreateInfo {
                render_pass: key.pass(),
                attachments: &attachments,
                width,
                height,
                layers,
            })
            .map_err(|e| match e {
                e @ GraphicsError::BackendResourceCreationFailed { .. } => e,
                other => GraphicsError::creation_failed("framebuffer", other.to_string()),
            })?;
        let handle = self.factory.framebuffer_handle(&fb);

        log::debug!(
            "Framebuffer {handle} created: pass {}, {} attachment(s), {width}x{height}x{layers}",
            key.pass(),
            attachments.len()
        );

        let inner = &mut *inner;
        inner
            .pass_to_keys
            .entry(key.pass())
            .or_default()
            .push(key.clone());
        for view in key.views() {
            inner.view_to_keys.entry(view).or_default().push(key.clone());
        }
        let previous = inner.cache.insert(key.clone(), fb);
        debug_assert!(previous.is_none(), "new framebuffer must be inserted into the map");

        Ok(handle)
    }

    /// Builds the inline attachment description for dynamic rendering.
    ///
    /// Nothing is cached. Colour slots follow the key's render-target slots;
    /// depth and stencil attachments reference the key's DSV and are present
    /// only when `attribs` asks for them.
    #[must_use]
    pub fn dynamic_rendering_info(
        &self,
        key: &FramebufferCacheKey,
        attribs: &DynamicRenderingAttribs,
    ) -> RenderingInfo {
        let ds_layout = if attribs.read_only_depth_stencil {
            ImageLayout::DepthStencilReadOnly
        } else {
            ImageLayout::DepthStencilAttachment
        };

        let mut info = RenderingInfo::new(key.hash_value(), key.rtvs(), Some((key.dsv(), ds_layout)), attribs);
        info.shading_rate_attachment = key.shading_rate().map(|view| ShadingRateAttachmentInfo {
            view,
            layout: ImageLayout::ShadingRateAttachment,
            texel_size: attribs.shading_rate_texel_size,
        });
        info
    }

    // ── Invalidation ─────────────────────────────────────────────────────────

    /// Releases every framebuffer that binds `view`.
    pub fn on_view_destroyed(&self, view: NativeHandle) {
        let mut inner = self.inner.lock();
        let inner = &mut *inner;

        let Some(keys) = inner.view_to_keys.remove(&view) else {
            return;
        };

        for key in keys {
            self.release_entry(&mut inner.cache, &key);
            remove_key(&mut inner.pass_to_keys, key.pass(), &key);
            for other in key.views() {
                if other != view {
                    remove_key(&mut inner.view_to_keys, other, &key);
                }
            }
        }
    }

    /// Releases every framebuffer created for `pass`.
    pub fn on_render_pass_destroyed(&self, pass: NativeHandle) {
        let mut inner = self.inner.lock();
        let inner = &mut *inner;

        let Some(keys) = inner.pass_to_keys.remove(&pass) else {
            return;
        };

        for key in keys {
            self.release_entry(&mut inner.cache, &key);
            for view in key.views() {
                remove_key(&mut inner.view_to_keys, view, &key);
            }
        }
    }

    fn release_entry(&self, cache: &mut FxHashMap<FramebufferCacheKey, B::Framebuffer>, key: &FramebufferCacheKey) {
        if let Some(fb) = cache.remove(key) {
            log::debug!("Framebuffer {} released", self.factory.framebuffer_handle(&fb));
            self.factory.safe_release_framebuffer(fb, key.command_queue_mask());
        } else {
            log::error!("Framebuffer cache: reverse index references a key missing from the cache: {key:?}");
            debug_assert!(false, "reverse index references a key missing from the cache");
        }
    }

    /// Releases every cached framebuffer.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        let Inner { cache, .. } = std::mem::take(&mut *inner);
        for (key, fb) in cache {
            self.factory.safe_release_framebuffer(fb, key.command_queue_mask());
        }
    }

    // ── Introspection ────────────────────────────────────────────────────────

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().cache.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().cache.is_empty()
    }

    /// `true` if a framebuffer for `key` is cached.
    #[must_use]
    pub fn contains(&self, key: &FramebufferCacheKey) -> bool {
        self.inner.lock().cache.contains_key(key)
    }

    /// Number of keys recorded under `view` in the reverse index.
    #[must_use]
    pub fn keys_for_view(&self, view: NativeHandle) -> usize {
        self.inner.lock().view_to_keys.get(&view).map_or(0, Vec::len)
    }

    /// Number of keys recorded under `pass` in the reverse index.
    #[must_use]
    pub fn keys_for_render_pass(&self, pass: NativeHandle) -> usize {
        self.inner.lock().pass_to_keys.get(&pass).map_or(0, Vec::len)
    }

    /// Cross-checks the primary map against both reverse indices.
    pub fn check_invariants(&self) -> Result<()> {
        let inner = self.inner.lock();
        let violation = |msg: String| Err(GraphicsError::InternalInvariantViolation(msg));

        for key in inner.cache.keys() {
            let listed = |map: &FxHashMap<NativeHandle, KeyList>, at: NativeHandle| {
                map.get(&at).is_some_and(|keys| keys.contains(key))
            };
            if !listed(&inner.pass_to_keys, key.pass()) {
                return violation(format!("{key:?} is not listed under its render pass"));
            }
            if let Some(view) = key.views().into_iter().find(|&v| !listed(&inner.view_to_keys, v)) {
                return violation(format!("{key:?} is not listed under view {view}"));
            }
        }

        for (index_name, map) in [("view", &inner.view_to_keys), ("render pass", &inner.pass_to_keys)] {
            for (at, keys) in map {
                if keys.is_empty() {
                    return violation(format!("empty {index_name} index entry for {at}"));
                }
                if let Some(key) = keys.iter().find(|k| !inner.cache.contains_key(*k)) {
                    return violation(format!("{index_name} index entry {at} references released {key:?}"));
                }
            }
        }

        Ok(())
    }
}

impl<B: FramebufferFactory + 'static> FramebufferCache<B> {
    /// Releases this cache's framebuffers for `view` when it is destroyed.
    ///
    /// The callback holds only a weak reference to the cache.
    pub fn track_view(self: &Arc<Self>, view: &TextureView) {
        let cache: Weak<Self> = Arc::downgrade(self);
        let handle = view.handle();
        view.on_destroy(move |_| {
            if let Some(cache) = cache.upgrade() {
                cache.on_view_destroyed(handle);
            }
        });
    }

    /// Releases this cache's framebuffers for `render_pass` when it is destroyed.
    pub fn track_render_pass(self: &Arc<Self>, render_pass: &RenderPass) {
        let cache: Weak<Self> = Arc::downgrade(self);
        let handle = render_pass.handle();
        render_pass.on_destroy(move |_| {
            if let Some(cache) = cache.upgrade() {
                cache.on_render_pass_destroyed(handle);
            }
        });
    }
}

impl<B: FramebufferFactory> Drop for FramebufferCache<B> {
    fn drop(&mut self) {
        let inner = std::mem::take(self.inner.get_mut());
        if inner.cache.is_empty() {
            return;
        }
        log::warn!(
            "Framebuffer cache dropped with {} live framebuffer(s); views or render passes were not released first",
            inner.cache.len()
        );
        for (key, fb) in inner.cache {
            self.factory.safe_release_framebuffer(fb, key.command_queue_mask());
        }
    }
}
