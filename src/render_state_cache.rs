//! Render State Cache
//!
//! Content-addressed shader cache with transparent archiving.
//!
//! # Lookup order
//!
//! [`RenderStateCache::create_shader`] hashes the create info (xxh3-128, name
//! excluded) and tries, in order:
//!
//! 1. **Live map**: a weak reference under the hash that still upgrades.
//! 2. **Dearchiver**: an entry `"<name> [<hash>]"` in a loaded archive.
//! 3. **Archiver**: the same entry in the archive being written; on a miss the
//!    shader is serialized once and added. The serialized shader's live device
//!    shader is used when the backend produced one.
//! 4. **Device**: direct compilation.
//!
//! The returned flag is `true` when the shader was already known (live map,
//! loaded archive, or archiver) and `false` when it was produced just now.
//!
//! The cache holds weak references only; dropping the last caller reference
//! frees the shader and the next request recreates it.
//!
//! ```rust,ignore
//! let cache = RenderStateCache::new(RenderStateCacheCreateInfo::new(device));
//! cache.load(&blob, false)?;
//! let (vs, from_archive) = cache.create_shader(&vs_ci)?;
//! ```

use std::io::Write;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::device::{DeviceType, RenderDevice};
use crate::errors::Result;
use crate::settings::RenderStateCacheSettings;
use crate::shader::{
    archive_name, ArchiveDeviceFlags, ArchiveReader, ArchiveWriter, Archiver, CompilingSerializationDevice, DataBlob,
    Dearchiver, PipelineState, PipelineStateCreateInfo, SerializationDevice, Shader, ShaderCreateInfo, ShaderHash,
};

/// Collaborators and settings of a [`RenderStateCache`].
pub struct RenderStateCacheCreateInfo {
    pub device: Arc<dyn RenderDevice>,
    /// Defaults to [`CompilingSerializationDevice::for_render_device`], which
    /// archives bytecode for `device`'s backend only.
    pub serialization_device: Option<Arc<dyn SerializationDevice>>,
    /// Defaults to [`ArchiveWriter`].
    pub archiver: Option<Arc<dyn Archiver>>,
    /// Defaults to [`ArchiveReader`].
    pub dearchiver: Option<Arc<dyn Dearchiver>>,
    pub settings: RenderStateCacheSettings,
}

impl RenderStateCacheCreateInfo {
    #[must_use]
    pub fn new(device: Arc<dyn RenderDevice>) -> Self {
        Self {
            device,
            serialization_device: None,
            archiver: None,
            dearchiver: None,
            settings: RenderStateCacheSettings::default(),
        }
    }

    #[must_use]
    pub fn with_serialization_device(mut self, device: Arc<dyn SerializationDevice>) -> Self {
        self.serialization_device = Some(device);
        self
    }

    #[must_use]
    pub fn with_settings(mut self, settings: RenderStateCacheSettings) -> Self {
        self.settings = settings;
        self
    }
}

/// Deduplicates shaders by content and persists them to archives.
pub struct RenderStateCache {
    device: Arc<dyn RenderDevice>,
    device_type: DeviceType,
    serialization_device: Arc<dyn SerializationDevice>,
    archiver: Arc<dyn Archiver>,
    dearchiver: Arc<dyn Dearchiver>,
    archive_flags: ArchiveDeviceFlags,
    settings: RenderStateCacheSettings,
    shaders: Mutex<FxHashMap<ShaderHash, Weak<dyn Shader>>>,
}

impl RenderStateCache {
    #[must_use]
    pub fn new(info: RenderStateCacheCreateInfo) -> Self {
        let RenderStateCacheCreateInfo {
            device,
            serialization_device,
            archiver,
            dearchiver,
            settings,
        } = info;

        let device_type = device.device_type();
        let serialization_device: Arc<dyn SerializationDevice> = match serialization_device {
            Some(serialization_device) => serialization_device,
            None => Arc::new(CompilingSerializationDevice::for_render_device(Arc::clone(&device))),
        };
        let archiver: Arc<dyn Archiver> = match archiver {
            Some(archiver) => archiver,
            None => Arc::new(ArchiveWriter::new()),
        };
        let dearchiver: Arc<dyn Dearchiver> = match dearchiver {
            Some(dearchiver) => dearchiver,
            None => Arc::new(ArchiveReader::new()),
        };
        let archive_flags = settings
            .archive_device_flags
            .unwrap_or_else(|| device_type.archive_flag());

        Self {
            device,
            device_type,
            serialization_device,
            archiver,
            dearchiver,
            archive_flags,
            settings,
            shaders: Mutex::new(FxHashMap::default()),
        }
    }

    #[inline]
    #[must_use]
    pub fn device(&self) -> &Arc<dyn RenderDevice> {
        &self.device
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &RenderStateCacheSettings {
        &self.settings
    }

    // ── Shaders ──────────────────────────────────────────────────────────────

    /// Returns a shader for `create_info` and whether it was already cached
    /// or archived.
    pub fn create_shader(&self, create_info: &ShaderCreateInfo) -> Result<(Arc<dyn Shader>, bool)> {
        let hash = create_info.content_hash();

        {
            let mut shaders = self.shaders.lock();
            if let Some(weak) = shaders.get(&hash) {
                if let Some(shader) = weak.upgrade() {
                    if self.settings.log_level.verbose() {
                        log::debug!("Shader '{}' [{hash}] found in cache", create_info.name());
                    }
                    return Ok((shader, true));
                }
                shaders.remove(&hash);
            }
        }

        let (shader, cached) = self.create_shader_uncached(create_info, hash)?;
        self.shaders.lock().insert(hash, Arc::downgrade(&shader));
        Ok((shader, cached))
    }

    fn create_shader_uncached(
        &self,
        create_info: &ShaderCreateInfo,
        hash: ShaderHash,
    ) -> Result<(Arc<dyn Shader>, bool)> {
        let user_name = create_info.name();
        let entry_name = archive_name(user_name, hash);
        let verbose = self.settings.log_level.verbose();

        // Loaded archives.
        let mut restore_name = |ci: &mut ShaderCreateInfo| ci.desc.name = user_name.to_owned();
        match self
            .dearchiver
            .unpack_shader(&entry_name, self.device.as_ref(), &mut restore_name)
        {
            Ok(Some(shader)) => {
                if verbose {
                    log::debug!("Shader '{entry_name}' unpacked from archive");
                }
                return Ok((shader, true));
            }
            Ok(None) => {}
            Err(e) => log::warn!("Failed to unpack shader '{entry_name}': {e}"),
        }

        // Archive being written.
        let mut archived = self.archiver.get_shader(&entry_name);
        let found_in_archive = archived.is_some();
        if archived.is_none() {
            let mut archive_ci = create_info.clone();
            archive_ci.desc.name.clone_from(&entry_name);
            match self
                .serialization_device
                .create_shader(&archive_ci, self.archive_flags)
            {
                Ok(serialized) => {
                    let serialized = Arc::new(serialized);
                    if !self.archiver.add_shader(Arc::clone(&serialized)) {
                        log::warn!("Shader '{entry_name}' was added to the archive concurrently");
                    }
                    archived = Some(serialized);
                }
                Err(e) => log::warn!("Failed to serialize shader '{entry_name}': {e}"),
            }
        }

        if let Some(shader) = archived.and_then(|s| s.device_shader(self.device_type)) {
            if verbose {
                log::debug!(
                    "Shader '{entry_name}' taken from the archiver (already archived: {found_in_archive})"
                );
            }
            return Ok((shader, found_in_archive));
        }

        // Direct compilation.
        if let Some(level) = self.settings.log_level.summary_level() {
            log::log!(level, "Shader '{entry_name}' compiled by the {:?} device", self.device_type);
        }
        let shader = self.device.create_shader(create_info)?;
        Ok((shader, found_in_archive))
    }

    /// Number of live shaders in the cache.
    #[must_use]
    pub fn shader_count(&self) -> usize {
        self.shaders
            .lock()
            .values()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    /// Drops entries whose shaders are gone. Returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let mut shaders = self.shaders.lock();
        let before = shaders.len();
        shaders.retain(|_, w| w.strong_count() > 0);
        before - shaders.len()
    }

    // ── Pipeline states ──────────────────────────────────────────────────────

    /// Creates a pipeline state on the device. Pipelines are not cached yet,
    /// so the flag is always `false`.
    pub fn create_pipeline_state(
        &self,
        create_info: &PipelineStateCreateInfo,
    ) -> Result<(Arc<dyn PipelineState>, bool)> {
        let pso = self.device.create_pipeline_state(create_info)?;
        Ok((pso, false))
    }

    // ── Archive I/O ──────────────────────────────────────────────────────────

    /// Loads an archive produced by [`write_to_blob`](Self::write_to_blob).
    pub fn load(&self, blob: &DataBlob, make_copy: bool) -> Result<()> {
        self.dearchiver.load_archive(blob, make_copy)?;
        if let Some(level) = self.settings.log_level.summary_level() {
            log::log!(level, "Render state cache: loaded archive ({} bytes)", blob.len());
        }
        Ok(())
    }

    /// Serializes every archived shader.
    pub fn write_to_blob(&self) -> Result<DataBlob> {
        let blob = self.archiver.serialize_to_blob()?;
        if let Some(level) = self.settings.log_level.summary_level() {
            log::log!(
                level,
                "Render state cache: wrote {} shader(s), {} bytes",
                self.archiver.shader_count(),
                blob.len()
            );
        }
        Ok(blob)
    }

    pub fn write_to_stream(&self, out: &mut dyn Write) -> Result<()> {
        self.archiver.serialize_to_stream(out)?;
        if let Some(level) = self.settings.log_level.summary_level() {
            log::log!(
                level,
                "Render state cache: wrote {} shader(s) to stream",
                self.archiver.shader_count()
            );
        }
        Ok(())
    }

    /// Clears loaded archives, the archive being written and the shader map.
    pub fn reset(&self) {
        self.dearchiver.reset();
        self.archiver.reset();
        self.shaders.lock().clear();
    }
}
