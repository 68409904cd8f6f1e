//! Engine Limits & Cache Configuration
//!
//! Compile-time limits shared by the descriptors, plus the runtime settings of
//! the [`RenderStateCache`](crate::render_state_cache::RenderStateCache).
//!
//! ```rust,ignore
//! use kiln::settings::{CacheLogLevel, RenderStateCacheSettings};
//! use kiln::shader::ArchiveDeviceFlags;
//!
//! // Archive for Vulkan and D3D12 regardless of the running backend.
//! let settings = RenderStateCacheSettings {
//!     log_level: CacheLogLevel::Verbose,
//!     archive_device_flags: Some(ArchiveDeviceFlags::VULKAN | ArchiveDeviceFlags::D3D12),
//! };
//! ```

use crate::shader::ArchiveDeviceFlags;

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Maximum number of simultaneously bound render targets.
pub const MAX_RENDER_TARGETS: usize = 8;

/// Returned by name lookups (geometry index, hit-group index) that miss.
pub const INVALID_INDEX: u32 = u32::MAX;

/// Marks an attachment reference slot that is not used by the subpass.
pub const ATTACHMENT_UNUSED: u32 = u32::MAX;

/// Subpass index that refers to commands outside the render pass.
pub const SUBPASS_EXTERNAL: u32 = u32::MAX;

/// Default command-queue mask of device objects (queue 0 only).
pub const DEFAULT_COMMAND_QUEUE_MASK: u64 = 1;

// ---------------------------------------------------------------------------
// Render state cache
// ---------------------------------------------------------------------------

/// How chatty the render state cache is about hits, misses and archive I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheLogLevel {
    /// Nothing is logged except warnings.
    Disabled,
    /// Archive loads/writes and backend fallbacks are logged at `info`.
    #[default]
    Normal,
    /// Every lookup is logged at `debug`.
    Verbose,
}

impl CacheLogLevel {
    #[inline]
    #[must_use]
    pub fn normal(self) -> bool {
        self != Self::Disabled
    }

    #[inline]
    #[must_use]
    pub fn verbose(self) -> bool {
        self == Self::Verbose
    }

    /// Level of archive I/O summaries and device fallbacks, `None` when disabled.
    #[inline]
    #[must_use]
    pub fn summary_level(self) -> Option<log::Level> {
        self.normal().then_some(log::Level::Info)
    }
}

/// Runtime settings of the render state cache.
#[derive(Debug, Clone, Default)]
pub struct RenderStateCacheSettings {
    /// Logging verbosity.
    pub log_level: CacheLogLevel,
    /// Backends for which shaders are serialized into the archive.
    ///
    /// `None` archives for the backend of the render device only.
    pub archive_device_flags: Option<ArchiveDeviceFlags>,
}
