//! Shader Archives
//!
//! [`ArchiveWriter`] collects [`SerializedShader`]s by name and packs them into
//! a [`DataBlob`]; [`ArchiveReader`] loads one or more blobs and turns entries
//! back into device shaders.
//!
//! # Blob layout
//!
//! ```text
//! +--------+-------------+-------------+-----------------+------------------+
//! | "KILN" | version u32 | index_len   | index (bincode) | packed records   |
//! |        | LE          | u32 LE      | sorted by name  | (bincode each)   |
//! +--------+-------------+-------------+-----------------+------------------+
//! ```
//!
//! Index entries hold each record's offset and size within the packed data,
//! so a reader decodes only the records it is asked for. Entries are sorted by
//! name, which makes the blob deterministic for a given set of shaders.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::ops::{Deref, Range};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::device::RenderDevice;
use crate::errors::{GraphicsError, Result};

use super::desc::ShaderCreateInfo;
use super::pipeline::Shader;
use super::serialized::{SerializedShader, ShaderRecord};

pub const ARCHIVE_MAGIC: [u8; 4] = *b"KILN";
pub const ARCHIVE_VERSION: u32 = 1;

const HEADER_SIZE: usize = ARCHIVE_MAGIC.len() + 4 + 4;

// ─── Data blob ───────────────────────────────────────────────────────────────

/// Immutable, cheaply clonable byte buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct DataBlob(Arc<[u8]>);

impl DataBlob {
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes.into())
    }

    /// A private copy of the bytes.
    #[must_use]
    pub fn deep_copy(&self) -> Self {
        Self(Arc::from(&*self.0))
    }

    /// `true` if both blobs share the same buffer.
    #[must_use]
    pub fn shares_buffer_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Deref for DataBlob {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for DataBlob {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl fmt::Debug for DataBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DataBlob({} bytes)", self.0.len())
    }
}

// ─── Traits ──────────────────────────────────────────────────────────────────

/// Write side of an archive.
pub trait Archiver: Send + Sync {
    fn get_shader(&self, name: &str) -> Option<Arc<SerializedShader>>;

    /// Adds `shader` under its name. Returns `false` if the name is taken.
    fn add_shader(&self, shader: Arc<SerializedShader>) -> bool;

    fn serialize_to_blob(&self) -> Result<DataBlob>;

    fn serialize_to_stream(&self, out: &mut dyn Write) -> Result<()> {
        let blob = self.serialize_to_blob()?;
        out.write_all(&blob)?;
        out.flush()?;
        Ok(())
    }

    fn shader_count(&self) -> usize;

    fn reset(&self);
}

/// Read side of an archive.
pub trait Dearchiver: Send + Sync {
    /// Loads an archive. With `make_copy` the reader keeps a private copy of
    /// the bytes; otherwise it shares the caller's buffer.
    fn load_archive(&self, blob: &DataBlob, make_copy: bool) -> Result<()>;

    /// Creates a device shader from the entry `name`.
    ///
    /// `modify` may adjust the create info (e.g. restore the user's name)
    /// before the device sees it. Returns `None` if no loaded archive has the
    /// entry or the entry has no bytecode for `device`'s backend.
    fn unpack_shader(
        &self,
        name: &str,
        device: &dyn RenderDevice,
        modify: &mut dyn FnMut(&mut ShaderCreateInfo),
    ) -> Result<Option<Arc<dyn Shader>>>;

    fn reset(&self);
}

// ─── Index ───────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
struct IndexEntry {
    name: String,
    offset: u64,
    size: u64,
}

fn config() -> bincode::config::Configuration {
    bincode::config::standard()
}

// ─── Writer ──────────────────────────────────────────────────────────────────

/// Built-in [`Archiver`] producing `KILN` blobs.
#[derive(Default)]
pub struct ArchiveWriter {
    shaders: RwLock<BTreeMap<String, Arc<SerializedShader>>>,
}

impl ArchiveWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Archiver for ArchiveWriter {
    fn get_shader(&self, name: &str) -> Option<Arc<SerializedShader>> {
        self.shaders.read().get(name).cloned()
    }

    fn add_shader(&self, shader: Arc<SerializedShader>) -> bool {
        let mut shaders = self.shaders.write();
        if shaders.contains_key(shader.name()) {
            return false;
        }
        shaders.insert(shader.name().to_owned(), shader);
        true
    }

    fn serialize_to_blob(&self) -> Result<DataBlob> {
        let shaders = self.shaders.read();

        let mut index = Vec::with_capacity(shaders.len());
        let mut data = Vec::new();
        for (name, shader) in shaders.iter() {
            let bytes = bincode::serde::encode_to_vec(shader.record(), config())?;
            index.push(IndexEntry {
                name: name.clone(),
                offset: data.len() as u64,
                size: bytes.len() as u64,
            });
            data.extend_from_slice(&bytes);
        }
        let index_bytes = bincode::serde::encode_to_vec(&index, config())?;
        let index_len = u32::try_from(index_bytes.len())
            .map_err(|_| GraphicsError::InvalidDescription("archive index exceeds 4 GiB".into()))?;

        let mut out = Vec::with_capacity(HEADER_SIZE + index_bytes.len() + data.len());
        out.extend_from_slice(&ARCHIVE_MAGIC);
        out.extend_from_slice(&ARCHIVE_VERSION.to_le_bytes());
        out.extend_from_slice(&index_len.to_le_bytes());
        out.extend_from_slice(&index_bytes);
        out.extend_from_slice(&data);

        log::debug!(
            "Archive serialized: {} shader(s), {} bytes",
            index.len(),
            out.len()
        );
        Ok(DataBlob::new(out))
    }

    fn shader_count(&self) -> usize {
        self.shaders.read().len()
    }

    fn reset(&self) {
        self.shaders.write().clear();
    }
}

// ─── Reader ──────────────────────────────────────────────────────────────────

struct LoadedArchive {
    blob: DataBlob,
    entries: FxHashMap<String, Range<usize>>,
}

impl LoadedArchive {
    fn parse(blob: DataBlob) -> Result<Self> {
        let corrupted = |msg: &str| GraphicsError::ArchiveCorrupted(msg.to_owned());

        if blob.len() < HEADER_SIZE {
            return Err(corrupted("blob is shorter than the archive header"));
        }
        if blob[..4] != ARCHIVE_MAGIC {
            return Err(corrupted("bad magic"));
        }
        let read_u32 = |at: usize| {
            let mut bytes = [0u8; 4];
            bytes.copy_from_slice(&blob[at..at + 4]);
            u32::from_le_bytes(bytes)
        };
        let version = read_u32(4);
        if version != ARCHIVE_VERSION {
            return Err(GraphicsError::ArchiveCorrupted(format!(
                "unsupported archive version {version} (expected {ARCHIVE_VERSION})"
            )));
        }
        let index_len = read_u32(8) as usize;
        let data_start = HEADER_SIZE
            .checked_add(index_len)
            .filter(|&end| end <= blob.len())
            .ok_or_else(|| corrupted("index extends past the end of the blob"))?;

        let (index, _): (Vec<IndexEntry>, _) =
            bincode::serde::decode_from_slice(&blob[HEADER_SIZE..data_start], config())?;

        let mut entries = FxHashMap::default();
        for entry in index {
            let range = usize::try_from(entry.offset)
                .ok()
                .zip(usize::try_from(entry.size).ok())
                .and_then(|(offset, size)| {
                    let start = data_start.checked_add(offset)?;
                    Some(start..start.checked_add(size)?)
                })
                .filter(|r| r.end <= blob.len())
                .ok_or_else(|| {
                    GraphicsError::ArchiveCorrupted(format!(
                        "entry '{}' extends past the end of the blob",
                        entry.name
                    ))
                })?;
            entries.insert(entry.name, range);
        }

        Ok(Self { blob, entries })
    }

    fn record(&self, name: &str) -> Option<Result<ShaderRecord>> {
        let range = self.entries.get(name)?;
        Some(
            bincode::serde::decode_from_slice(&self.blob[range.clone()], config())
                .map(|(record, _)| record)
                .map_err(GraphicsError::from),
        )
    }
}

/// Built-in [`Dearchiver`] for `KILN` blobs.
///
/// Several archives may be loaded; lookups search the most recently loaded
/// archive first.
#[derive(Default)]
pub struct ArchiveReader {
    archives: RwLock<Vec<LoadedArchive>>,
}

impl ArchiveReader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn archive_count(&self) -> usize {
        self.archives.read().len()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.archives
            .read()
            .iter()
            .any(|a| a.entries.contains_key(name))
    }

    /// `true` if any loaded archive shares its buffer with `blob`.
    #[must_use]
    pub fn shares_buffer_with(&self, blob: &DataBlob) -> bool {
        self.archives
            .read()
            .iter()
            .any(|a| a.blob.shares_buffer_with(blob))
    }
}

impl Dearchiver for ArchiveReader {
    fn load_archive(&self, blob: &DataBlob, make_copy: bool) -> Result<()> {
        let blob = if make_copy { blob.deep_copy() } else { blob.clone() };
        let archive = LoadedArchive::parse(blob)?;
        log::debug!("Archive loaded: {} shader(s)", archive.entries.len());
        self.archives.write().push(archive);
        Ok(())
    }

    fn unpack_shader(
        &self,
        name: &str,
        device: &dyn RenderDevice,
        modify: &mut dyn FnMut(&mut ShaderCreateInfo),
    ) -> Result<Option<Arc<dyn Shader>>> {
        let record = {
            let archives = self.archives.read();
            match archives.iter().rev().find_map(|a| a.record(name)) {
                Some(record) => record?,
                None => return Ok(None),
            }
        };

        let device_type = device.device_type();
        let Some(mut create_info) = record.create_info_for(device_type) else {
            log::debug!("Archived shader '{name}' has no {device_type:?} bytecode");
            return Ok(None);
        };
        modify(&mut create_info);
        device.create_shader(&create_info).map(Some)
    }

    fn reset(&self) {
        self.archives.write().clear();
    }
}
