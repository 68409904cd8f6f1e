//! Canonical 128-bit content hashing of shader create infos.
//!
//! Every field is written with a length or tag prefix so that adjacent
//! fields cannot alias (`"ab" + "c"` and `"a" + "bc"` hash differently).
//! Pointers and the shader name never participate, so the hash is stable
//! across runs and processes.

use std::fmt;

use xxhash_rust::xxh3::Xxh3;

use super::desc::{ShaderCreateInfo, ShaderSource};

/// xxh3-128 digest of a [`ShaderCreateInfo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderHash(pub u128);

impl ShaderHash {
    #[inline]
    #[must_use]
    pub fn high(self) -> u64 {
        (self.0 >> 64) as u64
    }

    #[inline]
    #[must_use]
    pub fn low(self) -> u64 {
        self.0 as u64
    }
}

/// 32 upper-case hex digits, high half first.
impl fmt::Display for ShaderHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016X}{:016X}", self.high(), self.low())
    }
}

/// Streaming hasher with field framing.
pub struct ContentHasher {
    state: Xxh3,
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentHasher {
    #[must_use]
    pub fn new() -> Self {
        Self { state: Xxh3::new() }
    }

    pub fn write_u8(&mut self, v: u8) {
        self.state.update(&[v]);
    }

    pub fn write_u32(&mut self, v: u32) {
        self.state.update(&v.to_le_bytes());
    }

    pub fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.state.update(&(bytes.len() as u64).to_le_bytes());
        self.state.update(bytes);
    }

    pub fn write_str(&mut self, s: &str) {
        self.write_bytes(s.as_bytes());
    }

    #[must_use]
    pub fn finish(&self) -> ShaderHash {
        ShaderHash(self.state.digest128())
    }
}

impl ShaderCreateInfo {
    /// Content hash of everything but the shader name.
    #[must_use]
    pub fn content_hash(&self) -> ShaderHash {
        let mut h = ContentHasher::new();

        match &self.source {
            ShaderSource::Source(text) => {
                h.write_u8(0);
                h.write_str(text);
            }
            ShaderSource::Bytecode(bytes) => {
                h.write_u8(1);
                h.write_bytes(bytes);
            }
        }
        h.write_str(&self.entry_point);
        h.write_u8(self.desc.shader_type as u8);
        h.write_bool(self.desc.use_combined_texture_samplers);
        h.write_str(&self.desc.combined_sampler_suffix);

        h.write_u32(self.macros.len() as u32);
        for m in &self.macros {
            h.write_str(&m.name);
            h.write_str(&m.definition);
        }

        h.write_u8(self.source_language as u8);
        h.write_u8(self.compiler as u8);
        h.write_u32(self.compile_flags.bits());

        h.finish()
    }
}

/// Archive entry name: `"<name> [<hash>]"`.
#[must_use]
pub fn archive_name(name: &str, hash: ShaderHash) -> String {
    format!("{name} [{hash}]")
}
