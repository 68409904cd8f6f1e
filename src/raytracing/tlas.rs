//! Top-level acceleration structures.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::core::{DeviceObject, NativeHandle, ObjectId, ObjectKind, ResourceState};
use crate::device::{AccelerationStructureFactory, NativeAccelerationStructure};
use crate::errors::{GraphicsError, Result};
use crate::settings::{DEFAULT_COMMAND_QUEUE_MASK, INVALID_INDEX};

use super::blas::BottomLevelAs;
use super::flags::{BuildAsFlags, ScratchBufferSizes, ShaderBindingMode};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TlasDesc {
    pub name: String,
    pub max_instance_count: u32,
    pub flags: BuildAsFlags,
    pub compacted_size: u64,
    pub binding_mode: ShaderBindingMode,
    pub command_queue_mask: u64,
}

impl Default for TlasDesc {
    fn default() -> Self {
        Self {
            name: String::new(),
            max_instance_count: 0,
            flags: BuildAsFlags::empty(),
            compacted_size: 0,
            binding_mode: ShaderBindingMode::PerGeometry,
            command_queue_mask: DEFAULT_COMMAND_QUEUE_MASK,
        }
    }
}

/// One instance passed to [`TopLevelAs::build_instances`].
#[derive(Debug, Clone)]
pub struct TlasBuildInstanceData {
    pub instance_name: String,
    pub blas: Arc<BottomLevelAs>,
    /// Row-major 3x4 object-to-world transform.
    pub transform: [[f32; 4]; 3],
    pub custom_id: u32,
    pub mask: u8,
    /// Required with [`ShaderBindingMode::UserDefined`], must be `None` otherwise.
    pub contribution_to_hit_group_index: Option<u32>,
}

impl TlasBuildInstanceData {
    pub const IDENTITY: [[f32; 4]; 3] = [
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
    ];

    #[must_use]
    pub fn new(instance_name: impl Into<String>, blas: Arc<BottomLevelAs>) -> Self {
        Self {
            instance_name: instance_name.into(),
            blas,
            transform: Self::IDENTITY,
            custom_id: 0,
            mask: 0xFF,
            contribution_to_hit_group_index: None,
        }
    }
}

/// Shader-binding-table layout used to compute hit-group indices.
///
/// Defaults to base 0 and stride 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TlasBuildInfo {
    pub base_contribution_to_hit_group_index: u32,
    /// Hit-group records per geometry (typically the ray type count).
    pub hit_group_stride: u32,
}

impl Default for TlasBuildInfo {
    fn default() -> Self {
        Self {
            base_contribution_to_hit_group_index: 0,
            hit_group_stride: 1,
        }
    }
}

/// What [`TopLevelAs::instance_desc`] reports for an instance.
#[derive(Debug, Clone)]
pub struct TlasInstanceDesc {
    pub contribution_to_hit_group_index: u32,
    pub blas: Option<Arc<BottomLevelAs>>,
}

#[derive(Debug, Clone)]
struct InstanceRecord {
    contribution_to_hit_group_index: u32,
    blas: Arc<BottomLevelAs>,
}

/// A top-level acceleration structure.
pub struct TopLevelAs {
    id: ObjectId,
    desc: TlasDesc,
    native: Box<dyn NativeAccelerationStructure>,
    state: AtomicU32,
    instances: RwLock<FxHashMap<String, InstanceRecord>>,
}

impl TopLevelAs {
    pub fn new(mut desc: TlasDesc, factory: &dyn AccelerationStructureFactory) -> Result<Self> {
        if desc.max_instance_count == 0 && desc.compacted_size == 0 {
            return Err(GraphicsError::InvalidGeometryDescription {
                name: desc.name,
                reason: "max_instance_count must not be zero".into(),
            });
        }
        desc.flags = factory.resolve_build_flags(desc.flags);
        let native = factory.create_tlas(&desc)?;

        log::debug!(
            "TLAS '{}' created: up to {} instance(s), {:?} binding",
            desc.name,
            desc.max_instance_count,
            desc.binding_mode
        );

        Ok(Self {
            id: ObjectId::next(),
            desc,
            native,
            state: AtomicU32::new(ResourceState::UNDEFINED.bits()),
            instances: RwLock::new(FxHashMap::default()),
        })
    }

    #[inline]
    #[must_use]
    pub fn desc(&self) -> &TlasDesc {
        &self.desc
    }

    /// Records the instance table of a full build.
    ///
    /// Hit-group indices follow the binding mode:
    /// - `PerGeometry`: `base + stride * (geometries of all prior instances)`
    /// - `PerInstance`: `base + stride * ordinal`
    /// - `UserDefined`: the instance's own index
    ///
    /// Returns the number of hit-group records the instances span. The table
    /// is replaced only if every instance is valid.
    pub fn build_instances(&self, instances: &[TlasBuildInstanceData], info: &TlasBuildInfo) -> Result<u32> {
        let invalid = |reason: String| GraphicsError::InvalidGeometryDescription {
            name: self.desc.name.clone(),
            reason,
        };

        if instances.len() > self.desc.max_instance_count as usize {
            return Err(invalid(format!(
                "{} instance(s) exceed max_instance_count ({})",
                instances.len(),
                self.desc.max_instance_count
            )));
        }

        let overflow = |inst: &TlasBuildInstanceData| {
            invalid(format!(
                "hit group index of instance '{}' overflows u32",
                inst.instance_name
            ))
        };

        let mode = self.desc.binding_mode;
        let mut table = FxHashMap::default();
        let mut next = info.base_contribution_to_hit_group_index;
        let mut end = next;

        for (i, inst) in instances.iter().enumerate() {
            if inst.instance_name.is_empty() {
                return Err(invalid(format!("instance {i} has an empty name")));
            }

            let index = match (mode, inst.contribution_to_hit_group_index) {
                (ShaderBindingMode::UserDefined, Some(index)) => index,
                (ShaderBindingMode::UserDefined, None) => {
                    return Err(invalid(format!(
                        "instance '{}' must specify contribution_to_hit_group_index in user-defined binding mode",
                        inst.instance_name
                    )));
                }
                (_, Some(_)) => {
                    return Err(invalid(format!(
                        "instance '{}' specifies contribution_to_hit_group_index, which is computed in {mode:?} binding mode",
                        inst.instance_name
                    )));
                }
                (ShaderBindingMode::PerGeometry, None) => {
                    let index = next;
                    next = info
                        .hit_group_stride
                        .checked_mul(inst.blas.geometry_count())
                        .and_then(|span| next.checked_add(span))
                        .ok_or_else(|| overflow(inst))?;
                    index
                }
                (ShaderBindingMode::PerInstance, None) => {
                    let index = next;
                    next = next
                        .checked_add(info.hit_group_stride)
                        .ok_or_else(|| overflow(inst))?;
                    index
                }
            };
            let last = index
                .checked_add(info.hit_group_stride)
                .ok_or_else(|| overflow(inst))?;
            end = end.max(next).max(last);

            let record = InstanceRecord {
                contribution_to_hit_group_index: index,
                blas: Arc::clone(&inst.blas),
            };
            if table.insert(inst.instance_name.clone(), record).is_some() {
                return Err(invalid(format!(
                    "instance name '{}' is not unique",
                    inst.instance_name
                )));
            }
        }

        *self.instances.write() = table;
        // `end` starts at base and only grows.
        Ok(end - info.base_contribution_to_hit_group_index)
    }

    /// Hit-group index and BLAS of the instance named `name`.
    ///
    /// Unknown names yield `INVALID_INDEX` and no BLAS.
    #[must_use]
    pub fn instance_desc(&self, name: &str) -> TlasInstanceDesc {
        match self.instances.read().get(name) {
            Some(record) => TlasInstanceDesc {
                contribution_to_hit_group_index: record.contribution_to_hit_group_index,
                blas: Some(Arc::clone(&record.blas)),
            },
            None => TlasInstanceDesc {
                contribution_to_hit_group_index: INVALID_INDEX,
                blas: None,
            },
        }
    }

    #[must_use]
    pub fn instance_count(&self) -> usize {
        self.instances.read().len()
    }

    #[must_use]
    pub fn scratch_sizes(&self) -> ScratchBufferSizes {
        self.native.scratch_sizes()
    }

    #[must_use]
    pub fn handle(&self) -> NativeHandle {
        self.native.native_handle()
    }

    #[must_use]
    pub fn state(&self) -> ResourceState {
        ResourceState::from_bits_retain(self.state.load(Ordering::Acquire))
    }

    pub fn set_state(&self, state: ResourceState) {
        self.state.store(state.bits(), Ordering::Release);
    }

    /// Incremental instance update. Not supported yet.
    pub fn update_instances(&self, _instances: &[TlasBuildInstanceData]) -> Result<()> {
        Err(GraphicsError::NotSupported(format!(
            "TLAS '{}': incremental update",
            self.desc.name
        )))
    }
}

impl DeviceObject for TopLevelAs {
    fn unique_id(&self) -> ObjectId {
        self.id
    }

    fn name(&self) -> &str {
        &self.desc.name
    }

    fn kind(&self) -> ObjectKind {
        ObjectKind::TopLevelAs
    }

    fn native_handle(&self) -> Option<NativeHandle> {
        Some(self.handle())
    }
}

impl fmt::Debug for TopLevelAs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TopLevelAs")
            .field("id", &self.id)
            .field("name", &self.desc.name)
            .field("binding_mode", &self.desc.binding_mode)
            .field("instances", &self.instance_count())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
