//! Bottom-level acceleration structures.
//!
//! A BLAS owns a name → index table over its geometries: triangles take
//! indices `0..triangles.len()`, boxes continue after them. The table is fixed
//! at creation and answers shader-binding-table lookups.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use rustc_hash::FxHashMap;

use crate::core::{DeviceObject, NativeHandle, ObjectId, ObjectKind, ResourceState};
use crate::device::{AccelerationStructureFactory, NativeAccelerationStructure};
use crate::errors::{GraphicsError, Result};
use crate::settings::{DEFAULT_COMMAND_QUEUE_MASK, INVALID_INDEX};

use super::flags::{BuildAsFlags, ScratchBufferSizes, ValueType};

/// Triangle geometry slot of a BLAS.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BlasTriangleDesc {
    pub geometry_name: String,
    pub max_vertex_count: u32,
    pub vertex_value_type: ValueType,
    /// 2 or 3.
    pub vertex_component_count: u8,
    pub max_primitive_count: u32,
    /// `Uint16`, `Uint32`, or `Undefined` for non-indexed geometry.
    pub index_type: ValueType,
    pub allows_transforms: bool,
}

/// Procedural (AABB) geometry slot of a BLAS.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BlasBoundingBoxDesc {
    pub geometry_name: String,
    pub max_box_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlasDesc {
    pub name: String,
    pub triangles: Vec<BlasTriangleDesc>,
    pub boxes: Vec<BlasBoundingBoxDesc>,
    pub flags: BuildAsFlags,
    /// Non-zero when the BLAS is the target of a compacting copy.
    pub compacted_size: u64,
    pub command_queue_mask: u64,
}

impl Default for BlasDesc {
    fn default() -> Self {
        Self {
            name: String::new(),
            triangles: Vec::new(),
            boxes: Vec::new(),
            flags: BuildAsFlags::empty(),
            compacted_size: 0,
            command_queue_mask: DEFAULT_COMMAND_QUEUE_MASK,
        }
    }
}

impl BlasDesc {
    #[must_use]
    pub fn geometry_count(&self) -> usize {
        self.triangles.len() + self.boxes.len()
    }
}

fn build_name_table(desc: &BlasDesc) -> Result<FxHashMap<String, u32>> {
    let invalid = |reason: String| GraphicsError::InvalidGeometryDescription {
        name: desc.name.clone(),
        reason,
    };

    if desc.compacted_size == 0 && desc.geometry_count() == 0 {
        return Err(invalid("at least one triangle or box geometry is required".into()));
    }

    for (i, tri) in desc.triangles.iter().enumerate() {
        if tri.max_vertex_count == 0 {
            return Err(invalid(format!("triangles[{i}].max_vertex_count must not be zero")));
        }
        if tri.max_primitive_count == 0 {
            return Err(invalid(format!("triangles[{i}].max_primitive_count must not be zero")));
        }
        if !matches!(tri.vertex_component_count, 2 | 3) {
            return Err(invalid(format!(
                "triangles[{i}].vertex_component_count ({}) must be 2 or 3",
                tri.vertex_component_count
            )));
        }
        if !matches!(
            tri.vertex_value_type,
            ValueType::Float32 | ValueType::Float16 | ValueType::Int16
        ) {
            return Err(invalid(format!(
                "triangles[{i}].vertex_value_type ({:?}) must be Float32, Float16 or Int16",
                tri.vertex_value_type
            )));
        }
        if !matches!(
            tri.index_type,
            ValueType::Uint16 | ValueType::Uint32 | ValueType::Undefined
        ) {
            return Err(invalid(format!(
                "triangles[{i}].index_type ({:?}) must be Uint16, Uint32 or Undefined",
                tri.index_type
            )));
        }
    }
    for (i, bx) in desc.boxes.iter().enumerate() {
        if bx.max_box_count == 0 {
            return Err(invalid(format!("boxes[{i}].max_box_count must not be zero")));
        }
    }

    let names = desc
        .triangles
        .iter()
        .map(|t| t.geometry_name.as_str())
        .chain(desc.boxes.iter().map(|b| b.geometry_name.as_str()));

    let mut table = FxHashMap::default();
    for (index, name) in names.enumerate() {
        if name.is_empty() {
            return Err(invalid(format!("geometry {index} has an empty name")));
        }
        if table.insert(name.to_owned(), index as u32).is_some() {
            return Err(invalid(format!("geometry name '{name}' is not unique")));
        }
    }
    Ok(table)
}

/// A bottom-level acceleration structure.
pub struct BottomLevelAs {
    id: ObjectId,
    desc: BlasDesc,
    name_to_index: FxHashMap<String, u32>,
    native: Box<dyn NativeAccelerationStructure>,
    state: AtomicU32,
}

impl BottomLevelAs {
    /// Validates `desc` and creates the backend object.
    pub fn new(mut desc: BlasDesc, factory: &dyn AccelerationStructureFactory) -> Result<Self> {
        let name_to_index = build_name_table(&desc)?;
        desc.flags = factory.resolve_build_flags(desc.flags);
        let native = factory.create_blas(&desc)?;

        log::debug!(
            "BLAS '{}' created: {} triangle / {} box geometries, scratch {:?}",
            desc.name,
            desc.triangles.len(),
            desc.boxes.len(),
            native.scratch_sizes()
        );

        Ok(Self {
            id: ObjectId::next(),
            desc,
            name_to_index,
            native,
            state: AtomicU32::new(ResourceState::UNDEFINED.bits()),
        })
    }

    /// Description with build flags as resolved by the backend.
    #[inline]
    #[must_use]
    pub fn desc(&self) -> &BlasDesc {
        &self.desc
    }

    /// Index of the geometry named `name`, or [`INVALID_INDEX`].
    #[must_use]
    pub fn geometry_index(&self, name: &str) -> u32 {
        self.name_to_index.get(name).copied().unwrap_or(INVALID_INDEX)
    }

    #[inline]
    #[must_use]
    pub fn geometry_count(&self) -> u32 {
        self.desc.geometry_count() as u32
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

    /// Overrides the tracked usage state without a transition.
    pub fn set_state(&self, state: ResourceState) {
        self.state.store(state.bits(), Ordering::Release);
    }

    /// Incremental update. Not supported yet.
    pub fn update(&self) -> Result<()> {
        Err(GraphicsError::NotSupported(format!(
            "BLAS '{}': incremental update",
            self.desc.name
        )))
    }
}

impl DeviceObject for BottomLevelAs {
    fn unique_id(&self) -> ObjectId {
        self.id
    }

    fn name(&self) -> &str {
        &self.desc.name
    }

    fn kind(&self) -> ObjectKind {
        ObjectKind::BottomLevelAs
    }

    fn native_handle(&self) -> Option<NativeHandle> {
        Some(self.handle())
    }
}

impl fmt::Debug for BottomLevelAs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BottomLevelAs")
            .field("id", &self.id)
            .field("name", &self.desc.name)
            .field("geometries", &self.desc.geometry_count())
            .field("flags", &self.desc.flags)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
