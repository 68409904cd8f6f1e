//! Resource states, pipeline stages and access masks.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Usage state of a device object as seen by the GPU timeline.
    ///
    /// Render pass attachments use exactly one of these bits as their initial and
    /// final state.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ResourceState: u32 {
        const UNDEFINED         = 1 << 0;
        const VERTEX_BUFFER     = 1 << 1;
        const CONSTANT_BUFFER   = 1 << 2;
        const INDEX_BUFFER      = 1 << 3;
        const RENDER_TARGET     = 1 << 4;
        const UNORDERED_ACCESS  = 1 << 5;
        const DEPTH_WRITE       = 1 << 6;
        const DEPTH_READ        = 1 << 7;
        const SHADER_RESOURCE   = 1 << 8;
        const STREAM_OUT        = 1 << 9;
        const INDIRECT_ARGUMENT = 1 << 10;
        const COPY_DEST         = 1 << 11;
        const COPY_SOURCE       = 1 << 12;
        const RESOLVE_DEST      = 1 << 13;
        const RESOLVE_SOURCE    = 1 << 14;
        const INPUT_ATTACHMENT  = 1 << 15;
        const PRESENT           = 1 << 16;
        const BUILD_AS_READ     = 1 << 17;
        const BUILD_AS_WRITE    = 1 << 18;
        const RAY_TRACING       = 1 << 19;
        const COMMON            = 1 << 20;
        const SHADING_RATE      = 1 << 21;
    }
}

impl ResourceState {
    /// States a depth/stencil attachment may start or end a render pass in.
    pub const DEPTH_STENCIL_ATTACHMENT_STATES: Self = Self::DEPTH_WRITE
        .union(Self::DEPTH_READ)
        .union(Self::UNORDERED_ACCESS)
        .union(Self::SHADER_RESOURCE)
        .union(Self::RESOLVE_DEST)
        .union(Self::RESOLVE_SOURCE);

    /// States a colour attachment may start or end a render pass in.
    pub const COLOR_ATTACHMENT_STATES: Self = Self::RENDER_TARGET
        .union(Self::UNORDERED_ACCESS)
        .union(Self::SHADER_RESOURCE)
        .union(Self::RESOLVE_DEST)
        .union(Self::RESOLVE_SOURCE);

    /// `true` if exactly one state bit is set and it lies within `allowed`.
    #[must_use]
    pub fn is_single_state_in(self, allowed: Self) -> bool {
        self.bits().count_ones() == 1 && allowed.contains(self)
    }
}

impl std::fmt::Display for ResourceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return f.write_str("UNKNOWN");
        }
        let mut first = true;
        for (name, _) in self.iter_names() {
            if !first {
                f.write_str("|")?;
            }
            f.write_str(name)?;
            first = false;
        }
        Ok(())
    }
}

bitflags! {
    /// Pipeline stages referenced by subpass dependencies.
    ///
    /// The empty set is the "undefined" mask.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct PipelineStageFlags: u32 {
        const TOP_OF_PIPE                    = 1 << 0;
        const DRAW_INDIRECT                  = 1 << 1;
        const VERTEX_INPUT                   = 1 << 2;
        const VERTEX_SHADER                  = 1 << 3;
        const HULL_SHADER                    = 1 << 4;
        const DOMAIN_SHADER                  = 1 << 5;
        const GEOMETRY_SHADER                = 1 << 6;
        const PIXEL_SHADER                   = 1 << 7;
        const EARLY_FRAGMENT_TESTS           = 1 << 8;
        const LATE_FRAGMENT_TESTS            = 1 << 9;
        const RENDER_TARGET                  = 1 << 10;
        const COMPUTE_SHADER                 = 1 << 11;
        const TRANSFER                       = 1 << 12;
        const BOTTOM_OF_PIPE                 = 1 << 13;
        const HOST                           = 1 << 14;
        const CONDITIONAL_RENDERING          = 1 << 18;
        const SHADING_RATE_TEXTURE           = 1 << 22;
        const RAY_TRACING_SHADER             = 1 << 21;
        const ACCELERATION_STRUCTURE_BUILD   = 1 << 25;
        const TASK_SHADER                    = 1 << 19;
        const MESH_SHADER                    = 1 << 20;
    }
}

impl PipelineStageFlags {
    pub const UNDEFINED: Self = Self::empty();
}

bitflags! {
    /// Memory access types referenced by subpass dependencies.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct AccessFlags: u32 {
        const INDIRECT_COMMAND_READ          = 1 << 0;
        const INDEX_READ                     = 1 << 1;
        const VERTEX_READ                    = 1 << 2;
        const UNIFORM_READ                   = 1 << 3;
        const INPUT_ATTACHMENT_READ          = 1 << 4;
        const SHADER_READ                    = 1 << 5;
        const SHADER_WRITE                   = 1 << 6;
        const RENDER_TARGET_READ             = 1 << 7;
        const RENDER_TARGET_WRITE            = 1 << 8;
        const DEPTH_STENCIL_READ             = 1 << 9;
        const DEPTH_STENCIL_WRITE            = 1 << 10;
        const COPY_SRC                       = 1 << 11;
        const COPY_DST                       = 1 << 12;
        const HOST_READ                      = 1 << 13;
        const HOST_WRITE                     = 1 << 14;
        const MEMORY_READ                    = 1 << 15;
        const MEMORY_WRITE                   = 1 << 16;
        const SHADING_RATE_TEXTURE_READ      = 1 << 23;
        const ACCELERATION_STRUCTURE_READ    = 1 << 21;
        const ACCELERATION_STRUCTURE_WRITE   = 1 << 22;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_display_names_the_bit() {
        assert_eq!(ResourceState::RENDER_TARGET.to_string(), "RENDER_TARGET");
        assert_eq!(
            (ResourceState::DEPTH_READ | ResourceState::SHADER_RESOURCE).to_string(),
            "DEPTH_READ|SHADER_RESOURCE"
        );
        assert_eq!(ResourceState::empty().to_string(), "UNKNOWN");
    }

    #[test]
    fn attachment_state_sets() {
        let ds = ResourceState::DEPTH_STENCIL_ATTACHMENT_STATES;
        assert!(ResourceState::DEPTH_WRITE.is_single_state_in(ds));
        assert!(!ResourceState::RENDER_TARGET.is_single_state_in(ds));
        assert!(!(ResourceState::DEPTH_READ | ResourceState::DEPTH_WRITE).is_single_state_in(ds));

        let color = ResourceState::COLOR_ATTACHMENT_STATES;
        assert!(ResourceState::RENDER_TARGET.is_single_state_in(color));
        assert!(!ResourceState::DEPTH_WRITE.is_single_state_in(color));
    }
}
