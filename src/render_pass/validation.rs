//! Static validation of render pass descriptions.

use crate::core::{PipelineStageFlags, ResourceState};
use crate::errors::{GraphicsError, Result};

use super::RenderPassDesc;

/// Checks the structural rules every backend relies on.
///
/// The first violated rule is reported as
/// [`GraphicsError::InvalidRenderPass`], naming the pass and the offending
/// attachment or dependency index.
pub fn validate_render_pass_desc(desc: &RenderPassDesc) -> Result<()> {
    let fail = |reason: String| -> Result<()> {
        Err(GraphicsError::InvalidRenderPass {
            name: desc.name.clone(),
            reason,
        })
    };

    if desc.subpasses.is_empty() {
        return fail("Render pass must have at least one subpass".into());
    }

    for (i, attachment) in desc.attachments.iter().enumerate() {
        if attachment.format == crate::core::TextureFormat::Unknown {
            return fail(format!("the format of attachment {i} is unknown"));
        }

        let samples = attachment.sample_count;
        if samples == 0 {
            return fail(format!("the sample count of attachment {i} is zero"));
        }
        if !samples.is_power_of_two() {
            return fail(format!(
                "the sample count of attachment {i}({samples}) is not power of two"
            ));
        }

        let (kind, allowed) = if attachment.format.is_depth_stencil() {
            ("depth-stencil", ResourceState::DEPTH_STENCIL_ATTACHMENT_STATES)
        } else {
            ("color", ResourceState::COLOR_ATTACHMENT_STATES)
        };

        if !attachment.initial_state.is_single_state_in(allowed) {
            return fail(format!(
                "the initial state of {kind} attachment {i} ({}) is invalid",
                attachment.initial_state
            ));
        }
        if !attachment.final_state.is_single_state_in(allowed) {
            return fail(format!(
                "the final state of {kind} attachment {i} ({}) is invalid",
                attachment.final_state
            ));
        }
    }

    for (i, dependency) in desc.dependencies.iter().enumerate() {
        if dependency.src_stage_mask == PipelineStageFlags::UNDEFINED {
            return fail(format!(
                "the source stage mask of subpass dependency {i} is undefined"
            ));
        }
        if dependency.dst_stage_mask == PipelineStageFlags::UNDEFINED {
            return fail(format!(
                "the destination stage mask of subpass dependency {i} is undefined"
            ));
        }
    }

    Ok(())
}
