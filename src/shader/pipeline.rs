use std::fmt;
use std::sync::Arc;

use crate::core::DeviceObject;
use crate::device::DeviceType;

use super::desc::ShaderDesc;

/// A backend shader object.
pub trait Shader: DeviceObject {
    fn desc(&self) -> &ShaderDesc;

    fn device_type(&self) -> DeviceType;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PipelineType {
    #[default]
    Graphics,
    Compute,
    Mesh,
    RayTracing,
}

#[derive(Clone, Default)]
pub struct PipelineStateCreateInfo {
    pub name: String,
    pub pipeline_type: PipelineType,
    pub shaders: Vec<Arc<dyn Shader>>,
}

impl fmt::Debug for PipelineStateCreateInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineStateCreateInfo")
            .field("name", &self.name)
            .field("pipeline_type", &self.pipeline_type)
            .field(
                "shaders",
                &self.shaders.iter().map(|s| s.name().to_owned()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// A backend pipeline state object.
pub trait PipelineState: DeviceObject {
    fn pipeline_type(&self) -> PipelineType;
}
