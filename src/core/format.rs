//! Texture formats and their component attributes.
//!
//! Only the properties the device-object core needs are modelled: the
//! validator must know whether an attachment is a depth/stencil surface, and
//! framebuffer descriptors carry formats for identity.

use serde::{Deserialize, Serialize};

/// The kind of data stored in a texture format's components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    Undefined,
    Float,
    Snorm,
    Unorm,
    UnormSrgb,
    Sint,
    Uint,
    Depth,
    DepthStencil,
    /// Packed formats such as `Rgb10a2Unorm`.
    Compound,
    Compressed,
}

/// Static attributes of a [`TextureFormat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatAttribs {
    pub name: &'static str,
    pub component_type: ComponentType,
    /// Size of one component in bytes (block size for compressed formats).
    pub component_size: u8,
    pub num_components: u8,
}

/// Texture formats usable as render pass attachments and views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TextureFormat {
    #[default]
    Unknown,

    R8Unorm,
    R8Uint,
    Rg8Unorm,
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Bgra8Unorm,
    Bgra8UnormSrgb,
    Rgba8Snorm,
    Rgba8Uint,

    R16Float,
    Rg16Float,
    Rgba16Float,
    Rgba16Uint,

    R32Float,
    R32Uint,
    Rg32Float,
    Rgba32Float,
    Rgba32Uint,

    Rgb10a2Unorm,
    Rg11b10Float,

    Bc1Unorm,
    Bc3Unorm,
    Bc7Unorm,

    D16Unorm,
    D32Float,
    D24UnormS8Uint,
    D32FloatS8X24Uint,
}

impl TextureFormat {
    /// Returns the component attributes of the format.
    #[must_use]
    pub const fn attribs(self) -> FormatAttribs {
        use ComponentType as C;

        const fn a(name: &'static str, component_type: ComponentType, size: u8, n: u8) -> FormatAttribs {
            FormatAttribs {
                name,
                component_type,
                component_size: size,
                num_components: n,
            }
        }

        match self {
            Self::Unknown => a("UNKNOWN", C::Undefined, 0, 0),

            Self::R8Unorm => a("R8_UNORM", C::Unorm, 1, 1),
            Self::R8Uint => a("R8_UINT", C::Uint, 1, 1),
            Self::Rg8Unorm => a("RG8_UNORM", C::Unorm, 1, 2),
            Self::Rgba8Unorm => a("RGBA8_UNORM", C::Unorm, 1, 4),
            Self::Rgba8UnormSrgb => a("RGBA8_UNORM_SRGB", C::UnormSrgb, 1, 4),
            Self::Bgra8Unorm => a("BGRA8_UNORM", C::Unorm, 1, 4),
            Self::Bgra8UnormSrgb => a("BGRA8_UNORM_SRGB", C::UnormSrgb, 1, 4),
            Self::Rgba8Snorm => a("RGBA8_SNORM", C::Snorm, 1, 4),
            Self::Rgba8Uint => a("RGBA8_UINT", C::Uint, 1, 4),

            Self::R16Float => a("R16_FLOAT", C::Float, 2, 1),
            Self::Rg16Float => a("RG16_FLOAT", C::Float, 2, 2),
            Self::Rgba16Float => a("RGBA16_FLOAT", C::Float, 2, 4),
            Self::Rgba16Uint => a("RGBA16_UINT", C::Uint, 2, 4),

            Self::R32Float => a("R32_FLOAT", C::Float, 4, 1),
            Self::R32Uint => a("R32_UINT", C::Uint, 4, 1),
            Self::Rg32Float => a("RG32_FLOAT", C::Float, 4, 2),
            Self::Rgba32Float => a("RGBA32_FLOAT", C::Float, 4, 4),
            Self::Rgba32Uint => a("RGBA32_UINT", C::Uint, 4, 4),

            Self::Rgb10a2Unorm => a("RGB10A2_UNORM", C::Compound, 4, 1),
            Self::Rg11b10Float => a("R11G11B10_FLOAT", C::Compound, 4, 1),

            Self::Bc1Unorm => a("BC1_UNORM", C::Compressed, 8, 4),
            Self::Bc3Unorm => a("BC3_UNORM", C::Compressed, 16, 4),
            Self::Bc7Unorm => a("BC7_UNORM", C::Compressed, 16, 4),

            Self::D16Unorm => a("D16_UNORM", C::Depth, 2, 1),
            Self::D32Float => a("D32_FLOAT", C::Depth, 4, 1),
            Self::D24UnormS8Uint => a("D24_UNORM_S8_UINT", C::DepthStencil, 4, 1),
            Self::D32FloatS8X24Uint => a("D32_FLOAT_S8X24_UINT", C::DepthStencil, 8, 1),
        }
    }

    /// `true` for depth-only and combined depth-stencil formats.
    #[inline]
    #[must_use]
    pub const fn is_depth_stencil(self) -> bool {
        matches!(
            self.attribs().component_type,
            ComponentType::Depth | ComponentType::DepthStencil
        )
    }

    /// `true` if the format has a stencil aspect.
    #[inline]
    #[must_use]
    pub const fn has_stencil(self) -> bool {
        matches!(self.attribs().component_type, ComponentType::DepthStencil)
    }
}

impl std::fmt::Display for TextureFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.attribs().name)
    }
}
