//! Pipeline State Cache
//!
//! Owns every fixed-function state object the passes bind. All of them are
//! created once in [`PipelineStateCache::new`] and addressed through small
//! enumerations afterwards, so a pass never builds state at draw time.
//!
//! | Family      | Variants                                              |
//! |-------------|-------------------------------------------------------|
//! | Depth       | enabled (reverse-Z, write) / read-only / disabled     |
//! | Rasterizer  | cull {back, front, none} × fill {solid, wireframe}    |
//! | Blend       | enabled (alpha) / disabled / shadow maps (multiply)   |
//! | Sampler     | compare-depth, point/bilinear/trilinear, anisotropic  |

use crate::errors::Result;
use crate::rhi::{RenderDevice, StateDescriptor, StateId};
use crate::scene::CullMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepthState {
    Enabled,
    Disabled,
    /// Tests against the existing depth without writing to it.
    ReadOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FillMode {
    Solid,
    Wireframe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendMode {
    Enabled,
    Disabled,
    /// Multiplies the destination by the source so each light can only
    /// darken the shadow-resolve target.
    ShadowMaps,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerKind {
    CompareDepth,
    PointClamp,
    BilinearClamp,
    BilinearWrap,
    TrilinearClamp,
    AnisotropicWrap,
}

impl SamplerKind {
    pub const ALL: [SamplerKind; 6] = [
        Self::CompareDepth,
        Self::PointClamp,
        Self::BilinearClamp,
        Self::BilinearWrap,
        Self::TrilinearClamp,
        Self::AnisotropicWrap,
    ];
}

const CULL_MODES: [CullMode; 3] = [CullMode::Back, CullMode::Front, CullMode::None];
const FILL_MODES: [FillMode; 2] = [FillMode::Solid, FillMode::Wireframe];

/// Immutable state objects, indexed by enumeration.
#[derive(Debug, Clone)]
pub struct PipelineStateCache {
    depth: [StateId; 3],
    rasterizer: [StateId; 6],
    blend: [StateId; 3],
    samplers: [StateId; 6],
}

impl PipelineStateCache {
    pub fn new(device: &mut dyn RenderDevice) -> Result<Self> {
        let depth = [
            device.create_state(&depth_descriptor(DepthState::Enabled))?,
            device.create_state(&depth_descriptor(DepthState::Disabled))?,
            device.create_state(&depth_descriptor(DepthState::ReadOnly))?,
        ];

        let mut rasterizer = [StateId::default(); 6];
        for cull in CULL_MODES {
            for fill in FILL_MODES {
                rasterizer[rasterizer_index(cull, fill)] =
                    device.create_state(&rasterizer_descriptor(cull, fill))?;
            }
        }

        let blend = [
            device.create_state(&blend_descriptor(BlendMode::Enabled))?,
            device.create_state(&blend_descriptor(BlendMode::Disabled))?,
            device.create_state(&blend_descriptor(BlendMode::ShadowMaps))?,
        ];

        let mut samplers = [StateId::default(); 6];
        for kind in SamplerKind::ALL {
            samplers[kind as usize] = device.create_state(&sampler_descriptor(kind))?;
        }

        Ok(Self { depth, rasterizer, blend, samplers })
    }

    #[inline]
    #[must_use]
    pub fn depth(&self, state: DepthState) -> StateId {
        self.depth[state as usize]
    }

    #[inline]
    #[must_use]
    pub fn rasterizer(&self, cull: CullMode, fill: FillMode) -> StateId {
        self.rasterizer[rasterizer_index(cull, fill)]
    }

    #[inline]
    #[must_use]
    pub fn blend(&self, mode: BlendMode) -> StateId {
        self.blend[mode as usize]
    }

    #[inline]
    #[must_use]
    pub fn sampler(&self, kind: SamplerKind) -> StateId {
        self.samplers[kind as usize]
    }
}

#[inline]
fn rasterizer_index(cull: CullMode, fill: FillMode) -> usize {
    cull as usize * FILL_MODES.len() + fill as usize
}

// ─── Descriptors ─────────────────────────────────────────────────────────────

fn depth_descriptor(state: DepthState) -> StateDescriptor {
    match state {
        DepthState::Enabled => StateDescriptor::DepthStencil {
            depth_test_enabled: true,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::GreaterEqual,
        },
        DepthState::ReadOnly => StateDescriptor::DepthStencil {
            depth_test_enabled: true,
            depth_write_enabled: false,
            depth_compare: wgpu::CompareFunction::GreaterEqual,
        },
        DepthState::Disabled => StateDescriptor::DepthStencil {
            depth_test_enabled: false,
            depth_write_enabled: false,
            depth_compare: wgpu::CompareFunction::Always,
        },
    }
}

fn rasterizer_descriptor(cull: CullMode, fill: FillMode) -> StateDescriptor {
    StateDescriptor::Rasterizer {
        cull_mode: match cull {
            CullMode::Back => Some(wgpu::Face::Back),
            CullMode::Front => Some(wgpu::Face::Front),
            CullMode::None => None,
        },
        polygon_mode: match fill {
            FillMode::Solid => wgpu::PolygonMode::Fill,
            FillMode::Wireframe => wgpu::PolygonMode::Line,
        },
    }
}

fn blend_descriptor(mode: BlendMode) -> StateDescriptor {
    StateDescriptor::Blend(match mode {
        BlendMode::Enabled => Some(wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::SrcAlpha,
                dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
        }),
        BlendMode::Disabled => None,
        BlendMode::ShadowMaps => Some(wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::Dst,
                dst_factor: wgpu::BlendFactor::Zero,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent::REPLACE,
        }),
    })
}

fn sampler_descriptor(kind: SamplerKind) -> StateDescriptor {
    let (address_mode, filter, mipmap_filter, compare, anisotropy_clamp) = match kind {
        SamplerKind::CompareDepth => (
            wgpu::AddressMode::ClampToEdge,
            wgpu::FilterMode::Linear,
            wgpu::MipmapFilterMode::Nearest,
            Some(wgpu::CompareFunction::Greater),
            1,
        ),
        SamplerKind::PointClamp => (
            wgpu::AddressMode::ClampToEdge,
            wgpu::FilterMode::Nearest,
            wgpu::MipmapFilterMode::Nearest,
            None,
            1,
        ),
        SamplerKind::BilinearClamp => (
            wgpu::AddressMode::ClampToEdge,
            wgpu::FilterMode::Linear,
            wgpu::MipmapFilterMode::Nearest,
            None,
            1,
        ),
        SamplerKind::BilinearWrap => (
            wgpu::AddressMode::Repeat,
            wgpu::FilterMode::Linear,
            wgpu::MipmapFilterMode::Nearest,
            None,
            1,
        ),
        SamplerKind::TrilinearClamp => (
            wgpu::AddressMode::ClampToEdge,
            wgpu::FilterMode::Linear,
            wgpu::MipmapFilterMode::Linear,
            None,
            1,
        ),
        SamplerKind::AnisotropicWrap => (
            wgpu::AddressMode::Repeat,
            wgpu::FilterMode::Linear,
            wgpu::MipmapFilterMode::Linear,
            None,
            16,
        ),
    };

    StateDescriptor::Sampler {
        address_mode,
        mag_filter: filter,
        min_filter: filter,
        mipmap_filter,
        compare,
        anisotropy_clamp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rhi::RecordingDevice;

    #[test]
    fn every_rasterizer_combination_is_distinct() {
        let mut device = RecordingDevice::new();
        let cache = PipelineStateCache::new(&mut device).unwrap();

        let mut seen = Vec::new();
        for cull in CULL_MODES {
            for fill in FILL_MODES {
                let id = cache.rasterizer(cull, fill);
                assert!(!seen.contains(&id));
                seen.push(id);
            }
        }
        // 3 depth + 6 rasterizer + 3 blend + 6 samplers
        assert_eq!(device.state_count(), 18);
    }

    #[test]
    fn read_only_depth_tests_without_writing() {
        let mut device = RecordingDevice::new();
        let cache = PipelineStateCache::new(&mut device).unwrap();
        let desc = device.state(cache.depth(DepthState::ReadOnly)).unwrap();
        assert_eq!(
            desc,
            &StateDescriptor::DepthStencil {
                depth_test_enabled: true,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::GreaterEqual,
            }
        );
        assert_ne!(cache.depth(DepthState::ReadOnly), cache.depth(DepthState::Enabled));
    }

    #[test]
    fn wireframe_uses_line_polygon_mode() {
        let mut device = RecordingDevice::new();
        let cache = PipelineStateCache::new(&mut device).unwrap();
        let desc = device.state(cache.rasterizer(CullMode::None, FillMode::Wireframe)).unwrap();
        assert_eq!(
            desc,
            &StateDescriptor::Rasterizer { cull_mode: None, polygon_mode: wgpu::PolygonMode::Line }
        );
    }
}
