//! Render Target Set
//!
//! Every intermediate texture of the frame lives here, sized from the
//! current output resolution. The set is rebuilt wholesale when the
//! resolution changes; passes borrow targets for the duration of a call and
//! never keep them across frames.
//!
//! # Ping-pong pairs
//!
//! Chained full-screen stages read one target and write another, then swap.
//! [`PingPong`] models that as two slots whose *identities* trade places on
//! [`swap`](PingPong::swap). Both slots are validated at construction to
//! match in width, height and format, so a swap can never silently resample
//! or truncate.
//!
//! ```text
//!   frame N:   current=A  alternate=B   ── stage writes B ──▶ swap
//!              current=B  alternate=A
//! ```
//!
//! Consumers must re-read `current()` after every swap point.

use glam::Vec4;
use log::{error, warn};
use rustc_hash::FxHashMap;

use crate::errors::{DeferredError, Result};
use crate::rhi::{DepthAttachment, RenderDevice, TextureDescriptor, TextureId, Viewport};
use crate::scene::LightKind;

pub const FORMAT_HDR: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;
pub const FORMAT_HDR_HALF: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub const FORMAT_DEPTH: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
pub const FORMAT_SINGLE: wgpu::TextureFormat = wgpu::TextureFormat::R8Unorm;

/// Reverse-Z clear value.
pub const CLEAR_DEPTH: f32 = 0.0;

// ─── RenderTarget ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTarget {
    pub id: TextureId,
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
}

impl RenderTarget {
    pub fn create(
        device: &mut dyn RenderDevice,
        label: &'static str,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
    ) -> Result<Self> {
        let desc = TextureDescriptor::render_target(label, width, height, format);
        let id = device.create_texture(&desc)?;
        Ok(Self { id, width, height, format })
    }

    #[inline]
    #[must_use]
    pub fn viewport(&self) -> Viewport {
        Viewport::from_size(self.width, self.height)
    }

    /// Single-slice depth attachment view of this target.
    #[inline]
    #[must_use]
    pub fn depth_attachment(&self) -> DepthAttachment {
        DepthAttachment { texture: self.id, slice: 0 }
    }

    /// Whether two targets may trade roles.
    #[must_use]
    pub fn matches(&self, other: &RenderTarget) -> bool {
        self.width == other.width && self.height == other.height && self.format == other.format
    }

    pub fn ensure_swappable(&self, other: &RenderTarget) -> Result<()> {
        if self.matches(other) {
            Ok(())
        } else {
            Err(DeferredError::TargetMismatch { a: self.id, b: other.id })
        }
    }
}

// ─── PingPong ────────────────────────────────────────────────────────────────

/// Two interchangeable targets with a current and an alternate role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingPong {
    slots: [RenderTarget; 2],
    front: usize,
}

impl PingPong {
    /// Fails with [`DeferredError::TargetMismatch`] unless both targets match.
    pub fn try_new(current: RenderTarget, alternate: RenderTarget) -> Result<Self> {
        current.ensure_swappable(&alternate).inspect_err(|e| error!("{e}"))?;
        Ok(Self { slots: [current, alternate], front: 0 })
    }

    #[inline]
    #[must_use]
    pub fn current(&self) -> &RenderTarget {
        &self.slots[self.front]
    }

    #[inline]
    #[must_use]
    pub fn alternate(&self) -> &RenderTarget {
        &self.slots[1 - self.front]
    }

    /// Exchanges roles; contents are untouched.
    #[inline]
    pub fn swap(&mut self) {
        self.front = 1 - self.front;
    }

    #[must_use]
    pub fn ids(&self) -> [TextureId; 2] {
        [self.slots[0].id, self.slots[1].id]
    }
}

// ─── GBuffer ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GBuffer {
    pub albedo: RenderTarget,
    pub normal: RenderTarget,
    pub material: RenderTarget,
    pub velocity: RenderTarget,
    pub depth: RenderTarget,
}

impl GBuffer {
    #[must_use]
    pub fn color_targets(&self) -> [TextureId; 4] {
        [self.albedo.id, self.normal.id, self.material.id, self.velocity.id]
    }
}

// ─── RenderTargetSet ─────────────────────────────────────────────────────────

/// All resolution-dependent targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderTargetSet {
    pub width: u32,
    pub height: u32,

    pub gbuffer: GBuffer,
    /// Lighting result and post-process chain: current = input,
    /// alternate = output. The finished frame is always in `alternate()`.
    pub hdr: PingPong,
    /// TAA resolve target (current) and accumulated history (alternate).
    pub taa: PingPong,
    pub full_spare: RenderTarget,

    pub shadows: RenderTarget,
    /// SSAO raw estimate (current) and blurred result (alternate).
    pub ssao: PingPong,
    pub half_spare: RenderTarget,

    pub blur: PingPong,
}

impl RenderTargetSet {
    /// Creates every target for `width`×`height`.
    ///
    /// On failure all textures created so far are released and nothing is
    /// left allocated.
    pub fn create(device: &mut dyn RenderDevice, width: u32, height: u32) -> Result<Self> {
        let (half_w, half_h) = (width / 2, height / 2);
        let (quarter_w, quarter_h) = (width / 4, height / 4);
        if quarter_w == 0 || quarter_h == 0 {
            warn!("{width}x{height} is an invalid resolution for render targets");
            return Err(DeferredError::ResolutionTooSmall { width, height });
        }

        let mut created = Vec::new();
        let result = Self::create_all(device, &mut created, width, height, half_w, half_h, quarter_w, quarter_h);
        if result.is_err() {
            for id in created {
                device.destroy_texture(id);
            }
        }
        result
    }

    fn create_all(
        device: &mut dyn RenderDevice,
        created: &mut Vec<TextureId>,
        width: u32,
        height: u32,
        half_w: u32,
        half_h: u32,
        quarter_w: u32,
        quarter_h: u32,
    ) -> Result<Self> {
        let mut make = |label: &'static str, w: u32, h: u32, format: wgpu::TextureFormat| {
            let target = RenderTarget::create(device, label, w, h, format)?;
            created.push(target.id);
            Ok::<_, DeferredError>(target)
        };

        let gbuffer = GBuffer {
            albedo: make("GBuffer Albedo", width, height, wgpu::TextureFormat::Rgba8Unorm)?,
            normal: make("GBuffer Normal", width, height, wgpu::TextureFormat::Rgba16Float)?,
            material: make("GBuffer Material", width, height, wgpu::TextureFormat::Rgba8Unorm)?,
            velocity: make("GBuffer Velocity", width, height, wgpu::TextureFormat::Rg16Float)?,
            depth: make("GBuffer Depth", width, height, FORMAT_DEPTH)?,
        };

        let hdr = PingPong::try_new(
            make("HDR Light", width, height, FORMAT_HDR)?,
            make("HDR Light 2", width, height, FORMAT_HDR)?,
        )?;
        let taa = PingPong::try_new(
            make("TAA Current", width, height, FORMAT_HDR_HALF)?,
            make("TAA History", width, height, FORMAT_HDR_HALF)?,
        )?;
        let full_spare = make("Full Spare", width, height, FORMAT_HDR_HALF)?;

        let shadows = make("Shadows", half_w, half_h, FORMAT_SINGLE)?;
        let ssao = PingPong::try_new(
            make("SSAO Raw", half_w, half_h, FORMAT_SINGLE)?,
            make("SSAO", half_w, half_h, FORMAT_SINGLE)?,
        )?;
        let half_spare = make("Half Spare", half_w, half_h, FORMAT_HDR_HALF)?;

        let blur = PingPong::try_new(
            make("Quarter Blur 1", quarter_w, quarter_h, FORMAT_HDR_HALF)?,
            make("Quarter Blur 2", quarter_w, quarter_h, FORMAT_HDR_HALF)?,
        )?;

        Ok(Self { width, height, gbuffer, hdr, taa, full_spare, shadows, ssao, half_spare, blur })
    }

    /// Every texture owned by the set.
    #[must_use]
    pub fn texture_ids(&self) -> Vec<TextureId> {
        let mut ids = self.gbuffer.color_targets().to_vec();
        ids.push(self.gbuffer.depth.id);
        ids.extend(self.hdr.ids());
        ids.extend(self.taa.ids());
        ids.push(self.full_spare.id);
        ids.push(self.shadows.id);
        ids.extend(self.ssao.ids());
        ids.push(self.half_spare.id);
        ids.extend(self.blur.ids());
        ids
    }

    pub fn release(self, device: &mut dyn RenderDevice) {
        for id in self.texture_ids() {
            device.destroy_texture(id);
        }
    }
}

// ─── Fallback Textures ───────────────────────────────────────────────────────

/// Resolution-independent textures created once at initialization.
#[derive(Debug, Clone)]
pub struct FallbackTextures {
    pub white: TextureId,
    pub black: TextureId,
    pub noise_normal: TextureId,
    pub lut_ibl: TextureId,
    pub font_atlas: TextureId,
    light_icons: FxHashMap<LightKind, TextureId>,
}

impl FallbackTextures {
    pub fn new(device: &mut dyn RenderDevice) -> Result<Self> {
        let rgba8 = wgpu::TextureFormat::Rgba8Unorm;
        let mut make = |label: &'static str, size: u32, format| {
            device.create_texture(&TextureDescriptor::sampled(label, size, size, format))
        };

        let white = make("White", 1, rgba8)?;
        let black = make("Black", 1, rgba8)?;
        let noise_normal = make("Noise Normal", 64, rgba8)?;
        let lut_ibl = make("BRDF LUT", 512, wgpu::TextureFormat::Rg16Float)?;
        let font_atlas = make("Font Atlas", 512, wgpu::TextureFormat::R8Unorm)?;

        let mut light_icons = FxHashMap::default();
        light_icons.insert(LightKind::Directional, make("Icon Directional Light", 128, rgba8)?);
        light_icons.insert(LightKind::Point, make("Icon Point Light", 128, rgba8)?);
        light_icons.insert(LightKind::Spot, make("Icon Spot Light", 128, rgba8)?);

        Ok(Self { white, black, noise_normal, lut_ibl, font_atlas, light_icons })
    }

    #[must_use]
    pub fn light_icon(&self, kind: LightKind) -> Option<TextureId> {
        self.light_icons.get(&kind).copied()
    }
}

/// Pixel size of the light gizmo icons.
pub const LIGHT_ICON_SIZE: f32 = 128.0;

/// Clear colour meaning "fully lit" / "fully visible".
pub const CLEAR_ONE: Vec4 = Vec4::ONE;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rhi::RecordingDevice;

    #[test]
    fn ping_pong_swap_exchanges_identity() {
        let mut device = RecordingDevice::new();
        let a = RenderTarget::create(&mut device, "A", 8, 8, FORMAT_HDR).unwrap();
        let b = RenderTarget::create(&mut device, "B", 8, 8, FORMAT_HDR).unwrap();
        let mut pair = PingPong::try_new(a, b).unwrap();

        assert_eq!(pair.current().id, a.id);
        pair.swap();
        assert_eq!(pair.current().id, b.id);
        assert_eq!(pair.alternate().id, a.id);
    }

    #[test]
    fn ping_pong_rejects_mismatched_format() {
        let mut device = RecordingDevice::new();
        let a = RenderTarget::create(&mut device, "A", 8, 8, FORMAT_HDR).unwrap();
        let b = RenderTarget::create(&mut device, "B", 8, 8, FORMAT_HDR_HALF).unwrap();
        assert!(matches!(PingPong::try_new(a, b), Err(DeferredError::TargetMismatch { .. })));
    }

    #[test]
    fn ping_pong_rejects_mismatched_size() {
        let mut device = RecordingDevice::new();
        let a = RenderTarget::create(&mut device, "A", 8, 8, FORMAT_HDR).unwrap();
        let b = RenderTarget::create(&mut device, "B", 8, 4, FORMAT_HDR).unwrap();
        assert!(PingPong::try_new(a, b).is_err());
    }

    #[test]
    fn set_sizes_follow_resolution() {
        let mut device = RecordingDevice::new();
        let set = RenderTargetSet::create(&mut device, 64, 32).unwrap();
        assert_eq!((set.shadows.width, set.shadows.height), (32, 16));
        assert_eq!((set.blur.current().width, set.blur.current().height), (16, 8));
        assert_eq!(device.live_textures(), set.texture_ids().len());
    }

    #[test]
    fn failed_creation_leaves_nothing_behind() {
        let mut device = RecordingDevice::new();
        device.set_texture_budget(Some(5));
        assert!(RenderTargetSet::create(&mut device, 64, 64).is_err());
        assert_eq!(device.live_textures(), 0);
    }

    #[test]
    fn too_small_for_quarter_resolution() {
        let mut device = RecordingDevice::new();
        assert!(matches!(
            RenderTargetSet::create(&mut device, 2, 64),
            Err(DeferredError::ResolutionTooSmall { .. })
        ));
    }
}
