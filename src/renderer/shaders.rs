//! Shader Variants
//!
//! Most full-screen passes share one quad source compiled with different
//! defines. Each variant is a [`ShaderKind`]; the [`ShaderLibrary`] compiles
//! all of them once at initialization and maps kinds to program handles.
//! Nothing is recompiled at runtime.

use smallvec::smallvec;

use crate::errors::Result;
use crate::rhi::{RenderDevice, ShaderDescriptor, ShaderId, ShaderStage, ShaderState};

macro_rules! shader_kinds {
    ($($kind:ident => ($source:literal, $stage:ident $(, $define:literal)?)),* $(,)?) => {
        /// Every program variant used by the frame pipeline.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum ShaderKind {
            $($kind),*
        }

        impl ShaderKind {
            pub const ALL: &'static [ShaderKind] = &[$(ShaderKind::$kind),*];
            pub const COUNT: usize = Self::ALL.len();

            #[must_use]
            pub fn name(self) -> &'static str {
                match self {
                    $(ShaderKind::$kind => stringify!($kind)),*
                }
            }

            #[must_use]
            pub fn descriptor(self) -> ShaderDescriptor {
                match self {
                    $(ShaderKind::$kind => ShaderDescriptor {
                        label: self.name().into(),
                        source: $source,
                        stage: ShaderStage::$stage,
                        defines: smallvec![$(($define, "1"))?],
                    }),*
                }
            }
        }
    };
}

shader_kinds! {
    QuadVertex => ("quad", Vertex),
    Texture => ("quad", Pixel, "PASS_TEXTURE"),
    Fxaa => ("quad", Pixel, "PASS_FXAA"),
    Luma => ("quad", Pixel, "PASS_LUMA"),
    Sharpening => ("quad", Pixel, "PASS_SHARPENING"),
    ChromaticAberration => ("quad", Pixel, "PASS_CHROMATIC_ABERRATION"),
    BlurGaussian => ("quad", Pixel, "PASS_BLUR_GAUSSIAN"),
    BlurBilateral => ("quad", Pixel, "PASS_BLUR_BILATERAL_GAUSSIAN"),
    BloomBright => ("quad", Pixel, "PASS_BRIGHT"),
    BloomBlend => ("quad", Pixel, "PASS_BLEND_ADDITIVE"),
    DownsampleBox => ("quad", Pixel, "PASS_DOWNSAMPLE_BOX"),
    UpsampleBox => ("quad", Pixel, "PASS_UPSAMPLE_BOX"),
    ToneMapping => ("quad", Pixel, "PASS_TONEMAPPING"),
    GammaCorrection => ("quad", Pixel, "PASS_GAMMA_CORRECTION"),
    Taa => ("quad", Pixel, "PASS_TAA_RESOLVE"),
    MotionBlur => ("quad", Pixel, "PASS_MOTION_BLUR"),
    Dithering => ("quad", Pixel, "PASS_DITHERING"),
    DebugNormal => ("quad", Pixel, "DEBUG_NORMAL"),
    DebugVelocity => ("quad", Pixel, "DEBUG_VELOCITY"),
    DebugDepth => ("quad", Pixel, "DEBUG_DEPTH"),
    DebugSsao => ("quad", Pixel, "DEBUG_SSAO"),
    Ssao => ("ssao", Pixel),
    Depth => ("depth", Vertex),
    GBufferVertex => ("gbuffer", Vertex),
    Lighting => ("light", VertexPixel),
    Transparent => ("transparent", VertexPixel),
    ShadowMappingDirectional => ("shadow_mapping", VertexPixel, "DIRECTIONAL"),
    ShadowMappingPoint => ("shadow_mapping", Pixel, "POINT"),
    ShadowMappingSpot => ("shadow_mapping", Pixel, "SPOT"),
    Color => ("color", VertexPixel),
    Font => ("font", VertexPixel),
    GizmoTransform => ("transform_gizmo", VertexPixel),
}

/// Compiled program handle for every [`ShaderKind`].
#[derive(Debug, Clone)]
pub struct ShaderLibrary {
    programs: [ShaderId; ShaderKind::COUNT],
}

impl ShaderLibrary {
    pub fn new(device: &mut dyn RenderDevice) -> Result<Self> {
        let mut programs = [ShaderId::default(); ShaderKind::COUNT];
        for &kind in ShaderKind::ALL {
            programs[kind as usize] = device.create_shader(&kind.descriptor())?;
        }
        Ok(Self { programs })
    }

    #[inline]
    #[must_use]
    pub fn get(&self, kind: ShaderKind) -> ShaderId {
        self.programs[kind as usize]
    }

    /// The program, if the device has finished compiling it.
    #[must_use]
    pub fn compiled(&self, device: &dyn RenderDevice, kind: ShaderKind) -> Option<ShaderId> {
        let id = self.get(kind);
        (device.shader_state(id) == ShaderState::Compiled).then_some(id)
    }
}
