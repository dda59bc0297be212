//! Deferred Renderer
//!
//! [`Renderer`] owns every GPU-side object of the frame pipeline and drives
//! one frame per [`render`](Renderer::render) call:
//!
//! ```text
//! acquire(world, snapshot)          ─▶ buckets, camera, sky, lights
//! render(world)
//!   ├─ no camera                    ─▶ clear backbuffer to black
//!   ├─ nothing to draw              ─▶ clear to camera colour, present
//!   └─ begin_frame (matrices, jitter)
//!        LightDepth → GBuffer → PreLight → Light → Transparent → PostLight
//!        → Lines → Gizmos → DebugBuffer → PerformanceMetrics
//!        submit, present
//! ```
//!
//! # Subsystems
//!
//! - [`PipelineStateCache`]: fixed-function state, created once.
//! - [`ShaderLibrary`]: every program variant, created once.
//! - [`RenderTargetSet`]: resolution-dependent targets, rebuilt by
//!   [`set_resolution`](Renderer::set_resolution).
//! - [`FrameState`]: buckets, matrices and jitter; survives across frames
//!   for history.
//! - [`RenderingProbe`]: thread-safe view of the frame-in-flight mark.

pub mod acquire;
pub mod context;
pub mod frame;
pub mod passes;
pub mod settings;
pub mod shaders;
pub mod state_cache;
pub mod targets;
pub mod uniforms;

use glam::{Vec2, Vec3, Vec4};
use log::{debug, info, trace, warn};

use crate::errors::{DeferredError, Result};
use crate::rhi::{CommandList, RenderDevice};
use crate::scene::{BoundingBox, EntityId, SceneSnapshot, World};
use crate::utils::FpsCounter;

pub use context::{FrameBuffers, GizmoAxis, RenderContext, RenderingProbe, TransformGizmo};
pub use frame::{Bucket, FrameState, FrameStats, FrameUniforms, LineVertex};
pub use passes::RenderNode;
pub use settings::{DebugBuffer, RenderFlags, RendererSettings, ToneMapping};
pub use shaders::{ShaderKind, ShaderLibrary};
pub use state_cache::{BlendMode, DepthState, FillMode, PipelineStateCache, SamplerKind};
pub use targets::{FallbackTextures, PingPong, RenderTarget, RenderTargetSet};

/// Backbuffer colour when there is no camera to take one from.
const NO_CAMERA_CLEAR: Vec4 = Vec4::new(0.0, 0.0, 0.0, 1.0);

pub struct Renderer<D: RenderDevice> {
    device: D,
    cmd: CommandList,

    states: PipelineStateCache,
    shaders: ShaderLibrary,
    fallbacks: FallbackTextures,
    buffers: FrameBuffers,
    targets: RenderTargetSet,

    frame: FrameState,
    settings: RendererSettings,
    passes: Vec<Box<dyn RenderNode>>,
    gizmo: TransformGizmo,

    probe: RenderingProbe,
    fps: FpsCounter,
}

impl<D: RenderDevice> Renderer<D> {
    /// Creates every state object, program, fallback texture and render
    /// target for a `width`×`height` output.
    pub fn new(mut device: D, settings: RendererSettings, width: u32, height: u32) -> Result<Self> {
        if !device.is_initialized() {
            return Err(DeferredError::DeviceNotInitialized);
        }
        let (width, height) = validate_resolution(width, height, settings.max_resolution)?;

        let states = PipelineStateCache::new(&mut device)?;
        let shaders = ShaderLibrary::new(&mut device)?;
        let fallbacks = FallbackTextures::new(&mut device)?;
        let buffers = FrameBuffers::new(&mut device)?;
        let targets = RenderTargetSet::create(&mut device, width, height)?;

        info!("Deferred renderer initialized at {width}x{height} with {} shader variants", ShaderKind::COUNT);

        Ok(Self {
            device,
            cmd: CommandList::new(),
            states,
            shaders,
            fallbacks,
            buffers,
            targets,
            frame: FrameState::new(),
            settings,
            passes: passes::standard_passes(),
            gizmo: TransformGizmo::default(),
            probe: RenderingProbe::default(),
            fps: FpsCounter::new(),
        })
    }

    // === Frame ===

    /// Rebuilds the visibility buckets from `snapshot`.
    pub fn acquire(&mut self, world: &mut World, snapshot: &SceneSnapshot) {
        let resolution = self.resolution();
        acquire::acquire(world, snapshot, &mut self.device, resolution, &mut self.frame);
    }

    /// Records and submits one frame from the last acquired snapshot.
    ///
    /// Queued debug lines live for one call, whether or not the frame
    /// reaches the lines pass.
    pub fn render(&mut self, world: &World) {
        if !self.device.is_initialized() {
            trace!("Device not initialized, skipping frame");
            self.frame.clear_lines();
            return;
        }

        let Some(camera) = self.frame.camera else {
            debug!("No camera, clearing backbuffer");
            self.device.clear_backbuffer(NO_CAMERA_CLEAR);
            self.frame.clear_lines();
            return;
        };

        if !self.frame.has_renderables() {
            self.device.clear_backbuffer(camera.clear_color);
            self.device.present();
            self.frame.clear_lines();
            return;
        }

        self.probe.set_rendering(true);

        let resolution = self.resolution();
        let taa = self.settings.is_enabled(RenderFlags::TAA);
        self.frame.begin_frame(&camera, resolution, taa);
        self.fps.update();
        self.frame.stats.fps = self.fps.current_fps;

        let Self { device, cmd, states, shaders, fallbacks, buffers, targets, frame, settings, passes, gizmo, .. } =
            self;
        let mut ctx = RenderContext {
            device,
            cmd,
            states,
            shaders,
            targets,
            fallbacks,
            buffers,
            frame,
            settings,
            world,
            gizmo,
        };
        for pass in passes.iter_mut() {
            pass.run(&mut ctx);
        }

        self.cmd.submit(&mut self.device);
        self.device.present();

        self.probe.publish(self.frame.stats);
        self.probe.set_rendering(false);
    }

    /// Recreates every resolution-dependent target.
    ///
    /// Rejects zero or oversized dimensions, rounds odd ones down to even,
    /// and does nothing if the result equals the current resolution. The new
    /// set is fully created before the old one is released, so a failure
    /// leaves the renderer untouched.
    pub fn set_resolution(&mut self, width: u32, height: u32) -> Result<()> {
        let (width, height) = validate_resolution(width, height, self.settings.max_resolution)?;

        if width == self.targets.width && height == self.targets.height {
            warn!("Resolution is already {width}x{height}");
            return Ok(());
        }

        let targets = RenderTargetSet::create(&mut self.device, width, height)?;
        let old = std::mem::replace(&mut self.targets, targets);
        old.release(&mut self.device);

        info!("Resolution set to {width}x{height}");
        Ok(())
    }

    // === Debug drawing ===

    /// Queues a line for the next lines pass.
    pub fn draw_line(&mut self, from: Vec3, to: Vec3, color_from: Vec4, color_to: Vec4, depth: bool) {
        self.frame.push_line(from, to, color_from, color_to, depth);
    }

    /// Queues the twelve edges of `aabb`.
    pub fn draw_box(&mut self, aabb: &BoundingBox, color: Vec4, depth: bool) {
        self.frame.push_box(aabb, color, depth);
    }

    /// Attaches the transform gizmo to `entity`, or detaches it with `None`.
    pub fn select(&mut self, world: &World, entity: Option<EntityId>) -> Result<()> {
        if let Some(id) = entity
            && !world.contains(id)
        {
            return Err(DeferredError::UnknownEntity(id));
        }
        self.gizmo.selected = entity;
        self.gizmo.hovered = None;
        Ok(())
    }

    pub fn gizmo_mut(&mut self) -> &mut TransformGizmo {
        &mut self.gizmo
    }

    // === Accessors ===

    #[must_use]
    pub fn is_rendering(&self) -> bool {
        self.probe.is_rendering()
    }

    /// A cloneable handle for polling the frame state from other threads.
    #[must_use]
    pub fn probe(&self) -> RenderingProbe {
        self.probe.clone()
    }

    #[must_use]
    pub fn resolution(&self) -> Vec2 {
        Vec2::new(self.targets.width as f32, self.targets.height as f32)
    }

    #[must_use]
    pub fn settings(&self) -> &RendererSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut RendererSettings {
        &mut self.settings
    }

    #[must_use]
    pub fn targets(&self) -> &RenderTargetSet {
        &self.targets
    }

    #[must_use]
    pub fn frame(&self) -> &FrameState {
        &self.frame
    }

    #[must_use]
    pub fn fallbacks(&self) -> &FallbackTextures {
        &self.fallbacks
    }

    #[must_use]
    pub fn shaders(&self) -> &ShaderLibrary {
        &self.shaders
    }

    #[must_use]
    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }
}

/// Checks a requested output size against `max` and rounds it down to even
/// dimensions.
pub fn validate_resolution(width: u32, height: u32, max: u32) -> Result<(u32, u32)> {
    if width == 0 || height == 0 || width > max || height > max {
        warn!("{width}x{height} is an invalid resolution");
        return Err(DeferredError::InvalidResolution { width, height, max });
    }
    Ok((width - width % 2, height - height % 2))
}
