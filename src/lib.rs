//! Deferred frame pipeline.
//!
//! Takes a per-frame scene snapshot and turns it into an ordered stream of
//! device commands: shadow depth, G-buffer, shadow and ambient occlusion
//! resolve, deferred lighting, transparency, a toggleable post-processing
//! chain and the debug overlays.
//!
//! The GPU is reached only through [`rhi::RenderDevice`]. [`rhi::RecordingDevice`]
//! implements it headlessly and keeps every submitted stream for
//! inspection.
//!
//! ```rust,ignore
//! use myth_deferred::{Renderer, RendererSettings, rhi::RecordingDevice};
//!
//! let mut renderer = Renderer::new(RecordingDevice::new(), RendererSettings::default(), 1280, 720)?;
//! let snapshot = world.snapshot(0.0);
//! renderer.acquire(&mut world, &snapshot);
//! renderer.render(&world);
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod errors;
pub mod renderer;
pub mod rhi;
pub mod scene;
pub mod utils;

pub use errors::{DeferredError, Result};
pub use renderer::{
    Bucket, DebugBuffer, FrameState, FrameStats, RenderFlags, Renderer, RendererSettings, RenderingProbe,
    ToneMapping,
};
pub use rhi::{RecordingDevice, RenderDevice};
pub use scene::{
    BoundingBox, Camera, EntityId, Geometry, Light, LightKind, Material, Renderable, SceneSnapshot, Skybox,
    Transform, World,
};
pub use utils::FpsCounter;
