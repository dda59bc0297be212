//! Error Types
//!
//! This module defines the error types used throughout the frame pipeline.
//!
//! # Overview
//!
//! The main error type [`DeferredError`] covers the failure modes that can
//! abort an operation outright:
//! - Device-side factory failures (render targets, buffers, state objects)
//! - Invalid configuration (zero or oversized resolution)
//! - Render target pairs that cannot be swapped
//!
//! Degraded per-frame conditions (no camera, uncompiled shader, empty
//! buckets, missing components on an entity) are *not* errors. Passes log
//! them and carry on, so nothing in this module crosses a pass boundary.
//!
//! # Usage
//!
//! All fallible public APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, DeferredError>`.

use thiserror::Error;

use crate::rhi::TextureId;
use crate::scene::EntityId;

/// The main error type for the deferred frame pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeferredError {
    // ========================================================================
    // Device Errors
    // ========================================================================
    /// The device reported itself as not initialized.
    #[error("Render device is not initialized")]
    DeviceNotInitialized,

    /// A device factory call failed.
    #[error("Failed to create '{label}': {reason}")]
    ResourceCreation { label: String, reason: String },

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Requested resolution is zero or above the configured maximum.
    #[error("{width}x{height} is an invalid resolution (max {max})")]
    InvalidResolution { width: u32, height: u32, max: u32 },

    /// Resolution is valid but too small to derive quarter-size targets.
    #[error("{width}x{height} is too small to derive quarter resolution targets")]
    ResolutionTooSmall { width: u32, height: u32 },

    /// Two targets that are about to swap roles differ in size or format.
    #[error("Render targets {a:?} and {b:?} must match in width, height and format to be swapped")]
    TargetMismatch { a: TextureId, b: TextureId },

    // ========================================================================
    // Scene Errors
    // ========================================================================
    /// The entity handle does not resolve in the world.
    #[error("Unknown entity: {0:?}")]
    UnknownEntity(EntityId),
}

/// Alias for `Result<T, DeferredError>`.
pub type Result<T> = std::result::Result<T, DeferredError>;
