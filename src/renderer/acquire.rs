//! Scene Acquisition
//!
//! Turns a [`SceneSnapshot`] into the frame's visibility buckets. Every
//! entity is probed once per capability and routed:
//!
//! | Capability  | Destination                                         |
//! |-------------|-----------------------------------------------------|
//! | Renderable  | Opaque or Transparent (albedo alpha < 1), unless it  |
//! |             | is also a skybox                                    |
//! | Skybox      | recorded as the current sky                         |
//! | Light       | Light bucket, shadow map synced                     |
//! | Camera      | Camera bucket, becomes the active camera            |
//!
//! Opaque and transparent buckets are then ordered front-to-back and grouped
//! by material. Both sorts are stable, so the material sort keeps the
//! distance order within each group.

use glam::Vec2;
use log::{trace, warn};

use super::frame::{Bucket, FrameState};
use crate::rhi::RenderDevice;
use crate::scene::{Capability, EntityId, RenderCamera, SceneSnapshot, World};

/// Rebuilds `frame`'s buckets, camera and sky from `snapshot`.
///
/// Lights found in the snapshot get their shadow maps created or resized
/// and their light-space matrices refreshed against the new camera.
pub fn acquire(
    world: &mut World,
    snapshot: &SceneSnapshot,
    device: &mut dyn RenderDevice,
    resolution: Vec2,
    frame: &mut FrameState,
) {
    frame.reset_scene();
    let mut camera_entity = None;

    for &entity in &snapshot.entities {
        if !world.contains(entity) {
            trace!("Snapshot references a despawned entity {entity:?}");
            continue;
        }

        let is_skybox = world.has(entity, Capability::Skybox);

        if world.has(entity, Capability::Renderable) && !is_skybox {
            let transparent = world.material_of(entity).is_some_and(|m| m.is_transparent());
            let bucket = if transparent { Bucket::Transparent } else { Bucket::Opaque };
            frame.bucket_mut(bucket).push(entity);
        }

        if world.has(entity, Capability::Light) {
            frame.bucket_mut(Bucket::Light).push(entity);
        }

        if let Some(skybox) = world.skybox(entity) {
            frame.skybox = Some(skybox.texture);
        }

        if world.has(entity, Capability::Camera) {
            frame.bucket_mut(Bucket::Camera).push(entity);
            camera_entity = Some(entity);
        }
    }

    frame.camera = camera_entity.and_then(|id| extract_camera(world, id, resolution));
    frame.camera_entity = camera_entity;

    let camera_position = frame.camera.as_ref().map(|c| c.position);
    for bucket in [Bucket::Opaque, Bucket::Transparent] {
        sort_renderables(world, frame.bucket_mut(bucket), camera_position);
    }

    update_lights(world, device, frame);
}

/// Orders a renderable bucket front-to-back, then groups it by material.
///
/// Without a camera only the material grouping is applied.
pub fn sort_renderables(world: &World, entities: &mut [EntityId], camera_position: Option<glam::Vec3>) {
    if let Some(eye) = camera_position {
        entities.sort_by(|&a, &b| {
            let da = distance_squared(world, a, eye);
            let db = distance_squared(world, b, eye);
            da.total_cmp(&db)
        });
    }

    entities.sort_by_key(|&id| world.renderable(id).and_then(|r| r.material));
}

fn distance_squared(world: &World, entity: EntityId, eye: glam::Vec3) -> f32 {
    world
        .world_aabb(entity)
        .map(|aabb| aabb.center())
        .or_else(|| world.transform(entity).map(|t| t.position))
        .map_or(0.0, |center| center.distance_squared(eye))
}

pub(crate) fn extract_camera(world: &World, entity: EntityId, resolution: Vec2) -> Option<RenderCamera> {
    let camera = world.camera(entity)?;
    let transform = world.transform(entity)?;
    Some(camera.extract(transform, resolution))
}

fn update_lights(world: &mut World, device: &mut dyn RenderDevice, frame: &FrameState) {
    for &entity in frame.bucket(Bucket::Light) {
        let Some(transform) = world.transform(entity).copied() else {
            continue;
        };
        let Some(light) = world.light_mut(entity) else {
            continue;
        };

        if let Err(e) = light.sync_shadow_map(device) {
            warn!("Shadow map for {entity:?} unavailable: {e}");
        }
        light.update(&transform, frame.camera.as_ref());
    }
}
