//! Ice explosion (effect 3): crystal shards, frost cloud, frost rays and a cold flash.

use bevy::prelude::*;
use rand::Rng;

use crate::constants::*;
use crate::error::FxResult;
use crate::math_utils::{facing_rotation, random_euler, random_spherical_direction, symmetric_vec3};
use crate::particles::rigid_body::{BodySpec, RigidBody, RigidBodyParams, ScaleGrowth, Spin};
use crate::particles::{spawn_child, Fade, LightFlash, RigidBodyBurst, SpawnContext, SpawnOutcome};
use crate::textures;
use crate::types::{hex_color, MaterialDesc, MeshShape, Shading};

const FROST_RAY_SEGMENTS: u32 = 8;

/// Spawn every layer of the ice explosion
pub fn spawn_ice_effect(ctx: &mut SpawnContext<'_>) -> Vec<SpawnOutcome> {
    vec![
        spawn_child(ctx, "ice_shards", spawn_ice_shards),
        spawn_child(ctx, "frost_cloud", spawn_frost_cloud),
        spawn_child(ctx, "frost_rays", spawn_frost_rays),
        spawn_child(ctx, "cold_flash", LightFlash::cold),
    ]
}

fn shard_shape(index: usize) -> MeshShape {
    match index {
        0 => MeshShape::Tetrahedron { radius: 0.2 },
        1 => MeshShape::Cone { radius: 0.1, height: 0.3, segments: 8 },
        _ => MeshShape::Cuboid { x: 0.1, y: 0.2, z: 0.1 },
    }
}

/// Outward push along the shard's offset from the centre. A shard sitting on
/// the centre has no outward direction and gets no push.
pub fn outward_impulse(offset: Vec3, strength: f32) -> Vec3 {
    offset.try_normalize().map(|dir| dir * strength).unwrap_or(Vec3::ZERO)
}

pub fn spawn_ice_shards(ctx: &mut SpawnContext<'_>) -> FxResult<RigidBodyBurst> {
    let seed = ctx.rng.gen();
    let origin = ctx.position;
    let rng = &mut *ctx.rng;

    let mut specs = Vec::with_capacity(ICE_SHARD_COUNT);
    for _ in 0..ICE_SHARD_COUNT {
        let shape = shard_shape(rng.gen_range(0..3));
        let hue = rng.gen::<f32>() * 0.1 + 0.5;
        let saturation = rng.gen::<f32>() * 0.3 + 0.7;
        let lightness = rng.gen::<f32>() * 0.3 + 0.7;
        let scale = rng.gen::<f32>() * 0.7 + 0.3;

        let position = origin;
        let velocity = symmetric_vec3(rng, ICE_SHARD_SPEED);
        let mut body = RigidBody::new(
            position,
            velocity + outward_impulse(position - origin, ICE_SHARD_IMPULSE),
            Fade::new(ICE_SHARD_OPACITY, ICE_SHARD_FADE_STEP),
        );
        body.euler = random_euler(rng);
        body.spin = symmetric_vec3(rng, ICE_SHARD_SPIN);
        body.scale = Vec3::splat(scale);

        specs.push(BodySpec {
            body,
            shape,
            material: MaterialDesc::unlit(
                Color::hsl(hue * 360.0, saturation, lightness),
                ICE_SHARD_OPACITY,
            )
            .with_shading(Shading::Crystal),
        });
    }

    RigidBodyBurst::spawn(
        ctx.scene,
        "ice_shards",
        RigidBodyParams {
            gravity: ICE_SHARD_GRAVITY,
            damping: ICE_SHARD_DAMPING,
            spin: Spin::PerBody,
            ..default()
        },
        seed,
        None,
        |_| specs,
    )
}

/// Textured frost quads turned toward the billboard point, swelling as they fade
pub fn spawn_frost_cloud(ctx: &mut SpawnContext<'_>) -> FxResult<RigidBodyBurst> {
    let texture = textures::frost_flake(FROST_TEXTURE_SIZE)?;
    let seed = ctx.rng.gen();
    let origin = ctx.position;
    let target = ctx.settings.billboard_target;
    let rng = &mut *ctx.rng;

    let bodies: Vec<RigidBody> = (0..FROST_CLOUD_COUNT)
        .map(|_| {
            let position = origin + symmetric_vec3(rng, FROST_CLOUD_JITTER);
            let scale = rng.gen::<f32>() * 0.5 + 0.5;
            let mut body = RigidBody::new(
                position,
                symmetric_vec3(rng, FROST_CLOUD_SPEED),
                Fade::new(FROST_CLOUD_OPACITY, FROST_CLOUD_FADE_STEP),
            );
            body.base = facing_rotation(position, target);
            body.scale = Vec3::splat(scale);
            body
        })
        .collect();

    RigidBodyBurst::spawn(
        ctx.scene,
        "frost_cloud",
        RigidBodyParams {
            scale_growth: ScaleGrowth::Uniform(FROST_CLOUD_GROWTH),
            ..default()
        },
        seed,
        Some(&texture),
        |texture_id| {
            bodies
                .into_iter()
                .map(|body| BodySpec {
                    body,
                    shape: MeshShape::Quad { width: 1.0, height: 1.0 },
                    material: MaterialDesc {
                        texture: texture_id,
                        ..MaterialDesc::unlit(Color::WHITE, FROST_CLOUD_OPACITY)
                    },
                })
                .collect()
        },
    )
}

/// Thin spikes from the centre that stretch along their own axis
pub fn spawn_frost_rays(ctx: &mut SpawnContext<'_>) -> FxResult<RigidBodyBurst> {
    let seed = ctx.rng.gen();
    let origin = ctx.position;
    let rng = &mut *ctx.rng;

    let specs = (0..FROST_RAY_COUNT)
        .map(|_| {
            let length = rng.gen::<f32>() * 1.5 + 1.0;
            let direction = random_spherical_direction(rng);
            let mut body = RigidBody::new(
                origin,
                Vec3::ZERO,
                Fade::new(FROST_RAY_OPACITY, FROST_RAY_FADE_STEP),
            );
            body.base = Quat::from_rotation_arc(Vec3::Y, direction);
            BodySpec {
                body,
                shape: MeshShape::Ray {
                    top_radius: FROST_RAY_TOP_RADIUS,
                    bottom_radius: FROST_RAY_BOTTOM_RADIUS,
                    length,
                    segments: FROST_RAY_SEGMENTS,
                },
                material: MaterialDesc::unlit(hex_color(FROST_RAY_COLOR), FROST_RAY_OPACITY),
            }
        })
        .collect::<Vec<_>>();

    RigidBodyBurst::spawn(
        ctx.scene,
        "frost_rays",
        RigidBodyParams {
            scale_growth: ScaleGrowth::AlongAxis(FROST_RAY_STRETCH),
            ..default()
        },
        seed,
        None,
        |_| specs,
    )
}
