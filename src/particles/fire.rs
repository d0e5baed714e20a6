//! Fire explosion (effect 2): fire core, embers, smoke puffs and a light flash.
//!
//! The four layers are spawned together but live and die independently; the
//! effect itself keeps no joint state.

use bevy::prelude::*;
use rand::Rng;
use std::f32::consts::TAU;

use crate::constants::*;
use crate::error::FxResult;
use crate::math_utils::{symmetric, symmetric_vec3, weighted_index};
use crate::particles::point_cloud::{Motion, PointCloudParams};
use crate::particles::rigid_body::{BodySpec, RigidBody, RigidBodyParams, ScaleGrowth, Spin};
use crate::particles::{
    spawn_child, Fade, LightFlash, PointCloudBurst, RigidBodyBurst, SpawnContext, SpawnOutcome,
    StepOutcome, Subsystem,
};
use crate::scene::{Scene, SceneEntries};
use crate::textures;
use crate::types::{
    hex_color, Blend, MaterialDesc, MeshShape, RenderId, RenderUpdate, Renderable, Sprite,
    SpriteBatchDesc,
};

/// Spawn every layer of the fire explosion
pub fn spawn_fire_effect(ctx: &mut SpawnContext<'_>) -> Vec<SpawnOutcome> {
    vec![
        spawn_child(ctx, "fire_core", FireCore::spawn),
        spawn_child(ctx, "embers", spawn_embers),
        spawn_child(ctx, "smoke_puffs", spawn_smoke_puffs),
        spawn_child(ctx, "fire_flash", LightFlash::fire),
    ]
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FireParticle {
    pub position: Vec3,
    pub velocity: Vec3,
    pub scale: f32,
    pub rotation: f32,
    pub color_index: u8,
    pub lifetime: Fade,
}

/// Instanced billboard flames with per-particle lifetime
pub struct FireCore {
    particles: Vec<FireParticle>,
    time: f32,
    render: RenderId,
    entries: SceneEntries,
    finished: bool,
}

impl FireCore {
    pub fn spawn(ctx: &mut SpawnContext<'_>) -> FxResult<Self> {
        let texture = textures::fire_sprite(FIRE_TEXTURE_SIZE)?;

        let origin = ctx.position;
        let rng = &mut *ctx.rng;
        let particles: Vec<FireParticle> = (0..FIRE_PARTICLE_COUNT)
            .map(|_| FireParticle {
                position: origin + symmetric_vec3(rng, FIRE_SPAWN_JITTER),
                velocity: Vec3::new(
                    symmetric(rng, 0.025),
                    rng.gen::<f32>() * 0.1 + 0.05,
                    symmetric(rng, 0.025),
                ),
                scale: rng.gen::<f32>() * 0.5 + 0.1,
                rotation: rng.gen::<f32>() * TAU,
                color_index: weighted_index(rng, &FIRE_PALETTE_WEIGHTS) as u8,
                lifetime: Fade::new(rng.gen::<f32>() * 0.5 + 0.5, FIRE_LIFETIME_STEP),
            })
            .collect();

        let sprites = particles.iter().map(FireParticle::sprite).collect();
        let (entries, render) = SceneEntries::build(ctx.scene, |entries, scene| {
            let texture_id = entries.create_texture(scene, &texture)?;
            entries.insert(
                scene,
                Renderable::Sprites(SpriteBatchDesc {
                    quad_size: FIRE_QUAD_SIZE,
                    sprites,
                    palette: FIRE_PALETTE.iter().map(|hex| hex_color(*hex)).collect(),
                    texture: Some(texture_id),
                    blend: Blend::Additive,
                }),
            )
        })?;

        debug!("🔥 fire_core spawned with {} particles", particles.len());

        Ok(Self {
            particles,
            time: 0.0,
            render,
            entries,
            finished: false,
        })
    }

    pub fn particles(&self) -> &[FireParticle] {
        &self.particles
    }
}

impl FireParticle {
    fn sprite(&self) -> Sprite {
        Sprite {
            position: self.position,
            scale: self.scale,
            rotation: self.rotation,
            color_index: self.color_index,
            alpha: self.lifetime.value(),
        }
    }
}

impl Subsystem for FireCore {
    fn label(&self) -> &'static str {
        "fire_core"
    }

    fn advance(&mut self) -> StepOutcome {
        if self.finished {
            return StepOutcome::Done;
        }

        self.time += FIRE_TIME_STEP;
        let mut all_dead = true;
        for (i, particle) in self.particles.iter_mut().enumerate() {
            particle.position += particle.velocity;

            let phase = self.time * FIRE_TURBULENCE_FREQUENCY + i as f32;
            particle.position.x += phase.sin() * FIRE_TURBULENCE_AMPLITUDE;
            particle.position.z += phase.cos() * FIRE_TURBULENCE_AMPLITUDE;

            particle.lifetime.advance();
            particle.scale *= FIRE_SCALE_GROWTH;

            if !particle.lifetime.is_spent() {
                all_dead = false;
            }
        }

        if all_dead {
            self.finished = true;
            StepOutcome::Done
        } else {
            StepOutcome::Continue
        }
    }

    fn sync(&self, scene: &mut dyn Scene) {
        let sprites: Vec<Sprite> = self.particles.iter().map(FireParticle::sprite).collect();
        scene.update(self.render, RenderUpdate::Sprites(&sprites));
    }

    fn release(&mut self, scene: &mut dyn Scene) {
        self.finished = true;
        self.entries.release(scene);
    }

    fn live_elements(&self) -> usize {
        if self.finished {
            return 0;
        }
        self.particles.iter().filter(|p| !p.lifetime.is_spent()).count()
    }
}

/// Glowing sparks thrown upward; gone once faded or fallen out of view
pub fn spawn_embers(ctx: &mut SpawnContext<'_>) -> FxResult<PointCloudBurst> {
    let rng = &mut *ctx.rng;
    let mut positions = Vec::with_capacity(EMBER_COUNT);
    let mut velocities = Vec::with_capacity(EMBER_COUNT);
    for _ in 0..EMBER_COUNT {
        positions.push(ctx.position + symmetric_vec3(rng, EMBER_SPAWN_JITTER));
        velocities.push(Vec3::new(
            symmetric(rng, 0.1),
            rng.gen::<f32>() * 0.2 + 0.05,
            symmetric(rng, 0.1),
        ));
    }

    PointCloudBurst::spawn(
        ctx.scene,
        PointCloudParams {
            label: "embers",
            positions,
            colors: None,
            color: hex_color(EMBER_COLOR),
            size: EMBER_POINT_SIZE,
            sizes: None,
            size_growth: 1.0,
            opacity: 1.0,
            fade_step: EMBER_FADE_STEP,
            blend: Blend::Additive,
            motion: Motion::Integrated { velocities, gravity: EMBER_GRAVITY },
            visibility_floor: Some(ctx.position.y - EMBER_VISIBILITY_DEPTH),
        },
    )
}

/// Staggered smoke puffs; puff `i` activates after `i * delay` frames
pub fn spawn_smoke_puffs(ctx: &mut SpawnContext<'_>) -> FxResult<RigidBodyBurst> {
    let texture = textures::smoke_puff(SMOKE_TEXTURE_SIZE, ctx.rng.gen())?;
    let seed = ctx.rng.gen();
    let delay = ctx.settings.smoke_puff_delay_frames;
    let origin = ctx.position;

    let rng = &mut *ctx.rng;
    let bodies: Vec<RigidBody> = (0..SMOKE_PUFF_COUNT)
        .map(|i| {
            let mut body = RigidBody::new(
                origin + symmetric_vec3(rng, SMOKE_PUFF_JITTER),
                Vec3::new(
                    symmetric(rng, 0.01),
                    rng.gen::<f32>() * 0.04 + 0.02,
                    symmetric(rng, 0.01),
                ),
                Fade::new(rng.gen::<f32>() * 0.2 + 0.2, SMOKE_PUFF_FADE_STEP),
            );
            body.euler.z = rng.gen::<f32>() * TAU;
            body.scale = Vec3::splat(SMOKE_PUFF_START_SCALE);
            body.activation_frame = (i as u32).saturating_mul(delay);
            body
        })
        .collect();

    RigidBodyBurst::spawn(
        ctx.scene,
        "smoke_puffs",
        RigidBodyParams {
            spin: Spin::Fixed(Vec3::new(0.0, 0.0, SMOKE_PUFF_SPIN)),
            scale_growth: ScaleGrowth::PlanarCapped {
                step: SMOKE_PUFF_SCALE_STEP,
                cap: SMOKE_PUFF_SCALE_CAP,
            },
            ..default()
        },
        seed,
        Some(&texture),
        |texture_id| {
            bodies
                .into_iter()
                .map(|body| BodySpec {
                    body,
                    shape: MeshShape::Quad { width: SMOKE_PUFF_SIZE, height: SMOKE_PUFF_SIZE },
                    material: MaterialDesc {
                        texture: texture_id,
                        ..MaterialDesc::unlit(Color::WHITE, body.fade.value())
                    },
                })
                .collect()
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{spawn_ctx, CountingScene};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn fire_core_dies_when_every_lifetime_is_spent() {
        let mut scene = CountingScene::default();
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        let mut ctx = spawn_ctx(&mut scene, &mut rng, Vec3::ZERO);
        let mut core = FireCore::spawn(&mut ctx).unwrap();

        let longest = core
            .particles()
            .iter()
            .map(|p| p.lifetime.lifetime_frames())
            .max()
            .unwrap();
        assert!(longest <= 100);

        for _ in 1..longest {
            assert_eq!(core.advance(), StepOutcome::Continue);
        }
        assert_eq!(core.advance(), StepOutcome::Done);
        assert_eq!(core.live_elements(), 0);
    }

    #[test]
    fn fire_core_rises_and_expands() {
        let mut scene = CountingScene::default();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut ctx = spawn_ctx(&mut scene, &mut rng, Vec3::ZERO);
        let mut core = FireCore::spawn(&mut ctx).unwrap();
        let before: Vec<FireParticle> = core.particles().to_vec();

        core.advance();
        for (old, new) in before.iter().zip(core.particles()) {
            assert!(new.position.y > old.position.y);
            assert!((new.scale - old.scale * FIRE_SCALE_GROWTH).abs() < 1e-6);
            assert!((old.lifetime.value() - new.lifetime.value() - FIRE_LIFETIME_STEP).abs() < 1e-5);
        }
    }

    #[test]
    fn fire_core_owns_its_texture() {
        let mut scene = CountingScene::default();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut ctx = spawn_ctx(&mut scene, &mut rng, Vec3::ZERO);
        let mut core = FireCore::spawn(&mut ctx).unwrap();
        assert_eq!(scene.textures_created, 1);
        assert_eq!(scene.live_resources(), 2);
        core.release(&mut scene);
        assert_eq!(scene.live_resources(), 0);
    }

    #[test]
    fn embers_watch_a_band_below_the_spawn_height() {
        let mut scene = CountingScene::default();
        let mut rng = ChaCha8Rng::seed_from_u64(12);
        let mut ctx = spawn_ctx(&mut scene, &mut rng, Vec3::new(0.0, 10.0, 0.0));
        let mut embers = spawn_embers(&mut ctx).unwrap();
        let mut frames = 0;
        while embers.advance() == StepOutcome::Continue {
            frames += 1;
        }
        // Falls out of view (below y = 7) well before the 200-frame fade
        assert!(frames < 199);
        assert!(embers.positions().iter().all(|p| p.y <= 7.0));
    }

    #[test]
    fn smoke_puff_stays_inert_until_its_delay() {
        let mut scene = CountingScene::default();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut ctx = spawn_ctx(&mut scene, &mut rng, Vec3::ZERO);
        let delay = ctx.settings.smoke_puff_delay_frames;
        let mut puffs = spawn_smoke_puffs(&mut ctx).unwrap();

        let index = 10;
        let activation = index as u32 * delay;
        let start = puffs.bodies()[index];
        assert_eq!(start.activation_frame, activation);

        for _ in 0..activation {
            assert_eq!(puffs.advance(), StepOutcome::Continue);
            let body = puffs.bodies()[index];
            assert_eq!(body.position, start.position);
            assert_eq!(body.fade.value(), start.fade.value());
            assert_eq!(body.scale, start.scale);
        }

        puffs.advance();
        let body = puffs.bodies()[index];
        assert_eq!(body.position, start.position + start.velocity);
        assert!(body.fade.value() < start.fade.value());
    }

    #[test]
    fn smoke_puffs_outlive_their_last_activation() {
        let mut scene = CountingScene::default();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut ctx = spawn_ctx(&mut scene, &mut rng, Vec3::ZERO);
        let mut puffs = spawn_smoke_puffs(&mut ctx).unwrap();
        let last = puffs.bodies().last().copied().unwrap();

        let mut frames = 0u32;
        while puffs.advance() == StepOutcome::Continue {
            frames += 1;
            assert!(puffs.live_elements() > 0);
        }
        assert!(frames + 1 >= last.activation_frame + last.fade.lifetime_frames());
    }

    #[test]
    fn huge_puff_delay_saturates_instead_of_overflowing() {
        use crate::explosion_system::FxSettings;

        let settings = FxSettings {
            smoke_puff_delay_frames: 1 << 31,
            ..default()
        };
        let mut scene = CountingScene::default();
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let mut ctx = SpawnContext {
            position: Vec3::ZERO,
            settings: &settings,
            rng: &mut rng,
            scene: &mut scene,
        };
        let puffs = spawn_smoke_puffs(&mut ctx).unwrap();

        let frames: Vec<u32> = puffs.bodies().iter().map(|b| b.activation_frame).collect();
        assert_eq!(frames[0], 0);
        assert_eq!(frames[1], 1 << 31);
        assert!(frames[2..].iter().all(|&f| f == u32::MAX));
    }
}
