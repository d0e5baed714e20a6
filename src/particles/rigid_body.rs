//! Discrete rigid-body burst: independent meshes, each with its own fade.
//!
//! Shared by glass shards, confetti, pixel cubes, ice shards, frost cloud,
//! frost rays and fire smoke puffs. The burst stays alive while any body is
//! still waiting to activate or still visible; spent bodies are skipped but
//! only removed together with the rest.

use bevy::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::constants::*;
use crate::error::FxResult;
use crate::math_utils::{random_euler, symmetric_vec3};
use crate::particles::{Fade, SpawnContext, StepOutcome, Subsystem};
use crate::scene::{Scene, SceneEntries};
use crate::textures::TextureImage;
use crate::types::{
    hex_color, MaterialDesc, MeshDesc, MeshShape, RenderId, RenderUpdate, Renderable, TextureId,
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Spin {
    None,
    /// Same Euler increment for every body
    Fixed(Vec3),
    /// Each body's own `spin` rate
    PerBody,
    /// Fresh random increment in `[0, max)` per axis every frame
    Jitter(f32),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScaleGrowth {
    None,
    /// Added to every axis
    Uniform(f32),
    /// Added to X and Y while X is below `cap`
    PlanarCapped { step: f32, cap: f32 },
    /// Multiplies the local Y axis
    AlongAxis(f32),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RigidBodyParams {
    pub gravity: f32,
    /// Velocity multiplier per frame; 1.0 disables damping
    pub damping: f32,
    pub spin: Spin,
    pub scale_growth: ScaleGrowth,
}

impl Default for RigidBodyParams {
    fn default() -> Self {
        Self {
            gravity: 0.0,
            damping: 1.0,
            spin: Spin::None,
            scale_growth: ScaleGrowth::None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RigidBody {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Orientation the Euler spin is applied on top of
    pub base: Quat,
    pub euler: Vec3,
    pub spin: Vec3,
    pub scale: Vec3,
    pub fade: Fade,
    /// First elapsed-frame index on which the body integrates
    pub activation_frame: u32,
}

impl RigidBody {
    pub fn new(position: Vec3, velocity: Vec3, fade: Fade) -> Self {
        Self {
            position,
            velocity,
            base: Quat::IDENTITY,
            euler: Vec3::ZERO,
            spin: Vec3::ZERO,
            scale: Vec3::ONE,
            fade,
            activation_frame: 0,
        }
    }

    pub fn rotation(&self) -> Quat {
        self.base * Quat::from_euler(EulerRot::XYZ, self.euler.x, self.euler.y, self.euler.z)
    }

    pub fn transform(&self) -> Transform {
        Transform {
            translation: self.position,
            rotation: self.rotation(),
            scale: self.scale,
        }
    }

    pub fn is_pending(&self, frame: u32) -> bool {
        frame < self.activation_frame
    }
}

/// A body plus the mesh and material it is drawn with
pub struct BodySpec {
    pub body: RigidBody,
    pub shape: MeshShape,
    pub material: MaterialDesc,
}

pub struct RigidBodyBurst {
    label: &'static str,
    bodies: Vec<RigidBody>,
    renders: Vec<RenderId>,
    params: RigidBodyParams,
    elapsed_frames: u32,
    jitter_rng: ChaCha8Rng,
    entries: SceneEntries,
    finished: bool,
}

impl RigidBodyBurst {
    /// Insert one mesh per body. When `texture` is given it is uploaded first
    /// and its id handed to `specs` so materials can reference it.
    pub fn spawn(
        scene: &mut dyn Scene,
        label: &'static str,
        params: RigidBodyParams,
        seed: u64,
        texture: Option<&TextureImage>,
        specs: impl FnOnce(Option<TextureId>) -> Vec<BodySpec>,
    ) -> FxResult<Self> {
        let (entries, (bodies, renders)) = SceneEntries::build(scene, |entries, scene| {
            let texture_id = match texture {
                Some(image) => Some(entries.create_texture(scene, image)?),
                None => None,
            };

            let specs = specs(texture_id);
            let mut bodies = Vec::with_capacity(specs.len());
            let mut renders = Vec::with_capacity(specs.len());
            for spec in specs {
                let mut material = spec.material;
                material.opacity = spec.body.fade.value();
                let render = entries.insert(
                    scene,
                    Renderable::Mesh(MeshDesc {
                        shape: spec.shape,
                        material,
                        transform: spec.body.transform(),
                    }),
                )?;
                bodies.push(spec.body);
                renders.push(render);
            }
            Ok((bodies, renders))
        })?;

        debug!("🧊 {} spawned with {} bodies", label, bodies.len());

        Ok(Self {
            label,
            bodies,
            renders,
            params,
            elapsed_frames: 0,
            jitter_rng: ChaCha8Rng::seed_from_u64(seed),
            entries,
            finished: false,
        })
    }

    /// Effect 6: flat triangles tumbling on two axes
    pub fn glass_shards(ctx: &mut SpawnContext<'_>) -> FxResult<Self> {
        let seed = ctx.rng.gen();
        let rng = &mut *ctx.rng;
        let origin = ctx.position;
        let mut specs = Vec::with_capacity(GLASS_SHARD_COUNT);
        for _ in 0..GLASS_SHARD_COUNT {
            let size = rng.gen::<f32>() * 0.2 + 0.05;
            let mut body = RigidBody::new(
                origin,
                symmetric_vec3(rng, GLASS_SPEED),
                Fade::new(GLASS_OPACITY, GLASS_FADE_STEP),
            );
            body.euler = random_euler(rng);
            specs.push(BodySpec {
                body,
                shape: MeshShape::Triangle { size },
                material: MaterialDesc::unlit(hex_color(GLASS_COLOR), GLASS_OPACITY),
            });
        }

        Self::spawn(
            ctx.scene,
            "glass_shards",
            RigidBodyParams {
                gravity: GLASS_GRAVITY,
                spin: Spin::Fixed(Vec3::from_array(GLASS_SPIN)),
                ..default()
            },
            seed,
            None,
            |_| specs,
        )
    }

    /// Effect 7: paper squares in nine colours, spinning erratically
    pub fn confetti(ctx: &mut SpawnContext<'_>) -> FxResult<Self> {
        let seed = ctx.rng.gen();
        let rng = &mut *ctx.rng;
        let origin = ctx.position;
        let mut specs = Vec::with_capacity(CONFETTI_COUNT);
        for _ in 0..CONFETTI_COUNT {
            let color = CONFETTI_PALETTE[rng.gen_range(0..CONFETTI_PALETTE.len())];
            let mut body = RigidBody::new(
                origin,
                symmetric_vec3(rng, CONFETTI_SPEED),
                Fade::new(1.0, CONFETTI_FADE_STEP),
            );
            body.euler = random_euler(rng);
            specs.push(BodySpec {
                body,
                shape: MeshShape::Quad { width: CONFETTI_SIZE, height: CONFETTI_SIZE },
                material: MaterialDesc::unlit(hex_color(color), 1.0),
            });
        }

        Self::spawn(
            ctx.scene,
            "confetti",
            RigidBodyParams {
                gravity: CONFETTI_GRAVITY,
                spin: Spin::Jitter(CONFETTI_SPIN_JITTER),
                ..default()
            },
            seed,
            None,
            |_| specs,
        )
    }

    /// Effect 8: tiny randomly coloured cubes
    pub fn pixel_cubes(ctx: &mut SpawnContext<'_>) -> FxResult<Self> {
        let seed = ctx.rng.gen();
        let rng = &mut *ctx.rng;
        let origin = ctx.position;
        let mut specs = Vec::with_capacity(PIXEL_CUBE_COUNT);
        for _ in 0..PIXEL_CUBE_COUNT {
            let color = Color::srgb(rng.gen(), rng.gen(), rng.gen());
            specs.push(BodySpec {
                body: RigidBody::new(
                    origin,
                    symmetric_vec3(rng, PIXEL_SPEED),
                    Fade::new(1.0, PIXEL_FADE_STEP),
                ),
                shape: MeshShape::Cube { size: PIXEL_CUBE_SIZE },
                material: MaterialDesc::unlit(color, 1.0),
            });
        }

        Self::spawn(
            ctx.scene,
            "pixel_cubes",
            RigidBodyParams {
                gravity: PIXEL_GRAVITY,
                spin: Spin::Fixed(Vec3::splat(PIXEL_SPIN)),
                ..default()
            },
            seed,
            None,
            |_| specs,
        )
    }

    pub fn bodies(&self) -> &[RigidBody] {
        &self.bodies
    }
}

impl Subsystem for RigidBodyBurst {
    fn label(&self) -> &'static str {
        self.label
    }

    fn advance(&mut self) -> StepOutcome {
        if self.finished {
            return StepOutcome::Done;
        }

        let frame = self.elapsed_frames;
        self.elapsed_frames += 1;
        let params = self.params;
        let mut alive = false;

        for body in &mut self.bodies {
            if body.is_pending(frame) {
                alive = true;
                continue;
            }
            if body.fade.is_spent() {
                continue;
            }

            body.position += body.velocity;
            body.velocity.y -= params.gravity;
            body.velocity *= params.damping;

            match params.spin {
                Spin::None => {}
                Spin::Fixed(rate) => body.euler += rate,
                Spin::PerBody => body.euler += body.spin,
                Spin::Jitter(max) => {
                    let rng = &mut self.jitter_rng;
                    body.euler += Vec3::new(
                        rng.gen::<f32>() * max,
                        rng.gen::<f32>() * max,
                        rng.gen::<f32>() * max,
                    );
                }
            }

            match params.scale_growth {
                ScaleGrowth::None => {}
                ScaleGrowth::Uniform(step) => body.scale += Vec3::splat(step),
                ScaleGrowth::PlanarCapped { step, cap } => {
                    if body.scale.x < cap {
                        body.scale.x += step;
                        body.scale.y += step;
                    }
                }
                ScaleGrowth::AlongAxis(factor) => body.scale.y *= factor,
            }

            body.fade.advance();
            if !body.fade.is_spent() {
                alive = true;
            }
        }

        if alive {
            StepOutcome::Continue
        } else {
            self.finished = true;
            StepOutcome::Done
        }
    }

    fn sync(&self, scene: &mut dyn Scene) {
        // The frame just advanced is elapsed_frames - 1
        let frame = self.elapsed_frames.saturating_sub(1);
        for (body, render) in self.bodies.iter().zip(&self.renders) {
            if body.is_pending(frame) {
                continue;
            }
            scene.update(
                *render,
                RenderUpdate::Mesh {
                    transform: body.transform(),
                    opacity: body.fade.value(),
                },
            );
        }
    }

    fn release(&mut self, scene: &mut dyn Scene) {
        self.finished = true;
        self.entries.release(scene);
    }

    fn live_elements(&self) -> usize {
        if self.finished {
            return 0;
        }
        let frame = self.elapsed_frames;
        self.bodies
            .iter()
            .filter(|body| body.is_pending(frame) || !body.fade.is_spent())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{spawn_ctx, CountingScene};
    use rand_chacha::ChaCha8Rng;

    fn single_body_burst(
        scene: &mut CountingScene,
        body: RigidBody,
        params: RigidBodyParams,
    ) -> RigidBodyBurst {
        RigidBodyBurst::spawn(scene, "test_bodies", params, 1, None, |_| {
            vec![BodySpec {
                body,
                shape: MeshShape::Cube { size: 0.1 },
                material: MaterialDesc::unlit(Color::WHITE, 1.0),
            }]
        })
        .unwrap()
    }

    #[test]
    fn last_body_fading_ends_the_burst_on_that_frame() {
        let mut scene = CountingScene::default();
        let params = RigidBodyParams::default();
        let mut burst = RigidBodyBurst::spawn(&mut scene, "pair", params, 1, None, |_| {
            vec![
                BodySpec {
                    body: RigidBody::new(Vec3::ZERO, Vec3::X, Fade::new(1.0, 0.1)),
                    shape: MeshShape::Cube { size: 0.1 },
                    material: MaterialDesc::unlit(Color::WHITE, 1.0),
                },
                BodySpec {
                    body: RigidBody::new(Vec3::ZERO, Vec3::Y, Fade::new(1.0, 0.05)),
                    shape: MeshShape::Cube { size: 0.1 },
                    material: MaterialDesc::unlit(Color::WHITE, 1.0),
                },
            ]
        })
        .unwrap();

        for _ in 0..10 {
            assert_eq!(burst.advance(), StepOutcome::Continue);
        }
        // First body is spent and frozen, second keeps moving
        assert_eq!(burst.live_elements(), 1);
        let frozen = burst.bodies()[0].position;
        for _ in 10..19 {
            assert_eq!(burst.advance(), StepOutcome::Continue);
        }
        assert_eq!(burst.bodies()[0].position, frozen);
        assert_eq!(burst.advance(), StepOutcome::Done);
        assert_eq!(burst.live_elements(), 0);
    }

    #[test]
    fn damping_applies_after_gravity() {
        let mut scene = CountingScene::default();
        let params = RigidBodyParams { gravity: 0.002, damping: 0.99, ..default() };
        let mut burst = single_body_burst(
            &mut scene,
            RigidBody::new(Vec3::ZERO, Vec3::new(0.1, 0.1, 0.0), Fade::new(1.0, 0.005)),
            params,
        );
        burst.advance();
        let body = burst.bodies()[0];
        assert!((body.position - Vec3::new(0.1, 0.1, 0.0)).length() < 1e-6);
        assert!((body.velocity.y - (0.1 - 0.002) * 0.99).abs() < 1e-6);
        assert!((body.velocity.x - 0.1 * 0.99).abs() < 1e-6);
    }

    #[test]
    fn pending_body_is_inert_until_its_frame() {
        let mut scene = CountingScene::default();
        let mut body = RigidBody::new(Vec3::ZERO, Vec3::Y, Fade::new(0.3, 0.1));
        body.activation_frame = 4;
        let mut burst = single_body_burst(&mut scene, body, RigidBodyParams::default());

        for _ in 0..4 {
            assert_eq!(burst.advance(), StepOutcome::Continue);
            assert_eq!(burst.bodies()[0].position, Vec3::ZERO);
            assert!((burst.bodies()[0].fade.value() - 0.3).abs() < 1e-6);
        }
        burst.advance();
        assert_eq!(burst.bodies()[0].position, Vec3::Y);
        burst.advance();
        assert_eq!(burst.advance(), StepOutcome::Done);
    }

    #[test]
    fn scale_growth_modes() {
        let mut scene = CountingScene::default();
        let body = RigidBody::new(Vec3::ZERO, Vec3::ZERO, Fade::new(1.0, 0.01));

        let mut planar = single_body_burst(
            &mut scene,
            RigidBody { scale: Vec3::splat(1.48), ..body },
            RigidBodyParams {
                scale_growth: ScaleGrowth::PlanarCapped { step: 0.02, cap: 1.5 },
                ..default()
            },
        );
        planar.advance();
        planar.advance();
        let scale = planar.bodies()[0].scale;
        assert!((scale.x - 1.5).abs() < 1e-5, "growth stops once the cap is reached");
        assert!((scale.z - 1.48).abs() < 1e-6);

        let mut stretched = single_body_burst(
            &mut scene,
            body,
            RigidBodyParams { scale_growth: ScaleGrowth::AlongAxis(1.03), ..default() },
        );
        stretched.advance();
        assert_eq!(stretched.bodies()[0].scale, Vec3::new(1.0, 1.03, 1.0));
    }

    #[test]
    fn simple_bursts_use_their_tuning() {
        let mut scene = CountingScene::default();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut ctx = spawn_ctx(&mut scene, &mut rng, Vec3::ZERO);

        let glass = RigidBodyBurst::glass_shards(&mut ctx).unwrap();
        assert_eq!(glass.bodies().len(), GLASS_SHARD_COUNT);
        assert_eq!(glass.bodies()[0].fade.lifetime_frames(), 70);

        let confetti = RigidBodyBurst::confetti(&mut ctx).unwrap();
        assert_eq!(confetti.bodies().len(), CONFETTI_COUNT);

        let cubes = RigidBodyBurst::pixel_cubes(&mut ctx).unwrap();
        assert_eq!(cubes.bodies().len(), PIXEL_CUBE_COUNT);

        assert_eq!(scene.inserts, GLASS_SHARD_COUNT + CONFETTI_COUNT + PIXEL_CUBE_COUNT);
    }

    #[test]
    fn confetti_spin_is_reproducible_per_seed() {
        let run = || {
            let mut scene = CountingScene::default();
            let mut rng = ChaCha8Rng::seed_from_u64(99);
            let mut ctx = spawn_ctx(&mut scene, &mut rng, Vec3::ZERO);
            let mut confetti = RigidBodyBurst::confetti(&mut ctx).unwrap();
            for _ in 0..5 {
                confetti.advance();
            }
            confetti.bodies()[7].euler
        };
        assert_eq!(run(), run());
    }
}
