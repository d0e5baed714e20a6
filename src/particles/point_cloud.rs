//! Point-cloud burst: many points sharing one material and one fade.
//!
//! Points either integrate a constant velocity (with optional gravity) or
//! are placed each frame on an outward spiral around the spawn point.
//! Used by the basic burst, smoke, spiral and fire embers.

use bevy::prelude::*;
use rand::Rng;
use std::f32::consts::TAU;

use crate::constants::*;
use crate::error::FxResult;
use crate::math_utils::{symmetric, symmetric_vec3};
use crate::particles::{Fade, SpawnContext, StepOutcome, Subsystem};
use crate::scene::{Scene, SceneEntries};
use crate::types::{hex_color, Blend, PointCloudDesc, RenderId, RenderUpdate, Renderable};

/// Per-point spiral parameters; positions are recomputed, not integrated
#[derive(Clone, Debug, PartialEq)]
pub struct SpiralMotion {
    pub center: Vec3,
    pub angles: Vec<f32>,
    pub radii: Vec<f32>,
    pub heights: Vec<f32>,
    pub speeds: Vec<f32>,
    pub radius_growth: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Motion {
    Integrated { velocities: Vec<Vec3>, gravity: f32 },
    Spiral(SpiralMotion),
}

pub struct PointCloudParams {
    pub label: &'static str,
    pub positions: Vec<Vec3>,
    pub colors: Option<Vec<Color>>,
    pub color: Color,
    pub size: f32,
    /// Per-point sizes; the rendered size is their maximum
    pub sizes: Option<Vec<f32>>,
    pub size_growth: f32,
    pub opacity: f32,
    pub fade_step: f32,
    pub blend: Blend,
    pub motion: Motion,
    /// Points at or below this height count as out of view
    pub visibility_floor: Option<f32>,
}

pub struct PointCloudBurst {
    label: &'static str,
    positions: Vec<Vec3>,
    motion: Motion,
    size: f32,
    sizes: Option<Vec<f32>>,
    size_growth: f32,
    fade: Fade,
    visibility_floor: Option<f32>,
    render: RenderId,
    entries: SceneEntries,
    finished: bool,
}

impl PointCloudBurst {
    pub fn spawn(scene: &mut dyn Scene, params: PointCloudParams) -> FxResult<Self> {
        let fade = Fade::new(params.opacity, params.fade_step);
        let size = params
            .sizes
            .as_ref()
            .map(|sizes| max_size(sizes))
            .unwrap_or(params.size);

        let desc = PointCloudDesc {
            positions: params.positions.clone(),
            colors: params.colors,
            color: params.color,
            size,
            opacity: fade.value(),
            blend: params.blend,
        };
        let (entries, render) = SceneEntries::build(scene, |entries, scene| {
            entries.insert(scene, Renderable::Points(desc))
        })?;

        debug!("✨ {} spawned with {} points", params.label, params.positions.len());

        Ok(Self {
            label: params.label,
            positions: params.positions,
            motion: params.motion,
            size,
            sizes: params.sizes,
            size_growth: params.size_growth,
            fade,
            visibility_floor: params.visibility_floor,
            render,
            entries,
            finished: false,
        })
    }

    /// Effect 1: orange-red points flung in every direction, pulled down by gravity
    pub fn basic_burst(ctx: &mut SpawnContext<'_>) -> FxResult<Self> {
        let rng = &mut *ctx.rng;
        let count = BASIC_PARTICLE_COUNT;
        let colors = (0..count)
            .map(|_| Color::srgb(rng.gen::<f32>() * 0.5 + 0.5, rng.gen::<f32>() * 0.5, 0.0))
            .collect();
        let velocities = (0..count).map(|_| symmetric_vec3(rng, BASIC_SPEED)).collect();

        Self::spawn(
            ctx.scene,
            PointCloudParams {
                label: "basic_burst",
                positions: vec![ctx.position; count],
                colors: Some(colors),
                color: Color::WHITE,
                size: BASIC_POINT_SIZE,
                sizes: None,
                size_growth: 1.0,
                opacity: 1.0,
                fade_step: BASIC_FADE_STEP,
                blend: Blend::Alpha,
                motion: Motion::Integrated { velocities, gravity: BASIC_GRAVITY },
                visibility_floor: None,
            },
        )
    }

    /// Effect 4: slow grey cloud drifting upward while its points swell
    pub fn smoke_cloud(ctx: &mut SpawnContext<'_>) -> FxResult<Self> {
        let rng = &mut *ctx.rng;
        let count = SMOKE_PARTICLE_COUNT;
        let mut positions = Vec::with_capacity(count);
        let mut velocities = Vec::with_capacity(count);
        let mut sizes = Vec::with_capacity(count);
        for _ in 0..count {
            positions.push(ctx.position + symmetric_vec3(rng, SMOKE_SPAWN_JITTER));
            velocities.push(Vec3::new(
                symmetric(rng, SMOKE_DRIFT),
                rng.gen::<f32>() * SMOKE_RISE_MAX,
                symmetric(rng, SMOKE_DRIFT),
            ));
            sizes.push(rng.gen::<f32>() * 0.2 + 0.1);
        }

        Self::spawn(
            ctx.scene,
            PointCloudParams {
                label: "smoke_cloud",
                positions,
                colors: None,
                color: hex_color(SMOKE_COLOR),
                size: 0.2,
                sizes: Some(sizes),
                size_growth: SMOKE_SIZE_GROWTH,
                opacity: SMOKE_OPACITY,
                fade_step: SMOKE_FADE_STEP,
                blend: Blend::Alpha,
                motion: Motion::Integrated { velocities, gravity: 0.0 },
                visibility_floor: None,
            },
        )
    }

    /// Effect 9: magenta points unwinding outward on individual spirals
    pub fn spiral(ctx: &mut SpawnContext<'_>) -> FxResult<Self> {
        let rng = &mut *ctx.rng;
        let count = SPIRAL_PARTICLE_COUNT;
        let motion = SpiralMotion {
            center: ctx.position,
            angles: (0..count).map(|_| rng.gen::<f32>() * TAU).collect(),
            radii: vec![SPIRAL_START_RADIUS; count],
            heights: (0..count).map(|_| symmetric(rng, SPIRAL_HEIGHT_FACTOR)).collect(),
            speeds: (0..count)
                .map(|_| rng.gen_range(SPIRAL_SPEED_MIN..SPIRAL_SPEED_MAX))
                .collect(),
            radius_growth: SPIRAL_RADIUS_GROWTH,
        };

        Self::spawn(
            ctx.scene,
            PointCloudParams {
                label: "spiral",
                positions: vec![ctx.position; count],
                colors: None,
                color: hex_color(SPIRAL_COLOR),
                size: SPIRAL_POINT_SIZE,
                sizes: None,
                size_growth: 1.0,
                opacity: 1.0,
                fade_step: SPIRAL_FADE_STEP,
                blend: Blend::Alpha,
                motion: Motion::Spiral(motion),
                visibility_floor: None,
            },
        )
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn opacity(&self) -> f32 {
        self.fade.value()
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn motion(&self) -> &Motion {
        &self.motion
    }

    pub fn fade(&self) -> &Fade {
        &self.fade
    }

    fn all_out_of_view(&self) -> bool {
        match self.visibility_floor {
            Some(floor) => self.positions.iter().all(|p| p.y <= floor),
            None => false,
        }
    }
}

fn max_size(sizes: &[f32]) -> f32 {
    sizes.iter().copied().fold(0.0, f32::max)
}

impl Subsystem for PointCloudBurst {
    fn label(&self) -> &'static str {
        self.label
    }

    fn advance(&mut self) -> StepOutcome {
        if self.finished {
            return StepOutcome::Done;
        }

        match &mut self.motion {
            Motion::Integrated { velocities, gravity } => {
                for (position, velocity) in self.positions.iter_mut().zip(velocities.iter_mut()) {
                    *position += *velocity;
                    velocity.y -= *gravity;
                }
            }
            Motion::Spiral(spiral) => {
                for (i, position) in self.positions.iter_mut().enumerate() {
                    spiral.angles[i] += spiral.speeds[i];
                    spiral.radii[i] += spiral.radius_growth;
                    let (angle, radius) = (spiral.angles[i], spiral.radii[i]);
                    let offset = Vec3::new(
                        angle.cos() * radius,
                        spiral.heights[i] * radius,
                        angle.sin() * radius,
                    );
                    *position = spiral.center + offset;
                }
            }
        }

        if let Some(sizes) = &mut self.sizes {
            for size in sizes.iter_mut() {
                *size *= self.size_growth;
            }
            self.size = max_size(sizes);
        }

        self.fade.advance();
        if self.fade.is_spent() || self.all_out_of_view() {
            self.finished = true;
            return StepOutcome::Done;
        }
        StepOutcome::Continue
    }

    fn sync(&self, scene: &mut dyn Scene) {
        scene.update(
            self.render,
            RenderUpdate::Points {
                positions: &self.positions,
                size: self.size,
                opacity: self.fade.value(),
            },
        );
    }

    fn release(&mut self, scene: &mut dyn Scene) {
        self.finished = true;
        self.entries.release(scene);
    }

    fn live_elements(&self) -> usize {
        if self.finished {
            0
        } else {
            self.positions.len()
        }
    }
}
