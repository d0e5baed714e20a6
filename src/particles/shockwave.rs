// Expanding ring: one flat annulus that grows geometrically and fades linearly
use bevy::prelude::*;

use crate::constants::*;
use crate::error::FxResult;
use crate::math_utils::facing_rotation;
use crate::particles::{Fade, SpawnContext, StepOutcome, Subsystem};
use crate::scene::{Scene, SceneEntries};
use crate::types::{
    hex_color, MaterialDesc, MeshDesc, MeshShape, RenderId, RenderUpdate, Renderable,
};

pub struct Shockwave {
    position: Vec3,
    /// Fixed at spawn; the ring is not re-oriented as it grows
    rotation: Quat,
    scale: f32,
    growth: f32,
    fade: Fade,
    render: RenderId,
    entries: SceneEntries,
    finished: bool,
}

impl Shockwave {
    /// Effect 5
    pub fn spawn(ctx: &mut SpawnContext<'_>) -> FxResult<Self> {
        let position = ctx.position;
        let rotation = facing_rotation(position, ctx.settings.billboard_target);
        let scale = SHOCKWAVE_START_SCALE;
        let fade = Fade::new(1.0, SHOCKWAVE_FADE_STEP);

        let (entries, render) = SceneEntries::build(ctx.scene, |entries, scene| {
            entries.insert(
                scene,
                Renderable::Mesh(MeshDesc {
                    shape: MeshShape::Ring {
                        inner: SHOCKWAVE_INNER_RADIUS,
                        outer: SHOCKWAVE_OUTER_RADIUS,
                        segments: SHOCKWAVE_SEGMENTS,
                    },
                    material: MaterialDesc::unlit(hex_color(SHOCKWAVE_COLOR), fade.value()),
                    transform: Transform {
                        translation: position,
                        rotation,
                        scale: Vec3::splat(scale),
                    },
                }),
            )
        })?;

        Ok(Self {
            position,
            rotation,
            scale,
            growth: SHOCKWAVE_GROWTH,
            fade,
            render,
            entries,
            finished: false,
        })
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn opacity(&self) -> f32 {
        self.fade.value()
    }

    pub fn rotation(&self) -> Quat {
        self.rotation
    }
}

impl Subsystem for Shockwave {
    fn label(&self) -> &'static str {
        "shockwave"
    }

    fn advance(&mut self) -> StepOutcome {
        if self.finished {
            return StepOutcome::Done;
        }
        self.scale *= self.growth;
        self.fade.advance();
        if self.fade.is_spent() {
            self.finished = true;
            StepOutcome::Done
        } else {
            StepOutcome::Continue
        }
    }

    fn sync(&self, scene: &mut dyn Scene) {
        scene.update(
            self.render,
            RenderUpdate::Mesh {
                transform: Transform {
                    translation: self.position,
                    rotation: self.rotation,
                    scale: Vec3::splat(self.scale),
                },
                opacity: self.fade.value(),
            },
        );
    }

    fn release(&mut self, scene: &mut dyn Scene) {
        self.finished = true;
        self.entries.release(scene);
    }

    fn live_elements(&self) -> usize {
        usize::from(!self.finished)
    }
}
