// Short point-light flash that decays geometrically; no geometry to dispose
use bevy::prelude::*;

use crate::constants::*;
use crate::error::FxResult;
use crate::particles::{SpawnContext, StepOutcome, Subsystem};
use crate::scene::{Scene, SceneEntries};
use crate::types::{hex_color, LightDesc, RenderId, RenderUpdate, Renderable};

pub struct LightFlash {
    label: &'static str,
    intensity: f32,
    render: RenderId,
    entries: SceneEntries,
    finished: bool,
}

impl LightFlash {
    pub fn spawn(ctx: &mut SpawnContext<'_>, label: &'static str, color: u32) -> FxResult<Self> {
        let desc = LightDesc {
            color: hex_color(color),
            intensity: FLASH_INTENSITY,
            range: FLASH_RANGE,
            position: ctx.position,
        };
        let (entries, render) = SceneEntries::build(ctx.scene, |entries, scene| {
            entries.insert(scene, Renderable::Light(desc))
        })?;
        Ok(Self {
            label,
            intensity: FLASH_INTENSITY,
            render,
            entries,
            finished: false,
        })
    }

    pub fn fire(ctx: &mut SpawnContext<'_>) -> FxResult<Self> {
        Self::spawn(ctx, "fire_flash", FIRE_FLASH_COLOR)
    }

    pub fn cold(ctx: &mut SpawnContext<'_>) -> FxResult<Self> {
        Self::spawn(ctx, "cold_flash", ICE_FLASH_COLOR)
    }

    pub fn intensity(&self) -> f32 {
        self.intensity
    }
}

impl Subsystem for LightFlash {
    fn label(&self) -> &'static str {
        self.label
    }

    fn advance(&mut self) -> StepOutcome {
        if self.finished {
            return StepOutcome::Done;
        }
        self.intensity *= FLASH_DECAY;
        if self.intensity < FLASH_CUTOFF {
            self.finished = true;
            StepOutcome::Done
        } else {
            StepOutcome::Continue
        }
    }

    fn sync(&self, scene: &mut dyn Scene) {
        scene.update(self.render, RenderUpdate::Light { intensity: self.intensity });
    }

    fn release(&mut self, scene: &mut dyn Scene) {
        self.finished = true;
        self.entries.release(scene);
    }

    fn live_elements(&self) -> usize {
        usize::from(!self.finished)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{spawn_ctx, CountingScene};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn flash_decays_below_cutoff_after_47_frames() {
        let mut scene = CountingScene::default();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut ctx = spawn_ctx(&mut scene, &mut rng, Vec3::ZERO);
        let mut flash = LightFlash::fire(&mut ctx).unwrap();

        let mut frames = 0;
        while flash.advance() == StepOutcome::Continue {
            frames += 1;
        }
        assert_eq!(frames + 1, 47);
        assert!(flash.intensity() < FLASH_CUTOFF);
    }

    #[test]
    fn light_release_removes_without_disposing() {
        let mut scene = CountingScene::default();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut ctx = spawn_ctx(&mut scene, &mut rng, Vec3::ZERO);
        let mut flash = LightFlash::cold(&mut ctx).unwrap();
        flash.release(&mut scene);
        assert_eq!(scene.removes, 1);
        assert_eq!(scene.disposes, 0);
        assert_eq!(scene.live_renderables(), 0);
    }
}
