// Explosion orchestration - trigger events, per-frame stepping and teardown
use bevy::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::constants::*;
use crate::explosion_catalog::EffectCatalog;
use crate::particles::{StepOutcome, Subsystem};
use crate::render_bridge::{RenderRegistry, SceneAccess};
use crate::scene::Scene;

/// Runtime tunables; compile-time defaults live in `constants.rs`
#[derive(Resource, Clone, Debug, PartialEq)]
pub struct FxSettings {
    /// Rings and frost quads are turned toward this point when spawned
    pub billboard_target: Vec3,
    /// Fire smoke puff `i` waits `i * this` frames before it moves
    pub smoke_puff_delay_frames: u32,
    /// Fixed seed for reproducible runs; entropy when absent
    pub seed: Option<u64>,
    pub max_explosions_per_frame: usize,
    pub light_lumens_per_unit: f32,
}

impl Default for FxSettings {
    fn default() -> Self {
        Self {
            billboard_target: Vec3::from_array(BILLBOARD_TARGET),
            smoke_puff_delay_frames: SMOKE_PUFF_DELAY_FRAMES,
            seed: None,
            max_explosions_per_frame: MAX_EXPLOSIONS_PER_FRAME,
            light_lumens_per_unit: LIGHT_LUMENS_PER_UNIT,
        }
    }
}

/// Shared randomness for every constructor
#[derive(Resource)]
pub struct FxRng(pub ChaCha8Rng);

impl FxRng {
    pub fn from_settings(settings: &FxSettings) -> Self {
        match settings.seed {
            Some(seed) => Self(ChaCha8Rng::seed_from_u64(seed)),
            None => Self(ChaCha8Rng::from_entropy()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EffectId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubsystemId(pub u64);

/// Flag shared between a registered sub-system and whoever may want it gone
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

struct ActiveSubsystem {
    id: SubsystemId,
    effect: EffectId,
    subsystem: Box<dyn Subsystem>,
    token: CancelToken,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub stepped: usize,
    pub finished: usize,
    pub cancelled: usize,
}

/// Table of every live sub-system, stepped once per frame
#[derive(Resource, Default)]
pub struct FrameDriver {
    active: Vec<ActiveSubsystem>,
    next_effect: u64,
    next_subsystem: u64,
    frame: u64,
}

impl FrameDriver {
    pub fn begin_effect(&mut self) -> EffectId {
        self.next_effect += 1;
        EffectId(self.next_effect)
    }

    pub fn register(
        &mut self,
        effect: EffectId,
        subsystem: Box<dyn Subsystem>,
    ) -> (SubsystemId, CancelToken) {
        self.next_subsystem += 1;
        let id = SubsystemId(self.next_subsystem);
        let token = CancelToken::default();
        self.active.push(ActiveSubsystem {
            id,
            effect,
            subsystem,
            token: token.clone(),
        });
        (id, token)
    }

    /// Advance every sub-system one frame. Finished and cancelled ones are
    /// released on this same call and never seen again.
    pub fn tick(&mut self, scene: &mut dyn Scene) -> TickReport {
        self.frame += 1;
        let frame = self.frame;
        let mut report = TickReport::default();

        self.active.retain_mut(|entry| {
            if entry.token.is_cancelled() {
                entry.subsystem.release(&mut *scene);
                report.cancelled += 1;
                return false;
            }

            report.stepped += 1;
            match entry.subsystem.advance() {
                StepOutcome::Continue => {
                    entry.subsystem.sync(&mut *scene);
                    true
                }
                StepOutcome::Done => {
                    entry.subsystem.release(&mut *scene);
                    report.finished += 1;
                    debug!(
                        "✅ {} #{} of effect {} finished on frame {}",
                        entry.subsystem.label(),
                        entry.id.0,
                        entry.effect.0,
                        frame
                    );
                    false
                }
            }
        });

        report
    }

    /// Release every sub-system of one effect right away
    pub fn cancel_effect(&mut self, effect: EffectId, scene: &mut dyn Scene) -> usize {
        let before = self.active.len();
        self.active.retain_mut(|entry| {
            if entry.effect != effect {
                return true;
            }
            entry.token.cancel();
            entry.subsystem.release(&mut *scene);
            false
        });
        before - self.active.len()
    }

    /// Release everything; used on reset and teardown
    pub fn cancel_all(&mut self, scene: &mut dyn Scene) -> usize {
        let released = self.active.len();
        for mut entry in self.active.drain(..) {
            entry.token.cancel();
            entry.subsystem.release(&mut *scene);
        }
        released
    }

    pub fn is_effect_finished(&self, effect: EffectId) -> bool {
        !self.active.iter().any(|entry| entry.effect == effect)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn active_in_effect(&self, effect: EffectId) -> usize {
        self.active.iter().filter(|entry| entry.effect == effect).count()
    }

    pub fn labels_in_effect(&self, effect: EffectId) -> Vec<&'static str> {
        self.active
            .iter()
            .filter(|entry| entry.effect == effect)
            .map(|entry| entry.subsystem.label())
            .collect()
    }

    /// Elements still visible or pending across one effect
    pub fn live_elements(&self, effect: EffectId) -> usize {
        self.active
            .iter()
            .filter(|entry| entry.effect == effect)
            .map(|entry| entry.subsystem.live_elements())
            .sum()
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }
}

/// Request to play effect `effect_index` (1..=9, clamped) at `position`
#[derive(Event, Clone, Copy, Debug, PartialEq)]
pub struct TriggerExplosion {
    pub effect_index: i64,
    pub position: Vec3,
}

/// Dispose every running explosion immediately
#[derive(Event, Clone, Copy, Debug, Default)]
pub struct ResetExplosions;

/// Triggers that did not fit into this frame's budget
#[derive(Resource, Default)]
pub struct PendingTriggers(pub VecDeque<TriggerExplosion>);

#[derive(Default)]
pub struct ExplosionFxPlugin {
    pub settings: FxSettings,
}

impl Plugin for ExplosionFxPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(FxRng::from_settings(&self.settings))
            .insert_resource(self.settings.clone())
            .init_resource::<EffectCatalog>()
            .init_resource::<FrameDriver>()
            .init_resource::<PendingTriggers>()
            .init_resource::<RenderRegistry>()
            .add_event::<TriggerExplosion>()
            .add_event::<ResetExplosions>()
            .add_systems(
                Update,
                (
                    reset_explosions_system,
                    trigger_explosion_system,
                    drive_explosion_frames_system,
                )
                    .chain(),
            );
    }
}

/// Spawn queued explosions, at most `max_explosions_per_frame` per frame
pub fn trigger_explosion_system(
    mut triggers: EventReader<TriggerExplosion>,
    mut pending: ResMut<PendingTriggers>,
    catalog: Res<EffectCatalog>,
    settings: Res<FxSettings>,
    mut rng: ResMut<FxRng>,
    mut driver: ResMut<FrameDriver>,
    mut access: SceneAccess,
) {
    pending.0.extend(triggers.read().copied());
    if pending.0.is_empty() {
        return;
    }

    let budget = settings.max_explosions_per_frame.max(1);
    let count = pending.0.len().min(budget);
    let mut scene = access.scene(&settings);
    for trigger in pending.0.drain(..count) {
        catalog.instantiate(
            trigger.effect_index,
            trigger.position,
            &settings,
            &mut rng.0,
            &mut scene,
            &mut driver,
        );
    }

    if !pending.0.is_empty() {
        warn!(
            "⚠️ Deferred {} explosions to next frame (limit: {})",
            pending.0.len(),
            budget
        );
    }
}

/// Step every live sub-system once
pub fn drive_explosion_frames_system(
    mut driver: ResMut<FrameDriver>,
    settings: Res<FxSettings>,
    mut access: SceneAccess,
) {
    if driver.active_count() == 0 {
        return;
    }

    let report = driver.tick(&mut access.scene(&settings));
    if report.finished > 0 || report.cancelled > 0 {
        debug!(
            "📊 EXPLOSION FRAME {}: {} stepped, {} finished, {} cancelled, {} still active",
            driver.frame(),
            report.stepped,
            report.finished,
            report.cancelled,
            driver.active_count()
        );
    }
}

pub fn reset_explosions_system(
    mut resets: EventReader<ResetExplosions>,
    mut driver: ResMut<FrameDriver>,
    mut pending: ResMut<PendingTriggers>,
    settings: Res<FxSettings>,
    mut access: SceneAccess,
) {
    if resets.is_empty() {
        return;
    }
    resets.clear();

    let released = driver.cancel_all(&mut access.scene(&settings));
    let dropped = pending.0.len();
    pending.0.clear();
    info!("🔄 Reset explosions: released {} sub-systems, dropped {} queued", released, dropped);
}
