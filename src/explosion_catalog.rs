// The nine selectable explosion effects and how to spawn them
use bevy::prelude::*;
use rand::RngCore;

use crate::constants::EFFECT_COUNT;
use crate::explosion_system::{CancelToken, EffectId, FrameDriver, FxSettings};
use crate::particles::fire::spawn_fire_effect;
use crate::particles::ice::spawn_ice_effect;
use crate::particles::{
    spawn_child, PointCloudBurst, RigidBodyBurst, Shockwave, SpawnContext, SpawnOutcome,
};
use crate::scene::Scene;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EffectKind {
    BasicBurst,
    Fire,
    Ice,
    Smoke,
    Shockwave,
    GlassShards,
    Confetti,
    PixelCubes,
    Spiral,
}

impl EffectKind {
    /// In selection order, index 1 first
    pub const ALL: [EffectKind; EFFECT_COUNT] = [
        EffectKind::BasicBurst,
        EffectKind::Fire,
        EffectKind::Ice,
        EffectKind::Smoke,
        EffectKind::Shockwave,
        EffectKind::GlassShards,
        EffectKind::Confetti,
        EffectKind::PixelCubes,
        EffectKind::Spiral,
    ];

    /// 1-based selection index
    pub fn index(self) -> i64 {
        match self {
            EffectKind::BasicBurst => 1,
            EffectKind::Fire => 2,
            EffectKind::Ice => 3,
            EffectKind::Smoke => 4,
            EffectKind::Shockwave => 5,
            EffectKind::GlassShards => 6,
            EffectKind::Confetti => 7,
            EffectKind::PixelCubes => 8,
            EffectKind::Spiral => 9,
        }
    }

    pub fn from_index(index: i64) -> Option<Self> {
        if (1..=EFFECT_COUNT as i64).contains(&index) {
            Some(Self::ALL[(index - 1) as usize])
        } else {
            None
        }
    }

    /// Out-of-range indices snap to the nearest valid effect
    pub fn from_index_clamped(index: i64) -> Self {
        Self::ALL[(index.clamp(1, EFFECT_COUNT as i64) - 1) as usize]
    }

    pub fn name(self) -> &'static str {
        match self {
            EffectKind::BasicBurst => "Basic Burst",
            EffectKind::Fire => "Fire Explosion",
            EffectKind::Ice => "Ice Explosion",
            EffectKind::Smoke => "Smoke Cloud",
            EffectKind::Shockwave => "Shockwave",
            EffectKind::GlassShards => "Glass Shards",
            EffectKind::Confetti => "Confetti",
            EffectKind::PixelCubes => "Pixel Cubes",
            EffectKind::Spiral => "Spiral",
        }
    }
}

pub type EffectConstructor = fn(&mut SpawnContext<'_>) -> Vec<SpawnOutcome>;

#[derive(Clone, Copy)]
pub struct EffectDescriptor {
    pub kind: EffectKind,
    pub name: &'static str,
    pub constructor: EffectConstructor,
}

fn basic_burst(ctx: &mut SpawnContext<'_>) -> Vec<SpawnOutcome> {
    vec![spawn_child(ctx, "basic_burst", PointCloudBurst::basic_burst)]
}

fn smoke(ctx: &mut SpawnContext<'_>) -> Vec<SpawnOutcome> {
    vec![spawn_child(ctx, "smoke_cloud", PointCloudBurst::smoke_cloud)]
}

fn shockwave(ctx: &mut SpawnContext<'_>) -> Vec<SpawnOutcome> {
    vec![spawn_child(ctx, "shockwave", Shockwave::spawn)]
}

fn glass_shards(ctx: &mut SpawnContext<'_>) -> Vec<SpawnOutcome> {
    vec![spawn_child(ctx, "glass_shards", RigidBodyBurst::glass_shards)]
}

fn confetti(ctx: &mut SpawnContext<'_>) -> Vec<SpawnOutcome> {
    vec![spawn_child(ctx, "confetti", RigidBodyBurst::confetti)]
}

fn pixel_cubes(ctx: &mut SpawnContext<'_>) -> Vec<SpawnOutcome> {
    vec![spawn_child(ctx, "pixel_cubes", RigidBodyBurst::pixel_cubes)]
}

fn spiral(ctx: &mut SpawnContext<'_>) -> Vec<SpawnOutcome> {
    vec![spawn_child(ctx, "spiral", PointCloudBurst::spiral)]
}

fn constructor_for(kind: EffectKind) -> EffectConstructor {
    match kind {
        EffectKind::BasicBurst => basic_burst,
        EffectKind::Fire => spawn_fire_effect,
        EffectKind::Ice => spawn_ice_effect,
        EffectKind::Smoke => smoke,
        EffectKind::Shockwave => shockwave,
        EffectKind::GlassShards => glass_shards,
        EffectKind::Confetti => confetti,
        EffectKind::PixelCubes => pixel_cubes,
        EffectKind::Spiral => spiral,
    }
}

/// What one `instantiate` call put into the frame driver
#[derive(Clone, Debug)]
pub struct EffectHandle {
    pub effect: EffectId,
    pub kind: EffectKind,
    pub tokens: Vec<CancelToken>,
    pub spawned: Vec<&'static str>,
    pub failed: usize,
}

impl EffectHandle {
    /// Children are released on the driver's next tick
    pub fn cancel(&self) {
        for token in &self.tokens {
            token.cancel();
        }
    }
}

/// Immutable table of the nine effects, built once at startup
#[derive(Resource)]
pub struct EffectCatalog {
    descriptors: Vec<EffectDescriptor>,
}

impl Default for EffectCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl EffectCatalog {
    pub fn new() -> Self {
        let descriptors = EffectKind::ALL
            .iter()
            .map(|&kind| EffectDescriptor {
                kind,
                name: kind.name(),
                constructor: constructor_for(kind),
            })
            .collect();
        Self { descriptors }
    }

    pub fn get(&self, kind: EffectKind) -> &EffectDescriptor {
        &self.descriptors[(kind.index() - 1) as usize]
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Spawn effect `index` at `position` and register its sub-systems.
    /// A child that fails to spawn is logged and skipped; its siblings still run.
    pub fn instantiate(
        &self,
        index: i64,
        position: Vec3,
        settings: &FxSettings,
        rng: &mut dyn RngCore,
        scene: &mut dyn Scene,
        driver: &mut FrameDriver,
    ) -> EffectHandle {
        let kind = EffectKind::from_index_clamped(index);
        if kind.index() != index {
            debug!("🔢 Effect index {} out of range, using {}", index, kind.index());
        }
        let descriptor = self.get(kind);

        let mut ctx = SpawnContext { position, settings, rng, scene };
        let outcomes = (descriptor.constructor)(&mut ctx);

        let effect = driver.begin_effect();
        let mut handle = EffectHandle {
            effect,
            kind,
            tokens: Vec::with_capacity(outcomes.len()),
            spawned: Vec::with_capacity(outcomes.len()),
            failed: 0,
        };

        for outcome in outcomes {
            match outcome.result {
                Ok(subsystem) => {
                    let (_, token) = driver.register(effect, subsystem);
                    handle.tokens.push(token);
                    handle.spawned.push(outcome.label);
                }
                Err(err) => {
                    warn!("⚠️ {}: {} failed to spawn: {}", descriptor.name, outcome.label, err);
                    handle.failed += 1;
                }
            }
        }

        info!(
            "💥 {} at ({:.1}, {:.1}, {:.1}): {} sub-systems",
            descriptor.name,
            position.x,
            position.y,
            position.z,
            handle.spawned.len()
        );

        handle
    }
}
