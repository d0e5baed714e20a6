// Particle sub-systems: the three reusable templates plus the composite layers
use bevy::prelude::*;
use rand::RngCore;

use crate::constants::FADE_TOLERANCE;
use crate::error::FxResult;
use crate::explosion_system::FxSettings;
use crate::scene::Scene;

pub mod fire;
pub mod ice;
pub mod light_flash;
pub mod point_cloud;
pub mod rigid_body;
pub mod shockwave;

pub use fire::FireCore;
pub use light_flash::LightFlash;
pub use point_cloud::PointCloudBurst;
pub use rigid_body::RigidBodyBurst;
pub use shockwave::Shockwave;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    Continue,
    Done,
}

/// One self-contained, self-decaying visual simulation.
///
/// The frame driver calls `advance` exactly once per frame. On `Continue` it
/// follows with `sync`; on `Done` it calls `release` on the same frame and
/// never touches the sub-system again.
pub trait Subsystem: Send + Sync {
    fn label(&self) -> &'static str;

    /// Integrate one frame of state. Pure: no scene access.
    fn advance(&mut self) -> StepOutcome;

    /// Push the current state to the render graph
    fn sync(&self, scene: &mut dyn Scene);

    /// Remove every inserted entry and dispose every owned resource. Idempotent.
    fn release(&mut self, scene: &mut dyn Scene);

    /// Elements still visible or waiting to activate
    fn live_elements(&self) -> usize;
}

/// Linear decay channel (opacity or lifetime) counted in whole frames.
///
/// The value after `n` frames is `max(0, initial - n * step)`. Whether the
/// channel is spent is decided on the frame count, so float accumulation can
/// never delay or advance the terminal frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fade {
    initial: f32,
    step: f32,
    frames: u32,
    lifetime_frames: u32,
}

impl Fade {
    pub fn new(initial: f32, step: f32) -> Self {
        let lifetime_frames = if initial <= 0.0 {
            0
        } else if step <= 0.0 {
            u32::MAX
        } else {
            let frames = initial as f64 / step as f64 * (1.0 - FADE_TOLERANCE);
            frames.ceil().min(u32::MAX as f64) as u32
        };
        Self { initial, step, frames: 0, lifetime_frames }
    }

    pub fn advance(&mut self) {
        if !self.is_spent() {
            self.frames += 1;
        }
    }

    pub fn value(&self) -> f32 {
        if self.is_spent() {
            0.0
        } else {
            (self.initial - self.frames as f32 * self.step).max(0.0)
        }
    }

    pub fn is_spent(&self) -> bool {
        self.frames >= self.lifetime_frames
    }

    pub fn frames(&self) -> u32 {
        self.frames
    }

    /// Frame on which the channel first reaches zero
    pub fn lifetime_frames(&self) -> u32 {
        self.lifetime_frames
    }
}

/// Everything a constructor needs to spawn its sub-system
pub struct SpawnContext<'a> {
    pub position: Vec3,
    pub settings: &'a FxSettings,
    pub rng: &'a mut dyn RngCore,
    pub scene: &'a mut dyn Scene,
}

/// Result of one child constructor, tagged for logging
pub struct SpawnOutcome {
    pub label: &'static str,
    pub result: FxResult<Box<dyn Subsystem>>,
}

pub fn spawn_child<S, F>(ctx: &mut SpawnContext<'_>, label: &'static str, spawn: F) -> SpawnOutcome
where
    S: Subsystem + 'static,
    F: FnOnce(&mut SpawnContext<'_>) -> FxResult<S>,
{
    SpawnOutcome {
        label,
        result: spawn(ctx).map(|subsystem| Box::new(subsystem) as Box<dyn Subsystem>),
    }
}
