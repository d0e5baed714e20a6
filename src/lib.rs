// Explosion particle effects for the phone-toss mini-game
pub mod constants;
pub mod error;
pub mod explosion_catalog;
pub mod explosion_system;
pub mod math_utils;
pub mod particles;
pub mod render_bridge;
pub mod scene;
pub mod textures;
pub mod types;

#[cfg(test)]
mod tests;

pub use explosion_catalog::{EffectCatalog, EffectHandle, EffectKind};
pub use explosion_system::{
    ExplosionFxPlugin, FrameDriver, FxSettings, ResetExplosions, TriggerExplosion,
};
pub use scene::Scene;
