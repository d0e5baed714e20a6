use bevy::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::error::{FxError, FxResult};
use crate::explosion_catalog::{EffectCatalog, EffectKind};
use crate::explosion_system::{
    ExplosionFxPlugin, FrameDriver, FxSettings, PendingTriggers, ResetExplosions, TriggerExplosion,
};
use crate::particles::SpawnContext;
use crate::render_bridge::{ExplosionVisual, RenderRegistry};
use crate::scene::Scene;
use crate::textures::TextureImage;
use crate::types::{RenderId, RenderUpdate, Renderable, ResourceId, TextureId};

/// In-memory scene that only counts what happens to it
#[derive(Default)]
pub struct CountingScene {
    pub inserts: usize,
    pub removes: usize,
    pub disposes: usize,
    pub updates: usize,
    pub textures_created: usize,
    pub double_removes: usize,
    pub double_disposes: usize,
    /// Make every `create_texture` fail
    pub fail_textures: bool,
    next_id: u64,
    live: HashSet<RenderId>,
    owned: HashSet<ResourceId>,
}

impl CountingScene {
    pub fn live_renderables(&self) -> usize {
        self.live.len()
    }

    pub fn live_resources(&self) -> usize {
        self.owned.len()
    }

    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

impl Scene for CountingScene {
    fn create_texture(&mut self, _image: &TextureImage) -> FxResult<TextureId> {
        if self.fail_textures {
            return Err(FxError::Scene {
                what: "texture",
                reason: "upload refused".into(),
            });
        }
        let id = TextureId(self.allocate());
        self.textures_created += 1;
        self.owned.insert(ResourceId::Texture(id));
        Ok(id)
    }

    fn insert(&mut self, renderable: Renderable) -> FxResult<RenderId> {
        let id = RenderId(self.allocate());
        self.inserts += 1;
        self.live.insert(id);
        if renderable.owns_gpu_resources() {
            self.owned.insert(ResourceId::Renderable(id));
        }
        Ok(id)
    }

    fn update(&mut self, id: RenderId, _update: RenderUpdate<'_>) {
        assert!(self.live.contains(&id), "update after removal of {id:?}");
        self.updates += 1;
    }

    fn remove(&mut self, id: RenderId) {
        self.removes += 1;
        if !self.live.remove(&id) {
            self.double_removes += 1;
        }
    }

    fn dispose(&mut self, resource: ResourceId) {
        self.disposes += 1;
        if !self.owned.remove(&resource) {
            self.double_disposes += 1;
        }
    }
}

fn shared_settings() -> &'static FxSettings {
    static SETTINGS: OnceLock<FxSettings> = OnceLock::new();
    SETTINGS.get_or_init(FxSettings::default)
}

pub fn spawn_ctx<'a>(
    scene: &'a mut CountingScene,
    rng: &'a mut ChaCha8Rng,
    position: Vec3,
) -> SpawnContext<'a> {
    SpawnContext {
        position,
        settings: shared_settings(),
        rng,
        scene,
    }
}

fn run_until_idle(driver: &mut FrameDriver, scene: &mut CountingScene, limit: u32) -> u32 {
    let mut ticks = 0;
    while driver.active_count() > 0 {
        assert!(ticks < limit, "explosion still running after {limit} frames");
        driver.tick(scene);
        ticks += 1;
    }
    ticks
}

#[test]
fn every_effect_cleans_up_after_itself() {
    let catalog = EffectCatalog::new();
    let settings = FxSettings::default();

    for kind in EffectKind::ALL {
        let mut rng = ChaCha8Rng::seed_from_u64(kind.index() as u64);
        let mut scene = CountingScene::default();
        let mut driver = FrameDriver::default();

        let handle = catalog.instantiate(
            kind.index(),
            Vec3::new(0.0, 1.0, 0.0),
            &settings,
            &mut rng,
            &mut scene,
            &mut driver,
        );
        assert_eq!(handle.failed, 0, "{}", kind.name());
        assert!(scene.live_renderables() > 0);

        run_until_idle(&mut driver, &mut scene, 1_000);

        assert_eq!(scene.live_renderables(), 0, "{}", kind.name());
        assert_eq!(scene.live_resources(), 0, "{}", kind.name());
        assert_eq!(scene.double_removes, 0, "{}", kind.name());
        assert_eq!(scene.double_disposes, 0, "{}", kind.name());
        assert!(driver.is_effect_finished(handle.effect));
    }
}

#[test]
fn single_layer_effects_end_on_their_exact_frame() {
    let catalog = EffectCatalog::new();
    let settings = FxSettings::default();

    for (kind, frames) in [
        (EffectKind::BasicBurst, 200),
        (EffectKind::Shockwave, 50),
        (EffectKind::Spiral, 100),
        (EffectKind::PixelCubes, 100),
    ] {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut scene = CountingScene::default();
        let mut driver = FrameDriver::default();
        catalog.instantiate(kind.index(), Vec3::ZERO, &settings, &mut rng, &mut scene, &mut driver);

        assert_eq!(run_until_idle(&mut driver, &mut scene, 1_000), frames, "{}", kind.name());
    }
}

#[test]
fn light_flash_leaves_before_the_particles() {
    let catalog = EffectCatalog::new();
    let settings = FxSettings::default();

    // Frost rays are spent by frame 35, so ice keeps two layers past the flash
    for (index, flash, remaining) in [(2, "fire_flash", 3), (3, "cold_flash", 2)] {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut scene = CountingScene::default();
        let mut driver = FrameDriver::default();
        let handle = catalog.instantiate(index, Vec3::ZERO, &settings, &mut rng, &mut scene, &mut driver);

        for _ in 0..46 {
            driver.tick(&mut scene);
        }
        assert!(driver.labels_in_effect(handle.effect).contains(&flash));

        driver.tick(&mut scene);
        let labels = driver.labels_in_effect(handle.effect);
        assert!(!labels.contains(&flash));
        assert_eq!(labels.len(), remaining);
        assert!(!driver.is_effect_finished(handle.effect));
    }
}

#[test]
fn effect_is_not_finished_while_children_hold_live_elements() {
    let catalog = EffectCatalog::new();
    let settings = FxSettings::default();
    let mut rng = ChaCha8Rng::seed_from_u64(31);
    let mut scene = CountingScene::default();
    let mut driver = FrameDriver::default();
    let handle = catalog.instantiate(2, Vec3::ZERO, &settings, &mut rng, &mut scene, &mut driver);

    while driver.active_count() > 0 {
        if driver.live_elements(handle.effect) > 0 {
            assert!(!driver.is_effect_finished(handle.effect));
        }
        driver.tick(&mut scene);
    }
    assert!(driver.is_effect_finished(handle.effect));
    assert_eq!(driver.live_elements(handle.effect), 0);
}

#[test]
fn texture_failure_still_spawns_texture_free_children() {
    let catalog = EffectCatalog::new();
    let settings = FxSettings::default();
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let mut scene = CountingScene { fail_textures: true, ..default() };
    let mut driver = FrameDriver::default();

    let fire = catalog.instantiate(2, Vec3::ZERO, &settings, &mut rng, &mut scene, &mut driver);
    assert_eq!(fire.spawned, ["embers", "fire_flash"]);
    assert_eq!(fire.failed, 2);

    let ice = catalog.instantiate(3, Vec3::ZERO, &settings, &mut rng, &mut scene, &mut driver);
    assert_eq!(ice.spawned, ["ice_shards", "frost_rays", "cold_flash"]);
    assert_eq!(ice.failed, 1);

    run_until_idle(&mut driver, &mut scene, 1_000);
    assert_eq!(scene.live_renderables(), 0);
    assert_eq!(scene.live_resources(), 0);
}

#[test]
fn cancelled_effect_is_released_on_the_next_tick() {
    let catalog = EffectCatalog::new();
    let settings = FxSettings::default();
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let mut scene = CountingScene::default();
    let mut driver = FrameDriver::default();

    let ice = catalog.instantiate(3, Vec3::ZERO, &settings, &mut rng, &mut scene, &mut driver);
    let confetti = catalog.instantiate(7, Vec3::ZERO, &settings, &mut rng, &mut scene, &mut driver);
    driver.tick(&mut scene);

    ice.cancel();
    let report = driver.tick(&mut scene);
    assert_eq!(report.cancelled, 4);
    assert!(driver.is_effect_finished(ice.effect));
    assert!(!driver.is_effect_finished(confetti.effect));

    driver.cancel_all(&mut scene);
    assert_eq!(scene.live_renderables(), 0);
    assert_eq!(scene.live_resources(), 0);
    assert_eq!(scene.double_disposes, 0);
}

fn test_app(settings: FxSettings) -> App {
    let mut app = App::new();
    app.insert_resource(Assets::<Mesh>::default())
        .insert_resource(Assets::<StandardMaterial>::default())
        .insert_resource(Assets::<Image>::default())
        .add_plugins(ExplosionFxPlugin { settings });
    app
}

fn visual_count(app: &mut App) -> usize {
    let world = app.world_mut();
    world.query::<&ExplosionVisual>().iter(world).count()
}

#[test]
fn plugin_spawns_steps_and_despawns() {
    let mut app = test_app(FxSettings { seed: Some(1), ..default() });
    app.world_mut().send_event(TriggerExplosion {
        effect_index: 5,
        position: Vec3::new(0.0, 1.0, 0.0),
    });

    app.update();
    assert_eq!(visual_count(&mut app), 1);
    assert_eq!(app.world().resource::<FrameDriver>().frame(), 1);

    for _ in 0..49 {
        app.update();
    }
    assert_eq!(visual_count(&mut app), 0);
    assert!(app.world().resource::<RenderRegistry>().is_empty());
    assert_eq!(app.world().resource::<Assets<Mesh>>().len(), 0);
}

#[test]
fn triggers_over_the_frame_budget_wait_a_frame() {
    let mut app = test_app(FxSettings {
        seed: Some(2),
        max_explosions_per_frame: 2,
        ..default()
    });
    for index in [1, 6, 9] {
        app.world_mut().send_event(TriggerExplosion { effect_index: index, position: Vec3::ZERO });
    }

    app.update();
    assert_eq!(app.world().resource::<FrameDriver>().active_count(), 2);
    assert_eq!(app.world().resource::<PendingTriggers>().0.len(), 1);

    app.update();
    assert_eq!(app.world().resource::<FrameDriver>().active_count(), 3);
    assert!(app.world().resource::<PendingTriggers>().0.is_empty());
}

#[test]
fn reset_releases_everything() {
    let mut app = test_app(FxSettings { seed: Some(3), ..default() });
    app.world_mut().send_event(TriggerExplosion { effect_index: 2, position: Vec3::ZERO });
    app.world_mut().send_event(TriggerExplosion { effect_index: 3, position: Vec3::ZERO });
    app.update();
    assert!(visual_count(&mut app) > 0);

    app.world_mut().send_event(ResetExplosions);
    app.update();
    assert_eq!(visual_count(&mut app), 0);
    assert_eq!(app.world().resource::<FrameDriver>().active_count(), 0);
    assert!(app.world().resource::<RenderRegistry>().is_empty());
    assert_eq!(app.world().resource::<Assets<Image>>().len(), 0);
}
