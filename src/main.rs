// Demo: pick an effect with 1-9, Space to set it off, R to clear the scene
use bevy::prelude::*;
use rand::Rng;
use std::f32::consts::PI;

use phone_toss_fx::constants::EFFECT_COUNT;
use phone_toss_fx::{EffectKind, ExplosionFxPlugin, FxSettings, ResetExplosions, TriggerExplosion};

const DIGIT_KEYS: [KeyCode; EFFECT_COUNT] = [
    KeyCode::Digit1,
    KeyCode::Digit2,
    KeyCode::Digit3,
    KeyCode::Digit4,
    KeyCode::Digit5,
    KeyCode::Digit6,
    KeyCode::Digit7,
    KeyCode::Digit8,
    KeyCode::Digit9,
];

/// Effect the next throw will use; 1-based like the number keys
#[derive(Resource)]
struct SelectedEffect(i64);

impl Default for SelectedEffect {
    fn default() -> Self {
        Self(1)
    }
}

#[derive(Component)]
struct EffectLabel;

fn main() {
    App::new()
        .add_plugins(DefaultPlugins)
        .add_plugins(ExplosionFxPlugin {
            settings: FxSettings::default(),
        })
        .init_resource::<SelectedEffect>()
        .add_systems(Startup, setup_scene)
        .add_systems(Update, (select_effect_system, throw_system, update_label_system))
        .run();
}

fn setup_scene(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    commands.spawn((
        Mesh3d(meshes.add(Rectangle::new(20.0, 20.0))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb(0.2, 0.22, 0.25),
            perceptual_roughness: 0.9,
            ..default()
        })),
        Transform::from_xyz(0.0, -0.5, 0.0).with_rotation(Quat::from_rotation_x(-PI / 2.0)),
    ));

    commands.spawn((
        DirectionalLight {
            illuminance: 8000.0,
            shadows_enabled: false,
            ..default()
        },
        Transform::from_xyz(3.0, 8.0, 4.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    commands.insert_resource(AmbientLight {
        color: Color::srgb(0.5, 0.5, 0.6),
        brightness: 400.0,
        affects_lightmapped_meshes: false,
    });

    commands.spawn((
        Camera3d::default(),
        Transform::from_xyz(0.0, 1.0, 5.0).looking_at(Vec3::new(0.0, 0.5, 0.0), Vec3::Y),
    ));

    commands.spawn((
        Text::new(""),
        TextFont {
            font_size: 20.0,
            ..default()
        },
        TextColor(Color::WHITE),
        Node {
            position_type: PositionType::Absolute,
            top: Val::Px(10.0),
            left: Val::Px(10.0),
            ..default()
        },
        EffectLabel,
    ));
}

fn select_effect_system(keyboard: Res<ButtonInput<KeyCode>>, mut selected: ResMut<SelectedEffect>) {
    for (i, key) in DIGIT_KEYS.iter().enumerate() {
        if keyboard.just_pressed(*key) {
            selected.0 = i as i64 + 1;
            let name = EffectKind::from_index_clamped(selected.0).name();
            info!("🎯 Selected effect {}: {}", selected.0, name);
        }
    }
}

fn throw_system(
    keyboard: Res<ButtonInput<KeyCode>>,
    selected: Res<SelectedEffect>,
    mut triggers: EventWriter<TriggerExplosion>,
    mut resets: EventWriter<ResetExplosions>,
) {
    if keyboard.just_pressed(KeyCode::Space) {
        let mut rng = rand::thread_rng();
        let position = Vec3::new(
            rng.gen_range(-1.5..1.5),
            rng.gen_range(0.0..1.0),
            rng.gen_range(-1.0..1.0),
        );
        triggers.write(TriggerExplosion {
            effect_index: selected.0.clamp(1, EFFECT_COUNT as i64),
            position,
        });
    }

    if keyboard.just_pressed(KeyCode::KeyR) {
        resets.write(ResetExplosions);
    }
}

fn update_label_system(
    selected: Res<SelectedEffect>,
    mut labels: Query<&mut Text, With<EffectLabel>>,
) {
    if !selected.is_changed() {
        return;
    }
    let kind = EffectKind::from_index_clamped(selected.0);
    for mut text in labels.iter_mut() {
        text.0 = format!(
            "Current Explosion: {} ({})\n1-9: Select | Space: Throw | R: Reset",
            kind.index(),
            kind.name()
        );
    }
}
