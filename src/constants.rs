// Per-frame tuning for the nine explosion effects.
// All rates are per rendered frame (the simulation is frame-stepped, not time-stepped).

/// Fade channels treat a remainder below this fraction of the initial value as spent
pub const FADE_TOLERANCE: f64 = 1e-6;

// ===== CATALOG =====

pub const EFFECT_COUNT: usize = 9;
pub const MAX_EXPLOSIONS_PER_FRAME: usize = 8;        // Trigger events beyond this wait for the next frame
pub const BILLBOARD_TARGET: [f32; 3] = [0.0, 0.0, 5.0]; // Rings and frost quads face this point at spawn
pub const LIGHT_LUMENS_PER_UNIT: f32 = 120_000.0;     // Scene intensity unit → Bevy point light lumens

// ===== 1: BASIC BURST =====

pub const BASIC_PARTICLE_COUNT: usize = 300;
pub const BASIC_SPEED: f32 = 0.15;                    // Velocity components uniform in ±this
pub const BASIC_GRAVITY: f32 = 0.005;
pub const BASIC_FADE_STEP: f32 = 0.005;               // 200 frames
pub const BASIC_POINT_SIZE: f32 = 0.2;

// ===== 2: FIRE =====

pub const FIRE_PARTICLE_COUNT: usize = 600;
pub const FIRE_QUAD_SIZE: f32 = 0.5;
pub const FIRE_SPAWN_JITTER: f32 = 0.15;
pub const FIRE_LIFETIME_STEP: f32 = 0.01;
pub const FIRE_SCALE_GROWTH: f32 = 1.005;             // Fire expands as it rises
pub const FIRE_TIME_STEP: f32 = 0.016;                // Turbulence clock, ~60fps
pub const FIRE_TURBULENCE_FREQUENCY: f32 = 5.0;
pub const FIRE_TURBULENCE_AMPLITUDE: f32 = 0.003;
pub const FIRE_PALETTE: [u32; 4] = [0xffc83f, 0xff7711, 0xff3322, 0x220000]; // Yellow, orange, red, smoke
pub const FIRE_PALETTE_WEIGHTS: [f32; 4] = [0.3, 0.3, 0.25, 0.15];

pub const EMBER_COUNT: usize = 200;
pub const EMBER_SPAWN_JITTER: f32 = 0.1;
pub const EMBER_GRAVITY: f32 = 0.005;
pub const EMBER_FADE_STEP: f32 = 0.005;
pub const EMBER_POINT_SIZE: f32 = 0.05;
pub const EMBER_COLOR: u32 = 0xffaa00;
pub const EMBER_VISIBILITY_DEPTH: f32 = 3.0;          // Embers below spawn.y - this are out of view

pub const SMOKE_PUFF_COUNT: usize = 30;
pub const SMOKE_PUFF_SIZE: f32 = 0.8;
pub const SMOKE_PUFF_JITTER: f32 = 0.15;
pub const SMOKE_PUFF_START_SCALE: f32 = 0.01;
pub const SMOKE_PUFF_SCALE_STEP: f32 = 0.02;
pub const SMOKE_PUFF_SCALE_CAP: f32 = 1.5;
pub const SMOKE_PUFF_SPIN: f32 = 0.01;
pub const SMOKE_PUFF_FADE_STEP: f32 = 0.002;
pub const SMOKE_PUFF_DELAY_FRAMES: u32 = 3;           // 50ms at 60fps

pub const FLASH_INTENSITY: f32 = 5.0;
pub const FLASH_RANGE: f32 = 6.0;
pub const FLASH_DECAY: f32 = 0.92;
pub const FLASH_CUTOFF: f32 = 0.1;
pub const FIRE_FLASH_COLOR: u32 = 0xff7700;
pub const ICE_FLASH_COLOR: u32 = 0x88ddff;

// ===== 3: ICE =====

pub const ICE_SHARD_COUNT: usize = 150;
pub const ICE_SHARD_SPEED: f32 = 0.1;
pub const ICE_SHARD_SPIN: f32 = 0.05;
pub const ICE_SHARD_IMPULSE: f32 = 0.1;
pub const ICE_SHARD_GRAVITY: f32 = 0.002;
pub const ICE_SHARD_DAMPING: f32 = 0.99;              // "Air resistance"
pub const ICE_SHARD_OPACITY: f32 = 0.7;
pub const ICE_SHARD_FADE_STEP: f32 = 0.005;

pub const FROST_CLOUD_COUNT: usize = 20;
pub const FROST_CLOUD_JITTER: f32 = 0.25;
pub const FROST_CLOUD_SPEED: f32 = 0.025;
pub const FROST_CLOUD_GROWTH: f32 = 0.01;
pub const FROST_CLOUD_OPACITY: f32 = 0.7;
pub const FROST_CLOUD_FADE_STEP: f32 = 0.01;

pub const FROST_RAY_COUNT: usize = 12;
pub const FROST_RAY_TOP_RADIUS: f32 = 0.01;
pub const FROST_RAY_BOTTOM_RADIUS: f32 = 0.05;
pub const FROST_RAY_STRETCH: f32 = 1.03;
pub const FROST_RAY_COLOR: u32 = 0xb8e3ff;
pub const FROST_RAY_OPACITY: f32 = 0.7;
pub const FROST_RAY_FADE_STEP: f32 = 0.02;

// ===== 4: SMOKE =====

pub const SMOKE_PARTICLE_COUNT: usize = 50;
pub const SMOKE_SPAWN_JITTER: f32 = 0.1;
pub const SMOKE_DRIFT: f32 = 0.01;
pub const SMOKE_RISE_MAX: f32 = 0.06;
pub const SMOKE_SIZE_GROWTH: f32 = 1.01;
pub const SMOKE_COLOR: u32 = 0x666666;
pub const SMOKE_OPACITY: f32 = 0.8;
pub const SMOKE_FADE_STEP: f32 = 0.005;

// ===== 5: SHOCKWAVE =====

pub const SHOCKWAVE_INNER_RADIUS: f32 = 0.1;
pub const SHOCKWAVE_OUTER_RADIUS: f32 = 0.2;
pub const SHOCKWAVE_SEGMENTS: u32 = 32;
pub const SHOCKWAVE_START_SCALE: f32 = 0.1;
pub const SHOCKWAVE_GROWTH: f32 = 1.08;
pub const SHOCKWAVE_FADE_STEP: f32 = 0.02;            // 50 frames
pub const SHOCKWAVE_COLOR: u32 = 0xffff00;

// ===== 6: GLASS SHARDS =====

pub const GLASS_SHARD_COUNT: usize = 40;
pub const GLASS_SPEED: f32 = 0.1;
pub const GLASS_GRAVITY: f32 = 0.005;
pub const GLASS_SPIN: [f32; 3] = [0.02, 0.02, 0.0];
pub const GLASS_OPACITY: f32 = 0.7;
pub const GLASS_FADE_STEP: f32 = 0.01;
pub const GLASS_COLOR: u32 = 0x88ccff;

// ===== 7: CONFETTI =====

pub const CONFETTI_COUNT: usize = 200;
pub const CONFETTI_SIZE: f32 = 0.1;
pub const CONFETTI_SPEED: f32 = 0.1;
pub const CONFETTI_GRAVITY: f32 = 0.003;
pub const CONFETTI_SPIN_JITTER: f32 = 0.1;
pub const CONFETTI_FADE_STEP: f32 = 0.005;
pub const CONFETTI_PALETTE: [u32; 9] = [
    0xff0000, 0x00ff00, 0x0000ff,
    0xffff00, 0xff00ff, 0x00ffff,
    0xff8800, 0x88ff00, 0x0088ff,
];

// ===== 8: PIXEL CUBES =====

pub const PIXEL_CUBE_COUNT: usize = 100;
pub const PIXEL_CUBE_SIZE: f32 = 0.05;
pub const PIXEL_SPEED: f32 = 0.1;
pub const PIXEL_GRAVITY: f32 = 0.005;
pub const PIXEL_SPIN: f32 = 0.05;
pub const PIXEL_FADE_STEP: f32 = 0.01;

// ===== 9: SPIRAL =====

pub const SPIRAL_PARTICLE_COUNT: usize = 150;
pub const SPIRAL_START_RADIUS: f32 = 0.01;
pub const SPIRAL_RADIUS_GROWTH: f32 = 0.01;
pub const SPIRAL_HEIGHT_FACTOR: f32 = 0.025;          // Height factor uniform in ±this
pub const SPIRAL_SPEED_MIN: f32 = 0.1;
pub const SPIRAL_SPEED_MAX: f32 = 0.3;
pub const SPIRAL_FADE_STEP: f32 = 0.01;               // 100 frames
pub const SPIRAL_POINT_SIZE: f32 = 0.05;
pub const SPIRAL_COLOR: u32 = 0xff00ff;

// ===== TEXTURES =====

pub const FIRE_TEXTURE_SIZE: u32 = 128;
pub const SMOKE_TEXTURE_SIZE: u32 = 128;
pub const FROST_TEXTURE_SIZE: u32 = 256;
pub const MAX_TEXTURE_SIZE: u32 = 4096;
