//! Procedural sprite textures for the fire, smoke and frost layers.
//!
//! Every texture is a radial gradient painted on the CPU, optionally with a
//! detail pass on top (noise grain for smoke, a snowflake for frost). Rows are
//! filled in parallel; the result is plain RGBA8 that the scene uploads.

use bytemuck::{Pod, Zeroable};
use noise::{NoiseFn, Perlin};
use rayon::prelude::*;

use crate::constants::*;
use crate::error::{FxError, FxResult};

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Source-over blend of `src` with coverage `alpha` (0..1)
    fn blend_over(self, src: [f32; 3], alpha: f32) -> Self {
        let alpha = alpha.clamp(0.0, 1.0);
        let dst_a = self.a as f32 / 255.0;
        let out_a = alpha + dst_a * (1.0 - alpha);
        if out_a <= 0.0 {
            return Self::default();
        }
        let mix = |s: f32, d: u8| {
            let d = d as f32;
            ((s * alpha + d * dst_a * (1.0 - alpha)) / out_a).round().clamp(0.0, 255.0) as u8
        };
        Self {
            r: mix(src[0], self.r),
            g: mix(src[1], self.g),
            b: mix(src[2], self.b),
            a: (out_a * 255.0).round() as u8,
        }
    }
}

/// A colour stop: offset in 0..1 along the radius, RGB in 0..255, alpha in 0..1
#[derive(Clone, Copy, Debug)]
pub struct GradientStop {
    pub offset: f32,
    pub rgb: [f32; 3],
    pub alpha: f32,
}

const fn stop(offset: f32, r: f32, g: f32, b: f32, alpha: f32) -> GradientStop {
    GradientStop { offset, rgb: [r, g, b], alpha }
}

const FIRE_STOPS: [GradientStop; 4] = [
    stop(0.0, 255.0, 255.0, 255.0, 1.0),
    stop(0.1, 255.0, 255.0, 255.0, 0.95),
    stop(0.5, 255.0, 200.0, 50.0, 0.5),
    stop(1.0, 255.0, 100.0, 50.0, 0.0),
];

const SMOKE_STOPS: [GradientStop; 3] = [
    stop(0.0, 90.0, 90.0, 90.0, 1.0),
    stop(0.4, 80.0, 80.0, 80.0, 0.5),
    stop(1.0, 70.0, 70.0, 70.0, 0.0),
];

const FROST_STOPS: [GradientStop; 3] = [
    stop(0.0, 255.0, 255.0, 255.0, 1.0),
    stop(0.2, 220.0, 240.0, 255.0, 0.8),
    stop(1.0, 200.0, 230.0, 255.0, 0.0),
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Rgba8>,
}

impl TextureImage {
    pub fn new(width: u32, height: u32) -> FxResult<Self> {
        if width == 0 || height == 0 {
            return Err(FxError::Texture(format!("empty texture {width}x{height}")));
        }
        if width > MAX_TEXTURE_SIZE || height > MAX_TEXTURE_SIZE {
            return Err(FxError::Texture(format!(
                "texture {width}x{height} exceeds {MAX_TEXTURE_SIZE}"
            )));
        }
        Ok(Self {
            width,
            height,
            pixels: vec![Rgba8::default(); (width * height) as usize],
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgba8 {
        self.pixels[(y * self.width + x) as usize]
    }

    /// Fill with a radial gradient centred in the image, radius = width / 2.
    /// Pixels beyond the last stop keep its colour.
    pub fn fill_radial(&mut self, stops: &[GradientStop]) {
        let width = self.width as usize;
        let cx = self.width as f32 / 2.0;
        let cy = self.height as f32 / 2.0;
        let radius = cx;

        self.pixels
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, pixel) in row.iter_mut().enumerate() {
                    let dx = x as f32 + 0.5 - cx;
                    let dy = y as f32 + 0.5 - cy;
                    let t = (dx * dx + dy * dy).sqrt() / radius;
                    let (rgb, alpha) = sample_gradient(stops, t);
                    *pixel = Rgba8::new(
                        rgb[0].round() as u8,
                        rgb[1].round() as u8,
                        rgb[2].round() as u8,
                        (alpha * 255.0).round() as u8,
                    );
                }
            });
    }

    /// One-pixel line, blended over the existing content
    pub fn draw_line(&mut self, from: (f32, f32), to: (f32, f32), rgb: [f32; 3], alpha: f32) {
        let (dx, dy) = (to.0 - from.0, to.1 - from.1);
        let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as usize;
        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            let x = (from.0 + dx * t).floor();
            let y = (from.1 + dy * t).floor();
            if x < 0.0 || y < 0.0 || x >= self.width as f32 || y >= self.height as f32 {
                continue;
            }
            let index = (y as u32 * self.width + x as u32) as usize;
            self.pixels[index] = self.pixels[index].blend_over(rgb, alpha);
        }
    }
}

fn sample_gradient(stops: &[GradientStop], t: f32) -> ([f32; 3], f32) {
    let Some(first) = stops.first() else {
        return ([0.0; 3], 0.0);
    };
    if t <= first.offset {
        return (first.rgb, first.alpha);
    }
    for pair in stops.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if t <= b.offset {
            let span = (b.offset - a.offset).max(f32::EPSILON);
            let k = (t - a.offset) / span;
            let rgb = [
                a.rgb[0] + (b.rgb[0] - a.rgb[0]) * k,
                a.rgb[1] + (b.rgb[1] - a.rgb[1]) * k,
                a.rgb[2] + (b.rgb[2] - a.rgb[2]) * k,
            ];
            return (rgb, a.alpha + (b.alpha - a.alpha) * k);
        }
    }
    let last = stops[stops.len() - 1];
    (last.rgb, last.alpha)
}

/// Soft white-hot core fading to transparent orange
pub fn fire_sprite(size: u32) -> FxResult<TextureImage> {
    let mut image = TextureImage::new(size, size)?;
    image.fill_radial(&FIRE_STOPS);
    Ok(image)
}

/// Grey puff with a light grain where the puff is dense enough to show it
pub fn smoke_puff(size: u32, seed: u32) -> FxResult<TextureImage> {
    let mut image = TextureImage::new(size, size)?;
    image.fill_radial(&SMOKE_STOPS);

    let perlin = Perlin::new(seed);
    let width = size as usize;
    let scale = 24.0 / size as f64;
    image
        .pixels
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, pixel) in row.iter_mut().enumerate() {
                let coverage = pixel.a as f32 / 255.0;
                if coverage <= 0.1 {
                    continue;
                }
                let grain = perlin.get([x as f64 * scale, y as f64 * scale]) as f32;
                if grain > 0.2 {
                    *pixel = pixel.blend_over([255.0, 255.0, 255.0], 0.1 * coverage);
                }
            }
        });
    Ok(image)
}

/// Bright frost glow with a six-branch snowflake drawn over it
pub fn frost_flake(size: u32) -> FxResult<TextureImage> {
    let mut image = TextureImage::new(size, size)?;
    image.fill_radial(&FROST_STOPS);

    let white = [255.0, 255.0, 255.0];
    let center = (size as f32 / 2.0, size as f32 / 2.0);
    let max_len = size as f32 / 2.0;
    let sub_len = max_len * 0.4;
    let branches = 6;
    let sub_branches = 8;

    for branch in 0..branches {
        let angle = branch as f32 / branches as f32 * std::f32::consts::TAU;
        let (sin, cos) = angle.sin_cos();
        let end = (center.0 + cos * max_len, center.1 + sin * max_len);
        image.draw_line(center, end, white, 0.8);

        for i in 1..=sub_branches {
            let t = i as f32 / (sub_branches + 1) as f32;
            let point = (center.0 + cos * max_len * t, center.1 + sin * max_len * t);
            for dir in [-1.0_f32, 1.0] {
                let sub_angle = angle + dir * std::f32::consts::FRAC_PI_3;
                let sub_end = (
                    point.0 + sub_angle.cos() * sub_len * t,
                    point.1 + sub_angle.sin() * sub_len * t,
                );
                image.draw_line(point, sub_end, white, 0.8);
            }
        }
    }
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_degenerate_sizes() {
        assert!(TextureImage::new(0, 16).is_err());
        assert!(TextureImage::new(16, MAX_TEXTURE_SIZE + 1).is_err());
        assert!(fire_sprite(0).is_err());
    }

    #[test]
    fn byte_view_is_rgba8() {
        let image = fire_sprite(8).unwrap();
        assert_eq!(image.as_bytes().len(), 8 * 8 * 4);
    }

    #[test]
    fn fire_sprite_is_opaque_white_at_center_and_clear_at_corner() {
        let image = fire_sprite(FIRE_TEXTURE_SIZE).unwrap();
        let c = FIRE_TEXTURE_SIZE / 2;
        let center = image.pixel(c, c);
        assert_eq!((center.r, center.g, center.b), (255, 255, 255));
        assert!(center.a > 240);
        assert_eq!(image.pixel(0, 0).a, 0);
    }

    #[test]
    fn smoke_grain_only_lightens_dense_pixels() {
        let plain = {
            let mut image = TextureImage::new(64, 64).unwrap();
            image.fill_radial(&SMOKE_STOPS);
            image
        };
        let grained = smoke_puff(64, 7).unwrap();
        for (p, g) in plain.pixels.iter().zip(&grained.pixels) {
            if p.a as f32 / 255.0 <= 0.1 {
                assert_eq!(p, g);
            } else {
                assert!(g.r >= p.r);
            }
        }
    }

    #[test]
    fn frost_flake_draws_branches_over_the_glow() {
        let image = frost_flake(FROST_TEXTURE_SIZE).unwrap();
        let mut gradient_only = TextureImage::new(FROST_TEXTURE_SIZE, FROST_TEXTURE_SIZE).unwrap();
        gradient_only.fill_radial(&FROST_STOPS);

        // Branch 0 runs along +X from the centre to the edge, where the glow has faded out
        let y = FROST_TEXTURE_SIZE / 2;
        let x = FROST_TEXTURE_SIZE - 4;
        assert!(image.pixel(x, y).a > gradient_only.pixel(x, y).a);
    }

    #[test]
    fn gradient_clamps_past_last_stop() {
        let (rgb, alpha) = sample_gradient(&FIRE_STOPS, 1.4);
        assert_eq!(rgb, [255.0, 100.0, 50.0]);
        assert_eq!(alpha, 0.0);
    }
}
