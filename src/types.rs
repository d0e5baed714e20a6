use bevy::prelude::*;

/// Handle to a render-graph entry created through [`crate::scene::Scene::insert`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderId(pub u64);

/// Handle to a GPU texture created through [`crate::scene::Scene::create_texture`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u64);

/// Anything a sub-system must hand back to the scene with `dispose`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceId {
    /// Geometry + material backing a renderable
    Renderable(RenderId),
    Texture(TextureId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Blend {
    #[default]
    Alpha,
    Additive,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Shading {
    #[default]
    Unlit,
    /// Refractive, clear-coated ice
    Crystal,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MaterialDesc {
    pub color: Color,
    pub opacity: f32,
    pub blend: Blend,
    pub shading: Shading,
    pub double_sided: bool,
    pub texture: Option<TextureId>,
}

impl MaterialDesc {
    pub fn unlit(color: Color, opacity: f32) -> Self {
        Self {
            color,
            opacity,
            blend: Blend::Alpha,
            shading: Shading::Unlit,
            double_sided: true,
            texture: None,
        }
    }

    pub fn with_texture(mut self, texture: TextureId) -> Self {
        self.texture = Some(texture);
        self
    }

    pub fn with_shading(mut self, shading: Shading) -> Self {
        self.shading = shading;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MeshShape {
    /// Flat annulus in the local XY plane
    Ring { inner: f32, outer: f32, segments: u32 },
    /// Right triangle with legs along +X and +Y
    Triangle { size: f32 },
    Quad { width: f32, height: f32 },
    Cube { size: f32 },
    Cuboid { x: f32, y: f32, z: f32 },
    Tetrahedron { radius: f32 },
    Cone { radius: f32, height: f32, segments: u32 },
    /// Tapered cylinder along +Y with its base at the local origin
    Ray { top_radius: f32, bottom_radius: f32, length: f32, segments: u32 },
}

#[derive(Clone, Debug, PartialEq)]
pub struct PointCloudDesc {
    pub positions: Vec<Vec3>,
    /// Per-point colours; `color` is used for every point when absent
    pub colors: Option<Vec<Color>>,
    pub color: Color,
    pub size: f32,
    pub opacity: f32,
    pub blend: Blend,
}

/// One camera-facing quad in a sprite batch
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sprite {
    pub position: Vec3,
    pub scale: f32,
    pub rotation: f32,
    pub color_index: u8,
    pub alpha: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SpriteBatchDesc {
    pub quad_size: f32,
    pub sprites: Vec<Sprite>,
    pub palette: Vec<Color>,
    pub texture: Option<TextureId>,
    pub blend: Blend,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MeshDesc {
    pub shape: MeshShape,
    pub material: MaterialDesc,
    pub transform: Transform,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightDesc {
    pub color: Color,
    pub intensity: f32,
    pub range: f32,
    pub position: Vec3,
}

/// Description of a visual element handed to the scene on insert
#[derive(Clone, Debug, PartialEq)]
pub enum Renderable {
    Points(PointCloudDesc),
    Sprites(SpriteBatchDesc),
    Mesh(MeshDesc),
    Light(LightDesc),
}

impl Renderable {
    /// Lights carry no geometry or material, so there is nothing to dispose
    pub fn owns_gpu_resources(&self) -> bool {
        !matches!(self, Renderable::Light(_))
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Renderable::Points(_) => "points",
            Renderable::Sprites(_) => "sprites",
            Renderable::Mesh(_) => "mesh",
            Renderable::Light(_) => "light",
        }
    }
}

/// Per-frame state pushed to an existing renderable
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RenderUpdate<'a> {
    Points { positions: &'a [Vec3], size: f32, opacity: f32 },
    Sprites(&'a [Sprite]),
    Mesh { transform: Transform, opacity: f32 },
    Light { intensity: f32 },
}

/// `0xRRGGBB` → sRGB colour
pub fn hex_color(hex: u32) -> Color {
    Color::srgb_u8(
        ((hex >> 16) & 0xff) as u8,
        ((hex >> 8) & 0xff) as u8,
        (hex & 0xff) as u8,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_color_splits_channels() {
        let color = hex_color(0xff7700).to_srgba();
        assert!((color.red - 1.0).abs() < 1e-6);
        assert!((color.green - 0x77 as f32 / 255.0).abs() < 1e-6);
        assert_eq!(color.blue, 0.0);
    }

    #[test]
    fn only_lights_skip_disposal() {
        let light = Renderable::Light(LightDesc {
            color: Color::WHITE,
            intensity: 1.0,
            range: 1.0,
            position: Vec3::ZERO,
        });
        assert!(!light.owns_gpu_resources());

        let mesh = Renderable::Mesh(MeshDesc {
            shape: MeshShape::Cube { size: 1.0 },
            material: MaterialDesc::unlit(Color::WHITE, 1.0),
            transform: Transform::IDENTITY,
        });
        assert!(mesh.owns_gpu_resources());
    }
}
