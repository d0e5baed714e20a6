// Bevy side of the scene contract: entities, meshes, materials and images
use bevy::asset::RenderAssetUsages;
use bevy::color::ColorToComponents;
use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use bevy::render::mesh::{Indices, PrimitiveTopology};
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};
use std::collections::HashMap;
use std::f32::consts::TAU;

use crate::error::{FxError, FxResult};
use crate::explosion_system::FxSettings;
use crate::math_utils::facing_rotation;
use crate::scene::Scene;
use crate::textures::TextureImage;
use crate::types::{
    Blend, MaterialDesc, MeshShape, PointCloudDesc, RenderId, RenderUpdate, Renderable, ResourceId,
    Shading, Sprite, SpriteBatchDesc, TextureId,
};

/// Marks every entity spawned for an explosion renderable
#[derive(Component, Debug)]
pub struct ExplosionVisual {
    pub id: RenderId,
}

/// Camera-facing quad axes for point and sprite batches
#[derive(Clone, Copy, Debug)]
struct BillboardAxes {
    right: Vec3,
    up: Vec3,
    normal: Vec3,
}

impl BillboardAxes {
    fn facing(from: Vec3, target: Vec3) -> Self {
        let rotation = facing_rotation(from, target);
        Self {
            right: rotation * Vec3::X,
            up: rotation * Vec3::Y,
            normal: rotation * Vec3::Z,
        }
    }
}

enum SlotKind {
    Points {
        mesh: Handle<Mesh>,
        material: Handle<StandardMaterial>,
        colors: Vec<[f32; 4]>,
        axes: BillboardAxes,
    },
    Sprites {
        mesh: Handle<Mesh>,
        material: Handle<StandardMaterial>,
        quad_size: f32,
        palette: Vec<LinearRgba>,
        axes: BillboardAxes,
    },
    Mesh {
        material: Handle<StandardMaterial>,
    },
    Light {
        color: Color,
        range: f32,
    },
}

struct RenderSlot {
    entity: Entity,
    kind: SlotKind,
}

/// Bookkeeping for everything the effects engine has put into the world
#[derive(Resource, Default)]
pub struct RenderRegistry {
    slots: HashMap<RenderId, RenderSlot>,
    gpu: HashMap<RenderId, (Handle<Mesh>, Handle<StandardMaterial>)>,
    textures: HashMap<TextureId, Handle<Image>>,
    next_id: u64,
}

impl RenderRegistry {
    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn slot(&self, id: RenderId) -> FxResult<&RenderSlot> {
        self.slots.get(&id).ok_or(FxError::UnknownRenderable(id))
    }

    pub fn entity(&self, id: RenderId) -> FxResult<Entity> {
        self.slot(id).map(|slot| slot.entity)
    }

    pub fn live_renderables(&self) -> usize {
        self.slots.len()
    }

    /// Meshes, materials and images not yet disposed
    pub fn live_resources(&self) -> usize {
        self.gpu.len() + self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty() && self.gpu.is_empty() && self.textures.is_empty()
    }
}

/// Everything a system needs to build a [`BevyScene`]
#[derive(SystemParam)]
pub struct SceneAccess<'w, 's> {
    commands: Commands<'w, 's>,
    meshes: ResMut<'w, Assets<Mesh>>,
    materials: ResMut<'w, Assets<StandardMaterial>>,
    images: ResMut<'w, Assets<Image>>,
    registry: ResMut<'w, RenderRegistry>,
}

impl<'w, 's> SceneAccess<'w, 's> {
    pub fn scene<'a>(&'a mut self, settings: &FxSettings) -> BevyScene<'a, 'w, 's> {
        BevyScene {
            commands: &mut self.commands,
            meshes: &mut self.meshes,
            materials: &mut self.materials,
            images: &mut self.images,
            registry: &mut self.registry,
            billboard_target: settings.billboard_target,
            lumens_per_unit: settings.light_lumens_per_unit,
        }
    }
}

pub struct BevyScene<'a, 'w, 's> {
    pub commands: &'a mut Commands<'w, 's>,
    pub meshes: &'a mut Assets<Mesh>,
    pub materials: &'a mut Assets<StandardMaterial>,
    pub images: &'a mut Assets<Image>,
    pub registry: &'a mut RenderRegistry,
    pub billboard_target: Vec3,
    pub lumens_per_unit: f32,
}

impl BevyScene<'_, '_, '_> {
    fn texture_handle(&self, id: Option<TextureId>) -> FxResult<Option<Handle<Image>>> {
        match id {
            None => Ok(None),
            Some(id) => self
                .registry
                .textures
                .get(&id)
                .cloned()
                .map(Some)
                .ok_or_else(|| FxError::Scene {
                    what: "material",
                    reason: format!("texture {:?} was never created", id),
                }),
        }
    }

    fn material(&mut self, desc: &MaterialDesc) -> FxResult<Handle<StandardMaterial>> {
        let texture = self.texture_handle(desc.texture)?;
        Ok(self.materials.add(build_material(desc, texture)))
    }

    fn spawn_visual(
        &mut self,
        id: RenderId,
        mesh: Handle<Mesh>,
        material: Handle<StandardMaterial>,
        transform: Transform,
    ) -> Entity {
        self.commands
            .spawn((
                Mesh3d(mesh),
                MeshMaterial3d(material),
                transform,
                ExplosionVisual { id },
            ))
            .id()
    }

    fn insert_points(&mut self, id: RenderId, desc: PointCloudDesc) -> FxResult<RenderSlot> {
        let anchor = desc.positions.first().copied().unwrap_or(Vec3::ZERO);
        let axes = BillboardAxes::facing(anchor, self.billboard_target);
        let base = desc.color.to_linear().to_f32_array();
        let colors: Vec<[f32; 4]> = match &desc.colors {
            Some(colors) => colors.iter().map(|c| c.to_linear().to_f32_array()).collect(),
            None => vec![base; desc.positions.len()],
        };

        let mesh = self.meshes.add(point_quads(&desc.positions, &colors, desc.size, axes));
        let material = self.materials.add(StandardMaterial {
            base_color: Color::WHITE.with_alpha(desc.opacity),
            alpha_mode: alpha_mode(desc.blend),
            unlit: true,
            double_sided: true,
            cull_mode: None,
            ..default()
        });
        let entity = self.spawn_visual(id, mesh.clone(), material.clone(), Transform::IDENTITY);
        Ok(RenderSlot {
            entity,
            kind: SlotKind::Points { mesh, material, colors, axes },
        })
    }

    fn insert_sprites(&mut self, id: RenderId, desc: SpriteBatchDesc) -> FxResult<RenderSlot> {
        let anchor = desc.sprites.first().map(|s| s.position).unwrap_or(Vec3::ZERO);
        let axes = BillboardAxes::facing(anchor, self.billboard_target);
        let palette: Vec<LinearRgba> = desc.palette.iter().map(|c| c.to_linear()).collect();
        let texture = self.texture_handle(desc.texture)?;

        let mesh = self
            .meshes
            .add(sprite_quads(&desc.sprites, &palette, desc.quad_size, axes));
        let material = self.materials.add(StandardMaterial {
            base_color: Color::WHITE,
            base_color_texture: texture,
            alpha_mode: alpha_mode(desc.blend),
            unlit: true,
            double_sided: true,
            cull_mode: None,
            ..default()
        });
        let entity = self.spawn_visual(id, mesh.clone(), material.clone(), Transform::IDENTITY);
        Ok(RenderSlot {
            entity,
            kind: SlotKind::Sprites {
                mesh,
                material,
                quad_size: desc.quad_size,
                palette,
                axes,
            },
        })
    }
}

impl Scene for BevyScene<'_, '_, '_> {
    fn create_texture(&mut self, image: &TextureImage) -> FxResult<TextureId> {
        let handle = self.images.add(Image::new(
            Extent3d {
                width: image.width,
                height: image.height,
                depth_or_array_layers: 1,
            },
            TextureDimension::D2,
            image.as_bytes().to_vec(),
            TextureFormat::Rgba8UnormSrgb,
            RenderAssetUsages::RENDER_WORLD,
        ));
        let id = TextureId(self.registry.allocate());
        self.registry.textures.insert(id, handle);
        debug!("🖼️ Texture {:?} uploaded ({}x{})", id, image.width, image.height);
        Ok(id)
    }

    fn insert(&mut self, renderable: Renderable) -> FxResult<RenderId> {
        let id = RenderId(self.registry.allocate());
        let kind = renderable.kind_name();
        let slot = match renderable {
            Renderable::Points(desc) => self.insert_points(id, desc)?,
            Renderable::Sprites(desc) => self.insert_sprites(id, desc)?,
            Renderable::Mesh(desc) => {
                let material = self.material(&desc.material)?;
                let mesh = self.meshes.add(build_shape(desc.shape));
                let entity = self.spawn_visual(id, mesh.clone(), material.clone(), desc.transform);
                self.registry.gpu.insert(id, (mesh, material.clone()));
                RenderSlot {
                    entity,
                    kind: SlotKind::Mesh { material },
                }
            }
            Renderable::Light(desc) => {
                let entity = self
                    .commands
                    .spawn((
                        PointLight {
                            color: desc.color,
                            intensity: desc.intensity * self.lumens_per_unit,
                            range: desc.range,
                            shadows_enabled: false,
                            ..default()
                        },
                        Transform::from_translation(desc.position),
                        ExplosionVisual { id },
                    ))
                    .id();
                RenderSlot {
                    entity,
                    kind: SlotKind::Light {
                        color: desc.color,
                        range: desc.range,
                    },
                }
            }
        };

        if let SlotKind::Points { mesh, material, .. } | SlotKind::Sprites { mesh, material, .. } =
            &slot.kind
        {
            self.registry.gpu.insert(id, (mesh.clone(), material.clone()));
        }
        self.registry.slots.insert(id, slot);
        trace!("➕ Inserted {} {:?}", kind, id);
        Ok(id)
    }

    fn update(&mut self, id: RenderId, update: RenderUpdate<'_>) {
        let slot = match self.registry.slot(id) {
            Ok(slot) => slot,
            Err(err) => {
                debug!("Skipping update: {}", err);
                return;
            }
        };

        match (&slot.kind, update) {
            (
                SlotKind::Points { mesh, material, colors, axes },
                RenderUpdate::Points { positions, size, opacity },
            ) => {
                if let Some(mesh) = self.meshes.get_mut(mesh) {
                    *mesh = point_quads(positions, colors, size, *axes);
                }
                if let Some(material) = self.materials.get_mut(material) {
                    material.base_color = material.base_color.with_alpha(opacity);
                }
            }
            (
                SlotKind::Sprites { mesh, quad_size, palette, axes, .. },
                RenderUpdate::Sprites(sprites),
            ) => {
                if let Some(mesh) = self.meshes.get_mut(mesh) {
                    *mesh = sprite_quads(sprites, palette, *quad_size, *axes);
                }
            }
            (SlotKind::Mesh { material }, RenderUpdate::Mesh { transform, opacity }) => {
                if let Some(material) = self.materials.get_mut(material) {
                    material.base_color = material.base_color.with_alpha(opacity);
                }
                self.commands.entity(slot.entity).insert(transform);
            }
            (SlotKind::Light { color, range }, RenderUpdate::Light { intensity }) => {
                self.commands.entity(slot.entity).insert(PointLight {
                    color: *color,
                    intensity: intensity * self.lumens_per_unit,
                    range: *range,
                    shadows_enabled: false,
                    ..default()
                });
            }
            _ => warn!("⚠️ Mismatched update for renderable {:?}", id),
        }
    }

    fn remove(&mut self, id: RenderId) {
        match self.registry.slots.remove(&id) {
            Some(slot) => {
                self.commands.entity(slot.entity).despawn();
            }
            None => debug!("Ignoring remove of unknown renderable {:?}", id),
        }
    }

    fn dispose(&mut self, resource: ResourceId) {
        match resource {
            ResourceId::Renderable(id) => match self.registry.gpu.remove(&id) {
                Some((mesh, material)) => {
                    self.meshes.remove(&mesh);
                    self.materials.remove(&material);
                }
                None => debug!("Ignoring dispose of unknown renderable {:?}", id),
            },
            ResourceId::Texture(id) => match self.registry.textures.remove(&id) {
                Some(image) => {
                    self.images.remove(&image);
                }
                None => debug!("Ignoring dispose of unknown texture {:?}", id),
            },
        }
    }
}

fn alpha_mode(blend: Blend) -> AlphaMode {
    match blend {
        Blend::Alpha => AlphaMode::Blend,
        Blend::Additive => AlphaMode::Add,
    }
}

fn build_material(desc: &MaterialDesc, texture: Option<Handle<Image>>) -> StandardMaterial {
    let mut material = StandardMaterial {
        base_color: desc.color.with_alpha(desc.opacity),
        base_color_texture: texture,
        alpha_mode: alpha_mode(desc.blend),
        double_sided: desc.double_sided,
        cull_mode: if desc.double_sided {
            None
        } else {
            Some(bevy::render::render_resource::Face::Back)
        },
        ..default()
    };

    match desc.shading {
        Shading::Unlit => material.unlit = true,
        Shading::Crystal => {
            material.metallic = 0.1;
            material.perceptual_roughness = 0.1;
            material.reflectance = 0.5;
            material.clearcoat = 1.0;
            material.clearcoat_perceptual_roughness = 0.1;
            material.specular_transmission = 0.9;
            material.thickness = 0.2;
            material.ior = 1.5;
        }
    }
    material
}

/// Flat-shaded triangle list, one normal per face
#[derive(Default)]
struct TriangleSoup {
    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    uvs: Vec<[f32; 2]>,
}

impl TriangleSoup {
    fn push(&mut self, a: Vec3, b: Vec3, c: Vec3) {
        let normal = (b - a).cross(c - a).normalize_or_zero();
        for (vertex, uv) in [(a, [0.0, 0.0]), (b, [1.0, 0.0]), (c, [0.0, 1.0])] {
            self.positions.push(vertex.to_array());
            self.normals.push(normal.to_array());
            self.uvs.push(uv);
        }
    }

    fn into_mesh(self) -> Mesh {
        let indices: Vec<u32> = (0..self.positions.len() as u32).collect();
        let mut mesh = Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::RENDER_WORLD);
        mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, self.positions);
        mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, self.normals);
        mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, self.uvs);
        mesh.insert_indices(Indices::U32(indices));
        mesh
    }
}

fn circle_point(radius: f32, angle: f32, y: f32) -> Vec3 {
    Vec3::new(angle.cos() * radius, y, angle.sin() * radius)
}

/// Tapered tube along +Y from `y0` (radius `r0`) to `y1` (radius `r1`)
fn push_frustum(soup: &mut TriangleSoup, r0: f32, y0: f32, r1: f32, y1: f32, segments: u32) {
    let segments = segments.max(3);
    for i in 0..segments {
        let a0 = i as f32 / segments as f32 * TAU;
        let a1 = (i + 1) as f32 / segments as f32 * TAU;
        let (b0, b1) = (circle_point(r0, a0, y0), circle_point(r0, a1, y0));
        let (t0, t1) = (circle_point(r1, a0, y1), circle_point(r1, a1, y1));
        soup.push(b0, t1, b1);
        soup.push(b0, t0, t1);
    }
}

pub fn build_shape(shape: MeshShape) -> Mesh {
    match shape {
        MeshShape::Cube { size } => Mesh::from(Cuboid::new(size, size, size)),
        MeshShape::Cuboid { x, y, z } => Mesh::from(Cuboid::new(x, y, z)),
        MeshShape::Quad { width, height } => Mesh::from(Rectangle::new(width, height)),
        MeshShape::Ring { inner, outer, segments } => {
            let segments = segments.max(3);
            let mut soup = TriangleSoup::default();
            for i in 0..segments {
                let a0 = i as f32 / segments as f32 * TAU;
                let a1 = (i + 1) as f32 / segments as f32 * TAU;
                let ring = |r: f32, a: f32| Vec3::new(a.cos() * r, a.sin() * r, 0.0);
                soup.push(ring(inner, a0), ring(outer, a0), ring(outer, a1));
                soup.push(ring(inner, a0), ring(outer, a1), ring(inner, a1));
            }
            soup.into_mesh()
        }
        MeshShape::Triangle { size } => {
            let mut soup = TriangleSoup::default();
            soup.push(Vec3::ZERO, Vec3::new(size, 0.0, 0.0), Vec3::new(0.0, size, 0.0));
            soup.into_mesh()
        }
        MeshShape::Tetrahedron { radius } => {
            let corners = [
                Vec3::new(1.0, 1.0, 1.0),
                Vec3::new(-1.0, -1.0, 1.0),
                Vec3::new(-1.0, 1.0, -1.0),
                Vec3::new(1.0, -1.0, -1.0),
            ]
            .map(|v| v.normalize() * radius);
            let mut soup = TriangleSoup::default();
            for [a, b, c] in [[2, 1, 0], [0, 3, 2], [1, 3, 0], [2, 3, 1]] {
                soup.push(corners[a], corners[b], corners[c]);
            }
            soup.into_mesh()
        }
        MeshShape::Cone { radius, height, segments } => {
            let mut soup = TriangleSoup::default();
            let half = height * 0.5;
            push_frustum(&mut soup, radius, -half, 0.0, half, segments);
            let centre = Vec3::new(0.0, -half, 0.0);
            let segments = segments.max(3);
            for i in 0..segments {
                let a0 = i as f32 / segments as f32 * TAU;
                let a1 = (i + 1) as f32 / segments as f32 * TAU;
                soup.push(centre, circle_point(radius, a0, -half), circle_point(radius, a1, -half));
            }
            soup.into_mesh()
        }
        MeshShape::Ray { top_radius, bottom_radius, length, segments } => {
            let mut soup = TriangleSoup::default();
            push_frustum(&mut soup, bottom_radius, 0.0, top_radius, length, segments);
            soup.into_mesh()
        }
    }
}

fn quad_mesh(positions: Vec<[f32; 3]>, colors: Vec<[f32; 4]>, normal: Vec3) -> Mesh {
    let quads = positions.len() / 4;
    let mut indices = Vec::with_capacity(quads * 6);
    let mut uvs = Vec::with_capacity(positions.len());
    for q in 0..quads as u32 {
        let base = q * 4;
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        uvs.extend_from_slice(&[[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]]);
    }
    let normals = vec![normal.to_array(); positions.len()];

    let mut mesh = Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default());
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
    mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals);
    mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, uvs);
    mesh.insert_attribute(Mesh::ATTRIBUTE_COLOR, colors);
    mesh.insert_indices(Indices::U32(indices));
    mesh
}

fn push_quad(positions: &mut Vec<[f32; 3]>, centre: Vec3, right: Vec3, up: Vec3) {
    positions.push((centre - right - up).to_array());
    positions.push((centre + right - up).to_array());
    positions.push((centre + right + up).to_array());
    positions.push((centre - right + up).to_array());
}

/// One small billboard quad per point
fn point_quads(points: &[Vec3], colors: &[[f32; 4]], size: f32, axes: BillboardAxes) -> Mesh {
    let half = size * 0.5;
    let mut positions = Vec::with_capacity(points.len() * 4);
    let mut vertex_colors = Vec::with_capacity(points.len() * 4);
    for (i, point) in points.iter().enumerate() {
        push_quad(&mut positions, *point, axes.right * half, axes.up * half);
        let color = colors.get(i).copied().unwrap_or([1.0; 4]);
        vertex_colors.extend_from_slice(&[color; 4]);
    }
    quad_mesh(positions, vertex_colors, axes.normal)
}

/// One rotated, scaled billboard per sprite; alpha carries the remaining lifetime
fn sprite_quads(
    sprites: &[Sprite],
    palette: &[LinearRgba],
    quad_size: f32,
    axes: BillboardAxes,
) -> Mesh {
    let mut positions = Vec::with_capacity(sprites.len() * 4);
    let mut colors = Vec::with_capacity(sprites.len() * 4);
    for sprite in sprites {
        let half = quad_size * sprite.scale * 0.5;
        let (sin, cos) = sprite.rotation.sin_cos();
        let right = (axes.right * cos + axes.up * sin) * half;
        let up = (axes.up * cos - axes.right * sin) * half;
        push_quad(&mut positions, sprite.position, right, up);

        let base = palette
            .get(sprite.color_index as usize)
            .copied()
            .unwrap_or(LinearRgba::WHITE);
        let color = base.with_alpha(sprite.alpha.clamp(0.0, 1.0)).to_f32_array();
        colors.extend_from_slice(&[color; 4]);
    }
    quad_mesh(positions, colors, axes.normal)
}
