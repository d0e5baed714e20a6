// Scene contract between the effects engine and whatever owns the render graph
use bevy::prelude::*;

use crate::error::FxResult;
use crate::textures::TextureImage;
use crate::types::{RenderId, RenderUpdate, Renderable, ResourceId, TextureId};

/// The externally owned render graph.
///
/// Sub-systems only ever touch entries they created themselves. Implementations
/// must treat `remove`/`dispose` of unknown or already released ids as a no-op.
pub trait Scene {
    fn create_texture(&mut self, image: &TextureImage) -> FxResult<TextureId>;
    fn insert(&mut self, renderable: Renderable) -> FxResult<RenderId>;
    fn update(&mut self, id: RenderId, update: RenderUpdate<'_>);
    fn remove(&mut self, id: RenderId);
    fn dispose(&mut self, resource: ResourceId);
}

/// Everything one sub-system has put into the scene.
///
/// `release` drains both lists, so releasing twice is harmless.
#[derive(Debug, Default)]
pub struct SceneEntries {
    attached: Vec<RenderId>,
    resources: Vec<ResourceId>,
}

impl SceneEntries {
    /// Run `setup` against a fresh entry list; if it fails, everything it
    /// managed to insert is released before the error is returned.
    pub fn build<T>(
        scene: &mut dyn Scene,
        setup: impl FnOnce(&mut SceneEntries, &mut dyn Scene) -> FxResult<T>,
    ) -> FxResult<(SceneEntries, T)> {
        let mut entries = SceneEntries::default();
        match setup(&mut entries, &mut *scene) {
            Ok(value) => Ok((entries, value)),
            Err(err) => {
                entries.release(scene);
                Err(err)
            }
        }
    }

    pub fn insert(&mut self, scene: &mut dyn Scene, renderable: Renderable) -> FxResult<RenderId> {
        let owns_gpu = renderable.owns_gpu_resources();
        let id = scene.insert(renderable)?;
        self.attached.push(id);
        if owns_gpu {
            self.resources.push(ResourceId::Renderable(id));
        }
        Ok(id)
    }

    pub fn create_texture(
        &mut self,
        scene: &mut dyn Scene,
        image: &TextureImage,
    ) -> FxResult<TextureId> {
        let id = scene.create_texture(image)?;
        self.resources.push(ResourceId::Texture(id));
        Ok(id)
    }

    /// Detach every entry, then free every GPU resource
    pub fn release(&mut self, scene: &mut dyn Scene) {
        if self.is_released() {
            return;
        }
        debug!(
            "🧹 Releasing {} renderables, {} resources",
            self.attached.len(),
            self.resources.len()
        );
        for id in self.attached.drain(..) {
            scene.remove(id);
        }
        for resource in self.resources.drain(..) {
            scene.dispose(resource);
        }
    }

    pub fn is_released(&self) -> bool {
        self.attached.is_empty() && self.resources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FxError;
    use crate::tests::CountingScene;
    use crate::types::{LightDesc, MaterialDesc, MeshDesc, MeshShape};

    fn cube() -> Renderable {
        Renderable::Mesh(MeshDesc {
            shape: MeshShape::Cube { size: 1.0 },
            material: MaterialDesc::unlit(Color::WHITE, 1.0),
            transform: Transform::IDENTITY,
        })
    }

    fn light() -> Renderable {
        Renderable::Light(LightDesc {
            color: Color::WHITE,
            intensity: 5.0,
            range: 6.0,
            position: Vec3::ZERO,
        })
    }

    #[test]
    fn release_is_idempotent() {
        let mut scene = CountingScene::default();
        let mut entries = SceneEntries::default();
        entries.insert(&mut scene, cube()).unwrap();
        entries.insert(&mut scene, light()).unwrap();
        assert_eq!(scene.live_renderables(), 2);
        assert_eq!(scene.live_resources(), 1);

        entries.release(&mut scene);
        entries.release(&mut scene);

        assert_eq!(scene.live_renderables(), 0);
        assert_eq!(scene.live_resources(), 0);
        assert_eq!(scene.removes, 2);
        assert_eq!(scene.disposes, 1);
    }

    #[test]
    fn failed_build_releases_partial_setup() {
        let mut scene = CountingScene::default();
        let result = SceneEntries::build(&mut scene, |entries, scene| {
            entries.insert(scene, cube())?;
            entries.insert(scene, cube())?;
            Err::<(), _>(FxError::Texture("boom".into()))
        });

        assert!(result.is_err());
        assert_eq!(scene.inserts, 2);
        assert_eq!(scene.live_renderables(), 0);
        assert_eq!(scene.live_resources(), 0);
    }
}
