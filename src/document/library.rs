use crate::entity::Entity;
use crate::extra::Extra;
use crate::object::ObjectFlags;
use crate::payload::{
    Animation, AnimationClip, Camera, Controller, Effect, Emitter, ForceField, Geometry, Image, Light, Material,
    PhysicsMaterial, PhysicsModel, PhysicsScene, SceneNode,
};
use std::cell::{Ref, RefCell, RefMut};
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

/// Ordered, owning collection of one entity type.
pub struct Library<T> {
    flags: ObjectFlags,
    entities: RefCell<Vec<Rc<RefCell<T>>>>,
    extra: RefCell<Extra>,
}

impl<T: Entity> Library<T> {
    pub fn new() -> Self {
        Self {
            flags: ObjectFlags::default(),
            entities: RefCell::new(Vec::new()),
            extra: RefCell::new(Extra::new()),
        }
    }

    pub fn flags(&self) -> &ObjectFlags {
        &self.flags
    }

    pub fn len(&self) -> usize {
        self.entities.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.borrow().is_empty()
    }

    pub fn entity(&self, index: usize) -> Option<Rc<RefCell<T>>> {
        self.entities.borrow().get(index).cloned()
    }

    pub fn entities(&self) -> Vec<Rc<RefCell<T>>> {
        self.entities.borrow().clone()
    }

    pub fn contains(&self, entity: &Rc<RefCell<T>>) -> bool {
        self.entities.borrow().iter().any(|e| Rc::ptr_eq(e, entity))
    }

    /// Linear scan; busy entities are skipped.
    pub fn find_dae_id(&self, id: &str) -> Option<Rc<RefCell<T>>> {
        self.entities
            .borrow()
            .iter()
            .find(|entity| entity.try_borrow().is_ok_and(|e| e.core().find_dae_id(id)))
            .cloned()
    }

    pub fn extra(&self) -> Ref<'_, Extra> {
        self.extra.borrow()
    }

    pub fn extra_mut(&self) -> RefMut<'_, Extra> {
        self.extra.borrow_mut()
    }

    pub(crate) fn push(&self, entity: Rc<RefCell<T>>) {
        self.entities.borrow_mut().push(entity);
        self.flags.set_new_child();
    }

    /// Hands the removed entity back so it can be dropped outside of the library borrow.
    pub(crate) fn remove(&self, entity: &Rc<RefCell<T>>) -> Option<Rc<RefCell<T>>> {
        let mut entities = self.entities.borrow_mut();
        let index = entities.iter().position(|e| Rc::ptr_eq(e, entity))?;
        self.flags.set_dirty();
        Some(entities.remove(index))
    }
}

impl<T: Entity> Default for Library<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> Debug for Library<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library").field("len", &self.len()).finish()
    }
}

/// The libraries of a document, declared in lookup order.
#[derive(Debug, Default)]
pub struct Libraries {
    pub animations: Library<Animation>,
    pub animation_clips: Library<AnimationClip>,
    pub cameras: Library<Camera>,
    pub controllers: Library<Controller>,
    pub effects: Library<Effect>,
    pub emitters: Library<Emitter>,
    pub force_fields: Library<ForceField>,
    pub geometries: Library<Geometry>,
    pub images: Library<Image>,
    pub lights: Library<Light>,
    pub materials: Library<Material>,
    pub visual_scenes: Library<SceneNode>,
    pub physics_scenes: Library<PhysicsScene>,
    pub physics_materials: Library<PhysicsMaterial>,
    pub physics_models: Library<PhysicsModel>,
}

/// Entity types that live in a document library.
pub trait LibraryEntity: Entity + Sized {
    fn library(libraries: &Libraries) -> &Library<Self>;
}

macro_rules! library_entity {
    ($($entity:ty => $field:ident),* $(,)?) => {
        $(
            impl LibraryEntity for $entity {
                fn library(libraries: &Libraries) -> &Library<Self> {
                    &libraries.$field
                }
            }
        )*
    };
}

library_entity! {
    Animation => animations,
    AnimationClip => animation_clips,
    Camera => cameras,
    Controller => controllers,
    Effect => effects,
    Emitter => emitters,
    ForceField => force_fields,
    Geometry => geometries,
    Image => images,
    Light => lights,
    Material => materials,
    SceneNode => visual_scenes,
    PhysicsScene => physics_scenes,
    PhysicsMaterial => physics_materials,
    PhysicsModel => physics_models,
}

impl Libraries {
    pub fn entity_count(&self) -> usize {
        self.animations.len()
            + self.animation_clips.len()
            + self.cameras.len()
            + self.controllers.len()
            + self.effects.len()
            + self.emitters.len()
            + self.force_fields.len()
            + self.geometries.len()
            + self.images.len()
            + self.lights.len()
            + self.materials.len()
            + self.visual_scenes.len()
            + self.physics_scenes.len()
            + self.physics_materials.len()
            + self.physics_models.len()
    }
}
