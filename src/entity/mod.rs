//! Identified, named document elements and the lazy references pointing at them.

use crate::document::{Document, WeakDocument};
use crate::extra::Extra;
use crate::object::{ObjectFlags, Trackable};
use crate::parameter::{Child, Parameterized};
use std::any::Any;
use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::{Rc, Weak};

pub mod asset;
pub mod reference;
pub mod uri;

#[cfg(test)]
mod tests;

pub use asset::Asset;
pub use reference::{EntityReference, ResolutionState};

pub type EntityCell = RefCell<dyn Entity>;
pub type EntityRc = Rc<EntityCell>;
pub type WeakEntity = Weak<EntityCell>;

pub const MAX_NAME_LENGTH: usize = 512;

/// Entity names: the first character must be alphabetic or `_`, the others alphanumeric, `_` or
/// `-`. `:` and `.` are not accepted. Anything else becomes `_`. Longer names are cut.
pub fn clean_name(name: &str) -> String {
    name.chars()
        .take(MAX_NAME_LENGTH)
        .enumerate()
        .map(|(i, c)| match c {
            'a'..='z' | 'A'..='Z' | '_' => c,
            '0'..='9' | '-' if i > 0 => c,
            _ => '_',
        })
        .collect()
}

/// Document ids follow the entity name rules, but also keep `.` past the first character.
pub fn clean_id(id: &str) -> String {
    id.chars()
        .take(MAX_NAME_LENGTH)
        .enumerate()
        .map(|(i, c)| match c {
            'a'..='z' | 'A'..='Z' | '_' => c,
            '0'..='9' | '-' | '.' if i > 0 => c,
            _ => '_',
        })
        .collect()
}

/// The entity kinds, in the order the document searches its libraries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityType {
    Animation,
    AnimationClip,
    Camera,
    Controller,
    Effect,
    Emitter,
    ForceField,
    Geometry,
    Image,
    Light,
    Material,
    SceneNode,
    PhysicsScene,
    PhysicsMaterial,
    PhysicsModel,
    PhysicsRigidBody,
    PhysicsRigidConstraint,
}

impl EntityType {
    /// Prefix of generated ids.
    pub fn base_id(&self) -> &'static str {
        match self {
            EntityType::Animation => "animation",
            EntityType::AnimationClip => "animation_clip",
            EntityType::Camera => "camera",
            EntityType::Controller => "controller",
            EntityType::Effect => "effect",
            EntityType::Emitter => "emitter",
            EntityType::ForceField => "force_field",
            EntityType::Geometry => "geometry",
            EntityType::Image => "image",
            EntityType::Light => "light",
            EntityType::Material => "material",
            EntityType::SceneNode => "visual_scene",
            EntityType::PhysicsScene => "physics_scene",
            EntityType::PhysicsMaterial => "physics_material",
            EntityType::PhysicsModel => "physics_model",
            EntityType::PhysicsRigidBody => "rigid_body",
            EntityType::PhysicsRigidConstraint => "rigid_constraint",
        }
    }
}

pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

pub trait Entity: AsAny + Debug + 'static {
    fn create(document: &Document) -> Self
    where
        Self: Sized;

    fn entity_type(&self) -> EntityType;

    fn core(&self) -> &EntityCore;

    fn core_mut(&mut self) -> &mut EntityCore;
}

impl dyn Entity {
    pub fn downcast_ref<T: Entity>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Entity>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }

    pub fn is<T: Entity>(&self) -> bool {
        self.as_any().is::<T>()
    }
}

/// Allocates an entity of type `T` bound to `document`, outside of any library.
pub fn new_entity<T: Entity>(document: &Document) -> Rc<RefCell<T>> {
    let entity = Rc::new(RefCell::new(T::create(document)));
    let this: EntityRc = entity.clone();
    entity.borrow_mut().core_mut().this = Some(Rc::downgrade(&this));
    entity
}

/// Clones `source` into `target`, or into a new entity of `document` when there is no target.
/// The clone keeps its own id.
pub fn clone_entity<T: Entity + Parameterized>(
    source: &T,
    target: Option<Rc<RefCell<T>>>,
    document: &Document,
) -> Rc<RefCell<T>> {
    let target = target.unwrap_or_else(|| new_entity::<T>(document));
    source.clone_to(&mut target.borrow_mut());
    target.borrow().core().flags().set_dirty();
    target
}

/// Compares an entity handle with a typed one without borrowing either.
pub fn same_entity<T: Entity>(entity: &EntityRc, typed: &Rc<RefCell<T>>) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(entity), Rc::as_ptr(typed))
}

/// State every entity shares: identity, name, note, asset and the extra tree.
#[derive(Debug, Parameterized)]
pub struct EntityCore {
    trackable: Trackable,
    flags: ObjectFlags,
    document: WeakDocument,
    this: Option<WeakEntity>,
    entity_type: EntityType,
    dae_id: String,
    in_library: bool,
    #[parameter]
    name: String,
    #[parameter]
    note: String,
    #[parameter(child)]
    asset: Child<Asset>,
    #[parameter(child)]
    extra: Extra,
}

impl EntityCore {
    pub fn new(document: &Document, entity_type: EntityType) -> Self {
        Self::detached(document.downgrade(), entity_type)
    }

    /// A core for entities owned by another entity rather than by a library.
    pub(crate) fn detached(document: WeakDocument, entity_type: EntityType) -> Self {
        Self {
            trackable: Trackable::new(),
            flags: ObjectFlags::default(),
            document,
            this: None,
            entity_type,
            dae_id: String::new(),
            in_library: false,
            name: String::new(),
            note: String::new(),
            asset: Child::empty(),
            extra: Extra::new(),
        }
    }

    pub fn trackable(&self) -> &Trackable {
        &self.trackable
    }

    pub fn flags(&self) -> &ObjectFlags {
        &self.flags
    }

    pub fn document(&self) -> Option<Document> {
        self.document.upgrade()
    }

    pub(crate) fn weak_document(&self) -> &WeakDocument {
        &self.document
    }

    /// The shared handle of the entity owning this core.
    pub fn this(&self) -> Option<EntityRc> {
        self.this.as_ref().and_then(Weak::upgrade)
    }

    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    pub fn dae_id(&self) -> &str {
        &self.dae_id
    }

    /// Cleans `id`. Inside a library the id is also made unique and the document index follows.
    pub fn set_dae_id(&mut self, id: &str) {
        let id = clean_id(id);
        let indexed = match (self.in_library, self.document.upgrade(), &self.this) {
            (true, Some(document), Some(this)) => {
                Some(document.reindex_entity(&self.dae_id, &id, self.entity_type, this.clone()))
            }
            _ => None,
        };

        self.dae_id = indexed.unwrap_or(id);
        self.flags.set_dirty();
    }

    pub fn find_dae_id(&self, id: &str) -> bool {
        self.dae_id == id
    }

    pub fn is_in_library(&self) -> bool {
        self.in_library
    }

    pub(crate) fn attach_to_library(&mut self, id: String) {
        self.dae_id = id;
        self.in_library = true;
    }

    pub(crate) fn detach_from_library(&mut self) {
        self.in_library = false;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = clean_name(name);
        self.flags.set_dirty();
    }

    pub fn note(&self) -> &str {
        &self.note
    }

    pub fn has_note(&self) -> bool {
        !self.note.is_empty()
    }

    pub fn set_note(&mut self, note: &str) {
        self.note = note.to_string();
        self.flags.set_dirty();
    }

    pub fn asset(&self) -> Option<&Asset> {
        self.asset.get()
    }

    /// Creates the asset on first access.
    pub fn asset_mut(&mut self) -> &mut Asset {
        self.asset.get_or_insert_with(Asset::default)
    }

    /// The asset describing this entity: its own, or the document's.
    pub fn hierarchical_asset(&self) -> Option<Asset> {
        match self.asset.get() {
            Some(asset) => Some(asset.clone()),
            None => self.document().map(|document| document.asset()),
        }
    }

    pub fn extra(&self) -> &Extra {
        &self.extra
    }

    pub fn extra_mut(&mut self) -> &mut Extra {
        &mut self.extra
    }
}

impl Drop for EntityCore {
    fn drop(&mut self) {
        self.trackable.release(Some(&self.dae_id));

        if self.in_library {
            if let Some(document) = self.document.upgrade() {
                document.unindex_entity(&self.dae_id);
            }
        }
    }
}
