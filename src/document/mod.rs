//! The document: entity libraries, the id index, external references and document-wide state.

use crate::animated::Animated;
use crate::entity::{
    Asset, EntityRc, EntityReference, EntityType, WeakEntity, new_entity, same_entity,
};
use crate::error::{DocumentError, ErrorCode, ErrorLevel, Report, log_report};
use crate::external::ExternalReferenceManager;
use crate::extra::{ENode, Extra};
use crate::object::ObjectFlags;
use crate::parameter::{Animatable, AnimatableValue};
use crate::payload::{PhysicsScene, SceneNode};
use crate::settings::DocumentSettings;
use crate::util::make_absolute;
use log::{debug, trace};
use std::cell::{Cell, Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};

pub mod library;

#[cfg(test)]
mod tests;

pub use library::{Libraries, Library, LibraryEntity};

/// A named group of scene objects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layer {
    pub name: String,
    pub objects: Vec<String>,
}

/// Shared handle to a document. Clones point at the same document.
#[derive(Clone)]
pub struct Document(Rc<DocumentInner>);

/// Non-owning handle, held by everything that lives inside a document.
#[derive(Clone, Default)]
pub struct WeakDocument(Weak<DocumentInner>);

// fields drop in declaration order: placeholders (and loaded externals) first, then the
// document's own references, then the entities they point at
struct DocumentInner {
    external_references: ExternalReferenceManager,
    visual_scene_root: EntityReference,
    physics_scene_roots: RefCell<Vec<EntityReference>>,
    libraries: Libraries,
    index: RefCell<HashMap<String, WeakEntity>>,
    flags: ObjectFlags,
    settings: RefCell<DocumentSettings>,
    file_url: RefCell<Option<PathBuf>>,
    asset: RefCell<Asset>,
    extra: RefCell<Extra>,
    layers: RefCell<Vec<Layer>>,
    start_time: Cell<f32>,
    end_time: Cell<f32>,
    animated_values: RefCell<Vec<Weak<Animated>>>,
    evaluating: Cell<bool>,
}

impl WeakDocument {
    pub fn upgrade(&self) -> Option<Document> {
        self.0.upgrade().map(Document)
    }

    pub fn ptr_eq(&self, other: &WeakDocument) -> bool {
        Weak::ptr_eq(&self.0, &other.0)
    }
}

impl Document {
    pub fn new() -> Self {
        Self::with_settings(DocumentSettings::default())
    }

    pub fn with_settings(settings: DocumentSettings) -> Self {
        Self(Rc::new_cyclic(|weak| {
            let document = WeakDocument(weak.clone());
            DocumentInner {
                external_references: ExternalReferenceManager::new(document.clone()),
                visual_scene_root: EntityReference::with_document(document),
                physics_scene_roots: RefCell::new(Vec::new()),
                libraries: Libraries::default(),
                index: RefCell::new(HashMap::new()),
                flags: ObjectFlags::default(),
                settings: RefCell::new(settings),
                file_url: RefCell::new(None),
                asset: RefCell::new(Asset::default()),
                extra: RefCell::new(Extra::new()),
                layers: RefCell::new(Vec::new()),
                start_time: Cell::new(0.0),
                end_time: Cell::new(0.0),
                animated_values: RefCell::new(Vec::new()),
                evaluating: Cell::new(false),
            }
        }))
    }

    pub fn downgrade(&self) -> WeakDocument {
        WeakDocument(Rc::downgrade(&self.0))
    }

    pub fn ptr_eq(&self, other: &Document) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn flags(&self) -> &ObjectFlags {
        &self.0.flags
    }

    pub fn settings(&self) -> DocumentSettings {
        self.0.settings.borrow().clone()
    }

    pub fn set_settings(&self, settings: DocumentSettings) {
        *self.0.settings.borrow_mut() = settings;
    }

    pub(crate) fn inherit_settings(&self, parent: &DocumentSettings) {
        self.0.settings.borrow_mut().inherit(parent);
    }

    /// Logs the report and hands it to the configured sink.
    pub fn report(&self, level: ErrorLevel, code: ErrorCode, message: String) {
        let report = Report { level, code, message };
        log_report(&report);

        let sink = self.0.settings.borrow().sink.clone();
        if let Some(sink) = sink {
            sink.report(&report);
        }
    }

    pub fn file_url(&self) -> Option<PathBuf> {
        self.0.file_url.borrow().clone()
    }

    /// Stores `url` made absolute against the current working directory.
    pub fn set_file_url(&self, url: &Path) {
        let url = make_absolute(None, url);
        debug!("document file url is now {}", url.display());
        *self.0.file_url.borrow_mut() = Some(url);
    }

    /// Resolves `path` against the directory of this document's file.
    pub fn make_absolute(&self, path: &Path) -> PathBuf {
        make_absolute(self.0.file_url.borrow().as_deref(), path)
    }

    /// A short name for messages.
    pub fn describe(&self) -> String {
        match &*self.0.file_url.borrow() {
            Some(url) => url.display().to_string(),
            None => "<unsaved document>".to_string(),
        }
    }

    pub fn external_references(&self) -> &ExternalReferenceManager {
        &self.0.external_references
    }

    pub fn libraries(&self) -> &Libraries {
        &self.0.libraries
    }

    pub fn library<T: LibraryEntity>(&self) -> &Library<T> {
        T::library(&self.0.libraries)
    }

    pub fn asset(&self) -> Asset {
        self.0.asset.borrow().clone()
    }

    pub fn asset_mut(&self) -> RefMut<'_, Asset> {
        self.0.flags.set_dirty();
        self.0.asset.borrow_mut()
    }

    pub fn extra(&self) -> Ref<'_, Extra> {
        self.0.extra.borrow()
    }

    pub fn extra_mut(&self) -> RefMut<'_, Extra> {
        self.0.extra.borrow_mut()
    }

    pub fn start_time(&self) -> f32 {
        self.0.start_time.get()
    }

    pub fn set_start_time(&self, time: f32) {
        self.0.start_time.set(time);
        self.0.flags.set_dirty();
    }

    pub fn end_time(&self) -> f32 {
        self.0.end_time.get()
    }

    pub fn set_end_time(&self, time: f32) {
        self.0.end_time.set(time);
        self.0.flags.set_dirty();
    }

    /// Creates an entity in its library, with a generated unique id.
    pub fn add_entity<T: LibraryEntity>(&self) -> Rc<RefCell<T>> {
        let entity = new_entity::<T>(self);
        self.insert_entity(entity.clone());
        entity
    }

    /// Moves a free entity of this document into its library. Its id is kept when it is still
    /// free, suffixed otherwise, and generated when empty.
    pub fn insert_entity<T: LibraryEntity>(&self, entity: Rc<RefCell<T>>) {
        {
            let mut target = entity.borrow_mut();
            let core = target.core_mut();
            debug_assert!(!core.is_in_library(), "{} is already in a library", core.dae_id());
            debug_assert!(
                core.weak_document().ptr_eq(&self.downgrade()),
                "{} belongs to another document",
                core.dae_id()
            );

            let id = self.unique_id(core.dae_id(), core.entity_type());
            let this: EntityRc = entity.clone();
            self.0.index.borrow_mut().insert(id.clone(), Rc::downgrade(&this));
            trace!("indexed {}", id);
            core.attach_to_library(id);
        }

        self.library::<T>().push(entity);
    }

    /// Removes the entity from its library. It is dropped unless somebody else holds it.
    pub fn release_entity<T: LibraryEntity>(&self, entity: &Rc<RefCell<T>>) -> bool {
        let Some(removed) = self.library::<T>().remove(entity) else {
            return false;
        };

        if let Ok(mut target) = removed.try_borrow_mut() {
            let core = target.core_mut();
            let mut index = self.0.index.borrow_mut();
            if index.get(core.dae_id()).is_some_and(|e| std::ptr::addr_eq(e.as_ptr(), Rc::as_ptr(&removed))) {
                index.remove(core.dae_id());
            }
            core.detach_from_library();
        }

        drop(removed);
        true
    }

    /// Looks `id` up in the combined index of every library.
    pub fn find_entity(&self, id: &str) -> Option<EntityRc> {
        self.0.index.borrow().get(id).and_then(Weak::upgrade)
    }

    pub fn find<T: LibraryEntity>(&self, id: &str) -> Option<Rc<RefCell<T>>> {
        let entity = self.find_entity(id)?;
        self.typed(&entity)
    }

    /// The typed handle of `entity`, when it lives in the `T` library.
    pub fn typed<T: LibraryEntity>(&self, entity: &EntityRc) -> Option<Rc<RefCell<T>>> {
        self.library::<T>()
            .entities()
            .into_iter()
            .find(|typed| same_entity(entity, typed))
    }

    fn unique_id(&self, requested: &str, entity_type: EntityType) -> String {
        let index = self.0.index.borrow();
        let taken = |id: &str| index.get(id).is_some_and(|e| e.strong_count() > 0);

        if !requested.is_empty() && !taken(requested) {
            return requested.to_string();
        }

        let mut n = 1;
        loop {
            let candidate = if requested.is_empty() {
                format!("{}{}", entity_type.base_id(), n)
            } else {
                format!("{}_{}", requested, n)
            };
            if !taken(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Moves an indexed entity from `old` to a unique form of `requested`. Never borrows entities.
    pub(crate) fn reindex_entity(
        &self,
        old: &str,
        requested: &str,
        entity_type: EntityType,
        entity: WeakEntity,
    ) -> String {
        {
            let mut index = self.0.index.borrow_mut();
            if index.get(old).is_some_and(|e| e.ptr_eq(&entity)) {
                index.remove(old);
            }
        }

        let id = self.unique_id(requested, entity_type);
        self.0.index.borrow_mut().insert(id.clone(), entity);
        id
    }

    /// Drops the index entry of a dead entity. Live entries are left alone, the id may have been
    /// taken over.
    pub(crate) fn unindex_entity(&self, id: &str) {
        let Ok(mut index) = self.0.index.try_borrow_mut() else {
            return;
        };
        if index.get(id).is_some_and(|e| e.strong_count() == 0) {
            index.remove(id);
        }
    }

    pub fn visual_scene_root(&self) -> EntityReference {
        self.0.visual_scene_root.clone()
    }

    /// Creates a visual scene. The first one also becomes the instantiated scene.
    pub fn add_visual_scene(&self) -> Rc<RefCell<SceneNode>> {
        let scene = self.add_entity::<SceneNode>();
        let root = &self.0.visual_scene_root;
        if root.entity_id().is_empty() && root.placeholder().is_none() {
            let entity: EntityRc = scene.clone();
            root.set_entity(Some(&entity));
        }
        scene
    }

    pub fn visual_scene_instance(&self) -> Option<Rc<RefCell<SceneNode>>> {
        let entity = self.0.visual_scene_root.entity()?;
        self.typed(&entity)
    }

    pub fn physics_scene_roots(&self) -> Vec<EntityReference> {
        self.0.physics_scene_roots.borrow().clone()
    }

    /// Appends an empty physics scene instance.
    pub fn add_physics_scene_instance_reference(&self) -> EntityReference {
        let reference = EntityReference::new(self);
        self.0.physics_scene_roots.borrow_mut().push(reference.clone());
        self.0.flags.set_new_child();
        reference
    }

    /// Creates a physics scene and instantiates it.
    pub fn add_physics_scene(&self) -> Rc<RefCell<PhysicsScene>> {
        let scene = self.add_entity::<PhysicsScene>();
        let entity: EntityRc = scene.clone();
        self.add_physics_scene_instance_reference().set_entity(Some(&entity));
        scene
    }

    pub fn physics_scene_instance(&self, index: usize) -> Option<Rc<RefCell<PhysicsScene>>> {
        let reference = self.0.physics_scene_roots.borrow().get(index).cloned()?;
        let entity = reference.entity()?;
        self.typed(&entity)
    }

    pub fn layers(&self) -> Vec<Layer> {
        self.0.layers.borrow().clone()
    }

    pub fn add_layer(&self, name: &str, objects: impl IntoIterator<Item = String>) {
        self.0.layers.borrow_mut().push(Layer {
            name: name.to_string(),
            objects: objects.into_iter().collect(),
        });
        self.0.flags.set_new_child();
    }

    pub fn find_layer(&self, name: &str) -> Option<Layer> {
        self.0.layers.borrow().iter().find(|layer| layer.name == name).cloned()
    }

    pub fn release_layer(&self, name: &str) -> bool {
        let mut layers = self.0.layers.borrow_mut();
        let Some(index) = layers.iter().position(|layer| layer.name == name) else {
            return false;
        };
        layers.remove(index);
        self.0.flags.set_dirty();
        true
    }

    /// Adds `animated` to the values `set_current_time` evaluates. Values without components are
    /// refused.
    pub fn register_animated_value(&self, animated: &Rc<Animated>) -> bool {
        if animated.value_count() == 0 {
            debug!("refusing to register {:?}, it has no components", animated.id());
            return false;
        }

        let mut values = self.0.animated_values.borrow_mut();
        values.retain(|value| value.strong_count() > 0);
        if !values.iter().any(|value| value.as_ptr() == Rc::as_ptr(animated)) {
            values.push(Rc::downgrade(animated));
        }
        true
    }

    /// Binds `value` to an animation, registering the binding when it is new.
    pub fn animate<T: AnimatableValue>(&self, value: &mut Animatable<T>) -> Rc<Animated> {
        let (animated, created) = value.animate();
        if created {
            self.register_animated_value(&animated);
        }
        animated
    }

    /// [`Document::animate`] for the custom animation of an extra node.
    pub fn animate_node(&self, node: &mut ENode) -> Rc<Animated> {
        let (animated, created) = node.animate();
        if created {
            self.register_animated_value(&animated);
        }
        animated
    }

    pub fn unregister_animated_value(&self, animated: &Rc<Animated>) -> bool {
        let mut values = self.0.animated_values.borrow_mut();
        let before = values.len();
        values.retain(|value| value.strong_count() > 0 && value.as_ptr() != Rc::as_ptr(animated));
        values.len() != before
    }

    pub fn animated_value_count(&self) -> usize {
        self.0
            .animated_values
            .borrow()
            .iter()
            .filter(|value| value.strong_count() > 0)
            .count()
    }

    /// Evaluates every registered value at `time`, then every loaded external document.
    pub fn set_current_time(&self, time: f32) {
        if self.0.evaluating.replace(true) {
            return;
        }

        let values = self
            .0
            .animated_values
            .borrow()
            .iter()
            .filter_map(Weak::upgrade)
            .collect::<Vec<_>>();
        trace!("evaluating {} animated values at {}", values.len(), time);
        for value in values {
            value.evaluate(time);
        }

        for placeholder in self.0.external_references.placeholders() {
            if let Some(target) = placeholder.target(false) {
                target.set_current_time(time);
            }
        }

        self.0.evaluating.set(false);
    }

    /// Runs the configured loader for an external document. The result inherits this document's
    /// settings.
    pub(crate) fn load_external(&self, url: &Path) -> Result<Document, DocumentError> {
        let settings = self.settings();
        let loader = settings
            .loader
            .clone()
            .ok_or_else(|| DocumentError::NoLoader(url.to_path_buf()))?;

        let document = loader.load(url)?;
        document.inherit_settings(&settings);
        if document.file_url().is_none() {
            document.set_file_url(url);
        }
        Ok(document)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for Document {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("file_url", &self.file_url())
            .field("entities", &self.0.libraries.entity_count())
            .field("placeholders", &self.0.external_references.placeholder_count())
            .finish()
    }
}

impl Debug for WeakDocument {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.upgrade() {
            Some(document) => write!(f, "WeakDocument({})", document.describe()),
            None => f.write_str("WeakDocument(<released>)"),
        }
    }
}
