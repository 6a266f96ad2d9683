use crate::document::{Document, WeakDocument};
use crate::entity::uri::Uri;
use crate::entity::{EntityRc, WeakEntity, clean_id};
use crate::error::{ErrorCode, ErrorLevel};
use crate::external::Placeholder;
use crate::object::{ObjectFlags, ObjectId, Released, Tracker};
use crate::parameter::CloneParameter;
use crate::settings::ResolveOptions;
use log::{debug, trace, warn};
use std::cell::{Cell, RefCell};
use std::fmt::{Debug, Formatter};
use std::rc::{Rc, Weak};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionState {
    /// An id is known (or not), no entity is attached yet.
    Unresolved,
    /// A lookup is running; nested accesses see no entity.
    Resolving,
    Resolved,
    /// The last lookup failed. Nothing is retried until [`EntityReference::reset`] or a new
    /// uri/entity is set.
    Failed,
}

/// Lazy pointer-by-id to an entity, possibly living in another document reached through a
/// [`Placeholder`]. Clones of the handle share the same reference.
#[derive(Clone)]
pub struct EntityReference(Rc<ReferenceInner>);

struct ReferenceInner {
    id: ObjectId,
    flags: ObjectFlags,
    document: WeakDocument,
    resolving: Cell<bool>,
    state: RefCell<ReferenceState>,
}

#[derive(Default)]
struct ReferenceState {
    entity_id: String,
    entity: Option<TrackedEntity>,
    placeholder: Option<(ObjectId, Weak<Placeholder>)>,
    failed: bool,
}

struct TrackedEntity {
    /// `None` when the entity was busy and could not be asked to track us.
    object: Option<ObjectId>,
    entity: WeakEntity,
}

impl EntityReference {
    pub fn new(document: &Document) -> Self {
        Self::with_document(document.downgrade())
    }

    pub(crate) fn with_document(document: WeakDocument) -> Self {
        Self(Rc::new(ReferenceInner {
            id: ObjectId::next(),
            flags: ObjectFlags::default(),
            document,
            resolving: Cell::new(false),
            state: RefCell::new(ReferenceState::default()),
        }))
    }

    pub fn id(&self) -> ObjectId {
        self.0.id
    }

    pub fn flags(&self) -> &ObjectFlags {
        &self.0.flags
    }

    pub fn document(&self) -> Option<Document> {
        self.0.document.upgrade()
    }

    pub(crate) fn weak_document(&self) -> WeakDocument {
        self.0.document.clone()
    }

    pub fn ptr_eq(&self, other: &EntityReference) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn entity_id(&self) -> String {
        self.0.state.borrow().entity_id.clone()
    }

    pub fn placeholder(&self) -> Option<Rc<Placeholder>> {
        let state = self.0.state.borrow();
        state.placeholder.as_ref().and_then(|(_, placeholder)| placeholder.upgrade())
    }

    pub fn state(&self) -> ResolutionState {
        if self.0.resolving.get() {
            ResolutionState::Resolving
        } else if self.live_entity().is_some() {
            ResolutionState::Resolved
        } else if self.0.state.borrow().failed {
            ResolutionState::Failed
        } else {
            ResolutionState::Unresolved
        }
    }

    pub fn is_failed(&self) -> bool {
        self.state() == ResolutionState::Failed
    }

    /// Re-arms a failed reference so the next access looks again.
    pub fn reset(&self) {
        self.0.state.borrow_mut().failed = false;
    }

    /// `file#id`, the file part being the placeholder's absolute url when the target is external.
    pub fn uri(&self) -> String {
        let file = self
            .placeholder()
            .map(|placeholder| placeholder.file_url().display().to_string())
            .unwrap_or_default();

        let live_id = self
            .live_entity()
            .and_then(|entity| entity.try_borrow().ok().map(|e| e.core().dae_id().to_string()));
        let id = live_id.unwrap_or_else(|| self.entity_id());

        format!("{}#{}", file, id)
    }

    /// Points the reference at `uri`. The fragment becomes the (cleaned) target id; a file part is
    /// made absolute against the owning document and bound to that file's placeholder.
    pub fn set_uri(&self, uri: &str) {
        let uri = Uri::parse(uri);
        self.untrack_entity();
        {
            let mut state = self.0.state.borrow_mut();
            state.entity_id = clean_id(&uri.fragment);
            state.failed = false;
        }

        let placeholder = match (&uri.path, self.document()) {
            (Some(path), Some(document)) => {
                let url = document.make_absolute(path);
                // a uri naming the owning document's own file needs no placeholder
                if document.file_url().as_deref() == Some(url.as_path()) {
                    None
                } else {
                    Some(document.external_references().add_placeholder(&url))
                }
            }
            _ => None,
        };

        self.set_placeholder(placeholder);
        self.0.flags.set_dirty();
    }

    /// The target entity, resolving with the owning document's options on first access.
    pub fn entity(&self) -> Option<EntityRc> {
        let options = self
            .document()
            .map(|document| document.settings().resolve)
            .unwrap_or_default();
        self.entity_with(&options)
    }

    pub fn entity_with(&self, options: &ResolveOptions) -> Option<EntityRc> {
        if let Some(entity) = self.live_entity() {
            return Some(entity);
        }

        if self.0.resolving.get() || self.0.state.borrow().failed {
            return None;
        }

        self.0.resolving.set(true);
        let entity = self.load_entity(options);
        self.0.resolving.set(false);
        entity
    }

    /// Attaches `entity` directly, without any lookup. A target in a foreign document is reached
    /// through that document's placeholder, a target in the owning document needs none.
    pub fn set_entity(&self, entity: Option<&EntityRc>) {
        self.untrack_entity();

        let mut entity_document = None;
        if let Some(entity) = entity {
            self.track_entity(entity);
            entity_document = entity.try_borrow().ok().and_then(|e| e.core().document());
        }

        self.set_entity_document(entity_document);
        self.0.state.borrow_mut().failed = false;
        self.0.flags.set_new_child();
    }

    fn tracker(&self) -> Weak<dyn Tracker> {
        Rc::downgrade(&self.0) as Weak<dyn Tracker>
    }

    fn live_entity(&self) -> Option<EntityRc> {
        let state = self.0.state.borrow();
        state.entity.as_ref().and_then(|tracked| tracked.entity.upgrade())
    }

    fn track_entity(&self, entity: &EntityRc) {
        let mut object = None;
        let mut dae_id = None;
        match entity.try_borrow() {
            Ok(target) => {
                let trackable = target.core().trackable();
                trackable.track(self.0.id, self.tracker());
                object = Some(trackable.id());
                dae_id = Some(target.core().dae_id().to_string());
            }
            Err(_) => warn!("entity is busy, {:?} holds it untracked", self.0.id),
        }

        let mut state = self.0.state.borrow_mut();
        state.entity = Some(TrackedEntity {
            object,
            entity: Rc::downgrade(entity),
        });
        if let Some(dae_id) = dae_id {
            state.entity_id = dae_id;
        }
    }

    fn untrack_entity(&self) {
        let tracked = self.0.state.borrow_mut().entity.take();
        if let Some(tracked) = tracked {
            untrack(self.0.id, &tracked);
        }
    }

    /// Points at `entity_id` inside the document `placeholder` stands for. A placeholder of
    /// another document is rebound through this reference's own manager.
    fn set_external(&self, entity_id: &str, placeholder: &Rc<Placeholder>) {
        self.untrack_entity();
        {
            let mut state = self.0.state.borrow_mut();
            state.entity_id = entity_id.to_string();
            state.failed = false;
        }

        let rebound = match self.document() {
            None => None,
            Some(own) if placeholder.is_owned_by(&own) => Some(placeholder.clone()),
            Some(own) => match placeholder.target(false) {
                Some(target) if target.ptr_eq(&own) => None,
                Some(target) => Some(own.external_references().add_placeholder_for(&target)),
                None if own.file_url().as_deref() == Some(placeholder.file_url()) => None,
                None if !placeholder.file_url().as_os_str().is_empty() => {
                    Some(own.external_references().add_placeholder(placeholder.file_url()))
                }
                None => {
                    debug!("'{}' lived in an unsaved document that is gone", entity_id);
                    self.0.state.borrow_mut().failed = true;
                    None
                }
            },
        };

        self.set_placeholder(rebound);
        self.0.flags.set_dirty();
    }

    fn set_entity_document(&self, document: Option<Document>) {
        let placeholder = match (document, self.document()) {
            (Some(target), Some(own)) if !target.ptr_eq(&own) => {
                Some(own.external_references().add_placeholder_for(&target))
            }
            _ => None,
        };

        self.set_placeholder(placeholder);
    }

    /// Swaps the placeholder binding. The dependent counts change together with the pointer, and
    /// a placeholder left without dependents is released.
    fn set_placeholder(&self, placeholder: Option<Rc<Placeholder>>) {
        let current = self.placeholder();
        let unchanged = match (&current, &placeholder) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            return;
        }

        if let Some(old) = current {
            self.0.state.borrow_mut().placeholder = None;
            detach_placeholder(self.0.id, &old, &self.0.document);
        }

        if let Some(new) = placeholder {
            new.add_external_reference(self.0.id);
            new.trackable().track(self.0.id, self.tracker());
            self.0.state.borrow_mut().placeholder = Some((new.trackable().id(), Rc::downgrade(&new)));
        }

        self.0.flags.set_new_child();
    }

    fn load_entity(&self, options: &ResolveOptions) -> Option<EntityRc> {
        let document = self.document()?;
        let entity_id = self.entity_id();

        let target = match self.placeholder() {
            None => Some(document.clone()),
            Some(placeholder) => placeholder.target(options.dereference),
        };

        let Some(target) = target else {
            if options.dereference {
                self.0.state.borrow_mut().failed = true;
                document.report(
                    ErrorLevel::Error,
                    ErrorCode::MissingUriTarget,
                    format!("the document holding '{}' is not available", self.uri()),
                );
            } else {
                trace!("deferring '{}', its document is not loaded", self.uri());
            }
            return None;
        };

        if entity_id.is_empty() {
            return None;
        }

        match target.find_entity(&entity_id) {
            Some(entity) => {
                self.track_entity(&entity);
                Some(entity)
            }
            None => {
                self.0.state.borrow_mut().failed = true;
                let message = format!("no entity '{}' in {}", entity_id, target.describe());
                if options.dereference {
                    document.report(ErrorLevel::Error, ErrorCode::InvalidUri, message);
                } else {
                    debug!("{}", message);
                }
                None
            }
        }
    }
}

fn untrack(tracker: ObjectId, tracked: &TrackedEntity) {
    let (Some(object), Some(entity)) = (tracked.object, tracked.entity.upgrade()) else {
        return;
    };

    match entity.try_borrow() {
        Ok(entity) if entity.core().trackable().id() == object => entity.core().trackable().untrack(tracker),
        _ => warn!("could not untrack {:?} from {:?}", tracker, object),
    }
}

fn detach_placeholder(tracker: ObjectId, placeholder: &Rc<Placeholder>, document: &WeakDocument) {
    placeholder.remove_external_reference(tracker);
    placeholder.trackable().untrack(tracker);
    if placeholder.external_reference_count() == 0 {
        if let Some(document) = document.upgrade() {
            document.external_references().release_placeholder(placeholder);
        }
    }
}

impl Tracker for ReferenceInner {
    fn tracker_id(&self) -> ObjectId {
        self.id
    }

    fn on_object_released(&self, released: &Released<'_>) {
        let Ok(mut state) = self.state.try_borrow_mut() else {
            warn!("{:?} is busy while {:?} is released", self.id, released.id);
            return;
        };

        if state.placeholder.as_ref().is_some_and(|(id, _)| *id == released.id) {
            state.placeholder = None;
        } else if state.entity.as_ref().is_some_and(|e| e.object == Some(released.id)) {
            // keep the last known id so the reference can find a reloaded target
            if let Some(dae_id) = released.dae_id {
                state.entity_id = dae_id.to_string();
            }
            state.entity = None;
        } else {
            debug_assert!(false, "{:?} was told about {:?} which it does not track", self.id, released.id);
        }
    }
}

impl Drop for ReferenceInner {
    fn drop(&mut self) {
        let state = std::mem::take(self.state.get_mut());
        if let Some(tracked) = &state.entity {
            untrack(self.id, tracked);
        }

        if let Some(placeholder) = state.placeholder.and_then(|(_, placeholder)| placeholder.upgrade()) {
            detach_placeholder(self.id, &placeholder, &self.document);
        }
    }
}

/// Copies the target: the live entity when there is one, otherwise the id together with the
/// document it is searched in.
impl CloneParameter for EntityReference {
    fn clone_parameter(&self, target: &mut Self) {
        if let Some(entity) = self.live_entity() {
            target.set_entity(Some(&entity));
            return;
        }

        match self.placeholder() {
            Some(placeholder) => target.set_external(&self.entity_id(), &placeholder),
            None => target.set_uri(&self.uri()),
        }
    }
}

impl Debug for EntityReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityReference")
            .field("id", &self.0.id)
            .field("uri", &self.uri())
            .field("state", &self.state())
            .finish()
    }
}
