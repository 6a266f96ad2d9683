//! Placeholders for external documents and the per-document registry that owns them.

use crate::document::{Document, WeakDocument};
use crate::error::{ErrorCode, ErrorLevel};
use crate::object::{ObjectId, Trackable};
use crate::util::normalize_path;
use log::debug;
use std::cell::RefCell;
use std::fmt::{Debug, Formatter};
use std::path::{Path, PathBuf};
use std::rc::Rc;


enum PlaceholderTarget {
    /// Loaded on demand; the placeholder owns it.
    Loaded(Document),
    /// An already open document, referenced by identity.
    Linked(WeakDocument),
}

/// Stands in for an external document until somebody needs it. Shared by every entity reference
/// pointing into that document, and released with the last of them.
pub struct Placeholder {
    trackable: Trackable,
    owner: WeakDocument,
    file_url: PathBuf,
    target: RefCell<Option<PlaceholderTarget>>,
    dependents: RefCell<Vec<ObjectId>>,
}

impl Placeholder {
    fn new(owner: WeakDocument, file_url: PathBuf, target: Option<PlaceholderTarget>) -> Rc<Self> {
        Rc::new(Self {
            trackable: Trackable::new(),
            owner,
            file_url,
            target: RefCell::new(target),
            dependents: RefCell::new(Vec::new()),
        })
    }

    pub fn trackable(&self) -> &Trackable {
        &self.trackable
    }

    pub fn file_url(&self) -> &Path {
        &self.file_url
    }

    pub(crate) fn is_owned_by(&self, document: &Document) -> bool {
        self.owner.ptr_eq(&document.downgrade())
    }

    pub fn external_reference_count(&self) -> usize {
        self.dependents.borrow().len()
    }

    pub(crate) fn add_external_reference(&self, reference: ObjectId) {
        let mut dependents = self.dependents.borrow_mut();
        if !dependents.contains(&reference) {
            dependents.push(reference);
        }
    }

    pub(crate) fn remove_external_reference(&self, reference: ObjectId) {
        self.dependents.borrow_mut().retain(|id| *id != reference);
    }

    fn current_target(&self) -> Option<Document> {
        match &*self.target.borrow() {
            Some(PlaceholderTarget::Loaded(document)) => Some(document.clone()),
            Some(PlaceholderTarget::Linked(document)) => document.upgrade(),
            None => None,
        }
    }

    pub fn is_target_loaded(&self) -> bool {
        self.current_target().is_some()
    }

    fn targets(&self, document: &Document) -> bool {
        match &*self.target.borrow() {
            Some(PlaceholderTarget::Loaded(target)) => target.ptr_eq(document),
            Some(PlaceholderTarget::Linked(target)) => target.ptr_eq(&document.downgrade()),
            None => false,
        }
    }

    /// The cached document. With `force_load`, a missing one is loaded first; without it this
    /// never has side effects.
    pub fn target(&self, force_load: bool) -> Option<Document> {
        match self.current_target() {
            Some(document) => Some(document),
            None if force_load => self.load_target(),
            None => None,
        }
    }

    /// Runs the owning document's loader for the file url and caches the result. Failures are
    /// reported and yield `None`.
    pub fn load_target(&self) -> Option<Document> {
        let owner = self.owner.upgrade()?;
        debug!("loading external document {}", self.file_url.display());

        match owner.load_external(&self.file_url) {
            Ok(document) => {
                *self.target.borrow_mut() = Some(PlaceholderTarget::Loaded(document.clone()));
                Some(document)
            }
            Err(error) => {
                owner.report(
                    ErrorLevel::Warning,
                    ErrorCode::ExternalLoadFailed,
                    format!("{}: {}", self.file_url.display(), error),
                );
                None
            }
        }
    }

    /// Lets go of a loaded target. References into it degrade to their ids.
    pub fn unload_target(&self) {
        let previous = self.target.borrow_mut().take();
        drop(previous);
    }
}

impl Debug for Placeholder {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Placeholder")
            .field("file_url", &self.file_url)
            .field("loaded", &self.is_target_loaded())
            .field("dependents", &self.external_reference_count())
            .finish()
    }
}

/// The placeholders of one document, keyed by absolute file url or by document identity.
pub struct ExternalReferenceManager {
    document: WeakDocument,
    placeholders: RefCell<Vec<Rc<Placeholder>>>,
}

impl ExternalReferenceManager {
    pub(crate) fn new(document: WeakDocument) -> Self {
        Self {
            document,
            placeholders: RefCell::new(Vec::new()),
        }
    }

    pub fn placeholder_count(&self) -> usize {
        self.placeholders.borrow().len()
    }

    pub fn placeholder(&self, index: usize) -> Option<Rc<Placeholder>> {
        self.placeholders.borrow().get(index).cloned()
    }

    pub fn placeholders(&self) -> Vec<Rc<Placeholder>> {
        self.placeholders.borrow().clone()
    }

    pub fn find_placeholder(&self, file_url: &Path) -> Option<Rc<Placeholder>> {
        let file_url = normalize_path(file_url);
        self.placeholders
            .borrow()
            .iter()
            .find(|placeholder| placeholder.file_url == file_url)
            .cloned()
    }

    pub fn add_placeholder(&self, file_url: &Path) -> Rc<Placeholder> {
        if let Some(placeholder) = self.find_placeholder(file_url) {
            return placeholder;
        }

        let file_url = normalize_path(file_url);
        debug!("adding placeholder for {}", file_url.display());
        let placeholder = Placeholder::new(self.document.clone(), file_url, None);
        self.placeholders.borrow_mut().push(placeholder.clone());
        placeholder
    }

    pub fn find_placeholder_for(&self, document: &Document) -> Option<Rc<Placeholder>> {
        self.placeholders
            .borrow()
            .iter()
            .find(|placeholder| placeholder.targets(document))
            .cloned()
    }

    pub fn add_placeholder_for(&self, document: &Document) -> Rc<Placeholder> {
        if let Some(placeholder) = self.find_placeholder_for(document) {
            return placeholder;
        }

        let file_url = document.file_url().unwrap_or_default();
        debug!("adding placeholder for open document {}", document.describe());
        let placeholder = Placeholder::new(
            self.document.clone(),
            file_url,
            Some(PlaceholderTarget::Linked(document.downgrade())),
        );
        self.placeholders.borrow_mut().push(placeholder.clone());
        placeholder
    }

    pub fn release_placeholder(&self, placeholder: &Rc<Placeholder>) {
        let released = {
            let mut placeholders = self.placeholders.borrow_mut();
            placeholders
                .iter()
                .position(|p| Rc::ptr_eq(p, placeholder))
                .map(|index| placeholders.remove(index))
        };

        if let Some(released) = released {
            debug!("releasing placeholder for {}", released.file_url.display());
        }
    }
}

impl Debug for ExternalReferenceManager {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.placeholders.borrow().iter()).finish()
    }
}
