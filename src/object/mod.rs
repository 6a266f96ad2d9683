//! Object identity, the tracker ledger and the coalesced mutation flags shared by every node of
//! the document graph.

use log::warn;
use std::cell::{Cell, RefCell};
use std::fmt::{Debug, Formatter};
use std::rc::Weak;
use std::sync::atomic::{AtomicU64, Ordering};


/// Process-unique identity of a graph object. Trackers are keyed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    pub fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        ObjectId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// What an observer learns about an object that is going away. The object itself is already
/// torn down, so only the facts captured here are available.
#[derive(Debug, Clone, Copy)]
pub struct Released<'a> {
    pub id: ObjectId,
    /// The last document id of the released object, if it had one.
    pub dae_id: Option<&'a str>,
}

/// Observer side of the ledger: anything that holds a weak back-reference to a [`Trackable`].
pub trait Tracker {
    fn tracker_id(&self) -> ObjectId;

    /// Called exactly once per tracked object when it is released. Other observers may or may not
    /// have been notified yet.
    fn on_object_released(&self, released: &Released<'_>);
}

/// Target side of the ledger: the set of trackers to notify when the owning object dies.
pub struct Trackable {
    id: ObjectId,
    trackers: RefCell<Vec<(ObjectId, Weak<dyn Tracker>)>>,
    released: Cell<bool>,
}

impl Trackable {
    pub fn new() -> Self {
        Self {
            id: ObjectId::next(),
            trackers: RefCell::new(Vec::new()),
            released: Cell::new(false),
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn track(&self, tracker_id: ObjectId, tracker: Weak<dyn Tracker>) {
        let mut trackers = self.trackers.borrow_mut();
        if trackers.iter().any(|(id, _)| *id == tracker_id) {
            debug_assert!(false, "{:?} is already tracking {:?}", tracker_id, self.id);
            warn!("{:?} is already tracking {:?}, ignoring", tracker_id, self.id);
            return;
        }

        trackers.push((tracker_id, tracker));
    }

    pub fn untrack(&self, tracker_id: ObjectId) {
        let mut trackers = self.trackers.borrow_mut();
        let Some(index) = trackers.iter().position(|(id, _)| *id == tracker_id) else {
            debug_assert!(false, "{:?} does not track {:?}", tracker_id, self.id);
            warn!("{:?} does not track {:?}, ignoring", tracker_id, self.id);
            return;
        };

        trackers.swap_remove(index);
    }

    pub fn is_tracked_by(&self, tracker_id: ObjectId) -> bool {
        self.trackers.borrow().iter().any(|(id, _)| *id == tracker_id)
    }

    pub fn tracker_count(&self) -> usize {
        self.trackers.borrow().len()
    }

    /// Notifies every remaining tracker and empties the set. Only the first call has an effect,
    /// so owners that know more about themselves (e.g. their document id) call this from their own
    /// `Drop` before the field-level drop gets a chance.
    pub fn release(&self, dae_id: Option<&str>) {
        if self.released.replace(true) {
            return;
        }

        // the set is taken out first: callbacks may untrack or track other objects.
        let trackers = std::mem::take(&mut *self.trackers.borrow_mut());
        let released = Released { id: self.id, dae_id };
        for (_, tracker) in trackers {
            // trackers that are themselves being dropped can't be upgraded and don't need to know.
            if let Some(tracker) = tracker.upgrade() {
                tracker.on_object_released(&released);
            }
        }
    }
}

impl Default for Trackable {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Trackable {
    fn drop(&mut self) {
        self.release(None);
    }
}

impl Debug for Trackable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trackable")
            .field("id", &self.id)
            .field("trackers", &self.tracker_count())
            .finish()
    }
}

/// Coalesced mutation markers. Setting them is idempotent, clearing is left to whoever consumes
/// them (typically an incremental exporter).
#[derive(Debug, Default)]
pub struct ObjectFlags {
    dirty: Cell<bool>,
    new_child: Cell<bool>,
}

impl ObjectFlags {
    pub fn set_dirty(&self) {
        self.dirty.set(true);
    }

    /// A structural change is also a change.
    pub fn set_new_child(&self) {
        self.new_child.set(true);
        self.dirty.set(true);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    pub fn has_new_child(&self) -> bool {
        self.new_child.get()
    }

    pub fn clear(&self) {
        self.dirty.set(false);
        self.new_child.set(false);
    }
}
