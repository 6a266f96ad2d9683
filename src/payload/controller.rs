use super::geometry::Geometry;
use crate::entity::{EntityCore, EntityRc};
use crate::object::ObjectFlags;
use crate::parameter::{Animatable, Child, ChildList, CloneParameter, Parameterized, Spawn, Tracked};
use glam::Mat4;
use log::warn;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// What a controller deforms: a geometry, or another controller in a chain ending at one.
#[derive(Debug, Clone)]
pub enum BaseTarget {
    Geometry(Rc<RefCell<Geometry>>),
    Controller(Rc<RefCell<Controller>>),
}

impl BaseTarget {
    pub fn entity(&self) -> EntityRc {
        match self {
            BaseTarget::Geometry(geometry) => geometry.clone(),
            BaseTarget::Controller(controller) => controller.clone(),
        }
    }

    /// Follows controller chains down to the geometry. Cycles and busy controllers yield `None`.
    pub fn base_geometry(&self) -> Option<Rc<RefCell<Geometry>>> {
        let mut visited: Vec<Rc<RefCell<Controller>>> = Vec::new();
        let mut current = self.clone();
        loop {
            match current {
                BaseTarget::Geometry(geometry) => return Some(geometry),
                BaseTarget::Controller(controller) => {
                    if visited.iter().any(|c| Rc::ptr_eq(c, &controller)) {
                        warn!("controller chain loops back onto itself");
                        return None;
                    }
                    let next = controller.try_borrow().ok()?.base_target()?;
                    visited.push(controller);
                    current = next;
                }
            }
        }
    }

    fn vertex_count(&self) -> Option<usize> {
        let geometry = self.base_geometry()?;
        let geometry = geometry.try_borrow().ok()?;
        geometry.mesh().map(|mesh| mesh.vertex_count())
    }

    fn downgrade(&self) -> WeakTarget {
        match self {
            BaseTarget::Geometry(geometry) => WeakTarget::Geometry(Rc::downgrade(geometry)),
            BaseTarget::Controller(controller) => WeakTarget::Controller(Rc::downgrade(controller)),
        }
    }
}

#[derive(Debug, Clone)]
enum WeakTarget {
    Geometry(Weak<RefCell<Geometry>>),
    Controller(Weak<RefCell<Controller>>),
}

/// Non-owning base target slot; empties itself when the target goes away.
#[derive(Debug, Clone, Default)]
struct TargetSlot(Option<WeakTarget>);

impl TargetSlot {
    fn get(&self) -> Option<BaseTarget> {
        match self.0.as_ref()? {
            WeakTarget::Geometry(geometry) => geometry.upgrade().map(BaseTarget::Geometry),
            WeakTarget::Controller(controller) => controller.upgrade().map(BaseTarget::Controller),
        }
    }

    fn set(&mut self, target: Option<&BaseTarget>) {
        self.0 = target.map(BaseTarget::downgrade);
    }
}

impl CloneParameter for TargetSlot {
    fn clone_parameter(&self, target: &mut Self) {
        target.0 = self.0.clone();
    }
}

#[derive(Debug, Parameterized)]
pub struct Controller {
    #[parameter(base)]
    core: EntityCore,
    #[parameter(child)]
    skin: Child<SkinController>,
    #[parameter(child)]
    morph: Child<MorphController>,
}

entity_payload!(Controller, Controller, |document| {
    skin: Child::empty(),
    morph: Child::empty(),
});

impl Controller {
    pub fn is_skin(&self) -> bool {
        self.skin.is_some()
    }

    pub fn is_morph(&self) -> bool {
        self.morph.is_some()
    }

    pub fn skin(&self) -> Option<&SkinController> {
        self.skin.get()
    }

    pub fn skin_mut(&mut self) -> Option<&mut SkinController> {
        self.skin.get_mut()
    }

    pub fn morph(&self) -> Option<&MorphController> {
        self.morph.get()
    }

    pub fn morph_mut(&mut self) -> Option<&mut MorphController> {
        self.morph.get_mut()
    }

    /// Turns this into a skin controller. A previous morph controller is released.
    pub fn create_skin_controller(&mut self) -> &mut SkinController {
        self.morph.take();
        self.skin.set(SkinController::default());
        self.core.flags().set_new_child();
        self.skin.get_or_insert_with(SkinController::default)
    }

    /// Turns this into a morph controller. A previous skin controller is released.
    pub fn create_morph_controller(&mut self) -> &mut MorphController {
        self.skin.take();
        self.morph.set(MorphController::default());
        self.core.flags().set_new_child();
        self.morph.get_or_insert_with(MorphController::default)
    }

    pub fn base_target(&self) -> Option<BaseTarget> {
        match (self.skin.get(), self.morph.get()) {
            (Some(skin), _) => skin.target(),
            (None, Some(morph)) => morph.base_target(),
            (None, None) => None,
        }
    }

    pub fn base_geometry(&self) -> Option<Rc<RefCell<Geometry>>> {
        self.base_target()?.base_geometry()
    }

    /// The last controller of the chain starting at `controller`, the one directly above the
    /// base geometry.
    pub fn base_geometry_controller(controller: &Rc<RefCell<Controller>>) -> Option<Rc<RefCell<Controller>>> {
        let mut parent = controller.clone();
        let mut visited: Vec<Rc<RefCell<Controller>>> = Vec::new();
        loop {
            let base = parent.try_borrow().ok()?.base_target()?;
            match base {
                BaseTarget::Geometry(_) => return Some(parent),
                BaseTarget::Controller(next) => {
                    if visited.iter().any(|c| Rc::ptr_eq(c, &next)) {
                        warn!("controller chain loops back onto itself");
                        return None;
                    }
                    visited.push(parent);
                    parent = next;
                }
            }
        }
    }
}

#[derive(Debug, Default, Parameterized)]
pub struct SkinController {
    flags: ObjectFlags,
    #[parameter(tracked)]
    target: TargetSlot,
    #[parameter]
    pub bind_shape_transform: Mat4,
    #[parameter]
    joints: Vec<String>,
}

impl SkinController {
    pub fn flags(&self) -> &ObjectFlags {
        &self.flags
    }

    pub fn target(&self) -> Option<BaseTarget> {
        self.target.get()
    }

    pub fn set_target(&mut self, target: Option<&BaseTarget>) {
        self.target.set(target);
        self.flags.set_new_child();
    }

    pub fn joints(&self) -> &[String] {
        &self.joints
    }

    pub fn add_joint(&mut self, joint: &str) {
        self.joints.push(joint.to_string());
        self.flags.set_new_child();
    }
}

impl Spawn for SkinController {
    fn spawn(&self) -> Self {
        SkinController::default()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MorphMethod {
    #[default]
    Normalized,
    Relative,
}

#[derive(Debug, Default, Parameterized)]
pub struct MorphController {
    flags: ObjectFlags,
    #[parameter]
    pub method: MorphMethod,
    #[parameter(tracked)]
    base_target: TargetSlot,
    #[parameter(list)]
    targets: ChildList<MorphTarget>,
}

impl MorphController {
    pub fn flags(&self) -> &ObjectFlags {
        &self.flags
    }

    pub fn base_target(&self) -> Option<BaseTarget> {
        self.base_target.get()
    }

    /// Sets the morphed entity. Targets that no longer match it are released; an entity that
    /// does not lead to a geometry clears the base and every target.
    pub fn set_base_target(&mut self, target: Option<&BaseTarget>) {
        match target.filter(|target| target.base_geometry().is_some()) {
            Some(target) => {
                self.base_target.set(Some(target));
                let base = target.vertex_count();
                self.targets.retain(|morph_target| {
                    let count = morph_target.geometry().map(BaseTarget::Geometry).and_then(|g| g.vertex_count());
                    base.is_some() && count == base
                });
            }
            None => {
                self.base_target.set(None);
                self.targets.clear();
            }
        }
        self.flags.set_new_child();
    }

    /// Whether `entity` has as many vertices as the base target.
    pub fn is_similar(&self, entity: &BaseTarget) -> bool {
        let Some(base) = self.base_target() else {
            return false;
        };
        match (base.vertex_count(), entity.vertex_count()) {
            (Some(base), Some(count)) => base == count,
            _ => false,
        }
    }

    pub fn targets(&self) -> &[MorphTarget] {
        &self.targets
    }

    pub fn target_mut(&mut self, index: usize) -> Option<&mut MorphTarget> {
        self.targets.get_mut(index)
    }

    /// Adds a target, unless a base is set and `geometry` does not match it.
    pub fn add_target(&mut self, geometry: &Rc<RefCell<Geometry>>, weight: f32) -> Option<&mut MorphTarget> {
        self.flags.set_new_child();
        if self.base_target().is_some() && !self.is_similar(&BaseTarget::Geometry(geometry.clone())) {
            return None;
        }

        let mut target = MorphTarget::default();
        target.geometry.set(Some(geometry));
        target.weight.set(weight);
        Some(self.targets.push(target))
    }

    /// Points target `index` at another geometry, under the same similarity rule as
    /// [`MorphController::add_target`].
    pub fn set_target_geometry(&mut self, index: usize, geometry: Option<&Rc<RefCell<Geometry>>>) -> bool {
        let accepted = match geometry {
            Some(geometry) => {
                self.base_target().is_none() || self.is_similar(&BaseTarget::Geometry(geometry.clone()))
            }
            None => true,
        };

        match self.targets.get_mut(index) {
            Some(target) if accepted => {
                target.geometry.set(geometry);
                self.flags.set_new_child();
                true
            }
            _ => false,
        }
    }

    pub fn release_target(&mut self, index: usize) -> Option<MorphTarget> {
        self.flags.set_dirty();
        self.targets.remove(index)
    }
}

impl Spawn for MorphController {
    fn spawn(&self) -> Self {
        MorphController::default()
    }
}

#[derive(Debug, Default, Parameterized)]
pub struct MorphTarget {
    #[parameter(tracked)]
    geometry: Tracked<RefCell<Geometry>>,
    #[parameter(animated)]
    weight: Animatable<f32>,
}

impl MorphTarget {
    pub fn geometry(&self) -> Option<Rc<RefCell<Geometry>>> {
        self.geometry.get()
    }

    pub fn weight(&self) -> f32 {
        self.weight.get()
    }

    pub fn set_weight(&mut self, weight: f32) {
        self.weight.set(weight);
    }

    /// The slot, for binding an animation through [`crate::document::Document::animate`].
    pub fn weight_mut(&mut self) -> &mut Animatable<f32> {
        &mut self.weight
    }
}

impl Spawn for MorphTarget {
    fn spawn(&self) -> Self {
        MorphTarget::default()
    }
}
