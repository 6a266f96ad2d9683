use super::scene::EntityInstance;
use crate::document::{Document, WeakDocument};
use crate::entity::{Entity, EntityCell, EntityCore, EntityRc, EntityType, clone_entity, new_entity};
use crate::parameter::{Animatable, ChildList, CloneParameter, Parameterized, Spawn, Tracked};
use glam::Vec3;
use log::warn;
use std::cell::RefCell;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Parameterized)]
pub struct RigidBodyParameters {
    #[parameter]
    pub dynamic: bool,
    #[parameter]
    pub mass: f32,
    #[parameter]
    pub mass_frame_translate: Vec3,
    #[parameter]
    pub mass_frame_rotate_axis: Vec3,
    #[parameter]
    pub mass_frame_rotate_angle: f32,
    #[parameter]
    pub inertia: Vec3,
    #[parameter]
    pub density: f32,
    #[parameter]
    pub density_more_accurate: bool,
    #[parameter]
    pub inertia_accurate: bool,
}

impl Default for RigidBodyParameters {
    fn default() -> Self {
        Self {
            dynamic: true,
            mass: 1.0,
            mass_frame_translate: Vec3::ZERO,
            mass_frame_rotate_axis: Vec3::X,
            mass_frame_rotate_angle: 0.0,
            inertia: Vec3::ONE,
            density: 1.0,
            density_more_accurate: false,
            inertia_accurate: false,
        }
    }
}

impl Spawn for RigidBodyParameters {
    fn spawn(&self) -> Self {
        RigidBodyParameters::default()
    }
}

impl CloneParameter for RigidBodyParameters {
    fn clone_parameter(&self, target: &mut Self) {
        self.clone_to(target);
    }
}

#[derive(Debug, Parameterized)]
pub struct RigidBody {
    #[parameter(base)]
    core: EntityCore,
    #[parameter(child)]
    parameters: RigidBodyParameters,
}

entity_payload!(RigidBody, PhysicsRigidBody, |document| {
    parameters: RigidBodyParameters::default(),
});

impl RigidBody {
    pub fn parameters(&self) -> &RigidBodyParameters {
        &self.parameters
    }

    pub fn parameters_mut(&mut self) -> &mut RigidBodyParameters {
        self.core.flags().set_dirty();
        &mut self.parameters
    }
}

#[derive(Debug, Parameterized)]
pub struct RigidConstraint {
    #[parameter(base)]
    core: EntityCore,
    #[parameter]
    pub enabled: bool,
    #[parameter]
    pub interpenetrate: bool,
    /// Ids of the attached rigid bodies.
    #[parameter]
    pub ref_attachment: String,
    #[parameter]
    pub attachment: String,
}

entity_payload!(RigidConstraint, PhysicsRigidConstraint, |document| {
    enabled: true,
    interpenetrate: false,
    ref_attachment: String::new(),
    attachment: String::new(),
});

/// Entities owned by another entity instead of a library. They keep their shared handles so
/// instances can reference them.
#[derive(Debug)]
struct EntityList<T> {
    document: WeakDocument,
    entities: Vec<Rc<RefCell<T>>>,
}

impl<T: Entity> EntityList<T> {
    fn new(document: WeakDocument) -> Self {
        Self {
            document,
            entities: Vec::new(),
        }
    }

    fn find(&self, id: &str) -> Option<Rc<RefCell<T>>> {
        self.entities
            .iter()
            .find(|entity| entity.try_borrow().is_ok_and(|e| e.core().find_dae_id(id)))
            .cloned()
    }
}

impl<T: Entity + Parameterized> CloneParameter for EntityList<T> {
    /// Every entity is cloned into a new one of the target's document.
    fn clone_parameter(&self, target: &mut Self) {
        let Some(document) = target.document.upgrade() else {
            warn!("cannot clone owned entities into a released document");
            return;
        };

        target.entities = self
            .entities
            .iter()
            .filter_map(|entity| {
                let source = entity.try_borrow().ok()?;
                let clone = clone_entity(&*source, None, &document);
                let id = source.core().dae_id().to_string();
                clone.borrow_mut().core_mut().set_dae_id(&id);
                Some(clone)
            })
            .collect();
    }
}

#[derive(Debug, Parameterized)]
pub struct PhysicsModel {
    #[parameter(base)]
    core: EntityCore,
    #[parameter(list)]
    rigid_bodies: EntityList<RigidBody>,
    #[parameter(list)]
    rigid_constraints: EntityList<RigidConstraint>,
}

entity_payload!(PhysicsModel, PhysicsModel, |document| {
    rigid_bodies: EntityList::new(document.downgrade()),
    rigid_constraints: EntityList::new(document.downgrade()),
});

impl PhysicsModel {
    pub fn rigid_bodies(&self) -> &[Rc<RefCell<RigidBody>>] {
        &self.rigid_bodies.entities
    }

    pub fn add_rigid_body(&mut self, document: &Document) -> Rc<RefCell<RigidBody>> {
        debug_assert!(self.core.weak_document().ptr_eq(&document.downgrade()));
        let body = new_entity::<RigidBody>(document);
        self.rigid_bodies.entities.push(body.clone());
        self.core.flags().set_new_child();
        body
    }

    pub fn find_rigid_body(&self, id: &str) -> Option<Rc<RefCell<RigidBody>>> {
        self.rigid_bodies.find(id)
    }

    pub fn rigid_constraints(&self) -> &[Rc<RefCell<RigidConstraint>>] {
        &self.rigid_constraints.entities
    }

    pub fn add_rigid_constraint(&mut self, document: &Document) -> Rc<RefCell<RigidConstraint>> {
        debug_assert!(self.core.weak_document().ptr_eq(&document.downgrade()));
        let constraint = new_entity::<RigidConstraint>(document);
        self.rigid_constraints.entities.push(constraint.clone());
        self.core.flags().set_new_child();
        constraint
    }

    pub fn find_rigid_constraint(&self, id: &str) -> Option<Rc<RefCell<RigidConstraint>>> {
        self.rigid_constraints.find(id)
    }
}

#[derive(Debug, Parameterized)]
pub struct PhysicsScene {
    #[parameter(base)]
    core: EntityCore,
    #[parameter]
    pub gravity: Vec3,
    #[parameter]
    pub timestep: f32,
    #[parameter(list)]
    model_instances: ChildList<PhysicsModelInstance>,
}

entity_payload!(PhysicsScene, PhysicsScene, |document| {
    gravity: Vec3::new(0.0, -9.8, 0.0),
    timestep: 1.0 / 60.0,
    model_instances: ChildList::new(),
});

impl PhysicsScene {
    pub fn model_instances(&self) -> &[PhysicsModelInstance] {
        &self.model_instances
    }

    pub fn model_instance_mut(&mut self, index: usize) -> Option<&mut PhysicsModelInstance> {
        self.model_instances.get_mut(index)
    }

    pub fn add_model_instance(&mut self, model: Option<&Rc<RefCell<PhysicsModel>>>) -> &mut PhysicsModelInstance {
        let mut instance = PhysicsModelInstance::new(self.core.weak_document().clone());
        if let Some(model) = model {
            let entity: EntityRc = model.clone();
            instance.set_entity(Some(&entity));
        }
        self.core.flags().set_new_child();
        self.model_instances.push(instance)
    }
}

/// An instantiated physics model, with per-instance bodies and constraints.
#[derive(Debug, Parameterized)]
pub struct PhysicsModelInstance {
    #[parameter(base)]
    instance: EntityInstance,
    #[parameter(list)]
    rigid_bodies: ChildList<RigidBodyInstance>,
    #[parameter(list)]
    rigid_constraints: ChildList<RigidConstraintInstance>,
}

impl PhysicsModelInstance {
    fn new(document: WeakDocument) -> Self {
        Self {
            instance: EntityInstance::new(document, EntityType::PhysicsModel),
            rigid_bodies: ChildList::new(),
            rigid_constraints: ChildList::new(),
        }
    }

    pub fn rigid_body_instances(&self) -> &[RigidBodyInstance] {
        &self.rigid_bodies
    }

    pub fn rigid_body_instance_mut(&mut self, index: usize) -> Option<&mut RigidBodyInstance> {
        self.rigid_bodies.get_mut(index)
    }

    pub fn add_rigid_body_instance(&mut self, body: Option<&Rc<RefCell<RigidBody>>>) -> &mut RigidBodyInstance {
        let mut instance = RigidBodyInstance::new(self.instance.reference().weak_document());
        if let Some(body) = body {
            instance.set_rigid_body(body);
        }
        self.instance.flags().set_new_child();
        self.rigid_bodies.push(instance)
    }

    pub fn rigid_constraint_instances(&self) -> &[RigidConstraintInstance] {
        &self.rigid_constraints
    }

    pub fn add_rigid_constraint_instance(
        &mut self,
        constraint: Option<&Rc<RefCell<RigidConstraint>>>,
    ) -> &mut RigidConstraintInstance {
        let mut instance = RigidConstraintInstance::new(self.instance.reference().weak_document());
        if let Some(constraint) = constraint {
            instance.set_rigid_constraint(constraint);
        }
        self.instance.flags().set_new_child();
        self.rigid_constraints.push(instance)
    }
}

impl Deref for PhysicsModelInstance {
    type Target = EntityInstance;

    fn deref(&self) -> &Self::Target {
        &self.instance
    }
}

impl DerefMut for PhysicsModelInstance {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.instance
    }
}

impl Spawn for PhysicsModelInstance {
    fn spawn(&self) -> Self {
        PhysicsModelInstance::new(self.instance.reference().weak_document())
    }
}

#[derive(Debug, Parameterized)]
pub struct RigidBodyInstance {
    #[parameter(base)]
    instance: EntityInstance,
    #[parameter(animated)]
    velocity: Animatable<Vec3>,
    #[parameter(animated)]
    angular_velocity: Animatable<Vec3>,
    #[parameter(child)]
    parameters: RigidBodyParameters,
    // left unset by clones, the copy gets attached to its own node
    target_node: Tracked<EntityCell>,
}

impl RigidBodyInstance {
    fn new(document: WeakDocument) -> Self {
        Self {
            instance: EntityInstance::new(document, EntityType::PhysicsRigidBody),
            velocity: Animatable::new(Vec3::ZERO),
            angular_velocity: Animatable::new(Vec3::ZERO),
            parameters: RigidBodyParameters::default(),
            target_node: Tracked::empty(),
        }
    }

    /// Instantiates `body`, starting from a copy of its parameters.
    pub fn set_rigid_body(&mut self, body: &Rc<RefCell<RigidBody>>) {
        let entity: EntityRc = body.clone();
        self.instance.set_entity(Some(&entity));

        match body.try_borrow() {
            Ok(body) => self.parameters = body.parameters().clone(),
            Err(_) => warn!("rigid body is busy, instance keeps its parameters"),
        }
    }

    pub fn parameters(&self) -> &RigidBodyParameters {
        &self.parameters
    }

    pub fn parameters_mut(&mut self) -> &mut RigidBodyParameters {
        self.instance.flags().set_dirty();
        &mut self.parameters
    }

    pub fn velocity(&self) -> Vec3 {
        self.velocity.get()
    }

    pub fn set_velocity(&mut self, velocity: Vec3) {
        self.velocity.set(velocity);
        self.instance.flags().set_dirty();
    }

    pub fn velocity_mut(&mut self) -> &mut Animatable<Vec3> {
        &mut self.velocity
    }

    pub fn angular_velocity(&self) -> Vec3 {
        self.angular_velocity.get()
    }

    pub fn set_angular_velocity(&mut self, velocity: Vec3) {
        self.angular_velocity.set(velocity);
        self.instance.flags().set_dirty();
    }

    pub fn angular_velocity_mut(&mut self) -> &mut Animatable<Vec3> {
        &mut self.angular_velocity
    }

    pub fn target_node(&self) -> Option<EntityRc> {
        self.target_node.get()
    }

    pub fn set_target_node(&mut self, node: Option<&EntityRc>) {
        self.target_node.set(node);
        self.instance.flags().set_new_child();
    }
}

impl Deref for RigidBodyInstance {
    type Target = EntityInstance;

    fn deref(&self) -> &Self::Target {
        &self.instance
    }
}

impl Spawn for RigidBodyInstance {
    fn spawn(&self) -> Self {
        RigidBodyInstance::new(self.instance.reference().weak_document())
    }
}

/// Nothing to carry beyond the instance itself.
#[derive(Debug, Parameterized)]
pub struct RigidConstraintInstance {
    #[parameter(base)]
    instance: EntityInstance,
}

impl RigidConstraintInstance {
    fn new(document: WeakDocument) -> Self {
        Self {
            instance: EntityInstance::new(document, EntityType::PhysicsRigidConstraint),
        }
    }

    pub fn set_rigid_constraint(&mut self, constraint: &Rc<RefCell<RigidConstraint>>) {
        let entity: EntityRc = constraint.clone();
        self.instance.set_entity(Some(&entity));
    }
}

impl Deref for RigidConstraintInstance {
    type Target = EntityInstance;

    fn deref(&self) -> &Self::Target {
        &self.instance
    }
}

impl Spawn for RigidConstraintInstance {
    fn spawn(&self) -> Self {
        RigidConstraintInstance::new(self.instance.reference().weak_document())
    }
}
