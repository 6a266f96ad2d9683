//! Typed entity payloads. The core only needs them to exist, be cloneable and live in libraries,
//! so they carry the data their relationships need and little else.

/// Implements [`crate::entity::Entity`] for a payload whose core lives in a `core` field. The
/// remaining fields are initialized from the given expressions, which may use the document.
macro_rules! entity_payload {
    ($name:ident, $entity_type:ident, |$document:ident| { $($field:ident: $value:expr),* $(,)? }) => {
        impl $crate::entity::Entity for $name {
            fn create($document: &$crate::document::Document) -> Self {
                Self {
                    core: $crate::entity::EntityCore::new($document, $crate::entity::EntityType::$entity_type),
                    $($field: $value,)*
                }
            }

            fn entity_type(&self) -> $crate::entity::EntityType {
                $crate::entity::EntityType::$entity_type
            }

            fn core(&self) -> &$crate::entity::EntityCore {
                &self.core
            }

            fn core_mut(&mut self) -> &mut $crate::entity::EntityCore {
                &mut self.core
            }
        }
    };
}

mod controller;
mod geometry;
mod material;
mod physics;
mod scene;
mod simple;


pub use controller::{BaseTarget, Controller, MorphController, MorphMethod, MorphTarget, SkinController};
pub use geometry::{Geometry, Mesh, Polygons, PolygonsInput, PrimitiveType, Semantic};
pub use material::Material;
pub use physics::{
    PhysicsModel, PhysicsModelInstance, PhysicsScene, RigidBody, RigidBodyInstance, RigidBodyParameters,
    RigidConstraint, RigidConstraintInstance,
};
pub use scene::{EntityInstance, SceneNode};
pub use simple::{Animation, AnimationClip, Camera, Effect, Emitter, ForceField, Image, Light, PhysicsMaterial};
