use crate::entity::EntityCore;
use crate::parameter::{Animatable, Parameterized};
use glam::Vec3;

/// Animation channels are evaluated elsewhere; the entity groups the curves under an id.
#[derive(Debug, Parameterized)]
pub struct Animation {
    #[parameter(base)]
    core: EntityCore,
}

entity_payload!(Animation, Animation, |document| {});

#[derive(Debug, Parameterized)]
pub struct AnimationClip {
    #[parameter(base)]
    core: EntityCore,
    #[parameter]
    pub start: f32,
    #[parameter]
    pub end: f32,
}

entity_payload!(AnimationClip, AnimationClip, |document| { start: 0.0, end: 0.0 });

#[derive(Debug, Parameterized)]
pub struct Camera {
    #[parameter(base)]
    core: EntityCore,
    #[parameter(animated)]
    pub fov_y: Animatable<f32>,
    #[parameter(animated)]
    pub near_z: Animatable<f32>,
    #[parameter(animated)]
    pub far_z: Animatable<f32>,
}

entity_payload!(Camera, Camera, |document| {
    fov_y: Animatable::new(60.0),
    near_z: Animatable::new(1.0),
    far_z: Animatable::new(1000.0),
});

#[derive(Debug, Parameterized)]
pub struct Effect {
    #[parameter(base)]
    core: EntityCore,
}

entity_payload!(Effect, Effect, |document| {});

#[derive(Debug, Parameterized)]
pub struct Emitter {
    #[parameter(base)]
    core: EntityCore,
}

entity_payload!(Emitter, Emitter, |document| {});

#[derive(Debug, Parameterized)]
pub struct ForceField {
    #[parameter(base)]
    core: EntityCore,
}

entity_payload!(ForceField, ForceField, |document| {});

#[derive(Debug, Parameterized)]
pub struct Image {
    #[parameter(base)]
    core: EntityCore,
    /// Relative to the document, as written.
    #[parameter]
    pub filename: String,
}

entity_payload!(Image, Image, |document| { filename: String::new() });

#[derive(Debug, Parameterized)]
pub struct Light {
    #[parameter(base)]
    core: EntityCore,
    #[parameter(animated)]
    pub color: Animatable<Vec3>,
    #[parameter(animated)]
    pub intensity: Animatable<f32>,
}

entity_payload!(Light, Light, |document| {
    color: Animatable::new(Vec3::ONE),
    intensity: Animatable::new(1.0),
});

#[derive(Debug, Parameterized)]
pub struct PhysicsMaterial {
    #[parameter(base)]
    core: EntityCore,
    #[parameter]
    pub static_friction: f32,
    #[parameter]
    pub dynamic_friction: f32,
    #[parameter]
    pub restitution: f32,
}

entity_payload!(PhysicsMaterial, PhysicsMaterial, |document| {
    static_friction: 0.0,
    dynamic_friction: 0.0,
    restitution: 0.0,
});
