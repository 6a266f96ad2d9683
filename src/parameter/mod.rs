//! Parameter slots. A parameterized type declares its slots with `#[derive(Parameterized)]` and
//! `#[parameter(kind)]` field attributes; the generated table drives `clone_to` and the ordered
//! enumeration serializers walk.

use crate::animated::Animated;
use glam::Vec3;
use std::fmt::Debug;
use std::ops::Deref;
use std::rc::{Rc, Weak};

pub use scenedoc_derive::Parameterized;

#[cfg(test)]
mod tests;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    /// Owned by value, copied on clone.
    Value,
    /// Exclusively owned child object, at most one instance.
    Child,
    /// Ordered sequence of owned children.
    List,
    /// Scalar that an animation curve may drive.
    Animated,
    /// Non-owning pointer that empties itself when the target dies.
    Tracked,
    /// Lazy pointer-by-id to an entity.
    Reference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterInfo {
    pub name: &'static str,
    pub kind: ParameterKind,
}

impl ParameterInfo {
    pub fn new(name: &'static str, kind: ParameterKind) -> Self {
        Self { name, kind }
    }
}

pub trait Parameterized {
    /// Copies every declared parameter into `target`. Owned children are cloned, never aliased.
    fn clone_to(&self, target: &mut Self);

    fn parameters(&self) -> Vec<ParameterInfo>;
}

/// Creates a blank instance of the same concrete type, in the same context (document, owner) as
/// `self`. This is the factory the clone algorithm uses when the target slot is empty.
pub trait Spawn {
    fn spawn(&self) -> Self;

    fn clone_new(&self) -> Self
    where
        Self: Parameterized + Sized,
    {
        let mut clone = self.spawn();
        self.clone_to(&mut clone);
        clone
    }
}

/// Per-kind clone behaviour of a slot type.
pub trait CloneParameter {
    fn clone_parameter(&self, target: &mut Self);
}

#[derive(Debug)]
pub struct Child<T>(Option<Box<T>>);

impl<T> Child<T> {
    pub fn empty() -> Self {
        Self(None)
    }

    pub fn new(value: T) -> Self {
        Self(Some(Box::new(value)))
    }

    pub fn get(&self) -> Option<&T> {
        self.0.as_deref()
    }

    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.0.as_deref_mut()
    }

    pub fn is_some(&self) -> bool {
        self.0.is_some()
    }

    /// Installs `value` and hands back the previous instance, which is released when the caller
    /// lets go of it.
    pub fn set(&mut self, value: T) -> Option<T> {
        self.0.replace(Box::new(value)).map(|previous| *previous)
    }

    pub fn take(&mut self) -> Option<T> {
        self.0.take().map(|previous| *previous)
    }

    pub fn get_or_insert_with(&mut self, create: impl FnOnce() -> T) -> &mut T {
        self.0.get_or_insert_with(|| Box::new(create()))
    }
}

impl<T> Default for Child<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: Parameterized + Spawn> CloneParameter for Child<T> {
    fn clone_parameter(&self, target: &mut Self) {
        let Some(source) = self.get() else {
            target.0 = None;
            return;
        };

        match target.get_mut() {
            Some(slot) => source.clone_to(slot),
            None => target.0 = Some(Box::new(source.clone_new())),
        }
    }
}

/// Ordered owned children. Reading goes through `Deref<Target = [T]>`; mutation is explicit so
/// owners can flag it.
#[derive(Debug)]
pub struct ChildList<T>(Vec<T>);

impl<T> ChildList<T> {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, value: T) -> &mut T {
        self.0.push(value);
        let index = self.0.len() - 1;
        &mut self.0[index]
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.0.get_mut(index)
    }

    /// Returns the first element accepted by `matches`, or appends `create()`. The flag tells
    /// whether the element is new.
    pub fn find_or_push(
        &mut self,
        matches: impl FnMut(&T) -> bool,
        create: impl FnOnce() -> T,
    ) -> (&mut T, bool) {
        match self.0.iter().position(matches) {
            Some(index) => (&mut self.0[index], false),
            None => (self.push(create()), true),
        }
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.0.iter_mut()
    }

    pub fn remove(&mut self, index: usize) -> Option<T> {
        (index < self.0.len()).then(|| self.0.remove(index))
    }

    pub fn retain(&mut self, keep: impl FnMut(&T) -> bool) {
        self.0.retain(keep)
    }

    pub fn clear(&mut self) {
        self.0.clear()
    }
}

impl<T> Default for ChildList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Deref for ChildList<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.0
    }
}

impl<T: Parameterized + Spawn> CloneParameter for ChildList<T> {
    fn clone_parameter(&self, target: &mut Self) {
        target.0 = self.0.iter().map(Spawn::clone_new).collect();
    }
}

/// Non-owning pointer. The referent going away simply empties it.
#[derive(Debug)]
pub struct Tracked<T: ?Sized>(Option<Weak<T>>);

impl<T: ?Sized> Tracked<T> {
    pub fn empty() -> Self {
        Self(None)
    }

    pub fn get(&self) -> Option<Rc<T>> {
        self.0.as_ref().and_then(Weak::upgrade)
    }

    pub fn set(&mut self, target: Option<&Rc<T>>) {
        self.0 = target.map(Rc::downgrade);
    }

    pub fn is_some(&self) -> bool {
        self.get().is_some()
    }

    pub fn points_to(&self, target: &Rc<T>) -> bool {
        self.get().is_some_and(|current| Rc::ptr_eq(&current, target))
    }
}

impl<T: ?Sized> Default for Tracked<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: ?Sized> CloneParameter for Tracked<T> {
    fn clone_parameter(&self, target: &mut Self) {
        target.0 = self.0.clone();
    }
}

/// Value types that can be split into animatable float components.
pub trait AnimatableValue: Copy + Debug + PartialEq {
    const QUALIFIERS: &'static [&'static str];

    fn to_components(&self) -> Vec<f32>;

    fn from_components(components: &[f32]) -> Self;
}

impl AnimatableValue for f32 {
    const QUALIFIERS: &'static [&'static str] = &[""];

    fn to_components(&self) -> Vec<f32> {
        vec![*self]
    }

    fn from_components(components: &[f32]) -> Self {
        components.first().copied().unwrap_or_default()
    }
}

impl AnimatableValue for Vec3 {
    const QUALIFIERS: &'static [&'static str] = &[".X", ".Y", ".Z"];

    fn to_components(&self) -> Vec<f32> {
        self.to_array().to_vec()
    }

    fn from_components(components: &[f32]) -> Self {
        let component = |i: usize| components.get(i).copied().unwrap_or_default();
        Vec3::new(component(0), component(1), component(2))
    }
}

/// A scalar plus an optional animation binding. Once bound, the [`Animated`] holds the live value.
#[derive(Debug)]
pub struct Animatable<T: AnimatableValue> {
    value: T,
    animated: Option<Rc<Animated>>,
}

impl<T: AnimatableValue> Animatable<T> {
    pub fn new(value: T) -> Self {
        Self { value, animated: None }
    }

    pub fn get(&self) -> T {
        match &self.animated {
            Some(animated) => T::from_components(&animated.values()),
            None => self.value,
        }
    }

    pub fn set(&mut self, value: T) {
        self.value = value;
        if let Some(animated) = &self.animated {
            animated.set_values(&value.to_components());
        }
    }

    pub fn animated(&self) -> Option<&Rc<Animated>> {
        self.animated.as_ref()
    }

    /// Returns the binding, creating it from the current value if there is none yet. The second
    /// element tells whether it was just created, in which case the owner registers it.
    pub fn animate(&mut self) -> (Rc<Animated>, bool) {
        if let Some(animated) = &self.animated {
            return (animated.clone(), false);
        }

        let animated = Animated::new(self.value.to_components(), T::QUALIFIERS);
        self.animated = Some(animated.clone());
        (animated, true)
    }

    pub fn is_animated(&self) -> bool {
        self.animated.as_ref().is_some_and(|animated| animated.has_curve())
    }
}

impl<T: AnimatableValue + Default> Default for Animatable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: AnimatableValue> CloneParameter for Animatable<T> {
    /// Only the value travels, the curve binding stays with the source.
    fn clone_parameter(&self, target: &mut Self) {
        target.set(self.get());
    }
}
