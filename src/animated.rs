//! Animated values: a handful of float components that an animation curve may drive. Curve math
//! itself belongs to the animation evaluator, which plugs in through [`Curve`].

use crate::object::ObjectId;
use itertools::Itertools;
use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::Rc;

pub trait Curve: Debug {
    fn evaluate(&self, time: f32) -> f32;
}

/// Piecewise linear curve, clamped at both ends.
#[derive(Debug, Clone, Default)]
pub struct KeyframeCurve {
    keys: Vec<(f32, f32)>,
}

impl KeyframeCurve {
    pub fn new(keys: impl IntoIterator<Item = (f32, f32)>) -> Self {
        let keys = keys
            .into_iter()
            .sorted_by(|a, b| a.0.total_cmp(&b.0))
            .collect_vec();
        Self { keys }
    }

    pub fn keys(&self) -> &[(f32, f32)] {
        &self.keys
    }
}

impl Curve for KeyframeCurve {
    fn evaluate(&self, time: f32) -> f32 {
        let (Some(first), Some(last)) = (self.keys.first(), self.keys.last()) else {
            return 0.0;
        };

        if time <= first.0 {
            return first.1;
        }
        if time >= last.0 {
            return last.1;
        }

        self.keys
            .iter()
            .tuple_windows()
            .find(|(a, b)| time >= a.0 && time <= b.0)
            .map(|(a, b)| {
                let span = b.0 - a.0;
                if span <= f32::EPSILON {
                    b.1
                } else {
                    a.1 + (b.1 - a.1) * (time - a.0) / span
                }
            })
            .unwrap_or(last.1)
    }
}

#[derive(Debug)]
pub struct Animated {
    id: ObjectId,
    qualifiers: Vec<String>,
    values: RefCell<Vec<f32>>,
    curves: RefCell<Vec<Option<Rc<dyn Curve>>>>,
}

impl Animated {
    pub fn new(values: Vec<f32>, qualifiers: &[&str]) -> Rc<Self> {
        let qualifiers = (0..values.len())
            .map(|i| qualifiers.get(i).copied().unwrap_or_default().to_string())
            .collect_vec();
        let curves = vec![None; values.len()];

        Rc::new(Self {
            id: ObjectId::next(),
            qualifiers,
            values: RefCell::new(values),
            curves: RefCell::new(curves),
        })
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn value_count(&self) -> usize {
        self.values.borrow().len()
    }

    pub fn value(&self, index: usize) -> Option<f32> {
        self.values.borrow().get(index).copied()
    }

    pub fn values(&self) -> Vec<f32> {
        self.values.borrow().clone()
    }

    /// Overwrites the components; surplus input is ignored.
    pub fn set_values(&self, values: &[f32]) {
        for (slot, value) in self.values.borrow_mut().iter_mut().zip(values) {
            *slot = *value;
        }
    }

    pub fn qualifier(&self, index: usize) -> Option<&str> {
        self.qualifiers.get(index).map(String::as_str)
    }

    pub fn find_qualifier(&self, qualifier: &str) -> Option<usize> {
        self.qualifiers.iter().position(|q| q == qualifier)
    }

    pub fn set_curve(&self, index: usize, curve: Option<Rc<dyn Curve>>) {
        if let Some(slot) = self.curves.borrow_mut().get_mut(index) {
            *slot = curve;
        }
    }

    pub fn curve(&self, index: usize) -> Option<Rc<dyn Curve>> {
        self.curves.borrow().get(index).cloned().flatten()
    }

    pub fn has_curve(&self) -> bool {
        self.curves.borrow().iter().any(Option::is_some)
    }

    /// Writes the curve output at `time` into every bound component.
    pub fn evaluate(&self, time: f32) {
        let curves = self.curves.borrow();
        let mut values = self.values.borrow_mut();
        for (value, curve) in values.iter_mut().zip(curves.iter()) {
            if let Some(curve) = curve {
                *value = curve.evaluate(time);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyframes_interpolate_and_clamp() {
        let curve = KeyframeCurve::new([(1.0, 10.0), (0.0, 0.0)]);
        assert_eq!(curve.evaluate(-1.0), 0.0);
        assert_eq!(curve.evaluate(0.5), 5.0);
        assert_eq!(curve.evaluate(2.0), 10.0);
        assert_eq!(KeyframeCurve::default().evaluate(3.0), 0.0);
    }

    #[test]
    fn evaluate_only_touches_bound_components() {
        let animated = Animated::new(vec![1.0, 2.0, 3.0], &[".X", ".Y", ".Z"]);
        animated.set_curve(1, Some(Rc::new(KeyframeCurve::new([(0.0, 0.0), (2.0, 4.0)]))));
        assert!(animated.has_curve());

        animated.evaluate(1.0);
        assert_eq!(animated.values(), vec![1.0, 2.0, 3.0]);
        animated.evaluate(0.5);
        assert_eq!(animated.values(), vec![1.0, 1.0, 3.0]);
        assert_eq!(animated.find_qualifier(".Z"), Some(2));
        assert_eq!(animated.find_qualifier(".W"), None);
    }
}
