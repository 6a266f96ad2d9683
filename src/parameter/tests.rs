use super::*;

#[derive(Debug, Default, Parameterized)]
struct Leaf {
    #[parameter]
    label: String,
    #[parameter(animated)]
    weight: Animatable<f32>,
    scratch: u32,
}

impl Spawn for Leaf {
    fn spawn(&self) -> Self {
        Leaf::default()
    }
}

#[derive(Debug, Default, Parameterized)]
struct Branch {
    #[parameter]
    count: u32,
    #[parameter(child)]
    single: Child<Leaf>,
    #[parameter(list)]
    leaves: ChildList<Leaf>,
    #[parameter(tracked)]
    watched: Tracked<String>,
}

impl Spawn for Branch {
    fn spawn(&self) -> Self {
        Branch::default()
    }
}

fn leaf(label: &str, weight: f32) -> Leaf {
    Leaf {
        label: label.to_string(),
        weight: Animatable::new(weight),
        scratch: 99,
    }
}

#[test]
fn parameters_are_enumerated_in_declaration_order() {
    let branch = Branch::default();
    let parameters = branch.parameters();
    assert_eq!(
        parameters,
        vec![
            ParameterInfo::new("count", ParameterKind::Value),
            ParameterInfo::new("single", ParameterKind::Child),
            ParameterInfo::new("leaves", ParameterKind::List),
            ParameterInfo::new("watched", ParameterKind::Tracked),
        ]
    );

    let leaf_parameters = Leaf::default().parameters();
    assert_eq!(leaf_parameters.len(), 2);
    assert_eq!(leaf_parameters[1].kind, ParameterKind::Animated);
}

#[test]
fn clone_creates_distinct_children() {
    let target = Rc::new("target".to_string());
    let mut source = Branch {
        count: 3,
        single: Child::new(leaf("single", 0.5)),
        ..Default::default()
    };
    source.leaves.push(leaf("a", 1.0));
    source.leaves.push(leaf("b", 2.0));
    source.watched.set(Some(&target));

    let mut clone = source.clone_new();
    assert_eq!(clone.count, 3);
    assert_eq!(clone.leaves.len(), 2);
    assert_eq!(clone.leaves[0].label, "a");
    assert_eq!(clone.leaves[1].weight.get(), 2.0);
    // unmarked fields are not part of the table
    assert_eq!(clone.leaves[0].scratch, 0);
    assert!(clone.watched.points_to(&target));

    let source_single = source.single.get().map(|l| l as *const Leaf);
    let clone_single = clone.single.get().map(|l| l as *const Leaf);
    assert_ne!(source_single, clone_single);

    clone.leaves.get_mut(0).expect("cloned leaf").label = "changed".to_string();
    clone.single.get_mut().expect("cloned single").weight.set(9.0);
    assert_eq!(source.leaves[0].label, "a");
    assert_eq!(source.single.get().expect("source single").weight.get(), 0.5);
}

#[test]
fn clone_into_existing_target_reuses_the_slot() {
    let source = Branch {
        single: Child::new(leaf("fresh", 1.0)),
        ..Default::default()
    };
    let mut target = Branch {
        single: Child::new(leaf("stale", 0.0)),
        ..Default::default()
    };
    target.leaves.push(leaf("stale", 0.0));

    source.clone_to(&mut target);
    assert_eq!(target.single.get().map(|l| l.label.as_str()), Some("fresh"));
    assert!(target.leaves.is_empty());

    Branch::default().clone_to(&mut target);
    assert!(!target.single.is_some());
}

#[test]
fn replacing_a_child_hands_back_the_previous_one() {
    let mut slot = Child::new(leaf("first", 0.0));
    let previous = slot.set(leaf("second", 0.0));
    assert_eq!(previous.map(|l| l.label), Some("first".to_string()));
    assert_eq!(slot.get().map(|l| l.label.as_str()), Some("second"));
}

#[test]
fn tracked_empties_when_the_target_dies() {
    let target = Rc::new(5u32);
    let mut tracked = Tracked::empty();
    tracked.set(Some(&target));
    assert!(tracked.is_some());

    drop(target);
    assert!(!tracked.is_some());
}

#[test]
fn animatable_clone_copies_the_value_only() {
    let mut source = Animatable::new(Vec3::new(1.0, 2.0, 3.0));
    let (animated, created) = source.animate();
    assert!(created);
    assert!(!source.animate().1);

    animated.set_values(&[4.0, 5.0, 6.0]);
    assert_eq!(source.get(), Vec3::new(4.0, 5.0, 6.0));

    let mut target = Animatable::new(Vec3::ZERO);
    source.clone_parameter(&mut target);
    assert_eq!(target.get(), Vec3::new(4.0, 5.0, 6.0));
    assert!(target.animated().is_none());
}
