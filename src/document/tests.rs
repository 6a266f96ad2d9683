use super::*;
use crate::animated::KeyframeCurve;
use crate::entity::Entity;
use crate::payload::{Camera, Effect, Geometry, Light};

#[test]
fn generated_ids_follow_the_entity_type() {
    let document = Document::new();
    let first = document.add_entity::<Camera>();
    let second = document.add_entity::<Camera>();
    let material = document.add_entity::<crate::payload::Material>();
    assert_eq!(first.borrow().core().dae_id(), "camera1");
    assert_eq!(second.borrow().core().dae_id(), "camera2");
    assert_eq!(material.borrow().core().dae_id(), "material1");
}

#[test]
fn libraries_hold_their_own_type() {
    let document = Document::new();
    let geometry = document.add_entity::<Geometry>();
    document.add_entity::<Effect>();
    assert_eq!(document.library::<Geometry>().len(), 1);
    assert!(document.library::<Geometry>().contains(&geometry));
    assert_eq!(document.libraries().entity_count(), 2);

    let id = geometry.borrow().core().dae_id().to_string();
    assert!(document.find::<Geometry>(&id).is_some());
    assert!(document.find::<Effect>(&id).is_none());
    assert!(document.library::<Geometry>().find_dae_id(&id).is_some());
}

#[test_log::test]
fn release_entity_drops_unshared_entities() {
    let document = Document::new();
    let geometry = document.add_entity::<Geometry>();
    geometry.borrow_mut().core_mut().set_dae_id("box");
    let weak = Rc::downgrade(&geometry);

    assert!(document.release_entity(&geometry));
    assert!(!document.release_entity(&geometry));
    assert!(!geometry.borrow().core().is_in_library());
    assert!(document.find_entity("box").is_none());
    drop(geometry);
    assert!(weak.upgrade().is_none());
}

#[test]
fn ids_of_dead_entities_are_reusable() {
    let document = Document::new();
    let geometry = document.add_entity::<Geometry>();
    geometry.borrow_mut().core_mut().set_dae_id("box");
    document.release_entity(&geometry);
    drop(geometry);

    let replacement = document.add_entity::<Geometry>();
    replacement.borrow_mut().core_mut().set_dae_id("box");
    assert_eq!(replacement.borrow().core().dae_id(), "box");
}

#[test]
fn first_visual_scene_is_instantiated() {
    let document = Document::new();
    assert!(document.visual_scene_instance().is_none());
    let first = document.add_visual_scene();
    let second = document.add_visual_scene();
    let instance = document.visual_scene_instance().expect("first scene instantiated");
    assert!(Rc::ptr_eq(&instance, &first));
    assert!(!Rc::ptr_eq(&instance, &second));
}

#[test]
fn visual_scene_root_keeps_an_explicit_uri() {
    let document = Document::new();
    document.visual_scene_root().set_uri("#main");
    let scene = document.add_visual_scene();
    assert!(document.visual_scene_instance().is_none());

    scene.borrow_mut().core_mut().set_dae_id("main");
    // the earlier miss is remembered until the uri is set again
    document.visual_scene_root().set_uri("#main");
    assert!(document.visual_scene_instance().is_some_and(|s| Rc::ptr_eq(&s, &scene)));
}

#[test]
fn physics_scenes_are_instantiated_in_order() {
    let document = Document::new();
    let first = document.add_physics_scene();
    let second = document.add_physics_scene();
    assert_eq!(document.physics_scene_roots().len(), 2);
    assert!(document.physics_scene_instance(0).is_some_and(|s| Rc::ptr_eq(&s, &first)));
    assert!(document.physics_scene_instance(1).is_some_and(|s| Rc::ptr_eq(&s, &second)));
    assert!(document.physics_scene_instance(2).is_none());

    let empty = document.add_physics_scene_instance_reference();
    assert!(empty.entity().is_none());
    assert_eq!(document.physics_scene_roots().len(), 3);
}

#[test]
fn layers_are_found_by_name() {
    let document = Document::new();
    document.add_layer("props", ["crate1".to_string(), "barrel".to_string()]);
    document.add_layer("lights", Vec::new());
    assert_eq!(document.layers().len(), 2);
    assert_eq!(document.find_layer("props").map(|l| l.objects.len()), Some(2));
    assert!(document.release_layer("props"));
    assert!(!document.release_layer("props"));
    assert!(document.find_layer("props").is_none());
}

#[test]
fn file_urls_are_absolute() {
    let document = Document::new();
    assert_eq!(document.describe(), "<unsaved document>");
    document.set_file_url(Path::new("/data/./scenes/main.dae"));
    assert_eq!(document.file_url(), Some(PathBuf::from("/data/scenes/main.dae")));
    assert_eq!(document.make_absolute(Path::new("../lib.dae")), PathBuf::from("/data/lib.dae"));

    document.set_file_url(Path::new("relative.dae"));
    assert!(document.file_url().is_some_and(|url| url.is_absolute()));
}

#[test]
fn asset_edits_mark_the_document() {
    let document = Document::new();
    assert!(!document.flags().is_dirty());
    document.asset_mut().up_axis = crate::entity::asset::UpAxis::Z;
    assert!(document.flags().is_dirty());
    assert_eq!(document.asset().up_axis, crate::entity::asset::UpAxis::Z);
}

#[test]
fn animated_values_without_components_are_refused() {
    let document = Document::new();
    assert!(!document.register_animated_value(&Animated::new(Vec::new(), &[])));
    assert_eq!(document.animated_value_count(), 0);
}

#[test]
fn animated_values_register_once_and_expire() {
    let document = Document::new();
    let animated = Animated::new(vec![1.0], &[""]);
    assert!(document.register_animated_value(&animated));
    assert!(document.register_animated_value(&animated));
    assert_eq!(document.animated_value_count(), 1);

    assert!(document.unregister_animated_value(&animated));
    assert!(!document.unregister_animated_value(&animated));

    document.register_animated_value(&animated);
    drop(animated);
    assert_eq!(document.animated_value_count(), 0);
}

#[test_log::test]
fn current_time_evaluates_bound_parameters() {
    let document = Document::new();
    let light = document.add_entity::<Light>();

    let animated = document.animate(&mut light.borrow_mut().color);
    assert_eq!(animated.value_count(), 3);
    assert_eq!(animated.qualifier(1), Some(".Y"));
    animated.set_curve(1, Some(Rc::new(KeyframeCurve::new([(0.0, 0.0), (10.0, 5.0)]))));

    // binding twice keeps the first binding
    let again = document.animate(&mut light.borrow_mut().color);
    assert!(Rc::ptr_eq(&animated, &again));
    assert_eq!(document.animated_value_count(), 1);

    document.set_current_time(4.0);
    let color = light.borrow().color.get();
    assert_eq!(color, glam::Vec3::new(1.0, 2.0, 1.0));
    assert!(light.borrow().color.is_animated());
}

#[test]
fn external_documents_inherit_settings() {
    let settings = DocumentSettings::default().with_dereference(true);
    let document = Document::with_settings(settings);
    assert!(matches!(
        document.load_external(Path::new("/missing.dae")),
        Err(DocumentError::NoLoader(path)) if path == Path::new("/missing.dae")
    ));

    let loaded = Document::new();
    loaded.inherit_settings(&document.settings());
    assert!(loaded.settings().resolve.dereference);
}

#[test]
fn dropping_a_document_releases_its_references() {
    let document = Document::new();
    document.set_file_url(Path::new("/a/main.dae"));
    let geometry: EntityRc = document.add_entity::<Geometry>();
    let reference = EntityReference::new(&document);
    reference.set_entity(Some(&geometry));
    reference.set_uri("other.dae#x");
    let placeholder = reference.placeholder().map(|p| Rc::downgrade(&p)).expect("placeholder");
    drop(geometry);

    drop(document);
    assert!(placeholder.upgrade().is_none());
    assert!(reference.placeholder().is_none());
    assert_eq!(reference.uri(), "#x");
}

#[test_log::test]
fn current_time_evaluates_extra_node_animations() {
    let document = Document::new();
    let light = document.add_entity::<Light>();

    let mut light = light.borrow_mut();
    let node = light
        .core_mut()
        .extra_mut()
        .add_type("flicker")
        .add_technique("GAME")
        .add_child_node_named("intensity");
    node.set_content("1");

    let animated = document.animate_node(node);
    assert_eq!(animated.value(0), Some(1.0));
    assert!(Rc::ptr_eq(&animated, &document.animate_node(node)));
    assert_eq!(document.animated_value_count(), 1);

    animated.set_curve(0, Some(Rc::new(KeyframeCurve::new([(0.0, 0.0), (1.0, 10.0)]))));
    document.set_current_time(0.5);
    assert_eq!(animated.value(0), Some(5.0));
    assert!(node.animated().is_some_and(|bound| Rc::ptr_eq(bound, &animated)));
}
