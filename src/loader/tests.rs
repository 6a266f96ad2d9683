use super::*;
use crate::entity::asset::UpAxis;
use crate::entity::{Entity, ResolutionState, same_entity};
use crate::error::CollectingSink;
use crate::payload::{
    AnimationClip, Controller, Geometry, Image, Material, PhysicsModel, PrimitiveType, SceneNode, Semantic,
};
use glam::{Mat4, Vec3};
use std::path::PathBuf;

const SCENE: &str = r##"<?xml version="1.0" encoding="utf-8"?>
<COLLADA xmlns="http://www.collada.org/2005/11/COLLADASchema" version="1.4.1">
  <asset>
    <contributor><author>Ada</author><authoring_tool>hand</authoring_tool></contributor>
    <unit name="centimeter" meter="0.01"/>
    <up_axis>Z_UP</up_axis>
  </asset>
  <library_animation_clips>
    <animation_clip id="walk" start="0.5" end="2"/>
  </library_animation_clips>
  <library_images>
    <image id="bricks"><init_from>textures/bricks.png</init_from></image>
  </library_images>
  <library_materials>
    <material id="wall" name="Wall"><instance_effect url="#wall-fx"/></material>
    <material id="shared"><instance_effect url="shared/effects.dae#chrome"/></material>
  </library_materials>
  <library_effects>
    <effect id="wall-fx"/>
  </library_effects>
  <library_geometries>
    <geometry id="quad" name="Quad">
      <mesh>
        <source id="quad-positions">
          <float_array id="quad-positions-array" count="12">0 0 0 1 0 0 1 1 0 0 1 0</float_array>
        </source>
        <vertices id="quad-vertices">
          <input semantic="POSITION" source="#quad-positions"/>
        </vertices>
        <polylist material="stone" count="2">
          <input semantic="VERTEX" source="#quad-vertices" offset="0"/>
          <input semantic="NORMAL" source="#quad-normals" offset="1"/>
          <input semantic="TEXCOORD" source="#quad-uvs" offset="1" set="0"/>
          <vcount>3 3</vcount>
          <p>0 0 1 1 2 2 0 3 2 4 3 5</p>
        </polylist>
      </mesh>
      <extra>
        <technique profile="MAYA"><double_sided>1</double_sided></technique>
      </extra>
    </geometry>
    <geometry id="quad-smile">
      <mesh>
        <source id="smile-positions"><float_array count="12">0 0 1 1 0 1 1 1 1 0 1 1</float_array></source>
        <vertices id="smile-vertices"><input semantic="POSITION" source="#smile-positions"/></vertices>
      </mesh>
    </geometry>
  </library_geometries>
  <library_controllers>
    <controller id="skin">
      <skin source="#morph">
        <bind_shape_matrix>1 0 0 5 0 1 0 0 0 0 1 0 0 0 0 1</bind_shape_matrix>
        <joint name="hip"/>
        <joint name="knee"/>
      </skin>
    </controller>
    <controller id="morph">
      <morph source="#quad" method="RELATIVE">
        <target geometry="#quad-smile" weight="0.3"/>
      </morph>
    </controller>
  </library_controllers>
  <library_physics_models>
    <physics_model id="crate-model">
      <rigid_body sid="crate-body">
        <technique_common><dynamic>false</dynamic><mass>20</mass></technique_common>
      </rigid_body>
    </physics_model>
  </library_physics_models>
  <library_physics_scenes>
    <physics_scene id="physics">
      <instance_physics_model url="#crate-model">
        <instance_rigid_body body="crate-body" target="#scene"/>
      </instance_physics_model>
    </physics_scene>
  </library_physics_scenes>
  <library_visual_scenes>
    <visual_scene id="scene" name="Scene">
      <node id="wall-node" name="wall node">
        <instance_geometry url="#quad" name="the quad"/>
        <node id="light-node">
          <instance_light url="#missing-light"/>
        </node>
      </node>
    </visual_scene>
  </library_visual_scenes>
  <scene>
    <instance_physics_scene url="#physics"/>
    <instance_visual_scene url="#scene"/>
  </scene>
  <extra type="level">
    <technique profile="GAME"><spawn x="1" y="2">start</spawn></technique>
  </extra>
</COLLADA>
"##;

fn read_scene() -> anyhow::Result<Document> {
    let document = Document::new();
    document.set_file_url(Path::new("/levels/one.dae"));
    XmlDocumentLoader::read_str(&document, SCENE)?;
    Ok(document)
}

#[test_log::test]
fn document_asset_and_extra_are_read() -> anyhow::Result<()> {
    let document = read_scene()?;
    let asset = document.asset();
    assert_eq!(asset.up_axis, UpAxis::Z);
    assert_eq!(asset.unit_name, "centimeter");
    assert_eq!(asset.unit_in_meters, 0.01);
    assert_eq!(asset.contributors()[0].author, "Ada");

    let extra = document.extra();
    let spawn = extra
        .find_type("level")
        .and_then(|t| t.find_technique("GAME"))
        .and_then(|t| t.find_child_node("spawn"))
        .ok_or_else(|| anyhow::anyhow!("spawn node missing"))?;
    assert_eq!(spawn.content(), "start");
    assert_eq!(spawn.read_attribute("y"), "2");
    Ok(())
}

#[test_log::test]
fn simple_entities_are_read() -> anyhow::Result<()> {
    let document = read_scene()?;
    let clip = document.find::<AnimationClip>("walk").ok_or_else(|| anyhow::anyhow!("no clip"))?;
    assert_eq!((clip.borrow().start, clip.borrow().end), (0.5, 2.0));
    let image = document.find::<Image>("bricks").ok_or_else(|| anyhow::anyhow!("no image"))?;
    assert_eq!(image.borrow().filename, "textures/bricks.png");
    assert_eq!(document.libraries().entity_count(), 12);
    Ok(())
}

#[test_log::test]
fn meshes_keep_positions_and_index_streams() -> anyhow::Result<()> {
    let document = read_scene()?;
    let geometry = document.find::<Geometry>("quad").ok_or_else(|| anyhow::anyhow!("no quad"))?;
    let geometry = geometry.borrow();
    assert_eq!(geometry.core().name(), "Quad");
    assert!(geometry.core().extra().find_type("").and_then(|t| t.find_technique("MAYA")).is_some());

    let mesh = geometry.mesh().ok_or_else(|| anyhow::anyhow!("not a mesh"))?;
    assert_eq!(mesh.vertex_count(), 4);
    assert_eq!(mesh.positions()[2], Vec3::new(1.0, 1.0, 0.0));

    let polygons = &mesh.polygons()[0];
    assert_eq!(polygons.primitive_type, PrimitiveType::Polygons);
    assert_eq!(polygons.material_semantic, "stone");
    assert_eq!(polygons.face_count(), 2);
    let vertex = polygons.find_input(Semantic::Vertex).ok_or_else(|| anyhow::anyhow!("no vertex input"))?;
    assert_eq!(vertex.indices(), &[0, 1, 2, 0, 2, 3]);
    let normal = polygons.find_input(Semantic::Normal).ok_or_else(|| anyhow::anyhow!("no normal input"))?;
    assert_eq!(normal.indices(), &[0, 1, 2, 3, 4, 5]);
    // shares the normal indices
    let uv = polygons.find_input(Semantic::TexCoord).ok_or_else(|| anyhow::anyhow!("no uv input"))?;
    assert!(!uv.owns_indices());
    assert_eq!(uv.set, 0);
    Ok(())
}

#[test_log::test]
fn controllers_are_linked_in_dependency_order() -> anyhow::Result<()> {
    let document = read_scene()?;
    let skin = document.find::<Controller>("skin").ok_or_else(|| anyhow::anyhow!("no skin"))?;
    let morph = document.find::<Controller>("morph").ok_or_else(|| anyhow::anyhow!("no morph"))?;
    let quad = document.find::<Geometry>("quad").ok_or_else(|| anyhow::anyhow!("no quad"))?;

    let base = skin.borrow().base_geometry().ok_or_else(|| anyhow::anyhow!("skin chain broken"))?;
    assert!(Rc::ptr_eq(&base, &quad));
    let skin_ref = skin.borrow();
    let skin_controller = skin_ref.skin().ok_or_else(|| anyhow::anyhow!("not a skin"))?;
    assert_eq!(skin_controller.joints(), &["hip".to_string(), "knee".to_string()]);
    assert_eq!(
        skin_controller.bind_shape_transform,
        Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0))
    );

    let morph_ref = morph.borrow();
    let morph_controller = morph_ref.morph().ok_or_else(|| anyhow::anyhow!("not a morph"))?;
    assert_eq!(morph_controller.method, crate::payload::MorphMethod::Relative);
    assert_eq!(morph_controller.targets().len(), 1);
    assert_eq!(morph_controller.targets()[0].weight(), 0.3);
    Ok(())
}

#[test_log::test]
fn scene_references_resolve_lazily() -> anyhow::Result<()> {
    let document = read_scene()?;
    let scene = document.visual_scene_instance().ok_or_else(|| anyhow::anyhow!("no visual scene"))?;
    let found = document.find::<SceneNode>("scene").ok_or_else(|| anyhow::anyhow!("scene not indexed"))?;
    assert!(Rc::ptr_eq(&scene, &found));

    let scene = scene.borrow();
    let node = &scene.children()[0];
    assert_eq!(node.core().dae_id(), "wall-node");
    assert_eq!(node.core().name(), "wall_node");
    let instance = &node.instances()[0];
    assert_eq!(instance.entity_type(), crate::entity::EntityType::Geometry);
    assert_eq!(instance.name(), "the_quad");
    assert_eq!(instance.reference().state(), ResolutionState::Unresolved);
    let quad = document.find::<Geometry>("quad").ok_or_else(|| anyhow::anyhow!("no quad"))?;
    assert!(instance.entity().is_some_and(|e| same_entity(&e, &quad)));

    let missing = &node.children()[0].instances()[0];
    assert!(missing.entity().is_none());
    assert!(missing.reference().is_failed());
    Ok(())
}

#[test_log::test]
fn materials_and_physics_are_wired() -> anyhow::Result<()> {
    let document = read_scene()?;
    let wall = document.find::<Material>("wall").ok_or_else(|| anyhow::anyhow!("no wall"))?;
    assert!(wall.borrow().effect().is_some());

    let shared = document.find::<Material>("shared").ok_or_else(|| anyhow::anyhow!("no shared"))?;
    let placeholder = shared
        .borrow()
        .effect_reference()
        .placeholder()
        .ok_or_else(|| anyhow::anyhow!("external effect has no placeholder"))?;
    assert_eq!(placeholder.file_url(), Path::new("/levels/shared/effects.dae"));
    assert!(!placeholder.is_target_loaded());

    let model = document.find::<PhysicsModel>("crate-model").ok_or_else(|| anyhow::anyhow!("no model"))?;
    let body = model.borrow().find_rigid_body("crate-body").ok_or_else(|| anyhow::anyhow!("no body"))?;
    assert!(!body.borrow().parameters().dynamic);
    assert_eq!(body.borrow().parameters().mass, 20.0);

    let physics = document.physics_scene_instance(0).ok_or_else(|| anyhow::anyhow!("no physics scene"))?;
    let physics = physics.borrow();
    let instance = &physics.model_instances()[0];
    assert!(instance.entity().is_some_and(|e| same_entity(&e, &model)));
    let body_instance = &instance.rigid_body_instances()[0];
    assert_eq!(body_instance.parameters().mass, 20.0);
    assert!(body_instance.target_node().is_some());
    Ok(())
}

#[test]
fn foreign_roots_are_not_documents() -> anyhow::Result<()> {
    let path = scratch_file("foreign.xml", "<svg><rect/></svg>")?;
    let error = XmlDocumentLoader.load(&path).err().ok_or_else(|| anyhow::anyhow!("svg accepted"))?;
    assert!(matches!(error, DocumentError::NotADocument(ref p) if *p == path));
    Ok(())
}

#[test]
fn unreadable_files_are_io_errors() {
    let result = XmlDocumentLoader.load(Path::new("/definitely/not/here.dae"));
    assert!(matches!(result, Err(DocumentError::Io(_))));
}

#[test_log::test]
fn opened_documents_load_their_externals_from_disk() -> anyhow::Result<()> {
    scratch_file(
        "shared/effects.dae",
        r#"<COLLADA><library_effects><effect id="chrome"/></library_effects></COLLADA>"#,
    )?;
    let main = scratch_file("one.dae", SCENE)?;

    let sink = Rc::new(CollectingSink::default());
    let settings = DocumentSettings::default().with_dereference(true).with_sink(sink.clone());
    let document = XmlDocumentLoader::open(&main, settings)?;
    let shared = document.find::<Material>("shared").ok_or_else(|| anyhow::anyhow!("no shared"))?;
    let effect = shared.borrow().effect().ok_or_else(|| anyhow::anyhow!("external effect not loaded"))?;
    assert_eq!(effect.borrow().core().dae_id(), "chrome");

    let loaded = effect.borrow().core().document().ok_or_else(|| anyhow::anyhow!("effect document gone"))?;
    assert!(loaded.settings().resolve.dereference);
    assert!(loaded.settings().loader.is_some());
    assert!(document.visual_scene_instance().is_some());
    assert!(sink.reports().is_empty());
    Ok(())
}

fn scratch_file(name: &str, contents: &str) -> anyhow::Result<PathBuf> {
    let path = std::env::temp_dir()
        .join(format!("scenedoc-loader-{}", std::process::id()))
        .join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, contents)?;
    Ok(path)
}
