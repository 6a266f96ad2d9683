use crate::document::Document;
use crate::document::library::LibraryEntity;
use crate::entity::asset::{Asset, UpAxis};
use crate::entity::uri::Uri;
use crate::entity::{Entity, EntityCore, EntityRc, EntityType};
use crate::extra::{ENode, Extra};
use crate::payload::{
    Animation, AnimationClip, BaseTarget, Camera, Controller, Effect, Emitter, ForceField, Geometry, Image, Light,
    Material, MorphMethod, Polygons, PrimitiveType, PhysicsMaterial, PhysicsModel, PhysicsScene, SceneNode, Semantic,
};
use glam::{Mat4, Vec3};
use itertools::Itertools;
use log::{debug, trace, warn};
use scenedoc_xml::{
    AssetData, ControllerData, Element, EntityData, EntityKind, ExtraData, InstanceData, MeshData, NodeData,
    PolygonsData, SceneFile,
};
use std::cell::RefCell;
use std::rc::Rc;

pub(super) fn build(document: &Document, scene: &SceneFile) {
    if let Some(asset) = &scene.asset {
        fill_asset(&mut document.asset_mut(), asset);
    }
    fill_extra(&mut document.extra_mut(), &scene.extra);

    let mut controllers = Vec::new();
    let mut physics_scenes = Vec::new();
    for data in &scene.entities {
        match data.kind {
            EntityKind::Animation => {
                add::<Animation>(document, data);
            }
            EntityKind::AnimationClip => {
                let clip = add::<AnimationClip>(document, data);
                if let Some((start, end)) = data.clip {
                    let mut clip = clip.borrow_mut();
                    clip.start = start;
                    clip.end = end;
                }
            }
            EntityKind::Camera => {
                add::<Camera>(document, data);
            }
            EntityKind::Controller => controllers.push((add::<Controller>(document, data), data)),
            EntityKind::Effect => {
                add::<Effect>(document, data);
            }
            EntityKind::Emitter => {
                add::<Emitter>(document, data);
            }
            EntityKind::ForceField => {
                add::<ForceField>(document, data);
            }
            EntityKind::Geometry => {
                let geometry = add::<Geometry>(document, data);
                if let Some(mesh) = &data.mesh {
                    fill_mesh(&mut geometry.borrow_mut(), mesh);
                }
            }
            EntityKind::Image => {
                let image = add::<Image>(document, data);
                image.borrow_mut().filename = data.init_from.clone().unwrap_or_default();
            }
            EntityKind::Light => {
                add::<Light>(document, data);
            }
            EntityKind::Material => {
                let material = add::<Material>(document, data);
                if let Some(url) = &data.instance_effect {
                    material.borrow_mut().set_effect_uri(url);
                }
            }
            EntityKind::VisualScene => {
                let root = add::<SceneNode>(document, data);
                let mut root = root.borrow_mut();
                for node in &data.nodes {
                    fill_node(root.add_child_node(), node);
                }
            }
            EntityKind::PhysicsScene => physics_scenes.push((add::<PhysicsScene>(document, data), data)),
            EntityKind::PhysicsMaterial => {
                add::<PhysicsMaterial>(document, data);
            }
            EntityKind::PhysicsModel => {
                let model = add::<PhysicsModel>(document, data);
                let mut model = model.borrow_mut();
                for body_data in &data.rigid_bodies {
                    let body = model.add_rigid_body(document);
                    let mut body = body.borrow_mut();
                    set_id(body.core_mut(), &body_data.id);
                    body.core_mut().set_name(&body_data.name);
                    let parameters = body.parameters_mut();
                    if let Some(dynamic) = body_data.dynamic {
                        parameters.dynamic = dynamic;
                    }
                    if let Some(mass) = body_data.mass {
                        parameters.mass = mass;
                    }
                }
            }
        }
    }

    // controllers and physics instances point at entities anywhere in the file
    let mut linked = Vec::new();
    for (controller, _) in &controllers {
        link_controller(document, controller, &controllers, &mut linked);
    }
    for (physics_scene, data) in &physics_scenes {
        fill_physics_scene(document, &mut physics_scene.borrow_mut(), data);
    }

    if let Some(url) = &scene.visual_scene_url {
        document.visual_scene_root().set_uri(url);
    }
    for url in &scene.physics_scene_urls {
        document.add_physics_scene_instance_reference().set_uri(url);
    }
    debug!("{}: built {} entities", document.describe(), document.libraries().entity_count());
}

fn add<T: LibraryEntity>(document: &Document, data: &EntityData) -> Rc<RefCell<T>> {
    let entity = document.add_entity::<T>();
    {
        let mut entity = entity.borrow_mut();
        let core = entity.core_mut();
        set_id(core, &data.id);
        core.set_name(&data.name);
        if !data.note.is_empty() {
            core.set_note(&data.note);
        }
        if let Some(asset) = &data.asset {
            fill_asset(core.asset_mut(), asset);
        }
        fill_extra(core.extra_mut(), &data.extra);
    }
    entity
}

fn set_id(core: &mut EntityCore, id: &str) {
    if !id.is_empty() {
        core.set_dae_id(id);
    }
}

fn fill_asset(asset: &mut Asset, data: &AssetData) {
    for contributor_data in &data.contributors {
        let contributor = asset.add_contributor();
        contributor.author = contributor_data.author.clone();
        contributor.authoring_tool = contributor_data.authoring_tool.clone();
        contributor.comments = contributor_data.comments.clone();
        contributor.source_data = contributor_data.source_data.clone();
    }
    asset.title = data.title.clone();
    asset.subject = data.subject.clone();
    asset.keywords = data.keywords.clone();
    asset.unit_name = data.unit_name.clone();
    asset.unit_in_meters = data.unit_in_meters;
    asset.up_axis = match data.up_axis.as_str() {
        "X_UP" => UpAxis::X,
        "Z_UP" => UpAxis::Z,
        "Y_UP" => UpAxis::Y,
        other => {
            warn!("unknown up axis {}, assuming Y_UP", other);
            UpAxis::Y
        }
    };
}

fn fill_extra(extra: &mut Extra, data: &[ExtraData]) {
    for type_data in data {
        let extra_type = extra.add_type(&type_data.type_name);
        for technique_data in &type_data.techniques {
            let technique = extra_type.add_technique(&technique_data.profile);
            for element in &technique_data.nodes {
                fill_extra_node(technique.add_child_node_named(&element.name), element);
            }
        }
    }
}

fn fill_extra_node(node: &mut ENode, element: &Element) {
    for (name, value) in &element.attributes {
        node.add_attribute(name, value);
    }
    if element.children.is_empty() {
        node.set_content(&element.text);
        return;
    }
    for child in &element.children {
        fill_extra_node(node.add_child_node_named(&child.name), child);
    }
}

fn fill_mesh(geometry: &mut Geometry, data: &MeshData) {
    let mesh = geometry.create_mesh();
    mesh.set_positions(
        data.positions
            .iter()
            .tuples()
            .map(|(x, y, z)| Vec3::new(*x, *y, *z))
            .collect(),
    );

    for polygons_data in &data.polygons {
        fill_polygons(mesh.add_polygons(), polygons_data);
    }
}

fn fill_polygons(polygons: &mut Polygons, data: &PolygonsData) {
    polygons.primitive_type = primitive_type(&data.primitive);
    polygons.material_semantic = data.material.clone();
    polygons.set_face_vertex_counts(data.face_vertex_counts.clone());
    for hole in &data.hole_faces {
        polygons.add_hole(*hole);
    }

    let stride = data.inputs.iter().map(|input| input.offset as usize + 1).max().unwrap_or(1);
    let mut owned_offsets = Vec::new();
    for input_data in &data.inputs {
        let input = polygons.add_input(&input_data.source, input_data.offset);
        input.semantic = semantic(&input_data.semantic);
        input.set = input_data.set;

        // inputs sharing an offset share the indices of the first one
        if !owned_offsets.contains(&input_data.offset) {
            owned_offsets.push(input_data.offset);
            input.set_indices(
                data.indices
                    .iter()
                    .skip(input_data.offset as usize)
                    .step_by(stride)
                    .copied()
                    .collect(),
            );
        }
    }
    trace!(
        "{} polygons: {} faces, {} inputs",
        data.primitive,
        polygons.face_count(),
        data.inputs.len()
    );
}

fn primitive_type(name: &str) -> PrimitiveType {
    match name {
        "lines" => PrimitiveType::Lines,
        "linestrips" => PrimitiveType::LineStrips,
        "trifans" => PrimitiveType::TriangleFans,
        "tristrips" => PrimitiveType::TriangleStrips,
        "points" => PrimitiveType::Points,
        _ => PrimitiveType::Polygons,
    }
}

fn semantic(name: &str) -> Semantic {
    match name {
        "POSITION" => Semantic::Position,
        "VERTEX" => Semantic::Vertex,
        "NORMAL" => Semantic::Normal,
        "GEOTANGENT" => Semantic::Geotangent,
        "GEOBINORMAL" => Semantic::Geobinormal,
        "TEXCOORD" => Semantic::TexCoord,
        "TEXTANGENT" => Semantic::TexTangent,
        "TEXBINORMAL" => Semantic::TexBinormal,
        "UV" => Semantic::Uv,
        "COLOR" => Semantic::Color,
        _ => Semantic::Extra,
    }
}

fn instance_type(element: &str) -> EntityType {
    match element {
        "instance_animation" => EntityType::Animation,
        "instance_camera" => EntityType::Camera,
        "instance_controller" => EntityType::Controller,
        "instance_effect" => EntityType::Effect,
        "instance_emitter" => EntityType::Emitter,
        "instance_force_field" => EntityType::ForceField,
        "instance_geometry" => EntityType::Geometry,
        "instance_light" => EntityType::Light,
        "instance_material" => EntityType::Material,
        "instance_physics_material" => EntityType::PhysicsMaterial,
        "instance_physics_model" => EntityType::PhysicsModel,
        _ => EntityType::SceneNode,
    }
}

fn fill_node(node: &mut SceneNode, data: &NodeData) {
    set_id(node.core_mut(), &data.id);
    node.core_mut().set_name(&data.name);
    fill_extra(node.core_mut().extra_mut(), &data.extra);

    for instance_data in &data.instances {
        fill_instance(node, instance_data);
    }
    for child in &data.children {
        fill_node(node.add_child_node(), child);
    }
}

fn fill_instance(node: &mut SceneNode, data: &InstanceData) {
    let instance = node.add_instance_uri(instance_type(&data.element), &data.url);
    if !data.name.is_empty() {
        instance.set_name(&data.name);
    }
    fill_extra(instance.extra_mut(), &data.extra);
}

/// Resolves a controller source inside the document being built.
fn local_target(document: &Document, source: &str) -> Option<BaseTarget> {
    let uri = Uri::parse(source);
    if uri.is_file() {
        warn!("controller source {} lives in another document, leaving it unset", source);
        return None;
    }
    if let Some(geometry) = document.find::<Geometry>(&uri.fragment) {
        return Some(BaseTarget::Geometry(geometry));
    }
    match document.find::<Controller>(&uri.fragment) {
        Some(controller) => Some(BaseTarget::Controller(controller)),
        None => {
            warn!("controller source {} not found", source);
            None
        }
    }
}

/// Links `controller` after whatever it is stacked on, so morph similarity sees complete chains.
fn link_controller(
    document: &Document,
    controller: &Rc<RefCell<Controller>>,
    controllers: &[(Rc<RefCell<Controller>>, &EntityData)],
    linked: &mut Vec<Rc<RefCell<Controller>>>,
) {
    if linked.iter().any(|done| Rc::ptr_eq(done, controller)) {
        return;
    }
    linked.push(controller.clone());

    let Some(data) = controllers
        .iter()
        .find(|(candidate, _)| Rc::ptr_eq(candidate, controller))
        .and_then(|(_, data)| data.controller.as_ref())
    else {
        return;
    };

    let source = match data {
        ControllerData::Skin { source, .. } | ControllerData::Morph { source, .. } => source,
    };
    let target = local_target(document, source);
    if let Some(BaseTarget::Controller(inner)) = &target {
        link_controller(document, inner, controllers, linked);
    }

    let Ok(mut controller) = controller.try_borrow_mut() else {
        warn!("controller {} targets itself", source);
        return;
    };
    match data {
        ControllerData::Skin { joints, bind_shape_matrix, .. } => {
            let skin = controller.create_skin_controller();
            skin.set_target(target.as_ref());
            for joint in joints {
                skin.add_joint(joint);
            }
            if let Ok(matrix) = <[f32; 16]>::try_from(bind_shape_matrix.as_slice()) {
                // written row-major
                skin.bind_shape_transform = Mat4::from_cols_array(&matrix).transpose();
            }
        }
        ControllerData::Morph { method, targets, .. } => {
            let morph = controller.create_morph_controller();
            morph.method = match method.as_str() {
                "RELATIVE" => MorphMethod::Relative,
                _ => MorphMethod::Normalized,
            };
            morph.set_base_target(target.as_ref());
            for target_data in targets {
                let uri = Uri::parse(&target_data.geometry);
                let Some(geometry) = document.find::<Geometry>(&uri.fragment) else {
                    warn!("morph target {} not found", target_data.geometry);
                    continue;
                };
                if morph.add_target(&geometry, target_data.weight).is_none() {
                    warn!("morph target {} does not match its base", target_data.geometry);
                }
            }
        }
    }
}

fn fill_physics_scene(document: &Document, scene: &mut PhysicsScene, data: &EntityData) {
    for instance_data in &data.physics_instances {
        let instance = scene.add_model_instance(None);
        instance.set_uri(&instance_data.url);

        let uri = Uri::parse(&instance_data.url);
        let model = match uri.is_file() {
            true => None,
            false => document.find::<PhysicsModel>(&uri.fragment),
        };
        for (body_id, target) in &instance_data.rigid_bodies {
            let body = model.as_ref().and_then(|model| model.borrow().find_rigid_body(body_id));
            let body_instance = instance.add_rigid_body_instance(body.as_ref());
            if body.is_none() {
                debug!("rigid body {} of {} stays unbound", body_id, instance_data.url);
            }

            let node: Option<EntityRc> = document.find_entity(&Uri::parse(target).fragment);
            body_instance.set_target_node(node.as_ref());
        }
    }
}
