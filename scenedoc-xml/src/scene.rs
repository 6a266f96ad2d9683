use crate::XmlError;
use crate::element::Element;
use crate::typedefs::{
    AssetType, Collada, ColladaItem, HoleFaceItem, InputType, LibraryEntityType, LibraryItem, LibraryType, MeshItem,
    MeshType, MorphType, NodeItem, NodeType, PolygonsItem, PolygonsType, SkinType,
};
use log::{debug, warn};
use std::str::FromStr;

/// The libraries a document may carry, by their element names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Animation,
    AnimationClip,
    Camera,
    Controller,
    Effect,
    Emitter,
    ForceField,
    Geometry,
    Image,
    Light,
    Material,
    VisualScene,
    PhysicsScene,
    PhysicsMaterial,
    PhysicsModel,
}

impl EntityKind {
    pub fn library_element(&self) -> &'static str {
        match self {
            EntityKind::Animation => "library_animations",
            EntityKind::AnimationClip => "library_animation_clips",
            EntityKind::Camera => "library_cameras",
            EntityKind::Controller => "library_controllers",
            EntityKind::Effect => "library_effects",
            EntityKind::Emitter => "library_emitters",
            EntityKind::ForceField => "library_force_fields",
            EntityKind::Geometry => "library_geometries",
            EntityKind::Image => "library_images",
            EntityKind::Light => "library_lights",
            EntityKind::Material => "library_materials",
            EntityKind::VisualScene => "library_visual_scenes",
            EntityKind::PhysicsScene => "library_physics_scenes",
            EntityKind::PhysicsMaterial => "library_physics_materials",
            EntityKind::PhysicsModel => "library_physics_models",
        }
    }

    pub fn entity_element(&self) -> &'static str {
        match self {
            EntityKind::Animation => "animation",
            EntityKind::AnimationClip => "animation_clip",
            EntityKind::Camera => "camera",
            EntityKind::Controller => "controller",
            EntityKind::Effect => "effect",
            EntityKind::Emitter => "emitter",
            EntityKind::ForceField => "force_field",
            EntityKind::Geometry => "geometry",
            EntityKind::Image => "image",
            EntityKind::Light => "light",
            EntityKind::Material => "material",
            EntityKind::VisualScene => "visual_scene",
            EntityKind::PhysicsScene => "physics_scene",
            EntityKind::PhysicsMaterial => "physics_material",
            EntityKind::PhysicsModel => "physics_model",
        }
    }
}

fn numbers<T: FromStr>(element: &str, text: &str) -> Result<Vec<T>, XmlError> {
    text.split_whitespace()
        .map(str::parse::<T>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| XmlError::Number {
            element: element.to_string(),
        })
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContributorData {
    pub author: String,
    pub authoring_tool: String,
    pub comments: String,
    pub source_data: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssetData {
    pub contributors: Vec<ContributorData>,
    pub title: String,
    pub subject: String,
    pub keywords: String,
    pub unit_name: String,
    pub unit_in_meters: f32,
    /// `X_UP`, `Y_UP` or `Z_UP`.
    pub up_axis: String,
}

impl From<AssetType> for AssetData {
    fn from(asset: AssetType) -> Self {
        let (unit_name, unit_in_meters) = match asset.unit {
            Some(unit) => (unit.name.unwrap_or_else(|| "meter".to_string()), unit.meter.unwrap_or(1.0)),
            None => ("meter".to_string(), 1.0),
        };

        AssetData {
            contributors: asset
                .contributor
                .into_iter()
                .map(|contributor| ContributorData {
                    author: contributor.author,
                    authoring_tool: contributor.authoring_tool,
                    comments: contributor.comments,
                    source_data: contributor.source_data,
                })
                .collect(),
            title: asset.title,
            subject: asset.subject,
            keywords: asset.keywords,
            unit_name,
            unit_in_meters,
            up_axis: asset
                .up_axis
                .filter(|axis| !axis.is_empty())
                .unwrap_or_else(|| "Y_UP".to_string()),
        }
    }
}

/// `<technique profile="...">` and the elements it holds.
#[derive(Debug, Clone, PartialEq)]
pub struct TechniqueData {
    pub profile: String,
    pub nodes: Vec<Element>,
}

/// One `<extra type="...">` block.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtraData {
    pub type_name: String,
    pub techniques: Vec<TechniqueData>,
}

impl ExtraData {
    fn collect(extras: Vec<Element>) -> Vec<ExtraData> {
        extras
            .into_iter()
            .map(|extra| {
                let type_name = extra.attribute("type").unwrap_or_default().to_string();
                let techniques = extra
                    .children
                    .into_iter()
                    .filter(|child| child.name == "technique")
                    .map(|technique| TechniqueData {
                        profile: technique.attribute("profile").unwrap_or_default().to_string(),
                        nodes: technique.children,
                    })
                    .collect();
                ExtraData { type_name, techniques }
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolygonsInputData {
    pub semantic: String,
    /// Source id, without the leading `#`.
    pub source: String,
    pub offset: u32,
    pub set: i32,
}

impl From<&InputType> for PolygonsInputData {
    fn from(input: &InputType) -> Self {
        PolygonsInputData {
            semantic: input.semantic.clone(),
            source: input.source.trim_start_matches('#').to_string(),
            offset: input.offset,
            set: input.set.unwrap_or(-1),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolygonsData {
    /// `polylist`, `polygons`, `triangles`, `lines`, ...
    pub primitive: String,
    pub material: String,
    pub inputs: Vec<PolygonsInputData>,
    pub face_vertex_counts: Vec<u32>,
    pub hole_faces: Vec<u32>,
    /// The interleaved index stream.
    pub indices: Vec<u32>,
}

impl PolygonsData {
    fn from_type(primitive: &str, polygons: PolygonsType) -> Result<Self, XmlError> {
        let inputs = polygons
            .elements
            .iter()
            .filter_map(|item| match item {
                PolygonsItem::Input(input) => Some(PolygonsInputData::from(input)),
                _ => None,
            })
            .collect::<Vec<_>>();
        let stride = inputs.iter().map(|input| input.offset as usize + 1).max().unwrap_or(1);

        let mut face_vertex_counts = Vec::new();
        let mut hole_faces = Vec::new();
        let mut indices = Vec::new();

        for item in polygons.elements {
            match item {
                PolygonsItem::Vcount(text) => face_vertex_counts.extend(numbers::<u32>("vcount", &text)?),
                // one index list for the whole set
                PolygonsItem::P(text) if matches!(primitive, "polylist" | "triangles" | "lines") => {
                    indices.extend(numbers::<u32>("p", &text)?)
                }
                // one face, fan or strip per list
                PolygonsItem::P(text) => {
                    let face = numbers::<u32>("p", &text)?;
                    face_vertex_counts.push((face.len() / stride) as u32);
                    indices.extend(face);
                }
                PolygonsItem::Ph(hole_face) => {
                    for part in hole_face.elements {
                        let (text, hole) = match part {
                            HoleFaceItem::P(text) => (text, false),
                            HoleFaceItem::H(text) => (text, true),
                            HoleFaceItem::Unknown => continue,
                        };
                        if hole {
                            hole_faces.push(face_vertex_counts.len() as u32);
                        }
                        let part = numbers::<u32>(if hole { "h" } else { "p" }, &text)?;
                        face_vertex_counts.push((part.len() / stride) as u32);
                        indices.extend(part);
                    }
                }
                PolygonsItem::Input(_) | PolygonsItem::Unknown => {}
            }
        }

        let degree = match primitive {
            "triangles" => 3,
            "lines" => 2,
            _ => 0,
        };
        if degree > 0 {
            let count = match polygons.count {
                0 => indices.len() / (stride * degree as usize),
                count => count,
            };
            face_vertex_counts = vec![degree; count];
        }

        Ok(PolygonsData {
            primitive: primitive.to_string(),
            material: polygons.material,
            inputs,
            face_vertex_counts,
            hole_faces,
            indices,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    /// Flat xyz triples of the position source.
    pub positions: Vec<f32>,
    pub polygons: Vec<PolygonsData>,
}

impl MeshData {
    fn from_type(mesh: MeshType) -> Result<Self, XmlError> {
        let mut sources = Vec::new();
        let mut position_source = None;
        let mut polygons = Vec::new();

        for item in mesh.elements {
            let (primitive, data) = match item {
                MeshItem::Source(source) => {
                    sources.push(source);
                    continue;
                }
                MeshItem::Vertices(vertices) => {
                    position_source = vertices
                        .input
                        .into_iter()
                        .find(|input| input.semantic == "POSITION")
                        .map(|input| input.source.trim_start_matches('#').to_string());
                    continue;
                }
                MeshItem::Polylist(data) => ("polylist", data),
                MeshItem::Polygons(data) => ("polygons", data),
                MeshItem::Triangles(data) => ("triangles", data),
                MeshItem::Trifans(data) => ("trifans", data),
                MeshItem::Tristrips(data) => ("tristrips", data),
                MeshItem::Lines(data) => ("lines", data),
                MeshItem::Linestrips(data) => ("linestrips", data),
                MeshItem::Unknown => continue,
            };
            polygons.push(PolygonsData::from_type(primitive, data)?);
        }

        let source = match &position_source {
            Some(id) => sources.iter().find(|source| &source.id == id),
            None => sources.first(),
        };
        let positions = match source.and_then(|source| source.float_array.as_deref()) {
            Some(array) => numbers("float_array", array)?,
            None => Vec::new(),
        };

        Ok(MeshData { positions, polygons })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MorphTargetData {
    pub geometry: String,
    pub weight: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ControllerData {
    Skin {
        source: String,
        joints: Vec<String>,
        bind_shape_matrix: Vec<f32>,
    },
    Morph {
        source: String,
        method: String,
        targets: Vec<MorphTargetData>,
    },
}

impl ControllerData {
    fn from_types(skin: Option<SkinType>, morph: Option<MorphType>) -> Result<Option<Self>, XmlError> {
        if let Some(skin) = skin {
            let bind_shape_matrix = match &skin.bind_shape_matrix {
                Some(matrix) => numbers("bind_shape_matrix", matrix)?,
                None => Vec::new(),
            };
            return Ok(Some(ControllerData::Skin {
                source: skin.source,
                joints: skin
                    .joint
                    .into_iter()
                    .map(|joint| joint.name.unwrap_or(joint.text))
                    .collect(),
                bind_shape_matrix,
            }));
        }

        Ok(morph.map(|morph| ControllerData::Morph {
            source: morph.source,
            method: morph.method.unwrap_or_else(|| "NORMALIZED".to_string()),
            targets: morph
                .target
                .into_iter()
                .map(|target| MorphTargetData {
                    geometry: target.geometry,
                    weight: target.weight,
                })
                .collect(),
        }))
    }
}

/// An `instance_*` element.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceData {
    pub element: String,
    pub url: String,
    pub name: String,
    pub extra: Vec<ExtraData>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeData {
    pub id: String,
    pub name: String,
    pub instances: Vec<InstanceData>,
    pub children: Vec<NodeData>,
    pub extra: Vec<ExtraData>,
}

impl From<NodeType> for NodeData {
    fn from(node: NodeType) -> Self {
        let mut instances = Vec::new();
        let mut children = Vec::new();
        let mut extras = Vec::new();

        for item in node.elements {
            let (element, instance) = match item {
                NodeItem::Node(child) => {
                    children.push(NodeData::from(child));
                    continue;
                }
                NodeItem::Extra(extra) => {
                    extras.push(extra);
                    continue;
                }
                NodeItem::InstanceAnimation(instance) => ("instance_animation", instance),
                NodeItem::InstanceCamera(instance) => ("instance_camera", instance),
                NodeItem::InstanceController(instance) => ("instance_controller", instance),
                NodeItem::InstanceEmitter(instance) => ("instance_emitter", instance),
                NodeItem::InstanceForceField(instance) => ("instance_force_field", instance),
                NodeItem::InstanceGeometry(instance) => ("instance_geometry", instance),
                NodeItem::InstanceLight(instance) => ("instance_light", instance),
                NodeItem::InstanceNode(instance) => ("instance_node", instance),
                NodeItem::Unknown => continue,
            };
            instances.push(InstanceData {
                element: element.to_string(),
                url: instance.url,
                name: instance.name,
                extra: ExtraData::collect(instance.extra),
            });
        }

        NodeData {
            id: node.id,
            name: node.name,
            instances,
            children,
            extra: ExtraData::collect(extras),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RigidBodyData {
    pub id: String,
    pub name: String,
    pub dynamic: Option<bool>,
    pub mass: Option<f32>,
}

/// `<instance_physics_model>` with its `(body, target)` rigid body instances.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicsInstanceData {
    pub url: String,
    pub rigid_bodies: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityData {
    pub kind: EntityKind,
    pub id: String,
    pub name: String,
    pub note: String,
    pub asset: Option<AssetData>,
    pub extra: Vec<ExtraData>,
    pub mesh: Option<MeshData>,
    pub controller: Option<ControllerData>,
    /// Material: the `instance_effect` url.
    pub instance_effect: Option<String>,
    /// Image: the `init_from` file.
    pub init_from: Option<String>,
    /// Animation clip: start and end.
    pub clip: Option<(f32, f32)>,
    /// Visual scene: the root nodes.
    pub nodes: Vec<NodeData>,
    pub rigid_bodies: Vec<RigidBodyData>,
    pub physics_instances: Vec<PhysicsInstanceData>,
}

impl EntityData {
    fn from_type(kind: EntityKind, entity: LibraryEntityType) -> Result<Self, XmlError> {
        let mesh = match entity.mesh {
            Some(mesh) => Some(MeshData::from_type(mesh)?),
            None => None,
        };
        let controller = match kind {
            EntityKind::Controller => ControllerData::from_types(entity.skin, entity.morph)?,
            _ => None,
        };
        let clip = match kind {
            EntityKind::AnimationClip => Some((entity.start.unwrap_or(0.0), entity.end.unwrap_or(0.0))),
            _ => None,
        };

        Ok(EntityData {
            kind,
            id: entity.id,
            name: entity.name,
            note: entity.note,
            asset: entity.asset.map(AssetData::from),
            extra: ExtraData::collect(entity.extra),
            mesh,
            controller,
            instance_effect: entity.instance_effect.map(|instance| instance.url),
            init_from: entity.init_from,
            clip,
            nodes: entity.node.into_iter().map(NodeData::from).collect(),
            rigid_bodies: entity
                .rigid_body
                .into_iter()
                .map(|body| RigidBodyData {
                    id: body.id.or(body.sid).unwrap_or_default(),
                    name: body.name,
                    dynamic: body.technique_common.as_ref().and_then(|common| common.dynamic),
                    mass: body.technique_common.as_ref().and_then(|common| common.mass),
                })
                .collect(),
            physics_instances: entity
                .instance_physics_model
                .into_iter()
                .map(|instance| PhysicsInstanceData {
                    url: instance.url,
                    rigid_bodies: instance
                        .instance_rigid_body
                        .into_iter()
                        .map(|body| (body.body, body.target))
                        .collect(),
                })
                .collect(),
        })
    }
}

impl ColladaItem {
    fn library(self) -> Option<(EntityKind, LibraryType)> {
        let library = match self {
            ColladaItem::LibraryAnimations(library) => (EntityKind::Animation, library),
            ColladaItem::LibraryAnimationClips(library) => (EntityKind::AnimationClip, library),
            ColladaItem::LibraryCameras(library) => (EntityKind::Camera, library),
            ColladaItem::LibraryControllers(library) => (EntityKind::Controller, library),
            ColladaItem::LibraryEffects(library) => (EntityKind::Effect, library),
            ColladaItem::LibraryEmitters(library) => (EntityKind::Emitter, library),
            ColladaItem::LibraryForceFields(library) => (EntityKind::ForceField, library),
            ColladaItem::LibraryGeometries(library) => (EntityKind::Geometry, library),
            ColladaItem::LibraryImages(library) => (EntityKind::Image, library),
            ColladaItem::LibraryLights(library) => (EntityKind::Light, library),
            ColladaItem::LibraryMaterials(library) => (EntityKind::Material, library),
            ColladaItem::LibraryVisualScenes(library) => (EntityKind::VisualScene, library),
            ColladaItem::LibraryPhysicsScenes(library) => (EntityKind::PhysicsScene, library),
            ColladaItem::LibraryPhysicsMaterials(library) => (EntityKind::PhysicsMaterial, library),
            ColladaItem::LibraryPhysicsModels(library) => (EntityKind::PhysicsModel, library),
            ColladaItem::Unknown => return None,
        };
        Some(library)
    }
}

impl LibraryItem {
    fn entity(self) -> Option<(EntityKind, LibraryEntityType)> {
        let entity = match self {
            LibraryItem::Animation(entity) => (EntityKind::Animation, entity),
            LibraryItem::AnimationClip(entity) => (EntityKind::AnimationClip, entity),
            LibraryItem::Camera(entity) => (EntityKind::Camera, entity),
            LibraryItem::Controller(entity) => (EntityKind::Controller, entity),
            LibraryItem::Effect(entity) => (EntityKind::Effect, entity),
            LibraryItem::Emitter(entity) => (EntityKind::Emitter, entity),
            LibraryItem::ForceField(entity) => (EntityKind::ForceField, entity),
            LibraryItem::Geometry(entity) => (EntityKind::Geometry, entity),
            LibraryItem::Image(entity) => (EntityKind::Image, entity),
            LibraryItem::Light(entity) => (EntityKind::Light, entity),
            LibraryItem::Material(entity) => (EntityKind::Material, entity),
            LibraryItem::VisualScene(entity) => (EntityKind::VisualScene, entity),
            LibraryItem::PhysicsScene(entity) => (EntityKind::PhysicsScene, entity),
            LibraryItem::PhysicsMaterial(entity) => (EntityKind::PhysicsMaterial, entity),
            LibraryItem::PhysicsModel(entity) => (EntityKind::PhysicsModel, entity),
            LibraryItem::Asset | LibraryItem::Extra | LibraryItem::Unknown => return None,
        };
        Some(entity)
    }
}

/// A parsed document: entities in document order plus the instantiated scenes.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneFile {
    pub asset: Option<AssetData>,
    pub entities: Vec<EntityData>,
    pub visual_scene_url: Option<String>,
    pub physics_scene_urls: Vec<String>,
    pub extra: Vec<ExtraData>,
}

impl SceneFile {
    pub(crate) fn from_collada(collada: Collada) -> Result<Self, XmlError> {
        let mut entities = Vec::new();
        for item in collada.elements {
            let Some((kind, library)) = item.library() else {
                continue;
            };

            for element in library.elements {
                if matches!(element, LibraryItem::Unknown) {
                    warn!("skipping an unknown element in <{}>", kind.library_element());
                    continue;
                }
                match element.entity() {
                    Some((found, entity)) if found == kind => entities.push(EntityData::from_type(kind, entity)?),
                    Some((found, _)) => warn!("skipping <{}> in <{}>", found.entity_element(), kind.library_element()),
                    None => {}
                }
            }
        }
        debug!("read {} entities", entities.len());

        let (visual_scene_url, physics_scene_urls) = match collada.scene {
            Some(scene) => (
                scene.instance_visual_scene.map(|instance| instance.url),
                scene
                    .instance_physics_scene
                    .into_iter()
                    .map(|instance| instance.url)
                    .collect(),
            ),
            None => (None, Vec::new()),
        };

        Ok(SceneFile {
            asset: collada.asset.map(AssetData::from),
            entities,
            visual_scene_url,
            physics_scene_urls,
            extra: ExtraData::collect(collada.extra),
        })
    }

    pub fn find(&self, id: &str) -> Option<&EntityData> {
        self.entities.iter().find(|entity| entity.id == id)
    }
}
