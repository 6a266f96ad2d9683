use crate::element::Element;
use serde_derive::Deserialize;

#[derive(Deserialize, Debug)]
pub struct Collada {
    pub asset: Option<AssetType>,
    pub scene: Option<SceneType>,
    #[serde(default)]
    pub extra: Vec<Element>,
    #[serde(rename = "$value")]
    #[serde(default)]
    pub elements: Vec<ColladaItem>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "snake_case")]
pub enum ColladaItem {
    LibraryAnimations(LibraryType),
    LibraryAnimationClips(LibraryType),
    LibraryCameras(LibraryType),
    LibraryControllers(LibraryType),
    LibraryEffects(LibraryType),
    LibraryEmitters(LibraryType),
    LibraryForceFields(LibraryType),
    LibraryGeometries(LibraryType),
    LibraryImages(LibraryType),
    LibraryLights(LibraryType),
    LibraryMaterials(LibraryType),
    LibraryVisualScenes(LibraryType),
    LibraryPhysicsScenes(LibraryType),
    LibraryPhysicsMaterials(LibraryType),
    LibraryPhysicsModels(LibraryType),

    #[serde(other)]
    Unknown,
}

#[derive(Deserialize, Debug)]
pub struct LibraryType {
    #[serde(rename = "$value")]
    #[serde(default)]
    pub elements: Vec<LibraryItem>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "snake_case")]
pub enum LibraryItem {
    Animation(LibraryEntityType),
    AnimationClip(LibraryEntityType),
    Camera(LibraryEntityType),
    Controller(LibraryEntityType),
    Effect(LibraryEntityType),
    Emitter(LibraryEntityType),
    ForceField(LibraryEntityType),
    Geometry(LibraryEntityType),
    Image(LibraryEntityType),
    Light(LibraryEntityType),
    Material(LibraryEntityType),
    VisualScene(LibraryEntityType),
    PhysicsScene(LibraryEntityType),
    PhysicsMaterial(LibraryEntityType),
    PhysicsModel(LibraryEntityType),
    Asset,
    Extra,

    #[serde(other)]
    Unknown,
}

#[derive(Deserialize, Debug, Default)]
pub struct ContributorType {
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub authoring_tool: String,
    #[serde(default)]
    pub comments: String,
    #[serde(default)]
    pub source_data: String,
}

#[derive(Deserialize, Debug)]
pub struct UnitType {
    #[serde(rename = "@name")]
    pub name: Option<String>,
    #[serde(rename = "@meter")]
    pub meter: Option<f32>,
}

#[derive(Deserialize, Debug)]
pub struct AssetType {
    #[serde(default)]
    pub contributor: Vec<ContributorType>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub keywords: String,
    pub unit: Option<UnitType>,
    pub up_axis: Option<String>,
}

/// Every library entity element. Which of the children are present depends on the library.
#[derive(Deserialize, Debug)]
pub struct LibraryEntityType {
    #[serde(rename = "@id")]
    #[serde(default)]
    pub id: String,
    #[serde(rename = "@name")]
    #[serde(default)]
    pub name: String,
    #[serde(rename = "@start")]
    pub start: Option<f32>,
    #[serde(rename = "@end")]
    pub end: Option<f32>,

    #[serde(default)]
    pub note: String,
    pub asset: Option<AssetType>,
    #[serde(default)]
    pub extra: Vec<Element>,

    pub mesh: Option<MeshType>,
    pub skin: Option<SkinType>,
    pub morph: Option<MorphType>,
    pub instance_effect: Option<UrlType>,
    pub init_from: Option<String>,
    #[serde(default)]
    pub node: Vec<NodeType>,
    #[serde(default)]
    pub rigid_body: Vec<RigidBodyType>,
    #[serde(default)]
    pub instance_physics_model: Vec<PhysicsInstanceType>,
}

#[derive(Deserialize, Debug)]
pub struct UrlType {
    #[serde(rename = "@url")]
    #[serde(default)]
    pub url: String,
}

#[derive(Deserialize, Debug)]
pub struct MeshType {
    #[serde(rename = "$value")]
    #[serde(default)]
    pub elements: Vec<MeshItem>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "lowercase")]
pub enum MeshItem {
    Source(SourceType),
    Vertices(VerticesType),
    Polylist(PolygonsType),
    Polygons(PolygonsType),
    Triangles(PolygonsType),
    Trifans(PolygonsType),
    Tristrips(PolygonsType),
    Lines(PolygonsType),
    Linestrips(PolygonsType),

    #[serde(other)]
    Unknown,
}

#[derive(Deserialize, Debug)]
pub struct SourceType {
    #[serde(rename = "@id")]
    #[serde(default)]
    pub id: String,
    pub float_array: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct VerticesType {
    #[serde(default)]
    pub input: Vec<InputType>,
}

#[derive(Deserialize, Debug)]
pub struct InputType {
    #[serde(rename = "@semantic")]
    #[serde(default)]
    pub semantic: String,
    #[serde(rename = "@source")]
    #[serde(default)]
    pub source: String,
    #[serde(rename = "@offset")]
    #[serde(default)]
    pub offset: u32,
    #[serde(rename = "@set")]
    pub set: Option<i32>,
}

#[derive(Deserialize, Debug)]
pub struct PolygonsType {
    #[serde(rename = "@count")]
    #[serde(default)]
    pub count: usize,
    #[serde(rename = "@material")]
    #[serde(default)]
    pub material: String,
    #[serde(rename = "$value")]
    #[serde(default)]
    pub elements: Vec<PolygonsItem>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "lowercase")]
pub enum PolygonsItem {
    Input(InputType),
    Vcount(String),
    P(String),
    Ph(HoleFaceType),

    #[serde(other)]
    Unknown,
}

/// `<ph>`: one face followed by the holes cut into it.
#[derive(Deserialize, Debug)]
pub struct HoleFaceType {
    #[serde(rename = "$value")]
    #[serde(default)]
    pub elements: Vec<HoleFaceItem>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "lowercase")]
pub enum HoleFaceItem {
    P(String),
    H(String),

    #[serde(other)]
    Unknown,
}

#[derive(Deserialize, Debug)]
pub struct JointType {
    #[serde(rename = "@name")]
    pub name: Option<String>,
    #[serde(rename = "$text")]
    #[serde(default)]
    pub text: String,
}

#[derive(Deserialize, Debug)]
pub struct SkinType {
    #[serde(rename = "@source")]
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub joint: Vec<JointType>,
    pub bind_shape_matrix: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct MorphTargetType {
    #[serde(rename = "@geometry")]
    #[serde(default)]
    pub geometry: String,
    #[serde(rename = "@weight")]
    #[serde(default)]
    pub weight: f32,
}

#[derive(Deserialize, Debug)]
pub struct MorphType {
    #[serde(rename = "@source")]
    #[serde(default)]
    pub source: String,
    #[serde(rename = "@method")]
    pub method: Option<String>,
    #[serde(default)]
    pub target: Vec<MorphTargetType>,
}

#[derive(Deserialize, Debug)]
pub struct NodeType {
    #[serde(rename = "@id")]
    #[serde(default)]
    pub id: String,
    #[serde(rename = "@name")]
    #[serde(default)]
    pub name: String,
    #[serde(rename = "$value")]
    #[serde(default)]
    pub elements: Vec<NodeItem>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "snake_case")]
pub enum NodeItem {
    Node(NodeType),
    InstanceAnimation(InstanceType),
    InstanceCamera(InstanceType),
    InstanceController(InstanceType),
    InstanceEmitter(InstanceType),
    InstanceForceField(InstanceType),
    InstanceGeometry(InstanceType),
    InstanceLight(InstanceType),
    InstanceNode(InstanceType),
    Extra(Element),

    #[serde(other)]
    Unknown,
}

#[derive(Deserialize, Debug)]
pub struct InstanceType {
    #[serde(rename = "@url")]
    #[serde(default)]
    pub url: String,
    #[serde(rename = "@name")]
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub extra: Vec<Element>,
}

#[derive(Deserialize, Debug)]
pub struct RigidBodyCommonType {
    pub dynamic: Option<bool>,
    pub mass: Option<f32>,
}

#[derive(Deserialize, Debug)]
pub struct RigidBodyType {
    #[serde(rename = "@id")]
    pub id: Option<String>,
    #[serde(rename = "@sid")]
    pub sid: Option<String>,
    #[serde(rename = "@name")]
    #[serde(default)]
    pub name: String,
    pub technique_common: Option<RigidBodyCommonType>,
}

#[derive(Deserialize, Debug)]
pub struct RigidBodyInstanceType {
    #[serde(rename = "@body")]
    #[serde(default)]
    pub body: String,
    #[serde(rename = "@target")]
    #[serde(default)]
    pub target: String,
}

#[derive(Deserialize, Debug)]
pub struct PhysicsInstanceType {
    #[serde(rename = "@url")]
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub instance_rigid_body: Vec<RigidBodyInstanceType>,
}

#[derive(Deserialize, Debug)]
pub struct SceneType {
    #[serde(default)]
    pub instance_physics_scene: Vec<UrlType>,
    pub instance_visual_scene: Option<UrlType>,
}
