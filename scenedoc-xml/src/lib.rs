//! Reader for the textual scene description format. Documents are deserialized into the fixed
//! shapes of [`typedefs`], then into plain data-transfer structs ([`SceneFile`]) that the document
//! model consumes. `<extra>` blocks stay generic [`Element`] trees.

use crate::typedefs::Collada;
use quick_xml::Reader;
use quick_xml::de::Deserializer;
use quick_xml::events::Event;
use serde::Deserialize;
use thiserror::Error;

pub mod element;
pub mod scene;
pub mod typedefs;

pub use element::Element;
pub use scene::{
    AssetData, ContributorData, ControllerData, EntityData, EntityKind, ExtraData, InstanceData, MeshData, MorphTargetData,
    NodeData, PhysicsInstanceData, PolygonsData, PolygonsInputData, RigidBodyData, SceneFile, TechniqueData,
};

#[derive(Error, Debug)]
pub enum XmlError {
    #[error("malformed xml")]
    Xml(#[from] quick_xml::Error),
    #[error("the document does not match the expected layout")]
    Layout(#[from] quick_xml::DeError),
    #[error("the document has no root element")]
    Empty,
    #[error("expected a <COLLADA> root, found <{0}>")]
    UnexpectedRoot(String),
    #[error("<{element}> holds a malformed number list")]
    Number { element: String },
}

fn root_name(xml: &str) -> Result<String, XmlError> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event()? {
            Event::Start(start) | Event::Empty(start) => {
                return Ok(String::from_utf8_lossy(start.local_name().as_ref()).into_owned());
            }
            Event::Eof => return Err(XmlError::Empty),
            _ => {}
        }
    }
}

/// Parses a whole scene description document.
pub fn parse_scene(xml: &str) -> Result<SceneFile, XmlError> {
    let root = root_name(xml)?;
    if root != "COLLADA" {
        return Err(XmlError::UnexpectedRoot(root));
    }

    let mut deserializer = Deserializer::from_str(xml);
    let collada = Collada::deserialize(&mut deserializer)?;
    SceneFile::from_collada(collada)
}
