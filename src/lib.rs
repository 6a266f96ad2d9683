//! A scene description document model: entities in per-type libraries, change-tracked
//! parameters, extra trees and references that resolve lazily, across documents if need be.

pub mod animated;
pub mod document;
pub mod entity;
pub mod error;
pub mod external;
pub mod extra;
pub mod loader;
pub mod object;
pub mod parameter;
pub mod payload;
pub mod settings;
pub mod util;

pub use document::Document;
pub use entity::reference::EntityReference;
pub use error::DocumentError;
