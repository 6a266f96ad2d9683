//! Producing documents: the loader seam placeholders go through, and the xml implementation of it.

use crate::document::Document;
use crate::error::DocumentError;
use crate::settings::DocumentSettings;
use log::{debug, info};
use scenedoc_xml::XmlError;
use std::path::Path;
use std::rc::Rc;

mod convert;

#[cfg(test)]
mod tests;

/// Builds the document stored at an absolute file url. Only placeholders call this, and only
/// when a reference is resolved with dereferencing enabled.
pub trait DocumentLoader {
    fn load(&self, url: &Path) -> Result<Document, DocumentError>;
}

/// Adapts a closure, mostly for tests and tools that keep documents in memory.
pub struct FnLoader<F>(pub F);

impl<F> DocumentLoader for FnLoader<F>
where
    F: Fn(&Path) -> Result<Document, DocumentError>,
{
    fn load(&self, url: &Path) -> Result<Document, DocumentError> {
        (self.0)(url)
    }
}

/// Reads documents from the filesystem through `scenedoc-xml`.
#[derive(Debug, Default, Clone, Copy)]
pub struct XmlDocumentLoader;

impl XmlDocumentLoader {
    /// Opens the root document of a session. Unless `settings` bring their own, this loader also
    /// serves the document's external references.
    pub fn open(path: &Path, settings: DocumentSettings) -> Result<Document, DocumentError> {
        let settings = match settings.loader {
            Some(_) => settings,
            None => settings.with_loader(Rc::new(XmlDocumentLoader)),
        };

        let document = Document::with_settings(settings);
        document.set_file_url(path);
        read_file(&document, path)?;
        Ok(document)
    }

    /// Fills `document` from an in-memory text. Relative urls resolve against the document's
    /// file url, so set that first.
    pub fn read_str(document: &Document, xml: &str) -> Result<(), DocumentError> {
        let scene = scenedoc_xml::parse_scene(xml)?;
        convert::build(document, &scene);
        Ok(())
    }
}

fn read_file(document: &Document, path: &Path) -> Result<(), DocumentError> {
    info!("reading {}", path.display());
    let xml = std::fs::read_to_string(path)?;
    match XmlDocumentLoader::read_str(document, &xml) {
        Err(DocumentError::Xml(XmlError::UnexpectedRoot(root))) => {
            debug!("{} has a <{}> root", path.display(), root);
            Err(DocumentError::NotADocument(path.to_path_buf()))
        }
        result => result,
    }
}

impl DocumentLoader for XmlDocumentLoader {
    fn load(&self, url: &Path) -> Result<Document, DocumentError> {
        let document = Document::new();
        document.set_file_url(url);
        read_file(&document, url)?;
        Ok(document)
    }
}
