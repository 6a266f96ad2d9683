use crate::error::ErrorSink;
use crate::loader::DocumentLoader;
use clap::{Parser, Subcommand};
use std::fmt::{Debug, Formatter};
use std::path::PathBuf;
use std::rc::Rc;

/// How entity references resolve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Load external documents on demand and report every failed lookup to the error sink.
    /// Without it, unavailable external targets are silently deferred.
    pub dereference: bool,
}

/// Per-document configuration. Documents loaded through a placeholder inherit whatever their
/// loader did not set.
#[derive(Clone, Default)]
pub struct DocumentSettings {
    pub resolve: ResolveOptions,
    pub loader: Option<Rc<dyn DocumentLoader>>,
    pub sink: Option<Rc<dyn ErrorSink>>,
}

impl DocumentSettings {
    pub fn with_loader(mut self, loader: Rc<dyn DocumentLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn with_sink(mut self, sink: Rc<dyn ErrorSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_dereference(mut self, dereference: bool) -> Self {
        self.resolve.dereference = dereference;
        self
    }

    pub(crate) fn inherit(&mut self, parent: &DocumentSettings) {
        if self.loader.is_none() {
            self.loader = parent.loader.clone();
        }
        if self.sink.is_none() {
            self.sink = parent.sink.clone();
        }
        self.resolve = parent.resolve;
    }
}

impl Debug for DocumentSettings {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentSettings")
            .field("resolve", &self.resolve)
            .field("loader", &self.loader.is_some())
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

#[derive(Parser, Debug)]
#[command(name = "scenedoc")]
#[command(version)]
#[command(about = "Inspects scene description documents and resolves their references")]
pub struct CliArgs {
    /// Load external documents on demand and report unresolvable references.
    #[arg(long, env = "SCENEDOC_DEREFERENCE", default_value_t = false)]
    pub dereference: bool,

    #[command(subcommand)]
    pub operation_mode: OperationMode,
}

#[derive(Subcommand, Debug)]
pub enum OperationMode {
    /// Lists libraries, entities, extra trees and external references.
    Inspect { file: PathBuf },
    /// Resolves `uri` (`[file]#id`) against the document.
    Resolve { file: PathBuf, uri: String },
    /// Evaluates every animated value at `time`.
    Animate {
        file: PathBuf,
        #[arg(long, default_value_t = 0.0)]
        time: f32,
    },
}

impl CliArgs {
    pub fn document_settings(&self) -> DocumentSettings {
        DocumentSettings::default().with_dereference(self.dereference)
    }
}
