use anyhow::Context;
use clap::Parser;
use log::{info, trace};
use scenedoc::document::Document;
use scenedoc::document::library::{Library, LibraryEntity};
use scenedoc::entity::reference::EntityReference;
use scenedoc::extra::Extra;
use scenedoc::loader::XmlDocumentLoader;
use scenedoc::settings::{CliArgs, OperationMode};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = CliArgs::parse();
    trace!("Starting with args: {:?}", args);

    match &args.operation_mode {
        OperationMode::Inspect { file } => {
            let document = XmlDocumentLoader::open(file, args.document_settings())
                .with_context(|| format!("opening {}", file.display()))?;
            inspect(&document);
        }
        OperationMode::Resolve { file, uri } => {
            let settings = args.document_settings();
            let options = settings.resolve;
            let document = XmlDocumentLoader::open(file, settings)
                .with_context(|| format!("opening {}", file.display()))?;

            let reference = EntityReference::new(&document);
            reference.set_uri(uri);
            match reference.entity_with(&options) {
                Some(entity) => {
                    let entity = entity.borrow();
                    println!("{} -> {:?} {}", uri, entity.entity_type(), entity.core().dae_id());
                }
                None => println!("{} -> unresolved ({:?})", uri, reference.state()),
            }
        }
        OperationMode::Animate { file, time } => {
            let document = XmlDocumentLoader::open(file, args.document_settings())
                .with_context(|| format!("opening {}", file.display()))?;
            document.set_current_time(*time);
            info!("evaluated {} animated values at {}", document.animated_value_count(), time);
        }
    }

    Ok(())
}

fn inspect(document: &Document) {
    println!("{}", document.describe());
    let libraries = document.libraries();
    print_library("animations", &libraries.animations);
    print_library("animation clips", &libraries.animation_clips);
    print_library("cameras", &libraries.cameras);
    print_library("controllers", &libraries.controllers);
    print_library("effects", &libraries.effects);
    print_library("emitters", &libraries.emitters);
    print_library("force fields", &libraries.force_fields);
    print_library("geometries", &libraries.geometries);
    print_library("images", &libraries.images);
    print_library("lights", &libraries.lights);
    print_library("materials", &libraries.materials);
    print_library("visual scenes", &libraries.visual_scenes);
    print_library("physics scenes", &libraries.physics_scenes);
    print_library("physics materials", &libraries.physics_materials);
    print_library("physics models", &libraries.physics_models);
    print_extra("  ", &document.extra());

    let placeholders = document.external_references().placeholders();
    if !placeholders.is_empty() {
        println!("external references:");
    }
    for placeholder in placeholders {
        println!(
            "  {} ({} references, loaded: {})",
            placeholder.file_url().display(),
            placeholder.external_reference_count(),
            placeholder.is_target_loaded()
        );
    }
}

fn print_library<T: LibraryEntity>(label: &str, library: &Library<T>) {
    if library.is_empty() {
        return;
    }

    println!("{} ({}):", label, library.len());
    for entity in library.entities() {
        let entity = entity.borrow();
        let core = entity.core();
        println!("  #{} {}", core.dae_id(), core.name());
        print_extra("    ", core.extra());
    }
}

fn print_extra(indent: &str, extra: &Extra) {
    for extra_type in extra.types().iter().filter(|t| t.technique_count() > 0) {
        for technique in extra_type.techniques() {
            println!("{}extra {:?} / {}", indent, extra_type.name(), technique.profile());
        }
    }
}
