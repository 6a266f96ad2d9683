use super::*;
use crate::error::{CollectingSink, DocumentError, ErrorCode};
use crate::loader::FnLoader;
use crate::parameter::CloneParameter;
use crate::payload::{Effect, Geometry, Material};
use crate::settings::{DocumentSettings, ResolveOptions};
use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

const DEREFERENCE: ResolveOptions = ResolveOptions { dereference: true };

fn document_at(path: &str) -> Document {
    let document = Document::new();
    document.set_file_url(Path::new(path));
    document
}

fn effect_document(url: &Path, id: &str) -> Document {
    let document = Document::new();
    document.set_file_url(url);
    document.add_entity::<Effect>().borrow_mut().core_mut().set_dae_id(id);
    document
}

#[test]
fn clean_name_replaces_rejected_characters() {
    assert_eq!(clean_name("my node"), "my_node");
    assert_eq!(clean_name("1st"), "_st");
    assert_eq!(clean_name("a:b.c"), "a_b_c");
    assert_eq!(clean_name("arm-left_2"), "arm-left_2");
    assert_eq!(clean_id("mesh.001"), "mesh.001");
    assert_eq!(clean_id(".hidden"), "_hidden");
}

#[test]
fn clean_name_is_idempotent() {
    for name in ["", "Hello World", "-_-", "ünï", "x.y:z", "9lives"] {
        let once = clean_name(name);
        assert_eq!(clean_name(&once), once);
    }
    assert_eq!(clean_name(&"n".repeat(MAX_NAME_LENGTH + 20)).len(), MAX_NAME_LENGTH);
}

#[test_log::test]
fn find_entity_sees_new_entities_and_their_renames() -> anyhow::Result<()> {
    let document = Document::new();
    let geometry = document.add_entity::<Geometry>();
    let generated = geometry.borrow().core().dae_id().to_string();
    assert!(!generated.is_empty());
    assert!(document.find_entity(&generated).is_some());

    geometry.borrow_mut().core_mut().set_dae_id("hull");
    assert!(document.find_entity(&generated).is_none());
    let found = document.find_entity("hull").ok_or_else(|| anyhow::anyhow!("hull not indexed"))?;
    assert!(same_entity(&found, &geometry));

    // taken ids are suffixed
    let other = document.add_entity::<Geometry>();
    other.borrow_mut().core_mut().set_dae_id("hull");
    assert_eq!(other.borrow().core().dae_id(), "hull_1");
    Ok(())
}

#[test]
fn entities_stay_unindexed_until_inserted() {
    let document = Document::new();
    let effect = new_entity::<Effect>(&document);
    effect.borrow_mut().core_mut().set_dae_id("loose");
    assert!(document.find_entity("loose").is_none());

    document.insert_entity(effect.clone());
    assert!(effect.borrow().core().is_in_library());
    assert!(document.find_entity("loose").is_some());
}

#[test]
fn hierarchical_asset_falls_back_to_the_document() {
    let document = Document::new();
    document.asset_mut().title = "level".to_string();
    let effect = document.add_entity::<Effect>();
    assert_eq!(effect.borrow().core().hierarchical_asset().map(|a| a.title), Some("level".to_string()));

    effect.borrow_mut().core_mut().asset_mut().title = "override".to_string();
    assert_eq!(effect.borrow().core().hierarchical_asset().map(|a| a.title), Some("override".to_string()));
}

#[test_log::test]
fn local_uri_resolves_on_access() -> anyhow::Result<()> {
    let document = Document::new();
    let geometry = document.add_entity::<Geometry>();
    geometry.borrow_mut().core_mut().set_dae_id("geom1");

    let reference = EntityReference::new(&document);
    reference.set_uri("#geom1");
    assert_eq!(reference.state(), ResolutionState::Unresolved);
    assert_eq!(reference.entity_id(), "geom1");
    assert!(reference.placeholder().is_none());

    let entity = reference.entity().ok_or_else(|| anyhow::anyhow!("geom1 did not resolve"))?;
    assert!(same_entity(&entity, &geometry));
    assert_eq!(reference.state(), ResolutionState::Resolved);
    assert_eq!(reference.uri(), "#geom1");
    Ok(())
}

#[test]
fn uri_naming_the_own_file_needs_no_placeholder() {
    let document = document_at("/scenes/level.dae");
    let reference = EntityReference::new(&document);
    reference.set_uri("level.dae#thing");
    assert!(reference.placeholder().is_none());
    assert_eq!(document.external_references().placeholder_count(), 0);
}

#[test]
fn external_uri_defers_without_dereference() {
    let sink = Rc::new(CollectingSink::default());
    let document = Document::with_settings(DocumentSettings::default().with_sink(sink.clone()));
    document.set_file_url(Path::new("/scenes/level.dae"));

    let reference = EntityReference::new(&document);
    reference.set_uri("props/crate.dae#lid");
    let placeholder = reference.placeholder().expect("bound to a placeholder");
    assert_eq!(placeholder.file_url(), Path::new("/scenes/props/crate.dae"));
    assert_eq!(placeholder.external_reference_count(), 1);

    assert!(reference.entity().is_none());
    assert_eq!(reference.state(), ResolutionState::Unresolved);
    assert!(!placeholder.is_target_loaded());
    assert!(sink.reports().is_empty());
    assert_eq!(reference.uri(), "/scenes/props/crate.dae#lid");
}

#[test_log::test]
fn missing_external_target_is_reported_when_dereferencing() {
    let sink = Rc::new(CollectingSink::default());
    let document = Document::with_settings(DocumentSettings::default().with_sink(sink.clone()));
    document.set_file_url(Path::new("/scenes/level.dae"));

    let reference = EntityReference::new(&document);
    reference.set_uri("gone.dae#x");
    assert!(reference.entity_with(&DEREFERENCE).is_none());
    assert!(reference.is_failed());
    // no loader configured
    assert_eq!(sink.count(ErrorCode::ExternalLoadFailed), 1);
    assert_eq!(sink.count(ErrorCode::MissingUriTarget), 1);

    // failed references stay quiet until re-armed
    assert!(reference.entity_with(&DEREFERENCE).is_none());
    assert_eq!(sink.count(ErrorCode::MissingUriTarget), 1);
    reference.reset();
    assert!(reference.entity_with(&DEREFERENCE).is_none());
    assert_eq!(sink.count(ErrorCode::MissingUriTarget), 2);
}

#[test]
fn local_miss_reports_only_when_dereferencing() {
    let sink = Rc::new(CollectingSink::default());
    let document = Document::with_settings(DocumentSettings::default().with_sink(sink.clone()));

    let quiet = EntityReference::new(&document);
    quiet.set_uri("#nothing");
    assert!(quiet.entity().is_none());
    assert!(quiet.is_failed());
    assert!(sink.reports().is_empty());

    let loud = EntityReference::new(&document);
    loud.set_uri("#nothing");
    assert!(loud.entity_with(&DEREFERENCE).is_none());
    assert_eq!(sink.count(ErrorCode::InvalidUri), 1);
}

#[test]
fn set_uri_rearms_a_failed_reference() {
    let document = Document::new();
    let reference = EntityReference::new(&document);
    reference.set_uri("#later");
    assert!(reference.entity().is_none());
    assert!(reference.is_failed());

    document.add_entity::<Effect>().borrow_mut().core_mut().set_dae_id("later");
    assert!(reference.entity().is_none());
    reference.set_uri("#later");
    assert!(reference.entity().is_some());
}

#[test_log::test]
fn external_uri_loads_through_the_configured_loader() -> anyhow::Result<()> {
    let loads = Rc::new(RefCell::new(Vec::<PathBuf>::new()));
    let seen = loads.clone();
    let loader = FnLoader(move |url: &Path| -> Result<Document, DocumentError> {
        seen.borrow_mut().push(url.to_path_buf());
        Ok(effect_document(url, "shiny"))
    });
    let settings = DocumentSettings::default()
        .with_loader(Rc::new(loader))
        .with_dereference(true);
    let document = Document::with_settings(settings);
    document.set_file_url(Path::new("/scenes/level.dae"));

    let material = document.add_entity::<Material>();
    material.borrow_mut().set_effect_uri("../shared/effects.dae#shiny");
    let effect = material.borrow().effect_reference().entity();
    let effect = effect.ok_or_else(|| anyhow::anyhow!("external effect did not resolve"))?;
    assert_eq!(effect.borrow().core().dae_id(), "shiny");
    assert_eq!(*loads.borrow(), vec![PathBuf::from("/shared/effects.dae")]);

    let loaded = effect.borrow().core().document().ok_or_else(|| anyhow::anyhow!("orphaned effect"))?;
    assert!(loaded.settings().resolve.dereference);
    assert_eq!(loaded.file_url(), Some(PathBuf::from("/shared/effects.dae")));

    let typed = material.borrow().effect().ok_or_else(|| anyhow::anyhow!("effect lost its type"))?;
    assert!(same_entity(&effect, &typed));

    // a second reference shares the loaded document
    let again = EntityReference::new(&document);
    again.set_uri("/shared/effects.dae#shiny");
    assert!(again.entity().is_some());
    assert_eq!(loads.borrow().len(), 1);
    assert_eq!(document.external_references().placeholder_count(), 1);
    Ok(())
}

#[test]
fn loader_errors_are_warnings() {
    let sink = Rc::new(CollectingSink::default());
    let loader = FnLoader(|url: &Path| -> Result<Document, DocumentError> {
        Err(DocumentError::LoaderFailed {
            path: url.to_path_buf(),
            reason: "disk on fire".to_string(),
        })
    });
    let settings = DocumentSettings::default().with_loader(Rc::new(loader)).with_sink(sink.clone());
    let document = Document::with_settings(settings);
    document.set_file_url(Path::new("/a/level.dae"));

    let reference = EntityReference::new(&document);
    reference.set_uri("b.dae#x");
    assert!(reference.entity_with(&DEREFERENCE).is_none());

    let reports = sink.reports();
    assert_eq!(reports[0].code, ErrorCode::ExternalLoadFailed);
    assert_eq!(reports[0].level, crate::error::ErrorLevel::Warning);
    assert!(reports[0].message.contains("disk on fire"));
}

#[test]
fn set_entity_in_the_same_document_needs_no_placeholder() {
    let document = Document::new();
    let effect: EntityRc = document.add_entity::<Effect>();
    let reference = EntityReference::new(&document);
    reference.set_entity(Some(&effect));
    assert!(reference.placeholder().is_none());
    assert_eq!(reference.state(), ResolutionState::Resolved);
}

#[test_log::test]
fn set_entity_across_documents_links_a_placeholder() -> anyhow::Result<()> {
    let owner = document_at("/a/scene.dae");
    let other = effect_document(Path::new("/b/effects.dae"), "fx");
    let effect = other.find_entity("fx").ok_or_else(|| anyhow::anyhow!("fx missing"))?;

    let reference = EntityReference::new(&owner);
    reference.set_entity(Some(&effect));
    let placeholder = reference.placeholder().ok_or_else(|| anyhow::anyhow!("no placeholder"))?;
    assert!(placeholder.is_target_loaded());
    assert_eq!(placeholder.file_url(), Path::new("/b/effects.dae"));
    assert_eq!(reference.uri(), "/b/effects.dae#fx");

    // the linked document is not owned by the placeholder
    drop(effect);
    drop(other);
    assert!(!placeholder.is_target_loaded());
    assert_eq!(reference.state(), ResolutionState::Unresolved);
    assert_eq!(reference.entity_id(), "fx");
    Ok(())
}

#[test_log::test]
fn set_entity_resolves_without_loading() -> anyhow::Result<()> {
    let loads = Rc::new(Cell::new(0));
    let counter = loads.clone();
    let loader = FnLoader(move |url: &Path| -> Result<Document, DocumentError> {
        counter.set(counter.get() + 1);
        Ok(effect_document(url, "fx"))
    });
    let owner = Document::with_settings(
        DocumentSettings::default()
            .with_loader(Rc::new(loader))
            .with_dereference(true),
    );
    owner.set_file_url(Path::new("/a/scene.dae"));
    let other = effect_document(Path::new("/b/effects.dae"), "fx");
    let effect = other.find_entity("fx").ok_or_else(|| anyhow::anyhow!("fx missing"))?;

    let reference = EntityReference::new(&owner);
    reference.set_entity(Some(&effect));
    let resolved = reference.entity().ok_or_else(|| anyhow::anyhow!("attached entity lost"))?;
    assert!(Rc::ptr_eq(&resolved, &effect));
    let resolved = reference
        .entity_with(&DEREFERENCE)
        .ok_or_else(|| anyhow::anyhow!("attached entity lost"))?;
    assert!(Rc::ptr_eq(&resolved, &effect));
    assert_eq!(loads.get(), 0);
    Ok(())
}

#[test_log::test]
fn cloned_references_keep_searching_the_foreign_document() -> anyhow::Result<()> {
    let owner = Document::new();
    owner.add_entity::<Effect>().borrow_mut().core_mut().set_dae_id("fx");
    // never saved, so its placeholder has no file url to fall back on
    let other = Document::new();
    let foreign = other.add_entity::<Effect>();
    foreign.borrow_mut().core_mut().set_dae_id("fx");

    let reference = EntityReference::new(&owner);
    let entity: EntityRc = foreign.clone();
    reference.set_entity(Some(&entity));
    drop(entity);
    assert!(other.release_entity(&foreign));
    drop(foreign);
    assert_eq!(reference.entity_id(), "fx");
    let placeholder = reference.placeholder().ok_or_else(|| anyhow::anyhow!("no placeholder"))?;

    let mut copy = EntityReference::new(&owner);
    reference.clone_parameter(&mut copy);
    assert!(copy.placeholder().is_some_and(|p| Rc::ptr_eq(&p, &placeholder)));
    assert_eq!(placeholder.external_reference_count(), 2);
    assert!(copy.entity_with(&DEREFERENCE).is_none());
    assert!(copy.is_failed());

    // into a third document, the open target is linked again
    let elsewhere = Document::new();
    let mut linked = EntityReference::new(&elsewhere);
    reference.clone_parameter(&mut linked);
    let relinked = linked.placeholder().ok_or_else(|| anyhow::anyhow!("not relinked"))?;
    assert!(relinked.target(false).is_some_and(|target| target.ptr_eq(&other)));
    assert_eq!(linked.entity_id(), "fx");

    // once the unsaved document is gone nothing can stand in for it
    drop(other);
    let mut orphan = EntityReference::new(&elsewhere);
    reference.clone_parameter(&mut orphan);
    assert!(orphan.placeholder().is_none());
    assert!(orphan.is_failed());
    assert!(orphan.entity().is_none());
    Ok(())
}

#[test]
fn release_keeps_the_last_known_id() {
    let document = Document::new();
    let geometry = document.add_entity::<Geometry>();
    geometry.borrow_mut().core_mut().set_dae_id("doomed");

    let reference = EntityReference::new(&document);
    let entity: EntityRc = geometry.clone();
    reference.set_entity(Some(&entity));
    drop(entity);

    // renames travel with the tracked entity
    geometry.borrow_mut().core_mut().set_dae_id("renamed");
    assert_eq!(reference.uri(), "#renamed");

    assert!(document.release_entity(&geometry));
    drop(geometry);
    assert_eq!(reference.state(), ResolutionState::Unresolved);
    assert_eq!(reference.entity_id(), "renamed");
    assert!(document.find_entity("renamed").is_none());

    // a replacement with the same id is picked up
    let replacement = document.add_entity::<Geometry>();
    replacement.borrow_mut().core_mut().set_dae_id("renamed");
    let found = reference.entity().expect("replacement resolves");
    assert!(same_entity(&found, &replacement));
}

#[test]
fn placeholders_go_away_with_their_last_reference() {
    let document = document_at("/a/scene.dae");
    let first = EntityReference::new(&document);
    first.set_uri("x.dae#one");
    let second = EntityReference::new(&document);
    second.set_uri("y.dae#two");
    let third = EntityReference::new(&document);
    third.set_uri("x.dae#three");
    assert_eq!(document.external_references().placeholder_count(), 2);
    assert_eq!(first.placeholder().map(|p| p.external_reference_count()), Some(2));

    drop(first);
    assert_eq!(document.external_references().placeholder_count(), 2);
    drop(third);
    assert_eq!(document.external_references().placeholder_count(), 1);
    second.set_uri("#local");
    assert_eq!(document.external_references().placeholder_count(), 0);
}

#[test]
fn cloned_references_share_targets() {
    let document = document_at("/a/scene.dae");
    let source = EntityReference::new(&document);
    source.set_uri("lib.dae#shared");

    let mut target = EntityReference::new(&document);
    source.clone_parameter(&mut target);
    assert_eq!(target.uri(), "/a/lib.dae#shared");
    assert_eq!(source.placeholder().map(|p| p.external_reference_count()), Some(2));
}

#[test]
fn references_survive_their_document() {
    let document = Document::new();
    let reference = EntityReference::new(&document);
    reference.set_uri("#anything");
    drop(document);
    assert!(reference.document().is_none());
    assert!(reference.entity().is_none());
    assert_eq!(reference.uri(), "#anything");
}
