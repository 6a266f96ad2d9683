use crate::document::WeakDocument;
use crate::entity::{EntityCore, EntityRc, EntityReference, EntityType};
use crate::extra::Extra;
use crate::object::ObjectFlags;
use crate::parameter::{ChildList, Parameterized, Spawn};

/// Places an entity somewhere: a lazy reference to it plus instance-local extra data.
#[derive(Debug, Parameterized)]
pub struct EntityInstance {
    flags: ObjectFlags,
    entity_type: EntityType,
    #[parameter(reference)]
    entity: EntityReference,
    #[parameter]
    name: String,
    #[parameter(child)]
    extra: Extra,
}

impl EntityInstance {
    pub(crate) fn new(document: WeakDocument, entity_type: EntityType) -> Self {
        Self {
            flags: ObjectFlags::default(),
            entity_type,
            entity: EntityReference::with_document(document),
            name: String::new(),
            extra: Extra::new(),
        }
    }

    pub fn flags(&self) -> &ObjectFlags {
        &self.flags
    }

    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    pub fn reference(&self) -> &EntityReference {
        &self.entity
    }

    pub fn entity(&self) -> Option<EntityRc> {
        self.entity.entity()
    }

    pub fn set_entity(&mut self, entity: Option<&EntityRc>) {
        self.entity.set_entity(entity);
        self.flags.set_new_child();
    }

    pub fn set_uri(&mut self, uri: &str) {
        self.entity.set_uri(uri);
        self.flags.set_dirty();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = crate::entity::clean_name(name);
        self.flags.set_dirty();
    }

    pub fn extra(&self) -> &Extra {
        &self.extra
    }

    pub fn extra_mut(&mut self) -> &mut Extra {
        &mut self.extra
    }
}

impl Spawn for EntityInstance {
    fn spawn(&self) -> Self {
        EntityInstance::new(self.entity.weak_document(), self.entity_type)
    }
}

/// A visual scene node. Library entries are the scene roots; child nodes are owned by their
/// parent and live outside the library index.
#[derive(Debug, Parameterized)]
pub struct SceneNode {
    #[parameter(base)]
    core: EntityCore,
    #[parameter(list)]
    children: ChildList<SceneNode>,
    #[parameter(list)]
    instances: ChildList<EntityInstance>,
}

entity_payload!(SceneNode, SceneNode, |document| {
    children: ChildList::new(),
    instances: ChildList::new(),
});

impl SceneNode {
    fn detached(document: WeakDocument) -> Self {
        Self {
            core: EntityCore::detached(document, EntityType::SceneNode),
            children: ChildList::new(),
            instances: ChildList::new(),
        }
    }

    pub fn children(&self) -> &[SceneNode] {
        &self.children
    }

    pub fn child_mut(&mut self, index: usize) -> Option<&mut SceneNode> {
        self.children.get_mut(index)
    }

    pub fn add_child_node(&mut self) -> &mut SceneNode {
        self.core.flags().set_new_child();
        let child = SceneNode::detached(self.core.weak_document().clone());
        self.children.push(child)
    }

    pub fn release_child_node(&mut self, index: usize) -> Option<SceneNode> {
        self.core.flags().set_dirty();
        self.children.remove(index)
    }

    pub fn instances(&self) -> &[EntityInstance] {
        &self.instances
    }

    pub fn instance_mut(&mut self, index: usize) -> Option<&mut EntityInstance> {
        self.instances.get_mut(index)
    }

    /// Instantiates `entity` under this node.
    pub fn add_instance(&mut self, entity: &EntityRc) -> &mut EntityInstance {
        // a busy entity is most likely this very node, borrowed by the caller
        let entity_type = entity.try_borrow().map(|e| e.entity_type()).unwrap_or(EntityType::SceneNode);
        let mut instance = EntityInstance::new(self.core.weak_document().clone(), entity_type);
        instance.set_entity(Some(entity));
        self.core.flags().set_new_child();
        self.instances.push(instance)
    }

    /// Instantiates whatever `uri` points at, resolved lazily.
    pub fn add_instance_uri(&mut self, entity_type: EntityType, uri: &str) -> &mut EntityInstance {
        let mut instance = EntityInstance::new(self.core.weak_document().clone(), entity_type);
        instance.set_uri(uri);
        self.core.flags().set_new_child();
        self.instances.push(instance)
    }

    pub fn release_instance(&mut self, index: usize) -> Option<EntityInstance> {
        self.core.flags().set_dirty();
        self.instances.remove(index)
    }
}

impl Spawn for SceneNode {
    fn spawn(&self) -> Self {
        SceneNode::detached(self.core.weak_document().clone())
    }
}
