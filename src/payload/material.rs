use super::simple::Effect;
use crate::entity::{EntityCore, EntityRc, EntityReference};
use crate::parameter::Parameterized;
use std::cell::RefCell;
use std::rc::Rc;

/// A material instantiates an effect, which may live in another document.
#[derive(Debug, Parameterized)]
pub struct Material {
    #[parameter(base)]
    core: EntityCore,
    #[parameter(reference)]
    instance_effect: EntityReference,
}

entity_payload!(Material, Material, |document| {
    instance_effect: EntityReference::new(document),
});

impl Material {
    pub fn effect_reference(&self) -> &EntityReference {
        &self.instance_effect
    }

    /// Resolves the effect reference with the document's options.
    pub fn effect(&self) -> Option<Rc<RefCell<Effect>>> {
        let entity = self.instance_effect.entity()?;
        let document = entity.try_borrow().ok()?.core().document()?;
        document.typed(&entity)
    }

    pub fn set_effect(&mut self, effect: Option<&Rc<RefCell<Effect>>>) {
        let entity = effect.map(|effect| -> EntityRc { effect.clone() });
        self.instance_effect.set_entity(entity.as_ref());
        self.core.flags().set_new_child();
    }

    pub fn set_effect_uri(&mut self, uri: &str) {
        self.instance_effect.set_uri(uri);
        self.core.flags().set_dirty();
    }
}
