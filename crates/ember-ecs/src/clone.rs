//! Entity cloning.
//!
//! Clones start muted: their emitters deliver nothing and their components
//! only get `on_init` and `on_clone` until the next tick promotes them.

use ember_core::hierarchy;
use tracing::{trace, warn};

use crate::app::App;
use crate::component::Spawn;
use crate::entity::Entity;
use crate::error::EcsError;

impl App {
    /// Copy `source` and its components, without children.
    pub fn clone_entity(&mut self, source: Entity) -> Option<Entity> {
        self.try_clone(source, false)
            .map_err(|err| warn!(%err, "clone_entity failed"))
            .ok()
    }

    /// Copy `source` together with its whole subtree.
    pub fn deep_clone_entity(&mut self, source: Entity) -> Option<Entity> {
        self.try_clone(source, true)
            .map_err(|err| warn!(%err, "deep_clone_entity failed"))
            .ok()
    }

    pub fn try_clone(&mut self, source: Entity, deep: bool) -> Result<Entity, EcsError> {
        let data = self.entities.get(source.0).ok_or(EcsError::StaleEntity(source))?;
        if data.level {
            return Err(EcsError::LevelEntity(source));
        }
        if data.destroyed {
            return Err(EcsError::EntityDestroyed(source));
        }
        let parent = data.node.parent().unwrap_or(self.active_level);

        let mut created = Vec::new();
        let root = self.clone_into(source, parent, deep, &mut created);
        if self.in_active_level(root) {
            for e in created {
                self.new_entities.push(e);
            }
        }
        trace!(?source, clone = ?root, deep, "entity cloned");
        Ok(root)
    }

    fn clone_into(&mut self, source: Entity, parent: Entity, deep: bool, created: &mut Vec<Entity>) -> Entity {
        let (name, enabled) = match self.entities.get(source.0) {
            Some(d) => (d.name.clone(), d.enabled),
            None => (String::new(), true),
        };
        let entity = self.spawn(name, false);
        created.push(entity);

        let ancestor_enabled = self.is_enabled_in_hierarchy(parent);
        if let Err(err) = hierarchy::set_parent(&mut self.entities, entity, Some(parent)) {
            warn!(%err, ?entity, "failed to attach clone");
        }
        if let Some(data) = self.entities.get_mut(entity.0) {
            data.enabled = enabled;
            data.ancestor_enabled = ancestor_enabled;
            data.emitter.mute();
        }

        for src in self.components(source).to_vec() {
            let Some(comp) = self.components.get(src.0) else {
                continue;
            };
            if comp.destroyed {
                continue;
            }
            let (class, enabled) = (comp.class, comp.enabled);
            if let Some(copy) = self.create_component(entity, class, Spawn::Muted { enabled }) {
                self.invoke_clone(copy, src);
            }
        }

        if deep {
            for child in self.children(source).to_vec() {
                if !self.is_destroyed(child) {
                    self.clone_into(child, entity, true, created);
                }
            }
        }
        entity
    }
}
