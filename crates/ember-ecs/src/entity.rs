use std::fmt;

use ember_core::hierarchy::{self, HierarchyNode, NodeStore};
use ember_core::{EventEmitter, ListenerId};
use tracing::{trace, warn};

use crate::app::App;
use crate::arena::{Arena, RawId};
use crate::component::ComponentId;
use crate::error::EcsError;
use crate::event::{names, Event, Listener};

/// A generational entity handle. Stale handles never resolve, even after
/// the slot is reused.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity(pub(crate) RawId);

impl Entity {
    /// Create an entity from raw parts (mainly for testing).
    pub fn from_raw(index: u32, generation: u32) -> Self {
        Self(RawId::from_raw(index, generation))
    }

    /// The slot index of this entity.
    pub fn index(&self) -> u32 {
        self.0.index()
    }

    /// The generation of this entity (incremented on reuse).
    pub fn generation(&self) -> u32 {
        self.0.generation()
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({:?})", self.0)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

pub(crate) struct EntityData {
    pub name: String,
    pub node: HierarchyNode<Entity>,
    pub emitter: EventEmitter<Listener>,
    pub comps: Vec<ComponentId>,
    pub enabled: bool,
    /// Every ancestor is locally enabled. Excludes self.
    pub ancestor_enabled: bool,
    pub ready: bool,
    pub destroyed: bool,
    pub level: bool,
    /// Slot in the live pool, set while ready.
    pub pool_index: Option<usize>,
}

impl EntityData {
    pub fn new(name: String, level: bool) -> Self {
        Self {
            name,
            node: HierarchyNode::new(),
            emitter: EventEmitter::new(),
            comps: Vec::new(),
            enabled: true,
            ancestor_enabled: true,
            ready: false,
            destroyed: false,
            level,
            pool_index: None,
        }
    }

    pub fn enabled_in_hierarchy(&self) -> bool {
        self.enabled && self.ancestor_enabled
    }
}

impl NodeStore<Entity> for Arena<EntityData> {
    fn node(&self, key: Entity) -> Option<&HierarchyNode<Entity>> {
        self.get(key.0).map(|d| &d.node)
    }

    fn node_mut(&mut self, key: Entity) -> Option<&mut HierarchyNode<Entity>> {
        self.get_mut(key.0).map(|d| &mut d.node)
    }
}

impl App {
    /// Create an entity under the active level. It becomes ready at the
    /// next tick.
    pub fn create_entity(&mut self, name: impl Into<String>) -> Entity {
        let level = self.active_level;
        let entity = self.spawn(name.into(), false);
        self.attach_new(entity, level);
        entity
    }

    /// Create an entity under `parent`. It is queued for promotion only when
    /// `parent` belongs to the active level.
    pub fn create_entity_in(&mut self, name: impl Into<String>, parent: Entity) -> Option<Entity> {
        match self.entities.get(parent.0) {
            None => {
                warn!(?parent, "create_entity_in: parent is not alive");
                return None;
            }
            Some(p) if p.destroyed => {
                warn!(?parent, "create_entity_in: parent is destroyed");
                return None;
            }
            Some(_) => {}
        }
        let entity = self.spawn(name.into(), false);
        self.attach_new(entity, parent);
        Some(entity)
    }

    /// Create a detached level root. Levels never hold components.
    pub fn create_level(&mut self, name: impl Into<String>) -> Entity {
        self.spawn(name.into(), true)
    }

    pub(crate) fn spawn(&mut self, name: String, level: bool) -> Entity {
        Entity(self.entities.insert(EntityData::new(name, level)))
    }

    /// Link a freshly spawned entity under `parent` and queue it when it
    /// lives in the active level.
    pub(crate) fn attach_new(&mut self, entity: Entity, parent: Entity) {
        if let Err(err) = hierarchy::set_parent(&mut self.entities, entity, Some(parent)) {
            warn!(%err, ?entity, ?parent, "failed to attach new entity");
            return;
        }
        let ancestor_enabled = self.is_enabled_in_hierarchy(parent);
        if let Some(data) = self.entities.get_mut(entity.0) {
            data.ancestor_enabled = ancestor_enabled;
        }
        if self.in_active_level(entity) {
            self.new_entities.push(entity);
        }
        trace!(?entity, ?parent, "entity created");
    }

    pub(crate) fn in_active_level(&self, entity: Entity) -> bool {
        hierarchy::root_of(&self.entities, entity) == self.active_level
    }

    /// Reparent `entity`. `None` means the active level.
    pub fn set_parent(&mut self, entity: Entity, parent: Option<Entity>) -> bool {
        match self.try_set_parent(entity, parent) {
            Ok(()) => true,
            Err(err) => {
                warn!(%err, "set_parent failed");
                false
            }
        }
    }

    pub fn try_set_parent(&mut self, entity: Entity, parent: Option<Entity>) -> Result<(), EcsError> {
        let data = self.entities.get(entity.0).ok_or(EcsError::StaleEntity(entity))?;
        if data.level {
            return Err(EcsError::LevelEntity(entity));
        }
        let destroyed = data.destroyed;
        let was_enabled = data.enabled_in_hierarchy();

        let target = match parent {
            Some(p) => {
                let pd = self.entities.get(p.0).ok_or(EcsError::StaleEntity(p))?;
                if pd.destroyed && !destroyed {
                    return Err(EcsError::EntityDestroyed(p));
                }
                Some(p)
            }
            None if destroyed => None,
            None => Some(self.active_level),
        };

        let change = hierarchy::set_parent(&mut self.entities, entity, target)?;
        if !change.changed() {
            return Ok(());
        }
        trace!(?entity, old = ?change.old, new = ?change.new, "entity reparented");
        self.dispatch(entity, Event::new(names::PARENT_CHANGED).with_detail(change));

        let ancestor_enabled = target.map_or(true, |p| self.is_enabled_in_hierarchy(p));
        let Some(data) = self.entities.get_mut(entity.0) else {
            return Ok(());
        };
        data.ancestor_enabled = ancestor_enabled;
        let now_enabled = data.enabled_in_hierarchy();
        if now_enabled != was_enabled {
            self.refresh_descendants(entity);
            self.cascade(entity, now_enabled);
        }

        if !destroyed && self.in_active_level(entity) {
            self.queue_pending(entity);
        }
        Ok(())
    }

    /// Queue every not-yet-ready entity of the subtree for promotion.
    pub(crate) fn queue_pending(&mut self, root: Entity) {
        let pending = hierarchy::walk_subtree(&self.entities, root, |e| {
            self.entities.get(e.0).is_some_and(|d| !d.destroyed)
        });
        for e in pending {
            if !self.is_ready(e) && !self.entities.get(e.0).is_some_and(|d| d.level) {
                self.new_entities.push(e);
            }
        }
    }

    /// Toggle the local flag, cascading enable/disable through the subtree
    /// when the ancestor chain is enabled.
    pub fn set_enabled(&mut self, entity: Entity, enabled: bool) {
        let Some(data) = self.entities.get_mut(entity.0) else {
            return;
        };
        if data.enabled == enabled || data.destroyed {
            return;
        }
        data.enabled = enabled;
        if data.ancestor_enabled {
            self.refresh_descendants(entity);
            self.cascade(entity, enabled);
        }
    }

    /// Recompute `ancestor_enabled` for every descendant of `root`,
    /// top-down.
    pub(crate) fn refresh_descendants(&mut self, root: Entity) {
        for e in hierarchy::descendants(&self.entities, root) {
            let parent_enabled = self
                .parent(e)
                .map_or(true, |p| self.is_enabled_in_hierarchy(p));
            if let Some(data) = self.entities.get_mut(e.0) {
                data.ancestor_enabled = parent_enabled;
            }
        }
    }

    /// Fire enable/disable through `root`'s subtree, skipping branches that
    /// are locally disabled or destroyed. Only ready entities emit.
    pub(crate) fn cascade(&mut self, root: Entity, enable: bool) {
        let order = hierarchy::walk_subtree(&self.entities, root, |e| {
            e == root
                || self
                    .entities
                    .get(e.0)
                    .is_some_and(|d| d.enabled && !d.destroyed)
        });
        for e in order {
            if self.is_ready(e) {
                self.emit_enable_changed(e, enable);
            }
        }
    }

    /// Emit `enable`/`disable` on `entity`, then run the matching hook on
    /// each of its enabled, live components.
    pub(crate) fn emit_enable_changed(&mut self, entity: Entity, enable: bool) {
        self.emit(entity, if enable { names::ENABLE } else { names::DISABLE });
        for c in self.components(entity).to_vec() {
            let active = self
                .components
                .get(c.0)
                .is_some_and(|d| d.enabled && !d.destroyed);
            if !active {
                continue;
            }
            if enable {
                self.invoke(c, |comp, cx| comp.on_enable(cx));
            } else {
                self.invoke(c, |comp, cx| comp.on_disable(cx));
            }
        }
    }

    /// Destroy `entity`, its subtree and every component on them.
    ///
    /// Removal happens at the next tick; until then the entity reports
    /// `is_destroyed` and rejects new components.
    pub fn destroy(&mut self, entity: Entity) {
        if entity == self.active_level {
            warn!(?entity, "the active level cannot be destroyed");
            return;
        }
        let Some(data) = self.entities.get_mut(entity.0) else {
            return;
        };
        if data.destroyed {
            return;
        }
        data.destroyed = true;
        let notify = data.ready && data.enabled_in_hierarchy();
        trace!(?entity, "entity destroyed");

        if notify {
            self.emit(entity, names::DISABLE);
        }
        self.dead_entities.push(entity);

        for child in self.children(entity).to_vec() {
            self.destroy(child);
        }
        for c in self.components(entity).to_vec() {
            self.destroy_comp(c);
        }
    }

    pub fn name(&self, entity: Entity) -> Option<&str> {
        self.entities.get(entity.0).map(|d| d.name.as_str())
    }

    pub fn set_name(&mut self, entity: Entity, name: impl Into<String>) {
        if let Some(data) = self.entities.get_mut(entity.0) {
            data.name = name.into();
        }
    }

    pub fn parent(&self, entity: Entity) -> Option<Entity> {
        self.entities.get(entity.0)?.node.parent()
    }

    pub fn children(&self, entity: Entity) -> &[Entity] {
        self.entities
            .get(entity.0)
            .map_or(&[], |d| d.node.children())
    }

    /// Components of `entity` in attach order.
    pub fn components(&self, entity: Entity) -> &[ComponentId] {
        self.entities.get(entity.0).map_or(&[], |d| d.comps.as_slice())
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.contains(entity.0)
    }

    pub fn is_ready(&self, entity: Entity) -> bool {
        self.entities.get(entity.0).is_some_and(|d| d.ready)
    }

    /// True once `destroy` ran, and for handles already torn down.
    pub fn is_destroyed(&self, entity: Entity) -> bool {
        self.entities.get(entity.0).map_or(true, |d| d.destroyed)
    }

    pub fn is_level(&self, entity: Entity) -> bool {
        self.entities.get(entity.0).is_some_and(|d| d.level)
    }

    /// The local flag.
    pub fn is_enabled(&self, entity: Entity) -> bool {
        self.entities.get(entity.0).is_some_and(|d| d.enabled)
    }

    pub fn is_enabled_in_hierarchy(&self, entity: Entity) -> bool {
        self.entities
            .get(entity.0)
            .is_some_and(EntityData::enabled_in_hierarchy)
    }

    /// Ready entities, in live-pool order.
    pub fn entities(&self) -> &[Entity] {
        &self.live
    }

    /// Number of ready entities.
    pub fn entity_count(&self) -> usize {
        self.live.len()
    }

    /// Borrow a mutable view of `entity`.
    pub fn entity_mut(&mut self, entity: Entity) -> Option<EntityMut<'_>> {
        self.is_alive(entity).then(|| EntityMut { app: self, entity })
    }
}

/// Mutable view over one entity, forwarding to the [`App`] operations.
pub struct EntityMut<'a> {
    app: &'a mut App,
    entity: Entity,
}

impl EntityMut<'_> {
    pub fn id(&self) -> Entity {
        self.entity
    }

    pub fn app(&mut self) -> &mut App {
        self.app
    }

    pub fn name(&self) -> Option<&str> {
        self.app.name(self.entity)
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.app.set_name(self.entity, name);
        self
    }

    pub fn add_comp(&mut self, type_name: &str) -> Option<ComponentId> {
        self.app.add_comp(self.entity, type_name)
    }

    pub fn get_comp(&self, type_name: &str) -> Option<ComponentId> {
        self.app.get_comp(self.entity, type_name)
    }

    pub fn get_comps(&self, type_name: &str) -> Vec<ComponentId> {
        self.app.get_comps(self.entity, type_name)
    }

    pub fn remove_comp(&mut self, type_name: &str) -> bool {
        self.app.remove_comp(self.entity, type_name)
    }

    pub fn set_parent(&mut self, parent: Option<Entity>) -> bool {
        self.app.set_parent(self.entity, parent)
    }

    pub fn set_enabled(&mut self, enabled: bool) -> &mut Self {
        self.app.set_enabled(self.entity, enabled);
        self
    }

    pub fn on<F>(&mut self, name: &str, callback: F) -> Option<ListenerId>
    where
        F: FnMut(&mut App, &Event) + 'static,
    {
        self.app.on(self.entity, name, callback)
    }

    pub fn emit(&mut self, name: &str) {
        self.app.emit(self.entity, name);
    }

    pub fn destroy(self) {
        self.app.destroy(self.entity);
    }
}
