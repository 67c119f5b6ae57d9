//! The lifecycle coordinator.
//!
//! [`App`] owns every entity, component and system. Structural changes made
//! during a frame are recorded in deferred queues and committed by
//! [`App::tick`] in a fixed order:
//!
//! 1. `tick` on every system, ascending priority
//! 2. `post_tick` on every system, ascending priority
//! 3. promote new entities (`ready`, then `enable` when enabled)
//! 4. hand new components to their systems
//! 5. tear down dead components (`remove`, `on_destroy`)
//! 6. tear down dead entities (`destroy`, pool removal)
//! 7. drop the processed part of every queue

use ember_core::hierarchy;
use tracing::{debug, debug_span, trace, warn};

use crate::arena::Arena;
use crate::component::{Component, ComponentData, ComponentId};
use crate::config::AppConfig;
use crate::entity::{Entity, EntityData};
use crate::error::EcsError;
use crate::event::names;
use crate::queue::FrameQueue;
use crate::registry::{ClassId, ClassInfo, ClassOptions, ClassRegistry};
use crate::system::{Phase, SystemDescriptor, SystemKey, SystemSlot};

pub struct App {
    pub(crate) config: AppConfig,
    pub(crate) classes: ClassRegistry,
    pub(crate) entities: Arena<EntityData>,
    pub(crate) components: Arena<ComponentData>,
    /// Sorted by priority, stable for ties.
    pub(crate) systems: Vec<SystemSlot>,
    /// Indexed by class: systems targeting the class or an ancestor.
    pub(crate) dispatch: Vec<Vec<SystemKey>>,
    pub(crate) next_system_key: u32,
    /// Indexed by `SystemKey`: position of the slot in `systems`.
    pub(crate) system_slots: Vec<usize>,
    /// Ready entities; `EntityData::pool_index` points back here.
    pub(crate) live: Vec<Entity>,
    pub(crate) new_entities: FrameQueue<Entity>,
    pub(crate) dead_entities: FrameQueue<Entity>,
    pub(crate) new_components: FrameQueue<ComponentId>,
    pub(crate) dead_components: FrameQueue<ComponentId>,
    pub(crate) active_level: Entity,
    ticking: bool,
    frame: u64,
}

impl App {
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let pool = config.pool_size;
        let mut entities = Arena::with_capacity(pool);
        let active_level = Entity(entities.insert(EntityData::new("level".to_string(), true)));
        Self {
            config,
            classes: ClassRegistry::new(),
            entities,
            components: Arena::with_capacity(pool),
            systems: Vec::new(),
            dispatch: Vec::new(),
            next_system_key: 0,
            system_slots: Vec::new(),
            live: Vec::with_capacity(pool),
            new_entities: FrameQueue::with_capacity(pool),
            dead_entities: FrameQueue::with_capacity(pool),
            new_components: FrameQueue::with_capacity(pool),
            dead_components: FrameQueue::with_capacity(pool),
            active_level,
            ticking: false,
            frame: 0,
        }
    }

    /// Build an app and register a batch of systems. Systems whose class is
    /// registered later start matching once it is.
    pub fn with_systems(config: AppConfig, systems: Vec<SystemDescriptor>) -> Self {
        let mut app = Self::with_config(config);
        for d in systems {
            if let Err(err) = app.try_register_system(d.id, d.system, &d.component, d.priority) {
                warn!(%err, "skipping system");
            }
        }
        app
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Number of completed ticks.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Live component slots, destroyed-but-not-torn-down included.
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Whether the next tick has structural work queued.
    pub fn has_pending(&self) -> bool {
        !(self.new_entities.is_empty()
            && self.new_components.is_empty()
            && self.dead_components.is_empty()
            && self.dead_entities.is_empty())
    }

    pub fn register_class<C: Component + Default>(&mut self, name: &str, options: ClassOptions) -> ClassId {
        let id = self.classes.register::<C>(name, options);
        self.rebuild_dispatch();
        id
    }

    pub fn register_class_with<C, F>(&mut self, name: &str, ctor: F, options: ClassOptions) -> ClassId
    where
        C: Component,
        F: Fn() -> C + 'static,
    {
        let id = self.classes.register_with(name, ctor, options);
        self.rebuild_dispatch();
        id
    }

    pub fn class(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.resolve(name)
    }

    pub fn classes(&self) -> &ClassRegistry {
        &self.classes
    }

    pub fn active_level(&self) -> Entity {
        self.active_level
    }

    /// Switch levels: destroy everything in the current one and queue the
    /// new level's entities for promotion.
    pub fn load_level(&mut self, level: Entity) -> bool {
        match self.try_load_level(level) {
            Ok(()) => true,
            Err(err) => {
                warn!(%err, "load_level failed");
                false
            }
        }
    }

    pub fn try_load_level(&mut self, level: Entity) -> Result<(), EcsError> {
        let data = self.entities.get(level.0).ok_or(EcsError::StaleEntity(level))?;
        if !data.level {
            return Err(EcsError::NotALevel(level));
        }
        if data.destroyed {
            return Err(EcsError::EntityDestroyed(level));
        }
        if level == self.active_level {
            return Ok(());
        }

        let old = self.active_level;
        for child in self.children(old).to_vec() {
            self.destroy(child);
        }
        self.active_level = level;
        for e in hierarchy::descendants(&self.entities, level) {
            let pending = self.entities.get(e.0).is_some_and(|d| !d.ready && !d.destroyed);
            if pending {
                self.new_entities.push(e);
            }
        }
        debug!(?old, new = ?level, "level loaded");
        Ok(())
    }

    /// Run one frame.
    pub fn tick(&mut self) {
        if self.ticking {
            warn!("tick called while already ticking, ignoring");
            return;
        }
        self.ticking = true;
        let span = debug_span!("tick", frame = self.frame);
        let _enter = span.enter();

        self.run_systems(Phase::Tick);
        self.run_systems(Phase::PostTick);

        let promoted = self.promote_entities();
        let attached = self.attach_components();
        let torn_components = self.teardown_components();
        let torn_entities = self.teardown_entities();

        self.new_entities.consume(promoted);
        self.new_components.consume(attached);
        self.dead_components.consume(torn_components);
        self.dead_entities.consume(torn_entities);

        trace!(
            promoted,
            attached,
            torn_components,
            torn_entities,
            live = self.live.len(),
            "tick done"
        );
        self.frame += 1;
        self.ticking = false;
    }

    fn promote_entities(&mut self) -> usize {
        let mut i = 0;
        while let Some(entity) = self.new_entities.get(i) {
            i += 1;
            let index = self.live.len();
            let waiting = self
                .entities
                .get(entity.0)
                .is_some_and(|d| !d.destroyed && !d.ready);
            if !waiting {
                continue;
            }
            // Requeued by `load_level` or a reparent when its level is active.
            if !self.in_active_level(entity) {
                trace!(?entity, "left the active level before promotion");
                continue;
            }
            let Some(data) = self.entities.get_mut(entity.0) else {
                continue;
            };
            data.ready = true;
            data.pool_index = Some(index);
            data.emitter.unmute();
            self.live.push(entity);
            trace!(?entity, "entity ready");

            self.emit(entity, names::READY);
            for c in self.components(entity).to_vec() {
                let waiting = self
                    .components
                    .get(c.0)
                    .is_some_and(|d| !d.attached && !d.destroyed);
                if waiting {
                    self.new_components.push(c);
                }
            }
            if self.is_enabled_in_hierarchy(entity) {
                self.emit_enable_changed(entity, true);
            }
        }
        i
    }

    fn attach_components(&mut self) -> usize {
        let mut i = 0;
        while let Some(component) = self.new_components.get(i) {
            i += 1;
            let Some(data) = self.components.get(component.0) else {
                continue;
            };
            if data.destroyed || data.attached {
                continue;
            }
            let (class, entity) = (data.class, data.entity);
            if !self.is_ready(entity) || self.is_destroyed(entity) {
                continue;
            }
            let keys = self.dispatch.get(class.index()).cloned().unwrap_or_default();
            if let Some(data) = self.components.get_mut(component.0) {
                data.attached = true;
                data.notified = keys.clone();
            }
            self.notify_systems(&keys, entity, component, true);
        }
        i
    }

    fn teardown_components(&mut self) -> usize {
        let mut i = 0;
        while let Some(component) = self.dead_components.get(i) {
            i += 1;
            let Some(data) = self.components.get_mut(component.0) else {
                continue;
            };
            let entity = data.entity;
            let notified = std::mem::take(&mut data.notified);

            if let Some(owner) = self.entities.get_mut(entity.0) {
                if !owner.destroyed {
                    owner.comps.retain(|c| *c != component);
                }
            }
            self.notify_systems(&notified, entity, component, false);
            self.invoke(component, |c, cx| c.on_destroy(cx));

            let Some(data) = self.components.remove(component.0) else {
                continue;
            };
            if let Some(owner) = self.entities.get_mut(entity.0) {
                for (name, listener) in &data.listeners {
                    owner.emitter.off(name, *listener);
                }
            }
            trace!(?component, "component torn down");
        }
        i
    }

    fn teardown_entities(&mut self) -> usize {
        let mut i = 0;
        while let Some(entity) = self.dead_entities.get(i) {
            i += 1;
            let Some(data) = self.entities.get_mut(entity.0) else {
                continue;
            };
            data.emitter.unmute();
            self.emit(entity, names::DESTROY);

            let parent_alive = self
                .parent(entity)
                .is_some_and(|p| !self.is_destroyed(p));
            if parent_alive {
                hierarchy::detach(&mut self.entities, entity);
            }

            let Some(mut data) = self.entities.remove(entity.0) else {
                continue;
            };
            if let Some(index) = data.pool_index.take() {
                self.live.swap_remove(index);
                if let Some(moved) = self.live.get(index).copied() {
                    if let Some(m) = self.entities.get_mut(moved.0) {
                        m.pool_index = Some(index);
                    }
                }
            }
            data.node.clear();
            data.comps.clear();
            data.emitter.clear();
            trace!(?entity, "entity torn down");
        }
        i
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_pool_consistent(app: &App) {
        for (i, e) in app.live.iter().enumerate() {
            let data = app.entities.get(e.0).unwrap();
            assert_eq!(data.pool_index, Some(i), "{e:?} out of place");
            assert!(data.ready);
        }
    }

    #[test]
    fn pool_index_follows_swap_remove() {
        let mut app = App::new();
        let ents: Vec<Entity> = (0..5).map(|i| app.create_entity(format!("e{i}"))).collect();
        app.tick();
        assert_pool_consistent(&app);

        app.destroy(ents[1]);
        app.tick();
        assert_eq!(app.live, vec![ents[0], ents[4], ents[2], ents[3]]);
        assert_pool_consistent(&app);

        app.destroy(ents[3]);
        app.destroy(ents[0]);
        app.tick();
        assert_pool_consistent(&app);
        assert_eq!(app.live.len(), 2);
    }

    #[test]
    fn queues_are_drained_and_keep_capacity() {
        let mut app = App::with_config(AppConfig {
            pool_size: 16,
            ..AppConfig::default()
        });
        for i in 0..4 {
            app.create_entity(format!("e{i}"));
        }
        assert!(app.has_pending());
        app.tick();
        assert!(!app.has_pending());
        assert!(app.new_entities.is_empty());
        assert!(app.new_components.is_empty());
        assert!(app.dead_entities.is_empty());
        assert!(app.dead_components.is_empty());
        assert!(app.new_entities.capacity() >= 16);
    }

    #[test]
    fn default_level_is_active_and_never_ready() {
        let app = App::new();
        let level = app.active_level();
        assert!(app.is_level(level));
        assert!(!app.is_ready(level));
        assert!(app.is_enabled_in_hierarchy(level));
        assert_eq!(app.name(level), Some("level"));
    }
}
