use std::any::Any;
use std::fmt;

use ember_core::ListenerId;
use tracing::{debug, trace, warn};

use crate::app::App;
use crate::arena::RawId;
use crate::context::Context;
use crate::entity::Entity;
use crate::error::EcsError;
use crate::event::Event;
use crate::registry::ClassId;
use crate::system::SystemKey;

/// Upcast helper so trait objects can be downcast to their concrete type.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Behaviour attached to an entity.
///
/// Every hook is optional. Hooks receive a [`Context`] that dereferences to
/// the [`App`], so they can create entities, add components or destroy
/// things while they run.
pub trait Component: AsAny {
    /// Right after construction, before the component is enabled.
    fn on_init(&mut self, _cx: &mut Context<'_>) {}

    /// The component became effectively enabled.
    fn on_enable(&mut self, _cx: &mut Context<'_>) {}

    /// The component stopped being effectively enabled, or was destroyed
    /// while enabled.
    fn on_disable(&mut self, _cx: &mut Context<'_>) {}

    /// At the tick that tears the component down.
    fn on_destroy(&mut self, _cx: &mut Context<'_>) {}

    /// After `on_init` on a freshly cloned component. `source` is the
    /// component being copied.
    fn on_clone(&mut self, _source: &dyn Component, _cx: &mut Context<'_>) {}

    /// An entity event declared in the class's event table fired.
    /// `handler` is the key given at registration.
    fn on_event(&mut self, _handler: &str, _event: &Event, _cx: &mut Context<'_>) {}
}

impl dyn Component {
    pub fn downcast_ref<T: Component>(&self) -> Option<&T> {
        self.as_any().downcast_ref()
    }

    pub fn downcast_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut()
    }
}

/// Generational handle to a component.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub(crate) RawId);

impl ComponentId {
    pub fn index(&self) -> u32 {
        self.0.index()
    }

    pub fn generation(&self) -> u32 {
        self.0.generation()
    }
}

impl fmt::Debug for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentId({:?})", self.0)
    }
}

pub(crate) struct ComponentData {
    pub class: ClassId,
    pub entity: Entity,
    pub enabled: bool,
    pub destroyed: bool,
    /// Systems have received `add` for this component.
    pub attached: bool,
    /// Systems that got `add`; only these get `remove`.
    pub notified: Vec<SystemKey>,
    /// First system (by priority) accepting this class.
    pub system: Option<SystemKey>,
    pub listeners: Vec<(String, ListenerId)>,
    /// Taken out while one of its hooks runs.
    pub behaviour: Option<Box<dyn Component>>,
}

/// How a component is being created.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum Spawn {
    /// `add_comp`: may enable immediately and queue for systems.
    Fresh,
    /// Clone construction: hooks past `on_init` are left to the tick.
    Muted { enabled: bool },
}

impl App {
    /// Add a component of class `type_name` to `entity`.
    ///
    /// Returns `None` when the class is unknown, the entity cannot take
    /// components, or the class is not `multiple` and the entity already has
    /// one (or a subclass instance).
    pub fn add_comp(&mut self, entity: Entity, type_name: &str) -> Option<ComponentId> {
        match self.try_add_comp(entity, type_name) {
            Ok(id) => Some(id),
            Err(err @ EcsError::DuplicateComponent(..)) => {
                debug!(%err, "add_comp rejected");
                None
            }
            Err(err) => {
                warn!(%err, "add_comp failed");
                None
            }
        }
    }

    pub fn try_add_comp(&mut self, entity: Entity, type_name: &str) -> Result<ComponentId, EcsError> {
        let data = self.entities.get(entity.0).ok_or(EcsError::StaleEntity(entity))?;
        if data.level {
            return Err(EcsError::LevelEntity(entity));
        }
        if data.destroyed {
            return Err(EcsError::EntityDestroyed(entity));
        }
        let class = self
            .classes
            .class_id(type_name)
            .ok_or_else(|| EcsError::UnknownClass(type_name.to_string()))?;
        self.add_class(entity, class, &mut Vec::new())
    }

    fn add_class(
        &mut self,
        entity: Entity,
        class: ClassId,
        resolving: &mut Vec<ClassId>,
    ) -> Result<ComponentId, EcsError> {
        let Some(info) = self.classes.get(class) else {
            return Err(EcsError::UnknownClass(format!("{class:?}")));
        };
        if !info.is_multiple() && self.find_class(entity, class).is_some() {
            return Err(EcsError::DuplicateComponent(entity, info.name().to_string()));
        }

        let requires = info.requires().to_vec();
        resolving.push(class);
        for required in requires {
            let Some(rid) = self.classes.class_id(&required) else {
                warn!(class = %required, "required class is not registered");
                continue;
            };
            if resolving.contains(&rid) || self.find_class(entity, rid).is_some() {
                continue;
            }
            trace!(class = %required, ?entity, "adding required component");
            if let Err(err) = self.add_class(entity, rid, resolving) {
                warn!(%err, "failed to add required component");
            }
        }
        resolving.pop();

        // A required component's hooks may have destroyed the entity.
        match self.entities.get(entity.0) {
            None => Err(EcsError::StaleEntity(entity)),
            Some(data) if data.destroyed => Err(EcsError::EntityDestroyed(entity)),
            Some(_) => self
                .create_component(entity, class, Spawn::Fresh)
                .ok_or_else(|| EcsError::UnknownClass(format!("{class:?}"))),
        }
    }

    /// Construct, attach and initialise a component.
    pub(crate) fn create_component(&mut self, entity: Entity, class: ClassId, spawn: Spawn) -> Option<ComponentId> {
        let info = self.classes.get(class)?;
        let (behaviour, events) = (info.construct(), info.events().to_vec());
        let system = self.dispatch.get(class.index()).and_then(|s| s.first().copied());
        let enabled = match spawn {
            Spawn::Fresh => true,
            Spawn::Muted { enabled } => enabled,
        };

        let id = ComponentId(self.components.insert(ComponentData {
            class,
            entity,
            enabled,
            destroyed: false,
            attached: false,
            notified: Vec::new(),
            system,
            listeners: Vec::with_capacity(events.len()),
            behaviour: Some(behaviour),
        }));

        let mut listeners = Vec::with_capacity(events.len());
        if let Some(data) = self.entities.get_mut(entity.0) {
            data.comps.push(id);
            for (name, handler) in events {
                let lid = data.emitter.on(name.clone(), crate::event::Listener::Component {
                    component: id,
                    handler,
                });
                listeners.push((name, lid));
            }
        }
        if let Some(comp) = self.components.get_mut(id.0) {
            comp.listeners = listeners;
        }
        trace!(?entity, component = ?id, "component created");

        self.invoke(id, |c, cx| c.on_init(cx));

        if spawn == Spawn::Fresh {
            if self.is_comp_enabled(id) {
                self.invoke(id, |c, cx| c.on_enable(cx));
            }
            if self.is_ready(entity) {
                self.new_components.push(id);
            }
        }
        Some(id)
    }

    /// Mark a component destroyed. `on_disable` fires now when the
    /// component was effectively enabled; `on_destroy` and system removal
    /// wait for the next tick.
    pub fn destroy_comp(&mut self, component: ComponentId) {
        let was_enabled = self.is_comp_enabled(component);
        let Some(data) = self.components.get_mut(component.0) else {
            return;
        };
        if data.destroyed {
            return;
        }
        data.destroyed = true;
        trace!(?component, "component destroyed");

        if was_enabled {
            self.invoke(component, |c, cx| c.on_disable(cx));
        }
        self.dead_components.push(component);
    }

    /// Toggle a component's local flag, firing `on_enable`/`on_disable`
    /// immediately when its entity is ready and enabled in hierarchy.
    pub fn set_comp_enabled(&mut self, component: ComponentId, enabled: bool) {
        let Some(data) = self.components.get_mut(component.0) else {
            return;
        };
        if data.enabled == enabled {
            return;
        }
        data.enabled = enabled;
        if data.destroyed {
            return;
        }
        let entity = data.entity;
        if self.is_ready(entity) && self.is_enabled_in_hierarchy(entity) {
            if enabled {
                self.invoke(component, |c, cx| c.on_enable(cx));
            } else {
                self.invoke(component, |c, cx| c.on_disable(cx));
            }
        }
    }

    /// `entity.ready && entity.enabled_in_hierarchy && component.enabled`.
    ///
    /// Destruction does not clear any of these, so a component destroyed
    /// this frame still reads as enabled until teardown. Check
    /// [`App::is_comp_destroyed`] as well to skip it.
    pub fn is_comp_enabled(&self, component: ComponentId) -> bool {
        let Some(data) = self.components.get(component.0) else {
            return false;
        };
        data.enabled && self.is_ready(data.entity) && self.is_enabled_in_hierarchy(data.entity)
    }

    /// The component's local flag, regardless of its entity.
    pub fn comp_enabled_flag(&self, component: ComponentId) -> bool {
        self.components.get(component.0).is_some_and(|d| d.enabled)
    }

    /// True once `destroy_comp` ran, and for handles already torn down.
    pub fn is_comp_destroyed(&self, component: ComponentId) -> bool {
        self.components.get(component.0).map_or(true, |d| d.destroyed)
    }

    pub fn is_comp_alive(&self, component: ComponentId) -> bool {
        self.components.contains(component.0)
    }

    pub fn entity_of(&self, component: ComponentId) -> Option<Entity> {
        self.components.get(component.0).map(|d| d.entity)
    }

    pub fn class_of(&self, component: ComponentId) -> Option<ClassId> {
        self.components.get(component.0).map(|d| d.class)
    }

    /// Registered class name of a component instance.
    pub fn class_name_of(&self, component: ComponentId) -> Option<&str> {
        self.class_of(component)
            .and_then(|class| self.classes.name_of(class))
    }

    /// Id of the system this component was routed to at creation.
    pub fn system_of(&self, component: ComponentId) -> Option<&str> {
        let key = self.components.get(component.0)?.system?;
        self.slot(key).map(|s| s.info.id.as_str())
    }

    /// Typed access to a component's behaviour. `None` while one of its own
    /// hooks is running.
    pub fn get<C: Component>(&self, component: ComponentId) -> Option<&C> {
        self.components
            .get(component.0)?
            .behaviour
            .as_deref()?
            .downcast_ref::<C>()
    }

    pub fn get_mut<C: Component>(&mut self, component: ComponentId) -> Option<&mut C> {
        self.components
            .get_mut(component.0)?
            .behaviour
            .as_deref_mut()?
            .downcast_mut::<C>()
    }

    /// First component on `entity` whose class is `type_name` or derives
    /// from it.
    pub fn get_comp(&self, entity: Entity, type_name: &str) -> Option<ComponentId> {
        let Some(class) = self.classes.class_id(type_name) else {
            warn!(class = type_name, "get_comp: class is not registered");
            return None;
        };
        self.find_class(entity, class)
    }

    /// Every component on `entity` matching `type_name`, in attach order.
    pub fn get_comps(&self, entity: Entity, type_name: &str) -> Vec<ComponentId> {
        let Some(class) = self.classes.class_id(type_name) else {
            warn!(class = type_name, "get_comps: class is not registered");
            return Vec::new();
        };
        self.components(entity)
            .iter()
            .copied()
            .filter(|c| self.comp_is_a(*c, class))
            .collect()
    }

    /// First component on `entity` whose behaviour is the Rust type `C`.
    pub fn component_of<C: Component>(&self, entity: Entity) -> Option<ComponentId> {
        self.components(entity)
            .iter()
            .copied()
            .find(|c| self.get::<C>(*c).is_some())
    }

    /// Destroy the first live component matching `type_name`.
    pub fn remove_comp(&mut self, entity: Entity, type_name: &str) -> bool {
        let found = self
            .get_comps(entity, type_name)
            .into_iter()
            .find(|c| !self.is_comp_destroyed(*c));
        match found {
            Some(c) => {
                self.destroy_comp(c);
                true
            }
            None => false,
        }
    }

    /// Destroy every live component matching `type_name`.
    pub fn remove_comps(&mut self, entity: Entity, type_name: &str) -> bool {
        let mut removed = false;
        for c in self.get_comps(entity, type_name) {
            if !self.is_comp_destroyed(c) {
                self.destroy_comp(c);
                removed = true;
            }
        }
        removed
    }

    pub(crate) fn find_class(&self, entity: Entity, class: ClassId) -> Option<ComponentId> {
        self.components(entity)
            .iter()
            .copied()
            .find(|c| self.comp_is_a(*c, class))
    }

    fn comp_is_a(&self, component: ComponentId, class: ClassId) -> bool {
        self.class_of(component)
            .is_some_and(|own| self.classes.is_a(own, class))
    }

    /// Run `f` against a component's behaviour with a [`Context`].
    ///
    /// The behaviour is moved out of its slot for the duration, so nested
    /// calls for the same component are skipped.
    pub(crate) fn invoke<F>(&mut self, component: ComponentId, f: F)
    where
        F: FnOnce(&mut dyn Component, &mut Context<'_>),
    {
        let Some(data) = self.components.get_mut(component.0) else {
            return;
        };
        let entity = data.entity;
        let Some(mut behaviour) = data.behaviour.take() else {
            trace!(?component, "hook skipped, component is already running one");
            return;
        };

        {
            let mut cx = Context::new(self, entity, component);
            f(behaviour.as_mut(), &mut cx);
        }

        if let Some(data) = self.components.get_mut(component.0) {
            data.behaviour = Some(behaviour);
        }
    }

    /// Run `on_clone` on `target` with `source` borrowed alongside it.
    pub(crate) fn invoke_clone(&mut self, target: ComponentId, source: ComponentId) {
        let Some(src) = self
            .components
            .get_mut(source.0)
            .and_then(|d| d.behaviour.take())
        else {
            return;
        };
        self.invoke(target, |c, cx| c.on_clone(src.as_ref(), cx));
        if let Some(data) = self.components.get_mut(source.0) {
            data.behaviour = Some(src);
        }
    }
}
