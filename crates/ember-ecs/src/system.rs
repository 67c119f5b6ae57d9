use std::any::type_name;

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::app::App;
use crate::component::{AsAny, ComponentId};
use crate::entity::Entity;
use crate::error::EcsError;
use crate::registry::ClassId;

/// Keeps track of the components of one class (and its subclasses) and
/// runs once per frame.
///
/// Every method has a default that logs what an implementation is expected
/// to do, once per system type.
pub trait System: AsAny {
    /// Called once at registration.
    fn finalize(&mut self, info: &SystemInfo) {
        let _ = info;
        warn_unimplemented(
            type_name::<Self>(),
            "finalize",
            "prepare internal storage, e.g. reserve info.pool_size slots",
        );
    }

    /// A component of the target class became live.
    fn add(&mut self, entity: Entity, component: ComponentId) {
        let _ = (entity, component);
        warn_unimplemented(
            type_name::<Self>(),
            "add",
            "start tracking the (entity, component) pair",
        );
    }

    /// A tracked component was destroyed.
    fn remove(&mut self, entity: Entity, component: ComponentId) {
        let _ = (entity, component);
        warn_unimplemented(
            type_name::<Self>(),
            "remove",
            "stop tracking the (entity, component) pair",
        );
    }

    fn tick(&mut self, app: &mut App) {
        let _ = app;
        warn_unimplemented(type_name::<Self>(), "tick", "update tracked components");
    }

    fn post_tick(&mut self, app: &mut App) {
        let _ = app;
        warn_unimplemented(
            type_name::<Self>(),
            "post_tick",
            "finish work that depends on every system's tick",
        );
    }
}

impl dyn System {
    pub fn downcast_ref<T: System>(&self) -> Option<&T> {
        self.as_any().downcast_ref()
    }

    pub fn downcast_mut<T: System>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut()
    }
}

static WARNED: Mutex<Vec<(&'static str, &'static str)>> = parking_lot::const_mutex(Vec::new());

fn warn_unimplemented(system: &'static str, hook: &'static str, expected: &str) {
    let mut warned = WARNED.lock();
    if warned.contains(&(system, hook)) {
        return;
    }
    warned.push((system, hook));
    warn!(system, hook, expected, "system hook not implemented");
}

/// Registration record handed to [`System::finalize`].
#[derive(Debug, Clone, PartialEq)]
pub struct SystemInfo {
    pub id: String,
    /// Class name the system was registered for.
    pub component: String,
    /// Resolved target class; `None` until the class is registered.
    pub class: Option<ClassId>,
    pub priority: i32,
    /// Expected number of tracked components.
    pub pool_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SystemKey(pub u32);

pub(crate) struct SystemSlot {
    pub key: SystemKey,
    pub info: SystemInfo,
    /// Taken out while the system runs.
    pub system: Option<Box<dyn System>>,
}

/// A system queued for [`App::with_systems`].
pub struct SystemDescriptor {
    pub id: String,
    pub system: Box<dyn System>,
    pub component: String,
    pub priority: i32,
}

impl SystemDescriptor {
    pub fn new(
        id: impl Into<String>,
        system: impl System,
        component: impl Into<String>,
        priority: i32,
    ) -> Self {
        Self {
            id: id.into(),
            system: Box::new(system),
            component: component.into(),
            priority,
        }
    }
}

#[derive(Clone, Copy)]
pub(crate) enum Phase {
    Tick,
    PostTick,
}

impl App {
    /// Register `system` for components of `component` (and subclasses).
    ///
    /// Systems run in ascending `priority`; equal priorities keep
    /// registration order.
    pub fn register_system(
        &mut self,
        id: impl Into<String>,
        system: impl System,
        component: &str,
        priority: i32,
    ) -> bool {
        match self.try_register_system(id, Box::new(system), component, priority) {
            Ok(()) => true,
            Err(err) => {
                warn!(%err, "register_system failed");
                false
            }
        }
    }

    pub fn try_register_system(
        &mut self,
        id: impl Into<String>,
        mut system: Box<dyn System>,
        component: &str,
        priority: i32,
    ) -> Result<(), EcsError> {
        let id = id.into();
        if self.systems.iter().any(|s| s.info.id == id) {
            return Err(EcsError::DuplicateSystem(id));
        }
        let class = self.classes.class_id(component);
        if class.is_none() {
            warn!(system = %id, class = component, "system target class is not registered yet");
        }

        let info = SystemInfo {
            id,
            component: component.to_string(),
            class,
            priority,
            pool_size: self.config.system_pool_size,
        };
        system.finalize(&info);

        let key = SystemKey(self.next_system_key);
        self.next_system_key += 1;
        let at = self.systems.partition_point(|s| s.info.priority <= priority);
        debug!(system = %info.id, class = component, priority, "registered system");
        self.systems.insert(
            at,
            SystemSlot {
                key,
                info,
                system: Some(system),
            },
        );
        self.rebuild_dispatch();
        Ok(())
    }

    /// Resolve every system's target and recompute which systems each
    /// class notifies.
    pub(crate) fn rebuild_dispatch(&mut self) {
        self.system_slots = vec![0; self.systems.len()];
        for (i, slot) in self.systems.iter_mut().enumerate() {
            slot.info.class = self.classes.class_id(&slot.info.component);
            self.system_slots[slot.key.0 as usize] = i;
        }
        self.dispatch = self
            .classes
            .iter()
            .map(|class| {
                self.systems
                    .iter()
                    .filter(|s| s.info.class.is_some_and(|t| self.classes.is_a(class.id(), t)))
                    .map(|s| s.key)
                    .collect()
            })
            .collect();
    }

    pub fn system_info(&self, id: &str) -> Option<&SystemInfo> {
        self.systems.iter().find(|s| s.info.id == id).map(|s| &s.info)
    }

    /// Registered systems in run order.
    pub fn systems(&self) -> impl Iterator<Item = &SystemInfo> {
        self.systems.iter().map(|s| &s.info)
    }

    /// Typed access to a registered system. `None` while it is running.
    pub fn system<S: System>(&self, id: &str) -> Option<&S> {
        self.systems
            .iter()
            .find(|s| s.info.id == id)?
            .system
            .as_deref()?
            .downcast_ref()
    }

    pub fn system_mut<S: System>(&mut self, id: &str) -> Option<&mut S> {
        self.systems
            .iter_mut()
            .find(|s| s.info.id == id)?
            .system
            .as_deref_mut()?
            .downcast_mut()
    }

    pub(crate) fn slot(&self, key: SystemKey) -> Option<&SystemSlot> {
        let index = *self.system_slots.get(key.0 as usize)?;
        self.systems.get(index)
    }

    pub(crate) fn slot_mut(&mut self, key: SystemKey) -> Option<&mut SystemSlot> {
        let index = *self.system_slots.get(key.0 as usize)?;
        self.systems.get_mut(index)
    }

    /// Tell each of `keys` that a component came or went.
    pub(crate) fn notify_systems(&mut self, keys: &[SystemKey], entity: Entity, component: ComponentId, added: bool) {
        for &key in keys {
            let Some(slot) = self.slot_mut(key) else {
                continue;
            };
            match slot.system.as_deref_mut() {
                Some(system) if added => system.add(entity, component),
                Some(system) => system.remove(entity, component),
                None => trace!(system = %slot.info.id, "system busy, notification skipped"),
            }
        }
    }

    /// Run one phase on every system registered before the phase started.
    pub(crate) fn run_systems(&mut self, phase: Phase) {
        let keys: Vec<SystemKey> = self.systems.iter().map(|s| s.key).collect();
        for key in keys {
            let Some(mut system) = self.slot_mut(key).and_then(|s| s.system.take()) else {
                continue;
            };
            match phase {
                Phase::Tick => system.tick(self),
                Phase::PostTick => system.post_tick(self),
            }
            if let Some(slot) = self.slot_mut(key) {
                slot.system = Some(system);
            }
        }
    }
}
