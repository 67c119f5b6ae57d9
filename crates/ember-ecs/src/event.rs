//! Entity-scoped events.
//!
//! Every entity carries an [`EventEmitter`](ember_core::EventEmitter) of
//! [`Listener`]s. Listeners are either user callbacks or routes into a
//! component's [`on_event`](crate::Component::on_event) hook, created from
//! the class's declared event table.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use ember_core::ListenerId;
use tracing::{trace, warn};

use crate::app::App;
use crate::component::ComponentId;
use crate::entity::Entity;

/// Lifecycle event names emitted by the coordinator.
pub mod names {
    pub const READY: &str = "ready";
    pub const ENABLE: &str = "enable";
    pub const DISABLE: &str = "disable";
    pub const DESTROY: &str = "destroy";
    /// Detail is a [`ParentChange<Entity>`](ember_core::ParentChange).
    pub const PARENT_CHANGED: &str = "parent-changed";
}

pub type Callback = Rc<RefCell<dyn FnMut(&mut App, &Event)>>;

#[derive(Clone)]
pub enum Listener {
    Callback(Callback),
    Component {
        component: ComponentId,
        handler: &'static str,
    },
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Listener::Callback(_) => f.write_str("Callback"),
            Listener::Component { component, handler } => f
                .debug_struct("Component")
                .field("component", component)
                .field("handler", handler)
                .finish(),
        }
    }
}

/// An event travelling through the entity tree.
///
/// When built with [`from_component`](Self::from_component) it also records
/// the component that raised it.
pub struct Event {
    name: String,
    target: Option<Entity>,
    current_target: Cell<Option<Entity>>,
    component: Option<ComponentId>,
    bubbles: bool,
    detail: Option<Rc<dyn Any>>,
    stopped: Cell<bool>,
}

impl Event {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: None,
            current_target: Cell::new(None),
            component: None,
            bubbles: false,
            detail: None,
            stopped: Cell::new(false),
        }
    }

    /// Event raised on behalf of `component`.
    pub fn from_component(name: impl Into<String>, component: ComponentId) -> Self {
        Self {
            component: Some(component),
            ..Self::new(name)
        }
    }

    /// Let the event continue to ancestors after the target's listeners.
    pub fn bubbles(mut self, bubbles: bool) -> Self {
        self.bubbles = bubbles;
        self
    }

    pub fn with_detail<T: Any>(mut self, detail: T) -> Self {
        self.detail = Some(Rc::new(detail));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Entity the event was dispatched on.
    pub fn target(&self) -> Option<Entity> {
        self.target
    }

    /// Entity whose listeners are currently running.
    pub fn current_target(&self) -> Option<Entity> {
        self.current_target.get()
    }

    pub fn component(&self) -> Option<ComponentId> {
        self.component
    }

    pub fn is_bubbling(&self) -> bool {
        self.bubbles
    }

    pub fn detail<T: Any>(&self) -> Option<&T> {
        self.detail.as_deref()?.downcast_ref()
    }

    /// Stop the event from reaching further ancestors. Remaining listeners
    /// on the current entity still run.
    pub fn stop_propagation(&self) {
        self.stopped.set(true);
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.stopped.get()
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("name", &self.name)
            .field("target", &self.target)
            .field("component", &self.component)
            .field("bubbles", &self.bubbles)
            .finish()
    }
}

impl App {
    /// Subscribe `callback` to `name` on `entity`.
    pub fn on<F>(&mut self, entity: Entity, name: &str, callback: F) -> Option<ListenerId>
    where
        F: FnMut(&mut App, &Event) + 'static,
    {
        let Some(data) = self.entities.get_mut(entity.0) else {
            warn!(?entity, event = name, "on: entity is not alive");
            return None;
        };
        let callback: Callback = Rc::new(RefCell::new(callback));
        Some(data.emitter.on(name, Listener::Callback(callback)))
    }

    pub fn off(&mut self, entity: Entity, name: &str, listener: ListenerId) -> bool {
        self.entities
            .get_mut(entity.0)
            .is_some_and(|data| data.emitter.off(name, listener))
    }

    /// Fire a plain, non-bubbling event on `entity`.
    pub fn emit(&mut self, entity: Entity, name: &str) {
        self.dispatch(entity, Event::new(name));
    }

    /// Deliver `event` to `entity`, then to each ancestor while it bubbles
    /// and nobody stopped it.
    pub fn dispatch(&mut self, entity: Entity, mut event: Event) {
        event.target = Some(entity);
        let mut current = Some(entity);
        while let Some(at) = current {
            event.current_target.set(Some(at));
            self.fire(at, &event);
            if !event.bubbles || event.is_propagation_stopped() {
                break;
            }
            current = self.parent(at);
        }
    }

    /// Dispatch `event` on the entity owning `component`.
    pub fn dispatch_from(&mut self, component: ComponentId, mut event: Event) {
        let Some(entity) = self.entity_of(component) else {
            warn!(?component, event = event.name(), "dispatch_from: component is not alive");
            return;
        };
        event.component.get_or_insert(component);
        self.dispatch(entity, event);
    }

    fn fire(&mut self, entity: Entity, event: &Event) {
        let listeners = match self.entities.get(entity.0) {
            Some(data) => data.emitter.listeners(event.name()),
            None => return,
        };
        for listener in listeners {
            match listener {
                Listener::Callback(callback) => match callback.try_borrow_mut() {
                    Ok(mut f) => (&mut *f)(self, event),
                    Err(_) => trace!(event = event.name(), "listener skipped, already running"),
                },
                Listener::Component { component, handler } => {
                    self.invoke(component, |c, cx| c.on_event(handler, event, cx));
                }
            }
        }
    }
}
