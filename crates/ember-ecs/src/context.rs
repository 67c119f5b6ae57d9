use std::ops::{Deref, DerefMut};

use crate::app::App;
use crate::component::ComponentId;
use crate::entity::Entity;

/// Handed to component hooks: the app plus the handles of the component
/// whose hook is running.
pub struct Context<'a> {
    app: &'a mut App,
    entity: Entity,
    component: ComponentId,
}

impl<'a> Context<'a> {
    pub(crate) fn new(app: &'a mut App, entity: Entity, component: ComponentId) -> Self {
        Self {
            app,
            entity,
            component,
        }
    }

    /// Entity owning the component.
    pub fn entity(&self) -> Entity {
        self.entity
    }

    pub fn component(&self) -> ComponentId {
        self.component
    }

    pub fn app(&mut self) -> &mut App {
        self.app
    }

    /// Fire `name` on the owning entity.
    pub fn emit_self(&mut self, name: &str) {
        let entity = self.entity;
        self.app.emit(entity, name);
    }

    /// Destroy the component whose hook is running.
    pub fn destroy_self(&mut self) {
        let component = self.component;
        self.app.destroy_comp(component);
    }
}

impl Deref for Context<'_> {
    type Target = App;

    fn deref(&self) -> &App {
        self.app
    }
}

impl DerefMut for Context<'_> {
    fn deref_mut(&mut self) -> &mut App {
        self.app
    }
}
