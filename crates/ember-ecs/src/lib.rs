//! Ember ECS - entity/component lifecycle core
//!
//! Entities form a parent/child tree rooted at levels and own an ordered
//! list of components. Components are user behaviours registered by class
//! name; systems subscribe to a class and are told when matching
//! components become live or die. All structural changes are deferred to
//! the next [`App::tick`].

mod app;
mod arena;
mod clone;
mod component;
mod config;
mod context;
mod entity;
mod error;
mod event;
mod queue;
mod registry;
mod system;

pub use app::App;
pub use arena::RawId;
pub use component::{AsAny, Component, ComponentId};
pub use config::AppConfig;
pub use context::Context;
pub use entity::{Entity, EntityMut};
pub use error::{ConfigError, EcsError};
pub use event::{names, Callback, Event, Listener};
pub use registry::{ClassId, ClassInfo, ClassOptions, ClassRegistry, Constructor};
pub use system::{System, SystemDescriptor, SystemInfo};

pub use ember_core::{ListenerId, ParentChange};
