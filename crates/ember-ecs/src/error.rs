use ember_core::HierarchyError;

use crate::component::ComponentId;
use crate::entity::Entity;

/// Reasons a lifecycle operation was refused.
///
/// The plain API (`add_comp`, `set_parent`, ...) logs these and degrades to
/// `None`/`false`; the `try_*` variants hand them back.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EcsError {
    #[error("class '{0}' is not registered")]
    UnknownClass(String),

    #[error("entity {0:?} already has a '{1}' component and the class is not multiple")]
    DuplicateComponent(Entity, String),

    #[error("entity {0:?} is not alive")]
    StaleEntity(Entity),

    #[error("component {0:?} is not alive")]
    StaleComponent(ComponentId),

    #[error("entity {0:?} is destroyed")]
    EntityDestroyed(Entity),

    #[error("entity {0:?} is a level and cannot hold components or be reparented")]
    LevelEntity(Entity),

    #[error("entity {0:?} is not a level")]
    NotALevel(Entity),

    #[error("system '{0}' is already registered")]
    DuplicateSystem(String),

    #[error("hierarchy error: {0}")]
    Hierarchy(#[from] HierarchyError),
}

/// Errors loading an [`AppConfig`](crate::AppConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
