//! Ember Core - shared primitives for the Ember lifecycle core
//!
//! This crate provides the building blocks that entities compose:
//! - Parent/child hierarchy nodes and tree walks
//! - A generic, mutable event emitter
//! - Common error types

pub mod emitter;
pub mod error;
pub mod hierarchy;

pub use emitter::{EventEmitter, ListenerId};
pub use error::HierarchyError;
pub use hierarchy::{HierarchyNode, NodeStore, ParentChange};
