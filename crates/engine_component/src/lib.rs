//! # engine_component
//!
//! The "C" in ECS — typed components, the entities they are attached to, and
//! the index that relates the two.
//!
//! This crate provides:
//!
//! - [`Component`] trait — the contract all attachable data must satisfy.
//! - [`ComponentTypeId`] — stable, instance-free type tags.
//! - [`EntityId`] — opaque 128-bit entity identifiers.
//! - [`Shared`] / [`AnyComponent`] — shareable component handles that track
//!   which entities reference them.
//! - [`Index`] — the thread-safe store mapping entities to components and
//!   component types to their live instances, with multi-type queries.

pub mod component;
pub mod config;
pub mod entity;
pub mod error;
pub mod index;
mod query;
pub mod shared;

pub use component::{Component, ComponentId, ComponentTypeId};
pub use config::{IndexConfig, ReplacePolicy};
pub use entity::EntityId;
pub use error::IndexError;
pub use index::Index;
pub use shared::{AnyComponent, Shared};
