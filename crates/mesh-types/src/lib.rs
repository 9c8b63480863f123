//! Shared wire types for the task-routing mesh coordinator.
//!
//! This crate is the single source of truth for every type that crosses an
//! HTTP or WebSocket boundary: client <-> coordinator, coordinator <-> worker,
//! coordinator <-> dashboard subscriber. Handlers in `mesh-web` and the
//! routing engine in `mesh-core` both depend on this crate instead of
//! defining inline structs, so the wire shape only has one definition.

mod event;
mod pipeline;
mod task;
mod worker;

pub use event::*;
pub use pipeline::*;
pub use task::*;
pub use worker::*;
