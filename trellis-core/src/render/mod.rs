//! Rendering
//!
//! This module turns virtual node trees into host operations.
//!
//! # Overview
//!
//! - [`VNode`] describes structure: a type, attributes, children, and the
//!   [`ShapeFlags`] that classify it.
//! - [`HostOps`] is the adapter the embedding environment supplies.
//! - [`Renderer`] reconciles an old tree against a new one and drives the
//!   adapter with the minimal set of operations.
//! - [`ComponentInstance`] holds a component's state between renders. Its
//!   render function runs inside an effect, so any reactive property read
//!   during rendering schedules a re-render when written.

mod component;
mod host;
mod renderer;
mod vnode;

pub use component::{setup_component, Component, ComponentInstance, RenderFn, SetupResult};
pub use host::HostOps;
pub use renderer::Renderer;
pub use vnode::{Children, Props, ShapeFlags, VNode, VNodeType};
