//! Trellis Core
//!
//! This crate provides the update core of the Trellis UI runtime.
//! It implements:
//!
//! - Dependency tracking over plain records (reactive wrappers, effects)
//! - Virtual node reconciliation against a pluggable host adapter
//! - Render effects that re-render a component when state it read changes
//!
//! # Architecture
//!
//! The crate is organized into two modules:
//!
//! - `reactive`: Reactive wrappers, effects, and the dependency registry
//! - `render`: Virtual nodes, the host adapter contract, and the renderer
//!
//! Everything is single threaded and synchronous. A write runs every
//! dependent effect, including component re-renders, before it returns.
//!
//! # Example
//!
//! ```rust,ignore
//! use trellis_core::reactive::Runtime;
//!
//! let runtime = Runtime::new();
//! let user = runtime.reactive_from(serde_json::from_value(json!({ "age": 10 }))?);
//!
//! let reader = user.clone();
//! let next_age = runtime.effect(move || reader.get_as::<i64>("age").unwrap().unwrap() + 1);
//! assert_eq!(next_age.run(), 11);
//!
//! user.set("age", 11);
//! assert_eq!(next_age.run(), 12);
//! ```

pub mod config;
pub mod error;
pub mod reactive;
pub mod render;

pub use config::RuntimeConfig;
pub use error::{Error, Result};
