//! Reactive Primitives
//!
//! This module implements dependency tracking: wrapped records, tracked
//! computations (effects), and the registry that links the two.
//!
//! # Concepts
//!
//! ## Reactive wrappers
//!
//! A [`Reactive`] wraps a plain [`Record`]. Reading a property through the
//! wrapper while an effect runs subscribes that effect to the property.
//! Writing a property re-runs every subscribed effect before `set` returns.
//!
//! ## Effects
//!
//! An effect is a function registered with [`Runtime::effect`]. It runs once
//! immediately, then again whenever something it read changes. The returned
//! [`Runner`] re-runs it on demand and can [`stop`] it for good.
//!
//! ## Deps
//!
//! A Dep is the set of effects subscribed to one `(record, property)` pair.
//! Effects keep back-references to their Deps so that every run starts from
//! a clean slate and `stop` can detach completely.
//!
//! # Implementation Notes
//!
//! All state lives in an explicit [`Runtime`] handle instead of process-wide
//! globals. Records are identified by a [`TargetId`] assigned at wrap time,
//! and the registry is a two-level map keyed by `(TargetId, property)`.

mod context;
mod effect;
mod runtime;
mod subscriber;
mod wrapper;

pub use effect::{stop, EffectHandle, EffectOptions, Runner, Scheduler};
pub use runtime::Runtime;
pub use subscriber::{EffectId, TargetId};
pub use wrapper::{Reactive, Record};
