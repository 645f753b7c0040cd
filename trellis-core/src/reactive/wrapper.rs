//! Reactive Wrapper
//!
//! A [`Reactive`] is an instrumented view over a shared record. Reading a
//! property through it subscribes the running computation; writing through
//! it notifies subscribers. The record itself is an ordinary map and can
//! still be read and written directly, without any tracking.
//!
//! Wrapping is shallow: a property holding a nested object is returned as a
//! plain value, and mutations inside it are not observed.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::runtime::Runtime;
use super::subscriber::TargetId;
use crate::error::{Error, Result};

/// The plain record a [`Reactive`] wraps.
pub type Record = IndexMap<String, Value>;

pub(crate) struct ReactiveInner {
    pub(crate) id: TargetId,
    pub(crate) target: Rc<RefCell<Record>>,
    runtime: Runtime,
}

/// Observable view over a shared [`Record`].
///
/// # Example
///
/// ```rust,ignore
/// let runtime = Runtime::new();
/// let user = runtime.reactive_from(record);
///
/// let reader = user.clone();
/// runtime.effect(move || println!("age: {:?}", reader.get("age")));
///
/// user.set("age", 11); // prints "age: Some(Number(11))"
/// ```
#[derive(Clone)]
pub struct Reactive {
    inner: Rc<ReactiveInner>,
}

impl Reactive {
    pub(crate) fn new(id: TargetId, target: Rc<RefCell<Record>>, runtime: Runtime) -> Self {
        Self {
            inner: Rc::new(ReactiveInner { id, target, runtime }),
        }
    }

    pub(crate) fn from_inner(inner: Rc<ReactiveInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> Weak<ReactiveInner> {
        Rc::downgrade(&self.inner)
    }

    /// The identity the registry uses for this record.
    pub fn id(&self) -> TargetId {
        self.inner.id
    }

    /// The wrapped record.
    pub fn target(&self) -> Rc<RefCell<Record>> {
        Rc::clone(&self.inner.target)
    }

    /// The runtime that tracks reads and writes through this wrapper.
    pub fn runtime(&self) -> &Runtime {
        &self.inner.runtime
    }

    /// Read a property, subscribing the running computation to it.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.runtime.track(self.inner.id, key);
        self.get_untracked(key)
    }

    /// Read a property without subscribing anything.
    pub fn get_untracked(&self, key: &str) -> Option<Value> {
        self.inner.target.borrow().get(key).cloned()
    }

    /// Read a property and decode it into `T`.
    ///
    /// Tracks exactly like [`get`](Self::get). A missing property is
    /// `Ok(None)`; a present property of the wrong shape is an error.
    pub fn get_as<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        self.get(key)
            .map(|value| {
                serde_json::from_value(value).map_err(|source| Error::Decode {
                    key: key.to_owned(),
                    source,
                })
            })
            .transpose()
    }

    /// Write a property and notify its subscribers.
    ///
    /// Subscribers run before this returns. With
    /// [`skip_unchanged_writes`](crate::RuntimeConfig::skip_unchanged_writes)
    /// set, writing the current value again notifies nobody.
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        let value = value.into();
        let unchanged = {
            let mut target = self.inner.target.borrow_mut();
            let unchanged = target.get(key) == Some(&value);
            target.insert(key.to_owned(), value);
            unchanged
        };

        if unchanged && self.inner.runtime.config().skip_unchanged_writes {
            tracing::trace!(target_id = ?self.inner.id, key, "skipping unchanged write");
            return;
        }

        self.inner.runtime.trigger(self.inner.id, key);
    }

    /// Compute a new value from the current one and write it.
    ///
    /// The read is untracked, so calling this inside an effect does not
    /// subscribe the effect to `key`.
    pub fn update<F>(&self, key: &str, f: F)
    where
        F: FnOnce(Option<&Value>) -> Value,
    {
        let next = {
            let target = self.inner.target.borrow();
            f(target.get(key))
        };
        self.set(key, next);
    }

    /// Property names of the wrapped record, untracked.
    pub fn keys(&self) -> Vec<String> {
        self.inner.target.borrow().keys().cloned().collect()
    }

    /// Whether two handles refer to the same wrapper.
    pub fn ptr_eq(&self, other: &Reactive) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Drop for ReactiveInner {
    fn drop(&mut self) {
        self.runtime.forget_wrapper(Rc::as_ptr(&self.target) as usize);
    }
}

impl fmt::Debug for Reactive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reactive")
            .field("id", &self.inner.id)
            .field("target", &*self.inner.target.borrow())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
