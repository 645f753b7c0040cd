//! Host adapter contract.
//!
//! The renderer never touches a presentation layer directly. It asks a
//! [`HostOps`] implementation to create, insert, remove and update host
//! nodes. Every operation has a default body that fails with
//! [`Error::MissingHostCapability`], so an adapter only implements what it
//! supports and a missing capability surfaces at the call that needed it.

use std::fmt;

use serde_json::Value;

use crate::error::{Error, Result};

/// Primitive operations supplied by the embedding environment.
pub trait HostOps {
    /// Handle to a host node. Cloning must yield a handle to the same node.
    type Node: Clone + fmt::Debug + 'static;

    /// Create an element for `tag`.
    fn create_element(&self, tag: &str) -> Result<Self::Node> {
        let _ = tag;
        Err(Error::MissingHostCapability("create_element"))
    }

    /// Create a bare text node.
    fn create_text(&self, text: &str) -> Result<Self::Node> {
        let _ = text;
        Err(Error::MissingHostCapability("create_text"))
    }

    /// Append `child` to `parent`.
    fn insert(&self, child: &Self::Node, parent: &Self::Node) -> Result<()> {
        let _ = (child, parent);
        Err(Error::MissingHostCapability("insert"))
    }

    /// Detach `node` from wherever it is.
    fn remove(&self, node: &Self::Node) -> Result<()> {
        let _ = node;
        Err(Error::MissingHostCapability("remove"))
    }

    /// Replace the text content of `node`.
    fn set_element_text(&self, node: &Self::Node, text: &str) -> Result<()> {
        let _ = (node, text);
        Err(Error::MissingHostCapability("set_element_text"))
    }

    /// Apply one attribute change. `next` of `None` means the attribute was
    /// removed and should be detached.
    fn patch_prop(
        &self,
        node: &Self::Node,
        key: &str,
        prev: Option<&Value>,
        next: Option<&Value>,
    ) -> Result<()> {
        let _ = (node, key, prev, next);
        Err(Error::MissingHostCapability("patch_prop"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TextOnly;

    impl HostOps for TextOnly {
        type Node = u32;

        fn create_text(&self, _text: &str) -> Result<u32> {
            Ok(1)
        }
    }

    #[test]
    fn unimplemented_operations_fail_fast() {
        let host = TextOnly;

        assert_eq!(host.create_text("hi").unwrap(), 1);

        let err = host.insert(&1, &0).unwrap_err();
        assert!(matches!(err, Error::MissingHostCapability("insert")));

        let err = host.patch_prop(&1, "id", None, Some(&Value::from("x"))).unwrap_err();
        assert_eq!(err.to_string(), "host adapter does not provide `patch_prop`");
    }
}
