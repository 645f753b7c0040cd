//! Error types for the Trellis core.

use thiserror::Error;

/// Errors returned by the reactive runtime and the renderer.
#[derive(Error, Debug)]
pub enum Error {
    /// The node's type and shape flags do not describe anything `patch` can
    /// process, e.g. an element node that is not flagged as an element.
    #[error("unsupported node kind `{kind}` (shape flags {flags:#07b})")]
    UnsupportedNodeKind {
        /// Human readable node type.
        kind: String,
        /// Raw shape flag bits carried by the node.
        flags: u8,
    },

    /// The host adapter does not implement a required operation.
    #[error("host adapter does not provide `{0}`")]
    MissingHostCapability(&'static str),

    /// An old node was expected to carry a host node but never got one.
    #[error("`{kind}` node has no host node; it was never mounted")]
    NotMounted {
        /// Human readable node type.
        kind: String,
    },

    /// A component was rendered before `setup_component` ran for it.
    #[error("component `{0}` has no render function; setup has not run")]
    MissingRender(String),

    /// A reactive property could not be decoded into the requested type.
    #[error("failed to decode property `{key}`")]
    Decode {
        /// The property that was read.
        key: String,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },

    /// A runtime configuration document could not be parsed.
    #[error("invalid runtime configuration: {0}")]
    Config(#[source] serde_json::Error),
}

/// Result type for Trellis core operations.
pub type Result<T> = std::result::Result<T, Error>;
