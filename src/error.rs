//! Error type for pool resolution and configuration

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum PoolError {
    /// No pool or copyable parent exists for the requested style name
    UnknownStyle(String),
    /// A `p-` style was requested but its base style does not exist
    MissingPlayerBase(String),
    /// The style declares a collider shape the engine does not simulate
    UnsupportedShape { style: String, shape: &'static str },
    /// Two style definitions share a name
    DuplicateStyle(String),
    /// A soft-cull operation targeted a pool that is not a soft-cull pool
    NotSoftcullPool(String),
    /// Some, but not all, of the asserted controls are already attached
    PartialControlMatch(String),
    /// Recolor was requested on a style that does not support it
    NotRecolorizable(String),
    /// Malformed configuration
    Config(String),
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolError::UnknownStyle(name) => {
                write!(f, "could not find bullet style by name \"{name}\"")
            }
            PoolError::MissingPlayerBase(name) => {
                write!(f, "cannot create player style: base style \"{name}\" does not exist")
            }
            PoolError::UnsupportedShape { style, shape } => {
                write!(f, "style \"{style}\" uses unsupported collider shape {shape}")
            }
            PoolError::DuplicateStyle(name) => write!(f, "style \"{name}\" is defined twice"),
            PoolError::NotSoftcullPool(name) => {
                write!(f, "style \"{name}\" is not a soft-cull style")
            }
            PoolError::PartialControlMatch(name) => write!(
                f,
                "pool \"{name}\" has some but not all of the asserted controls"
            ),
            PoolError::NotRecolorizable(name) => {
                write!(f, "style \"{name}\" does not support recoloring")
            }
            PoolError::Config(msg) => write!(f, "invalid configuration: {msg}"),
        }
    }
}

impl std::error::Error for PoolError {}

impl From<serde_json::Error> for PoolError {
    fn from(e: serde_json::Error) -> Self {
        PoolError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PoolError>;
