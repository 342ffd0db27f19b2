use thiserror::Error;

use crate::{object::ObjectKind, util::typedefs::SsoString};

/// Reason a resource failed to refresh from its source.
///
/// Reload failures never leave the [`ResourceCache`](crate::ResourceCache); they
/// are logged and the resource is retried on the next poll.
#[derive(Error, Debug)]
pub enum ReloadError {
    #[error("Failed to read {origin}")]
    Io {
        origin: SsoString,
        #[source]
        source: std::io::Error,
    },
    #[error("Source {0} is no longer available")]
    MissingSource(SsoString),
    #[error("Failed to decode {origin}: {reason}")]
    Decode { origin: SsoString, reason: String },
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Reason a factory could not create an object.
#[derive(Error, Debug)]
pub enum ObjectCreationError {
    #[error("The graphics context returned an invalid handle for a new {kind:?} object (origin {origin:?})")]
    InvalidHandle { kind: ObjectKind, origin: SsoString },
}
