//! Error types shared by the input core

use thiserror::Error;

use crate::input::{DeviceId, UserId};
use crate::raycast::RaycasterKind;

/// Errors raised by device pairing, user lookup and session setup
#[derive(Debug, Error)]
pub enum InputError {
    /// The device id is not present in the registry
    #[error("{0} is not registered")]
    InvalidDevice(DeviceId),

    /// The user id was never created, or has been torn down
    #[error("{0} is not a known user")]
    UnknownUser(UserId),

    /// More than one candidate exists and no owner can be deduced
    #[error("{count} {kind} raycasters could not be assigned to a single owner")]
    AmbiguousOwnership { kind: RaycasterKind, count: usize },

    /// A player references an action template that is not configured
    #[error("action template '{0}' is not configured")]
    UnknownTemplate(String),

    /// Configuration could not be loaded
    #[error(transparent)]
    Config(#[from] config::ConfigError),
}

/// Result alias for input core operations
pub type Result<T> = std::result::Result<T, InputError>;
