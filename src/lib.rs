//! Stream Multiplayer
//!
//! Per-user input demultiplexing for games streamed to several remote
//! players from one process: device pairing, per-user action clones,
//! shared-device event routing and ownership-filtered raycasting.

/// Build-time information (timestamp, rustc, target)
pub mod build_info;

/// Session profiles loaded from files and environment
pub mod config;

/// Error types shared by the input core
pub mod error;

/// Host-session bridge
pub mod host;

/// Devices, users, action clones, focus and event routing
pub mod input;

/// Stock and per-user raycasters
pub mod raycast;

/// Session lifecycle and frame loop
pub mod session;

/// Setup validation checks and reporting
pub mod validation;

pub use error::{InputError, Result};
