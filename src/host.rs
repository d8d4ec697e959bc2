//! Host-session bridge
//!
//! The streaming host owns the lobby that accepts or rejects remote players.
//! A session receives its host at construction; [`NullHost`] stands in when
//! nothing is attached (offline or simulated runs).

use tracing::info;

/// Capabilities the streaming host exposes to a session
pub trait Host {
    /// Stops the lobby from accepting new players
    fn close_lobby(&mut self);

    /// Name used in logs
    fn name(&self) -> &str {
        "host"
    }
}

/// Host used when no streaming host is attached
#[derive(Debug, Default, Clone, Copy)]
pub struct NullHost;

impl Host for NullHost {
    fn close_lobby(&mut self) {
        info!("No host attached, close lobby ignored");
    }

    fn name(&self) -> &str {
        "null"
    }
}
