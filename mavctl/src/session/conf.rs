use std::time::Duration;

use crate::consts::{
    DEFAULT_ACK_TIMEOUT, DEFAULT_ARM_TIMEOUT, DEFAULT_POLL_INTERVAL, DEFAULT_POSITION_TIMEOUT,
    DEFAULT_TELEMETRY_TIMEOUT,
};

/// Timeouts of a [`Session`](super::Session).
///
/// Every blocking wait of the session is bounded by one of these values, except for the handshake
/// which waits forever unless [`Timeouts::handshake`] is set.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Timeouts {
    /// Bound of a single receive attempt within a longer wait.
    pub poll_interval: Duration,
    /// Time to wait for the first heartbeat.
    pub handshake: Option<Duration>,
    /// Time to wait for the vehicle to report armed or disarmed motors.
    pub arm: Duration,
    /// Time to wait for a position report before takeoff.
    pub position: Duration,
    /// Time to wait for a command acknowledgment.
    pub ack: Duration,
    /// Time to wait for a telemetry message.
    pub telemetry: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            handshake: None,
            arm: DEFAULT_ARM_TIMEOUT,
            position: DEFAULT_POSITION_TIMEOUT,
            ack: DEFAULT_ACK_TIMEOUT,
            telemetry: DEFAULT_TELEMETRY_TIMEOUT,
        }
    }
}
