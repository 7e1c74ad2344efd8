//! Common constants.

use std::time::Duration;

/// Default interval of a single receive attempt within a bounded wait.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Shortest allowed receive attempt within a bounded wait.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);
/// Default timeout for a command acknowledgment.
pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_secs(10);
/// Default timeout for a position report before takeoff.
pub const DEFAULT_POSITION_TIMEOUT: Duration = Duration::from_secs(5);
/// Default timeout for a single telemetry read.
pub const DEFAULT_TELEMETRY_TIMEOUT: Duration = Duration::from_secs(5);
/// Default timeout for the vehicle to report armed or disarmed motors.
pub const DEFAULT_ARM_TIMEOUT: Duration = Duration::from_secs(30);

/// Default MAVLink system id of this ground control station.
pub const DEFAULT_SYSTEM_ID: u8 = 255;
/// Default MAVLink component id of this ground control station (`MAV_COMP_ID_MISSIONPLANNER`).
pub const DEFAULT_COMPONENT_ID: u8 = 190;
/// Default serial baud rate.
pub const DEFAULT_BAUD_RATE: u32 = 57_600;

/// Mode used for takeoff.
pub const TAKEOFF_MODE: &str = "GUIDED";
/// Mode used for landing.
pub const LAND_MODE: &str = "LAND";

/// Number of consecutive read failures after which MAVLink reader gives up.
pub(crate) const READER_MAX_FAILURES: usize = 16;
/// Number of attempts to send a UDP datagram.
pub(crate) const UDP_RETRIES: usize = 3;
/// Interval between UDP send attempts.
pub(crate) const UDP_RETRY_INTERVAL: Duration = Duration::from_millis(10);
/// Read timeout of the underlying sockets and serial ports.
pub(crate) const IO_READ_TIMEOUT: Duration = Duration::from_millis(100);
