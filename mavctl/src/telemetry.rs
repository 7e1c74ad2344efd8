//! # Telemetry
//!
//! Single-shot telemetry reads. Each read takes one message among `GLOBAL_POSITION_INT`,
//! `VFR_HUD` and `SYS_STATUS` and converts it into a [`TelemetrySnapshot`] carrying only the
//! fields of that message. Snapshots are not merged or cached.
//!
//! Missing telemetry is not an error: reads return [`None`].

use std::fmt::{Display, Formatter};
use std::time::Duration;

use crate::io::Transport;
use crate::protocol::{Message, MessageKind};

/// Message kinds that carry telemetry.
pub const TELEMETRY_KINDS: [MessageKind; 3] = [
    MessageKind::GlobalPositionInt,
    MessageKind::VfrHud,
    MessageKind::SysStatus,
];

/// Telemetry metric.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Metric {
    /// Latitude, degrees.
    Latitude,
    /// Longitude, degrees.
    Longitude,
    /// Altitude (MSL), meters.
    Altitude,
    /// Ground speed, m/s.
    GroundSpeed,
    /// Air speed, m/s.
    AirSpeed,
    /// Remaining battery, percent.
    BatteryRemaining,
}

impl Metric {
    /// All metrics.
    pub const ALL: [Metric; 6] = [
        Metric::Latitude,
        Metric::Longitude,
        Metric::Altitude,
        Metric::GroundSpeed,
        Metric::AirSpeed,
        Metric::BatteryRemaining,
    ];

    /// Metric name in `snake_case`.
    pub fn name(&self) -> &'static str {
        match self {
            Metric::Latitude => "latitude",
            Metric::Longitude => "longitude",
            Metric::Altitude => "altitude",
            Metric::GroundSpeed => "ground_speed",
            Metric::AirSpeed => "air_speed",
            Metric::BatteryRemaining => "battery_remaining",
        }
    }
}

impl Display for Metric {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Partial telemetry taken from a single message.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TelemetrySnapshot {
    /// Latitude, degrees.
    pub latitude: Option<f64>,
    /// Longitude, degrees.
    pub longitude: Option<f64>,
    /// Altitude (MSL), meters.
    pub altitude: Option<f64>,
    /// Ground speed, m/s.
    pub ground_speed: Option<f64>,
    /// Air speed, m/s.
    pub air_speed: Option<f64>,
    /// Remaining battery, percent.
    pub battery_remaining: Option<f64>,
}

impl TelemetrySnapshot {
    /// Converts a telemetry message into a snapshot.
    ///
    /// Returns [`None`] for messages that carry no telemetry.
    pub fn decode(message: &Message) -> Option<Self> {
        let snapshot = match message {
            Message::GlobalPositionInt(position) => Self {
                latitude: Some(position.latitude()),
                longitude: Some(position.longitude()),
                altitude: Some(position.altitude()),
                ..Default::default()
            },
            Message::VfrHud(hud) => Self {
                ground_speed: Some(hud.groundspeed as f64),
                air_speed: Some(hud.airspeed as f64),
                ..Default::default()
            },
            // -1 means the autopilot does not know
            Message::SysStatus(status) => Self {
                battery_remaining: (status.battery_remaining >= 0)
                    .then_some(status.battery_remaining as f64),
                ..Default::default()
            },
            Message::Heartbeat(_) | Message::CommandAck(_) => return None,
        };

        Some(snapshot)
    }

    /// Returns a value of the metric, if present.
    pub fn get(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Latitude => self.latitude,
            Metric::Longitude => self.longitude,
            Metric::Altitude => self.altitude,
            Metric::GroundSpeed => self.ground_speed,
            Metric::AirSpeed => self.air_speed,
            Metric::BatteryRemaining => self.battery_remaining,
        }
    }

    /// Iterates over present metrics.
    pub fn iter(&self) -> impl Iterator<Item = (Metric, f64)> + '_ {
        Metric::ALL
            .into_iter()
            .filter_map(|metric| self.get(metric).map(|value| (metric, value)))
    }

    /// Returns `true` if no metric is present.
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

/// Reads a single telemetry message from `transport`.
///
/// Returns [`None`] if nothing arrived within `timeout` or the transport failed.
pub fn read<T: Transport + ?Sized>(
    transport: &mut T,
    timeout: Duration,
) -> Option<TelemetrySnapshot> {
    match transport.receive(&TELEMETRY_KINDS, timeout) {
        Ok(Some(message)) => TelemetrySnapshot::decode(&message),
        Ok(None) => {
            log::debug!("[telemetry] nothing received within {timeout:?}");
            None
        }
        Err(err) => {
            log::warn!("[telemetry] receive failed: {err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{CommandAck, GlobalPositionInt, MavResult, SysStatus, VfrHud};
    use crate::test_utils::ScriptedTransport;

    const TIMEOUT: Duration = Duration::from_millis(20);

    #[test]
    fn position_is_converted_to_degrees_and_meters() {
        let mut transport = ScriptedTransport::new().then_position(520000000, 130000000, 100000);

        let snapshot = read(&mut transport, TIMEOUT).unwrap();

        assert_eq!(snapshot.get(Metric::Latitude), Some(52.0));
        assert_eq!(snapshot.get(Metric::Longitude), Some(13.0));
        assert_eq!(snapshot.get(Metric::Altitude), Some(100.0));
        assert_eq!(snapshot.get(Metric::GroundSpeed), None);
        assert_eq!(snapshot.iter().count(), 3);
    }

    #[test]
    fn speeds_are_taken_from_hud() {
        let mut transport = ScriptedTransport::new().then(Message::VfrHud(VfrHud {
            airspeed: 12.5,
            groundspeed: 10.0,
        }));

        let snapshot = read(&mut transport, TIMEOUT).unwrap();

        assert_eq!(
            snapshot.iter().collect::<Vec<_>>(),
            vec![(Metric::GroundSpeed, 10.0), (Metric::AirSpeed, 12.5)]
        );
    }

    #[test]
    fn unknown_battery_level_yields_empty_snapshot() {
        let unknown = TelemetrySnapshot::decode(&Message::SysStatus(SysStatus {
            battery_remaining: -1,
        }))
        .unwrap();
        let known = TelemetrySnapshot::decode(&Message::SysStatus(SysStatus {
            battery_remaining: 87,
        }))
        .unwrap();

        assert!(unknown.is_empty());
        assert_eq!(known.battery_remaining, Some(87.0));
    }

    #[test]
    fn only_the_first_message_is_taken() {
        let mut transport = ScriptedTransport::new()
            .then(Message::SysStatus(SysStatus {
                battery_remaining: 50,
            }))
            .then(Message::GlobalPositionInt(GlobalPositionInt::default()));

        let snapshot = read(&mut transport, TIMEOUT).unwrap();

        assert_eq!(snapshot.battery_remaining, Some(50.0));
        assert_eq!(snapshot.latitude, None);
        assert_eq!(transport.pending(), 1);
    }

    #[test]
    fn silent_transport_yields_nothing() {
        let mut transport = ScriptedTransport::new().then(Message::CommandAck(CommandAck {
            command: 22,
            result: MavResult::Accepted,
        }));

        assert_eq!(read(&mut transport, TIMEOUT), None);
    }

    #[test]
    fn transport_failures_yield_nothing() {
        let mut transport = ScriptedTransport::new().disconnected();

        assert_eq!(read(&mut transport, TIMEOUT), None);
    }

    #[test]
    fn metric_names() {
        let names: Vec<_> = Metric::ALL.iter().map(Metric::name).collect();
        assert_eq!(
            names,
            [
                "latitude",
                "longitude",
                "altitude",
                "ground_speed",
                "air_speed",
                "battery_remaining"
            ]
        );
    }
}
