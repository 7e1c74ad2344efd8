//! Flight mode tables.

use std::collections::BTreeMap;

use mavio::dialects::common::enums::MavAutopilot;

/// `MAV_AUTOPILOT_ARDUPILOTMEGA`
pub const MAV_AUTOPILOT_ARDUPILOTMEGA: u8 = MavAutopilot::Ardupilotmega as u8;
/// `MAV_AUTOPILOT_INVALID`, reported by components that are not flight controllers.
pub const MAV_AUTOPILOT_INVALID: u8 = MavAutopilot::Invalid as u8;

const COPTER_MODES: &[(&str, u32)] = &[
    ("STABILIZE", 0),
    ("ACRO", 1),
    ("ALT_HOLD", 2),
    ("AUTO", 3),
    ("GUIDED", 4),
    ("LOITER", 5),
    ("RTL", 6),
    ("CIRCLE", 7),
    ("POSITION", 8),
    ("LAND", 9),
    ("OF_LOITER", 10),
    ("DRIFT", 11),
    ("SPORT", 13),
    ("FLIP", 14),
    ("AUTOTUNE", 15),
    ("POSHOLD", 16),
    ("BRAKE", 17),
    ("THROW", 18),
    ("AVOID_ADSB", 19),
    ("GUIDED_NOGPS", 20),
    ("SMART_RTL", 21),
    ("FLOWHOLD", 22),
    ("FOLLOW", 23),
    ("ZIGZAG", 24),
    ("SYSTEMID", 25),
    ("AUTOROTATE", 26),
    ("AUTO_RTL", 27),
];

const PLANE_MODES: &[(&str, u32)] = &[
    ("MANUAL", 0),
    ("CIRCLE", 1),
    ("STABILIZE", 2),
    ("TRAINING", 3),
    ("ACRO", 4),
    ("FBWA", 5),
    ("FBWB", 6),
    ("CRUISE", 7),
    ("AUTOTUNE", 8),
    ("AUTO", 10),
    ("RTL", 11),
    ("LOITER", 12),
    ("TAKEOFF", 13),
    ("AVOID_ADSB", 14),
    ("GUIDED", 15),
    ("INITIALISING", 16),
    ("QSTABILIZE", 17),
    ("QHOVER", 18),
    ("QLOITER", 19),
    ("QLAND", 20),
    ("QRTL", 21),
    ("QAUTOTUNE", 22),
    ("QACRO", 23),
    ("THERMAL", 24),
];

const ROVER_MODES: &[(&str, u32)] = &[
    ("MANUAL", 0),
    ("ACRO", 1),
    ("LEARNING", 2),
    ("STEERING", 3),
    ("HOLD", 4),
    ("LOITER", 5),
    ("FOLLOW", 6),
    ("SIMPLE", 7),
    ("AUTO", 10),
    ("RTL", 11),
    ("SMART_RTL", 12),
    ("GUIDED", 15),
    ("INITIALISING", 16),
];

/// Mapping from a case-sensitive mode name to a vehicle-specific custom mode id.
///
/// Mode tables belong to a live session: transports produce a fresh table on each request based
/// on what the vehicle reported about itself.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ModeTable(BTreeMap<String, u32>);

impl ModeTable {
    /// Creates an empty mode table.
    pub fn new() -> Self {
        Self::default()
    }

    /// ArduCopter modes.
    pub fn ardupilot_copter() -> Self {
        Self::from_static(COPTER_MODES)
    }

    /// ArduPlane modes (including QuadPlane VTOL modes).
    pub fn ardupilot_plane() -> Self {
        Self::from_static(PLANE_MODES)
    }

    /// ArduRover modes (also used by boats).
    pub fn ardupilot_rover() -> Self {
        Self::from_static(ROVER_MODES)
    }

    /// Picks mode table for a vehicle by its `MAV_AUTOPILOT` and `MAV_TYPE` reported in
    /// heartbeat.
    ///
    /// Returns [`None`] if vehicle is not known to this crate.
    pub fn for_vehicle(autopilot: u8, vehicle_type: u8) -> Option<Self> {
        if autopilot != MAV_AUTOPILOT_ARDUPILOTMEGA {
            return None;
        }

        match vehicle_type {
            // Multicopters and helicopters
            2 | 3 | 4 | 13 | 14 | 15 | 29 => Some(Self::ardupilot_copter()),
            // Fixed wing and VTOL
            1 | 19..=25 => Some(Self::ardupilot_plane()),
            // Ground rover and surface boat
            10 | 11 => Some(Self::ardupilot_rover()),
            _ => None,
        }
    }

    /// Returns mode id by its name.
    pub fn get(&self, name: &str) -> Option<u32> {
        self.0.get(name).copied()
    }

    /// Adds a mode.
    pub fn insert(&mut self, name: impl Into<String>, mode_id: u32) {
        self.0.insert(name.into(), mode_id);
    }

    /// Iterates over mode names and ids.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.0.iter().map(|(name, id)| (name.as_str(), *id))
    }

    /// Number of modes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if table has no modes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn from_static(modes: &[(&str, u32)]) -> Self {
        modes.iter().copied().collect()
    }
}

impl<S: Into<String>> FromIterator<(S, u32)> for ModeTable {
    fn from_iter<I: IntoIterator<Item = (S, u32)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(name, id)| (name.into(), id))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copter_table_is_picked_for_ardupilot_quadrotor() {
        let table = ModeTable::for_vehicle(MAV_AUTOPILOT_ARDUPILOTMEGA, 2).unwrap();

        assert_eq!(table.get("GUIDED"), Some(4));
        assert_eq!(table.get("LAND"), Some(9));
        assert_eq!(table.get("RTL"), Some(6));
    }

    #[test]
    fn names_are_case_sensitive() {
        let table = ModeTable::ardupilot_copter();

        assert_eq!(table.get("guided"), None);
    }

    #[test]
    fn unsupported_vehicles_have_no_table() {
        // PX4
        assert!(ModeTable::for_vehicle(12, 2).is_none());
        // ArduPilot antenna tracker
        assert!(ModeTable::for_vehicle(MAV_AUTOPILOT_ARDUPILOTMEGA, 5).is_none());
    }

    #[test]
    fn plane_and_rover_tables_differ() {
        let plane = ModeTable::for_vehicle(MAV_AUTOPILOT_ARDUPILOTMEGA, 1).unwrap();
        let rover = ModeTable::for_vehicle(MAV_AUTOPILOT_ARDUPILOTMEGA, 10).unwrap();

        assert_eq!(plane.get("GUIDED"), Some(15));
        assert_eq!(plane.get("QLAND"), Some(20));
        assert_eq!(rover.get("HOLD"), Some(4));
        assert_eq!(rover.get("QLAND"), None);
    }
}
