//! Conversion between crate protocol types and Mavio `common` dialect.

use mavio::dialects::common::enums::{MavCmd, MavType};
use mavio::dialects::common::messages;
use mavio::dialects::Common;
use mavio::protocol::V2;
use mavio::Frame;

use crate::protocol::{
    CommandAck, CommandLong, GlobalPositionInt, Heartbeat, Message, SysStatus, Target, VfrHud,
    MAV_CMD_COMPONENT_ARM_DISARM, MAV_CMD_DO_SET_MODE, MAV_CMD_NAV_LAND, MAV_CMD_NAV_TAKEOFF,
};

use crate::prelude::*;

/// Decoded inbound frame.
#[derive(Clone, Debug, PartialEq)]
pub(super) struct Inbound {
    pub(super) source: Target,
    pub(super) message: Message,
    /// `true` if this is a heartbeat of a ground control station.
    pub(super) from_gcs: bool,
}

/// Builds a MAVLink 2 `COMMAND_LONG` frame.
pub(super) fn encode_command(
    command: &CommandLong,
    source: Target,
    sequence: u8,
) -> Result<Frame<V2>> {
    let message = messages::CommandLong {
        target_system: command.target_system,
        target_component: command.target_component,
        command: mav_cmd(command.command)?,
        confirmation: command.confirmation,
        param1: command.params[0],
        param2: command.params[1],
        param3: command.params[2],
        param4: command.params[3],
        param5: command.params[4],
        param6: command.params[5],
        param7: command.params[6],
    };

    let frame = Frame::builder()
        .sequence(sequence)
        .system_id(source.system_id)
        .component_id(source.component_id)
        .version(V2)
        .message(&message)
        .map_err(|err| Error::Protocol(format!("can't encode COMMAND_LONG: {err:?}")))?
        .build();

    Ok(frame)
}

/// Decodes frame into one of the messages the controller is interested in.
///
/// Returns [`None`] for messages of other kinds and for payloads that can't be decoded.
pub(super) fn decode_frame(frame: &Frame<V2>) -> Option<Inbound> {
    let source = Target {
        system_id: frame.system_id(),
        component_id: frame.component_id(),
    };

    let mut from_gcs = false;
    let message = match frame.decode() {
        Ok(Common::Heartbeat(msg)) => {
            from_gcs = msg.type_ == MavType::Gcs;
            Message::Heartbeat(Heartbeat {
                source,
                vehicle_type: msg.type_ as u8,
                autopilot: msg.autopilot as u8,
                base_mode: msg.base_mode.bits(),
                custom_mode: msg.custom_mode,
                system_status: msg.system_status as u8,
            })
        }
        Ok(Common::CommandAck(msg)) => Message::CommandAck(CommandAck {
            command: msg.command as u16,
            result: (msg.result as u8).into(),
        }),
        Ok(Common::GlobalPositionInt(msg)) => Message::GlobalPositionInt(GlobalPositionInt {
            lat: msg.lat,
            lon: msg.lon,
            alt: msg.alt,
            relative_alt: msg.relative_alt,
        }),
        Ok(Common::VfrHud(msg)) => Message::VfrHud(VfrHud {
            airspeed: msg.airspeed,
            groundspeed: msg.groundspeed,
        }),
        Ok(Common::SysStatus(msg)) => Message::SysStatus(SysStatus {
            battery_remaining: msg.battery_remaining,
        }),
        Ok(_) => return None,
        Err(err) => {
            log::trace!(
                "[codec] can't decode message #{} from {source}: {err:?}",
                frame.message_id()
            );
            return None;
        }
    };

    Some(Inbound {
        source,
        message,
        from_gcs,
    })
}

fn mav_cmd(code: u16) -> Result<MavCmd> {
    match code {
        MAV_CMD_NAV_LAND => Ok(MavCmd::NavLand),
        MAV_CMD_NAV_TAKEOFF => Ok(MavCmd::NavTakeoff),
        MAV_CMD_DO_SET_MODE => Ok(MavCmd::DoSetMode),
        MAV_CMD_COMPONENT_ARM_DISARM => Ok(MavCmd::ComponentArmDisarm),
        code => Err(Error::Protocol(format!("unsupported command code {code}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Command, MavResult, MessageKind};
    use mavio::dialects::common::enums::{MavAutopilot, MavModeFlag, MavResult as WireResult};

    const GCS: Target = Target {
        system_id: 255,
        component_id: 190,
    };

    macro_rules! vehicle_frame {
        ($message:expr) => {
            Frame::builder()
                .sequence(7)
                .system_id(1)
                .component_id(1)
                .version(V2)
                .message(&$message)
                .unwrap()
                .build()
        };
    }

    #[test]
    fn command_frame_carries_source_and_params() {
        let command = Command::Takeoff {
            latitude: 52.0,
            longitude: 13.0,
            altitude: 10.0,
        }
        .encode(Target {
            system_id: 1,
            component_id: 1,
        });

        let frame = encode_command(&command, GCS, 42).unwrap();
        assert_eq!(frame.system_id(), 255);
        assert_eq!(frame.component_id(), 190);
        assert_eq!(frame.sequence(), 42);

        match frame.decode().unwrap() {
            Common::CommandLong(msg) => {
                assert_eq!(msg.command, MavCmd::NavTakeoff);
                assert_eq!(msg.target_system, 1);
                assert_eq!(msg.param5, 52.0);
                assert_eq!(msg.param6, 13.0);
                assert_eq!(msg.param7, 10.0);
            }
            msg => panic!("unexpected message: {msg:?}"),
        }
    }

    #[test]
    fn unsupported_command_codes_are_rejected() {
        let command = CommandLong {
            target_system: 1,
            target_component: 1,
            command: 1,
            confirmation: 0,
            params: [0.0; 7],
        };

        assert!(matches!(
            encode_command(&command, GCS, 0),
            Err(Error::Protocol(_))
        ));
    }

    #[test]
    fn vehicle_heartbeat_is_decoded() {
        let frame = vehicle_frame!(messages::Heartbeat {
            type_: MavType::Quadrotor,
            autopilot: MavAutopilot::Ardupilotmega,
            base_mode: MavModeFlag::CUSTOM_MODE_ENABLED | MavModeFlag::SAFETY_ARMED,
            custom_mode: 4,
            ..Default::default()
        });

        let inbound = decode_frame(&frame).unwrap();
        assert!(!inbound.from_gcs);
        assert_eq!(inbound.source.system_id, 1);
        match inbound.message {
            Message::Heartbeat(heartbeat) => {
                assert!(heartbeat.is_armed());
                assert_eq!(heartbeat.vehicle_type, 2);
                assert_eq!(heartbeat.autopilot, 3);
                assert_eq!(heartbeat.custom_mode, 4);
            }
            msg => panic!("unexpected message: {msg:?}"),
        }
    }

    #[test]
    fn command_ack_is_decoded() {
        let frame = vehicle_frame!(messages::CommandAck {
            command: MavCmd::NavTakeoff,
            result: WireResult::Denied,
            ..Default::default()
        });

        let inbound = decode_frame(&frame).unwrap();
        assert_eq!(inbound.message.kind(), MessageKind::CommandAck);
        assert_eq!(
            inbound.message,
            Message::CommandAck(CommandAck {
                command: MAV_CMD_NAV_TAKEOFF,
                result: MavResult::Denied,
            })
        );
    }

    #[test]
    fn irrelevant_messages_are_skipped() {
        let frame = vehicle_frame!(messages::SystemTime::default());

        assert!(decode_frame(&frame).is_none());
    }
}
